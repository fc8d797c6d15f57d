//! Eclipse solid-angle overlap: what fraction of the Sun's disk, as seen from
//! a satellite, is occluded by the Earth's disk.
//!
//! Both bodies are treated as small circles on the observer's unit sphere,
//! with angular radii derived from their physical radii and distances. The
//! overlap splits into four regimes on the separation angle `theta` between
//! the two disk centers:
//!
//! 1. Earth's disk entirely inside the Sun's (annular) — ratio of disk areas.
//! 2. Disks disjoint — 0%.
//! 3. Sun's disk entirely inside Earth's (total) — 100%.
//! 4. Partial overlap — exact lens ("digon") area from spherical trigonometry.
//!
//! The digon formulas, including the `a < 0` sign branch, are carried over
//! from the campaign's earlier survey scripts and pinned by the recorded
//! fixtures in `tests/eclipse_test.rs`.

use thiserror::Error;

use crate::constants::{EARTH_RADIUS_AU, SUN_RADIUS_AU};
use crate::Vector3;

/// Relative tolerance for the boundary-case comparisons: disks within this
/// of exact tangency are treated as tangent.
const REL_TOL: f64 = 1e-9;

#[derive(Error, Debug, PartialEq)]
pub enum EclipseError {
    /// The partial-overlap branch was reached with geometry it cannot
    /// evaluate (`sin(theta) == 0`, or the circle-intersection points do not
    /// exist). The boundary cases are supposed to catch these regimes first;
    /// reaching this error means the inputs are inconsistent.
    #[error("degenerate eclipse geometry: {0}")]
    DegenerateGeometry(String),

    /// One of the supplied position vectors coincides with the satellite.
    #[error("zero-length line of sight: {0}")]
    ZeroDistance(&'static str),
}

/// Percentage of the Sun's disk occluded by the Earth, as seen from the
/// satellite.
///
/// All three positions must be in the same frame, in AU. The satellite
/// position is barycentric (same frame as `earth` and `sun`); use
/// [`eclipse_percent_geocentric`] for propagator output relative to Earth.
///
/// Returns the percentage in `[0, 100]`, unrounded. Formatting into the
/// `"{n}%"` string the observation tables embed happens at the CSV boundary
/// ([`crate::report::format_eclipse_percent`]).
pub fn eclipse_percent(
    satellite: &Vector3,
    earth: &Vector3,
    sun: &Vector3,
) -> Result<f64, EclipseError> {
    let sat_sun = sun - satellite;
    let sat_earth = earth - satellite;

    let d_sun = sat_sun.norm();
    let d_earth = sat_earth.norm();
    if d_sun == 0.0 {
        return Err(EclipseError::ZeroDistance("satellite-sun"));
    }
    if d_earth == 0.0 {
        return Err(EclipseError::ZeroDistance("satellite-earth"));
    }

    let a_sun = (SUN_RADIUS_AU / d_sun).atan();
    let a_earth = (EARTH_RADIUS_AU / d_earth).atan();
    let cos_theta = sat_sun.dot(&sat_earth) / (d_sun * d_earth);
    let theta = cos_theta.clamp(-1.0, 1.0).acos();

    disk_overlap_percent(a_sun, a_earth, theta)
}

/// As [`eclipse_percent`], but with the satellite position given relative to
/// the Earth's center (the frame SGP4-style propagators report in).
pub fn eclipse_percent_geocentric(
    satellite_from_earth: &Vector3,
    earth: &Vector3,
    sun: &Vector3,
) -> Result<f64, EclipseError> {
    eclipse_percent(&(earth + satellite_from_earth), earth, sun)
}

/// Overlap of two disks on the unit sphere, as a percentage of the first
/// ("sun") disk's solid angle.
///
/// `a_sun` and `a_earth` are the apparent angular radii of the two disks and
/// `theta` the angular separation of their centers, all in radians. This is
/// the pure angular form of [`eclipse_percent`], exposed for direct testing
/// against the survey's recorded cases.
pub fn disk_overlap_percent(a_sun: f64, a_earth: f64, theta: f64) -> Result<f64, EclipseError> {
    let sun_solid = std::f64::consts::PI * a_sun * a_sun;

    if a_sun > theta + a_earth {
        // Annular: the Earth disk sits entirely inside the larger Sun disk.
        let earth_solid = std::f64::consts::PI * a_earth * a_earth;
        return Ok(earth_solid / sun_solid * 100.0);
    }
    if theta > a_sun + a_earth || is_close(a_sun + a_earth, theta) {
        return Ok(0.0);
    }
    if a_earth > a_sun + theta || is_close(a_sun + theta, a_earth) {
        return Ok(100.0);
    }

    let digon = lens_area(a_sun, a_earth, theta)?;
    Ok(digon / sun_solid * 100.0)
}

/// Area of the lens-shaped intersection of two small circles on the unit
/// sphere, separated by `theta`.
///
/// Places the first circle's center at the pole, the second at separation
/// `theta` in the x–z plane, finds the two circle-intersection points, and
/// assembles the area from four dihedral angles. The `a < 0` branch handles
/// the intersection chord falling on the far side of the pole.
fn lens_area(a_sun: f64, a_earth: f64, theta: f64) -> Result<f64, EclipseError> {
    let sin_theta = theta.sin();
    if sin_theta == 0.0 {
        return Err(EclipseError::DegenerateGeometry(format!(
            "sin(theta) vanished at theta = {theta}"
        )));
    }

    let a = (a_earth.cos() - a_sun.cos() * theta.cos()) / sin_theta;
    let b_sq = a_sun.sin().powi(2) - a * a;
    if b_sq <= 0.0 {
        return Err(EclipseError::DegenerateGeometry(format!(
            "disks do not intersect: a = {a}, sin(a_sun) = {}",
            a_sun.sin()
        )));
    }
    let b = b_sq.sqrt();

    let p1 = Vector3::new(0.0, 0.0, 1.0);
    let p2 = Vector3::new(sin_theta, 0.0, theta.cos());
    let p3 = Vector3::new(a, -b, a_sun.cos());
    let p4 = Vector3::new(a, b, a_sun.cos());

    let phi1 = dihedral(&p1, &p4, &p3);
    let phi2 = dihedral(&p2, &p4, &p3);
    let psi1 = dihedral(&p4, &p1, &p3);
    let psi2 = dihedral(&p4, &p2, &p3);

    let pi = std::f64::consts::PI;
    let digon = if a < 0.0 {
        (2.0 * pi - phi1) * (1.0 - a_sun.cos()) + phi1 + 2.0 * psi1 - pi
            + phi2 * (1.0 - a_earth.cos())
            - (phi2 + 2.0 * psi2 - pi)
    } else {
        2.0 * pi - 2.0 * (psi1 + psi2) - phi1 * a_sun.cos() - phi2 * a_earth.cos()
    };

    Ok(digon)
}

/// Angle at `p` between the great-circle planes through `q1` and `q2`.
fn dihedral(p: &Vector3, q1: &Vector3, q2: &Vector3) -> f64 {
    let n1 = p.cross(&(q1 - p)).normalize();
    let n2 = p.cross(&(q2 - p)).normalize();
    n1.dot(&n2).clamp(-1.0, 1.0).acos()
}

fn is_close(a: f64, b: f64) -> bool {
    (a - b).abs() <= REL_TOL * a.abs().max(b.abs())
}
