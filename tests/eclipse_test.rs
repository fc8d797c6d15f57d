//! Regression and scenario tests for the eclipse calculator.
//!
//! The partial-overlap percentages are recorded fixtures from the campaign's
//! survey scripts; they pin the digon formula as adopted, not an independent
//! re-derivation of the geometry.

use approx::assert_relative_eq;
use streakfit::constants::AU_KM;
use streakfit::{disk_overlap_percent, eclipse_percent, format_eclipse_percent, Vector3};

/// Repository case: disks separated beyond touching.
#[test]
fn test_recorded_case_disjoint() {
    let pct = disk_overlap_percent(0.4, 0.9, 2.0).unwrap();
    assert_eq!(pct, 0.0);
    assert_eq!(format_eclipse_percent(pct), "0%");
}

/// Repository case: partial overlap, positive chord offset.
#[test]
fn test_recorded_case_partial() {
    let pct = disk_overlap_percent(0.349066, 0.418879, 0.523599).unwrap();
    assert_relative_eq!(pct, 24.826613270, epsilon = 1e-6);
    assert_eq!(format_eclipse_percent(pct), "25%");
}

/// Symmetric full overlap: equal radii at zero separation.
#[test]
fn test_symmetric_full_overlap() {
    let pct = disk_overlap_percent(0.01, 0.01, 0.0).unwrap();
    assert_eq!(pct, 100.0);
    assert_eq!(format_eclipse_percent(pct), "100%");
}

/// Separation just beyond touching for equal 0.01 rad disks.
#[test]
fn test_equal_disks_separated() {
    let pct = disk_overlap_percent(0.01, 0.01, 0.05).unwrap();
    assert_eq!(format_eclipse_percent(pct), "0%");
}

/// A satellite directly behind the Earth on the anti-Sun line is fully
/// eclipsed; on the day side it sees the whole Sun.
#[test]
fn test_orbit_night_and_day() {
    let sun = Vector3::new(0.0, 0.0, 0.0);
    let earth = Vector3::new(1.0, 0.0, 0.0);
    let altitude = 7000.0 / AU_KM;

    let night = earth + Vector3::new(altitude, 0.0, 0.0);
    let pct = eclipse_percent(&night, &earth, &sun).unwrap();
    assert_eq!(format_eclipse_percent(pct), "100%");

    let day = earth - Vector3::new(altitude, 0.0, 0.0);
    let pct = eclipse_percent(&day, &earth, &sun).unwrap();
    assert_eq!(format_eclipse_percent(pct), "0%");
}

/// Mid-penumbra: the satellite offset puts the Earth's limb across the
/// center of the solar disk, occluding about half of it.
#[test]
fn test_orbit_penumbra_transit() {
    let sun = Vector3::new(0.0, 0.0, 0.0);
    let earth = Vector3::new(1.0, 0.0, 0.0);
    let sat = earth + Vector3::new(7000.0 / AU_KM, 5141.0 / AU_KM, 0.0);

    let pct = eclipse_percent(&sat, &earth, &sun).unwrap();
    assert_relative_eq!(pct, 50.019352, epsilon = 0.05);
    assert_eq!(format_eclipse_percent(pct), "50%");
}

/// Sweeping a satellite across the shadow edge must produce a monotonically
/// decreasing occlusion with no jumps at the case boundaries.
#[test]
fn test_shadow_crossing_monotonic() {
    let sun = Vector3::new(0.0, 0.0, 0.0);
    let earth = Vector3::new(1.0, 0.0, 0.0);

    let mut prev = f64::INFINITY;
    for i in 0..=400 {
        let y_km = 4500.0 + 1500.0 * i as f64 / 400.0;
        let sat = earth + Vector3::new(7000.0 / AU_KM, y_km / AU_KM, 0.0);
        let pct = eclipse_percent(&sat, &earth, &sun).unwrap();
        assert!((0.0..=100.0).contains(&pct));
        assert!(
            pct <= prev + 1e-6,
            "occlusion increased at y = {y_km} km: {pct} > {prev}"
        );
        prev = pct;
    }
}
