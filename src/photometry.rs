//! Pill-aperture photometry.
//!
//! A streak's photometric aperture is a stadium: a rectangle of width `2r`
//! and length `L`, capped by two semicircles of radius `r`, rotated to the
//! streak's angle. Flux is the plain sum of pixels inside, with Poisson
//! statistics for the uncertainty.

use ndarray::Array2;
use tracing::warn;

/// Flux measurement through a pill aperture.
#[derive(Debug, Clone, Copy)]
pub struct PillPhotometry {
    /// Summed counts inside the aperture.
    pub flux: f64,
    /// `sqrt(flux + N·sigma_read²)` — Poisson plus read noise over N pixels.
    pub flux_err: f64,
    /// Number of pixels inside the aperture.
    pub n_pixels: usize,
}

/// Binary stadium mask over an image of `shape` (rows, columns).
///
/// `(x_c, y_c)` is the pill centroid in absolute pixel coordinates
/// (`x` = column, `y` = row), `radius` the cap radius (half the pill width),
/// `length` the rectangular section's length, and `angle` the clockwise
/// angle from horizontal in radians. Total extent along the long axis is
/// `length + 2·radius`.
pub fn pill_mask(
    shape: (usize, usize),
    x_c: f64,
    y_c: f64,
    radius: f64,
    length: f64,
    angle: f64,
) -> Array2<bool> {
    let (cos_a, sin_a) = (angle.cos(), angle.sin());
    let half = length / 2.0;

    Array2::from_shape_fn(shape, |(r, c)| {
        let dx = c as f64 - x_c;
        let dy = r as f64 - y_c;
        // Rotated coordinates: u along the streak, v across it
        let u = dx * cos_a + dy * sin_a;
        let v = -dx * sin_a + dy * cos_a;

        if v.abs() > radius {
            return false;
        }
        if u.abs() <= half {
            return true;
        }
        // Semicircular caps beyond either end of the rectangle
        let cap_u = u.abs() - half;
        (cap_u * cap_u + v * v).sqrt() <= radius
    })
}

/// Pixels of `mask` lying on its boundary: masked pixels with at least one
/// unmasked 4-connected neighbor (array borders count as unmasked).
/// Returned as `(column, row)` pairs for plotting.
pub fn edge_pixels(mask: &Array2<bool>) -> Vec<(usize, usize)> {
    let (h, w) = mask.dim();
    let mut edges = Vec::new();
    for ((r, c), &inside) in mask.indexed_iter() {
        if !inside {
            continue;
        }
        let interior = r > 0
            && r + 1 < h
            && c > 0
            && c + 1 < w
            && mask[[r - 1, c]]
            && mask[[r + 1, c]]
            && mask[[r, c - 1]]
            && mask[[r, c + 1]];
        if !interior {
            edges.push((c, r));
        }
    }
    edges
}

/// Sum the masked pixels and attach a Poisson + read-noise uncertainty.
///
/// If the mask and image shapes disagree (e.g. a comparison frame of a
/// different size), both are truncated to the common overlapping region;
/// this is deliberate leniency and is logged.
pub fn pill_photometry(
    image: &Array2<f64>,
    mask: &Array2<bool>,
    noise_sigma: f64,
) -> PillPhotometry {
    let (ih, iw) = image.dim();
    let (mh, mw) = mask.dim();
    let (h, w) = (ih.min(mh), iw.min(mw));
    if (ih, iw) != (mh, mw) {
        warn!(
            "mask shape {:?} != image shape {:?}; truncating to {:?}",
            (mh, mw),
            (ih, iw),
            (h, w)
        );
    }

    let mut flux = 0.0;
    let mut n_pixels = 0usize;
    for r in 0..h {
        for c in 0..w {
            if mask[[r, c]] {
                flux += image[[r, c]];
                n_pixels += 1;
            }
        }
    }

    let variance = flux + n_pixels as f64 * noise_sigma * noise_sigma;
    PillPhotometry {
        flux,
        flux_err: variance.max(0.0).sqrt(),
        n_pixels,
    }
}

/// Magnitude zeropoint implied by a measured flux for a source of known
/// total magnitude: `(zeropoint, zeropoint_err)`.
pub fn zeropoint(total_mag: f64, flux: f64, flux_err: f64) -> (f64, f64) {
    (
        total_mag + 2.5 * flux.log10(),
        2.5 / std::f64::consts::LN_10 * flux_err / flux,
    )
}
