//! Core value types for the streak fit engine: the parameter vector being
//! fit, the image cutout being fit to, and the point-spread function.

use ndarray::Array2;

/// The six streak model parameters.
///
/// `x` and `y` are offsets of the streak centroid from the cutout center, in
/// pixels (`+x` right, `+y` down). `angle` is measured clockwise from
/// horizontal in radians. `flux` is the total integrated flux of the streak
/// and `background` the local sky level per pixel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StreakParameters {
    pub x: f64,
    pub y: f64,
    pub flux: f64,
    /// Unconvolved streak length in pixels.
    pub length: f64,
    /// Clockwise angle from horizontal, radians.
    pub angle: f64,
    /// Sky background level per pixel.
    pub background: f64,
}

impl StreakParameters {
    /// Flatten into the sampler's parameter space. With a fixed background
    /// the space is 5-dimensional and `background` is omitted.
    pub fn to_vector(&self, fixed_background: bool) -> Vec<f64> {
        if fixed_background {
            vec![self.x, self.y, self.flux, self.length, self.angle]
        } else {
            vec![
                self.x,
                self.y,
                self.flux,
                self.length,
                self.angle,
                self.background,
            ]
        }
    }

    /// Rebuild from a sampler vector. `background` supplies the fixed value
    /// for the 5-dimensional case and is ignored when the vector carries its
    /// own sixth element.
    pub fn from_vector(theta: &[f64], background: f64) -> Self {
        Self {
            x: theta[0],
            y: theta[1],
            flux: theta[2],
            length: theta[3],
            angle: theta[4],
            background: if theta.len() > 5 { theta[5] } else { background },
        }
    }
}

/// An image cutout around a candidate streak, plus its 1-sigma noise level.
///
/// Read-only for the duration of a fit; the engine never mutates the pixels.
#[derive(Debug, Clone)]
pub struct ImageSection {
    pub pixels: Array2<f64>,
    /// 1-sigma read/sky noise in the cutout, in counts.
    pub noise_sigma: f64,
}

impl ImageSection {
    pub fn new(pixels: Array2<f64>, noise_sigma: f64) -> Self {
        Self {
            pixels,
            noise_sigma,
        }
    }

    /// (rows, columns) of the cutout.
    pub fn shape(&self) -> (usize, usize) {
        self.pixels.dim()
    }
}

/// Point-spread function of the image.
#[derive(Debug, Clone)]
pub enum Psf {
    /// Sigma of a circular Gaussian PSF, in pixels.
    Gaussian(f64),
    /// Explicit 2-D kernel. Side lengths must be odd so the kernel has a
    /// well-defined center pixel.
    Kernel(Array2<f64>),
}

impl Psf {
    /// Panics if the variant's invariants are violated (non-positive sigma,
    /// even kernel side length). Called once at fit entry.
    pub(crate) fn validate(&self) {
        match self {
            Psf::Gaussian(sigma) => {
                assert!(*sigma > 0.0, "Gaussian PSF sigma must be positive");
            }
            Psf::Kernel(kernel) => {
                let (kh, kw) = kernel.dim();
                assert!(
                    kh % 2 == 1 && kw % 2 == 1,
                    "PSF kernel side lengths must be odd, got {kh}x{kw}"
                );
            }
        }
    }
}
