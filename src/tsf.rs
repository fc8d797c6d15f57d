//! Trailed-spread-function (TSF) generation.
//!
//! A streak is the image of a point source that moved during the exposure:
//! a PSF integrated along a line segment. The generator renders the segment
//! on an oversampled canvas (a hard-edged 1-pixel line aliases badly at
//! native resolution), applies the PSF, block-sums back down and normalizes
//! to unit sum so the model scales linearly with flux.
//!
//! For a Gaussian PSF the convolution is analytic: a Gaussian cross-section
//! across the line body, with a point-source Gaussian cap at each endpoint
//! attached by pixelwise maximum. An explicit kernel is applied by FFT
//! convolution of the binary line mask.

use std::cell::RefCell;

use ndarray::Array2;
use rustfft::num_complex::Complex;
use rustfft::FftPlanner;

use crate::streak::Psf;

/// Default oversampling factor. The generator sits in the innermost MCMC
/// loop, so this trades aliasing fidelity against runtime.
pub const DEFAULT_OVERSAMPLE: usize = 3;

/// Pixels within this distance of the segment (in oversampled units) form
/// the line body. Smaller values punch holes in the line; larger ones
/// distort the PSF.
const LINE_HALF_WIDTH: f64 = 0.7;

/// Values below this after downsampling are numerical residue and zeroed.
const CLEANUP_THRESHOLD: f64 = 1e-10;

/// Generate a normalized TSF on a canvas of `shape` (rows, columns).
///
/// The segment of `length` pixels at `angle` (clockwise from horizontal,
/// radians) is centered at the canvas center plus `(x_offset, y_offset)`
/// (`+x` right, `+y` down). The result sums to 1, or is identically zero if
/// the segment misses the canvas entirely.
pub fn generate_tsf(
    shape: (usize, usize),
    x_offset: f64,
    y_offset: f64,
    psf: &Psf,
    length: f64,
    angle: f64,
    oversample: usize,
) -> Array2<f64> {
    assert!(length >= 0.0, "streak length must be non-negative");
    assert!(oversample >= 1, "oversample factor must be at least 1");
    psf.validate();

    let (h, w) = shape;
    let os = oversample as f64;

    // Endpoints in native pixel coordinates, symmetric about the offset center.
    let cx = w as f64 / 2.0 + x_offset;
    let cy = h as f64 / 2.0 + y_offset;
    let dx = length / 2.0 * angle.cos();
    let dy = length / 2.0 * angle.sin();

    // Native coordinate c covers oversampled block [c*os, (c+1)*os), whose
    // center is c*os + (os-1)/2.
    let to_os = |c: f64| c * os + (os - 1.0) / 2.0;
    let (x1, y1) = (to_os(cx - dx), to_os(cy - dy));
    let (x2, y2) = (to_os(cx + dx), to_os(cy + dy));

    let big_shape = (h * oversample, w * oversample);
    let seg = Segment::new(x1, y1, x2, y2);

    let mut out = match psf {
        Psf::Gaussian(sigma) => {
            let s = sigma * os;
            let amp = 1.0 / ((2.0 * std::f64::consts::PI).sqrt() * s);
            let smooth = Array2::from_shape_fn(big_shape, |(r, c)| {
                let (px, py) = (c as f64, r as f64);
                let (d, axial) = seg.distance(px, py);
                let body = if axial {
                    amp * (-0.5 * d * d / (s * s)).exp()
                } else {
                    0.0
                };
                // Round the line ends with point-source Gaussians at each
                // endpoint, attached by taking the pixelwise maximum.
                let r1 = (px - x1).powi(2) + (py - y1).powi(2);
                let r2 = (px - x2).powi(2) + (py - y2).powi(2);
                let cap1 = amp * (-0.5 * r1 / (s * s)).exp();
                let cap2 = amp * (-0.5 * r2 / (s * s)).exp();
                body.max(cap1).max(cap2)
            });
            block_sum(&smooth, oversample)
        }
        Psf::Kernel(kernel) => {
            let mask = Array2::from_shape_fn(big_shape, |(r, c)| {
                let (px, py) = (c as f64, r as f64);
                let (d, axial) = seg.distance(px, py);
                if axial && d <= LINE_HALF_WIDTH {
                    1.0
                } else {
                    0.0
                }
            });
            let native = block_sum(&mask, oversample);
            fft_convolve_same(&native, kernel)
        }
    };

    out.mapv_inplace(|v| if v < CLEANUP_THRESHOLD { 0.0 } else { v });

    let total = out.sum();
    if total > 0.0 {
        out /= total;
    }
    out
}

/// A line segment with precomputed direction, supporting perpendicular
/// distance plus an axial in-extent test.
struct Segment {
    x1: f64,
    y1: f64,
    ux: f64,
    uy: f64,
    len: f64,
}

impl Segment {
    fn new(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        let (dx, dy) = (x2 - x1, y2 - y1);
        let len = (dx * dx + dy * dy).sqrt();
        let (ux, uy) = if len > 0.0 {
            (dx / len, dy / len)
        } else {
            (1.0, 0.0)
        };
        Self { x1, y1, ux, uy, len }
    }

    /// Perpendicular distance from `(px, py)` to the segment's line, and
    /// whether the point projects onto the finite extent. A zero-length
    /// segment degenerates to radial distance from the single point.
    fn distance(&self, px: f64, py: f64) -> (f64, bool) {
        let (rx, ry) = (px - self.x1, py - self.y1);
        if self.len == 0.0 {
            return ((rx * rx + ry * ry).sqrt(), true);
        }
        let t = rx * self.ux + ry * self.uy;
        let d = (rx * self.uy - ry * self.ux).abs();
        (d, (0.0..=self.len).contains(&t))
    }
}

/// Downsample by summing `factor`×`factor` blocks, preserving integrated
/// intensity. The input dimensions must be exact multiples of `factor`.
fn block_sum(big: &Array2<f64>, factor: usize) -> Array2<f64> {
    if factor == 1 {
        return big.clone();
    }
    let (bh, bw) = big.dim();
    let mut out = Array2::zeros((bh / factor, bw / factor));
    for (dst, block) in out.iter_mut().zip(big.exact_chunks((factor, factor))) {
        *dst = block.sum();
    }
    out
}

thread_local! {
    // FftPlanner caches plans by length, so reusing one instance per thread
    // makes repeated model evaluations cheap.
    static PLANNER: RefCell<FftPlanner<f64>> = RefCell::new(FftPlanner::new());
}

/// FFT-based 2-D convolution, "same" output size, kernel centered.
fn fft_convolve_same(image: &Array2<f64>, kernel: &Array2<f64>) -> Array2<f64> {
    let (h, w) = image.dim();
    let (kh, kw) = kernel.dim();
    let (fh, fw) = (h + kh - 1, w + kw - 1);

    let mut a = Array2::<Complex<f64>>::zeros((fh, fw));
    for ((r, c), &v) in image.indexed_iter() {
        a[[r, c]] = Complex::new(v, 0.0);
    }
    let mut k = Array2::<Complex<f64>>::zeros((fh, fw));
    for ((r, c), &v) in kernel.indexed_iter() {
        k[[r, c]] = Complex::new(v, 0.0);
    }

    fft2(&mut a, false);
    fft2(&mut k, false);
    a.zip_mut_with(&k, |av, kv| *av *= *kv);
    fft2(&mut a, true);

    let scale = 1.0 / (fh * fw) as f64;
    Array2::from_shape_fn((h, w), |(r, c)| a[[r + kh / 2, c + kw / 2]].re * scale)
}

/// In-place 2-D FFT: rows then columns.
fn fft2(data: &mut Array2<Complex<f64>>, inverse: bool) {
    let (h, w) = data.dim();
    PLANNER.with(|planner| {
        let mut planner = planner.borrow_mut();
        let row_fft = if inverse {
            planner.plan_fft_inverse(w)
        } else {
            planner.plan_fft_forward(w)
        };
        for mut row in data.rows_mut() {
            let mut buf = row.to_vec();
            row_fft.process(&mut buf);
            for (dst, v) in row.iter_mut().zip(buf) {
                *dst = v;
            }
        }
        let col_fft = if inverse {
            planner.plan_fft_inverse(h)
        } else {
            planner.plan_fft_forward(h)
        };
        for mut col in data.columns_mut() {
            let mut buf = col.to_vec();
            col_fft.process(&mut buf);
            for (dst, v) in col.iter_mut().zip(buf) {
                *dst = v;
            }
        }
    });
}
