//! Objective functions for streak fitting: chi-squared and Poisson
//! log-likelihood.
//!
//! Both build the model `flux·TSF + background` and compare it to the cutout
//! over an optional boolean "limiter" mask, so pixels far from the candidate
//! streak (field stars, cosmic rays) contribute nothing. Out-of-bounds
//! parameter proposals are soft-rejected with `-inf` — normal sampler control
//! flow, not an error. NaN from degenerate log/factorial evaluations is
//! replaced by a large-magnitude sentinel so the sampler stays numerically
//! stable without crashing.

use ndarray::Array2;

use crate::streak::{ImageSection, Psf, StreakParameters};
use crate::tsf::generate_tsf;

/// Sentinel magnitude substituted for non-finite likelihood terms.
const NAN_SENTINEL: f64 = 1e20;

/// Per-parameter lower/upper bounds confining the sampler.
#[derive(Debug, Clone)]
pub struct ParameterBounds(pub Vec<(f64, f64)>);

impl ParameterBounds {
    /// Bounds of `center[i] ± radius[i]` per parameter.
    pub fn around(center: &[f64], radius: &[f64]) -> Self {
        assert_eq!(
            center.len(),
            radius.len(),
            "bounds radius must match parameter dimension"
        );
        Self(
            center
                .iter()
                .zip(radius)
                .map(|(c, r)| (c - r, c + r))
                .collect(),
        )
    }

    pub fn contains(&self, theta: &[f64]) -> bool {
        theta
            .iter()
            .zip(&self.0)
            .all(|(v, &(lo, hi))| *v >= lo && *v <= hi)
    }
}

/// Everything the sampler needs to evaluate one parameter vector.
///
/// All fields are read-only references, so evaluations are freely
/// parallelizable across walkers.
pub struct LikelihoodContext<'a> {
    pub section: &'a ImageSection,
    pub psf: &'a Psf,
    pub limiter: Option<&'a Array2<bool>>,
    pub bounds: ParameterBounds,
    /// When set, the parameter space is 5-dimensional and this background
    /// is used for every model evaluation.
    pub fixed_background: Option<f64>,
    /// Whether the cutout has had its sky background subtracted; if so the
    /// squared read noise is added back to both model and data so the
    /// Poisson likelihood sees non-negative counts.
    pub sky_subtracted: bool,
    /// Use Stirling's approximation for the factorial term (avoids overflow
    /// at high counts).
    pub approx: bool,
    pub oversample: usize,
}

impl<'a> LikelihoodContext<'a> {
    pub fn new(
        section: &'a ImageSection,
        psf: &'a Psf,
        limiter: Option<&'a Array2<bool>>,
        bounds: ParameterBounds,
    ) -> Self {
        if let Some(mask) = limiter {
            assert_eq!(
                mask.dim(),
                section.pixels.dim(),
                "limiter mask shape must match the image section"
            );
        }
        Self {
            section,
            psf,
            limiter,
            bounds,
            fixed_background: None,
            sky_subtracted: true,
            approx: false,
            oversample: crate::tsf::DEFAULT_OVERSAMPLE,
        }
    }

    pub fn evaluate(&self, theta: &[f64]) -> f64 {
        ln_prob(theta, self)
    }
}

/// Poisson log-likelihood of a parameter vector against the cutout.
///
/// Returns `-inf` for proposals outside the bounds. Otherwise sums
/// `observed·ln(expected) − expected − ln(observed!)` over the limiter, with
/// Stirling's approximation replacing the factorial when `ctx.approx` is set.
pub fn ln_prob(theta: &[f64], ctx: &LikelihoodContext) -> f64 {
    if !ctx.bounds.contains(theta) {
        return f64::NEG_INFINITY;
    }

    let p = StreakParameters::from_vector(theta, ctx.fixed_background.unwrap_or(0.0));
    // The sampler walks a continuous length; the model snaps to whole pixels.
    let length = p.length.floor();
    if length < 0.0 {
        return f64::NEG_INFINITY;
    }

    let tsf = generate_tsf(
        ctx.section.shape(),
        p.x,
        p.y,
        ctx.psf,
        length,
        p.angle,
        ctx.oversample,
    );

    let noise_sq = ctx.section.noise_sigma * ctx.section.noise_sigma;
    let offset = if ctx.sky_subtracted { noise_sq } else { 0.0 };

    let mut sum = 0.0;
    for ((idx, &t), &pixel) in tsf.indexed_iter().zip(ctx.section.pixels.iter()) {
        if let Some(mask) = ctx.limiter {
            if !mask[idx] {
                continue;
            }
        }
        let expected = p.flux * t + p.background + offset;
        let observed = (pixel + offset).trunc();

        let term = if ctx.approx {
            let v = (expected - observed) + observed * (observed / expected).ln();
            -sanitize(v, NAN_SENTINEL)
        } else {
            let v = observed * expected.ln() - expected - ln_factorial(observed);
            sanitize(v, -NAN_SENTINEL)
        };
        sum += term;
    }
    sum
}

/// Chi-squared of a parameter set against the cutout, with per-pixel
/// variance `flux·TSF + noise²` (Poisson signal plus read noise).
///
/// A fixed-background fit simply carries the fixed value in
/// `params.background`; the objective is identical.
pub fn chi_squared(
    params: &StreakParameters,
    section: &ImageSection,
    psf: &Psf,
    limiter: Option<&Array2<bool>>,
) -> f64 {
    if let Some(mask) = limiter {
        assert_eq!(
            mask.dim(),
            section.pixels.dim(),
            "limiter mask shape must match the image section"
        );
    }
    let length = params.length.floor().max(0.0);
    let tsf = generate_tsf(
        section.shape(),
        params.x,
        params.y,
        psf,
        length,
        params.angle,
        crate::tsf::DEFAULT_OVERSAMPLE,
    );
    let noise_sq = section.noise_sigma * section.noise_sigma;

    let mut sum = 0.0;
    for ((idx, &t), &pixel) in tsf.indexed_iter().zip(section.pixels.iter()) {
        if let Some(mask) = limiter {
            if !mask[idx] {
                continue;
            }
        }
        let model = params.flux * t + params.background;
        let var = params.flux * t + noise_sq;
        sum += (model - pixel) * (model - pixel) / var;
    }
    sum
}

fn sanitize(v: f64, sentinel: f64) -> f64 {
    if v.is_finite() {
        v
    } else {
        sentinel
    }
}

/// `ln(n!)` for non-negative integral `n` (as f64). Exact summation for
/// small `n`, Stirling's series beyond. Negative input yields NaN, which the
/// caller maps to the sentinel.
fn ln_factorial(n: f64) -> f64 {
    if n < 0.0 {
        return f64::NAN;
    }
    if n < 2.0 {
        return 0.0;
    }
    if n <= 20.0 {
        let mut acc = 0.0;
        let mut k = 2.0;
        while k <= n {
            acc += k.ln();
            k += 1.0;
        }
        return acc;
    }
    let inv = 1.0 / n;
    n * n.ln() - n + 0.5 * (2.0 * std::f64::consts::PI * n).ln() + inv / 12.0
        - inv * inv * inv / 360.0
}
