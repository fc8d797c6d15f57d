//! Fit orchestration: limiter construction, walker initialization, burn-in
//! and production phases, and point-estimate extraction.

use std::time::Instant;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use crate::likelihood::{ln_prob, LikelihoodContext, ParameterBounds};
use crate::photometry::{pill_mask, zeropoint};
use crate::streak::{ImageSection, Psf, StreakParameters};

use super::sampler::EnsembleSampler;
use super::stats::sigma_clipped_stats;
use super::{FitConfig, FitError, FitPosterior, ParameterEstimate, StreakFitResult, PARAM_NAMES};

const SIGMA_CLIP_MAX_ITERS: usize = 5;

/// Fit a streak model to `section`, starting from `best_guess`.
///
/// `search_radius` gives the per-parameter half-width (order: x, y, flux,
/// length, angle, background) used both to initialize the walker ensemble
/// and as hard likelihood bounds; keep it as tight as confidence allows.
/// The background entry is ignored when `config.fixed_background` is set.
///
/// `total_mag`, when known (simulated or catalog streaks), yields the
/// magnitude zeropoint implied by the fitted flux.
///
/// Blocks until both phases complete. The per-walker likelihood evaluations
/// run on the global rayon pool; everything else is single-threaded.
pub fn fit_streak(
    section: &ImageSection,
    psf: &Psf,
    best_guess: &StreakParameters,
    search_radius: &[f64; 6],
    total_mag: Option<f64>,
    config: &FitConfig,
) -> Result<(StreakFitResult, FitPosterior), FitError> {
    if best_guess.length <= 0.0 {
        return Err(FitError::InvalidLength(best_guess.length));
    }
    if let Psf::Kernel(kernel) = psf {
        let (kh, kw) = kernel.dim();
        if kh % 2 == 0 || kw % 2 == 0 {
            return Err(FitError::EvenKernel(kh, kw));
        }
    }
    let dim = if config.fixed_background.is_some() { 5 } else { 6 };
    if config.n_walkers % 2 != 0 || config.n_walkers < 2 * dim {
        return Err(FitError::TooFewWalkers {
            n_walkers: config.n_walkers,
            dim,
        });
    }
    if config.n_steps == 0 {
        return Err(FitError::EmptyPosterior);
    }

    let (h, w) = section.shape();

    // Restrict the likelihood to a pill around the guessed streak so bright
    // unrelated sources cannot drag the fit.
    let limiter = config.fit_bound.map(|radius| {
        pill_mask(
            (h, w),
            w as f64 / 2.0 + best_guess.x,
            h as f64 / 2.0 + best_guess.y,
            radius,
            best_guess.length,
            best_guess.angle,
        )
    });

    let center = best_guess.to_vector(config.fixed_background.is_some());
    let radius = &search_radius[..dim];
    let bounds = ParameterBounds::around(&center, radius);

    let mut ctx = LikelihoodContext::new(section, psf, limiter.as_ref(), bounds);
    ctx.fixed_background = config.fixed_background;
    ctx.sky_subtracted = config.sky_subtracted;
    ctx.approx = config.approx_likelihood;
    ctx.oversample = config.oversample;

    // Walkers start uniformly within ± radius of the guess.
    let mut init_rng = StdRng::seed_from_u64(config.seed);
    let initial: Vec<Vec<f64>> = (0..config.n_walkers)
        .map(|_| {
            center
                .iter()
                .zip(radius)
                .map(|(c, r)| c + (2.0 * init_rng.gen::<f64>() - 1.0) * r)
                .collect()
        })
        .collect();
    for (i, walker) in initial.iter().enumerate() {
        debug!(
            "walker {i}: {}",
            walker
                .iter()
                .zip(PARAM_NAMES)
                .map(|(v, name)| format!("{name} = {v:.2}"))
                .collect::<Vec<_>>()
                .join(", ")
        );
    }

    let mut sampler = EnsembleSampler::new(
        config.n_walkers,
        dim,
        config.stretch_scale,
        config.seed.wrapping_add(1),
        |theta: &[f64]| ln_prob(theta, &ctx),
    );
    sampler.initialize(initial);

    let t0 = Instant::now();
    sampler.run(config.n_burn);
    debug!("burn-in complete in {:.1?}", t0.elapsed());
    let burn_chain = sampler.chain().to_vec();
    sampler.reset();

    let t1 = Instant::now();
    sampler.run(config.n_steps);
    debug!(
        "production complete in {:.1?}, acceptance {:.2}",
        t1.elapsed(),
        sampler.acceptance_fraction()
    );

    let flat = sampler.flattened();
    let estimates: Vec<ParameterEstimate> = flat
        .iter()
        .map(|samples| {
            let (mean, median, stddev) =
                sigma_clipped_stats(samples, config.sigma_clip, SIGMA_CLIP_MAX_ITERS);
            ParameterEstimate {
                mean,
                median,
                stddev,
            }
        })
        .collect();

    let background = match config.fixed_background {
        Some(b) => ParameterEstimate {
            mean: b,
            median: b,
            stddev: 0.0,
        },
        None => estimates[5],
    };

    let flux = estimates[2];
    let result = StreakFitResult {
        x: estimates[0],
        y: estimates[1],
        flux,
        length: estimates[3],
        angle: estimates[4],
        background,
        magzero: total_mag.map(|mag| zeropoint(mag, flux.mean, flux.stddev)),
    };

    let posterior = FitPosterior {
        burn_chain,
        chain: sampler.chain().to_vec(),
        flat,
        acceptance: sampler.acceptance_fraction(),
    };

    Ok((result, posterior))
}
