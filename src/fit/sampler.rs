//! Affine-invariant ensemble sampler (Goodman–Weare stretch move).
//!
//! Walkers are updated half-ensemble at a time: each walker in one half
//! proposes a stretch move against a random partner from the other half, so
//! every proposal in a half depends only on the frozen complementary half.
//! That makes the per-walker likelihood evaluations independent, and they
//! fan out over the rayon pool.
//!
//! All randomness is drawn sequentially from one seeded RNG before the
//! parallel phase, so runs are deterministic regardless of thread count.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;

/// Goodman–Weare ensemble sampler over a log-probability function.
pub struct EnsembleSampler<F>
where
    F: Fn(&[f64]) -> f64 + Sync,
{
    ln_prob: F,
    n_walkers: usize,
    dim: usize,
    stretch_scale: f64,
    rng: StdRng,
    positions: Vec<Vec<f64>>,
    ln_probs: Vec<f64>,
    chain: Vec<Vec<Vec<f64>>>,
    ln_prob_chain: Vec<Vec<f64>>,
    accepted: u64,
    proposed: u64,
}

impl<F> EnsembleSampler<F>
where
    F: Fn(&[f64]) -> f64 + Sync,
{
    /// `n_walkers` must be even and at least `2 * dim` for the ensemble to
    /// span the parameter space.
    pub fn new(n_walkers: usize, dim: usize, stretch_scale: f64, seed: u64, ln_prob: F) -> Self {
        assert!(n_walkers % 2 == 0, "walker count must be even");
        assert!(
            n_walkers >= 2 * dim,
            "need at least {} walkers for dimension {dim}",
            2 * dim
        );
        Self {
            ln_prob,
            n_walkers,
            dim,
            stretch_scale,
            rng: StdRng::seed_from_u64(seed),
            positions: Vec::new(),
            ln_probs: Vec::new(),
            chain: Vec::new(),
            ln_prob_chain: Vec::new(),
            accepted: 0,
            proposed: 0,
        }
    }

    /// Set the walker starting positions and evaluate them (in parallel).
    pub fn initialize(&mut self, positions: Vec<Vec<f64>>) {
        assert_eq!(positions.len(), self.n_walkers);
        for p in &positions {
            assert_eq!(p.len(), self.dim);
        }
        let ln_prob = &self.ln_prob;
        self.ln_probs = positions.par_iter().map(|p| ln_prob(p)).collect();
        self.positions = positions;
    }

    /// Advance the ensemble by `n_steps`, appending each step to the chain.
    pub fn run(&mut self, n_steps: usize) {
        assert!(
            !self.positions.is_empty(),
            "sampler must be initialized before running"
        );
        for _ in 0..n_steps {
            let half = self.n_walkers / 2;
            self.update_half(0, half, half, self.n_walkers);
            self.update_half(half, self.n_walkers, 0, half);
            self.chain.push(self.positions.clone());
            self.ln_prob_chain.push(self.ln_probs.clone());
        }
    }

    /// Clear the stored chain and counters, keeping walker positions — used
    /// between the burn-in and production phases.
    pub fn reset(&mut self) {
        self.chain.clear();
        self.ln_prob_chain.clear();
        self.accepted = 0;
        self.proposed = 0;
    }

    fn update_half(&mut self, start: usize, end: usize, comp_start: usize, comp_end: usize) {
        // Draw all randomness up front from the master RNG.
        let a = self.stretch_scale;
        let draws: Vec<(f64, usize, f64)> = (start..end)
            .map(|_| {
                let u: f64 = self.rng.gen();
                let z = ((a - 1.0) * u + 1.0).powi(2) / a;
                let partner = self.rng.gen_range(comp_start..comp_end);
                let accept_u: f64 = self.rng.gen();
                (z, partner, accept_u)
            })
            .collect();

        // Propose and evaluate in parallel against the frozen positions.
        let positions = &self.positions;
        let ln_prob = &self.ln_prob;
        let proposals: Vec<(Vec<f64>, f64)> = draws
            .par_iter()
            .enumerate()
            .map(|(i, &(z, partner, _))| {
                let walker = &positions[start + i];
                let other = &positions[partner];
                let y: Vec<f64> = walker
                    .iter()
                    .zip(other)
                    .map(|(&xk, &xj)| xj + z * (xk - xj))
                    .collect();
                let lp = ln_prob(&y);
                (y, lp)
            })
            .collect();

        // Sequential accept/reject with the pre-drawn uniforms.
        for (i, ((y, lp_y), &(z, _, accept_u))) in
            proposals.into_iter().zip(&draws).enumerate()
        {
            let k = start + i;
            self.proposed += 1;
            let ln_ratio = (self.dim as f64 - 1.0) * z.ln() + lp_y - self.ln_probs[k];
            if ln_ratio > accept_u.ln() {
                self.positions[k] = y;
                self.ln_probs[k] = lp_y;
                self.accepted += 1;
            }
        }
    }

    /// Chain recorded since the last reset, `[step][walker][parameter]`.
    pub fn chain(&self) -> &[Vec<Vec<f64>>] {
        &self.chain
    }

    /// Log-probabilities matching [`Self::chain`], `[step][walker]`.
    pub fn ln_prob_chain(&self) -> &[Vec<f64>] {
        &self.ln_prob_chain
    }

    /// Current walker positions.
    pub fn positions(&self) -> &[Vec<f64>] {
        &self.positions
    }

    /// Chain samples flattened across steps and walkers, grouped per
    /// parameter.
    pub fn flattened(&self) -> Vec<Vec<f64>> {
        let mut flat = vec![Vec::with_capacity(self.chain.len() * self.n_walkers); self.dim];
        for step in &self.chain {
            for walker in step {
                for (p, &v) in walker.iter().enumerate() {
                    flat[p].push(v);
                }
            }
        }
        flat
    }

    /// Fraction of proposals accepted since the last reset.
    pub fn acceptance_fraction(&self) -> f64 {
        if self.proposed == 0 {
            0.0
        } else {
            self.accepted as f64 / self.proposed as f64
        }
    }
}
