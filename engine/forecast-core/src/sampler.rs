//! Correlated sampling via a Gaussian copula
//!
//! Standard normals are drawn per trial, correlated with the Cholesky factor
//! of the (normal-space) correlation matrix, pushed through the normal CDF to
//! uniforms and finally through each player's inverse CDF.
//!
//! Trials are produced in fixed-size chunks. Every chunk owns its own ChaCha8
//! stream seeded from `(seed, scope, chunk)`, so the output does not depend on
//! how rayon schedules the chunks.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, StandardNormal};
use rayon::prelude::*;
use siphasher::sip::SipHasher13;
use std::hash::{Hash, Hasher};

use crate::config::CorrelationConfig;
use crate::context::TrialPlan;
use crate::control::RunControl;
use crate::correlation::CorrelationMatrix;
use crate::distribution::{standard_normal_cdf, DistributionParams};
use crate::error::{ForecastError, Result};
use crate::linalg;

const STREAM_KEY: u64 = 0x6a09_e667_f3bc_c908;

/// Derive a sub-seed for a named domain and index
pub fn derive_seed(seed: u64, domain: &str, index: u64) -> u64 {
    let mut hasher = SipHasher13::new_with_keys(seed, STREAM_KEY);
    domain.hash(&mut hasher);
    index.hash(&mut hasher);
    hasher.finish()
}

/// Seed of the RNG stream for one chunk of one sampling scope
pub fn stream_seed(seed: u64, scope: u64, chunk: u64) -> u64 {
    let mut hasher = SipHasher13::new_with_keys(seed, STREAM_KEY);
    scope.hash(&mut hasher);
    chunk.hash(&mut hasher);
    hasher.finish()
}

/// RNG for one chunk of one sampling scope
pub fn chunk_rng(seed: u64, scope: u64, chunk: u64) -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(stream_seed(seed, scope, chunk))
}

/// Map a target rank correlation to the normal-space correlation that
/// produces it under a Gaussian copula
pub fn copula_adjust(rho: f64) -> f64 {
    2.0 * (std::f64::consts::PI * rho / 6.0).sin()
}

/// Split `n_trials` into `(chunk index, start, len)` triples
pub fn chunk_ranges(n_trials: usize, chunk_size: usize) -> Vec<(u64, usize, usize)> {
    let chunk_size = chunk_size.max(1);
    (0..n_trials.div_ceil(chunk_size))
        .map(|c| {
            let start = c * chunk_size;
            (c as u64, start, chunk_size.min(n_trials - start))
        })
        .collect()
}

/// Sampler for a fixed set of players with fitted marginals
#[derive(Debug, Clone)]
pub struct CorrelatedSampler {
    dim: usize,
    lower: Vec<f64>,
    params: Vec<DistributionParams>,
    jitter: f64,
}

impl CorrelatedSampler {
    /// Prepare a sampler; `params[i]` is the marginal of the matrix's `i`th player
    pub fn new(
        matrix: &CorrelationMatrix,
        params: Vec<DistributionParams>,
        config: &CorrelationConfig,
    ) -> Result<Self> {
        let dim = matrix.dim();
        if params.len() != dim {
            return Err(ForecastError::InvalidInput(format!(
                "{} marginals supplied for a {dim}x{dim} correlation matrix",
                params.len()
            )));
        }

        let mut normal = matrix.values().to_vec();
        if config.copula_adjustment {
            for i in 0..dim {
                for j in 0..dim {
                    if i != j {
                        normal[i * dim + j] = copula_adjust(normal[i * dim + j]);
                    }
                }
            }
            linalg::clip_to_correlation(&mut normal, dim, config.min_eigenvalue);
        }

        let (lower, jitter) = linalg::cholesky_with_jitter(&normal, dim, config.jitter_attempts)?;
        Ok(Self { dim, lower, params, jitter })
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Jitter applied to make the factorization succeed (0 when none)
    pub fn jitter(&self) -> f64 {
        self.jitter
    }

    /// Draw `plan.n_trials` trials; returns one score vector per player
    pub fn sample(&self, plan: &TrialPlan, scope: u64, control: &RunControl) -> Result<Vec<Vec<f64>>> {
        let chunks: Vec<Vec<f64>> = chunk_ranges(plan.n_trials, plan.chunk_size)
            .into_par_iter()
            .map(|(chunk, _, len)| {
                control.checkpoint()?;
                Ok(self.sample_chunk(plan.seed, scope, chunk, len))
            })
            .collect::<Result<_>>()?;

        let mut scores = vec![Vec::with_capacity(plan.n_trials); self.dim];
        for block in &chunks {
            // block is trial-major: [trial][player]
            for trial in block.chunks_exact(self.dim.max(1)) {
                for (player, value) in trial.iter().enumerate() {
                    scores[player].push(*value);
                }
            }
        }
        Ok(scores)
    }

    fn sample_chunk(&self, seed: u64, scope: u64, chunk: u64, len: usize) -> Vec<f64> {
        let n = self.dim;
        let mut rng = chunk_rng(seed, scope, chunk);
        let mut z = vec![0.0; n];
        let mut out = Vec::with_capacity(len * n);

        for _ in 0..len {
            for zi in z.iter_mut() {
                *zi = StandardNormal.sample(&mut rng);
            }
            for i in 0..n {
                let row = &self.lower[i * n..i * n + i + 1];
                let x: f64 = row.iter().zip(&z[..=i]).map(|(l, zj)| l * zj).sum();
                out.push(self.params[i].inverse_cdf(standard_normal_cdf(x)));
            }
        }
        out
    }
}
