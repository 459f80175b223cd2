//! Beta Thompson Sampling over one KT estimator per arm.
//!
//! The stationary baseline: each arm's reward stream is modelled by a single
//! KT estimator for the whole episode, and actions are drawn by sampling
//! each arm's Beta posterior and playing the argmax.

use rand::rngs::StdRng;
use rand::Rng;
use rand::SeedableRng;
use rand_distr::{Distribution, Gamma};

use crate::kt::KtEstimator;
use crate::policy::BanditPolicy;

/// Draw from Beta(alpha, beta) via the gamma ratio: if `X ~ Gamma(a, 1)` and
/// `Y ~ Gamma(b, 1)` then `X/(X+Y) ~ Beta(a, b)`.
///
/// The ratio is NaN when both draws underflow to zero; that case is retried
/// transparently and terminates with probability 1 for any positive shapes.
pub fn sample_beta<R: Rng>(rng: &mut R, alpha: f64, beta: f64) -> f64 {
    let x_dist = Gamma::new(alpha, 1.0).expect("alpha must be positive and finite");
    let y_dist = Gamma::new(beta, 1.0).expect("beta must be positive and finite");

    loop {
        let x: f64 = x_dist.sample(rng);
        let y: f64 = y_dist.sample(rng);
        let z = x / (x + y);
        if !z.is_nan() {
            return z;
        }
    }
}

/// Seedable vanilla Thompson Sampling.
#[derive(Debug, Clone)]
pub struct ThompsonSampling {
    rng: StdRng,
    model: Vec<KtEstimator>,
}

impl ThompsonSampling {
    pub fn new(seed: u64, n_arms: usize) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            model: vec![KtEstimator::new(); n_arms],
        }
    }
}

impl BanditPolicy for ThompsonSampling {
    fn get_action(&mut self) -> usize {
        let mut best = f64::NEG_INFINITY;
        let mut best_idx = 0;

        for i in 0..self.model.len() {
            let (alpha, beta) = self.model[i].posterior();
            let r = sample_beta(&mut self.rng, alpha, beta);
            if r > best {
                best = r;
                best_idx = i;
            }
        }

        best_idx
    }

    fn update(&mut self, arm: usize, reward: bool) {
        self.model[arm].update(reward);
    }

    fn name(&self) -> &'static str {
        "TS"
    }
}
