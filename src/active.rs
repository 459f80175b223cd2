//! Bandit policies driven by the APTW segment posterior.
//!
//! [`ActivePtwPolicy`] is posterior sampling against the partition mixture:
//! first a segmentation level is drawn from the level posterior, then each
//! arm's Beta posterior *conditional on that level* is sampled and the
//! argmax played. [`ParanoidPtwPolicy`] layers forced exploration on top,
//! at a rate tied to the sampled segment length: a short segment means the
//! model believes a change just happened and has little data, so it hedges.

use rand::rngs::StdRng;
use rand::Rng;
use rand::SeedableRng;

use crate::policy::BanditPolicy;
use crate::ptw::ActivePtw;
use crate::thompson::sample_beta;

/// Time horizon exponent: policies support up to `2^30` steps.
const PTW_DEPTH: usize = 30;

/// Thompson-style sampling from the APTW posterior.
#[derive(Debug, Clone)]
pub struct ActivePtwPolicy {
    rng: StdRng,
    model: ActivePtw,
    arms: usize,
}

impl ActivePtwPolicy {
    pub fn new(seed: u64, n_arms: usize) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            model: ActivePtw::new(PTW_DEPTH, n_arms),
            arms: n_arms,
        }
    }

    /// Posterior over segmentation levels of the underlying mixture.
    pub fn level_posterior(&self) -> Vec<f64> {
        self.model.level_posterior()
    }

    /// Sample a segmentation level proportionally to the level posterior.
    ///
    /// The entries are treated as unnormalised weights; if the CDF walk
    /// falls through (rounding, or an all-zero posterior) the finest level
    /// is used.
    pub fn sample_level(&mut self) -> usize {
        let weights = self.model.level_posterior();
        let total: f64 = weights.iter().sum();

        let r: f64 = self.rng.random::<f64>() * total;
        let mut cdf = 0.0;
        for (level, w) in weights.iter().enumerate() {
            cdf += w;
            if r < cdf {
                return level;
            }
        }

        // numerical fallback
        self.model.depth()
    }

    /// Sample each arm's Beta posterior conditional on `level` and return
    /// the argmax.
    pub fn best_arm_at_level(&mut self, level: usize) -> usize {
        let mut best = f64::NEG_INFINITY;
        let mut best_idx = 0;

        for i in 0..self.arms {
            let (alpha, beta) = self.model.posterior(level, i);
            let r = sample_beta(&mut self.rng, alpha, beta);
            if r > best {
                best = r;
                best_idx = i;
            }
        }

        best_idx
    }

    /// The underlying mixture, for inspection.
    pub fn model(&self) -> &ActivePtw {
        &self.model
    }
}

impl BanditPolicy for ActivePtwPolicy {
    fn get_action(&mut self) -> usize {
        let level = self.sample_level();
        self.best_arm_at_level(level)
    }

    fn update(&mut self, arm: usize, reward: bool) {
        self.model.update(reward, arm);
    }

    fn name(&self) -> &'static str {
        "ActivePTW"
    }
}

/// ActivePTW plus forced exploration.
///
/// After sampling a segment level, the log2 segment length `k` is clipped to
/// `ln(trials + 1) + 1` and a uniformly random arm is played with
/// probability `2^-k * (2^(k/2) - k ln 2)`, clamped to `[0, 1]`.
#[derive(Debug, Clone)]
pub struct ParanoidPtwPolicy {
    rng: StdRng,
    arms: usize,
    aptw: ActivePtwPolicy,
    trials: u64,
}

impl ParanoidPtwPolicy {
    pub fn new(seed: u64, n_arms: usize) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            arms: n_arms,
            aptw: ActivePtwPolicy::new(seed, n_arms),
            trials: 0,
        }
    }

    /// Forced-exploration rate for a segment of length `2^k`.
    fn explore_prob(log2_segment_size: u64) -> f64 {
        let k = log2_segment_size as f64;
        let prob = 2.0_f64.powf(-k) * (2.0_f64.powf(k / 2.0) - k * 2.0_f64.ln());
        prob.clamp(0.0, 1.0)
    }
}

impl BanditPolicy for ParanoidPtwPolicy {
    fn get_action(&mut self) -> usize {
        let level = self.aptw.sample_level();

        // clip the sampled segment size so the exploration rate cannot be
        // driven by segments longer than the elapsed time supports
        let mut k = (self.aptw.model().depth() - level) as u64;
        let clip = ((self.trials + 1) as f64).ln() + 1.0;
        while k as f64 > clip {
            k -= 1;
        }

        if self.rng.random::<f64>() < Self::explore_prob(k) {
            return self.rng.random_range(0..self.arms);
        }

        self.aptw.best_arm_at_level(level)
    }

    fn update(&mut self, arm: usize, reward: bool) {
        self.aptw.update(arm, reward);
        self.trials += 1;
    }

    fn name(&self) -> &'static str {
        "ParanoidPTW"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn actions_stay_in_range() {
        let mut p = ActivePtwPolicy::new(3, 4);
        for t in 0..100 {
            let arm = p.get_action();
            assert!(arm < 4);
            p.update(arm, t % 4 == 0);
        }
        assert_eq!(p.model().steps(), 100);
    }

    #[test]
    fn sampled_levels_are_valid() {
        let mut p = ActivePtwPolicy::new(11, 2);
        for t in 0..20 {
            p.update(t % 2, t % 3 == 0);
            assert!(p.sample_level() <= PTW_DEPTH);
        }
    }

    #[test]
    fn same_seed_reproduces_trajectory() {
        let mut a = ActivePtwPolicy::new(77, 3);
        let mut b = ActivePtwPolicy::new(77, 3);
        for t in 0..50 {
            let x = a.get_action();
            let y = b.get_action();
            assert_eq!(x, y, "diverged at step {t}");
            a.update(x, t % 2 == 0);
            b.update(y, t % 2 == 0);
        }
    }

    #[test]
    fn explore_prob_is_a_probability_and_decays() {
        assert_eq!(ParanoidPtwPolicy::explore_prob(0), 1.0);
        let mut prev = 1.0;
        for k in 1..30 {
            let p = ParanoidPtwPolicy::explore_prob(k);
            assert!((0.0..=1.0).contains(&p), "explore({k}) = {p}");
            assert!(p <= prev, "explore rate must not grow with segment size");
            prev = p;
        }
    }

    #[test]
    fn paranoid_concentrates_on_the_paying_arm() {
        let mut p = ParanoidPtwPolicy::new(21, 2);
        for _ in 0..400 {
            let arm = p.get_action();
            p.update(arm, arm == 1);
        }
        let picks = (0..100).filter(|_| p.get_action() == 1).count();
        // forced exploration keeps some residual mass on arm 0
        assert!(picks > 60, "arm 1 picked only {picks}/100 times");
    }
}
