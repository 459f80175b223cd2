//! The UCB family: UCB1, KL-UCB, and Sliding-Window UCB.
//!
//! All three share the same skeleton: while any arm is unvisited, pick one
//! of the unvisited arms uniformly at random; afterwards play the argmax of
//! the per-arm score with a first-encountered-maximum tie-break. They differ
//! only in the score and in what "visited" means (SW-UCB forgets).

use rand::rngs::StdRng;
use rand::Rng;
use rand::SeedableRng;
use std::collections::VecDeque;

use crate::logmath::bernoulli_rel_entropy;
use crate::policy::BanditPolicy;

/// Bisection precision for the KL-UCB upper bound.
const KL_UCB_EPS: f64 = 1.0e-8;

fn unvisited_arms(visits: &[f64]) -> Vec<usize> {
    visits
        .iter()
        .enumerate()
        .filter(|(_, &v)| v == 0.0)
        .map(|(i, _)| i)
        .collect()
}

fn argmax_score(n_arms: usize, score: impl Fn(usize) -> f64) -> usize {
    let mut best = f64::NEG_INFINITY;
    let mut best_idx = 0;
    for i in 0..n_arms {
        let s = score(i);
        if s > best {
            best = s;
            best_idx = i;
        }
    }
    best_idx
}

/// Classic UCB1 (Auer et al. 2002) on lifetime means.
#[derive(Debug, Clone)]
pub struct Ucb1 {
    rng: StdRng,
    arms: usize,
    arm_cum_reward: Vec<f64>,
    arm_visits: Vec<f64>,
    visits: f64,
}

impl Ucb1 {
    pub fn new(seed: u64, n_arms: usize) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            arms: n_arms,
            arm_cum_reward: vec![0.0; n_arms],
            arm_visits: vec![0.0; n_arms],
            visits: 0.0,
        }
    }

    /// Clear all mean/visit statistics (the RNG stream continues).
    pub fn reset(&mut self) {
        self.visits = 0.0;
        self.arm_cum_reward = vec![0.0; self.arms];
        self.arm_visits = vec![0.0; self.arms];
    }

    fn ucb(&self, arm: usize) -> f64 {
        let mean = self.arm_cum_reward[arm] / self.arm_visits[arm];
        let ci = (2.0 * self.visits.ln() / self.arm_visits[arm]).sqrt();
        mean + ci
    }
}

impl BanditPolicy for Ucb1 {
    fn get_action(&mut self) -> usize {
        let unvisited = unvisited_arms(&self.arm_visits);
        if !unvisited.is_empty() {
            return unvisited[self.rng.random_range(0..unvisited.len())];
        }

        argmax_score(self.arms, |i| self.ucb(i))
    }

    fn update(&mut self, arm: usize, reward: bool) {
        self.arm_cum_reward[arm] += f64::from(u8::from(reward));
        self.arm_visits[arm] += 1.0;
        self.visits += 1.0;
    }

    fn name(&self) -> &'static str {
        "UCB"
    }
}

/// KL-UCB for Bernoulli rewards.
///
/// Uses the horizon-free index from Lattimore & Szepesvári's *Bandit
/// Algorithms* (`f(t) = 1 + t ln²t`), slightly different from the original
/// KL-UCB paper's tunable-constant form.
#[derive(Debug, Clone)]
pub struct KlUcb {
    rng: StdRng,
    arms: usize,
    arm_successes: Vec<f64>,
    arm_visits: Vec<f64>,
    visits: f64,
}

impl KlUcb {
    pub fn new(seed: u64, n_arms: usize) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            arms: n_arms,
            arm_successes: vec![0.0; n_arms],
            arm_visits: vec![0.0; n_arms],
            visits: 0.0,
        }
    }

    /// Largest `q ∈ [p, 1]` with `d(p, q) <= ub`, found by bisection.
    fn max_rel_entropy(p: f64, ub: f64) -> f64 {
        debug_assert!(ub > 0.0);

        // the initial guess satisfies the constraint since d(p, p) = 0
        let mut low = p;
        let mut high = 1.0;

        while high - low > KL_UCB_EPS {
            let q = low + (high - low) / 2.0;
            if bernoulli_rel_entropy(p, q) > ub {
                high = q;
            } else {
                low = q;
            }
        }

        low
    }

    fn kl_ucb(&self, arm: usize) -> f64 {
        debug_assert!(self.arm_visits[arm] >= 1.0);

        let t = self.visits + 1.0;
        let f = 1.0 + t * t.ln() * t.ln();

        let ub = f.ln() / self.arm_visits[arm];
        let p = self.arm_successes[arm] / self.arm_visits[arm];
        Self::max_rel_entropy(p, ub)
    }
}

impl BanditPolicy for KlUcb {
    fn get_action(&mut self) -> usize {
        let unvisited = unvisited_arms(&self.arm_visits);
        if !unvisited.is_empty() {
            return unvisited[self.rng.random_range(0..unvisited.len())];
        }

        argmax_score(self.arms, |i| self.kl_ucb(i))
    }

    fn update(&mut self, arm: usize, reward: bool) {
        self.arm_successes[arm] += f64::from(u8::from(reward));
        self.arm_visits[arm] += 1.0;
        self.visits += 1.0;
    }

    fn name(&self) -> &'static str {
        "KLUCB"
    }
}

/// Sliding-Window UCB (Garivier & Moulines 2008, arXiv:0805.3415).
///
/// Means and visit counts are taken over the last `window` pulls only; the
/// confidence radius uses `ln(len(queue))`, i.e. `ln(min(t, window))`.
#[derive(Debug, Clone)]
pub struct SwUcb {
    rng: StdRng,
    arms: usize,
    window: usize,
    plays: VecDeque<(usize, bool)>,
    arm_cum_reward: Vec<f64>,
    arm_visits: Vec<f64>,
}

impl SwUcb {
    pub fn new(seed: u64, n_arms: usize, window: usize) -> Self {
        assert!(window >= 1, "window must be positive");
        Self {
            rng: StdRng::seed_from_u64(seed),
            arms: n_arms,
            window,
            plays: VecDeque::new(),
            arm_cum_reward: vec![0.0; n_arms],
            arm_visits: vec![0.0; n_arms],
        }
    }

    /// Mean reward of `arm` over the window, if it was played there.
    pub fn windowed_mean(&self, arm: usize) -> Option<f64> {
        if self.arm_visits[arm] == 0.0 {
            None
        } else {
            Some(self.arm_cum_reward[arm] / self.arm_visits[arm])
        }
    }

    fn ucb(&self, arm: usize) -> f64 {
        let mean = self.arm_cum_reward[arm] / self.arm_visits[arm];
        let ci = (2.0 * (self.plays.len() as f64).ln() / self.arm_visits[arm]).sqrt();
        mean + ci
    }
}

impl BanditPolicy for SwUcb {
    fn get_action(&mut self) -> usize {
        let unvisited = unvisited_arms(&self.arm_visits);
        if !unvisited.is_empty() {
            return unvisited[self.rng.random_range(0..unvisited.len())];
        }

        argmax_score(self.arms, |i| self.ucb(i))
    }

    fn update(&mut self, arm: usize, reward: bool) {
        self.plays.push_back((arm, reward));
        self.arm_cum_reward[arm] += f64::from(u8::from(reward));
        self.arm_visits[arm] += 1.0;

        if self.plays.len() > self.window {
            let (old_arm, old_reward) = self.plays.pop_front().expect("window is non-empty");
            self.arm_visits[old_arm] -= 1.0;
            self.arm_cum_reward[old_arm] -= f64::from(u8::from(old_reward));
        }
    }

    fn name(&self) -> &'static str {
        "SWUCB"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ucb1_visits_every_arm_before_scoring() {
        let mut ucb = Ucb1::new(4, 5);
        let mut seen = [false; 5];
        for _ in 0..5 {
            let arm = ucb.get_action();
            assert!(!seen[arm], "arm {arm} revisited during initial sweep");
            seen[arm] = true;
            ucb.update(arm, false);
        }
        assert!(seen.iter().all(|&s| s));
    }

    #[test]
    fn ucb1_prefers_the_better_mean_at_equal_counts() {
        let mut ucb = Ucb1::new(0, 2);
        for _ in 0..10 {
            ucb.update(0, false);
            ucb.update(1, true);
        }
        assert_eq!(ucb.get_action(), 1);
    }

    #[test]
    fn ucb1_reset_restarts_the_initial_sweep() {
        let mut ucb = Ucb1::new(0, 3);
        for arm in 0..3 {
            ucb.update(arm, true);
        }
        ucb.reset();
        let arm = ucb.get_action();
        assert!(arm < 3);
        assert_eq!(ucb.visits, 0.0);
    }

    #[test]
    fn kl_ucb_bisection_hits_the_bound() {
        // d(p, q*) == ub at the bisection fixpoint (interior case)
        let p = 0.5;
        let ub = 0.4;
        let q = KlUcb::max_rel_entropy(p, ub);
        assert!(q > p && q < 1.0);
        assert!(
            (bernoulli_rel_entropy(p, q) - ub).abs() < 1e-5,
            "d({p}, {q}) = {}",
            bernoulli_rel_entropy(p, q)
        );
    }

    #[test]
    fn kl_ucb_score_upper_bounds_the_mean() {
        let mut kl = KlUcb::new(1, 2);
        for i in 0..20 {
            kl.update(i % 2, i % 3 == 0);
        }
        for arm in 0..2 {
            let p = kl.arm_successes[arm] / kl.arm_visits[arm];
            let score = kl.kl_ucb(arm);
            assert!(score >= p && score <= 1.0, "score {score} vs mean {p}");
        }
    }

    #[test]
    fn kl_ucb_all_ones_arm_scores_one() {
        let mut kl = KlUcb::new(1, 2);
        for _ in 0..5 {
            kl.update(0, true);
            kl.update(1, false);
        }
        assert!((kl.kl_ucb(0) - 1.0).abs() < 1e-6);
        assert_eq!(kl.get_action(), 0);
    }

    #[test]
    fn sw_ucb_evicts_beyond_the_window() {
        let mut sw = SwUcb::new(2, 2, 4);
        for _ in 0..4 {
            sw.update(0, true);
        }
        assert_eq!(sw.windowed_mean(0), Some(1.0));

        // four zeros push the ones out entirely
        for _ in 0..4 {
            sw.update(0, false);
        }
        assert_eq!(sw.windowed_mean(0), Some(0.0));
        assert_eq!(sw.plays.len(), 4);
    }

    #[test]
    fn sw_ucb_forgets_a_flip_within_the_window() {
        // arm 0 looks perfect for 100 steps, then turns bad
        let mut sw = SwUcb::new(3, 2, 20);
        for _ in 0..100 {
            sw.update(0, true);
        }
        for step in 0..30 {
            sw.update(0, false);
            let mean = sw.windowed_mean(0).unwrap_or(0.0);
            if mean <= 0.55 {
                assert!(step < 30, "window mean dropped at step {step}");
                return;
            }
        }
        panic!("windowed mean never dropped below 0.55 within 30 steps of the flip");
    }

    #[test]
    fn sw_ucb_fully_forgotten_arm_counts_as_unvisited() {
        let mut sw = SwUcb::new(5, 2, 2);
        sw.update(0, true);
        sw.update(1, true);
        // two more pulls of arm 1 evict arm 0 from the window
        sw.update(1, true);
        sw.update(1, true);
        assert_eq!(sw.windowed_mean(0), None);
        // the explore branch must re-try arm 0
        assert_eq!(sw.get_action(), 0);
    }
}
