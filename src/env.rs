//! Bernoulli bandit environment with pluggable change-point schedules.
//!
//! The environment owns a latent bias vector `θ ∈ [0,1]^n`; pulling an arm
//! draws a Bernoulli reward from that arm's bias. A [`ChangeSchedule`]
//! decides at which (1-based, post-pull) trial counts the bias vector is
//! replaced, either by a schedule-supplied vector or by a fresh uniform
//! draw. The environment also tracks the best-in-hindsight expected return,
//! from which the harness computes regret.

use rand::rngs::StdRng;
use rand::Rng;
use rand::SeedableRng;
use rand_distr::{Distribution, Geometric};
use std::collections::BTreeSet;

/// Replacement bias vector installed at a change-point; empty means "draw
/// fresh biases uniformly".
pub type ArmInit = Vec<f64>;

/// A latent schedule of environment changes.
pub trait ChangeSchedule {
    /// Does the environment change after trial `t` (1-based, counted after
    /// the pull)?
    fn changepoint(&self, t: u64) -> bool;

    /// Custom bias assignment installed at trial `t`; the default empty
    /// vector asks the environment to redraw biases uniformly at random.
    fn custom_arm_initialisation(&self, _t: u64) -> ArmInit {
        ArmInit::new()
    }
}

/// Stationary problem: never a change-point.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoChangeSchedule;

impl ChangeSchedule for NoChangeSchedule {
    fn changepoint(&self, _t: u64) -> bool {
        false
    }
}

/// Change-points with Geometric(p) inter-arrival gaps, pre-sampled up to a
/// horizon.
#[derive(Debug, Clone)]
pub struct GeometricChangeSchedule {
    cpts: BTreeSet<u64>,
}

impl GeometricChangeSchedule {
    pub fn new(p: f64, max_trials: u64, seed: u64) -> Self {
        assert!(p > 0.0 && p < 1.0, "gap probability must be in (0, 1)");

        let mut rng = StdRng::seed_from_u64(seed);
        let gdist = Geometric::new(p).expect("p is in (0, 1)");

        let mut cpts = BTreeSet::new();
        let mut upto = 0u64;
        loop {
            upto += gdist.sample(&mut rng);
            if upto >= max_trials {
                break;
            }
            cpts.insert(upto);
        }

        Self { cpts }
    }

    /// The pre-sampled change-point positions, in order.
    pub fn changepoints(&self) -> impl Iterator<Item = u64> + '_ {
        self.cpts.iter().copied()
    }
}

impl ChangeSchedule for GeometricChangeSchedule {
    fn changepoint(&self, t: u64) -> bool {
        self.cpts.contains(&t)
    }
}

/// Change-points given by an explicit list of trial counts.
#[derive(Debug, Clone)]
pub struct VectorChangeSchedule {
    cpts: BTreeSet<u64>,
}

impl VectorChangeSchedule {
    pub fn new(times: &[u64]) -> Self {
        Self {
            cpts: times.iter().copied().collect(),
        }
    }
}

impl ChangeSchedule for VectorChangeSchedule {
    fn changepoint(&self, t: u64) -> bool {
        self.cpts.contains(&t)
    }
}

/// An adversarially chosen two-segment scenario that punishes algorithms
/// tuned for the stationary case: the first segment's best arm keeps its
/// value into the second segment but is no longer optimal there.
/// Construction inspired by Thm 31.2 of *Bandit Algorithms* (Lattimore &
/// Szepesvári).
#[derive(Debug, Clone)]
pub struct TwoPhaseChangeSchedule {
    halfway: u64,
    thetas_seg1: ArmInit,
    thetas_seg2: ArmInit,
}

impl TwoPhaseChangeSchedule {
    pub fn new(max_trials: u64, thetas_seg1: ArmInit, thetas_seg2: ArmInit) -> Self {
        Self {
            halfway: max_trials / 2,
            thetas_seg1,
            thetas_seg2,
        }
    }
}

impl ChangeSchedule for TwoPhaseChangeSchedule {
    fn changepoint(&self, t: u64) -> bool {
        t == 1 || t == self.halfway
    }

    fn custom_arm_initialisation(&self, t: u64) -> ArmInit {
        if t < self.halfway {
            self.thetas_seg1.clone()
        } else {
            self.thetas_seg2.clone()
        }
    }
}

/// An n-arm Bernoulli stochastic bandit problem.
pub struct Environment {
    rng: StdRng,
    schedule: Box<dyn ChangeSchedule>,
    trials: u64,
    cum_reward: f64,
    thetas: Vec<f64>,
    exp_cum_best: f64,
}

impl Environment {
    /// Create an environment with uniformly drawn initial biases.
    pub fn new(n_arms: usize, seed: u64, schedule: Box<dyn ChangeSchedule>) -> Self {
        let mut env = Self {
            rng: StdRng::seed_from_u64(seed),
            schedule,
            trials: 0,
            cum_reward: 0.0,
            thetas: vec![0.0; n_arms],
            exp_cum_best: 0.0,
        };
        env.reset();
        env
    }

    /// Stationary environment shorthand.
    pub fn stationary(n_arms: usize, seed: u64) -> Self {
        Self::new(n_arms, seed, Box::new(NoChangeSchedule))
    }

    /// Redraw every bias uniformly on `[0, 1]`.
    pub fn reset(&mut self) {
        for theta in &mut self.thetas {
            *theta = self.rng.random::<f64>();
        }
    }

    /// Pull an arm and receive a Bernoulli reward.
    ///
    /// Panics on an out-of-range arm, and if a schedule installs a bias
    /// vector whose length differs from the arm count.
    pub fn pull(&mut self, arm_index: usize) -> bool {
        assert!(
            arm_index < self.thetas.len(),
            "invalid arm index {arm_index}"
        );

        self.trials += 1;

        let r = self.rng.random_bool(self.thetas[arm_index]);
        if r {
            self.cum_reward += 1.0;
        }

        self.exp_cum_best += self.thetas[self.best_arm()];

        if self.schedule.changepoint(self.trials) {
            let new_thetas = self.schedule.custom_arm_initialisation(self.trials);
            if new_thetas.is_empty() {
                self.reset();
            } else {
                assert!(
                    new_thetas.len() == self.thetas.len(),
                    "schedule installed {} biases for {} arms",
                    new_thetas.len(),
                    self.thetas.len()
                );
                self.thetas = new_thetas;
            }
        }

        r
    }

    /// Total number of pulls performed so far.
    pub fn trials(&self) -> u64 {
        self.trials
    }

    /// Number of arms.
    pub fn arms(&self) -> usize {
        self.thetas.len()
    }

    /// Reward accumulated over all pulls.
    pub fn cumulative_reward(&self) -> f64 {
        self.cum_reward
    }

    /// The arm with the highest latent bias right now.
    pub fn best_arm(&self) -> usize {
        let mut best = 0;
        for i in 1..self.thetas.len() {
            if self.thetas[i] > self.thetas[best] {
                best = i;
            }
        }
        best
    }

    /// Expected return of always playing the best arm at each past step;
    /// regret is this minus [`Self::cumulative_reward`].
    pub fn best_hindsight_expected_return(&self) -> f64 {
        self.exp_cum_best
    }

    /// Whether the schedule fires at the *completed* trial count.
    ///
    /// The harness queries this before the next pull and logs `t + 1`, so a
    /// change that took effect on the biases after step `t` is recorded one
    /// step later, where it first influences a reward.
    pub fn changepoint(&self) -> bool {
        self.schedule.changepoint(self.trials)
    }
}

impl std::fmt::Debug for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Environment")
            .field("trials", &self.trials)
            .field("cum_reward", &self.cum_reward)
            .field("thetas", &self.thetas)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rewards_are_reproducible_for_a_fixed_seed() {
        let run = || -> Vec<bool> {
            let mut env = Environment::stationary(3, 42);
            [0, 1, 2, 0, 1, 2, 0, 1, 2].iter().map(|&a| env.pull(a)).collect()
        };
        assert_eq!(run(), run(), "same seed must give identical rewards");
    }

    #[test]
    fn accounting_invariants_hold() {
        let mut env = Environment::stationary(4, 9);
        let mut prev_best = 0.0;
        for t in 0..200 {
            env.pull(t % 4);
            assert!(env.cumulative_reward() <= env.trials() as f64);
            let best = env.best_hindsight_expected_return();
            assert!(best >= prev_best, "exp_cum_best must be non-decreasing");
            prev_best = best;
        }
        assert_eq!(env.trials(), 200);
    }

    #[test]
    #[should_panic(expected = "invalid arm index")]
    fn out_of_range_arm_panics() {
        let mut env = Environment::stationary(2, 0);
        env.pull(2);
    }

    #[test]
    fn no_change_schedule_never_fires() {
        let s = NoChangeSchedule;
        assert!((1..1000).all(|t| !s.changepoint(t)));
    }

    #[test]
    fn vector_schedule_is_a_membership_test() {
        let s = VectorChangeSchedule::new(&[3, 7, 7, 11]);
        assert!(s.changepoint(3) && s.changepoint(7) && s.changepoint(11));
        assert!(!s.changepoint(1) && !s.changepoint(4) && !s.changepoint(12));
        assert!(s.custom_arm_initialisation(3).is_empty());
    }

    #[test]
    fn geometric_schedule_is_reproducible_and_bounded() {
        let a = GeometricChangeSchedule::new(0.05, 500, 123);
        let b = GeometricChangeSchedule::new(0.05, 500, 123);
        let pts_a: Vec<u64> = a.changepoints().collect();
        let pts_b: Vec<u64> = b.changepoints().collect();
        assert_eq!(pts_a, pts_b);
        assert!(pts_a.iter().all(|&t| t < 500));
        // expect on the order of max_trials * p change-points
        assert!(!pts_a.is_empty(), "rate 0.05 over 500 trials should fire");
    }

    #[test]
    fn two_phase_schedule_fires_at_one_and_halfway() {
        let s = TwoPhaseChangeSchedule::new(200, vec![0.9, 0.1], vec![0.1, 0.9]);
        assert!(s.changepoint(1));
        assert!(s.changepoint(100));
        assert!(!s.changepoint(2) && !s.changepoint(99) && !s.changepoint(101));
        assert_eq!(s.custom_arm_initialisation(1), vec![0.9, 0.1]);
        assert_eq!(s.custom_arm_initialisation(99), vec![0.9, 0.1]);
        assert_eq!(s.custom_arm_initialisation(100), vec![0.1, 0.9]);
    }

    #[test]
    fn two_phase_schedule_installs_vectors_into_the_environment() {
        let schedule = TwoPhaseChangeSchedule::new(10, vec![1.0, 0.0], vec![0.0, 1.0]);
        let mut env = Environment::new(2, 1, Box::new(schedule));

        // after the first pull θ = [1, 0]: arm 0 always pays, arm 1 never
        env.pull(0);
        for _ in 0..2 {
            assert!(env.pull(0), "θ₁ makes arm 0 deterministic");
            assert!(!env.pull(1), "θ₁ makes arm 1 deterministic");
        }
        // θ₂ was installed after trial 5's reward was drawn
        assert_eq!(env.best_arm(), 1, "θ₂ flips the best arm");
        assert!(env.pull(1) && !env.pull(0), "θ₂ is deterministic too");
    }

    #[test]
    #[should_panic(expected = "biases for")]
    fn wrong_sized_custom_initialisation_panics() {
        let schedule = TwoPhaseChangeSchedule::new(4, vec![0.5], vec![0.5]);
        let mut env = Environment::new(2, 1, Box::new(schedule));
        env.pull(0);
    }
}
