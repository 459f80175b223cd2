//! Unified `BanditPolicy` trait for the agent flavours, plus the two
//! trivial baseline strategies.
//!
//! Every agent in the testbed shares the same three-method interface:
//! `get_action() -> arm`, `update(arm, reward)`, `name()`. Dynamic dispatch
//! is fine here since dispatch cost is negligible against the per-step
//! arithmetic of any real policy.

use rand::rngs::StdRng;
use rand::Rng;
use rand::SeedableRng;

/// Common interface for bandit agents playing a Bernoulli environment.
pub trait BanditPolicy {
    /// Choose the arm to pull this step.
    fn get_action(&mut self) -> usize;

    /// Record the reward received for pulling `arm`.
    fn update(&mut self, arm: usize, reward: bool);

    /// Short agent name, e.g. `"UCB"`.
    fn name(&self) -> &'static str;
}

/// Always plays the same arm. Useful as a floor in regret plots.
#[derive(Debug, Clone, Copy)]
pub struct Constant {
    action: usize,
}

impl Constant {
    pub fn new(action: usize) -> Self {
        Self { action }
    }
}

impl BanditPolicy for Constant {
    fn get_action(&mut self) -> usize {
        self.action
    }

    fn update(&mut self, _arm: usize, _reward: bool) {}

    fn name(&self) -> &'static str {
        "Constant"
    }
}

/// Plays a uniformly random arm every step.
#[derive(Debug, Clone)]
pub struct Uniform {
    rng: StdRng,
    arms: usize,
}

impl Uniform {
    pub fn new(seed: u64, n_arms: usize) -> Self {
        assert!(n_arms > 0, "need at least one arm");
        Self {
            rng: StdRng::seed_from_u64(seed),
            arms: n_arms,
        }
    }
}

impl BanditPolicy for Uniform {
    fn get_action(&mut self) -> usize {
        self.rng.random_range(0..self.arms)
    }

    fn update(&mut self, _arm: usize, _reward: bool) {}

    fn name(&self) -> &'static str {
        "Uniform"
    }
}
