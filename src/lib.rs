//! `driftbench`: a research testbed for non-stationary multi-armed bandits
//! on Bernoulli reward environments.
//!
//! The centrepiece is **Active Partition Tree Weighting (APTW)**: an online
//! Bayesian mixture over every dyadic segmentation of the time axis into
//! stationary segments, with Krichevsky–Trofimov estimators at the leaves.
//! APTW simultaneously infers where the environment changed and the per-arm
//! reward posteriors inside each inferred segment, in O(depth) work per
//! observation.
//!
//! Included policies:
//! - `ActivePtwPolicy`: posterior sampling against the APTW mixture:
//!   sample a segmentation level, then sample each arm's Beta posterior
//!   conditional on that level and play the argmax.
//! - `ParanoidPtwPolicy`: ActivePTW plus forced exploration at a rate tied
//!   to the sampled segment length.
//! - Baselines: `ThompsonSampling`, `Ucb1`, `KlUcb`, `SwUcb` (sliding
//!   window), the `Malg` meta-scheduler, and the trivial `Constant` /
//!   `Uniform` strategies.
//!
//! The `env` side provides an n-arm Bernoulli simulator with pluggable
//! change-point schedules (stationary, geometric, explicit, adversarial
//! two-phase), and `harness` drives the agent↔environment loop into typed
//! records a front end can print or plot.
//!
//! Goals:
//! - **Reproducible by construction**: every stochastic component owns one
//!   seeded RNG; nested seeds are derived by fixed offsets.
//! - **Single-threaded and allocation-light**: the per-step hot path is
//!   index-addressed arrays and log-domain arithmetic.
//!
//! Non-goals: distributed execution, persistence, adversarial rewards
//! beyond the two-phase construction, continuous actions, contextual
//! bandits.

#![forbid(unsafe_code)]

mod logmath;
pub use logmath::*;

mod kt;
pub use kt::*;

mod ptw;
pub use ptw::*;

mod policy;
pub use policy::*;

mod thompson;
pub use thompson::*;

mod active;
pub use active::*;

mod ucb;
pub use ucb::*;

mod malg;
pub use malg::*;

mod env;
pub use env::*;

mod harness;
pub use harness::*;

pub const DRIFTBENCH_VERSION: &str = env!("CARGO_PKG_VERSION");
