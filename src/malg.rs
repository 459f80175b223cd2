//! MALG meta-scheduler over nested UCB1 instances.
//!
//! An implementation of the MALG restart schedule from the MASTER paper
//! (Wei & Luo 2021, arXiv:2102.05406), with UCB1 as the base algorithm.
//! MALG maintains `N + 1` slots; the slot with index `m` runs UCB1 over a
//! dyadic segment of length `2^m`. Whenever the step counter reaches a
//! multiple of `2^m`, slot `m` is restarted with probability
//! `ρ(2^N) / ρ(2^m)` where `ρ(t) = √(n/t) + n/t` is the average regret
//! bound, so short exploratory instances are launched ever more rarely.
//! Actions are delegated to the instance with the shortest segment covering
//! the current step; slot `N` restarts deterministically, so one always
//! exists.

use rand::rngs::StdRng;
use rand::Rng;
use rand::SeedableRng;

use crate::policy::BanditPolicy;
use crate::ucb::Ucb1;

#[derive(Debug, Clone)]
struct Instance {
    alg: Ucb1,
    start: u64,
    end: u64,
}

impl Instance {
    fn length(&self) -> u64 {
        self.end - self.start + 1
    }
}

/// MALG with UCB1 base instances.
#[derive(Debug, Clone)]
pub struct Malg {
    rng: StdRng,
    seed: u64,
    arms: usize,
    depth: usize,
    tau: u64,
    instances: Vec<Option<Instance>>,
}

impl Malg {
    /// Create a scheduler covering blocks of `2^depth` steps.
    ///
    /// The scheduler RNG is seeded with `seed`; the UCB1 instance in slot
    /// `m` is seeded with `seed + m` when first allocated.
    pub fn new(seed: u64, n_arms: usize, depth: usize) -> Self {
        assert!(depth < 64, "depth must be below 64");
        Self {
            rng: StdRng::seed_from_u64(seed),
            seed,
            arms: n_arms,
            depth,
            tau: 1,
            instances: (0..=depth).map(|_| None).collect(),
        }
    }

    /// Average regret bound used to schedule restarts.
    fn rho(&self, t: f64) -> f64 {
        let a = self.arms as f64;
        (a / t).sqrt() + a / t
    }

    /// Probability that an eligible slot `m` restarts.
    fn reset_threshold(&self, m: usize) -> f64 {
        self.rho(2.0_f64.powi(self.depth as i32)) / self.rho(2.0_f64.powi(m as i32))
    }

    /// Index of the non-empty slot with the shortest segment containing the
    /// current step. The restart schedule guarantees one exists.
    fn active_instance(&self) -> usize {
        let mut best = u64::MAX;
        let mut best_idx = None;

        for (i, slot) in self.instances.iter().enumerate() {
            if let Some(inst) = slot {
                if self.tau >= inst.start && self.tau <= inst.end && inst.length() < best {
                    best = inst.length();
                    best_idx = Some(i);
                }
            }
        }

        best_idx.expect("an active MALG instance always covers the current step")
    }
}

impl BanditPolicy for Malg {
    fn get_action(&mut self) -> usize {
        // run the restart schedule, longest segments first
        for off in 0..=self.depth {
            let m = self.depth - off;

            if (self.tau - 1) % (1u64 << m) != 0 {
                continue;
            }

            let threshold = self.reset_threshold(m);
            if self.rng.random::<f64>() < threshold {
                let start = self.tau;
                let end = self.tau + (1u64 << m) - 1;

                match &mut self.instances[m] {
                    Some(inst) => {
                        inst.start = start;
                        inst.end = end;
                        inst.alg.reset();
                    }
                    None => {
                        self.instances[m] = Some(Instance {
                            alg: Ucb1::new(self.seed + m as u64, self.arms),
                            start,
                            end,
                        });
                    }
                }
            }
        }

        let active = self.active_instance();
        self.instances[active]
            .as_mut()
            .expect("active slot is non-empty")
            .alg
            .get_action()
    }

    fn update(&mut self, arm: usize, reward: bool) {
        let active = self.active_instance();
        self.instances[active]
            .as_mut()
            .expect("active slot is non-empty")
            .alg
            .update(arm, reward);
        self.tau += 1;
    }

    fn name(&self) -> &'static str {
        "MALG"
    }
}
