//! Episode runner and reporting glue.
//!
//! The harness drives the agent↔environment loop and produces typed,
//! log-ready records; formatting (text summary, matplotlib script) is kept
//! separate so front ends can share exact semantics without re-implementing
//! the loop.

use std::io;

use crate::env::Environment;
use crate::policy::BanditPolicy;

/// Everything recorded while running one episode.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EpisodeRecord {
    /// Cumulative regret after each pull.
    pub regret: Vec<f64>,
    /// Steps (1-based) at which a change-point was observed. The
    /// environment accessor reflects the completed trial count, so a change
    /// is logged one step after it takes effect on the biases.
    pub changepoints: Vec<u64>,
}

/// Run `trials` steps of the agent↔environment loop.
pub fn run_episode(
    agent: &mut dyn BanditPolicy,
    env: &mut Environment,
    trials: u64,
) -> EpisodeRecord {
    let mut regret = Vec::with_capacity(trials as usize);
    let mut changepoints = Vec::new();

    for t in 0..trials {
        if env.changepoint() {
            changepoints.push(t + 1);
        }

        let arm = agent.get_action();
        let r = env.pull(arm);
        agent.update(arm, r);

        regret.push(env.best_hindsight_expected_return() - env.cumulative_reward());
    }

    EpisodeRecord {
        regret,
        changepoints,
    }
}

/// Final-state summary of a bandit problem, as printed by text mode.
#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RunSummary {
    pub trials: u64,
    pub total_reward: f64,
    pub regret: f64,
    pub avg_regret: f64,
}

impl RunSummary {
    pub fn from_env(env: &Environment) -> Self {
        let regret = env.best_hindsight_expected_return() - env.cumulative_reward();
        Self {
            trials: env.trials(),
            total_reward: env.cumulative_reward(),
            regret,
            avg_regret: regret / env.trials() as f64,
        }
    }
}

impl std::fmt::Display for RunSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "{} trials completed.", self.trials)?;
        writeln!(f, "Total Reward: {}", self.total_reward)?;
        writeln!(f, "Regret: {}", self.regret)?;
        write!(f, "Avg Regret: {}", self.avg_regret)
    }
}

/// Input to the matplotlib script emitter.
#[derive(Debug, Clone)]
pub struct PlotSpec<'a> {
    /// One label per agent, in plot order.
    pub labels: &'a [&'a str],
    /// `regrets[agent][episode][step]`: cumulative regret traces.
    pub regrets: &'a [Vec<Vec<f64>>],
    /// Change-point steps to mark with dashed vertical lines.
    pub changepoints: &'a [u64],
    pub trials: u64,
    pub arms: usize,
    /// Shown in the title when the schedule has a rate (i.e. not two-phase).
    pub cpt_rate: Option<f64>,
}

/// Write a self-contained python script that plots mean cumulative-regret
/// curves with 95% normal confidence bands and dashed vertical lines at the
/// change-points.
pub fn write_plot_script<W: io::Write>(out: &mut W, spec: &PlotSpec<'_>) -> io::Result<()> {
    let trials = spec.trials as usize;

    writeln!(out, "import matplotlib.pyplot as plt")?;
    writeln!(out, "import numpy as np")?;
    writeln!(out, "plt.rcParams.update({{'font.size': 50}})")?;
    writeln!(out, "x=np.arange(1,{})", spec.trials + 1)?;

    for (i, episodes) in spec.regrets.iter().enumerate() {
        let repeats = episodes.len();
        debug_assert!(repeats >= 1);

        let mut means = Vec::with_capacity(trials);
        let mut cis = Vec::with_capacity(trials);
        for t in 0..trials {
            let total: f64 = episodes.iter().map(|ep| ep[t]).sum();
            let mean = total / repeats as f64;

            let ci = if repeats > 1 {
                let ss: f64 = episodes.iter().map(|ep| (ep[t] - mean).powi(2)).sum();
                let stddev = (ss / (repeats as f64 - 1.0)).sqrt();
                1.96 * stddev / (repeats as f64).sqrt()
            } else {
                0.0
            };

            means.push(mean);
            cis.push(ci);
        }

        write_py_array(out, &format!("y{i}"), means.iter().copied())?;
        write_py_array(out, &format!("y{i}u"), means.iter().zip(&cis).map(|(m, c)| m + c))?;
        write_py_array(out, &format!("y{i}b"), means.iter().zip(&cis).map(|(m, c)| m - c))?;
    }

    for (i, label) in spec.labels.iter().enumerate() {
        writeln!(out, "plt.plot(x, y{i}, label='{label}')")?;
        writeln!(out, "plt.fill_between(x, y{i}b, y{i}u, alpha=.15)")?;
    }

    writeln!(out, "plt.plot()")?;
    writeln!(out, "plt.xlabel('Time')")?;
    writeln!(out, "plt.ylabel('Regret')")?;
    match spec.cpt_rate {
        Some(rate) => writeln!(
            out,
            "plt.title('Regret vs Time [Actions={}, CptRate={}]')",
            spec.arms, rate
        )?,
        None => writeln!(out, "plt.title('Regret vs Time [Actions={}]')", spec.arms)?,
    }
    writeln!(out, "plt.legend()")?;

    for cpt in spec.changepoints {
        writeln!(out, "plt.axvline(x={cpt}, dashes=[0.1,0.5])")?;
    }

    writeln!(out, "plt.show()")
}

fn write_py_array<W: io::Write>(
    out: &mut W,
    name: &str,
    values: impl Iterator<Item = f64>,
) -> io::Result<()> {
    writeln!(out, "{name}= np.asarray([")?;
    for v in values {
        writeln!(out, "{v}, ")?;
    }
    writeln!(out, "])")
}
