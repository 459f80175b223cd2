//! Command-line front end: `Key=Value` arguments, text and plot modes.

use std::io::Write;
use std::process::ExitCode;

use driftbench::{
    ActivePtwPolicy, BanditPolicy, Constant, Environment, GeometricChangeSchedule, KlUcb, Malg,
    ParanoidPtwPolicy, PlotSpec, RunSummary, SwUcb, ThompsonSampling, TwoPhaseChangeSchedule,
    Ucb1, Uniform, run_episode, write_plot_script,
};

/// Seed offset for the geometric schedule's private RNG stream.
const SCHEDULE_SEED_OFFSET: u64 = 10007;

/// MALG block-length exponent used by the CLI.
const MALG_DEPTH: usize = 20;

/// Agents compared in plot mode, in plot order.
const PLOT_AGENTS: [&str; 7] = [
    "UCB",
    "ActivePTW",
    "MALG",
    "TS",
    "KLUCB",
    "SWUCB",
    "ParanoidPTW",
];

/// Configuration options with their defaults.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
struct Params {
    env_seed: u64,
    agent_seed: u64,
    trials: u64,
    arms: usize,
    agent: String,
    mode: String,
    plot_repeats: usize,
    cpt_rate: f64,
    swucb_window: Option<usize>,
    cpt_schedule: String,
}

impl Default for Params {
    fn default() -> Self {
        Self {
            env_seed: 666,
            agent_seed: 33,
            trials: 2500,
            arms: 10,
            agent: "ActivePTW".to_string(),
            mode: "text".to_string(),
            plot_repeats: 400,
            cpt_rate: 0.002,
            swucb_window: None,
            cpt_schedule: "Geometric".to_string(),
        }
    }
}

impl Params {
    /// Window for SW-UCB: explicit, or `round(1/CptRate)`.
    fn window(&self) -> usize {
        match self.swucb_window {
            Some(w) => w,
            None if self.cpt_rate > 0.0 => (1.0 / self.cpt_rate + 0.5) as usize,
            None => usize::MAX,
        }
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, String> {
    value
        .parse::<T>()
        .map_err(|_| format!("could not parse value for {key}."))
}

/// Process `Key=Value` command line options; unknown keys are fatal.
fn parse_args(args: &[String]) -> Result<Params, String> {
    let mut params = Params::default();

    for arg in args {
        let (key, value) = arg
            .split_once('=')
            .ok_or_else(|| "args need to be in key=value format.".to_string())?;

        match key {
            "EnvSeed" => params.env_seed = parse_number(key, value)?,
            "AgentSeed" => params.agent_seed = parse_number(key, value)?,
            "Trials" => {
                params.trials = parse_number(key, value)?;
                if params.trials < 1 {
                    return Err("Trials need to be non-zero.".to_string());
                }
            }
            "PlotRepeats" => {
                params.plot_repeats = parse_number(key, value)?;
                if params.plot_repeats < 1 {
                    return Err("PlotRepeats need to be positive.".to_string());
                }
            }
            "SWUCBWindow" => {
                let window: usize = parse_number(key, value)?;
                if window < 1 {
                    return Err("SWUCBWindow need to be positive.".to_string());
                }
                params.swucb_window = Some(window);
            }
            "Arms" => {
                params.arms = parse_number(key, value)?;
                if params.arms < 2 {
                    return Err("Arms needs to be at least 2.".to_string());
                }
            }
            "Agent" => params.agent = value.to_string(),
            "CptSchedule" => params.cpt_schedule = value.to_string(),
            "Mode" => {
                if value != "text" && value != "plot" {
                    return Err("Mode needs to be one of text/plot.".to_string());
                }
                params.mode = value.to_string();
            }
            "CptRate" => {
                params.cpt_rate = parse_number(key, value)?;
                if params.cpt_rate >= 1.0 {
                    return Err("CptRate needs to be less than 1.0.".to_string());
                }
            }
            _ => return Err("unrecognised arg.".to_string()),
        }
    }

    Ok(params)
}

/// Initialise a bandit algorithm from its CLI name.
fn create_agent(params: &Params, name: &str, seed: u64) -> Result<Box<dyn BanditPolicy>, String> {
    let arms = params.arms;
    let agent: Box<dyn BanditPolicy> = match name {
        "UCB" => Box::new(Ucb1::new(seed, arms)),
        "KLUCB" => Box::new(KlUcb::new(seed, arms)),
        "SWUCB" => Box::new(SwUcb::new(seed, arms, params.window())),
        "ActivePTW" => Box::new(ActivePtwPolicy::new(seed, arms)),
        "ParanoidPTW" => Box::new(ParanoidPtwPolicy::new(seed, arms)),
        "MALG" => Box::new(Malg::new(seed, arms, MALG_DEPTH)),
        "TS" => Box::new(ThompsonSampling::new(seed, arms)),
        "Constant" => Box::new(Constant::new(0)),
        "Uniform" => Box::new(Uniform::new(seed, arms)),
        _ => return Err("Invalid agent.".to_string()),
    };
    Ok(agent)
}

/// Create the bandit problem with its latent change-point schedule.
fn create_environment(params: &Params) -> Result<Environment, String> {
    match params.cpt_schedule.as_str() {
        "Nasty" => {
            let mut theta1 = vec![0.1; params.arms];
            theta1[0] = 0.2;
            let mut theta2 = vec![0.1; params.arms];
            theta2[0] = 0.2;
            theta2[1] = 0.8;

            let schedule = TwoPhaseChangeSchedule::new(params.trials, theta1, theta2);
            Ok(Environment::new(
                params.arms,
                params.env_seed,
                Box::new(schedule),
            ))
        }
        "Geometric" => {
            if params.cpt_rate <= 0.0 {
                return Err("CptRate needs to be positive for the Geometric schedule.".to_string());
            }
            let schedule = GeometricChangeSchedule::new(
                params.cpt_rate,
                params.trials,
                params.env_seed + SCHEDULE_SEED_OFFSET,
            );
            Ok(Environment::new(
                params.arms,
                params.env_seed,
                Box::new(schedule),
            ))
        }
        _ => Err("Invalid changepoint schedule.".to_string()),
    }
}

/// Run one episode and print the summary.
fn text_mode(params: &Params) -> Result<(), String> {
    let mut env = create_environment(params)?;
    let mut agent = create_agent(params, &params.agent, params.agent_seed)?;

    run_episode(agent.as_mut(), &mut env, params.trials);
    println!("{}", RunSummary::from_env(&env));

    Ok(())
}

/// Run every plot agent for `PlotRepeats` episodes and emit the python
/// plotting script on stdout.
fn plot_mode(params: &Params) -> Result<(), String> {
    let mut regrets: Vec<Vec<Vec<f64>>> = Vec::with_capacity(PLOT_AGENTS.len());
    let mut changepoints = Vec::new();

    for name in PLOT_AGENTS {
        let mut agent_runs = Vec::with_capacity(params.plot_repeats);

        for episode in 0..params.plot_repeats {
            let mut env = create_environment(params)?;
            let mut agent = create_agent(params, name, params.agent_seed + episode as u64)?;

            let record = run_episode(agent.as_mut(), &mut env, params.trials);
            changepoints = record.changepoints;
            agent_runs.push(record.regret);
        }

        regrets.push(agent_runs);
    }

    let spec = PlotSpec {
        labels: &PLOT_AGENTS,
        regrets: &regrets,
        changepoints: &changepoints,
        trials: params.trials,
        arms: params.arms,
        cpt_rate: (params.cpt_schedule != "Nasty").then_some(params.cpt_rate),
    };

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    write_plot_script(&mut out, &spec).map_err(|e| format!("could not write plot: {e}"))?;
    out.flush().map_err(|e| format!("could not write plot: {e}"))
}

fn run(args: &[String]) -> Result<(), String> {
    let params = parse_args(args)?;

    match params.mode.as_str() {
        "plot" => plot_mode(&params),
        _ => text_mode(&params),
    }
}

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().skip(1).collect();

    // any argument error or internal panic exits with status 1
    let outcome = std::panic::catch_unwind(|| run(&args));
    match outcome {
        Ok(Ok(())) => ExitCode::SUCCESS,
        Ok(Err(msg)) => {
            eprintln!("{msg}");
            ExitCode::FAILURE
        }
        Err(_) => ExitCode::FAILURE,
    }
}
