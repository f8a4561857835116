use std::path::PathBuf;

use clap::Args;
use focusforge_core::training::TrainingReport;
use focusforge_core::{Config, Trainer, TrainingEnvironment};
use serde::Serialize;

use super::{open_store, print_json, CliResult};

#[derive(Args)]
pub struct TrainArgs {
    /// Total environment steps (defaults to training.total_timesteps)
    #[arg(long)]
    timesteps: Option<u64>,
    /// Steps per episode (defaults to training.max_steps)
    #[arg(long)]
    max_steps: Option<u64>,
    /// Exploration seed (defaults to training.seed)
    #[arg(long)]
    seed: Option<u64>,
    /// Where to write the artifact (defaults to policy.model_path)
    #[arg(long)]
    output: Option<PathBuf>,
}

#[derive(Serialize)]
struct TrainOutput {
    #[serde(flatten)]
    report: TrainingReport,
    history_sessions: usize,
    artifact: PathBuf,
}

pub fn run(args: TrainArgs) -> CliResult {
    let config = Config::load()?;
    let store = open_store(&config)?;

    // Train on a frozen copy so sessions logged meanwhile cannot shift rewards.
    let history = store.freeze()?;
    let history_sessions = history.len();

    let mut training = config.training.clone();
    if let Some(timesteps) = args.timesteps {
        training.total_timesteps = timesteps;
    }
    if let Some(seed) = args.seed {
        training.seed = seed;
    }
    let max_steps = args.max_steps.unwrap_or(training.max_steps);

    let mut env = TrainingEnvironment::from_config(history, &config).with_max_steps(max_steps);
    let (policy, report) = Trainer::new(training).train(&mut env)?;

    let artifact = args.output.unwrap_or_else(|| config.model_path());
    policy.save(&artifact)?;

    print_json(&TrainOutput {
        report,
        history_sessions,
        artifact,
    })
}
