use clap::Subcommand;
use focusforge_core::{Config, PolicyMode, RuleTable, SchedulingPolicy};
use serde::Serialize;

use super::{print_json, CliResult};

#[derive(Subcommand)]
pub enum PolicyAction {
    /// Show which policy would make the next decision
    Show,
}

#[derive(Serialize)]
struct PolicyStatus {
    mode: PolicyMode,
    model_path: String,
    artifact_present: bool,
    model_loaded: bool,
    /// Strategy for the next decision, absent when none is usable.
    active: Option<String>,
    error: Option<String>,
    rules: RuleTable,
}

pub fn run(action: PolicyAction) -> CliResult {
    match action {
        PolicyAction::Show => {
            let config = Config::load()?;
            let path = config.model_path();
            let policy = SchedulingPolicy::from_config(&config)?;
            let (active, error) = match policy.active() {
                Ok((p, strategy)) => (Some(format!("{strategy} ({})", p.name())), None),
                Err(e) => (None, Some(e.to_string())),
            };
            print_json(&PolicyStatus {
                mode: policy.mode(),
                model_path: path.display().to_string(),
                artifact_present: path.exists(),
                model_loaded: policy.has_model(),
                active,
                error,
                rules: config.policy.rules.clone(),
            })?;
        }
    }
    Ok(())
}
