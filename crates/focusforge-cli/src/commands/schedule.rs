use std::sync::Arc;

use clap::Subcommand;
use focusforge_core::distraction::DistractionCounter;
use focusforge_core::{AdaptiveScheduler, Config, PolicyDurations, SchedulerState};
use serde::Serialize;

use super::{open_store, print_json, CliResult};

#[derive(Subcommand)]
pub enum ScheduleAction {
    /// Show current durations and scheduler state
    Show,
    /// Run one scheduling decision and adopt its durations
    Adjust {
        /// Distractions observed since the last decision
        #[arg(long, default_value_t = 0)]
        distractions: u32,
    },
    /// Override durations explicitly
    Set {
        /// Work minutes
        work: u32,
        /// Break minutes
        #[arg(value_name = "BREAK")]
        break_minutes: u32,
    },
}

#[derive(Serialize)]
struct ScheduleView {
    durations: PolicyDurations,
    state: SchedulerState,
}

pub fn run(action: ScheduleAction) -> CliResult {
    let config = Config::load()?;
    let store = open_store(&config)?;
    let counter = Arc::new(DistractionCounter::new());
    let mut scheduler = AdaptiveScheduler::from_config(&config, store, counter.clone())?;

    match action {
        ScheduleAction::Show => {
            let view = ScheduleView {
                durations: scheduler.durations(),
                state: scheduler.current_state()?,
            };
            print_json(&view)?;
        }
        ScheduleAction::Adjust { distractions } => {
            counter.record_many(distractions);
            let decision = scheduler.adjust_durations()?;
            print_json(&decision)?;
        }
        ScheduleAction::Set {
            work,
            break_minutes,
        } => {
            let durations = scheduler.override_durations(work, break_minutes)?;
            print_json(&durations)?;
        }
    }
    Ok(())
}
