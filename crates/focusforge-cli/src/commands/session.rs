use chrono::{DateTime, Utc};
use clap::Subcommand;
use focusforge_core::{Config, NewSession};

use super::{open_store, print_json, CliResult};

#[derive(Subcommand)]
pub enum SessionAction {
    /// Record a finished work interval
    Log {
        /// Planned work minutes
        #[arg(long)]
        planned: u32,
        /// Minutes actually worked
        #[arg(long)]
        actual: f64,
        /// The interval ran to completion
        #[arg(long)]
        completed: bool,
        /// Break minutes taken afterwards
        #[arg(long = "break")]
        break_minutes: Option<u32>,
        /// Task label
        #[arg(long)]
        task: Option<String>,
        /// Distraction events during the interval
        #[arg(long, default_value_t = 0)]
        distractions: u32,
        /// RFC 3339 timestamp (defaults to now)
        #[arg(long)]
        at: Option<String>,
    },
    /// Show recent sessions, newest first
    Recent {
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
}

pub fn run(action: SessionAction) -> CliResult {
    let config = Config::load()?;
    let store = open_store(&config)?;

    match action {
        SessionAction::Log {
            planned,
            actual,
            completed,
            break_minutes,
            task,
            distractions,
            at,
        } => {
            let mut outcome =
                NewSession::new(planned, actual, completed).with_distractions(distractions);
            if let Some(minutes) = break_minutes {
                outcome = outcome.with_break(minutes);
            }
            if let Some(task) = task {
                outcome = outcome.with_task(task);
            }
            if let Some(at) = at {
                let timestamp = DateTime::parse_from_rfc3339(&at)?.with_timezone(&Utc);
                outcome = outcome.with_timestamp(timestamp);
            }
            outcome.validate()?;
            let session = store.append_session(outcome)?;
            print_json(&session)?;
        }
        SessionAction::Recent { limit } => {
            let sessions = store.recent_sessions(limit)?;
            print_json(&sessions)?;
        }
    }
    Ok(())
}
