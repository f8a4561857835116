pub mod config;
pub mod policy;
pub mod schedule;
pub mod session;
pub mod stats;
pub mod train;

use std::sync::Arc;

use focusforge_core::{Config, SessionStore};

pub type CliResult = Result<(), Box<dyn std::error::Error>>;

/// Open the default store with the configured failure threshold.
pub fn open_store(config: &Config) -> Result<Arc<SessionStore>, Box<dyn std::error::Error>> {
    let store = SessionStore::open()?
        .with_failure_threshold(config.analytics.consecutive_failure_threshold);
    Ok(Arc::new(store))
}

pub fn print_json<T: serde::Serialize>(value: &T) -> CliResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
