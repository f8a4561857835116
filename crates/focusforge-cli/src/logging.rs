//! stderr logging, filtered by `FOCUSFORGE_LOG` (default `warn`).

use tracing_subscriber::EnvFilter;

pub const LOG_ENV: &str = "FOCUSFORGE_LOG";

/// Install the global subscriber. Call once at startup.
pub fn init() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));

    // stdout carries command output, so logs go to stderr.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
