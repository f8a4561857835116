mod config;
pub mod database;
pub mod migrations;
mod snapshot;

pub use config::{
    AnalyticsConfig, Config, DefaultsConfig, DistractionConfig, PolicyConfig, TrainingConfig,
};
pub use database::SessionStore;
pub use snapshot::HistorySnapshot;

use std::path::PathBuf;
use std::sync::Arc;

use crate::analytics::AnalyticsSnapshot;
use crate::error::PersistenceError;
use crate::session::Session;

/// Read side of a session log.
///
/// Implemented by the live [`SessionStore`] and by a frozen
/// [`HistorySnapshot`], so offline training can run against a stable copy.
pub trait SessionSource {
    /// Up to `limit` sessions, newest first.
    fn recent_sessions(&self, limit: usize) -> Result<Vec<Session>, PersistenceError>;

    /// Analytics over every session currently in the log.
    fn analytics_snapshot(&self) -> Result<AnalyticsSnapshot, PersistenceError>;
}

impl<T: SessionSource + ?Sized> SessionSource for &T {
    fn recent_sessions(&self, limit: usize) -> Result<Vec<Session>, PersistenceError> {
        (**self).recent_sessions(limit)
    }

    fn analytics_snapshot(&self) -> Result<AnalyticsSnapshot, PersistenceError> {
        (**self).analytics_snapshot()
    }
}

impl<T: SessionSource + ?Sized> SessionSource for Arc<T> {
    fn recent_sessions(&self, limit: usize) -> Result<Vec<Session>, PersistenceError> {
        (**self).recent_sessions(limit)
    }

    fn analytics_snapshot(&self) -> Result<AnalyticsSnapshot, PersistenceError> {
        (**self).analytics_snapshot()
    }
}

/// Returns `~/.config/focusforge[-dev]/` based on FOCUSFORGE_ENV.
///
/// Set FOCUSFORGE_ENV=dev to use the development data directory, or
/// FOCUSFORGE_DATA_DIR to point somewhere else entirely.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> std::io::Result<PathBuf> {
    let dir = match std::env::var_os("FOCUSFORGE_DATA_DIR") {
        Some(custom) => PathBuf::from(custom),
        None => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");
            let env = std::env::var("FOCUSFORGE_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("focusforge-dev")
            } else {
                base_dir.join("focusforge")
            }
        }
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
