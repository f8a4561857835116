//! Frozen in-memory copy of the session log.

use super::SessionSource;
use crate::analytics::{AnalyticsSnapshot, DEFAULT_FAILURE_THRESHOLD};
use crate::error::PersistenceError;
use crate::session::Session;

/// Immutable session history held in memory.
///
/// Training runs against one of these so that live appends to the store
/// cannot shift the reward mid-run.
#[derive(Debug, Clone, Default)]
pub struct HistorySnapshot {
    newest_first: Vec<Session>,
    failure_threshold: usize,
}

impl HistorySnapshot {
    /// Build from sessions in append order (oldest first).
    pub fn new(mut oldest_first: Vec<Session>) -> Self {
        oldest_first.reverse();
        Self {
            newest_first: oldest_first,
            failure_threshold: DEFAULT_FAILURE_THRESHOLD,
        }
    }

    pub fn with_failure_threshold(mut self, threshold: usize) -> Self {
        self.failure_threshold = threshold;
        self
    }

    pub fn len(&self) -> usize {
        self.newest_first.len()
    }

    pub fn is_empty(&self) -> bool {
        self.newest_first.is_empty()
    }
}

impl SessionSource for HistorySnapshot {
    fn recent_sessions(&self, limit: usize) -> Result<Vec<Session>, PersistenceError> {
        Ok(self.newest_first.iter().take(limit).cloned().collect())
    }

    fn analytics_snapshot(&self) -> Result<AnalyticsSnapshot, PersistenceError> {
        Ok(AnalyticsSnapshot::from_sessions(
            &self.newest_first,
            self.failure_threshold,
        ))
    }
}
