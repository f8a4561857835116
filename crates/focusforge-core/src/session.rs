//! Work/break session records.
//!
//! A [`Session`] is written once when a work interval ends (timeout or reset)
//! and is never updated or deleted afterwards.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Task label stored when the user did not name one.
pub const NO_TASK: &str = "No Task";

/// A persisted work+break cycle attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: i64,
    /// Planned work minutes.
    pub work_planned: u32,
    /// Minutes actually worked; may exceed or fall short of the plan.
    pub work_actual: f64,
    pub break_taken: bool,
    /// Break minutes.
    pub break_duration: u32,
    pub task: String,
    pub completed: bool,
    pub distraction_events: u32,
    pub timestamp: DateTime<Utc>,
}

/// A session that has not been written yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewSession {
    pub work_planned: u32,
    pub work_actual: f64,
    pub break_taken: bool,
    pub break_duration: u32,
    #[serde(default)]
    pub task: Option<String>,
    pub completed: bool,
    #[serde(default)]
    pub distraction_events: u32,
    pub timestamp: DateTime<Utc>,
}

impl NewSession {
    /// Start a record for a work interval stamped now.
    pub fn new(work_planned: u32, work_actual: f64, completed: bool) -> Self {
        Self {
            work_planned,
            work_actual,
            break_taken: false,
            break_duration: 0,
            task: None,
            completed,
            distraction_events: 0,
            timestamp: Utc::now(),
        }
    }

    pub fn with_break(mut self, break_duration: u32) -> Self {
        self.break_taken = true;
        self.break_duration = break_duration;
        self
    }

    pub fn with_task(mut self, task: impl Into<String>) -> Self {
        self.task = Some(task.into());
        self
    }

    pub fn with_distractions(mut self, distraction_events: u32) -> Self {
        self.distraction_events = distraction_events;
        self
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Task label as persisted: blank or missing becomes [`NO_TASK`].
    pub fn task_label(&self) -> &str {
        match self.task.as_deref().map(str::trim) {
            Some(t) if !t.is_empty() => t,
            _ => NO_TASK,
        }
    }

    /// Reject outcomes the UI should never produce.
    ///
    /// # Errors
    /// Returns [`ValidationError`] for a negative or non-finite
    /// `work_actual`.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !self.work_actual.is_finite() || self.work_actual < 0.0 {
            return Err(ValidationError::invalid(
                "work_actual",
                format!(
                    "must be a non-negative number of minutes, got {}",
                    self.work_actual
                ),
            ));
        }
        Ok(())
    }

    /// Attach the row id assigned by the store.
    pub(crate) fn into_session(self, id: i64) -> Session {
        let task = self.task_label().to_string();
        Session {
            id,
            work_planned: self.work_planned,
            work_actual: self.work_actual,
            break_taken: self.break_taken,
            break_duration: self.break_duration,
            task,
            completed: self.completed,
            distraction_events: self.distraction_events,
            timestamp: self.timestamp,
        }
    }
}
