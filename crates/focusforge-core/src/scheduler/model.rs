//! Trained policy artifact.
//!
//! A Q-table over a discretised [`SchedulerState`]. The scheduler treats it as
//! an opaque `state -> action` map; only the trainer looks at the values.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::{Action, DurationBounds, Policy, SchedulerState, ACTION_COUNT, DELTA_STEP};
use crate::error::CoreError;

/// Width of a success-rate band, in percentage points.
const SUCCESS_BAND_WIDTH: f64 = 20.0;
const SUCCESS_BANDS: u8 = 5;

/// Discretised scheduler state used as a Q-table key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StateKey {
    /// 0..=4, one per 20 points of success rate.
    pub success_band: u8,
    pub failing: bool,
    /// Work duration in 5-minute steps above the minimum.
    pub work_step: u8,
    /// Break duration in 5-minute steps above the minimum.
    pub break_step: u8,
}

impl StateKey {
    pub fn from_state(state: &SchedulerState, bounds: &DurationBounds) -> Self {
        let band = (state.success_rate / SUCCESS_BAND_WIDTH).floor();
        let success_band = if band.is_finite() {
            band.clamp(0.0, f64::from(SUCCESS_BANDS - 1)) as u8
        } else {
            0
        };
        let step = |minutes: u32, min: u32| {
            (minutes.saturating_sub(min) / DELTA_STEP as u32).min(u32::from(u8::MAX)) as u8
        };
        Self {
            success_band,
            failing: state.consecutive_failures,
            work_step: step(state.work_duration, bounds.min_work),
            break_step: step(state.break_duration, bounds.min_break),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct QEntry {
    state: StateKey,
    values: [f64; ACTION_COUNT],
}

#[derive(Debug, Serialize, Deserialize)]
struct PolicyArtifact {
    bounds: DurationBounds,
    entries: Vec<QEntry>,
}

/// Greedy policy over a learned Q-table.
///
/// Inference is deterministic: the highest-valued action wins and ties go to
/// the lowest action id. States never seen in training map to
/// [`Action::HOLD`].
#[derive(Debug, Clone, Default)]
pub struct TabularPolicy {
    bounds: DurationBounds,
    q: HashMap<StateKey, [f64; ACTION_COUNT]>,
}

impl TabularPolicy {
    pub fn new(bounds: DurationBounds) -> Self {
        Self {
            bounds,
            q: HashMap::new(),
        }
    }

    pub fn bounds(&self) -> &DurationBounds {
        &self.bounds
    }

    pub fn key(&self, state: &SchedulerState) -> StateKey {
        StateKey::from_state(state, &self.bounds)
    }

    /// Number of states with learned values.
    pub fn len(&self) -> usize {
        self.q.len()
    }

    pub fn is_empty(&self) -> bool {
        self.q.is_empty()
    }

    pub fn q_values(&self, key: &StateKey) -> [f64; ACTION_COUNT] {
        self.q.get(key).copied().unwrap_or([0.0; ACTION_COUNT])
    }

    pub fn q_value(&self, key: &StateKey, action: Action) -> f64 {
        self.q_values(key)[action.index()]
    }

    pub fn set_q_value(&mut self, key: StateKey, action: Action, value: f64) {
        self.q.entry(key).or_insert([0.0; ACTION_COUNT])[action.index()] = value;
    }

    pub fn max_q(&self, key: &StateKey) -> f64 {
        self.q_values(key)
            .into_iter()
            .fold(f64::NEG_INFINITY, f64::max)
    }

    /// Argmax with lowest-index tie-break.
    pub fn best_action(&self, key: &StateKey) -> Action {
        let values = self.q_values(key);
        let mut best = Action::HOLD;
        let mut best_value = f64::NEG_INFINITY;
        for action in Action::all() {
            let value = values[action.index()];
            if value > best_value {
                best_value = value;
                best = action;
            }
        }
        best
    }

    /// Write the artifact as JSON.
    ///
    /// # Errors
    /// Returns an error if serialization or the file write fails.
    pub fn save(&self, path: &Path) -> Result<(), CoreError> {
        let mut entries: Vec<QEntry> = self
            .q
            .iter()
            .map(|(state, values)| QEntry {
                state: *state,
                values: *values,
            })
            .collect();
        entries.sort_by_key(|e| e.state);
        let artifact = PolicyArtifact {
            bounds: self.bounds,
            entries,
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(&artifact)?)?;
        tracing::info!(path = %path.display(), states = self.q.len(), "policy artifact saved");
        Ok(())
    }

    /// Read an artifact written by [`TabularPolicy::save`].
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, CoreError> {
        let raw = std::fs::read_to_string(path)?;
        let artifact: PolicyArtifact = serde_json::from_str(&raw)?;
        let q = artifact
            .entries
            .into_iter()
            .map(|e| (e.state, e.values))
            .collect();
        Ok(Self {
            bounds: artifact.bounds,
            q,
        })
    }
}

impl Policy for TabularPolicy {
    fn name(&self) -> &str {
        "tabular-q"
    }

    fn predict(&self, state: &SchedulerState) -> i64 {
        let key = self.key(state);
        if self.q.contains_key(&key) {
            i64::from(self.best_action(&key))
        } else {
            i64::from(Action::HOLD)
        }
    }
}
