//! Adaptive work/break scheduling.
//!
//! The scheduler observes a [`SchedulerState`], asks a [`Policy`] for an
//! [`Action`], and turns it into new, bounded [`PolicyDurations`].
//!
//! ## Components
//!
//! - [`ActionCodec`]: action id (0-8) <-> pair of duration deltas
//! - [`RewardModel`]: scalar reward over a window of recent sessions
//! - [`RuleTable`]: hand-written fallback policy
//! - [`TabularPolicy`]: trained policy artifact
//! - [`SchedulingPolicy`]: strategy selection plus the application step

mod action;
mod model;
mod policy;
mod reward;
mod rules;

pub use action::{Action, ActionCodec, DurationDelta, ACTION_COUNT, DELTA_STEP};
pub use model::{StateKey, TabularPolicy};
pub use policy::{Policy, PolicyMode, SchedulingDecision, SchedulingPolicy, Strategy};
pub use reward::RewardModel;
pub use rules::{Rule, RuleCondition, RuleTable};

use serde::{Deserialize, Serialize};

use crate::analytics::AnalyticsSnapshot;

/// Allowed work and break durations, in minutes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DurationBounds {
    #[serde(default = "default_min_work")]
    pub min_work: u32,
    #[serde(default = "default_max_work")]
    pub max_work: u32,
    #[serde(default = "default_min_break")]
    pub min_break: u32,
    #[serde(default = "default_max_break")]
    pub max_break: u32,
}

fn default_min_work() -> u32 {
    15
}
fn default_max_work() -> u32 {
    60
}
fn default_min_break() -> u32 {
    5
}
fn default_max_break() -> u32 {
    30
}

impl Default for DurationBounds {
    fn default() -> Self {
        Self {
            min_work: default_min_work(),
            max_work: default_max_work(),
            min_break: default_min_break(),
            max_break: default_max_break(),
        }
    }
}

impl DurationBounds {
    pub fn clip_work(&self, minutes: i64) -> u32 {
        minutes.clamp(i64::from(self.min_work), i64::from(self.max_work)) as u32
    }

    pub fn clip_break(&self, minutes: i64) -> u32 {
        minutes.clamp(i64::from(self.min_break), i64::from(self.max_break)) as u32
    }

    pub fn clip(&self, durations: PolicyDurations) -> PolicyDurations {
        PolicyDurations {
            work_duration: self.clip_work(i64::from(durations.work_duration)),
            break_duration: self.clip_break(i64::from(durations.break_duration)),
        }
    }

    pub fn contains(&self, durations: PolicyDurations) -> bool {
        (self.min_work..=self.max_work).contains(&durations.work_duration)
            && (self.min_break..=self.max_break).contains(&durations.break_duration)
    }

    /// Apply a decoded action and a distraction count to the current durations.
    ///
    /// `work = clip(work + work_delta - penalty)`,
    /// `break = clip(break + break_delta + count * break_minutes_per_event)`.
    pub fn apply(
        &self,
        current: PolicyDurations,
        delta: DurationDelta,
        distraction_count: u32,
        penalty: &DistractionPenalty,
    ) -> PolicyDurations {
        let work = i64::from(current.work_duration) + i64::from(delta.work_delta)
            - i64::from(penalty.work_penalty(distraction_count));
        let brk = i64::from(current.break_duration)
            + i64::from(delta.break_delta)
            + penalty.break_extension(distraction_count);
        PolicyDurations {
            work_duration: self.clip_work(work),
            break_duration: self.clip_break(brk),
        }
    }
}

/// How observed distractions bend the chosen durations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistractionPenalty {
    /// Work minutes removed per distraction.
    pub per_event: u32,
    /// Cap on removed work minutes.
    pub max_penalty: u32,
    /// Break minutes added per distraction.
    pub break_minutes_per_event: u32,
}

impl Default for DistractionPenalty {
    fn default() -> Self {
        Self {
            per_event: 2,
            max_penalty: 10,
            break_minutes_per_event: 1,
        }
    }
}

impl DistractionPenalty {
    /// `min(max_penalty, count * per_event)`
    pub fn work_penalty(&self, distraction_count: u32) -> u32 {
        distraction_count
            .saturating_mul(self.per_event)
            .min(self.max_penalty)
    }

    pub fn break_extension(&self, distraction_count: u32) -> i64 {
        i64::from(distraction_count) * i64::from(self.break_minutes_per_event)
    }
}

/// Work/break minutes used for the next interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyDurations {
    pub work_duration: u32,
    pub break_duration: u32,
}

impl PolicyDurations {
    pub fn new(work_duration: u32, break_duration: u32) -> Self {
        Self {
            work_duration,
            break_duration,
        }
    }
}

impl Default for PolicyDurations {
    fn default() -> Self {
        Self::new(25, 5)
    }
}

/// Observation handed to a policy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SchedulerState {
    pub success_rate: f64,
    pub consecutive_failures: bool,
    pub work_duration: u32,
    pub break_duration: u32,
}

impl SchedulerState {
    pub fn new(snapshot: &AnalyticsSnapshot, durations: PolicyDurations) -> Self {
        Self {
            success_rate: snapshot.success_rate,
            consecutive_failures: snapshot.consecutive_failures,
            work_duration: durations.work_duration,
            break_duration: durations.break_duration,
        }
    }

    pub fn durations(&self) -> PolicyDurations {
        PolicyDurations::new(self.work_duration, self.break_duration)
    }

    /// Flat numeric form `[success_rate, failing (0/1), work, break]`.
    pub fn observation(&self) -> [f32; 4] {
        [
            self.success_rate as f32,
            if self.consecutive_failures { 1.0 } else { 0.0 },
            self.work_duration as f32,
            self.break_duration as f32,
        ]
    }
}
