//! Step/reset environment over a fixed session history.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::scheduler::{
    Action, ActionCodec, DistractionPenalty, DurationBounds, PolicyDurations, RewardModel,
    SchedulerState, ACTION_COUNT,
};
use crate::storage::{Config, SessionSource};

/// Default episode length.
pub const DEFAULT_MAX_STEPS: u64 = 1000;

/// Cooperative stop flag checked at every step boundary.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Result of one environment step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepOutcome {
    pub state: SchedulerState,
    pub reward: i64,
    pub done: bool,
    /// Always empty; kept for parity with the usual step contract.
    pub info: serde_json::Map<String, serde_json::Value>,
}

/// Inclusive lower and upper limits of each observation component.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ObservationSpace {
    pub low: [f32; 4],
    pub high: [f32; 4],
}

/// Offline environment for training a scheduling policy.
///
/// Steps move the simulated durations exactly like the live application
/// step, minus distraction handling, and score the fixed history with a
/// [`RewardModel`]. The source is only read, never appended to. Give it a
/// [`crate::storage::HistorySnapshot`] rather than a store that is receiving
/// live sessions, otherwise the reward drifts during the run.
pub struct TrainingEnvironment<S: SessionSource> {
    source: S,
    bounds: DurationBounds,
    reward: RewardModel,
    max_steps: u64,
    initial: PolicyDurations,
    durations: PolicyDurations,
    step_count: u64,
    cancel: CancellationToken,
}

impl<S: SessionSource> TrainingEnvironment<S> {
    pub fn new(source: S, initial: PolicyDurations) -> Self {
        let bounds = DurationBounds::default();
        let initial = bounds.clip(initial);
        Self {
            source,
            bounds,
            reward: RewardModel::default(),
            max_steps: DEFAULT_MAX_STEPS,
            initial,
            durations: initial,
            step_count: 0,
            cancel: CancellationToken::new(),
        }
    }

    pub fn from_config(source: S, config: &Config) -> Self {
        Self::new(source, config.initial_durations())
            .with_bounds(config.bounds)
            .with_reward_model(config.reward.clone())
            .with_max_steps(config.training.max_steps)
    }

    /// Re-clips the initial durations into the new bounds.
    pub fn with_bounds(mut self, bounds: DurationBounds) -> Self {
        self.bounds = bounds;
        self.initial = bounds.clip(self.initial);
        self.durations = self.initial;
        self
    }

    pub fn with_reward_model(mut self, reward: RewardModel) -> Self {
        self.reward = reward;
        self
    }

    pub fn with_max_steps(mut self, max_steps: u64) -> Self {
        self.max_steps = max_steps;
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn bounds(&self) -> &DurationBounds {
        &self.bounds
    }

    pub fn max_steps(&self) -> u64 {
        self.max_steps
    }

    pub fn step_count(&self) -> u64 {
        self.step_count
    }

    pub fn durations(&self) -> PolicyDurations {
        self.durations
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Number of discrete actions.
    pub fn action_space(&self) -> usize {
        ACTION_COUNT
    }

    pub fn observation_space(&self) -> ObservationSpace {
        ObservationSpace {
            low: [0.0, 0.0, self.bounds.min_work as f32, self.bounds.min_break as f32],
            high: [100.0, 1.0, self.bounds.max_work as f32, self.bounds.max_break as f32],
        }
    }

    // ── Episode ──────────────────────────────────────────────────────

    /// Start a new episode. The simulated durations carry over from the
    /// previous episode; only the step counter is cleared.
    ///
    /// # Errors
    /// Returns a persistence error if analytics cannot be read.
    pub fn reset(&mut self) -> Result<SchedulerState, CoreError> {
        self.step_count = 0;
        let snapshot = self.source.analytics_snapshot()?;
        Ok(SchedulerState::new(&snapshot, self.durations))
    }

    /// Like [`reset`](Self::reset), but also returns the durations to the
    /// ones the environment was built with.
    ///
    /// # Errors
    /// Returns a persistence error if analytics cannot be read.
    pub fn restart(&mut self) -> Result<SchedulerState, CoreError> {
        self.durations = self.initial;
        self.reset()
    }

    /// Apply one action.
    ///
    /// # Errors
    /// Returns [`CoreError::Cancelled`] once the token is set,
    /// [`CoreError::InvalidAction`] for an id outside the action space, or a
    /// persistence error from the source. The environment is unchanged on
    /// error.
    pub fn step(&mut self, action: i64) -> Result<StepOutcome, CoreError> {
        if self.cancel.is_cancelled() {
            return Err(CoreError::Cancelled {
                steps: self.step_count,
            });
        }
        let action = Action::new(action)?;
        let delta = action.delta();
        debug_assert_eq!(
            ActionCodec::encode(delta.work_delta, delta.break_delta),
            Ok(action)
        );

        let durations =
            self.bounds
                .apply(self.durations, delta, 0, &DistractionPenalty::default());
        let snapshot = self.source.analytics_snapshot()?;
        let reward = self.reward.evaluate(&self.source)?;

        self.durations = durations;
        self.step_count += 1;
        Ok(StepOutcome {
            state: SchedulerState::new(&snapshot, durations),
            reward,
            done: self.step_count >= self.max_steps,
            info: serde_json::Map::new(),
        })
    }
}
