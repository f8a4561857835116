//! Policy selection and the duration application step.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::{
    Action, DistractionPenalty, DurationBounds, DurationDelta, PolicyDurations, SchedulerState,
    TabularPolicy,
};
use crate::distraction::DistractionSignal;
use crate::error::{CoreError, PolicyUnavailableError};
use crate::storage::Config;

/// Maps a scheduler state to an action id.
///
/// Implementations must be deterministic. The raw `i64` is validated by the
/// caller so a mismatched model surfaces as an error instead of being clamped.
pub trait Policy: Send + Sync {
    fn name(&self) -> &str;

    fn predict(&self, state: &SchedulerState) -> i64;
}

/// Which policy the scheduler may use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PolicyMode {
    /// Trained model when loaded, rule table otherwise.
    #[default]
    Auto,
    /// Rule table only.
    Rules,
    /// Trained model required.
    Model,
}

/// The strategy that produced a decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    Model,
    Rules,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strategy::Model => write!(f, "model"),
            Strategy::Rules => write!(f, "rules"),
        }
    }
}

/// Everything that went into one scheduling decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchedulingDecision {
    pub strategy: Strategy,
    pub policy_name: String,
    pub action: Action,
    pub delta: DurationDelta,
    pub distraction_count: u32,
    pub distraction_penalty: u32,
    pub previous: PolicyDurations,
    pub durations: PolicyDurations,
}

/// Picks an action from a model or a rule table and applies it.
pub struct SchedulingPolicy {
    mode: PolicyMode,
    model: Option<Box<dyn Policy>>,
    rules: Option<Box<dyn Policy>>,
    bounds: DurationBounds,
    penalty: DistractionPenalty,
    model_path: Option<PathBuf>,
}

impl SchedulingPolicy {
    /// A policy with no strategies configured yet.
    pub fn new(bounds: DurationBounds, penalty: DistractionPenalty) -> Self {
        Self {
            mode: PolicyMode::Auto,
            model: None,
            rules: None,
            bounds,
            penalty,
            model_path: None,
        }
    }

    pub fn with_mode(mut self, mode: PolicyMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_model(mut self, model: impl Policy + 'static) -> Self {
        self.model = Some(Box::new(model));
        self
    }

    pub fn with_rules(mut self, rules: impl Policy + 'static) -> Self {
        self.rules = Some(Box::new(rules));
        self
    }

    /// Build from configuration, loading the model artifact if one exists.
    ///
    /// A missing artifact is a mode switch, not an error. An unreadable one
    /// is an error only when the mode is [`PolicyMode::Model`].
    ///
    /// # Errors
    /// Returns [`PolicyUnavailableError::ModelLoadFailed`] in model mode when
    /// the artifact exists but cannot be parsed.
    pub fn from_config(config: &Config) -> Result<Self, CoreError> {
        let mut policy = Self::new(config.bounds, config.distraction.penalty())
            .with_mode(config.policy.mode)
            .with_rules(config.policy.rules.clone());
        if config.policy.mode == PolicyMode::Rules {
            return Ok(policy);
        }

        let path = config.model_path();
        policy.model_path = Some(path.clone());

        if path.exists() {
            match TabularPolicy::load(&path) {
                Ok(model) => {
                    tracing::info!(path = %path.display(), states = model.len(), "policy artifact loaded");
                    policy.model = Some(Box::new(model));
                }
                Err(e) if config.policy.mode == PolicyMode::Model => {
                    return Err(PolicyUnavailableError::ModelLoadFailed {
                        path,
                        message: e.to_string(),
                    }
                    .into());
                }
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "failed to load policy artifact, using rule table");
                }
            }
        } else {
            tracing::debug!(path = %path.display(), "no policy artifact, using rule table");
        }
        Ok(policy)
    }

    pub fn mode(&self) -> PolicyMode {
        self.mode
    }

    pub fn has_model(&self) -> bool {
        self.model.is_some()
    }

    pub fn bounds(&self) -> &DurationBounds {
        &self.bounds
    }

    pub fn penalty(&self) -> &DistractionPenalty {
        &self.penalty
    }

    /// The policy that would decide right now.
    ///
    /// # Errors
    /// Returns [`PolicyUnavailableError`] if the mode's policy is absent.
    pub fn active(&self) -> Result<(&dyn Policy, Strategy), PolicyUnavailableError> {
        match self.mode {
            PolicyMode::Model => self
                .model
                .as_deref()
                .map(|m| (m, Strategy::Model))
                .ok_or_else(|| PolicyUnavailableError::ModelMissing {
                    path: self.model_path.clone().unwrap_or_default(),
                }),
            PolicyMode::Rules => self
                .rules
                .as_deref()
                .map(|r| (r, Strategy::Rules))
                .ok_or(PolicyUnavailableError::NoPolicyConfigured),
            PolicyMode::Auto => self
                .model
                .as_deref()
                .map(|m| (m, Strategy::Model))
                .or_else(|| self.rules.as_deref().map(|r| (r, Strategy::Rules)))
                .ok_or(PolicyUnavailableError::NoPolicyConfigured),
        }
    }

    /// Ask the active policy for an action and validate it.
    ///
    /// # Errors
    /// Fails if no policy is available or the policy emits an id outside
    /// the action space.
    pub fn choose_action(&self, state: &SchedulerState) -> Result<(Action, Strategy), CoreError> {
        let (policy, strategy) = self.active()?;
        let raw = policy.predict(state);
        let action = Action::new(raw).map_err(|e| {
            tracing::error!(policy = policy.name(), action = raw, "policy emitted an out-of-range action");
            e
        })?;
        Ok((action, strategy))
    }

    /// Pure application step shared with offline training.
    pub fn apply_action(
        &self,
        current: PolicyDurations,
        action: Action,
        distraction_count: u32,
    ) -> PolicyDurations {
        self.bounds
            .apply(current, action.delta(), distraction_count, &self.penalty)
    }

    /// Make one scheduling decision.
    ///
    /// Consumes the distraction signal, so call it at most once per interval
    /// boundary. The signal is left untouched when no valid action can be
    /// produced.
    ///
    /// # Errors
    /// Returns [`PolicyUnavailableError`] or [`crate::error::InvalidActionError`]
    /// wrapped in [`CoreError`].
    pub fn schedule(
        &self,
        state: &SchedulerState,
        signal: &dyn DistractionSignal,
    ) -> Result<SchedulingDecision, CoreError> {
        let (action, strategy) = self.choose_action(state)?;
        let policy_name = self.active()?.0.name().to_string();

        let distraction_count = signal.reset_distractions();
        let previous = state.durations();
        let durations = self.apply_action(previous, action, distraction_count);

        let decision = SchedulingDecision {
            strategy,
            policy_name,
            action,
            delta: action.delta(),
            distraction_count,
            distraction_penalty: self.penalty.work_penalty(distraction_count),
            previous,
            durations,
        };
        tracing::info!(
            strategy = %decision.strategy,
            action = %decision.action,
            distractions = decision.distraction_count,
            work_minutes = decision.durations.work_duration,
            break_minutes = decision.durations.break_duration,
            "durations adjusted"
        );
        Ok(decision)
    }
}

impl fmt::Debug for SchedulingPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchedulingPolicy")
            .field("mode", &self.mode)
            .field("model", &self.model.as_ref().map(|m| m.name().to_string()))
            .field("rules", &self.rules.as_ref().map(|r| r.name().to_string()))
            .field("bounds", &self.bounds)
            .finish()
    }
}
