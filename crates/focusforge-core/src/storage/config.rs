//! TOML-based application configuration.
//!
//! Stores the tunables of the adaptive scheduler:
//! - Work/break duration bounds and initial durations
//! - Failure threshold and reward shaping constants
//! - Distraction penalty weights
//! - Policy mode, model artifact location and the fallback rule table
//! - Offline training hyper-parameters
//!
//! Configuration is stored at `~/.config/focusforge/config.toml`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::data_dir;
use crate::error::ConfigError;
use crate::scheduler::{
    DistractionPenalty, DurationBounds, PolicyDurations, PolicyMode, RewardModel, RuleTable,
    ACTION_COUNT,
};

/// Initial durations used before the policy has made any decision.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    #[serde(default = "default_work_duration")]
    pub work_duration: u32,
    #[serde(default = "default_break_duration")]
    pub break_duration: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyticsConfig {
    #[serde(default = "default_failure_threshold")]
    pub consecutive_failure_threshold: usize,
}

/// Distraction weights applied after the policy picks an action.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DistractionConfig {
    #[serde(default = "default_penalty_per_event")]
    pub penalty_per_event: u32,
    #[serde(default = "default_max_penalty")]
    pub max_penalty: u32,
    #[serde(default = "default_break_minutes_per_event")]
    pub break_minutes_per_event: u32,
    /// Idle seconds before the activity feed counts an inactivity distraction.
    #[serde(default = "default_inactivity_threshold_secs")]
    pub inactivity_threshold_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyConfig {
    #[serde(default)]
    pub mode: PolicyMode,
    /// Trained policy artifact; defaults to `<data_dir>/policy.json`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_path: Option<PathBuf>,
    #[serde(default)]
    pub rules: RuleTable,
}

/// Hyper-parameters for offline Q-learning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingConfig {
    #[serde(default = "default_max_steps")]
    pub max_steps: u64,
    #[serde(default = "default_total_timesteps")]
    pub total_timesteps: u64,
    #[serde(default = "default_learning_rate")]
    pub learning_rate: f64,
    #[serde(default = "default_discount")]
    pub discount: f64,
    #[serde(default = "default_exploration")]
    pub exploration: f64,
    #[serde(default = "default_seed")]
    pub seed: u64,
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/focusforge/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub bounds: DurationBounds,
    #[serde(default)]
    pub defaults: DefaultsConfig,
    #[serde(default)]
    pub analytics: AnalyticsConfig,
    #[serde(default)]
    pub reward: RewardModel,
    #[serde(default)]
    pub distraction: DistractionConfig,
    #[serde(default)]
    pub policy: PolicyConfig,
    #[serde(default)]
    pub training: TrainingConfig,
}

fn default_work_duration() -> u32 {
    25
}
fn default_break_duration() -> u32 {
    5
}
fn default_failure_threshold() -> usize {
    3
}
fn default_penalty_per_event() -> u32 {
    2
}
fn default_max_penalty() -> u32 {
    10
}
fn default_break_minutes_per_event() -> u32 {
    1
}
fn default_inactivity_threshold_secs() -> u64 {
    300
}
fn default_max_steps() -> u64 {
    1000
}
fn default_total_timesteps() -> u64 {
    10_000
}
fn default_learning_rate() -> f64 {
    0.1
}
fn default_discount() -> f64 {
    0.9
}
fn default_exploration() -> f64 {
    0.1
}
fn default_seed() -> u64 {
    42
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            work_duration: default_work_duration(),
            break_duration: default_break_duration(),
        }
    }
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            consecutive_failure_threshold: default_failure_threshold(),
        }
    }
}

impl Default for DistractionConfig {
    fn default() -> Self {
        Self {
            penalty_per_event: default_penalty_per_event(),
            max_penalty: default_max_penalty(),
            break_minutes_per_event: default_break_minutes_per_event(),
            inactivity_threshold_secs: default_inactivity_threshold_secs(),
        }
    }
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            mode: PolicyMode::default(),
            model_path: None,
            rules: RuleTable::default(),
        }
    }
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            max_steps: default_max_steps(),
            total_timesteps: default_total_timesteps(),
            learning_rate: default_learning_rate(),
            discount: default_discount(),
            exploration: default_exploration(),
            seed: default_seed(),
        }
    }
}

impl DistractionConfig {
    pub fn penalty(&self) -> DistractionPenalty {
        DistractionPenalty {
            per_event: self.penalty_per_event,
            max_penalty: self.max_penalty,
            break_minutes_per_event: self.break_minutes_per_event,
        }
    }
}

impl Config {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        let unknown = || ConfigError::UnknownKey(key.to_string());
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let mut parts = key.split('.').peekable();
        if parts.peek().is_none() || key.is_empty() {
            return Err(unknown());
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            let is_leaf = parts.peek().is_none();
            if is_leaf {
                let obj = current.as_object_mut().ok_or_else(unknown)?;
                let existing = obj.get(part).ok_or_else(unknown)?;

                let new_value = match existing {
                    serde_json::Value::Bool(_) => serde_json::Value::Bool(
                        value.parse::<bool>().map_err(|e| invalid(e.to_string()))?,
                    ),
                    serde_json::Value::Number(n) => {
                        if n.is_f64() {
                            let parsed = value
                                .parse::<f64>()
                                .map_err(|_| invalid(format!("cannot parse '{value}' as number")))?;
                            serde_json::Number::from_f64(parsed)
                                .map(serde_json::Value::Number)
                                .ok_or_else(|| invalid(format!("'{value}' is not finite")))?
                        } else if let Ok(parsed) = value.parse::<u64>() {
                            serde_json::Value::Number(parsed.into())
                        } else {
                            let parsed = value
                                .parse::<i64>()
                                .map_err(|_| invalid(format!("cannot parse '{value}' as integer")))?;
                            serde_json::Value::Number(parsed.into())
                        }
                    }
                    serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                        serde_json::from_str(value).map_err(|e| invalid(e.to_string()))?
                    }
                    _ => serde_json::Value::String(value.into()),
                };

                obj.insert(part.to_string(), new_value);
                return Ok(());
            }

            current = current.get_mut(part).ok_or_else(unknown)?;
        }

        Err(unknown())
    }

    fn path() -> Result<PathBuf, ConfigError> {
        let dir = data_dir().map_err(|e| ConfigError::LoadFailed {
            path: PathBuf::from("config.toml"),
            message: e.to_string(),
        })?;
        Ok(dir.join("config.toml"))
    }

    /// Load from disk or write and return the default.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed or
    /// fails validation, or if the default config cannot be written to disk.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::path()?)
    }

    /// Load from an explicit path, creating a default file when absent.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => {
                let cfg: Config =
                    toml::from_str(&content).map_err(|e| ConfigError::ParseFailed(e.to_string()))?;
                cfg.validate()?;
                Ok(cfg)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let cfg = Self::default();
                cfg.save_to(path)?;
                Ok(cfg)
            }
            Err(e) => Err(ConfigError::LoadFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            }),
        }
    }

    /// Persist to disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be serialized or written to disk.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))?;
        Ok(())
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Set a value by dot-separated key without saving.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown, the value cannot be parsed, or
    /// the resulting configuration is invalid.
    pub fn set_value(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut json =
            serde_json::to_value(&*self).map_err(|e| ConfigError::ParseFailed(e.to_string()))?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let updated: Config = serde_json::from_value(json).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        updated.validate()?;
        *self = updated;
        Ok(())
    }

    /// Set a config value by key and persist it.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        self.set_value(key, value)?;
        self.save()
    }

    /// Check cross-field constraints.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |key: &str, message: &str| {
            Err(ConfigError::InvalidValue {
                key: key.to_string(),
                message: message.to_string(),
            })
        };

        let b = &self.bounds;
        if b.min_work > b.max_work {
            return invalid("bounds.min_work", "must not exceed bounds.max_work");
        }
        if b.min_break > b.max_break {
            return invalid("bounds.min_break", "must not exceed bounds.max_break");
        }
        if !(b.min_work..=b.max_work).contains(&self.defaults.work_duration) {
            return invalid("defaults.work_duration", "must lie within the work bounds");
        }
        if !(b.min_break..=b.max_break).contains(&self.defaults.break_duration) {
            return invalid("defaults.break_duration", "must lie within the break bounds");
        }
        if self.analytics.consecutive_failure_threshold == 0 {
            return invalid("analytics.consecutive_failure_threshold", "must be at least 1");
        }
        if self.reward.window == 0 {
            return invalid("reward.window", "must be at least 1");
        }
        if self.training.max_steps == 0 {
            return invalid("training.max_steps", "must be at least 1");
        }
        for (key, value) in [
            ("training.learning_rate", self.training.learning_rate),
            ("training.discount", self.training.discount),
            ("training.exploration", self.training.exploration),
        ] {
            if !value.is_finite() || !(0.0..=1.0).contains(&value) {
                return invalid(key, "must be a finite number in [0, 1]");
            }
        }
        if let Some(bad) = self.policy.rules.actions().find(|a| usize::from(*a) >= ACTION_COUNT) {
            return invalid("policy.rules", &format!("action {bad} is outside 0..=8"));
        }
        Ok(())
    }

    /// Initial durations from the `defaults` section.
    pub fn initial_durations(&self) -> PolicyDurations {
        PolicyDurations::new(self.defaults.work_duration, self.defaults.break_duration)
    }

    /// Resolved location of the trained policy artifact.
    pub fn model_path(&self) -> PathBuf {
        match &self.policy.model_path {
            Some(path) => path.clone(),
            None => data_dir()
                .unwrap_or_else(|_| PathBuf::from("."))
                .join("policy.json"),
        }
    }
}
