//! # FocusForge Core Library
//!
//! Adaptive work/break scheduling. Session outcomes are logged to SQLite,
//! summarised into a [`SchedulerState`], and a policy (hand-written rule
//! table or trained Q-table) picks how to move the next work and break
//! durations.
//!
//! ## Architecture
//!
//! - **Storage**: append-only SQLite session log and TOML configuration
//! - **Scheduler**: action codec, reward model, policies and the bounded
//!   application step
//! - **Distraction**: reset-on-read signal fed by an activity monitor
//! - **Training**: offline step/reset environment and a Q-learning trainer
//!
//! ## Key Components
//!
//! - [`SessionStore`]: session persistence and analytics
//! - [`SchedulingPolicy`]: picks and applies an action
//! - [`AdaptiveScheduler`]: live glue used by the CLI and UI
//! - [`TrainingEnvironment`]: offline training contract
//! - [`Config`]: application configuration

pub mod analytics;
pub mod distraction;
pub mod engine;
pub mod error;
pub mod scheduler;
pub mod session;
pub mod storage;
pub mod training;

pub use analytics::AnalyticsSnapshot;
pub use distraction::{ActivityFeed, DistractionCounter, DistractionSignal, NullSignal};
pub use engine::AdaptiveScheduler;
pub use error::{
    ConfigError, CoreError, InvalidActionError, PersistenceError, PolicyUnavailableError,
    ValidationError,
};
pub use scheduler::{
    Action, ActionCodec, DurationBounds, Policy, PolicyDurations, PolicyMode, RewardModel,
    RuleTable, SchedulerState, SchedulingDecision, SchedulingPolicy, TabularPolicy,
};
pub use session::{NewSession, Session};
pub use storage::{Config, HistorySnapshot, SessionSource, SessionStore};
pub use training::{CancellationToken, Trainer, TrainingEnvironment, TrainingReport};
