//! Offline policy training.
//!
//! [`TrainingEnvironment`] exposes the scheduler's state/action/reward
//! contract as a step/reset loop; [`Trainer`] runs Q-learning over it and
//! produces a [`crate::scheduler::TabularPolicy`].
//!
//! Training must run against a stable copy of the session log
//! ([`crate::storage::SessionStore::freeze`]), never against a store that a
//! live scheduler is writing to.

mod env;
mod trainer;

pub use env::{
    CancellationToken, ObservationSpace, StepOutcome, TrainingEnvironment, DEFAULT_MAX_STEPS,
};
pub use trainer::{Trainer, TrainingReport};
