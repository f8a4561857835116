//! Live scheduler.
//!
//! Glue between the UI loop and the core: session outcomes go in, new
//! durations come out. Scheduling is driven synchronously by one caller,
//! once per interval boundary.
//!
//! ## Usage
//!
//! ```ignore
//! let mut scheduler = AdaptiveScheduler::from_config(&config, store, signal)?;
//! scheduler.ingest_outcome(NewSession::new(25, 25.0, true))?;
//! let decision = scheduler.adjust_durations()?;
//! ```

use std::sync::Arc;

use crate::distraction::DistractionSignal;
use crate::error::{CoreError, ValidationError};
use crate::scheduler::{
    DurationBounds, PolicyDurations, SchedulerState, SchedulingDecision, SchedulingPolicy,
};
use crate::session::{NewSession, Session};
use crate::storage::{Config, SessionStore};

const KV_WORK: &str = "scheduler.work_duration";
const KV_BREAK: &str = "scheduler.break_duration";

/// Owns the live [`PolicyDurations`] and drives one [`SchedulingPolicy`].
pub struct AdaptiveScheduler {
    store: Arc<SessionStore>,
    policy: SchedulingPolicy,
    signal: Arc<dyn DistractionSignal>,
    durations: PolicyDurations,
}

impl AdaptiveScheduler {
    /// Starting durations are clipped into the policy's bounds.
    pub fn new(
        store: Arc<SessionStore>,
        policy: SchedulingPolicy,
        signal: Arc<dyn DistractionSignal>,
        initial: PolicyDurations,
    ) -> Self {
        let durations = policy.bounds().clip(initial);
        Self {
            store,
            policy,
            signal,
            durations,
        }
    }

    /// Build from configuration, resuming the durations persisted by the
    /// previous run when they are still within bounds.
    ///
    /// # Errors
    /// Fails only when the policy cannot be built (see
    /// [`SchedulingPolicy::from_config`]).
    pub fn from_config(
        config: &Config,
        store: Arc<SessionStore>,
        signal: Arc<dyn DistractionSignal>,
    ) -> Result<Self, CoreError> {
        let policy = SchedulingPolicy::from_config(config)?;
        let initial = match load_durations(&store) {
            Ok(Some(saved)) if config.bounds.contains(saved) => saved,
            Ok(Some(saved)) => {
                tracing::warn!(?saved, "persisted durations out of bounds, using defaults");
                config.initial_durations()
            }
            Ok(None) => config.initial_durations(),
            Err(e) => {
                tracing::warn!(error = %e, "failed to read persisted durations, using defaults");
                config.initial_durations()
            }
        };
        Ok(Self::new(store, policy, signal, initial))
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn durations(&self) -> PolicyDurations {
        self.durations
    }

    pub fn policy(&self) -> &SchedulingPolicy {
        &self.policy
    }

    pub fn bounds(&self) -> &DurationBounds {
        self.policy.bounds()
    }

    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    /// Snapshot of analytics plus the live durations.
    ///
    /// # Errors
    /// Returns a persistence error if analytics cannot be read.
    pub fn current_state(&self) -> Result<SchedulerState, CoreError> {
        let snapshot = self.store.analytics_snapshot()?;
        Ok(SchedulerState::new(&snapshot, self.durations))
    }

    // ── Operations ───────────────────────────────────────────────────

    /// Record the outcome of a finished work interval.
    ///
    /// # Errors
    /// Rejects a negative or non-finite `work_actual`; otherwise fails only
    /// if the write cannot be committed.
    pub fn ingest_outcome(&self, outcome: NewSession) -> Result<Session, CoreError> {
        outcome.validate()?;
        Ok(self.store.append_session(outcome)?)
    }

    /// Make one scheduling decision and adopt its durations.
    ///
    /// Drains the distraction signal. On error the durations are unchanged.
    ///
    /// # Errors
    /// Propagates persistence, policy and action errors.
    pub fn adjust_durations(&mut self) -> Result<SchedulingDecision, CoreError> {
        let state = self.current_state()?;
        let decision = self.policy.schedule(&state, self.signal.as_ref())?;
        self.durations = decision.durations;
        self.persist();
        Ok(decision)
    }

    /// Explicit user override from settings.
    ///
    /// # Errors
    /// Returns a validation error if either value is outside the bounds.
    pub fn override_durations(
        &mut self,
        work_duration: u32,
        break_duration: u32,
    ) -> Result<PolicyDurations, CoreError> {
        let requested = PolicyDurations::new(work_duration, break_duration);
        let bounds = self.policy.bounds();
        if !bounds.contains(requested) {
            return Err(ValidationError::invalid(
                "durations",
                format!(
                    "work must be in {}..={} and break in {}..={}, got {work_duration}/{break_duration}",
                    bounds.min_work, bounds.max_work, bounds.min_break, bounds.max_break
                ),
            )
            .into());
        }
        self.durations = requested;
        self.persist();
        tracing::info!(
            work_minutes = work_duration,
            break_minutes = break_duration,
            "durations overridden"
        );
        Ok(requested)
    }

    fn persist(&self) {
        let result = self
            .store
            .kv_set(KV_WORK, &self.durations.work_duration.to_string())
            .and_then(|()| {
                self.store
                    .kv_set(KV_BREAK, &self.durations.break_duration.to_string())
            });
        if let Err(e) = result {
            tracing::warn!(error = %e, "failed to persist durations");
        }
    }
}

/// Durations saved by a previous [`AdaptiveScheduler`], if any.
///
/// # Errors
/// Returns a persistence error if the kv table cannot be read.
pub fn load_durations(
    store: &SessionStore,
) -> Result<Option<PolicyDurations>, crate::error::PersistenceError> {
    let work = store.kv_get(KV_WORK)?.and_then(|v| v.parse().ok());
    let brk = store.kv_get(KV_BREAK)?.and_then(|v| v.parse().ok());
    Ok(work.zip(brk).map(|(w, b)| PolicyDurations::new(w, b)))
}

impl std::fmt::Debug for AdaptiveScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdaptiveScheduler")
            .field("policy", &self.policy)
            .field("durations", &self.durations)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distraction::DistractionCounter;
    use crate::scheduler::{DistractionPenalty, PolicyMode, RuleTable, Strategy};

    fn scheduler(counter: Arc<DistractionCounter>) -> AdaptiveScheduler {
        let store = Arc::new(SessionStore::open_in_memory().unwrap());
        let policy = SchedulingPolicy::new(DurationBounds::default(), DistractionPenalty::default())
            .with_mode(PolicyMode::Rules)
            .with_rules(RuleTable::default());
        AdaptiveScheduler::new(store, policy, counter, PolicyDurations::default())
    }

    #[test]
    fn failing_run_backs_off() {
        let counter = Arc::new(DistractionCounter::new());
        let mut s = scheduler(Arc::clone(&counter));
        for _ in 0..3 {
            s.ingest_outcome(NewSession::new(25, 8.0, false)).unwrap();
        }
        let decision = s.adjust_durations().unwrap();
        assert_eq!(decision.strategy, Strategy::Rules);
        assert_eq!(i64::from(decision.action), 2);
        assert_eq!(s.durations(), PolicyDurations::new(20, 10));
        assert_eq!(load_durations(s.store()).unwrap(), Some(PolicyDurations::new(20, 10)));
    }

    #[test]
    fn distractions_are_consumed_once() {
        let counter = Arc::new(DistractionCounter::new());
        let mut s = scheduler(Arc::clone(&counter));
        counter.record_many(2);
        let first = s.adjust_durations().unwrap();
        let second = s.adjust_durations().unwrap();
        assert_eq!(first.distraction_count, 2);
        assert_eq!(second.distraction_count, 0);
    }

    #[test]
    fn override_is_bounds_checked() {
        let mut s = scheduler(Arc::new(DistractionCounter::new()));
        assert!(matches!(
            s.override_durations(70, 5),
            Err(CoreError::Validation(_))
        ));
        assert_eq!(s.durations(), PolicyDurations::default());
        assert_eq!(
            s.override_durations(45, 15).unwrap(),
            PolicyDurations::new(45, 15)
        );
        assert_eq!(s.current_state().unwrap().work_duration, 45);
    }

    #[test]
    fn ingest_rejects_negative_minutes() {
        let s = scheduler(Arc::new(DistractionCounter::new()));
        assert!(matches!(
            s.ingest_outcome(NewSession::new(25, -1.0, false)),
            Err(CoreError::Validation(_))
        ));
        assert!(s.ingest_outcome(NewSession::new(25, f64::NAN, false)).is_err());
        assert_eq!(s.store().session_count().unwrap(), 0);
    }
}
