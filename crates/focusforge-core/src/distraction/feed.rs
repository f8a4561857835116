//! Active-window and inactivity feed.
//!
//! Classification of window titles happens upstream; the feed only turns
//! classified observations and idle reports into counted events.

use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::{DistractionCounter, DistractionSignal};

const MAX_THRESHOLD_SECS: u64 = 365 * 24 * 60 * 60;

/// Retained events; older ones are dropped, totals keep counting.
pub const EVENT_LOG_CAPACITY: usize = 512;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowClass {
    Productive,
    OffTask,
    Unknown,
}

/// One sample from the active-window feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowObservation {
    pub title: String,
    pub classification: WindowClass,
    pub observed_at: DateTime<Utc>,
}

impl WindowObservation {
    pub fn new(title: impl Into<String>, classification: WindowClass) -> Self {
        Self {
            title: title.into(),
            classification,
            observed_at: Utc::now(),
        }
    }

    pub fn at(mut self, observed_at: DateTime<Utc>) -> Self {
        self.observed_at = observed_at;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistractionKind {
    /// Switched into a window classified as off-task. Counted.
    OffTaskWindow,
    /// Active window title changed. Logged only.
    AppSwitch,
    /// No activity for longer than the threshold. Counted.
    Inactivity,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistractionEvent {
    pub kind: DistractionKind,
    pub detail: String,
    pub at: DateTime<Utc>,
}

/// Event totals grouped by kind, since the feed was created.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistractionSummary {
    pub total: usize,
    pub by_kind: BTreeMap<DistractionKind, usize>,
}

#[derive(Debug)]
struct FeedState {
    last_title: Option<String>,
    last_activity: DateTime<Utc>,
    events: VecDeque<DistractionEvent>,
    totals: BTreeMap<DistractionKind, usize>,
}

impl FeedState {
    fn push(&mut self, event: DistractionEvent) {
        *self.totals.entry(event.kind).or_insert(0) += 1;
        if self.events.len() == EVENT_LOG_CAPACITY {
            self.events.pop_front();
        }
        self.events.push_back(event);
    }
}

/// Turns window observations and idle time into a [`DistractionSignal`].
#[derive(Debug)]
pub struct ActivityFeed {
    inactivity_threshold: Duration,
    counter: Arc<DistractionCounter>,
    state: Mutex<FeedState>,
}

impl ActivityFeed {
    pub fn new(inactivity_threshold_secs: u64) -> Self {
        let secs = inactivity_threshold_secs.min(MAX_THRESHOLD_SECS) as i64;
        Self {
            inactivity_threshold: Duration::seconds(secs),
            counter: Arc::new(DistractionCounter::new()),
            state: Mutex::new(FeedState {
                last_title: None,
                last_activity: Utc::now(),
                events: VecDeque::new(),
                totals: BTreeMap::new(),
            }),
        }
    }

    /// Share the underlying counter, e.g. with a UI hook that records
    /// distractions directly.
    pub fn counter(&self) -> Arc<DistractionCounter> {
        Arc::clone(&self.counter)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, FeedState> {
        // Bounded log plus counters; safe to keep using after a panic.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Feed one active-window sample.
    ///
    /// A title change is an app switch. Switching into an off-task window
    /// also counts as a distraction; staying in it does not count again.
    pub fn observe_window(&self, observation: WindowObservation) {
        let mut state = self.lock();
        let changed = state.last_title.as_deref() != Some(observation.title.as_str());
        if !changed {
            return;
        }
        if state.last_title.is_some() {
            state.push(DistractionEvent {
                kind: DistractionKind::AppSwitch,
                detail: observation.title.clone(),
                at: observation.observed_at,
            });
        }
        if observation.classification == WindowClass::OffTask {
            state.push(DistractionEvent {
                kind: DistractionKind::OffTaskWindow,
                detail: observation.title.clone(),
                at: observation.observed_at,
            });
            self.counter.record();
            tracing::debug!(title = %observation.title, "off-task window");
        }
        state.last_title = Some(observation.title);
    }

    /// Note user input at `at`.
    pub fn record_activity(&self, at: DateTime<Utc>) {
        self.lock().last_activity = at;
    }

    /// Count an inactivity distraction if idle longer than the threshold.
    ///
    /// The idle clock restarts on detection, so an uninterrupted idle stretch
    /// counts once for every threshold it spans. Returns whether an event was
    /// recorded.
    pub fn check_inactivity(&self, now: DateTime<Utc>) -> bool {
        let mut state = self.lock();
        let idle = now - state.last_activity;
        if idle <= self.inactivity_threshold {
            return false;
        }
        state.push(DistractionEvent {
            kind: DistractionKind::Inactivity,
            detail: format!("idle {}s", idle.num_seconds()),
            at: now,
        });
        state.last_activity = now;
        self.counter.record();
        tracing::debug!(idle_secs = idle.num_seconds(), "inactivity detected");
        true
    }

    /// Retained events, oldest first.
    pub fn events(&self) -> Vec<DistractionEvent> {
        self.lock().events.iter().cloned().collect()
    }

    /// Drain the retained events. Totals are unaffected.
    pub fn take_events(&self) -> Vec<DistractionEvent> {
        self.lock().events.drain(..).collect()
    }

    pub fn summary(&self) -> DistractionSummary {
        let state = self.lock();
        DistractionSummary {
            total: state.totals.values().sum(),
            by_kind: state.totals.clone(),
        }
    }
}

impl DistractionSignal for ActivityFeed {
    fn reset_distractions(&self) -> u32 {
        self.counter.reset_distractions()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t0() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2025-01-01T09:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn off_task_switch_counts_once() {
        let feed = ActivityFeed::new(300);
        feed.observe_window(WindowObservation::new("editor", WindowClass::Productive));
        feed.observe_window(WindowObservation::new("video site", WindowClass::OffTask));
        feed.observe_window(WindowObservation::new("video site", WindowClass::OffTask));
        assert_eq!(feed.reset_distractions(), 1);

        let summary = feed.summary();
        assert_eq!(summary.total, 2);
        assert_eq!(summary.by_kind.get(&DistractionKind::AppSwitch), Some(&1));
        assert_eq!(summary.by_kind.get(&DistractionKind::OffTaskWindow), Some(&1));
    }

    #[test]
    fn inactivity_counted_per_threshold_elapsed() {
        let feed = ActivityFeed::new(300);
        feed.record_activity(t0());
        assert!(!feed.check_inactivity(t0() + Duration::seconds(300)));
        assert!(feed.check_inactivity(t0() + Duration::seconds(301)));
        assert!(!feed.check_inactivity(t0() + Duration::seconds(400)));
        assert!(feed.check_inactivity(t0() + Duration::seconds(602)));
        assert_eq!(feed.reset_distractions(), 2);
    }

    #[test]
    fn event_log_is_bounded_but_totals_are_not() {
        let feed = ActivityFeed::new(300);
        for i in 0..EVENT_LOG_CAPACITY + 10 {
            let class = if i % 2 == 0 {
                WindowClass::Productive
            } else {
                WindowClass::OffTask
            };
            feed.observe_window(WindowObservation::new(format!("window {i}"), class).at(t0()));
        }
        let switches = EVENT_LOG_CAPACITY + 9;
        let off_task = (EVENT_LOG_CAPACITY + 10) / 2;

        assert_eq!(feed.events().len(), EVENT_LOG_CAPACITY);
        let summary = feed.summary();
        assert_eq!(summary.total, switches + off_task);
        assert_eq!(summary.by_kind.get(&DistractionKind::AppSwitch), Some(&switches));

        assert_eq!(feed.take_events().len(), EVENT_LOG_CAPACITY);
        assert!(feed.events().is_empty());
        assert_eq!(feed.summary(), summary);
    }

    #[test]
    fn activity_restarts_idle_clock() {
        let feed = ActivityFeed::new(60);
        feed.record_activity(t0());
        feed.record_activity(t0() + Duration::seconds(50));
        assert!(!feed.check_inactivity(t0() + Duration::seconds(100)));
    }

    #[test]
    fn counter_is_shared() {
        let feed = ActivityFeed::new(300);
        feed.counter().record_many(3);
        assert_eq!(feed.reset_distractions(), 3);
        assert_eq!(feed.counter().peek(), 0);
    }
}
