//! Analytics derived from the session log.
//!
//! An [`AnalyticsSnapshot`] is a pure function of the session history. It is
//! recomputed on every request and never cached.

use serde::{Deserialize, Serialize};

use crate::session::Session;

/// Default number of trailing sessions that must all fail to flag the user
/// as failing.
pub const DEFAULT_FAILURE_THRESHOLD: usize = 3;

/// Derived statistics over the whole session log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct AnalyticsSnapshot {
    /// 100 x completed / total, 0 with no sessions.
    pub success_rate: f64,
    /// True iff the newest `threshold` sessions all failed.
    pub consecutive_failures: bool,
    /// Consecutive completed sessions counted from the newest.
    pub streak: u32,
    /// Mean `work_actual` over completed sessions.
    pub average_work_duration: f64,
    /// Mean `distraction_events` over all sessions.
    pub average_distractions: f64,
    pub total_sessions: u64,
}

impl AnalyticsSnapshot {
    /// Compute a snapshot from a full history ordered newest first.
    pub fn from_sessions(newest_first: &[Session], failure_threshold: usize) -> Self {
        let total = newest_first.len();
        if total == 0 {
            return Self::default();
        }

        let completed: Vec<&Session> = newest_first.iter().filter(|s| s.completed).collect();
        let success_rate = completed.len() as f64 * 100.0 / total as f64;

        let average_work_duration = if completed.is_empty() {
            0.0
        } else {
            completed.iter().map(|s| s.work_actual).sum::<f64>() / completed.len() as f64
        };

        let average_distractions = newest_first
            .iter()
            .map(|s| f64::from(s.distraction_events))
            .sum::<f64>()
            / total as f64;

        Self {
            success_rate,
            consecutive_failures: consecutive_failures(
                newest_first.iter().map(|s| s.completed),
                failure_threshold,
            ),
            streak: streak(newest_first.iter().map(|s| s.completed)),
            average_work_duration,
            average_distractions,
            total_sessions: total as u64,
        }
    }
}

/// Count completed sessions from the newest, stopping at the first failure.
pub fn streak<I>(completed_newest_first: I) -> u32
where
    I: IntoIterator<Item = bool>,
{
    completed_newest_first
        .into_iter()
        .take_while(|completed| *completed)
        .count() as u32
}

/// True iff exactly `threshold` trailing sessions exist and all failed.
///
/// Shorter histories never trigger the flag, however many of them failed.
pub fn consecutive_failures<I>(completed_newest_first: I, threshold: usize) -> bool
where
    I: IntoIterator<Item = bool>,
{
    if threshold == 0 {
        return false;
    }
    let window: Vec<bool> = completed_newest_first.into_iter().take(threshold).collect();
    window.len() == threshold && window.iter().all(|completed| !completed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::NewSession;

    fn history(outcomes: &[(bool, u32, f64)]) -> Vec<Session> {
        outcomes
            .iter()
            .enumerate()
            .map(|(i, (completed, distractions, actual))| {
                NewSession::new(25, *actual, *completed)
                    .with_distractions(*distractions)
                    .into_session(i as i64 + 1)
            })
            .collect()
    }

    #[test]
    fn empty_history_yields_zeroes() {
        let snap = AnalyticsSnapshot::from_sessions(&[], DEFAULT_FAILURE_THRESHOLD);
        assert_eq!(snap.success_rate, 0.0);
        assert!(!snap.consecutive_failures);
        assert_eq!(snap.streak, 0);
        assert_eq!(snap.average_work_duration, 0.0);
        assert_eq!(snap.average_distractions, 0.0);
    }

    #[test]
    fn streak_stops_at_first_failure() {
        assert_eq!(streak([true, true, true, false, true]), 3);
        assert_eq!(streak([false, true, true]), 0);
        assert_eq!(streak(std::iter::empty()), 0);
    }

    #[test]
    fn consecutive_failures_requires_full_window() {
        assert!(consecutive_failures([false, false, false], 3));
        assert!(consecutive_failures([false, false, false, true], 3));
        assert!(!consecutive_failures([false, false], 3));
        assert!(!consecutive_failures([false, true, false], 3));
    }

    #[test]
    fn averages_use_their_own_populations() {
        // newest first
        let sessions = history(&[(true, 2, 30.0), (false, 6, 10.0), (true, 1, 20.0)]);
        let snap = AnalyticsSnapshot::from_sessions(&sessions, 3);
        assert!((snap.success_rate - 200.0 / 3.0).abs() < 1e-9);
        assert_eq!(snap.average_work_duration, 25.0);
        assert_eq!(snap.average_distractions, 3.0);
        assert_eq!(snap.streak, 1);
        assert_eq!(snap.total_sessions, 3);
    }
}
