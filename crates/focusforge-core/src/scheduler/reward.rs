//! Reward signal over recent sessions.

use serde::{Deserialize, Serialize};

use crate::analytics;
use crate::error::PersistenceError;
use crate::session::Session;
use crate::storage::SessionSource;

/// Scores a window of recent sessions.
///
/// Each session contributes independently:
///
/// | completed | distractions <= tolerance | reward |
/// |-----------|---------------------------|--------|
/// | yes       | yes                       | +1     |
/// | yes       | no                        | -2     |
/// | no        | no                        | -5     |
/// | no        | yes                       | -1     |
///
/// A streak of at least `streak_bonus_threshold` adds `streak_bonus`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardModel {
    /// Number of most recent sessions inspected.
    #[serde(default = "default_window")]
    pub window: usize,
    #[serde(default = "default_streak_bonus_threshold")]
    pub streak_bonus_threshold: u32,
    #[serde(default = "default_streak_bonus")]
    pub streak_bonus: i64,
    /// Highest distraction count still treated as a focused session.
    #[serde(default = "default_distraction_tolerance")]
    pub distraction_tolerance: u32,
}

fn default_window() -> usize {
    10
}
fn default_streak_bonus_threshold() -> u32 {
    3
}
fn default_streak_bonus() -> i64 {
    3
}
fn default_distraction_tolerance() -> u32 {
    3
}

impl Default for RewardModel {
    fn default() -> Self {
        Self {
            window: default_window(),
            streak_bonus_threshold: default_streak_bonus_threshold(),
            streak_bonus: default_streak_bonus(),
            distraction_tolerance: default_distraction_tolerance(),
        }
    }
}

impl RewardModel {
    pub fn session_reward(&self, session: &Session) -> i64 {
        let focused = session.distraction_events <= self.distraction_tolerance;
        match (session.completed, focused) {
            (true, true) => 1,
            (true, false) => -2,
            (false, false) => -5,
            (false, true) => -1,
        }
    }

    pub fn streak_bonus(&self, streak: u32) -> i64 {
        if streak >= self.streak_bonus_threshold {
            self.streak_bonus
        } else {
            0
        }
    }

    /// Sum over at most `window` sessions plus the streak bonus.
    pub fn compute(&self, recent_sessions: &[Session], streak: u32) -> i64 {
        recent_sessions
            .iter()
            .take(self.window)
            .map(|s| self.session_reward(s))
            .sum::<i64>()
            + self.streak_bonus(streak)
    }

    /// Reward for the current contents of a session log.
    ///
    /// The window and the streak come from one read. The streak is counted
    /// over at most `max(window, streak_bonus_threshold)` sessions, which is
    /// enough to decide the bonus.
    pub fn evaluate<S: SessionSource + ?Sized>(&self, source: &S) -> Result<i64, PersistenceError> {
        let limit = self.window.max(self.streak_bonus_threshold as usize);
        let recent = source.recent_sessions(limit)?;
        let streak = analytics::streak(recent.iter().map(|s| s.completed));
        Ok(self.compute(&recent, streak))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::NewSession;

    fn session(completed: bool, distractions: u32) -> Session {
        NewSession::new(25, 25.0, completed)
            .with_distractions(distractions)
            .into_session(1)
    }

    #[test]
    fn per_session_table() {
        let model = RewardModel::default();
        assert_eq!(model.session_reward(&session(true, 3)), 1);
        assert_eq!(model.session_reward(&session(true, 4)), -2);
        assert_eq!(model.session_reward(&session(false, 4)), -5);
        assert_eq!(model.session_reward(&session(false, 0)), -1);
    }

    #[test]
    fn mixed_window_without_streak() {
        let model = RewardModel::default();
        let window = [session(true, 1), session(false, 5)];
        assert_eq!(model.compute(&window, 0), -4);
    }

    #[test]
    fn empty_window_is_streak_bonus_only() {
        let model = RewardModel::default();
        assert_eq!(model.compute(&[], 0), 0);
        assert_eq!(model.compute(&[], 2), 0);
        assert_eq!(model.compute(&[], 3), 3);
    }

    #[test]
    fn window_limits_inspected_sessions() {
        let model = RewardModel {
            window: 2,
            ..Default::default()
        };
        let sessions = [session(true, 0), session(true, 0), session(false, 9)];
        assert_eq!(model.compute(&sessions, 0), 2);
    }

    /// Serves sessions but fails analytics, so any second read shows up.
    struct SessionsOnly(Vec<Session>);

    impl SessionSource for SessionsOnly {
        fn recent_sessions(&self, limit: usize) -> Result<Vec<Session>, PersistenceError> {
            Ok(self.0.iter().take(limit).cloned().collect())
        }

        fn analytics_snapshot(&self) -> Result<analytics::AnalyticsSnapshot, PersistenceError> {
            Err(PersistenceError::QueryFailed("analytics not available".into()))
        }
    }

    #[test]
    fn evaluate_reads_window_and_streak_together() {
        let model = RewardModel::default();
        let source = SessionsOnly(vec![
            session(true, 0),
            session(true, 0),
            session(true, 5),
            session(false, 0),
        ]);
        assert_eq!(model.evaluate(&source).unwrap(), 1 + 1 - 2 - 1 + 3);
    }

    #[test]
    fn evaluate_sees_streak_longer_than_window() {
        let model = RewardModel {
            window: 1,
            ..Default::default()
        };
        let source = SessionsOnly(vec![session(true, 0); 4]);
        assert_eq!(model.evaluate(&source).unwrap(), 1 + 3);

        let short = SessionsOnly(vec![session(true, 0), session(true, 0), session(false, 0)]);
        assert_eq!(model.evaluate(&short).unwrap(), 1);
    }

    #[test]
    fn order_does_not_matter() {
        let model = RewardModel::default();
        let a = [session(true, 0), session(false, 7), session(true, 5)];
        let b = [session(true, 5), session(true, 0), session(false, 7)];
        assert_eq!(model.compute(&a, 4), model.compute(&b, 4));
    }
}
