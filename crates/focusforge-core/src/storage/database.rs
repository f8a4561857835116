//! SQLite-based session log and analytics.
//!
//! Provides persistent storage for:
//! - Session outcomes (append-only)
//! - Analytics derived from the log (success rate, streak, failure flag, averages)
//! - Key-value store for scheduler state (current policy durations)

use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row, TransactionBehavior};

use super::{data_dir, HistorySnapshot, SessionSource};
use crate::analytics::{self, AnalyticsSnapshot, DEFAULT_FAILURE_THRESHOLD};
use crate::error::PersistenceError;
use crate::session::{NewSession, Session};

const SESSION_COLUMNS: &str = "id, work_duration_planned, work_duration_actual, break_taken,
     break_duration, task, completed, distraction_events, timestamp";

/// SQLite store for session outcomes.
///
/// The connection sits behind a mutex: appends are serialized and every read
/// call runs inside its own transaction, so no caller observes a half-written
/// session. Share it between threads with `Arc<SessionStore>`.
pub struct SessionStore {
    conn: Mutex<Connection>,
    failure_threshold: usize,
}

impl SessionStore {
    /// Open the store at `<data_dir>/focusforge.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open() -> Result<Self, PersistenceError> {
        let dir = data_dir().map_err(|e| PersistenceError::DataDir(e.to_string()))?;
        Self::open_at(dir.join("focusforge.db"))
    }

    /// Open (or create) the store at an explicit path.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open_at(path: impl AsRef<Path>) -> Result<Self, PersistenceError> {
        let path = path.as_ref();
        let conn = Connection::open(path).map_err(|source| PersistenceError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        conn.busy_timeout(Duration::from_secs(5))?;
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| {
            row.get::<_, String>(0)
        })?;
        tracing::debug!(path = %path.display(), "opened session store");
        Self::from_connection(conn)
    }

    /// Open an in-memory store (tests, scratch runs).
    ///
    /// # Errors
    /// Returns an error if the schema cannot be created.
    pub fn open_in_memory() -> Result<Self, PersistenceError> {
        let conn = Connection::open_in_memory()?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self, PersistenceError> {
        super::migrations::migrate(&conn)
            .map_err(|e| PersistenceError::MigrationFailed(e.to_string()))?;
        Ok(Self {
            conn: Mutex::new(conn),
            failure_threshold: DEFAULT_FAILURE_THRESHOLD,
        })
    }

    /// Number of trailing failures that sets `consecutive_failures`.
    pub fn with_failure_threshold(mut self, threshold: usize) -> Self {
        self.failure_threshold = threshold;
        self
    }

    pub fn failure_threshold(&self) -> usize {
        self.failure_threshold
    }

    /// Durably record a session.
    ///
    /// The insert is committed before this returns; on error nothing is
    /// visible to readers.
    ///
    /// # Errors
    /// Returns an error if the write cannot be committed.
    pub fn append_session(&self, session: NewSession) -> Result<Session, PersistenceError> {
        let mut conn = self.conn.lock()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        tx.execute(
            "INSERT INTO sessions (
                work_duration_planned, work_duration_actual, break_taken,
                break_duration, task, completed, distraction_events, timestamp
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                session.work_planned,
                session.work_actual,
                session.break_taken,
                session.break_duration,
                session.task_label(),
                session.completed,
                session.distraction_events,
                session.timestamp.to_rfc3339(),
            ],
        )?;
        let id = tx.last_insert_rowid();
        tx.commit()?;

        tracing::debug!(
            id,
            completed = session.completed,
            distractions = session.distraction_events,
            "session appended"
        );
        Ok(session.into_session(id))
    }

    /// Up to `limit` sessions, newest first.
    pub fn recent_sessions(&self, limit: usize) -> Result<Vec<Session>, PersistenceError> {
        let conn = self.conn.lock()?;
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let mut stmt = conn.prepare(&format!(
            "SELECT {SESSION_COLUMNS} FROM sessions ORDER BY id DESC LIMIT ?1"
        ))?;
        let rows = stmt.query_map(params![limit], session_from_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Every session, oldest first.
    pub fn all_sessions(&self) -> Result<Vec<Session>, PersistenceError> {
        let conn = self.conn.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {SESSION_COLUMNS} FROM sessions ORDER BY id ASC"
        ))?;
        let rows = stmt.query_map([], session_from_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    pub fn session_count(&self) -> Result<u64, PersistenceError> {
        let conn = self.conn.lock()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM sessions", [], |row| row.get(0))?;
        Ok(count.max(0) as u64)
    }

    /// Compute analytics over the current log.
    ///
    /// All aggregates are read inside a single transaction.
    pub fn analytics_snapshot(&self) -> Result<AnalyticsSnapshot, PersistenceError> {
        let mut conn = self.conn.lock()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Deferred)?;

        let (total, completed, avg_distractions) = tx.query_row(
            "SELECT COUNT(*), COALESCE(SUM(completed), 0), AVG(distraction_events)
             FROM sessions",
            [],
            |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, Option<f64>>(2)?,
                ))
            },
        )?;

        if total == 0 {
            return Ok(AnalyticsSnapshot::default());
        }

        let avg_work: Option<f64> = tx.query_row(
            "SELECT AVG(work_duration_actual) FROM sessions WHERE completed = 1",
            [],
            |row| row.get(0),
        )?;

        let recent_outcomes = {
            let mut stmt = tx.prepare("SELECT completed FROM sessions ORDER BY id DESC")?;
            let rows = stmt.query_map([], |row| row.get::<_, bool>(0))?;
            let mut outcomes = Vec::new();
            for row in rows {
                let completed = row?;
                outcomes.push(completed);
                // Enough to decide both the streak and the failure window.
                if !completed && outcomes.len() >= self.failure_threshold {
                    break;
                }
            }
            outcomes
        };
        tx.commit()?;

        Ok(AnalyticsSnapshot {
            success_rate: completed as f64 * 100.0 / total as f64,
            consecutive_failures: analytics::consecutive_failures(
                recent_outcomes.iter().copied(),
                self.failure_threshold,
            ),
            streak: analytics::streak(recent_outcomes.iter().copied()),
            average_work_duration: avg_work.unwrap_or(0.0),
            average_distractions: avg_distractions.unwrap_or(0.0),
            total_sessions: total as u64,
        })
    }

    /// Copy the whole log into memory for offline use.
    pub fn freeze(&self) -> Result<HistorySnapshot, PersistenceError> {
        let sessions = self.all_sessions()?;
        Ok(HistorySnapshot::new(sessions).with_failure_threshold(self.failure_threshold))
    }

    /// Get a value from the kv store.
    pub fn kv_get(&self, key: &str) -> Result<Option<String>, PersistenceError> {
        let conn = self.conn.lock()?;
        let result = conn.query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
            row.get::<_, String>(0)
        });
        match result {
            Ok(v) => Ok(Some(v)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Set a value in the kv store.
    pub fn kv_set(&self, key: &str, value: &str) -> Result<(), PersistenceError> {
        let conn = self.conn.lock()?;
        conn.execute(
            "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }
}

impl SessionSource for SessionStore {
    fn recent_sessions(&self, limit: usize) -> Result<Vec<Session>, PersistenceError> {
        SessionStore::recent_sessions(self, limit)
    }

    fn analytics_snapshot(&self) -> Result<AnalyticsSnapshot, PersistenceError> {
        SessionStore::analytics_snapshot(self)
    }
}

fn session_from_row(row: &Row<'_>) -> rusqlite::Result<Session> {
    let raw_ts: String = row.get(8)?;
    let timestamp = DateTime::parse_from_rfc3339(&raw_ts)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(8, rusqlite::types::Type::Text, Box::new(e))
        })?;
    Ok(Session {
        id: row.get(0)?,
        work_planned: row.get(1)?,
        work_actual: row.get(2)?,
        break_taken: row.get(3)?,
        break_duration: row.get(4)?,
        task: row.get(5)?,
        completed: row.get(6)?,
        distraction_events: row.get(7)?,
        timestamp,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(completed: bool, distractions: u32) -> NewSession {
        NewSession::new(25, 25.0, completed).with_distractions(distractions)
    }

    #[test]
    fn append_and_read_back() {
        let store = SessionStore::open_in_memory().unwrap();
        let written = store
            .append_session(outcome(true, 1).with_break(5).with_task("Essay"))
            .unwrap();
        let recent = store.recent_sessions(10).unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].id, written.id);
        assert_eq!(recent[0].task, "Essay");
        assert!(recent[0].break_taken);
        assert_eq!(recent[0].break_duration, 5);
    }

    #[test]
    fn recent_sessions_newest_first_and_bounded() {
        let store = SessionStore::open_in_memory().unwrap();
        for i in 0..5 {
            store.append_session(outcome(true, i)).unwrap();
        }
        let recent = store.recent_sessions(3).unwrap();
        let distractions: Vec<u32> = recent.iter().map(|s| s.distraction_events).collect();
        assert_eq!(distractions, vec![4, 3, 2]);
        assert_eq!(store.recent_sessions(0).unwrap().len(), 0);
        assert_eq!(store.recent_sessions(100).unwrap().len(), 5);
    }

    #[test]
    fn missing_task_is_stored_as_no_task() {
        let store = SessionStore::open_in_memory().unwrap();
        store.append_session(outcome(false, 0)).unwrap();
        assert_eq!(store.recent_sessions(1).unwrap()[0].task, "No Task");
    }

    #[test]
    fn empty_store_snapshot_is_zeroed() {
        let store = SessionStore::open_in_memory().unwrap();
        assert_eq!(store.analytics_snapshot().unwrap(), AnalyticsSnapshot::default());
    }

    #[test]
    fn snapshot_matches_in_memory_computation() {
        let store = SessionStore::open_in_memory().unwrap();
        let pattern = [
            (true, 0, 30.0),
            (false, 5, 12.5),
            (true, 2, 25.0),
            (true, 4, 40.0),
            (true, 1, 20.0),
        ];
        for (completed, distractions, actual) in pattern {
            store
                .append_session(
                    NewSession::new(25, actual, completed).with_distractions(distractions),
                )
                .unwrap();
        }
        let from_sql = store.analytics_snapshot().unwrap();
        let from_memory = store.freeze().unwrap().analytics_snapshot().unwrap();
        assert_eq!(from_sql, from_memory);
        assert_eq!(from_sql.streak, 3);
        assert_eq!(from_sql.success_rate, 80.0);
    }

    #[test]
    fn consecutive_failures_follow_threshold() {
        let store = SessionStore::open_in_memory().unwrap();
        store.append_session(outcome(false, 0)).unwrap();
        store.append_session(outcome(false, 0)).unwrap();
        assert!(!store.analytics_snapshot().unwrap().consecutive_failures);
        store.append_session(outcome(false, 0)).unwrap();
        assert!(store.analytics_snapshot().unwrap().consecutive_failures);
        store.append_session(outcome(true, 0)).unwrap();
        assert!(!store.analytics_snapshot().unwrap().consecutive_failures);
    }

    #[test]
    fn custom_failure_threshold() {
        let store = SessionStore::open_in_memory()
            .unwrap()
            .with_failure_threshold(2);
        store.append_session(outcome(false, 0)).unwrap();
        store.append_session(outcome(false, 0)).unwrap();
        assert!(store.analytics_snapshot().unwrap().consecutive_failures);
    }

    #[test]
    fn timestamps_survive_round_trip() {
        let store = SessionStore::open_in_memory().unwrap();
        let ts = DateTime::parse_from_rfc3339("2026-03-01T09:30:00Z")
            .unwrap()
            .with_timezone(&Utc);
        store.append_session(outcome(true, 0).with_timestamp(ts)).unwrap();
        assert_eq!(store.recent_sessions(1).unwrap()[0].timestamp, ts);
    }

    #[test]
    fn kv_store() {
        let store = SessionStore::open_in_memory().unwrap();
        assert!(store.kv_get("test").unwrap().is_none());
        store.kv_set("test", "hello").unwrap();
        assert_eq!(store.kv_get("test").unwrap().unwrap(), "hello");
    }

    #[test]
    fn file_backed_store_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sessions.db");
        {
            let store = SessionStore::open_at(&path).unwrap();
            store.append_session(outcome(true, 2)).unwrap();
        }
        let reopened = SessionStore::open_at(&path).unwrap();
        assert_eq!(reopened.session_count().unwrap(), 1);
    }
}
