//! Concurrent access to a shared session store.

use std::collections::HashSet;
use std::sync::Arc;
use std::thread;

use focusforge_core::{NewSession, SessionStore};

#[test]
fn test_parallel_appends_are_all_recorded() {
    const WRITERS: usize = 16;
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(SessionStore::open_at(dir.path().join("focusforge.db")).unwrap());

    let handles: Vec<_> = (0..WRITERS)
        .map(|i| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                store
                    .append_session(
                        NewSession::new(25, 25.0, i % 2 == 0).with_task(format!("task {i}")),
                    )
                    .unwrap()
            })
        })
        .collect();
    let written: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    let recent = store.recent_sessions(WRITERS).unwrap();
    assert_eq!(recent.len(), WRITERS);

    let ids: HashSet<_> = recent.iter().map(|s| s.id).collect();
    assert_eq!(ids.len(), WRITERS);
    let tasks: HashSet<_> = recent.iter().map(|s| s.task.clone()).collect();
    assert_eq!(tasks.len(), WRITERS);
    assert!(written.iter().all(|s| ids.contains(&s.id)));
}

#[test]
fn test_readers_see_whole_sessions_during_writes() {
    let store = Arc::new(SessionStore::open_in_memory().unwrap());

    let writer = {
        let store = Arc::clone(&store);
        thread::spawn(move || {
            for _ in 0..50 {
                store
                    .append_session(NewSession::new(25, 25.0, true).with_distractions(1))
                    .unwrap();
            }
        })
    };
    let reader = {
        let store = Arc::clone(&store);
        thread::spawn(move || {
            for _ in 0..50 {
                let snapshot = store.analytics_snapshot().unwrap();
                if snapshot.total_sessions > 0 {
                    assert_eq!(snapshot.success_rate, 100.0);
                    assert_eq!(snapshot.average_distractions, 1.0);
                    assert_eq!(snapshot.streak as u64, snapshot.total_sessions);
                }
            }
        })
    };
    writer.join().unwrap();
    reader.join().unwrap();
    assert_eq!(store.session_count().unwrap(), 50);
}
