//! Integration tests for offline training against a frozen history.

use std::sync::Arc;

use focusforge_core::scheduler::{Policy, PolicyDurations, SchedulerState};
use focusforge_core::storage::TrainingConfig;
use focusforge_core::{
    Config, NewSession, SessionSource, SessionStore, TabularPolicy, Trainer, TrainingEnvironment,
};

fn seeded_store() -> SessionStore {
    let store = SessionStore::open_in_memory().unwrap();
    let outcomes = [
        (true, 0),
        (false, 5),
        (true, 2),
        (true, 1),
        (false, 0),
        (true, 0),
        (true, 4),
        (true, 0),
    ];
    for (completed, distractions) in outcomes {
        store
            .append_session(NewSession::new(25, 22.5, completed).with_distractions(distractions))
            .unwrap();
    }
    store
}

#[test]
fn test_environment_reward_matches_reward_model() {
    let store = seeded_store();
    let config = Config::default();
    let snapshot = store.freeze().unwrap();
    let expected = config.reward.evaluate(&snapshot).unwrap();

    let mut env = TrainingEnvironment::from_config(snapshot, &config);
    env.reset().unwrap();
    let outcome = env.step(4).unwrap();
    assert_eq!(outcome.reward, expected);
    // five focused, one distracted completion, two failures, streak of 3
    assert_eq!(expected, 5 - 2 - 5 - 1 + 3);
}

#[test]
fn test_training_never_writes_to_store() {
    let store = Arc::new(seeded_store());
    let before = store.session_count().unwrap();

    let mut env = TrainingEnvironment::new(store.clone(), PolicyDurations::default())
        .with_max_steps(25);
    let trainer = Trainer::new(TrainingConfig {
        total_timesteps: 100,
        ..Default::default()
    });
    let (_, report) = trainer.train(&mut env).unwrap();

    assert_eq!(report.steps, 100);
    assert_eq!(report.episodes, 4);
    assert_eq!(store.session_count().unwrap(), before);
}

#[test]
fn test_frozen_history_ignores_later_appends() {
    let store = seeded_store();
    let snapshot = store.freeze().unwrap();
    let before = snapshot.analytics_snapshot().unwrap();

    store
        .append_session(NewSession::new(25, 0.0, false))
        .unwrap();

    assert_eq!(snapshot.analytics_snapshot().unwrap(), before);
    assert_ne!(store.analytics_snapshot().unwrap(), before);
}

#[test]
fn test_trained_artifact_round_trips_through_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("policy.json");
    let config = Config::default();

    let mut env = TrainingEnvironment::from_config(seeded_store().freeze().unwrap(), &config)
        .with_max_steps(100);
    let trainer = Trainer::new(TrainingConfig {
        total_timesteps: 500,
        ..config.training.clone()
    });
    let (policy, _) = trainer.train(&mut env).unwrap();
    policy.save(&path).unwrap();

    let loaded = TabularPolicy::load(&path).unwrap();
    assert_eq!(loaded.len(), policy.len());
    for work in [15, 25, 40, 60] {
        for brk in [5, 10, 30] {
            let state = SchedulerState {
                success_rate: 75.0,
                consecutive_failures: false,
                work_duration: work,
                break_duration: brk,
            };
            let action = loaded.predict(&state);
            assert!((0..9).contains(&action));
            assert_eq!(action, policy.predict(&state));
        }
    }
}
