//! Tabular Q-learning over a [`TrainingEnvironment`].

use rand::prelude::*;
use rand_pcg::Mcg128Xsl64;
use serde::{Deserialize, Serialize};

use super::TrainingEnvironment;
use crate::error::CoreError;
use crate::scheduler::{Action, TabularPolicy, ACTION_COUNT};
use crate::storage::{SessionSource, TrainingConfig};

/// Summary of one training run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrainingReport {
    /// Episodes that ran to `max_steps`.
    pub episodes: u64,
    pub steps: u64,
    pub mean_reward: f64,
    /// States with learned values.
    pub states: usize,
    pub cancelled: bool,
}

/// Epsilon-greedy Q-learner.
///
/// Exploration draws from a seeded generator so a run is reproducible for a
/// given seed and history. The produced [`TabularPolicy`] is greedy.
#[derive(Debug, Clone)]
pub struct Trainer {
    config: TrainingConfig,
}

impl Trainer {
    pub fn new(config: TrainingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    /// Train for `total_timesteps` environment steps.
    ///
    /// Cancellation is not an error: the partially trained policy is
    /// returned with [`TrainingReport::cancelled`] set.
    ///
    /// # Errors
    /// Propagates persistence and action errors from the environment.
    pub fn train<S: SessionSource>(
        &self,
        env: &mut TrainingEnvironment<S>,
    ) -> Result<(TabularPolicy, TrainingReport), CoreError> {
        let mut rng = Mcg128Xsl64::seed_from_u64(self.config.seed);
        let mut policy = TabularPolicy::new(*env.bounds());
        let mut report = TrainingReport::default();
        let mut total_reward = 0i64;

        tracing::info!(
            total_timesteps = self.config.total_timesteps,
            max_steps = env.max_steps(),
            seed = self.config.seed,
            "training started"
        );

        let mut state = env.reset()?;
        while report.steps < self.config.total_timesteps {
            let key = policy.key(&state);
            let action = if rng.gen::<f64>() < self.config.exploration {
                Action::new(rng.gen_range(0..ACTION_COUNT as i64))?
            } else {
                policy.best_action(&key)
            };

            let outcome = match env.step(i64::from(action)) {
                Ok(outcome) => outcome,
                Err(CoreError::Cancelled { steps }) => {
                    tracing::warn!(episode_steps = steps, "training cancelled");
                    report.cancelled = true;
                    break;
                }
                Err(e) => return Err(e),
            };

            let next_key = policy.key(&outcome.state);
            let future = if outcome.done {
                0.0
            } else {
                self.config.discount * policy.max_q(&next_key)
            };
            let current = policy.q_value(&key, action);
            let target = outcome.reward as f64 + future;
            policy.set_q_value(
                key,
                action,
                current + self.config.learning_rate * (target - current),
            );

            total_reward += outcome.reward;
            report.steps += 1;

            if outcome.done {
                report.episodes += 1;
                tracing::debug!(episode = report.episodes, "episode finished");
                state = env.reset()?;
            } else {
                state = outcome.state;
            }
        }

        if report.steps > 0 {
            report.mean_reward = total_reward as f64 / report.steps as f64;
        }
        report.states = policy.len();
        tracing::info!(
            steps = report.steps,
            episodes = report.episodes,
            mean_reward = report.mean_reward,
            cancelled = report.cancelled,
            "training finished"
        );
        Ok((policy, report))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::{Policy, PolicyDurations};
    use crate::session::NewSession;
    use crate::storage::HistorySnapshot;
    use crate::training::CancellationToken;

    fn history() -> HistorySnapshot {
        let sessions = (0..6)
            .map(|i| NewSession::new(25, 25.0, i % 3 != 0).into_session(i + 1))
            .collect();
        HistorySnapshot::new(sessions)
    }

    fn config(total_timesteps: u64) -> TrainingConfig {
        TrainingConfig {
            max_steps: 50,
            total_timesteps,
            ..Default::default()
        }
    }

    #[test]
    fn counts_steps_and_episodes() {
        let mut env = TrainingEnvironment::new(history(), PolicyDurations::default())
            .with_max_steps(50);
        let (policy, report) = Trainer::new(config(120)).train(&mut env).unwrap();
        assert_eq!(report.steps, 120);
        assert_eq!(report.episodes, 2);
        assert!(!report.cancelled);
        assert!(!policy.is_empty());
        assert_eq!(report.states, policy.len());
    }

    #[test]
    fn same_seed_same_policy() {
        let run = || {
            let mut env = TrainingEnvironment::new(history(), PolicyDurations::default())
                .with_max_steps(50);
            Trainer::new(config(200)).train(&mut env).unwrap()
        };
        let (a, report_a) = run();
        let (b, report_b) = run();
        assert_eq!(report_a, report_b);
        for work in (15..=60).step_by(5) {
            for brk in (5..=30).step_by(5) {
                let state = crate::scheduler::SchedulerState {
                    success_rate: 66.0,
                    consecutive_failures: false,
                    work_duration: work,
                    break_duration: brk,
                };
                assert_eq!(a.predict(&state), b.predict(&state));
            }
        }
    }

    #[test]
    fn cancelled_run_returns_partial_policy() {
        let token = CancellationToken::new();
        token.cancel();
        let mut env = TrainingEnvironment::new(history(), PolicyDurations::default())
            .with_cancellation(token);
        let (policy, report) = Trainer::new(config(100)).train(&mut env).unwrap();
        assert!(report.cancelled);
        assert_eq!(report.steps, 0);
        assert!(policy.is_empty());
    }
}
