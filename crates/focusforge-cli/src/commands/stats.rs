use focusforge_core::{AnalyticsSnapshot, Config};
use serde::Serialize;

use super::{open_store, print_json, CliResult};

#[derive(Serialize)]
struct StatsReport {
    #[serde(flatten)]
    analytics: AnalyticsSnapshot,
    /// Reward the training environment would assign to the current log.
    reward: i64,
}

pub fn run() -> CliResult {
    let config = Config::load()?;
    let store = open_store(&config)?;

    let report = StatsReport {
        analytics: store.analytics_snapshot()?,
        reward: config.reward.evaluate(store.as_ref())?,
    };
    print_json(&report)
}
