//! Rule-based fallback policy.
//!
//! Rules are evaluated top to bottom and the first match wins. The table is
//! plain data so it can live in `config.toml`:
//!
//! ```toml
//! [policy.rules]
//! default_action = 4
//!
//! [[policy.rules.rules]]
//! when = "consecutive_failures"
//! action = 2
//!
//! [[policy.rules.rules]]
//! when = { success_rate_below = 50.0 }
//! action = 1
//! ```

use serde::{Deserialize, Serialize};

use super::{Policy, SchedulerState};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleCondition {
    ConsecutiveFailures,
    SuccessRateBelow(f64),
    SuccessRateAtLeast(f64),
    WorkAtLeast(u32),
    BreakAtLeast(u32),
    Always,
}

impl RuleCondition {
    pub fn matches(&self, state: &SchedulerState) -> bool {
        match self {
            RuleCondition::ConsecutiveFailures => state.consecutive_failures,
            RuleCondition::SuccessRateBelow(rate) => state.success_rate < *rate,
            RuleCondition::SuccessRateAtLeast(rate) => state.success_rate >= *rate,
            RuleCondition::WorkAtLeast(minutes) => state.work_duration >= *minutes,
            RuleCondition::BreakAtLeast(minutes) => state.break_duration >= *minutes,
            RuleCondition::Always => true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    pub when: RuleCondition,
    /// Raw action id; checked against the action space when applied.
    pub action: u8,
}

impl Rule {
    pub fn new(when: RuleCondition, action: u8) -> Self {
        Self { when, action }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleTable {
    #[serde(default = "default_action")]
    pub default_action: u8,
    #[serde(default)]
    pub rules: Vec<Rule>,
}

fn default_action() -> u8 {
    4
}

impl Default for RuleTable {
    /// Back off after a failure run, shorten work when mostly failing,
    /// stretch it when mostly succeeding, otherwise hold.
    fn default() -> Self {
        Self {
            default_action: default_action(),
            rules: vec![
                Rule::new(RuleCondition::ConsecutiveFailures, 2),
                Rule::new(RuleCondition::SuccessRateBelow(50.0), 1),
                Rule::new(RuleCondition::SuccessRateAtLeast(80.0), 7),
            ],
        }
    }
}

impl RuleTable {
    /// Every action id the table can emit.
    pub fn actions(&self) -> impl Iterator<Item = u8> + '_ {
        std::iter::once(self.default_action).chain(self.rules.iter().map(|r| r.action))
    }

    pub fn lookup(&self, state: &SchedulerState) -> u8 {
        self.rules
            .iter()
            .find(|rule| rule.when.matches(state))
            .map_or(self.default_action, |rule| rule.action)
    }
}

impl Policy for RuleTable {
    fn name(&self) -> &str {
        "rule-table"
    }

    fn predict(&self, state: &SchedulerState) -> i64 {
        i64::from(self.lookup(state))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(success_rate: f64, failing: bool) -> SchedulerState {
        SchedulerState {
            success_rate,
            consecutive_failures: failing,
            work_duration: 25,
            break_duration: 5,
        }
    }

    #[test]
    fn default_table_decisions() {
        let table = RuleTable::default();
        assert_eq!(table.lookup(&state(90.0, true)), 2);
        assert_eq!(table.lookup(&state(30.0, false)), 1);
        assert_eq!(table.lookup(&state(85.0, false)), 7);
        assert_eq!(table.lookup(&state(65.0, false)), 4);
    }

    #[test]
    fn first_matching_rule_wins() {
        let table = RuleTable {
            default_action: 4,
            rules: vec![
                Rule::new(RuleCondition::WorkAtLeast(20), 3),
                Rule::new(RuleCondition::Always, 8),
            ],
        };
        assert_eq!(table.predict(&state(50.0, false)), 3);
    }

    #[test]
    fn table_parses_from_toml() {
        let toml_str = r#"
            default_action = 4

            [[rules]]
            when = "consecutive_failures"
            action = 0

            [[rules]]
            when = { break_at_least = 20 }
            action = 3
        "#;
        let table: RuleTable = toml::from_str(toml_str).unwrap();
        assert_eq!(table.rules.len(), 2);
        assert_eq!(table.rules[1].when, RuleCondition::BreakAtLeast(20));
        assert_eq!(table.actions().collect::<Vec<_>>(), vec![4, 0, 3]);
    }
}
