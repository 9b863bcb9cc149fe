use serde::Serialize;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::lifecycle::machine::LifecycleState;
use crate::orchestrator::strategy::Strategy;

#[derive(Debug, Serialize)]
pub struct TraceEvent {
    pub timestamp_ms: u128,
    pub iteration: u64,

    pub lifecycle_state: String,
    pub strategy: String,

    pub target: Option<String>,
    pub outcome: Option<String>,
    pub reward: Option<f64>,

    pub suppression_reason: Option<String>,
}

impl TraceEvent {
    pub fn now(iteration: u64, state: LifecycleState, strategy: Strategy) -> Self {
        Self {
            timestamp_ms: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_millis())
                .unwrap_or(0),
            iteration,
            lifecycle_state: format!("{:?}", state),
            strategy: strategy.as_str().to_string(),
            target: None,
            outcome: None,
            reward: None,
            suppression_reason: None,
        }
    }

    pub fn with_target(mut self, target: impl ToString) -> Self {
        self.target = Some(target.to_string());
        self
    }

    pub fn with_outcome(mut self, outcome: impl ToString) -> Self {
        self.outcome = Some(outcome.to_string());
        self
    }

    pub fn with_reward(mut self, reward: f64) -> Self {
        self.reward = Some(reward);
        self
    }

    pub fn with_suppression(mut self, reason: impl ToString) -> Self {
        self.suppression_reason = Some(reason.to_string());
        self
    }
}
