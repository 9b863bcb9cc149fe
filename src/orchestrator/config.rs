use serde::{Deserialize, Serialize};

use crate::orchestrator::strategy::Strategy;

// ============================================================================
// Goals
// ============================================================================

/// What the run is trying to accomplish; drives the termination check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Goal {
    /// Fixed scan budget: stop after `max_elements` actions
    QuickScan,
    /// Map as deep as allowed: stop at `max_screens` / `max_depth`
    DeepMap,
    /// Explore until `target_coverage_pct`, with the time cap as safety
    CoverageTarget,
}

// ============================================================================
// Run configuration
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExplorationConfig {
    #[serde(default = "default_strategy")]
    pub strategy: Strategy,

    #[serde(default = "default_goal")]
    pub goal: Goal,

    #[serde(default = "default_max_depth")]
    pub max_depth: u32,

    #[serde(default = "default_max_screens")]
    pub max_screens: usize,

    #[serde(default = "default_max_elements")]
    pub max_elements: usize,

    #[serde(default = "default_max_duration_ms")]
    pub max_duration_ms: u64,

    /// Pause between consecutive actions
    #[serde(default = "default_action_delay_ms")]
    pub action_delay_ms: u64,

    /// Settle time after a gesture before re-observing
    #[serde(default = "default_transition_wait_ms")]
    pub transition_wait_ms: u64,

    #[serde(default = "default_scroll_delay_ms")]
    pub scroll_delay_ms: u64,

    #[serde(default = "default_target_coverage")]
    pub target_coverage_pct: f64,

    #[serde(default = "default_true")]
    pub stop_at_target_coverage: bool,

    /// After discovering a new screen, immediately back out to keep
    /// exhausting the previous one
    #[serde(default)]
    pub backtrack_after_new_screen: bool,

    /// Skip elements whose labels look destructive (delete/clear/reset)
    #[serde(default = "default_true")]
    pub non_destructive: bool,

    /// Bounded wait for external help at the top of the recovery ladder
    #[serde(default = "default_intervention_wait_ms")]
    pub intervention_wait_ms: u64,

    #[serde(default = "default_capture_retries")]
    pub capture_retries: u32,

    #[serde(default = "default_capture_backoff_ms")]
    pub capture_backoff_ms: u64,
}

fn default_strategy() -> Strategy {
    Strategy::Adaptive
}
fn default_goal() -> Goal {
    Goal::DeepMap
}
fn default_max_depth() -> u32 {
    8
}
fn default_max_screens() -> usize {
    100
}
fn default_max_elements() -> usize {
    500
}
fn default_max_duration_ms() -> u64 {
    30 * 60 * 1000
}
fn default_action_delay_ms() -> u64 {
    250
}
fn default_transition_wait_ms() -> u64 {
    800
}
fn default_scroll_delay_ms() -> u64 {
    400
}
fn default_target_coverage() -> f64 {
    80.0
}
fn default_true() -> bool {
    true
}
fn default_intervention_wait_ms() -> u64 {
    30_000
}
fn default_capture_retries() -> u32 {
    3
}
fn default_capture_backoff_ms() -> u64 {
    200
}

impl Default for ExplorationConfig {
    fn default() -> Self {
        Self {
            strategy: default_strategy(),
            goal: default_goal(),
            max_depth: default_max_depth(),
            max_screens: default_max_screens(),
            max_elements: default_max_elements(),
            max_duration_ms: default_max_duration_ms(),
            action_delay_ms: default_action_delay_ms(),
            transition_wait_ms: default_transition_wait_ms(),
            scroll_delay_ms: default_scroll_delay_ms(),
            target_coverage_pct: default_target_coverage(),
            stop_at_target_coverage: default_true(),
            backtrack_after_new_screen: false,
            non_destructive: default_true(),
            intervention_wait_ms: default_intervention_wait_ms(),
            capture_retries: default_capture_retries(),
            capture_backoff_ms: default_capture_backoff_ms(),
        }
    }
}
