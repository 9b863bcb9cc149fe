use serde::Serialize;

use crate::coverage::metrics::CoverageMetrics;
use crate::orchestrator::state::Issue;
use crate::orchestrator::strategy::Strategy;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminationReason {
    /// Action budget spent (quick-scan goal)
    BudgetExhausted,
    /// Screen/depth budget spent (deep-map goal)
    MapBudgetReached,
    /// Coverage target hit
    CoverageReached,
    /// Safety time cap
    TimeCapReached,
    /// Frontier drained and the verification pass found nothing more
    FrontierExhausted,
    /// Explicit stop request
    Stopped,
    /// Collaborator failure or relaunch limit; partial results preserved
    RunFatal,
}

/// Everything a caller gets back from a finished run, whatever the
/// termination cause. Serializable so the CLI can dump it as JSON.
#[derive(Debug, Clone, Serialize)]
pub struct ExplorationReport {
    pub package: String,
    pub termination: TerminationReason,
    pub passes: u32,
    pub actions_taken: u64,
    pub duration_ms: u64,
    pub coverage: CoverageMetrics,
    pub screens_discovered: Vec<String>,
    pub issues: Vec<Issue>,
    pub best_strategy: Option<Strategy>,
    /// Detail accompanying a `RunFatal` termination
    pub error: Option<String>,
}
