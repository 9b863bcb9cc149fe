use serde::{Deserialize, Serialize};

use crate::orchestrator::state::ExplorationState;

/// Aggregate discovery metrics. Never stored — recomputed from
/// `ExplorationState` whenever someone asks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct CoverageMetrics {
    pub screens_discovered: usize,
    pub screens_fully_explored: usize,
    pub elements_discovered: usize,
    pub elements_visited: usize,
    pub unexplored_branches: usize,
}

impl CoverageMetrics {
    pub fn element_coverage_pct(&self) -> f64 {
        if self.elements_discovered == 0 {
            return 0.0;
        }
        self.elements_visited as f64 / self.elements_discovered as f64 * 100.0
    }

    pub fn screen_coverage_pct(&self) -> f64 {
        if self.screens_discovered == 0 {
            return 0.0;
        }
        self.screens_fully_explored as f64 / self.screens_discovered as f64 * 100.0
    }
}

/// Derive current coverage from the run aggregate.
pub fn compute(state: &ExplorationState) -> CoverageMetrics {
    let mut elements_discovered = 0;
    let mut elements_visited = 0;
    let mut screens_fully_explored = 0;

    for screen in state.screens.values() {
        let clickables = screen.clickables.len();
        let explored = screen.clickables.iter().filter(|e| e.explored).count();
        elements_discovered += screen.elements().count();
        elements_visited += screen.elements().filter(|e| e.explored).count();
        if clickables > 0 && explored == clickables {
            screens_fully_explored += 1;
        }
    }

    CoverageMetrics {
        screens_discovered: state.screens.len(),
        screens_fully_explored,
        elements_discovered,
        elements_visited,
        unexplored_branches: state.queue.len() + state.graph.unexplored_destinations().len(),
    }
}
