use std::collections::{HashMap, HashSet};

use serde::Serialize;

use crate::frontier::queue::FrontierQueue;
use crate::graph::nav_graph::NavigationGraph;
use crate::model::screen_model::Screen;

// ============================================================================
// Issues
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum IssueKind {
    BranchUnreachable,
    RetryExceeded,
    AppClosed,
    AppCrashed,
    ProviderFailure,
    RecoveryExhausted,
    DangerousPattern,
    BlockerScreen,
}

/// One recorded problem. Issues accumulate on the state aggregate instead
/// of crossing component boundaries as errors, so the caller can inspect
/// the full history regardless of how the run ended.
#[derive(Debug, Clone, Serialize)]
pub struct Issue {
    pub kind: IssueKind,
    pub screen_id: Option<String>,
    pub detail: String,
    pub at_ms: u64,
}

// ============================================================================
// Run aggregate
// ============================================================================

/// The single mutable aggregate for one exploration run.
///
/// Created at run start, owned and written exclusively by the orchestrator,
/// discarded (or archived into the report) at run end. Other components see
/// only narrow views: the read-only graph, the queue, the visited set.
pub struct ExplorationState {
    /// Screens by id; entries are mutated on revisit, never removed
    pub screens: HashMap<String, Screen>,

    /// Run-level visited composite keys; grows monotonically
    pub visited: HashSet<String>,

    /// Composite keys tapped in the current pass; cleared per pass so each
    /// key is acted on at most once per sweep
    pub tapped_this_pass: HashSet<String>,

    pub queue: FrontierQueue,
    pub graph: NavigationGraph,

    pub issues: Vec<Issue>,

    /// Action generalizations that closed or crashed the app
    pub dangerous: HashSet<String>,

    pub pass: u32,
    pub home_screen_id: Option<String>,
    pub current_screen_id: Option<String>,
    pub actions_taken: u64,
}

impl ExplorationState {
    pub fn new() -> Self {
        Self {
            screens: HashMap::new(),
            visited: HashSet::new(),
            tapped_this_pass: HashSet::new(),
            queue: FrontierQueue::new(),
            graph: NavigationGraph::new(),
            issues: Vec::new(),
            dangerous: HashSet::new(),
            pass: 1,
            home_screen_id: None,
            current_screen_id: None,
            actions_taken: 0,
        }
    }

    /// Fold a fresh capture into the aggregate. Returns the screen id,
    /// whether the screen is newly discovered, and how many elements the
    /// capture added to an existing screen.
    pub fn observe(&mut self, capture: Screen) -> (String, bool, usize) {
        let id = capture.id.clone();
        match self.screens.get_mut(&id) {
            Some(existing) => {
                let added = existing.absorb(&capture);
                (id, false, added)
            }
            None => {
                let mut screen = capture;
                screen.visit_count = 1;
                self.screens.insert(id.clone(), screen);
                (id, true, 0)
            }
        }
    }

    pub fn screen(&self, id: &str) -> Option<&Screen> {
        self.screens.get(id)
    }

    /// Record an element activation under both ledgers and flip its
    /// explored flag. The run-level set only ever grows.
    pub fn mark_visited(&mut self, screen_id: &str, element_id: &str, key: String) {
        self.visited.insert(key.clone());
        self.tapped_this_pass.insert(key);
        if let Some(screen) = self.screens.get_mut(screen_id) {
            if let Some(el) = screen.find_element_mut(element_id) {
                el.explored = true;
            }
        }
    }

    pub fn record_issue(&mut self, kind: IssueKind, screen_id: Option<&str>, detail: impl Into<String>, at_ms: u64) {
        self.issues.push(Issue {
            kind,
            screen_id: screen_id.map(|s| s.to_string()),
            detail: detail.into(),
            at_ms,
        });
    }

    /// Begin another full sweep: bump the pass number and clear the
    /// per-pass ledger. Screens, graph, visited set, and learned state all
    /// survive — a pass reuses everything the run has discovered.
    pub fn start_new_pass(&mut self) {
        self.pass += 1;
        self.tapped_this_pass.clear();
        self.queue = FrontierQueue::new();
    }
}

impl Default for ExplorationState {
    fn default() -> Self {
        Self::new()
    }
}
