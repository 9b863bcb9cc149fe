use std::collections::{HashMap, HashSet, VecDeque};

use serde::{Deserialize, Serialize};

// ============================================================================
// Edges
// ============================================================================

/// One step of a navigation path: on `screen_id`, activate `element_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathStep {
    pub screen_id: String,
    pub element_id: String,
}

/// Destinations recorded for a single (screen, trigger element) pair.
///
/// A trigger may lead to different screens on different occasions
/// (conditional navigation); each destination keeps its own occurrence
/// count instead of being overwritten.
pub type DestinationCounts = HashMap<String, u32>;

// ============================================================================
// Graph
// ============================================================================

/// Screen-to-screen transition graph built up during exploration.
///
/// Read-mostly: the orchestrator records transitions as they are observed
/// and queries reachability when routing to queued targets. Path queries
/// never fail — an unreachable destination is `None`, not an error.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NavigationGraph {
    /// from screen id -> trigger element id -> destination counts
    edges: HashMap<String, HashMap<String, DestinationCounts>>,

    /// Screens classified as credential/auth walls. Never valid path
    /// destinations, but allowed as waypoints.
    blockers: HashSet<String>,

    /// Hops from the home screen, recorded on first discovery.
    depths: HashMap<String, u32>,
}

impl NavigationGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an observed transition. Repeat observations of the same
    /// (from, trigger, to) triple increment its occurrence count.
    pub fn record_transition(&mut self, from: &str, trigger: &str, to: &str) {
        let count = self
            .edges
            .entry(from.to_string())
            .or_default()
            .entry(trigger.to_string())
            .or_default()
            .entry(to.to_string())
            .or_insert(0);
        *count += 1;

        // Depth propagates one hop from the source
        if !self.depths.contains_key(to) {
            let depth = self.depths.get(from).copied().unwrap_or(0) + 1;
            self.depths.insert(to.to_string(), depth);
        }
    }

    /// Mark a screen as the exploration root (depth 0).
    pub fn set_home(&mut self, screen_id: &str) {
        self.depths.entry(screen_id.to_string()).or_insert(0);
    }

    pub fn depth_of(&self, screen_id: &str) -> u32 {
        self.depths.get(screen_id).copied().unwrap_or(0)
    }

    pub fn destinations(&self, from: &str, trigger: &str) -> Option<&DestinationCounts> {
        self.edges.get(from).and_then(|t| t.get(trigger))
    }

    /// A trigger observed leading to more than one destination.
    pub fn is_conditional(&self, from: &str, trigger: &str) -> bool {
        self.destinations(from, trigger).is_some_and(|d| d.len() > 1)
    }

    pub fn mark_blocker(&mut self, screen_id: &str) {
        self.blockers.insert(screen_id.to_string());
    }

    pub fn is_blocker(&self, screen_id: &str) -> bool {
        self.blockers.contains(screen_id)
    }

    pub fn screen_count(&self) -> usize {
        self.edges.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges
            .values()
            .flat_map(|t| t.values())
            .map(|d| d.len())
            .sum()
    }

    /// Screens that appear as destinations but have no outgoing edges yet —
    /// known to exist, never explored from.
    pub fn unexplored_destinations(&self) -> Vec<String> {
        let mut seen: HashSet<&str> = HashSet::new();
        for triggers in self.edges.values() {
            for dests in triggers.values() {
                for dest in dests.keys() {
                    seen.insert(dest);
                }
            }
        }
        seen.into_iter()
            .filter(|d| !self.edges.contains_key(*d) && !self.blockers.contains(*d))
            .map(|d| d.to_string())
            .collect()
    }

    // ------------------------------------------------------------------------
    // Pathfinding
    // ------------------------------------------------------------------------

    /// Unweighted BFS shortest path. Blocker screens are excluded as the
    /// destination but may appear as intermediate waypoints. Returns `None`
    /// when no recorded path exists (including unknown screen ids).
    pub fn find_path(&self, from: &str, to: &str) -> Option<Vec<PathStep>> {
        if self.blockers.contains(to) {
            return None;
        }
        if from == to {
            return Some(Vec::new());
        }

        let mut queue: VecDeque<&str> = VecDeque::new();
        let mut visited: HashSet<&str> = HashSet::new();
        // dest -> (prev screen, trigger)
        let mut parent: HashMap<&str, (&str, &str)> = HashMap::new();

        queue.push_back(from);
        visited.insert(from);

        while let Some(current) = queue.pop_front() {
            let Some(triggers) = self.edges.get(current) else {
                continue;
            };
            for (trigger, dests) in triggers {
                for dest in dests.keys() {
                    if visited.contains(dest.as_str()) {
                        continue;
                    }
                    visited.insert(dest);
                    parent.insert(dest, (current, trigger));
                    if dest == to {
                        return Some(self.reconstruct(&parent, from, to));
                    }
                    queue.push_back(dest);
                }
            }
        }
        None
    }

    /// Path preferring the most reliably reproduced transitions: each edge
    /// costs `1 / occurrence_count`, so when several routes exist, the one
    /// whose edges have been confirmed most often wins. Falls back to the
    /// same no-path semantics as `find_path`.
    pub fn find_optimal_path(&self, from: &str, to: &str) -> Option<Vec<PathStep>> {
        if self.blockers.contains(to) {
            return None;
        }
        if from == to {
            return Some(Vec::new());
        }

        let mut dist: HashMap<&str, f64> = HashMap::new();
        let mut parent: HashMap<&str, (&str, &str)> = HashMap::new();
        let mut done: HashSet<&str> = HashSet::new();

        dist.insert(from, 0.0);

        loop {
            // Dijkstra without a priority queue; graphs here are small.
            let current = dist
                .iter()
                .filter(|(s, _)| !done.contains(*s))
                .min_by(|a, b| a.1.total_cmp(b.1))
                .map(|(s, _)| *s)?;

            if current == to {
                return Some(self.reconstruct(&parent, from, to));
            }
            done.insert(current);
            let base = dist[current];

            let Some(triggers) = self.edges.get(current) else {
                continue;
            };
            for (trigger, dests) in triggers {
                for (dest, count) in dests {
                    let cost = base + 1.0 / (*count as f64);
                    if dist.get(dest.as_str()).is_none_or(|d| cost < *d) {
                        dist.insert(dest, cost);
                        parent.insert(dest, (current, trigger));
                    }
                }
            }
        }
    }

    fn reconstruct(
        &self,
        parent: &HashMap<&str, (&str, &str)>,
        from: &str,
        to: &str,
    ) -> Vec<PathStep> {
        let mut steps = Vec::new();
        let mut cursor = to;
        while cursor != from {
            let (prev, trigger) = parent[cursor];
            steps.push(PathStep {
                screen_id: prev.to_string(),
                element_id: trigger.to_string(),
            });
            cursor = prev;
        }
        steps.reverse();
        steps
    }
}
