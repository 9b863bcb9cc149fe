use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::frontier::queue::{ExplorationTarget, TargetKind};
use crate::orchestrator::state::ExplorationState;
use crate::policy::action_key::{ActionKey, screen_state_key};
use crate::policy::qtable::QLearningPolicy;

// ============================================================================
// Strategies
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Exhaust the current screen before leaving it
    ScreenFirst,
    /// Global maximum priority
    PriorityBased,
    /// Prefer targets that lead deeper into the app
    DepthFirst,
    /// Prefer the least-visited screen
    BreadthFirst,
    /// Reading order on the current screen
    Systematic,
    /// Meta-strategy cycling through the others
    Adaptive,
}

impl Strategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::ScreenFirst => "screen_first",
            Strategy::PriorityBased => "priority_based",
            Strategy::DepthFirst => "depth_first",
            Strategy::BreadthFirst => "breadth_first",
            Strategy::Systematic => "systematic",
            Strategy::Adaptive => "adaptive",
        }
    }

    pub fn parse(s: &str) -> Option<Strategy> {
        match s {
            "screen_first" => Some(Strategy::ScreenFirst),
            "priority_based" => Some(Strategy::PriorityBased),
            "depth_first" => Some(Strategy::DepthFirst),
            "breadth_first" => Some(Strategy::BreadthFirst),
            "systematic" => Some(Strategy::Systematic),
            "adaptive" => Some(Strategy::Adaptive),
            _ => None,
        }
    }
}

// ============================================================================
// Selection
// ============================================================================

/// Pick the next target for a concrete (non-adaptive) strategy. One pure
/// selection function per variant, dispatched here; `Adaptive` must be
/// resolved to a concrete strategy by the caller first.
pub fn select_target(strategy: Strategy, state: &mut ExplorationState) -> Option<ExplorationTarget> {
    match strategy {
        Strategy::ScreenFirst => select_screen_first(state),
        Strategy::PriorityBased => select_priority_based(state),
        Strategy::DepthFirst => select_depth_first(state),
        Strategy::BreadthFirst => select_breadth_first(state),
        Strategy::Systematic => select_systematic(state),
        Strategy::Adaptive => select_priority_based(state),
    }
}

/// Strategy selection with the policy's ε-greedy layer on top: under the
/// priority-driven strategies, when several taps are queued for the current
/// screen, the Q-table chooses among them (exploration vs. exploitation
/// with the UCB term). Everywhere else the plain selector decides.
pub fn select_target_with_policy(
    strategy: Strategy,
    state: &mut ExplorationState,
    policy: &mut QLearningPolicy,
) -> Option<ExplorationTarget> {
    if matches!(strategy, Strategy::ScreenFirst | Strategy::PriorityBased) {
        if let Some(target) = policy_pick_current_screen(state, policy) {
            return Some(target);
        }
    }
    select_target(strategy, state)
}

/// ε-greedy + UCB choice among the current screen's queued taps. Abstains
/// when fewer than two candidates are queued there, or when the policy
/// excludes every candidate.
fn policy_pick_current_screen(
    state: &mut ExplorationState,
    policy: &mut QLearningPolicy,
) -> Option<ExplorationTarget> {
    let current = state.current_screen_id.clone()?;
    let screen = state.screens.get(&current)?;
    let state_key = screen_state_key(screen);

    let candidates: Vec<(String, String)> = state
        .queue
        .iter()
        .filter(|t| t.kind == TargetKind::TapElement && t.screen_id == current)
        .filter_map(|t| {
            let el = screen.find_element(&t.element_id)?;
            Some((t.key(), ActionKey::tap(el, screen).encode()))
        })
        .collect();
    if candidates.len() < 2 {
        return None;
    }

    let actions: Vec<String> = candidates.iter().map(|(_, a)| a.clone()).collect();
    let pick = policy.select(&state_key, &actions)?;
    state.queue.take(&candidates[pick].0)
}

fn select_screen_first(state: &mut ExplorationState) -> Option<ExplorationTarget> {
    if let Some(current) = state.current_screen_id.clone() {
        if let Some(target) = state.queue.pop_where(|t| t.screen_id == current) {
            return Some(target);
        }
    }
    state.queue.pop()
}

fn select_priority_based(state: &mut ExplorationState) -> Option<ExplorationTarget> {
    state.queue.pop()
}

fn select_depth_first(state: &mut ExplorationState) -> Option<ExplorationTarget> {
    let graph = &state.graph;
    // Navigation-typed work first, then the deepest screens
    state.queue.pop_by_rank(|t| {
        let nav_bonus: i64 = match t.kind {
            TargetKind::NavigateToScreen => 1_000_000,
            _ => 0,
        };
        nav_bonus + graph.depth_of(&t.screen_id) as i64 * 10_000 + t.priority as i64
    })
}

fn select_breadth_first(state: &mut ExplorationState) -> Option<ExplorationTarget> {
    let screens = &state.screens;
    state.queue.pop_by_rank(|t| {
        let visits = screens
            .get(&t.screen_id)
            .map(|s| s.visit_count)
            .unwrap_or(0) as i64;
        -visits * 10_000 + t.priority as i64
    })
}

fn select_systematic(state: &mut ExplorationState) -> Option<ExplorationTarget> {
    let current = state.current_screen_id.clone();
    state.queue.pop_by_rank(|t| {
        let on_current: i64 = match &current {
            Some(c) if *c == t.screen_id => 10_000_000,
            _ => 0,
        };
        // Reading order: top-to-bottom, left-to-right
        let position = t
            .bounds
            .map(|b| (b.top as i64) * 10_000 + b.left as i64)
            .unwrap_or(i64::MAX / 2);
        on_current - position
    })
}

// ============================================================================
// Adaptive meta-strategy
// ============================================================================

/// Actions sampled under one strategy before rotating forward.
pub const ADAPTIVE_QUOTA: u32 = 20;

/// Actions with zero discoveries that count as stagnation.
pub const ADAPTIVE_STAGNATION: u32 = 8;

const ROTATION: [Strategy; 5] = [
    Strategy::ScreenFirst,
    Strategy::PriorityBased,
    Strategy::DepthFirst,
    Strategy::BreadthFirst,
    Strategy::Systematic,
];

#[derive(Debug, Clone, Copy, Default)]
struct StrategyStats {
    actions: u64,
    discoveries: u64,
}

impl StrategyStats {
    fn rate(&self) -> f64 {
        if self.actions == 0 {
            return 0.0;
        }
        self.discoveries as f64 / self.actions as f64
    }
}

/// Cycles through the concrete strategies, measures the discoveries
/// attributable to each, switches forward on quota or stagnation, and
/// switches back to the best performer once every strategy has had a turn.
/// The final best is persisted per target package for future runs.
#[derive(Debug, Clone)]
pub struct AdaptiveState {
    current: Strategy,
    rotation_index: usize,
    window_actions: u32,
    window_discoveries: u32,
    stats: HashMap<Strategy, StrategyStats>,
}

impl AdaptiveState {
    pub fn new() -> Self {
        Self {
            current: ROTATION[0],
            rotation_index: 0,
            window_actions: 0,
            window_discoveries: 0,
            stats: HashMap::new(),
        }
    }

    /// Resume from a strategy persisted by a previous run.
    pub fn starting_from(strategy: Strategy) -> Self {
        let rotation_index = ROTATION
            .iter()
            .position(|s| *s == strategy)
            .unwrap_or(0);
        Self {
            current: ROTATION[rotation_index],
            rotation_index,
            window_actions: 0,
            window_discoveries: 0,
            stats: HashMap::new(),
        }
    }

    pub fn current(&self) -> Strategy {
        self.current
    }

    /// Account one action to the active strategy.
    pub fn record(&mut self, discovered: bool) {
        self.window_actions += 1;
        if discovered {
            self.window_discoveries += 1;
        }
        let stats = self.stats.entry(self.current).or_default();
        stats.actions += 1;
        if discovered {
            stats.discoveries += 1;
        }
    }

    /// Decide whether to change strategy. Returns the new strategy when a
    /// switch happened.
    pub fn maybe_switch(&mut self) -> Option<Strategy> {
        let stagnated =
            self.window_actions >= ADAPTIVE_STAGNATION && self.window_discoveries == 0;
        let quota_done = self.window_actions >= ADAPTIVE_QUOTA;
        if !stagnated && !quota_done {
            return None;
        }

        let next = if self.all_tried() {
            // Every strategy has a measurement: go back to the best one
            self.best_strategy()
        } else {
            self.rotation_index = (self.rotation_index + 1) % ROTATION.len();
            ROTATION[self.rotation_index]
        };

        self.window_actions = 0;
        self.window_discoveries = 0;
        if next != self.current {
            self.current = next;
            Some(next)
        } else {
            None
        }
    }

    fn all_tried(&self) -> bool {
        ROTATION.iter().all(|s| {
            self.stats
                .get(s)
                .is_some_and(|st| st.actions > 0)
        })
    }

    /// Best discovery rate measured so far; ties keep rotation order.
    pub fn best_strategy(&self) -> Strategy {
        ROTATION
            .iter()
            .copied()
            .max_by(|a, b| {
                let ra = self.stats.get(a).map(|s| s.rate()).unwrap_or(0.0);
                let rb = self.stats.get(b).map(|s| s.rate()).unwrap_or(0.0);
                ra.total_cmp(&rb)
            })
            .unwrap_or(ROTATION[0])
    }
}

impl Default for AdaptiveState {
    fn default() -> Self {
        Self::new()
    }
}
