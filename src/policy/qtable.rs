use std::collections::{HashMap, HashSet};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

// ============================================================================
// Learning constants
// ============================================================================

pub const ALPHA: f64 = 0.15; // learning rate
pub const GAMMA: f64 = 0.9; // discount
pub const BETA: f64 = 0.25; // human-feedback weight

pub const EPSILON_START: f64 = 0.30;
pub const EPSILON_MIN: f64 = 0.05;
pub const EPSILON_DECAY: f64 = 0.995; // per action taken

pub const UCB_C: f64 = 0.5;

pub const FEEDBACK_MIN: f64 = -3.0;
pub const FEEDBACK_MAX: f64 = 3.0;

/// Q below this after `DEAD_END_VISITS` visits is a confirmed dead end.
pub const DEAD_END_Q: f64 = -0.05;
pub const DEAD_END_VISITS: u32 = 3;

/// Q below this after `SKIP_VISITS` visits is never surfaced again.
pub const SKIP_Q: f64 = -0.08;
pub const SKIP_VISITS: u32 = 5;

/// Sentinel learned-boost value signalling a confirmed dead end to the
/// priority calculator, which turns it into a strongly negative score.
pub const DEAD_END_BOOST: f64 = -1000.0;

// ============================================================================
// Entries
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct PolicyEntry {
    pub q: f64,
    pub visits: u32,

    /// Accumulated human-feedback signal, cleared after one application
    pub feedback: f64,
}

// ============================================================================
// Policy
// ============================================================================

/// Tabular Q-learning over (state hash, generalized action key) pairs.
///
/// Never fails: unknown pairs read as neutral 0 and are created on first
/// reference. The in-memory table is authoritative for the run; persistence
/// is a separate, eventually-durable concern.
pub struct QLearningPolicy {
    table: HashMap<String, PolicyEntry>,

    /// Action generalizations known to close or crash the app. Tracked
    /// independently of Q so a single catastrophic outcome is enough.
    dangerous: HashSet<String>,

    /// Total actions taken this run, drives ε decay
    actions_taken: u64,

    rng: StdRng,
}

impl QLearningPolicy {
    pub fn new() -> Self {
        Self::with_seed(0x5eed)
    }

    pub fn with_seed(seed: u64) -> Self {
        Self {
            table: HashMap::new(),
            dangerous: HashSet::new(),
            actions_taken: 0,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn key(state: &str, action: &str) -> String {
        format!("{}|{}", state, action)
    }

    pub fn entry(&self, state: &str, action: &str) -> PolicyEntry {
        self.table
            .get(&Self::key(state, action))
            .copied()
            .unwrap_or_default()
    }

    pub fn value(&self, state: &str, action: &str) -> f64 {
        self.entry(state, action).q
    }

    pub fn actions_taken(&self) -> u64 {
        self.actions_taken
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    pub fn entries(&self) -> impl Iterator<Item = (&String, &PolicyEntry)> {
        self.table.iter()
    }

    /// Preload an entry, e.g. from the persistence collaborator at run start.
    pub fn seed_entry(&mut self, key: &str, entry: PolicyEntry) {
        self.table.insert(key.to_string(), entry);
    }

    // ------------------------------------------------------------------------
    // Updates
    // ------------------------------------------------------------------------

    /// Apply the update rule after an observed outcome:
    /// `Q ← Q + α·(reward + γ·max_a' Q(s',a') + β·H − Q)`.
    /// Any accumulated human feedback is consumed by this one update.
    /// Returns the new Q value.
    pub fn update(&mut self, state: &str, action: &str, reward: f64, next_max_q: f64) -> f64 {
        let entry = self
            .table
            .entry(Self::key(state, action))
            .or_default();
        let h = entry.feedback;
        entry.feedback = 0.0;
        entry.q += ALPHA * (reward + GAMMA * next_max_q + BETA * h - entry.q);
        entry.visits += 1;
        entry.q
    }

    /// Record a human feedback signal (+1 imitation, −1 veto, or stronger).
    /// Signals accumulate across repeated feedback, clamped to [−3, 3], and
    /// are consumed by the next `update` for the pair.
    pub fn record_feedback(&mut self, state: &str, action: &str, signal: f64) {
        let entry = self
            .table
            .entry(Self::key(state, action))
            .or_default();
        entry.feedback = (entry.feedback + signal).clamp(FEEDBACK_MIN, FEEDBACK_MAX);
    }

    /// Best known value over the candidate actions of a state; 0 when none
    /// are known. Feeds the γ·max term of `update`.
    pub fn max_value(&self, state: &str, actions: &[String]) -> f64 {
        actions
            .iter()
            .map(|a| self.value(state, a))
            .fold(0.0, f64::max)
    }

    pub fn note_action_taken(&mut self) {
        self.actions_taken += 1;
    }

    // ------------------------------------------------------------------------
    // Dead ends and dangerous patterns
    // ------------------------------------------------------------------------

    pub fn is_confirmed_dead_end(&self, state: &str, action: &str) -> bool {
        let entry = self.entry(state, action);
        entry.visits >= DEAD_END_VISITS && entry.q < DEAD_END_Q
    }

    /// True when the pair must never be surfaced for selection again.
    pub fn should_skip(&self, state: &str, action: &str) -> bool {
        let entry = self.entry(state, action);
        entry.visits >= SKIP_VISITS && entry.q < SKIP_Q
    }

    pub fn mark_dangerous(&mut self, action: &str) {
        self.dangerous.insert(action.to_string());
    }

    pub fn is_dangerous(&self, action: &str) -> bool {
        self.dangerous.contains(action)
    }

    pub fn dangerous_patterns(&self) -> impl Iterator<Item = &String> {
        self.dangerous.iter()
    }

    // ------------------------------------------------------------------------
    // Selection
    // ------------------------------------------------------------------------

    /// Current exploration rate: `max(ε_min, ε_start · decay^t)`.
    pub fn epsilon(&self) -> f64 {
        (EPSILON_START * EPSILON_DECAY.powf(self.actions_taken as f64)).max(EPSILON_MIN)
    }

    /// ε-greedy selection over candidate action keys within one state.
    ///
    /// Dangerous and skip-listed candidates are filtered out first. With
    /// probability ε an untried candidate is picked uniformly; otherwise the
    /// pick is by Q plus a UCB term `c·sqrt(ln N_screen / n_action)` that
    /// favors the less-visited actions of the same screen. Returns an index
    /// into `candidates`, or `None` when every candidate is excluded.
    pub fn select(&mut self, state: &str, candidates: &[String]) -> Option<usize> {
        let eligible: Vec<usize> = (0..candidates.len())
            .filter(|&i| {
                !self.is_dangerous(&candidates[i]) && !self.should_skip(state, &candidates[i])
            })
            .collect();
        if eligible.is_empty() {
            return None;
        }

        let n_screen: u32 = eligible
            .iter()
            .map(|&i| self.entry(state, &candidates[i]).visits)
            .sum();

        if self.rng.gen_range(0.0..1.0) < self.epsilon() {
            let untried: Vec<usize> = eligible
                .iter()
                .copied()
                .filter(|&i| self.entry(state, &candidates[i]).visits == 0)
                .collect();
            if !untried.is_empty() {
                let pick = self.rng.gen_range(0..untried.len());
                return Some(untried[pick]);
            }
            let pick = self.rng.gen_range(0..eligible.len());
            return Some(eligible[pick]);
        }

        let ln_n = ((n_screen.max(1)) as f64).ln();
        eligible.into_iter().max_by(|&a, &b| {
            let score = |i: usize| {
                let entry = self.entry(state, &candidates[i]);
                let bonus = UCB_C * (ln_n / (entry.visits.max(1) as f64)).sqrt();
                entry.q + bonus
            };
            score(a).total_cmp(&score(b))
        })
    }

    /// Learned contribution for the priority calculator: the value estimate
    /// plus an uncertainty bonus for rarely tried pairs, or the dead-end
    /// sentinel which overrides every heuristic.
    pub fn learned_boost(&self, state: &str, action: &str) -> f64 {
        if self.is_confirmed_dead_end(state, action) {
            return DEAD_END_BOOST;
        }
        let entry = self.entry(state, action);
        let uncertainty = 1.0 / (1.0 + entry.visits as f64);
        entry.q + 0.5 * uncertainty
    }
}

impl Default for QLearningPolicy {
    fn default() -> Self {
        Self::new()
    }
}
