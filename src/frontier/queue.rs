use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::frontier::priority::{self, PriorityMode};
use crate::model::identity::composite_key;
use crate::model::screen_model::{Bounds, Element, ElementKind, Screen};

// ============================================================================
// Targets
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TargetKind {
    TapElement,
    ScrollContainer,
    NavigateToScreen,
}

/// A queued unit of work. Created by the queue manager, consumed exactly
/// once by the orchestrator, possibly re-queued with a decayed priority on
/// transient failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExplorationTarget {
    pub kind: TargetKind,
    pub screen_id: String,

    /// Empty for `NavigateToScreen` targets
    pub element_id: String,

    pub priority: i32,
    pub bounds: Option<Bounds>,

    /// Delivery attempts so far; transient failures bump this
    pub attempts: u32,
}

impl ExplorationTarget {
    pub fn tap(screen_id: &str, element: &Element, priority: i32) -> Self {
        Self {
            kind: TargetKind::TapElement,
            screen_id: screen_id.to_string(),
            element_id: element.id.clone(),
            priority,
            bounds: Some(element.bounds),
            attempts: 0,
        }
    }

    pub fn scroll(screen_id: &str, element: &Element, priority: i32) -> Self {
        Self {
            kind: TargetKind::ScrollContainer,
            screen_id: screen_id.to_string(),
            element_id: element.id.clone(),
            priority,
            bounds: Some(element.bounds),
            attempts: 0,
        }
    }

    pub fn navigate(screen_id: &str, priority: i32) -> Self {
        Self {
            kind: TargetKind::NavigateToScreen,
            screen_id: screen_id.to_string(),
            element_id: String::new(),
            priority,
            bounds: None,
            attempts: 0,
        }
    }

    /// Composite key identifying the piece of work, for dedupe and the
    /// visited ledger.
    pub fn key(&self) -> String {
        match self.kind {
            TargetKind::NavigateToScreen => format!("nav:{}", self.screen_id),
            _ => composite_key(&self.screen_id, &self.element_id),
        }
    }
}

// ============================================================================
// Frontier queue
// ============================================================================

/// Base priority for scroll targets; revealing hidden content matters less
/// than tapping identified elements.
pub const SCROLL_BASE_PRIORITY: i32 = 50;

/// Targets retried past this cap are branch-fatal and dropped.
pub const MAX_TARGET_ATTEMPTS: u32 = 3;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct QueuedTarget {
    target: ExplorationTarget,
    seq: u64,
}

/// The not-yet-executed exploration targets, ordered by priority with
/// insertion order as the stable tie-break.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FrontierQueue {
    entries: Vec<QueuedTarget>,
    next_seq: u64,
}

impl FrontierQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.iter().any(|e| e.target.key() == key)
    }

    /// Push a target unless an entry with the same key is already queued.
    /// Returns whether it was added.
    pub fn push(&mut self, target: ExplorationTarget) -> bool {
        let key = target.key();
        if self.contains_key(&key) {
            return false;
        }
        let seq = self.next_seq;
        self.next_seq += 1;
        self.entries.push(QueuedTarget { target, seq });
        true
    }

    /// Pop the highest-priority target; ties go to the earliest insertion.
    pub fn pop(&mut self) -> Option<ExplorationTarget> {
        let best = self
            .entries
            .iter()
            .enumerate()
            .max_by(|(_, a), (_, b)| {
                a.target
                    .priority
                    .cmp(&b.target.priority)
                    .then(b.seq.cmp(&a.seq))
            })
            .map(|(i, _)| i)?;
        Some(self.entries.swap_remove(best).target)
    }

    /// Pop the best target satisfying a predicate (used by the per-variant
    /// strategy selectors). Falls back to `None` without disturbing the rest.
    pub fn pop_where(
        &mut self,
        predicate: impl Fn(&ExplorationTarget) -> bool,
    ) -> Option<ExplorationTarget> {
        let best = self
            .entries
            .iter()
            .enumerate()
            .filter(|(_, e)| predicate(&e.target))
            .max_by(|(_, a), (_, b)| {
                a.target
                    .priority
                    .cmp(&b.target.priority)
                    .then(b.seq.cmp(&a.seq))
            })
            .map(|(i, _)| i)?;
        Some(self.entries.swap_remove(best).target)
    }

    /// Pop by an arbitrary ranking function, highest rank wins, stable by
    /// insertion order.
    pub fn pop_by_rank(
        &mut self,
        rank: impl Fn(&ExplorationTarget) -> i64,
    ) -> Option<ExplorationTarget> {
        let best = self
            .entries
            .iter()
            .enumerate()
            .max_by(|(_, a), (_, b)| {
                rank(&a.target)
                    .cmp(&rank(&b.target))
                    .then(b.seq.cmp(&a.seq))
            })
            .map(|(i, _)| i)?;
        Some(self.entries.swap_remove(best).target)
    }

    /// Re-queue a target that failed transiently, with one more recorded
    /// attempt and half the priority. Targets past the attempt cap are
    /// dropped instead; the caller logs the branch-fatal issue.
    pub fn requeue_decayed(&mut self, mut target: ExplorationTarget) -> bool {
        target.attempts += 1;
        if target.attempts >= MAX_TARGET_ATTEMPTS {
            return false;
        }
        target.priority /= 2;
        self.push(target)
    }

    /// Drop every queued target on a screen (branch abandoned). Returns how
    /// many were removed.
    pub fn remove_screen(&mut self, screen_id: &str) -> usize {
        let before = self.entries.len();
        self.entries.retain(|e| e.target.screen_id != screen_id);
        before - self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ExplorationTarget> {
        self.entries.iter().map(|e| &e.target)
    }

    /// Remove and return the queued target with the given key, if any.
    pub fn take(&mut self, key: &str) -> Option<ExplorationTarget> {
        let index = self.entries.iter().position(|e| e.target.key() == key)?;
        Some(self.entries.swap_remove(index).target)
    }

    // ------------------------------------------------------------------------
    // Queue manager: turn a screen into candidate targets
    // ------------------------------------------------------------------------

    /// Enqueue the actionable elements of a screen, applying exclusion
    /// rules: already-visited composite keys, already-queued keys, elements
    /// flagged explored, and dangerous patterns (via `exclude`). The
    /// learned boost for each element comes from `boost`. Returns the
    /// number of targets added.
    pub fn enqueue_screen(
        &mut self,
        screen: &Screen,
        visited: &HashSet<String>,
        mode: PriorityMode,
        exclude: impl Fn(&Element) -> bool,
        boost: impl Fn(&Element) -> f64,
    ) -> usize {
        let mut added = 0;

        for el in &screen.clickables {
            let key = composite_key(&screen.id, &el.id);
            if el.explored || visited.contains(&key) || exclude(el) {
                continue;
            }
            let p = priority::score(el, screen, mode, false, boost(el));
            if self.push(ExplorationTarget::tap(&screen.id, el, p)) {
                added += 1;
            }
        }

        for el in &screen.scrollables {
            let key = composite_key(&screen.id, &el.id);
            if el.explored || visited.contains(&key) || exclude(el) {
                continue;
            }
            debug_assert_eq!(el.kind, ElementKind::Scrollable);
            if self.push(ExplorationTarget::scroll(&screen.id, el, SCROLL_BASE_PRIORITY)) {
                added += 1;
            }
        }

        added
    }
}
