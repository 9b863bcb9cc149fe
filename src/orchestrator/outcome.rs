use crate::graph::blocker::is_blocker;
use crate::model::screen_model::Screen;

/// Classified consequence of one executed action, from the orchestrator's
/// point of view. Derived purely from the before/after observations — the
/// actuator's own success report is never trusted on its own.
#[derive(Debug, Clone, PartialEq)]
pub enum ObservedOutcome {
    /// Landed on a screen never seen this run
    NewScreen { to: String },

    /// Landed on a screen already known
    KnownScreen { to: String },

    /// Stayed put but the capture revealed elements not seen before
    RevealedElements { count: usize },

    /// Nothing observable changed
    NoEffect,

    /// The foreground app is no longer the target
    LeftApp,

    /// Landed on a credential/auth wall
    BlockerScreen { to: String },
}

impl ObservedOutcome {
    /// Whether the action discovered something (new screen or elements).
    pub fn discovered(&self) -> bool {
        matches!(
            self,
            ObservedOutcome::NewScreen { .. } | ObservedOutcome::RevealedElements { .. }
        )
    }
}

/// Classify an action by what the re-observation showed.
///
/// `newly_discovered` and `added` come from folding the capture into the
/// state aggregate: whether the screen was new to the run, and how many
/// elements the capture added to an already-known screen.
pub fn classify(
    before_id: &str,
    after: &Screen,
    target_package: &str,
    newly_discovered: bool,
    added: usize,
) -> ObservedOutcome {
    if after.package != target_package {
        return ObservedOutcome::LeftApp;
    }

    if after.id == before_id {
        if added > 0 {
            return ObservedOutcome::RevealedElements { count: added };
        }
        return ObservedOutcome::NoEffect;
    }

    if is_blocker(after) {
        return ObservedOutcome::BlockerScreen { to: after.id.clone() };
    }

    if newly_discovered {
        ObservedOutcome::NewScreen { to: after.id.clone() }
    } else {
        ObservedOutcome::KnownScreen { to: after.id.clone() }
    }
}
