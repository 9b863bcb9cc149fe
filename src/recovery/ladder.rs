use std::collections::HashSet;

use serde::Serialize;

use crate::device::actuator::Actuator;
use crate::device::clock::Clock;
use crate::device::provider::ScreenProvider;
use crate::frontier::priority::is_bottom_nav;
use crate::model::identity::composite_key;
use crate::model::screen_model::{Screen, ScrollDirection};

// ============================================================================
// Levels
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RecoveryLevel {
    /// Scroll the nearest scrollable container to reveal hidden content
    ScrollContent,
    /// Structured back-navigation
    BackNavigate,
    /// Tap an unvisited primary-navigation entry
    TapNavigationEntry,
    /// Clean app restart, preserving learned state
    RestartApp,
    /// Bounded wait for external (human) intervention
    RequestIntervention,
}

pub const LADDER: [RecoveryLevel; 5] = [
    RecoveryLevel::ScrollContent,
    RecoveryLevel::BackNavigate,
    RecoveryLevel::TapNavigationEntry,
    RecoveryLevel::RestartApp,
    RecoveryLevel::RequestIntervention,
];

#[derive(Debug, Clone, Serialize)]
pub struct RecoveryAttempt {
    pub level: RecoveryLevel,
    pub success: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct RecoveryResult {
    /// The level that succeeded, if any. `None` = ladder exhausted, the
    /// current branch is unreachable (branch-fatal, not run-fatal).
    pub succeeded: Option<RecoveryLevel>,

    pub attempts: Vec<RecoveryAttempt>,

    /// Set when the relaunch limit was exceeded; run-fatal.
    pub relaunch_limit_exceeded: bool,
}

impl RecoveryResult {
    pub fn recovered(&self) -> bool {
        self.succeeded.is_some()
    }
}

// ============================================================================
// Context
// ============================================================================

/// Narrow view of engine state the ladder needs; the orchestrator keeps
/// ownership of everything else.
pub struct RecoveryContext<'a> {
    pub provider: &'a mut dyn ScreenProvider,
    pub actuator: &'a mut dyn Actuator,
    pub clock: &'a dyn Clock,

    /// Screen the run is stuck on
    pub current: &'a Screen,
    pub package: &'a str,
    pub visited: &'a HashSet<String>,

    pub transition_wait_ms: u64,
    pub scroll_delay_ms: u64,
    pub intervention_wait_ms: u64,
}

// ============================================================================
// Ladder
// ============================================================================

pub const MAX_RELAUNCHES: u32 = 3;

/// Escalating recovery. Levels run in order; each reports success or
/// failure, and the next level only runs on failure.
pub struct RecoveryLadder {
    relaunches: u32,
    max_relaunches: u32,
}

impl RecoveryLadder {
    pub fn new() -> Self {
        Self { relaunches: 0, max_relaunches: MAX_RELAUNCHES }
    }

    pub fn relaunches(&self) -> u32 {
        self.relaunches
    }

    /// Run the ladder from the given starting level (normally the bottom;
    /// the hard-stuck path enters directly at `RestartApp`).
    pub fn run(&mut self, ctx: &mut RecoveryContext<'_>, start: RecoveryLevel) -> RecoveryResult {
        let mut attempts = Vec::new();
        let start_index = LADDER.iter().position(|l| *l == start).unwrap_or(0);

        for level in &LADDER[start_index..] {
            if *level == RecoveryLevel::RestartApp && self.relaunches >= self.max_relaunches {
                return RecoveryResult {
                    succeeded: None,
                    attempts,
                    relaunch_limit_exceeded: true,
                };
            }

            let success = self.attempt(*level, ctx);
            attempts.push(RecoveryAttempt { level: *level, success });
            if success {
                return RecoveryResult {
                    succeeded: Some(*level),
                    attempts,
                    relaunch_limit_exceeded: false,
                };
            }
        }

        RecoveryResult { succeeded: None, attempts, relaunch_limit_exceeded: false }
    }

    fn attempt(&mut self, level: RecoveryLevel, ctx: &mut RecoveryContext<'_>) -> bool {
        match level {
            RecoveryLevel::ScrollContent => scroll_content(ctx),
            RecoveryLevel::BackNavigate => back_navigate(ctx),
            RecoveryLevel::TapNavigationEntry => tap_navigation_entry(ctx),
            RecoveryLevel::RestartApp => {
                self.relaunches += 1;
                restart_app(ctx)
            }
            RecoveryLevel::RequestIntervention => request_intervention(ctx),
        }
    }
}

impl Default for RecoveryLadder {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Level implementations
// ============================================================================

fn recapture(ctx: &mut RecoveryContext<'_>, wait_ms: u64) -> Option<Screen> {
    ctx.clock.sleep_ms(wait_ms);
    ctx.provider.capture().ok()
}

/// Progress = a different screen, or elements this screen had not shown.
fn made_progress(before: &Screen, after: &Screen) -> bool {
    if after.id != before.id {
        return true;
    }
    after.elements().any(|e| before.find_element(&e.id).is_none())
}

fn scroll_content(ctx: &mut RecoveryContext<'_>) -> bool {
    let Some(container) = ctx.current.scrollables.first() else {
        return false;
    };
    let (x, y) = container.bounds.center();
    if ctx.actuator.scroll(x, y, ScrollDirection::Down).is_err() {
        return false;
    }
    let Some(after) = recapture(ctx, ctx.scroll_delay_ms) else {
        return false;
    };
    made_progress(ctx.current, &after)
}

fn back_navigate(ctx: &mut RecoveryContext<'_>) -> bool {
    if ctx.actuator.press_back().is_err() {
        return false;
    }
    let Some(after) = recapture(ctx, ctx.transition_wait_ms) else {
        return false;
    };
    // Backing out of the app entirely is not a recovery
    after.id != ctx.current.id && after.package == ctx.package
}

fn tap_navigation_entry(ctx: &mut RecoveryContext<'_>) -> bool {
    let entry = ctx.current.clickables.iter().find(|e| {
        is_bottom_nav(e, ctx.current)
            && !ctx
                .visited
                .contains(&composite_key(&ctx.current.id, &e.id))
    });
    let Some(entry) = entry else {
        return false;
    };
    let (x, y) = entry.bounds.center();
    if ctx.actuator.tap(x, y).is_err() {
        return false;
    }
    let Some(after) = recapture(ctx, ctx.transition_wait_ms) else {
        return false;
    };
    after.id != ctx.current.id
}

fn restart_app(ctx: &mut RecoveryContext<'_>) -> bool {
    if ctx.actuator.launch_app(ctx.package, true).is_err() {
        return false;
    }
    let Some(after) = recapture(ctx, ctx.transition_wait_ms) else {
        return false;
    };
    after.package == ctx.package
}

/// Wait, bounded, for something external to change the screen.
fn request_intervention(ctx: &mut RecoveryContext<'_>) -> bool {
    let deadline = ctx.clock.now_ms() + ctx.intervention_wait_ms;
    let poll = ctx.transition_wait_ms.max(250);
    while ctx.clock.now_ms() < deadline {
        ctx.clock.sleep_ms(poll);
        if let Ok(after) = ctx.provider.capture() {
            if after.id != ctx.current.id && after.package == ctx.package {
                return true;
            }
        }
    }
    false
}
