// ============================================================================
// Staleness detection
// ============================================================================

/// Consecutive no-discovery actions on the same screen before recovery.
pub const STUCK_THRESHOLD: u32 = 5;

/// Consecutive no-discovery actions before recovery starts at the restart
/// level instead of the bottom of the ladder.
pub const RESTART_THRESHOLD: u32 = 15;

/// Time since last discovery that counts as a plateau even when the action
/// counter keeps getting reset by screen hopping.
pub const PLATEAU_MS: u64 = 120_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Staleness {
    Fresh,
    Stuck,
    RestartNeeded,
}

/// Single consolidated staleness signal.
///
/// Counts consecutive actions that discovered nothing while remaining on
/// the same screen; any discovery resets the window (the discovering action
/// opens the next one, so the counter reads 1 immediately after), and a
/// screen change restarts the count at 1. A wall-time plateau measured on
/// the injected clock catches the screen-hopping case the counter misses.
#[derive(Debug, Clone)]
pub struct StalenessTracker {
    counter: u32,
    last_screen: Option<String>,
    last_discovery_ms: u64,
}

impl StalenessTracker {
    pub fn new(now_ms: u64) -> Self {
        Self { counter: 0, last_screen: None, last_discovery_ms: now_ms }
    }

    /// Record one completed action and its discovery outcome.
    pub fn record(&mut self, screen_id: &str, discovered: bool, now_ms: u64) {
        if discovered {
            self.counter = 1;
            self.last_discovery_ms = now_ms;
        } else if self.last_screen.as_deref() == Some(screen_id) {
            self.counter += 1;
        } else {
            self.counter = 1;
        }
        self.last_screen = Some(screen_id.to_string());
    }

    pub fn counter(&self) -> u32 {
        self.counter
    }

    pub fn plateaued(&self, now_ms: u64) -> bool {
        now_ms.saturating_sub(self.last_discovery_ms) >= PLATEAU_MS
    }

    pub fn level(&self, now_ms: u64) -> Staleness {
        if self.counter >= RESTART_THRESHOLD {
            Staleness::RestartNeeded
        } else if self.counter >= STUCK_THRESHOLD || self.plateaued(now_ms) {
            Staleness::Stuck
        } else {
            Staleness::Fresh
        }
    }

    /// Reset after a recovery attempt so the next window starts clean.
    pub fn reset(&mut self, now_ms: u64) {
        self.counter = 0;
        self.last_screen = None;
        self.last_discovery_ms = now_ms;
    }
}
