use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Injectable time source.
///
/// Every wait the engine performs (action delays, transition settling,
/// stabilization polling, intervention timeouts) goes through this trait so
/// tests run without real wall-clock waits.
pub trait Clock: Send + Sync {
    /// Milliseconds since some fixed origin.
    fn now_ms(&self) -> u64;

    fn sleep_ms(&self, ms: u64);
}

// ============================================================================
// System clock
// ============================================================================

pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self { origin: Instant::now() }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        self.origin.elapsed().as_millis() as u64
    }

    fn sleep_ms(&self, ms: u64) {
        std::thread::sleep(Duration::from_millis(ms));
    }
}

// ============================================================================
// Manual clock (tests)
// ============================================================================

/// Deterministic clock: `sleep_ms` advances the reading instead of blocking.
pub struct ManualClock {
    now: AtomicU64,
}

impl ManualClock {
    pub fn new() -> Self {
        Self { now: AtomicU64::new(0) }
    }

    pub fn advance(&self, ms: u64) {
        self.now.fetch_add(ms, Ordering::SeqCst);
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }

    fn sleep_ms(&self, ms: u64) {
        self.advance(ms);
    }
}
