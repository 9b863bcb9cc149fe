use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::device::actuator::Actuator;
use crate::device::clock::Clock;
use crate::device::provider::ScreenProvider;
use crate::device::status::StatusSink;
use crate::orchestrator::config::ExplorationConfig;
use crate::orchestrator::engine::Orchestrator;
use crate::orchestrator::report::ExplorationReport;

// ============================================================================
// Cooperative control flags
// ============================================================================

/// Stop/pause flags observed at the top of every iteration and at every
/// suspension resume point — never mid-action.
#[derive(Debug, Default)]
pub struct ControlFlags {
    stop: AtomicBool,
    pause: AtomicBool,
}

impl ControlFlags {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request_stop(&self) {
        self.stop.store(true, Ordering::SeqCst);
    }

    pub fn request_pause(&self) {
        self.pause.store(true, Ordering::SeqCst);
    }

    pub fn request_resume(&self) {
        self.pause.store(false, Ordering::SeqCst);
    }

    pub fn stop_requested(&self) -> bool {
        self.stop.load(Ordering::SeqCst)
    }

    pub fn pause_requested(&self) -> bool {
        self.pause.load(Ordering::SeqCst)
    }
}

/// Cloneable handle for controlling a running session from another thread.
#[derive(Clone)]
pub struct SessionHandle {
    flags: Arc<ControlFlags>,
}

impl SessionHandle {
    pub fn stop(&self) {
        self.flags.request_stop();
    }

    pub fn pause(&self) {
        self.flags.request_pause();
    }

    pub fn resume(&self) {
        self.flags.request_resume();
    }
}

// ============================================================================
// Session
// ============================================================================

/// The run control surface: owns one orchestrator and exposes
/// start / stop / pause / resume / start-another-pass.
pub struct ExplorationSession {
    orchestrator: Orchestrator,
    flags: Arc<ControlFlags>,
}

impl ExplorationSession {
    pub fn start(
        package: impl Into<String>,
        config: ExplorationConfig,
        provider: Box<dyn ScreenProvider>,
        actuator: Box<dyn Actuator>,
        status: Box<dyn StatusSink>,
        clock: Box<dyn Clock>,
    ) -> Self {
        let flags = Arc::new(ControlFlags::new());
        let orchestrator = Orchestrator::new(
            package,
            config,
            provider,
            actuator,
            status,
            clock,
            Arc::clone(&flags),
        );
        Self { orchestrator, flags }
    }

    pub fn handle(&self) -> SessionHandle {
        SessionHandle { flags: Arc::clone(&self.flags) }
    }

    pub fn orchestrator_mut(&mut self) -> &mut Orchestrator {
        &mut self.orchestrator
    }

    /// Run one pass to completion (blocking).
    pub fn run(&mut self) -> ExplorationReport {
        self.orchestrator.run()
    }

    /// Begin another full sweep reusing everything learned so far, and run
    /// it. The per-pass tap ledger is cleared; the run-level visited set,
    /// graph, and policy survive.
    pub fn start_another_pass(&mut self) -> ExplorationReport {
        self.orchestrator.start_another_pass();
        self.orchestrator.run()
    }
}
