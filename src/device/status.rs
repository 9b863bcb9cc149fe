use serde::Serialize;

use crate::lifecycle::machine::{LifecycleEvent, LifecycleState};

/// Progress tuple pushed to the status sink after each iteration.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct Progress {
    pub screens_explored: usize,
    pub elements_explored: usize,
    pub frontier_size: usize,
    pub state: LifecycleState,
}

/// Receives state transitions and progress updates for display/telemetry.
/// The engine treats every call as fire-and-forget: implementations must
/// not fail and must not block the control loop.
pub trait StatusSink {
    fn on_transition(&mut self, from: LifecycleState, to: LifecycleState, event: &LifecycleEvent);

    fn on_progress(&mut self, progress: Progress);
}

/// Discards everything.
pub struct NullStatusSink;

impl StatusSink for NullStatusSink {
    fn on_transition(&mut self, _: LifecycleState, _: LifecycleState, _: &LifecycleEvent) {}

    fn on_progress(&mut self, _: Progress) {}
}

/// Prints transitions and progress to stderr. Used by the CLI at -v.
pub struct ConsoleStatusSink;

impl StatusSink for ConsoleStatusSink {
    fn on_transition(&mut self, from: LifecycleState, to: LifecycleState, event: &LifecycleEvent) {
        if from != to {
            eprintln!("[lifecycle] {:?} -> {:?} ({:?})", from, to, event);
        }
    }

    fn on_progress(&mut self, progress: Progress) {
        eprintln!(
            "[progress] screens={} elements={} frontier={} state={:?}",
            progress.screens_explored,
            progress.elements_explored,
            progress.frontier_size,
            progress.state
        );
    }
}
