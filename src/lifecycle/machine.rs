use serde::{Deserialize, Serialize};

// ============================================================================
// States and events
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LifecycleState {
    Idle,
    Initializing,
    Exploring,
    Paused,
    Stuck,
    Completing,
    Completed,
}

impl LifecycleState {
    /// `Completed` is the only terminal state. `Stuck` is a checkpoint that
    /// always routes back through recovery.
    pub fn is_terminal(&self) -> bool {
        matches!(self, LifecycleState::Completed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LifecycleEvent {
    StartRequested,
    InitializationComplete,
    ElementTapped,
    NewScreenDiscovered,
    NoProgressDetected,
    StuckThresholdReached,
    RecoverySucceeded,
    RecoveryFailed,
    PauseRequested,
    ResumeRequested,
    StopRequested,
    CompletionVerified,
}

// ============================================================================
// Machine
// ============================================================================

pub type TransitionObserver =
    Box<dyn FnMut(LifecycleState, LifecycleState, LifecycleEvent) + Send>;

/// Governs which operations are legal for the orchestrator.
///
/// Transitions are total: every (state, event) pair has a defined effect,
/// with a stay-put no-op for events irrelevant to the current state. Every
/// transition — including no-ops — is reported through the observer.
pub struct LifecycleMachine {
    state: LifecycleState,
    observer: Option<TransitionObserver>,
}

impl LifecycleMachine {
    pub fn new() -> Self {
        Self { state: LifecycleState::Idle, observer: None }
    }

    pub fn with_observer(observer: TransitionObserver) -> Self {
        Self { state: LifecycleState::Idle, observer: Some(observer) }
    }

    pub fn set_observer(&mut self, observer: TransitionObserver) {
        self.observer = Some(observer);
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    pub fn can_explore(&self) -> bool {
        matches!(self.state, LifecycleState::Exploring)
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    /// Apply an event, returning the (possibly unchanged) new state.
    pub fn handle(&mut self, event: LifecycleEvent) -> LifecycleState {
        use LifecycleEvent as E;
        use LifecycleState as S;

        let old = self.state;
        let new = match (old, event) {
            (S::Idle, E::StartRequested) => S::Initializing,

            (S::Initializing, E::InitializationComplete) => S::Exploring,
            (S::Initializing, E::StopRequested) => S::Completing,

            (S::Exploring, E::StuckThresholdReached) => S::Stuck,
            (S::Exploring, E::PauseRequested) => S::Paused,
            (S::Exploring, E::StopRequested) => S::Completing,

            (S::Paused, E::ResumeRequested) => S::Exploring,
            (S::Paused, E::StopRequested) => S::Completing,

            // Recovery outcome routes Stuck back to the loop either way;
            // an exhausted ladder only abandons the current branch.
            (S::Stuck, E::RecoverySucceeded) => S::Exploring,
            (S::Stuck, E::RecoveryFailed) => S::Exploring,
            (S::Stuck, E::StopRequested) => S::Completing,

            (S::Completing, E::CompletionVerified) => S::Completed,
            (S::Completing, E::StopRequested) => S::Completed,

            // Progress events never change state by themselves
            (s, E::ElementTapped)
            | (s, E::NewScreenDiscovered)
            | (s, E::NoProgressDetected) => s,

            // Everything else is a defined no-op
            (s, _) => s,
        };

        self.state = new;
        if let Some(observer) = self.observer.as_mut() {
            observer(old, new, event);
        }
        new
    }
}

impl Default for LifecycleMachine {
    fn default() -> Self {
        Self::new()
    }
}
