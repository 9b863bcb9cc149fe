use std::sync::{Arc, Mutex};

use app_explorer::lifecycle::machine::{LifecycleEvent, LifecycleMachine, LifecycleState};

// =========================================================================
// Happy path
// =========================================================================

#[test]
fn start_to_completion_walks_the_legal_states() {
    use LifecycleEvent as E;
    use LifecycleState as S;

    let mut machine = LifecycleMachine::new();
    assert_eq!(machine.state(), S::Idle);

    assert_eq!(machine.handle(E::StartRequested), S::Initializing);
    assert_eq!(machine.handle(E::InitializationComplete), S::Exploring);
    assert!(machine.can_explore());

    assert_eq!(machine.handle(E::StopRequested), S::Completing);
    assert!(!machine.is_terminal(), "Completing still verifies");
    assert_eq!(machine.handle(E::CompletionVerified), S::Completed);
    assert!(machine.is_terminal());
}

// =========================================================================
// Pause, stuck, recovery
// =========================================================================

#[test]
fn pause_and_resume_round_trip() {
    use LifecycleEvent as E;
    use LifecycleState as S;

    let mut machine = LifecycleMachine::new();
    machine.handle(E::StartRequested);
    machine.handle(E::InitializationComplete);

    assert_eq!(machine.handle(E::PauseRequested), S::Paused);
    assert!(!machine.can_explore());
    assert_eq!(machine.handle(E::ResumeRequested), S::Exploring);
}

#[test]
fn stuck_routes_back_to_exploring_on_either_recovery_outcome() {
    use LifecycleEvent as E;
    use LifecycleState as S;

    let mut machine = LifecycleMachine::new();
    machine.handle(E::StartRequested);
    machine.handle(E::InitializationComplete);

    assert_eq!(machine.handle(E::StuckThresholdReached), S::Stuck);
    assert_eq!(machine.handle(E::RecoverySucceeded), S::Exploring);

    machine.handle(E::StuckThresholdReached);
    assert_eq!(
        machine.handle(E::RecoveryFailed),
        S::Exploring,
        "An exhausted ladder abandons the branch, not the run"
    );
}

#[test]
fn stop_works_from_every_non_terminal_state() {
    use LifecycleEvent as E;
    use LifecycleState as S;

    for setup in [
        vec![],
        vec![E::StartRequested],
        vec![E::StartRequested, E::InitializationComplete],
        vec![E::StartRequested, E::InitializationComplete, E::PauseRequested],
        vec![E::StartRequested, E::InitializationComplete, E::StuckThresholdReached],
    ] {
        let mut machine = LifecycleMachine::new();
        for event in setup {
            machine.handle(event);
        }
        let after_stop = machine.handle(E::StopRequested);
        assert!(
            matches!(after_stop, S::Completing | S::Completed | S::Idle),
            "Stop from {:?} landed in {:?}",
            machine.state(),
            after_stop
        );
    }
}

// =========================================================================
// Total transitions
// =========================================================================

#[test]
fn irrelevant_events_are_defined_no_ops() {
    use LifecycleEvent as E;
    use LifecycleState as S;

    let mut machine = LifecycleMachine::new();
    assert_eq!(machine.handle(E::RecoverySucceeded), S::Idle, "Not stuck, nothing happens");
    assert_eq!(machine.handle(E::ResumeRequested), S::Idle);

    machine.handle(E::StartRequested);
    machine.handle(E::InitializationComplete);
    assert_eq!(machine.handle(E::ElementTapped), S::Exploring, "Progress events keep state");
    assert_eq!(machine.handle(E::NewScreenDiscovered), S::Exploring);
    assert_eq!(machine.handle(E::NoProgressDetected), S::Exploring);
}

#[test]
fn completed_is_absorbing() {
    use LifecycleEvent as E;
    use LifecycleState as S;

    let mut machine = LifecycleMachine::new();
    machine.handle(E::StartRequested);
    machine.handle(E::StopRequested);
    machine.handle(E::CompletionVerified);
    assert_eq!(machine.state(), S::Completed);

    for event in [E::StartRequested, E::StuckThresholdReached, E::PauseRequested] {
        assert_eq!(machine.handle(event), S::Completed);
    }
}

// =========================================================================
// Observer
// =========================================================================

#[test]
fn observer_sees_every_transition_including_no_ops() {
    use LifecycleEvent as E;

    let seen: Arc<Mutex<Vec<(LifecycleState, LifecycleState, LifecycleEvent)>>> =
        Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);

    let mut machine = LifecycleMachine::with_observer(Box::new(move |from, to, event| {
        sink.lock().expect("observer lock").push((from, to, event));
    }));

    machine.handle(E::StartRequested);
    machine.handle(E::ElementTapped);
    machine.handle(E::InitializationComplete);

    let log = seen.lock().expect("observer lock");
    assert_eq!(log.len(), 3, "No-ops are reported too");
    assert_eq!(
        log[0],
        (LifecycleState::Idle, LifecycleState::Initializing, E::StartRequested)
    );
    assert_eq!(
        log[1],
        (LifecycleState::Initializing, LifecycleState::Initializing, E::ElementTapped)
    );
}
