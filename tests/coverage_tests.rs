use app_explorer::coverage::metrics::{CoverageMetrics, compute};
use app_explorer::orchestrator::state::{ExplorationState, IssueKind};

mod common;
use common::{clickable, input, scrollable, screen_with};

// =========================================================================
// State aggregate
// =========================================================================

#[test]
fn observe_deduplicates_by_screen_identity() {
    let mut state = ExplorationState::new();
    let first = screen_with(
        "HomeActivity",
        vec![clickable("Browse", "com.example.demo:id/browse", 800)],
    );

    let (id, new, added) = state.observe(first.clone());
    assert!(new);
    assert_eq!(added, 0);

    // Same activity with an extra element: absorbed, not duplicated
    let mut second = first;
    second
        .clickables
        .push(clickable("Refresh", "com.example.demo:id/refresh", 1000));
    let (id2, new2, added2) = state.observe(second);
    assert_eq!(id, id2);
    assert!(!new2);
    assert_eq!(added2, 1);
    assert_eq!(state.screens.len(), 1);
    assert_eq!(state.screen(&id).expect("kept").visit_count, 2);
}

#[test]
fn absorb_preserves_explored_flags() {
    let mut state = ExplorationState::new();
    let screen = screen_with(
        "HomeActivity",
        vec![clickable("Browse", "com.example.demo:id/browse", 800)],
    );
    let element_id = screen.clickables[0].id.clone();
    let key = screen.key_for(&element_id);
    let (id, ..) = state.observe(screen.clone());

    state.mark_visited(&id, &element_id, key);
    state.observe(screen);

    let kept = state
        .screen(&id)
        .and_then(|s| s.find_element(&element_id))
        .expect("element survives revisit");
    assert!(kept.explored, "A fresh capture never clears exploration history");
}

#[test]
fn mark_visited_writes_both_ledgers_and_passes_clear_only_one() {
    let mut state = ExplorationState::new();
    let screen = screen_with(
        "HomeActivity",
        vec![clickable("Browse", "com.example.demo:id/browse", 800)],
    );
    let key = screen.key_for(&screen.clickables[0].id);
    let element_id = screen.clickables[0].id.clone();
    let (id, ..) = state.observe(screen);

    state.mark_visited(&id, &element_id, key.clone());
    assert!(state.visited.contains(&key));
    assert!(state.tapped_this_pass.contains(&key));

    state.start_new_pass();
    assert_eq!(state.pass, 2);
    assert!(state.visited.contains(&key), "Run-level history survives");
    assert!(state.tapped_this_pass.is_empty(), "Per-pass ledger resets");
    assert!(state.queue.is_empty(), "Queued work is rebuilt each pass");
}

#[test]
fn issues_accumulate_instead_of_aborting() {
    let mut state = ExplorationState::new();
    state.record_issue(IssueKind::AppClosed, Some("abc"), "tap closed the app", 1000);
    state.record_issue(IssueKind::BranchUnreachable, None, "no route", 2000);

    assert_eq!(state.issues.len(), 2);
    assert_eq!(state.issues[0].kind, IssueKind::AppClosed);
    assert_eq!(state.issues[0].screen_id.as_deref(), Some("abc"));
    assert_eq!(state.issues[1].at_ms, 2000);
}

// =========================================================================
// Coverage metrics
// =========================================================================

fn populated_state() -> ExplorationState {
    let mut state = ExplorationState::new();

    // Fully explored screen: 2 clickables, both visited
    let mut done = screen_with(
        "DoneActivity",
        vec![
            clickable("A", "com.example.demo:id/a", 400),
            clickable("B", "com.example.demo:id/b", 600),
        ],
    );
    done.clickables.iter_mut().for_each(|e| e.explored = true);

    // Half-explored screen with a scrollable and an input
    let mut partial = screen_with(
        "PartialActivity",
        vec![
            clickable("C", "com.example.demo:id/c", 400),
            clickable("D", "com.example.demo:id/d", 600),
        ],
    );
    partial.clickables[0].explored = true;
    partial.scrollables.push(scrollable(200, 1700));
    partial.inputs.push(input("com.example.demo:id/search", 300));

    state.observe(done);
    state.observe(partial);
    state
}

#[test]
fn compute_counts_every_element_class() {
    let metrics = compute(&populated_state());

    assert_eq!(metrics.screens_discovered, 2);
    assert_eq!(metrics.screens_fully_explored, 1);
    // 4 clickables + 1 scrollable + 1 input
    assert_eq!(metrics.elements_discovered, 6);
    assert_eq!(metrics.elements_visited, 3);
}

#[test]
fn percentages_guard_against_empty_runs() {
    let empty = CoverageMetrics::default();
    assert_eq!(empty.element_coverage_pct(), 0.0);
    assert_eq!(empty.screen_coverage_pct(), 0.0);

    let metrics = compute(&populated_state());
    assert_eq!(metrics.element_coverage_pct(), 50.0);
    assert_eq!(metrics.screen_coverage_pct(), 50.0);
}

#[test]
fn unexplored_branches_track_queue_and_graph() {
    let mut state = populated_state();
    assert_eq!(compute(&state).unexplored_branches, 0);

    let screen = state.screens.values().next().expect("populated").clone();
    let target = app_explorer::frontier::queue::ExplorationTarget::tap(
        &screen.id,
        &screen.clickables[0],
        50,
    );
    state.queue.push(target);
    assert_eq!(compute(&state).unexplored_branches, 1);
}
