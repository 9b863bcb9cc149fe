use std::collections::HashSet;

use app_explorer::frontier::priority::{
    BASE_SCORE, DEAD_END_SCORE, PriorityMode, is_bottom_nav, is_destructive, is_meta_element,
    score,
};
use app_explorer::frontier::queue::{
    ExplorationTarget, FrontierQueue, MAX_TARGET_ATTEMPTS, TargetKind,
};
use app_explorer::model::screen_model::{Bounds, Element, ElementKind};
use app_explorer::policy::qtable::DEAD_END_BOOST;

mod common;
use common::{anonymous_clickable, clickable, scrollable, screen, screen_with};

// =========================================================================
// Priority scoring
// =========================================================================

fn bottom_nav_screen() -> app_explorer::model::screen_model::Screen {
    let mut s = screen("HomeActivity");
    for (i, name) in ["Home", "Search", "Profile"].iter().enumerate() {
        s.clickables.push(Element::new(
            Some(format!("com.example.demo:id/nav_{}", name.to_lowercase())),
            Some(name.to_string()),
            "android.widget.FrameLayout",
            Bounds::new(i as i32 * 360, 1760, (i as i32 + 1) * 360, 1900),
            ElementKind::Clickable,
        ));
    }
    s.clickables.push(clickable("Browse", "com.example.demo:id/browse", 800));
    s
}

#[test]
fn identified_content_beats_anonymous_edges() {
    let s = screen("HomeActivity");
    let identified = clickable("Browse", "com.example.demo:id/browse", 800);
    let top_anonymous = anonymous_clickable(100);

    let a = score(&identified, &s, PriorityMode::Standard, false, 0.0);
    let b = score(&top_anonymous, &s, PriorityMode::Standard, false, 0.0);
    assert_eq!(a, BASE_SCORE + 40 + 30 + 25, "Text + resource + middle zone");
    assert_eq!(b, BASE_SCORE - 20 - 10, "Anonymous + top edge");
    assert!(a > b);
}

#[test]
fn unvisited_bottom_nav_outranks_everything_in_standard_mode() {
    let s = bottom_nav_screen();
    let nav = &s.clickables[0];
    let content = &s.clickables[3];
    assert!(is_bottom_nav(nav, &s));
    assert!(!is_bottom_nav(content, &s));

    let nav_score = score(nav, &s, PriorityMode::Standard, false, 0.0);
    let content_score = score(content, &s, PriorityMode::Standard, false, 0.0);
    assert!(nav_score > content_score, "{} vs {}", nav_score, content_score);

    // Visited nav entries drop behind fresh content
    let visited_nav = score(nav, &s, PriorityMode::Standard, true, 0.0);
    assert!(visited_nav < content_score);
}

#[test]
fn adaptive_mode_shrinks_the_hand_tuned_nav_boost() {
    let s = bottom_nav_screen();
    let nav = &s.clickables[0];
    let standard = score(nav, &s, PriorityMode::Standard, false, 0.0);
    let adaptive = score(nav, &s, PriorityMode::Adaptive, false, 0.0);
    assert!(adaptive < standard, "The policy is expected to learn nav value instead");
}

#[test]
fn meta_elements_are_penalized_and_dead_ends_sink() {
    let s = screen("HomeActivity");
    let settings = clickable("Settings", "com.example.demo:id/open_settings", 800);
    assert!(is_meta_element(&settings));

    let plain = clickable("Browse", "com.example.demo:id/browse", 800);
    assert!(
        score(&settings, &s, PriorityMode::Standard, false, 0.0)
            < score(&plain, &s, PriorityMode::Standard, false, 0.0)
    );

    assert_eq!(
        score(&plain, &s, PriorityMode::Standard, false, DEAD_END_BOOST),
        DEAD_END_SCORE,
        "Confirmed dead ends override every heuristic"
    );
}

#[test]
fn learned_boost_shifts_the_score() {
    let s = screen("HomeActivity");
    let el = clickable("Browse", "com.example.demo:id/browse", 800);
    let neutral = score(&el, &s, PriorityMode::Adaptive, false, 0.0);
    let boosted = score(&el, &s, PriorityMode::Adaptive, false, 0.8);
    let punished = score(&el, &s, PriorityMode::Adaptive, false, -0.8);
    assert_eq!(boosted - neutral, 40, "0.8 Q at 50 points per unit");
    assert!(punished < neutral);
}

#[test]
fn destructive_labels_are_recognized() {
    assert!(is_destructive(&clickable("Delete account", "x", 800)));
    assert!(is_destructive(&clickable("Log out", "x", 800)));
    assert!(!is_destructive(&clickable("Browse", "x", 800)));
}

// =========================================================================
// Queue ordering
// =========================================================================

fn tap_target(screen_id: &str, name: &str, priority: i32) -> ExplorationTarget {
    let el = clickable(name, &format!("com.example.demo:id/{}", name), 800);
    ExplorationTarget::tap(screen_id, &el, priority)
}

#[test]
fn pop_is_by_priority_with_insertion_order_ties() {
    let mut queue = FrontierQueue::new();
    queue.push(tap_target("s1", "low", 10));
    queue.push(tap_target("s1", "first_high", 50));
    queue.push(tap_target("s1", "second_high", 50));

    assert_eq!(queue.pop().expect("queued").element_id, tap_target("s1", "first_high", 50).element_id);
    assert_eq!(queue.pop().expect("queued").element_id, tap_target("s1", "second_high", 50).element_id);
    assert_eq!(queue.pop().expect("queued").priority, 10);
    assert!(queue.pop().is_none());
}

#[test]
fn duplicate_keys_are_not_enqueued_twice() {
    let mut queue = FrontierQueue::new();
    assert!(queue.push(tap_target("s1", "browse", 50)));
    assert!(!queue.push(tap_target("s1", "browse", 99)), "Same composite key");
    assert_eq!(queue.len(), 1);
}

#[test]
fn requeue_decays_priority_and_caps_attempts() {
    let mut queue = FrontierQueue::new();
    let target = tap_target("s1", "flaky", 80);

    assert!(queue.requeue_decayed(target));
    let retried = queue.pop().expect("requeued");
    assert_eq!(retried.attempts, 1);
    assert_eq!(retried.priority, 40);

    let mut worn = retried;
    worn.attempts = MAX_TARGET_ATTEMPTS - 1;
    assert!(!queue.requeue_decayed(worn), "Past the cap the target is dropped");
    assert!(queue.is_empty());
}

#[test]
fn remove_screen_drops_only_that_screens_targets() {
    let mut queue = FrontierQueue::new();
    queue.push(tap_target("s1", "a", 50));
    queue.push(tap_target("s1", "b", 50));
    queue.push(tap_target("s2", "c", 50));

    assert_eq!(queue.remove_screen("s1"), 2);
    assert_eq!(queue.len(), 1);
    assert_eq!(queue.pop().expect("queued").screen_id, "s2");
}

// =========================================================================
// Queue manager
// =========================================================================

#[test]
fn enqueue_screen_skips_visited_explored_and_excluded() {
    let mut s = screen_with(
        "HomeActivity",
        vec![
            clickable("Browse", "com.example.demo:id/browse", 700),
            clickable("Open", "com.example.demo:id/open", 900),
            clickable("Logout", "com.example.demo:id/logout", 1100),
        ],
    );
    s.clickables[1].explored = true;
    s.scrollables.push(scrollable(200, 1700));

    let mut visited = HashSet::new();
    visited.insert(s.key_for(&s.clickables[0].id));

    let mut queue = FrontierQueue::new();
    let added = queue.enqueue_screen(
        &s,
        &visited,
        PriorityMode::Standard,
        |el| el.text.as_deref() == Some("Logout"),
        |_| 0.0,
    );

    // Only the scroll container survives the exclusions
    assert_eq!(added, 1);
    let target = queue.pop().expect("scroll container queued");
    assert_eq!(target.kind, TargetKind::ScrollContainer);
}

#[test]
fn enqueue_screen_queues_taps_and_scrolls() {
    let mut s = screen_with(
        "ListActivity",
        vec![clickable("Open", "com.example.demo:id/open", 900)],
    );
    s.scrollables.push(scrollable(200, 1700));

    let mut queue = FrontierQueue::new();
    let added = queue.enqueue_screen(&s, &HashSet::new(), PriorityMode::Standard, |_| false, |_| 0.0);
    assert_eq!(added, 2);

    let first = queue.pop().expect("tap first");
    assert_eq!(first.kind, TargetKind::TapElement, "Taps outrank scroll targets");
    assert_eq!(queue.pop().expect("then scroll").kind, TargetKind::ScrollContainer);
}
