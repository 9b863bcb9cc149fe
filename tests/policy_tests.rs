use app_explorer::model::identity::state_hash;
use app_explorer::policy::action_key::{ActionKey, normalize_resource};
use app_explorer::policy::qtable::{
    ALPHA, BETA, DEAD_END_VISITS, EPSILON_MIN, EPSILON_START, GAMMA, PolicyEntry, QLearningPolicy,
    SKIP_VISITS,
};
use app_explorer::policy::reward::{RewardEvent, reward_for};
use app_explorer::policy::store::{
    InMemoryPolicyStore, PolicyRecord, PolicyStore, PolicyWriter, load_policy_file,
};

mod common;
use common::{anonymous_clickable, clickable, screen};

// =========================================================================
// Q-learning update rule
// =========================================================================

#[test]
fn update_applies_learning_rule_from_neutral_zero() {
    let mut policy = QLearningPolicy::with_seed(7);
    let q = policy.update("s1", "tap|browse|middle", 1.0, 0.0);

    // Q ← 0 + α·(1.0 + γ·0 + β·0 − 0)
    assert!((q - ALPHA).abs() < 1e-9, "First update moves α toward the reward");
    assert_eq!(policy.entry("s1", "tap|browse|middle").visits, 1);
}

#[test]
fn update_bootstraps_from_next_state_value() {
    let mut policy = QLearningPolicy::with_seed(7);
    let q = policy.update("s1", "a", 0.5, 2.0);

    let expected = ALPHA * (0.5 + GAMMA * 2.0);
    assert!((q - expected).abs() < 1e-9, "γ·max of the landing state feeds the target");
}

#[test]
fn feedback_is_clamped_and_consumed_once() {
    let mut policy = QLearningPolicy::with_seed(7);
    for _ in 0..10 {
        policy.record_feedback("s1", "a", 1.0);
    }
    assert_eq!(policy.entry("s1", "a").feedback, 3.0, "Accumulation clamps at +3");

    let q1 = policy.update("s1", "a", 0.0, 0.0);
    let expected = ALPHA * BETA * 3.0;
    assert!((q1 - expected).abs() < 1e-9, "Feedback enters through the β term");
    assert_eq!(policy.entry("s1", "a").feedback, 0.0, "Consumed by the update");

    let q2 = policy.update("s1", "a", 0.0, 0.0);
    assert!(q2 < q1, "Second update decays toward zero without feedback");
}

#[test]
fn negative_feedback_clamps_at_minus_three() {
    let mut policy = QLearningPolicy::with_seed(7);
    policy.record_feedback("s1", "a", -5.0);
    assert_eq!(policy.entry("s1", "a").feedback, -3.0);
}

// =========================================================================
// Exploration rate and selection
// =========================================================================

#[test]
fn epsilon_decays_with_actions_but_never_below_floor() {
    let mut policy = QLearningPolicy::with_seed(7);
    assert!((policy.epsilon() - EPSILON_START).abs() < 1e-9);

    for _ in 0..10_000 {
        policy.note_action_taken();
    }
    assert!((policy.epsilon() - EPSILON_MIN).abs() < 1e-9, "Floor holds after heavy decay");
}

#[test]
fn select_filters_dangerous_and_skip_listed_candidates() {
    let mut policy = QLearningPolicy::with_seed(7);
    policy.mark_dangerous("bad");
    for _ in 0..SKIP_VISITS {
        policy.update("s1", "worn", -1.0, 0.0);
    }

    let candidates = vec!["bad".to_string(), "worn".to_string(), "ok".to_string()];
    for _ in 0..50 {
        let pick = policy.select("s1", &candidates).expect("one candidate survives");
        assert_eq!(pick, 2, "Only the safe candidate is ever selected");
    }
}

#[test]
fn select_returns_none_when_everything_is_excluded() {
    let mut policy = QLearningPolicy::with_seed(7);
    policy.mark_dangerous("a");
    policy.mark_dangerous("b");
    assert_eq!(policy.select("s1", &["a".to_string(), "b".to_string()]), None);
}

#[test]
fn greedy_selection_prefers_higher_q_on_equal_visits() {
    let mut policy = QLearningPolicy::with_seed(7);
    for _ in 0..20 {
        policy.update("s1", "good", 1.0, 0.0);
        policy.update("s1", "bad", -0.5, 0.0);
    }
    // Push ε to the floor so greedy picks dominate
    for _ in 0..2000 {
        policy.note_action_taken();
    }

    let candidates = vec!["bad".to_string(), "good".to_string()];
    let mut good_picks = 0;
    for _ in 0..100 {
        if policy.select("s1", &candidates) == Some(1) {
            good_picks += 1;
        }
    }
    assert!(good_picks >= 90, "Greedy picks dominate at ε floor, got {}", good_picks);
}

// =========================================================================
// Dead ends
// =========================================================================

#[test]
fn repeated_negative_outcomes_confirm_a_dead_end() {
    let mut policy = QLearningPolicy::with_seed(7);
    assert!(!policy.is_confirmed_dead_end("s1", "a"));

    for _ in 0..DEAD_END_VISITS {
        policy.update("s1", "a", -0.5, 0.0);
    }
    assert!(policy.is_confirmed_dead_end("s1", "a"));
    assert!(policy.learned_boost("s1", "a") < -100.0, "Dead end overrides heuristics");
}

#[test]
fn one_bad_visit_is_not_a_dead_end() {
    let mut policy = QLearningPolicy::with_seed(7);
    policy.update("s1", "a", -2.0, 0.0);
    assert!(!policy.is_confirmed_dead_end("s1", "a"), "Needs repeated confirmation");
}

// =========================================================================
// Reward schedule
// =========================================================================

#[test]
fn new_screen_reward_includes_depth_and_novelty() {
    let base = reward_for(RewardEvent::ScreenReached { depth: 0, prior_visits: 0 });
    assert!((base - 1.2).abs() < 1e-9, "1.0 + novelty 0.2");

    let deep = reward_for(RewardEvent::ScreenReached { depth: 3, prior_visits: 0 });
    assert!((deep - 1.5).abs() < 1e-9, "0.1 per hop on top");

    let capped = reward_for(RewardEvent::ScreenReached { depth: 20, prior_visits: 0 });
    assert!((capped - 1.8).abs() < 1e-9, "Depth bonus caps at 0.6");
}

#[test]
fn worn_revisits_go_negative() {
    let first_revisit = reward_for(RewardEvent::ScreenReached { depth: 0, prior_visits: 1 });
    assert!(first_revisit > 0.0, "A first revisit is still mildly positive");

    let worn = reward_for(RewardEvent::ScreenReached { depth: 0, prior_visits: 9 });
    assert!(worn < 0.0, "Heavy revisiting is penalized, got {}", worn);
}

#[test]
fn failure_rewards_are_ordered_by_severity() {
    let no_effect = reward_for(RewardEvent::NoEffect);
    let closed = reward_for(RewardEvent::AppClosed);
    let crashed = reward_for(RewardEvent::AppCrashed);
    assert!(no_effect > closed && closed > crashed);
    assert!(reward_for(RewardEvent::RevealedNewElements) > reward_for(RewardEvent::BackNavigation));
}

// =========================================================================
// Action generalization
// =========================================================================

#[test]
fn action_keys_generalize_across_screens() {
    let home = screen("HomeActivity");
    let settings = screen("SettingsActivity");
    let a = clickable("Item", "com.example.demo:id/item_42", 900);
    let b = clickable("Item", "com.example.demo:id/item_7", 900);

    assert_eq!(
        ActionKey::tap(&a, &home).encode(),
        ActionKey::tap(&b, &settings).encode(),
        "Digit runs collapse so structurally similar widgets share a key"
    );
    assert_eq!(ActionKey::tap(&a, &home).encode(), "tap|item_#|middle");
}

#[test]
fn anonymous_elements_fall_back_to_class_name() {
    let home = screen("HomeActivity");
    let el = anonymous_clickable(900);
    assert_eq!(ActionKey::tap(&el, &home).encode(), "tap|view|middle");
}

#[test]
fn normalize_strips_package_prefix_and_lowercases() {
    assert_eq!(normalize_resource(Some("com.app:id/Nav_Home"), "x"), "nav_home");
    assert_eq!(normalize_resource(None, "android.widget.Button"), "button");
}

// =========================================================================
// State hashing
// =========================================================================

#[test]
fn state_hash_ignores_element_order() {
    let h1 = state_hash("screen", &["a", "b", "c"]);
    let h2 = state_hash("screen", &["c", "a", "b"]);
    assert_eq!(h1, h2);
    assert_ne!(h1, state_hash("screen", &["a", "b"]));
}

// =========================================================================
// Persistence
// =========================================================================

#[test]
fn policy_file_round_trip_is_last_wins() {
    let dir = std::env::temp_dir().join("app-explorer-policy-test");
    std::fs::create_dir_all(&dir).expect("temp dir");
    let path = dir.join("policy.jsonl");
    let _ = std::fs::remove_file(&path);

    {
        let writer = PolicyWriter::spawn(&path);
        writer.record(PolicyRecord::Entry { key: "s|a".into(), q: 0.1, visits: 1 });
        writer.record(PolicyRecord::Entry { key: "s|a".into(), q: 0.4, visits: 3 });
        writer.record(PolicyRecord::Dangerous { pattern: "tap|logout|top".into() });
        writer.record(PolicyRecord::BestStrategy {
            package: "com.example.demo".into(),
            strategy: "depth_first".into(),
        });
        writer.shutdown();
    }

    let store = load_policy_file(&path);
    let entry = store.get("s|a").expect("entry persisted");
    assert_eq!(entry.visits, 3, "Later record wins");
    assert!((entry.q - 0.4).abs() < 1e-9);
    assert_eq!(store.dangerous_patterns(), vec!["tap|logout|top".to_string()]);
    assert_eq!(
        store.best_strategy("com.example.demo").as_deref(),
        Some("depth_first")
    );

    let _ = std::fs::remove_file(&path);
}

#[test]
fn in_memory_store_defaults_missing_keys() {
    let mut store = InMemoryPolicyStore::new();
    assert_eq!(store.get("missing"), None);
    assert_eq!(store.get_or_default("missing"), PolicyEntry::default());

    store.increment_visits("k");
    store.increment_visits("k");
    assert_eq!(store.get("k").expect("created on first increment").visits, 2);
}
