use std::collections::HashSet;
use std::sync::Arc;

use crate::coverage;
use crate::device::actuator::Actuator;
use crate::device::clock::Clock;
use crate::device::provider::{self, ScreenProvider};
use crate::device::status::{Progress, StatusSink};
use crate::frontier::priority::{PriorityMode, is_destructive};
use crate::frontier::queue::{ExplorationTarget, TargetKind};
use crate::lifecycle::machine::{LifecycleEvent, LifecycleMachine, LifecycleState};
use crate::model::identity::composite_key;
use crate::model::screen_model::{ActionOutcomeTag, Element, Screen, ScrollDirection};
use crate::orchestrator::config::{ExplorationConfig, Goal};
use crate::orchestrator::outcome::{ObservedOutcome, classify};
use crate::orchestrator::report::{ExplorationReport, TerminationReason};
use crate::orchestrator::session::ControlFlags;
use crate::orchestrator::state::{ExplorationState, IssueKind};
use crate::orchestrator::strategy::{self, AdaptiveState, Strategy};
use crate::policy::action_key::{ActionKey, ActionKind, screen_state_key};
use crate::policy::qtable::{PolicyEntry, QLearningPolicy};
use crate::policy::reward::{RewardEvent, reward_for};
use crate::policy::store::{PolicyRecord, PolicyStore, PolicyWriter};
use crate::recovery::ladder::{RecoveryContext, RecoveryLadder, RecoveryLevel};
use crate::recovery::stuck::{Staleness, StalenessTracker};
use crate::trace::logger::TraceLogger;
use crate::trace::trace::TraceEvent;

/// Consecutive relaunches (without an intervening discovery) before the
/// run is declared fatal.
pub const MAX_CONSECUTIVE_RELAUNCHES: u32 = 3;

/// Verification rounds tried on queue exhaustion before completing.
const MAX_VERIFICATION_ROUNDS: u32 = 2;

/// Back hops tried when routing to a screen with no recorded forward path.
const MAX_BACK_HOPS: u32 = 4;

// ============================================================================
// Orchestrator
// ============================================================================

/// The main control loop: one decision-act-observe iteration at a time,
/// composing the queue, graph, policy, state machine, and recovery ladder.
/// Owns the run-scoped `ExplorationState`; no other writer exists.
pub struct Orchestrator {
    package: String,
    config: ExplorationConfig,

    state: ExplorationState,
    machine: LifecycleMachine,
    policy: QLearningPolicy,
    ladder: RecoveryLadder,
    staleness: StalenessTracker,
    adaptive: AdaptiveState,

    provider: Box<dyn ScreenProvider>,
    actuator: Box<dyn Actuator>,
    status: Box<dyn StatusSink>,
    clock: Box<dyn Clock>,
    flags: Arc<ControlFlags>,

    tracer: TraceLogger,
    writer: Option<PolicyWriter>,

    iteration: u64,
    consecutive_relaunches: u32,
    verification_rounds: u32,
    run_error: Option<String>,
}

impl Orchestrator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        package: impl Into<String>,
        config: ExplorationConfig,
        provider: Box<dyn ScreenProvider>,
        actuator: Box<dyn Actuator>,
        status: Box<dyn StatusSink>,
        clock: Box<dyn Clock>,
        flags: Arc<ControlFlags>,
    ) -> Self {
        let now = clock.now_ms();
        Self {
            package: package.into(),
            config,
            state: ExplorationState::new(),
            machine: LifecycleMachine::new(),
            policy: QLearningPolicy::new(),
            ladder: RecoveryLadder::new(),
            staleness: StalenessTracker::new(now),
            adaptive: AdaptiveState::new(),
            provider,
            actuator,
            status,
            clock,
            flags,
            tracer: TraceLogger::disabled(),
            writer: None,
            iteration: 0,
            consecutive_relaunches: 0,
            verification_rounds: 0,
            run_error: None,
        }
    }

    pub fn set_tracer(&mut self, tracer: TraceLogger) {
        self.tracer = tracer;
    }

    pub fn set_policy_writer(&mut self, writer: PolicyWriter) {
        self.writer = Some(writer);
    }

    /// Preload learned values from the persistence collaborator. The
    /// in-memory table stays authoritative for the run.
    pub fn seed_from_store(&mut self, store: &dyn PolicyStore) {
        for pattern in store.dangerous_patterns() {
            self.policy.mark_dangerous(&pattern);
            self.state.dangerous.insert(pattern);
        }
        if let Some(best) = store.best_strategy(&self.package) {
            if let Some(s) = Strategy::parse(&best) {
                self.adaptive = AdaptiveState::starting_from(s);
            }
        }
    }

    pub fn seed_policy_entry(&mut self, key: &str, entry: PolicyEntry) {
        self.policy.seed_entry(key, entry);
    }

    pub fn state(&self) -> &ExplorationState {
        &self.state
    }

    pub fn lifecycle(&self) -> LifecycleState {
        self.machine.state()
    }

    pub fn policy(&self) -> &QLearningPolicy {
        &self.policy
    }

    /// One-shot human feedback for an element on a known screen:
    /// +1 imitation, −1 veto. Applied by the next policy update.
    pub fn record_feedback(&mut self, screen_id: &str, element_id: &str, signal: f64) {
        let Some(screen) = self.state.screens.get(screen_id) else {
            return;
        };
        let Some(element) = screen.find_element(element_id) else {
            return;
        };
        let action = ActionKey::tap(element, screen).encode();
        let s = screen_state_key(screen);
        self.policy.record_feedback(&s, &action, signal);
    }

    // ------------------------------------------------------------------------
    // Run control
    // ------------------------------------------------------------------------

    /// Run until a termination condition. Returns the report whatever the
    /// cause; partial results are always preserved.
    pub fn run(&mut self) -> ExplorationReport {
        let started = self.clock.now_ms();
        self.step_machine(LifecycleEvent::StartRequested);

        if let Err(e) = self.initialize() {
            self.run_error = Some(e);
            self.step_machine(LifecycleEvent::StopRequested);
            self.step_machine(LifecycleEvent::CompletionVerified);
            return self.build_report(TerminationReason::RunFatal, started);
        }
        self.step_machine(LifecycleEvent::InitializationComplete);

        let termination = self.explore_loop(started);

        if !self.machine.is_terminal() {
            self.step_machine(LifecycleEvent::StopRequested);
            self.step_machine(LifecycleEvent::CompletionVerified);
        }
        self.persist_policy();
        self.build_report(termination, started)
    }

    /// Prepare another sweep: same learned state, fresh pass ledger and
    /// frontier. The next `run` starts from the app's home screen.
    pub fn start_another_pass(&mut self) {
        self.state.start_new_pass();
        self.machine = LifecycleMachine::new();
        self.verification_rounds = 0;
        self.staleness.reset(self.clock.now_ms());
    }

    // ------------------------------------------------------------------------
    // Initialization
    // ------------------------------------------------------------------------

    fn initialize(&mut self) -> Result<(), String> {
        self.actuator
            .launch_app(&self.package, false)
            .map_err(|e| format!("launch failed: {}", e))?;
        self.clock.sleep_ms(self.config.transition_wait_ms);

        let home = match self.capture_stable() {
            Ok(home) => home,
            Err(e) => {
                let now = self.clock.now_ms();
                self.state.record_issue(
                    IssueKind::ProviderFailure,
                    None,
                    format!("initial capture failed: {}", e),
                    now,
                );
                return Err(format!("initial capture failed: {}", e));
            }
        };
        if home.package != self.package {
            return Err(format!(
                "launched '{}' but foreground is '{}'",
                self.package, home.package
            ));
        }

        let (home_id, _, _) = self.state.observe(home);
        self.state.graph.set_home(&home_id);
        self.state.home_screen_id = Some(home_id.clone());
        self.state.current_screen_id = Some(home_id.clone());
        self.enqueue_screen_targets(&home_id);
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Main loop
    // ------------------------------------------------------------------------

    fn explore_loop(&mut self, started: u64) -> TerminationReason {
        loop {
            self.iteration += 1;

            // (a) cancellation and legal state
            if self.flags.stop_requested() {
                return TerminationReason::Stopped;
            }
            if self.flags.pause_requested() {
                self.step_machine(LifecycleEvent::PauseRequested);
                while self.flags.pause_requested() && !self.flags.stop_requested() {
                    self.clock.sleep_ms(100);
                }
                if self.flags.stop_requested() {
                    return TerminationReason::Stopped;
                }
                self.step_machine(LifecycleEvent::ResumeRequested);
            }
            if self.machine.is_terminal() {
                return TerminationReason::Stopped;
            }

            // (b) termination conditions
            if let Some(reason) = self.check_termination(started) {
                return reason;
            }

            // (g) stagnation
            match self.staleness.level(self.clock.now_ms()) {
                Staleness::Fresh => {}
                level => {
                    if let Some(fatal) = self.run_recovery(level) {
                        return fatal;
                    }
                    continue;
                }
            }

            // (c) strategy-based selection, with the policy choosing among
            // same-screen candidates
            let active = self.active_strategy();
            let Some(target) =
                strategy::select_target_with_policy(active, &mut self.state, &mut self.policy)
            else {
                // (h) queue exhausted: verification before completion
                if self.verification_pass() {
                    continue;
                }
                return TerminationReason::FrontierExhausted;
            };

            // Stale targets are silently discarded, no retry
            if self.is_stale(&target) {
                self.trace_suppressed(&target, "stale");
                continue;
            }
            if self.state.tapped_this_pass.contains(&target.key()) {
                self.trace_suppressed(&target, "tapped this pass");
                continue;
            }

            // (d) reachability
            let current = self.state.current_screen_id.clone().unwrap_or_default();
            if target.kind != TargetKind::NavigateToScreen && target.screen_id != current {
                if !self.route_to(&target.screen_id) {
                    self.discard_or_requeue(target, IssueKind::BranchUnreachable);
                    continue;
                }
            }

            // (e) delegate to the actuator, (f) observe and update
            self.execute_and_apply(target);

            self.clock.sleep_ms(self.config.action_delay_ms);
        }
    }

    fn active_strategy(&self) -> Strategy {
        if self.config.strategy == Strategy::Adaptive {
            self.adaptive.current()
        } else {
            self.config.strategy
        }
    }

    fn check_termination(&mut self, started: u64) -> Option<TerminationReason> {
        let elapsed = self.clock.now_ms().saturating_sub(started);
        if elapsed >= self.config.max_duration_ms {
            return Some(TerminationReason::TimeCapReached);
        }
        match self.config.goal {
            Goal::QuickScan => {
                if self.state.actions_taken >= self.config.max_elements as u64 {
                    return Some(TerminationReason::BudgetExhausted);
                }
            }
            Goal::DeepMap => {
                if self.state.screens.len() >= self.config.max_screens {
                    return Some(TerminationReason::MapBudgetReached);
                }
            }
            Goal::CoverageTarget => {
                let metrics = coverage::metrics::compute(&self.state);
                if self.config.stop_at_target_coverage
                    && metrics.element_coverage_pct() >= self.config.target_coverage_pct
                {
                    return Some(TerminationReason::CoverageReached);
                }
            }
        }
        None
    }

    // ------------------------------------------------------------------------
    // Target execution
    // ------------------------------------------------------------------------

    fn is_stale(&self, target: &ExplorationTarget) -> bool {
        match target.kind {
            TargetKind::NavigateToScreen => !self.state.screens.contains_key(&target.screen_id),
            _ => {
                let Some(screen) = self.state.screens.get(&target.screen_id) else {
                    return true;
                };
                screen.find_element(&target.element_id).is_none()
            }
        }
    }

    fn discard_or_requeue(&mut self, target: ExplorationTarget, kind: IssueKind) {
        let screen_id = target.screen_id.clone();
        let key = target.key();
        if !self.state.queue.requeue_decayed(target) {
            let now = self.clock.now_ms();
            let detail = match kind {
                IssueKind::RetryExceeded => {
                    format!("target {} retried past its attempt cap", key)
                }
                _ => format!("target {} unreachable after retry cap", key),
            };
            self.state.record_issue(kind, Some(&screen_id), detail, now);
        }
    }

    fn execute_and_apply(&mut self, target: ExplorationTarget) {
        let before_id = self.state.current_screen_id.clone().unwrap_or_default();

        // Snapshot what we need from the triggering element before any
        // mutation of the aggregate
        let context = self.state.screens.get(&before_id).and_then(|screen| {
            let el = screen.find_element(&target.element_id)?;
            Some((
                screen_state_key(screen),
                ActionKey::tap(el, screen).encode(),
                el.clone(),
            ))
        });

        let delivered = match target.kind {
            TargetKind::TapElement => self.deliver_tap(&target),
            TargetKind::ScrollContainer => self.deliver_scroll(&target),
            TargetKind::NavigateToScreen => {
                // Navigation work: just get there, observation follows
                self.route_to(&target.screen_id)
            }
        };

        self.step_machine(LifecycleEvent::ElementTapped);
        self.state.actions_taken += 1;
        self.policy.note_action_taken();

        if !delivered {
            // Transient actuator failure: decay and retry later. The ledgers
            // stay untouched; only a delivered gesture counts as visited.
            let kind = match target.kind {
                TargetKind::NavigateToScreen => IssueKind::BranchUnreachable,
                _ => IssueKind::RetryExceeded,
            };
            self.discard_or_requeue(target, kind);
            return;
        }

        if target.kind != TargetKind::NavigateToScreen {
            self.state
                .mark_visited(&target.screen_id, &target.element_id, target.key());
        }

        self.clock.sleep_ms(match target.kind {
            TargetKind::ScrollContainer => self.config.scroll_delay_ms,
            _ => self.config.transition_wait_ms,
        });

        // Re-observe; a persistent capture failure after an action reads as
        // a crash
        let capture = match self.capture_stable() {
            Ok(c) => c,
            Err(e) => {
                self.handle_crash(&before_id, context, &e.to_string());
                return;
            }
        };

        let newly_discovered = !self.state.screens.contains_key(&capture.id);
        let outcome = if capture.package != self.package {
            ObservedOutcome::LeftApp
        } else {
            let (after_id, _, added) = self.state.observe(capture);
            match self.state.screens.get(&after_id) {
                Some(screen) => {
                    classify(&before_id, screen, &self.package, newly_discovered, added)
                }
                None => ObservedOutcome::NoEffect,
            }
        };

        self.apply_outcome(&before_id, &target, context, outcome);
    }

    fn deliver_tap(&mut self, target: &ExplorationTarget) -> bool {
        let Some(bounds) = target.bounds else {
            return false;
        };
        let (x, y) = bounds.center();
        self.actuator.tap(x, y).is_ok()
    }

    fn deliver_scroll(&mut self, target: &ExplorationTarget) -> bool {
        let Some(bounds) = target.bounds else {
            return false;
        };
        let (x, y) = bounds.center();
        self.actuator.scroll(x, y, ScrollDirection::Down).is_ok()
    }

    // ------------------------------------------------------------------------
    // Outcome application
    // ------------------------------------------------------------------------

    fn apply_outcome(
        &mut self,
        before_id: &str,
        target: &ExplorationTarget,
        context: Option<(String, String, Element)>,
        outcome: ObservedOutcome,
    ) {
        let now = self.clock.now_ms();
        let discovered = outcome.discovered();

        let reward_event = match &outcome {
            ObservedOutcome::NewScreen { to } => {
                if let Some((_, _, el)) = &context {
                    self.state.graph.record_transition(before_id, &el.id, to);
                }
                self.step_machine(LifecycleEvent::NewScreenDiscovered);
                self.tag_element(before_id, target, ActionOutcomeTag::Navigation);
                self.state.current_screen_id = Some(to.clone());
                if self.state.graph.depth_of(to) <= self.config.max_depth {
                    self.enqueue_screen_targets(to);
                }
                let depth = self.state.graph.depth_of(to);
                let event = RewardEvent::ScreenReached { depth, prior_visits: 0 };
                if self.config.backtrack_after_new_screen {
                    self.backtrack();
                }
                Some(event)
            }
            ObservedOutcome::KnownScreen { to } => {
                if let Some((_, _, el)) = &context {
                    self.state.graph.record_transition(before_id, &el.id, to);
                }
                self.tag_element(before_id, target, ActionOutcomeTag::Navigation);
                self.state.current_screen_id = Some(to.clone());
                self.enqueue_screen_targets(to);
                let depth = self.state.graph.depth_of(to);
                let prior = self
                    .state
                    .screens
                    .get(to)
                    .map(|s| s.visit_count.saturating_sub(1))
                    .unwrap_or(0);
                Some(RewardEvent::ScreenReached { depth, prior_visits: prior })
            }
            ObservedOutcome::RevealedElements { .. } => {
                self.step_machine(LifecycleEvent::NewScreenDiscovered);
                // Scrolling reveals content; a tap that adds elements on
                // the same screen opened an overlay
                let tag = match target.kind {
                    TargetKind::ScrollContainer => ActionOutcomeTag::RevealsContent,
                    _ => ActionOutcomeTag::TriggersDialog,
                };
                self.tag_element(before_id, target, tag);
                self.enqueue_screen_targets(before_id);
                Some(RewardEvent::RevealedNewElements)
            }
            ObservedOutcome::NoEffect => {
                self.step_machine(LifecycleEvent::NoProgressDetected);
                self.tag_element(before_id, target, ActionOutcomeTag::NoEffect);
                Some(RewardEvent::NoEffect)
            }
            ObservedOutcome::LeftApp => {
                self.tag_element(before_id, target, ActionOutcomeTag::ClosesApp);
                if let Some((_, action, _)) = &context {
                    self.policy.mark_dangerous(action);
                    if self.state.dangerous.insert(action.clone()) {
                        self.state.record_issue(
                            IssueKind::DangerousPattern,
                            Some(before_id),
                            format!("pattern {} closes the app", action),
                            now,
                        );
                    }
                    if let Some(w) = &self.writer {
                        w.record(PolicyRecord::Dangerous { pattern: action.clone() });
                    }
                }
                self.state.record_issue(
                    IssueKind::AppClosed,
                    Some(before_id),
                    format!("action on {} left the app", target.key()),
                    now,
                );
                self.relaunch_after_exit();
                Some(RewardEvent::AppClosed)
            }
            ObservedOutcome::BlockerScreen { to } => {
                if let Some((_, _, el)) = &context {
                    self.state.graph.record_transition(before_id, &el.id, to);
                }
                self.state.graph.mark_blocker(to);
                self.state.record_issue(
                    IssueKind::BlockerScreen,
                    Some(to),
                    "credential wall reached; backing out",
                    now,
                );
                self.state.current_screen_id = Some(to.clone());
                self.backtrack();
                Some(RewardEvent::NoEffect)
            }
        };

        // Policy update with the observed reward and the value of the best
        // follow-up action in the landing state
        let mut reward_applied = None;
        if let (Some(event), Some((state_key, action, _))) = (reward_event, &context) {
            let reward = reward_for(event);
            let next_max = self
                .state
                .current_screen_id
                .as_ref()
                .and_then(|id| self.state.screens.get(id))
                .map(|s| {
                    let actions: Vec<String> = s
                        .clickables
                        .iter()
                        .map(|e| ActionKey::tap(e, s).encode())
                        .collect();
                    self.policy.max_value(&screen_state_key(s), &actions)
                })
                .unwrap_or(0.0);
            let q = self.policy.update(state_key, action, reward, next_max);
            if let Some(w) = &self.writer {
                w.record(PolicyRecord::Entry {
                    key: QLearningPolicy::key(state_key, action),
                    q,
                    visits: self.policy.entry(state_key, action).visits,
                });
            }
            reward_applied = Some(reward);
        }

        // Staleness is tracked against the screen the action ran on
        self.staleness.record(before_id, discovered, now);
        if discovered {
            self.consecutive_relaunches = 0;
            self.verification_rounds = 0;
        }
        if self.config.strategy == Strategy::Adaptive {
            self.adaptive.record(discovered);
            self.adaptive.maybe_switch();
        }

        self.push_progress();
        let mut event = TraceEvent::now(self.iteration, self.machine.state(), self.active_strategy())
            .with_target(target.key())
            .with_outcome(format!("{:?}", outcome));
        if let Some(r) = reward_applied {
            event = event.with_reward(r);
        }
        self.tracer.log(&event);
    }

    fn tag_element(
        &mut self,
        screen_id: &str,
        target: &ExplorationTarget,
        tag: ActionOutcomeTag,
    ) {
        if let Some(screen) = self.state.screens.get_mut(screen_id) {
            if let Some(el) = screen.find_element_mut(&target.element_id) {
                el.outcome = tag;
            }
        }
    }

    fn handle_crash(
        &mut self,
        before_id: &str,
        context: Option<(String, String, Element)>,
        detail: &str,
    ) {
        let now = self.clock.now_ms();
        if let Some((state_key, action, _)) = &context {
            self.policy.mark_dangerous(action);
            if self.state.dangerous.insert(action.clone()) {
                self.state.record_issue(
                    IssueKind::DangerousPattern,
                    Some(before_id),
                    format!("pattern {} crashes the app", action),
                    now,
                );
            }
            self.policy
                .update(state_key, action, reward_for(RewardEvent::AppCrashed), 0.0);
            if let Some(w) = &self.writer {
                w.record(PolicyRecord::Dangerous { pattern: action.clone() });
            }
        }
        self.state.record_issue(
            IssueKind::AppCrashed,
            Some(before_id),
            format!("capture failed after action: {}", detail),
            now,
        );
        self.relaunch_after_exit();
        self.staleness.record(before_id, false, now);
    }

    /// Relaunch after the app was closed or crashed. Exceeding the
    /// consecutive limit flips the run to fatal via `run_error`.
    fn relaunch_after_exit(&mut self) {
        self.consecutive_relaunches += 1;
        if self.consecutive_relaunches > MAX_CONSECUTIVE_RELAUNCHES {
            self.run_error = Some("consecutive relaunch limit exceeded".into());
            self.flags.request_stop();
            return;
        }
        if self.actuator.launch_app(&self.package, true).is_err() {
            self.run_error = Some("relaunch failed".into());
            self.flags.request_stop();
            return;
        }
        self.clock.sleep_ms(self.config.transition_wait_ms);
        if let Ok(capture) = self.capture_stable() {
            let (id, _, _) = self.state.observe(capture);
            self.state.current_screen_id = Some(id);
        }
    }

    /// Structured back navigation after a discovery or a blocker. A back
    /// that lands on a known screen at or above the origin is rewarded so
    /// the policy learns that backing out of this state pays off.
    fn backtrack(&mut self) {
        let from = self.state.current_screen_id.clone();
        if self.actuator.press_back().is_err() {
            return;
        }
        self.clock.sleep_ms(self.config.transition_wait_ms);
        let Ok(capture) = self.capture_stable() else {
            return;
        };
        if capture.package != self.package {
            return;
        }
        let known = self.state.screens.contains_key(&capture.id);
        let (id, _, _) = self.state.observe(capture);
        self.state.current_screen_id = Some(id.clone());

        let Some(from) = from else {
            return;
        };
        if known
            && id != from
            && self.state.graph.depth_of(&id) <= self.state.graph.depth_of(&from)
        {
            if let Some(origin) = self.state.screens.get(&from) {
                let state_key = screen_state_key(origin);
                let action = ActionKey::system(ActionKind::Back).encode();
                let q = self.policy.update(
                    &state_key,
                    &action,
                    reward_for(RewardEvent::BackNavigation),
                    0.0,
                );
                if let Some(w) = &self.writer {
                    w.record(PolicyRecord::Entry {
                        key: QLearningPolicy::key(&state_key, &action),
                        q,
                        visits: self.policy.entry(&state_key, &action).visits,
                    });
                }
            }
        }
    }

    // ------------------------------------------------------------------------
    // Routing
    // ------------------------------------------------------------------------

    /// Walk a graph path to the target screen, re-observing after each
    /// step. Falls back to bottom-nav probing when no path is recorded.
    fn route_to(&mut self, screen_id: &str) -> bool {
        let Some(current) = self.state.current_screen_id.clone() else {
            return false;
        };
        if current == screen_id {
            return true;
        }

        if self.state.graph.find_optimal_path(&current, screen_id).is_some() {
            return self.walk_path(&current, screen_id);
        }

        // No forward path recorded. Back out toward home one hop at a time;
        // a path usually appears once we are above the target.
        let mut at = current;
        for _ in 0..MAX_BACK_HOPS {
            if self.state.graph.depth_of(&at) == 0 {
                break;
            }
            self.backtrack();
            let Some(now) = self.state.current_screen_id.clone() else {
                break;
            };
            if now == at {
                break;
            }
            if now == screen_id {
                return true;
            }
            if self.state.graph.find_optimal_path(&now, screen_id).is_some() {
                return self.walk_path(&now, screen_id);
            }
            at = now;
        }

        // Last resort: probe an unvisited bottom-nav entry, which may reveal
        // the edge the graph is missing
        self.probe_bottom_nav() && self.state.current_screen_id.as_deref() == Some(screen_id)
    }

    fn walk_path(&mut self, from: &str, to: &str) -> bool {
        let Some(path) = self.state.graph.find_optimal_path(from, to) else {
            return false;
        };
        for step in path {
            if self.flags.stop_requested() {
                return false;
            }
            if !self.tap_known_element(&step.screen_id, &step.element_id) {
                return false;
            }
        }
        self.state.current_screen_id.as_deref() == Some(to)
    }

    fn tap_known_element(&mut self, screen_id: &str, element_id: &str) -> bool {
        if self.state.current_screen_id.as_deref() != Some(screen_id) {
            return false;
        }
        let Some(bounds) = self
            .state
            .screens
            .get(screen_id)
            .and_then(|s| s.find_element(element_id))
            .map(|e| e.bounds)
        else {
            return false;
        };
        let (x, y) = bounds.center();
        if self.actuator.tap(x, y).is_err() {
            return false;
        }
        self.clock.sleep_ms(self.config.transition_wait_ms);
        match self.capture_stable() {
            Ok(capture) if capture.package == self.package => {
                let (id, _, _) = self.state.observe(capture);
                self.state.current_screen_id = Some(id);
                true
            }
            _ => false,
        }
    }

    fn probe_bottom_nav(&mut self) -> bool {
        let Some(current) = self.state.current_screen_id.clone() else {
            return false;
        };
        let entry = self.state.screens.get(&current).and_then(|screen| {
            screen
                .clickables
                .iter()
                .find(|e| crate::frontier::priority::is_bottom_nav(e, screen))
                .map(|e| e.id.clone())
        });
        match entry {
            Some(element_id) => self.tap_known_element(&current, &element_id),
            None => false,
        }
    }

    // ------------------------------------------------------------------------
    // Recovery
    // ------------------------------------------------------------------------

    fn run_recovery(&mut self, level: Staleness) -> Option<TerminationReason> {
        self.step_machine(LifecycleEvent::StuckThresholdReached);

        let current_id = self.state.current_screen_id.clone().unwrap_or_default();
        let Some(current) = self.state.screens.get(&current_id).cloned() else {
            self.step_machine(LifecycleEvent::RecoveryFailed);
            self.staleness.reset(self.clock.now_ms());
            return None;
        };

        let start = match level {
            Staleness::RestartNeeded => RecoveryLevel::RestartApp,
            _ => RecoveryLevel::ScrollContent,
        };

        let result = {
            let mut ctx = RecoveryContext {
                provider: self.provider.as_mut(),
                actuator: self.actuator.as_mut(),
                clock: self.clock.as_ref(),
                current: &current,
                package: &self.package,
                visited: &self.state.visited,
                transition_wait_ms: self.config.transition_wait_ms,
                scroll_delay_ms: self.config.scroll_delay_ms,
                intervention_wait_ms: self.config.intervention_wait_ms,
            };
            self.ladder.run(&mut ctx, start)
        };

        let now = self.clock.now_ms();

        // The policy learns whether each recovery rung helps
        for attempt in &result.attempts {
            let action = match attempt.level {
                RecoveryLevel::ScrollContent => ActionKey::system(ActionKind::Scroll),
                RecoveryLevel::BackNavigate => ActionKey::system(ActionKind::Back),
                RecoveryLevel::TapNavigationEntry => ActionKey::system(ActionKind::Tap),
                RecoveryLevel::RestartApp => ActionKey::system(ActionKind::Launch),
                // Human intervention is nothing the policy can influence
                RecoveryLevel::RequestIntervention => continue,
            };
            let reward = if attempt.success { 0.3 } else { -0.2 };
            self.policy.update("recovery", &action.encode(), reward, 0.0);
        }

        if result.relaunch_limit_exceeded {
            self.state.record_issue(
                IssueKind::RecoveryExhausted,
                Some(&current_id),
                "relaunch limit exceeded during recovery",
                now,
            );
            self.run_error = Some("relaunch limit exceeded during recovery".into());
            return Some(TerminationReason::RunFatal);
        }

        if result.recovered() {
            self.step_machine(LifecycleEvent::RecoverySucceeded);
            if let Ok(capture) = self.capture_stable() {
                if capture.package == self.package {
                    let (id, _, _) = self.state.observe(capture);
                    self.enqueue_screen_targets(&id);
                    self.state.current_screen_id = Some(id);
                }
            }
        } else {
            // Ladder exhausted: the branch is unreachable, not the run
            self.step_machine(LifecycleEvent::RecoveryFailed);
            let removed = self.state.queue.remove_screen(&current_id);
            self.state.record_issue(
                IssueKind::RecoveryExhausted,
                Some(&current_id),
                format!("recovery exhausted; dropped {} queued targets", removed),
                now,
            );
        }

        self.staleness.reset(now);
        None
    }

    // ------------------------------------------------------------------------
    // Verification pass
    // ------------------------------------------------------------------------

    /// On queue exhaustion: re-scan the current screen, queue graph-known
    /// unexplored screens, and finally backtrack to home for one more look.
    /// Returns whether new work appeared.
    fn verification_pass(&mut self) -> bool {
        if self.verification_rounds >= MAX_VERIFICATION_ROUNDS {
            return false;
        }
        self.verification_rounds += 1;

        // 1. Re-scan where we are
        if let Ok(capture) = self.capture_stable() {
            if capture.package == self.package {
                let (id, _, _) = self.state.observe(capture);
                self.state.current_screen_id = Some(id.clone());
                self.enqueue_screen_targets(&id);
            }
        }
        if !self.state.queue.is_empty() {
            return true;
        }

        // 2. Screens the graph knows about but we never explored from
        for screen_id in self.state.graph.unexplored_destinations() {
            self.state
                .queue
                .push(ExplorationTarget::navigate(&screen_id, 80));
        }
        // Known screens that still hold unexplored clickables
        let pending: Vec<String> = self
            .state
            .screens
            .values()
            .filter(|s| s.clickables.iter().any(|e| !e.explored))
            .map(|s| s.id.clone())
            .collect();
        for screen_id in pending {
            if Some(&screen_id) != self.state.current_screen_id.as_ref() {
                self.state
                    .queue
                    .push(ExplorationTarget::navigate(&screen_id, 60));
            } else {
                self.enqueue_screen_targets(&screen_id);
            }
        }
        if !self.state.queue.is_empty() {
            return true;
        }

        // 3. Graph-guided backtrack to home, then one last scan
        if let Some(home) = self.state.home_screen_id.clone() {
            if self.route_to(&home) {
                self.enqueue_screen_targets(&home);
            }
        }
        !self.state.queue.is_empty()
    }

    // ------------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------------

    fn capture_stable(&mut self) -> Result<Screen, crate::device::error::DeviceError> {
        // Confirm the provider responds at all, then wait for the UI to
        // settle on one screen
        provider::capture_with_retry(
            self.provider.as_mut(),
            self.clock.as_ref(),
            self.config.capture_retries,
            self.config.capture_backoff_ms,
        )?;
        provider::poll_until_stable(
            self.provider.as_mut(),
            self.clock.as_ref(),
            self.config.transition_wait_ms / 4,
            self.config.transition_wait_ms,
        )
    }

    /// Queue manager entry point: turn a screen into candidate targets,
    /// applying the exclusion rules.
    fn enqueue_screen_targets(&mut self, screen_id: &str) {
        let mode = match self.config.strategy {
            Strategy::Adaptive => PriorityMode::Adaptive,
            _ => PriorityMode::Standard,
        };
        let non_destructive = self.config.non_destructive;

        let ExplorationState { queue, screens, visited, tapped_this_pass, dangerous, .. } =
            &mut self.state;
        let Some(screen) = screens.get(screen_id) else {
            return;
        };

        // Per-pass exclusion: an element tapped this pass never re-queues,
        // even when the run-level flag was cleared by a re-observation
        let ledger: &HashSet<String> = tapped_this_pass;
        let policy = &self.policy;
        let s_key = screen_state_key(screen);

        queue.enqueue_screen(
            screen,
            visited,
            mode,
            |el| {
                let action = ActionKey::tap(el, screen).encode();
                dangerous.contains(&action)
                    || policy.is_dangerous(&action)
                    || policy.should_skip(&s_key, &action)
                    || ledger.contains(&composite_key(&screen.id, &el.id))
                    || (non_destructive && is_destructive(el))
            },
            |el| {
                let action = ActionKey::tap(el, screen).encode();
                policy.learned_boost(&s_key, &action)
            },
        );
    }

    fn trace_suppressed(&mut self, target: &ExplorationTarget, reason: &str) {
        let event = TraceEvent::now(self.iteration, self.machine.state(), self.active_strategy())
            .with_target(target.key())
            .with_suppression(reason);
        self.tracer.log(&event);
    }

    fn push_progress(&mut self) {
        let metrics = coverage::metrics::compute(&self.state);
        self.status.on_progress(Progress {
            screens_explored: metrics.screens_fully_explored,
            elements_explored: metrics.elements_visited,
            frontier_size: self.state.queue.len(),
            state: self.machine.state(),
        });
    }

    fn step_machine(&mut self, event: LifecycleEvent) {
        let old = self.machine.state();
        let new = self.machine.handle(event);
        self.status.on_transition(old, new, &event);
    }

    fn build_report(&mut self, termination: TerminationReason, started: u64) -> ExplorationReport {
        let termination = if self.run_error.is_some() {
            TerminationReason::RunFatal
        } else {
            termination
        };
        let mut screens: Vec<String> = self.state.screens.keys().cloned().collect();
        screens.sort();
        ExplorationReport {
            package: self.package.clone(),
            termination,
            passes: self.state.pass,
            actions_taken: self.state.actions_taken,
            duration_ms: self.clock.now_ms().saturating_sub(started),
            coverage: coverage::metrics::compute(&self.state),
            screens_discovered: screens,
            issues: self.state.issues.clone(),
            best_strategy: if self.config.strategy == Strategy::Adaptive {
                Some(self.adaptive.best_strategy())
            } else {
                None
            },
            error: self.run_error.clone(),
        }
    }

    fn persist_policy(&mut self) {
        let Some(writer) = &self.writer else {
            return;
        };
        for (key, entry) in self.policy.entries() {
            writer.record(PolicyRecord::Entry {
                key: key.clone(),
                q: entry.q,
                visits: entry.visits,
            });
        }
        if self.config.strategy == Strategy::Adaptive {
            writer.record(PolicyRecord::BestStrategy {
                package: self.package.clone(),
                strategy: self.adaptive.best_strategy().as_str().to_string(),
            });
        }
    }
}
