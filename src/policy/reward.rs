// ============================================================================
// Reward schedule
// ============================================================================

pub const REWARD_NEW_SCREEN: f64 = 1.0;
pub const REWARD_SCROLL_REVEALED: f64 = 0.5;
pub const REWARD_BACK_NAVIGATION: f64 = 0.2;
pub const REWARD_NO_EFFECT: f64 = -0.1;
pub const REWARD_APP_CLOSED: f64 = -1.5;
pub const REWARD_APP_CRASHED: f64 = -2.0;

pub const DEPTH_BONUS_PER_HOP: f64 = 0.1;
pub const DEPTH_BONUS_CAP: f64 = 0.6;
pub const NOVELTY_BONUS: f64 = 0.2;
pub const REVISIT_PENALTY_PER_VISIT: f64 = 0.15;
pub const REVISIT_PENALTY_CAP: f64 = 1.5;

/// Classified consequence of one action, as far as the policy cares.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RewardEvent {
    /// Landed on a screen. `depth` is its distance from home;
    /// `prior_visits` is how often that screen had been visited before
    /// this action (0 = genuinely new).
    ScreenReached { depth: u32, prior_visits: u32 },

    /// A scroll revealed elements not seen before on this screen
    RevealedNewElements,

    /// Back navigation that landed where the graph predicted
    BackNavigation,

    NoEffect,

    AppClosed,

    AppCrashed,
}

/// Map an outcome to its scalar reward.
pub fn reward_for(event: RewardEvent) -> f64 {
    match event {
        RewardEvent::ScreenReached { depth, prior_visits } => {
            let depth_bonus = (depth as f64 * DEPTH_BONUS_PER_HOP).min(DEPTH_BONUS_CAP);
            let novelty = if prior_visits == 0 { NOVELTY_BONUS } else { 0.0 };
            let revisit_penalty =
                (prior_visits as f64 * REVISIT_PENALTY_PER_VISIT).min(REVISIT_PENALTY_CAP);
            REWARD_NEW_SCREEN + depth_bonus + novelty - revisit_penalty
        }
        RewardEvent::RevealedNewElements => REWARD_SCROLL_REVEALED,
        RewardEvent::BackNavigation => REWARD_BACK_NAVIGATION,
        RewardEvent::NoEffect => REWARD_NO_EFFECT,
        RewardEvent::AppClosed => REWARD_APP_CLOSED,
        RewardEvent::AppCrashed => REWARD_APP_CRASHED,
    }
}
