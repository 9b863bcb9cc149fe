use crate::model::screen_model::{Element, ElementKind, Screen, VerticalZone};
use crate::policy::qtable::DEAD_END_BOOST;

// ============================================================================
// Tuning
// ============================================================================

pub const BASE_SCORE: i32 = 100;

pub const TEXT_BONUS: i32 = 40;
pub const RESOURCE_ID_BONUS: i32 = 30;
pub const ANONYMOUS_PENALTY: i32 = -20;

pub const CONTENT_REGION_BONUS: i32 = 25;
pub const TOP_EDGE_PENALTY: i32 = -10;

pub const META_PAGE_PENALTY: i32 = -60;

pub const BOTTOM_NAV_UNVISITED_BONUS: i32 = 150;
pub const BOTTOM_NAV_VISITED_BONUS: i32 = 15;
pub const BOTTOM_NAV_UNVISITED_ADAPTIVE: i32 = 40;
pub const BOTTOM_NAV_VISITED_ADAPTIVE: i32 = 5;

/// Score for confirmed dead ends; below anything a heuristic can produce.
pub const DEAD_END_SCORE: i32 = -10_000;

/// How many priority points one unit of learned Q is worth.
pub const LEARNED_BOOST_SCALE: f64 = 50.0;

/// Labels of low-value meta pages; tapping these rarely discovers anything.
const META_LEXICON: &[&str] = &[
    "settings",
    "about",
    "legal",
    "privacy",
    "terms",
    "licens", // licenses / licensing
    "rate",
    "feedback",
    "help",
    "faq",
    "version",
    "open source",
];

/// How a score request should weight the hand-tuned boosts. In adaptive
/// mode the bottom-nav boost is small because the policy is expected to
/// learn it instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriorityMode {
    Standard,
    Adaptive,
}

// ============================================================================
// Scoring
// ============================================================================

/// Score one candidate element. Pure: same inputs, same score — ties are
/// broken later by queue insertion order.
pub fn score(
    element: &Element,
    screen: &Screen,
    mode: PriorityMode,
    visited: bool,
    learned_boost: f64,
) -> i32 {
    if learned_boost <= DEAD_END_BOOST {
        return DEAD_END_SCORE;
    }

    let mut total = BASE_SCORE;

    // Identified elements over anonymous ones
    let has_text = element.text.as_deref().is_some_and(|t| !t.is_empty());
    let has_resource = element
        .resource_id
        .as_deref()
        .is_some_and(|r| !r.is_empty());
    if has_text {
        total += TEXT_BONUS;
    }
    if has_resource {
        total += RESOURCE_ID_BONUS;
    }
    if !has_text && !has_resource {
        total += ANONYMOUS_PENALTY;
    }

    // Region
    match element.zone(screen.height) {
        VerticalZone::Middle => total += CONTENT_REGION_BONUS,
        VerticalZone::Top => total += TOP_EDGE_PENALTY,
        VerticalZone::Bottom => {
            if is_bottom_nav(element, screen) {
                total += match (mode, visited) {
                    (PriorityMode::Standard, false) => BOTTOM_NAV_UNVISITED_BONUS,
                    (PriorityMode::Standard, true) => BOTTOM_NAV_VISITED_BONUS,
                    (PriorityMode::Adaptive, false) => BOTTOM_NAV_UNVISITED_ADAPTIVE,
                    (PriorityMode::Adaptive, true) => BOTTOM_NAV_VISITED_ADAPTIVE,
                };
            }
        }
    }

    if is_meta_element(element) {
        total += META_PAGE_PENALTY;
    }

    total + (learned_boost * LEARNED_BOOST_SCALE) as i32
}

/// Part of a bottom-navigation band: a clickable in the bottom zone of a
/// screen that has at least three clickables down there.
pub fn is_bottom_nav(element: &Element, screen: &Screen) -> bool {
    if element.kind != ElementKind::Clickable
        || element.zone(screen.height) != VerticalZone::Bottom
    {
        return false;
    }
    let band_size = screen
        .clickables
        .iter()
        .filter(|e| e.zone(screen.height) == VerticalZone::Bottom)
        .count();
    band_size >= 3
}

/// Labels of actions that mutate or destroy user data; skipped entirely
/// when the run is configured non-destructive.
const DESTRUCTIVE_LEXICON: &[&str] = &[
    "delete",
    "remove",
    "clear",
    "reset",
    "erase",
    "uninstall",
    "log out",
    "logout",
    "sign out",
    "deactivate",
    "unsubscribe",
    "format",
];

/// Element whose label or resource id reads as a destructive action.
pub fn is_destructive(element: &Element) -> bool {
    let haystacks = [
        element.text.as_deref().unwrap_or(""),
        element.resource_id.as_deref().unwrap_or(""),
    ];
    haystacks.iter().any(|h| {
        let lower = h.to_lowercase();
        DESTRUCTIVE_LEXICON.iter().any(|k| lower.contains(k))
    })
}

/// Element leading to a settings/about/legal style meta page.
pub fn is_meta_element(element: &Element) -> bool {
    let haystacks = [
        element.text.as_deref().unwrap_or(""),
        element.resource_id.as_deref().unwrap_or(""),
    ];
    haystacks.iter().any(|h| {
        let lower = h.to_lowercase();
        META_LEXICON.iter().any(|k| lower.contains(k))
    })
}
