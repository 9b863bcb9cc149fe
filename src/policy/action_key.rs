use serde::{Deserialize, Serialize};

use crate::model::identity::state_hash;
use crate::model::screen_model::{Element, Screen, VerticalZone};

// ============================================================================
// Generalized action identity
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActionKind {
    Tap,
    Scroll,
    Back,
    Launch,
}

impl ActionKind {
    fn as_str(&self) -> &'static str {
        match self {
            ActionKind::Tap => "tap",
            ActionKind::Scroll => "scroll",
            ActionKind::Back => "back",
            ActionKind::Launch => "launch",
        }
    }
}

/// Generalized action identity: kind + normalized resource pattern +
/// vertical zone. Deliberately NOT the literal element id, so learned
/// values transfer across screens with structurally similar widgets.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ActionKey {
    pub kind: ActionKind,
    pub resource_pattern: String,
    pub zone: VerticalZone,
}

impl ActionKey {
    pub fn for_element(kind: ActionKind, element: &Element, screen: &Screen) -> Self {
        Self {
            kind,
            resource_pattern: normalize_resource(
                element.resource_id.as_deref(),
                &element.class_name,
            ),
            zone: element.zone(screen.height),
        }
    }

    pub fn tap(element: &Element, screen: &Screen) -> Self {
        Self::for_element(ActionKind::Tap, element, screen)
    }

    pub fn scroll(element: &Element, screen: &Screen) -> Self {
        Self::for_element(ActionKind::Scroll, element, screen)
    }

    /// Device-level actions with no triggering element (back, relaunch,
    /// recovery gestures). They share one pattern so their learned values
    /// pool per state.
    pub fn system(kind: ActionKind) -> Self {
        Self {
            kind,
            resource_pattern: "system".to_string(),
            zone: VerticalZone::Middle,
        }
    }

    /// Wire/table form: `tap|nav_home|bottom`.
    pub fn encode(&self) -> String {
        let zone = match self.zone {
            VerticalZone::Top => "top",
            VerticalZone::Middle => "middle",
            VerticalZone::Bottom => "bottom",
        };
        format!("{}|{}|{}", self.kind.as_str(), self.resource_pattern, zone)
    }
}

/// Compact policy state id for a screen: context plus sorted element ids.
pub fn screen_state_key(screen: &Screen) -> String {
    let ids: Vec<&str> = screen.elements().map(|e| e.id.as_str()).collect();
    state_hash(&screen.id, &ids)
}

/// Normalize a resource id into a pattern: drop the `package:id/` prefix,
/// lowercase, collapse digit runs to `#` so `item_42` and `item_7` share a
/// pattern. Falls back to the bare class name for anonymous elements.
pub fn normalize_resource(resource_id: Option<&str>, class_name: &str) -> String {
    let raw = match resource_id {
        Some(r) if !r.is_empty() => r,
        _ => {
            return class_name
                .rsplit('.')
                .next()
                .unwrap_or(class_name)
                .to_lowercase();
        }
    };

    let stripped = raw.rsplit('/').next().unwrap_or(raw).to_lowercase();

    let mut pattern = String::with_capacity(stripped.len());
    let mut in_digits = false;
    for c in stripped.chars() {
        if c.is_ascii_digit() {
            if !in_digits {
                pattern.push('#');
                in_digits = true;
            }
        } else {
            pattern.push(c);
            in_digits = false;
        }
    }
    pattern
}
