use crate::model::screen_model::Screen;

/// Activity-name and element-text fragments that mark credential walls.
const AUTH_KEYWORDS: &[&str] = &[
    "login",
    "log in",
    "signin",
    "sign in",
    "password",
    "passcode",
    "auth",
    "credential",
    "verify your identity",
    "two-factor",
    "otp",
];

/// Input types that only appear on credential screens.
const AUTH_INPUT_CLASSES: &[&str] = &["password", "pin"];

/// Classify a screen as a blocker: a credential/authentication wall the
/// engine must never target. Blockers are excluded as path destinations but
/// can still be crossed as waypoints when a recorded route runs through one.
pub fn is_blocker(screen: &Screen) -> bool {
    let activity = screen.activity.to_lowercase();
    if AUTH_KEYWORDS.iter().any(|k| activity.contains(k)) {
        return true;
    }

    // A password-typed input anywhere on the screen is decisive
    for input in &screen.inputs {
        let class = input.class_name.to_lowercase();
        let resource = input
            .resource_id
            .as_deref()
            .unwrap_or("")
            .to_lowercase();
        if AUTH_INPUT_CLASSES
            .iter()
            .any(|k| class.contains(k) || resource.contains(k))
        {
            return true;
        }
    }

    // Otherwise require two textual signals to avoid false positives on
    // screens that merely link to a login page
    let mut signals = 0;
    for el in screen.elements() {
        if let Some(text) = &el.text {
            let lower = text.to_lowercase();
            if AUTH_KEYWORDS.iter().any(|k| lower.contains(k)) {
                signals += 1;
            }
        }
    }
    signals >= 2
}
