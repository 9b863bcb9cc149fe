#![allow(dead_code)]

use app_explorer::device::sim::{
    AppDescription, ElementDescription, ScreenDescription, SimElementKind, TapEffect,
};
use app_explorer::model::screen_model::{Bounds, Element, ElementKind, Screen};

pub const PKG: &str = "com.example.demo";

// =========================================================================
// Domain model builders
// =========================================================================

/// A clickable with text and resource id, placed at the given vertical
/// offset in a 1080x1920 screen.
pub fn clickable(text: &str, resource: &str, top: i32) -> Element {
    Element::new(
        Some(resource.to_string()),
        Some(text.to_string()),
        "android.widget.Button",
        Bounds::new(40, top, 1040, top + 120),
        ElementKind::Clickable,
    )
}

pub fn anonymous_clickable(top: i32) -> Element {
    Element::new(
        None,
        None,
        "android.view.View",
        Bounds::new(40, top, 1040, top + 120),
        ElementKind::Clickable,
    )
}

pub fn input(resource: &str, top: i32) -> Element {
    Element::new(
        Some(resource.to_string()),
        None,
        "android.widget.EditText",
        Bounds::new(40, top, 1040, top + 120),
        ElementKind::Input,
    )
}

pub fn scrollable(top: i32, bottom: i32) -> Element {
    Element::new(
        Some(format!("{}:id/list", PKG)),
        None,
        "androidx.recyclerview.widget.RecyclerView",
        Bounds::new(0, top, 1080, bottom),
        ElementKind::Scrollable,
    )
}

pub fn screen(activity: &str) -> Screen {
    let mut s = Screen::new(activity, PKG);
    s.height = 1920;
    s
}

pub fn screen_with(activity: &str, clickables: Vec<Element>) -> Screen {
    let mut s = screen(activity);
    s.clickables = clickables;
    s
}

// =========================================================================
// Simulated app builders
// =========================================================================

pub fn sim_button(text: &str, resource: &str, effect: TapEffect) -> ElementDescription {
    ElementDescription {
        resource_id: Some(format!("{}:id/{}", PKG, resource)),
        text: Some(text.to_string()),
        class_name: "android.widget.Button".to_string(),
        bounds: None,
        kind: SimElementKind::Clickable,
        effect,
    }
}

pub fn sim_nav(text: &str, resource: &str, to: &str) -> ElementDescription {
    sim_button(text, resource, TapEffect::Navigate { activity: to.to_string() })
}

pub fn sim_inert(text: &str, resource: &str) -> ElementDescription {
    sim_button(text, resource, TapEffect::None)
}

pub fn sim_screen(activity: &str, elements: Vec<ElementDescription>) -> ScreenDescription {
    ScreenDescription {
        activity: activity.to_string(),
        elements,
        hidden_elements: Vec::new(),
        scrollable: false,
    }
}

/// Three-screen app: Home links to List and Details; List links back to
/// Details; every screen has one inert button.
pub fn demo_app() -> AppDescription {
    AppDescription {
        package: PKG.to_string(),
        screens: vec![
            sim_screen(
                "HomeActivity",
                vec![
                    sim_nav("Browse", "nav_list", "ListActivity"),
                    sim_nav("Details", "nav_details", "DetailsActivity"),
                    sim_inert("Refresh", "refresh"),
                ],
            ),
            sim_screen(
                "ListActivity",
                vec![
                    sim_nav("Open item", "item_open", "DetailsActivity"),
                    sim_inert("Sort", "sort"),
                ],
            ),
            sim_screen("DetailsActivity", vec![sim_inert("Share", "share")]),
        ],
    }
}
