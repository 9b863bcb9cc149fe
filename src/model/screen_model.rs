use serde::{Deserialize, Serialize};

use crate::model::identity::{composite_key, element_hash, screen_hash};

// ============================================================================
// Geometry
// ============================================================================

/// Pixel-space rectangle of an element on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Bounds {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl Bounds {
    pub fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self { left, top, right, bottom }
    }

    pub fn center(&self) -> (i32, i32) {
        ((self.left + self.right) / 2, (self.top + self.bottom) / 2)
    }

    pub fn width(&self) -> i32 {
        self.right - self.left
    }

    pub fn height(&self) -> i32 {
        self.bottom - self.top
    }
}

/// Vertical band of the screen an element sits in, relative to a nominal
/// screen height. Used both for priority heuristics and for action-key
/// generalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VerticalZone {
    Top,
    Middle,
    Bottom,
}

/// Nominal screen height used to bucket elements into zones when the real
/// display metrics are not part of the capture.
pub const NOMINAL_SCREEN_HEIGHT: i32 = 1920;

impl VerticalZone {
    /// Bucket a bounds rectangle by its vertical center.
    pub fn of(bounds: &Bounds, screen_height: i32) -> VerticalZone {
        let height = if screen_height > 0 { screen_height } else { NOMINAL_SCREEN_HEIGHT };
        let (_, cy) = bounds.center();
        if cy < height / 5 {
            VerticalZone::Top
        } else if cy > height - height / 6 {
            VerticalZone::Bottom
        } else {
            VerticalZone::Middle
        }
    }
}

// ============================================================================
// Elements
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ElementKind {
    Clickable,
    Scrollable,
    Input,
    Text,
}

/// What happened the last time this element was activated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ActionOutcomeTag {
    #[default]
    Unknown,
    Navigation,
    NoEffect,
    ClosesApp,
    TriggersDialog,
    RevealsContent,
    Crashes,
}

/// An interactive widget observed on a screen.
///
/// Identity is a deterministic hash of (resource id, text, class, bounds),
/// scoped to the owning screen via `composite_key`. The same logical widget
/// on two different screens is tracked independently.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Element {
    /// Deterministic per-screen identity hash
    pub id: String,

    pub resource_id: Option<String>,
    pub text: Option<String>,
    pub class_name: String,
    pub bounds: Bounds,
    pub kind: ElementKind,

    /// Set once the orchestrator has activated this element
    pub explored: bool,

    /// Outcome tag from the most recent activation
    pub outcome: ActionOutcomeTag,
}

impl Element {
    pub fn new(
        resource_id: Option<String>,
        text: Option<String>,
        class_name: impl Into<String>,
        bounds: Bounds,
        kind: ElementKind,
    ) -> Self {
        let class_name = class_name.into();
        let id = element_hash(
            resource_id.as_deref(),
            text.as_deref(),
            &class_name,
            &bounds,
        );
        Self {
            id,
            resource_id,
            text,
            class_name,
            bounds,
            kind,
            explored: false,
            outcome: ActionOutcomeTag::Unknown,
        }
    }

    /// Display label: text if present, else the resource id, else the class.
    pub fn label(&self) -> &str {
        self.text
            .as_deref()
            .filter(|t| !t.is_empty())
            .or(self.resource_id.as_deref())
            .unwrap_or(&self.class_name)
    }

    pub fn zone(&self, screen_height: i32) -> VerticalZone {
        VerticalZone::of(&self.bounds, screen_height)
    }
}

// ============================================================================
// Screens
// ============================================================================

/// A deduplicated UI state.
///
/// Identity is a hash of (activity, package) only — never of dynamic
/// content — so the same logical screen observed with different data
/// collapses to one entry. Created on first observation, mutated on
/// revisit, never deleted during a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Screen {
    /// Deterministic identity hash of (activity, package)
    pub id: String,

    pub activity: String,
    pub package: String,

    pub clickables: Vec<Element>,
    pub scrollables: Vec<Element>,
    pub inputs: Vec<Element>,

    /// Reported height of the capture, 0 when unknown
    pub height: i32,

    pub visit_count: u32,
}

impl Screen {
    pub fn new(activity: impl Into<String>, package: impl Into<String>) -> Self {
        let activity = activity.into();
        let package = package.into();
        let id = screen_hash(&activity, &package);
        Self {
            id,
            activity,
            package,
            clickables: Vec::new(),
            scrollables: Vec::new(),
            inputs: Vec::new(),
            height: 0,
            visit_count: 0,
        }
    }

    /// All interactive elements in capture order.
    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.clickables
            .iter()
            .chain(self.scrollables.iter())
            .chain(self.inputs.iter())
    }

    pub fn find_element(&self, element_id: &str) -> Option<&Element> {
        self.elements().find(|e| e.id == element_id)
    }

    pub fn find_element_mut(&mut self, element_id: &str) -> Option<&mut Element> {
        self.clickables
            .iter_mut()
            .chain(self.scrollables.iter_mut())
            .chain(self.inputs.iter_mut())
            .find(|e| e.id == element_id)
    }

    /// Composite key scoping an element to this screen.
    pub fn key_for(&self, element_id: &str) -> String {
        composite_key(&self.id, element_id)
    }

    /// Merge a fresh capture of the same screen: bump the visit counter and
    /// absorb any elements not seen before. Existing elements keep their
    /// explored flags and outcome tags.
    pub fn absorb(&mut self, fresh: &Screen) -> usize {
        debug_assert_eq!(self.id, fresh.id);
        self.visit_count += 1;
        if fresh.height > 0 {
            self.height = fresh.height;
        }

        let mut added = 0;
        for el in fresh.elements() {
            if self.find_element(&el.id).is_none() {
                match el.kind {
                    ElementKind::Scrollable => self.scrollables.push(el.clone()),
                    ElementKind::Input => self.inputs.push(el.clone()),
                    _ => self.clickables.push(el.clone()),
                }
                added += 1;
            }
        }
        added
    }
}

// ============================================================================
// Gestures
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScrollDirection {
    Up,
    Down,
    Left,
    Right,
}
