use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};

use crate::device::actuator::Actuator;
use crate::device::error::DeviceError;
use crate::device::provider::ScreenProvider;
use crate::model::screen_model::{Bounds, Element, ElementKind, Screen, ScrollDirection};

// ============================================================================
// App description (YAML/JSON)
// ============================================================================

/// Declarative model of an app for the simulated device. The first screen
/// is the home screen.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppDescription {
    pub package: String,
    pub screens: Vec<ScreenDescription>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScreenDescription {
    pub activity: String,

    #[serde(default)]
    pub elements: Vec<ElementDescription>,

    /// Only visible after a scroll gesture on this screen
    #[serde(default)]
    pub hidden_elements: Vec<ElementDescription>,

    /// Whether the screen offers scrolling at all; implied when
    /// `hidden_elements` is non-empty
    #[serde(default)]
    pub scrollable: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementDescription {
    #[serde(default)]
    pub resource_id: Option<String>,

    #[serde(default)]
    pub text: Option<String>,

    #[serde(default = "default_class")]
    pub class_name: String,

    /// [left, top, right, bottom]; auto-laid-out vertically when omitted
    #[serde(default)]
    pub bounds: Option<[i32; 4]>,

    #[serde(default)]
    pub kind: SimElementKind,

    #[serde(default)]
    pub effect: TapEffect,
}

fn default_class() -> String {
    "android.widget.Button".to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SimElementKind {
    #[default]
    Clickable,
    Input,
    Text,
}

/// What tapping an element does.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TapEffect {
    #[default]
    None,
    /// Move to another activity of the same app
    Navigate { activity: String },
    /// Navigate to one of several activities, round-robin per tap
    /// (conditional navigation)
    NavigateAny { activities: Vec<String> },
    /// Open a modal overlay on the current activity; back dismisses it
    Dialog { elements: Vec<ElementDescription> },
    /// Background the app (the launcher comes to the foreground)
    CloseApp,
    /// Kill the process; captures fail until the next launch
    Crash,
}

impl AppDescription {
    pub fn from_yaml_str(yaml: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(yaml)
    }

    pub fn from_yaml_file(path: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let content = std::fs::read_to_string(path)?;
        Ok(Self::from_yaml_str(&content)?)
    }
}

// ============================================================================
// Simulated device
// ============================================================================

const SIM_SCREEN_WIDTH: i32 = 1080;
const SIM_SCREEN_HEIGHT: i32 = 1920;

const LAUNCHER_PACKAGE: &str = "com.android.launcher";
const LAUNCHER_ACTIVITY: &str = "Launcher";

/// Whether the simulated process is alive and which app is foreground.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ProcessState {
    NotLaunched,
    Foreground,
    Background,
    Crashed,
}

struct SimCore {
    app: AppDescription,
    screens_by_activity: HashMap<String, usize>,

    process: ProcessState,
    current_activity: String,
    back_stack: Vec<String>,

    /// Activities whose hidden elements have been revealed by a scroll
    revealed: HashSet<String>,

    /// Open modal overlay per activity; at most one at a time
    dialogs: HashMap<String, Vec<ElementDescription>>,

    /// Round-robin counters for `NavigateAny` triggers, keyed by
    /// (activity, element index)
    conditional_counters: HashMap<(String, usize), usize>,

    taps: u64,
    launches: u64,
}

impl SimCore {
    fn new(app: AppDescription) -> Self {
        let screens_by_activity = app
            .screens
            .iter()
            .enumerate()
            .map(|(i, s)| (s.activity.clone(), i))
            .collect();
        let home = app
            .screens
            .first()
            .map(|s| s.activity.clone())
            .unwrap_or_default();
        Self {
            app,
            screens_by_activity,
            process: ProcessState::NotLaunched,
            current_activity: home,
            back_stack: Vec::new(),
            revealed: HashSet::new(),
            dialogs: HashMap::new(),
            conditional_counters: HashMap::new(),
            taps: 0,
            launches: 0,
        }
    }

    fn home_activity(&self) -> &str {
        self.app
            .screens
            .first()
            .map(|s| s.activity.as_str())
            .unwrap_or("")
    }

    fn description(&self, activity: &str) -> Option<&ScreenDescription> {
        self.screens_by_activity
            .get(activity)
            .map(|&i| &self.app.screens[i])
    }

    // ------------------------------------------------------------------------
    // Capture
    // ------------------------------------------------------------------------

    fn capture(&self) -> Result<Screen, DeviceError> {
        match self.process {
            ProcessState::Crashed => {
                Err(DeviceError::CaptureFailed("app process has died".into()))
            }
            ProcessState::NotLaunched | ProcessState::Background => {
                let mut screen = Screen::new(LAUNCHER_ACTIVITY, LAUNCHER_PACKAGE);
                screen.height = SIM_SCREEN_HEIGHT;
                Ok(screen)
            }
            ProcessState::Foreground => {
                let desc = self.description(&self.current_activity).ok_or_else(|| {
                    DeviceError::CaptureFailed(format!(
                        "unknown activity '{}'",
                        self.current_activity
                    ))
                })?;
                Ok(self.render(desc))
            }
        }
    }

    /// Elements currently on screen: base, scroll-revealed, and any open
    /// dialog overlay, in that order (indices drive the auto layout).
    fn visible_elements(&self, desc: &ScreenDescription) -> Vec<ElementDescription> {
        let mut visible = desc.elements.clone();
        if self.revealed.contains(&desc.activity) {
            visible.extend(desc.hidden_elements.iter().cloned());
        }
        if let Some(overlay) = self.dialogs.get(&desc.activity) {
            visible.extend(overlay.iter().cloned());
        }
        visible
    }

    fn render(&self, desc: &ScreenDescription) -> Screen {
        let mut screen = Screen::new(&desc.activity, &self.app.package);
        screen.height = SIM_SCREEN_HEIGHT;

        let visible = self.visible_elements(desc);
        for (i, ed) in visible.iter().enumerate() {
            let bounds = ed
                .bounds
                .map(|[l, t, r, b]| Bounds::new(l, t, r, b))
                .unwrap_or_else(|| auto_bounds(i));
            let kind = match ed.kind {
                SimElementKind::Clickable => ElementKind::Clickable,
                SimElementKind::Input => ElementKind::Input,
                SimElementKind::Text => ElementKind::Text,
            };
            let element = Element::new(
                ed.resource_id.clone(),
                ed.text.clone(),
                ed.class_name.clone(),
                bounds,
                kind,
            );
            match kind {
                ElementKind::Input => screen.inputs.push(element),
                ElementKind::Clickable => screen.clickables.push(element),
                _ => {}
            }
        }

        if desc.scrollable || !desc.hidden_elements.is_empty() {
            let container = Element::new(
                Some(format!("{}:id/content_list", self.app.package)),
                None,
                "android.widget.ScrollView",
                Bounds::new(0, 200, SIM_SCREEN_WIDTH, SIM_SCREEN_HEIGHT - 200),
                ElementKind::Scrollable,
            );
            screen.scrollables.push(container);
        }

        screen
    }

    // ------------------------------------------------------------------------
    // Gestures
    // ------------------------------------------------------------------------

    fn tap(&mut self, x: i32, y: i32) -> Result<(), DeviceError> {
        if self.process != ProcessState::Foreground {
            // Taps on the launcher are accepted and do nothing
            return Ok(());
        }
        self.taps += 1;

        let activity = self.current_activity.clone();
        let Some(desc) = self.description(&activity) else {
            return Ok(());
        };

        let visible = self.visible_elements(desc);
        let hit = visible.iter().enumerate().find(|(i, ed)| {
            let bounds = ed
                .bounds
                .map(|[l, t, r, b]| Bounds::new(l, t, r, b))
                .unwrap_or_else(|| auto_bounds(*i));
            x >= bounds.left && x < bounds.right && y >= bounds.top && y < bounds.bottom
        });

        let Some((index, ed)) = hit else {
            return Ok(());
        };

        match ed.effect.clone() {
            TapEffect::None => {}
            TapEffect::Navigate { activity: to } => self.navigate_to(&to),
            TapEffect::NavigateAny { activities } => {
                if !activities.is_empty() {
                    let counter = self
                        .conditional_counters
                        .entry((activity.clone(), index))
                        .or_insert(0);
                    let to = activities[*counter % activities.len()].clone();
                    *counter += 1;
                    self.navigate_to(&to);
                }
            }
            TapEffect::Dialog { elements } => {
                self.dialogs.insert(activity, elements);
            }
            TapEffect::CloseApp => {
                self.process = ProcessState::Background;
            }
            TapEffect::Crash => {
                self.process = ProcessState::Crashed;
            }
        }
        Ok(())
    }

    fn navigate_to(&mut self, activity: &str) {
        if !self.screens_by_activity.contains_key(activity) {
            return;
        }
        if activity == self.current_activity {
            return;
        }
        self.back_stack.push(self.current_activity.clone());
        self.current_activity = activity.to_string();
    }

    fn scroll(&mut self, _direction: ScrollDirection) -> Result<(), DeviceError> {
        if self.process != ProcessState::Foreground {
            return Ok(());
        }
        self.revealed.insert(self.current_activity.clone());
        Ok(())
    }

    fn press_back(&mut self) -> Result<(), DeviceError> {
        if self.process != ProcessState::Foreground {
            return Ok(());
        }
        // An open dialog absorbs the first back press
        if self.dialogs.remove(&self.current_activity).is_some() {
            return Ok(());
        }
        match self.back_stack.pop() {
            Some(previous) => self.current_activity = previous,
            // Back on the root activity leaves the app
            None => self.process = ProcessState::Background,
        }
        Ok(())
    }

    fn launch_app(&mut self, package: &str, force_restart: bool) -> Result<(), DeviceError> {
        if package != self.app.package {
            return Err(DeviceError::LaunchFailed {
                package: package.to_string(),
                detail: "package not installed".to_string(),
            });
        }
        self.launches += 1;
        let was_crashed = self.process == ProcessState::Crashed;
        if force_restart || was_crashed || self.process == ProcessState::NotLaunched {
            self.current_activity = self.home_activity().to_string();
            self.back_stack.clear();
            self.dialogs.clear();
        }
        self.process = ProcessState::Foreground;
        Ok(())
    }
}

fn auto_bounds(index: usize) -> Bounds {
    let top = 260 + index as i32 * 160;
    Bounds::new(40, top, SIM_SCREEN_WIDTH - 40, top + 120)
}

// ============================================================================
// Handles
// ============================================================================

/// Simulated device backed by an `AppDescription`. One shared core serves
/// both the provider and actuator handles handed to the engine.
pub struct SimulatedDevice {
    core: Arc<Mutex<SimCore>>,
}

impl SimulatedDevice {
    pub fn new(app: AppDescription) -> Self {
        Self { core: Arc::new(Mutex::new(SimCore::new(app))) }
    }

    pub fn provider(&self) -> SimProvider {
        SimProvider { core: Arc::clone(&self.core) }
    }

    pub fn actuator(&self) -> SimActuator {
        SimActuator { core: Arc::clone(&self.core) }
    }

    pub fn taps(&self) -> u64 {
        self.lock().taps
    }

    pub fn launches(&self) -> u64 {
        self.lock().launches
    }

    pub fn current_activity(&self) -> String {
        self.lock().current_activity.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, SimCore> {
        match self.core.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

pub struct SimProvider {
    core: Arc<Mutex<SimCore>>,
}

impl ScreenProvider for SimProvider {
    fn capture(&mut self) -> Result<Screen, DeviceError> {
        match self.core.lock() {
            Ok(core) => core.capture(),
            Err(poisoned) => poisoned.into_inner().capture(),
        }
    }
}

pub struct SimActuator {
    core: Arc<Mutex<SimCore>>,
}

impl SimActuator {
    fn with_core<T>(&self, f: impl FnOnce(&mut SimCore) -> T) -> T {
        match self.core.lock() {
            Ok(mut core) => f(&mut core),
            Err(poisoned) => f(&mut poisoned.into_inner()),
        }
    }
}

impl Actuator for SimActuator {
    fn tap(&mut self, x: i32, y: i32) -> Result<(), DeviceError> {
        self.with_core(|core| core.tap(x, y))
    }

    fn scroll(&mut self, _x: i32, _y: i32, direction: ScrollDirection) -> Result<(), DeviceError> {
        self.with_core(|core| core.scroll(direction))
    }

    fn press_back(&mut self) -> Result<(), DeviceError> {
        self.with_core(|core| core.press_back())
    }

    fn launch_app(&mut self, package: &str, force_restart: bool) -> Result<(), DeviceError> {
        self.with_core(|core| core.launch_app(package, force_restart))
    }
}
