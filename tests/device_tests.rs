use app_explorer::device::clock::ManualClock;
use app_explorer::device::error::DeviceError;
use app_explorer::device::provider::{ScreenProvider, poll_until_stable};
use app_explorer::device::sim::{AppDescription, TapEffect};
use app_explorer::model::screen_model::Screen;

mod common;
use common::screen;

// =========================================================================
// App descriptions
// =========================================================================

#[test]
fn app_descriptions_load_from_yaml() {
    let yaml = r#"
package: com.example.demo
screens:
  - activity: HomeActivity
    elements:
      - resource_id: open
        text: Open
        effect:
          kind: navigate
          activity: ListActivity
      - resource_id: info
        text: Info
        effect:
          kind: dialog
          elements:
            - resource_id: ok
              text: OK
  - activity: ListActivity
"#;

    let app = AppDescription::from_yaml_str(yaml).expect("description parses");
    assert_eq!(app.package, "com.example.demo");
    assert_eq!(
        app.screens[0].elements[0].effect,
        TapEffect::Navigate { activity: "ListActivity".to_string() }
    );
    match &app.screens[0].elements[1].effect {
        TapEffect::Dialog { elements } => {
            assert_eq!(elements[0].text.as_deref(), Some("OK"));
        }
        other => panic!("expected a dialog effect, got {:?}", other),
    }
    assert_eq!(app.screens[1].elements.len(), 0);
}

// =========================================================================
// Stabilization polling
// =========================================================================

/// Fails every second capture with a transient error.
struct EveryOtherProvider {
    screen: Screen,
    calls: u32,
}

impl ScreenProvider for EveryOtherProvider {
    fn capture(&mut self) -> Result<Screen, DeviceError> {
        self.calls += 1;
        if self.calls % 2 == 0 {
            Err(DeviceError::CaptureFailed("uiautomator hiccup".into()))
        } else {
            Ok(self.screen.clone())
        }
    }
}

struct DeadProvider;

impl ScreenProvider for DeadProvider {
    fn capture(&mut self) -> Result<Screen, DeviceError> {
        Err(DeviceError::CaptureFailed("process died".into()))
    }
}

#[test]
fn stabilization_poll_rides_out_flaky_captures() {
    let clock = ManualClock::new();
    let mut provider = EveryOtherProvider { screen: screen("HomeActivity"), calls: 0 };

    let stable = poll_until_stable(&mut provider, &clock, 5, 500)
        .expect("transient failures mid-poll are retried, not surfaced");
    assert_eq!(stable.activity, "HomeActivity");
    assert!(provider.calls >= 3, "Agreement needs two good captures");
}

#[test]
fn stabilization_poll_surfaces_a_provider_that_never_answers() {
    let clock = ManualClock::new();
    let mut provider = DeadProvider;
    assert!(poll_until_stable(&mut provider, &clock, 5, 50).is_err());
}
