use crate::device::error::DeviceError;
use crate::model::screen_model::ScrollDirection;

/// Executes gestures against the live device.
///
/// A returned `Ok` means the gesture was delivered, not that it had the
/// expected effect — the engine always re-observes via the screen provider.
pub trait Actuator {
    fn tap(&mut self, x: i32, y: i32) -> Result<(), DeviceError>;

    fn scroll(&mut self, x: i32, y: i32, direction: ScrollDirection) -> Result<(), DeviceError>;

    fn press_back(&mut self) -> Result<(), DeviceError>;

    /// Launch (or with `force_restart`, cleanly relaunch) the target app.
    fn launch_app(&mut self, package: &str, force_restart: bool) -> Result<(), DeviceError>;
}
