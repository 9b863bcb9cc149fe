use crate::device::clock::Clock;
use crate::device::error::DeviceError;
use crate::model::screen_model::Screen;

/// Captures a structured snapshot of the current screen from the live UI.
///
/// Implementations must be idempotent and side-effect-free: capturing twice
/// in a row without an intervening gesture must describe the same UI state.
pub trait ScreenProvider {
    fn capture(&mut self) -> Result<Screen, DeviceError>;
}

/// Capture with bounded retries and linear backoff.
///
/// Transient failures are retried locally and never surfaced; a persistent
/// failure comes back as the last error so the caller can treat it as
/// branch- or run-fatal.
pub fn capture_with_retry(
    provider: &mut dyn ScreenProvider,
    clock: &dyn Clock,
    attempts: u32,
    backoff_ms: u64,
) -> Result<Screen, DeviceError> {
    let mut last = DeviceError::CaptureFailed("no attempts made".into());
    for attempt in 0..attempts.max(1) {
        match provider.capture() {
            Ok(screen) => return Ok(screen),
            Err(e) if e.is_transient() && attempt + 1 < attempts => {
                clock.sleep_ms(backoff_ms * (attempt as u64 + 1));
                last = e;
            }
            Err(e) => return Err(e),
        }
    }
    Err(last)
}

/// Poll the provider until two consecutive captures agree on the screen id,
/// or the timeout elapses. Returns the last capture either way. This is the
/// bounded stand-in for "wait for the UI to stabilize".
///
/// Transient capture failures mid-poll only spend deadline; they surface
/// only when every capture within the window failed.
pub fn poll_until_stable(
    provider: &mut dyn ScreenProvider,
    clock: &dyn Clock,
    interval_ms: u64,
    timeout_ms: u64,
) -> Result<Screen, DeviceError> {
    let deadline = clock.now_ms() + timeout_ms;
    let mut previous: Option<Screen> = None;

    loop {
        match provider.capture() {
            Ok(current) => {
                if previous.as_ref().is_some_and(|p| p.id == current.id) {
                    return Ok(current);
                }
                previous = Some(current);
            }
            Err(e) if e.is_transient() => {
                if clock.now_ms() >= deadline {
                    return match previous {
                        Some(p) => Ok(p),
                        None => Err(e),
                    };
                }
            }
            Err(e) => return Err(e),
        }
        if clock.now_ms() >= deadline {
            if let Some(p) = previous {
                return Ok(p);
            }
        }
        clock.sleep_ms(interval_ms.max(1));
    }
}
