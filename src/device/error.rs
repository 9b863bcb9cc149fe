use std::fmt;

#[derive(Debug)]
pub enum DeviceError {
    /// Screen capture failed; retryable with backoff
    CaptureFailed(String),

    /// A gesture (tap/scroll/back) was rejected by the device
    GestureFailed { gesture: String, detail: String },

    /// App launch or relaunch failed
    LaunchFailed { package: String, detail: String },

    /// The collaborator is gone past its recovery window; run-fatal
    Unavailable(String),
}

impl DeviceError {
    /// Transient errors are retried locally and never surfaced.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            DeviceError::CaptureFailed(_) | DeviceError::GestureFailed { .. }
        )
    }
}

impl fmt::Display for DeviceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceError::CaptureFailed(msg) => {
                write!(f, "Screen capture failed: {}", msg)
            }
            DeviceError::GestureFailed { gesture, detail } => {
                write!(f, "Gesture '{}' failed: {}", gesture, detail)
            }
            DeviceError::LaunchFailed { package, detail } => {
                write!(f, "Failed to launch '{}': {}", package, detail)
            }
            DeviceError::Unavailable(msg) => {
                write!(f, "Device unavailable: {}", msg)
            }
        }
    }
}

impl std::error::Error for DeviceError {}
