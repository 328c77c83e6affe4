// SPDX-License-Identifier: MPL-2.0

//! Error types for camera sessions

use crate::backends::camera::DeviceError;
use std::fmt;

/// Result type alias using SessionError
pub type SessionResult<T> = Result<T, SessionError>;

/// Everything a camera session reports to its caller
///
/// Hardware failures are converted into one of these variants at the session
/// boundary; none of them leave the session holding a half-acquired resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// No camera device exists at all
    NoCameraFound,
    /// Open failed: device missing, permission denied or held elsewhere
    DeviceUnavailable(String),
    /// No acceptable preview size, or the surface could not be bound
    Configuration(String),
    /// The device rejected a still capture
    Capture(String),
    /// A still capture is already outstanding
    CaptureInProgress,
    /// Recorder prepare or start failed
    Prepare(String),
    /// A recording is already running
    RecordingInProgress,
    /// Stop requested while nothing is recording
    NotRecording,
    /// Recorder stop failed; the partial file was discarded
    Stop(String),
    /// Operation issued on a released session
    InvalidState(String),
    /// Background open was cancelled by the caller
    Cancelled,
    /// Output path could not be allocated or written
    Storage(String),
    /// Configuration file could not be read or written
    Config(String),
}

impl SessionError {
    pub(crate) fn released() -> Self {
        SessionError::InvalidState("session already released".to_string())
    }
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::NoCameraFound => write!(f, "No camera devices found"),
            SessionError::DeviceUnavailable(msg) => write!(f, "Device unavailable: {}", msg),
            SessionError::Configuration(msg) => write!(f, "Configuration error: {}", msg),
            SessionError::Capture(msg) => write!(f, "Capture failed: {}", msg),
            SessionError::CaptureInProgress => write!(f, "Capture already in progress"),
            SessionError::Prepare(msg) => write!(f, "Failed to prepare recorder: {}", msg),
            SessionError::RecordingInProgress => write!(f, "Recording already in progress"),
            SessionError::NotRecording => write!(f, "No recording in progress"),
            SessionError::Stop(msg) => write!(f, "Failed to stop recording: {}", msg),
            SessionError::InvalidState(msg) => write!(f, "Invalid state: {}", msg),
            SessionError::Cancelled => write!(f, "Camera open cancelled"),
            SessionError::Storage(msg) => write!(f, "Storage error: {}", msg),
            SessionError::Config(msg) => write!(f, "Config error: {}", msg),
        }
    }
}

impl std::error::Error for SessionError {}

// Open is the only place a raw device error maps without more context
impl From<DeviceError> for SessionError {
    fn from(err: DeviceError) -> Self {
        SessionError::DeviceUnavailable(err.to_string())
    }
}

impl From<std::io::Error> for SessionError {
    fn from(err: std::io::Error) -> Self {
        SessionError::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for SessionError {
    fn from(err: serde_json::Error) -> Self {
        SessionError::Config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::camera::DeviceId;

    #[test]
    fn test_device_error_maps_to_unavailable() {
        let err: SessionError = DeviceError::Busy(DeviceId(1)).into();
        assert_eq!(
            err,
            SessionError::DeviceUnavailable("Device is busy: camera1".to_string())
        );
    }

    #[test]
    fn test_display_messages() {
        assert_eq!(SessionError::NotRecording.to_string(), "No recording in progress");
        assert_eq!(
            SessionError::released().to_string(),
            "Invalid state: session already released"
        );
    }
}
