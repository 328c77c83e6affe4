// SPDX-License-Identifier: GPL-3.0-only
// Shared types for camera backend abstraction

//! Shared types for camera backends

use crate::flash::FlashMode;
use serde::{Deserialize, Serialize};

/// Opaque identifier of a physical camera, stable for the session lifetime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DeviceId(pub u32);

impl std::fmt::Display for DeviceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "camera{}", self.0)
    }
}

/// Direction a camera points to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Facing {
    /// Points toward the user (selfie camera)
    Front,
    /// Points away from the user
    #[default]
    Back,
}

impl Facing {
    /// The opposite camera, used by the switch-camera action
    pub fn toggled(self) -> Self {
        match self {
            Facing::Front => Facing::Back,
            Facing::Back => Facing::Front,
        }
    }
}

impl std::fmt::Display for Facing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Facing::Front => write!(f, "front"),
            Facing::Back => write!(f, "back"),
        }
    }
}

/// Static description of a camera as reported by device enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CameraInfo {
    pub id: DeviceId,
    pub facing: Facing,
    /// Fixed clockwise rotation of the sensor relative to the natural orientation
    pub mount_orientation: u32,
}

/// Frame size in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Height divided by width, the ratio used for preview matching
    pub fn portrait_ratio(&self) -> f64 {
        self.height as f64 / self.width as f64
    }
}

impl std::fmt::Display for Size {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Display rotation of the screen relative to its natural orientation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Rotation {
    #[default]
    Rotate0,
    Rotate90,
    Rotate180,
    Rotate270,
}

impl Rotation {
    /// Create rotation from an integer degree value (normalised to 0-360).
    ///
    /// Values that are not a multiple of 90 fall back to no rotation.
    pub fn from_degrees(degrees: i32) -> Self {
        match degrees.rem_euclid(360) {
            90 => Rotation::Rotate90,
            180 => Rotation::Rotate180,
            270 => Rotation::Rotate270,
            _ => Rotation::Rotate0,
        }
    }

    /// Get the rotation in degrees
    pub fn degrees(&self) -> u32 {
        match self {
            Rotation::Rotate0 => 0,
            Rotation::Rotate90 => 90,
            Rotation::Rotate180 => 180,
            Rotation::Rotate270 => 270,
        }
    }
}

impl std::fmt::Display for Rotation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}°", self.degrees())
    }
}

/// Mutable device parameters, read and written as a whole like the OS API does
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CameraParameters {
    pub preview_size: Option<Size>,
    pub picture_size: Option<Size>,
    /// Active flash mode as the raw device name (e.g. "auto", "torch")
    pub flash_mode: Option<String>,
    pub supported_preview_sizes: Vec<Size>,
    pub supported_picture_sizes: Vec<Size>,
    /// Raw flash mode names; `None` when the device has no flash control
    pub supported_flash_modes: Option<Vec<String>>,
}

impl CameraParameters {
    /// Flash modes the device reports, restricted to the ones we can drive
    pub fn known_flash_modes(&self) -> Vec<FlashMode> {
        let Some(modes) = self.supported_flash_modes.as_ref() else {
            return Vec::new();
        };
        let mut result: Vec<FlashMode> = modes
            .iter()
            .filter_map(|name| FlashMode::from_device_name(name))
            .collect();
        result.sort();
        result.dedup();
        result
    }

    /// Active flash mode, if it is one we know about
    pub fn current_flash_mode(&self) -> Option<FlashMode> {
        self.flash_mode
            .as_deref()
            .and_then(FlashMode::from_device_name)
    }
}

/// Recording quality presets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum VideoQuality {
    /// Lowest quality profile the device offers
    Low,
    /// Highest quality profile the device offers (default)
    #[default]
    High,
}

impl VideoQuality {
    /// Get all presets for UI iteration
    pub const ALL: [VideoQuality; 2] = [VideoQuality::Low, VideoQuality::High];

    /// Get display name for the preset
    pub fn display_name(&self) -> &'static str {
        match self {
            VideoQuality::Low => "Low",
            VideoQuality::High => "High",
        }
    }
}

/// Encoder settings the device recommends for a quality preset
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CamcorderProfile {
    pub width: u32,
    pub height: u32,
    pub frame_rate: u32,
    pub bitrate_kbps: u32,
}

impl CamcorderProfile {
    pub fn frame_size(&self) -> Size {
        Size::new(self.width, self.height)
    }
}

/// Everything a recorder needs to bind to a device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordingRequest {
    pub output_path: std::path::PathBuf,
    pub profile: CamcorderProfile,
    /// Rotation hint written into the container metadata
    pub orientation_hint: u32,
    /// Record audio alongside video
    pub with_audio: bool,
}

/// Result type for collaborator operations
pub type DeviceResult<T> = Result<T, DeviceError>;

/// Failures reported by the hardware layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceError {
    /// Device id is unknown to the enumerator
    NotFound(DeviceId),
    /// Device is held by another client
    Busy(DeviceId),
    /// Access denied by the platform
    AccessDenied(String),
    /// Device was physically disconnected
    Disconnected,
    /// Handle was already released
    Released,
    /// Parameters rejected by the device
    InvalidParameters(String),
    /// Any other hardware failure
    Hardware(String),
    /// Output storage problem
    Io(String),
}

impl std::fmt::Display for DeviceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeviceError::NotFound(id) => write!(f, "Device not found: {}", id),
            DeviceError::Busy(id) => write!(f, "Device is busy: {}", id),
            DeviceError::AccessDenied(msg) => write!(f, "Access denied: {}", msg),
            DeviceError::Disconnected => write!(f, "Device disconnected"),
            DeviceError::Released => write!(f, "Device handle already released"),
            DeviceError::InvalidParameters(msg) => write!(f, "Invalid parameters: {}", msg),
            DeviceError::Hardware(msg) => write!(f, "Hardware error: {}", msg),
            DeviceError::Io(msg) => write!(f, "I/O error: {}", msg),
        }
    }
}

impl std::error::Error for DeviceError {}

impl From<std::io::Error> for DeviceError {
    fn from(err: std::io::Error) -> Self {
        DeviceError::Io(err.to_string())
    }
}
