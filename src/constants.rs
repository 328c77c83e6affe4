// SPDX-License-Identifier: GPL-3.0-only

//! Application-wide constants

/// Maximum difference between requested and offered height/width ratio for a
/// size to count as the same aspect
pub const ASPECT_TOLERANCE: f64 = 0.1;

/// JPEG quality (0-100) used when encoding still pictures
pub const PICTURE_QUALITY: u8 = 90;

/// Folder created inside the pictures directory for all media
pub const MEDIA_FOLDER: &str = "Camera";

/// Directory and file name of the persisted configuration
pub mod config {
    /// Application directory under the user config dir
    pub const APP_DIR: &str = "camera-session";

    /// Configuration file name
    pub const FILE_NAME: &str = "config.json";

    /// Saved session state (facing, flash, capture mode)
    pub const STATE_FILE_NAME: &str = "state.json";
}

/// Output file naming
pub mod file_names {
    /// chrono format of the timestamp embedded in file names
    pub const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

    /// Photo file prefix
    pub const PHOTO_PREFIX: &str = "IMG_";

    /// Video file prefix
    pub const VIDEO_PREFIX: &str = "VID_";

    /// Photo file extension
    pub const PHOTO_EXTENSION: &str = "jpg";

    /// Video file extension
    pub const VIDEO_EXTENSION: &str = "mp4";
}

/// Virtual camera defaults
pub mod virtual_camera {
    use crate::backends::camera::{CamcorderProfile, Size};

    /// Preview sizes offered by default virtual devices
    pub const PREVIEW_SIZES: &[Size] = &[
        Size::new(640, 480),
        Size::new(1280, 720),
        Size::new(1920, 1080),
    ];

    /// Picture sizes offered by default virtual devices
    pub const PICTURE_SIZES: &[Size] = &[
        Size::new(640, 480),
        Size::new(1600, 1200),
        Size::new(1920, 1080),
    ];

    /// Profile for `VideoQuality::High`
    pub const HIGH_PROFILE: CamcorderProfile = CamcorderProfile {
        width: 1920,
        height: 1080,
        frame_rate: 30,
        bitrate_kbps: 16_000,
    };

    /// Profile for `VideoQuality::Low`
    pub const LOW_PROFILE: CamcorderProfile = CamcorderProfile {
        width: 640,
        height: 480,
        frame_rate: 30,
        bitrate_kbps: 2_000,
    };

    /// Bytes written per second of virtual recording
    pub const BYTES_PER_SECOND: usize = 4096;
}
