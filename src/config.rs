// SPDX-License-Identifier: GPL-3.0-only

//! Persisted user configuration

use crate::backends::camera::{Facing, VideoQuality};
use crate::constants::{self, PICTURE_QUALITY};
use crate::errors::SessionResult;
use crate::storage::MediaStore;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory for photos and videos (None = `~/Pictures/Camera`)
    pub media_dir: Option<PathBuf>,
    /// Recording quality preset
    pub video_quality: VideoQuality,
    /// Camera to open first (None = back if present, else front)
    pub default_facing: Option<Facing>,
    /// JPEG quality for still pictures (0-100)
    pub picture_quality: u8,
    /// Re-apply the last flash mode when a session is restored
    pub remember_flash_mode: bool,
    /// Record an audio track with videos
    pub record_audio: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            media_dir: None,
            video_quality: VideoQuality::default(), // Default to High
            default_facing: None,
            picture_quality: PICTURE_QUALITY,
            remember_flash_mode: true,
            record_audio: true,
        }
    }
}

impl Config {
    /// `<config dir>/camera-session/config.json`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| {
            dir.join(constants::config::APP_DIR)
                .join(constants::config::FILE_NAME)
        })
    }

    /// Load from the default path, falling back to defaults
    pub fn load() -> Self {
        match Self::default_path() {
            Some(path) => Self::load_from(&path),
            None => {
                warn!("No config directory available, using defaults");
                Self::default()
            }
        }
    }

    /// Load from `path`; a missing or unreadable file yields the defaults
    pub fn load_from(path: &Path) -> Self {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) => {
                debug!(path = %path.display(), error = %e, "Config not readable, using defaults");
                return Self::default();
            }
        };

        match serde_json::from_str(&contents) {
            Ok(config) => config,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Invalid config, using defaults");
                Self::default()
            }
        }
    }

    /// Save to `path`, creating parent directories
    pub fn save_to(&self, path: &Path) -> SessionResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        debug!(path = %path.display(), "Saved config");
        Ok(())
    }

    /// Save to the default path
    pub fn save(&self) -> SessionResult<()> {
        let path = Self::default_path().ok_or_else(|| {
            crate::errors::SessionError::Config("no config directory available".to_string())
        })?;
        self.save_to(&path)
    }

    /// Media store for the configured directory
    pub fn media_store(&self) -> MediaStore {
        match &self.media_dir {
            Some(dir) => MediaStore::new(dir),
            None => MediaStore::default(),
        }
    }
}
