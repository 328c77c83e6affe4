// SPDX-License-Identifier: GPL-3.0-only

//! Session state enums and the restorable snapshot

use crate::backends::camera::Facing;
use crate::constants;
use crate::errors::SessionResult;
use crate::flash::FlashMode;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Whether preview frames are flowing to the bound surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PreviewState {
    #[default]
    Stopped,
    Running,
}

/// Recording sub-state
///
/// `Prepared` only exists between recorder prepare and start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecordingState {
    #[default]
    Idle,
    Prepared,
    Recording,
}

/// What the shutter button currently does
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CaptureMode {
    #[default]
    Photo,
    Video,
}

/// Small state kept across UI teardown and restored on the next open
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SessionState {
    pub facing: Facing,
    pub flash_mode: Option<FlashMode>,
    pub capture_mode: CaptureMode,
}

impl SessionState {
    pub fn to_json(&self) -> SessionResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> SessionResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// `<config dir>/camera-session/state.json`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| {
            dir.join(constants::config::APP_DIR)
                .join(constants::config::STATE_FILE_NAME)
        })
    }

    /// Load a saved state; `None` if there is none or it is unreadable
    pub fn load_from(path: &Path) -> Option<Self> {
        let json = std::fs::read_to_string(path).ok()?;
        match Self::from_json(&json) {
            Ok(state) => Some(state),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Ignoring invalid session state");
                None
            }
        }
    }

    pub fn save_to(&self, path: &Path) -> SessionResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_json()?)?;
        debug!(path = %path.display(), "Saved session state");
        Ok(())
    }
}
