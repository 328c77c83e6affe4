// SPDX-License-Identifier: GPL-3.0-only

//! Camera flash modes
//!
//! Devices report flash control as a list of raw mode names. Only the three
//! modes the shutter UI can cycle through are mapped; anything else (torch,
//! red-eye reduction) is ignored.

use serde::{Deserialize, Serialize};

/// Flash operating mode
///
/// Ordering follows the flash button: Auto, On, Off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FlashMode {
    /// Flash fires when the scene is dark
    Auto,
    /// Flash always fires during capture
    On,
    /// Flash never fires
    Off,
}

impl FlashMode {
    /// Raw device name for this mode
    pub fn device_name(self) -> &'static str {
        match self {
            FlashMode::Auto => "auto",
            FlashMode::On => "on",
            FlashMode::Off => "off",
        }
    }

    /// Parse a raw device mode name
    pub fn from_device_name(name: &str) -> Option<Self> {
        match name {
            "auto" => Some(FlashMode::Auto),
            "on" => Some(FlashMode::On),
            "off" => Some(FlashMode::Off),
            _ => None,
        }
    }

    /// Next mode in `available`, wrapping around
    ///
    /// Returns `None` when `available` is empty. A mode that is not part of
    /// `available` restarts the cycle at its first entry.
    pub fn next_in(self, available: &[FlashMode]) -> Option<FlashMode> {
        let first = *available.first()?;
        let next = available
            .iter()
            .position(|mode| *mode == self)
            .map(|index| available[(index + 1) % available.len()])
            .unwrap_or(first);
        Some(next)
    }
}

impl std::fmt::Display for FlashMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.device_name())
    }
}
