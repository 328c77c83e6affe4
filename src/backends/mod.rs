// SPDX-License-Identifier: GPL-3.0-only

//! Hardware backends
//!
//! - [`camera`]: collaborator traits and shared types
//! - [`virtual_camera`]: in-process devices and recorders

pub mod camera;
pub mod virtual_camera;
