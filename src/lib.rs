// SPDX-License-Identifier: MPL-2.0

//! Camera session - exclusive camera ownership for photo and video capture
//!
//! This library owns the lifecycle of one camera at a time: opening it,
//! configuring preview and picture sizes for a surface, tracking display
//! orientation, taking pictures, recording video and switching the flash.
//! Hardware failures are turned into [`SessionError`] values and never leave
//! the device locked or half-configured.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`session`]: The [`CameraSession`] state machine and background loader
//! - [`backends`]: Collaborator traits and the virtual camera backend
//! - [`flash`]: Flash modes
//! - [`config`]: User configuration handling
//! - [`storage`]: Media file naming and cleanup
//!
//! # Example
//!
//! ```no_run
//! use camera_session::backends::camera::{DeviceId, Rotation};
//! use camera_session::backends::virtual_camera::VirtualBackend;
//! use camera_session::{CameraSession, Config};
//! use std::sync::Arc;
//!
//! let backend = VirtualBackend::with_default_cameras();
//! let mut session = CameraSession::open(
//!     &backend,
//!     Arc::new(backend.clone()),
//!     DeviceId(0),
//!     &Config::default(),
//! )?;
//! session.update_orientation(Rotation::Rotate90)?;
//! session.release()?;
//! # Ok::<(), camera_session::SessionError>(())
//! ```

pub mod backends;
pub mod config;
pub mod constants;
pub mod errors;
pub mod flash;
pub mod session;
pub mod storage;

// Re-export commonly used types
pub use config::Config;
pub use errors::{SessionError, SessionResult};
pub use flash::FlashMode;
pub use session::{
    CameraLoadTask, CameraLoader, CameraSession, CapturedPhoto, CaptureMode, PreviewState,
    RecordingState, SessionState,
};
pub use storage::{MediaStore, MediaType};
