// SPDX-License-Identifier: MPL-2.0

//! Camera backend abstraction
//!
//! The session core never talks to the platform directly. Every hardware
//! interaction goes through one of the collaborator traits below, so the same
//! session logic runs against a real OS camera API or the in-process
//! [`virtual_camera`](crate::backends::virtual_camera) backend.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────┐
//! │   CameraSession     │  ← Exclusive owner of one device
//! └──────────┬──────────┘
//!            │
//!     ┌──────┼──────────────┬──────────────────┐
//!     ▼      ▼              ▼                  ▼
//! DeviceEnumerator   DeviceHandle    RecorderBackend   PreviewSurface
//!  (list / open)   (params, preview,   (bind → Recorder)  (render target)
//!                   picture, lock)
//! ```

pub mod types;

pub use types::*;

/// Callback receiving the encoded bytes of a taken picture
pub type PictureCallback = Box<dyn FnOnce(DeviceResult<Vec<u8>>) + Send + 'static>;

/// Lists physical cameras and hands out exclusive handles
pub trait DeviceEnumerator: Send + Sync {
    /// Enumerate available cameras
    fn list_devices(&self) -> Vec<CameraInfo>;

    /// Open a camera exclusively
    ///
    /// # Returns
    /// * `Ok(handle)` - The caller now owns the device until `release`
    /// * `Err(DeviceError::Busy)` - Device is held by another client
    /// * `Err(DeviceError)` - Device missing or access denied
    fn open(&self, id: DeviceId) -> DeviceResult<Box<dyn DeviceHandle>>;
}

/// Exclusive OS-level reference to an opened camera
pub trait DeviceHandle: Send {
    /// Id the handle was opened with
    fn id(&self) -> DeviceId;

    /// Read the full parameter set
    fn parameters(&self) -> DeviceResult<CameraParameters>;

    /// Write the full parameter set
    ///
    /// Devices silently keep their current value for settings they do not
    /// support (e.g. an unknown flash mode).
    fn set_parameters(&mut self, params: &CameraParameters) -> DeviceResult<()>;

    /// Attach the surface that receives preview frames
    fn set_preview_display(&mut self, surface: &dyn PreviewSurface) -> DeviceResult<()>;

    fn start_preview(&mut self) -> DeviceResult<()>;

    fn stop_preview(&mut self) -> DeviceResult<()>;

    /// Clockwise rotation applied to preview frames
    fn set_display_orientation(&mut self, degrees: u32) -> DeviceResult<()>;

    /// Trigger a still capture
    ///
    /// A synchronous `Err` means the request was rejected and `callback` is
    /// dropped without being called. Otherwise `callback` runs at most once,
    /// possibly on another thread. Pending callbacks are dropped on release.
    fn take_picture(&mut self, callback: PictureCallback) -> DeviceResult<()>;

    /// Hand the device over to a recorder
    fn unlock(&mut self) -> DeviceResult<()>;

    /// Take the device back after a recorder released it
    fn lock(&mut self) -> DeviceResult<()>;

    /// Re-establish the connection after a recorder used the device
    fn reconnect(&mut self) -> DeviceResult<()>;

    /// Encoder profile for a quality preset, if the device has one
    fn camcorder_profile(&self, quality: VideoQuality) -> Option<CamcorderProfile>;

    /// Release the device; further calls fail with `DeviceError::Released`
    fn release(&mut self);
}

/// Platform render target for live preview frames
pub trait PreviewSurface {
    /// Width of the container the surface lives in
    fn width(&self) -> u32;

    /// Height of the container the surface lives in
    fn height(&self) -> u32;

    /// Width the surface was laid out with
    fn measured_width(&self) -> u32;

    /// Request a new layout size
    fn set_layout_size(&mut self, width: u32, height: u32);
}

/// Creates recorders bound to an opened (and unlocked) device
pub trait RecorderBackend: Send + Sync {
    fn bind(
        &self,
        device: &mut dyn DeviceHandle,
        request: &RecordingRequest,
    ) -> DeviceResult<Box<dyn Recorder>>;
}

/// OS-level audio/video encoder
pub trait Recorder: Send {
    fn prepare(&mut self) -> DeviceResult<()>;

    fn start(&mut self) -> DeviceResult<()>;

    /// Finalize the output file
    ///
    /// Fails when no valid data was recorded; the file is then unusable.
    fn stop(&mut self) -> DeviceResult<()>;

    /// Return to the unconfigured state
    fn reset(&mut self);

    /// Free the encoder; the recorder must not be used afterwards
    fn release(&mut self);
}

/// First camera with the requested facing
pub fn find_camera(devices: &dyn DeviceEnumerator, facing: Facing) -> Option<CameraInfo> {
    devices
        .list_devices()
        .into_iter()
        .find(|info| info.facing == facing)
}

/// Check if a front camera exists
pub fn has_front_camera(devices: &dyn DeviceEnumerator) -> bool {
    find_camera(devices, Facing::Front).is_some()
}

/// Check if a back camera exists
pub fn has_back_camera(devices: &dyn DeviceEnumerator) -> bool {
    find_camera(devices, Facing::Back).is_some()
}

/// Check if any camera exists
pub fn has_camera(devices: &dyn DeviceEnumerator) -> bool {
    !devices.list_devices().is_empty()
}

/// Check if both a front and a back camera exist
pub fn has_two_cameras(devices: &dyn DeviceEnumerator) -> bool {
    has_front_camera(devices) && has_back_camera(devices)
}

/// Facing to start with: back if present, otherwise front
pub fn default_facing(devices: &dyn DeviceEnumerator) -> Option<Facing> {
    if has_back_camera(devices) {
        Some(Facing::Back)
    } else if has_front_camera(devices) {
        Some(Facing::Front)
    } else {
        None
    }
}
