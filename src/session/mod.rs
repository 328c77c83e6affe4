// SPDX-License-Identifier: GPL-3.0-only

//! Camera session: exclusive lifecycle of one device and its recorder
//!
//! A [`CameraSession`] owns an opened device handle from `open` until
//! `release`. It configures the preview, captures stills, records video and
//! switches the flash. All hardware failures are converted into
//! [`SessionError`] values here, and every failure path leaves the session
//! reusable: no half-bound recorder, no locked-out device, no stale output
//! file.
//!
//! ```text
//!                start_recording (ok)
//!   ┌──────┐ ───────────────────────▶ ┌──────────┐  ┌───────────┐
//!   │ Idle │          prepare         │ Prepared │─▶│ Recording │
//!   └──────┘ ◀─────────────────────── └──────────┘  └───────────┘
//!      ▲   start_recording (fail)                         │
//!      └────────────────── stop_recording ────────────────┘
//! ```
//!
//! Operations after [`CameraSession::release`] fail with
//! [`SessionError::InvalidState`] and never reach the hardware.

pub mod loader;
pub mod orientation;
pub mod size_selection;
pub mod state;

pub use loader::{CameraLoadTask, CameraLoader};
pub use state::{CaptureMode, PreviewState, RecordingState, SessionState};

use crate::backends::camera::{
    self, CameraInfo, DeviceEnumerator, DeviceError, DeviceHandle, DeviceId, DeviceResult, Facing,
    PreviewSurface, Recorder, RecorderBackend, RecordingRequest, Rotation, Size, VideoQuality,
};
use crate::config::Config;
use crate::errors::{SessionError, SessionResult};
use crate::flash::FlashMode;
use crate::storage::{MediaStore, MediaType};
use size_selection::select_optimal_size;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, error, info, warn};

/// A still picture as delivered by the device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedPhoto {
    /// Encoded image bytes (JPEG)
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    /// Display orientation at the time of the shutter press
    pub orientation_degrees: u32,
    /// Taken with a front camera (image is mirrored)
    pub is_front: bool,
}

/// Exclusive owner of one opened camera
///
/// Not thread safe: all calls must come from one place (the UI
/// thread), which `&mut self` enforces. The session itself is `Send`, so it
/// can be opened on a worker and handed back.
pub struct CameraSession {
    info: CameraInfo,
    device: Option<Box<dyn DeviceHandle>>,
    recorders: Arc<dyn RecorderBackend>,
    recorder: Option<Box<dyn Recorder>>,
    media: MediaStore,
    video_quality: VideoQuality,
    record_audio: bool,
    supported_preview_sizes: Vec<Size>,
    supported_picture_sizes: Vec<Size>,
    flash_modes: Vec<FlashMode>,
    orientation_degrees: u32,
    preview: PreviewState,
    surface_bound: bool,
    recording: RecordingState,
    pending_output: Option<PathBuf>,
    capture_in_flight: Arc<AtomicBool>,
    capture_mode: CaptureMode,
}

impl CameraSession {
    /// Open a camera by id
    ///
    /// Blocks on the hardware; call it off the UI thread (see
    /// [`CameraLoader`]).
    ///
    /// # Returns
    /// * `Ok(CameraSession)` - The device is now held exclusively
    /// * `Err(SessionError::DeviceUnavailable)` - Device missing, held or denied
    pub fn open(
        devices: &dyn DeviceEnumerator,
        recorders: Arc<dyn RecorderBackend>,
        id: DeviceId,
        config: &Config,
    ) -> SessionResult<Self> {
        let info = devices
            .list_devices()
            .into_iter()
            .find(|info| info.id == id)
            .ok_or_else(|| SessionError::DeviceUnavailable(format!("{} does not exist", id)))?;

        let mut device = devices.open(id).map_err(|e| {
            warn!(device = %id, error = %e, "Can't open camera");
            SessionError::from(e)
        })?;

        let params = match device.parameters() {
            Ok(params) => params,
            Err(e) => {
                device.release();
                return Err(SessionError::DeviceUnavailable(format!(
                    "cannot read parameters of {}: {}",
                    id, e
                )));
            }
        };

        let flash_modes = params.known_flash_modes();
        info!(
            device = %id,
            facing = %info.facing,
            mount = info.mount_orientation,
            preview_sizes = params.supported_preview_sizes.len(),
            picture_sizes = params.supported_picture_sizes.len(),
            flash_modes = ?flash_modes,
            "Camera session opened"
        );

        Ok(Self {
            info,
            device: Some(device),
            recorders,
            recorder: None,
            media: config.media_store(),
            video_quality: config.video_quality,
            record_audio: config.record_audio,
            supported_preview_sizes: params.supported_preview_sizes,
            supported_picture_sizes: params.supported_picture_sizes,
            flash_modes,
            orientation_degrees: 0,
            preview: PreviewState::Stopped,
            surface_bound: false,
            recording: RecordingState::Idle,
            pending_output: None,
            capture_in_flight: Arc::new(AtomicBool::new(false)),
            capture_mode: CaptureMode::Photo,
        })
    }

    /// Open the first camera with the requested facing
    ///
    /// `SessionError::NoCameraFound` means the hardware has no camera at all.
    pub fn open_facing(
        devices: &dyn DeviceEnumerator,
        recorders: Arc<dyn RecorderBackend>,
        facing: Facing,
        config: &Config,
    ) -> SessionResult<Self> {
        if !camera::has_camera(devices) {
            return Err(SessionError::NoCameraFound);
        }
        let info = camera::find_camera(devices, facing).ok_or_else(|| {
            SessionError::DeviceUnavailable(format!("no {} camera available", facing))
        })?;
        Self::open(devices, recorders, info.id, config)
    }

    fn device(&mut self) -> SessionResult<&mut (dyn DeviceHandle + 'static)> {
        self.device.as_deref_mut().ok_or_else(SessionError::released)
    }

    fn device_ref(&self) -> SessionResult<&(dyn DeviceHandle + 'static)> {
        self.device.as_deref().ok_or_else(SessionError::released)
    }

    fn ensure_open(&self) -> SessionResult<()> {
        if self.device.is_some() {
            Ok(())
        } else {
            Err(SessionError::released())
        }
    }

    // ===== Accessors =====

    pub fn id(&self) -> DeviceId {
        self.info.id
    }

    pub fn info(&self) -> CameraInfo {
        self.info
    }

    pub fn facing(&self) -> Facing {
        self.info.facing
    }

    pub fn is_front(&self) -> bool {
        self.info.facing == Facing::Front
    }

    pub fn orientation_degrees(&self) -> u32 {
        self.orientation_degrees
    }

    pub fn preview_state(&self) -> PreviewState {
        self.preview
    }

    pub fn recording_state(&self) -> RecordingState {
        self.recording
    }

    pub fn capture_mode(&self) -> CaptureMode {
        self.capture_mode
    }

    /// Output file of the running recording
    pub fn pending_output_file(&self) -> Option<&Path> {
        self.pending_output.as_deref()
    }

    pub fn is_capturing(&self) -> bool {
        self.capture_in_flight.load(Ordering::Acquire)
    }

    pub fn is_released(&self) -> bool {
        self.device.is_none()
    }

    pub fn supported_preview_sizes(&self) -> &[Size] {
        &self.supported_preview_sizes
    }

    pub fn supported_picture_sizes(&self) -> &[Size] {
        &self.supported_picture_sizes
    }

    // ===== Flash =====

    /// Flash modes the device supports, in Auto, On, Off order
    ///
    /// Empty when the device has no flash control.
    pub fn flash_modes(&self) -> SessionResult<Vec<FlashMode>> {
        self.ensure_open()?;
        Ok(self.flash_modes.clone())
    }

    /// Flash mode the device currently uses
    pub fn flash_mode(&self) -> SessionResult<Option<FlashMode>> {
        let params = self
            .device_ref()?
            .parameters()
            .map_err(|e| SessionError::Configuration(e.to_string()))?;
        Ok(params.current_flash_mode())
    }

    /// Apply a flash mode
    ///
    /// Modes missing from [`flash_modes`](Self::flash_modes) are ignored
    /// without touching the device.
    pub fn set_flash_mode(&mut self, mode: FlashMode) -> SessionResult<()> {
        self.ensure_open()?;
        if !self.flash_modes.contains(&mode) {
            warn!(device = %self.info.id, %mode, "Ignoring unsupported flash mode");
            return Ok(());
        }

        let device = self.device()?;
        let mut params = device
            .parameters()
            .map_err(|e| SessionError::Configuration(e.to_string()))?;
        params.flash_mode = Some(mode.device_name().to_string());
        device
            .set_parameters(&params)
            .map_err(|e| SessionError::Configuration(e.to_string()))?;

        debug!(%mode, "Flash mode applied");
        Ok(())
    }

    // ===== Preview =====

    /// Configure preview and picture sizes for a requested frame size
    ///
    /// Both sizes are picked with [`select_optimal_size`]. The surface is
    /// resized to the preview aspect ratio, bound if preview is not running
    /// yet, and preview is started.
    ///
    /// # Returns
    /// * `Ok(Size)` - The selected preview size
    /// * `Err(SessionError::Configuration)` - No size available or the device
    ///   refused the parameters or the surface
    pub fn bind_preview(
        &mut self,
        surface: &mut dyn PreviewSurface,
        width: u32,
        height: u32,
    ) -> SessionResult<Size> {
        self.ensure_open()?;
        if self.recording != RecordingState::Idle {
            return Err(SessionError::RecordingInProgress);
        }

        let picture_size = select_optimal_size(&self.supported_picture_sizes, width, height)
            .ok_or_else(|| {
                SessionError::Configuration("no supported picture size".to_string())
            })?;
        let preview_size = select_optimal_size(&self.supported_preview_sizes, width, height)
            .ok_or_else(|| {
                SessionError::Configuration("no supported preview size".to_string())
            })?;

        let preview_running = self.preview == PreviewState::Running;
        let device = self.device()?;
        let mut params = device
            .parameters()
            .map_err(|e| SessionError::Configuration(e.to_string()))?;
        params.picture_size = Some(picture_size);
        params.preview_size = Some(preview_size);
        device
            .set_parameters(&params)
            .map_err(|e| SessionError::Configuration(e.to_string()))?;

        let ratio = preview_size.width as f64 / preview_size.height as f64;
        let layout_width = surface.measured_width();
        let layout_height = (ratio * layout_width as f64) as u32;
        surface.set_layout_size(layout_width, layout_height);

        if !preview_running {
            device
                .set_preview_display(&*surface)
                .map_err(|e| SessionError::Configuration(e.to_string()))?;
            self.surface_bound = true;
        }

        info!(
            requested = %Size::new(width, height),
            preview = %preview_size,
            picture = %picture_size,
            layout = %Size::new(layout_width, layout_height),
            "Preview configured"
        );

        self.start_preview()?;
        Ok(preview_size)
    }

    /// Bind a surface for still capture, sized to its container
    pub fn prepare_for_photo(&mut self, surface: &mut dyn PreviewSurface) -> SessionResult<Size> {
        let (width, height) = (surface.width(), surface.height());
        let size = self.bind_preview(surface, width, height)?;
        self.capture_mode = CaptureMode::Photo;
        Ok(size)
    }

    /// Bind a surface for recording, sized to the camcorder profile
    pub fn prepare_for_video(&mut self, surface: &mut dyn PreviewSurface) -> SessionResult<Size> {
        let quality = self.video_quality;
        let profile = self.device()?.camcorder_profile(quality).ok_or_else(|| {
            SessionError::Configuration(format!("no {} camcorder profile", quality.display_name()))
        })?;
        let size = self.bind_preview(surface, profile.width, profile.height)?;
        self.capture_mode = CaptureMode::Video;
        Ok(size)
    }

    /// Start preview on the bound surface; no-op if already running
    pub fn start_preview(&mut self) -> SessionResult<()> {
        self.ensure_open()?;
        if self.preview == PreviewState::Running {
            return Ok(());
        }
        if !self.surface_bound {
            return Err(SessionError::Configuration(
                "no preview surface bound".to_string(),
            ));
        }
        self.device()?
            .start_preview()
            .map_err(|e| SessionError::Configuration(e.to_string()))?;
        self.preview = PreviewState::Running;
        debug!(device = %self.info.id, "Preview started");
        Ok(())
    }

    /// Stop preview; no-op if already stopped
    pub fn stop_preview(&mut self) -> SessionResult<()> {
        self.ensure_open()?;
        if self.preview == PreviewState::Stopped {
            return Ok(());
        }
        self.device()?
            .stop_preview()
            .map_err(|e| SessionError::Configuration(e.to_string()))?;
        self.preview = PreviewState::Stopped;
        debug!(device = %self.info.id, "Preview stopped");
        Ok(())
    }

    /// Stop preview and forget the surface, e.g. when it is destroyed
    pub fn unbind_preview(&mut self) -> SessionResult<()> {
        self.stop_preview()?;
        self.surface_bound = false;
        Ok(())
    }

    // ===== Orientation =====

    /// Recompute the display orientation after the screen rotated
    ///
    /// Returns the new orientation in degrees.
    pub fn update_orientation(&mut self, rotation: Rotation) -> SessionResult<u32> {
        let degrees = orientation::display_orientation(
            self.info.facing,
            self.info.mount_orientation,
            rotation,
        );
        self.device()?
            .set_display_orientation(degrees)
            .map_err(|e| SessionError::Configuration(e.to_string()))?;

        debug!(%rotation, degrees, "Camera orientation updated");
        self.orientation_degrees = degrees;
        Ok(degrees)
    }

    // ===== Capture: Photo =====

    /// Take a still picture
    ///
    /// `on_taken` runs exactly once, possibly on another thread, with the
    /// picture or a [`SessionError::Capture`]. When this returns `Err`,
    /// `on_taken` is never called. A picture outstanding when the session is
    /// released may never be delivered.
    ///
    /// # Returns
    /// * `Err(SessionError::CaptureInProgress)` - Previous picture not delivered yet
    /// * `Err(SessionError::Capture)` - The device rejected the request
    pub fn capture_photo<F>(&mut self, on_taken: F) -> SessionResult<()>
    where
        F: FnOnce(SessionResult<CapturedPhoto>) + Send + 'static,
    {
        self.ensure_open()?;
        if self.is_capturing() {
            return Err(SessionError::CaptureInProgress);
        }
        if self.recording != RecordingState::Idle {
            return Err(SessionError::RecordingInProgress);
        }

        let orientation_degrees = self.orientation_degrees;
        let is_front = self.is_front();
        let in_flight = Arc::clone(&self.capture_in_flight);

        let device = self.device()?;
        let size = device
            .parameters()
            .map_err(|e| SessionError::Capture(e.to_string()))?
            .picture_size
            .ok_or_else(|| SessionError::Capture("no picture size configured".to_string()))?;

        in_flight.store(true, Ordering::Release);
        let flag = Arc::clone(&in_flight);
        let callback = Box::new(move |result: DeviceResult<Vec<u8>>| {
            flag.store(false, Ordering::Release);
            let outcome = result
                .map(|data| CapturedPhoto {
                    data,
                    width: size.width,
                    height: size.height,
                    orientation_degrees,
                    is_front,
                })
                .map_err(|e| {
                    warn!(error = %e, "Picture delivery failed");
                    SessionError::Capture(e.to_string())
                });
            on_taken(outcome);
        });

        if let Err(e) = device.take_picture(callback) {
            in_flight.store(false, Ordering::Release);
            error!(error = %e, "Can't take picture");
            return Err(SessionError::Capture(e.to_string()));
        }

        debug!(size = %size, orientation_degrees, "Picture requested");
        Ok(())
    }

    // ===== Capture: Video =====

    /// Start recording to a new `VID_<timestamp>.mp4`
    ///
    /// The device is handed over to a recorder for the duration of the
    /// recording. On failure the recorder is torn down, the partial file
    /// deleted and the device taken back before the error is returned.
    ///
    /// # Returns
    /// * `Ok(PathBuf)` - Path the video is being written to
    /// * `Err(SessionError::Prepare)` - Recorder could not be prepared or started
    pub fn start_recording(&mut self) -> SessionResult<PathBuf> {
        self.ensure_open()?;
        if self.recording != RecordingState::Idle {
            return Err(SessionError::RecordingInProgress);
        }
        if self.is_capturing() {
            return Err(SessionError::CaptureInProgress);
        }

        let quality = self.video_quality;
        let profile = self.device()?.camcorder_profile(quality).ok_or_else(|| {
            SessionError::Prepare(format!("no {} camcorder profile", quality.display_name()))
        })?;
        let output_path = self
            .media
            .output_media_file(MediaType::Video)
            .map_err(|e| SessionError::Prepare(format!("no output file: {}", e)))?;

        // The allocated file is ours from here on; every abort path removes it
        self.pending_output = Some(output_path.clone());

        if let Err(e) = self.device()?.unlock() {
            self.teardown_recorder(true);
            return Err(SessionError::Prepare(e.to_string()));
        }

        let request = RecordingRequest {
            output_path: output_path.clone(),
            profile,
            orientation_hint: self.info.mount_orientation,
            with_audio: self.record_audio,
        };
        let recorders = Arc::clone(&self.recorders);
        let recorder = match recorders.bind(self.device()?, &request) {
            Ok(recorder) => recorder,
            Err(e) => {
                error!(error = %e, "Can't bind recorder");
                self.teardown_recorder(true);
                return Err(SessionError::Prepare(e.to_string()));
            }
        };

        info!(output = %output_path.display(), size = %profile.frame_size(), "Video saving path");
        self.recorder = Some(recorder);

        if let Err(e) = self.recorder_step(|recorder| recorder.prepare()) {
            error!(error = %e, "Recorder prepare failed");
            self.teardown_recorder(true);
            return Err(SessionError::Prepare(e.to_string()));
        }
        self.recording = RecordingState::Prepared;

        if let Err(e) = self.recorder_step(|recorder| recorder.start()) {
            error!(error = %e, "Recorder start failed");
            self.teardown_recorder(true);
            return Err(SessionError::Prepare(e.to_string()));
        }
        self.recording = RecordingState::Recording;

        info!(device = %self.info.id, "Recording started");
        Ok(output_path)
    }

    /// Stop recording and take the device back
    ///
    /// # Returns
    /// * `Ok(Some(path))` - The finished video
    /// * `Ok(None)` - The recorder failed to stop; the partial file was deleted
    /// * `Err(SessionError::NotRecording)` - Nothing is being recorded
    pub fn stop_recording(&mut self) -> SessionResult<Option<PathBuf>> {
        self.ensure_open()?;
        if self.recording != RecordingState::Recording {
            return Err(SessionError::NotRecording);
        }

        match self.recorder_step(|recorder| recorder.stop()) {
            Ok(()) => {
                let output = self.pending_output.take();
                self.teardown_recorder(false);
                info!(output = ?output, "Recording saved");
                Ok(output)
            }
            Err(e) => {
                let err = SessionError::Stop(e.to_string());
                warn!(error = %err, "Discarding partial recording");
                self.teardown_recorder(true);
                Ok(None)
            }
        }
    }

    fn recorder_step(
        &mut self,
        step: impl FnOnce(&mut dyn Recorder) -> DeviceResult<()>,
    ) -> DeviceResult<()> {
        match self.recorder.as_deref_mut() {
            Some(recorder) => step(recorder),
            None => Err(DeviceError::Hardware("no recorder bound".to_string())),
        }
    }

    /// Release the recorder and give the device back to still capture
    fn teardown_recorder(&mut self, discard_output: bool) {
        if let Some(mut recorder) = self.recorder.take() {
            recorder.reset();
            recorder.release();
        }
        if let Some(path) = self.pending_output.take() {
            if discard_output {
                MediaStore::delete_file(&path);
            } else {
                warn!(path = %path.display(), "Recording output left without owner");
            }
        }
        self.relock_device();
        self.recording = RecordingState::Idle;
    }

    fn relock_device(&mut self) {
        let Some(device) = self.device.as_deref_mut() else {
            return;
        };
        if let Err(e) = device.reconnect() {
            error!(error = %e, "Can't reconnect camera");
        }
        if let Err(e) = device.lock() {
            error!(error = %e, "Can't lock camera");
        }
    }

    // ===== State =====

    /// Snapshot of the restorable state
    pub fn snapshot(&self) -> SessionResult<SessionState> {
        Ok(SessionState {
            facing: self.info.facing,
            flash_mode: self.flash_mode()?,
            capture_mode: self.capture_mode,
        })
    }

    /// Re-apply a snapshot taken from an earlier session
    ///
    /// The flash mode is only applied when this device supports it.
    pub fn restore(&mut self, state: &SessionState) -> SessionResult<()> {
        self.ensure_open()?;
        if state.facing != self.info.facing {
            warn!(
                saved = %state.facing,
                current = %self.info.facing,
                "Restoring state saved for another camera"
            );
        }
        if let Some(mode) = state.flash_mode {
            self.set_flash_mode(mode)?;
        }
        self.capture_mode = state.capture_mode;
        Ok(())
    }

    // ===== Lifecycle =====

    /// Stop recording and preview, then release the device
    ///
    /// A recording that stops cleanly keeps its file. Calling this twice
    /// fails with [`SessionError::InvalidState`].
    pub fn release(&mut self) -> SessionResult<()> {
        self.ensure_open()?;

        if self.recording == RecordingState::Recording {
            match self.stop_recording() {
                Ok(Some(path)) => info!(path = %path.display(), "Recording stopped by release"),
                Ok(None) => {}
                Err(e) => warn!(error = %e, "Failed to stop recording on release"),
            }
        }

        if self.preview == PreviewState::Running
            && let Err(e) = self.stop_preview()
        {
            warn!(error = %e, "Failed to stop preview on release");
        }

        if let Some(mut device) = self.device.take() {
            device.release();
        }
        self.preview = PreviewState::Stopped;
        self.surface_bound = false;
        info!(device = %self.info.id, "Camera session released");
        Ok(())
    }
}

impl Drop for CameraSession {
    fn drop(&mut self) {
        if self.device.is_some() {
            warn!(device = %self.info.id, "Camera session dropped without release");
            let _ = self.release();
        }
    }
}

impl std::fmt::Debug for CameraSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CameraSession")
            .field("info", &self.info)
            .field("released", &self.is_released())
            .field("orientation_degrees", &self.orientation_degrees)
            .field("preview", &self.preview)
            .field("recording", &self.recording)
            .field("pending_output", &self.pending_output)
            .finish()
    }
}
