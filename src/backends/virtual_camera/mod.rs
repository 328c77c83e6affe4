// SPDX-License-Identifier: GPL-3.0-only

//! Virtual camera backend
//!
//! In-process cameras that behave like exclusive OS devices: they can only be
//! opened once, keep their parameters between opens, deliver JPEG pictures
//! asynchronously and hand themselves over to recorders that write real files.
//!
//! Every hardware call is recorded in a journal, and each call can be made to
//! fail through [`Faults`], so session behaviour under hardware errors can be
//! exercised without a device.

mod recorder;

pub use recorder::VirtualRecorder;

use crate::backends::camera::{
    CamcorderProfile, CameraInfo, CameraParameters, DeviceEnumerator, DeviceError, DeviceHandle,
    DeviceId, DeviceResult, Facing, PictureCallback, PreviewSurface, Recorder, RecorderBackend,
    RecordingRequest, Size, VideoQuality,
};
use crate::constants::{self, PICTURE_QUALITY};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, warn};

/// Description of one virtual camera
#[derive(Debug, Clone)]
pub struct VirtualCameraSpec {
    pub info: CameraInfo,
    pub preview_sizes: Vec<Size>,
    pub picture_sizes: Vec<Size>,
    /// Raw flash mode names; `None` for a camera without flash control
    pub flash_modes: Option<Vec<String>>,
    pub high_profile: Option<CamcorderProfile>,
    pub low_profile: Option<CamcorderProfile>,
}

impl VirtualCameraSpec {
    /// Back camera mounted at 90° with flash and the default size lists
    pub fn back(id: u32) -> Self {
        Self {
            info: CameraInfo {
                id: DeviceId(id),
                facing: Facing::Back,
                mount_orientation: 90,
            },
            preview_sizes: constants::virtual_camera::PREVIEW_SIZES.to_vec(),
            picture_sizes: constants::virtual_camera::PICTURE_SIZES.to_vec(),
            flash_modes: Some(vec![
                "off".to_string(),
                "auto".to_string(),
                "on".to_string(),
                "torch".to_string(),
            ]),
            high_profile: Some(constants::virtual_camera::HIGH_PROFILE),
            low_profile: Some(constants::virtual_camera::LOW_PROFILE),
        }
    }

    /// Front camera mounted at 270° without flash
    pub fn front(id: u32) -> Self {
        Self {
            info: CameraInfo {
                id: DeviceId(id),
                facing: Facing::Front,
                mount_orientation: 270,
            },
            flash_modes: None,
            ..Self::back(id)
        }
    }

    pub fn with_sizes(mut self, preview: Vec<Size>, picture: Vec<Size>) -> Self {
        self.preview_sizes = preview;
        self.picture_sizes = picture;
        self
    }

    pub fn with_flash_modes(mut self, modes: Option<Vec<&str>>) -> Self {
        self.flash_modes = modes.map(|modes| modes.into_iter().map(String::from).collect());
        self
    }

    pub fn with_mount_orientation(mut self, degrees: u32) -> Self {
        self.info.mount_orientation = degrees;
        self
    }

    fn initial_parameters(&self) -> CameraParameters {
        CameraParameters {
            preview_size: self.preview_sizes.first().copied(),
            picture_size: self.picture_sizes.first().copied(),
            flash_mode: self.flash_modes.as_ref().map(|_| "off".to_string()),
            supported_preview_sizes: self.preview_sizes.clone(),
            supported_picture_sizes: self.picture_sizes.clone(),
            supported_flash_modes: self.flash_modes.clone(),
        }
    }
}

/// Hardware calls that can be made to fail
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Faults {
    pub deny_open: bool,
    pub fail_set_parameters: bool,
    pub fail_preview_display: bool,
    /// Reject `take_picture` synchronously
    pub fail_take_picture: bool,
    /// Accept `take_picture` but report an error through the callback
    pub fail_picture_delivery: bool,
    pub fail_recorder_prepare: bool,
    pub fail_recorder_start: bool,
    pub fail_recorder_stop: bool,
    pub fail_reconnect: bool,
}

/// How taken pictures reach their callback
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PictureDelivery {
    /// Encoded and delivered on a worker thread
    #[default]
    Immediate,
    /// Queued until [`VirtualBackend::deliver_pending_pictures`]
    Deferred,
}

/// Entry of the hardware call journal
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HardwareCall {
    Open(DeviceId),
    Parameters(DeviceId),
    SetParameters(DeviceId),
    SetPreviewDisplay(DeviceId),
    StartPreview(DeviceId),
    StopPreview(DeviceId),
    SetDisplayOrientation(DeviceId, u32),
    TakePicture(DeviceId),
    Unlock(DeviceId),
    Lock(DeviceId),
    Reconnect(DeviceId),
    Release(DeviceId),
    RecorderBind(DeviceId),
    RecorderPrepare(DeviceId),
    RecorderStart(DeviceId),
    RecorderStop(DeviceId),
    RecorderReset(DeviceId),
    RecorderRelease(DeviceId),
}

/// Live state of one virtual device, kept across opens
#[derive(Debug, Clone)]
struct DeviceRuntime {
    params: CameraParameters,
    /// Token of the handle currently holding the device
    holder: Option<u64>,
    locked: bool,
    surface: Option<(u32, u32)>,
    previewing: bool,
    display_orientation: u32,
}

struct PendingPicture {
    id: DeviceId,
    token: u64,
    size: Size,
    callback: PictureCallback,
}

struct Registry {
    cameras: Vec<VirtualCameraSpec>,
    runtime: HashMap<DeviceId, DeviceRuntime>,
    faults: Faults,
    delivery: PictureDelivery,
    picture_quality: u8,
    pending: Vec<PendingPicture>,
    journal: Vec<HardwareCall>,
    next_token: u64,
}

impl Registry {
    fn spec(&self, id: DeviceId) -> Option<&VirtualCameraSpec> {
        self.cameras.iter().find(|spec| spec.info.id == id)
    }

    /// Runtime of a device, only while `token` still holds it
    fn held_runtime(&mut self, id: DeviceId, token: u64) -> DeviceResult<&mut DeviceRuntime> {
        match self.runtime.get_mut(&id) {
            Some(runtime) if runtime.holder == Some(token) => Ok(runtime),
            Some(_) => Err(DeviceError::Released),
            None => Err(DeviceError::NotFound(id)),
        }
    }

    fn is_held_by(&self, id: DeviceId, token: u64) -> bool {
        self.runtime
            .get(&id)
            .is_some_and(|runtime| runtime.holder == Some(token))
    }
}

/// Shared handle to a set of virtual cameras
///
/// Clones share the same devices, faults and journal.
#[derive(Clone)]
pub struct VirtualBackend {
    registry: Arc<Mutex<Registry>>,
}

impl VirtualBackend {
    pub fn new(cameras: Vec<VirtualCameraSpec>) -> Self {
        let runtime = cameras
            .iter()
            .map(|spec| {
                (
                    spec.info.id,
                    DeviceRuntime {
                        params: spec.initial_parameters(),
                        holder: None,
                        locked: true,
                        surface: None,
                        previewing: false,
                        display_orientation: 0,
                    },
                )
            })
            .collect();

        info!(count = cameras.len(), "Created virtual camera backend");

        Self {
            registry: Arc::new(Mutex::new(Registry {
                cameras,
                runtime,
                faults: Faults::default(),
                delivery: PictureDelivery::default(),
                picture_quality: PICTURE_QUALITY,
                pending: Vec::new(),
                journal: Vec::new(),
                next_token: 1,
            })),
        }
    }

    /// A back camera (id 0) and a front camera (id 1)
    pub fn with_default_cameras() -> Self {
        Self::new(vec![VirtualCameraSpec::back(0), VirtualCameraSpec::front(1)])
    }

    fn registry(&self) -> MutexGuard<'_, Registry> {
        lock_registry(&self.registry)
    }

    pub fn set_faults(&self, faults: Faults) {
        self.registry().faults = faults;
    }

    pub fn update_faults(&self, update: impl FnOnce(&mut Faults)) {
        update(&mut self.registry().faults);
    }

    pub fn set_picture_delivery(&self, delivery: PictureDelivery) {
        self.registry().delivery = delivery;
    }

    /// JPEG quality of rendered pictures
    pub fn set_picture_quality(&self, quality: u8) {
        self.registry().picture_quality = quality.clamp(1, 100);
    }

    /// Deliver queued pictures whose device is still held
    ///
    /// Returns the number of callbacks invoked.
    pub fn deliver_pending_pictures(&self) -> usize {
        let (pending, quality, fail) = {
            let mut registry = self.registry();
            let pending = std::mem::take(&mut registry.pending);
            let quality = registry.picture_quality;
            let fail = registry.faults.fail_picture_delivery;
            let pending: Vec<_> = pending
                .into_iter()
                .filter(|picture| registry.is_held_by(picture.id, picture.token))
                .collect();
            (pending, quality, fail)
        };

        let delivered = pending.len();
        for picture in pending {
            (picture.callback)(render_picture(picture.size, quality, fail));
        }
        delivered
    }

    /// Pictures waiting for delivery
    pub fn pending_pictures(&self) -> usize {
        self.registry().pending.len()
    }

    /// Copy of the hardware call journal
    pub fn journal(&self) -> Vec<HardwareCall> {
        self.registry().journal.clone()
    }

    /// Number of hardware calls made so far
    pub fn hardware_calls(&self) -> usize {
        self.registry().journal.len()
    }

    pub fn is_held(&self, id: DeviceId) -> bool {
        self.registry()
            .runtime
            .get(&id)
            .is_some_and(|runtime| runtime.holder.is_some())
    }

    pub fn is_previewing(&self, id: DeviceId) -> bool {
        self.registry()
            .runtime
            .get(&id)
            .is_some_and(|runtime| runtime.previewing)
    }

    pub fn is_locked(&self, id: DeviceId) -> bool {
        self.registry()
            .runtime
            .get(&id)
            .is_some_and(|runtime| runtime.locked)
    }

    pub fn display_orientation(&self, id: DeviceId) -> Option<u32> {
        self.registry()
            .runtime
            .get(&id)
            .map(|runtime| runtime.display_orientation)
    }

    /// Current device parameters, as the hardware sees them
    pub fn device_parameters(&self, id: DeviceId) -> Option<CameraParameters> {
        self.registry()
            .runtime
            .get(&id)
            .map(|runtime| runtime.params.clone())
    }
}

impl DeviceEnumerator for VirtualBackend {
    fn list_devices(&self) -> Vec<CameraInfo> {
        self.registry()
            .cameras
            .iter()
            .map(|spec| spec.info)
            .collect()
    }

    fn open(&self, id: DeviceId) -> DeviceResult<Box<dyn DeviceHandle>> {
        let mut registry = self.registry();
        registry.journal.push(HardwareCall::Open(id));

        let spec = registry.spec(id).ok_or(DeviceError::NotFound(id))?.clone();
        if registry.faults.deny_open {
            warn!(device = %id, "Virtual camera denied access");
            return Err(DeviceError::AccessDenied(format!("{} is protected", id)));
        }

        let token = registry.next_token;
        let runtime = registry
            .runtime
            .get_mut(&id)
            .ok_or(DeviceError::NotFound(id))?;
        if runtime.holder.is_some() {
            return Err(DeviceError::Busy(id));
        }
        runtime.holder = Some(token);
        runtime.locked = true;
        runtime.surface = None;
        runtime.previewing = false;
        registry.next_token += 1;

        info!(device = %id, facing = %spec.info.facing, "Opened virtual camera");

        Ok(Box::new(VirtualDevice {
            spec,
            token,
            registry: Arc::clone(&self.registry),
        }))
    }
}

impl RecorderBackend for VirtualBackend {
    fn bind(
        &self,
        device: &mut dyn DeviceHandle,
        request: &RecordingRequest,
    ) -> DeviceResult<Box<dyn Recorder>> {
        let id = device.id();
        let mut registry = self.registry();
        registry.journal.push(HardwareCall::RecorderBind(id));

        let runtime = registry
            .runtime
            .get(&id)
            .ok_or(DeviceError::NotFound(id))?;
        if runtime.holder.is_none() {
            return Err(DeviceError::Released);
        }
        if runtime.locked {
            return Err(DeviceError::Hardware(format!(
                "{} is locked by its client",
                id
            )));
        }

        debug!(device = %id, output = %request.output_path.display(), "Bound virtual recorder");
        Ok(Box::new(VirtualRecorder::new(
            id,
            request.clone(),
            Arc::clone(&self.registry),
        )))
    }
}

/// Exclusive handle to a virtual camera
pub struct VirtualDevice {
    spec: VirtualCameraSpec,
    token: u64,
    registry: Arc<Mutex<Registry>>,
}

impl VirtualDevice {
    /// Journal `call` and run `f` on the device runtime if still held
    fn call<T>(
        &self,
        call: HardwareCall,
        f: impl FnOnce(&Faults, &mut DeviceRuntime) -> DeviceResult<T>,
    ) -> DeviceResult<T> {
        let mut registry = lock_registry(&self.registry);
        registry.journal.push(call);
        let faults = registry.faults.clone();
        let runtime = registry.held_runtime(self.spec.info.id, self.token)?;
        f(&faults, runtime)
    }
}

impl DeviceHandle for VirtualDevice {
    fn id(&self) -> DeviceId {
        self.spec.info.id
    }

    fn parameters(&self) -> DeviceResult<CameraParameters> {
        self.call(HardwareCall::Parameters(self.id()), |_, runtime| {
            Ok(runtime.params.clone())
        })
    }

    fn set_parameters(&mut self, params: &CameraParameters) -> DeviceResult<()> {
        let spec = &self.spec;
        self.call(HardwareCall::SetParameters(spec.info.id), |faults, runtime| {
            if faults.fail_set_parameters {
                return Err(DeviceError::Hardware("setParameters failed".to_string()));
            }
            if let Some(size) = params.preview_size
                && !spec.preview_sizes.contains(&size)
            {
                return Err(DeviceError::InvalidParameters(format!(
                    "unsupported preview size {}",
                    size
                )));
            }
            if let Some(size) = params.picture_size
                && !spec.picture_sizes.contains(&size)
            {
                return Err(DeviceError::InvalidParameters(format!(
                    "unsupported picture size {}",
                    size
                )));
            }

            runtime.params.preview_size = params.preview_size;
            runtime.params.picture_size = params.picture_size;

            // Unsupported flash modes keep the current one
            let supported = spec.flash_modes.as_ref().is_some_and(|modes| {
                params
                    .flash_mode
                    .as_ref()
                    .is_some_and(|mode| modes.contains(mode))
            });
            if supported {
                runtime.params.flash_mode = params.flash_mode.clone();
            }
            Ok(())
        })
    }

    fn set_preview_display(&mut self, surface: &dyn PreviewSurface) -> DeviceResult<()> {
        let size = (surface.measured_width(), surface.height());
        self.call(HardwareCall::SetPreviewDisplay(self.id()), |faults, runtime| {
            if faults.fail_preview_display {
                return Err(DeviceError::Hardware("setPreviewDisplay failed".to_string()));
            }
            runtime.surface = Some(size);
            Ok(())
        })
    }

    fn start_preview(&mut self) -> DeviceResult<()> {
        self.call(HardwareCall::StartPreview(self.id()), |_, runtime| {
            if runtime.surface.is_none() {
                return Err(DeviceError::Hardware("no preview display".to_string()));
            }
            runtime.previewing = true;
            Ok(())
        })
    }

    fn stop_preview(&mut self) -> DeviceResult<()> {
        self.call(HardwareCall::StopPreview(self.id()), |_, runtime| {
            runtime.previewing = false;
            Ok(())
        })
    }

    fn set_display_orientation(&mut self, degrees: u32) -> DeviceResult<()> {
        self.call(
            HardwareCall::SetDisplayOrientation(self.id(), degrees),
            |_, runtime| {
                runtime.display_orientation = degrees % 360;
                Ok(())
            },
        )
    }

    fn take_picture(&mut self, callback: PictureCallback) -> DeviceResult<()> {
        let id = self.id();
        let (size, delivery, quality, fail) = {
            let mut registry = lock_registry(&self.registry);
            registry.journal.push(HardwareCall::TakePicture(id));
            let faults = registry.faults.clone();
            let delivery = registry.delivery;
            let quality = registry.picture_quality;
            let runtime = registry.held_runtime(id, self.token)?;
            if faults.fail_take_picture {
                return Err(DeviceError::Hardware("takePicture failed".to_string()));
            }
            if !runtime.locked {
                return Err(DeviceError::Hardware(
                    "camera is used by a recorder".to_string(),
                ));
            }
            let size = runtime
                .params
                .picture_size
                .ok_or_else(|| DeviceError::InvalidParameters("no picture size".to_string()))?;
            (size, delivery, quality, faults.fail_picture_delivery)
        };

        match delivery {
            PictureDelivery::Deferred => {
                lock_registry(&self.registry).pending.push(PendingPicture {
                    id,
                    token: self.token,
                    size,
                    callback,
                });
            }
            PictureDelivery::Immediate => {
                let registry = Arc::clone(&self.registry);
                let token = self.token;
                std::thread::spawn(move || {
                    let result = render_picture(size, quality, fail);
                    // A device released meanwhile never reports back
                    if lock_registry(&registry).is_held_by(id, token) {
                        callback(result);
                    } else {
                        debug!(device = %id, "Dropping picture for released camera");
                    }
                });
            }
        }
        Ok(())
    }

    fn unlock(&mut self) -> DeviceResult<()> {
        self.call(HardwareCall::Unlock(self.id()), |_, runtime| {
            runtime.locked = false;
            Ok(())
        })
    }

    fn lock(&mut self) -> DeviceResult<()> {
        self.call(HardwareCall::Lock(self.id()), |_, runtime| {
            runtime.locked = true;
            Ok(())
        })
    }

    fn reconnect(&mut self) -> DeviceResult<()> {
        self.call(HardwareCall::Reconnect(self.id()), |faults, _| {
            if faults.fail_reconnect {
                return Err(DeviceError::Disconnected);
            }
            Ok(())
        })
    }

    fn camcorder_profile(&self, quality: VideoQuality) -> Option<CamcorderProfile> {
        match quality {
            VideoQuality::High => self.spec.high_profile,
            VideoQuality::Low => self.spec.low_profile,
        }
    }

    fn release(&mut self) {
        let id = self.id();
        let mut registry = lock_registry(&self.registry);
        registry.journal.push(HardwareCall::Release(id));
        let token = self.token;
        if let Ok(runtime) = registry.held_runtime(id, token) {
            runtime.holder = None;
            runtime.previewing = false;
            runtime.surface = None;
            runtime.locked = true;
            info!(device = %id, "Released virtual camera");
        }
        registry
            .pending
            .retain(|picture| !(picture.id == id && picture.token == token));
    }
}

fn lock_registry(registry: &Mutex<Registry>) -> MutexGuard<'_, Registry> {
    registry.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Encode a gradient test picture as JPEG
fn render_picture(size: Size, quality: u8, fail: bool) -> DeviceResult<Vec<u8>> {
    if fail {
        return Err(DeviceError::Hardware("picture callback reported an error".to_string()));
    }

    let image = image::RgbImage::from_fn(size.width, size.height, |x, y| {
        let r = (x * 255 / size.width.max(1)) as u8;
        let g = (y * 255 / size.height.max(1)) as u8;
        image::Rgb([r, g, 128])
    });

    let mut data = Vec::new();
    image::codecs::jpeg::JpegEncoder::new_with_quality(&mut data, quality)
        .encode_image(&image)
        .map_err(|e| DeviceError::Hardware(format!("JPEG encoding failed: {}", e)))?;
    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct TestSurface;

    impl PreviewSurface for TestSurface {
        fn width(&self) -> u32 {
            720
        }
        fn height(&self) -> u32 {
            1280
        }
        fn measured_width(&self) -> u32 {
            720
        }
        fn set_layout_size(&mut self, _width: u32, _height: u32) {}
    }

    #[test]
    fn test_device_is_exclusive() {
        let backend = VirtualBackend::with_default_cameras();
        let mut first = backend.open(DeviceId(0)).unwrap();

        assert!(matches!(
            backend.open(DeviceId(0)),
            Err(DeviceError::Busy(DeviceId(0)))
        ));

        first.release();
        assert!(!backend.is_held(DeviceId(0)));
        assert!(backend.open(DeviceId(0)).is_ok());
    }

    #[test]
    fn test_unknown_device() {
        let backend = VirtualBackend::with_default_cameras();
        assert!(matches!(
            backend.open(DeviceId(7)),
            Err(DeviceError::NotFound(DeviceId(7)))
        ));
    }

    #[test]
    fn test_released_handle_fails() {
        let backend = VirtualBackend::with_default_cameras();
        let mut device = backend.open(DeviceId(0)).unwrap();
        device.release();
        assert_eq!(device.start_preview(), Err(DeviceError::Released));
    }

    #[test]
    fn test_unsupported_flash_mode_is_kept() {
        let backend = VirtualBackend::new(vec![
            VirtualCameraSpec::back(0).with_flash_modes(Some(vec!["off", "on"])),
        ]);
        let mut device = backend.open(DeviceId(0)).unwrap();

        let mut params = device.parameters().unwrap();
        params.flash_mode = Some("auto".to_string());
        device.set_parameters(&params).unwrap();

        assert_eq!(
            device.parameters().unwrap().flash_mode.as_deref(),
            Some("off")
        );
    }

    #[test]
    fn test_preview_needs_display() {
        let backend = VirtualBackend::with_default_cameras();
        let mut device = backend.open(DeviceId(0)).unwrap();
        assert!(device.start_preview().is_err());

        device.set_preview_display(&TestSurface).unwrap();
        device.start_preview().unwrap();
        assert!(backend.is_previewing(DeviceId(0)));
    }

    #[test]
    fn test_deferred_picture_dropped_on_release() {
        let backend = VirtualBackend::with_default_cameras();
        backend.set_picture_delivery(PictureDelivery::Deferred);
        let mut device = backend.open(DeviceId(0)).unwrap();

        device.take_picture(Box::new(|_| panic!("must not be delivered"))).unwrap();
        assert_eq!(backend.pending_pictures(), 1);

        device.release();
        assert_eq!(backend.deliver_pending_pictures(), 0);
    }

    #[test]
    fn test_deferred_picture_is_jpeg() {
        let backend = VirtualBackend::new(vec![VirtualCameraSpec::back(0).with_sizes(
            vec![Size::new(64, 48)],
            vec![Size::new(64, 48)],
        )]);
        backend.set_picture_delivery(PictureDelivery::Deferred);
        let mut device = backend.open(DeviceId(0)).unwrap();

        let (tx, rx) = std::sync::mpsc::channel();
        device
            .take_picture(Box::new(move |result| tx.send(result).unwrap()))
            .unwrap();
        assert_eq!(backend.deliver_pending_pictures(), 1);

        let data = rx.recv().unwrap().unwrap();
        assert_eq!(&data[..2], &[0xFF, 0xD8]);
    }

    #[test]
    fn test_recorder_needs_unlocked_device() {
        let dir = tempfile::tempdir().unwrap();
        let backend = VirtualBackend::with_default_cameras();
        let mut device = backend.open(DeviceId(0)).unwrap();
        let request = RecordingRequest {
            output_path: dir.path().join("VID_test.mp4"),
            profile: constants::virtual_camera::HIGH_PROFILE,
            orientation_hint: 90,
            with_audio: true,
        };

        assert!(backend.bind(device.as_mut(), &request).is_err());

        device.unlock().unwrap();
        assert!(backend.bind(device.as_mut(), &request).is_ok());
    }
}
