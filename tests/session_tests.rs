// SPDX-License-Identifier: MPL-2.0

//! Integration tests for the camera session against the virtual backend

use camera_session::backends::camera::{DeviceId, Facing, PreviewSurface, Rotation, Size};
use camera_session::backends::virtual_camera::{
    Faults, HardwareCall, PictureDelivery, VirtualBackend, VirtualCameraSpec,
};
use camera_session::{
    CameraSession, CaptureMode, Config, FlashMode, PreviewState, RecordingState, SessionError,
    SessionState,
};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;
use std::time::Duration;

struct TestSurface {
    width: u32,
    height: u32,
    layout: (u32, u32),
}

impl TestSurface {
    fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            layout: (width, height),
        }
    }
}

impl PreviewSurface for TestSurface {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn measured_width(&self) -> u32 {
        self.layout.0
    }

    fn set_layout_size(&mut self, width: u32, height: u32) {
        self.layout = (width, height);
    }
}

fn test_config(dir: &Path) -> Config {
    Config {
        media_dir: Some(dir.join("media")),
        ..Config::default()
    }
}

fn open(backend: &VirtualBackend, id: u32, config: &Config) -> CameraSession {
    CameraSession::open(backend, Arc::new(backend.clone()), DeviceId(id), config).unwrap()
}

fn count_calls(backend: &VirtualBackend, matches: impl Fn(&HardwareCall) -> bool) -> usize {
    backend.journal().iter().filter(|call| matches(call)).count()
}

fn media_files(config: &Config) -> usize {
    std::fs::read_dir(config.media_store().directory())
        .map(|entries| entries.count())
        .unwrap_or(0)
}

// ===== Open =====

#[test]
fn test_open_caches_capabilities() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    let backend = VirtualBackend::with_default_cameras();

    let mut back = open(&backend, 0, &config);
    assert_eq!(back.facing(), Facing::Back);
    assert!(!back.is_front());
    assert_eq!(
        back.flash_modes().unwrap(),
        vec![FlashMode::Auto, FlashMode::On, FlashMode::Off]
    );
    assert_eq!(back.supported_preview_sizes().len(), 3);
    assert_eq!(back.preview_state(), PreviewState::Stopped);
    assert_eq!(back.recording_state(), RecordingState::Idle);
    assert!(backend.is_held(DeviceId(0)));

    let front = open(&backend, 1, &config);
    assert!(front.is_front());
    assert!(front.flash_modes().unwrap().is_empty());

    back.release().unwrap();
    assert!(!backend.is_held(DeviceId(0)));
}

#[test]
fn test_open_held_device_fails() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    let backend = VirtualBackend::with_default_cameras();

    let _first = open(&backend, 0, &config);
    let second = CameraSession::open(&backend, Arc::new(backend.clone()), DeviceId(0), &config);
    assert!(matches!(second, Err(SessionError::DeviceUnavailable(_))));
}

#[test]
fn test_open_unknown_or_denied_device_fails() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    let backend = VirtualBackend::with_default_cameras();
    let recorders = Arc::new(backend.clone());

    let unknown = CameraSession::open(&backend, recorders.clone(), DeviceId(9), &config);
    assert!(matches!(unknown, Err(SessionError::DeviceUnavailable(_))));

    backend.set_faults(Faults {
        deny_open: true,
        ..Faults::default()
    });
    let denied = CameraSession::open(&backend, recorders, DeviceId(0), &config);
    assert!(matches!(denied, Err(SessionError::DeviceUnavailable(_))));
    assert!(!backend.is_held(DeviceId(0)));
}

#[test]
fn test_open_facing() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());

    let empty = VirtualBackend::new(Vec::new());
    let result = CameraSession::open_facing(&empty, Arc::new(empty.clone()), Facing::Back, &config);
    assert!(matches!(result, Err(SessionError::NoCameraFound)));

    let back_only = VirtualBackend::new(vec![VirtualCameraSpec::back(0)]);
    let recorders = Arc::new(back_only.clone());
    let result = CameraSession::open_facing(&back_only, recorders.clone(), Facing::Front, &config);
    assert!(matches!(result, Err(SessionError::DeviceUnavailable(_))));

    let session =
        CameraSession::open_facing(&back_only, recorders, Facing::Back, &config).unwrap();
    assert_eq!(session.id(), DeviceId(0));
}

#[test]
fn test_drop_releases_device() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    let backend = VirtualBackend::with_default_cameras();

    {
        let _session = open(&backend, 0, &config);
        assert!(backend.is_held(DeviceId(0)));
    }
    assert!(!backend.is_held(DeviceId(0)));
}

// ===== Preview =====

#[test]
fn test_bind_preview_selects_nearest_size() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    let sizes = vec![Size::new(640, 480), Size::new(1280, 720)];
    let backend = VirtualBackend::new(vec![
        VirtualCameraSpec::back(0).with_sizes(sizes.clone(), sizes),
    ]);
    let mut session = open(&backend, 0, &config);
    let mut surface = TestSurface::new(1000, 560);

    let preview = session.bind_preview(&mut surface, 1000, 560).unwrap();

    assert_eq!(preview, Size::new(1280, 720));
    let params = backend.device_parameters(DeviceId(0)).unwrap();
    assert_eq!(params.preview_size, Some(Size::new(1280, 720)));
    assert_eq!(params.picture_size, Some(Size::new(1280, 720)));
    // Layout follows the preview aspect: 1000 * 1280 / 720
    assert_eq!(surface.layout, (1000, 1777));
    assert_eq!(session.preview_state(), PreviewState::Running);
    assert!(backend.is_previewing(DeviceId(0)));
}

#[test]
fn test_bind_preview_rejected_parameters() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    let backend = VirtualBackend::with_default_cameras();
    let mut session = open(&backend, 0, &config);
    backend.update_faults(|faults| faults.fail_set_parameters = true);

    let result = session.bind_preview(&mut TestSurface::new(720, 1280), 720, 1280);

    assert!(matches!(result, Err(SessionError::Configuration(_))));
    assert_eq!(session.preview_state(), PreviewState::Stopped);
    assert!(!backend.is_previewing(DeviceId(0)));
}

#[test]
fn test_rebind_while_previewing_keeps_display() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    let backend = VirtualBackend::with_default_cameras();
    let mut session = open(&backend, 0, &config);
    let mut surface = TestSurface::new(720, 1280);

    session.prepare_for_photo(&mut surface).unwrap();
    session.prepare_for_photo(&mut surface).unwrap();

    assert_eq!(
        count_calls(&backend, |call| matches!(call, HardwareCall::SetPreviewDisplay(_))),
        1
    );
    assert_eq!(
        count_calls(&backend, |call| matches!(call, HardwareCall::StartPreview(_))),
        1
    );
}

#[test]
fn test_prepare_for_photo_and_video() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    let backend = VirtualBackend::with_default_cameras();
    let mut session = open(&backend, 0, &config);
    let mut surface = TestSurface::new(720, 1280);

    let preview = session.prepare_for_photo(&mut surface).unwrap();
    assert_eq!(preview, Size::new(1280, 720));
    assert_eq!(session.capture_mode(), CaptureMode::Photo);
    assert_eq!(
        backend.device_parameters(DeviceId(0)).unwrap().picture_size,
        Some(Size::new(1920, 1080))
    );

    let preview = session.prepare_for_video(&mut surface).unwrap();
    assert_eq!(preview, Size::new(1920, 1080));
    assert_eq!(session.capture_mode(), CaptureMode::Video);
}

#[test]
fn test_start_preview_needs_surface() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    let backend = VirtualBackend::with_default_cameras();
    let mut session = open(&backend, 0, &config);

    assert!(matches!(
        session.start_preview(),
        Err(SessionError::Configuration(_))
    ));
    assert_eq!(session.preview_state(), PreviewState::Stopped);
}

#[test]
fn test_preview_start_stop_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    let backend = VirtualBackend::with_default_cameras();
    let mut session = open(&backend, 0, &config);
    session
        .prepare_for_photo(&mut TestSurface::new(720, 1280))
        .unwrap();

    session.start_preview().unwrap();
    session.stop_preview().unwrap();
    session.stop_preview().unwrap();
    assert_eq!(session.preview_state(), PreviewState::Stopped);
    assert!(!backend.is_previewing(DeviceId(0)));

    session.start_preview().unwrap();
    assert_eq!(
        count_calls(&backend, |call| matches!(call, HardwareCall::StartPreview(_))),
        2
    );
    assert_eq!(
        count_calls(&backend, |call| matches!(call, HardwareCall::StopPreview(_))),
        1
    );

    session.unbind_preview().unwrap();
    assert!(matches!(
        session.start_preview(),
        Err(SessionError::Configuration(_))
    ));
}

// ===== Orientation =====

#[test]
fn test_update_orientation() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    let backend = VirtualBackend::with_default_cameras();
    let mut back = open(&backend, 0, &config);
    let mut front = open(&backend, 1, &config);

    assert_eq!(back.update_orientation(Rotation::Rotate270).unwrap(), 180);
    assert_eq!(back.orientation_degrees(), 180);
    assert_eq!(backend.display_orientation(DeviceId(0)), Some(180));

    assert_eq!(front.update_orientation(Rotation::Rotate0).unwrap(), 90);
    assert_eq!(backend.display_orientation(DeviceId(1)), Some(90));
}

// ===== Flash =====

#[test]
fn test_set_flash_mode() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    let backend = VirtualBackend::with_default_cameras();
    let mut session = open(&backend, 0, &config);

    assert_eq!(session.flash_mode().unwrap(), Some(FlashMode::Off));
    session.set_flash_mode(FlashMode::On).unwrap();

    assert_eq!(session.flash_mode().unwrap(), Some(FlashMode::On));
    assert_eq!(
        backend
            .device_parameters(DeviceId(0))
            .unwrap()
            .flash_mode
            .as_deref(),
        Some("on")
    );
}

#[test]
fn test_unsupported_flash_mode_is_ignored() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    let backend = VirtualBackend::new(vec![
        VirtualCameraSpec::back(0).with_flash_modes(Some(vec!["off", "on", "red-eye"])),
    ]);
    let mut session = open(&backend, 0, &config);
    assert_eq!(
        session.flash_modes().unwrap(),
        vec![FlashMode::On, FlashMode::Off]
    );

    let calls = backend.hardware_calls();
    session.set_flash_mode(FlashMode::Auto).unwrap();
    assert_eq!(backend.hardware_calls(), calls);
    assert_eq!(session.flash_mode().unwrap(), Some(FlashMode::Off));
}

#[test]
fn test_flash_on_camera_without_flash() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    let backend = VirtualBackend::with_default_cameras();
    let mut front = open(&backend, 1, &config);

    front.set_flash_mode(FlashMode::On).unwrap();
    assert_eq!(front.flash_mode().unwrap(), None);
}

// ===== Photo =====

#[test]
fn test_capture_photo_single_flight() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    let sizes = vec![Size::new(64, 48)];
    let backend = VirtualBackend::new(vec![
        VirtualCameraSpec::back(0).with_sizes(sizes.clone(), sizes),
    ]);
    backend.set_picture_delivery(PictureDelivery::Deferred);
    let mut session = open(&backend, 0, &config);

    let delivered = Arc::new(AtomicUsize::new(0));
    let (sender, receiver) = mpsc::channel();
    let counter = delivered.clone();
    session
        .capture_photo(move |result| {
            counter.fetch_add(1, Ordering::SeqCst);
            sender.send(result).unwrap();
        })
        .unwrap();
    assert!(session.is_capturing());

    let calls = backend.hardware_calls();
    let second = session.capture_photo(|_| panic!("second capture must not be delivered"));
    assert!(matches!(second, Err(SessionError::CaptureInProgress)));
    assert_eq!(backend.hardware_calls(), calls);

    assert_eq!(backend.deliver_pending_pictures(), 1);
    assert_eq!(delivered.load(Ordering::SeqCst), 1);
    assert!(!session.is_capturing());

    let photo = receiver.recv().unwrap().unwrap();
    assert_eq!((photo.width, photo.height), (64, 48));
    assert_eq!(&photo.data[..2], &[0xFF, 0xD8]);
    assert!(!photo.is_front);
}

#[test]
fn test_capture_photo_reports_orientation() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    let backend = VirtualBackend::with_default_cameras();
    let mut front = open(&backend, 1, &config);
    front.update_orientation(Rotation::Rotate90).unwrap();

    let (sender, receiver) = mpsc::channel();
    front
        .capture_photo(move |result| sender.send(result).unwrap())
        .unwrap();

    let photo = receiver
        .recv_timeout(Duration::from_secs(10))
        .unwrap()
        .unwrap();
    assert!(photo.is_front);
    assert_eq!(photo.orientation_degrees, 0);
}

#[test]
fn test_capture_photo_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    let backend = VirtualBackend::with_default_cameras();
    backend.set_picture_delivery(PictureDelivery::Deferred);
    backend.update_faults(|faults| faults.fail_take_picture = true);
    let mut session = open(&backend, 0, &config);

    let result = session.capture_photo(|_| panic!("rejected capture must not be delivered"));
    assert!(matches!(result, Err(SessionError::Capture(_))));
    assert!(!session.is_capturing());
    assert_eq!(backend.pending_pictures(), 0);

    backend.update_faults(|faults| faults.fail_take_picture = false);
    session.capture_photo(|_| {}).unwrap();
    assert_eq!(backend.pending_pictures(), 1);
}

#[test]
fn test_capture_photo_delivery_error() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    let backend = VirtualBackend::with_default_cameras();
    backend.set_picture_delivery(PictureDelivery::Deferred);
    backend.update_faults(|faults| faults.fail_picture_delivery = true);
    let mut session = open(&backend, 0, &config);

    let (sender, receiver) = mpsc::channel();
    session
        .capture_photo(move |result| sender.send(result).unwrap())
        .unwrap();
    backend.deliver_pending_pictures();

    assert!(matches!(
        receiver.recv().unwrap(),
        Err(SessionError::Capture(_))
    ));
    assert!(!session.is_capturing());
}

#[test]
fn test_pending_picture_dropped_on_release() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    let backend = VirtualBackend::with_default_cameras();
    backend.set_picture_delivery(PictureDelivery::Deferred);
    let mut session = open(&backend, 0, &config);

    session
        .capture_photo(|_| panic!("released camera must not deliver"))
        .unwrap();
    session.release().unwrap();

    assert_eq!(backend.deliver_pending_pictures(), 0);
}

// ===== Video =====

#[test]
fn test_record_video() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    let backend = VirtualBackend::with_default_cameras();
    let mut session = open(&backend, 0, &config);
    session
        .prepare_for_video(&mut TestSurface::new(720, 1280))
        .unwrap();

    let path = session.start_recording().unwrap();
    assert_eq!(session.recording_state(), RecordingState::Recording);
    assert_eq!(session.pending_output_file(), Some(path.as_path()));
    assert!(path.starts_with(config.media_store().directory()));
    let name = path.file_name().unwrap().to_string_lossy().to_string();
    assert!(name.starts_with("VID_") && name.ends_with(".mp4"), "{}", name);
    assert!(!backend.is_locked(DeviceId(0)));

    let saved = session.stop_recording().unwrap();
    assert_eq!(saved.as_deref(), Some(path.as_path()));
    assert!(std::fs::metadata(&path).unwrap().len() > 0);
    assert_eq!(session.recording_state(), RecordingState::Idle);
    assert_eq!(session.pending_output_file(), None);
    assert!(backend.is_locked(DeviceId(0)));

    let journal = backend.journal();
    let release = journal
        .iter()
        .position(|call| matches!(call, HardwareCall::RecorderRelease(_)))
        .unwrap();
    let reconnect = journal
        .iter()
        .position(|call| matches!(call, HardwareCall::Reconnect(_)))
        .unwrap();
    assert!(release < reconnect);
}

#[test]
fn test_recording_is_exclusive() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    let backend = VirtualBackend::with_default_cameras();
    let mut session = open(&backend, 0, &config);

    session.start_recording().unwrap();
    assert!(matches!(
        session.start_recording(),
        Err(SessionError::RecordingInProgress)
    ));
    assert!(matches!(
        session.capture_photo(|_| {}),
        Err(SessionError::RecordingInProgress)
    ));
    assert_eq!(media_files(&config), 1);
}

#[test]
fn test_stop_recording_while_idle() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    let backend = VirtualBackend::with_default_cameras();
    let mut session = open(&backend, 0, &config);

    assert!(matches!(
        session.stop_recording(),
        Err(SessionError::NotRecording)
    ));
}

#[test]
fn test_stop_failure_discards_file() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    let backend = VirtualBackend::with_default_cameras();
    let mut session = open(&backend, 0, &config);

    let path = session.start_recording().unwrap();
    assert!(path.exists());
    backend.update_faults(|faults| faults.fail_recorder_stop = true);

    assert_eq!(session.stop_recording().unwrap(), None);
    assert!(!path.exists());
    assert_eq!(session.recording_state(), RecordingState::Idle);
    assert!(backend.is_locked(DeviceId(0)));
}

#[test]
fn test_prepare_failure_recovers() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    let backend = VirtualBackend::with_default_cameras();
    let mut session = open(&backend, 0, &config);
    backend.update_faults(|faults| faults.fail_recorder_prepare = true);

    assert!(matches!(
        session.start_recording(),
        Err(SessionError::Prepare(_))
    ));
    assert_eq!(session.recording_state(), RecordingState::Idle);
    assert_eq!(session.pending_output_file(), None);
    assert_eq!(media_files(&config), 0);
    assert!(backend.is_locked(DeviceId(0)));

    backend.set_faults(Faults::default());
    let path = session.start_recording().unwrap();
    assert!(path.exists());
}

#[test]
fn test_start_failure_deletes_partial_file() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    let backend = VirtualBackend::with_default_cameras();
    let mut session = open(&backend, 0, &config);
    backend.update_faults(|faults| faults.fail_recorder_start = true);

    assert!(matches!(
        session.start_recording(),
        Err(SessionError::Prepare(_))
    ));
    assert_eq!(media_files(&config), 0);
    assert_eq!(session.recording_state(), RecordingState::Idle);
    assert!(backend.is_locked(DeviceId(0)));
}

#[test]
fn test_back_to_back_recordings_keep_first_video() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    let backend = VirtualBackend::with_default_cameras();
    let mut session = open(&backend, 0, &config);

    session.start_recording().unwrap();
    let first = session.stop_recording().unwrap().unwrap();
    let first_video = std::fs::read(&first).unwrap();

    let second = session.start_recording().unwrap();
    assert_ne!(second, first);
    assert_eq!(std::fs::read(&first).unwrap(), first_video);

    let second = session.stop_recording().unwrap().unwrap();
    assert!(second.exists());
    assert_eq!(std::fs::read(&first).unwrap(), first_video);
    assert_eq!(media_files(&config), 2);
}

#[test]
fn test_failed_start_keeps_previous_video() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    let backend = VirtualBackend::with_default_cameras();
    let mut session = open(&backend, 0, &config);

    session.start_recording().unwrap();
    let saved = session.stop_recording().unwrap().unwrap();
    let saved_video = std::fs::read(&saved).unwrap();

    backend.update_faults(|faults| faults.fail_recorder_prepare = true);
    assert!(matches!(
        session.start_recording(),
        Err(SessionError::Prepare(_))
    ));

    assert_eq!(std::fs::read(&saved).unwrap(), saved_video);
    assert_eq!(media_files(&config), 1);
}

#[test]
fn test_reconnect_failure_still_finishes_stop() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    let backend = VirtualBackend::with_default_cameras();
    let mut session = open(&backend, 0, &config);

    let path = session.start_recording().unwrap();
    backend.update_faults(|faults| faults.fail_reconnect = true);

    assert_eq!(session.stop_recording().unwrap(), Some(path));
    assert_eq!(session.recording_state(), RecordingState::Idle);
    assert!(backend.is_locked(DeviceId(0)));
}

#[test]
fn test_release_while_recording_keeps_video() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    let backend = VirtualBackend::with_default_cameras();
    let mut session = open(&backend, 0, &config);
    session
        .prepare_for_video(&mut TestSurface::new(720, 1280))
        .unwrap();

    let path = session.start_recording().unwrap();
    session.release().unwrap();

    assert!(path.exists());
    assert!(session.is_released());
    assert!(!backend.is_held(DeviceId(0)));
    assert!(!backend.is_previewing(DeviceId(0)));
}

// ===== Release =====

#[test]
fn test_operations_after_release_fail() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    let backend = VirtualBackend::with_default_cameras();
    let mut session = open(&backend, 0, &config);
    session.release().unwrap();

    let calls = backend.hardware_calls();
    let mut surface = TestSurface::new(720, 1280);
    let invalid = |result: Result<(), SessionError>| {
        assert!(
            matches!(result, Err(SessionError::InvalidState(_))),
            "{:?}",
            result
        );
    };

    invalid(session.release());
    invalid(session.set_flash_mode(FlashMode::On));
    invalid(session.flash_mode().map(|_| ()));
    invalid(session.flash_modes().map(|_| ()));
    invalid(session.bind_preview(&mut surface, 720, 1280).map(|_| ()));
    invalid(session.prepare_for_photo(&mut surface).map(|_| ()));
    invalid(session.prepare_for_video(&mut surface).map(|_| ()));
    invalid(session.start_preview());
    invalid(session.stop_preview());
    invalid(session.update_orientation(Rotation::Rotate90).map(|_| ()));
    invalid(session.capture_photo(|_| panic!("released session must not capture")));
    invalid(session.start_recording().map(|_| ()));
    invalid(session.stop_recording().map(|_| ()));
    invalid(session.snapshot().map(|_| ()));
    invalid(session.restore(&SessionState::default()));

    assert_eq!(backend.hardware_calls(), calls);
}

// ===== State =====

fn read_only_state(session: &CameraSession) -> SessionState {
    session.snapshot().unwrap()
}

#[test]
fn test_queries_take_shared_borrow() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    let backend = VirtualBackend::with_default_cameras();
    let mut session = open(&backend, 0, &config);
    session.set_flash_mode(FlashMode::On).unwrap();

    let shared = &session;
    assert_eq!(shared.flash_mode().unwrap(), Some(FlashMode::On));
    assert_eq!(read_only_state(shared).flash_mode, Some(FlashMode::On));
}

#[test]
fn test_snapshot_and_restore() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    let backend = VirtualBackend::with_default_cameras();

    let mut first = open(&backend, 0, &config);
    first.set_flash_mode(FlashMode::Auto).unwrap();
    first
        .prepare_for_video(&mut TestSurface::new(720, 1280))
        .unwrap();
    let state = first.snapshot().unwrap();
    assert_eq!(
        state,
        SessionState {
            facing: Facing::Back,
            flash_mode: Some(FlashMode::Auto),
            capture_mode: CaptureMode::Video,
        }
    );
    first.set_flash_mode(FlashMode::Off).unwrap();
    first.release().unwrap();

    let state = SessionState::from_json(&state.to_json().unwrap()).unwrap();
    let mut second = open(&backend, 0, &config);
    second.restore(&state).unwrap();
    assert_eq!(second.flash_mode().unwrap(), Some(FlashMode::Auto));
    assert_eq!(second.capture_mode(), CaptureMode::Video);

    // A camera without flash keeps working with a flash state
    let mut front = open(&backend, 1, &config);
    front.restore(&state).unwrap();
    assert_eq!(front.flash_mode().unwrap(), None);
}
