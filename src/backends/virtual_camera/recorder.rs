// SPDX-License-Identifier: GPL-3.0-only

//! Recorder bound to a virtual camera

use super::{HardwareCall, Registry, lock_registry};
use crate::backends::camera::{DeviceError, DeviceId, DeviceResult, Recorder, RecordingRequest};
use crate::constants::virtual_camera::BYTES_PER_SECOND;
use std::fs::File;
use std::io::Write;
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tracing::{debug, info};

// Start of an MP4 `ftyp` box
const MP4_HEADER: &[u8] = b"\x00\x00\x00\x18ftypmp42\x00\x00\x00\x00mp42isom";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RecorderState {
    Configured,
    Prepared,
    Recording,
    Stopped,
    Released,
}

/// Writes a placeholder MP4 stream to the requested output path
pub struct VirtualRecorder {
    device: DeviceId,
    request: RecordingRequest,
    registry: Arc<Mutex<Registry>>,
    state: RecorderState,
    file: Option<File>,
    started_at: Option<Instant>,
}

impl VirtualRecorder {
    pub(super) fn new(
        device: DeviceId,
        request: RecordingRequest,
        registry: Arc<Mutex<Registry>>,
    ) -> Self {
        Self {
            device,
            request,
            registry,
            state: RecorderState::Configured,
            file: None,
            started_at: None,
        }
    }

    /// Journal `call` and report whether `fault` is set
    fn enter(&self, call: HardwareCall, fault: impl FnOnce(&super::Faults) -> bool) -> bool {
        let mut registry = lock_registry(&self.registry);
        registry.journal.push(call);
        fault(&registry.faults)
    }

    fn expect_state(&self, expected: RecorderState, operation: &str) -> DeviceResult<()> {
        if self.state == expected {
            Ok(())
        } else {
            Err(DeviceError::Hardware(format!(
                "{} called in state {:?}",
                operation, self.state
            )))
        }
    }
}

impl Recorder for VirtualRecorder {
    fn prepare(&mut self) -> DeviceResult<()> {
        let fail = self.enter(HardwareCall::RecorderPrepare(self.device), |faults| {
            faults.fail_recorder_prepare
        });
        self.expect_state(RecorderState::Configured, "prepare")?;
        if fail {
            return Err(DeviceError::Io("recorder prepare failed".to_string()));
        }

        self.file = Some(File::create(&self.request.output_path)?);
        self.state = RecorderState::Prepared;
        debug!(
            device = %self.device,
            output = %self.request.output_path.display(),
            size = %self.request.profile.frame_size(),
            audio = self.request.with_audio,
            "Virtual recorder prepared"
        );
        Ok(())
    }

    fn start(&mut self) -> DeviceResult<()> {
        let fail = self.enter(HardwareCall::RecorderStart(self.device), |faults| {
            faults.fail_recorder_start
        });
        self.expect_state(RecorderState::Prepared, "start")?;
        if fail {
            return Err(DeviceError::Hardware("recorder start failed".to_string()));
        }

        if let Some(file) = self.file.as_mut() {
            file.write_all(MP4_HEADER)?;
        }
        self.state = RecorderState::Recording;
        self.started_at = Some(Instant::now());
        info!(device = %self.device, "Virtual recording started");
        Ok(())
    }

    fn stop(&mut self) -> DeviceResult<()> {
        let fail = self.enter(HardwareCall::RecorderStop(self.device), |faults| {
            faults.fail_recorder_stop
        });
        self.expect_state(RecorderState::Recording, "stop")?;
        self.state = RecorderState::Stopped;
        if fail {
            return Err(DeviceError::Hardware("stop failed: no valid data".to_string()));
        }

        let seconds = self
            .started_at
            .map(|start| start.elapsed().as_secs() as usize)
            .unwrap_or(0)
            .max(1);
        if let Some(mut file) = self.file.take() {
            file.write_all(&vec![0u8; BYTES_PER_SECOND * seconds])?;
            file.flush()?;
        }
        info!(device = %self.device, seconds, "Virtual recording stopped");
        Ok(())
    }

    fn reset(&mut self) {
        self.enter(HardwareCall::RecorderReset(self.device), |_| false);
        if self.state != RecorderState::Released {
            self.state = RecorderState::Configured;
        }
        self.file = None;
        self.started_at = None;
    }

    fn release(&mut self) {
        self.enter(HardwareCall::RecorderRelease(self.device), |_| false);
        self.state = RecorderState::Released;
        self.file = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::camera::{DeviceEnumerator, RecorderBackend, VideoQuality};
    use crate::backends::virtual_camera::{Faults, VirtualBackend};

    fn request(dir: &std::path::Path) -> RecordingRequest {
        RecordingRequest {
            output_path: dir.join("VID_test.mp4"),
            profile: crate::constants::virtual_camera::LOW_PROFILE,
            orientation_hint: 90,
            with_audio: false,
        }
    }

    fn bound_recorder(backend: &VirtualBackend, dir: &std::path::Path) -> Box<dyn Recorder> {
        let mut device = backend.open(DeviceId(0)).unwrap();
        assert!(device.camcorder_profile(VideoQuality::Low).is_some());
        device.unlock().unwrap();
        backend.bind(device.as_mut(), &request(dir)).unwrap()
    }

    #[test]
    fn test_record_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let backend = VirtualBackend::with_default_cameras();
        let mut recorder = bound_recorder(&backend, dir.path());

        recorder.prepare().unwrap();
        recorder.start().unwrap();
        recorder.stop().unwrap();
        recorder.reset();
        recorder.release();

        let data = std::fs::read(dir.path().join("VID_test.mp4")).unwrap();
        assert!(data.starts_with(MP4_HEADER));
        assert_eq!(data.len(), MP4_HEADER.len() + BYTES_PER_SECOND);
    }

    #[test]
    fn test_stop_without_start_fails() {
        let dir = tempfile::tempdir().unwrap();
        let backend = VirtualBackend::with_default_cameras();
        let mut recorder = bound_recorder(&backend, dir.path());

        recorder.prepare().unwrap();
        assert!(recorder.stop().is_err());
    }

    #[test]
    fn test_stop_fault_leaves_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let backend = VirtualBackend::with_default_cameras();
        backend.set_faults(Faults {
            fail_recorder_stop: true,
            ..Faults::default()
        });
        let mut recorder = bound_recorder(&backend, dir.path());

        recorder.prepare().unwrap();
        recorder.start().unwrap();
        assert!(recorder.stop().is_err());
        assert!(dir.path().join("VID_test.mp4").exists());
    }
}
