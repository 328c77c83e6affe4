// SPDX-License-Identifier: GPL-3.0-only

//! Opening a camera off the UI thread
//!
//! Opening a device can block for hundreds of milliseconds, so it runs on
//! tokio's blocking pool. The returned [`CameraLoadTask`] can be cancelled;
//! a session that finishes opening after cancellation is released right away
//! instead of being leaked.

use super::CameraSession;
use crate::backends::camera::{DeviceEnumerator, Facing, RecorderBackend};
use crate::config::Config;
use crate::errors::{SessionError, SessionResult};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Spawns background camera opens
#[derive(Clone)]
pub struct CameraLoader {
    devices: Arc<dyn DeviceEnumerator>,
    recorders: Arc<dyn RecorderBackend>,
    config: Config,
}

impl CameraLoader {
    pub fn new(
        devices: Arc<dyn DeviceEnumerator>,
        recorders: Arc<dyn RecorderBackend>,
        config: Config,
    ) -> Self {
        Self {
            devices,
            recorders,
            config,
        }
    }

    /// Start opening the first camera with `facing`
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(&self, facing: Facing) -> CameraLoadTask {
        let id = Uuid::new_v4();
        let cancelled = Arc::new(AtomicBool::new(false));

        let devices = Arc::clone(&self.devices);
        let recorders = Arc::clone(&self.recorders);
        let config = self.config.clone();
        let flag = Arc::clone(&cancelled);

        debug!(task = %id, %facing, "Spawning camera open");
        let handle = tokio::task::spawn_blocking(move || {
            if flag.load(Ordering::Acquire) {
                return Err(SessionError::Cancelled);
            }

            let session = CameraSession::open_facing(devices.as_ref(), recorders, facing, &config)?;

            if flag.load(Ordering::Acquire) {
                info!(task = %id, device = %session.id(), "Open cancelled, releasing camera");
                // Dropping the session releases the device
                drop(session);
                return Err(SessionError::Cancelled);
            }
            Ok(session)
        });

        CameraLoadTask {
            id,
            cancelled,
            handle: Some(handle),
        }
    }
}

/// Handle to a camera open running in the background
///
/// Dropping the task cancels it.
pub struct CameraLoadTask {
    id: Uuid,
    cancelled: Arc<AtomicBool>,
    handle: Option<JoinHandle<SessionResult<CameraSession>>>,
}

impl CameraLoadTask {
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Request cancellation
    ///
    /// If the device was already opened, it is released and
    /// [`wait`](Self::wait) yields `SessionError::Cancelled`.
    pub fn cancel(&self) {
        debug!(task = %self.id, "Cancelling camera open");
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// Wait for the open to finish
    ///
    /// # Returns
    /// * `Ok(CameraSession)` - Opened and not cancelled
    /// * `Err(SessionError::Cancelled)` - Cancelled before or after opening
    /// * `Err(SessionError)` - The open itself failed
    pub async fn wait(mut self) -> SessionResult<CameraSession> {
        let handle = self.handle.take().ok_or(SessionError::Cancelled)?;
        let result = match handle.await {
            Ok(result) => result,
            Err(e) => {
                warn!(task = %self.id, error = %e, "Camera open task failed");
                return Err(SessionError::DeviceUnavailable(format!(
                    "camera open task failed: {}",
                    e
                )));
            }
        };

        match result {
            Ok(session) if self.is_cancelled() => {
                info!(task = %self.id, device = %session.id(), "Open cancelled, releasing camera");
                drop(session);
                Err(SessionError::Cancelled)
            }
            other => other,
        }
    }
}

impl Drop for CameraLoadTask {
    fn drop(&mut self) {
        if self.handle.is_some() {
            self.cancelled.store(true, Ordering::Release);
        }
    }
}
