// SPDX-License-Identifier: GPL-3.0-only

//! CLI commands for camera operations
//!
//! This module provides command-line functionality for:
//! - Listing available cameras
//! - Taking photos
//! - Recording videos
//! - Showing the saved session state
//!
//! All commands run against the virtual camera backend.

use camera_session::backends::camera::{self, DeviceEnumerator, Facing, PreviewSurface, Rotation};
use camera_session::backends::virtual_camera::VirtualBackend;
use camera_session::{CameraLoader, CameraSession, Config, FlashMode, SessionState};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Container size of the off-screen preview surface (portrait phone screen)
const SURFACE_WIDTH: u32 = 720;
const SURFACE_HEIGHT: u32 = 1280;

/// Preview surface with no window behind it
struct HeadlessSurface {
    width: u32,
    height: u32,
    layout: (u32, u32),
}

impl HeadlessSurface {
    fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            layout: (width, height),
        }
    }
}

impl PreviewSurface for HeadlessSurface {
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

pub fn parse_facing(value: &str) -> Result<Facing, String> {
    match value.to_ascii_lowercase().as_str() {
        "front" => Ok(Facing::Front),
        "back" => Ok(Facing::Back),
        other => Err(format!("unknown facing '{}' (expected front or back)", other)),
    }
}

pub fn parse_flash_mode(value: &str) -> Result<FlashMode, String> {
    FlashMode::from_device_name(&value.to_ascii_lowercase())
        .ok_or_else(|| format!("unknown flash mode '{}' (expected auto, on or off)", value))
}

/// List all available cameras
pub fn list_cameras() -> Result<(), Box<dyn std::error::Error>> {
    let backend = VirtualBackend::with_default_cameras();
    let cameras = backend.list_devices();

    if cameras.is_empty() {
        println!("No cameras found.");
        return Ok(());
    }

    println!("Available cameras:");
    println!();
    for info in &cameras {
        println!(
            "  [{}] {} camera, mounted at {}°",
            info.id.0, info.facing, info.mount_orientation
        );

        let mut device = backend.open(info.id)?;
        let params = device.parameters();
        device.release();
        let params = params?;

        let sizes: Vec<String> = params
            .supported_picture_sizes
            .iter()
            .map(|size| size.to_string())
            .collect();
        println!("      Picture sizes: {}", sizes.join(", "));

        let flash: Vec<String> = params
            .known_flash_modes()
            .iter()
            .map(|mode| mode.to_string())
            .collect();
        if flash.is_empty() {
            println!("      Flash: none");
        } else {
            println!("      Flash: {}", flash.join(", "));
        }
        println!();
    }

    Ok(())
}

/// Take a photo with the requested camera
pub fn take_photo(
    facing: Option<Facing>,
    flash: Option<FlashMode>,
    output: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load();
    let backend = VirtualBackend::with_default_cameras();
    backend.set_picture_quality(config.picture_quality);

    let rt = tokio::runtime::Runtime::new()?;
    let mut session = rt.block_on(open_session(&backend, facing, &config))?;
    println!("Using camera: {} ({})", session.id(), session.facing());

    restore_saved_state(&mut session, &config);
    if let Some(mode) = flash {
        session.set_flash_mode(mode)?;
    }

    let mut surface = HeadlessSurface::new(SURFACE_WIDTH, SURFACE_HEIGHT);
    let preview = session.prepare_for_photo(&mut surface)?;
    session.update_orientation(Rotation::Rotate0)?;
    println!("Preview: {}", preview);

    println!("Capturing...");
    let (sender, receiver) = tokio::sync::oneshot::channel();
    session.capture_photo(move |result| {
        let _ = sender.send(result);
    })?;
    let photo = rt
        .block_on(receiver)
        .map_err(|_| "Camera released before the picture arrived")??;
    debug!(
        bytes = photo.data.len(),
        orientation = photo.orientation_degrees,
        "Picture received"
    );

    let output_path = match output {
        Some(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(&path, &photo.data)?;
            path
        }
        None => rt.block_on(config.media_store().write_photo(photo.data))?,
    };

    save_state(&session);
    session.release()?;

    println!(
        "Photo saved: {} ({}x{})",
        output_path.display(),
        photo.width,
        photo.height
    );
    Ok(())
}

/// Record a video with the requested camera
pub fn record_video(
    facing: Option<Facing>,
    duration: u64,
    output: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load();
    let backend = VirtualBackend::with_default_cameras();

    let rt = tokio::runtime::Runtime::new()?;
    let mut session = rt.block_on(open_session(&backend, facing, &config))?;
    println!("Using camera: {} ({})", session.id(), session.facing());

    restore_saved_state(&mut session, &config);
    let mut surface = HeadlessSurface::new(SURFACE_WIDTH, SURFACE_HEIGHT);
    let preview = session.prepare_for_video(&mut surface)?;
    session.update_orientation(Rotation::Rotate0)?;

    println!(
        "Recording format: {} ({})",
        preview,
        config.video_quality.display_name()
    );
    println!("Duration: {} seconds", duration);
    if config.record_audio {
        println!("Audio: enabled");
    }

    let recording_path = session.start_recording()?;
    println!("Output: {}", recording_path.display());
    println!();
    println!("Recording... (press Ctrl+C to stop early)");

    // Set up Ctrl+C handler
    let stop_flag = Arc::new(AtomicBool::new(false));
    let stop_flag_clone = stop_flag.clone();
    ctrlc::set_handler(move || {
        stop_flag_clone.store(true, Ordering::SeqCst);
    })?;

    // Wait for duration or Ctrl+C
    let start = Instant::now();
    let target_duration = Duration::from_secs(duration);

    while start.elapsed() < target_duration {
        if stop_flag.load(Ordering::SeqCst) {
            println!();
            println!("Stopping early...");
            break;
        }

        let elapsed = start.elapsed().as_secs();
        print!("\rRecording: {:02}:{:02}", elapsed / 60, elapsed % 60);
        std::io::Write::flush(&mut std::io::stdout())?;

        std::thread::sleep(Duration::from_millis(100));
    }
    println!();

    let saved = session.stop_recording()?;
    save_state(&session);
    session.release()?;

    let Some(saved) = saved else {
        return Err("Recording failed, no video was saved".into());
    };
    let final_path = match output {
        Some(path) => move_file(&saved, &path)?,
        None => saved,
    };
    println!("Video saved: {}", final_path.display());
    Ok(())
}

/// Print the state a session would restore
pub fn show_state(facing: Option<Facing>) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load();
    let backend = VirtualBackend::with_default_cameras();

    let rt = tokio::runtime::Runtime::new()?;
    let mut session = rt.block_on(open_session(&backend, facing, &config))?;
    restore_saved_state(&mut session, &config);

    let state = session.snapshot()?;
    session.release()?;

    println!("{}", serde_json::to_string_pretty(&state)?);
    Ok(())
}

/// Open a camera in the background and wait for it
async fn open_session(
    backend: &VirtualBackend,
    facing: Option<Facing>,
    config: &Config,
) -> Result<CameraSession, Box<dyn std::error::Error>> {
    let facing = facing
        .or(config.default_facing)
        .or_else(|| camera::default_facing(backend))
        .ok_or("No cameras found")?;

    let loader = CameraLoader::new(
        Arc::new(backend.clone()),
        Arc::new(backend.clone()),
        config.clone(),
    );
    Ok(loader.spawn(facing).wait().await?)
}

fn restore_saved_state(session: &mut CameraSession, config: &Config) {
    if !config.remember_flash_mode {
        return;
    }
    let Some(state) = SessionState::default_path().and_then(|path| SessionState::load_from(&path))
    else {
        return;
    };
    if let Err(e) = session.restore(&state) {
        warn!(error = %e, "Failed to restore session state");
    }
}

fn save_state(session: &CameraSession) {
    let Some(path) = SessionState::default_path() else {
        return;
    };
    let result = session.snapshot().and_then(|state| state.save_to(&path));
    if let Err(e) = result {
        warn!(error = %e, "Failed to save session state");
    }
}

/// Rename, falling back to copy + delete across file systems
fn move_file(from: &Path, to: &Path) -> std::io::Result<PathBuf> {
    if let Some(parent) = to.parent() {
        std::fs::create_dir_all(parent)?;
    }
    if std::fs::rename(from, to).is_err() {
        std::fs::copy(from, to)?;
        std::fs::remove_file(from)?;
    }
    Ok(to.to_path_buf())
}
