// SPDX-License-Identifier: MPL-2.0

//! Storage utilities for photo and video output files

use crate::constants::{MEDIA_FOLDER, file_names};
use chrono::{DateTime, Local};
use std::fs::OpenOptions;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, error};

/// Numbered names tried per second before giving up
const MAX_NAME_ATTEMPTS: u32 = 1000;

/// Kind of media file to allocate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaType {
    Image,
    Video,
}

impl MediaType {
    fn prefix(self) -> &'static str {
        match self {
            MediaType::Image => file_names::PHOTO_PREFIX,
            MediaType::Video => file_names::VIDEO_PREFIX,
        }
    }

    fn extension(self) -> &'static str {
        match self {
            MediaType::Image => file_names::PHOTO_EXTENSION,
            MediaType::Video => file_names::VIDEO_EXTENSION,
        }
    }
}

/// Hands out destination paths inside a fixed media directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaStore {
    directory: PathBuf,
}

impl MediaStore {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    /// `~/Pictures/Camera`, or `~/Camera` when there is no pictures directory
    pub fn default_directory() -> PathBuf {
        dirs::picture_dir()
            .or_else(dirs::home_dir)
            .unwrap_or_else(|| PathBuf::from("."))
            .join(MEDIA_FOLDER)
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// File name for media captured at `timestamp`, e.g. `IMG_20240131_235959.jpg`
    pub fn file_name(media: MediaType, timestamp: DateTime<Local>) -> String {
        format!(
            "{}{}.{}",
            media.prefix(),
            timestamp.format(file_names::TIMESTAMP_FORMAT),
            media.extension()
        )
    }

    /// File name with a collision counter, e.g. `IMG_20240131_235959_2.jpg`
    fn numbered_file_name(media: MediaType, timestamp: DateTime<Local>, index: u32) -> String {
        if index == 0 {
            return Self::file_name(media, timestamp);
        }
        format!(
            "{}{}_{}.{}",
            media.prefix(),
            timestamp.format(file_names::TIMESTAMP_FORMAT),
            index,
            media.extension()
        )
    }

    /// Allocate a timestamped output path, creating the directory if needed
    ///
    /// The path is claimed by creating an empty file, so media captured in
    /// the same second gets a numbered name instead of overwriting an
    /// existing file.
    pub fn output_media_file(&self, media: MediaType) -> io::Result<PathBuf> {
        self.claim_media_file(media, Local::now())
    }

    fn claim_media_file(
        &self,
        media: MediaType,
        timestamp: DateTime<Local>,
    ) -> io::Result<PathBuf> {
        std::fs::create_dir_all(&self.directory)?;

        for index in 0..MAX_NAME_ATTEMPTS {
            let path = self
                .directory
                .join(Self::numbered_file_name(media, timestamp, index));
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(_) => {
                    debug!(path = %path.display(), ?media, "Allocated output file");
                    return Ok(path);
                }
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(e),
            }
        }

        Err(io::Error::new(
            io::ErrorKind::AlreadyExists,
            format!("no free {:?} file name in {}", media, self.directory.display()),
        ))
    }

    /// Delete a file, logging instead of failing
    ///
    /// Returns true if the file is gone afterwards.
    pub fn delete_file(path: &Path) -> bool {
        match std::fs::remove_file(path) {
            Ok(()) => {
                debug!(path = %path.display(), "Deleted file");
                true
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => true,
            Err(e) => {
                error!(path = %path.display(), error = %e, "File isn't deleted");
                false
            }
        }
    }

    /// Write encoded picture bytes to a freshly allocated photo path
    pub async fn write_photo(&self, data: Vec<u8>) -> io::Result<PathBuf> {
        let store = self.clone();
        tokio::task::spawn_blocking(move || {
            let path = store.output_media_file(MediaType::Image)?;
            std::fs::write(&path, &data)?;
            Ok(path)
        })
        .await
        .map_err(|e| io::Error::other(format!("Save task error: {}", e)))?
    }
}

impl Default for MediaStore {
    fn default() -> Self {
        Self::new(Self::default_directory())
    }
}
