//! Song files.
//!
//! ## Format
//!
//!   titel:<title><line separator>interpreter:<interpreter>
//!
//! UTF-8, no trailing separator. The file is named `Song_<timestamp>` with
//! the timestamp in [`FILE_TIMESTAMP_FORMAT`], local time.

use crate::error::LoaderError;
use crate::song::Song;
use chrono::{DateTime, Local};
use std::path::{Path, PathBuf};
use tracing::info;

#[cfg(windows)]
pub const LINE_SEPARATOR: &str = "\r\n";
#[cfg(not(windows))]
pub const LINE_SEPARATOR: &str = "\n";

pub const FILE_PREFIX: &str = "Song_";
pub const FILE_TIMESTAMP_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

pub fn file_name(at: &DateTime<Local>) -> String {
    format!("{}{}", FILE_PREFIX, at.format(FILE_TIMESTAMP_FORMAT))
}

pub fn song_file_path(directory: &Path, at: &DateTime<Local>) -> PathBuf {
    directory.join(file_name(at))
}

pub fn encode(song: &Song) -> String {
    format!(
        "titel:{}{}interpreter:{}",
        song.title, LINE_SEPARATOR, song.interpreter
    )
}

/// Write `song` into `directory`, named after the current time.
pub fn write_song(song: Option<&Song>, directory: &str) -> Result<Song, LoaderError> {
    write_song_at(song, directory, &Local::now())
}

/// Write `song` into `directory`, named after `at`. The directory must
/// already exist; a file with the same name is replaced.
pub fn write_song_at(
    song: Option<&Song>,
    directory: &str,
    at: &DateTime<Local>,
) -> Result<Song, LoaderError> {
    let song = song.ok_or(LoaderError::NoTrack)?;
    if directory.trim().is_empty() {
        return Err(LoaderError::SaveFolderUnset);
    }

    let path = song_file_path(Path::new(directory), at);
    std::fs::write(&path, encode(song))?;
    info!("[save] Wrote {:?} to {}", song, path.display());
    Ok(song.clone())
}
