//! Writes finalized recordings to disk

use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use thiserror::Error;
use tokio::fs;
use tracing::{debug, warn};

use crate::domain::recording::{AudioFormat, Recording};
use crate::infrastructure::recording::finalize_wav_sizes;

/// Errors from exporting a recording
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Recording is empty, nothing to export")]
    Empty,

    #[error("Failed to create output directory {path}: {message}")]
    CreateDir { path: String, message: String },

    #[error("Failed to write {path}: {message}")]
    Write { path: String, message: String },
}

/// Exports recordings as `recording-<unix-seconds>.<ext>` files
pub struct RecordingExporter {
    dir: PathBuf,
}

impl RecordingExporter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Write the recording and return the final path
    pub async fn export(&self, recording: &Recording) -> Result<PathBuf, ExportError> {
        if recording.is_empty() {
            return Err(ExportError::Empty);
        }

        fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| ExportError::CreateDir {
                path: self.dir.display().to_string(),
                message: e.to_string(),
            })?;

        let target = self.next_path(recording.format(), unix_seconds());
        let mut bytes = recording.data().to_vec();
        if recording.format() == AudioFormat::Wav && !finalize_wav_sizes(&mut bytes) {
            warn!("Recording has no WAV header, writing it unchanged");
        }

        let partial = PartialFile::new(&target);
        fs::write(partial.path(), &bytes)
            .await
            .map_err(|e| write_error(partial.path(), e))?;
        partial.commit(&target).await?;

        debug!(path = %target.display(), bytes = bytes.len(), "Recording exported");
        Ok(target)
    }

    /// First free `recording-<secs>[-n].<ext>` path in the output dir
    fn next_path(&self, format: AudioFormat, secs: u64) -> PathBuf {
        let ext = format.extension();
        let mut candidate = self.dir.join(format!("recording-{}.{}", secs, ext));
        let mut n = 1;
        while candidate.exists() {
            candidate = self.dir.join(format!("recording-{}-{}.{}", secs, n, ext));
            n += 1;
        }
        candidate
    }
}

/// Temporary file next to the target, removed on drop unless committed
struct PartialFile {
    path: PathBuf,
    committed: bool,
}

impl PartialFile {
    fn new(target: &Path) -> Self {
        let mut name = target
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".part");
        Self {
            path: target.with_file_name(name),
            committed: false,
        }
    }

    fn path(&self) -> &Path {
        &self.path
    }

    async fn commit(mut self, target: &Path) -> Result<(), ExportError> {
        fs::rename(&self.path, target)
            .await
            .map_err(|e| write_error(target, e))?;
        self.committed = true;
        Ok(())
    }
}

impl Drop for PartialFile {
    fn drop(&mut self) {
        if !self.committed {
            let _ = std::fs::remove_file(&self.path);
        }
    }
}

fn write_error(path: &Path, e: std::io::Error) -> ExportError {
    ExportError::Write {
        path: path.display().to_string(),
        message: e.to_string(),
    }
}

fn unix_seconds() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
