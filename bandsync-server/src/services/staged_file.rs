//! Staged upload files
//!
//! A [`StagedFile`] owns a path in the upload directory. Releasing it deletes
//! the file; release happens at most once, either explicitly or when the
//! guard is dropped (early return, error, panic or a cancelled request).

use std::io;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Filename prefix for every staged upload
pub const STAGED_PREFIX: &str = "file-";

/// Longest extension carried over from the client's filename
const MAX_EXTENSION_LEN: usize = 10;

/// Result of releasing a staged file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CleanupOutcome {
    /// The file existed and was deleted
    Removed,
    /// The file was already gone (e.g. the relay removed it)
    AlreadyAbsent,
    /// This guard was released before; nothing was done
    AlreadyReleased,
    /// Deletion failed for a reason other than absence
    Failed(io::ErrorKind),
}

#[derive(Debug)]
pub struct StagedFile {
    path: PathBuf,
    released: bool,
}

impl StagedFile {
    /// Take ownership of an existing staged path
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            released: false,
        }
    }

    /// Unique staging path: `file-<millis>-<uuid>[.ext]`
    pub fn unique_path(upload_dir: &Path, original_name: Option<&str>) -> PathBuf {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or(0);

        let mut name = format!("{}{}-{}", STAGED_PREFIX, millis, Uuid::new_v4().simple());
        if let Some(ext) = original_name.and_then(safe_extension) {
            name.push('.');
            name.push_str(&ext);
        }
        upload_dir.join(name)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Delete the file if this guard has not done so yet
    ///
    /// A missing file counts as success.
    pub fn release(&mut self) -> CleanupOutcome {
        if self.released {
            return CleanupOutcome::AlreadyReleased;
        }
        self.released = true;

        match std::fs::remove_file(&self.path) {
            Ok(()) => {
                debug!(path = %self.path.display(), "Removed staged file");
                CleanupOutcome::Removed
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "Staged file already absent");
                CleanupOutcome::AlreadyAbsent
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Failed to remove staged file");
                CleanupOutcome::Failed(e.kind())
            }
        }
    }
}

impl Drop for StagedFile {
    fn drop(&mut self) {
        self.release();
    }
}

/// Extension of `original_name`, lowercased, if it is short and alphanumeric
fn safe_extension(original_name: &str) -> Option<String> {
    let ext = Path::new(original_name).extension()?.to_str()?;
    if ext.is_empty()
        || ext.len() > MAX_EXTENSION_LEN
        || !ext.chars().all(|c| c.is_ascii_alphanumeric())
    {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// Delete staged files left behind by a previous process
///
/// Called once at startup, before any request can stage a new file.
pub fn sweep_stale_uploads(upload_dir: &Path) -> io::Result<usize> {
    let mut removed = 0;
    for entry in std::fs::read_dir(upload_dir)? {
        let entry = entry?;
        let is_staged = entry
            .file_name()
            .to_str()
            .map(|name| name.starts_with(STAGED_PREFIX))
            .unwrap_or(false);
        if is_staged && entry.file_type()?.is_file() {
            std::fs::remove_file(entry.path())?;
            removed += 1;
        }
    }

    if removed > 0 {
        info!("Removed {} stale staged upload(s) from {}", removed, upload_dir.display());
    }
    Ok(removed)
}
