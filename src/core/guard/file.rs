/*!
 * File Guards
 *
 * File handles flushed and synced to disk when the scope exits
 */

use super::traits::{Guard, GuardDrop};
use super::{GuardError, GuardMetadata, GuardResult};
use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, error};

/// File handle guard with automatic flush and sync
///
/// # Example
///
/// ```no_run
/// use scoped_guard::core::guard::FileGuard;
/// use std::io::Write;
///
/// let mut log = FileGuard::create("run.log")?;
/// writeln!(log.file_mut()?, "exposure started")?;
/// log.close()?; // Or synced on drop
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct FileGuard {
    file: Option<File>,
    path: PathBuf,
    metadata: GuardMetadata,
}

impl FileGuard {
    /// Open an existing file for reading
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        Self::with_options(path, OpenOptions::new().read(true))
    }

    /// Create or truncate a file for writing
    pub fn create(path: impl AsRef<Path>) -> io::Result<Self> {
        Self::with_options(path, OpenOptions::new().write(true).create(true).truncate(true))
    }

    /// Open a file for appending, creating it if missing
    pub fn append(path: impl AsRef<Path>) -> io::Result<Self> {
        Self::with_options(path, OpenOptions::new().append(true).create(true))
    }

    /// Open with caller-supplied options
    pub fn with_options(path: impl AsRef<Path>, options: &OpenOptions) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = options.open(&path)?;
        let metadata = GuardMetadata::new("file");
        debug!(guard_id = %metadata.id, path = %path.display(), "file opened");

        Ok(Self {
            file: Some(file),
            path,
            metadata,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn file(&self) -> GuardResult<&File> {
        self.file.as_ref().ok_or(GuardError::AlreadyReleased)
    }

    pub fn file_mut(&mut self) -> GuardResult<&mut File> {
        self.file.as_mut().ok_or(GuardError::AlreadyReleased)
    }

    /// Flush, sync and close the file, surfacing any I/O error
    pub fn close(mut self) -> io::Result<()> {
        self.finish().unwrap_or(Ok(()))
    }

    fn finish(&mut self) -> Option<io::Result<()>> {
        let mut file = self.file.take()?;
        let result = file.flush().and_then(|()| {
            // Read-only handles cannot be synced on every platform
            match file.sync_all() {
                Err(e) if e.kind() == io::ErrorKind::PermissionDenied => Ok(()),
                other => other,
            }
        });
        debug!(
            guard_id = %self.metadata.id,
            path = %self.path.display(),
            ok = result.is_ok(),
            "file closed"
        );
        Some(result)
    }
}

impl Guard for FileGuard {
    fn resource_type(&self) -> &'static str {
        "file"
    }

    fn metadata(&self) -> &GuardMetadata {
        &self.metadata
    }

    fn is_active(&self) -> bool {
        self.file.is_some()
    }

    fn release(&mut self) -> GuardResult<()> {
        match self.finish() {
            None => Err(GuardError::AlreadyReleased),
            Some(result) => result.map_err(|e| {
                GuardError::Release(format!("{}: {}", self.path.display(), e))
            }),
        }
    }
}

impl GuardDrop for FileGuard {
    fn on_drop(&mut self) {
        if let Some(Err(e)) = self.finish() {
            error!(path = %self.path.display(), error = %e, "file guard drop failed");
        }
    }
}

impl Drop for FileGuard {
    fn drop(&mut self) {
        self.on_drop();
    }
}

impl fmt::Debug for FileGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileGuard")
            .field("id", &self.metadata.id)
            .field("path", &self.path)
            .field("active", &self.file.is_some())
            .finish()
    }
}
