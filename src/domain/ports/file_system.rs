//! FileSystem port - abstraction over file I/O operations
//!
//! Lets the vault bootstrapper, the hosts patcher and the credential phases
//! persist artifacts without depending on a concrete implementation.

use std::path::Path;

use crate::error::ShipwrightResult;

/// Permission bits applied to a written file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileMode {
    /// Whatever the umask gives (or the existing file had)
    Default,
    /// Owner read/write only (0600)
    Private,
    /// Owner rwx, others r-x (0755)
    Executable,
}

/// Exclusive advisory lock, released on drop.
pub struct FileLock {
    _guard: Box<dyn Send>,
}

impl FileLock {
    pub fn new(guard: impl Send + 'static) -> Self {
        Self {
            _guard: Box::new(guard),
        }
    }
}

impl std::fmt::Debug for FileLock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("FileLock")
    }
}

/// Abstract file system interface
///
/// A write refused for lack of privilege surfaces as
/// `ShipwrightError::PrivilegeDenied` so callers can fall back to a
/// remediation path.
pub trait FileSystem: Send + Sync {
    /// Read file content as string
    fn read(&self, path: &Path) -> ShipwrightResult<String>;

    /// Replace file content atomically, creating parent directories
    fn write(&self, path: &Path, content: &str, mode: FileMode) -> ShipwrightResult<()>;

    /// Check if file exists
    fn exists(&self, path: &Path) -> bool;

    /// Remove a file; a missing file is not an error
    fn remove(&self, path: &Path) -> ShipwrightResult<()>;

    /// Create directory and parents
    fn create_dir_all(&self, path: &Path) -> ShipwrightResult<()>;

    /// Apply permission bits to an existing file
    fn set_mode(&self, path: &Path, mode: FileMode) -> ShipwrightResult<()>;

    /// Block until an exclusive lock on `path` is held
    fn lock_exclusive(&self, path: &Path) -> ShipwrightResult<FileLock>;

    /// Write only when the content differs. Returns whether a write happened.
    ///
    /// Unchanged content still gets `mode` re-applied.
    fn write_if_changed(&self, path: &Path, content: &str, mode: FileMode) -> ShipwrightResult<bool> {
        if self.exists(path) && self.read(path)? == content {
            self.set_mode(path, mode)?;
            return Ok(false);
        }
        self.write(path, content, mode)?;
        Ok(true)
    }
}
