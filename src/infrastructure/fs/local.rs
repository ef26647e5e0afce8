//! Local File System Implementation
//!
//! Implements the FileSystem port for local disk operations.

use std::fs;
use std::io::{self, Write};
use std::path::Path;

use fs2::FileExt;
use tempfile::NamedTempFile;

use crate::domain::ports::{FileLock, FileMode, FileSystem};
use crate::error::{ShipwrightError, ShipwrightResult};

/// Local file system implementation
///
/// Writes go to a temporary file in the target's directory and are renamed
/// into place. When the rename itself is refused for a reason other than
/// privilege (e.g. a bind-mounted `/etc/hosts` inside a container), the
/// content is written in place instead.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFs;

impl LocalFs {
    pub fn new() -> Self {
        Self
    }
}

fn map_io(path: &Path, err: io::Error) -> ShipwrightError {
    if err.kind() == io::ErrorKind::PermissionDenied {
        ShipwrightError::PrivilegeDenied {
            path: path.to_path_buf(),
        }
    } else {
        ShipwrightError::Io(err)
    }
}

#[cfg(unix)]
fn apply_mode(path: &Path, mode: FileMode) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    let bits = match mode {
        FileMode::Default => return Ok(()),
        FileMode::Private => 0o600,
        FileMode::Executable => 0o755,
    };
    fs::set_permissions(path, fs::Permissions::from_mode(bits))
}

#[cfg(not(unix))]
fn apply_mode(_path: &Path, _mode: FileMode) -> io::Result<()> {
    Ok(())
}

fn write_in_place(path: &Path, content: &str, mode: FileMode) -> ShipwrightResult<()> {
    fs::write(path, content).map_err(|e| map_io(path, e))?;
    apply_mode(path, mode).map_err(|e| map_io(path, e))
}

struct LockedFile(fs::File);

impl Drop for LockedFile {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.0);
    }
}

impl FileSystem for LocalFs {
    fn read(&self, path: &Path) -> ShipwrightResult<String> {
        fs::read_to_string(path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => ShipwrightError::ConfigurationMissing {
                path: path.to_path_buf(),
            },
            _ => map_io(path, e),
        })
    }

    fn write(&self, path: &Path, content: &str, mode: FileMode) -> ShipwrightResult<()> {
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir).map_err(|e| map_io(dir, e))?;

        let mut temp = NamedTempFile::new_in(dir).map_err(|e| map_io(path, e))?;
        temp.write_all(content.as_bytes())
            .map_err(|e| map_io(path, e))?;
        temp.as_file().sync_all().map_err(|e| map_io(path, e))?;
        // Mode is set before the rename so the final path never exposes
        // private content with default permissions.
        apply_mode(temp.path(), mode).map_err(|e| map_io(path, e))?;

        match temp.persist(path) {
            Ok(_) => Ok(()),
            Err(err) if err.error.kind() == io::ErrorKind::PermissionDenied => {
                Err(ShipwrightError::PrivilegeDenied {
                    path: path.to_path_buf(),
                })
            }
            Err(err) => {
                tracing::debug!(path = %path.display(), error = %err.error, "rename failed, writing in place");
                write_in_place(path, content, mode)
            }
        }
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn remove(&self, path: &Path) -> ShipwrightResult<()> {
        match fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(map_io(path, e)),
        }
    }

    fn create_dir_all(&self, path: &Path) -> ShipwrightResult<()> {
        fs::create_dir_all(path).map_err(|e| map_io(path, e))
    }

    fn set_mode(&self, path: &Path, mode: FileMode) -> ShipwrightResult<()> {
        apply_mode(path, mode).map_err(|e| map_io(path, e))
    }

    fn lock_exclusive(&self, path: &Path) -> ShipwrightResult<FileLock> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| map_io(parent, e))?;
        }
        let file = fs::OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(path)
            .map_err(|e| map_io(path, e))?;
        FileExt::lock_exclusive(&file).map_err(|e| map_io(path, e))?;
        Ok(FileLock::new(LockedFile(file)))
    }
}
