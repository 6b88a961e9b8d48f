//! Download file lifecycle.
//!
//! Bytes land in `<destination>.part`, preallocated to the announced size
//! (fallocate on Linux when available, else set_len), and are published with
//! an atomic rename once the transfer is complete.

use crate::error::{Error, Result};
use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
#[cfg(unix)]
use std::os::unix::io::AsRawFd;

/// Temporary suffix used before atomic rename.
pub const TEMP_SUFFIX: &str = ".part";

/// Sequential writer for a download in progress.
///
/// Dropping a `PartFile` without calling [`PartFile::finalize`] leaves the
/// temp file in place; call [`PartFile::discard`] to remove it.
pub struct PartFile {
    file: File,
    temp_path: PathBuf,
    written: u64,
}

impl PartFile {
    /// Create (or truncate) the temp file for `final_path`.
    pub fn create(final_path: &Path) -> Result<Self> {
        let temp_path = temp_path(final_path);
        let file = File::options()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&temp_path)
            .map_err(|e| Error::io("create", &temp_path, e))?;
        Ok(PartFile {
            file,
            temp_path,
            written: 0,
        })
    }

    /// Preallocate `size` bytes. On Unix tries `posix_fallocate` for real block
    /// allocation; falls back to `set_len` on failure or non-Unix.
    pub fn preallocate(&mut self, size: u64) -> Result<()> {
        if size == 0 {
            return Ok(());
        }
        #[cfg(unix)]
        {
            let fd = self.file.as_raw_fd();
            let r = unsafe { libc::posix_fallocate(fd, 0, size as libc::off_t) };
            if r == 0 {
                return Ok(());
            }
            tracing::debug!(errno = r, "posix_fallocate failed, falling back to set_len");
        }
        self.file
            .set_len(size)
            .map_err(|e| Error::io("preallocate", &self.temp_path, e))
    }

    /// Bytes written so far.
    pub fn written(&self) -> u64 {
        self.written
    }

    /// Path to the current temp file.
    pub fn temp_path(&self) -> &Path {
        &self.temp_path
    }

    /// Sync and atomically rename the temp file to `final_path`.
    /// Fails if `final_path` is on a different filesystem.
    pub fn finalize(self, final_path: &Path) -> Result<()> {
        self.file
            .sync_all()
            .map_err(|e| Error::io("sync", &self.temp_path, e))?;
        let temp_path = self.temp_path;
        // Close before rename.
        drop(self.file);

        std::fs::rename(&temp_path, final_path).map_err(|e| Error::io("rename", &temp_path, e))
    }

    /// Close and delete the temp file. Removal errors are logged, not returned.
    pub fn discard(self) {
        let temp_path = self.temp_path;
        drop(self.file);
        if let Err(e) = std::fs::remove_file(&temp_path) {
            tracing::warn!("could not remove {}: {}", temp_path.display(), e);
        }
    }
}

impl Write for PartFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.file.write(buf)?;
        self.written += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

/// Path for the temp file: appends `.part` to the final path (e.g. `file.iso` -> `file.iso.part`).
pub fn temp_path(final_path: &Path) -> PathBuf {
    let mut o = final_path.as_os_str().to_owned();
    o.push(TEMP_SUFFIX);
    PathBuf::from(o)
}
