//! File system glue: parent creation and recursive removal.

use crate::error::{Error, Result};
use std::fs;
use std::io;
use std::path::Path;
use walkdir::WalkDir;

/// Create the parent directories of `path` if they are missing.
pub fn ensure_parent_dir(path: &Path) -> Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() && !parent.exists() => {
            fs::create_dir_all(parent).map_err(|e| Error::io("create directory", parent, e))?;
            tracing::debug!("created {}", parent.display());
            Ok(())
        }
        _ => Ok(()),
    }
}

/// Delete everything under `path`, deepest entries first, then `path` itself.
///
/// Symlinks are removed, never followed. A missing `path` is a no-op. The
/// first failure is returned as-is; nothing is retried.
pub fn remove_tree(path: &Path) -> io::Result<()> {
    let meta = match fs::symlink_metadata(path) {
        Ok(meta) => meta,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e),
    };
    if !meta.is_dir() {
        return fs::remove_file(path);
    }

    for entry in WalkDir::new(path).contents_first(true) {
        let entry = entry.map_err(io::Error::from)?;
        if entry.file_type().is_dir() {
            fs::remove_dir(entry.path())?;
        } else {
            fs::remove_file(entry.path())?;
        }
    }
    tracing::debug!("removed {}", path.display());
    Ok(())
}
