//! Zip extraction. The central directory is checked in full before the first write.

use super::contain::ExtractRoot;
use super::{create_dir, write_file};
use crate::error::{Error, Result};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

pub(super) fn extract_zip(archive_path: &Path, root: &ExtractRoot) -> Result<usize> {
    let file = File::open(archive_path).map_err(|e| Error::io("open", archive_path, e))?;
    let mut archive = zip::ZipArchive::new(BufReader::new(file))?;

    let mut targets: Vec<(PathBuf, bool)> = Vec::with_capacity(archive.len());
    for i in 0..archive.len() {
        let entry = archive.by_index(i)?;
        let target = root.resolve(Path::new(entry.name()))?;
        targets.push((target, entry.is_dir()));
    }

    for (i, (target, is_dir)) in targets.iter().enumerate() {
        if *is_dir {
            create_dir(target)?;
            continue;
        }
        let mut entry = archive.by_index(i)?;
        let mode = entry.unix_mode();
        write_file(target, &mut entry, mode)?;
    }
    tracing::debug!("unpacked {} zip entries", targets.len());
    Ok(targets.len())
}
