//! `gdfetch extract <archive> <dest>` – traversal-safe unpacking.

use anyhow::{Context, Result};
use gdfetch_core::{extract, ArchiveFormat, ExtractOutcome};
use std::path::Path;

/// Explicit format wins; otherwise file name, then magic bytes.
fn resolve_format(archive: &Path, format: Option<ArchiveFormat>) -> Result<ArchiveFormat> {
    if let Some(format) = format {
        return Ok(format);
    }
    ArchiveFormat::infer(archive)?.with_context(|| {
        format!(
            "cannot tell the archive format of {}; pass --format",
            archive.display()
        )
    })
}

pub async fn run_extract(archive: &Path, dest: &Path, format: Option<ArchiveFormat>) -> Result<()> {
    if !archive.is_file() {
        println!("Archive {} not found, nothing to extract", archive.display());
        return Ok(());
    }
    let format = resolve_format(archive, format)?;

    let outcome = tokio::task::spawn_blocking({
        let archive = archive.to_path_buf();
        let dest = dest.to_path_buf();
        move || extract(&archive, &dest, format)
    })
    .await
    .context("extract task join")??;

    match outcome {
        ExtractOutcome::Extracted { entries } => {
            println!("Extracted {} entries to {}", entries, dest.display())
        }
        ExtractOutcome::AlreadyPresent => {
            println!("Folder {} already exists, skipping", dest.display())
        }
        ExtractOutcome::ArchiveMissing => {
            println!("Archive {} not found, nothing to extract", archive.display())
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use gdfetch_core::TarCompression;

    #[test]
    fn explicit_format_is_used_without_reading_the_file() {
        let f = resolve_format(Path::new("/nonexistent/blob"), Some(ArchiveFormat::Zip)).unwrap();
        assert_eq!(f, ArchiveFormat::Zip);
    }

    #[test]
    fn format_falls_back_to_file_name() {
        let f = resolve_format(Path::new("/nonexistent/data.tgz"), None).unwrap();
        assert_eq!(f, ArchiveFormat::Tar(TarCompression::Gzip));
    }
}
