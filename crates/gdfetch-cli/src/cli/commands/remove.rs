//! `gdfetch rm <path>` – recursive removal.

use anyhow::{Context, Result};
use gdfetch_core::remove_tree;
use std::path::Path;

pub async fn run_remove(path: &Path) -> Result<()> {
    let target = path.to_path_buf();
    tokio::task::spawn_blocking(move || remove_tree(&target))
        .await
        .context("remove task join")?
        .with_context(|| format!("could not remove {}", path.display()))?;
    println!("Removed {}", path.display());
    Ok(())
}
