//! `gdfetch fetch <id> <dest>` – download, then optionally extract.

use anyhow::{Context, Result};
use gdfetch_core::config::GdfetchConfig;
use gdfetch_core::{ArchiveFormat, DownloadRequest, FetchOutcome, Fetcher, ProgressSink, ProgressStats};
use std::io::Write;
use std::path::Path;
use std::time::{Duration, Instant};

const REDRAW_INTERVAL: Duration = Duration::from_millis(250);

/// Single-line progress on stderr, redrawn at most every `REDRAW_INTERVAL`.
struct ProgressLine {
    started: Instant,
    last_draw: Option<Instant>,
}

impl ProgressLine {
    fn new() -> Self {
        Self {
            started: Instant::now(),
            last_draw: None,
        }
    }
}

fn format_line(stats: &ProgressStats) -> String {
    let eta = stats
        .eta_secs()
        .map(|s| format!("{:.0}s", s))
        .unwrap_or_else(|| "?".to_string());
    format!(
        "{:>5.1}%  {:.1}/{:.1} MiB  {:.2} MiB/s  ETA {}",
        stats.fraction() * 100.0,
        stats.bytes_done as f64 / (1024.0 * 1024.0),
        stats.total_bytes as f64 / (1024.0 * 1024.0),
        stats.bytes_per_sec() / (1024.0 * 1024.0),
        eta
    )
}

impl ProgressSink for ProgressLine {
    fn on_progress(&mut self, transferred: u64, total: u64) {
        let now = Instant::now();
        let done = transferred >= total;
        if !done && self.last_draw.is_some_and(|t| now.duration_since(t) < REDRAW_INTERVAL) {
            return;
        }
        self.last_draw = Some(now);
        let stats = ProgressStats {
            bytes_done: transferred,
            total_bytes: total,
            elapsed_secs: now.duration_since(self.started).as_secs_f64(),
        };
        let mut err = std::io::stderr().lock();
        let _ = write!(err, "\r{}", format_line(&stats));
        if done {
            let _ = writeln!(err);
        }
        let _ = err.flush();
    }
}

pub async fn run_fetch(
    cfg: &GdfetchConfig,
    id: &str,
    dest: &Path,
    extract_to: Option<&Path>,
    format: Option<ArchiveFormat>,
) -> Result<()> {
    let fetcher = Fetcher::new(cfg.clone());
    let request = DownloadRequest::new(id, dest);
    let outcome = tokio::task::spawn_blocking(move || {
        let mut progress = ProgressLine::new();
        fetcher.fetch(&request, &mut progress)
    })
    .await
    .context("fetch task join")?
    .with_context(|| format!("download of {} failed", id))?;

    match outcome {
        FetchOutcome::Downloaded { bytes, confirmed } => {
            let note = if confirmed { " (confirmed)" } else { "" };
            println!("Downloaded {} bytes to {}{}", bytes, dest.display(), note);
        }
        FetchOutcome::AlreadyPresent => {
            println!("File {} already exists, skipping download", dest.display());
        }
    }

    if let Some(dir) = extract_to {
        super::run_extract(dest, dir, format).await?;
    }
    Ok(())
}
