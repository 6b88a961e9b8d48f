//! Progress reporting for downloads (bytes done, rate, ETA).
//!
//! The fetcher only emits `(transferred, total)` events; rendering is left to
//! the consumer. `ProgressStats` is a convenience for consumers that want
//! rate and ETA figures.

/// Consumer of download progress events.
pub trait ProgressSink {
    /// Called once per written chunk with the running byte count and the
    /// `Content-Range` total.
    fn on_progress(&mut self, transferred: u64, total: u64);
}

/// Sink that drops every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn on_progress(&mut self, _transferred: u64, _total: u64) {}
}

impl<F> ProgressSink for F
where
    F: FnMut(u64, u64),
{
    fn on_progress(&mut self, transferred: u64, total: u64) {
        self(transferred, total)
    }
}

/// Snapshot of download progress (CLI-friendly).
#[derive(Debug, Clone)]
pub struct ProgressStats {
    /// Bytes written so far.
    pub bytes_done: u64,
    /// Total file size in bytes.
    pub total_bytes: u64,
    /// Elapsed time since download start (seconds).
    pub elapsed_secs: f64,
}

impl ProgressStats {
    /// Download rate in bytes per second (0 if elapsed is 0).
    pub fn bytes_per_sec(&self) -> f64 {
        if self.elapsed_secs <= 0.0 {
            return 0.0;
        }
        self.bytes_done as f64 / self.elapsed_secs
    }

    /// Estimated seconds remaining (None if rate is 0).
    pub fn eta_secs(&self) -> Option<f64> {
        let remaining = self.total_bytes.saturating_sub(self.bytes_done);
        if remaining == 0 {
            return Some(0.0);
        }
        let rate = self.bytes_per_sec();
        if rate <= 0.0 {
            return None;
        }
        Some(remaining as f64 / rate)
    }

    /// Fraction complete in [0.0, 1.0].
    pub fn fraction(&self) -> f64 {
        if self.total_bytes == 0 {
            return 1.0;
        }
        (self.bytes_done as f64 / self.total_bytes as f64).min(1.0)
    }
}
