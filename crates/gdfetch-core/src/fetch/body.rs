//! Chunked body sink: bounded writes plus progress events.

use crate::progress::ProgressSink;
use std::io::{self, Write};

/// Writes a response body in chunks of at most `chunk_size` bytes.
///
/// Progress is reported once per written chunk, and only when the total is
/// larger than one chunk. Empty chunks are skipped entirely.
pub(crate) struct BodyWriter<W> {
    out: W,
    total: u64,
    chunk_size: usize,
    transferred: u64,
}

impl<W: Write> BodyWriter<W> {
    pub fn new(out: W, total: u64, chunk_size: usize) -> Self {
        Self {
            out,
            total,
            chunk_size: chunk_size.max(1),
            transferred: 0,
        }
    }

    fn reports_progress(&self) -> bool {
        self.total > self.chunk_size as u64
    }

    /// Write one slice as delivered by the transport.
    pub fn write_chunk<P>(&mut self, data: &[u8], progress: &mut P) -> io::Result<()>
    where
        P: ProgressSink + ?Sized,
    {
        // chunks() yields nothing for an empty (keep-alive) slice.
        for chunk in data.chunks(self.chunk_size) {
            self.out.write_all(chunk)?;
            self.transferred += chunk.len() as u64;
            if self.reports_progress() {
                progress.on_progress(self.transferred, self.total);
            }
        }
        Ok(())
    }

    pub fn transferred(&self) -> u64 {
        self.transferred
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}
