pub mod config;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod fs_util;
pub mod logging;
pub mod progress;
pub mod storage;

pub use error::{Error, ProtocolError, Result};
pub use extract::{extract, is_contained_within, ArchiveFormat, ExtractOutcome, TarCompression};
pub use fetch::{fetch, DownloadRequest, FetchOutcome, Fetcher};
pub use fs_util::remove_tree;
pub use progress::{NoProgress, ProgressSink, ProgressStats};
