//! Error taxonomy shared by the fetcher and the extractor.

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Failure of a fetch or extract call. Nothing is retried internally.
#[derive(Debug, Error)]
pub enum Error {
    /// File system failure at a known path.
    #[error("{op} {}: {source}", path.display())]
    Io {
        op: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Transport failure reported by libcurl (DNS, connect, TLS, timeout).
    #[error("network: {0}")]
    Curl(#[from] curl::Error),

    /// Configured endpoint is not a valid URL.
    #[error("invalid endpoint URL: {0}")]
    Endpoint(#[from] url::ParseError),

    /// The host answered, but not in the shape we need.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// Archive entry would land outside the extraction root.
    #[error("archive entry {entry:?} escapes destination (resolves to {})", resolved.display())]
    Security { entry: String, resolved: PathBuf },

    /// Archive container could not be read.
    #[error("archive: {0}")]
    Archive(String),
}

impl Error {
    pub(crate) fn io(op: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            op,
            path: path.into(),
            source,
        }
    }

    /// True for path-traversal rejections.
    pub fn is_security(&self) -> bool {
        matches!(self, Error::Security { .. })
    }
}

/// Response header or body did not match what the download host promises.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("response has no Content-Range header")]
    MissingContentRange,
    #[error("malformed Content-Range header: {0:?}")]
    MalformedContentRange(String),
    #[error("HTTP {0}")]
    Status(u32),
    #[error("partial transfer: expected {expected} bytes, got {received}")]
    PartialTransfer { expected: u64, received: u64 },
    #[error("host asked for confirmation again after the confirmed request")]
    RepeatedConfirmation,
}

impl From<zip::result::ZipError> for Error {
    fn from(e: zip::result::ZipError) -> Self {
        Error::Archive(e.to_string())
    }
}
