//! Confirmation-aware downloader.
//!
//! The host serves an HTML interstitial instead of the payload for large
//! files and marks it with a `download_warning*` cookie. We issue the first
//! GET, and if that cookie shows up we drop the interstitial body and repeat
//! the GET with `confirm=<token>` on the same session. The body is streamed
//! to `<destination>.part` in bounded chunks and renamed into place once the
//! byte count matches the `Content-Range` total.
//!
//! Runs in the current thread; call from `spawn_blocking` if used from async code.

mod body;
mod parse;

use crate::config::GdfetchConfig;
use crate::error::{Error, ProtocolError, Result};
use crate::fs_util::ensure_parent_dir;
use crate::progress::{NoProgress, ProgressSink};
use crate::storage::PartFile;
use body::BodyWriter;
use parse::ResponseHead;
use std::cell::RefCell;
use std::io;
use std::path::{Path, PathBuf};
use std::str;

/// What a fetch call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    /// File was downloaded; `confirmed` is true when the interstitial had to be acknowledged.
    Downloaded { bytes: u64, confirmed: bool },
    /// Destination already existed; nothing was requested.
    AlreadyPresent,
}

/// One resource to download.
#[derive(Debug, Clone)]
pub struct DownloadRequest {
    /// Opaque identifier sent as the `id` query parameter.
    pub resource_id: String,
    /// Final path of the downloaded file.
    pub destination: PathBuf,
    /// First byte requested; every request carries `Range: bytes=<start>-`.
    pub range_start: u64,
}

impl DownloadRequest {
    pub fn new(resource_id: impl Into<String>, destination: impl Into<PathBuf>) -> Self {
        Self {
            resource_id: resource_id.into(),
            destination: destination.into(),
            range_start: 0,
        }
    }

    /// Range in curl's `start-end` form (curl adds the `bytes=` unit).
    fn curl_range(&self) -> String {
        format!("{}-", self.range_start)
    }
}

/// Downloader bound to one configuration. Holds no per-download state.
#[derive(Debug, Clone, Default)]
pub struct Fetcher {
    cfg: GdfetchConfig,
}

impl Fetcher {
    pub fn new(cfg: GdfetchConfig) -> Self {
        Self { cfg }
    }

    pub fn config(&self) -> &GdfetchConfig {
        &self.cfg
    }

    /// Endpoint URL with `id` (and `confirm`, when given) appended to the query.
    pub fn request_url(&self, resource_id: &str, token: Option<&str>) -> Result<String> {
        let mut url = url::Url::parse(&self.cfg.endpoint)?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("id", resource_id);
            if let Some(token) = token {
                query.append_pair("confirm", token);
            }
        }
        Ok(url.into())
    }

    /// Download `request`, reporting per-chunk progress to `progress`.
    ///
    /// An existing destination file counts as done and is not inspected.
    pub fn fetch<P>(&self, request: &DownloadRequest, progress: &mut P) -> Result<FetchOutcome>
    where
        P: ProgressSink + ?Sized,
    {
        let destination = request.destination.as_path();
        if destination.is_file() {
            tracing::info!("file {} already exists", destination.display());
            return Ok(FetchOutcome::AlreadyPresent);
        }
        ensure_parent_dir(destination)?;

        let mut session = Session::open(&self.cfg, request)?;

        let url = self.request_url(&request.resource_id, None)?;
        tracing::debug!(id = %request.resource_id, "GET {}", url);
        let first = session.get(&url, Exchange::new(&self.cfg, destination, &mut *progress, true))?;

        let (writer, confirmed) = match first {
            Step::Complete(writer) => (writer, false),
            Step::Confirm(token) => {
                tracing::info!(id = %request.resource_id, "host requires confirmation, retrying with token");
                let url = self.request_url(&request.resource_id, Some(&token))?;
                let exchange = Exchange::new(&self.cfg, destination, &mut *progress, false);
                (session.get(&url, exchange)?.into_body()?, true)
            }
        };

        let expected = writer.total();
        let received = writer.transferred();
        let part = writer.into_inner();
        if received != expected {
            part.discard();
            return Err(ProtocolError::PartialTransfer { expected, received }.into());
        }
        part.finalize(destination)?;

        tracing::info!(bytes = received, confirmed, "downloaded {}", destination.display());
        Ok(FetchOutcome::Downloaded {
            bytes: received,
            confirmed,
        })
    }
}

/// Download `resource_id` to `destination` with the default configuration and no progress output.
pub fn fetch(resource_id: &str, destination: impl AsRef<Path>) -> Result<FetchOutcome> {
    let request = DownloadRequest::new(resource_id, destination.as_ref());
    Fetcher::default().fetch(&request, &mut NoProgress)
}

/// One curl easy handle; its cookie engine makes consecutive GETs one session.
struct Session {
    easy: curl::easy::Easy,
}

impl Session {
    fn open(cfg: &GdfetchConfig, request: &DownloadRequest) -> Result<Self> {
        let mut easy = curl::easy::Easy::new();
        easy.follow_location(true)?;
        easy.max_redirections(cfg.max_redirections)?;
        // Empty path turns on the in-memory cookie engine without reading a file.
        easy.cookie_file("")?;
        easy.connect_timeout(cfg.connect_timeout())?;
        // Abort if throughput stays below the limit; a hard timeout backs it up.
        easy.low_speed_limit(cfg.low_speed_limit)?;
        easy.low_speed_time(cfg.low_speed_time())?;
        easy.timeout(cfg.timeout())?;
        easy.buffer_size(cfg.chunk_size)?;
        easy.range(&request.curl_range())?;
        Ok(Session { easy })
    }

    fn get<P>(&mut self, url: &str, exchange: Exchange<'_, P>) -> Result<Step>
    where
        P: ProgressSink + ?Sized,
    {
        self.easy.url(url)?;
        let exchange = RefCell::new(exchange);
        let performed = {
            let mut transfer = self.easy.transfer();
            transfer.header_function(|data| {
                if let Ok(line) = str::from_utf8(data) {
                    exchange.borrow_mut().on_header_line(line);
                }
                true
            })?;
            transfer.write_function(|data| {
                // Returning fewer bytes than offered aborts the transfer.
                if exchange.borrow_mut().on_body(data) {
                    Ok(data.len())
                } else {
                    Ok(0)
                }
            })?;
            transfer.perform()
        };
        exchange.into_inner().finish(performed)
    }
}

/// Result of one GET.
enum Step {
    /// Interstitial seen; repeat with this token.
    Confirm(String),
    /// Body fully streamed into the temp file.
    Complete(BodyWriter<PartFile>),
}

impl Step {
    /// Body of a request that must not ask for confirmation.
    fn into_body(self) -> Result<BodyWriter<PartFile>> {
        match self {
            Step::Complete(writer) => Ok(writer),
            Step::Confirm(_) => Err(ProtocolError::RepeatedConfirmation.into()),
        }
    }
}

enum State {
    /// Headers are still arriving.
    AwaitingBody,
    Confirm(String),
    Streaming(BodyWriter<PartFile>),
    Failed(Error),
}

/// Per-request state shared by the header and write callbacks.
struct Exchange<'a, P: ?Sized> {
    cfg: &'a GdfetchConfig,
    destination: &'a Path,
    progress: &'a mut P,
    allow_confirm: bool,
    headers: Vec<String>,
    state: State,
}

impl<'a, P: ProgressSink + ?Sized> Exchange<'a, P> {
    fn new(
        cfg: &'a GdfetchConfig,
        destination: &'a Path,
        progress: &'a mut P,
        allow_confirm: bool,
    ) -> Self {
        Self {
            cfg,
            destination,
            progress,
            allow_confirm,
            headers: Vec::new(),
            state: State::AwaitingBody,
        }
    }

    fn on_header_line(&mut self, line: &str) {
        let line = line.trim_end();
        // Each response of a redirect chain starts with a status line.
        if line.starts_with("HTTP/") {
            self.headers.clear();
        }
        if !line.is_empty() {
            self.headers.push(line.to_string());
        }
    }

    /// Returns false to abort the transfer.
    fn on_body(&mut self, data: &[u8]) -> bool {
        if matches!(self.state, State::AwaitingBody) {
            self.begin();
        }
        let written = match &mut self.state {
            State::Streaming(writer) => writer.write_chunk(data, &mut *self.progress),
            _ => return false,
        };
        match written {
            Ok(()) => true,
            Err(e) => {
                self.abort_stream(e);
                false
            }
        }
    }

    /// Headers are complete: decide between confirming, failing and streaming.
    fn begin(&mut self) {
        let head = parse::parse_head(&self.headers);
        self.state = match self.decide(&head) {
            Ok(state) => state,
            Err(e) => State::Failed(e),
        };
    }

    fn decide(&self, head: &ResponseHead) -> Result<State> {
        if self.allow_confirm {
            if let Some(token) = head.confirm_token(&self.cfg.warning_cookie_prefix) {
                tracing::debug!("interstitial cookie present");
                return Ok(State::Confirm(token.to_string()));
            }
        }
        if !head.is_success() {
            return Err(ProtocolError::Status(head.status.unwrap_or(0)).into());
        }
        let total = head.total_size()?;

        let mut part = PartFile::create(self.destination)?;
        if let Err(e) = part.preallocate(total) {
            part.discard();
            return Err(e);
        }
        tracing::debug!(total, "streaming body to {}", part.temp_path().display());
        Ok(State::Streaming(BodyWriter::new(part, total, self.cfg.chunk_size)))
    }

    fn abort_stream(&mut self, source: io::Error) {
        if let State::Streaming(writer) = std::mem::replace(&mut self.state, State::AwaitingBody) {
            let part = writer.into_inner();
            let err = Error::io("write", part.temp_path(), source);
            part.discard();
            self.state = State::Failed(err);
        }
    }

    fn finish(mut self, performed: std::result::Result<(), curl::Error>) -> Result<Step> {
        if performed.is_ok() && matches!(self.state, State::AwaitingBody) {
            // Empty body: the write callback never ran.
            self.begin();
        }
        match self.state {
            // The interstitial transfer was cut short on purpose.
            State::Confirm(token) => Ok(Step::Confirm(token)),
            State::Failed(e) => Err(e),
            State::Streaming(writer) => match performed {
                Ok(()) => Ok(Step::Complete(writer)),
                Err(e) => {
                    writer.into_inner().discard();
                    Err(e.into())
                }
            },
            State::AwaitingBody => match performed {
                Err(e) => Err(e.into()),
                // begin() above never leaves AwaitingBody.
                Ok(()) => Err(ProtocolError::MissingContentRange.into()),
            },
        }
    }
}
