//! Minimal HTTP/1.1 server that mimics a download host with a confirmation interstitial.
//!
//! With the interstitial enabled, a request without the matching `confirm`
//! query parameter gets an HTML page and a `download_warning_*` cookie carrying
//! the token. Otherwise the body is sent as 206 Partial Content with Content-Range.
//! Every request line, Range header and Cookie header is recorded.

use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

pub const TOKEN: &str = "Xy7_tok";

#[derive(Debug, Clone, Copy)]
pub struct DriveServerOptions {
    /// If true, the first request gets the interstitial instead of the body.
    pub interstitial: bool,
    /// If false, the body response carries no Content-Range header.
    pub content_range: bool,
    /// If true, Content-Range announces the full size but only half the body is sent.
    pub short_body: bool,
}

impl Default for DriveServerOptions {
    fn default() -> Self {
        Self {
            interstitial: false,
            content_range: true,
            short_body: false,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct RecordedRequest {
    /// Request target, e.g. `/uc?export=download&id=abc`.
    pub target: String,
    pub range: Option<String>,
    pub cookie: Option<String>,
}

pub struct DriveServer {
    /// Download endpoint to put in the config, with `export=download` preset.
    pub endpoint: String,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl DriveServer {
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }
}

/// Starts a server in a background thread serving `body`. Runs until the process exits.
pub fn start(body: Vec<u8>, opts: DriveServerOptions) -> DriveServer {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    let body = Arc::new(body);
    let requests = Arc::new(Mutex::new(Vec::new()));
    let log = Arc::clone(&requests);
    thread::spawn(move || {
        for stream in listener.incoming().flatten() {
            let body = Arc::clone(&body);
            let log = Arc::clone(&log);
            thread::spawn(move || handle(stream, &body, opts, &log));
        }
    });
    DriveServer {
        endpoint: format!("http://127.0.0.1:{}/uc?export=download", port),
        requests,
    }
}

fn handle(
    mut stream: TcpStream,
    body: &[u8],
    opts: DriveServerOptions,
    log: &Mutex<Vec<RecordedRequest>>,
) {
    let _ = stream.set_read_timeout(Some(Duration::from_secs(2)));
    let _ = stream.set_write_timeout(Some(Duration::from_secs(2)));
    let Some(request) = read_head(&mut stream) else {
        return;
    };
    let recorded = parse_request(&request);
    let confirmed = recorded
        .target
        .split(['?', '&'])
        .any(|pair| pair == format!("confirm={}", TOKEN));
    log.lock().unwrap().push(recorded);

    if opts.interstitial && !confirmed {
        let page = b"<html><body>Google Drive can't scan this file for viruses.</body></html>";
        let response = format!(
            "HTTP/1.1 200 OK\r\nContent-Type: text/html\r\nContent-Length: {}\r\n\
Set-Cookie: download_warning_13058876669334088843={}; Path=/\r\nConnection: close\r\n\r\n",
            page.len(),
            TOKEN
        );
        let _ = stream.write_all(response.as_bytes());
        let _ = stream.write_all(page);
        return;
    }

    let total = body.len();
    let sent = if opts.short_body { &body[..total / 2] } else { body };
    let content_range = if opts.content_range {
        format!("Content-Range: bytes 0-{}/{}\r\n", total.saturating_sub(1), total)
    } else {
        String::new()
    };
    let status = if opts.content_range {
        "206 Partial Content"
    } else {
        "200 OK"
    };
    let response = format!(
        "HTTP/1.1 {}\r\nContent-Type: application/octet-stream\r\nContent-Length: {}\r\n{}Connection: close\r\n\r\n",
        status,
        sent.len(),
        content_range
    );
    let _ = stream.write_all(response.as_bytes());
    let _ = stream.write_all(sent);
}

/// Reads until the end of the request head.
fn read_head(stream: &mut TcpStream) -> Option<String> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
        match stream.read(&mut chunk) {
            Ok(0) | Err(_) => return None,
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
        }
    }
    String::from_utf8(buf).ok()
}

fn parse_request(request: &str) -> RecordedRequest {
    let mut recorded = RecordedRequest::default();
    let mut lines = request.lines();
    if let Some(first) = lines.next() {
        recorded.target = first.split_whitespace().nth(1).unwrap_or("").to_string();
    }
    for line in lines {
        let line = line.trim();
        if line.is_empty() {
            break;
        }
        if let Some((name, value)) = line.split_once(':') {
            let name = name.trim();
            if name.eq_ignore_ascii_case("range") {
                recorded.range = Some(value.trim().to_string());
            } else if name.eq_ignore_ascii_case("cookie") {
                recorded.cookie = Some(value.trim().to_string());
            }
        }
    }
    recorded
}
