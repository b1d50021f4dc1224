//! Minimal HTTP/1.1 server for integration tests.
//!
//! Serves one static body at every path except `/missing` (404) and `/stall` (accepts
//! the request and never answers). HEAD answers with
//! Content-Length and, when advertised, Accept-Ranges: bytes; GET with a Range
//! header answers 206 Partial Content. Every response closes the connection.

use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// How long `/stall` holds a connection without answering.
const STALL: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy)]
pub struct RangeServerOptions {
    /// If false, HEAD returns 405 (simulates servers that block HEAD).
    pub head_allowed: bool,
    /// If false, GET ignores Range and always returns 200 with the full body.
    pub support_ranges: bool,
    /// If false, omit `Accept-Ranges: bytes` even if ranges work.
    pub advertise_ranges: bool,
    /// If true, every ranged GET fails with 500 while plain GETs still work.
    pub broken_ranges: bool,
    /// If true, every ranged GET answers 206 with the bytes from offset 0, labelled
    /// `Content-Range: bytes 0-(len-1)/total`, whatever range was asked for.
    pub misplaced_ranges: bool,
    /// If set, range responses claim this total in `Content-Range` (resource changed
    /// size after the HEAD).
    pub resized_total: Option<u64>,
}

impl Default for RangeServerOptions {
    fn default() -> Self {
        Self {
            head_allowed: true,
            support_ranges: true,
            advertise_ranges: true,
            broken_ranges: false,
            misplaced_ranges: false,
            resized_total: None,
        }
    }
}

/// Handle to a running server. The server lives until the process exits.
#[derive(Debug, Clone)]
pub struct RangeServer {
    base: String,
    range_requests: Arc<AtomicUsize>,
}

impl RangeServer {
    /// URL for `path` on this server, e.g. `url("a.bin")`.
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path.trim_start_matches('/'))
    }

    /// GET requests that carried a Range header so far.
    pub fn range_requests(&self) -> usize {
        self.range_requests.load(Ordering::SeqCst)
    }
}

pub fn start(body: Vec<u8>) -> RangeServer {
    start_with_options(body, RangeServerOptions::default())
}

/// Like `start` but allows customizing server behavior (HEAD blocked, ranges missing, etc.).
pub fn start_with_options(body: Vec<u8>, opts: RangeServerOptions) -> RangeServer {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    let body = Arc::new(body);
    let range_requests = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&range_requests);
    thread::spawn(move || {
        for stream in listener.incoming().flatten() {
            let body = Arc::clone(&body);
            let counter = Arc::clone(&counter);
            thread::spawn(move || handle(stream, &body, opts, &counter));
        }
    });
    RangeServer {
        base: format!("http://127.0.0.1:{}/", port),
        range_requests,
    }
}

/// Reads the request head (up to the blank line).
fn read_head(stream: &mut TcpStream) -> Option<String> {
    let mut head = Vec::new();
    let mut buf = [0u8; 4096];
    while !head.windows(4).any(|w| w == b"\r\n\r\n") {
        let n = stream.read(&mut buf).ok()?;
        if n == 0 {
            return None;
        }
        head.extend_from_slice(&buf[..n]);
        if head.len() > 64 * 1024 {
            return None;
        }
    }
    String::from_utf8(head).ok()
}

fn respond(stream: &mut TcpStream, status: &str, headers: &[String], body: &[u8]) {
    let mut response = format!("HTTP/1.1 {}\r\nConnection: close\r\n", status);
    for header in headers {
        response.push_str(header);
        response.push_str("\r\n");
    }
    response.push_str("\r\n");
    let _ = stream.write_all(response.as_bytes());
    let _ = stream.write_all(body);
    let _ = stream.flush();
}

fn handle(mut stream: TcpStream, body: &[u8], opts: RangeServerOptions, range_requests: &AtomicUsize) {
    let _ = stream.set_read_timeout(Some(Duration::from_secs(2)));
    let _ = stream.set_write_timeout(Some(Duration::from_secs(2)));
    let Some(request) = read_head(&mut stream) else {
        return;
    };
    let (method, path, range) = parse_request(&request);
    let total = body.len() as u64;
    let accept_ranges = opts.advertise_ranges.then(|| "Accept-Ranges: bytes".to_string());

    if path == "/stall" {
        thread::sleep(STALL);
        return;
    }

    if path == "/missing" {
        respond(&mut stream, "404 Not Found", &["Content-Length: 0".to_string()], b"");
        return;
    }

    if method.eq_ignore_ascii_case("HEAD") {
        if !opts.head_allowed {
            respond(&mut stream, "405 Method Not Allowed", &["Content-Length: 0".to_string()], b"");
            return;
        }
        let mut headers = vec![format!("Content-Length: {}", total)];
        headers.extend(accept_ranges);
        // HEAD carries the headers of a GET but no body.
        respond(&mut stream, "200 OK", &headers, b"");
        return;
    }

    if !method.eq_ignore_ascii_case("GET") {
        respond(&mut stream, "405 Method Not Allowed", &["Content-Length: 0".to_string()], b"");
        return;
    }

    let ranged = match range {
        Some(r) if opts.support_ranges || opts.broken_ranges => {
            range_requests.fetch_add(1, Ordering::SeqCst);
            Some(r)
        }
        Some(_) => {
            range_requests.fetch_add(1, Ordering::SeqCst);
            None
        }
        None => None,
    };

    match ranged {
        Some(_) if opts.broken_ranges => {
            respond(
                &mut stream,
                "500 Internal Server Error",
                &["Content-Length: 0".to_string()],
                b"",
            );
        }
        Some((start, end_incl)) => {
            let end_incl = end_incl.min(total.saturating_sub(1));
            if start >= total || start > end_incl {
                respond(
                    &mut stream,
                    "416 Range Not Satisfiable",
                    &[format!("Content-Range: bytes */{}", total), "Content-Length: 0".to_string()],
                    b"",
                );
                return;
            }
            let (start, end_incl) = if opts.misplaced_ranges {
                (0, end_incl - start)
            } else {
                (start, end_incl)
            };
            let slice = &body[start as usize..=end_incl as usize];
            let claimed_total = opts.resized_total.unwrap_or(total);
            let mut headers = vec![
                format!("Content-Length: {}", slice.len()),
                format!("Content-Range: bytes {}-{}/{}", start, end_incl, claimed_total),
            ];
            headers.extend(accept_ranges);
            respond(&mut stream, "206 Partial Content", &headers, slice);
        }
        None => {
            let mut headers = vec![format!("Content-Length: {}", total)];
            headers.extend(accept_ranges);
            respond(&mut stream, "200 OK", &headers, body);
        }
    }
}

/// Returns (method, path, optional (start, end_inclusive) for `Range: bytes=X-Y`).
fn parse_request(request: &str) -> (&str, &str, Option<(u64, u64)>) {
    let mut lines = request.lines();
    let mut request_line = lines.next().unwrap_or("").split_whitespace();
    let method = request_line.next().unwrap_or("");
    let path = request_line.next().unwrap_or("/");
    let path = path.split('?').next().unwrap_or(path);

    let mut range = None;
    for line in lines {
        let line = line.trim();
        if line.is_empty() {
            break;
        }
        let Some((name, value)) = line.split_once(':') else {
            continue;
        };
        if !name.trim().eq_ignore_ascii_case("range") {
            continue;
        }
        let value = value.trim();
        let Some(spec) = value.strip_prefix("bytes=") else {
            continue;
        };
        if let Some((a, b)) = spec.split_once('-') {
            let start = a.trim().parse::<u64>().unwrap_or(0);
            let end = b.trim();
            let end_incl = if end.is_empty() {
                u64::MAX
            } else {
                end.parse::<u64>().unwrap_or(0)
            };
            range = Some((start, end_incl));
        }
    }
    (method, path, range)
}
