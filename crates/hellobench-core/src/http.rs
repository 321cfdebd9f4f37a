//! Minimal HTTP/1.1 wire helpers for the framework-free bindings.
//!
//! The `raw` and `std` adapters never build a request object. They only need
//! three facts about each request head: the method, the path, and whether the
//! client wants the connection kept open. Everything else (headers, query,
//! body) is skipped.
//!
//! ```text
//! read into RequestBuffer
//!   → parse_head()            (memmem for \r\n\r\n, two space scans)
//!     → GET /hello?           → RawResponse::ok()   (pre-serialised, one write)
//!     → anything else         → NOT_FOUND
//!   → consume(head.len)       (pipelined bytes stay buffered)
//! ```

use memchr::memmem;

use crate::config::ROUTE_PATH;

/// Largest request head accepted before the connection is dropped.
pub const MAX_HEAD_SIZE: usize = 8 * 1024;

/// Sent for every request that is not `GET /hello`.
pub static NOT_FOUND: &[u8] = b"HTTP/1.1 404 Not Found\r\ncontent-length: 0\r\n\r\n";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseError {
    /// No `\r\n\r\n` yet.
    Incomplete,
    /// Request line is not `METHOD TARGET VERSION`.
    InvalidFormat,
    /// Head exceeds [`MAX_HEAD_SIZE`].
    TooLarge,
}

/// The parts of a request head the bindings look at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestHead<'a> {
    pub method: &'a [u8],
    /// Target with any query string removed.
    pub path: &'a [u8],
    pub keep_alive: bool,
    /// Bytes up to and including the blank line.
    pub len: usize,
}

impl RequestHead<'_> {
    /// `GET /hello`, exact and case-sensitive.
    #[inline(always)]
    pub fn is_route(&self) -> bool {
        self.method == b"GET" && self.path == ROUTE_PATH.as_bytes()
    }
}

/// Parse one request head from the front of `buf`.
pub fn parse_head(buf: &[u8]) -> Result<RequestHead<'_>, ParseError> {
    let Some(end) = memmem::find(buf, b"\r\n\r\n") else {
        return Err(if buf.len() >= MAX_HEAD_SIZE {
            ParseError::TooLarge
        } else {
            ParseError::Incomplete
        });
    };
    if end + 4 > MAX_HEAD_SIZE {
        return Err(ParseError::TooLarge);
    }

    let head = &buf[..end];
    let line_end = memmem::find(head, b"\r\n").unwrap_or(head.len());
    let mut parts = head[..line_end].split(|&b| b == b' ').filter(|p| !p.is_empty());

    let method = parts.next().ok_or(ParseError::InvalidFormat)?;
    let target = parts.next().ok_or(ParseError::InvalidFormat)?;
    let version = parts.next().ok_or(ParseError::InvalidFormat)?;
    if !version.starts_with(b"HTTP/1.") {
        return Err(ParseError::InvalidFormat);
    }

    let path = match memchr::memchr(b'?', target) {
        Some(q) => &target[..q],
        None => target,
    };

    // HTTP/1.1 defaults to keep-alive, 1.0 to close.
    let mut keep_alive = version != b"HTTP/1.0";
    for line in head[line_end..].split(|&b| b == b'\n').skip(1) {
        let line = line.strip_suffix(b"\r").unwrap_or(line);
        let Some(colon) = memchr::memchr(b':', line) else {
            continue;
        };
        if !line[..colon].eq_ignore_ascii_case(b"connection") {
            continue;
        }
        let value = line[colon + 1..].trim_ascii();
        if value.eq_ignore_ascii_case(b"close") {
            keep_alive = false;
        } else if value.eq_ignore_ascii_case(b"keep-alive") {
            keep_alive = true;
        }
    }

    Ok(RequestHead {
        method,
        path,
        keep_alive,
        len: end + 4,
    })
}

/// Pre-serialised `200 OK` carrying the payload.
///
/// Only `content-length` is emitted: no date, no content-type, no server.
#[derive(Debug, Clone)]
pub struct RawResponse {
    bytes: Box<[u8]>,
}

impl RawResponse {
    pub fn new(payload: &[u8]) -> Self {
        let prefix = format!("HTTP/1.1 200 OK\r\ncontent-length: {}\r\n\r\n", payload.len());
        let mut bytes = Vec::with_capacity(prefix.len() + payload.len());
        bytes.extend_from_slice(prefix.as_bytes());
        bytes.extend_from_slice(payload);
        RawResponse {
            bytes: bytes.into_boxed_slice(),
        }
    }

    #[inline(always)]
    pub fn ok(&self) -> &[u8] {
        &self.bytes
    }
}

/// Per-connection read buffer, allocated once and reused for every request.
pub struct RequestBuffer {
    buf: Box<[u8]>,
    filled: usize,
}

impl RequestBuffer {
    pub fn new() -> Self {
        RequestBuffer {
            buf: vec![0u8; MAX_HEAD_SIZE].into_boxed_slice(),
            filled: 0,
        }
    }

    /// Unfilled tail to read into. Empty when the buffer is full.
    #[inline(always)]
    pub fn spare(&mut self) -> &mut [u8] {
        &mut self.buf[self.filled..]
    }

    #[inline(always)]
    pub fn advance(&mut self, n: usize) {
        self.filled = (self.filled + n).min(self.buf.len());
    }

    #[inline(always)]
    pub fn filled(&self) -> &[u8] {
        &self.buf[..self.filled]
    }

    /// Drop the first `n` bytes, keeping pipelined data.
    pub fn consume(&mut self, n: usize) {
        let n = n.min(self.filled);
        self.buf.copy_within(n..self.filled, 0);
        self.filled -= n;
    }
}

impl Default for RequestBuffer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_route_request() {
        let req = b"GET /hello HTTP/1.1\r\nHost: localhost\r\n\r\n";
        let head = parse_head(req).unwrap();
        assert_eq!(head.method, b"GET");
        assert_eq!(head.path, b"/hello");
        assert!(head.keep_alive);
        assert_eq!(head.len, req.len());
        assert!(head.is_route());
    }

    #[test]
    fn strips_query() {
        let head = parse_head(b"GET /hello?x=1 HTTP/1.1\r\n\r\n").unwrap();
        assert_eq!(head.path, b"/hello");
        assert!(head.is_route());
    }

    #[test]
    fn other_method_or_path_is_not_route() {
        let head = parse_head(b"POST /hello HTTP/1.1\r\n\r\n").unwrap();
        assert!(!head.is_route());
        let head = parse_head(b"GET /Hello HTTP/1.1\r\n\r\n").unwrap();
        assert!(!head.is_route());
        let head = parse_head(b"GET /hello/ HTTP/1.1\r\n\r\n").unwrap();
        assert!(!head.is_route());
    }

    #[test]
    fn incomplete_head() {
        assert_eq!(
            parse_head(b"GET /hello HTTP/1.1\r\nHost: x\r\n"),
            Err(ParseError::Incomplete)
        );
    }

    #[test]
    fn oversized_head() {
        let mut req = b"GET /hello HTTP/1.1\r\nX-Pad: ".to_vec();
        req.resize(MAX_HEAD_SIZE, b'a');
        assert_eq!(parse_head(&req), Err(ParseError::TooLarge));
    }

    #[test]
    fn malformed_request_line() {
        assert_eq!(parse_head(b"GET\r\n\r\n"), Err(ParseError::InvalidFormat));
        assert_eq!(
            parse_head(b"GET /hello SPDY/3\r\n\r\n"),
            Err(ParseError::InvalidFormat)
        );
    }

    #[test]
    fn connection_header_controls_keep_alive() {
        let head = parse_head(b"GET /hello HTTP/1.1\r\nConnection: close\r\n\r\n").unwrap();
        assert!(!head.keep_alive);

        let head = parse_head(b"GET /hello HTTP/1.0\r\n\r\n").unwrap();
        assert!(!head.keep_alive);

        let head = parse_head(b"GET /hello HTTP/1.0\r\nconnection: Keep-Alive\r\n\r\n").unwrap();
        assert!(head.keep_alive);
    }

    #[test]
    fn raw_response_has_only_content_length() {
        let res = RawResponse::new(b"hello world");
        let text = std::str::from_utf8(res.ok()).unwrap();
        assert_eq!(text, "HTTP/1.1 200 OK\r\ncontent-length: 11\r\n\r\nhello world");
    }

    #[test]
    fn buffer_keeps_pipelined_bytes() {
        let mut buf = RequestBuffer::new();
        let two = b"GET /hello HTTP/1.1\r\n\r\nGET /x HTTP/1.1\r\n\r\n";
        buf.spare()[..two.len()].copy_from_slice(two);
        buf.advance(two.len());

        let first = parse_head(buf.filled()).unwrap().len;
        buf.consume(first);
        let second = parse_head(buf.filled()).unwrap();
        assert_eq!(second.path, b"/x");
        assert_eq!(second.len, buf.filled().len());
    }
}
