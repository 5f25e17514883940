//! Per-operation bandwidth accounting.
//!
//! Sizes are estimates of on-the-wire traffic reconstructed from the parts
//! reqwest exposes (request line, headers, body length), not exact socket
//! counts. Usage only ever grows: failed attempts count too.

use reqwest::header::HeaderMap;
use reqwest::{Request, StatusCode};

/// Bytes sent and received over one logical operation, retries included.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BandwidthUsage {
    pub bytes_sent: u64,
    pub bytes_received: u64,
}

impl BandwidthUsage {
    #[must_use]
    pub fn total(&self) -> u64 {
        self.bytes_sent + self.bytes_received
    }

    /// Fold another attempt's cost into this total.
    pub fn absorb(&mut self, other: BandwidthUsage) {
        self.bytes_sent += other.bytes_sent;
        self.bytes_received += other.bytes_received;
    }
}

/// Estimated size of an outgoing request: request line + headers + body.
pub(crate) fn estimate_request_size(request: &Request) -> u64 {
    let query_len = request.url().query().map_or(0, |q| q.len() + 1);
    // "GET <path>?<query> HTTP/1.1\r\n" framing is 12 bytes beyond the parts
    let request_line = request.method().as_str().len() + request.url().path().len() + query_len + 12;
    let body_len = request
        .body()
        .and_then(reqwest::Body::as_bytes)
        .map_or(0, <[u8]>::len);
    (request_line + header_block_size(request.headers()) + body_len) as u64
}

/// Estimated size of a received response: status line + headers + body.
pub(crate) fn estimate_response_size(
    status: StatusCode,
    headers: &HeaderMap,
    body_len: usize,
) -> u64 {
    // "HTTP/1.1 NNN <reason>\r\n" framing is 15 bytes beyond the reason
    let status_line = status.canonical_reason().unwrap_or("").len() + 15;
    (status_line + header_block_size(headers) + body_len) as u64
}

/// "name: value\r\n" per header, plus the terminating blank line.
fn header_block_size(headers: &HeaderMap) -> usize {
    headers
        .iter()
        .map(|(name, value)| name.as_str().len() + value.as_bytes().len() + 4)
        .sum::<usize>()
        + 2
}
