//! HTTP/1.1 upgrade handshake.
//!
//! The request uses a fixed `Sec-WebSocket-Key`; the server's
//! `Sec-WebSocket-Accept` is not checked. The response is accepted once it
//! contains the status line and both upgrade tokens, matched
//! case-sensitively.

// ============================================================================
// Imports
// ============================================================================

use super::Endpoint;

// ============================================================================
// Constants
// ============================================================================

/// Constant handshake key sent on every connection.
pub const WEBSOCKET_KEY: &str = "x3JJHMbDL1EzLkh9GBhXDw==";

/// Markers that must all appear in the upgrade response.
const UPGRADE_MARKERS: [&[u8]; 3] = [
    b"HTTP/1.1 101",
    b"Connection: upgrade",
    b"Upgrade: websocket",
];

const HEADER_TERMINATOR: &[u8] = b"\r\n\r\n";

// ============================================================================
// Request
// ============================================================================

/// Builds the upgrade `GET` request.
///
/// `extra_headers` is appended verbatim before the terminating blank line;
/// each of its lines must already end in CRLF.
#[must_use]
pub fn upgrade_request(endpoint: &Endpoint, extra_headers: &str) -> String {
    format!(
        "GET {path} HTTP/1.1\r\n\
         Host: {host}:{port}\r\n\
         Upgrade: websocket\r\n\
         Connection: Upgrade\r\n\
         Sec-WebSocket-Key: {key}\r\n\
         Sec-WebSocket-Version: 13\r\n\
         {extra_headers}\r\n",
        path = endpoint.path(),
        host = endpoint.host(),
        port = endpoint.port(),
        key = WEBSOCKET_KEY,
    )
}

// ============================================================================
// Response
// ============================================================================

/// Returns `true` once `response` holds all three upgrade markers.
#[must_use]
pub fn is_upgrade_response(response: &[u8]) -> bool {
    UPGRADE_MARKERS
        .iter()
        .all(|marker| find(response, marker).is_some())
}

/// Offset just past the `\r\n\r\n` ending the response headers.
#[must_use]
pub fn header_end(response: &[u8]) -> Option<usize> {
    find(response, HEADER_TERMINATOR).map(|pos| pos + HEADER_TERMINATOR.len())
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

// ============================================================================
// Tests
// ============================================================================
