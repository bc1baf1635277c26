//! WebSocket connection state machine.
//!
//! Owns one logical connection to the server: the upgrade handshake,
//! inbound buffering and frame dispatch, ping/pong keepalive and automatic
//! reconnection.
//!
//! # Lifecycle
//!
//! ```text
//! Disconnected ──connect()──► Connecting ──Connected──► Connected ──101──► Upgraded
//!      ▲                          │                        │                  │
//!      └──────── failure / peer close / keepalive timeout ─┴──────────────────┘
//! ```
//!
//! Everything happens inside [`Connection::poll`] or the explicit calls;
//! nothing runs concurrently. Teardown reconnects straight away when
//! auto-reconnect is enabled.

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use tracing::{debug, error, info, trace, warn};

use crate::clock::SharedClock;
use crate::codec::{FrameHeader, Opcode, decode_frame, encode_frame};
use crate::error::{Error, Result};

use super::handshake::{header_end, is_upgrade_response, upgrade_request};
use super::{Endpoint, Transport, TransportEvent};

// ============================================================================
// Constants
// ============================================================================

/// Length of `\r\n\r\n` minus one: bytes kept to match a split terminator.
const TERMINATOR_TAIL: usize = 3;

/// Default size of the send and receive buffers.
pub const DEFAULT_BUFFER_CAPACITY: usize = 2048;

/// Default time without a server PING before the connection is dropped.
pub const DEFAULT_KEEPALIVE_TIMEOUT: Duration = Duration::from_secs(300);

// ============================================================================
// ConnectionState
// ============================================================================

/// Connection lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ConnectionState {
    /// No transport open. Initial state and the state after teardown.
    #[default]
    Disconnected,
    /// Transport connect in flight.
    Connecting,
    /// Transport open, upgrade request sent, waiting for `101`.
    Connected,
    /// WebSocket established.
    Upgraded,
}

// ============================================================================
// ConnectionConfig
// ============================================================================

/// Settings for a [`Connection`].
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Server to connect to.
    pub endpoint: Endpoint,
    /// Header lines (CRLF terminated) appended to the upgrade request.
    pub extra_headers: String,
    /// Reconnect immediately after teardown.
    pub auto_reconnect: bool,
    /// Drop the connection after this long without a PING. `None` disables.
    pub keepalive_timeout: Option<Duration>,
    /// Capacity of the send and receive buffers.
    pub buffer_capacity: usize,
}

impl ConnectionConfig {
    /// Creates a config with default buffers, keepalive and reconnect on.
    #[must_use]
    pub fn new(endpoint: Endpoint) -> Self {
        Self {
            endpoint,
            extra_headers: String::new(),
            auto_reconnect: true,
            keepalive_timeout: Some(DEFAULT_KEEPALIVE_TIMEOUT),
            buffer_capacity: DEFAULT_BUFFER_CAPACITY,
        }
    }
}

// ============================================================================
// Connection
// ============================================================================

/// Single client WebSocket connection over a [`Transport`].
pub struct Connection<T: Transport> {
    config: ConnectionConfig,
    transport: T,
    clock: SharedClock,
    state: ConnectionState,
    /// Fixed-capacity frame assembly area for outbound frames.
    send_buffer: Box<[u8]>,
    /// Handshake response bytes, then unprocessed frame bytes.
    recv_buffer: Vec<u8>,
    /// Bytes of a rejected oversized frame still to be skipped.
    discard: u64,
    /// Upgraded, but the 101 response headers have not ended yet.
    headers_pending: bool,
    last_keepalive_ms: u64,
}

impl<T: Transport> Connection<T> {
    /// Creates a disconnected connection.
    #[must_use]
    pub fn new(config: ConnectionConfig, transport: T, clock: SharedClock) -> Self {
        let capacity = config.buffer_capacity;
        let last_keepalive_ms = clock.now_ms();

        Self {
            config,
            transport,
            clock,
            state: ConnectionState::Disconnected,
            send_buffer: vec![0u8; capacity].into_boxed_slice(),
            recv_buffer: Vec::with_capacity(capacity),
            discard: 0,
            headers_pending: false,
            last_keepalive_ms,
        }
    }

    /// Current state.
    #[inline]
    #[must_use]
    pub const fn state(&self) -> ConnectionState {
        self.state
    }

    /// Returns `true` once the upgrade handshake has completed.
    #[inline]
    #[must_use]
    pub fn is_upgraded(&self) -> bool {
        self.state == ConnectionState::Upgraded
    }

    /// Connection settings.
    #[inline]
    #[must_use]
    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// Underlying transport.
    #[inline]
    #[must_use]
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Enables or disables reconnect-on-teardown.
    #[inline]
    pub fn set_auto_reconnect(&mut self, enabled: bool) {
        self.config.auto_reconnect = enabled;
    }

    /// Starts connecting. Does nothing if an attempt is already under way
    /// or the connection is up.
    ///
    /// # Errors
    ///
    /// Returns the transport's error if the attempt cannot be started; the
    /// state stays [`ConnectionState::Disconnected`].
    pub fn connect(&mut self) -> Result<()> {
        if self.state != ConnectionState::Disconnected {
            debug!(state = ?self.state, "Connect ignored, attempt already active");
            return Ok(());
        }

        info!(endpoint = %self.config.endpoint, "WebSocket connecting");

        self.recv_buffer.clear();
        self.discard = 0;
        self.headers_pending = false;
        self.state = ConnectionState::Connecting;

        if let Err(e) = self.transport.connect(&self.config.endpoint) {
            warn!(error = %e, "Transport connect failed");
            self.state = ConnectionState::Disconnected;
            return Err(e);
        }

        Ok(())
    }

    /// Sends one masked TEXT frame.
    ///
    /// # Errors
    ///
    /// - [`Error::NotConnected`] before the upgrade completes
    /// - [`Error::BufferOverflow`] if the frame exceeds the send buffer
    /// - the transport's write error otherwise
    pub fn send_text(&mut self, text: &str) -> Result<()> {
        if self.state != ConnectionState::Upgraded {
            return Err(Error::not_connected(self.state));
        }
        self.send_frame(Opcode::Text, text.as_bytes())
    }

    /// Processes pending transport events and runs the keepalive watchdog.
    ///
    /// Returns the complete JSON text messages received.
    pub fn poll(&mut self) -> Vec<String> {
        let mut delivered = Vec::new();

        while let Some(event) = self.transport.poll_event() {
            match event {
                TransportEvent::Connected => self.on_connected(),
                TransportEvent::ConnectFailed { reason } => {
                    warn!(%reason, "WebSocket connect failed");
                    self.teardown();
                }
                TransportEvent::Data(bytes) => self.on_data(&bytes, &mut delivered),
                TransportEvent::Disconnected { reason } => {
                    match reason {
                        Some(reason) => warn!(%reason, "WebSocket client error"),
                        None => info!("WebSocket closed by remote"),
                    }
                    self.teardown();
                }
            }
        }

        self.check_keepalive();

        delivered
    }

    /// Closes the connection for good: auto-reconnect is switched off first.
    pub fn disconnect(&mut self) {
        self.config.auto_reconnect = false;
        self.teardown();
    }

    // ========================================================================
    // Transport events
    // ========================================================================

    fn on_connected(&mut self) {
        if self.state != ConnectionState::Connecting {
            debug!(state = ?self.state, "Stale connect notification ignored");
            return;
        }

        info!("WebSocket connected, requesting upgrade");

        let request = upgrade_request(&self.config.endpoint, &self.config.extra_headers);
        if request.len() > self.config.buffer_capacity {
            error!(
                needed = request.len(),
                capacity = self.config.buffer_capacity,
                "Upgrade request exceeds send buffer"
            );
            self.config.auto_reconnect = false;
            self.teardown();
            return;
        }

        self.state = ConnectionState::Connected;
        self.last_keepalive_ms = self.clock.now_ms();

        if let Err(e) = self.transport.write(request.as_bytes()) {
            warn!(error = %e, "Failed to send upgrade request");
            self.teardown();
        }
    }

    fn on_data(&mut self, bytes: &[u8], delivered: &mut Vec<String>) {
        match self.state {
            ConnectionState::Connected => self.on_handshake_data(bytes, delivered),
            ConnectionState::Upgraded => self.on_frame_data(bytes, delivered),
            state => debug!(?state, len = bytes.len(), "Data ignored"),
        }
    }

    fn on_handshake_data(&mut self, bytes: &[u8], delivered: &mut Vec<String>) {
        let room = self.config.buffer_capacity - self.recv_buffer.len();
        if bytes.len() > room {
            warn!(
                dropped = bytes.len() - room,
                "Handshake response exceeds receive buffer"
            );
        }
        self.recv_buffer
            .extend_from_slice(&bytes[..bytes.len().min(room)]);

        if !is_upgrade_response(&self.recv_buffer) {
            return;
        }

        info!("WebSocket upgrade acknowledged");
        self.state = ConnectionState::Upgraded;
        self.last_keepalive_ms = self.clock.now_ms();

        let buffered = std::mem::take(&mut self.recv_buffer);
        self.headers_pending = true;
        self.on_frame_data(&buffered, delivered);
    }

    /// Skips the rest of the 101 response headers.
    ///
    /// Returns the bytes after the blank line, or `None` while it has not
    /// arrived. Up to three trailing bytes are carried over in
    /// `recv_buffer` so a terminator split across chunks is still found.
    fn skip_response_headers<'a>(&mut self, bytes: &'a [u8]) -> Option<&'a [u8]> {
        let carried = self.recv_buffer.len();
        let mut window = std::mem::take(&mut self.recv_buffer);
        window.extend_from_slice(bytes);

        match header_end(&window) {
            Some(end) => {
                self.headers_pending = false;
                trace!(skipped = end, "Upgrade response headers complete");
                Some(&bytes[end - carried..])
            }
            None => {
                let keep = window.len().min(TERMINATOR_TAIL);
                self.recv_buffer
                    .extend_from_slice(&window[window.len() - keep..]);
                None
            }
        }
    }

    fn on_frame_data(&mut self, mut bytes: &[u8], delivered: &mut Vec<String>) {
        let capacity = self.config.buffer_capacity;

        if self.headers_pending {
            match self.skip_response_headers(bytes) {
                Some(rest) => bytes = rest,
                None => return,
            }
        }

        while !bytes.is_empty() && self.state == ConnectionState::Upgraded {
            if self.discard > 0 {
                let skip = bytes.len().min(usize::try_from(self.discard).unwrap_or(usize::MAX));
                bytes = &bytes[skip..];
                self.discard -= skip as u64;
                continue;
            }

            let take = (capacity - self.recv_buffer.len()).min(bytes.len());
            self.recv_buffer.extend_from_slice(&bytes[..take]);
            bytes = &bytes[take..];

            self.drain_frames(delivered);

            if self.recv_buffer.len() >= capacity {
                error!(capacity, "Receive buffer stalled, dropping buffered bytes");
                self.recv_buffer.clear();
            }
        }
    }

    // ========================================================================
    // Frames
    // ========================================================================

    fn drain_frames(&mut self, delivered: &mut Vec<String>) {
        let capacity = self.config.buffer_capacity;

        while !self.recv_buffer.is_empty() && self.state == ConnectionState::Upgraded {
            let header = match FrameHeader::parse(&self.recv_buffer) {
                Ok(header) => header,
                Err(Error::IncompleteFrame { .. }) => return,
                Err(e) => {
                    warn!(error = %e, "Undecodable frame header");
                    self.recv_buffer.clear();
                    return;
                }
            };

            let frame_len = match header.frame_len() {
                Some(len) if header.payload_len <= capacity as u64 && len <= capacity as u64 => {
                    len as usize
                }
                len => {
                    warn!(
                        error = %Error::payload_too_large(header.payload_len, capacity),
                        opcode = ?header.opcode,
                        "WEBSOCKET BUFFER OVERFLOW, frame discarded"
                    );
                    self.discard = len
                        .unwrap_or(u64::MAX)
                        .saturating_sub(self.recv_buffer.len() as u64);
                    self.recv_buffer.clear();
                    return;
                }
            };

            if self.recv_buffer.len() < frame_len {
                return;
            }

            let mut frame: Vec<u8> = self.recv_buffer.drain(..frame_len).collect();
            match decode_frame(&mut frame) {
                Ok(header) => self.handle_frame(&header, header.payload(&frame), delivered),
                Err(e) => warn!(error = %e, "Frame decode failed"),
            }
        }
    }

    fn handle_frame(&mut self, header: &FrameHeader, payload: &[u8], delivered: &mut Vec<String>) {
        match header.opcode {
            Opcode::Ping => {
                debug!("Received PING");
                self.last_keepalive_ms = self.clock.now_ms();
                match self.send_frame(Opcode::Pong, &[]) {
                    Ok(()) => debug!("Sent PONG"),
                    Err(e) => warn!(error = %e, "PONG send failed"),
                }
            }

            Opcode::Pong => trace!("Received PONG"),

            Opcode::Close => {
                let code = (payload.len() >= 2).then(|| u16::from_be_bytes([payload[0], payload[1]]));
                let reason = payload
                    .get(2..)
                    .map(String::from_utf8_lossy)
                    .unwrap_or_default();
                info!(?code, %reason, "Connection close received");
            }

            Opcode::Text => {
                if payload.len() < 2 || payload[0] != b'{' {
                    debug!(len = payload.len(), "Non-JSON text frame ignored");
                    return;
                }
                match String::from_utf8(payload.to_vec()) {
                    Ok(text) => {
                        trace!(len = text.len(), "Text message received");
                        delivered.push(text);
                    }
                    Err(e) => warn!(error = %e, "Text frame is not UTF-8"),
                }
            }

            Opcode::Continuation | Opcode::Binary => {
                debug!(opcode = ?header.opcode, len = payload.len(), "Unsupported frame discarded");
            }

            Opcode::Reserved(bits) => {
                warn!(opcode = bits, "Received unknown data, discarded");
            }
        }
    }

    fn send_frame(&mut self, opcode: Opcode, payload: &[u8]) -> Result<()> {
        let len = encode_frame(opcode, payload, true, &mut self.send_buffer).inspect_err(|e| {
            error!(error = %e, ?opcode, "WEBSOCKET BUFFER OVERFLOW");
        })?;

        match self.transport.write(&self.send_buffer[..len]) {
            Ok(()) => Ok(()),
            Err(Error::ConnectionClosed) => {
                warn!("Transport gone while sending");
                self.teardown();
                Err(Error::ConnectionClosed)
            }
            Err(e) => Err(e),
        }
    }

    // ========================================================================
    // Keepalive and teardown
    // ========================================================================

    fn check_keepalive(&mut self) {
        let Some(timeout) = self.config.keepalive_timeout else {
            return;
        };
        if self.state != ConnectionState::Upgraded {
            return;
        }

        let idle_ms = self.clock.now_ms().saturating_sub(self.last_keepalive_ms);
        if idle_ms > timeout.as_millis() as u64 {
            warn!(idle_ms, "Keepalive timeout, dropping connection");
            self.teardown();
        }
    }

    fn teardown(&mut self) {
        if let Err(e) = self.transport.close() {
            warn!(error = %e, "Transport close failed");
        }

        self.state = ConnectionState::Disconnected;
        self.recv_buffer.clear();
        self.discard = 0;
        self.headers_pending = false;
        debug!("WebSocket torn down");

        if self.config.auto_reconnect
            && let Err(e) = self.connect()
        {
            warn!(error = %e, "Reconnect failed");
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
