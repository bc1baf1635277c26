//! In-process transport backed by a shared queue.
//!
//! [`MemoryTransport`] goes into the [`Connection`](super::Connection);
//! the paired [`MemoryHandle`] plays the server side: it queues inbound
//! events and inspects what the client wrote.

// ============================================================================
// Imports
// ============================================================================

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::codec::{MAX_HEADER_LEN, Opcode, encode_frame_with_key};
use crate::error::{Error, Result};

use super::{Endpoint, Transport, TransportEvent};

// ============================================================================
// Shared State
// ============================================================================

#[derive(Debug, Default)]
struct MemoryState {
    events: VecDeque<TransportEvent>,
    written: Vec<Vec<u8>>,
    connects: Vec<Endpoint>,
    closes: usize,
    open: bool,
    reject_writes: bool,
}

// ============================================================================
// MemoryTransport
// ============================================================================

/// Client side of an in-memory stream.
#[derive(Debug)]
pub struct MemoryTransport {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryTransport {
    /// Creates a transport and the handle that controls it.
    #[must_use]
    pub fn new() -> (Self, MemoryHandle) {
        let state = Arc::new(Mutex::new(MemoryState::default()));
        (
            Self {
                state: Arc::clone(&state),
            },
            MemoryHandle { state },
        )
    }
}

impl Transport for MemoryTransport {
    fn connect(&mut self, endpoint: &Endpoint) -> Result<()> {
        let mut state = self.state.lock();
        state.connects.push(endpoint.clone());
        state.open = true;
        Ok(())
    }

    fn write(&mut self, bytes: &[u8]) -> Result<()> {
        let mut state = self.state.lock();
        if !state.open {
            return Err(Error::ConnectionClosed);
        }
        if state.reject_writes {
            return Err(Error::write_failed("write queue full"));
        }
        state.written.push(bytes.to_vec());
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        let mut state = self.state.lock();
        state.open = false;
        state.closes += 1;
        Ok(())
    }

    fn poll_event(&mut self) -> Option<TransportEvent> {
        self.state.lock().events.pop_front()
    }
}

// ============================================================================
// MemoryHandle
// ============================================================================

/// Server side of a [`MemoryTransport`].
#[derive(Debug, Clone)]
pub struct MemoryHandle {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryHandle {
    /// Queues an arbitrary event.
    pub fn push_event(&self, event: TransportEvent) {
        self.state.lock().events.push_back(event);
    }

    /// Completes the pending connect.
    pub fn accept(&self) {
        self.push_event(TransportEvent::Connected);
    }

    /// Fails the pending connect.
    pub fn refuse(&self, reason: impl Into<String>) {
        self.state.lock().open = false;
        self.push_event(TransportEvent::ConnectFailed {
            reason: reason.into(),
        });
    }

    /// Closes the stream from the server side.
    pub fn hang_up(&self) {
        self.state.lock().open = false;
        self.push_event(TransportEvent::Disconnected { reason: None });
    }

    /// Queues raw inbound bytes.
    pub fn push_bytes(&self, bytes: impl Into<Vec<u8>>) {
        self.push_event(TransportEvent::Data(bytes.into()));
    }

    /// Queues an unmasked server frame.
    pub fn push_frame(&self, opcode: Opcode, payload: &[u8]) {
        let mut buf = vec![0u8; payload.len() + MAX_HEADER_LEN];
        if let Ok(len) = encode_frame_with_key(opcode, payload, None, &mut buf) {
            buf.truncate(len);
            self.push_bytes(buf);
        }
    }

    /// Queues an unmasked TEXT frame.
    pub fn push_text(&self, text: &str) {
        self.push_frame(Opcode::Text, text.as_bytes());
    }

    /// Takes everything the client has written so far, one entry per write.
    #[must_use]
    pub fn take_written(&self) -> Vec<Vec<u8>> {
        std::mem::take(&mut self.state.lock().written)
    }

    /// Makes subsequent writes fail as if the local queue were full.
    pub fn set_reject_writes(&self, reject: bool) {
        self.state.lock().reject_writes = reject;
    }

    /// Number of connect attempts made.
    #[must_use]
    pub fn connect_count(&self) -> usize {
        self.state.lock().connects.len()
    }

    /// Endpoint of the latest connect attempt.
    #[must_use]
    pub fn last_endpoint(&self) -> Option<Endpoint> {
        self.state.lock().connects.last().cloned()
    }

    /// Number of times the client closed the stream.
    #[must_use]
    pub fn close_count(&self) -> usize {
        self.state.lock().closes
    }

    /// Returns `true` while the client holds the stream open.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.state.lock().open
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use crate::codec::decode_frame;

    #[test]
    fn test_write_requires_open_stream() {
        let (mut transport, handle) = MemoryTransport::new();
        assert!(matches!(transport.write(b"x"), Err(Error::ConnectionClosed)));

        transport.connect(&Endpoint::default()).unwrap();
        transport.write(b"x").unwrap();
        assert_eq!(handle.take_written(), vec![b"x".to_vec()]);
        assert!(handle.take_written().is_empty());
    }

    #[test]
    fn test_events_in_order() {
        let (mut transport, handle) = MemoryTransport::new();
        handle.accept();
        handle.push_bytes(vec![1, 2]);
        handle.hang_up();

        assert_eq!(transport.poll_event(), Some(TransportEvent::Connected));
        assert_eq!(transport.poll_event(), Some(TransportEvent::Data(vec![1, 2])));
        assert_eq!(
            transport.poll_event(),
            Some(TransportEvent::Disconnected { reason: None })
        );
        assert_eq!(transport.poll_event(), None);
    }

    #[test]
    fn test_push_text_is_unmasked_frame() {
        let (mut transport, handle) = MemoryTransport::new();
        handle.push_text("{}");
        let Some(TransportEvent::Data(mut bytes)) = transport.poll_event() else {
            panic!("expected data event");
        };
        let header = decode_frame(&mut bytes).unwrap();
        assert!(header.mask_key.is_none());
        assert_eq!(header.payload(&bytes), b"{}");
    }

    #[test]
    fn test_counters() {
        let (mut transport, handle) = MemoryTransport::new();
        transport.connect(&Endpoint::default()).unwrap();
        transport.close().unwrap();
        assert_eq!(handle.connect_count(), 1);
        assert_eq!(handle.close_count(), 1);
        assert!(!handle.is_open());
        assert_eq!(handle.last_endpoint(), Some(Endpoint::default()));
    }
}
