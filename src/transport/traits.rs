//! Transport boundary.
//!
//! The connection state machine never touches sockets directly. It calls
//! into a [`Transport`] and consumes [`TransportEvent`]s from it during
//! `poll`, so the same state machine runs over tokio TCP or an in-memory
//! queue.

// ============================================================================
// Imports
// ============================================================================

use crate::error::Result;

use super::Endpoint;

// ============================================================================
// TransportEvent
// ============================================================================

/// Something that happened on the underlying byte stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// Connection attempt succeeded.
    Connected,
    /// Connection attempt failed.
    ConnectFailed {
        /// Why the attempt failed.
        reason: String,
    },
    /// Bytes arrived. Chunk boundaries carry no meaning.
    Data(Vec<u8>),
    /// Peer closed the stream or it failed.
    Disconnected {
        /// Error description, `None` for an orderly close.
        reason: Option<String>,
    },
}

// ============================================================================
// Transport
// ============================================================================

/// Reliable, in-order byte stream.
pub trait Transport {
    /// Starts connecting to `endpoint`.
    ///
    /// Completion is reported later through [`TransportEvent::Connected`]
    /// or [`TransportEvent::ConnectFailed`].
    ///
    /// # Errors
    ///
    /// Returns an error if the attempt cannot even be started.
    fn connect(&mut self, endpoint: &Endpoint) -> Result<()>;

    /// Queues `bytes` for sending.
    ///
    /// # Errors
    ///
    /// - [`crate::Error::WriteFailed`] if the local write queue is full
    /// - [`crate::Error::ConnectionClosed`] if there is no open stream
    fn write(&mut self, bytes: &[u8]) -> Result<()>;

    /// Releases the stream. Pending events of the closed stream are dropped.
    ///
    /// # Errors
    ///
    /// Returns an error if the stream could not be shut down cleanly.
    fn close(&mut self) -> Result<()>;

    /// Returns the next pending event without blocking.
    fn poll_event(&mut self) -> Option<TransportEvent>;
}
