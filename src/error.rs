//! Error types for the Sinric Pro client.
//!
//! This module defines all error types used throughout the crate.
//!
//! # Usage
//!
//! All fallible operations return [`Result<T>`] which uses [`Error`]:
//!
//! ```ignore
//! use sinric_client::{ActionValue, Cause, Result};
//!
//! fn press(client: &mut Client) -> Result<()> {
//!     client.notify("dimmer-1", "setPowerState", Cause::PhysicalInteraction, "state", ActionValue::text("On"))?;
//!     Ok(())
//! }
//! ```
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Configuration | [`Error::Config`] |
//! | Transport | [`Error::Connection`], [`Error::ConnectionClosed`], [`Error::NotConnected`], [`Error::WriteFailed`] |
//! | Capacity | [`Error::BufferOverflow`], [`Error::PayloadTooLarge`] |
//! | Decode | [`Error::IncompleteFrame`], [`Error::Protocol`], [`Error::UnknownAction`], [`Error::MissingField`], [`Error::Signature`] |
//! | External | [`Error::Io`], [`Error::Json`], [`Error::Url`] |

// ============================================================================
// Imports
// ============================================================================

use std::io::Error as IoError;
use std::result::Result as StdResult;

use thiserror::Error;

use crate::transport::ConnectionState;

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
///
/// All fallible operations in this crate return this type.
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
///
/// Each variant includes relevant context for debugging.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Configuration error.
    ///
    /// Returned when client configuration is invalid.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    // ========================================================================
    // Transport Errors
    // ========================================================================
    /// Transport connection failed.
    #[error("Connection failed: {message}")]
    Connection {
        /// Description of the connection error.
        message: String,
    },

    /// Transport closed while an operation was in progress.
    #[error("Connection closed")]
    ConnectionClosed,

    /// Operation requires an upgraded WebSocket connection.
    #[error("Not connected (state: {state:?})")]
    NotConnected {
        /// Connection state at the time of the call.
        state: ConnectionState,
    },

    /// Transport refused the write (local queue full or socket gone).
    #[error("Write failed: {message}")]
    WriteFailed {
        /// Description of the write failure.
        message: String,
    },

    // ========================================================================
    // Capacity Errors
    // ========================================================================
    /// Encoded output would not fit the fixed-capacity buffer.
    ///
    /// Nothing is written when this is returned.
    #[error("Buffer overflow: need {needed} bytes, capacity {capacity}")]
    BufferOverflow {
        /// Bytes the complete output requires.
        needed: usize,
        /// Capacity of the destination buffer.
        capacity: usize,
    },

    /// Inbound frame declares a payload larger than the receive buffer.
    #[error("Frame payload of {declared} bytes exceeds capacity {capacity}")]
    PayloadTooLarge {
        /// Payload length declared by the frame header.
        declared: u64,
        /// Receive buffer capacity.
        capacity: usize,
    },

    // ========================================================================
    // Decode Errors
    // ========================================================================
    /// Not enough bytes to decode a frame header.
    #[error("Incomplete frame: need {needed} bytes, have {available}")]
    IncompleteFrame {
        /// Bytes required.
        needed: usize,
        /// Bytes available.
        available: usize,
    },

    /// Protocol violation or malformed message.
    #[error("Protocol error: {message}")]
    Protocol {
        /// Description of the protocol violation.
        message: String,
    },

    /// Action name not present in the action table.
    #[error("Unknown action: {action}")]
    UnknownAction {
        /// The unrecognised action name.
        action: String,
    },

    /// Required JSON field missing or of the wrong type.
    #[error("Missing field: {field}")]
    MissingField {
        /// Name of the missing field.
        field: String,
    },

    /// Signature could not be produced or did not verify.
    #[error("Signature error: {message}")]
    Signature {
        /// Description of the signature failure.
        message: String,
    },

    // ========================================================================
    // External Errors
    // ========================================================================
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] IoError),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Endpoint URL could not be parsed.
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates a connection error.
    #[inline]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Creates a not connected error.
    #[inline]
    pub fn not_connected(state: ConnectionState) -> Self {
        Self::NotConnected { state }
    }

    /// Creates a write failed error.
    #[inline]
    pub fn write_failed(message: impl Into<String>) -> Self {
        Self::WriteFailed {
            message: message.into(),
        }
    }

    /// Creates a buffer overflow error.
    #[inline]
    pub fn buffer_overflow(needed: usize, capacity: usize) -> Self {
        Self::BufferOverflow { needed, capacity }
    }

    /// Creates a payload too large error.
    #[inline]
    pub fn payload_too_large(declared: u64, capacity: usize) -> Self {
        Self::PayloadTooLarge { declared, capacity }
    }

    /// Creates an incomplete frame error.
    #[inline]
    pub fn incomplete_frame(needed: usize, available: usize) -> Self {
        Self::IncompleteFrame { needed, available }
    }

    /// Creates a protocol error.
    #[inline]
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }

    /// Creates an unknown action error.
    #[inline]
    pub fn unknown_action(action: impl Into<String>) -> Self {
        Self::UnknownAction {
            action: action.into(),
        }
    }

    /// Creates a missing field error.
    #[inline]
    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::MissingField {
            field: field.into(),
        }
    }

    /// Creates a signature error.
    #[inline]
    pub fn signature(message: impl Into<String>) -> Self {
        Self::Signature {
            message: message.into(),
        }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if this is a transport-level error.
    #[inline]
    #[must_use]
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Self::Connection { .. }
                | Self::ConnectionClosed
                | Self::NotConnected { .. }
                | Self::WriteFailed { .. }
                | Self::Io(_)
        )
    }

    /// Returns `true` if a fixed-capacity buffer would have overflowed.
    #[inline]
    #[must_use]
    pub fn is_capacity_error(&self) -> bool {
        matches!(
            self,
            Self::BufferOverflow { .. } | Self::PayloadTooLarge { .. }
        )
    }

    /// Returns `true` if this error is recoverable.
    ///
    /// Recoverable errors may succeed on retry, e.g. a `notify` issued
    /// while the connection is re-establishing.
    #[inline]
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::ConnectionClosed | Self::NotConnected { .. } | Self::WriteFailed { .. }
        )
    }
}

// ============================================================================
// Tests
// ============================================================================
