//! Sinric Pro client - Poll-driven device client for the Sinric Pro service.
//!
//! This library connects a device to the Sinric Pro cloud over a plain
//! WebSocket, receives device actions, and answers with HMAC-signed JSON.
//!
//! # Architecture
//!
//! Three layers, leaf first:
//!
//! - **Frame codec**: RFC 6455 frame encode/decode and masking, no I/O
//! - **Connection**: upgrade handshake, frame dispatch, keepalive, reconnect
//! - **Session**: clock sync, action table dispatch, signed replies and events
//!
//! Key design principles:
//!
//! - Everything runs inside [`Client::poll`], on the caller's thread
//! - Buffers are fixed-capacity; oversize input is rejected, never buffered
//! - The signed payload bytes are the transmitted payload bytes
//! - The byte stream sits behind the [`Transport`] trait
//!
//! # Quick Start
//!
//! ```no_run
//! use std::time::Duration;
//!
//! use sinric_client::{Client, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let mut client = Client::builder()
//!         .app_key("app-key")
//!         .app_secret("app-secret")
//!         .device_id("dimmer-1")
//!         .build()?;
//!
//!     client.connect(|request| {
//!         println!("{} {} = {}", request.device_id, request.action(), request.value);
//!         true
//!     })?;
//!
//!     loop {
//!         client.poll();
//!         tokio::time::sleep(Duration::from_millis(10)).await;
//!     }
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`client`] | [`Client`] and [`ClientBuilder`] |
//! | [`clock`] | Monotonic clock abstraction |
//! | [`codec`] | WebSocket frame codec |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`protocol`] | Action table, envelopes, signing |
//! | [`session`] | Protocol session and server clock |
//! | [`transport`] | Connection state machine and transports |

// ============================================================================
// Modules
// ============================================================================

/// Client entry point and configuration.
///
/// Use [`Client::builder()`] to create a configured client.
pub mod client;

/// Monotonic clock abstraction.
pub mod clock;

/// WebSocket frame codec.
pub mod codec;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Sinric Pro message types.
///
/// Action table, typed values, envelopes and the HMAC signer.
pub mod protocol;

/// Protocol session.
///
/// Clock sync, action dispatch and signed message construction.
pub mod session;

/// WebSocket transport layer.
///
/// Connection state machine plus the TCP and in-memory transports.
pub mod transport;

// ============================================================================
// Re-exports
// ============================================================================

// Client types
pub use client::{Client, ClientBuilder};

// Clock types
pub use clock::{Clock, ManualClock, MonotonicClock, SharedClock};

// Error types
pub use error::{Error, Result};

// Protocol types
pub use protocol::{ActionDescriptor, ActionValue, Cause, Signer, ValueType};

// Session types
pub use session::{ActionHandler, ActionRequest, DeviceIdentity, ServerClock, Session};

// Transport types
pub use transport::{
    Connection, ConnectionConfig, ConnectionState, Endpoint, MemoryHandle, MemoryTransport,
    TcpTransport, Transport, TransportEvent,
};
