//! WebSocket transport layer.
//!
//! This module owns the client side of the WebSocket: the byte stream,
//! the HTTP upgrade handshake and the connection state machine that frames
//! and unframes messages.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐                              ┌─────────────────┐
//! │  Session        │                              │  Sinric Pro     │
//! │                 │         WebSocket            │  server         │
//! │  Connection     │◄────────────────────────────►│                 │
//! │  → Transport    │      ws://host:80/           │                 │
//! │                 │                              │                 │
//! └─────────────────┘                              └─────────────────┘
//! ```
//!
//! # Connection Lifecycle
//!
//! 1. `Connection::connect` - Ask the transport to open a stream
//! 2. `TransportEvent::Connected` - Send the upgrade request
//! 3. `HTTP/1.1 101` - Connection is upgraded, frames flow
//! 4. `Connection::poll` - Deliver JSON text messages, answer PINGs
//! 5. Teardown - Close the stream and reconnect if enabled
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `connection` | Connection state machine |
//! | `endpoint` | Server host, port and path |
//! | `handshake` | Upgrade request and response detection |
//! | `memory` | In-process transport for tests |
//! | `tcp` | Tokio TCP transport |
//! | `traits` | `Transport` trait and its events |

// ============================================================================
// Submodules
// ============================================================================

/// WebSocket connection state machine.
pub mod connection;

/// Server endpoint.
pub mod endpoint;

/// HTTP/1.1 upgrade handshake.
pub mod handshake;

/// In-memory transport.
pub mod memory;

/// Tokio TCP transport.
pub mod tcp;

/// Transport trait.
pub mod traits;

// ============================================================================
// Re-exports
// ============================================================================

pub use connection::{
    Connection, ConnectionConfig, ConnectionState, DEFAULT_BUFFER_CAPACITY,
    DEFAULT_KEEPALIVE_TIMEOUT,
};
pub use endpoint::{DEFAULT_ENDPOINT, Endpoint};
pub use memory::{MemoryHandle, MemoryTransport};
pub use tcp::TcpTransport;
pub use traits::{Transport, TransportEvent};
