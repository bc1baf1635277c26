//! Sinric Pro message types.
//!
//! This module defines the JSON messages exchanged with the server and
//! how they are signed.
//!
//! # Protocol Overview
//!
//! | Message | Direction | Purpose |
//! |---------|-----------|---------|
//! | `{"timestamp": n}` | Server → Client | Clock sync, no reply |
//! | Request | Server → Client | Device action, e.g. `setPowerState` |
//! | Response | Client → Server | Signed reply to a request |
//! | Event | Client → Server | Signed unsolicited state change |
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `action` | Action table and value types |
//! | `envelope` | Envelope and payload layouts, signed serialisation |
//! | `json` | Typed field lookup in inbound JSON |
//! | `signature` | HMAC-SHA256 signer |

// ============================================================================
// Submodules
// ============================================================================

/// Action table and typed values.
pub mod action;

/// Envelope and payload types.
pub mod envelope;

/// Field lookup in inbound JSON.
pub mod json;

/// HMAC-SHA256 signing.
pub mod signature;

// ============================================================================
// Re-exports
// ============================================================================

pub use action::{ACTIONS, ActionDescriptor, ActionValue, ValueType, find_action};
pub use envelope::{
    Cause, EventPayload, Header, InboundEnvelope, ResponsePayload, SignatureField, ValueField,
    signed_envelope,
};
pub use json::{find_field, find_i64, find_str};
pub use signature::Signer;
