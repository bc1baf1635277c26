//! Signed message envelopes.
//!
//! # Format
//!
//! ```json
//! {
//!   "header": {"payloadVersion": 2, "signatureVersion": 1},
//!   "payload": { ... },
//!   "signature": {"HMAC": "base64"}
//! }
//! ```
//!
//! The payload is serialised exactly once. Those bytes are both the HMAC
//! input and, embedded as a [`RawValue`], the payload of the transmitted
//! envelope; they are never re-serialised in between.

// ============================================================================
// Imports
// ============================================================================

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::value::RawValue;

use crate::error::Result;

use super::{ActionValue, Signer};

// ============================================================================
// Constants
// ============================================================================

/// Envelope `header.payloadVersion`.
pub const PAYLOAD_VERSION: u32 = 2;

/// Envelope `header.signatureVersion`.
pub const SIGNATURE_VERSION: u32 = 1;

// ============================================================================
// Header
// ============================================================================

/// Envelope header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Header {
    /// Payload format version.
    pub payload_version: u32,
    /// Signature scheme version.
    pub signature_version: u32,
}

impl Default for Header {
    fn default() -> Self {
        Self {
            payload_version: PAYLOAD_VERSION,
            signature_version: SIGNATURE_VERSION,
        }
    }
}

// ============================================================================
// Payloads
// ============================================================================

/// The `value` object: a single `{name: value}` entry.
#[derive(Debug, Clone, Copy)]
pub struct ValueField<'a> {
    /// Field name.
    pub name: &'a str,
    /// Field value.
    pub value: &'a ActionValue,
}

impl Serialize for ValueField<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry(self.name, self.value)?;
        map.end()
    }
}

/// Payload of a response to a device request.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponsePayload<'a> {
    /// Echoed action name.
    pub action: &'a str,
    /// Echoed client id.
    pub client_id: &'a str,
    /// Always `"device"`.
    pub scope: &'static str,
    /// Estimated server time, Unix seconds.
    pub created_at: i64,
    /// Echoed device id.
    pub device_id: &'a str,
    /// Always `"OK"`.
    pub message: &'static str,
    /// Echoed reply token.
    pub reply_token: &'a str,
    /// Always `true`.
    pub success: bool,
    /// Always `"response"`.
    #[serde(rename = "type")]
    pub kind: &'static str,
    /// Echoed value.
    pub value: ValueField<'a>,
}

impl<'a> ResponsePayload<'a> {
    /// Creates a success response.
    #[must_use]
    pub fn new(
        action: &'a str,
        client_id: &'a str,
        device_id: &'a str,
        reply_token: &'a str,
        created_at: i64,
        value: ValueField<'a>,
    ) -> Self {
        Self {
            action,
            client_id,
            scope: "device",
            created_at,
            device_id,
            message: "OK",
            reply_token,
            success: true,
            kind: "response",
            value,
        }
    }
}

/// Why an event was raised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Cause {
    /// A user operated the device locally.
    PhysicalInteraction,
    /// Routine state report.
    PeriodicPoll,
}

impl Cause {
    /// Wire name of the cause.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::PhysicalInteraction => "PHYSICAL_INTERACTION",
            Self::PeriodicPoll => "PERIODIC_POLL",
        }
    }
}

impl std::fmt::Display for Cause {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The `cause` object of an event.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct CauseField {
    /// Cause name, e.g. `PHYSICAL_INTERACTION`.
    #[serde(rename = "type")]
    pub kind: &'static str,
}

/// Payload of an unsolicited device event.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventPayload<'a> {
    /// Action name.
    pub action: &'a str,
    /// Why the event was raised.
    pub cause: CauseField,
    /// Estimated server time, Unix seconds.
    pub created_at: i64,
    /// Device id.
    pub device_id: &'a str,
    /// Set to the device id.
    pub reply_token: &'a str,
    /// Always `"event"`.
    #[serde(rename = "type")]
    pub kind: &'static str,
    /// Reported value.
    pub value: ValueField<'a>,
}

impl<'a> EventPayload<'a> {
    /// Creates an event for `device_id`.
    #[must_use]
    pub fn new(
        action: &'a str,
        cause: Cause,
        device_id: &'a str,
        created_at: i64,
        value: ValueField<'a>,
    ) -> Self {
        Self {
            action,
            cause: CauseField {
                kind: cause.as_str(),
            },
            created_at,
            device_id,
            reply_token: device_id,
            kind: "event",
            value,
        }
    }
}

// ============================================================================
// Envelope
// ============================================================================

/// The `signature` object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignatureField {
    /// Base64 HMAC-SHA256 of the payload bytes.
    #[serde(rename = "HMAC")]
    pub hmac: String,
}

#[derive(Serialize)]
struct Envelope<'a> {
    header: Header,
    payload: &'a RawValue,
    signature: SignatureField,
}

/// Inbound envelope, borrowing the payload's raw text for verification.
#[derive(Debug, Deserialize)]
pub struct InboundEnvelope<'a> {
    /// Raw payload text exactly as received.
    #[serde(borrow, default)]
    pub payload: Option<&'a RawValue>,
    /// Signature, if present.
    #[serde(default)]
    pub signature: Option<SignatureField>,
}

/// Serialises `payload`, signs it and wraps it in an envelope.
///
/// # Errors
///
/// Returns an error if serialisation or signing fails.
pub fn signed_envelope<P: Serialize>(payload: &P, signer: &Signer) -> Result<String> {
    let raw = serde_json::value::to_raw_value(payload)?;
    let hmac = signer.sign(raw.get().as_bytes())?;

    let envelope = Envelope {
        header: Header::default(),
        payload: &raw,
        signature: SignatureField { hmac },
    };

    Ok(serde_json::to_string(&envelope)?)
}

// ============================================================================
// Tests
// ============================================================================
