//! Protocol session.
//!
//! Turns delivered JSON messages into handler calls and signed replies.
//! Nothing here does I/O: [`Session::handle_message`] returns the reply text
//! and the caller sends it.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::clock::SharedClock;
use crate::error::{Error, Result};
use crate::protocol::{
    ActionDescriptor, ActionValue, Cause, EventPayload, InboundEnvelope, ResponsePayload, Signer,
    ValueField, ValueType, find_action, find_field, find_i64, find_str, signed_envelope,
};

use super::ServerClock;

// ============================================================================
// Types
// ============================================================================

/// Callback for device actions.
///
/// The return value reports whether the action was understood. A reply is
/// sent either way; `false` only produces a warning.
pub type ActionHandler = Box<dyn FnMut(&ActionRequest) -> bool + Send>;

// ============================================================================
// ActionRequest
// ============================================================================

/// A parsed device action.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionRequest {
    /// Target device.
    pub device_id: String,
    /// Requesting client.
    pub client_id: String,
    /// Token echoed in the reply.
    pub reply_token: String,
    /// Server creation time, Unix seconds.
    pub created_at: i64,
    /// Matched action table row.
    pub descriptor: &'static ActionDescriptor,
    /// The action's value.
    pub value: ActionValue,
}

impl ActionRequest {
    /// Action name.
    #[inline]
    #[must_use]
    pub fn action(&self) -> &'static str {
        self.descriptor.action
    }

    /// Declared type of the value.
    #[inline]
    #[must_use]
    pub fn value_type(&self) -> ValueType {
        self.descriptor.value_type
    }
}

fn default_handler(request: &ActionRequest) -> bool {
    info!(
        device_id = %request.device_id,
        action = request.action(),
        value = %request.value,
        "Device action"
    );
    true
}

// ============================================================================
// Session
// ============================================================================

/// Application protocol state: signing key, clock sync and action handler.
pub struct Session {
    signer: Signer,
    clock: SharedClock,
    server_clock: ServerClock,
    handler: Option<ActionHandler>,
    verify_signatures: bool,
}

impl Session {
    /// Creates a session with the default logging handler.
    #[must_use]
    pub fn new(signer: Signer, clock: SharedClock) -> Self {
        Self {
            signer,
            clock,
            server_clock: ServerClock::new(),
            handler: None,
            verify_signatures: false,
        }
    }

    /// Drops requests whose `signature.HMAC` does not match their payload.
    #[must_use]
    pub fn with_signature_verification(mut self, enabled: bool) -> Self {
        self.verify_signatures = enabled;
        self
    }

    /// Installs the action handler.
    pub fn set_handler(&mut self, handler: ActionHandler) {
        self.handler = Some(handler);
    }

    /// Estimated server time in Unix seconds.
    #[must_use]
    pub fn server_time(&self) -> i64 {
        self.server_clock.now(self.clock.now_ms())
    }

    /// Clock-sync state.
    #[inline]
    #[must_use]
    pub fn server_clock(&self) -> &ServerClock {
        &self.server_clock
    }

    /// Handles one inbound message and returns the reply to send, if any.
    ///
    /// Clock-sync messages update the server clock and get no reply.
    /// Malformed, unverifiable or unknown requests are logged and dropped.
    pub fn handle_message(&mut self, text: &str) -> Option<String> {
        debug!(len = text.len(), "Message received");

        let root: Value = match serde_json::from_str(text) {
            Ok(root) => root,
            Err(e) => {
                warn!(error = %e, "Message is not valid JSON");
                return None;
            }
        };

        if let Some(timestamp) = find_i64(&root, "timestamp") {
            self.server_clock.sync(timestamp, self.clock.now_ms());
            info!(timestamp, "Server clock synchronised");
            return None;
        }

        if self.verify_signatures
            && let Err(e) = self.verify(text)
        {
            warn!(error = %e, "Request dropped");
            return None;
        }

        let request = match parse_request(&root) {
            Ok(request) => request,
            Err(e) => {
                warn!(error = %e, "Message unknown or invalid");
                return None;
            }
        };

        let handled = match self.handler.as_mut() {
            Some(handler) => handler(&request),
            None => default_handler(&request),
        };
        if !handled {
            warn!(
                device_id = %request.device_id,
                action = request.action(),
                "Action not handled"
            );
        }

        match self.response(&request) {
            Ok(reply) => Some(reply),
            Err(e) => {
                warn!(error = %e, action = request.action(), "Failed to build response");
                None
            }
        }
    }

    /// Builds a signed event message.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload cannot be serialised or signed.
    pub fn notify_message(
        &self,
        device_id: &str,
        action: &str,
        cause: Cause,
        value_name: &str,
        value: &ActionValue,
    ) -> Result<String> {
        let payload = EventPayload::new(
            action,
            cause,
            device_id,
            self.server_time(),
            ValueField {
                name: value_name,
                value,
            },
        );
        signed_envelope(&payload, &self.signer)
    }

    fn response(&self, request: &ActionRequest) -> Result<String> {
        let payload = ResponsePayload::new(
            request.action(),
            &request.client_id,
            &request.device_id,
            &request.reply_token,
            self.server_time(),
            ValueField {
                name: request.descriptor.value_name,
                value: &request.value,
            },
        );
        signed_envelope(&payload, &self.signer)
    }

    fn verify(&self, text: &str) -> Result<()> {
        let envelope: InboundEnvelope<'_> = serde_json::from_str(text)?;
        let payload = envelope
            .payload
            .ok_or_else(|| Error::missing_field("payload"))?;
        let signature = envelope
            .signature
            .ok_or_else(|| Error::missing_field("signature.HMAC"))?;
        self.signer
            .verify(payload.get().as_bytes(), &signature.hmac)
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("signer", &self.signer)
            .field("server_clock", &self.server_clock)
            .field("custom_handler", &self.handler.is_some())
            .field("verify_signatures", &self.verify_signatures)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Request parsing
// ============================================================================

fn parse_request(root: &Value) -> Result<ActionRequest> {
    let text = |name: &'static str| find_str(root, name).ok_or_else(|| Error::missing_field(name));

    let device_id = text("deviceId")?;
    let client_id = text("clientId")?;
    let reply_token = text("replyToken")?;
    let created_at = find_i64(root, "createdAt").ok_or_else(|| Error::missing_field("createdAt"))?;
    let action = text("action")?;

    let descriptor = find_action(&action).ok_or_else(|| Error::unknown_action(&action))?;
    let value = find_field(root, descriptor.value_name, descriptor.value_type)
        .ok_or_else(|| Error::missing_field(descriptor.value_name))?;

    Ok(ActionRequest {
        device_id,
        client_id,
        reply_token,
        created_at,
        descriptor,
        value,
    })
}

// ============================================================================
// Tests
// ============================================================================
