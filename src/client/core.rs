//! Sinric Pro client.
//!
//! The [`Client`] ties the WebSocket [`Connection`] to the protocol
//! [`Session`]. The host calls [`Client::poll`] regularly; all I/O,
//! dispatch and replies happen inside that call.
//!
//! # Example
//!
//! ```no_run
//! use sinric_client::{ActionValue, Cause, Client};
//!
//! # async fn example() -> sinric_client::Result<()> {
//! let mut client = Client::builder()
//!     .app_key("app-key")
//!     .app_secret("app-secret")
//!     .device_id("device-1")
//!     .build()?;
//!
//! client.connect(|request| {
//!     println!("{} -> {}", request.action(), request.value);
//!     true
//! })?;
//!
//! loop {
//!     client.poll();
//!     tokio::time::sleep(std::time::Duration::from_millis(10)).await;
//! #   break;
//! }
//!
//! client.notify("device-1", "setPowerState", Cause::PhysicalInteraction, "state", "On")?;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::protocol::{ActionValue, Cause};
use crate::session::{ActionRequest, Session};
use crate::transport::{Connection, ConnectionState, TcpTransport, Transport};

use super::builder::ClientBuilder;

// ============================================================================
// Client
// ============================================================================

/// Sinric Pro device client over a [`Transport`].
pub struct Client<T: Transport> {
    connection: Connection<T>,
    session: Session,
    device_ids: Vec<String>,
}

// ============================================================================
// Client - Display
// ============================================================================

impl<T: Transport> fmt::Debug for Client<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("endpoint", &self.connection.config().endpoint)
            .field("state", &self.connection.state())
            .field("device_ids", &self.device_ids)
            .field("session", &self.session)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Client - Construction
// ============================================================================

impl Client<TcpTransport> {
    /// Creates a configuration builder for the client.
    #[inline]
    #[must_use]
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }
}

impl<T: Transport> Client<T> {
    pub(crate) fn new(connection: Connection<T>, session: Session, device_ids: Vec<String>) -> Self {
        Self {
            connection,
            session,
            device_ids,
        }
    }
}

// ============================================================================
// Client - Public API
// ============================================================================

impl<T: Transport> Client<T> {
    /// Installs `handler` for device actions and starts connecting.
    ///
    /// The handler's return value only affects logging; a success reply is
    /// sent for every recognised action.
    ///
    /// # Errors
    ///
    /// Returns the transport's error if the connect cannot be started.
    pub fn connect<F>(&mut self, handler: F) -> Result<()>
    where
        F: FnMut(&ActionRequest) -> bool + Send + 'static,
    {
        self.session.set_handler(Box::new(handler));
        self.connection.connect()
    }

    /// Starts connecting with the default handler, which logs each action.
    ///
    /// # Errors
    ///
    /// Returns the transport's error if the connect cannot be started.
    pub fn connect_with_default_handler(&mut self) -> Result<()> {
        self.connection.connect()
    }

    /// Sends a signed event reporting a device state change.
    ///
    /// Not retried on failure; the caller decides whether to send again.
    ///
    /// # Errors
    ///
    /// - [`Error::NotConnected`] before the connection is upgraded
    /// - [`Error::BufferOverflow`] if the message does not fit the send buffer
    /// - the transport's write error otherwise
    pub fn notify(
        &mut self,
        device_id: &str,
        action: &str,
        cause: Cause,
        value_name: &str,
        value: impl Into<ActionValue>,
    ) -> Result<()> {
        if !self.connection.is_upgraded() {
            return Err(Error::not_connected(self.connection.state()));
        }
        if !self.device_ids.iter().any(|id| id == device_id) {
            debug!(device_id, "Notify for a device not announced on connect");
        }

        let value = value.into();
        let message = self
            .session
            .notify_message(device_id, action, cause, value_name, &value)?;

        match self.connection.send_text(&message) {
            Ok(()) => {
                info!(action, %cause, "Notify request sent");
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, action, "Failed to send notify request");
                Err(e)
            }
        }
    }

    /// Drives I/O, dispatches received actions and sends their replies.
    ///
    /// Must be called regularly.
    pub fn poll(&mut self) {
        for message in self.connection.poll() {
            let Some(reply) = self.session.handle_message(&message) else {
                continue;
            };

            match self.connection.send_text(&reply) {
                Ok(()) => info!("Response sent"),
                Err(e) => warn!(error = %e, "Failed to send response"),
            }
        }
    }

    /// Estimated server time in Unix seconds.
    #[inline]
    #[must_use]
    pub fn server_time(&self) -> i64 {
        self.session.server_time()
    }

    /// Connection state.
    #[inline]
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.connection.state()
    }

    /// Returns `true` once the WebSocket is up.
    #[inline]
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.connection.is_upgraded()
    }

    /// Device ids announced on connect.
    #[inline]
    #[must_use]
    pub fn device_ids(&self) -> &[String] {
        &self.device_ids
    }

    /// Underlying connection.
    #[inline]
    #[must_use]
    pub fn connection(&self) -> &Connection<T> {
        &self.connection
    }

    /// Protocol session.
    #[inline]
    #[must_use]
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Closes the connection and stops reconnecting.
    pub fn disconnect(&mut self) {
        info!("Client disconnecting");
        self.connection.disconnect();
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;

    use crate::clock::ManualClock;
    use crate::codec::decode_frame;
    use crate::transport::{MemoryHandle, MemoryTransport};

    const UPGRADE: &[u8] =
        b"HTTP/1.1 101 Switching Protocols\r\nConnection: upgrade\r\nUpgrade: websocket\r\n\r\n";

    fn client() -> (Client<MemoryTransport>, MemoryHandle) {
        let (transport, handle) = MemoryTransport::new();
        let client = ClientBuilder::new()
            .app_key("key")
            .app_secret("secret")
            .device_id("d1")
            .clock(Arc::new(ManualClock::new(0)))
            .build_with_transport(transport)
            .unwrap();
        (client, handle)
    }

    #[test]
    fn test_notify_requires_connection() {
        let (mut client, _) = client();
        assert!(matches!(
            client.notify("d1", "setPowerState", Cause::PeriodicPoll, "state", "On"),
            Err(Error::NotConnected { .. })
        ));
    }

    #[test]
    fn test_upgrade_headers_sent() {
        let (mut client, handle) = client();
        client.connect_with_default_handler().unwrap();
        handle.accept();
        client.poll();

        let request = String::from_utf8(handle.take_written().remove(0)).unwrap();
        assert!(request.contains("appkey: key\r\n"));
        assert!(request.contains("deviceids: d1\r\n"));
        assert!(request.contains("platform: Raspberry Pi Pico\r\n"));
    }

    #[test]
    fn test_notify_sends_masked_event() {
        let (mut client, handle) = client();
        client.connect_with_default_handler().unwrap();
        handle.accept();
        handle.push_bytes(UPGRADE);
        client.poll();
        assert!(client.is_connected());
        handle.take_written();

        client
            .notify("d1", "setBrightness", Cause::PhysicalInteraction, "brightness", 40i64)
            .unwrap();

        let mut frame = handle.take_written().remove(0);
        let header = decode_frame(&mut frame).unwrap();
        assert!(header.mask_key.is_some());
        let text = std::str::from_utf8(header.payload(&frame)).unwrap();
        assert!(text.contains(r#""value":{"brightness":40}"#));
        assert!(text.contains(r#""type":"event""#));
    }

    #[test]
    fn test_disconnect() {
        let (mut client, handle) = client();
        client.connect_with_default_handler().unwrap();
        client.disconnect();
        assert_eq!(client.state(), ConnectionState::Disconnected);
        assert_eq!(handle.connect_count(), 1);
    }
}
