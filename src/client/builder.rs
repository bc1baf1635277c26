//! Builder pattern for client configuration.
//!
//! Provides a fluent API for configuring and creating [`Client`] instances.
//!
//! # Example
//!
//! ```no_run
//! use sinric_client::Client;
//!
//! # async fn example() -> sinric_client::Result<()> {
//! let client = Client::builder()
//!     .app_key("de0bxxxx-1x3x-4x3x-ax2x-5dabxxxxxxxx")
//!     .app_secret("5f36xxxx-x3x7-4x3x-xexe-e86724a9xxxx")
//!     .device_id("5dc1564130xxxxxxxxxxxxxx")
//!     .build()?;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use crate::clock::{MonotonicClock, SharedClock};
use crate::codec::MAX_HEADER_LEN;
use crate::error::{Error, Result};
use crate::protocol::Signer;
use crate::session::{DEFAULT_PLATFORM, DeviceIdentity, Session};
use crate::transport::handshake::upgrade_request;
use crate::transport::{
    Connection, ConnectionConfig, DEFAULT_BUFFER_CAPACITY, DEFAULT_ENDPOINT,
    DEFAULT_KEEPALIVE_TIMEOUT, Endpoint, TcpTransport, Transport,
};

use super::core::Client;

// ============================================================================
// ClientBuilder
// ============================================================================

/// Builder for configuring a [`Client`] instance.
///
/// Use [`Client::builder()`] to create a new builder.
#[derive(Clone)]
pub struct ClientBuilder {
    /// Server URL.
    endpoint: String,
    /// Pre-resolved server address.
    address: Option<IpAddr>,
    /// Application key.
    app_key: Option<String>,
    /// Application secret.
    app_secret: Option<String>,
    /// Devices served by this client.
    device_ids: Vec<String>,
    firmware_version: String,
    platform: String,
    local_ip: String,
    local_mac: String,
    restore_device_states: bool,
    auto_reconnect: bool,
    keepalive_timeout: Option<Duration>,
    buffer_capacity: usize,
    verify_signatures: bool,
    clock: Option<SharedClock>,
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            address: None,
            app_key: None,
            app_secret: None,
            device_ids: Vec::new(),
            firmware_version: env!("CARGO_PKG_VERSION").to_string(),
            platform: DEFAULT_PLATFORM.to_string(),
            local_ip: String::new(),
            local_mac: String::new(),
            restore_device_states: true,
            auto_reconnect: true,
            keepalive_timeout: Some(DEFAULT_KEEPALIVE_TIMEOUT),
            buffer_capacity: DEFAULT_BUFFER_CAPACITY,
            verify_signatures: false,
            clock: None,
        }
    }
}

impl fmt::Debug for ClientBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientBuilder")
            .field("endpoint", &self.endpoint)
            .field("address", &self.address)
            .field("app_key", &self.app_key)
            .field("app_secret", &self.app_secret.as_ref().map(|_| "<redacted>"))
            .field("device_ids", &self.device_ids)
            .field("auto_reconnect", &self.auto_reconnect)
            .field("keepalive_timeout", &self.keepalive_timeout)
            .field("buffer_capacity", &self.buffer_capacity)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// ClientBuilder Implementation
// ============================================================================

impl ClientBuilder {
    /// Creates a builder with default settings.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the server URL (`ws://host[:port][/path]`).
    #[inline]
    #[must_use]
    pub fn endpoint(mut self, url: impl Into<String>) -> Self {
        self.endpoint = url.into();
        self
    }

    /// Connects to `address` instead of resolving the endpoint host.
    ///
    /// The host name is still sent in the `Host` header.
    #[inline]
    #[must_use]
    pub fn address(mut self, address: IpAddr) -> Self {
        self.address = Some(address);
        self
    }

    /// Sets the application key.
    #[inline]
    #[must_use]
    pub fn app_key(mut self, key: impl Into<String>) -> Self {
        self.app_key = Some(key.into());
        self
    }

    /// Sets the application secret used to sign messages.
    #[inline]
    #[must_use]
    pub fn app_secret(mut self, secret: impl Into<String>) -> Self {
        self.app_secret = Some(secret.into());
        self
    }

    /// Adds a device id.
    #[inline]
    #[must_use]
    pub fn device_id(mut self, id: impl Into<String>) -> Self {
        self.device_ids.push(id.into());
        self
    }

    /// Adds several device ids.
    #[must_use]
    pub fn device_ids<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.device_ids.extend(ids.into_iter().map(Into::into));
        self
    }

    /// Sets the reported firmware version. Defaults to the crate version.
    #[inline]
    #[must_use]
    pub fn firmware_version(mut self, version: impl Into<String>) -> Self {
        self.firmware_version = version.into();
        self
    }

    /// Sets the reported platform name.
    #[inline]
    #[must_use]
    pub fn platform(mut self, platform: impl Into<String>) -> Self {
        self.platform = platform.into();
        self
    }

    /// Sets the reported local IP address.
    #[inline]
    #[must_use]
    pub fn local_ip(mut self, ip: impl Into<String>) -> Self {
        self.local_ip = ip.into();
        self
    }

    /// Sets the reported local MAC address.
    #[inline]
    #[must_use]
    pub fn local_mac(mut self, mac: impl Into<String>) -> Self {
        self.local_mac = mac.into();
        self
    }

    /// Asks the server to replay device states on connect. Default `true`.
    #[inline]
    #[must_use]
    pub fn restore_device_states(mut self, enabled: bool) -> Self {
        self.restore_device_states = enabled;
        self
    }

    /// Reconnects automatically after the connection drops. Default `true`.
    #[inline]
    #[must_use]
    pub fn auto_reconnect(mut self, enabled: bool) -> Self {
        self.auto_reconnect = enabled;
        self
    }

    /// Drops the connection when no PING arrives within `timeout`.
    #[inline]
    #[must_use]
    pub fn keepalive_timeout(mut self, timeout: Duration) -> Self {
        self.keepalive_timeout = Some(timeout);
        self
    }

    /// Disables the keepalive watchdog.
    #[inline]
    #[must_use]
    pub fn no_keepalive(mut self) -> Self {
        self.keepalive_timeout = None;
        self
    }

    /// Sets the send and receive buffer capacity in bytes.
    #[inline]
    #[must_use]
    pub fn buffer_capacity(mut self, capacity: usize) -> Self {
        self.buffer_capacity = capacity;
        self
    }

    /// Drops inbound requests whose signature does not verify.
    #[inline]
    #[must_use]
    pub fn verify_signatures(mut self, enabled: bool) -> Self {
        self.verify_signatures = enabled;
        self
    }

    /// Sets the clock driving keepalive and server time.
    #[inline]
    #[must_use]
    pub fn clock(mut self, clock: SharedClock) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Builds a client over TCP on the current tokio runtime.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if a setting is missing or invalid
    /// - [`Error::Config`] if called outside a tokio runtime
    /// - [`Error::Url`] if the endpoint URL is malformed
    pub fn build(self) -> Result<Client<TcpTransport>> {
        let transport = TcpTransport::current()?;
        self.build_with_transport(transport)
    }

    /// Builds a client over `transport`.
    ///
    /// # Errors
    ///
    /// Same as [`build`](Self::build), except for the runtime requirement.
    pub fn build_with_transport<T: Transport>(self, transport: T) -> Result<Client<T>> {
        let endpoint = self.validate_endpoint()?;
        let identity = self.validate_identity()?;
        let secret = self.validate_secret()?;

        let extra_headers = identity.upgrade_headers();
        self.validate_capacity(&endpoint, &extra_headers)?;

        let clock = self
            .clock
            .unwrap_or_else(|| Arc::new(MonotonicClock::new()));

        let mut config = ConnectionConfig::new(endpoint);
        config.extra_headers = extra_headers;
        config.auto_reconnect = self.auto_reconnect;
        config.keepalive_timeout = self.keepalive_timeout;
        config.buffer_capacity = self.buffer_capacity;

        let connection = Connection::new(config, transport, Arc::clone(&clock));
        let session = Session::new(Signer::new(secret), clock)
            .with_signature_verification(self.verify_signatures);

        Ok(Client::new(connection, session, identity.device_ids))
    }
}

// ============================================================================
// Validation
// ============================================================================

impl ClientBuilder {
    /// Validates the endpoint URL and applies the address override.
    fn validate_endpoint(&self) -> Result<Endpoint> {
        let endpoint = Endpoint::parse(&self.endpoint)?;
        Ok(match self.address {
            Some(address) => endpoint.with_address(address),
            None => endpoint,
        })
    }

    /// Validates the app key, device ids and header values.
    fn validate_identity(&self) -> Result<DeviceIdentity> {
        let app_key = self
            .app_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| {
                Error::config(
                    "App key is required. Use .app_key() to set it.\n\
                     Example: Client::builder().app_key(\"de0bxxxx-...\")",
                )
            })?;

        if self.device_ids.is_empty() {
            return Err(Error::config(
                "At least one device id is required. Use .device_id() to add one.",
            ));
        }
        if let Some(id) = self
            .device_ids
            .iter()
            .find(|id| id.trim().is_empty() || id.contains(';'))
        {
            return Err(Error::config(format!(
                "Invalid device id '{id}': must be non-empty and must not contain ';'"
            )));
        }

        let mut identity = DeviceIdentity::new(app_key, self.device_ids.clone());
        identity.restore_device_states = self.restore_device_states;
        identity.platform = self.platform.clone();
        identity.mac = self.local_mac.clone();
        identity.ip = self.local_ip.clone();
        identity.firmware_version = self.firmware_version.clone();

        let values = [
            ("app key", identity.app_key.as_str()),
            ("platform", identity.platform.as_str()),
            ("local MAC", identity.mac.as_str()),
            ("local IP", identity.ip.as_str()),
            ("firmware version", identity.firmware_version.as_str()),
        ];
        let ids = identity.device_ids.iter().map(|id| ("device id", id.as_str()));
        if let Some((name, _)) = values
            .into_iter()
            .chain(ids)
            .find(|(_, value)| value.contains(['\r', '\n']))
        {
            return Err(Error::config(format!(
                "The {name} must not contain line breaks"
            )));
        }

        Ok(identity)
    }

    /// Validates the app secret.
    fn validate_secret(&self) -> Result<String> {
        self.app_secret
            .clone()
            .filter(|secret| !secret.is_empty())
            .ok_or_else(|| {
                Error::config(
                    "App secret is required. Use .app_secret() to set it.\n\
                     Example: Client::builder().app_secret(\"5f36xxxx-...\")",
                )
            })
    }

    /// Checks the buffers can hold a frame header and the upgrade request.
    fn validate_capacity(&self, endpoint: &Endpoint, extra_headers: &str) -> Result<()> {
        if self.buffer_capacity <= MAX_HEADER_LEN {
            return Err(Error::config(format!(
                "Buffer capacity {} is too small, need more than {MAX_HEADER_LEN} bytes",
                self.buffer_capacity
            )));
        }

        let request_len = upgrade_request(endpoint, extra_headers).len();
        if request_len > self.buffer_capacity {
            return Err(Error::config(format!(
                "Upgrade request needs {request_len} bytes but the buffer capacity is {}.\n\
                 Increase it with .buffer_capacity() or shorten the device list.",
                self.buffer_capacity
            )));
        }

        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::net::Ipv4Addr;

    use crate::transport::{ConnectionState, MemoryTransport};

    fn valid() -> ClientBuilder {
        ClientBuilder::new()
            .app_key("key")
            .app_secret("secret")
            .device_id("d1")
    }

    #[test]
    fn test_new_has_defaults() {
        let builder = ClientBuilder::new();
        assert_eq!(builder.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(builder.platform, DEFAULT_PLATFORM);
        assert!(builder.restore_device_states);
        assert!(builder.auto_reconnect);
        assert_eq!(builder.keepalive_timeout, Some(DEFAULT_KEEPALIVE_TIMEOUT));
        assert_eq!(builder.buffer_capacity, DEFAULT_BUFFER_CAPACITY);
        assert!(!builder.verify_signatures);
    }

    #[test]
    fn test_setters() {
        let builder = valid()
            .device_ids(["d2", "d3"])
            .no_keepalive()
            .auto_reconnect(false)
            .buffer_capacity(4096);
        assert_eq!(builder.device_ids, vec!["d1", "d2", "d3"]);
        assert_eq!(builder.keepalive_timeout, None);
        assert!(!builder.auto_reconnect);
        assert_eq!(builder.buffer_capacity, 4096);
    }

    #[test]
    fn test_build_with_transport() {
        let (transport, _) = MemoryTransport::new();
        let client = valid()
            .address(IpAddr::V4(Ipv4Addr::LOCALHOST))
            .build_with_transport(transport)
            .unwrap();
        assert_eq!(client.state(), ConnectionState::Disconnected);
    }

    #[test]
    fn test_missing_app_key() {
        let (transport, _) = MemoryTransport::new();
        let err = ClientBuilder::new()
            .app_secret("s")
            .device_id("d")
            .build_with_transport(transport)
            .unwrap_err();
        assert!(err.to_string().contains("App key"));
    }

    #[test]
    fn test_missing_secret() {
        let (transport, _) = MemoryTransport::new();
        let err = ClientBuilder::new()
            .app_key("k")
            .device_id("d")
            .build_with_transport(transport)
            .unwrap_err();
        assert!(err.to_string().contains("App secret"));
    }

    #[test]
    fn test_device_ids_validated() {
        let (transport, _) = MemoryTransport::new();
        assert!(
            ClientBuilder::new()
                .app_key("k")
                .app_secret("s")
                .build_with_transport(transport)
                .is_err()
        );

        let (transport, _) = MemoryTransport::new();
        assert!(valid().device_id("a;b").build_with_transport(transport).is_err());
    }

    #[test]
    fn test_header_injection_rejected() {
        let (transport, _) = MemoryTransport::new();
        let err = valid()
            .platform("pico\r\nX-Evil: 1")
            .build_with_transport(transport)
            .unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
    }

    #[test]
    fn test_capacity_must_fit_request() {
        let (transport, _) = MemoryTransport::new();
        let err = valid().buffer_capacity(100).build_with_transport(transport).unwrap_err();
        assert!(err.to_string().contains("Upgrade request needs"));

        let (transport, _) = MemoryTransport::new();
        assert!(valid().buffer_capacity(8).build_with_transport(transport).is_err());
    }

    #[test]
    fn test_tls_endpoint_rejected() {
        let (transport, _) = MemoryTransport::new();
        assert!(
            valid()
                .endpoint("wss://ws.sinric.pro")
                .build_with_transport(transport)
                .is_err()
        );
    }

    #[test]
    fn test_debug_redacts_secret() {
        let debug = format!("{:?}", valid());
        assert!(!debug.contains("\"secret\""));
        assert!(debug.contains("<redacted>"));
    }
}
