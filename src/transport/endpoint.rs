//! Server endpoint description.

// ============================================================================
// Imports
// ============================================================================

use std::net::{IpAddr, SocketAddr};

use url::Url;

use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Sinric Pro WebSocket endpoint (plain, port 80).
pub const DEFAULT_ENDPOINT: &str = "ws://ws.sinric.pro:80/";

// ============================================================================
// Endpoint
// ============================================================================

/// Host, port and request path of the WebSocket server.
///
/// `address` holds a pre-resolved IP; when absent the transport resolves
/// `host` itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    host: String,
    port: u16,
    path: String,
    address: Option<IpAddr>,
}

impl Endpoint {
    /// Creates an endpoint for `host:port` with path `/`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the host is empty or the port is zero.
    pub fn new(host: impl Into<String>, port: u16) -> Result<Self> {
        let host = host.into();
        if host.trim().is_empty() {
            return Err(Error::config("Endpoint host must not be empty"));
        }
        if port == 0 {
            return Err(Error::config("Endpoint port must not be zero"));
        }

        Ok(Self {
            host,
            port,
            path: "/".to_string(),
            address: None,
        })
    }

    /// Parses a `ws://host[:port][/path]` URL.
    ///
    /// # Errors
    ///
    /// - [`Error::Url`] if the URL is malformed
    /// - [`Error::Config`] for `wss://` or any non-WebSocket scheme
    pub fn parse(url: &str) -> Result<Self> {
        let parsed = Url::parse(url)?;

        match parsed.scheme() {
            "ws" => {}
            "wss" => {
                return Err(Error::config(
                    "TLS endpoints (wss://) are not supported, use ws://",
                ));
            }
            other => {
                return Err(Error::config(format!(
                    "Unsupported endpoint scheme '{other}', expected ws://"
                )));
            }
        }

        let host = parsed
            .host_str()
            .ok_or_else(|| Error::config(format!("Endpoint URL has no host: {url}")))?;
        let port = parsed.port_or_known_default().unwrap_or(80);

        let mut endpoint = Self::new(host, port)?;
        endpoint.path = match parsed.query() {
            Some(query) => format!("{}?{query}", parsed.path()),
            None => parsed.path().to_string(),
        };

        if let Ok(ip) = host.trim_matches(['[', ']']).parse::<IpAddr>() {
            endpoint.address = Some(ip);
        }

        Ok(endpoint)
    }

    /// Sets a pre-resolved address to connect to instead of resolving `host`.
    #[inline]
    #[must_use]
    pub fn with_address(mut self, address: IpAddr) -> Self {
        self.address = Some(address);
        self
    }

    /// Host name used for resolution and the `Host` header.
    #[inline]
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// TCP port.
    #[inline]
    #[must_use]
    pub const fn port(&self) -> u16 {
        self.port
    }

    /// Request path for the upgrade `GET`.
    #[inline]
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Pre-resolved address, if any.
    #[inline]
    #[must_use]
    pub const fn address(&self) -> Option<IpAddr> {
        self.address
    }

    /// Socket address when the IP is already known.
    #[inline]
    #[must_use]
    pub fn socket_addr(&self) -> Option<SocketAddr> {
        self.address.map(|ip| SocketAddr::new(ip, self.port))
    }
}

impl Default for Endpoint {
    fn default() -> Self {
        Self {
            host: "ws.sinric.pro".to_string(),
            port: 80,
            path: "/".to_string(),
            address: None,
        }
    }
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ws://{}:{}{}", self.host, self.port, self.path)
    }
}

// ============================================================================
// Tests
// ============================================================================
