//! Device identity sent with the upgrade request.

// ============================================================================
// Constants
// ============================================================================

/// Platform reported when none is configured.
pub const DEFAULT_PLATFORM: &str = "Raspberry Pi Pico";

// ============================================================================
// DeviceIdentity
// ============================================================================

/// Who is connecting: app key, devices and local metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceIdentity {
    /// Application key.
    pub app_key: String,
    /// Device ids served by this client.
    pub device_ids: Vec<String>,
    /// Ask the server to replay the last known device states.
    pub restore_device_states: bool,
    /// Platform name.
    pub platform: String,
    /// Local MAC address.
    pub mac: String,
    /// Local IP address.
    pub ip: String,
    /// Firmware version string.
    pub firmware_version: String,
}

impl DeviceIdentity {
    /// Creates an identity with default platform and state restore on.
    #[must_use]
    pub fn new(app_key: impl Into<String>, device_ids: Vec<String>) -> Self {
        Self {
            app_key: app_key.into(),
            device_ids,
            restore_device_states: true,
            platform: DEFAULT_PLATFORM.to_string(),
            mac: String::new(),
            ip: String::new(),
            firmware_version: String::new(),
        }
    }

    /// Upgrade request header lines, each terminated by CRLF.
    #[must_use]
    pub fn upgrade_headers(&self) -> String {
        format!(
            "appkey: {}\r\n\
             deviceids: {}\r\n\
             restoredevicestates: {}\r\n\
             platform: {}\r\n\
             mac: {}\r\n\
             ip: {}\r\n\
             firmwareVersion: {}\r\n",
            self.app_key,
            self.device_ids.join(";"),
            self.restore_device_states,
            self.platform,
            self.mac,
            self.ip,
            self.firmware_version,
        )
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upgrade_headers() {
        let mut identity = DeviceIdentity::new("key", vec!["d1".into(), "d2".into()]);
        identity.mac = "28:CD:C1:00:00:01".into();
        identity.ip = "192.168.1.20".into();
        identity.firmware_version = "1.0.0".into();

        assert_eq!(
            identity.upgrade_headers(),
            "appkey: key\r\n\
             deviceids: d1;d2\r\n\
             restoredevicestates: true\r\n\
             platform: Raspberry Pi Pico\r\n\
             mac: 28:CD:C1:00:00:01\r\n\
             ip: 192.168.1.20\r\n\
             firmwareVersion: 1.0.0\r\n"
        );
    }

    #[test]
    fn test_restore_flag_false() {
        let mut identity = DeviceIdentity::new("key", vec!["d1".into()]);
        identity.restore_device_states = false;
        assert!(identity.upgrade_headers().contains("restoredevicestates: false\r\n"));
    }
}
