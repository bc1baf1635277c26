//! Server clock estimate.

// ============================================================================
// ServerClock
// ============================================================================

/// Unix time estimate anchored on the last server timestamp.
///
/// Works in whole seconds: the estimate is
/// `timestamp + (now_ms / 1000 - synced_at_ms / 1000)`. Before the first
/// sync it is the local clock in seconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ServerClock {
    timestamp: i64,
    synced_at_secs: i64,
    synced: bool,
}

impl ServerClock {
    /// Creates an unsynced clock.
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self {
            timestamp: 0,
            synced_at_secs: 0,
            synced: false,
        }
    }

    /// Anchors the estimate: the server said `timestamp` at local `now_ms`.
    pub fn sync(&mut self, timestamp: i64, now_ms: u64) {
        self.timestamp = timestamp;
        self.synced_at_secs = secs(now_ms);
        self.synced = true;
    }

    /// Returns `true` once a timestamp has been received.
    #[inline]
    #[must_use]
    pub const fn is_synced(&self) -> bool {
        self.synced
    }

    /// Estimated server time at local `now_ms`, in Unix seconds.
    #[must_use]
    pub fn now(&self, now_ms: u64) -> i64 {
        self.timestamp
            .saturating_add(secs(now_ms).saturating_sub(self.synced_at_secs))
    }
}

fn secs(ms: u64) -> i64 {
    i64::try_from(ms / 1000).unwrap_or(i64::MAX)
}

// ============================================================================
// Tests
// ============================================================================
