use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Byte relay settings for an active session.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    /// Read buffer for remote output, in bytes (valid range: 1024-4096).
    pub chunk_size: u32,
    /// Close a session after this many seconds with no traffic. 0 disables.
    pub idle_timeout_secs: u32,
    /// Close a session after this many seconds regardless. 0 disables.
    pub max_session_secs: u32,
}

impl RelayConfig {
    pub fn idle_timeout(&self) -> Option<Duration> {
        secs_or_disabled(self.idle_timeout_secs)
    }

    pub fn max_session(&self) -> Option<Duration> {
        secs_or_disabled(self.max_session_secs)
    }
}

fn secs_or_disabled(secs: u32) -> Option<Duration> {
    (secs > 0).then(|| Duration::from_secs(u64::from(secs)))
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            chunk_size: 4096,
            idle_timeout_secs: 0,
            max_session_secs: 0,
        }
    }
}
