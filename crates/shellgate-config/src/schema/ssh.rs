use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Remote shell transport settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SshConfig {
    /// Bound on TCP connect plus authentication, in seconds (valid range: 1-120).
    pub connect_timeout_secs: u32,
    /// Accept any server host key. Insecure; kept for parity with existing
    /// deployments. Set to false to check keys against `known_hosts_path`.
    pub insecure_skip_host_verify: bool,
    /// OpenSSH known_hosts file. Empty means `~/.ssh/known_hosts`.
    pub known_hosts_path: String,
    /// Terminal type sent with the PTY request.
    pub term: String,
    /// Seconds between SSH keepalives. 0 disables.
    pub keepalive_interval_secs: u32,
}

impl SshConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(u64::from(self.connect_timeout_secs))
    }

    pub fn keepalive_interval(&self) -> Option<Duration> {
        match self.keepalive_interval_secs {
            0 => None,
            secs => Some(Duration::from_secs(u64::from(secs))),
        }
    }

    /// Resolved known_hosts file, if one can be determined.
    pub fn known_hosts_file(&self) -> Option<PathBuf> {
        if !self.known_hosts_path.is_empty() {
            return Some(PathBuf::from(&self.known_hosts_path));
        }
        dirs::home_dir().map(|home| home.join(".ssh").join("known_hosts"))
    }
}

impl Default for SshConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: 10,
            insecure_skip_host_verify: true,
            known_hosts_path: String::new(),
            term: "xterm".into(),
            keepalive_interval_secs: 30,
        }
    }
}
