//! Configuration schema types for the gateway.
//!
//! All structs use `serde(default)` so partial configs work correctly.
//! Missing fields are filled with the defaults documented on each type.

mod relay;
mod server;
mod ssh;
mod system;

pub use relay::*;
pub use server::*;
pub use ssh::*;
pub use system::*;

use serde::{Deserialize, Serialize};

/// Current config schema version.
pub const CONFIG_SCHEMA_VERSION: u32 = 1;

/// Root configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct GatewayConfig {
    pub server: ServerConfig,
    pub ssh: SshConfig,
    pub relay: RelayConfig,
    pub store: StoreConfig,
    pub logging: LoggingConfig,
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_server_listens_on_8080() {
        let config = GatewayConfig::default();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.bind_address(), "0.0.0.0:8080");
    }

    #[test]
    fn default_ssh_settings() {
        let config = GatewayConfig::default();
        assert_eq!(config.ssh.connect_timeout_secs, 10);
        assert!(config.ssh.insecure_skip_host_verify);
        assert!(config.ssh.known_hosts_path.is_empty());
        assert_eq!(config.ssh.term, "xterm");
        assert_eq!(config.ssh.keepalive_interval_secs, 30);
    }

    #[test]
    fn default_relay_settings() {
        let config = GatewayConfig::default();
        assert_eq!(config.relay.chunk_size, 4096);
        assert_eq!(config.relay.idle_timeout_secs, 0);
        assert_eq!(config.relay.max_session_secs, 0);
    }

    #[test]
    fn default_store_and_logging() {
        let config = GatewayConfig::default();
        assert!(config.store.records_path.is_empty());
        assert_eq!(config.logging.level, LogLevel::Info);
        assert_eq!(config.logging.level.as_directive(), "info");
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config: GatewayConfig = toml::from_str(
            r#"
[ssh]
insecure_skip_host_verify = false
known_hosts_path = "/etc/ssh/ssh_known_hosts"
"#,
        )
        .unwrap();
        assert!(!config.ssh.insecure_skip_host_verify);
        assert_eq!(config.ssh.known_hosts_path, "/etc/ssh/ssh_known_hosts");
        assert_eq!(config.ssh.connect_timeout_secs, 10);
        assert_eq!(config.server.port, 8080);
    }

    #[test]
    fn log_level_parses_uppercase() {
        let config: GatewayConfig = toml::from_str("[logging]\nlevel = \"DEBUG\"\n").unwrap();
        assert_eq!(config.logging.level, LogLevel::Debug);
        assert_eq!(config.logging.level.as_directive(), "debug");
    }
}
