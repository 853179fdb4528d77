//! Validation for the server, ssh and relay sections.

use crate::schema::GatewayConfig;

use super::helpers::{validate_non_empty, validate_range};

/// Validate listener constraints.
pub(crate) fn validate_server(errors: &mut Vec<String>, config: &GatewayConfig) {
    validate_non_empty(errors, "server.host", &config.server.host);
    if config.server.port == 0 {
        errors.push("server.port must not be 0".into());
    }
}

/// Validate transport constraints.
pub(crate) fn validate_ssh(errors: &mut Vec<String>, config: &GatewayConfig) {
    validate_range(
        errors,
        "ssh.connect_timeout_secs",
        config.ssh.connect_timeout_secs,
        1,
        120,
    );
    validate_non_empty(errors, "ssh.term", &config.ssh.term);
    if !config.ssh.insecure_skip_host_verify && config.ssh.known_hosts_file().is_none() {
        errors.push(
            "ssh.known_hosts_path is required when insecure_skip_host_verify = false".into(),
        );
    }
}

/// Validate relay constraints.
pub(crate) fn validate_relay(errors: &mut Vec<String>, config: &GatewayConfig) {
    validate_range(
        errors,
        "relay.chunk_size",
        config.relay.chunk_size,
        1024,
        4096,
    );
}
