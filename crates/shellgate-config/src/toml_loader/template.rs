//! Default TOML config template with inline documentation comments.

/// Generate the default TOML config content with comments.
pub(crate) fn default_config_toml() -> String {
    r##"# shellgate configuration
# Schema version 1
# Only override what you want to change -- missing fields use defaults.

[server]
# host = "0.0.0.0"
# port = 8080

[ssh]
# connect_timeout_secs = 10        # 1-120, covers TCP connect + authentication
# Accepts any host key when true. Set to false to verify against known_hosts.
# insecure_skip_host_verify = true
# known_hosts_path = ""            # empty = ~/.ssh/known_hosts
# term = "xterm"
# keepalive_interval_secs = 30     # 0 = off

[relay]
# chunk_size = 4096                # 1024-4096 bytes per outbound read
# idle_timeout_secs = 0            # 0 = off
# max_session_secs = 0             # 0 = off

[store]
# TOML file with [[connection]] entries:
#   id, name, host, port, username, password, user_id
# records_path = ""

[logging]
# level = "INFO"                   # TRACE, DEBUG, INFO, WARNING, ERROR
"##
    .to_string()
}
