//! Core TOML config loading: read from path or platform default.

use crate::schema::GatewayConfig;
use crate::validation;
use shellgate_common::ConfigError;
use std::io::ErrorKind;
use std::path::Path;
use tracing::{info, warn};

use super::paths::{create_default_config, default_config_path};

/// Parse config from TOML text, filling missing fields with defaults.
pub fn parse_config(content: &str) -> Result<GatewayConfig, ConfigError> {
    toml::from_str(content).map_err(|e| ConfigError::ParseError(format!("failed to parse TOML: {e}")))
}

/// Load config from a specific TOML file path.
///
/// A missing file is reported as [`ConfigError::FileNotFound`]. Validation
/// problems are logged here and enforced by [`crate::load_config`].
pub fn load_from_path(path: &Path) -> Result<GatewayConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => ConfigError::FileNotFound(path.to_path_buf()),
        _ => ConfigError::ParseError(format!("failed to read {}: {e}", path.display())),
    })?;

    let config = parse_config(&content)?;

    if let Err(e) = validation::validate(&config) {
        warn!(path = %path.display(), "config validation warning: {e}");
    }

    info!(path = %path.display(), "loaded config");
    Ok(config)
}

/// Load config from the platform-specific default path.
///
/// On macOS: `~/Library/Application Support/shellgate/config.toml`
/// On Linux: `~/.config/shellgate/config.toml`
///
/// If the file does not exist, writes the commented template there and
/// returns defaults.
pub fn load_default() -> Result<GatewayConfig, ConfigError> {
    let path = default_config_path()?;
    load_or_create(&path)
}

/// Load `path`, creating it from the template first if it is missing.
pub fn load_or_create(path: &Path) -> Result<GatewayConfig, ConfigError> {
    match load_from_path(path) {
        Ok(config) => Ok(config),
        Err(ConfigError::FileNotFound(_)) => {
            info!(path = %path.display(), "no config found, creating default");
            create_default_config(path)?;
            Ok(GatewayConfig::default())
        }
        Err(e) => Err(e),
    }
}
