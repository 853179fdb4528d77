//! Full configuration validation.
//!
//! Each section has its own check in `sections`; this orchestrator calls
//! them all and collects errors into a single `ConfigError`.

mod helpers;
mod sections;


use crate::schema::GatewayConfig;
use shellgate_common::ConfigError;

/// Run all validations on a config, collecting all errors.
pub fn validate(config: &GatewayConfig) -> Result<(), ConfigError> {
    let mut errors: Vec<String> = Vec::new();

    sections::validate_server(&mut errors, config);
    sections::validate_ssh(&mut errors, config);
    sections::validate_relay(&mut errors, config);

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::ValidationError(errors.join("; ")))
    }
}
