use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("config parse error: {0}")]
    ParseError(String),

    #[error("config validation error: {0}")]
    ValidationError(String),
}

/// Failures of the descriptor store collaborator.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("record store unavailable: {0}")]
    Unavailable(String),

    #[error("invalid connection record '{id}': {reason}")]
    InvalidRecord { id: String, reason: String },
}

/// Everything that can end a bridge invocation.
///
/// Every variant is terminal for the session it occurred in; nothing is
/// retried.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    #[error("connection record not found: {0}")]
    RecordNotFound(String),

    #[error("upgrade failed: {0}")]
    Upgrade(String),

    #[error("dial failed: {0}")]
    Dial(String),

    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("session setup failed: {0}")]
    Session(String),

    #[error("client channel error: {0}")]
    Channel(String),
}

/// Startup failures of the gateway process.
#[derive(Debug, thiserror::Error)]
pub enum ShellgateError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
