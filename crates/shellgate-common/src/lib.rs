pub mod descriptor;
pub mod errors;
pub mod id;
pub mod secret;

pub use descriptor::ConnectionDescriptor;
pub use errors::{BridgeError, ConfigError, ShellgateError, StoreError};
pub use id::SessionId;
pub use secret::Secret;

pub type Result<T> = std::result::Result<T, ShellgateError>;
