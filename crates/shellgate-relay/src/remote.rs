//! The remote side of a bridge: an interactive shell reached over some
//! transport, exposed as a pair of byte streams plus a connection handle.

use async_trait::async_trait;
use shellgate_common::{BridgeError, ConnectionDescriptor};
use tokio::io::{AsyncRead, AsyncWrite};

use crate::bridge::Lifecycle;

pub type RemoteReader = Box<dyn AsyncRead + Send + Unpin>;
pub type RemoteWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// Terminal size requested for the remote pseudo-terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TerminalGeometry {
    pub rows: u32,
    pub cols: u32,
}

impl TerminalGeometry {
    pub const DEFAULT: Self = Self { rows: 40, cols: 80 };
}

impl Default for TerminalGeometry {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// An established shell session.
///
/// `input` feeds the shell's standard input and `output` yields its merged
/// terminal output. Dropping both releases the session channel; `connection`
/// must be closed afterwards.
pub struct RemoteSession {
    pub input: RemoteWriter,
    pub output: RemoteReader,
    pub connection: Box<dyn RemoteConnection>,
    pub geometry: TerminalGeometry,
}

/// Handle to the transport connection underneath a session.
#[async_trait]
pub trait RemoteConnection: Send {
    /// Disconnect. Failures are logged, never surfaced.
    async fn close(&mut self);
}

/// Opens authenticated shell sessions for connection descriptors.
#[async_trait]
pub trait RemoteConnector: Send + Sync {
    /// Dial, authenticate, request a PTY and start a shell.
    ///
    /// Advances `lifecycle` through `Authenticating` and `PtyRequested` as
    /// each step completes. Everything acquired is released before an error
    /// is returned.
    async fn establish(
        &self,
        descriptor: &ConnectionDescriptor,
        lifecycle: &Lifecycle,
    ) -> Result<RemoteSession, BridgeError>;
}
