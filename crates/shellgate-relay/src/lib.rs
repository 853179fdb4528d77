//! shellgate-relay: browser terminal gateway.
//!
//! A browser opens a WebSocket on `/ws/{id}`. The gateway resolves `id` to a
//! connection record, opens an SSH shell on the recorded host and relays
//! bytes both ways until either side goes away.

pub mod bridge;
pub mod channel;
pub mod connection;
pub mod lookup;
pub mod protocol;
pub mod remote;
pub mod server;
pub mod ssh;

pub use bridge::{Bridge, BridgeReport, BridgeSettings, Lifecycle, SessionState, TeardownReason};
pub use lookup::{DescriptorLookup, StaticLookup};
pub use remote::{RemoteConnection, RemoteConnector, RemoteSession, TerminalGeometry};
pub use server::{router, serve, GatewayState};
pub use ssh::{SshConnector, SshSettings};
