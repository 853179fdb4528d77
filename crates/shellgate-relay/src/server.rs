//! HTTP listener and routes.

use std::future::Future;
use std::sync::Arc;

use axum::routing::get;
use axum::Router;
use tokio::net::TcpListener;

use crate::bridge::BridgeSettings;
use crate::connection;
use crate::lookup::DescriptorLookup;
use crate::remote::RemoteConnector;

/// Shared by every request.
#[derive(Clone)]
pub struct GatewayState {
    pub lookup: Arc<dyn DescriptorLookup>,
    pub connector: Arc<dyn RemoteConnector>,
    pub bridge: BridgeSettings,
}

pub fn router(state: GatewayState) -> Router {
    Router::new()
        .route("/", get(|| async { "OK" }))
        .route("/ws/{id}", get(connection::terminal_socket))
        .with_state(state)
}

/// Serve until `shutdown` resolves.
pub async fn serve<F>(listener: TcpListener, state: GatewayState, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await
}
