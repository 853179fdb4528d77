//! Per-request handler: look the record up, upgrade, then run the bridge.

use axum::extract::ws::rejection::WebSocketUpgradeRejection;
use axum::extract::ws::{WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use shellgate_common::{BridgeError, ConnectionDescriptor};
use tracing::{debug, error, info, warn};

use crate::bridge::Bridge;
use crate::channel::split_socket;
use crate::protocol::{refusal, ErrorBody};
use crate::server::GatewayState;

/// `GET /ws/{id}`.
///
/// The record is resolved before the handshake is answered, so an unknown id
/// gets a plain 404 and never reaches the establisher.
pub async fn terminal_socket(
    Path(id): Path<String>,
    State(state): State<GatewayState>,
    upgrade: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Response {
    let descriptor = match state.lookup.find(&id).await {
        Ok(Some(descriptor)) => descriptor,
        Ok(None) => {
            let err = BridgeError::RecordNotFound(id);
            info!(error = %err, "refusing upgrade");
            return refuse(&err, None);
        }
        Err(e) => {
            error!(record = %id, error = %e, "record lookup failed");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorBody::new("record lookup failed")),
            )
                .into_response();
        }
    };

    let ws = match upgrade {
        Ok(ws) => ws,
        Err(rejection) => {
            let err = BridgeError::Upgrade(rejection.body_text());
            debug!(record = %id, error = %err, "request is not a websocket upgrade");
            return refuse(&err, Some(rejection.status()));
        }
    };

    let record = id.clone();
    ws.on_failed_upgrade(move |e: axum::Error| {
        let err = BridgeError::Upgrade(e.to_string());
        warn!(record = %record, error = %err, "websocket handshake did not complete");
    })
    .on_upgrade(move |socket| bridge_socket(socket, descriptor, state))
}

/// `status` overrides the default for the error kind, keeping axum's more
/// specific codes (405, 426) for malformed handshakes.
fn refuse(err: &BridgeError, status: Option<StatusCode>) -> Response {
    let (default_status, body) = refusal(err);
    (status.unwrap_or(default_status), Json(body)).into_response()
}

async fn bridge_socket(socket: WebSocket, descriptor: ConnectionDescriptor, state: GatewayState) {
    let (sink, source) = split_socket(socket);
    let bridge = Bridge::new(state.bridge.clone());
    let report = bridge
        .run(&descriptor, sink, source, state.connector.as_ref())
        .await;

    info!(
        session = %report.session,
        record = %descriptor.id,
        reason = ?report.reason,
        reached_active = report.reached_active,
        bytes_to_client = report.bytes_to_client,
        bytes_to_remote = report.bytes_to_remote,
        "bridge finished"
    );
}
