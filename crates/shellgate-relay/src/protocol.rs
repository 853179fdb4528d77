//! Client-facing messages that sit outside the terminal byte stream.
//!
//! Terminal data itself is never framed: remote output goes out as raw binary
//! frames and client frames are written to the shell verbatim.

use axum::http::StatusCode;
use serde::Serialize;
use shellgate_common::BridgeError;

/// JSON body for plain HTTP error responses.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

impl ErrorBody {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }

    pub fn not_found() -> Self {
        Self::new("connection not found")
    }
}

/// Plain HTTP answer for a request refused before the handshake.
///
/// Only the record id and the framing problem are echoed back; record
/// contents never are.
pub fn refusal(err: &BridgeError) -> (StatusCode, ErrorBody) {
    match err {
        BridgeError::RecordNotFound(_) => (StatusCode::NOT_FOUND, ErrorBody::not_found()),
        BridgeError::Upgrade(_) => (StatusCode::BAD_REQUEST, ErrorBody::new(err.to_string())),
        _ => (
            StatusCode::INTERNAL_SERVER_ERROR,
            ErrorBody::new("connection unavailable"),
        ),
    }
}

/// The single text frame sent when a session cannot be established. Starts
/// on a fresh terminal line so it reads cleanly under any prior output.
pub fn diagnostic_message(err: &BridgeError) -> String {
    format!("\r\nconnection error: {err}\r\n")
}
