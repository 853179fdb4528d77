//! Client channel halves.
//!
//! The bridge talks to the browser through [`ClientSink`] and
//! [`ClientSource`] so the relay loops never see WebSocket types. The axum
//! socket implements both after [`split_socket`].

use async_trait::async_trait;
use axum::extract::ws::{Message, WebSocket};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use shellgate_common::BridgeError;

/// Outbound half: frames the gateway sends to the browser.
#[async_trait]
pub trait ClientSink: Send {
    /// Deliver a chunk of terminal output as one binary frame.
    async fn send_binary(&mut self, data: Vec<u8>) -> Result<(), BridgeError>;

    /// Deliver a UTF-8 text frame. Used for diagnostics only.
    async fn send_text(&mut self, text: String) -> Result<(), BridgeError>;

    /// Close the channel.
    async fn close(&mut self) -> Result<(), BridgeError>;
}

/// Inbound half: keystrokes from the browser.
#[async_trait]
pub trait ClientSource: Send {
    /// Next payload. Text frames arrive as their UTF-8 bytes. `None` once the
    /// client has closed the channel.
    async fn recv(&mut self) -> Option<Result<Vec<u8>, BridgeError>>;
}

pub struct WsSink(SplitSink<WebSocket, Message>);

pub struct WsSource(SplitStream<WebSocket>);

/// Split an upgraded socket into bridge-facing halves.
pub fn split_socket(socket: WebSocket) -> (WsSink, WsSource) {
    let (sink, stream) = socket.split();
    (WsSink(sink), WsSource(stream))
}

fn channel_error(e: axum::Error) -> BridgeError {
    BridgeError::Channel(e.to_string())
}

#[async_trait]
impl ClientSink for WsSink {
    async fn send_binary(&mut self, data: Vec<u8>) -> Result<(), BridgeError> {
        self.0
            .send(Message::Binary(data.into()))
            .await
            .map_err(channel_error)
    }

    async fn send_text(&mut self, text: String) -> Result<(), BridgeError> {
        self.0
            .send(Message::Text(text.into()))
            .await
            .map_err(channel_error)
    }

    async fn close(&mut self) -> Result<(), BridgeError> {
        self.0.close().await.map_err(channel_error)
    }
}

#[async_trait]
impl ClientSource for WsSource {
    async fn recv(&mut self) -> Option<Result<Vec<u8>, BridgeError>> {
        loop {
            match self.0.next().await? {
                Ok(Message::Binary(data)) => return Some(Ok(data.to_vec())),
                Ok(Message::Text(text)) => return Some(Ok(text.as_str().as_bytes().to_vec())),
                Ok(Message::Close(_)) => return None,
                // axum answers pings itself.
                Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => continue,
                Err(e) => return Some(Err(channel_error(e))),
            }
        }
    }
}
