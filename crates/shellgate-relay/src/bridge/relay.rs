//! The two copy loops of an active session.
//!
//! Each loop owns the halves it copies between and hands them back when it
//! stops, so release happens in one place after both have finished.

use std::sync::Arc;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::debug;

use super::lifecycle::{ActivityClock, Lifecycle, TeardownReason};
use crate::channel::{ClientSink, ClientSource};
use crate::remote::{RemoteReader, RemoteWriter};

pub(crate) struct Outbound<S> {
    pub output: RemoteReader,
    pub sink: S,
    pub bytes: u64,
}

pub(crate) struct Inbound<R> {
    pub source: R,
    pub input: RemoteWriter,
    pub bytes: u64,
}

/// Remote output to client. Every chunk read goes out as one binary frame,
/// in order and unmodified.
pub(crate) async fn remote_to_client<S: ClientSink>(
    mut output: RemoteReader,
    mut sink: S,
    lifecycle: Lifecycle,
    activity: Arc<ActivityClock>,
    chunk_size: usize,
) -> Outbound<S> {
    let mut buf = vec![0u8; chunk_size];
    let mut bytes = 0u64;

    loop {
        let read = tokio::select! {
            _ = lifecycle.torn_down() => break,
            read = output.read(&mut buf) => read,
        };
        let n = match read {
            Ok(0) => {
                debug!("remote output reached end of stream");
                lifecycle.trigger(TeardownReason::RemoteClosed);
                break;
            }
            Ok(n) => n,
            Err(e) => {
                debug!(error = %e, "remote output read failed");
                lifecycle.trigger(TeardownReason::RemoteError);
                break;
            }
        };
        activity.touch();

        let sent = tokio::select! {
            _ = lifecycle.torn_down() => break,
            sent = sink.send_binary(buf[..n].to_vec()) => sent,
        };
        if let Err(e) = sent {
            debug!(error = %e, "client send failed");
            lifecycle.trigger(TeardownReason::ClientError);
            break;
        }
        bytes += n as u64;
    }

    Outbound {
        output,
        sink,
        bytes,
    }
}

/// Client input to remote. Payloads are written in arrival order and
/// flushed so keystrokes are not held back.
pub(crate) async fn client_to_remote<R: ClientSource>(
    mut source: R,
    mut input: RemoteWriter,
    lifecycle: Lifecycle,
    activity: Arc<ActivityClock>,
) -> Inbound<R> {
    let mut bytes = 0u64;

    loop {
        let frame = tokio::select! {
            _ = lifecycle.torn_down() => break,
            frame = source.recv() => frame,
        };
        let data = match frame {
            Some(Ok(data)) => data,
            Some(Err(e)) => {
                debug!(error = %e, "client receive failed");
                lifecycle.trigger(TeardownReason::ClientError);
                break;
            }
            None => {
                debug!("client closed the channel");
                lifecycle.trigger(TeardownReason::ClientClosed);
                break;
            }
        };
        if data.is_empty() {
            continue;
        }
        activity.touch();

        let written = tokio::select! {
            _ = lifecycle.torn_down() => break,
            written = write_flush(&mut input, &data) => written,
        };
        if let Err(e) = written {
            debug!(error = %e, "remote input write failed");
            lifecycle.trigger(TeardownReason::RemoteError);
            break;
        }
        bytes += data.len() as u64;
    }

    Inbound {
        source,
        input,
        bytes,
    }
}

async fn write_flush(input: &mut RemoteWriter, data: &[u8]) -> std::io::Result<()> {
    input.write_all(data).await?;
    input.flush().await
}
