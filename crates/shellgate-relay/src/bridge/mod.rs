//! One bridge invocation: establish the remote shell, relay both directions
//! until either side ends, then release everything exactly once.

mod lifecycle;
mod relay;

#[cfg(test)]
mod tests;

pub use lifecycle::{Lifecycle, SessionState, TeardownReason};

use std::sync::Arc;
use std::time::Duration;

use shellgate_common::{ConnectionDescriptor, SessionId};
use shellgate_config::schema::RelayConfig;
use tokio::io::AsyncWriteExt;
use tracing::{debug, error, info, info_span, warn, Instrument};

use self::lifecycle::ActivityClock;
use self::relay::{Inbound, Outbound};
use crate::channel::{ClientSink, ClientSource};
use crate::protocol;
use crate::remote::{RemoteConnection, RemoteConnector, RemoteSession};

/// Upper bound on each release step, so a stuck peer cannot hold teardown.
const RELEASE_STEP_TIMEOUT: Duration = Duration::from_secs(5);

/// Relay tuning for a bridge invocation.
#[derive(Debug, Clone)]
pub struct BridgeSettings {
    pub chunk_size: usize,
    pub idle_timeout: Option<Duration>,
    pub max_session: Option<Duration>,
}

impl Default for BridgeSettings {
    fn default() -> Self {
        Self::from(&RelayConfig::default())
    }
}

impl From<&RelayConfig> for BridgeSettings {
    fn from(config: &RelayConfig) -> Self {
        Self {
            chunk_size: config.chunk_size as usize,
            idle_timeout: config.idle_timeout(),
            max_session: config.max_session(),
        }
    }
}

/// Summary of a finished bridge invocation.
#[derive(Debug, Clone)]
pub struct BridgeReport {
    pub session: SessionId,
    pub reason: Option<TeardownReason>,
    pub reached_active: bool,
    pub bytes_to_client: u64,
    pub bytes_to_remote: u64,
    /// Establishment failure, as shown to the client.
    pub error: Option<String>,
}

/// A single bridge invocation. Consumed by [`Bridge::run`]; never reused.
pub struct Bridge {
    id: SessionId,
    lifecycle: Lifecycle,
    settings: BridgeSettings,
}

impl Bridge {
    pub fn new(settings: BridgeSettings) -> Self {
        Self {
            id: SessionId::new(),
            lifecycle: Lifecycle::new(),
            settings,
        }
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    /// Run to completion. Returns once every resource has been released.
    pub async fn run<S, R>(
        self,
        descriptor: &ConnectionDescriptor,
        sink: S,
        source: R,
        connector: &dyn RemoteConnector,
    ) -> BridgeReport
    where
        S: ClientSink + 'static,
        R: ClientSource + 'static,
    {
        let span = info_span!(
            "bridge",
            session = %self.id,
            record = %descriptor.id,
            target = %descriptor,
        );
        self.run_inner(descriptor, sink, source, connector)
            .instrument(span)
            .await
    }

    async fn run_inner<S, R>(
        self,
        descriptor: &ConnectionDescriptor,
        mut sink: S,
        source: R,
        connector: &dyn RemoteConnector,
    ) -> BridgeReport
    where
        S: ClientSink + 'static,
        R: ClientSource + 'static,
    {
        let Bridge {
            id,
            lifecycle,
            settings,
        } = self;
        let mut report = BridgeReport {
            session: id,
            reason: None,
            reached_active: false,
            bytes_to_client: 0,
            bytes_to_remote: 0,
            error: None,
        };

        info!("establishing remote session");
        let remote = match connector.establish(descriptor, &lifecycle).await {
            Ok(remote) => remote,
            Err(err) => {
                warn!(error = %err, "remote session establishment failed");
                lifecycle.trigger(TeardownReason::EstablishFailed);
                let text = protocol::diagnostic_message(&err);
                if let Err(e) = sink.send_text(text).await {
                    debug!(error = %e, "could not deliver diagnostic to client");
                }
                close_client(&mut sink).await;
                drop(source);
                lifecycle.finish();

                report.reason = lifecycle.reason();
                report.error = Some(err.to_string());
                return report;
            }
        };

        let RemoteSession {
            input,
            output,
            connection,
            geometry,
        } = remote;
        lifecycle.advance(SessionState::Active);
        report.reached_active = true;
        info!(rows = geometry.rows, cols = geometry.cols, "session active");

        let activity = Arc::new(ActivityClock::new());
        let mut outbound = tokio::spawn(relay::remote_to_client(
            output,
            sink,
            lifecycle.clone(),
            activity.clone(),
            settings.chunk_size,
        ));
        let mut inbound = tokio::spawn(relay::client_to_remote(
            source,
            input,
            lifecycle.clone(),
            activity.clone(),
        ));
        let watchdog = if settings.idle_timeout.is_some() || settings.max_session.is_some() {
            Some(tokio::spawn(lifecycle::watchdog(
                lifecycle.clone(),
                activity,
                settings.idle_timeout,
                settings.max_session,
            )))
        } else {
            None
        };

        // Whichever loop stops first has triggered teardown, which stops the
        // other one too.
        let (out, inb) = tokio::select! {
            out = &mut outbound => {
                let out = settle(out, &lifecycle, "outbound");
                (out, settle(inbound.await, &lifecycle, "inbound"))
            }
            inb = &mut inbound => {
                let inb = settle(inb, &lifecycle, "inbound");
                (settle(outbound.await, &lifecycle, "outbound"), inb)
            }
        };
        if let Some(watchdog) = watchdog {
            let _ = watchdog.await;
        }

        report.bytes_to_client = out.as_ref().map_or(0, |o| o.bytes);
        report.bytes_to_remote = inb.as_ref().map_or(0, |i| i.bytes);
        release(out, inb, connection).await;
        lifecycle.finish();

        report.reason = lifecycle.reason();
        report
    }
}

fn settle<T>(
    joined: Result<T, tokio::task::JoinError>,
    lifecycle: &Lifecycle,
    direction: &str,
) -> Option<T> {
    match joined {
        Ok(half) => Some(half),
        Err(e) => {
            error!(direction, error = %e, "relay task failed");
            lifecycle.trigger(TeardownReason::TaskFailed);
            None
        }
    }
}

/// Client channel first, then the remote streams, then the connection.
async fn release<S: ClientSink, R>(
    outbound: Option<Outbound<S>>,
    inbound: Option<Inbound<R>>,
    mut connection: Box<dyn RemoteConnection>,
) {
    let (output, mut sink) = match outbound {
        Some(Outbound { output, sink, .. }) => (Some(output), Some(sink)),
        None => (None, None),
    };
    let (input, source) = match inbound {
        Some(Inbound { source, input, .. }) => (Some(input), Some(source)),
        None => (None, None),
    };

    if let Some(sink) = sink.as_mut() {
        close_client(sink).await;
    }
    drop(sink);
    drop(source);

    if let Some(mut input) = input {
        match tokio::time::timeout(RELEASE_STEP_TIMEOUT, input.shutdown()).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => debug!(error = %e, "remote input shutdown failed"),
            Err(_) => debug!("remote input shutdown timed out"),
        }
    }
    drop(output);

    if tokio::time::timeout(RELEASE_STEP_TIMEOUT, connection.close())
        .await
        .is_err()
    {
        warn!("remote disconnect timed out");
    }
    debug!("session resources released");
}

async fn close_client<S: ClientSink>(sink: &mut S) {
    match tokio::time::timeout(RELEASE_STEP_TIMEOUT, sink.close()).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => debug!(error = %e, "client close failed"),
        Err(_) => debug!("client close timed out"),
    }
}
