//! SSH establisher.
//!
//! Dials the descriptor's host, authenticates with the record's password,
//! requests an `xterm` PTY of 40x80 with echo on and 14400 baud in both
//! directions, then starts an interactive shell. The shell channel becomes a
//! plain byte stream split into the session's input and output halves.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use russh::client::{self, AuthResult};
use russh::keys::{self, HashAlg};
use russh::{Channel, ChannelMsg, Disconnect, Pty};
use shellgate_common::{BridgeError, ConnectionDescriptor};
use shellgate_config::schema::SshConfig;
use tokio::time::{timeout_at, Instant};
use tracing::{debug, info, warn};

use crate::bridge::{Lifecycle, SessionState};
use crate::remote::{RemoteConnection, RemoteConnector, RemoteSession, TerminalGeometry};

/// Line speed reported for both directions of the PTY.
pub const PTY_BAUD: u32 = 14400;

fn terminal_modes() -> [(Pty, u32); 3] {
    [
        (Pty::ECHO, 1),
        (Pty::TTY_OP_ISPEED, PTY_BAUD),
        (Pty::TTY_OP_OSPEED, PTY_BAUD),
    ]
}

#[derive(Debug, Clone)]
pub struct SshSettings {
    /// Bound on dial plus authentication.
    pub connect_timeout: Duration,
    pub insecure_skip_host_verify: bool,
    pub known_hosts: Option<PathBuf>,
    pub term: String,
    pub keepalive_interval: Option<Duration>,
}

impl Default for SshSettings {
    fn default() -> Self {
        Self::from(&SshConfig::default())
    }
}

impl From<&SshConfig> for SshSettings {
    fn from(config: &SshConfig) -> Self {
        Self {
            connect_timeout: config.connect_timeout(),
            insecure_skip_host_verify: config.insecure_skip_host_verify,
            known_hosts: config.known_hosts_file(),
            term: config.term.clone(),
            keepalive_interval: config.keepalive_interval(),
        }
    }
}

/// Host key policy for outbound connections.
struct HostKeyPolicy {
    host: String,
    port: u16,
    insecure: bool,
    known_hosts: Option<PathBuf>,
}

impl client::Handler for HostKeyPolicy {
    type Error = russh::Error;

    fn check_server_key(
        &mut self,
        key: &keys::PublicKey,
    ) -> impl std::future::Future<Output = Result<bool, Self::Error>> + Send {
        let fingerprint = key.fingerprint(HashAlg::Sha256).to_string();
        let verdict = if self.insecure {
            warn!(
                host = %self.host,
                port = self.port,
                fp = %fingerprint,
                "host key verification disabled; accepting server key"
            );
            true
        } else {
            match &self.known_hosts {
                None => {
                    warn!(host = %self.host, port = self.port, "no known_hosts file; rejecting server key");
                    false
                }
                Some(path) => match keys::check_known_hosts_path(&self.host, self.port, key, path) {
                    Ok(true) => {
                        debug!(host = %self.host, port = self.port, fp = %fingerprint, "host key verified");
                        true
                    }
                    Ok(false) => {
                        warn!(host = %self.host, port = self.port, fp = %fingerprint, "unknown host key; rejecting");
                        false
                    }
                    Err(e) => {
                        warn!(host = %self.host, port = self.port, fp = %fingerprint, error = %e, "host key check failed; rejecting");
                        false
                    }
                },
            }
        };
        async move { Ok(verdict) }
    }
}

pub struct SshConnector {
    settings: SshSettings,
}

impl SshConnector {
    pub fn new(settings: SshSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &SshSettings {
        &self.settings
    }

    fn client_config(&self) -> Arc<client::Config> {
        Arc::new(client::Config {
            keepalive_interval: self.settings.keepalive_interval,
            ..Default::default()
        })
    }
}

#[async_trait]
impl RemoteConnector for SshConnector {
    async fn establish(
        &self,
        descriptor: &ConnectionDescriptor,
        lifecycle: &Lifecycle,
    ) -> Result<RemoteSession, BridgeError> {
        let limit = self.settings.connect_timeout;
        let deadline = Instant::now() + limit;
        let handler = HostKeyPolicy {
            host: descriptor.host.clone(),
            port: descriptor.port,
            insecure: self.settings.insecure_skip_host_verify,
            known_hosts: self.settings.known_hosts.clone(),
        };

        debug!(address = %descriptor.address(), "dialing");
        let connect = client::connect(
            self.client_config(),
            (descriptor.host.as_str(), descriptor.port),
            handler,
        );
        let mut handle = match timeout_at(deadline, connect).await {
            Ok(Ok(handle)) => handle,
            Ok(Err(e)) => return Err(BridgeError::Dial(e.to_string())),
            Err(_) => {
                return Err(BridgeError::Dial(format!(
                    "timed out after {}s",
                    limit.as_secs()
                )))
            }
        };
        lifecycle.advance(SessionState::Authenticating);

        let auth = timeout_at(
            deadline,
            handle.authenticate_password(descriptor.username.as_str(), descriptor.secret.expose()),
        )
        .await;
        let failure = match auth {
            Ok(Ok(AuthResult::Success)) => None,
            Ok(Ok(AuthResult::Failure { .. })) => Some("credentials rejected".to_string()),
            Ok(Err(e)) => Some(e.to_string()),
            Err(_) => Some(format!("timed out after {}s", limit.as_secs())),
        };
        if let Some(reason) = failure {
            abandon(&handle).await;
            return Err(BridgeError::Auth(reason));
        }
        info!(username = %descriptor.username, "authenticated");

        match open_shell(&handle, &self.settings.term, limit, lifecycle).await {
            Ok(channel) => {
                let (output, input) = tokio::io::split(channel.into_stream());
                Ok(RemoteSession {
                    input: Box::new(input),
                    output: Box::new(output),
                    connection: Box::new(SshConnection { handle }),
                    geometry: TerminalGeometry::DEFAULT,
                })
            }
            Err(e) => {
                abandon(&handle).await;
                Err(e)
            }
        }
    }
}

async fn open_shell(
    handle: &client::Handle<HostKeyPolicy>,
    term: &str,
    step_timeout: Duration,
    lifecycle: &Lifecycle,
) -> Result<Channel<client::Msg>, BridgeError> {
    let geometry = TerminalGeometry::DEFAULT;
    let open = tokio::time::timeout(step_timeout, handle.channel_open_session()).await;
    let mut channel = match open {
        Ok(Ok(channel)) => channel,
        Ok(Err(e)) => {
            return Err(BridgeError::Session(format!(
                "could not open session channel: {e}"
            )))
        }
        Err(_) => return Err(BridgeError::Session("no reply to session open".into())),
    };

    channel
        .request_pty(true, term, geometry.cols, geometry.rows, 0, 0, &terminal_modes())
        .await
        .map_err(|e| BridgeError::Session(format!("pty request failed: {e}")))?;
    await_reply(&mut channel, "pty", step_timeout).await?;
    lifecycle.advance(SessionState::PtyRequested);

    channel
        .request_shell(true)
        .await
        .map_err(|e| BridgeError::Session(format!("shell request failed: {e}")))?;
    await_reply(&mut channel, "shell", step_timeout).await?;

    Ok(channel)
}

/// Wait for the server's answer to a `want_reply` channel request.
async fn await_reply(
    channel: &mut Channel<client::Msg>,
    request: &str,
    limit: Duration,
) -> Result<(), BridgeError> {
    let reply = tokio::time::timeout(limit, async {
        loop {
            match channel.wait().await {
                Some(ChannelMsg::Success) => return Ok(()),
                Some(ChannelMsg::Failure) => {
                    return Err(BridgeError::Session(format!("{request} request refused")))
                }
                Some(ChannelMsg::Eof) | Some(ChannelMsg::Close) | None => {
                    return Err(BridgeError::Session(format!(
                        "channel closed during {request} request"
                    )))
                }
                Some(_) => continue,
            }
        }
    })
    .await;

    match reply {
        Ok(result) => result,
        Err(_) => Err(BridgeError::Session(format!(
            "no reply to {request} request"
        ))),
    }
}

async fn abandon(handle: &client::Handle<HostKeyPolicy>) {
    if let Err(e) = handle
        .disconnect(Disconnect::ByApplication, "session setup failed", "en")
        .await
    {
        debug!(error = %e, "disconnect after failed setup");
    }
}

struct SshConnection {
    handle: client::Handle<HostKeyPolicy>,
}

#[async_trait]
impl RemoteConnection for SshConnection {
    async fn close(&mut self) {
        match self
            .handle
            .disconnect(Disconnect::ByApplication, "session closed", "en")
            .await
        {
            Ok(()) => debug!("ssh connection closed"),
            Err(e) => debug!(error = %e, "ssh disconnect failed"),
        }
    }
}
