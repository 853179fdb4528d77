//! Bridge scenarios against an in-memory shell.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use shellgate_common::{BridgeError, ConnectionDescriptor};
use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::*;
use crate::channel::testing::{Frame, RecordingSink, ScriptedSource};
use crate::remote::TerminalGeometry;

struct FakeConnection {
    closes: Arc<AtomicUsize>,
}

#[async_trait]
impl RemoteConnection for FakeConnection {
    async fn close(&mut self) {
        self.closes.fetch_add(1, Ordering::SeqCst);
    }
}

struct FakeConnector {
    outcome: Mutex<Option<Result<RemoteSession, BridgeError>>>,
    calls: Arc<AtomicUsize>,
}

impl FakeConnector {
    fn new(outcome: Result<RemoteSession, BridgeError>) -> Self {
        Self {
            outcome: Mutex::new(Some(outcome)),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }
}

#[async_trait]
impl RemoteConnector for FakeConnector {
    async fn establish(
        &self,
        _descriptor: &ConnectionDescriptor,
        lifecycle: &Lifecycle,
    ) -> Result<RemoteSession, BridgeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        lifecycle.advance(SessionState::Authenticating);
        let outcome = self
            .outcome
            .lock()
            .unwrap()
            .take()
            .unwrap_or_else(|| Err(BridgeError::Dial("already used".into())));
        if outcome.is_ok() {
            lifecycle.advance(SessionState::PtyRequested);
        }
        outcome
    }
}

/// A remote session whose far end is handed back as the "shell".
fn fake_session() -> (RemoteSession, DuplexStream, Arc<AtomicUsize>) {
    let (gateway_end, shell_end) = tokio::io::duplex(64 * 1024);
    let (output, input) = tokio::io::split(gateway_end);
    let closes = Arc::new(AtomicUsize::new(0));
    let session = RemoteSession {
        input: Box::new(input),
        output: Box::new(output),
        connection: Box::new(FakeConnection {
            closes: closes.clone(),
        }),
        geometry: TerminalGeometry::DEFAULT,
    };
    (session, shell_end, closes)
}

fn descriptor() -> ConnectionDescriptor {
    ConnectionDescriptor::new("1", "localhost", 22, "test", "wrong")
}

fn settings() -> BridgeSettings {
    BridgeSettings {
        chunk_size: 4096,
        idle_timeout: None,
        max_session: None,
    }
}

struct Harness {
    frames: mpsc::UnboundedReceiver<Frame>,
    sink_closes: Arc<AtomicUsize>,
    client: mpsc::UnboundedSender<Result<Vec<u8>, BridgeError>>,
    lifecycle: Lifecycle,
    calls: Arc<AtomicUsize>,
    handle: JoinHandle<BridgeReport>,
}

fn start_with(
    outcome: Result<RemoteSession, BridgeError>,
    settings: BridgeSettings,
    broken_sink: bool,
) -> Harness {
    let (sink, frames, sink_closes) = if broken_sink {
        RecordingSink::broken()
    } else {
        RecordingSink::new()
    };
    let (source, client) = ScriptedSource::new();
    let connector = FakeConnector::new(outcome);
    let calls = connector.calls.clone();
    let bridge = Bridge::new(settings);
    let lifecycle = bridge.lifecycle().clone();
    let handle = tokio::spawn(async move {
        bridge
            .run(&descriptor(), sink, source, &connector)
            .await
    });
    Harness {
        frames,
        sink_closes,
        client,
        lifecycle,
        calls,
        handle,
    }
}

fn start(outcome: Result<RemoteSession, BridgeError>) -> Harness {
    start_with(outcome, settings(), false)
}

async fn finish(handle: JoinHandle<BridgeReport>) -> BridgeReport {
    tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("bridge did not finish")
        .unwrap()
}

async fn frames_until_close(frames: &mut mpsc::UnboundedReceiver<Frame>) -> Vec<Frame> {
    let mut seen = Vec::new();
    loop {
        let frame = tokio::time::timeout(Duration::from_secs(5), frames.recv())
            .await
            .expect("no frame within 5s")
            .expect("sink dropped without closing");
        let done = frame == Frame::Close;
        seen.push(frame);
        if done {
            return seen;
        }
    }
}

#[tokio::test]
async fn auth_failure_sends_one_diagnostic_then_closes() {
    let mut h = start(Err(BridgeError::Auth("credentials rejected".into())));

    let report = finish(h.handle).await;
    let frames = frames_until_close(&mut h.frames).await;

    assert_eq!(frames.len(), 2);
    match &frames[0] {
        Frame::Text(text) => {
            assert!(text.contains("authentication failed"));
            assert!(!text.contains("wrong"));
        }
        other => panic!("expected diagnostic text, got {other:?}"),
    }
    assert_eq!(frames[1], Frame::Close);
    assert_eq!(h.sink_closes.load(Ordering::SeqCst), 1);
    assert_eq!(h.calls.load(Ordering::SeqCst), 1);

    assert!(!report.reached_active);
    assert_eq!(report.reason, Some(TeardownReason::EstablishFailed));
    assert!(report.error.unwrap().contains("credentials rejected"));
    assert_eq!(h.lifecycle.state(), SessionState::Closed);
}

#[tokio::test]
async fn dial_failure_never_becomes_active() {
    let mut h = start(Err(BridgeError::Dial("connection refused".into())));
    let report = finish(h.handle).await;

    let frames = frames_until_close(&mut h.frames).await;
    assert!(matches!(&frames[0], Frame::Text(t) if t.contains("dial failed")));
    assert!(!report.reached_active);
    assert_eq!(report.bytes_to_client, 0);
}

#[tokio::test]
async fn client_input_reaches_shell_verbatim() {
    let (session, mut shell, conn_closes) = fake_session();
    let h = start(Ok(session));

    h.client.send(Ok(b"ls\n".to_vec())).unwrap();
    let mut buf = [0u8; 3];
    tokio::time::timeout(Duration::from_secs(5), shell.read_exact(&mut buf))
        .await
        .expect("input not relayed")
        .unwrap();
    assert_eq!(&buf, b"ls\n");
    assert_eq!(h.lifecycle.state(), SessionState::Active);

    drop(h.client);
    let report = finish(h.handle).await;
    assert!(report.reached_active);
    assert_eq!(report.reason, Some(TeardownReason::ClientClosed));
    assert_eq!(report.bytes_to_remote, 3);
    assert_eq!(conn_closes.load(Ordering::SeqCst), 1);
    assert_eq!(h.sink_closes.load(Ordering::SeqCst), 1);
    assert_eq!(h.lifecycle.state(), SessionState::Closed);
}

#[tokio::test]
async fn text_frames_are_written_as_utf8() {
    let (session, mut shell, _) = fake_session();
    let h = start(Ok(session));

    h.client.send(Ok("é\r".as_bytes().to_vec())).unwrap();
    let mut buf = [0u8; 3];
    shell.read_exact(&mut buf).await.unwrap();
    assert_eq!(&buf, "é\r".as_bytes());

    drop(h.client);
    finish(h.handle).await;
}

#[tokio::test]
async fn remote_output_arrives_in_order_and_unmodified() {
    let (session, mut shell, conn_closes) = fake_session();
    let mut h = start(Ok(session));

    let payload: Vec<u8> = (0..10 * 1024).map(|i| (i % 251) as u8).collect();
    for piece in payload.chunks(1000) {
        shell.write_all(piece).await.unwrap();
    }
    drop(shell);

    let frames = frames_until_close(&mut h.frames).await;
    let mut received = Vec::new();
    for frame in &frames[..frames.len() - 1] {
        match frame {
            Frame::Binary(chunk) => {
                assert!(!chunk.is_empty());
                assert!(chunk.len() <= 4096);
                received.extend_from_slice(chunk);
            }
            other => panic!("unexpected frame {other:?}"),
        }
    }
    assert_eq!(received, payload);

    let report = finish(h.handle).await;
    assert_eq!(report.reason, Some(TeardownReason::RemoteClosed));
    assert_eq!(report.bytes_to_client, payload.len() as u64);
    assert_eq!(conn_closes.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn remote_exit_closes_client() {
    let (session, shell, conn_closes) = fake_session();
    let mut h = start(Ok(session));

    drop(shell);
    let frames = frames_until_close(&mut h.frames).await;
    assert_eq!(frames, vec![Frame::Close]);

    let report = finish(h.handle).await;
    assert_eq!(report.reason, Some(TeardownReason::RemoteClosed));
    assert_eq!(h.sink_closes.load(Ordering::SeqCst), 1);
    assert_eq!(conn_closes.load(Ordering::SeqCst), 1);
    drop(h.client);
}

#[tokio::test]
async fn client_shutdown_closes_shell_input() {
    let (session, mut shell, _) = fake_session();
    let h = start(Ok(session));

    drop(h.client);
    finish(h.handle).await;

    let mut rest = Vec::new();
    let n = tokio::time::timeout(Duration::from_secs(5), shell.read_to_end(&mut rest))
        .await
        .expect("shell input never reached eof")
        .unwrap();
    assert_eq!(n, 0);
}

#[tokio::test]
async fn client_error_tears_down() {
    let (session, _shell, conn_closes) = fake_session();
    let h = start(Ok(session));

    h.client
        .send(Err(BridgeError::Channel("reset by peer".into())))
        .unwrap();
    let report = finish(h.handle).await;
    assert_eq!(report.reason, Some(TeardownReason::ClientError));
    assert_eq!(conn_closes.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn failed_client_send_tears_down() {
    let (session, mut shell, conn_closes) = fake_session();
    let h = start_with(Ok(session), settings(), true);

    shell.write_all(b"motd\r\n").await.unwrap();
    let report = finish(h.handle).await;
    assert_eq!(report.reason, Some(TeardownReason::ClientError));
    assert_eq!(report.bytes_to_client, 0);
    assert_eq!(conn_closes.load(Ordering::SeqCst), 1);
    assert_eq!(h.sink_closes.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn simultaneous_ends_release_once() {
    let (session, shell, conn_closes) = fake_session();
    let h = start(Ok(session));

    drop(shell);
    drop(h.client);
    let report = finish(h.handle).await;

    assert!(matches!(
        report.reason,
        Some(TeardownReason::RemoteClosed) | Some(TeardownReason::ClientClosed)
    ));
    assert_eq!(conn_closes.load(Ordering::SeqCst), 1);
    assert_eq!(h.sink_closes.load(Ordering::SeqCst), 1);
    assert_eq!(h.lifecycle.state(), SessionState::Closed);
}

#[tokio::test]
async fn max_session_limit_ends_session() {
    let (session, _shell, conn_closes) = fake_session();
    let h = start_with(
        Ok(session),
        BridgeSettings {
            max_session: Some(Duration::from_millis(100)),
            ..settings()
        },
        false,
    );

    let report = finish(h.handle).await;
    assert_eq!(report.reason, Some(TeardownReason::MaxDuration));
    assert_eq!(conn_closes.load(Ordering::SeqCst), 1);
    drop(h.client);
}

#[tokio::test]
async fn idle_limit_ends_quiet_session() {
    let (session, _shell, conn_closes) = fake_session();
    let h = start_with(
        Ok(session),
        BridgeSettings {
            idle_timeout: Some(Duration::from_millis(100)),
            ..settings()
        },
        false,
    );

    let report = finish(h.handle).await;
    assert_eq!(report.reason, Some(TeardownReason::IdleTimeout));
    assert_eq!(conn_closes.load(Ordering::SeqCst), 1);
    drop(h.client);
}

#[test]
fn settings_follow_relay_config() {
    let settings = BridgeSettings::default();
    assert_eq!(settings.chunk_size, 4096);
    assert!(settings.idle_timeout.is_none());
    assert!(settings.max_session.is_none());
}
