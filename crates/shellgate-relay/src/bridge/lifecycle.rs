//! Session state machine and the shared teardown signal.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Where a bridge invocation is. Only ever moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SessionState {
    Connecting,
    Authenticating,
    PtyRequested,
    Active,
    Closing,
    Closed,
}

/// What started teardown. Only the first trigger is recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TeardownReason {
    EstablishFailed,
    ClientClosed,
    ClientError,
    RemoteClosed,
    RemoteError,
    IdleTimeout,
    MaxDuration,
    TaskFailed,
}

struct Inner {
    state: watch::Sender<SessionState>,
    reason: OnceLock<TeardownReason>,
    teardown: CancellationToken,
}

/// State and teardown signal shared by the establisher, both relay loops
/// and the watchdog of one bridge invocation.
#[derive(Clone)]
pub struct Lifecycle {
    inner: Arc<Inner>,
}

impl Lifecycle {
    pub fn new() -> Self {
        let (state, _) = watch::channel(SessionState::Connecting);
        Self {
            inner: Arc::new(Inner {
                state,
                reason: OnceLock::new(),
                teardown: CancellationToken::new(),
            }),
        }
    }

    pub fn state(&self) -> SessionState {
        *self.inner.state.borrow()
    }

    /// Observe state transitions.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.inner.state.subscribe()
    }

    /// Move to `next` if it is ahead of the current state.
    pub fn advance(&self, next: SessionState) -> bool {
        self.inner.state.send_if_modified(|state| {
            if next > *state {
                debug!(from = ?*state, to = ?next, "session state");
                *state = next;
                true
            } else {
                false
            }
        })
    }

    /// Start teardown. Safe to call any number of times from any task;
    /// returns true only for the call that actually started it.
    pub fn trigger(&self, reason: TeardownReason) -> bool {
        let first = self.inner.reason.set(reason).is_ok();
        if first {
            info!(reason = ?reason, "teardown triggered");
        }
        self.advance(SessionState::Closing);
        self.inner.teardown.cancel();
        first
    }

    pub fn reason(&self) -> Option<TeardownReason> {
        self.inner.reason.get().copied()
    }

    pub fn is_tearing_down(&self) -> bool {
        self.inner.teardown.is_cancelled()
    }

    /// Resolves once teardown has been triggered.
    pub async fn torn_down(&self) {
        self.inner.teardown.cancelled().await
    }

    pub(crate) fn finish(&self) {
        self.advance(SessionState::Closed);
    }
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

/// Last time either relay direction moved bytes.
pub(crate) struct ActivityClock {
    started: Instant,
    last_ms: AtomicU64,
}

impl ActivityClock {
    pub(crate) fn new() -> Self {
        Self {
            started: Instant::now(),
            last_ms: AtomicU64::new(0),
        }
    }

    pub(crate) fn touch(&self) {
        let elapsed = self.started.elapsed().as_millis() as u64;
        self.last_ms.fetch_max(elapsed, Ordering::Relaxed);
    }

    fn last_activity(&self) -> Instant {
        self.started + Duration::from_millis(self.last_ms.load(Ordering::Relaxed))
    }
}

/// Trigger teardown when the session has been idle for `idle` or alive for
/// `max_session`. Returns as soon as teardown starts for any reason.
pub(crate) async fn watchdog(
    lifecycle: Lifecycle,
    activity: Arc<ActivityClock>,
    idle: Option<Duration>,
    max_session: Option<Duration>,
) {
    let hard_deadline = max_session.map(|max| activity.started + max);

    loop {
        let idle_deadline = idle.map(|idle| activity.last_activity() + idle);
        let wake = match (idle_deadline, hard_deadline) {
            (Some(a), Some(b)) => a.min(b),
            (Some(a), None) | (None, Some(a)) => a,
            (None, None) => return,
        };

        tokio::select! {
            _ = lifecycle.torn_down() => return,
            _ = tokio::time::sleep_until(wake) => {}
        }

        let now = Instant::now();
        if hard_deadline.is_some_and(|deadline| now >= deadline) {
            lifecycle.trigger(TeardownReason::MaxDuration);
            return;
        }
        if let Some(idle) = idle {
            // A touch during the sleep pushes the deadline out; loop again.
            if now >= activity.last_activity() + idle {
                lifecycle.trigger(TeardownReason::IdleTimeout);
                return;
            }
        }
    }
}
