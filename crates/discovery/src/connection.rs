//! Outbound connection handle with an observable state.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use rumor_net_peers::{ConnectionState, NetConnection};
use tokio::sync::watch;
use tokio::task::AbortHandle;
use tonic::transport::{Channel, Endpoint};
use tracing::{debug, trace};

static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// Timeouts applied to outbound connections.
#[derive(Debug, Clone)]
pub struct DialConfig {
    /// Upper bound on the TCP connect and HTTP/2 handshake.
    pub connect_timeout: Duration,
    /// Upper bound on each request sent over the connection.
    pub request_timeout: Duration,
}

impl Default for DialConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(5),
            request_timeout: Duration::from_secs(5),
        }
    }
}

struct Inner {
    id: u64,
    addr: String,
    state: watch::Sender<ConnectionState>,
    channel: Mutex<Option<Channel>>,
    handshake: Mutex<Option<AbortHandle>>,
}

impl Inner {
    /// Move to `next` unless the handle was closed.
    fn transition(&self, next: ConnectionState) {
        self.state.send_if_modified(|state| {
            if *state == ConnectionState::Shutdown || *state == next {
                return false;
            }
            *state = next;
            true
        });
    }
}

/// Client connection to one peer.
///
/// Dialing returns immediately in `Connecting`; the handshake runs in a
/// background task and moves the handle to `Ready` or `TransientFailure`.
/// Clones share the same connection. Once closed, a handle stays in `Shutdown`.
#[derive(Clone)]
pub struct PeerConnection {
    inner: Arc<Inner>,
}

impl PeerConnection {
    /// Start a non-blocking dial to `addr` (`host:port`).
    ///
    /// Fails only when no endpoint can be built from the address. Must be called
    /// from within a tokio runtime.
    pub fn dial(addr: &str, config: &DialConfig) -> Result<Self, tonic::transport::Error> {
        let endpoint = Endpoint::from_shared(format!("http://{addr}"))?
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout);

        let (state, _) = watch::channel(ConnectionState::Connecting);
        let conn = Self {
            inner: Arc::new(Inner {
                id: NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed),
                addr: addr.to_string(),
                state,
                channel: Mutex::new(None),
                handshake: Mutex::new(None),
            }),
        };

        let weak = Arc::downgrade(&conn.inner);
        let handshake = tokio::spawn(async move {
            let result = endpoint.connect().await;
            let Some(inner) = weak.upgrade() else {
                return;
            };
            match result {
                Ok(channel) => {
                    *inner.channel.lock() = Some(channel);
                    inner.transition(ConnectionState::Ready);
                    trace!(peer = %inner.addr, id = inner.id, "handshake complete");
                }
                Err(err) => {
                    debug!(peer = %inner.addr, id = inner.id, %err, "handshake failed");
                    inner.transition(ConnectionState::TransientFailure);
                }
            }
        });
        *conn.inner.handshake.lock() = Some(handshake.abort_handle());

        Ok(conn)
    }

    /// Process-unique id; a redial always yields a new id.
    pub fn id(&self) -> u64 {
        self.inner.id
    }

    pub fn addr(&self) -> &str {
        &self.inner.addr
    }

    pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.inner.state.subscribe()
    }

    /// The underlying channel, only while `Ready`.
    pub fn channel(&self) -> Option<Channel> {
        if !self.state().is_ready() {
            return None;
        }
        self.inner.channel.lock().clone()
    }

    /// Wait until the handshake settles, at most `timeout`.
    ///
    /// Returns the channel when the connection became `Ready`.
    pub async fn ready(&self, timeout: Duration) -> Option<Channel> {
        let mut rx = self.subscribe();
        let state = match tokio::time::timeout(timeout, rx.wait_for(|s| !s.is_pending())).await {
            Ok(Ok(state)) => *state,
            _ => return None,
        };

        if state.is_ready() { self.channel() } else { None }
    }

    /// Report a transport failure observed by a caller, e.g. an `Unavailable` status.
    pub fn mark_failed(&self) {
        self.inner.transition(ConnectionState::TransientFailure);
    }
}

impl NetConnection for PeerConnection {
    fn state(&self) -> ConnectionState {
        *self.inner.state.borrow()
    }

    fn close(&self) {
        if let Some(handshake) = self.inner.handshake.lock().take() {
            handshake.abort();
        }
        self.inner.channel.lock().take();
        self.inner.state.send_replace(ConnectionState::Shutdown);
    }
}

impl fmt::Debug for PeerConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PeerConnection")
            .field("id", &self.inner.id)
            .field("addr", &self.inner.addr)
            .field("state", &self.state())
            .finish()
    }
}
