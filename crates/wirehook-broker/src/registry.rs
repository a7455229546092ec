//! Connection registry: the broker's only shared mutable state.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use dashmap::DashMap;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use wirehook_core::ids::ConnectionId;

/// A live outbound channel to one connected client.
#[derive(Clone)]
pub struct ConnectionHandle {
    tx: mpsc::Sender<String>,
    cancel: CancellationToken,
    /// When the connection registered.
    pub connected_at: Instant,
}

impl ConnectionHandle {
    /// Wrap a send channel whose receiver feeds the connection's WebSocket
    /// writer.
    #[must_use]
    pub fn new(tx: mpsc::Sender<String>) -> Self {
        Self {
            tx,
            cancel: CancellationToken::new(),
            connected_at: Instant::now(),
        }
    }

    /// Queue a text frame for the client.
    ///
    /// Returns `false` when the queue is full or the writer has gone away;
    /// the frame is dropped either way.
    pub fn forward(&self, frame: String) -> bool {
        self.tx.try_send(frame).is_ok()
    }

    /// Ask the connection's socket task to close.
    pub fn close(&self) {
        self.cancel.cancel();
    }

    /// Resolves once [`close`](Self::close) has been called.
    pub async fn closed(&self) {
        self.cancel.cancelled().await;
    }

    /// Whether this handle and `other` refer to the same underlying channel.
    #[must_use]
    pub fn is_same_channel(&self, other: &ConnectionHandle) -> bool {
        self.tx.same_channel(&other.tx)
    }
}

/// Registry of live connections, keyed by broker-assigned id.
///
/// Constructed per broker instance and shared behind an `Arc` — never a
/// process-wide singleton, so brokers running side by side (as in tests) do
/// not see each other's connections. `register`, `lookup`, and `unregister`
/// are individually atomic; no caller can observe a half-updated entry.
#[derive(Default)]
pub struct ConnectionRegistry {
    connections: DashMap<ConnectionId, ConnectionHandle>,
}

impl ConnectionRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a connection under `id`.
    pub fn register(&self, id: ConnectionId, handle: ConnectionHandle) {
        let _ = self.connections.insert(id, handle);
    }

    /// Look up the channel for `id`. Absence is not an error — the ingestion
    /// path treats it as "nobody listening".
    #[must_use]
    pub fn lookup(&self, id: &ConnectionId) -> Option<ConnectionHandle> {
        self.connections.get(id).map(|entry| entry.clone())
    }

    /// Remove `id`, but only while it still maps to `handle`'s channel.
    ///
    /// A close handler that lost the race to a newer registration under the
    /// same id must not evict the newer entry. Returns whether an entry was
    /// removed.
    pub fn unregister(&self, id: &ConnectionId, handle: &ConnectionHandle) -> bool {
        self.connections
            .remove_if(id, |_, current| current.is_same_channel(handle))
            .is_some()
    }

    /// Force-close the connection registered under `id`, if any.
    ///
    /// The socket task notices the close request, drops the connection, and
    /// unregisters it through the normal close path.
    pub fn disconnect(&self, id: &ConnectionId) -> bool {
        match self.lookup(id) {
            Some(handle) => {
                handle.close();
                true
            }
            None => false,
        }
    }

    /// Number of live connections.
    #[must_use]
    pub fn count(&self) -> usize {
        self.connections.len()
    }
}

/// Allocates broker-unique connection ids (`local-1`, `local-2`, …).
///
/// Ids are never reused within one broker lifetime, which together with the
/// guarded [`ConnectionRegistry::unregister`] rules out a stale close
/// callback evicting a newer connection.
pub struct ConnectionIdAllocator {
    prefix: String,
    next: AtomicU64,
}

impl ConnectionIdAllocator {
    #[must_use]
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            next: AtomicU64::new(1),
        }
    }

    /// Mint the next id.
    pub fn next_id(&self) -> ConnectionId {
        let n = self.next.fetch_add(1, Ordering::Relaxed);
        ConnectionId::from(format!("{}{}", self.prefix, n))
    }
}
