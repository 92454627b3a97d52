use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::auth::Principal;
use crate::stats::Stats;

pub type ConnectionId = Uuid;

/// The unit fanned out to subscribers. Immutable once minted on publish;
/// shared by `Arc` across every subscriber queue it lands in so no
/// per-subscriber copy is required.
#[derive(Debug, Clone, PartialEq)]
pub struct MessageEnvelope {
    pub id: String,
    pub channel: String,
    pub payload: serde_json::Value,
    pub published_at: DateTime<Utc>,
}

/// Outcome of a single `try_enqueue` call (§4.2, §4.7).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnqueueOutcome {
    Delivered,
    DroppedFull,
    DroppedClosed,
}

/// A cheap-to-clone reference to a live connection's send queue and
/// bookkeeping. Multiple enqueuers (publish handlers) hold clones of the
/// same handle concurrently; exactly one writer owns the matching
/// `mpsc::Receiver`.
#[derive(Clone)]
pub struct ConnectionHandle {
    pub id: ConnectionId,
    pub principal: Principal,
    pub channels: Arc<Vec<String>>,
    pub connected_at: DateTime<Utc>,
    sender: mpsc::Sender<Arc<MessageEnvelope>>,
    messages_sent: Arc<AtomicU64>,
    closed: Arc<AtomicBool>,
}

impl ConnectionHandle {
    /// Non-blocking enqueue. Once the connection has entered `draining` or
    /// `closed`, this always returns `DroppedClosed`, independent of whether
    /// the underlying channel has physically closed yet. Does not itself
    /// count toward `messages_sent` — that counter only advances when the
    /// writer actually emits the envelope onto the wire (§4.3), which is
    /// not guaranteed for every enqueued message (e.g. a connection that
    /// stops being drained before exit).
    pub fn try_enqueue(&self, envelope: Arc<MessageEnvelope>) -> EnqueueOutcome {
        if self.closed.load(Ordering::Acquire) {
            return EnqueueOutcome::DroppedClosed;
        }
        match self.sender.try_send(envelope) {
            Ok(()) => EnqueueOutcome::Delivered,
            Err(mpsc::error::TrySendError::Full(_)) => EnqueueOutcome::DroppedFull,
            Err(mpsc::error::TrySendError::Closed(_)) => EnqueueOutcome::DroppedClosed,
        }
    }

    /// Called by the writer when it actually emits an envelope onto the SSE
    /// stream (§4.3's "on envelope: emit it, increment `messages_sent`").
    pub fn record_sent(&self) {
        self.messages_sent.fetch_add(1, Ordering::Relaxed);
    }

    pub fn messages_sent(&self) -> u64 {
        self.messages_sent.load(Ordering::Relaxed)
    }
}

struct RegistryInner {
    connections: HashMap<ConnectionId, ConnectionHandle>,
    channel_index: HashMap<String, HashSet<ConnectionId>>,
}

/// In-memory, process-wide state holding live subscriber connections. The
/// primary and reverse indexes are guarded by a single mutex (§5, §9); lock
/// hold times are bounded to plain map mutation, never an `.await`.
pub struct ConnectionRegistry {
    inner: Mutex<RegistryInner>,
    stats: Arc<Stats>,
}

/// Handed back to the caller that accepted a connection: the id to key by,
/// the receiving half of the send queue (owned by the writer), and a handle
/// to mark the connection closed when the writer exits.
pub struct Registration {
    pub connection_id: ConnectionId,
    pub receiver: mpsc::Receiver<Arc<MessageEnvelope>>,
    pub handle: ConnectionHandle,
}

impl ConnectionRegistry {
    pub fn new(stats: Arc<Stats>) -> Self {
        Self {
            inner: Mutex::new(RegistryInner {
                connections: HashMap::new(),
                channel_index: HashMap::new(),
            }),
            stats,
        }
    }

    pub fn register(&self, principal: Principal, channels: Vec<String>, capacity: usize) -> Registration {
        let connection_id = Uuid::new_v4();
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        let handle = ConnectionHandle {
            id: connection_id,
            principal,
            channels: Arc::new(channels),
            connected_at: Utc::now(),
            sender,
            messages_sent: Arc::new(AtomicU64::new(0)),
            closed: Arc::new(AtomicBool::new(false)),
        };

        {
            let mut inner = self.inner.lock().unwrap();
            for channel in handle.channels.iter() {
                inner
                    .channel_index
                    .entry(channel.clone())
                    .or_default()
                    .insert(connection_id);
            }
            inner.connections.insert(connection_id, handle.clone());
        }
        self.stats.record_connection();

        Registration {
            connection_id,
            receiver,
            handle,
        }
    }

    /// Transitions the connection to `closed`: removes it from both
    /// indexes and marks its handle closed so any in-flight `try_enqueue`
    /// observes `dropped_closed`. Idempotent.
    pub fn unregister(&self, connection_id: ConnectionId) {
        let mut inner = self.inner.lock().unwrap();
        let Some(handle) = inner.connections.remove(&connection_id) else {
            return;
        };
        handle.closed.store(true, Ordering::Release);
        for channel in handle.channels.iter() {
            if let Some(set) = inner.channel_index.get_mut(channel) {
                set.remove(&connection_id);
                if set.is_empty() {
                    inner.channel_index.remove(channel);
                }
            }
        }
    }

    /// Returns a snapshot of the subscriber set for a channel, stable for
    /// the duration of a single fan-out call regardless of concurrent
    /// register/unregister activity.
    pub fn subscribers(&self, channel: &str) -> Vec<ConnectionHandle> {
        let inner = self.inner.lock().unwrap();
        match inner.channel_index.get(channel) {
            Some(ids) => ids
                .iter()
                .filter_map(|id| inner.connections.get(id).cloned())
                .collect(),
            None => Vec::new(),
        }
    }

    pub fn connection_count(&self) -> usize {
        self.inner.lock().unwrap().connections.len()
    }

    pub fn channel_count(&self) -> usize {
        self.inner.lock().unwrap().channel_index.len()
    }

    /// Snapshot of every channel with its current subscriber handles, used
    /// by the admin stats endpoint.
    pub fn channel_snapshot(&self) -> Vec<(String, Vec<ConnectionHandle>)> {
        let inner = self.inner.lock().unwrap();
        inner
            .channel_index
            .iter()
            .map(|(channel, ids)| {
                let handles = ids
                    .iter()
                    .filter_map(|id| inner.connections.get(id).cloned())
                    .collect();
                (channel.clone(), handles)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet as StdHashSet;

    fn principal() -> Principal {
        Principal {
            user_id: "user123".to_owned(),
            workspaces: StdHashSet::new(),
            permissions: StdHashSet::new(),
        }
    }

    fn envelope(channel: &str) -> Arc<MessageEnvelope> {
        Arc::new(MessageEnvelope {
            id: Uuid::new_v4().to_string(),
            channel: channel.to_owned(),
            payload: serde_json::json!({"level": "INFO"}),
            published_at: Utc::now(),
        })
    }

    #[test]
    fn register_adds_connection_to_every_requested_channel() {
        let registry = ConnectionRegistry::new(Arc::new(Stats::new()));
        let channels = vec!["logs:etl:ws1".to_owned(), "logs:etl:ws1:wf1".to_owned()];
        let reg = registry.register(principal(), channels, 8);

        assert_eq!(registry.subscribers("logs:etl:ws1").len(), 1);
        assert_eq!(registry.subscribers("logs:etl:ws1:wf1").len(), 1);
        assert_eq!(registry.connection_count(), 1);
        assert_eq!(registry.channel_count(), 2);

        registry.unregister(reg.connection_id);
        assert_eq!(registry.connection_count(), 0);
        assert_eq!(registry.channel_count(), 0);
    }

    #[test]
    fn unregister_is_idempotent() {
        let registry = ConnectionRegistry::new(Arc::new(Stats::new()));
        let reg = registry.register(principal(), vec!["logs:etl:ws1".to_owned()], 8);
        registry.unregister(reg.connection_id);
        registry.unregister(reg.connection_id);
        assert_eq!(registry.connection_count(), 0);
    }

    #[test]
    fn try_enqueue_reports_delivered_then_dropped_full_at_capacity() {
        let registry = ConnectionRegistry::new(Arc::new(Stats::new()));
        let reg = registry.register(principal(), vec!["logs:etl:ws1".to_owned()], 2);

        assert_eq!(
            reg.handle.try_enqueue(envelope("logs:etl:ws1")),
            EnqueueOutcome::Delivered
        );
        assert_eq!(
            reg.handle.try_enqueue(envelope("logs:etl:ws1")),
            EnqueueOutcome::Delivered
        );
        assert_eq!(
            reg.handle.try_enqueue(envelope("logs:etl:ws1")),
            EnqueueOutcome::DroppedFull
        );
        // Enqueueing alone never advances `messages_sent` — only the writer
        // actually emitting the envelope does, via `record_sent`.
        assert_eq!(reg.handle.messages_sent(), 0);
    }

    #[test]
    fn record_sent_advances_messages_sent_independently_of_enqueue() {
        let registry = ConnectionRegistry::new(Arc::new(Stats::new()));
        let reg = registry.register(principal(), vec!["logs:etl:ws1".to_owned()], 8);

        reg.handle.try_enqueue(envelope("logs:etl:ws1"));
        reg.handle.try_enqueue(envelope("logs:etl:ws1"));
        assert_eq!(reg.handle.messages_sent(), 0);

        reg.handle.record_sent();
        assert_eq!(reg.handle.messages_sent(), 1);
    }

    #[test]
    fn try_enqueue_reports_dropped_closed_after_unregister() {
        let registry = ConnectionRegistry::new(Arc::new(Stats::new()));
        let reg = registry.register(principal(), vec!["logs:etl:ws1".to_owned()], 8);
        registry.unregister(reg.connection_id);
        assert_eq!(
            reg.handle.try_enqueue(envelope("logs:etl:ws1")),
            EnqueueOutcome::DroppedClosed
        );
    }

    #[test]
    fn subscribers_snapshot_for_unknown_channel_is_empty() {
        let registry = ConnectionRegistry::new(Arc::new(Stats::new()));
        assert!(registry.subscribers("logs:etl:ws1").is_empty());
    }
}
