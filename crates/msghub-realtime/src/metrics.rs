//! Hub metrics.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Hub-level counters.
#[derive(Debug, Default)]
pub struct HubMetrics {
    /// Connections ever registered
    pub connections_opened: AtomicU64,
    /// Connections closed by the transport layer
    pub connections_closed: AtomicU64,
    /// Broadcasts accepted by the delivery queue
    pub messages_enqueued: AtomicU64,
    /// Queued broadcasts superseded by a newer one with the same hash
    pub messages_coalesced: AtomicU64,
    /// Broadcasts dropped because the queue stayed full
    pub messages_dropped: AtomicU64,
    /// Work items handed to the worker pool
    pub work_items_dispatched: AtomicU64,
    /// Work items discarded because the worker backlog was full
    pub work_items_discarded: AtomicU64,
    /// Frames handed to a transport
    pub deliveries_ok: AtomicU64,
    /// Frames a transport rejected
    pub deliveries_failed: AtomicU64,
    /// Frames skipped because the connection was closed
    pub deliveries_skipped: AtomicU64,
    /// Successful authentication links
    pub authentications_ok: AtomicU64,
    /// Failed authentication links
    pub authentications_failed: AtomicU64,
    /// Inbound messages received
    pub inbound_messages: AtomicU64,
}

impl HubMetrics {
    /// Create new zeroed metrics
    pub fn new() -> Self {
        Self::default()
    }

    /// Increment a counter by one
    pub fn inc(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Add `n` to a counter
    pub fn add(counter: &AtomicU64, n: u64) {
        counter.fetch_add(n, Ordering::Relaxed);
    }

    /// Get a snapshot of all metrics.
    ///
    /// The registry owns the live connection count, so it is passed in.
    pub fn snapshot(&self, connections_active: u64) -> MetricsSnapshot {
        MetricsSnapshot {
            connections_opened: self.connections_opened.load(Ordering::Relaxed),
            connections_closed: self.connections_closed.load(Ordering::Relaxed),
            connections_active,
            messages_enqueued: self.messages_enqueued.load(Ordering::Relaxed),
            messages_coalesced: self.messages_coalesced.load(Ordering::Relaxed),
            messages_dropped: self.messages_dropped.load(Ordering::Relaxed),
            work_items_dispatched: self.work_items_dispatched.load(Ordering::Relaxed),
            work_items_discarded: self.work_items_discarded.load(Ordering::Relaxed),
            deliveries_ok: self.deliveries_ok.load(Ordering::Relaxed),
            deliveries_failed: self.deliveries_failed.load(Ordering::Relaxed),
            deliveries_skipped: self.deliveries_skipped.load(Ordering::Relaxed),
            authentications_ok: self.authentications_ok.load(Ordering::Relaxed),
            authentications_failed: self.authentications_failed.load(Ordering::Relaxed),
            inbound_messages: self.inbound_messages.load(Ordering::Relaxed),
        }
    }
}

/// Serializable metrics snapshot
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    /// Connections ever registered
    pub connections_opened: u64,
    /// Connections unregistered
    pub connections_closed: u64,
    /// Currently registered connections
    pub connections_active: u64,
    /// Broadcasts accepted by the delivery queue
    pub messages_enqueued: u64,
    /// Queued broadcasts superseded by hash
    pub messages_coalesced: u64,
    /// Broadcasts dropped on a full queue
    pub messages_dropped: u64,
    /// Work items handed to the worker pool
    pub work_items_dispatched: u64,
    /// Work items discarded on a full backlog
    pub work_items_discarded: u64,
    /// Frames handed to a transport
    pub deliveries_ok: u64,
    /// Frames a transport rejected
    pub deliveries_failed: u64,
    /// Frames skipped on closed connections
    pub deliveries_skipped: u64,
    /// Successful authentication links
    pub authentications_ok: u64,
    /// Failed authentication links
    pub authentications_failed: u64,
    /// Inbound messages received
    pub inbound_messages: u64,
}
