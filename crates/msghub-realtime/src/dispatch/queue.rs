//! Bounded, coalescing delivery queue.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::Notify;
use tokio::time::{Instant, timeout_at};
use tracing::debug;

use crate::message::types::HubMessage;
use crate::metrics::HubMetrics;

/// Bounded FIFO of pending broadcasts.
///
/// Producers wait at most `enqueue_timeout` for space and then drop the
/// message. A message carrying a `hash` first evicts every queued message
/// with the same hash, so at most one pending state per key is ever queued.
#[derive(Debug)]
pub struct DeliveryQueue {
    /// Pending messages.
    items: Mutex<VecDeque<HubMessage>>,
    /// Maximum queued messages.
    capacity: usize,
    /// How long `enqueue` waits for space.
    enqueue_timeout: Duration,
    /// Signalled when a message is pushed.
    not_empty: Notify,
    /// Signalled when a message is popped.
    not_full: Notify,
    /// Metrics.
    metrics: Arc<HubMetrics>,
}

impl DeliveryQueue {
    /// Creates a queue with the given capacity and enqueue timeout.
    pub fn new(capacity: usize, enqueue_timeout: Duration, metrics: Arc<HubMetrics>) -> Self {
        let capacity = capacity.max(1);
        Self {
            items: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
            enqueue_timeout,
            not_empty: Notify::new(),
            not_full: Notify::new(),
            metrics,
        }
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<HubMessage>> {
        self.items.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Append a message, waiting up to the enqueue timeout for space.
    ///
    /// Returns `false` if the queue stayed full; the message is dropped.
    pub async fn enqueue(&self, message: HubMessage) -> bool {
        let deadline = Instant::now() + self.enqueue_timeout;
        loop {
            let space = self.not_full.notified();
            {
                let mut items = self.lock();
                if let Some(hash) = &message.hash {
                    let before = items.len();
                    items.retain(|queued| queued.hash.as_ref() != Some(hash));
                    let superseded = (before - items.len()) as u64;
                    if superseded > 0 {
                        debug!(hash = %hash, superseded, "Coalesced queued messages");
                        HubMetrics::add(&self.metrics.messages_coalesced, superseded);
                    }
                }
                if items.len() < self.capacity {
                    items.push_back(message);
                    drop(items);
                    HubMetrics::inc(&self.metrics.messages_enqueued);
                    self.not_empty.notify_waiters();
                    return true;
                }
            }
            if timeout_at(deadline, space).await.is_err() {
                HubMetrics::inc(&self.metrics.messages_dropped);
                return false;
            }
        }
    }

    /// Take the oldest message, waiting up to `wait` for one to arrive.
    pub async fn poll(&self, wait: Duration) -> Option<HubMessage> {
        let deadline = Instant::now() + wait;
        loop {
            let arrival = self.not_empty.notified();
            let next = self.lock().pop_front();
            if let Some(message) = next {
                self.not_full.notify_waiters();
                return Some(message);
            }
            if timeout_at(deadline, arrival).await.is_err() {
                return None;
            }
        }
    }

    /// Number of queued messages.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether the queue is empty.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Maximum queued messages.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Drop every queued message. Returns how many were discarded.
    pub fn clear(&self) -> usize {
        let mut items = self.lock();
        let discarded = items.len();
        items.clear();
        drop(items);
        self.not_full.notify_waiters();
        discarded
    }
}
