//! Dispatch loop that drains the delivery queue into the worker pool.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tracing::{debug, info};

use crate::connection::registry::ConnectionRegistry;

use super::queue::DeliveryQueue;
use super::worker::{WorkItem, WorkerPool};

/// Long-lived task pairing each queued broadcast with a fresh snapshot of
/// live connections.
#[derive(Debug, Clone)]
pub struct DispatchLoop {
    /// Source of broadcasts.
    queue: Arc<DeliveryQueue>,
    /// Live connections.
    registry: Arc<ConnectionRegistry>,
    /// Delivery workers.
    workers: Arc<WorkerPool>,
    /// Cleared to stop the loop at its next poll timeout.
    running: Arc<AtomicBool>,
    /// Bounded wait per poll.
    poll_timeout: Duration,
}

impl DispatchLoop {
    /// Creates a dispatch loop.
    pub fn new(
        queue: Arc<DeliveryQueue>,
        registry: Arc<ConnectionRegistry>,
        workers: Arc<WorkerPool>,
        running: Arc<AtomicBool>,
        poll_timeout: Duration,
    ) -> Self {
        Self {
            queue,
            registry,
            workers,
            running,
            poll_timeout,
        }
    }

    /// Run until the running flag is cleared.
    pub async fn run(self) {
        info!(poll_timeout_ms = self.poll_timeout.as_millis() as u64, "Dispatch loop started");

        while self.running.load(Ordering::SeqCst) {
            let Some(message) = self.queue.poll(self.poll_timeout).await else {
                continue;
            };

            let targets = self.registry.snapshot_live();
            if targets.is_empty() {
                debug!(topic = ?message.topic, "No live connections, dropping broadcast");
                continue;
            }

            self.workers.submit(WorkItem { targets, message });
        }

        info!(queue_len = self.queue.len(), "Dispatch loop stopped");
    }
}
