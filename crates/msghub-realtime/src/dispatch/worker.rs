//! Bounded worker pool that fans one message out to a target set.

use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::FutureExt;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, warn};

use crate::connection::handle::{ConnectionHandle, DeliveryOutcome};
use crate::connection::registry::ConnectionRegistry;
use crate::message::serializer;
use crate::message::types::HubMessage;
use crate::metrics::HubMetrics;

/// One unit of delivery work.
#[derive(Debug)]
pub struct WorkItem {
    /// Connections to deliver to.
    pub targets: Vec<Arc<ConnectionHandle>>,
    /// Message to deliver.
    pub message: HubMessage,
}

/// Per-work-item delivery tally.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    /// Frames handed to a transport.
    pub delivered: usize,
    /// Targets skipped because they were closed.
    pub skipped: usize,
    /// Targets whose transport failed.
    pub failed: usize,
}

/// Decrements the pending count when a work item finishes or is aborted.
struct PendingGuard(Arc<AtomicUsize>);

impl Drop for PendingGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Pool of concurrent senders.
///
/// At most `workers` items deliver at once; up to `backlog` more may wait
/// for a worker. Items beyond that are discarded.
#[derive(Debug)]
pub struct WorkerPool {
    /// Worker permits.
    permits: Arc<Semaphore>,
    /// Items submitted and not yet finished.
    pending: Arc<AtomicUsize>,
    /// Worker count.
    workers: usize,
    /// Maximum `pending` (workers + backlog).
    limit: usize,
    /// Spawned work items.
    tasks: Mutex<JoinSet<()>>,
    /// Cleared when shutdown begins.
    accepting: AtomicBool,
    /// Registry, for pruning connections found closed.
    registry: Arc<ConnectionRegistry>,
    /// Metrics.
    metrics: Arc<HubMetrics>,
}

impl WorkerPool {
    /// Creates a pool with `workers` concurrent senders and a `backlog` of waiting items.
    pub fn new(
        workers: usize,
        backlog: usize,
        registry: Arc<ConnectionRegistry>,
        metrics: Arc<HubMetrics>,
    ) -> Self {
        let workers = workers.max(1);
        Self {
            permits: Arc::new(Semaphore::new(workers)),
            pending: Arc::new(AtomicUsize::new(0)),
            workers,
            limit: workers + backlog,
            tasks: Mutex::new(JoinSet::new()),
            accepting: AtomicBool::new(true),
            registry,
            metrics,
        }
    }

    /// Schedule a work item. Must be called from within a Tokio runtime.
    ///
    /// Returns `false` if the item was discarded (backlog full or shutting down).
    pub fn submit(&self, item: WorkItem) -> bool {
        if !self.accepting.load(Ordering::SeqCst) {
            debug!(targets = item.targets.len(), "Worker pool stopped, discarding work item");
            return false;
        }
        if item.targets.is_empty() {
            return true;
        }

        let pending = self.pending.fetch_add(1, Ordering::SeqCst);
        if pending >= self.limit {
            self.pending.fetch_sub(1, Ordering::SeqCst);
            HubMetrics::inc(&self.metrics.work_items_discarded);
            warn!(
                pending,
                limit = self.limit,
                targets = item.targets.len(),
                topic = ?item.message.topic,
                "Worker backlog full, discarding work item"
            );
            return false;
        }
        let guard = PendingGuard(self.pending.clone());

        let permits = self.permits.clone();
        let registry = self.registry.clone();
        let metrics = self.metrics.clone();
        HubMetrics::inc(&self.metrics.work_items_dispatched);

        let mut tasks = self.tasks.lock().unwrap_or_else(|e| e.into_inner());
        while tasks.try_join_next().is_some() {}
        tasks.spawn(async move {
            let _guard = guard;
            let Ok(_permit) = permits.acquire_owned().await else {
                return;
            };
            let report = deliver(&registry, &metrics, &item).await;
            debug!(
                topic = ?item.message.topic,
                targets = item.targets.len(),
                delivered = report.delivered,
                skipped = report.skipped,
                failed = report.failed,
                "Work item delivered"
            );
        });
        true
    }

    /// Items submitted and not yet finished.
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }

    /// Worker count.
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Stop accepting work, wait up to `grace` for in-flight items, then
    /// abort whatever is left.
    pub async fn shutdown(&self, grace: Duration) {
        self.accepting.store(false, Ordering::SeqCst);
        let mut tasks = {
            let mut guard = self.tasks.lock().unwrap_or_else(|e| e.into_inner());
            std::mem::take(&mut *guard)
        };

        let drained = tokio::time::timeout(grace, async {
            while tasks.join_next().await.is_some() {}
        })
        .await;

        if drained.is_err() {
            warn!(
                remaining = tasks.len(),
                "Worker pool did not drain within grace period, aborting"
            );
            tasks.abort_all();
            while tasks.join_next().await.is_some() {}
        }
        self.permits.close();
    }
}

/// Serialize `item.message` once and push it to every target.
///
/// Failures are isolated per target; one bad connection never stops
/// delivery to the rest.
pub async fn deliver(
    registry: &ConnectionRegistry,
    metrics: &HubMetrics,
    item: &WorkItem,
) -> DeliveryReport {
    let mut report = DeliveryReport::default();
    let text = match serializer::encode(&item.message) {
        Ok(text) => text,
        Err(e) => {
            error!(error = %e, topic = ?item.message.topic, "Failed to serialize outbound message");
            return report;
        }
    };

    for target in &item.targets {
        let outcome = AssertUnwindSafe(target.deliver(&text)).catch_unwind().await;
        match outcome {
            Ok(DeliveryOutcome::Delivered) => {
                report.delivered += 1;
                HubMetrics::inc(&metrics.deliveries_ok);
            }
            Ok(DeliveryOutcome::SkippedClosed) => {
                report.skipped += 1;
                HubMetrics::inc(&metrics.deliveries_skipped);
                debug!(conn_id = %target.id(), "Connection closed, skipping delivery");
                registry.unregister(target.id());
            }
            Ok(DeliveryOutcome::Failed(e)) => {
                report.failed += 1;
                HubMetrics::inc(&metrics.deliveries_failed);
                warn!(conn_id = %target.id(), error = %e, "Failed to deliver message");
            }
            Err(_) => {
                report.failed += 1;
                HubMetrics::inc(&metrics.deliveries_failed);
                warn!(conn_id = %target.id(), "Transport panicked while delivering message");
            }
        }
    }

    report
}
