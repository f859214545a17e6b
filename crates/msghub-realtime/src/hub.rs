//! Top-level message hub that ties the registry, delivery pipeline,
//! targeting, and authentication linking together.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use msghub_core::config::HubConfig;
use msghub_core::traits::{PrincipalResolver, TokenDecoder};

use crate::auth::linker::{AuthenticationLinker, LinkOutcome};
use crate::connection::handle::{ConnectionHandle, ConnectionId, ConnectionInfo};
use crate::connection::registry::ConnectionRegistry;
use crate::dispatch::dispatcher::DispatchLoop;
use crate::dispatch::queue::DeliveryQueue;
use crate::dispatch::worker::{WorkItem, WorkerPool};
use crate::listener::{HubListener, ListenerId, ListenerRegistry};
use crate::message::types::{HubMessage, MessageType};
use crate::message::{serializer, validator};
use crate::metrics::{HubMetrics, MetricsSnapshot};
use crate::targeting::host::LocalHost;
use crate::targeting::resolver::TargetResolver;

/// Session/message hub.
///
/// Construct one per process (or per test) and share it by `Arc`. Call
/// [`MessageHub::start`] to spawn the dispatch loop and
/// [`MessageHub::shutdown`] to stop it.
pub struct MessageHub {
    /// Configuration.
    config: HubConfig,
    /// Live connections and identity index.
    registry: Arc<ConnectionRegistry>,
    /// Pending broadcasts.
    queue: Arc<DeliveryQueue>,
    /// Delivery workers.
    workers: Arc<WorkerPool>,
    /// Target-set resolution.
    resolver: TargetResolver,
    /// In-band authentication.
    linker: AuthenticationLinker,
    /// Inbound listeners.
    listeners: ListenerRegistry,
    /// Metrics.
    metrics: Arc<HubMetrics>,
    /// Dispatch loop run flag.
    running: Arc<AtomicBool>,
    /// Set once shutdown begins.
    closed: AtomicBool,
    /// Dispatch loop task.
    dispatch_task: Mutex<Option<JoinHandle<()>>>,
}

impl std::fmt::Debug for MessageHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageHub")
            .field("connections", &self.registry.len())
            .field("queue_len", &self.queue.len())
            .field("running", &self.is_running())
            .finish()
    }
}

impl MessageHub {
    /// Creates a hub, discovering this host's addresses from configuration.
    pub fn new(
        config: HubConfig,
        decoder: Arc<dyn TokenDecoder>,
        principals: Arc<dyn PrincipalResolver>,
    ) -> Self {
        let local_host = LocalHost::from_config(&config);
        Self::with_local_host(config, decoder, principals, local_host)
    }

    /// Creates a hub with an explicit host identity.
    pub fn with_local_host(
        config: HubConfig,
        decoder: Arc<dyn TokenDecoder>,
        principals: Arc<dyn PrincipalResolver>,
        local_host: LocalHost,
    ) -> Self {
        let metrics = Arc::new(HubMetrics::new());
        let registry = Arc::new(ConnectionRegistry::new());
        let queue = Arc::new(DeliveryQueue::new(
            config.queue_capacity,
            config.enqueue_timeout(),
            metrics.clone(),
        ));
        let workers = Arc::new(WorkerPool::new(
            config.worker_count(),
            config.worker_backlog,
            registry.clone(),
            metrics.clone(),
        ));
        let resolver = TargetResolver::new(registry.clone(), local_host);
        let linker =
            AuthenticationLinker::new(registry.clone(), decoder, principals, metrics.clone());

        info!(
            queue_capacity = queue.capacity(),
            workers = workers.workers(),
            worker_backlog = config.worker_backlog,
            "Message hub initialized"
        );

        Self {
            config,
            registry,
            queue,
            workers,
            resolver,
            linker,
            listeners: ListenerRegistry::new(),
            metrics,
            running: Arc::new(AtomicBool::new(false)),
            closed: AtomicBool::new(false),
            dispatch_task: Mutex::new(None),
        }
    }

    /// Spawn the dispatch loop. Must be called from within a Tokio runtime.
    ///
    /// Does nothing if the loop is already running or the hub is shut down.
    pub fn start(&self) {
        if self.closed.load(Ordering::SeqCst) {
            warn!("Message hub is shut down, not starting dispatch loop");
            return;
        }
        if self.running.swap(true, Ordering::SeqCst) {
            debug!("Dispatch loop already running");
            return;
        }

        let dispatch = DispatchLoop::new(
            self.queue.clone(),
            self.registry.clone(),
            self.workers.clone(),
            self.running.clone(),
            self.config.poll_timeout(),
        );
        let handle = tokio::spawn(dispatch.run());
        *self.dispatch_task.lock().unwrap_or_else(|e| e.into_inner()) = Some(handle);
    }

    /// Stop the dispatch loop and drain the worker pool.
    ///
    /// The loop observes the stop flag at its next poll timeout. Queued
    /// broadcasts that were not dispatched are discarded.
    pub async fn shutdown(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        info!(queue_len = self.queue.len(), "Shutting down message hub");

        self.running.store(false, Ordering::SeqCst);
        let task = self
            .dispatch_task
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        if let Some(task) = task {
            let wait = self.config.poll_timeout() + self.config.shutdown_grace();
            if tokio::time::timeout(wait, task).await.is_err() {
                warn!("Dispatch loop did not stop in time");
            }
        }

        self.workers.shutdown(self.config.shutdown_grace()).await;
        let discarded = self.queue.clear();
        info!(discarded, "Message hub shut down");
    }

    // ── Transport lifecycle hooks ───────────────────────────────────

    /// A connection opened; register it as anonymous.
    pub fn on_connection_opened(&self, handle: &Arc<ConnectionHandle>) {
        self.registry.register(handle);
        HubMetrics::inc(&self.metrics.connections_opened);
        info!(
            conn_id = %handle.id(),
            origin = %handle.origin_address(),
            active_connections = self.registry.len(),
            "Connection registered"
        );
    }

    /// A connection closed; forget it.
    pub fn on_connection_closed(&self, handle: &ConnectionHandle) {
        if self.registry.unregister(handle.id()) {
            HubMetrics::inc(&self.metrics.connections_closed);
            info!(
                conn_id = %handle.id(),
                active_connections = self.registry.len(),
                "Connection unregistered"
            );
        }
    }

    /// A connection sent a frame.
    ///
    /// Authentication messages are consumed by the linker. Anything else is
    /// stamped with its origin and handed to every listener.
    pub async fn on_inbound_message(&self, handle: &Arc<ConnectionHandle>, raw: &str) {
        HubMetrics::inc(&self.metrics.inbound_messages);

        if !self.registry.contains(handle.id()) {
            warn!(conn_id = %handle.id(), "Message from unknown connection");
            return;
        }
        if let Err(e) = validator::validate_inbound(raw, self.config.max_message_size) {
            warn!(conn_id = %handle.id(), error = %e, "Rejected inbound message");
            return;
        }
        let mut message = match serializer::decode(raw) {
            Ok(message) => message,
            Err(e) => {
                warn!(conn_id = %handle.id(), error = %e, "Failed to decode inbound message");
                return;
            }
        };

        if message.kind == MessageType::Authentication {
            let token = message.bearer_token().unwrap_or_default();
            self.linker.link(handle, token).await;
            return;
        }

        let identity = handle.identity();
        message.session_id = Some(handle.id().to_string());
        message.principal = identity.as_ref().map(|i| i.principal.name.clone());
        let notified = self.listeners.notify(handle, identity, &message);
        debug!(
            conn_id = %handle.id(),
            kind = ?message.kind,
            topic = ?message.topic,
            listeners = notified,
            "Inbound message dispatched to listeners"
        );
    }

    /// Process a bearer token for `handle` directly.
    pub async fn authenticate(&self, handle: &ConnectionHandle, token: &str) -> LinkOutcome {
        self.linker.link(handle, token).await
    }

    // ── Send entry points ───────────────────────────────────────────

    /// Broadcast to every live connection via the delivery queue.
    ///
    /// Waits at most the configured enqueue timeout; a message that cannot
    /// be queued in time is dropped and logged.
    pub async fn send(&self, message: HubMessage) {
        if !self.accepts(&message) {
            return;
        }
        if !self.queue.enqueue(message).await {
            warn!(
                queue_len = self.queue.len(),
                queue_capacity = self.queue.capacity(),
                active_connections = self.registry.len(),
                "Delivery queue full, dropping message"
            );
        }
    }

    /// Send to every connection linked to `identity_name`, optionally only
    /// those originating from the same host as `origin_address`.
    ///
    /// The target set is computed now and handed straight to the workers.
    pub fn send_to_user(
        &self,
        identity_name: &str,
        origin_address: Option<&str>,
        message: HubMessage,
    ) {
        if !self.accepts(&message) {
            return;
        }
        let targets = self.resolver.by_identity(identity_name, origin_address);
        self.dispatch_now(targets, message);
    }

    /// Send to every connection holding `role`; `None` broadcasts.
    ///
    /// The reserved anonymous role matches connections with no role set.
    pub fn send_to_users(&self, role: Option<&str>, message: HubMessage) {
        if !self.accepts(&message) {
            return;
        }
        let targets = self.resolver.by_role(role);
        self.dispatch_now(targets, message);
    }

    fn accepts(&self, message: &HubMessage) -> bool {
        if self.closed.load(Ordering::SeqCst) {
            debug!(topic = ?message.topic, "Message hub is shut down, dropping message");
            return false;
        }
        if !message.kind.is_deliverable() {
            warn!("Authentication messages are never fanned out, dropping");
            return false;
        }
        true
    }

    fn dispatch_now(&self, targets: Vec<Arc<ConnectionHandle>>, message: HubMessage) {
        if targets.is_empty() {
            return;
        }
        self.workers.submit(WorkItem { targets, message });
    }

    // ── Listeners ───────────────────────────────────────────────────

    /// Register an inbound listener.
    pub fn add_listener(&self, listener: Arc<dyn HubListener>) -> ListenerId {
        self.listeners.add(listener)
    }

    /// Unregister an inbound listener.
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        self.listeners.remove(id)
    }

    // ── Introspection ───────────────────────────────────────────────

    /// Number of registered connections.
    pub fn connection_count(&self) -> usize {
        self.registry.len()
    }

    /// Connection ids linked to `identity_name`.
    pub fn identity_connections(&self, identity_name: &str) -> Vec<ConnectionId> {
        self.registry.identities().connections_for(identity_name)
    }

    /// Snapshot of every live connection.
    pub fn connections(&self) -> Vec<ConnectionInfo> {
        self.registry
            .snapshot_live()
            .iter()
            .map(|handle| handle.info())
            .collect()
    }

    /// Identity name `conn_id` is filed under.
    pub fn identity_of(&self, conn_id: &str) -> Option<String> {
        self.registry.identities().identity_of(conn_id)
    }

    /// Number of queued broadcasts.
    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    /// Whether the dispatch loop is running.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Metrics snapshot.
    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot(self.registry.len() as u64)
    }

    /// The connection registry.
    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }
}
