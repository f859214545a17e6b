//! Message hub queue, dispatch, and worker configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Upper bound applied when the worker count is derived from the CPU count.
const DERIVED_WORKER_CAP: usize = 32;

/// Message hub configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HubConfig {
    /// Maximum number of broadcasts waiting in the delivery queue.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
    /// How long `send` waits for queue space before dropping, in milliseconds.
    #[serde(default = "default_enqueue_timeout")]
    pub enqueue_timeout_ms: u64,
    /// Dispatch loop poll timeout in milliseconds (bounds stop-flag latency).
    #[serde(default = "default_poll_timeout")]
    pub poll_timeout_ms: u64,
    /// Concurrent delivery workers (0 = derive from available parallelism).
    #[serde(default)]
    pub max_workers: usize,
    /// Work items allowed to wait for a free worker before new ones are discarded.
    #[serde(default = "default_worker_backlog")]
    pub worker_backlog: usize,
    /// How long shutdown waits for in-flight deliveries, in milliseconds.
    #[serde(default = "default_shutdown_grace")]
    pub shutdown_grace_ms: u64,
    /// Maximum accepted inbound payload size in bytes.
    #[serde(default = "default_max_message_size")]
    pub max_message_size: usize,
    /// Additional addresses treated as belonging to this host.
    #[serde(default)]
    pub local_addresses: Vec<String>,
    /// Whether to enumerate the host's interface addresses at startup.
    #[serde(default = "default_true")]
    pub discover_local_addresses: bool,
}

impl HubConfig {
    /// Enqueue timeout as a [`Duration`].
    pub fn enqueue_timeout(&self) -> Duration {
        Duration::from_millis(self.enqueue_timeout_ms)
    }

    /// Poll timeout as a [`Duration`].
    pub fn poll_timeout(&self) -> Duration {
        Duration::from_millis(self.poll_timeout_ms)
    }

    /// Shutdown grace period as a [`Duration`].
    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.shutdown_grace_ms)
    }

    /// Effective worker count.
    ///
    /// An explicit `max_workers` wins; otherwise twice the available
    /// parallelism, capped.
    pub fn worker_count(&self) -> usize {
        if self.max_workers > 0 {
            return self.max_workers;
        }
        let cpus = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        (cpus * 2).clamp(1, DERIVED_WORKER_CAP)
    }
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            queue_capacity: default_queue_capacity(),
            enqueue_timeout_ms: default_enqueue_timeout(),
            poll_timeout_ms: default_poll_timeout(),
            max_workers: 0,
            worker_backlog: default_worker_backlog(),
            shutdown_grace_ms: default_shutdown_grace(),
            max_message_size: default_max_message_size(),
            local_addresses: Vec::new(),
            discover_local_addresses: true,
        }
    }
}

fn default_queue_capacity() -> usize {
    500
}

fn default_enqueue_timeout() -> u64 {
    500
}

fn default_poll_timeout() -> u64 {
    1000
}

fn default_worker_backlog() -> usize {
    1000
}

fn default_shutdown_grace() -> u64 {
    5000
}

fn default_max_message_size() -> usize {
    65_536
}

fn default_true() -> bool {
    true
}
