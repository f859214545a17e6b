//! Targeting resolver: computes the connections a send should reach.

use std::sync::Arc;

use tracing::{debug, info};

use crate::connection::handle::ConnectionHandle;
use crate::connection::registry::ConnectionRegistry;

use super::host::LocalHost;

/// Resolves recipient selectors against registry state at call time.
#[derive(Debug, Clone)]
pub struct TargetResolver {
    /// Live connections and identity index.
    registry: Arc<ConnectionRegistry>,
    /// This host's addresses, for origin filtering.
    local_host: LocalHost,
}

impl TargetResolver {
    /// Creates a resolver.
    pub fn new(registry: Arc<ConnectionRegistry>, local_host: LocalHost) -> Self {
        Self {
            registry,
            local_host,
        }
    }

    /// Every live connection.
    pub fn broadcast(&self) -> Vec<Arc<ConnectionHandle>> {
        self.registry.snapshot_live()
    }

    /// Connections linked to `identity_name`, optionally narrowed to those
    /// whose origin is the same host as `origin_address`.
    pub fn by_identity(
        &self,
        identity_name: &str,
        origin_address: Option<&str>,
    ) -> Vec<Arc<ConnectionHandle>> {
        let candidates = self.registry.connections_for_identity(identity_name);
        if candidates.is_empty() {
            info!(identity = %identity_name, "No connections linked to identity");
            return candidates;
        }

        let Some(origin) = origin_address else {
            return candidates;
        };

        let targets: Vec<_> = candidates
            .into_iter()
            .filter(|conn| self.local_host.is_same_host(conn.origin_address(), origin))
            .collect();
        if targets.is_empty() {
            debug!(
                identity = %identity_name,
                origin = %origin,
                "No connections for identity from origin"
            );
        }
        targets
    }

    /// Connections whose roles include `role`.
    ///
    /// Connections without a role set satisfy only the reserved anonymous
    /// role. `None` or a blank role means broadcast.
    pub fn by_role(&self, role: Option<&str>) -> Vec<Arc<ConnectionHandle>> {
        let Some(role) = role.map(str::trim).filter(|r| !r.is_empty()) else {
            return self.broadcast();
        };

        let targets: Vec<_> = self
            .registry
            .snapshot_live()
            .into_iter()
            .filter(|conn| conn.satisfies_role(role))
            .collect();
        if targets.is_empty() {
            debug!(role = %role, "No connections hold role");
        }
        targets
    }
}
