//! Connection registry of live connections held by non-owning handles.

use std::sync::{Arc, Weak};

use dashmap::DashMap;
use tracing::debug;

use msghub_core::types::ANONYMOUS_IDENTITY;

use super::handle::{ConnectionHandle, ConnectionId, SessionAttributes};
use super::identity::IdentityIndex;

/// Thread-safe registry of connections plus the identity index.
///
/// Only `Weak` references are stored; a handle that can no longer be
/// upgraded is treated as closed and pruned on the next lookup.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    /// Connection ID → weak handle.
    sessions: DashMap<ConnectionId, Weak<ConnectionHandle>>,
    /// Identity name → connection IDs.
    identities: IdentityIndex,
}

impl ConnectionRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an opened connection as anonymous.
    ///
    /// Re-registering an id replaces the previous handle.
    pub fn register(&self, handle: &Arc<ConnectionHandle>) {
        self.sessions
            .insert(handle.id().to_string(), Arc::downgrade(handle));
        self.link_identity(handle, ANONYMOUS_IDENTITY, SessionAttributes::anonymous());
    }

    /// Removes a connection and its identity-index entry.
    ///
    /// Returns `true` if the id was registered.
    pub fn unregister(&self, conn_id: &str) -> bool {
        let removed = self.sessions.remove(conn_id).is_some();
        self.identities.remove(conn_id);
        removed
    }

    /// Atomically re-file a connection under `name` with new attributes.
    ///
    /// Runs under the identity-index lock. A connection that has been
    /// unregistered in the meantime is not re-added; returns `false` then.
    pub fn link_identity(
        &self,
        handle: &ConnectionHandle,
        name: &str,
        attributes: SessionAttributes,
    ) -> bool {
        self.identities.relink(handle.id(), name, || {
            if !self.sessions.contains_key(handle.id()) {
                return false;
            }
            handle.set_attributes(attributes);
            true
        })
    }

    /// Gets a live connection by id, pruning it if it is gone.
    pub fn get(&self, conn_id: &str) -> Option<Arc<ConnectionHandle>> {
        let upgraded = self.sessions.get(conn_id).map(|entry| entry.value().upgrade());
        match upgraded {
            Some(Some(handle)) => Some(handle),
            Some(None) => {
                debug!(conn_id = %conn_id, "Pruning dropped connection");
                self.unregister(conn_id);
                None
            }
            None => None,
        }
    }

    /// Returns every connection whose handle is still resolvable.
    ///
    /// Dropped handles found during the scan are unregistered.
    pub fn snapshot_live(&self) -> Vec<Arc<ConnectionHandle>> {
        let mut live = Vec::with_capacity(self.sessions.len());
        let mut dead = Vec::new();
        for entry in self.sessions.iter() {
            match entry.value().upgrade() {
                Some(handle) => live.push(handle),
                None => dead.push(entry.key().clone()),
            }
        }
        for conn_id in &dead {
            debug!(conn_id = %conn_id, "Pruning dropped connection");
            self.unregister(conn_id);
        }
        live
    }

    /// Live connections linked to `name`.
    pub fn connections_for_identity(&self, name: &str) -> Vec<Arc<ConnectionHandle>> {
        self.identities
            .connections_for(name)
            .iter()
            .filter_map(|conn_id| self.get(conn_id))
            .collect()
    }

    /// Whether `conn_id` is registered.
    pub fn contains(&self, conn_id: &str) -> bool {
        self.sessions.contains_key(conn_id)
    }

    /// Number of registered connections (including not-yet-pruned ones).
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Whether no connection is registered.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// The identity index.
    pub fn identities(&self) -> &IdentityIndex {
        &self.identities
    }
}
