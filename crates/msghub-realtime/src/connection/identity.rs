//! Identity index: principal name → connection ids.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use super::handle::ConnectionId;

/// Multi-map from identity name to the connections linked to it.
///
/// A connection id appears under at most one name. Every read-modify-write
/// sequence runs under the single index-wide lock; names whose set becomes
/// empty are dropped.
#[derive(Debug, Default)]
pub struct IdentityIndex {
    /// Identity name → connection ids.
    entries: Mutex<HashMap<String, HashSet<ConnectionId>>>,
}

impl IdentityIndex {
    /// Creates an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, HashSet<ConnectionId>>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Atomically move `conn_id` under `name`.
    ///
    /// The id is first removed from whichever name currently holds it. The
    /// `commit` closure then runs while the lock is still held; the id is
    /// inserted under `name` only if it returns `true`. Returns the
    /// closure's result.
    pub fn relink<F>(&self, conn_id: &str, name: &str, commit: F) -> bool
    where
        F: FnOnce() -> bool,
    {
        let mut entries = self.lock();
        Self::remove_locked(&mut entries, conn_id);
        if !commit() {
            return false;
        }
        entries
            .entry(name.to_string())
            .or_default()
            .insert(conn_id.to_string());
        true
    }

    /// Remove `conn_id` from whichever name holds it.
    ///
    /// Scans every entry. Returns the name it was filed under.
    pub fn remove(&self, conn_id: &str) -> Option<String> {
        let mut entries = self.lock();
        Self::remove_locked(&mut entries, conn_id)
    }

    fn remove_locked(
        entries: &mut HashMap<String, HashSet<ConnectionId>>,
        conn_id: &str,
    ) -> Option<String> {
        let name = entries
            .iter()
            .find(|(_, ids)| ids.contains(conn_id))
            .map(|(name, _)| name.clone())?;
        if let Some(ids) = entries.get_mut(&name) {
            ids.remove(conn_id);
            if ids.is_empty() {
                entries.remove(&name);
            }
        }
        Some(name)
    }

    /// Connection ids filed under `name`.
    pub fn connections_for(&self, name: &str) -> Vec<ConnectionId> {
        self.lock()
            .get(name)
            .map(|ids| ids.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Name `conn_id` is filed under, if any.
    pub fn identity_of(&self, conn_id: &str) -> Option<String> {
        self.lock()
            .iter()
            .find(|(_, ids)| ids.contains(conn_id))
            .map(|(name, _)| name.clone())
    }

    /// Number of distinct identity names with at least one connection.
    pub fn identity_count(&self) -> usize {
        self.lock().len()
    }

    /// Total number of indexed connection ids.
    pub fn connection_count(&self) -> usize {
        self.lock().values().map(HashSet::len).sum()
    }
}
