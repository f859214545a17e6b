//! Inbound message listeners.

use std::panic::AssertUnwindSafe;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use tracing::{error, warn};
use uuid::Uuid;

use msghub_core::result::AppResult;

use crate::connection::handle::{ConnectionHandle, SessionIdentity};
use crate::message::types::HubMessage;

/// Receives non-authentication messages sent by connections.
///
/// The identity linked to the sending connection (if any) is passed
/// explicitly; there is no ambient security context.
#[async_trait]
pub trait HubListener: Send + Sync + 'static {
    /// Handle one inbound message.
    async fn on_message(
        &self,
        connection: Arc<ConnectionHandle>,
        identity: Option<Arc<SessionIdentity>>,
        message: HubMessage,
    ) -> AppResult<()>;
}

/// Handle returned by listener registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ListenerId(Uuid);

/// Registered listeners.
#[derive(Default)]
pub struct ListenerRegistry {
    /// Listeners in registration order.
    listeners: RwLock<Vec<(ListenerId, Arc<dyn HubListener>)>>,
}

impl std::fmt::Debug for ListenerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerRegistry")
            .field("count", &self.len())
            .finish()
    }
}

impl ListenerRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener.
    pub fn add(&self, listener: Arc<dyn HubListener>) -> ListenerId {
        let id = ListenerId(Uuid::new_v4());
        self.listeners
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .push((id, listener));
        id
    }

    /// Unregister a listener. Returns `true` if it was registered.
    pub fn remove(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.write().unwrap_or_else(|e| e.into_inner());
        let before = listeners.len();
        listeners.retain(|(existing, _)| *existing != id);
        listeners.len() < before
    }

    /// Number of registered listeners.
    pub fn len(&self) -> usize {
        self.listeners
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }

    /// Whether no listener is registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Invoke every listener on its own task.
    ///
    /// Errors and panics are logged per listener and never reach the
    /// caller. Returns how many listeners were scheduled.
    pub fn notify(
        &self,
        connection: &Arc<ConnectionHandle>,
        identity: Option<Arc<SessionIdentity>>,
        message: &HubMessage,
    ) -> usize {
        let listeners: Vec<_> = self
            .listeners
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone();

        for (id, listener) in &listeners {
            let id = *id;
            let listener = listener.clone();
            let connection = connection.clone();
            let identity = identity.clone();
            let message = message.clone();
            tokio::spawn(async move {
                let conn_id = connection.id().to_string();
                let result = AssertUnwindSafe(listener.on_message(connection, identity, message))
                    .catch_unwind()
                    .await;
                match result {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => {
                        warn!(listener = ?id, conn_id = %conn_id, error = %e, "Listener failed")
                    }
                    Err(_) => error!(listener = ?id, conn_id = %conn_id, "Listener panicked"),
                }
            });
        }
        listeners.len()
    }
}
