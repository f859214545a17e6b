//! Individual connection handle and its identity attributes.

use std::collections::BTreeSet;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use msghub_core::types::{ANONYMOUS_ROLE, IdentityClaim, Principal};

use super::transport::{Transport, TransportError};

/// Unique connection identifier, assigned by the transport layer.
pub type ConnectionId = String;

/// Identity linked to a connection by a successful authentication.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionIdentity {
    /// The decoded token claim.
    pub claim: IdentityClaim,
    /// The principal resolved from the claim.
    pub principal: Principal,
}

/// Attribute bag attached to a connection.
///
/// Written only by the registry (reset to anonymous) and the authentication
/// linker; read by targeting.
#[derive(Debug, Clone, Default)]
pub struct SessionAttributes {
    /// Linked identity, or `None` while anonymous.
    pub identity: Option<Arc<SessionIdentity>>,
    /// Principal name, or `None` while anonymous.
    pub identity_name: Option<String>,
    /// Granted roles, or `None` while anonymous.
    pub roles: Option<BTreeSet<String>>,
}

impl SessionAttributes {
    /// Attributes of a connection with no linked identity.
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// Attributes of a connection linked to `identity`.
    pub fn linked(identity: Arc<SessionIdentity>) -> Self {
        Self {
            identity_name: Some(identity.principal.name.clone()),
            roles: Some(identity.principal.roles.clone()),
            identity: Some(identity),
        }
    }

    /// Whether no identity is linked.
    pub fn is_anonymous(&self) -> bool {
        self.identity.is_none()
    }

    /// Role check used by role-targeted sends.
    ///
    /// A connection without a role set satisfies only the reserved
    /// anonymous role. A linked principal with an empty role set satisfies
    /// nothing.
    pub fn satisfies_role(&self, role: &str) -> bool {
        match &self.roles {
            Some(roles) => roles.contains(role),
            None => role == ANONYMOUS_ROLE,
        }
    }
}

/// Result of one delivery attempt.
#[derive(Debug)]
pub enum DeliveryOutcome {
    /// The frame was handed to the transport.
    Delivered,
    /// The connection was closed; nothing was sent.
    SkippedClosed,
    /// The transport rejected the frame.
    Failed(TransportError),
}

/// A handle to a single connection.
///
/// The transport layer owns the `Arc<ConnectionHandle>`; the hub keeps only
/// a `Weak` so a connection that disappears without notice does not leak.
pub struct ConnectionHandle {
    /// Connection ID (cached from the transport).
    id: ConnectionId,
    /// Origin address (cached from the transport).
    origin_address: String,
    /// Delivery primitive.
    transport: Box<dyn Transport>,
    /// Identity attributes.
    attributes: RwLock<SessionAttributes>,
    /// Serializes sends to this one connection.
    send_lock: tokio::sync::Mutex<()>,
    /// When the handle was created.
    connected_at: DateTime<Utc>,
}

impl std::fmt::Debug for ConnectionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionHandle")
            .field("id", &self.id)
            .field("origin_address", &self.origin_address)
            .field("connected_at", &self.connected_at)
            .finish()
    }
}

impl ConnectionHandle {
    /// Wraps a transport in a new handle.
    pub fn new(transport: impl Transport) -> Arc<Self> {
        Arc::new(Self {
            id: transport.id().to_string(),
            origin_address: transport.origin_address().to_string(),
            transport: Box::new(transport),
            attributes: RwLock::new(SessionAttributes::anonymous()),
            send_lock: tokio::sync::Mutex::new(()),
            connected_at: Utc::now(),
        })
    }

    /// Connection ID.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Address the connection originated from.
    pub fn origin_address(&self) -> &str {
        &self.origin_address
    }

    /// Whether the underlying connection is still open.
    pub fn is_open(&self) -> bool {
        self.transport.is_open()
    }

    /// When the handle was created.
    pub fn connected_at(&self) -> DateTime<Utc> {
        self.connected_at
    }

    /// Snapshot of the attribute bag.
    pub fn attributes(&self) -> SessionAttributes {
        self.attributes
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Linked identity, if any.
    pub fn identity(&self) -> Option<Arc<SessionIdentity>> {
        self.attributes
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .identity
            .clone()
    }

    /// Linked principal name, if any.
    pub fn identity_name(&self) -> Option<String> {
        self.attributes
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .identity_name
            .clone()
    }

    /// Role check against the current attributes.
    pub fn satisfies_role(&self, role: &str) -> bool {
        self.attributes
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .satisfies_role(role)
    }

    /// Replace the attribute bag.
    pub(crate) fn set_attributes(&self, attributes: SessionAttributes) {
        *self.attributes.write().unwrap_or_else(|e| e.into_inner()) = attributes;
    }

    /// Deliver one pre-serialized frame.
    ///
    /// Holds this connection's send lock across the open check and the
    /// write, so concurrent work items never interleave on one connection.
    pub async fn deliver(&self, text: &str) -> DeliveryOutcome {
        let _guard = self.send_lock.lock().await;
        if !self.transport.is_open() {
            return DeliveryOutcome::SkippedClosed;
        }
        match self.transport.send_text(text).await {
            Ok(()) => DeliveryOutcome::Delivered,
            Err(TransportError::Closed) => DeliveryOutcome::SkippedClosed,
            Err(e) => DeliveryOutcome::Failed(e),
        }
    }

    /// Serializable snapshot of this connection.
    pub fn info(&self) -> ConnectionInfo {
        let attributes = self.attributes();
        ConnectionInfo {
            id: self.id.clone(),
            origin_address: self.origin_address.clone(),
            identity_name: attributes.identity_name,
            roles: attributes.roles.map(|r| r.into_iter().collect()),
            connected_at: self.connected_at,
            open: self.is_open(),
        }
    }
}

/// Snapshot of connection info (serializable).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionInfo {
    /// Connection ID
    pub id: ConnectionId,
    /// Origin address
    pub origin_address: String,
    /// Linked principal name
    pub identity_name: Option<String>,
    /// Granted roles
    pub roles: Option<Vec<String>>,
    /// Connected at
    pub connected_at: DateTime<Utc>,
    /// Is open
    pub open: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::transport::ChannelTransport;

    fn identity(name: &str, roles: &[&str]) -> Arc<SessionIdentity> {
        Arc::new(SessionIdentity {
            claim: IdentityClaim {
                subject: name.to_string(),
                roles: BTreeSet::new(),
                issued_at: 0,
                expires_at: i64::MAX,
                token_id: None,
            },
            principal: Principal::new(name, roles.iter().copied()),
        })
    }

    #[test]
    fn test_anonymous_satisfies_only_anonymous_role() {
        let attrs = SessionAttributes::anonymous();
        assert!(attrs.satisfies_role(ANONYMOUS_ROLE));
        assert!(!attrs.satisfies_role("ADMIN"));
    }

    #[test]
    fn test_linked_roles() {
        let attrs = SessionAttributes::linked(identity("alice", &["ADMIN"]));
        assert_eq!(attrs.identity_name.as_deref(), Some("alice"));
        assert!(attrs.satisfies_role("ADMIN"));
        assert!(!attrs.satisfies_role(ANONYMOUS_ROLE));
    }

    #[test]
    fn test_linked_without_roles_is_not_anonymous() {
        let attrs = SessionAttributes::linked(identity("bob", &[]));
        assert!(!attrs.is_anonymous());
        assert!(!attrs.satisfies_role(ANONYMOUS_ROLE));
    }

    #[tokio::test]
    async fn test_deliver_skips_closed_connection() {
        let (transport, rx) = ChannelTransport::new("c1", "10.0.0.1", 4);
        let handle = ConnectionHandle::new(transport);
        drop(rx);
        assert!(matches!(
            handle.deliver("x").await,
            DeliveryOutcome::SkippedClosed
        ));
    }

    #[tokio::test]
    async fn test_info_reflects_attributes() {
        let (transport, _rx) = ChannelTransport::new("c1", "10.0.0.1", 4);
        let handle = ConnectionHandle::new(transport);
        handle.set_attributes(SessionAttributes::linked(identity("alice", &["USER"])));

        let info = handle.info();
        assert_eq!(info.id, "c1");
        assert_eq!(info.identity_name.as_deref(), Some("alice"));
        assert_eq!(info.roles, Some(vec!["USER".to_string()]));
        assert!(info.open);
    }
}
