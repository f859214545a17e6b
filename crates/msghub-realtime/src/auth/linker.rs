//! Authentication linker: binds a connection to the identity carried by
//! an in-band bearer token.

use std::sync::Arc;

use tracing::{info, warn};

use msghub_core::error::{AppError, ErrorKind};
use msghub_core::result::AppResult;
use msghub_core::traits::{PrincipalResolver, TokenDecoder};
use msghub_core::types::ANONYMOUS_IDENTITY;

use crate::connection::handle::{ConnectionHandle, SessionAttributes, SessionIdentity};
use crate::connection::registry::ConnectionRegistry;
use crate::metrics::HubMetrics;

/// Result of processing one authentication message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkOutcome {
    /// The connection is now linked to this identity name.
    Linked(String),
    /// The token was rejected; the connection is anonymous.
    Anonymous,
    /// The connection was unregistered before the link could be applied.
    Detached,
}

/// Per-connection state machine: anonymous ⇄ linked(identity, roles).
pub struct AuthenticationLinker {
    /// Registry holding the identity index.
    registry: Arc<ConnectionRegistry>,
    /// Token → claim.
    decoder: Arc<dyn TokenDecoder>,
    /// Claim → principal.
    principals: Arc<dyn PrincipalResolver>,
    /// Metrics.
    metrics: Arc<HubMetrics>,
}

impl std::fmt::Debug for AuthenticationLinker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthenticationLinker").finish()
    }
}

impl AuthenticationLinker {
    /// Creates a linker over the given collaborators.
    pub fn new(
        registry: Arc<ConnectionRegistry>,
        decoder: Arc<dyn TokenDecoder>,
        principals: Arc<dyn PrincipalResolver>,
        metrics: Arc<HubMetrics>,
    ) -> Self {
        Self {
            registry,
            decoder,
            principals,
            metrics,
        }
    }

    /// Process a bearer token received on `handle`.
    ///
    /// A linked connection first leaves its identity, so nothing addressed
    /// to the old name reaches it while the token is decoded. On success
    /// the connection is filed under the principal's name with its roles;
    /// on any failure it stays anonymous. Each move is a single step under
    /// the identity-index lock, so the connection is never visible under
    /// two names.
    pub async fn link(&self, handle: &ConnectionHandle, token: &str) -> LinkOutcome {
        let previous = handle.identity_name();
        if previous.is_some()
            && !self.registry.link_identity(
                handle,
                ANONYMOUS_IDENTITY,
                SessionAttributes::anonymous(),
            )
        {
            return LinkOutcome::Detached;
        }

        match self.authenticate(token).await {
            Ok(identity) => {
                let name = identity.principal.name.clone();
                let roles = identity.principal.roles.len();
                if !self
                    .registry
                    .link_identity(handle, &name, SessionAttributes::linked(identity))
                {
                    warn!(conn_id = %handle.id(), identity = %name, "Connection closed before identity link");
                    return LinkOutcome::Detached;
                }
                HubMetrics::inc(&self.metrics.authentications_ok);
                info!(
                    conn_id = %handle.id(),
                    identity = %name,
                    previous = ?previous,
                    roles,
                    "Connection linked to identity"
                );
                LinkOutcome::Linked(name)
            }
            Err(e) => {
                HubMetrics::inc(&self.metrics.authentications_failed);
                let linked = self.registry.link_identity(
                    handle,
                    ANONYMOUS_IDENTITY,
                    SessionAttributes::anonymous(),
                );
                match e.kind {
                    ErrorKind::Authentication | ErrorKind::UnknownPrincipal => info!(
                        conn_id = %handle.id(),
                        previous = ?previous,
                        reason = %e.message,
                        "Authentication rejected, connection is anonymous"
                    ),
                    _ => warn!(
                        conn_id = %handle.id(),
                        previous = ?previous,
                        error = %e,
                        "Authentication failed, connection is anonymous"
                    ),
                }
                if linked {
                    LinkOutcome::Anonymous
                } else {
                    LinkOutcome::Detached
                }
            }
        }
    }

    /// Token → claim → principal.
    async fn authenticate(&self, token: &str) -> AppResult<Arc<SessionIdentity>> {
        let claim = self
            .decoder
            .decode(token)
            .await?
            .ok_or_else(|| AppError::authentication("Token carries no identity"))?;

        if self.decoder.is_expired(&claim) {
            return Err(AppError::authentication("Token has expired"));
        }

        let principal = self.principals.resolve(&claim).await?.ok_or_else(|| {
            AppError::unknown_principal(format!("No principal for subject '{}'", claim.subject))
        })?;

        if principal.name.trim().is_empty() || principal.name == ANONYMOUS_IDENTITY {
            return Err(AppError::authentication(format!(
                "Principal name '{}' is reserved",
                principal.name
            )));
        }

        Ok(Arc::new(SessionIdentity { claim, principal }))
    }
}
