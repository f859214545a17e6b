//! Authentication collaborators consumed by the hub's authentication linker.

use async_trait::async_trait;

use crate::result::AppResult;
use crate::types::identity::{IdentityClaim, Principal};

/// Decodes an inbound bearer token into an identity claim.
///
/// `Ok(None)` means the token was well-formed but carries no identity;
/// `Err` covers invalid signatures, malformed tokens, and similar failures.
#[async_trait]
pub trait TokenDecoder: Send + Sync + 'static {
    /// Decode `token` into a claim.
    async fn decode(&self, token: &str) -> AppResult<Option<IdentityClaim>>;

    /// Check whether a previously decoded claim has expired.
    fn is_expired(&self, claim: &IdentityClaim) -> bool;
}

/// Looks up the principal (name plus granted roles) behind a claim.
#[async_trait]
pub trait PrincipalResolver: Send + Sync + 'static {
    /// Resolve `claim` to a principal, or `Ok(None)` if none exists.
    async fn resolve(&self, claim: &IdentityClaim) -> AppResult<Option<Principal>>;
}
