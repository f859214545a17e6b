//! Resolves principals directly from the roles asserted in the token.

use async_trait::async_trait;

use msghub_core::result::AppResult;
use msghub_core::traits::PrincipalResolver;
use msghub_core::types::{IdentityClaim, Principal};

/// Trusts the token: the subject becomes the principal name and the token's
/// roles become its granted roles.
#[derive(Debug, Clone, Default)]
pub struct ClaimsPrincipalResolver;

impl ClaimsPrincipalResolver {
    /// Creates a new resolver.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl PrincipalResolver for ClaimsPrincipalResolver {
    async fn resolve(&self, claim: &IdentityClaim) -> AppResult<Option<Principal>> {
        if claim.subject.trim().is_empty() {
            return Ok(None);
        }
        Ok(Some(Principal {
            name: claim.subject.clone(),
            roles: claim.roles.clone(),
        }))
    }
}
