//! In-memory principal directory.

use std::collections::BTreeSet;

use async_trait::async_trait;
use dashmap::DashMap;
use tracing::debug;

use msghub_core::result::AppResult;
use msghub_core::traits::PrincipalResolver;
use msghub_core::types::{IdentityClaim, Principal};

/// Principal directory keyed by subject.
///
/// Roles come from the directory, not the token; subjects that are not
/// registered resolve to no principal.
#[derive(Debug, Default)]
pub struct InMemoryPrincipalDirectory {
    /// Subject → granted roles.
    principals: DashMap<String, BTreeSet<String>>,
}

impl InMemoryPrincipalDirectory {
    /// Creates an empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers or replaces a principal.
    pub fn upsert(&self, principal: Principal) {
        self.principals.insert(principal.name, principal.roles);
    }

    /// Removes a principal. Returns `true` if it was present.
    pub fn remove(&self, name: &str) -> bool {
        self.principals.remove(name).is_some()
    }

    /// Number of registered principals.
    pub fn len(&self) -> usize {
        self.principals.len()
    }

    /// Returns `true` if no principal is registered.
    pub fn is_empty(&self) -> bool {
        self.principals.is_empty()
    }
}

#[async_trait]
impl PrincipalResolver for InMemoryPrincipalDirectory {
    async fn resolve(&self, claim: &IdentityClaim) -> AppResult<Option<Principal>> {
        let principal = self.principals.get(&claim.subject).map(|entry| Principal {
            name: entry.key().clone(),
            roles: entry.value().clone(),
        });
        if principal.is_none() {
            debug!(subject = %claim.subject, "No principal registered for subject");
        }
        Ok(principal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claim(subject: &str) -> IdentityClaim {
        IdentityClaim {
            subject: subject.to_string(),
            roles: ["TOKEN_ROLE".to_string()].into_iter().collect(),
            issued_at: 0,
            expires_at: i64::MAX,
            token_id: None,
        }
    }

    #[tokio::test]
    async fn test_directory_roles_override_token_roles() {
        let directory = InMemoryPrincipalDirectory::new();
        directory.upsert(Principal::new("alice", ["ADMIN"]));

        let principal = directory
            .resolve(&claim("alice"))
            .await
            .expect("resolve")
            .expect("principal");
        assert!(principal.has_role("ADMIN"));
        assert!(!principal.has_role("TOKEN_ROLE"));
    }

    #[tokio::test]
    async fn test_unknown_subject_resolves_to_none() {
        let directory = InMemoryPrincipalDirectory::new();
        assert!(directory.resolve(&claim("mallory")).await.expect("resolve").is_none());
    }

    #[tokio::test]
    async fn test_remove() {
        let directory = InMemoryPrincipalDirectory::new();
        directory.upsert(Principal::new("alice", ["USER"]));
        assert!(directory.remove("alice"));
        assert!(directory.is_empty());
    }
}
