//! Authenticated identity types.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Identity-index key under which unauthenticated connections are filed.
///
/// Reserved: the authentication linker rejects any principal resolved to
/// this name, so only unauthenticated connections are filed under it.
pub const ANONYMOUS_IDENTITY: &str = "$anonymous";

/// Reserved role satisfied by connections that carry no role set.
pub const ANONYMOUS_ROLE: &str = "ANONYMOUS";

/// Decoded bearer-token claim, independent of the token format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityClaim {
    /// Subject the token was issued to.
    pub subject: String,
    /// Roles asserted by the token itself.
    #[serde(default)]
    pub roles: BTreeSet<String>,
    /// Issued-at timestamp (seconds since epoch).
    pub issued_at: i64,
    /// Expiration timestamp (seconds since epoch).
    pub expires_at: i64,
    /// Token identifier, when the issuer provides one.
    #[serde(default)]
    pub token_id: Option<String>,
}

impl IdentityClaim {
    /// Checks whether the claim has expired at `now` (seconds since epoch).
    pub fn is_expired_at(&self, now: i64) -> bool {
        now >= self.expires_at
    }
}

/// A resolved principal: the name connections are indexed under plus the
/// roles it has been granted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    /// Principal name.
    pub name: String,
    /// Granted roles.
    #[serde(default)]
    pub roles: BTreeSet<String>,
}

impl Principal {
    /// Creates a principal from a name and any iterable of role names.
    pub fn new<I, S>(name: impl Into<String>, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            roles: roles.into_iter().map(Into::into).collect(),
        }
    }

    /// Returns `true` if the principal holds `role`.
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.contains(role)
    }
}
