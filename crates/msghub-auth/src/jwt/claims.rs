//! JWT claims structure carried by hub bearer tokens.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use msghub_core::types::IdentityClaim;

/// JWT claims payload embedded in every bearer token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (the principal name).
    pub sub: String,
    /// Roles granted at issuance.
    #[serde(default)]
    pub roles: Vec<String>,
    /// Issued-at timestamp (seconds since epoch).
    pub iat: i64,
    /// Expiration timestamp (seconds since epoch).
    pub exp: i64,
    /// JWT ID.
    pub jti: Uuid,
    /// Issuer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
}

impl Claims {
    /// Converts into the format-independent claim consumed by the hub.
    pub fn into_identity_claim(self) -> IdentityClaim {
        IdentityClaim {
            subject: self.sub,
            roles: self.roles.into_iter().collect(),
            issued_at: self.iat,
            expires_at: self.exp,
            token_id: Some(self.jti.to_string()),
        }
    }
}
