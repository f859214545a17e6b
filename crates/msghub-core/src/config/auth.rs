//! Authentication configuration.

use serde::{Deserialize, Serialize};

use crate::types::identity::Principal;

/// Bearer token validation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Secret key for JWT verification (HMAC-SHA256).
    #[serde(default = "default_jwt_secret")]
    pub jwt_secret: String,
    /// Clock skew tolerance in seconds.
    #[serde(default = "default_leeway")]
    pub leeway_seconds: u64,
    /// Expected `iss` claim, if any.
    #[serde(default)]
    pub issuer: Option<String>,
    /// Token TTL in minutes for tokens issued by the encoder.
    #[serde(default = "default_access_ttl")]
    pub token_ttl_minutes: u64,
    /// Static principal directory. When empty, roles are taken from the token.
    #[serde(default)]
    pub principals: Vec<Principal>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: default_jwt_secret(),
            leeway_seconds: default_leeway(),
            issuer: None,
            token_ttl_minutes: default_access_ttl(),
            principals: Vec::new(),
        }
    }
}

fn default_jwt_secret() -> String {
    "CHANGE_ME_IN_PRODUCTION".to_string()
}

fn default_leeway() -> u64 {
    5
}

fn default_access_ttl() -> u64 {
    15
}
