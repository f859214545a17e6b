//! JWT bearer-token validation.

use async_trait::async_trait;
use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};

use msghub_core::config::AuthConfig;
use msghub_core::error::AppError;
use msghub_core::result::AppResult;
use msghub_core::traits::TokenDecoder;
use msghub_core::types::IdentityClaim;

use super::claims::Claims;

/// Validates HS256-signed JWT bearer tokens.
#[derive(Clone)]
pub struct JwtDecoder {
    /// HMAC secret key for verification.
    decoding_key: DecodingKey,
    /// Validation configuration.
    validation: Validation,
    /// Clock skew tolerance applied to [`TokenDecoder::is_expired`].
    leeway_seconds: i64,
}

impl std::fmt::Debug for JwtDecoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtDecoder")
            .field("validation", &self.validation)
            .finish()
    }
}

impl JwtDecoder {
    /// Creates a new decoder from auth configuration.
    pub fn new(config: &AuthConfig) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.leeway = config.leeway_seconds;
        if let Some(issuer) = &config.issuer {
            validation.set_issuer(&[issuer]);
        }

        Self {
            decoding_key: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            validation,
            leeway_seconds: config.leeway_seconds as i64,
        }
    }

    /// Decodes and validates a token string into raw JWT claims.
    pub fn decode_claims(&self, token: &str) -> AppResult<Claims> {
        let token_data =
            decode::<Claims>(token, &self.decoding_key, &self.validation).map_err(|e| {
                match e.kind() {
                    jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                        AppError::authentication("Token has expired")
                    }
                    jsonwebtoken::errors::ErrorKind::InvalidToken => {
                        AppError::authentication("Invalid token format")
                    }
                    jsonwebtoken::errors::ErrorKind::InvalidSignature => {
                        AppError::authentication("Invalid token signature")
                    }
                    jsonwebtoken::errors::ErrorKind::InvalidIssuer => {
                        AppError::authentication("Invalid token issuer")
                    }
                    _ => AppError::authentication(format!("Token validation failed: {e}")),
                }
            })?;

        Ok(token_data.claims)
    }
}

#[async_trait]
impl TokenDecoder for JwtDecoder {
    async fn decode(&self, token: &str) -> AppResult<Option<IdentityClaim>> {
        let token = token.trim();
        if token.is_empty() {
            return Ok(None);
        }
        let token = token.strip_prefix("Bearer ").unwrap_or(token);

        let claims = self.decode_claims(token)?;
        if claims.sub.is_empty() {
            return Ok(None);
        }
        Ok(Some(claims.into_identity_claim()))
    }

    fn is_expired(&self, claim: &IdentityClaim) -> bool {
        claim.is_expired_at(Utc::now().timestamp() - self.leeway_seconds)
    }
}
