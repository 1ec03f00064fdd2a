//! JWT token issuance.
//!
//! The gateway never issues tokens on the request path; this is used by
//! the operator CLI and by tests.

use chrono::{Duration, Utc};
use jsonwebtoken::{EncodingKey, Header, encode};

use relayhub_core::config::AuthConfig;
use relayhub_core::error::AppError;
use relayhub_core::result::AppResult;
use relayhub_core::types::Identity;

use super::claims::{AuthenticationData, Claims};

/// Creates signed HS256 connection tokens.
#[derive(Clone)]
pub struct JwtEncoder {
    encoding_key: EncodingKey,
    issuer: String,
    ttl: Duration,
}

impl std::fmt::Debug for JwtEncoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtEncoder")
            .field("issuer", &self.issuer)
            .field("ttl", &self.ttl)
            .finish()
    }
}

impl JwtEncoder {
    /// Creates an encoder signing with the configured secret and issuer.
    pub fn new(config: &AuthConfig, ttl: Duration) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(config.jwt_secret.as_bytes()),
            issuer: config.jwt_issuer.clone(),
            ttl,
        }
    }

    /// Issue a token carrying `identity`.
    pub fn issue(&self, identity: &Identity) -> AppResult<String> {
        let now = Utc::now();
        let claims = Claims {
            authentication_data: Some(AuthenticationData {
                id: identity.id(),
                username: identity.username().to_string(),
                hwid: identity.hardware_id().to_string(),
            }),
            iss: self.issuer.clone(),
            iat: Some(now.timestamp()),
            nbf: Some(now.timestamp()),
            exp: Some((now + self.ttl).timestamp()),
        };
        self.encode_claims(&claims)
    }

    /// Sign an arbitrary claims payload.
    pub fn encode_claims(&self, claims: &Claims) -> AppResult<String> {
        encode(&Header::default(), claims, &self.encoding_key)
            .map_err(|e| AppError::internal(format!("Failed to encode token: {e}")))
    }
}
