//! JWT token validation.

use async_trait::async_trait;
use jsonwebtoken::errors::ErrorKind as JwtErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};

use relayhub_core::config::AuthConfig;
use relayhub_core::error::AppError;
use relayhub_core::result::AppResult;
use relayhub_core::traits::TokenValidator;
use relayhub_core::types::Identity;

use super::claims::Claims;

/// Detail returned when a token verifies but carries no usable identity.
pub const MALFORMED_TOKEN_DATA: &str = "malformed token data";

/// Validates HS256 tokens against a shared secret and a required issuer.
#[derive(Clone)]
pub struct JwtValidator {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl std::fmt::Debug for JwtValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtValidator")
            .field("validation", &self.validation)
            .finish()
    }
}

impl JwtValidator {
    /// Creates a validator from auth configuration.
    pub fn new(config: &AuthConfig) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[config.jwt_issuer.as_str()]);
        validation.set_required_spec_claims(&["iss"]);
        validation.validate_exp = true;
        validation.validate_nbf = true;
        validation.leeway = config.leeway_seconds;

        Self {
            decoding_key: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            validation,
        }
    }

    /// Verify the signature and registered claims, returning the payload.
    pub fn decode_claims(&self, token: &str) -> AppResult<Claims> {
        let data = decode::<Claims>(token, &self.decoding_key, &self.validation).map_err(|e| {
            match e.kind() {
                JwtErrorKind::ExpiredSignature => AppError::authentication("Token has expired"),
                JwtErrorKind::ImmatureSignature => {
                    AppError::authentication("Token is not valid yet")
                }
                JwtErrorKind::InvalidIssuer => AppError::authentication("Invalid token issuer"),
                JwtErrorKind::InvalidSignature => {
                    AppError::authentication("Invalid token signature")
                }
                JwtErrorKind::InvalidAlgorithm => {
                    AppError::authentication("Unexpected token signing method")
                }
                JwtErrorKind::InvalidToken => AppError::authentication("Invalid token format"),
                _ => AppError::authentication(format!("Token validation failed: {e}")),
            }
        })?;

        Ok(data.claims)
    }
}

#[async_trait]
impl TokenValidator for JwtValidator {
    async fn validate(&self, token: &str) -> AppResult<Identity> {
        let claims = self.decode_claims(token)?;
        claims.identity().ok_or_else(|| {
            tracing::debug!(issuer = %claims.iss, "Token carries no usable identity");
            AppError::authentication(MALFORMED_TOKEN_DATA)
        })
    }
}
