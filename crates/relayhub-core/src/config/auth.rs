//! Authentication configuration.

use serde::{Deserialize, Serialize};

/// Token verification settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Shared HMAC-SHA256 secret.
    pub jwt_secret: String,
    /// Required `iss` claim value.
    pub jwt_issuer: String,
    /// Clock-skew tolerance applied to `exp`/`nbf`, in seconds.
    #[serde(default)]
    pub leeway_seconds: u64,
}
