//! Bearer token validation capability.

use async_trait::async_trait;

use crate::result::AppResult;
use crate::types::Identity;

/// Turns an opaque bearer token into an [`Identity`].
///
/// Implementations return an `Authentication` error carrying a
/// human-readable detail when the token is rejected, and the detail
/// `"malformed token data"` when the token verifies but carries no usable
/// identity.
#[async_trait]
pub trait TokenValidator: Send + Sync + 'static {
    /// Validate `token` and extract the identity it carries.
    async fn validate(&self, token: &str) -> AppResult<Identity>;
}
