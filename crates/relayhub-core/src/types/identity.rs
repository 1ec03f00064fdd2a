//! Authenticated end-user identity.

use serde::{Deserialize, Serialize};

/// Integer user identifier carried inside access tokens.
///
/// Valid identifiers are strictly positive.
pub type UserId = i64;

/// The identity a token validator extracts from a bearer token.
///
/// Immutable once constructed; a connection keeps the identity it was
/// admitted with for its whole lifetime.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identity {
    id: UserId,
    username: String,
    hardware_id: String,
}

impl Identity {
    /// Create an identity from its three components.
    pub fn new(id: UserId, username: impl Into<String>, hardware_id: impl Into<String>) -> Self {
        Self {
            id,
            username: username.into(),
            hardware_id: hardware_id.into(),
        }
    }

    /// The user identifier.
    pub fn id(&self) -> UserId {
        self.id
    }

    /// Display name.
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Opaque device identifier supplied by the token issuer.
    pub fn hardware_id(&self) -> &str {
        &self.hardware_id
    }
}
