//! JWT claims carried by connection tokens.

use serde::{Deserialize, Serialize};

use relayhub_core::types::{Identity, UserId};

/// Identity block nested under `authentication_data`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticationData {
    pub id: UserId,
    pub username: String,
    #[serde(default)]
    pub hwid: String,
}

/// Token payload: the identity block plus registered claims.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Absent or null in tokens that verify but carry no identity.
    #[serde(default)]
    pub authentication_data: Option<AuthenticationData>,
    /// Issuer.
    pub iss: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nbf: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,
}

impl Claims {
    /// The identity carried by the token, if it is usable.
    ///
    /// Non-positive user ids are treated as unusable since they can never
    /// be addressed through the control plane.
    pub fn identity(&self) -> Option<Identity> {
        self.authentication_data
            .as_ref()
            .filter(|data| data.id > 0)
            .map(|data| Identity::new(data.id, data.username.clone(), data.hwid.clone()))
    }
}
