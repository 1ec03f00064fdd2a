//! `ConnectionToken` extractor: the bearer token offered on an upgrade
//! request.

use std::convert::Infallible;

use axum::extract::{FromRequestParts, Query};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use serde::Deserialize;

use relayhub_auth::token_from_authorization;

#[derive(Debug, Deserialize)]
struct TokenQuery {
    token: Option<String>,
}

/// Token from the `Authorization` header (with an optional `Bearer ` or
/// `Token ` scheme), falling back to the `token` query parameter.
/// `None` when neither carries a value.
#[derive(Debug, Clone)]
pub struct ConnectionToken(pub Option<String>);

impl<S> FromRequestParts<S> for ConnectionToken
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let from_header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(token_from_authorization)
            .map(str::to_string);
        if from_header.is_some() {
            return Ok(Self(from_header));
        }

        let from_query = Query::<TokenQuery>::try_from_uri(&parts.uri)
            .ok()
            .and_then(|Query(query)| query.token)
            .filter(|token| !token.trim().is_empty());
        Ok(Self(from_query))
    }
}
