//! JSON body extractor that also runs `validator` rules.

use axum::Json;
use axum::extract::{FromRequest, Request};
use serde::de::DeserializeOwned;
use validator::{Validate, ValidationErrors};

use super::error::RpcError;

/// Deserialized and validated request body. Malformed JSON and failed
/// rules both reject with `invalid_argument`.
#[derive(Debug, Clone)]
pub struct ValidatedRpcJson<T>(pub T);

impl<T, S> FromRequest<S> for ValidatedRpcJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = RpcError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| RpcError::invalid_argument(rejection.body_text()))?;
        value
            .validate()
            .map_err(|errors| RpcError::invalid_argument(describe(&errors)))?;
        Ok(Self(value))
    }
}

/// Every rule message, sorted so the text is stable.
fn describe(errors: &ValidationErrors) -> String {
    let mut messages: Vec<String> = errors
        .field_errors()
        .into_iter()
        .flat_map(|(field, list)| {
            list.iter().map(move |error| match &error.message {
                Some(message) => message.to_string(),
                None => format!("{field} is invalid"),
            })
        })
        .collect();
    messages.sort();
    messages.join("; ")
}
