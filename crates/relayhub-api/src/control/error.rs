//! Typed control-plane errors.

use std::any::Any;
use std::fmt;

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

use relayhub_core::error::{AppError, ErrorKind};

use crate::error::panic_message;

const INTERNAL_MESSAGE: &str = "An unexpected error occurred";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RpcCode {
    InvalidArgument,
    NotFound,
    Internal,
}

impl RpcCode {
    pub fn status(self) -> StatusCode {
        match self {
            Self::InvalidArgument => StatusCode::BAD_REQUEST,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl fmt::Display for RpcCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::InvalidArgument => "invalid_argument",
            Self::NotFound => "not_found",
            Self::Internal => "internal",
        };
        f.write_str(name)
    }
}

/// Error body of every failed RPC: `{"code": ..., "message": ...}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpcError {
    pub code: RpcCode,
    pub message: String,
}

impl RpcError {
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self {
            code: RpcCode::InvalidArgument,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            code: RpcCode::NotFound,
            message: message.into(),
        }
    }

    pub fn internal() -> Self {
        Self {
            code: RpcCode::Internal,
            message: INTERNAL_MESSAGE.to_string(),
        }
    }
}

impl fmt::Display for RpcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for RpcError {}

impl From<AppError> for RpcError {
    fn from(err: AppError) -> Self {
        match err.kind {
            ErrorKind::Validation => Self::invalid_argument(err.message),
            ErrorKind::NotFound => Self::not_found(err.message),
            _ => {
                tracing::error!(error = %err, "Control operation failed");
                Self::internal()
            }
        }
    }
}

impl IntoResponse for RpcError {
    fn into_response(self) -> Response {
        (self.code.status(), Json(self)).into_response()
    }
}

/// Turns a control handler panic into a typed `internal` error.
pub fn rpc_panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    tracing::error!(panic = %panic_message(&*panic), "Control handler panicked");
    RpcError::internal().into_response()
}
