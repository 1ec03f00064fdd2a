//! # relayhub-auth
//!
//! Authentication for RelayHub connections.
//!
//! ## Modules
//!
//! - `header`: bearer token extraction from an `Authorization` header
//! - `jwt`: HS256 token validation and issuance

pub mod header;
pub mod jwt;

pub use header::token_from_authorization;
pub use jwt::{Claims, JwtEncoder, JwtValidator};
