//! # relayhub-core
//!
//! Core crate for RelayHub. Contains the configuration schema, the
//! authenticated identity type, the token validation capability, and the
//! unified error system.
//!
//! This crate has **no** internal dependencies on other RelayHub crates.

pub mod config;
pub mod error;
pub mod result;
pub mod traits;
pub mod types;

pub use error::AppError;
pub use result::AppResult;
