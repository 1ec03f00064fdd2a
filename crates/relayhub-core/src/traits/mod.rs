//! Capability traits implemented by other crates.

pub mod token;

pub use token::TokenValidator;
