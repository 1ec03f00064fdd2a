//! JWT token validation, issuance, and claims.

pub mod claims;
pub mod encoder;
pub mod validator;

pub use claims::{AuthenticationData, Claims};
pub use encoder::JwtEncoder;
pub use validator::JwtValidator;
