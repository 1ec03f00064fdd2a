//! Control-plane RPC surface, one instance per hub.
//!
//! Each operation is a `POST /rpc/<Operation>` taking and returning JSON.
//! Failures carry a typed body, see [`RpcError`].

pub mod dto;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod router;

pub use error::{RpcCode, RpcError};
pub use router::build_control_router;
