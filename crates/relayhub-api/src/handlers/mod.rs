//! Route handlers for the public router.

pub mod debug;
pub mod health;
pub mod metrics;
pub mod ws;
