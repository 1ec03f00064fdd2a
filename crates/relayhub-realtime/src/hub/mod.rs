//! Named hubs: per-user session tracking and fan-out.

pub mod controller;
pub mod registry;

pub use controller::Hub;
pub use registry::SessionRegistry;
