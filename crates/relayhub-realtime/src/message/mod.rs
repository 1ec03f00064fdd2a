//! Frames the gateway itself originates.

pub mod system;

pub use system::{displacement_frame, welcome_frame};
