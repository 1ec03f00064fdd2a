//! Per-client connection state and the socket pumps.

pub mod handle;
pub mod pump;

pub use handle::{Connection, ConnectionId, EnqueueError};
pub use pump::{PumpSettings, ReadExit, read_pump, write_pump};
