//! Network layer for zenoh-pong

pub mod bus;
pub mod keyexpr;
pub mod memory_bus;
pub mod stats;
pub mod zenoh_bus;

pub use bus::Transport;
pub use keyexpr::{BusKeyexpr, NodeKeyexpr};
pub use memory_bus::{MemoryBus, MemoryBusHub};
pub use stats::{BusStats, BusStatsSnapshot};
pub use zenoh_bus::ZenohBus;
