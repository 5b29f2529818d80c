//! # zenoh-pong
//!
//! Two-player Pong replicated over a best-effort broadcast bus.
//!
//! ## Overview
//!
//! Every node runs the same program. The first node whose player moves claims
//! the *authority* role: it simulates the game and republishes paddles, ball
//! and score every tick. The other node becomes a *replica*: it relays its
//! player's input to the authority and renders whatever state it receives.
//!
//! The bus carries small frames (11-bit identifier, up to 8 bytes) with no
//! delivery or ordering guarantee. Lost state frames are overwritten by the
//! next tick; the few control frames (role claim, reset request) are sent
//! several times.
//!
//! ## Key Features
//!
//! - First-mover role arbitration with a bus-id tie-break
//! - Deterministic integer physics on the authority only
//! - Reset handshake after game over
//! - Zenoh transport with name-conflict detection, and an in-memory bus
//!
//! ## Example
//!
//! ```rust,no_run
//! use zenoh_pong::{MemoryBusHub, BusStats, NodeConfig, NodeId, SessionController, InputSample};
//! use std::sync::Arc;
//!
//! let hub = MemoryBusHub::new();
//! let config = NodeConfig::default();
//! let stats = Arc::new(BusStats::new());
//! let bus = hub.attach(config.node_id.clone(), stats.clone());
//!
//! let mut controller = SessionController::new(config, bus, stats).unwrap();
//! let mut input = flume::unbounded::<InputSample>().1;
//! controller.tick(&mut input, &mut ());
//! println!("{}", controller.phase());
//! ```

pub mod config;
pub mod error;
pub mod network;
pub mod node;
pub mod protocol;
pub mod types;

// Re-exports for convenience
pub use config::{GameConfig, NodeConfig, PaddleDrive, Redundancy, RolePolicy};
pub use error::{PongError, Result};
pub use network::{BusStats, BusStatsSnapshot, MemoryBus, MemoryBusHub, Transport, ZenohBus};
pub use node::pong_node::{NodeCommand, PongNode, StepResult};
pub use node::session::{SessionController, TickReport};
pub use node::session_ext::{PongNodeBuilder, SessionExt};
pub use node::{InputSample, InputSource, RenderSink};
pub use protocol::{Frame, FrameIds, Message};
pub use types::{
    BusId, Intent, MatchOutcome, NodeId, NodeRole, PublishableState, Score, SessionPhase, Side,
    Snapshot,
};
