/// Error types for the zenoh-pong library
use thiserror::Error;

use crate::protocol::FrameError;

/// Result type alias for pong operations
pub type Result<T> = std::result::Result<T, PongError>;

/// Errors that can occur in zenoh-pong operations
#[derive(Debug, Error)]
pub enum PongError {
    /// Zenoh-related errors
    #[error("Zenoh error: {0}")]
    Zenoh(#[from] zenoh::Error),

    /// The bus could not be opened or configured; fatal at startup
    #[error("Transport unavailable: {0}")]
    TransportUnavailable(String),

    /// Another live node already uses this name on the bus
    #[error("Node name conflict: {0}")]
    NodeNameConflict(String),

    /// Invalid node name provided
    #[error("Invalid node name: {0}. Must be a valid single-chunk keyexpr (no /, *, $, ?, #, @)")]
    InvalidNodeName(String),

    /// Invalid keyexpr pattern
    #[error("Invalid keyexpr: {0}")]
    InvalidKeyexpr(String),

    /// Game or node configuration that cannot be played
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Frame construction error
    #[error("Frame error: {0}")]
    Frame(#[from] FrameError),
}
