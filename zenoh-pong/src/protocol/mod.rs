//! Frame codec: typed messages to and from identifier + payload frames

pub mod frame;
pub mod message;

pub use frame::{Frame, FrameError, MAX_IDENTIFIER, MAX_PAYLOAD};
pub use message::{DecodeError, FrameIds, Message, DEFAULT_GROUP, MARKER};
