//! Transport abstraction over the shared broadcast medium

use crate::protocol::Frame;

/// A best-effort broadcast bus
///
/// Both calls must return promptly: the control loop calls them every tick
/// and has to finish the tick even when the medium is unresponsive.
pub trait Transport {
    /// Queue a frame for broadcast; `false` when the medium refused it
    fn send(&mut self, frame: &Frame) -> bool;

    /// Next received frame from another node, if any
    fn try_receive(&mut self) -> Option<Frame>;
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn send(&mut self, frame: &Frame) -> bool {
        (**self).send(frame)
    }

    fn try_receive(&mut self) -> Option<Frame> {
        (**self).try_receive()
    }
}
