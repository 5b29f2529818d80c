//! Forwarding of replica input to the authority

use crate::protocol::{Frame, FrameIds, Message};
use crate::types::Intent;

/// Edge-triggered sender of the local intent
///
/// A frame is produced only when the intent differs from the last one
/// produced, so a held key costs one frame, not one per tick.
#[derive(Debug, Clone)]
pub struct InputRelay {
    ids: FrameIds,
    last_sent: Intent,
}

impl InputRelay {
    pub fn new(ids: FrameIds) -> Self {
        Self {
            ids,
            last_sent: Intent::Still,
        }
    }

    /// Frame to send for this tick's intent, if it changed
    pub fn observe(&mut self, intent: Intent) -> Option<Frame> {
        if intent == self.last_sent {
            return None;
        }
        match Message::InputIntent(intent).encode(&self.ids) {
            Ok(frame) => {
                self.last_sent = intent;
                Some(frame)
            }
            Err(e) => {
                tracing::error!("Failed to encode input intent: {}", e);
                None
            }
        }
    }

    pub fn last_sent(&self) -> Intent {
        self.last_sent
    }

    pub fn reset(&mut self) {
        self.last_sent = Intent::Still;
    }
}
