//! Node logic: role arbitration, simulation, replication and the control loop

pub mod arbiter;
pub mod input_relay;
pub(crate) mod name_generator;
pub mod physics;
pub mod pong_node;
pub mod redundant;
pub mod replication;
pub mod session;
pub mod session_ext;

use crate::types::{Intent, PublishableState};

/// One reading of the local controls
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct InputSample {
    /// Movement currently requested
    pub intent: Intent,
    /// Restart pressed since the previous poll
    pub restart: bool,
}

impl InputSample {
    pub fn moving(intent: Intent) -> Self {
        Self {
            intent,
            restart: false,
        }
    }

    pub fn restart() -> Self {
        Self {
            intent: Intent::Still,
            restart: true,
        }
    }
}

/// Source of local player input
///
/// `poll` is called once per tick and must return immediately with the
/// current controls; waiting for a key press is expressed by returning
/// [`Intent::Still`] until one arrives.
pub trait InputSource {
    fn poll(&mut self) -> InputSample;
}

/// Destination of the per-tick render view
///
/// Called once per tick. Implementations must not block the control loop;
/// dropping frames is acceptable.
pub trait RenderSink {
    fn present(&mut self, state: &PublishableState);
}

/// Latest sample pushed by another task, e.g. a key reader
impl InputSource for flume::Receiver<InputSample> {
    fn poll(&mut self) -> InputSample {
        self.try_iter().fold(InputSample::default(), |latest, sample| InputSample {
            intent: sample.intent,
            restart: latest.restart || sample.restart,
        })
    }
}

/// Hands each view to another task; frames are dropped when it lags behind
impl RenderSink for flume::Sender<PublishableState> {
    fn present(&mut self, state: &PublishableState) {
        let _ = self.try_send(state.clone());
    }
}

/// Headless node
impl RenderSink for () {
    fn present(&mut self, _state: &PublishableState) {}
}
