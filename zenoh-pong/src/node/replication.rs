//! Replication of the authority's state to replicas
//!
//! The authority republishes paddles and ball every tick, so a lost frame is
//! corrected by the next one. Replicas apply whatever arrives, last write
//! wins, with no ordering or interpolation.

use crate::protocol::{message::to_wire_coordinate, Frame, FrameIds, Message};
use crate::types::{Score, Side, Snapshot};

/// Builds the per-tick state frames on the authority
#[derive(Debug, Clone)]
pub struct StatePublisher {
    ids: FrameIds,
    last_score: Option<Score>,
}

impl StatePublisher {
    pub fn new(ids: FrameIds) -> Self {
        Self {
            ids,
            last_score: None,
        }
    }

    /// Frames for this tick: both paddles, the ball, and the score when it
    /// changed since the last call
    pub fn publish(&mut self, snapshot: &Snapshot) -> Vec<Frame> {
        let mut messages = vec![
            Message::PaddlePosition {
                side: Side::Right,
                position: to_wire_coordinate(snapshot.right_paddle),
            },
            Message::PaddlePosition {
                side: Side::Left,
                position: to_wire_coordinate(snapshot.left_paddle),
            },
            Message::BallState {
                x: to_wire_coordinate(snapshot.ball.0),
                y: to_wire_coordinate(snapshot.ball.1),
            },
        ];
        if self.last_score != Some(snapshot.score) {
            messages.push(Message::Score(snapshot.score));
            self.last_score = Some(snapshot.score);
        }

        messages
            .into_iter()
            .filter_map(|message| match message.encode(&self.ids) {
                Ok(frame) => Some(frame),
                Err(e) => {
                    tracing::error!("Failed to encode {:?}: {}", message, e);
                    None
                }
            })
            .collect()
    }

    /// Publish the score again on the next call
    pub fn reset(&mut self) {
        self.last_score = None;
    }
}

/// Applies state messages to a replica's snapshot
#[derive(Debug, Clone, Copy, Default)]
pub struct StateSubscriber;

impl StateSubscriber {
    /// Overwrite the field carried by `message`
    ///
    /// Returns `false` for messages that carry no replicated state.
    pub fn apply(&self, snapshot: &mut Snapshot, message: &Message) -> bool {
        match *message {
            Message::PaddlePosition { side, position } => {
                snapshot.set_paddle(side, i32::from(position));
            }
            Message::BallState { x, y } => {
                snapshot.ball = (i32::from(x), i32::from(y));
            }
            Message::Score(score) => {
                snapshot.score = score;
            }
            Message::RoleClaim { .. }
            | Message::InputIntent(_)
            | Message::ResetRequest
            | Message::ResetAcknowledge => return false,
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GameConfig;

    fn decode_all(frames: &[Frame]) -> Vec<Message> {
        frames
            .iter()
            .map(|frame| Message::decode(frame, &FrameIds::default()).unwrap())
            .collect()
    }

    #[test]
    fn test_score_only_on_change() {
        let mut publisher = StatePublisher::new(FrameIds::default());
        let mut snapshot = GameConfig::default().initial_snapshot();

        let first = decode_all(&publisher.publish(&snapshot));
        assert_eq!(first.len(), 4);
        assert_eq!(first[3], Message::Score(Score::new(0, 0)));

        assert_eq!(publisher.publish(&snapshot).len(), 3);

        snapshot.score = Score::new(1, 0);
        let changed = decode_all(&publisher.publish(&snapshot));
        assert_eq!(changed.last(), Some(&Message::Score(Score::new(1, 0))));

        publisher.reset();
        assert_eq!(publisher.publish(&snapshot).len(), 4);
    }

    #[test]
    fn test_coordinates_saturate_on_the_wire() {
        let mut publisher = StatePublisher::new(FrameIds::default());
        let mut snapshot = GameConfig::default().initial_snapshot();
        snapshot.ball = (-2, 300);

        let messages = decode_all(&publisher.publish(&snapshot));
        assert_eq!(messages[2], Message::BallState { x: 0, y: 255 });
    }

    #[test]
    fn test_round_trip_reproduces_snapshot() {
        let mut publisher = StatePublisher::new(FrameIds::default());
        let subscriber = StateSubscriber;
        let source = Snapshot {
            left_paddle: 3,
            right_paddle: 40,
            ball: (100, 12),
            score: Score::new(2, 4),
        };

        let mut replica = GameConfig::default().initial_snapshot();
        for message in decode_all(&publisher.publish(&source)) {
            assert!(subscriber.apply(&mut replica, &message));
        }
        assert_eq!(replica, source);
    }

    #[test]
    fn test_apply_is_idempotent() {
        let subscriber = StateSubscriber;
        let message = Message::BallState { x: 10, y: 20 };

        let mut once = GameConfig::default().initial_snapshot();
        subscriber.apply(&mut once, &message);
        let mut twice = once;
        subscriber.apply(&mut twice, &message);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_control_messages_are_not_state() {
        let subscriber = StateSubscriber;
        let mut snapshot = GameConfig::default().initial_snapshot();
        let before = snapshot;
        assert!(!subscriber.apply(&mut snapshot, &Message::ResetAcknowledge));
        assert_eq!(snapshot, before);
    }
}
