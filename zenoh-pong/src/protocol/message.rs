//! Typed protocol messages and their frame encoding

use thiserror::Error;

use super::frame::{Frame, FrameError, MAX_IDENTIFIER};
use crate::types::{BusId, Intent, Score, Side};

/// Marker byte carried by claim and reset frames
pub const MARKER: u8 = 0x01;

/// Identifier group used when none is configured
pub const DEFAULT_GROUP: u16 = 6;

/// Static identifier namespace shared by every node on the bus
///
/// Identifiers are derived from a group number so several games can share
/// one bus without colliding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameIds {
    pub role_claim: u16,
    pub input_intent: u16,
    pub paddle_right: u16,
    pub paddle_left: u16,
    pub ball_state: u16,
    pub score: u16,
    pub reset_request: u16,
    pub reset_acknowledge: u16,
}

impl FrameIds {
    /// Highest offset added to the group number
    pub const MAX_OFFSET: u16 = 53;

    /// Identifiers for the given group number
    ///
    /// Fails when the highest identifier would not fit in 11 bits.
    pub fn for_group(group: u16) -> Result<Self, FrameError> {
        let highest = group.saturating_add(Self::MAX_OFFSET);
        if highest > MAX_IDENTIFIER {
            return Err(FrameError::IdentifierOutOfRange(highest));
        }
        Ok(Self::offset_from(group))
    }

    const fn offset_from(group: u16) -> Self {
        Self {
            role_claim: group + 10,
            input_intent: group + 19,
            paddle_right: group + 20,
            paddle_left: group + 21,
            ball_state: group + 50,
            score: group + 51,
            reset_request: group + 52,
            reset_acknowledge: group + Self::MAX_OFFSET,
        }
    }

    /// Identifier of the paddle frame for `side`
    pub fn paddle(&self, side: Side) -> u16 {
        match side {
            Side::Left => self.paddle_left,
            Side::Right => self.paddle_right,
        }
    }
}

impl Default for FrameIds {
    fn default() -> Self {
        Self::offset_from(DEFAULT_GROUP)
    }
}

/// Why an inbound frame could not be turned into a message
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// Identifier is not part of the namespace
    #[error("unknown identifier {0}")]
    UnknownIdentifier(u16),
    /// Known identifier with a payload of the wrong length
    #[error("frame {id} has {actual} payload bytes, expected {expected}")]
    MalformedLength {
        id: u16,
        expected: usize,
        actual: usize,
    },
    /// Known identifier and length, but a byte out of its domain
    #[error("frame {id} carries invalid value {value:#04x}")]
    MalformedValue { id: u16, value: u8 },
}

/// Protocol message exchanged between nodes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Message {
    /// Sender became authority
    RoleClaim { bus_id: BusId },
    /// Replica's movement intent
    InputIntent(Intent),
    /// Paddle position of one side
    PaddlePosition { side: Side, position: u8 },
    /// Ball center
    BallState { x: u8, y: u8 },
    /// Current score
    Score(Score),
    /// Replica asks the authority to restart the match
    ResetRequest,
    /// Authority restarted the match
    ResetAcknowledge,
}

impl Message {
    /// Encode into a frame using the identifiers in `ids`
    pub fn encode(&self, ids: &FrameIds) -> Result<Frame, FrameError> {
        let (id, payload) = match *self {
            Message::RoleClaim { bus_id } => (ids.role_claim, [MARKER, bus_id.0]),
            Message::InputIntent(intent) => (ids.input_intent, [intent.to_byte(), 0]),
            Message::PaddlePosition { side, position } => (ids.paddle(side), [position, 0]),
            Message::BallState { x, y } => (ids.ball_state, [x, y]),
            Message::Score(score) => (ids.score, [score.authority, score.other]),
            Message::ResetRequest => (ids.reset_request, [MARKER, 0]),
            Message::ResetAcknowledge => (ids.reset_acknowledge, [MARKER, 0]),
        };
        Frame::new(id, &payload[..self.payload_len()])
    }

    /// Defined payload length of this message
    pub fn payload_len(&self) -> usize {
        match self {
            Message::RoleClaim { .. } | Message::BallState { .. } | Message::Score(_) => 2,
            Message::InputIntent(_)
            | Message::PaddlePosition { .. }
            | Message::ResetRequest
            | Message::ResetAcknowledge => 1,
        }
    }

    /// Decode a frame; known identifiers must carry exactly their defined length
    pub fn decode(frame: &Frame, ids: &FrameIds) -> Result<Self, DecodeError> {
        let id = frame.id();
        let payload = frame.payload();

        let expect_len = |expected: usize| {
            if payload.len() == expected {
                Ok(())
            } else {
                Err(DecodeError::MalformedLength {
                    id,
                    expected,
                    actual: payload.len(),
                })
            }
        };
        let expect_marker = |value: u8| {
            if value == MARKER {
                Ok(())
            } else {
                Err(DecodeError::MalformedValue { id, value })
            }
        };

        if id == ids.role_claim {
            expect_len(2)?;
            expect_marker(payload[0])?;
            Ok(Message::RoleClaim {
                bus_id: BusId(payload[1]),
            })
        } else if id == ids.input_intent {
            expect_len(1)?;
            Intent::from_byte(payload[0])
                .map(Message::InputIntent)
                .ok_or(DecodeError::MalformedValue {
                    id,
                    value: payload[0],
                })
        } else if id == ids.paddle_left || id == ids.paddle_right {
            expect_len(1)?;
            let side = if id == ids.paddle_left {
                Side::Left
            } else {
                Side::Right
            };
            Ok(Message::PaddlePosition {
                side,
                position: payload[0],
            })
        } else if id == ids.ball_state {
            expect_len(2)?;
            Ok(Message::BallState {
                x: payload[0],
                y: payload[1],
            })
        } else if id == ids.score {
            expect_len(2)?;
            Ok(Message::Score(Score::new(payload[0], payload[1])))
        } else if id == ids.reset_request {
            expect_len(1)?;
            expect_marker(payload[0])?;
            Ok(Message::ResetRequest)
        } else if id == ids.reset_acknowledge {
            expect_len(1)?;
            expect_marker(payload[0])?;
            Ok(Message::ResetAcknowledge)
        } else {
            Err(DecodeError::UnknownIdentifier(id))
        }
    }
}

/// Clamp a screen coordinate into the single wire byte
pub fn to_wire_coordinate(value: i32) -> u8 {
    value.clamp(0, u8::MAX as i32) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_identifiers_follow_group_six() {
        let ids = FrameIds::default();
        assert_eq!(ids.role_claim, 16);
        assert_eq!(ids.input_intent, 25);
        assert_eq!(ids.paddle_right, 26);
        assert_eq!(ids.paddle_left, 27);
        assert_eq!(ids.ball_state, 56);
        assert_eq!(ids.score, 57);
        assert_eq!(ids.reset_request, 58);
        assert_eq!(ids.reset_acknowledge, 59);
    }

    #[test]
    fn test_group_must_fit_identifier_space() {
        assert_eq!(FrameIds::for_group(DEFAULT_GROUP).unwrap(), FrameIds::default());
        assert!(FrameIds::for_group(MAX_IDENTIFIER - FrameIds::MAX_OFFSET).is_ok());
        assert!(FrameIds::for_group(MAX_IDENTIFIER).is_err());
    }

    #[test]
    fn test_encoded_payloads() {
        let ids = FrameIds::default();

        let claim = Message::RoleClaim { bus_id: BusId(7) }.encode(&ids).unwrap();
        assert_eq!((claim.id(), claim.payload()), (16, &[MARKER, 7][..]));

        let ball = Message::BallState { x: 64, y: 32 }.encode(&ids).unwrap();
        assert_eq!((ball.id(), ball.payload()), (56, &[64, 32][..]));

        let score = Message::Score(Score::new(5, 2)).encode(&ids).unwrap();
        assert_eq!(score.payload(), &[5, 2]);

        let left = Message::PaddlePosition {
            side: Side::Left,
            position: 22,
        }
        .encode(&ids)
        .unwrap();
        assert_eq!((left.id(), left.payload()), (27, &[22][..]));

        let intent = Message::InputIntent(Intent::MoveDown).encode(&ids).unwrap();
        assert_eq!(intent.payload(), &[2]);
    }

    #[test]
    fn test_decode_every_message() {
        let ids = FrameIds::for_group(100).unwrap();
        let messages = [
            Message::RoleClaim { bus_id: BusId(200) },
            Message::InputIntent(Intent::MoveUp),
            Message::PaddlePosition {
                side: Side::Right,
                position: 44,
            },
            Message::BallState { x: 1, y: 63 },
            Message::Score(Score::new(0, 4)),
            Message::ResetRequest,
            Message::ResetAcknowledge,
        ];
        for message in messages {
            let frame = message.encode(&ids).unwrap();
            assert_eq!(Message::decode(&frame, &ids), Ok(message));
        }
    }

    #[test]
    fn test_length_mismatch_is_malformed() {
        let ids = FrameIds::default();
        let short_ball = Frame::new(ids.ball_state, &[10]).unwrap();
        assert_eq!(
            Message::decode(&short_ball, &ids),
            Err(DecodeError::MalformedLength {
                id: 56,
                expected: 2,
                actual: 1
            })
        );

        // An unextended one-byte claim carries no tie-break id
        let bare_claim = Frame::new(ids.role_claim, &[MARKER]).unwrap();
        assert!(matches!(
            Message::decode(&bare_claim, &ids),
            Err(DecodeError::MalformedLength { .. })
        ));

        let long_reset = Frame::new(ids.reset_request, &[MARKER, MARKER]).unwrap();
        assert!(Message::decode(&long_reset, &ids).is_err());
    }

    #[test]
    fn test_bad_values_are_malformed() {
        let ids = FrameIds::default();
        let intent = Frame::new(ids.input_intent, &[9]).unwrap();
        assert_eq!(
            Message::decode(&intent, &ids),
            Err(DecodeError::MalformedValue { id: 25, value: 9 })
        );
        let ack = Frame::new(ids.reset_acknowledge, &[0]).unwrap();
        assert!(matches!(
            Message::decode(&ack, &ids),
            Err(DecodeError::MalformedValue { .. })
        ));
    }

    #[test]
    fn test_unknown_identifier() {
        let ids = FrameIds::default();
        let frame = Frame::new(300, &[1, 2]).unwrap();
        assert_eq!(
            Message::decode(&frame, &ids),
            Err(DecodeError::UnknownIdentifier(300))
        );
    }

    #[test]
    fn test_wire_coordinate_saturates() {
        assert_eq!(to_wire_coordinate(-4), 0);
        assert_eq!(to_wire_coordinate(64), 64);
        assert_eq!(to_wire_coordinate(300), 255);
    }
}
