//! Fixed-size bus frame: an 11-bit identifier and up to 8 payload bytes

use thiserror::Error;

/// Largest payload a frame can carry
pub const MAX_PAYLOAD: usize = 8;

/// Largest standard (11-bit) identifier
pub const MAX_IDENTIFIER: u16 = 0x7FF;

/// Error building a frame from raw parts
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrameError {
    #[error("payload of {0} bytes exceeds {MAX_PAYLOAD}")]
    PayloadTooLong(usize),
    #[error("identifier {0:#x} exceeds {MAX_IDENTIFIER:#x}")]
    IdentifierOutOfRange(u16),
}

/// One discrete message unit on the shared bus
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Frame {
    id: u16,
    len: u8,
    data: [u8; MAX_PAYLOAD],
}

impl Frame {
    /// Build a frame, rejecting oversized payloads and identifiers
    pub fn new(id: u16, payload: &[u8]) -> Result<Self, FrameError> {
        if id > MAX_IDENTIFIER {
            return Err(FrameError::IdentifierOutOfRange(id));
        }
        if payload.len() > MAX_PAYLOAD {
            return Err(FrameError::PayloadTooLong(payload.len()));
        }
        let mut data = [0u8; MAX_PAYLOAD];
        data[..payload.len()].copy_from_slice(payload);
        Ok(Self {
            id,
            len: payload.len() as u8,
            data,
        })
    }

    pub fn id(&self) -> u16 {
        self.id
    }

    pub fn len(&self) -> usize {
        self.len as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn payload(&self) -> &[u8] {
        &self.data[..self.len as usize]
    }
}

impl std::fmt::Debug for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Frame(id={}, {:02x?})", self.id, self.payload())
    }
}

// Wire layout on Zenoh: id (u16), length (u8), then each payload byte
impl zenoh_ext::Serialize for Frame {
    fn serialize(&self, serializer: &mut zenoh_ext::ZSerializer) {
        self.id.serialize(serializer);
        self.len.serialize(serializer);
        for byte in self.payload() {
            byte.serialize(serializer);
        }
    }
}

impl zenoh_ext::Deserialize for Frame {
    fn deserialize(
        deserializer: &mut zenoh_ext::ZDeserializer,
    ) -> Result<Self, zenoh_ext::ZDeserializeError> {
        let id = u16::deserialize(deserializer)?;
        let len = u8::deserialize(deserializer)? as usize;
        if len > MAX_PAYLOAD {
            return Err(zenoh_ext::ZDeserializeError);
        }
        let mut payload = [0u8; MAX_PAYLOAD];
        for slot in payload.iter_mut().take(len) {
            *slot = u8::deserialize(deserializer)?;
        }
        Frame::new(id, &payload[..len]).map_err(|_| zenoh_ext::ZDeserializeError)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_limits() {
        assert_eq!(
            Frame::new(16, &[0; 9]),
            Err(FrameError::PayloadTooLong(9))
        );
        assert_eq!(
            Frame::new(0x800, &[1]),
            Err(FrameError::IdentifierOutOfRange(0x800))
        );
        let frame = Frame::new(MAX_IDENTIFIER, &[1, 2, 3, 4, 5, 6, 7, 8]).unwrap();
        assert_eq!(frame.len(), 8);
    }

    #[test]
    fn test_payload_only_exposes_length() {
        let frame = Frame::new(56, &[64, 32]).unwrap();
        assert_eq!(frame.payload(), &[64, 32]);
        assert!(!frame.is_empty());
        assert!(Frame::new(58, &[]).unwrap().is_empty());
    }

    #[test]
    fn test_zenoh_serialization() {
        let frame = Frame::new(57, &[5, 3]).unwrap();
        let bytes = zenoh_ext::z_serialize(&frame);
        let decoded: Frame = zenoh_ext::z_deserialize(&bytes).unwrap();
        assert_eq!(decoded, frame);
    }

    #[test]
    fn test_zenoh_deserialization_rejects_long_payload() {
        let bytes = zenoh_ext::z_serialize(&(16u16, 9u8));
        assert!(zenoh_ext::z_deserialize::<Frame>(&bytes).is_err());
    }
}
