//! Request/response header framing.
//!
//! The first byte of every packet is split: the low nibble carries the
//! message type, the high nibble carries transmission flags. The second byte
//! of slot-keyed requests holds the slot index.

use bitflags::bitflags;

use crate::codec::CodecError;

/// Mask selecting the message-type nibble of a header byte.
pub const TYPE_MASK: u8 = 0b0000_1111;

bitflags! {
    /// High-nibble flags of a packet header byte.
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    pub struct HeaderFlags: u8 {
        /// Final packet of the transmission.
        const END = 0b1000_0000;
        /// The request caused an error.
        const ERROR = 0b0100_0000;
    }
}

/// Message type carried in the low nibble of a header byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::EnumIter)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum MessageKind {
    /// Delete the procedure in a slot.
    DelRequest = 0x00,
    /// Acknowledgement of a delete.
    DelResponse = 0x01,
    /// Fetch the procedure in a slot.
    PullRequest = 0x02,
    /// Packed procedure answering a pull.
    PullResponse = 0x03,
    /// Store a packed procedure into a slot.
    PushRequest = 0x04,
    /// Acknowledgement of a push.
    PushResponse = 0x05,
    /// Enumerate occupied slots.
    SlotsRequest = 0x06,
    /// Occupied slot list answering an enumeration.
    SlotsResponse = 0x07,
    /// Execute the procedure in a slot.
    RunRequest = 0x08,
    /// Acknowledgement of a run request.
    RunResponse = 0x09,
}

impl MessageKind {
    /// The response kind paired with this request kind; responses map to
    /// themselves.
    pub const fn response(self) -> Self {
        match self {
            Self::DelRequest | Self::DelResponse => Self::DelResponse,
            Self::PullRequest | Self::PullResponse => Self::PullResponse,
            Self::PushRequest | Self::PushResponse => Self::PushResponse,
            Self::SlotsRequest | Self::SlotsResponse => Self::SlotsResponse,
            Self::RunRequest | Self::RunResponse => Self::RunResponse,
        }
    }
}

impl TryFrom<u8> for MessageKind {
    type Error = CodecError;

    /// Decodes the type nibble; flag bits must be stripped by [`Header::parse`].
    fn try_from(b: u8) -> Result<Self, CodecError> {
        match b {
            0x00 => Ok(Self::DelRequest),
            0x01 => Ok(Self::DelResponse),
            0x02 => Ok(Self::PullRequest),
            0x03 => Ok(Self::PullResponse),
            0x04 => Ok(Self::PushRequest),
            0x05 => Ok(Self::PushResponse),
            0x06 => Ok(Self::SlotsRequest),
            0x07 => Ok(Self::SlotsResponse),
            0x08 => Ok(Self::RunRequest),
            0x09 => Ok(Self::RunResponse),
            _ => Err(CodecError::UnknownMessage(b)),
        }
    }
}

/// Decoded first byte of a packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Header {
    /// Message type nibble.
    pub kind: MessageKind,
    /// Flag nibble.
    pub flags: HeaderFlags,
}

impl Header {
    /// Header with the END flag set, the single-packet common case.
    pub const fn new(kind: MessageKind) -> Self {
        Self {
            kind,
            flags: HeaderFlags::END,
        }
    }

    /// Same header with the ERROR flag raised.
    pub fn with_error(mut self) -> Self {
        self.flags |= HeaderFlags::ERROR;
        self
    }

    /// Compose the wire byte.
    pub fn to_byte(self) -> u8 {
        self.kind as u8 | self.flags.bits()
    }

    /// Split a wire byte into kind and flags.
    pub fn parse(byte: u8) -> Result<Self, CodecError> {
        let kind = MessageKind::try_from(byte & TYPE_MASK)?;
        let flags = HeaderFlags::from_bits_truncate(byte);
        Ok(Self { kind, flags })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn header_byte_round_trip() {
        for kind in MessageKind::iter() {
            let header = Header::new(kind).with_error();
            let parsed = Header::parse(header.to_byte()).unwrap();
            assert_eq!(parsed, header);
            assert!(parsed.flags.contains(HeaderFlags::END | HeaderFlags::ERROR));
        }
    }

    #[test]
    fn unused_type_nibbles_are_rejected() {
        for b in 0x0a..=0x0f {
            assert!(Header::parse(b).is_err());
        }
    }

    #[test]
    fn reserved_flag_bits_are_dropped() {
        let byte = MessageKind::RunResponse as u8 | 0b0011_0000;
        let header = Header::parse(byte).unwrap();
        assert!(header.flags.is_empty());
    }
}
