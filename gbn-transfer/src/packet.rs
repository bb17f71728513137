//! Wire-format definitions for Go-Back-N datagrams.
//!
//! Every datagram exchanged between sender and receiver is one [`Packet`].
//! This module is responsible for:
//! - Defining the on-wire binary layout (type, sequence number, length, payload).
//! - Serialising a [`Packet`] into a byte buffer ready for transmission.
//! - Deserialising a raw byte slice back into a [`Packet`], returning errors
//!   for malformed or truncated input.
//!
//! No I/O happens here — this is pure data transformation.
//!
//! # Wire format
//!
//! All integers are 32-bit **big-endian**.
//!
//! ```text
//!  0               1               2               3
//!  0 1 2 3 4 5 6 7 0 1 2 3 4 5 6 7 0 1 2 3 4 5 6 7 0 1 2 3 4 5 6 7
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |                             Type                              |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |                        Sequence Number                        |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |                        Payload Length                         |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |                        Payload ...                            |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! ```
//!
//! Total header size: [`HEADER_LEN`] = 12 bytes.

use thiserror::Error;

/// Byte length of the fixed-size header on the wire.
pub const HEADER_LEN: usize = 12;

/// Largest payload a DATA packet may carry (chunk size must stay below this).
pub const MAX_PAYLOAD: usize = 512;

/// Largest datagram either side will ever produce.
pub const MAX_DATAGRAM: usize = HEADER_LEN + MAX_PAYLOAD;

// Byte offsets of each field within the serialised header.
const OFF_TYPE: usize = 0;
const OFF_SEQ: usize = 4;
const OFF_LEN: usize = 8;

/// Discriminant carried in the `type` header field.
///
/// The value `3` is reserved by the protocol but has no assigned meaning; it
/// is never emitted and is rejected on decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum PacketType {
    /// A chunk of the transferred stream.
    Data = 1,
    /// Cumulative acknowledgement from the receiver.
    Ack = 2,
    /// End-of-session signal from the sender.
    Teardown = 4,
}

impl PacketType {
    pub fn from_u32(value: u32) -> Option<Self> {
        match value {
            1 => Some(PacketType::Data),
            2 => Some(PacketType::Ack),
            4 => Some(PacketType::Teardown),
            _ => None,
        }
    }

    pub fn to_u32(self) -> u32 {
        self as u32
    }
}

/// A complete protocol datagram.
///
/// The `length` header field is not stored: [`Packet::encode`] derives it
/// from `payload`, and [`Packet::decode`] uses it to slice the payload out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    pub kind: PacketType,
    /// Zero-based chunk index (DATA), or the cumulative ACK number (ACK).
    pub seq: u32,
    pub payload: Vec<u8>,
}

impl Packet {
    pub fn data(seq: u32, payload: Vec<u8>) -> Self {
        Self {
            kind: PacketType::Data,
            seq,
            payload,
        }
    }

    pub fn ack(seq: u32) -> Self {
        Self {
            kind: PacketType::Ack,
            seq,
            payload: Vec::new(),
        }
    }

    /// Teardown messages always carry sequence number and length zero.
    pub fn teardown() -> Self {
        Self {
            kind: PacketType::Teardown,
            seq: 0,
            payload: Vec::new(),
        }
    }

    /// Number of bytes [`encode`](Self::encode) will produce.
    pub fn wire_len(&self) -> usize {
        HEADER_LEN + self.payload.len()
    }

    /// Serialise this packet into a newly allocated byte vector.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = vec![0u8; self.wire_len()];

        buf[OFF_TYPE..OFF_TYPE + 4].copy_from_slice(&self.kind.to_u32().to_be_bytes());
        buf[OFF_SEQ..OFF_SEQ + 4].copy_from_slice(&self.seq.to_be_bytes());
        buf[OFF_LEN..OFF_LEN + 4].copy_from_slice(&(self.payload.len() as u32).to_be_bytes());
        buf[HEADER_LEN..].copy_from_slice(&self.payload);

        buf
    }

    /// Parse a [`Packet`] from a raw byte slice.
    ///
    /// Returns [`Err`] if:
    /// - `buf` is shorter than [`HEADER_LEN`],
    /// - the type field holds an unknown or reserved value, or
    /// - the length field claims more payload bytes than `buf` holds.
    ///
    /// Bytes past the declared length are ignored.
    pub fn decode(buf: &[u8]) -> Result<Self, PacketError> {
        if buf.len() < HEADER_LEN {
            return Err(PacketError::BufferTooShort(buf.len()));
        }

        let raw_type = read_u32(buf, OFF_TYPE);
        let seq = read_u32(buf, OFF_SEQ);
        let len = read_u32(buf, OFF_LEN) as usize;

        let kind = PacketType::from_u32(raw_type).ok_or(PacketError::UnknownType(raw_type))?;

        let available = buf.len() - HEADER_LEN;
        if len > available {
            return Err(PacketError::Truncated {
                declared: len,
                available,
            });
        }

        Ok(Packet {
            kind,
            seq,
            payload: buf[HEADER_LEN..HEADER_LEN + len].to_vec(),
        })
    }
}

/// Errors that can arise when parsing a raw datagram.
///
/// Every variant is a flavour of malformed packet; the transfer engine treats
/// all of them as channel noise.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PacketError {
    #[error("malformed packet: {0} bytes is shorter than the 12-byte header")]
    BufferTooShort(usize),
    #[error("malformed packet: unknown or reserved type {0}")]
    UnknownType(u32),
    #[error("malformed packet: length field claims {declared} bytes, only {available} present")]
    Truncated { declared: usize, available: usize },
}

#[inline]
fn read_u32(buf: &[u8], off: usize) -> u32 {
    u32::from_be_bytes([buf[off], buf[off + 1], buf[off + 2], buf[off + 3]])
}
