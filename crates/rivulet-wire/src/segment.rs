//! Fixed-header segment codec.
//!
//! Every datagram on the wire carries a 12-byte big-endian header followed by
//! the payload:
//!
//! ```text
//!  offset  size  field
//!    0      4   seq     sequence number of the first payload byte
//!    4      4   ack     cumulative acknowledgment number
//!    8      2   flags   SYN=0x01 ACK=0x02 FIN=0x04 ENC=0x08
//!   10      2   window  advertised receiver window in bytes
//!   12      …   payload
//! ```
//!
//! The codec is pure and imposes no payload length limit of its own; the
//! transport layer is responsible for honoring MSS.

use crate::error::WireError;
use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::fmt;

/// Size of the fixed header preceding the payload.
pub const HEADER_LEN: usize = 12;

// Flag bits. Unknown bits are ignored on receive and zero on send.
pub const SYN: u16 = 0x01;
pub const ACK: u16 = 0x02;
pub const FIN: u16 = 0x04;
pub const ENC: u16 = 0x08;

/// A decoded transport segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub seq: u32,
    pub ack: u32,
    pub flags: u16,
    pub window: u16,
    pub payload: Bytes,
}

impl Segment {
    pub fn new(seq: u32, ack: u32, flags: u16, window: u16, payload: Bytes) -> Self {
        Self { seq, ack, flags, window, payload }
    }

    /// True when every bit of `mask` is set in the flags field.
    #[inline]
    pub fn has_flags(&self, mask: u16) -> bool {
        self.flags & mask == mask
    }

    /// Serializes the segment into a contiguous header + payload buffer.
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(HEADER_LEN + self.payload.len());
        buf.put_u32(self.seq);
        buf.put_u32(self.ack);
        buf.put_u16(self.flags);
        buf.put_u16(self.window);
        buf.extend_from_slice(&self.payload);
        buf.freeze()
    }

    /// Decodes a segment from a raw datagram.
    ///
    /// Fails with [`WireError::ShortFrame`] when the input cannot hold the
    /// fixed header. Everything past the header is the payload, verbatim.
    pub fn decode(data: &[u8]) -> Result<Self, WireError> {
        if data.len() < HEADER_LEN {
            return Err(WireError::ShortFrame { len: data.len() });
        }

        let mut header = &data[..HEADER_LEN];
        let seq = header.get_u32();
        let ack = header.get_u32();
        let flags = header.get_u16();
        let window = header.get_u16();
        let payload = Bytes::copy_from_slice(&data[HEADER_LEN..]);

        Ok(Self { seq, ack, flags, window, payload })
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names = Vec::new();
        if self.has_flags(SYN) {
            names.push("SYN");
        }
        if self.has_flags(ACK) {
            names.push("ACK");
        }
        if self.has_flags(FIN) {
            names.push("FIN");
        }
        if self.has_flags(ENC) {
            names.push("ENC");
        }
        write!(
            f,
            "[seq={} ack={} win={} flags={} payload={}b]",
            self.seq,
            self.ack,
            self.window,
            if names.is_empty() { "-".to_string() } else { names.join("|") },
            self.payload.len()
        )
    }
}
