//! Receiver-side reorder buffer.
//!
//! Holds out-of-order segments keyed by sequence number until the gap in
//! front of them closes, then drains them in one cascade. Every held key K
//! satisfies `K > expected_seq`, and the held ranges are disjoint.

use bytes::{BufMut, Bytes, BytesMut};
use std::collections::BTreeMap;

/// Outcome of offering one segment to the buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Offer {
    /// The segment was in order; the returned bytes are the offered payload
    /// plus every previously held segment the closed gap released.
    Delivered(Bytes),
    /// The segment starts past the in-order frontier and is held.
    Stored,
    /// The segment lies entirely below the frontier and was dropped.
    Duplicate,
}

#[derive(Debug)]
pub struct ReorderBuffer {
    expected_seq: u32,
    held: BTreeMap<u32, Bytes>,
    bytes_held: usize,
}

impl ReorderBuffer {
    pub fn new(initial_seq: u32) -> Self {
        Self { expected_seq: initial_seq, held: BTreeMap::new(), bytes_held: 0 }
    }

    /// Next in-order sequence number, which doubles as the cumulative ACK.
    pub fn expected_seq(&self) -> u32 {
        self.expected_seq
    }

    /// Total payload bytes parked out of order.
    pub fn bytes_held(&self) -> usize {
        self.bytes_held
    }

    pub fn offer(&mut self, seq: u32, payload: Bytes) -> Offer {
        if seq < self.expected_seq {
            return Offer::Duplicate;
        }

        if seq > self.expected_seq {
            // Last write wins. Payload bytes at a given seq are identical on
            // a correct sender, so this is equivalent to keeping the first.
            self.bytes_held += payload.len();
            if let Some(old) = self.held.insert(seq, payload) {
                self.bytes_held -= old.len();
            }
            return Offer::Stored;
        }

        // In order: deliver, then drain everything the closed gap released.
        let mut delivered = BytesMut::with_capacity(payload.len());
        self.expected_seq = self.expected_seq.wrapping_add(payload.len() as u32);
        delivered.put(payload);
        while let Some(next) = self.held.remove(&self.expected_seq) {
            self.bytes_held -= next.len();
            self.expected_seq = self.expected_seq.wrapping_add(next.len() as u32);
            delivered.put(next);
        }
        Offer::Delivered(delivered.freeze())
    }
}
