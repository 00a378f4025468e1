//! Retransmission buffer: segments sent but not yet cumulatively acknowledged.
//!
//! Keyed by sequence number in a `BTreeMap`, so the oldest in-flight segment
//! (the one a timeout must retransmit) is always the first entry, and a
//! cumulative ACK removes a whole prefix in one split. The entries partition
//! `[send_base, next_seq)` without overlap.

use rivulet_wire::Segment;
use std::collections::BTreeMap;
use std::time::Instant;

/// A sent segment awaiting acknowledgment.
#[derive(Debug, Clone)]
pub struct InFlight {
    pub segment: Segment,
    pub first_sent: Instant,
    /// Plaintext payload length. Sequence space is defined over plaintext
    /// bytes; the cipher is length-preserving so the two never diverge.
    pub payload_len: usize,
}

#[derive(Debug, Default)]
pub struct RetransmitBuffer {
    entries: BTreeMap<u32, InFlight>,
}

impl RetransmitBuffer {
    pub fn new() -> Self {
        Self { entries: BTreeMap::new() }
    }

    pub fn insert(&mut self, seq: u32, entry: InFlight) {
        debug_assert!(!self.entries.contains_key(&seq), "duplicate in-flight seq {seq}");
        self.entries.insert(seq, entry);
    }

    /// Drops every entry whose seq lies below the cumulative ACK.
    ///
    /// Returns how many segments the ACK covered.
    pub fn remove_all_below(&mut self, ack_num: u32) -> usize {
        let kept = self.entries.split_off(&ack_num);
        let dropped = std::mem::replace(&mut self.entries, kept);
        dropped.len()
    }

    pub fn get(&self, seq: u32) -> Option<&InFlight> {
        self.entries.get(&seq)
    }

    /// Mutable lookup, used to refresh the timestamp on retransmission.
    pub fn get_mut(&mut self, seq: u32) -> Option<&mut InFlight> {
        self.entries.get_mut(&seq)
    }

    /// Entry with the lowest seq; the timeout path retransmits this one.
    pub fn oldest(&self) -> Option<&InFlight> {
        self.entries.first_key_value().map(|(_, entry)| entry)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total payload bytes awaiting acknowledgment.
    pub fn bytes_buffered(&self) -> usize {
        self.entries.values().map(|e| e.payload_len).sum()
    }
}
