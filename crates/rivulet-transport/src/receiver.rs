//! Receiver engine.
//!
//! Decodes inbound datagrams, runs the cipher handshake, admits payloads to
//! the reorder buffer, and answers every accepted datagram with a cumulative
//! ACK carrying the advertised window (`BUFFER_SIZE` minus the bytes parked
//! out of order).

use crate::consts::{BUFFER_SIZE, INITIAL_SEQ};
use crate::error::Result;
use crate::reorder::{Offer, ReorderBuffer};
use bytes::{BufMut, Bytes, BytesMut};
use log::{debug, info, trace, warn};
use rivulet_wire::segment::{ACK, ENC, SYN};
use rivulet_wire::{Segment, WireError, XorCipher};
use tokio::net::UdpSocket;

pub struct Receiver {
    reorder: ReorderBuffer,
    delivered: BytesMut,
    cipher: XorCipher,
    decrypt_enabled: bool,
    loss_probability: f64,
}

impl Receiver {
    pub fn new() -> Self {
        Self::with_initial_seq(INITIAL_SEQ)
    }

    pub fn with_initial_seq(initial_seq: u32) -> Self {
        Self {
            reorder: ReorderBuffer::new(initial_seq),
            delivered: BytesMut::new(),
            cipher: XorCipher::default(),
            decrypt_enabled: false,
            loss_probability: 0.0,
        }
    }

    /// Enables the loss-injection knob on the serve loop. Production
    /// deployments leave this at 0.0;
    /// [`crate::consts::DEFAULT_LOSS_PROBABILITY`] is the demo setting.
    pub fn with_loss_probability(mut self, probability: f64) -> Self {
        self.loss_probability = probability.clamp(0.0, 1.0);
        self
    }

    /// Next in-order byte, which is also the cumulative ACK value.
    pub fn expected_seq(&self) -> u32 {
        self.reorder.expected_seq()
    }

    /// Bytes the reorder buffer currently parks out of order.
    pub fn bytes_held(&self) -> usize {
        self.reorder.bytes_held()
    }

    /// Drains the in-order byte stream delivered so far.
    pub fn take_delivered(&mut self) -> Bytes {
        self.delivered.split().freeze()
    }

    /// Processes one raw datagram and produces the segment to send back.
    ///
    /// A malformed frame surfaces as [`WireError`]; the caller logs it and
    /// keeps going. Duplicates, gaps, and handshakes are ordinary outcomes
    /// with an ACK reply.
    pub fn handle_datagram(&mut self, datagram: &[u8]) -> std::result::Result<Segment, WireError> {
        let segment = Segment::decode(datagram)?;
        trace!("received {}", segment);

        // Cipher handshake: store the key and confirm, without touching the
        // in-order frontier.
        if segment.has_flags(SYN | ENC) && !segment.payload.is_empty() {
            self.cipher = XorCipher::new(segment.payload.to_vec());
            self.decrypt_enabled = true;
            debug!("cipher handshake accepted ({} byte key)", segment.payload.len());
            return Ok(Segment::new(0, 0, ACK | ENC, BUFFER_SIZE as u16, Bytes::new()));
        }

        let payload = if segment.has_flags(ENC) && self.decrypt_enabled {
            self.cipher.decrypt(&segment.payload)
        } else {
            segment.payload.clone()
        };

        match self.reorder.offer(segment.seq, payload) {
            Offer::Delivered(stream) => {
                trace!(
                    "delivered {} bytes in order, frontier now {}",
                    stream.len(),
                    self.reorder.expected_seq()
                );
                self.delivered.put(stream);
            }
            Offer::Stored => {
                debug!(
                    "gap at {}: holding seq {} ({} bytes parked)",
                    self.reorder.expected_seq(),
                    segment.seq,
                    self.reorder.bytes_held()
                );
            }
            Offer::Duplicate => {
                debug!("duplicate seq {} below frontier {}", segment.seq, self.reorder.expected_seq());
            }
        }

        let advertised = BUFFER_SIZE.saturating_sub(self.reorder.bytes_held());
        Ok(Segment::new(
            0,
            self.reorder.expected_seq(),
            ACK,
            advertised as u16,
            Bytes::new(),
        ))
    }

    /// Drives the engine from a bound UDP socket until a socket error.
    ///
    /// Each accepted datagram is answered to its source address. With loss
    /// injection enabled, a datagram may be dropped before it reaches the
    /// engine, which is exactly the event the sender's recovery machinery
    /// exists for.
    pub async fn serve(&mut self, socket: &UdpSocket) -> Result<()> {
        let mut buf = [0u8; BUFFER_SIZE];
        let mut total_delivered: u64 = 0;
        info!("receiver listening on {}", socket.local_addr()?);

        loop {
            let (len, peer) = socket.recv_from(&mut buf).await?;

            if self.loss_probability > 0.0 && rand::random::<f64>() < self.loss_probability {
                debug!("loss injection: dropped {} byte datagram from {}", len, peer);
                continue;
            }

            match self.handle_datagram(&buf[..len]) {
                Ok(reply) => {
                    let delivered = self.take_delivered();
                    if !delivered.is_empty() {
                        total_delivered += delivered.len() as u64;
                        debug!(
                            "in-order stream advanced by {} bytes ({} total)",
                            delivered.len(),
                            total_delivered
                        );
                    }
                    trace!("replying {} to {}", reply, peer);
                    socket.send_to(&reply.encode(), peer).await?;
                }
                Err(e) => warn!("discarding datagram from {}: {}", peer, e),
            }
        }
    }
}

impl Default for Receiver {
    fn default() -> Self {
        Self::new()
    }
}
