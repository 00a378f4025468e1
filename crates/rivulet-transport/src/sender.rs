//! Sender engine.
//!
//! Owns the outbound half of a session: sequence assignment, the window gate
//! `min(cwnd, rwnd)`, the retransmission buffer, and the Reno controller.
//! ACKs are drained one datagram at a time through [`Sender::poll_ack`]; the
//! receive timeout on that call doubles as the retransmission timer.

use crate::congestion::CongestionControl;
use crate::consts::{BUFFER_SIZE, BURST_SIZE, INITIAL_SEQ, MSS};
use crate::error::{Result, TransportError};
use crate::retransmit::{InFlight, RetransmitBuffer};
use bytes::Bytes;
use log::{debug, info, trace, warn};
use rivulet_wire::segment::{ACK, ENC, SYN};
use rivulet_wire::{Segment, XorCipher};
use std::collections::VecDeque;
use std::net::{Ipv4Addr, SocketAddr};
use std::time::{Duration, Instant};
use tokio::net::UdpSocket;
use tokio::time::timeout;

/// Whether a payload made it onto the wire or bounced off the window gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    Sent,
    /// The window has no room for this payload. The caller must drain at
    /// least one ACK before retrying.
    Blocked,
}

/// Counters for the end-of-run summary.
#[derive(Debug, Default, Clone)]
pub struct SenderStats {
    pub segments_sent: u64,
    pub bytes_sent: u64,
    pub acks_received: u64,
    pub retransmissions: u64,
    pub fast_retransmits: u64,
    pub timeouts: u64,
}

pub struct Sender {
    socket: UdpSocket,
    send_base: u32,
    next_seq: u32,
    rwnd: u16,
    cc: CongestionControl,
    in_flight: RetransmitBuffer,
    ack_timeout: Duration,
    cipher: XorCipher,
    encrypt_enabled: bool,
    stats: SenderStats,
}

impl Sender {
    /// Binds an ephemeral local socket and connects it to the peer.
    ///
    /// `ack_timeout` bounds each [`Sender::poll_ack`] call and thereby
    /// realizes the retransmission timer.
    pub async fn connect(peer: SocketAddr, ack_timeout: Duration) -> Result<Self> {
        let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0)).await?;
        socket.connect(peer).await?;
        info!("sender {} targeting {}", socket.local_addr()?, peer);

        Ok(Self {
            socket,
            send_base: INITIAL_SEQ,
            next_seq: INITIAL_SEQ,
            rwnd: BUFFER_SIZE as u16,
            cc: CongestionControl::new(INITIAL_SEQ),
            in_flight: RetransmitBuffer::new(),
            ack_timeout,
            cipher: XorCipher::default(),
            encrypt_enabled: false,
            stats: SenderStats::default(),
        })
    }

    /// Bytes sent but not yet cumulatively acknowledged.
    pub fn bytes_in_flight(&self) -> u32 {
        self.next_seq.wrapping_sub(self.send_base)
    }

    pub fn congestion(&self) -> &CongestionControl {
        &self.cc
    }

    pub fn stats(&self) -> &SenderStats {
        &self.stats
    }

    pub fn send_base(&self) -> u32 {
        self.send_base
    }

    pub fn next_seq(&self) -> u32 {
        self.next_seq
    }

    /// Last window the peer advertised.
    pub fn rwnd(&self) -> u16 {
        self.rwnd
    }

    /// Runs the single-shot cipher handshake.
    ///
    /// Generates a fresh session key, ships it under SYN|ENC, and waits for
    /// the ACK|ENC confirmation. Any other reply, or silence, surfaces as
    /// [`TransportError::HandshakeRejected`] so the caller can decide to
    /// continue in clear.
    pub async fn negotiate_encryption(&mut self) -> Result<()> {
        let key = XorCipher::generate_key();
        let hello = Segment::new(0, 0, SYN | ENC, 0, Bytes::copy_from_slice(&key));
        self.socket.send(&hello.encode()).await?;

        let mut buf = [0u8; BUFFER_SIZE];
        let reply = match timeout(self.ack_timeout, self.socket.recv(&mut buf)).await {
            Ok(received) => {
                let len = received?;
                Segment::decode(&buf[..len]).map_err(TransportError::Wire)?
            }
            Err(_) => {
                warn!("cipher handshake timed out");
                return Err(TransportError::HandshakeRejected);
            }
        };

        if !reply.has_flags(ACK | ENC) {
            warn!("peer declined cipher handshake: {}", reply);
            return Err(TransportError::HandshakeRejected);
        }

        self.rwnd = reply.window;
        self.cipher = XorCipher::new(key.to_vec());
        self.encrypt_enabled = true;
        info!("cipher handshake complete, key {}", hex::encode(key));
        Ok(())
    }

    /// Attempts to put one payload on the wire.
    ///
    /// The payload is rejected with [`SendOutcome::Blocked`] when it does not
    /// fit in `min(cwnd, rwnd)` beyond what is already in flight. On success
    /// the segment is recorded for retransmission and `next_seq` advances by
    /// the plaintext length.
    pub async fn send(&mut self, payload: Bytes) -> Result<SendOutcome> {
        debug_assert!(payload.len() <= MSS, "caller must honor MSS");

        let (_, available) = self.cc.can_send(self.bytes_in_flight(), self.rwnd);
        if payload.len() as u32 > available {
            debug!(
                "window closed: {} byte payload, {} available (cwnd={} rwnd={} in flight={})",
                payload.len(),
                available,
                self.cc.cwnd(),
                self.rwnd,
                self.bytes_in_flight()
            );
            return Ok(SendOutcome::Blocked);
        }

        let seq = self.next_seq;
        let (flags, wire_payload) = if self.encrypt_enabled {
            (ENC, self.cipher.encrypt(&payload))
        } else {
            (0, payload.clone())
        };
        let segment = Segment::new(seq, 0, flags, 0, wire_payload);

        self.socket.send(&segment.encode()).await?;
        trace!("sent {}", segment);

        self.in_flight.insert(
            seq,
            InFlight { segment, first_sent: Instant::now(), payload_len: payload.len() },
        );
        self.next_seq = self.next_seq.wrapping_add(payload.len() as u32);
        self.stats.segments_sent += 1;
        self.stats.bytes_sent += payload.len() as u64;

        Ok(SendOutcome::Sent)
    }

    /// Waits up to the configured timeout for one datagram from the peer.
    ///
    /// Returns `true` when a datagram arrived (malformed ones are logged and
    /// discarded). Returns `false` when the timer fired, in which case the
    /// Reno timeout reaction and the retransmission of the oldest unacked
    /// segment have already happened.
    pub async fn poll_ack(&mut self) -> Result<bool> {
        let mut buf = [0u8; BUFFER_SIZE];
        match timeout(self.ack_timeout, self.socket.recv(&mut buf)).await {
            Ok(received) => {
                let len = received?;
                match Segment::decode(&buf[..len]) {
                    Ok(segment) => self.process_ack(segment).await?,
                    Err(e) => warn!("discarding malformed datagram: {}", e),
                }
                Ok(true)
            }
            Err(_) => {
                self.handle_timeout().await?;
                Ok(false)
            }
        }
    }

    /// Sends every payload reliably, in order.
    ///
    /// Pumps bursts of up to [`BURST_SIZE`] segments, then drains ACKs 1:1.
    /// The burst size is a pacing hint only; correctness rests on the window
    /// gate. Returns once every payload is acknowledged.
    pub async fn send_data<I>(&mut self, payloads: I) -> Result<()>
    where
        I: IntoIterator<Item = Bytes>,
    {
        let mut queue: VecDeque<Bytes> = payloads.into_iter().collect();

        while !queue.is_empty() || !self.in_flight.is_empty() {
            let mut pumped = 0;
            while pumped < BURST_SIZE {
                let Some(payload) = queue.front() else { break };
                match self.send(payload.clone()).await? {
                    SendOutcome::Sent => {
                        queue.pop_front();
                        pumped += 1;
                    }
                    SendOutcome::Blocked => break,
                }
            }

            // One poll per pumped segment; a blocked iteration still polls
            // once so the window can reopen.
            for _ in 0..pumped.max(1) {
                self.poll_ack().await?;
                if self.in_flight.is_empty() {
                    break;
                }
            }
        }

        Ok(())
    }

    /// Applies one inbound segment to the sender state.
    async fn process_ack(&mut self, segment: Segment) -> Result<()> {
        // The advertised window is fresh information regardless of what the
        // ack number says.
        self.rwnd = segment.window;
        let ack = segment.ack;

        if ack > self.cc.last_ack_rcvd() {
            self.stats.acks_received += 1;
            self.cc.on_new_ack(ack);
            let covered = self.in_flight.remove_all_below(ack);
            self.send_base = ack;
            trace!(
                "ack {} covers {} segment(s), cwnd={} ({:?})",
                ack,
                covered,
                self.cc.cwnd(),
                self.cc.phase()
            );
        } else if ack == self.cc.last_ack_rcvd() {
            self.stats.acks_received += 1;
            if self.cc.on_duplicate_ack(ack) {
                self.cc.on_triple_dup_ack();
                debug!(
                    "triple duplicate ack {}: fast retransmit, cwnd={} ssthresh={}",
                    ack,
                    self.cc.cwnd(),
                    self.cc.ssthresh()
                );
                self.stats.fast_retransmits += 1;
                self.retransmit(ack).await?;
            }
        } else {
            trace!("ignoring stale ack {} below {}", ack, self.cc.last_ack_rcvd());
        }

        Ok(())
    }

    /// Reacts to a fired retransmission timer.
    async fn handle_timeout(&mut self) -> Result<()> {
        self.stats.timeouts += 1;
        self.cc.on_timeout();

        match self.in_flight.oldest().map(|e| e.segment.seq) {
            Some(seq) => {
                debug!(
                    "ack timeout: retransmitting oldest seq {}, cwnd={} ssthresh={}",
                    seq,
                    self.cc.cwnd(),
                    self.cc.ssthresh()
                );
                self.retransmit(seq).await
            }
            None => {
                debug!("ack timeout with nothing in flight");
                Ok(())
            }
        }
    }

    /// Re-sends a buffered segment: same bytes, fresh timestamp.
    async fn retransmit(&mut self, seq: u32) -> Result<()> {
        let Some(entry) = self.in_flight.get_mut(seq) else {
            warn!("retransmission of seq {} requested but it is not in flight", seq);
            return Ok(());
        };
        entry.first_sent = Instant::now();
        let wire = entry.segment.encode();

        self.socket.send(&wire).await?;
        self.stats.retransmissions += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn pair(ack_timeout: Duration) -> (Sender, UdpSocket) {
        let peer = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let sender = Sender::connect(peer.local_addr().unwrap(), ack_timeout).await.unwrap();
        (sender, peer)
    }

    async fn recv_segment(peer: &UdpSocket) -> (Segment, SocketAddr) {
        let mut buf = [0u8; BUFFER_SIZE];
        let (len, from) = peer.recv_from(&mut buf).await.unwrap();
        (Segment::decode(&buf[..len]).unwrap(), from)
    }

    async fn send_ack(peer: &UdpSocket, to: SocketAddr, ack: u32, window: u16) {
        let seg = Segment::new(0, ack, ACK, window, Bytes::new());
        peer.send_to(&seg.encode(), to).await.unwrap();
    }

    #[tokio::test]
    async fn five_in_order_sends_grow_the_window() {
        let (mut sender, peer) = pair(Duration::from_millis(500)).await;

        let mut expected_acks = Vec::new();
        for i in 0..5u8 {
            let payload = Bytes::from(vec![i; 24]);
            assert_eq!(sender.send(payload).await.unwrap(), SendOutcome::Sent);

            let (seg, from) = recv_segment(&peer).await;
            assert_eq!(seg.seq, 100 + i as u32 * 24);
            assert_eq!(seg.payload.len(), 24);

            let ack = seg.seq + 24;
            expected_acks.push(ack);
            send_ack(&peer, from, ack, BUFFER_SIZE as u16).await;
            assert!(sender.poll_ack().await.unwrap());
        }

        assert_eq!(expected_acks, vec![124, 148, 172, 196, 220]);
        assert_eq!(sender.send_base(), 220);
        assert_eq!(sender.next_seq(), 220);
        assert_eq!(sender.bytes_in_flight(), 0);
        // Five slow-start increments: 1000 + 5 * 1000.
        assert_eq!(sender.congestion().cwnd(), 6000);
        assert_eq!(sender.stats().acks_received, 5);
        assert_eq!(sender.stats().retransmissions, 0);
    }

    #[tokio::test]
    async fn triple_duplicate_ack_fast_retransmits_once() {
        let (mut sender, peer) = pair(Duration::from_millis(500)).await;
        sender.send_base = 1000;
        sender.next_seq = 1000;
        sender.cc = CongestionControl::with_state(8000.0, 64000.0, 1000);

        sender.send(Bytes::from(vec![0xAB; 24])).await.unwrap();
        let (original, from) = recv_segment(&peer).await;
        assert_eq!(original.seq, 1000);

        for _ in 0..3 {
            send_ack(&peer, from, 1000, BUFFER_SIZE as u16).await;
            assert!(sender.poll_ack().await.unwrap());
        }

        assert_eq!(sender.congestion().ssthresh(), 4000);
        assert_eq!(sender.congestion().cwnd(), 4000);
        assert_eq!(sender.congestion().dup_ack_count(), 0);
        assert_eq!(sender.stats().fast_retransmits, 1);

        // Exactly one retransmission of the segment at the duplicate ack.
        let (resent, _) = recv_segment(&peer).await;
        assert_eq!(resent, original);
        let mut buf = [0u8; BUFFER_SIZE];
        let extra = timeout(Duration::from_millis(100), peer.recv_from(&mut buf)).await;
        assert!(extra.is_err(), "only one retransmission expected");
    }

    #[tokio::test]
    async fn timeout_collapses_window_and_retransmits_oldest() {
        let (mut sender, peer) = pair(Duration::from_millis(100)).await;
        sender.cc = CongestionControl::with_state(8000.0, 64000.0, 100);

        sender.send(Bytes::from_static(b"first segment bytes ahoy")).await.unwrap();
        sender.send(Bytes::from_static(b"second segment bytes posthaste")).await.unwrap();
        let (first, _) = recv_segment(&peer).await;
        let (_second, _) = recv_segment(&peer).await;
        let next_seq_before = sender.next_seq();

        // Nothing acked: the poll must time out and recover.
        assert!(!sender.poll_ack().await.unwrap());

        assert_eq!(sender.congestion().ssthresh(), 4000);
        assert_eq!(sender.congestion().cwnd(), MSS as u32);
        assert_eq!(sender.next_seq(), next_seq_before, "next_seq never rolls back");
        assert_eq!(sender.stats().timeouts, 1);

        let (resent, _) = recv_segment(&peer).await;
        assert_eq!(resent, first, "oldest unacked segment is retransmitted");
    }

    #[tokio::test]
    async fn small_peer_window_blocks_larger_payloads() {
        let (mut sender, _peer) = pair(Duration::from_millis(100)).await;
        sender.cc = CongestionControl::with_state(10000.0, 64000.0, 100);
        sender.rwnd = 124;

        let outcome = sender.send(Bytes::from(vec![0u8; 125])).await.unwrap();
        assert_eq!(outcome, SendOutcome::Blocked);
        assert_eq!(sender.next_seq(), 100, "blocked send must not consume sequence space");
        assert_eq!(sender.stats().segments_sent, 0);

        let outcome = sender.send(Bytes::from(vec![0u8; 124])).await.unwrap();
        assert_eq!(outcome, SendOutcome::Sent);
    }

    #[tokio::test]
    async fn handshake_enables_payload_encryption() {
        let (mut sender, peer) = pair(Duration::from_millis(500)).await;

        let handshake = tokio::spawn(async move {
            let mut buf = [0u8; BUFFER_SIZE];
            let (len, from) = peer.recv_from(&mut buf).await.unwrap();
            let hello = Segment::decode(&buf[..len]).unwrap();
            assert!(hello.has_flags(SYN | ENC));
            assert_eq!(hello.payload.len(), 8);

            let reply = Segment::new(0, 0, ACK | ENC, BUFFER_SIZE as u16, Bytes::new());
            peer.send_to(&reply.encode(), from).await.unwrap();
            (peer, hello.payload)
        });

        sender.negotiate_encryption().await.unwrap();
        let (peer, key) = handshake.await.unwrap();

        sender.send(Bytes::from_static(b"top secret")).await.unwrap();
        let (seg, _) = recv_segment(&peer).await;
        assert!(seg.has_flags(ENC));
        assert_ne!(seg.payload.as_ref(), b"top secret");
        let cipher = XorCipher::new(key.to_vec());
        assert_eq!(cipher.decrypt(&seg.payload).as_ref(), b"top secret");
    }

    #[tokio::test]
    async fn handshake_without_enc_ack_is_rejected() {
        let (mut sender, peer) = pair(Duration::from_millis(500)).await;

        let refuse = tokio::spawn(async move {
            let mut buf = [0u8; BUFFER_SIZE];
            let (_, from) = peer.recv_from(&mut buf).await.unwrap();
            // Plain ACK, no ENC bit.
            let reply = Segment::new(0, 0, ACK, BUFFER_SIZE as u16, Bytes::new());
            peer.send_to(&reply.encode(), from).await.unwrap();
        });

        let result = sender.negotiate_encryption().await;
        assert!(matches!(result, Err(TransportError::HandshakeRejected)));
        refuse.await.unwrap();

        // A later data segment goes out in clear.
        sender.send(Bytes::from_static(b"clear")).await.unwrap();
        assert_eq!(sender.stats().segments_sent, 1);
    }

    #[tokio::test]
    async fn stale_ack_is_ignored() {
        let (mut sender, peer) = pair(Duration::from_millis(500)).await;

        sender.send(Bytes::from(vec![1u8; 24])).await.unwrap();
        sender.send(Bytes::from(vec![2u8; 24])).await.unwrap();
        let (_, from) = recv_segment(&peer).await;
        recv_segment(&peer).await;

        send_ack(&peer, from, 148, BUFFER_SIZE as u16).await;
        assert!(sender.poll_ack().await.unwrap());
        assert_eq!(sender.send_base(), 148);

        // An ack below the frontier neither regresses state nor counts as a
        // duplicate.
        send_ack(&peer, from, 124, BUFFER_SIZE as u16).await;
        assert!(sender.poll_ack().await.unwrap());
        assert_eq!(sender.send_base(), 148);
        assert_eq!(sender.congestion().dup_ack_count(), 0);
    }
}
