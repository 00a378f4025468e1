//! TCP-Reno congestion controller.
//!
//! Additive-increase / multiplicative-decrease over a real-valued congestion
//! window. The controller is a value type owned by the sender; every state
//! transition goes through one of the `on_*` events so the AIMD behavior
//! stays auditable in one place.

use crate::consts::{INITIAL_SSTHRESH, MSS};
use log::trace;

/// Floor for the congestion window after any loss event.
const MIN_CWND: f64 = MSS as f64;
/// Floor for the slow-start threshold.
const MIN_SSTHRESH: f64 = 2.0 * MSS as f64;

/// Congestion phase, derived from the window/threshold relation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    SlowStart,
    CongestionAvoidance,
}

/// Reno congestion state: window, threshold, and duplicate-ACK bookkeeping.
///
/// `cwnd` is carried as `f64` on purpose. Congestion avoidance adds
/// `MSS²/cwnd` per new ACK, which is fractional; the remainder must survive
/// across updates for the additive-increase law to hold exactly.
#[derive(Debug, Clone)]
pub struct CongestionControl {
    cwnd: f64,
    ssthresh: f64,
    dup_ack_count: u8,
    last_ack_rcvd: u32,
}

impl CongestionControl {
    pub fn new(initial_ack: u32) -> Self {
        Self {
            cwnd: MSS as f64,
            ssthresh: INITIAL_SSTHRESH as f64,
            dup_ack_count: 0,
            last_ack_rcvd: initial_ack,
        }
    }

    #[cfg(test)]
    pub(crate) fn with_state(cwnd: f64, ssthresh: f64, last_ack_rcvd: u32) -> Self {
        Self { cwnd, ssthresh, dup_ack_count: 0, last_ack_rcvd }
    }

    /// Congestion window in whole bytes, truncated toward zero.
    pub fn cwnd(&self) -> u32 {
        self.cwnd as u32
    }

    /// Slow-start threshold in whole bytes.
    pub fn ssthresh(&self) -> u32 {
        self.ssthresh as u32
    }

    pub fn dup_ack_count(&self) -> u8 {
        self.dup_ack_count
    }

    pub fn last_ack_rcvd(&self) -> u32 {
        self.last_ack_rcvd
    }

    /// Slow start below the threshold, congestion avoidance at or above it.
    pub fn phase(&self) -> Phase {
        if self.cwnd < self.ssthresh {
            Phase::SlowStart
        } else {
            Phase::CongestionAvoidance
        }
    }

    /// An ACK advanced the cumulative frontier: grow the window.
    ///
    /// Exponential growth (one MSS per ACK) in slow start, `MSS²/cwnd` in
    /// congestion avoidance. Resets the duplicate counter.
    pub fn on_new_ack(&mut self, ack_num: u32) {
        debug_assert!(ack_num > self.last_ack_rcvd);
        self.dup_ack_count = 0;
        self.last_ack_rcvd = ack_num;
        match self.phase() {
            Phase::SlowStart => self.cwnd += MSS as f64,
            Phase::CongestionAvoidance => self.cwnd += (MSS * MSS) as f64 / self.cwnd,
        }
        trace!(
            "new ack {}: cwnd={:.1} ssthresh={:.0} ({:?})",
            ack_num,
            self.cwnd,
            self.ssthresh,
            self.phase()
        );
    }

    /// An ACK repeated the cumulative frontier.
    ///
    /// Returns `true` on exactly the third consecutive duplicate, signaling
    /// that the caller should fast-retransmit and enter recovery.
    pub fn on_duplicate_ack(&mut self, ack_num: u32) -> bool {
        debug_assert_eq!(ack_num, self.last_ack_rcvd);
        self.dup_ack_count = self.dup_ack_count.saturating_add(1);
        trace!("duplicate ack {} (count {})", ack_num, self.dup_ack_count);
        self.dup_ack_count == 3
    }

    /// Fast recovery, simplified Reno: halve into the threshold and resume
    /// in congestion avoidance.
    pub fn on_triple_dup_ack(&mut self) {
        self.ssthresh = (self.cwnd / 2.0).max(MIN_SSTHRESH);
        self.cwnd = self.ssthresh;
        self.dup_ack_count = 0;
        trace!(
            "fast recovery: cwnd={:.0} ssthresh={:.0}",
            self.cwnd, self.ssthresh
        );
    }

    /// Retransmission timeout: collapse to one MSS and restart slow start.
    pub fn on_timeout(&mut self) {
        self.ssthresh = (self.cwnd / 2.0).max(MIN_SSTHRESH);
        self.cwnd = MIN_CWND;
        self.dup_ack_count = 0;
        trace!(
            "timeout: cwnd={:.0} ssthresh={:.0}",
            self.cwnd, self.ssthresh
        );
    }

    /// Window gate over `min(cwnd, rwnd)`.
    ///
    /// Returns whether any byte may be sent at all, plus how many bytes of
    /// window remain beyond what is already in flight.
    pub fn can_send(&self, bytes_in_flight: u32, rwnd: u16) -> (bool, u32) {
        let window = self.cwnd().min(rwnd as u32);
        (bytes_in_flight < window, window.saturating_sub(bytes_in_flight))
    }
}
