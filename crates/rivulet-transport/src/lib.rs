//! # Rivulet Transport
//!
//! A reliable, ordered, flow-controlled byte-stream engine layered on UDP.
//! The sender side tracks in-flight segments, processes cumulative ACKs, and
//! runs a TCP-Reno congestion controller; the receiver side reorders
//! out-of-order segments, delivers an in-order byte stream, and advertises
//! its remaining buffer space back to the sender.

pub mod congestion;
pub mod consts;
pub mod error;
pub mod receiver;
pub mod reorder;
pub mod retransmit;
pub mod sender;

pub use congestion::{CongestionControl, Phase};
pub use consts::*;
pub use error::{Result, TransportError};
pub use receiver::Receiver;
pub use reorder::ReorderBuffer;
pub use retransmit::{InFlight, RetransmitBuffer};
pub use sender::{SendOutcome, Sender, SenderStats};
