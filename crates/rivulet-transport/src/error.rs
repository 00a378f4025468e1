use rivulet_wire::WireError;
use std::io;
use thiserror::Error;

/// Errors surfaced by the transport engines.
///
/// Ordinary packet loss is not represented here: timeouts, duplicate ACKs,
/// and malformed inbound datagrams are all recovered from locally.
#[derive(Error, Debug)]
pub enum TransportError {
    /// A socket-level failure (bind, send, receive).
    #[error("network I/O error: {0}")]
    Io(#[from] io::Error),

    /// A locally produced frame failed to decode. Inbound framing errors are
    /// logged and discarded instead.
    #[error("wire format error: {0}")]
    Wire(#[from] WireError),

    /// The peer answered the cipher handshake without the ACK|ENC flags.
    #[error("encryption handshake rejected by peer")]
    HandshakeRejected,
}

pub type Result<T> = std::result::Result<T, TransportError>;
