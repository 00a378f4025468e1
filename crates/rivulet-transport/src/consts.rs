use std::time::Duration;

/// UDP port the receiver listens on.
pub const SERVER_PORT: u16 = 5005;
/// Receive buffer of the datagram socket, and the ceiling of the advertised window.
pub const BUFFER_SIZE: usize = 1024;
/// Largest payload a single segment carries.
pub const MSS: usize = 1000;
/// Sequence number both endpoints start from.
pub const INITIAL_SEQ: u32 = 100;
/// Initial slow-start threshold in bytes.
pub const INITIAL_SSTHRESH: u32 = 64000;
/// Segments pumped per burst before the sender blocks on ACKs.
pub const BURST_SIZE: usize = 5;

/// Ack wait for the interactive demo client.
pub const INTERACTIVE_TIMEOUT: Duration = Duration::from_secs(2);
/// Ack wait for the benchmark client.
pub const BENCHMARK_TIMEOUT: Duration = Duration::from_millis(200);
/// Fraction of inbound datagrams the server may drop to exercise recovery.
pub const DEFAULT_LOSS_PROBABILITY: f64 = 0.05;
