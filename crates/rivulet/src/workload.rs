//! Synthetic payload generators for the client binaries.

use bytes::Bytes;

/// Number of segments the benchmark workload submits.
pub const BENCHMARK_SEGMENTS: usize = 10_000;
/// Approximate payload size of one benchmark segment.
pub const BENCHMARK_PAYLOAD_LEN: usize = 500;

/// The interactive demo: a handful of human-readable payloads, small enough
/// to watch individual segments in the verbose logs.
pub fn demo() -> Vec<Bytes> {
    [
        "a rivulet begins as a trickle",
        "each segment carries its place in the stream",
        "acknowledgments flow back cumulatively",
        "lost datagrams are retransmitted",
        "reordered datagrams wait in the gap buffer",
        "the window breathes with congestion",
        "flow control keeps the receiver afloat",
        "and the stream arrives intact",
    ]
    .into_iter()
    .map(|line| Bytes::from_static(line.as_bytes()))
    .collect()
}

/// The benchmark workload: many mid-sized payloads with a recognizable
/// prefix, padded to roughly half an MSS.
pub fn benchmark() -> Vec<Bytes> {
    (0..BENCHMARK_SEGMENTS)
        .map(|i| {
            let mut payload = format!("benchmark segment {i:05} ").into_bytes();
            payload.resize(BENCHMARK_PAYLOAD_LEN, b'.');
            Bytes::from(payload)
        })
        .collect()
}
