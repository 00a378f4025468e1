use log::{Level, info, logger, warn};
use rivulet::{cli, workload};
use rivulet_log::RivuletLogger;
use rivulet_transport::consts::{BENCHMARK_TIMEOUT, INTERACTIVE_TIMEOUT, SERVER_PORT};
use rivulet_transport::{Sender, TransportError};
use std::net::{Ipv4Addr, SocketAddr};
use tokio::time::Instant;

#[derive(thiserror::Error, Debug)]
enum AppError {
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
    #[error("logger error: {0}")]
    Logger(#[from] log::SetLoggerError),
}

type Result<T> = std::result::Result<T, AppError>;

#[tokio::main]
async fn main() -> Result<()> {
    let options = match cli::parse(std::env::args().skip(1)) {
        Ok(options) => options,
        Err(e) => {
            eprintln!("{e}\n{}", cli::USAGE);
            std::process::exit(2);
        }
    };

    // The benchmark floods the link; keep its logs at Info so the console
    // does not become the bottleneck.
    let level = if options.benchmark { Level::Info } else { Level::Debug };
    RivuletLogger::init(level)?;

    let peer: SocketAddr = (Ipv4Addr::LOCALHOST, SERVER_PORT).into();
    let ack_timeout = if options.benchmark { BENCHMARK_TIMEOUT } else { INTERACTIVE_TIMEOUT };
    let mut sender = Sender::connect(peer, ack_timeout).await?;

    if options.crypto {
        match sender.negotiate_encryption().await {
            Ok(()) => {}
            Err(TransportError::HandshakeRejected) => {
                warn!("peer rejected the cipher handshake, continuing in clear");
            }
            Err(e) => return Err(e.into()),
        }
    }

    let payloads = if options.benchmark { workload::benchmark() } else { workload::demo() };
    let segment_count = payloads.len();
    info!("submitting {} payloads to {}", segment_count, peer);

    let started = Instant::now();
    sender.send_data(payloads).await?;
    let elapsed = started.elapsed();

    let stats = sender.stats();
    let throughput = stats.bytes_sent as f64 / elapsed.as_secs_f64().max(f64::EPSILON);
    info!(
        "done: {} payloads ({} bytes) in {:.2}s, {:.0} B/s",
        segment_count,
        stats.bytes_sent,
        elapsed.as_secs_f64(),
        throughput
    );
    info!(
        "segments={} acks={} retransmissions={} (fast={}) timeouts={}",
        stats.segments_sent,
        stats.acks_received,
        stats.retransmissions,
        stats.fast_retransmits,
        stats.timeouts
    );
    info!(
        "final cwnd={} ssthresh={} ({:?})",
        sender.congestion().cwnd(),
        sender.congestion().ssthresh(),
        sender.congestion().phase()
    );
    logger().flush();

    Ok(())
}
