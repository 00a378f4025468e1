use log::{Level, error, info};
use rivulet::config;
use rivulet_log::RivuletLogger;
use rivulet_transport::{Receiver, TransportError};
use tokio::net::UdpSocket;

#[derive(thiserror::Error, Debug)]
enum AppError {
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("logger error: {0}")]
    Logger(#[from] log::SetLoggerError),
}

type Result<T> = std::result::Result<T, AppError>;

#[tokio::main]
async fn main() -> Result<()> {
    RivuletLogger::init(Level::Debug)?;

    let config = match config::handle() {
        Ok(config) => config,
        Err(e) => {
            error!("failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    let socket = UdpSocket::bind(config.network.address.as_str()).await?;
    if config.loss.probability > 0.0 {
        info!(
            "loss injection active: dropping {:.1}% of inbound datagrams",
            config.loss.probability * 100.0
        );
    }

    let mut receiver = Receiver::new().with_loss_probability(config.loss.probability);
    receiver.serve(&socket).await?;

    Ok(())
}
