use thiserror::Error;

#[derive(Error, Debug)]
pub enum WireError {
    /// The datagram is smaller than the 12-byte fixed header.
    #[error("frame too short: {len} bytes, need at least 12")]
    ShortFrame { len: usize },
}

pub type Result<T> = std::result::Result<T, WireError>;
