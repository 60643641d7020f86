use thiserror::Error;

use sentinel_shared::error::ProtocolError;

/// Errors produced by the transport layer.
#[derive(Error, Debug)]
pub enum NetError {
    /// Socket level failure (connect, read, write).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A frame could not be encoded or decoded.
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// The remote side refused the connection attempt.
    #[error("Connection refused: {0}")]
    Refused(String),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, NetError>;
