use thiserror::Error;

use sentinel_net::NetError;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Chat session has stopped")]
    SessionClosed,

    #[error("Network error: {0}")]
    Net(#[from] NetError),
}

pub type Result<T> = std::result::Result<T, ClientError>;
