use thiserror::Error;

use sentinel_net::NetError;

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("Bridge event loop has stopped")]
    BridgeGone,

    #[error("Surface sent {0} before attaching")]
    NotAttached(&'static str),

    #[error("Network error: {0}")]
    Net(#[from] NetError),
}
