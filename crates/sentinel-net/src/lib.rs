// Backend transport: line-delimited JSON over TCP plus an owned,
// state-tracking connection handle.

pub mod connection;
pub mod error;
pub mod framing;
pub mod mock;
pub mod transport;

pub use connection::{BackendConnection, DropReason, SendOutcome};
pub use error::{NetError, Result};
pub use framing::{write_frame, FrameReader};
pub use transport::{Connector, Link, TcpConnector};
