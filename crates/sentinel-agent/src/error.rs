use thiserror::Error;

use sentinel_net::NetError;

use crate::dom::NodeId;

/// Errors produced by the page agent.
#[derive(Error, Debug)]
pub enum AgentError {
    /// The node does not exist in the document (never created or removed).
    #[error("Unknown node: {0}")]
    UnknownNode(NodeId),

    /// Inserting the node would make it its own ancestor.
    #[error("Node {child} cannot be inserted under {parent}")]
    Hierarchy { parent: NodeId, child: NodeId },

    /// Relay socket failure.
    #[error("Relay link error: {0}")]
    Net(#[from] NetError),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, AgentError>;
