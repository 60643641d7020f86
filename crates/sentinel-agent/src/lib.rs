//! # sentinel-agent
//!
//! Runs inside a monitored chat page: watches the document for new
//! messages, hands each one to the relay exactly once, and shows the
//! moderation alerts the relay pushes back.

pub mod config;
pub mod dom;
pub mod extract;
pub mod link;
pub mod page;
pub mod presenter;

mod error;

pub use config::AgentConfig;
pub use dom::{Document, MutationBatch, MutationRecord, NodeId};
pub use error::{AgentError, Result};
pub use extract::{CandidateSelector, ExtractionAgent};
pub use link::RelayLink;
pub use page::{PageAgent, PageSignal};
pub use presenter::{AlertPresenter, NOTICE_CLASS};
