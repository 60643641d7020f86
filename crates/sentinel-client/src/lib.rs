//! # sentinel-client
//!
//! Chat client for the moderation backend: login, the session state
//! machine, typing debounce, presence and a render model any frontend can
//! draw from.

pub mod config;
pub mod driver;
pub mod log;
pub mod session;
pub mod typing;
pub mod view;

mod error;

pub use config::ClientConfig;
pub use driver::{spawn_session, SessionCommand, SessionHandle};
pub use error::{ClientError, Result};
pub use log::{MessageLog, PresenceRoster};
pub use session::{ChatSession, SessionPhase, SessionUpdate};
pub use typing::TypingIndicator;
pub use view::{ChatView, ConnectionBadge, EntryView};
