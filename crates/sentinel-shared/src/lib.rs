pub mod classify;
pub mod constants;
pub mod error;
pub mod message;
pub mod protocol;
pub mod types;

pub use classify::{classify, is_warning, Classification};
pub use message::ChatMessage;
