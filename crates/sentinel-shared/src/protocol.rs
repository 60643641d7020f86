//! Frames exchanged with the moderation backend and between page agents and
//! the relay.
//!
//! Every frame travels as one line of JSON. Backend frames use the
//! `{"event": ..., "data": ...}` envelope so that event names line up with
//! the backend's socket events (`register`, `message`, `user_list`).

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::constants::{ANONYMOUS_AUTHOR, MAX_FRAME_LEN};
use crate::error::ProtocolError;
use crate::types::SurfaceId;

/// `{user, text}` payload shared by chat sends, chat receives and
/// extraction events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatPayload {
    #[serde(rename = "user", default = "anonymous")]
    pub author: String,
    #[serde(default)]
    pub text: String,
}

fn anonymous() -> String {
    ANONYMOUS_AUTHOR.to_string()
}

impl ChatPayload {
    pub fn new(author: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            author: author.into(),
            text: text.into(),
        }
    }
}

/// Emitted once per newly observed message element.
pub type ExtractionEvent = ChatPayload;

/// Alert pushed from the relay to a page presenter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertPush {
    pub text: String,
}

/// Online roster as broadcast by the backend.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresenceUpdate {
    #[serde(default)]
    pub count: usize,
    #[serde(default)]
    pub users: Vec<String>,
}

/// Frames sent *to* the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ClientFrame {
    /// Identity handshake carrying the display name.
    Register(String),
    /// Arbitrary text submission.
    Message(ChatPayload),
}

/// Frames received *from* the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ServerFrame {
    /// Chat message or moderation notice; warnings are told apart lexically.
    Message(ChatPayload),
    /// Full replacement of the online roster.
    UserList(PresenceUpdate),
}

/// Frames sent by a page agent to the relay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SurfaceFrame {
    Attach { surface: SurfaceId, focused: bool },
    Focus,
    Extracted(ExtractionEvent),
    Reconnect,
    Detach,
}

/// Frames sent by the relay to a page agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PresenterFrame {
    Alert(AlertPush),
}

/// Serialize a frame to a single JSON line (without the trailing newline).
pub fn encode_line<T: Serialize>(frame: &T) -> Result<String, ProtocolError> {
    let line = serde_json::to_string(frame)?;
    if line.len() > MAX_FRAME_LEN {
        return Err(ProtocolError::TooLarge {
            len: line.len(),
            max: MAX_FRAME_LEN,
        });
    }
    Ok(line)
}

pub fn decode_line<T: DeserializeOwned>(line: &str) -> Result<T, ProtocolError> {
    if line.len() > MAX_FRAME_LEN {
        return Err(ProtocolError::TooLarge {
            len: line.len(),
            max: MAX_FRAME_LEN,
        });
    }
    Ok(serde_json::from_str(line.trim())?)
}
