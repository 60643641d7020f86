use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::classify::{classify, Classification};

/// A chat message as held in a local, append-only log.
///
/// The timestamp is always assigned by the receiving side; whatever the
/// sender claims is not trusted for ordering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub author: String,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    /// Build a message stamped with the current receipt time.
    pub fn received(author: impl Into<String>, text: impl Into<String>) -> Self {
        Self::at(author, text, Utc::now())
    }

    pub fn at(author: impl Into<String>, text: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            author: author.into(),
            text: text.into(),
            timestamp,
        }
    }

    /// Derived on every read, never stored.
    pub fn classification(&self) -> Classification {
        classify(&self.text)
    }

    pub fn is_warning(&self) -> bool {
        self.classification() == Classification::Warning
    }
}
