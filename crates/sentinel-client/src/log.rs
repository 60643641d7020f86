//! Client-side message log and online roster.

use sentinel_shared::protocol::{ChatPayload, PresenceUpdate};
use sentinel_shared::ChatMessage;

/// Append-only log in arrival order. Receipt time is assigned locally.
#[derive(Debug, Clone, Default)]
pub struct MessageLog {
    entries: Vec<ChatMessage>,
}

impl MessageLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, payload: ChatPayload) -> &ChatMessage {
        self.entries
            .push(ChatMessage::received(payload.author, payload.text));
        &self.entries[self.entries.len() - 1]
    }

    pub fn entries(&self) -> &[ChatMessage] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn warnings(&self) -> impl Iterator<Item = &ChatMessage> {
        self.entries.iter().filter(|m| m.is_warning())
    }
}

/// Display names of online sessions, replaced wholesale on every push.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PresenceRoster {
    users: Vec<String>,
    count: usize,
}

impl PresenceRoster {
    pub fn replace(&mut self, update: PresenceUpdate) {
        self.users = update.users;
        self.count = update.count;
    }

    pub fn users(&self) -> &[String] {
        &self.users
    }

    pub fn count(&self) -> usize {
        self.count
    }
}
