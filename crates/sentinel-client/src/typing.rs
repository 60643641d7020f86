//! Debounced "is typing" flag.
//!
//! There is at most one pending deadline. Every keystroke cancels it and
//! arms a fresh one, so the flag only drops once the user has been quiet
//! for a full delay.

use std::time::Duration;

use tokio::time::Instant;

use sentinel_shared::constants::TYPING_DEADLINE_MS;

#[derive(Debug, Clone)]
pub struct TypingIndicator {
    is_typing: bool,
    deadline: Option<Instant>,
    delay: Duration,
}

impl TypingIndicator {
    pub fn new(delay: Duration) -> Self {
        Self {
            is_typing: false,
            deadline: None,
            delay,
        }
    }

    pub fn is_typing(&self) -> bool {
        self.is_typing
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Register a keystroke at `now`. Returns `true` if the flag went up.
    pub fn on_input(&mut self, now: Instant) -> bool {
        let raised = !self.is_typing;
        self.is_typing = true;
        // Cancel, then re-arm.
        self.deadline.take();
        self.deadline = Some(now + self.delay);
        raised
    }

    /// Drop the flag and the pending deadline. Returns `true` if the flag
    /// was up.
    pub fn cancel(&mut self) -> bool {
        self.deadline = None;
        std::mem::replace(&mut self.is_typing, false)
    }

    /// Fire the deadline if it has passed. Returns `true` if the flag went
    /// down.
    pub fn expire_if_due(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => self.cancel(),
            _ => false,
        }
    }
}

impl Default for TypingIndicator {
    fn default() -> Self {
        Self::new(Duration::from_millis(TYPING_DEADLINE_MS))
    }
}
