//! Chat session state machine.
//!
//! Pure state: no I/O and no clock of its own. The driver feeds it
//! transport events, backend frames and the current time, sends whatever
//! frames it hands back, and drains [`SessionUpdate`]s for the UI.
//!
//! ```text
//! LoggedOut --login--> Connecting --connected--> Connected
//!                          ^  |                     |
//!                reconnect |  | failed        lost  |
//!                          |  v                     v
//!                       Disconnected <--------------+
//! ```

use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, info};

use sentinel_shared::protocol::{ChatPayload, ClientFrame, PresenceUpdate, ServerFrame};
use sentinel_shared::ChatMessage;

use crate::log::{MessageLog, PresenceRoster};
use crate::typing::TypingIndicator;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    LoggedOut,
    Connecting,
    Connected,
    /// Transport lost. The chat view stays up with a negative status.
    Disconnected,
}

impl SessionPhase {
    pub fn in_chat(self) -> bool {
        self != Self::LoggedOut
    }
}

/// Observable changes, in the order they happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionUpdate {
    PhaseChanged(SessionPhase),
    MessageAppended(ChatMessage),
    /// A received message carried a warning marker.
    WarningRaised(String),
    RosterReplaced(PresenceUpdate),
    TypingChanged(bool),
}

#[derive(Debug)]
pub struct ChatSession {
    user: Option<String>,
    phase: SessionPhase,
    log: MessageLog,
    roster: PresenceRoster,
    typing: TypingIndicator,
    draft: String,
    torn_down: bool,
    updates: Vec<SessionUpdate>,
}

impl ChatSession {
    pub fn new(typing_delay: Duration) -> Self {
        Self {
            user: None,
            phase: SessionPhase::LoggedOut,
            log: MessageLog::new(),
            roster: PresenceRoster::default(),
            typing: TypingIndicator::new(typing_delay),
            draft: String::new(),
            torn_down: false,
            updates: Vec::new(),
        }
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn user(&self) -> Option<&str> {
        self.user.as_deref()
    }

    pub fn log(&self) -> &MessageLog {
        &self.log
    }

    pub fn roster(&self) -> &PresenceRoster {
        &self.roster
    }

    pub fn is_typing(&self) -> bool {
        self.typing.is_typing()
    }

    pub fn typing_deadline(&self) -> Option<Instant> {
        if self.torn_down {
            return None;
        }
        self.typing.deadline()
    }

    pub fn draft(&self) -> &str {
        &self.draft
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    /// Drain the updates produced since the last call.
    pub fn take_updates(&mut self) -> Vec<SessionUpdate> {
        std::mem::take(&mut self.updates)
    }

    /// Accept a display name and move to `Connecting`. Blank names are
    /// ignored. Returns `true` when the caller should open the transport.
    pub fn submit_login(&mut self, name: &str) -> bool {
        if self.torn_down || self.phase != SessionPhase::LoggedOut {
            return false;
        }
        let name = name.trim();
        if name.is_empty() {
            return false;
        }

        info!(user = %name, "Logging in");
        self.user = Some(name.to_string());
        self.set_phase(SessionPhase::Connecting);
        true
    }

    /// Manual retry from `Disconnected`. Returns `true` when the caller
    /// should open the transport.
    pub fn begin_reconnect(&mut self) -> bool {
        if self.torn_down || self.phase != SessionPhase::Disconnected {
            return false;
        }
        self.set_phase(SessionPhase::Connecting);
        true
    }

    /// The transport is up. Returns the registration frame to send first.
    pub fn on_connected(&mut self) -> Option<ClientFrame> {
        if self.torn_down || self.phase != SessionPhase::Connecting {
            return None;
        }
        let user = self.user.clone()?;
        self.set_phase(SessionPhase::Connected);
        Some(ClientFrame::Register(user))
    }

    pub fn on_connect_failed(&mut self) {
        if !self.torn_down && self.phase == SessionPhase::Connecting {
            self.set_phase(SessionPhase::Disconnected);
        }
    }

    pub fn on_transport_lost(&mut self) {
        if self.torn_down {
            return;
        }
        if matches!(self.phase, SessionPhase::Connecting | SessionPhase::Connected) {
            self.set_phase(SessionPhase::Disconnected);
        }
    }

    /// The input field changed.
    pub fn on_input(&mut self, text: &str, now: Instant) {
        if self.torn_down || !self.phase.in_chat() {
            return;
        }
        self.draft = text.to_string();
        if self.typing.on_input(now) {
            self.updates.push(SessionUpdate::TypingChanged(true));
        }
    }

    /// Build the frame for `text`, or `None` if it is blank or the session
    /// is not connected. Sending clears the draft and the typing flag.
    pub fn send(&mut self, text: &str) -> Option<ClientFrame> {
        if self.torn_down || self.phase != SessionPhase::Connected || text.trim().is_empty() {
            return None;
        }
        let user = self.user.clone()?;

        self.draft.clear();
        if self.typing.cancel() {
            self.updates.push(SessionUpdate::TypingChanged(false));
        }
        Some(ClientFrame::Message(ChatPayload::new(user, text)))
    }

    /// Send whatever is in the input field.
    pub fn send_draft(&mut self) -> Option<ClientFrame> {
        let text = self.draft.clone();
        self.send(&text)
    }

    pub fn on_frame(&mut self, frame: ServerFrame) {
        if self.torn_down || !self.phase.in_chat() {
            debug!("Frame ignored outside an active session");
            return;
        }

        match frame {
            ServerFrame::Message(payload) => {
                let message = self.log.append(payload).clone();
                let warning = message.is_warning();
                let text = message.text.clone();
                self.updates.push(SessionUpdate::MessageAppended(message));
                if warning {
                    self.updates.push(SessionUpdate::WarningRaised(text));
                }
            }
            ServerFrame::UserList(update) => {
                self.roster.replace(update.clone());
                self.updates.push(SessionUpdate::RosterReplaced(update));
            }
        }
    }

    /// Fire the typing deadline if it is due.
    pub fn poll_typing(&mut self, now: Instant) {
        if self.torn_down {
            return;
        }
        if self.typing.expire_if_due(now) {
            self.updates.push(SessionUpdate::TypingChanged(false));
        }
    }

    /// Stop reacting to anything. The typing deadline is cancelled and no
    /// further updates are produced.
    pub fn teardown(&mut self) {
        if self.torn_down {
            return;
        }
        self.torn_down = true;
        self.typing.cancel();
        self.updates.clear();
        debug!("Session torn down");
    }

    fn set_phase(&mut self, phase: SessionPhase) {
        if self.phase != phase {
            debug!(from = ?self.phase, to = ?phase, "Session phase change");
            self.phase = phase;
            self.updates.push(SessionUpdate::PhaseChanged(phase));
        }
    }
}

impl Default for ChatSession {
    fn default() -> Self {
        Self::new(Duration::from_millis(sentinel_shared::constants::TYPING_DEADLINE_MS))
    }
}
