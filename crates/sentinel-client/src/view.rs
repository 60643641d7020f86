//! Render model for the chat UI.
//!
//! Everything a frontend needs to draw the current session, derived on
//! demand from [`ChatSession`]. Nothing here is stored back.

use chrono::{DateTime, Local, TimeZone, Utc};

use sentinel_shared::ChatMessage;

use crate::session::{ChatSession, SessionPhase};

/// Avatar colours, picked per user by [`user_color`].
pub const PALETTE: [&str; 5] = ["#007BDB", "#0066B2", "#65CFFF", "#8CE2DB", "#00C27D"];

/// Two-letter uppercase fallback shown when a user has no avatar.
pub fn avatar_initials(name: &str) -> String {
    name.chars().take(2).collect::<String>().to_uppercase()
}

/// Stable palette colour for `name`: sum of its UTF-16 code units modulo
/// the palette size.
pub fn user_color(name: &str) -> &'static str {
    let sum: usize = name.encode_utf16().map(usize::from).sum();
    PALETTE[sum % PALETTE.len()]
}

/// `HH:MM` in the given zone.
pub fn format_time<Tz: TimeZone>(timestamp: &DateTime<Utc>, zone: &Tz) -> String
where
    Tz::Offset: std::fmt::Display,
{
    timestamp.with_timezone(zone).format("%H:%M").to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionBadge {
    Connecting,
    Online,
    Offline,
}

impl ConnectionBadge {
    pub fn label(self) -> &'static str {
        match self {
            Self::Connecting => "connecting",
            Self::Online => "online",
            Self::Offline => "offline",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserBadge {
    pub name: String,
    pub initials: String,
    pub color: &'static str,
}

impl UserBadge {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            initials: avatar_initials(name),
            color: user_color(name),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryView {
    pub author: UserBadge,
    pub text: String,
    pub time: String,
    pub warning: bool,
    /// Sent by the logged-in user.
    pub own: bool,
}

impl EntryView {
    pub fn render<Tz: TimeZone>(message: &ChatMessage, user: Option<&str>, zone: &Tz) -> Self
    where
        Tz::Offset: std::fmt::Display,
    {
        Self {
            author: UserBadge::new(&message.author),
            text: message.text.clone(),
            time: format_time(&message.timestamp, zone),
            warning: message.is_warning(),
            own: user == Some(message.author.as_str()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RosterView {
    pub count: usize,
    pub users: Vec<UserBadge>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatView {
    /// No name submitted yet.
    LoginGate,
    Chat {
        user: UserBadge,
        badge: ConnectionBadge,
        entries: Vec<EntryView>,
        roster: RosterView,
        typing: bool,
        draft: String,
    },
}

impl ChatView {
    /// Render with local wall-clock times.
    pub fn from_session(session: &ChatSession) -> Self {
        Self::from_session_in(session, &Local)
    }

    pub fn from_session_in<Tz: TimeZone>(session: &ChatSession, zone: &Tz) -> Self
    where
        Tz::Offset: std::fmt::Display,
    {
        let user = match (session.phase(), session.user()) {
            (SessionPhase::LoggedOut, _) | (_, None) => return Self::LoginGate,
            (_, Some(user)) => user,
        };

        let badge = match session.phase() {
            SessionPhase::Connected => ConnectionBadge::Online,
            SessionPhase::Connecting => ConnectionBadge::Connecting,
            _ => ConnectionBadge::Offline,
        };

        let entries = session
            .log()
            .entries()
            .iter()
            .map(|m| EntryView::render(m, Some(user), zone))
            .collect();

        let roster = RosterView {
            count: session.roster().count(),
            users: session
                .roster()
                .users()
                .iter()
                .map(|name| UserBadge::new(name))
                .collect(),
        };

        Self::Chat {
            user: UserBadge::new(user),
            badge,
            entries,
            roster,
            typing: session.is_typing(),
            draft: session.draft().to_string(),
        }
    }
}
