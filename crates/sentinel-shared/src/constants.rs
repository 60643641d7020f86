/// Substrings that mark a text as a moderation warning.
pub const WARNING_MARKERS: [&str; 2] = ["⚠️", "⛔"];

/// Author used when an extracted element has no identity ancestor.
pub const UNKNOWN_AUTHOR: &str = "Unknown";

/// Author used when a chat frame arrives without a user field.
pub const ANONYMOUS_AUTHOR: &str = "Anonymous";

/// Attribute carrying the author identity on the monitored page.
pub const IDENTITY_ATTR: &str = "data-author-id";

/// Class name of message text elements on the monitored page.
pub const MESSAGE_CLASS: &str = "message-text";

/// How long an on-page alert notice stays visible, in seconds.
pub const NOTICE_DWELL_SECS: u64 = 5;

/// Typing indicator deadline after the last keystroke, in milliseconds.
pub const TYPING_DEADLINE_MS: u64 = 1000;

/// Default address of the moderation backend.
pub const DEFAULT_BACKEND_ADDR: &str = "127.0.0.1:5000";

/// Default local address the relay accepts page agents on.
pub const DEFAULT_SURFACE_ADDR: &str = "127.0.0.1:5055";

/// Capacity of the per-link frame channels.
pub const LINK_CHANNEL_CAPACITY: usize = 256;

/// Maximum accepted frame length in bytes (64 KiB).
pub const MAX_FRAME_LEN: usize = 65_536;
