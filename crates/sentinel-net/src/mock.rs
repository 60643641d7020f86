//! In-process stand-in for the moderation backend.
//!
//! Behaves like the real service at its interface boundary: `register`
//! updates the roster and broadcasts a `user_list`, messages containing a
//! warning marker are echoed to their sender as a system notice, and every
//! other message is broadcast to all sessions, sender included.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::debug;

use sentinel_shared::classify::is_warning;
use sentinel_shared::constants::LINK_CHANNEL_CAPACITY;
use sentinel_shared::protocol::{ChatPayload, ClientFrame, PresenceUpdate, ServerFrame};

use crate::error::{NetError, Result};
use crate::transport::{Connector, Link};

/// Author the mock uses for moderation notices.
pub const SYSTEM_AUTHOR: &str = "⚠️ System";

#[derive(Default)]
struct MockState {
    sessions: BTreeMap<u64, MockSession>,
    next_session: u64,
    received: Vec<ClientFrame>,
    connects: usize,
    refuse: bool,
}

struct MockSession {
    username: Option<String>,
    tx: mpsc::Sender<ServerFrame>,
}

#[derive(Clone, Default)]
pub struct MockBackend {
    inner: Arc<Mutex<MockState>>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every frame received so far, in arrival order.
    pub fn received(&self) -> Vec<ClientFrame> {
        self.with_state(|s| s.received.clone()).unwrap_or_default()
    }

    /// Total number of accepted connection attempts.
    pub fn connection_count(&self) -> usize {
        self.with_state(|s| s.connects).unwrap_or_default()
    }

    pub fn active_sessions(&self) -> usize {
        self.with_state(|s| s.sessions.len()).unwrap_or_default()
    }

    pub fn refuse_connections(&self, refuse: bool) {
        self.with_state(|s| s.refuse = refuse);
    }

    /// Push a frame to every connected session.
    pub fn push(&self, frame: ServerFrame) {
        self.with_state(|s| broadcast(s, &frame));
    }

    /// Hang up on every session.
    pub fn drop_all(&self) {
        self.with_state(|s| s.sessions.clear());
    }

    fn with_state<T>(&self, f: impl FnOnce(&mut MockState) -> T) -> Option<T> {
        match self.inner.lock() {
            Ok(mut guard) => Some(f(&mut guard)),
            Err(_) => None,
        }
    }

    fn handle(&self, session: u64, frame: ClientFrame) {
        self.with_state(|s| {
            s.received.push(frame.clone());
            match frame {
                ClientFrame::Register(name) => {
                    if let Some(entry) = s.sessions.get_mut(&session) {
                        entry.username = Some(name);
                    }
                    broadcast_user_list(s);
                }
                ClientFrame::Message(payload) if is_warning(&payload.text) => {
                    if let Some(entry) = s.sessions.get(&session) {
                        let notice = ChatPayload::new(SYSTEM_AUTHOR, payload.text);
                        let _ = entry.tx.try_send(ServerFrame::Message(notice));
                    }
                }
                ClientFrame::Message(payload) => {
                    broadcast(s, &ServerFrame::Message(payload));
                }
            }
        });
    }

    fn disconnect(&self, session: u64) {
        self.with_state(|s| {
            if let Some(entry) = s.sessions.remove(&session) {
                if entry.username.is_some() {
                    broadcast_user_list(s);
                }
            }
        });
    }
}

fn broadcast(state: &MockState, frame: &ServerFrame) {
    for entry in state.sessions.values() {
        let _ = entry.tx.try_send(frame.clone());
    }
}

fn broadcast_user_list(state: &MockState) {
    let mut users: Vec<String> = state
        .sessions
        .values()
        .filter_map(|entry| entry.username.clone())
        .collect();
    users.sort();
    users.dedup();
    let update = PresenceUpdate {
        count: users.len(),
        users,
    };
    broadcast(state, &ServerFrame::UserList(update));
}

#[async_trait]
impl Connector for MockBackend {
    async fn connect(&self) -> Result<Link> {
        let (out_tx, mut out_rx) = mpsc::channel::<ClientFrame>(LINK_CHANNEL_CAPACITY);
        let (in_tx, in_rx) = mpsc::channel::<ServerFrame>(LINK_CHANNEL_CAPACITY);

        let session = self
            .with_state(|s| {
                if s.refuse {
                    return None;
                }
                let id = s.next_session;
                s.next_session += 1;
                s.connects += 1;
                s.sessions.insert(
                    id,
                    MockSession {
                        username: None,
                        tx: in_tx,
                    },
                );
                Some(id)
            })
            .flatten()
            .ok_or_else(|| NetError::Refused("mock backend refusing connections".into()))?;

        debug!(session, "Mock backend accepted connection");

        let backend = self.clone();
        tokio::spawn(async move {
            while let Some(frame) = out_rx.recv().await {
                backend.handle(session, frame);
            }
            backend.disconnect(session);
        });

        Ok(Link::new(out_tx, in_rx))
    }
}
