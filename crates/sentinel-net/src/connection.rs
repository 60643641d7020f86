//! Owned backend connection with explicit state tracking.
//!
//! Each component (the relay bridge, every chat session) holds its own
//! [`BackendConnection`]. Sends are fire-and-forget: a frame offered while
//! the connection is not `Connected` is dropped, never queued.

use sentinel_shared::protocol::{encode_line, ClientFrame, ServerFrame};
use sentinel_shared::types::ConnectionState;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::transport::{Connector, Link};

/// Why a frame did not reach the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    NotConnected,
    Backpressure,
    LinkClosed,
    /// The frame does not fit on the wire. The link stays up.
    TooLarge,
}

/// Result of offering a frame to the connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    Sent,
    Dropped(DropReason),
}

pub struct BackendConnection<C> {
    connector: C,
    link: Option<Link>,
    state_tx: watch::Sender<ConnectionState>,
}

impl<C: Connector> BackendConnection<C> {
    pub fn new(connector: C) -> Self {
        let (state_tx, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            connector,
            link: None,
            state_tx,
        }
    }

    pub fn state(&self) -> ConnectionState {
        *self.state_tx.borrow()
    }

    pub fn is_connected(&self) -> bool {
        self.state().is_connected()
    }

    /// Watch state transitions. Only real changes are published.
    pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.state_tx.subscribe()
    }

    /// Open the link unless one is already up or being opened.
    ///
    /// Returns `Ok(true)` when a new link was established and `Ok(false)`
    /// when the call was a no-op. A failed attempt leaves the connection
    /// `Disconnected`; calling `connect` again retries.
    pub async fn connect(&mut self) -> Result<bool> {
        if self.state() != ConnectionState::Disconnected {
            debug!(state = %self.state(), "Connect ignored, link already present");
            return Ok(false);
        }

        self.set_state(ConnectionState::Connecting);

        match self.connector.connect().await {
            Ok(link) => {
                self.link = Some(link);
                self.set_state(ConnectionState::Connected);
                info!("Backend connection established");
                Ok(true)
            }
            Err(e) => {
                self.set_state(ConnectionState::Disconnected);
                warn!(error = %e, "Backend connection attempt failed");
                Err(e)
            }
        }
    }

    /// Offer a frame to the backend without waiting.
    pub fn send(&mut self, frame: ClientFrame) -> SendOutcome {
        let link = match self.link.as_ref() {
            Some(link) if self.state().is_connected() => link,
            _ => return SendOutcome::Dropped(DropReason::NotConnected),
        };

        if let Err(e) = encode_line(&frame) {
            warn!(error = %e, "Refusing frame the backend link cannot carry");
            return SendOutcome::Dropped(DropReason::TooLarge);
        }

        match link.outbound.try_send(frame) {
            Ok(()) => SendOutcome::Sent,
            Err(TrySendError::Full(_)) => {
                warn!("Backend link saturated, dropping frame");
                SendOutcome::Dropped(DropReason::Backpressure)
            }
            Err(TrySendError::Closed(_)) => {
                self.mark_lost();
                SendOutcome::Dropped(DropReason::LinkClosed)
            }
        }
    }

    /// Next inbound frame. Returns `None` immediately when there is no
    /// link, and `None` after flipping to `Disconnected` when the link
    /// closes.
    pub async fn recv(&mut self) -> Option<ServerFrame> {
        let link = self.link.as_mut()?;
        let next = link.inbound.recv().await;
        if next.is_none() {
            self.mark_lost();
        }
        next
    }

    /// Drop the link (aborting its pump tasks) and go `Disconnected`.
    pub fn close(&mut self) {
        if self.link.take().is_some() {
            info!("Backend connection closed");
        }
        self.set_state(ConnectionState::Disconnected);
    }

    fn mark_lost(&mut self) {
        self.link = None;
        self.set_state(ConnectionState::Disconnected);
        warn!("Backend connection lost");
    }

    fn set_state(&self, next: ConnectionState) {
        self.state_tx.send_if_modified(|state| {
            if *state == next {
                false
            } else {
                debug!(from = %state, to = %next, "Connection state transition");
                *state = next;
                true
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::mock::MockBackend;
    use sentinel_shared::protocol::ChatPayload;

    fn message(text: &str) -> ClientFrame {
        ClientFrame::Message(ChatPayload::new("alice", text))
    }

    #[tokio::test]
    async fn test_connect_transitions_to_connected() {
        let backend = MockBackend::new();
        let mut conn = BackendConnection::new(backend.clone());
        assert_eq!(conn.state(), ConnectionState::Disconnected);

        assert!(conn.connect().await.unwrap());
        assert_eq!(conn.state(), ConnectionState::Connected);
        assert_eq!(backend.connection_count(), 1);
    }

    #[tokio::test]
    async fn test_connect_is_idempotent() {
        let backend = MockBackend::new();
        let mut conn = BackendConnection::new(backend.clone());
        let mut states = conn.subscribe();

        assert!(conn.connect().await.unwrap());
        states.borrow_and_update();

        assert!(!conn.connect().await.unwrap());
        assert!(!conn.connect().await.unwrap());

        assert_eq!(backend.connection_count(), 1);
        assert!(!states.has_changed().unwrap());
        assert_eq!(conn.state(), ConnectionState::Connected);
    }

    #[tokio::test]
    async fn test_send_while_disconnected_is_dropped() {
        let backend = MockBackend::new();
        let mut conn = BackendConnection::new(backend.clone());

        let outcome = conn.send(message("lost"));
        assert_eq!(outcome, SendOutcome::Dropped(DropReason::NotConnected));

        // A later connect must not flush anything offered earlier.
        conn.connect().await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(backend.received().is_empty());
    }

    #[tokio::test]
    async fn test_failed_connect_stays_disconnected_and_can_retry() {
        let backend = MockBackend::new();
        backend.refuse_connections(true);
        let mut conn = BackendConnection::new(backend.clone());

        assert!(conn.connect().await.is_err());
        assert_eq!(conn.state(), ConnectionState::Disconnected);

        backend.refuse_connections(false);
        assert!(conn.connect().await.unwrap());
        assert_eq!(conn.state(), ConnectionState::Connected);
    }

    #[tokio::test]
    async fn test_backend_hangup_moves_to_disconnected() {
        let backend = MockBackend::new();
        let mut conn = BackendConnection::new(backend.clone());
        conn.connect().await.unwrap();

        backend.drop_all();
        assert!(conn.recv().await.is_none());
        assert_eq!(conn.state(), ConnectionState::Disconnected);

        assert_eq!(
            conn.send(message("after hangup")),
            SendOutcome::Dropped(DropReason::NotConnected)
        );

        // Manual recovery.
        assert!(conn.connect().await.unwrap());
        assert_eq!(backend.connection_count(), 2);
    }

    #[tokio::test]
    async fn test_oversized_frame_dropped_link_stays_up() {
        let backend = MockBackend::new();
        let mut conn = BackendConnection::new(backend.clone());
        conn.connect().await.unwrap();

        let huge = "x".repeat(70_000);
        assert_eq!(conn.send(message(&huge)), SendOutcome::Dropped(DropReason::TooLarge));
        assert_eq!(conn.state(), ConnectionState::Connected);

        assert_eq!(conn.send(message("hi")), SendOutcome::Sent);
        match conn.recv().await {
            Some(ServerFrame::Message(p)) => assert_eq!(p.text, "hi"),
            other => panic!("unexpected frame: {other:?}"),
        }
        assert_eq!(backend.received(), vec![message("hi")]);
    }

    #[tokio::test]
    async fn test_recv_preserves_transport_order() {
        let backend = MockBackend::new();
        let mut conn = BackendConnection::new(backend.clone());
        conn.connect().await.unwrap();

        for i in 0..5 {
            assert_eq!(conn.send(message(&format!("m{i}"))), SendOutcome::Sent);
        }

        for i in 0..5 {
            match conn.recv().await {
                Some(ServerFrame::Message(p)) => assert_eq!(p.text, format!("m{i}")),
                other => panic!("unexpected frame: {other:?}"),
            }
        }
    }
}
