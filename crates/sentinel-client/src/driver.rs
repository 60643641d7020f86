//! Session task: owns one [`ChatSession`] and its backend connection.
//!
//! The UI talks to it through a [`SessionHandle`] and listens on the update
//! channel. Updates are best effort: when the UI falls behind they are
//! dropped, and [`SessionHandle::snapshot`] is the authoritative state. Everything runs on a single task: commands, inbound frames and
//! the typing deadline are handled one at a time, so cancelling and
//! re-arming the deadline can never interleave with its expiry.

use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info, warn};

use sentinel_net::{BackendConnection, Connector, SendOutcome};
use sentinel_shared::protocol::ClientFrame;

use crate::config::ClientConfig;
use crate::error::{ClientError, Result};
use crate::session::{ChatSession, SessionUpdate};
use crate::view::ChatView;

const COMMAND_CAPACITY: usize = 64;

/// Commands sent from the UI to the session task.
#[derive(Debug)]
pub enum SessionCommand {
    Login(String),
    /// The input field now holds this text.
    Input(String),
    Send(String),
    Reconnect,
    Snapshot(oneshot::Sender<ChatView>),
    Shutdown,
}

#[derive(Debug, Clone)]
pub struct SessionHandle {
    tx: mpsc::Sender<SessionCommand>,
}

impl SessionHandle {
    pub async fn login(&self, name: impl Into<String>) -> Result<()> {
        self.command(SessionCommand::Login(name.into())).await
    }

    pub async fn input(&self, text: impl Into<String>) -> Result<()> {
        self.command(SessionCommand::Input(text.into())).await
    }

    pub async fn send(&self, text: impl Into<String>) -> Result<()> {
        self.command(SessionCommand::Send(text.into())).await
    }

    pub async fn reconnect(&self) -> Result<()> {
        self.command(SessionCommand::Reconnect).await
    }

    pub async fn snapshot(&self) -> Result<ChatView> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.command(SessionCommand::Snapshot(reply_tx)).await?;
        reply_rx.await.map_err(|_| ClientError::SessionClosed)
    }

    pub async fn shutdown(&self) -> Result<()> {
        self.command(SessionCommand::Shutdown).await
    }

    async fn command(&self, cmd: SessionCommand) -> Result<()> {
        self.tx.send(cmd).await.map_err(|_| ClientError::SessionClosed)
    }
}

/// Spawn the session task.
///
/// The task stops on `Shutdown` or when every handle is dropped; either way
/// the session is torn down and the transport closed before it returns.
pub fn spawn_session<C>(
    connector: C,
    config: &ClientConfig,
) -> (SessionHandle, mpsc::Receiver<SessionUpdate>, JoinHandle<()>)
where
    C: Connector + 'static,
{
    let (cmd_tx, cmd_rx) = mpsc::channel(COMMAND_CAPACITY);
    let (update_tx, update_rx) = mpsc::channel(config.update_queue.max(1));

    let driver = SessionDriver {
        session: ChatSession::new(config.typing_deadline),
        conn: BackendConnection::new(connector),
        updates: update_tx,
    };
    let task = tokio::spawn(driver.run(cmd_rx));

    (SessionHandle { tx: cmd_tx }, update_rx, task)
}

struct SessionDriver<C> {
    session: ChatSession,
    conn: BackendConnection<C>,
    updates: mpsc::Sender<SessionUpdate>,
}

impl<C: Connector> SessionDriver<C> {
    async fn run(mut self, mut commands: mpsc::Receiver<SessionCommand>) {
        debug!("Chat session task started");

        loop {
            let deadline = self.session.typing_deadline();

            tokio::select! {
                cmd = commands.recv() => {
                    match cmd {
                        Some(SessionCommand::Shutdown) | None => break,
                        Some(cmd) => self.handle_command(cmd).await,
                    }
                }

                frame = self.conn.recv(), if self.conn.is_connected() => {
                    match frame {
                        Some(frame) => self.session.on_frame(frame),
                        None => {
                            warn!("Backend connection lost");
                            self.session.on_transport_lost();
                        }
                    }
                }

                _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    self.session.poll_typing(Instant::now());
                }
            }

            self.flush();
        }

        self.teardown();
    }

    async fn handle_command(&mut self, cmd: SessionCommand) {
        // Settle an overdue deadline before anything observes the state.
        self.session.poll_typing(Instant::now());

        match cmd {
            SessionCommand::Login(name) => {
                if self.session.submit_login(&name) {
                    self.connect().await;
                }
            }
            SessionCommand::Input(text) => self.session.on_input(&text, Instant::now()),
            SessionCommand::Send(text) => {
                if let Some(frame) = self.session.send(&text) {
                    self.transmit(frame);
                }
            }
            SessionCommand::Reconnect => {
                if self.session.begin_reconnect() {
                    self.connect().await;
                }
            }
            SessionCommand::Snapshot(reply) => {
                let _ = reply.send(ChatView::from_session(&self.session));
            }
            SessionCommand::Shutdown => {}
        }
    }

    async fn connect(&mut self) {
        if let Err(e) = self.conn.connect().await {
            warn!(error = %e, "Chat client could not reach the backend");
            self.session.on_connect_failed();
            return;
        }
        if !self.conn.is_connected() {
            self.session.on_connect_failed();
            return;
        }

        if let Some(register) = self.session.on_connected() {
            info!(user = ?self.session.user(), "Connected, registering");
            self.transmit(register);
        }
    }

    fn transmit(&mut self, frame: ClientFrame) {
        if let SendOutcome::Dropped(reason) = self.conn.send(frame) {
            debug!(reason = ?reason, "Outbound chat frame dropped");
            if !self.conn.is_connected() {
                self.session.on_transport_lost();
            }
        }
    }

    fn flush(&mut self) {
        for update in self.session.take_updates() {
            match self.updates.try_send(update) {
                Ok(()) => {}
                Err(TrySendError::Full(update)) => {
                    warn!(?update, "Update listener behind, dropping update");
                }
                Err(TrySendError::Closed(_)) => {
                    debug!("Update listener gone");
                }
            }
        }
    }

    fn teardown(&mut self) {
        self.flush();
        self.session.teardown();
        self.conn.close();
        info!("Chat session stopped");
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use sentinel_net::mock::{MockBackend, SYSTEM_AUTHOR};
    use sentinel_shared::protocol::{ChatPayload, PresenceUpdate};
    use tokio::time::timeout;

    use super::*;
    use crate::session::SessionPhase;

    const WAIT: Duration = Duration::from_secs(2);

    async fn next_matching(
        updates: &mut mpsc::Receiver<SessionUpdate>,
        mut pred: impl FnMut(&SessionUpdate) -> bool,
    ) -> SessionUpdate {
        timeout(WAIT, async {
            loop {
                match updates.recv().await {
                    Some(update) if pred(&update) => return update,
                    Some(_) => continue,
                    None => panic!("update channel closed"),
                }
            }
        })
        .await
        .unwrap()
    }

    async fn wait_connected(updates: &mut mpsc::Receiver<SessionUpdate>) {
        next_matching(updates, |u| {
            *u == SessionUpdate::PhaseChanged(SessionPhase::Connected)
        })
        .await;
    }

    #[tokio::test]
    async fn test_login_registers_and_receives_roster() {
        let backend = MockBackend::new();
        let (handle, mut updates, _task) = spawn_session(backend.clone(), &ClientConfig::default());

        handle.login("alice").await.unwrap();
        wait_connected(&mut updates).await;

        let roster = next_matching(&mut updates, |u| matches!(u, SessionUpdate::RosterReplaced(_))).await;
        assert_eq!(
            roster,
            SessionUpdate::RosterReplaced(PresenceUpdate {
                count: 1,
                users: vec!["alice".into()],
            })
        );
        assert_eq!(backend.received(), vec![ClientFrame::Register("alice".into())]);
    }

    #[tokio::test]
    async fn test_send_round_trip() {
        let backend = MockBackend::new();
        let (handle, mut updates, _task) = spawn_session(backend.clone(), &ClientConfig::default());
        handle.login("alice").await.unwrap();
        wait_connected(&mut updates).await;

        handle.send("   ").await.unwrap();
        handle.send("hello").await.unwrap();

        let update = next_matching(&mut updates, |u| matches!(u, SessionUpdate::MessageAppended(_))).await;
        match update {
            SessionUpdate::MessageAppended(m) => {
                assert_eq!(m.author, "alice");
                assert_eq!(m.text, "hello");
            }
            other => panic!("unexpected update: {other:?}"),
        }
        assert_eq!(
            backend.received(),
            vec![
                ClientFrame::Register("alice".into()),
                ClientFrame::Message(ChatPayload::new("alice", "hello")),
            ]
        );
    }

    #[tokio::test]
    async fn test_warning_echo_raises_alert() {
        let backend = MockBackend::new();
        let (handle, mut updates, _task) = spawn_session(backend.clone(), &ClientConfig::default());
        handle.login("bob").await.unwrap();
        wait_connected(&mut updates).await;

        handle.send("you ⛔ idiot").await.unwrap();

        let warning = next_matching(&mut updates, |u| matches!(u, SessionUpdate::WarningRaised(_))).await;
        assert_eq!(warning, SessionUpdate::WarningRaised("you ⛔ idiot".into()));

        let view = handle.snapshot().await.unwrap();
        let ChatView::Chat { entries, .. } = view else {
            panic!("expected chat view");
        };
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].author.name, SYSTEM_AUTHOR);
        assert!(entries[0].warning);
    }

    #[tokio::test]
    async fn test_send_while_disconnected_is_dropped() {
        let backend = MockBackend::new();
        backend.refuse_connections(true);
        let (handle, mut updates, _task) = spawn_session(backend.clone(), &ClientConfig::default());

        handle.login("alice").await.unwrap();
        next_matching(&mut updates, |u| {
            *u == SessionUpdate::PhaseChanged(SessionPhase::Disconnected)
        })
        .await;

        handle.send("anyone?").await.unwrap();
        let view = handle.snapshot().await.unwrap();
        assert!(matches!(view, ChatView::Chat { .. }));
        assert!(backend.received().is_empty());

        backend.refuse_connections(false);
        handle.reconnect().await.unwrap();
        wait_connected(&mut updates).await;
        assert_eq!(backend.received(), vec![ClientFrame::Register("alice".into())]);
    }

    #[tokio::test]
    async fn test_transport_loss_keeps_chat_view() {
        let backend = MockBackend::new();
        let (handle, mut updates, _task) = spawn_session(backend.clone(), &ClientConfig::default());
        handle.login("alice").await.unwrap();
        wait_connected(&mut updates).await;

        backend.drop_all();
        next_matching(&mut updates, |u| {
            *u == SessionUpdate::PhaseChanged(SessionPhase::Disconnected)
        })
        .await;

        match handle.snapshot().await.unwrap() {
            ChatView::Chat { badge, .. } => assert_eq!(badge, crate::view::ConnectionBadge::Offline),
            other => panic!("unexpected view: {other:?}"),
        }
        assert_eq!(backend.connection_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_typing_debounce_in_task() {
        let backend = MockBackend::new();
        let (handle, mut updates, _task) = spawn_session(backend, &ClientConfig::default());
        handle.login("alice").await.unwrap();
        wait_connected(&mut updates).await;

        let typing = |view: ChatView| match view {
            ChatView::Chat { typing, .. } => typing,
            ChatView::LoginGate => panic!("still at the login gate"),
        };

        handle.input("h").await.unwrap();
        assert!(typing(handle.snapshot().await.unwrap()));

        tokio::time::advance(Duration::from_millis(400)).await;
        handle.input("he").await.unwrap();
        tokio::time::advance(Duration::from_millis(999)).await;
        assert!(typing(handle.snapshot().await.unwrap()));

        tokio::time::advance(Duration::from_millis(1)).await;
        assert!(!typing(handle.snapshot().await.unwrap()));
    }

    #[tokio::test]
    async fn test_snapshot_complete_when_listener_lags() {
        let backend = MockBackend::new();
        let config = ClientConfig {
            update_queue: 4,
            ..ClientConfig::default()
        };
        let (handle, mut updates, _task) = spawn_session(backend, &config);
        handle.login("alice").await.unwrap();
        wait_connected(&mut updates).await;

        for i in 0..10 {
            handle.send(format!("m{i}")).await.unwrap();
        }

        let entries = timeout(WAIT, async {
            loop {
                if let ChatView::Chat { entries, .. } = handle.snapshot().await.unwrap() {
                    if entries.len() == 10 {
                        return entries;
                    }
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();
        assert_eq!(entries[9].text, "m9");

        let mut buffered = 0;
        while updates.try_recv().is_ok() {
            buffered += 1;
        }
        assert!(buffered <= 4);
    }

    #[tokio::test]
    async fn test_shutdown_cleans_up() {
        let backend = MockBackend::new();
        let (handle, mut updates, task) = spawn_session(backend.clone(), &ClientConfig::default());
        handle.login("alice").await.unwrap();
        wait_connected(&mut updates).await;
        handle.input("half typed").await.unwrap();

        handle.shutdown().await.unwrap();
        timeout(WAIT, task).await.unwrap().unwrap();

        assert!(matches!(handle.snapshot().await, Err(ClientError::SessionClosed)));
        timeout(WAIT, async {
            while backend.active_sessions() > 0 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();
    }
}
