//! Transport seam between a component and the moderation backend.
//!
//! A [`Connector`] opens a fresh [`Link`] on demand. The link is a pair of
//! typed channels; the tasks pumping the underlying socket are aborted when
//! the link is dropped, so dropping a link always closes the transport.

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::AbortHandle;
use tracing::{debug, info, warn};

use sentinel_shared::constants::LINK_CHANNEL_CAPACITY;
use sentinel_shared::protocol::{ClientFrame, ServerFrame};

use crate::error::{NetError, Result};
use crate::framing::{write_frame, FrameReader};

/// One live connection to the backend.
pub struct Link {
    /// Frames to deliver to the backend.
    pub outbound: mpsc::Sender<ClientFrame>,
    /// Frames delivered by the backend, in transport order. Yields `None`
    /// once the backend side has gone away.
    pub inbound: mpsc::Receiver<ServerFrame>,
    tasks: Vec<AbortHandle>,
}

impl Link {
    pub fn new(outbound: mpsc::Sender<ClientFrame>, inbound: mpsc::Receiver<ServerFrame>) -> Self {
        Self {
            outbound,
            inbound,
            tasks: Vec::new(),
        }
    }

    /// Tie background pump tasks to the lifetime of this link.
    pub fn with_tasks(mut self, tasks: Vec<AbortHandle>) -> Self {
        self.tasks = tasks;
        self
    }
}

impl Drop for Link {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}

/// Opens links to the backend.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self) -> Result<Link>;
}

/// Connects to a backend speaking line-delimited JSON over TCP.
#[derive(Debug, Clone)]
pub struct TcpConnector {
    addr: String,
}

impl TcpConnector {
    pub fn new(addr: impl Into<String>) -> Self {
        Self { addr: addr.into() }
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }
}

#[async_trait]
impl Connector for TcpConnector {
    async fn connect(&self) -> Result<Link> {
        let stream = TcpStream::connect(&self.addr).await?;
        stream.set_nodelay(true)?;
        let peer = stream.peer_addr()?;
        let (read_half, mut write_half) = stream.into_split();

        info!(addr = %peer, "Connected to backend");

        let (out_tx, mut out_rx) = mpsc::channel::<ClientFrame>(LINK_CHANNEL_CAPACITY);
        let (in_tx, in_rx) = mpsc::channel::<ServerFrame>(LINK_CHANNEL_CAPACITY);

        let writer = tokio::spawn(async move {
            while let Some(frame) = out_rx.recv().await {
                match write_frame(&mut write_half, &frame).await {
                    Ok(()) => {}
                    Err(NetError::Protocol(e)) => {
                        warn!(error = %e, "Unencodable frame dropped");
                    }
                    Err(e) => {
                        warn!(error = %e, "Failed to write frame to backend");
                        break;
                    }
                }
            }
            let _ = write_half.shutdown().await;
            debug!("Backend writer finished");
        });

        let reader = tokio::spawn(async move {
            let mut frames = FrameReader::new(read_half);
            loop {
                match frames.next::<ServerFrame>().await {
                    Ok(Some(frame)) => {
                        if in_tx.send(frame).await.is_err() {
                            break;
                        }
                    }
                    Ok(None) => {
                        info!(addr = %peer, "Backend closed the connection");
                        break;
                    }
                    Err(NetError::Protocol(e)) => {
                        warn!(error = %e, "Skipping malformed backend frame");
                    }
                    Err(e) => {
                        warn!(error = %e, "Backend read failed");
                        break;
                    }
                }
            }
        });

        Ok(Link::new(out_tx, in_rx).with_tasks(vec![writer.abort_handle(), reader.abort_handle()]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sentinel_shared::protocol::ChatPayload;
    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_tcp_link_roundtrip() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            let (read_half, mut write_half) = socket.into_split();
            let mut lines = BufReader::new(read_half).lines();
            let line = lines.next_line().await.unwrap().unwrap();
            write_half
                .write_all(b"{\"event\":\"user_list\",\"data\":{\"count\":1,\"users\":[\"alice\"]}}\n")
                .await
                .unwrap();
            line
        });

        let connector = TcpConnector::new(addr.to_string());
        let mut link = connector.connect().await.unwrap();
        link.outbound
            .send(ClientFrame::Register("alice".into()))
            .await
            .unwrap();

        let received = link.inbound.recv().await.unwrap();
        assert!(matches!(received, ServerFrame::UserList(ref u) if u.users == vec!["alice"]));

        let sent_line = server.await.unwrap();
        assert_eq!(sent_line, r#"{"event":"register","data":"alice"}"#);

        // Server task ended and dropped its socket: the link observes closure.
        assert!(link.inbound.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_writer_survives_oversized_frame() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            let mut lines = BufReader::new(socket).lines();
            lines.next_line().await.unwrap().unwrap()
        });

        let link = TcpConnector::new(addr.to_string()).connect().await.unwrap();
        let huge = "x".repeat(70_000);
        link.outbound
            .send(ClientFrame::Message(ChatPayload::new("alice", huge)))
            .await
            .unwrap();
        link.outbound
            .send(ClientFrame::Message(ChatPayload::new("alice", "hi")))
            .await
            .unwrap();

        let line = server.await.unwrap();
        assert_eq!(line, r#"{"event":"message","data":{"user":"alice","text":"hi"}}"#);
    }

    #[tokio::test]
    async fn test_connect_to_closed_port_fails() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let connector = TcpConnector::new(addr.to_string());
        assert!(matches!(connector.connect().await, Err(NetError::Io(_))));
    }
}
