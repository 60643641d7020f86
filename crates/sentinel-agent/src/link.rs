//! Page agent side of the relay socket.

use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tracing::{debug, info, warn};

use sentinel_net::{write_frame, FrameReader, NetError};
use sentinel_shared::protocol::{AlertPush, ExtractionEvent, PresenterFrame, SurfaceFrame};
use sentinel_shared::types::SurfaceId;

use crate::error::Result;

pub struct RelayLink {
    reader: FrameReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
}

impl RelayLink {
    pub async fn connect(addr: &str) -> Result<Self> {
        let stream = TcpStream::connect(addr).await.map_err(NetError::from)?;
        stream.set_nodelay(true).map_err(NetError::from)?;
        info!(addr = %addr, "Connected to relay");
        Ok(Self::from_stream(stream))
    }

    pub fn from_stream(stream: TcpStream) -> Self {
        let (read_half, writer) = stream.into_split();
        Self {
            reader: FrameReader::new(read_half),
            writer,
        }
    }

    pub async fn send(&mut self, frame: &SurfaceFrame) -> Result<()> {
        write_frame(&mut self.writer, frame).await?;
        Ok(())
    }

    pub async fn attach(&mut self, surface: SurfaceId, focused: bool) -> Result<()> {
        self.send(&SurfaceFrame::Attach { surface, focused }).await
    }

    pub async fn focus(&mut self) -> Result<()> {
        self.send(&SurfaceFrame::Focus).await
    }

    pub async fn extracted(&mut self, event: ExtractionEvent) -> Result<()> {
        self.send(&SurfaceFrame::Extracted(event)).await
    }

    /// Ask the relay to re-open its backend connection.
    pub async fn reconnect_backend(&mut self) -> Result<()> {
        self.send(&SurfaceFrame::Reconnect).await
    }

    pub async fn detach(&mut self) -> Result<()> {
        self.send(&SurfaceFrame::Detach).await
    }

    /// Next alert from the relay; `None` once the relay hangs up.
    /// Malformed frames are logged and skipped.
    pub async fn recv_alert(&mut self) -> Result<Option<AlertPush>> {
        loop {
            match self.reader.next::<PresenterFrame>().await {
                Ok(Some(PresenterFrame::Alert(alert))) => {
                    debug!(len = alert.text.len(), "Alert received from relay");
                    return Ok(Some(alert));
                }
                Ok(None) => return Ok(None),
                Err(NetError::Protocol(e)) => {
                    warn!(error = %e, "Skipping malformed relay frame");
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}
