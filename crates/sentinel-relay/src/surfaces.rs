//! Local socket accepting page agents.
//!
//! Each connection must open with an `attach` frame. After that its frames
//! are translated into [`BridgeEvent`]s, and alerts routed to the surface
//! are written back on the same socket.

use tokio::net::tcp::OwnedReadHalf;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use sentinel_net::{write_frame, FrameReader, NetError};
use sentinel_shared::protocol::{AlertPush, PresenterFrame, SurfaceFrame};
use sentinel_shared::types::SurfaceId;

use crate::bridge::BridgeEvent;
use crate::error::RelayError;

/// Accept page agents forever, one task per connection.
pub async fn serve_surfaces(
    listener: TcpListener,
    events: mpsc::Sender<BridgeEvent>,
    alert_queue: usize,
) {
    loop {
        match listener.accept().await {
            Ok((socket, addr)) => {
                debug!(addr = %addr, "Surface connection accepted");
                let events = events.clone();
                tokio::spawn(async move {
                    if let Err(e) = handle_surface(socket, events, alert_queue).await {
                        warn!(addr = %addr, error = %e, "Surface connection ended with error");
                    }
                });
            }
            Err(e) => {
                warn!(error = %e, "Failed to accept surface connection");
            }
        }
    }
}

async fn handle_surface(
    socket: TcpStream,
    events: mpsc::Sender<BridgeEvent>,
    alert_queue: usize,
) -> Result<(), RelayError> {
    let (read_half, mut write_half) = socket.into_split();
    let mut frames = FrameReader::new(read_half);

    let (surface, focused) = match frames.next::<SurfaceFrame>().await? {
        Some(SurfaceFrame::Attach { surface, focused }) => (surface, focused),
        Some(_) => return Err(RelayError::NotAttached("a frame")),
        None => return Ok(()),
    };

    let (alert_tx, mut alert_rx) = mpsc::channel::<AlertPush>(alert_queue);
    events
        .send(BridgeEvent::Attached {
            surface,
            focused,
            alerts: alert_tx,
        })
        .await
        .map_err(|_| RelayError::BridgeGone)?;

    let writer = tokio::spawn(async move {
        while let Some(alert) = alert_rx.recv().await {
            if let Err(e) = write_frame(&mut write_half, &PresenterFrame::Alert(alert)).await {
                warn!(surface = %surface, error = %e, "Failed to push alert to surface");
                break;
            }
        }
    });

    let result = pump_surface(&mut frames, &events, surface).await;

    let _ = events.send(BridgeEvent::Detached(surface)).await;
    writer.abort();
    info!(surface = %surface, "Surface connection closed");
    result
}

async fn pump_surface(
    frames: &mut FrameReader<OwnedReadHalf>,
    events: &mpsc::Sender<BridgeEvent>,
    surface: SurfaceId,
) -> Result<(), RelayError> {
    loop {
        let event = match frames.next::<SurfaceFrame>().await {
            Ok(Some(SurfaceFrame::Focus)) => BridgeEvent::Focused(surface),
            Ok(Some(SurfaceFrame::Extracted(event))) => BridgeEvent::Extracted { surface, event },
            Ok(Some(SurfaceFrame::Reconnect)) => BridgeEvent::Reconnect(surface),
            Ok(Some(SurfaceFrame::Attach { .. })) => {
                debug!(surface = %surface, "Duplicate attach ignored");
                continue;
            }
            Ok(Some(SurfaceFrame::Detach)) | Ok(None) => return Ok(()),
            Err(NetError::Protocol(e)) => {
                warn!(surface = %surface, error = %e, "Skipping malformed surface frame");
                continue;
            }
            Err(e) => return Err(e.into()),
        };

        events.send(event).await.map_err(|_| RelayError::BridgeGone)?;
    }
}
