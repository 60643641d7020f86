//! The relay bridge: one backend connection, many page surfaces.
//!
//! All surface traffic is funnelled into a single event channel and handled
//! on one task together with inbound backend frames, so every handler runs
//! to completion before the next event is looked at.

use std::ops::ControlFlow;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use sentinel_net::{BackendConnection, Connector, SendOutcome};
use sentinel_shared::classify::is_warning;
use sentinel_shared::protocol::{AlertPush, ClientFrame, ExtractionEvent, ServerFrame};
use sentinel_shared::types::{ConnectionState, SurfaceId};

use crate::registry::{DeliveryDrop, PresenterRegistry};

/// Events fed to the bridge by the surface listener.
#[derive(Debug)]
pub enum BridgeEvent {
    Attached {
        surface: SurfaceId,
        focused: bool,
        alerts: mpsc::Sender<AlertPush>,
    },
    Focused(SurfaceId),
    Extracted {
        surface: SurfaceId,
        event: ExtractionEvent,
    },
    /// A surface asked for the backend link to be re-opened.
    Reconnect(SurfaceId),
    Detached(SurfaceId),
    Shutdown,
}

/// What happened to an inbound backend frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertDelivery {
    Delivered(SurfaceId),
    /// Not a warning, or not a message at all.
    Ignored,
    Dropped(DeliveryDrop),
}

pub struct RelayBridge<C> {
    conn: BackendConnection<C>,
    registry: PresenterRegistry,
}

impl<C: Connector> RelayBridge<C> {
    pub fn new(connector: C) -> Self {
        Self {
            conn: BackendConnection::new(connector),
            registry: PresenterRegistry::new(),
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.conn.state()
    }

    pub fn registry(&self) -> &PresenterRegistry {
        &self.registry
    }

    /// Open the backend link if it is down. Failures are logged and leave
    /// the bridge `Disconnected`; they are never fatal.
    pub async fn connect(&mut self) -> bool {
        match self.conn.connect().await {
            Ok(established) => established,
            Err(e) => {
                warn!(error = %e, "Relay could not reach the moderation backend");
                false
            }
        }
    }

    /// Forward an extraction event unchanged, or drop it if the backend
    /// link is not up.
    pub fn forward(&mut self, event: ExtractionEvent) -> SendOutcome {
        let outcome = self.conn.send(ClientFrame::Message(event));
        if let SendOutcome::Dropped(reason) = outcome {
            debug!(reason = ?reason, "Extraction event dropped");
        }
        outcome
    }

    /// Route a backend frame: warnings go to the active surface.
    pub fn on_backend_frame(&mut self, frame: ServerFrame) -> AlertDelivery {
        let text = match frame {
            ServerFrame::Message(payload) => payload.text,
            ServerFrame::UserList(update) => {
                debug!(count = update.count, "Ignoring roster update");
                return AlertDelivery::Ignored;
            }
        };

        if !is_warning(&text) {
            return AlertDelivery::Ignored;
        }

        match self.registry.deliver(AlertPush { text }) {
            Ok(surface) => {
                info!(surface = %surface, "Alert pushed to surface");
                AlertDelivery::Delivered(surface)
            }
            Err(reason) => {
                warn!(reason = %reason, "Alert dropped");
                AlertDelivery::Dropped(reason)
            }
        }
    }

    pub async fn handle(&mut self, event: BridgeEvent) -> ControlFlow<()> {
        match event {
            BridgeEvent::Attached {
                surface,
                focused,
                alerts,
            } => {
                self.registry.attach(surface, alerts, focused);
                info!(
                    surface = %surface,
                    surfaces = self.registry.len(),
                    "Surface attached"
                );
            }
            BridgeEvent::Focused(surface) => {
                if !self.registry.focus(surface) {
                    debug!(surface = %surface, "Focus from unknown surface ignored");
                }
            }
            BridgeEvent::Extracted { surface, event } => {
                debug!(surface = %surface, author = %event.author, "Forwarding extraction");
                self.forward(event);
            }
            BridgeEvent::Reconnect(surface) => {
                info!(surface = %surface, state = %self.state(), "Reconnect requested");
                self.connect().await;
            }
            BridgeEvent::Detached(surface) => {
                self.registry.detach(surface);
                info!(surface = %surface, "Surface detached");
            }
            BridgeEvent::Shutdown => return ControlFlow::Break(()),
        }
        ControlFlow::Continue(())
    }

    /// Process surface events and backend frames until shutdown or until
    /// every event sender is gone. The backend link is closed on exit.
    pub async fn run(mut self, mut events: mpsc::Receiver<BridgeEvent>) {
        info!("Relay bridge started");

        loop {
            tokio::select! {
                event = events.recv() => {
                    match event {
                        Some(event) => {
                            if self.handle(event).await.is_break() {
                                info!("Relay bridge shutdown requested");
                                break;
                            }
                        }
                        None => break,
                    }
                }

                frame = self.conn.recv(), if self.conn.is_connected() => {
                    match frame {
                        Some(frame) => {
                            self.on_backend_frame(frame);
                        }
                        None => warn!("Backend link lost, waiting for a reconnect request"),
                    }
                }
            }
        }

        self.conn.close();
        info!("Relay bridge stopped");
    }
}
