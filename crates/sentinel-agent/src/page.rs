//! Per-page runtime tying extraction and presentation to the relay link.
//!
//! The host owns the document and signals the agent after it mutates it;
//! the agent drains the queued mutation records, forwards new messages and
//! renders alerts pushed back by the relay. Everything runs on one task.

use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use sentinel_net::NetError;
use sentinel_shared::protocol::{AlertPush, ExtractionEvent};
use sentinel_shared::types::SurfaceId;

use crate::config::AgentConfig;
use crate::dom::{Document, NodeId};
use crate::error::{AgentError, Result};
use crate::extract::ExtractionAgent;
use crate::link::RelayLink;
use crate::presenter::AlertPresenter;

/// Signals from the hosting page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageSignal {
    /// The document changed; drain its mutation queue.
    Mutated,
    /// The page gained focus.
    Focused,
    /// Ask the relay to re-open its backend link.
    Reconnect,
    /// The page is going away.
    Unload,
}

pub struct PageAgent {
    surface: SurfaceId,
    doc: Arc<Mutex<Document>>,
    extractor: ExtractionAgent,
    presenter: AlertPresenter,
    start_focused: bool,
}

impl PageAgent {
    pub fn new(doc: Arc<Mutex<Document>>, config: &AgentConfig) -> Self {
        Self {
            surface: SurfaceId::new(),
            extractor: ExtractionAgent::new(config.selector.clone()),
            presenter: AlertPresenter::with_dwell(doc.clone(), config.notice_dwell),
            doc,
            start_focused: config.start_focused,
        }
    }

    pub fn surface(&self) -> SurfaceId {
        self.surface
    }

    pub fn presenter(&self) -> &AlertPresenter {
        &self.presenter
    }

    /// Drain queued mutations and extract whatever they revealed.
    pub fn process_pending(&mut self) -> Vec<ExtractionEvent> {
        let mut doc = match self.doc.lock() {
            Ok(d) => d,
            Err(_) => {
                warn!("Document lock poisoned, skipping mutation batch");
                return Vec::new();
            }
        };
        let batch = doc.take_mutations();
        if batch.is_empty() {
            return Vec::new();
        }
        self.extractor.observe(&doc, &batch)
    }

    pub fn on_alert(&self, alert: AlertPush) -> Option<NodeId> {
        self.presenter.present(&alert.text)
    }

    /// Connect to the relay at `config.relay_addr` and [`run`](Self::run).
    pub async fn connect_and_run(
        self,
        signals: mpsc::Receiver<PageSignal>,
        config: &AgentConfig,
    ) -> Result<()> {
        let link = RelayLink::connect(&config.relay_addr).await?;
        self.run(signals, link).await
    }

    /// Run until the page unloads, the signal channel closes or the relay
    /// goes away. Failures end the loop; they never panic the host.
    pub async fn run(mut self, mut signals: mpsc::Receiver<PageSignal>, mut link: RelayLink) -> Result<()> {
        link.attach(self.surface, self.start_focused).await?;
        info!(surface = %self.surface, "Page agent attached to relay");

        // Content already on the page when the agent starts.
        let initial = self.take_initial();
        for event in initial {
            forward(&mut link, event).await?;
        }

        loop {
            tokio::select! {
                signal = signals.recv() => {
                    match signal {
                        Some(PageSignal::Mutated) => {
                            for event in self.process_pending() {
                                forward(&mut link, event).await?;
                            }
                        }
                        Some(PageSignal::Focused) => link.focus().await?,
                        Some(PageSignal::Reconnect) => link.reconnect_backend().await?,
                        Some(PageSignal::Unload) | None => {
                            if let Err(e) = link.detach().await {
                                debug!(error = %e, "Detach not delivered");
                            }
                            break;
                        }
                    }
                }

                alert = link.recv_alert() => {
                    match alert? {
                        Some(alert) => {
                            self.on_alert(alert);
                        }
                        None => {
                            warn!(surface = %self.surface, "Relay closed the link");
                            break;
                        }
                    }
                }
            }
        }

        info!(surface = %self.surface, "Page agent stopped");
        Ok(())
    }

    fn take_initial(&mut self) -> Vec<ExtractionEvent> {
        let mut doc = match self.doc.lock() {
            Ok(d) => d,
            Err(_) => return Vec::new(),
        };
        // Anything queued so far is covered by the full scan.
        doc.take_mutations();
        self.extractor.scan(&doc)
    }
}

/// Hand one event to the relay. An event that cannot be framed is dropped;
/// the link is untouched since nothing was written.
async fn forward(link: &mut RelayLink, event: ExtractionEvent) -> Result<()> {
    match link.extracted(event).await {
        Err(AgentError::Net(NetError::Protocol(e))) => {
            warn!(error = %e, "Extraction event dropped");
            Ok(())
        }
        other => other,
    }
}
