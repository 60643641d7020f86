//! Explicit registry of page presenters.
//!
//! Maps every attached surface to the channel feeding its alert presenter
//! and remembers which surface currently has focus. Alerts only ever go to
//! the focused surface; when there is none the alert is dropped with a
//! recorded reason.

use std::collections::HashMap;

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::debug;

use sentinel_shared::protocol::AlertPush;
use sentinel_shared::types::SurfaceId;

/// Why an alert never reached a presenter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryDrop {
    NoActiveSurface,
    SurfaceClosed(SurfaceId),
    SurfaceBusy(SurfaceId),
}

impl std::fmt::Display for DeliveryDrop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoActiveSurface => f.write_str("no active surface"),
            Self::SurfaceClosed(id) => write!(f, "surface {} closed", id.short()),
            Self::SurfaceBusy(id) => write!(f, "surface {} busy", id.short()),
        }
    }
}

#[derive(Debug, Default)]
pub struct PresenterRegistry {
    presenters: HashMap<SurfaceId, mpsc::Sender<AlertPush>>,
    active: Option<SurfaceId>,
}

impl PresenterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attach(&mut self, surface: SurfaceId, presenter: mpsc::Sender<AlertPush>, focused: bool) {
        self.presenters.insert(surface, presenter);
        if focused {
            self.active = Some(surface);
        }
        debug!(
            surface = %surface,
            focused,
            surfaces = self.presenters.len(),
            "Presenter attached"
        );
    }

    /// Mark `surface` as the active one. Unknown surfaces are ignored.
    pub fn focus(&mut self, surface: SurfaceId) -> bool {
        if self.presenters.contains_key(&surface) {
            self.active = Some(surface);
            true
        } else {
            false
        }
    }

    pub fn detach(&mut self, surface: SurfaceId) {
        if self.presenters.remove(&surface).is_some() {
            debug!(surface = %surface, "Presenter detached");
        }
        if self.active == Some(surface) {
            self.active = None;
        }
    }

    pub fn active(&self) -> Option<SurfaceId> {
        self.active
    }

    pub fn len(&self) -> usize {
        self.presenters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.presenters.is_empty()
    }

    /// Hand `alert` to the active presenter without waiting.
    pub fn deliver(&mut self, alert: AlertPush) -> Result<SurfaceId, DeliveryDrop> {
        let surface = self.active.ok_or(DeliveryDrop::NoActiveSurface)?;
        let presenter = self
            .presenters
            .get(&surface)
            .ok_or(DeliveryDrop::NoActiveSurface)?;

        match presenter.try_send(alert) {
            Ok(()) => Ok(surface),
            Err(TrySendError::Full(_)) => Err(DeliveryDrop::SurfaceBusy(surface)),
            Err(TrySendError::Closed(_)) => {
                self.detach(surface);
                Err(DeliveryDrop::SurfaceClosed(surface))
            }
        }
    }
}
