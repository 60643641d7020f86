//! Transient on-page alert notices.
//!
//! Notices stack without limit; each one owns an independent dismiss timer
//! and disappears after the configured dwell whatever else happens on the
//! page.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tracing::{debug, info, warn};

use sentinel_shared::constants::NOTICE_DWELL_SECS;

use crate::dom::{Document, NodeId};

/// Class carried by every notice element.
pub const NOTICE_CLASS: &str = "sentinel-notice";

#[derive(Clone)]
pub struct AlertPresenter {
    doc: Arc<Mutex<Document>>,
    dwell: Duration,
}

impl AlertPresenter {
    pub fn new(doc: Arc<Mutex<Document>>) -> Self {
        Self::with_dwell(doc, Duration::from_secs(NOTICE_DWELL_SECS))
    }

    pub fn with_dwell(doc: Arc<Mutex<Document>>, dwell: Duration) -> Self {
        Self { doc, dwell }
    }

    /// Insert a notice showing `text` and schedule its removal.
    ///
    /// Must be called from within a tokio runtime. Returns the notice node,
    /// or `None` if the document could not be updated.
    pub fn present(&self, text: &str) -> Option<NodeId> {
        let notice = {
            let mut doc = match self.doc.lock() {
                Ok(d) => d,
                Err(_) => {
                    warn!("Document lock poisoned, alert not shown");
                    return None;
                }
            };
            let body = doc.body();
            match doc.append_element(body, "div", &[("class", NOTICE_CLASS), ("role", "alert")], text) {
                Ok(id) => id,
                Err(e) => {
                    warn!(error = %e, "Failed to insert alert notice");
                    return None;
                }
            }
        };

        info!(notice = %notice, dwell_ms = self.dwell.as_millis() as u64, "Alert notice shown");

        let doc = Arc::clone(&self.doc);
        let dwell = self.dwell;
        tokio::spawn(async move {
            tokio::time::sleep(dwell).await;
            if let Ok(mut doc) = doc.lock() {
                if doc.remove(notice) {
                    debug!(notice = %notice, "Alert notice dismissed");
                }
            }
        });

        Some(notice)
    }

    /// Text of every notice currently on the page, oldest first.
    pub fn visible(&self) -> Vec<String> {
        let doc = match self.doc.lock() {
            Ok(d) => d,
            Err(_) => return Vec::new(),
        };
        let body = doc.body();
        doc.descendants(body)
            .into_iter()
            .filter(|n| doc.has_class(*n, NOTICE_CLASS))
            .map(|n| doc.text_content(n))
            .collect()
    }
}
