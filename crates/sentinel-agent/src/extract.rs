//! Exactly-once extraction of chat messages from a live document.
//!
//! Every batch that inserts nodes triggers a full re-scan of the candidate
//! set, because an insertion can reveal sibling content that is not part of
//! the mutation records themselves. Dedup is an explicit set of node
//! identities owned by the agent; the document is never written to.

use std::collections::HashSet;

use tracing::{debug, trace};

use sentinel_shared::constants::{IDENTITY_ATTR, MESSAGE_CLASS, UNKNOWN_AUTHOR};
use sentinel_shared::protocol::ExtractionEvent;

use crate::dom::{Document, MutationBatch, NodeId};

/// Which elements count as messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateSelector {
    /// Attribute holding the author identity; elements carrying it are
    /// candidates themselves.
    pub identity_attr: String,
    /// Class marking message text elements.
    pub message_class: String,
}

impl CandidateSelector {
    pub fn matches(&self, doc: &Document, node: NodeId) -> bool {
        doc.attribute(node, &self.identity_attr).is_some() || doc.has_class(node, &self.message_class)
    }
}

impl Default for CandidateSelector {
    fn default() -> Self {
        Self {
            identity_attr: IDENTITY_ATTR.to_string(),
            message_class: MESSAGE_CLASS.to_string(),
        }
    }
}

#[derive(Debug, Default)]
pub struct ExtractionAgent {
    selector: CandidateSelector,
    seen: HashSet<NodeId>,
}

impl ExtractionAgent {
    pub fn new(selector: CandidateSelector) -> Self {
        Self {
            selector,
            seen: HashSet::new(),
        }
    }

    /// Handle one observer callback.
    ///
    /// Identities of nodes that no longer exist are forgotten first; ids are
    /// never reused, so this only bounds the seen set.
    pub fn observe(&mut self, doc: &Document, batch: &MutationBatch) -> Vec<ExtractionEvent> {
        if batch.removes_nodes() {
            let before = self.seen.len();
            self.seen.retain(|id| doc.exists(*id));
            trace!(forgotten = before - self.seen.len(), "Pruned removed nodes");
        }

        if !batch.adds_nodes() {
            return Vec::new();
        }

        self.scan(doc)
    }

    /// Walk every candidate in document order and emit the unseen,
    /// non-empty ones.
    pub fn scan(&mut self, doc: &Document) -> Vec<ExtractionEvent> {
        let mut events = Vec::new();

        for node in doc.descendants(doc.body()) {
            if !self.selector.matches(doc, node) {
                continue;
            }

            let content = doc.text_content(node);
            let text = content.trim();
            if text.is_empty() || self.seen.contains(&node) {
                continue;
            }

            self.seen.insert(node);
            let author = self.resolve_author(doc, node);
            debug!(node = %node, author = %author, len = text.len(), "Extracted message");
            events.push(ExtractionEvent::new(author, text));
        }

        events
    }

    pub fn is_processed(&self, node: NodeId) -> bool {
        self.seen.contains(&node)
    }

    pub fn processed_count(&self) -> usize {
        self.seen.len()
    }

    fn resolve_author(&self, doc: &Document, node: NodeId) -> String {
        let attr = self.selector.identity_attr.as_str();
        doc.closest(node, |n| doc.attribute(n, attr).is_some())
            .and_then(|owner| doc.attribute(owner, attr))
            .filter(|author| !author.is_empty())
            .unwrap_or(UNKNOWN_AUTHOR)
            .to_string()
    }
}
