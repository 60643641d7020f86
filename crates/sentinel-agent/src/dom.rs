//! Minimal live document model.
//!
//! Nodes live in an arena keyed by [`NodeId`]. Ids are handed out from a
//! monotonic counter and never reused, so a node that is removed and
//! re-created always comes back with a new identity.
//!
//! Structural changes (child insertions and removals) under the body are
//! queued as [`MutationRecord`]s and drained in batches, the same way a page
//! mutation observer delivers them. Attribute and text changes are not
//! recorded.

use std::collections::{BTreeMap, HashMap};

use crate::error::{AgentError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u64);

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone)]
struct Node {
    tag: String,
    attrs: BTreeMap<String, String>,
    text: String,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl Node {
    fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_string(),
            attrs: BTreeMap::new(),
            text: String::new(),
            parent: None,
            children: Vec::new(),
        }
    }
}

/// One structural change under `target`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MutationRecord {
    pub target: Option<NodeId>,
    pub added: Vec<NodeId>,
    pub removed: Vec<NodeId>,
}

/// Records delivered together in one observer callback.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MutationBatch {
    pub records: Vec<MutationRecord>,
}

impl MutationBatch {
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn adds_nodes(&self) -> bool {
        self.records.iter().any(|r| !r.added.is_empty())
    }

    pub fn removes_nodes(&self) -> bool {
        self.records.iter().any(|r| !r.removed.is_empty())
    }
}

#[derive(Debug, Clone)]
pub struct Document {
    nodes: HashMap<NodeId, Node>,
    body: NodeId,
    next_id: u64,
    pending: Vec<MutationRecord>,
}

impl Document {
    pub fn new() -> Self {
        let body = NodeId(0);
        let mut nodes = HashMap::new();
        nodes.insert(body, Node::new("body"));
        Self {
            nodes,
            body,
            next_id: 1,
            pending: Vec::new(),
        }
    }

    pub fn body(&self) -> NodeId {
        self.body
    }

    /// Create a detached element.
    pub fn create_element(&mut self, tag: &str) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        self.nodes.insert(id, Node::new(tag));
        id
    }

    /// Create an element with attributes and own text and append it.
    pub fn append_element(
        &mut self,
        parent: NodeId,
        tag: &str,
        attrs: &[(&str, &str)],
        text: &str,
    ) -> Result<NodeId> {
        let id = self.create_element(tag);
        for (name, value) in attrs {
            self.set_attribute(id, name, value)?;
        }
        self.set_text(id, text)?;
        self.append_child(parent, id)?;
        Ok(id)
    }

    pub fn exists(&self, node: NodeId) -> bool {
        self.nodes.contains_key(&node)
    }

    /// Whether `node` is attached under the body.
    pub fn contains(&self, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == self.body {
                return true;
            }
            current = self.nodes.get(&id).and_then(|n| n.parent);
        }
        false
    }

    pub fn tag(&self, node: NodeId) -> Option<&str> {
        self.nodes.get(&node).map(|n| n.tag.as_str())
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes.get(&node).and_then(|n| n.parent)
    }

    pub fn attribute(&self, node: NodeId, name: &str) -> Option<&str> {
        self.nodes
            .get(&node)
            .and_then(|n| n.attrs.get(name))
            .map(String::as_str)
    }

    pub fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) -> Result<()> {
        let entry = self.node_mut(node)?;
        entry.attrs.insert(name.to_string(), value.to_string());
        Ok(())
    }

    pub fn remove_attribute(&mut self, node: NodeId, name: &str) -> Result<()> {
        self.node_mut(node)?.attrs.remove(name);
        Ok(())
    }

    pub fn has_class(&self, node: NodeId, class: &str) -> bool {
        self.attribute(node, "class")
            .map(|classes| classes.split_whitespace().any(|c| c == class))
            .unwrap_or(false)
    }

    /// Replace the node's own text (children are untouched).
    pub fn set_text(&mut self, node: NodeId, text: &str) -> Result<()> {
        self.node_mut(node)?.text = text.to_string();
        Ok(())
    }

    /// Own text followed by every descendant's text, in document order.
    pub fn text_content(&self, node: NodeId) -> String {
        let mut out = String::new();
        for id in std::iter::once(node).chain(self.descendants(node)) {
            if let Some(n) = self.nodes.get(&id) {
                out.push_str(&n.text);
            }
        }
        out
    }

    /// Append `child` under `parent`, moving it if it is already attached.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
        if !self.exists(parent) {
            return Err(AgentError::UnknownNode(parent));
        }
        if !self.exists(child) {
            return Err(AgentError::UnknownNode(child));
        }
        if child == parent || self.is_ancestor(child, parent) {
            return Err(AgentError::Hierarchy { parent, child });
        }

        self.detach(child);

        if let Some(p) = self.nodes.get_mut(&parent) {
            p.children.push(child);
        }
        if let Some(c) = self.nodes.get_mut(&child) {
            c.parent = Some(parent);
        }

        if self.contains(parent) {
            self.pending.push(MutationRecord {
                target: Some(parent),
                added: vec![child],
                removed: Vec::new(),
            });
        }
        Ok(())
    }

    /// Detach `node` and drop it together with its whole subtree.
    ///
    /// Returns `false` if the node does not exist. The body cannot be
    /// removed.
    pub fn remove(&mut self, node: NodeId) -> bool {
        if node == self.body || !self.exists(node) {
            return false;
        }
        self.detach(node);

        let mut stack = vec![node];
        while let Some(id) = stack.pop() {
            if let Some(removed) = self.nodes.remove(&id) {
                stack.extend(removed.children);
            }
        }
        true
    }

    /// Every descendant of `root` in pre-order (document order), excluding
    /// `root` itself.
    pub fn descendants(&self, root: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = match self.nodes.get(&root) {
            Some(n) => n.children.iter().rev().copied().collect(),
            None => return out,
        };
        while let Some(id) = stack.pop() {
            out.push(id);
            if let Some(n) = self.nodes.get(&id) {
                stack.extend(n.children.iter().rev().copied());
            }
        }
        out
    }

    /// Nearest inclusive ancestor of `node` satisfying `pred`.
    pub fn closest(&self, node: NodeId, pred: impl Fn(NodeId) -> bool) -> Option<NodeId> {
        let mut current = Some(node);
        while let Some(id) = current {
            if !self.exists(id) {
                return None;
            }
            if pred(id) {
                return Some(id);
            }
            current = self.parent(id);
        }
        None
    }

    /// Drain the structural changes recorded since the last call.
    pub fn take_mutations(&mut self) -> MutationBatch {
        MutationBatch {
            records: std::mem::take(&mut self.pending),
        }
    }

    fn detach(&mut self, node: NodeId) {
        let Some(parent) = self.parent(node) else {
            return;
        };
        let was_connected = self.contains(parent);
        if let Some(p) = self.nodes.get_mut(&parent) {
            p.children.retain(|c| *c != node);
        }
        if let Some(n) = self.nodes.get_mut(&node) {
            n.parent = None;
        }
        if was_connected {
            self.pending.push(MutationRecord {
                target: Some(parent),
                added: Vec::new(),
                removed: vec![node],
            });
        }
    }

    fn is_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = self.parent(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.parent(id);
        }
        false
    }

    fn node_mut(&mut self, node: NodeId) -> Result<&mut Node> {
        self.nodes.get_mut(&node).ok_or(AgentError::UnknownNode(node))
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descendants_in_document_order() {
        let mut doc = Document::new();
        let body = doc.body();
        let a = doc.append_element(body, "div", &[], "a").unwrap();
        let a1 = doc.append_element(a, "span", &[], "a1").unwrap();
        let b = doc.append_element(body, "div", &[], "b").unwrap();

        assert_eq!(doc.descendants(body), vec![a, a1, b]);
        assert_eq!(doc.text_content(body), "aa1b");
    }

    #[test]
    fn test_detached_subtree_records_single_insertion() {
        let mut doc = Document::new();
        let body = doc.body();

        let row = doc.create_element("li");
        let inner = doc.create_element("span");
        doc.append_child(row, inner).unwrap();
        assert!(doc.take_mutations().is_empty());

        doc.append_child(body, row).unwrap();
        let batch = doc.take_mutations();
        assert_eq!(batch.records.len(), 1);
        assert_eq!(batch.records[0].added, vec![row]);
        assert!(doc.take_mutations().is_empty());
    }

    #[test]
    fn test_remove_drops_subtree_and_ids_are_not_reused() {
        let mut doc = Document::new();
        let body = doc.body();
        let row = doc.append_element(body, "li", &[], "x").unwrap();
        let child = doc.append_element(row, "span", &[], "y").unwrap();

        assert!(doc.remove(row));
        assert!(!doc.exists(row));
        assert!(!doc.exists(child));
        assert!(!doc.remove(row));
        assert!(!doc.remove(body));

        let fresh = doc.create_element("li");
        assert_ne!(fresh, row);
        assert_ne!(fresh, child);
    }

    #[test]
    fn test_cycles_are_rejected() {
        let mut doc = Document::new();
        let body = doc.body();
        let outer = doc.append_element(body, "div", &[], "").unwrap();
        let inner = doc.append_element(outer, "div", &[], "").unwrap();

        assert!(matches!(
            doc.append_child(inner, outer),
            Err(AgentError::Hierarchy { .. })
        ));
        assert!(matches!(
            doc.append_child(outer, outer),
            Err(AgentError::Hierarchy { .. })
        ));
    }

    #[test]
    fn test_closest_includes_self() {
        let mut doc = Document::new();
        let body = doc.body();
        let wrapper = doc
            .append_element(body, "div", &[("data-author-id", "alice")], "")
            .unwrap();
        let text = doc
            .append_element(wrapper, "p", &[("class", "message-text")], "hi")
            .unwrap();

        let has_author = |n: NodeId| doc.attribute(n, "data-author-id").is_some();
        assert_eq!(doc.closest(text, has_author), Some(wrapper));
        assert_eq!(doc.closest(wrapper, has_author), Some(wrapper));
        assert_eq!(doc.closest(body, has_author), None);
    }

    #[test]
    fn test_has_class_splits_on_whitespace() {
        let mut doc = Document::new();
        let body = doc.body();
        let node = doc
            .append_element(body, "p", &[("class", "msg  message-text\tbold")], "")
            .unwrap();
        assert!(doc.has_class(node, "message-text"));
        assert!(!doc.has_class(node, "message"));
    }
}
