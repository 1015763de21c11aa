//! Branching snapshot history
//!
//! Every snapshot stores the full document text. Editing after an undo adds a
//! sibling branch under the current node; the abandoned branch stays
//! reachable by id. Restoring a node means a full-buffer replace.

use std::collections::{HashMap, HashSet};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::error::SyncError;

pub type NodeId = u64;

/// Free-form information attached to a snapshot
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SnapshotMeta {
    /// Human-readable description of the action
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Number of entities the action touched (bulk edits)
    #[serde(default)]
    pub entity_count: usize,
}

impl SnapshotMeta {
    pub fn labeled(label: impl Into<String>) -> Self {
        Self {
            label: Some(label.into()),
            entity_count: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryNode {
    pub id: NodeId,
    /// Full-text snapshot
    pub content: String,
    /// Milliseconds since the Unix epoch
    pub timestamp: u64,
    pub parent: Option<NodeId>,
    /// Children in creation order (last = most recent)
    pub children: Vec<NodeId>,
    pub metadata: SnapshotMeta,
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Id of the initial snapshot; the root is never pruned
const ROOT_ID: NodeId = 0;

/// Tree of full-text snapshots with a single current pointer
#[derive(Debug, Clone)]
pub struct BranchingHistory {
    nodes: HashMap<NodeId, HistoryNode>,
    current: NodeId,
    next_id: NodeId,
    max_depth: usize,
}

impl BranchingHistory {
    /// Start a history whose root is the document's initial text
    pub fn new(initial: impl Into<String>, max_depth: usize) -> Self {
        let root = HistoryNode {
            id: 0,
            content: initial.into(),
            timestamp: now_millis(),
            parent: None,
            children: Vec::new(),
            metadata: SnapshotMeta::labeled("initial"),
        };
        let mut nodes = HashMap::new();
        nodes.insert(0, root);
        Self {
            nodes,
            current: 0,
            next_id: 1,
            max_depth: max_depth.max(1),
        }
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    pub fn current_id(&self) -> NodeId {
        self.current
    }

    pub fn root_id(&self) -> NodeId {
        ROOT_ID
    }

    pub fn current(&self) -> &HistoryNode {
        &self.nodes[&self.current]
    }

    pub fn current_content(&self) -> &str {
        &self.current().content
    }

    pub fn node(&self, id: NodeId) -> Option<&HistoryNode> {
        self.nodes.get(&id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn can_undo(&self) -> bool {
        self.current().parent.is_some()
    }

    pub fn can_redo(&self) -> bool {
        !self.current().children.is_empty()
    }

    /// Capture `content` as a new child of the current node and advance to it.
    /// Returns None when the text is identical to the current snapshot.
    pub fn snapshot(
        &mut self,
        content: impl Into<String>,
        metadata: SnapshotMeta,
    ) -> Option<NodeId> {
        let content = content.into();
        if content == self.current().content {
            return None;
        }

        let id = self.next_id;
        self.next_id += 1;
        let parent = self.current;

        self.nodes.insert(
            id,
            HistoryNode {
                id,
                content,
                timestamp: now_millis(),
                parent: Some(parent),
                children: Vec::new(),
                metadata,
            },
        );
        if let Some(p) = self.nodes.get_mut(&parent) {
            if !p.children.is_empty() {
                tracing::debug!("Snapshot {id} starts a new branch under {parent}");
            }
            p.children.push(id);
        }
        self.current = id;
        self.prune();
        Some(id)
    }

    /// Move to the parent; returns the content to restore
    pub fn undo(&mut self) -> Option<&str> {
        let parent = self.current().parent?;
        self.current = parent;
        Some(self.current_content())
    }

    /// Move to the most recently created child; returns the content to restore
    pub fn redo(&mut self) -> Option<&str> {
        let child = *self.current().children.last()?;
        self.current = child;
        Some(self.current_content())
    }

    /// Jump to any retained node (e.g. an abandoned branch)
    pub fn checkout(&mut self, id: NodeId) -> Result<&str, SyncError> {
        if !self.nodes.contains_key(&id) {
            return Err(SyncError::UnknownHistoryNode(id));
        }
        self.current = id;
        Ok(self.current_content())
    }

    /// Node ids from the root down to the current node
    pub fn active_path(&self) -> Vec<NodeId> {
        let mut path = vec![self.current];
        let mut cursor = self.current().parent;
        while let Some(id) = cursor {
            path.push(id);
            cursor = self.nodes.get(&id).and_then(|n| n.parent);
        }
        path.reverse();
        path
    }

    /// All leaf nodes, oldest first
    pub fn leaves(&self) -> Vec<NodeId> {
        let mut leaves: Vec<NodeId> = self
            .nodes
            .values()
            .filter(|n| n.children.is_empty())
            .map(|n| n.id)
            .collect();
        leaves.sort_unstable();
        leaves
    }

    /// Drop the oldest leaves off the active path while over capacity.
    ///
    /// Nodes on the root → current path are never pruned, so a long linear
    /// history may exceed `max_depth`; only abandoned branches are bounded.
    fn prune(&mut self) {
        if self.nodes.len() <= self.max_depth {
            return;
        }
        let before = self.nodes.len();
        let active: HashSet<NodeId> = self.active_path().into_iter().collect();

        while self.nodes.len() > self.max_depth {
            let Some(victim) = self.leaves().into_iter().find(|id| !active.contains(id)) else {
                break;
            };
            self.remove_leaf(victim);
        }
        tracing::debug!("History pruned {} snapshots", before - self.nodes.len());
    }

    fn remove_leaf(&mut self, id: NodeId) {
        if let Some(node) = self.nodes.remove(&id) {
            if let Some(parent) = node.parent.and_then(|p| self.nodes.get_mut(&p)) {
                parent.children.retain(|c| *c != id);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn history() -> BranchingHistory {
        BranchingHistory::new("v0", 100)
    }

    #[test]
    fn test_snapshot_advances() {
        let mut h = history();
        let id = h.snapshot("v1", SnapshotMeta::default()).unwrap();
        assert_eq!(h.current_id(), id);
        assert_eq!(h.current_content(), "v1");
        assert!(h.can_undo());
        assert!(!h.can_redo());
    }

    #[test]
    fn test_identical_snapshot_is_noop() {
        let mut h = history();
        assert!(h.snapshot("v0", SnapshotMeta::default()).is_none());
        assert_eq!(h.len(), 1);
    }

    #[test]
    fn test_undo_redo_cycle() {
        let mut h = history();
        h.snapshot("v1", SnapshotMeta::default());
        h.snapshot("v2", SnapshotMeta::default());

        assert_eq!(h.undo(), Some("v1"));
        assert_eq!(h.undo(), Some("v0"));
        assert_eq!(h.undo(), None);
        assert_eq!(h.redo(), Some("v1"));
        assert_eq!(h.redo(), Some("v2"));
        assert_eq!(h.redo(), None);
    }

    #[test]
    fn test_edit_after_undo_branches() {
        let mut h = history();
        let a1 = h.snapshot("a1", SnapshotMeta::default()).unwrap();
        let a2 = h.snapshot("a2", SnapshotMeta::default()).unwrap();
        h.undo();
        h.undo();
        let b1 = h.snapshot("b1", SnapshotMeta::default()).unwrap();

        assert_eq!(h.node(0).unwrap().children, vec![a1, b1]);
        assert_eq!(h.node(a1).unwrap().content, "a1");
        assert_eq!(h.node(a2).unwrap().content, "a2");
        assert_eq!(h.node(a2).unwrap().parent, Some(a1));

        // Redo follows the newest branch
        h.undo();
        assert_eq!(h.redo(), Some("b1"));

        // The old branch is still reachable
        assert_eq!(h.checkout(a2).unwrap(), "a2");
        assert_eq!(h.undo(), Some("a1"));
    }

    #[test]
    fn test_checkout_unknown() {
        let mut h = history();
        assert!(matches!(h.checkout(42), Err(SyncError::UnknownHistoryNode(42))));
    }

    #[test]
    fn test_prune_off_path_leaves_first() {
        let mut h = BranchingHistory::new("root", 4);
        let old = h.snapshot("old", SnapshotMeta::default()).unwrap();
        h.undo();
        let a = h.snapshot("a", SnapshotMeta::default()).unwrap();
        let b = h.snapshot("b", SnapshotMeta::default()).unwrap();
        assert_eq!(h.len(), 4);

        let c = h.snapshot("c", SnapshotMeta::default()).unwrap();
        assert_eq!(h.len(), 4);
        assert!(h.node(old).is_none());
        assert_eq!(h.active_path(), vec![0, a, b, c]);
    }

    #[test]
    fn test_linear_history_is_never_pruned() {
        let mut h = BranchingHistory::new("v0", 3);
        for i in 1..=5 {
            h.snapshot(format!("v{i}"), SnapshotMeta::default());
        }
        assert_eq!(h.len(), 6);
        assert_eq!(h.node(h.root_id()).unwrap().content, "v0");
        for i in (0..5).rev() {
            assert_eq!(h.undo(), Some(format!("v{i}").as_str()));
        }
        assert_eq!(h.undo(), None);
    }

    #[test]
    fn test_abandoned_branch_pruned_from_its_tip() {
        let mut h = BranchingHistory::new("v0", 4);
        let a = h.snapshot("a", SnapshotMeta::default()).unwrap();
        let b = h.snapshot("b", SnapshotMeta::default()).unwrap();
        let c = h.snapshot("c", SnapshotMeta::default()).unwrap();
        while h.undo().is_some() {}

        let d = h.snapshot("d", SnapshotMeta::default()).unwrap();
        assert_eq!(h.len(), 4);
        assert!(h.node(c).is_none());
        assert_eq!(h.node(b).unwrap().children, Vec::<NodeId>::new());

        h.snapshot("e", SnapshotMeta::default());
        assert!(h.node(b).is_none());
        assert!(h.node(a).is_some());
        assert_eq!(h.active_path()[..2], [0, d]);
    }

    #[test]
    fn test_prune_never_touches_active_path() {
        let mut h = BranchingHistory::new("v0", 2);
        h.snapshot("v1", SnapshotMeta::default());
        h.undo();
        h.snapshot("w1", SnapshotMeta::default());
        assert_eq!(h.len(), 2);
        assert_eq!(h.current_content(), "w1");
        assert_eq!(h.undo(), Some("v0"));
    }

    #[test]
    fn test_nodes_carry_timestamps() {
        let mut h = history();
        let id = h.snapshot("v1", SnapshotMeta::labeled("rename")).unwrap();
        let node = h.node(id).unwrap();
        assert!(node.timestamp > 0);
        assert_eq!(node.metadata.label.as_deref(), Some("rename"));
    }
}
