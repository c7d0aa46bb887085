//! Per-tree wrapper cache: one wrapper per node identity.

use std::collections::HashMap;
use std::sync::Arc;

use crate::handle::NodeHandle;
use crate::node::SyntaxNode;
use crate::point::InputEdit;
use crate::tree::TreeCore;

/// Maps a node's 64-bit identity to its materialized wrapper. The cache owns
/// each wrapper it has produced for the lifetime of the tree; hits return the
/// existing wrapper without refreshing any fields, since equal identity
/// implies equal fields by construction.
pub(crate) struct NodeCache {
    map: HashMap<u64, SyntaxNode>,
}

impl NodeCache {
    pub(crate) fn new() -> Self {
        Self {
            map: HashMap::new(),
        }
    }

    /// Materialize one handle. The null handle materializes to `None`.
    pub(crate) fn materialize(
        &mut self,
        tree: &Arc<TreeCore>,
        handle: NodeHandle,
    ) -> Option<SyntaxNode> {
        if handle.is_null() {
            return None;
        }
        if let Some(hit) = self.map.get(&handle.id()) {
            return Some(hit.clone());
        }
        let node = SyntaxNode::new(tree, handle);
        self.map.insert(handle.id(), node.clone());
        Some(node)
    }

    /// Materialize a handle sequence, deduplicating within the batch through
    /// a transient miss-map before merging new entries into the cache.
    pub(crate) fn materialize_batch(
        &mut self,
        tree: &Arc<TreeCore>,
        handles: &[NodeHandle],
    ) -> Vec<Option<SyntaxNode>> {
        let mut fresh: HashMap<u64, SyntaxNode> = HashMap::new();
        let mut out = Vec::with_capacity(handles.len());

        for handle in handles {
            if handle.is_null() {
                out.push(None);
                continue;
            }
            if let Some(hit) = self.map.get(&handle.id()) {
                out.push(Some(hit.clone()));
                continue;
            }
            if let Some(hit) = fresh.get(&handle.id()) {
                out.push(Some(hit.clone()));
                continue;
            }
            let node = SyntaxNode::new(tree, *handle);
            fresh.insert(handle.id(), node.clone());
            out.push(Some(node));
        }

        self.map.extend(fresh);
        out
    }

    /// Shift every cached wrapper's context across an edit.
    pub(crate) fn shift_all(&self, edit: &InputEdit) {
        for node in self.map.values() {
            node.shift(edit);
        }
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.map.len()
    }
}
