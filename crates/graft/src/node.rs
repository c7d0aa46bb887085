//! Syntax-node wrappers.
//!
//! A wrapper holds a weak back-reference to its tree core plus a copy of its
//! node handle; every accessor marshals the handle through the tree's scratch
//! channel into the native adapter and materializes results through the node
//! cache. Field access dispatches through the language's kind table.

use std::sync::{Arc, Weak};

use parking_lot::RwLock;

use crate::handle::NodeHandle;
use crate::native::{self, BatchOp, NavOp};
use crate::point::{InputEdit, Point, Range};
use crate::tree::TreeCore;

/// A node of a parsed tree.
///
/// Clones share one allocation: the tree's cache guarantees a single wrapper
/// per node identity, so two materializations of the same node are
/// reference-equal. Wrappers do not keep their tree alive; using a wrapper
/// whose tree has been dropped is a programmer error and panics.
#[derive(Clone)]
pub struct SyntaxNode {
    pub(crate) inner: Arc<NodeInner>,
}

pub(crate) struct NodeInner {
    pub(crate) tree: Weak<TreeCore>,
    handle: RwLock<NodeHandle>,
}

/// Children reached through one declared field of a node's kind.
#[derive(Debug, Clone)]
pub enum FieldChildren {
    /// Singular field: one child or none.
    One(Option<SyntaxNode>),
    /// Repeatable field: ordered child sequence.
    Many(Vec<SyntaxNode>),
}

impl SyntaxNode {
    pub(crate) fn new(tree: &Arc<TreeCore>, handle: NodeHandle) -> Self {
        debug_assert!(!handle.is_null(), "null handle has no wrapper");
        Self {
            inner: Arc::new(NodeInner {
                tree: Arc::downgrade(tree),
                handle: RwLock::new(handle),
            }),
        }
    }

    pub(crate) fn handle(&self) -> NodeHandle {
        *self.inner.handle.read()
    }

    pub(crate) fn shift(&self, edit: &InputEdit) {
        self.inner.handle.write().shift(edit);
    }

    pub(crate) fn core(&self) -> Arc<TreeCore> {
        self.inner
            .tree
            .upgrade()
            .expect("syntax node outlived its tree")
    }

    fn navigate(&self, op: NavOp) -> Option<SyntaxNode> {
        let core = self.core();
        let handle = {
            let ts = core.ts.read();
            let mut channel = core.channel.lock();
            channel.write_node(&self.handle(), 0);
            native::navigate(&ts, &mut channel, op)
        };
        core.cache.lock().materialize(&core, handle)
    }

    fn batch(&self, op: BatchOp) -> Vec<SyntaxNode> {
        let core = self.core();
        let handles = {
            let ts = core.ts.read();
            let mut channel = core.channel.lock();
            channel.write_node(&self.handle(), 0);
            native::batch(&ts, &mut channel, op)
        };
        core.cache
            .lock()
            .materialize_batch(&core, &handles)
            .into_iter()
            .flatten()
            .collect()
    }

    fn scalar<R>(
        &self,
        op: impl FnOnce(&tree_sitter::Tree, &mut crate::channel::ScratchChannel) -> R,
    ) -> R {
        let core = self.core();
        let ts = core.ts.read();
        let mut channel = core.channel.lock();
        channel.write_node(&self.handle(), 0);
        op(&*ts, &mut *channel)
    }

    // -- identity and kind --------------------------------------------------

    /// Unique identity of the underlying node within its tree.
    pub fn id(&self) -> u64 {
        self.handle().id()
    }

    pub fn kind_id(&self) -> u16 {
        self.handle().kind_id()
    }

    pub fn kind(&self) -> &'static str {
        self.scalar(|tree, channel| native::kind_name(tree, channel))
    }

    // -- flags --------------------------------------------------------------

    pub fn is_named(&self) -> bool {
        self.scalar(|tree, channel| native::is_named(tree, channel))
    }

    pub fn is_missing(&self) -> bool {
        self.scalar(|tree, channel| native::is_missing(tree, channel))
    }

    pub fn is_extra(&self) -> bool {
        self.scalar(|tree, channel| native::is_extra(tree, channel))
    }

    pub fn is_error(&self) -> bool {
        self.scalar(|tree, channel| native::is_error(tree, channel))
    }

    pub fn has_error(&self) -> bool {
        self.scalar(|tree, channel| native::has_error(tree, channel))
    }

    pub fn has_changes(&self) -> bool {
        self.scalar(|tree, channel| native::has_changes(tree, channel))
    }

    // -- spans and text -----------------------------------------------------

    pub fn start_byte(&self) -> usize {
        self.scalar(|tree, channel| native::start_byte(tree, channel))
    }

    pub fn end_byte(&self) -> usize {
        self.scalar(|tree, channel| native::end_byte(tree, channel))
    }

    pub fn byte_range(&self) -> std::ops::Range<usize> {
        self.scalar(|tree, channel| {
            let start = native::start_byte(tree, channel);
            let end = native::end_byte(tree, channel);
            start..end
        })
    }

    pub fn start_position(&self) -> Point {
        self.scalar(|tree, channel| native::start_position(tree, channel))
    }

    pub fn end_position(&self) -> Point {
        self.scalar(|tree, channel| native::end_position(tree, channel))
    }

    pub fn range(&self) -> Range {
        let byte_range = self.byte_range();
        Range {
            start_byte: byte_range.start,
            end_byte: byte_range.end,
            start_point: self.start_position(),
            end_point: self.end_position(),
        }
    }

    /// Source text of this node, read back through the tree's text accessor.
    pub fn text(&self) -> String {
        let core = self.core();
        let range = self.byte_range();
        core.text.slice(range)
    }

    // -- navigation ---------------------------------------------------------

    pub fn parent(&self) -> Option<SyntaxNode> {
        self.navigate(NavOp::Parent)
    }

    pub fn child(&self, index: usize) -> Option<SyntaxNode> {
        self.navigate(NavOp::Child(index))
    }

    pub fn named_child(&self, index: usize) -> Option<SyntaxNode> {
        self.navigate(NavOp::NamedChild(index))
    }

    pub fn child_count(&self) -> usize {
        self.scalar(|tree, channel| native::child_count(tree, channel))
    }

    pub fn named_child_count(&self) -> usize {
        self.scalar(|tree, channel| native::named_child_count(tree, channel))
    }

    pub fn next_sibling(&self) -> Option<SyntaxNode> {
        self.navigate(NavOp::NextSibling)
    }

    pub fn prev_sibling(&self) -> Option<SyntaxNode> {
        self.navigate(NavOp::PrevSibling)
    }

    pub fn next_named_sibling(&self) -> Option<SyntaxNode> {
        self.navigate(NavOp::NextNamedSibling)
    }

    pub fn prev_named_sibling(&self) -> Option<SyntaxNode> {
        self.navigate(NavOp::PrevNamedSibling)
    }

    pub fn children(&self) -> Vec<SyntaxNode> {
        self.batch(BatchOp::Children)
    }

    pub fn named_children(&self) -> Vec<SyntaxNode> {
        self.batch(BatchOp::NamedChildren)
    }

    // -- field access -------------------------------------------------------

    /// Resolve a declared field of this node's kind through the kind table:
    /// singular fields yield one child or none, repeatable fields an ordered
    /// sequence. `None` when the kind does not declare the field.
    pub fn field(&self, name: &str) -> Option<FieldChildren> {
        let core = self.core();
        let accessor = core.language.kinds().get(self.kind_id()).accessor(name)?.clone();
        Some(if accessor.multiple {
            FieldChildren::Many(self.batch(BatchOp::ChildrenByFieldId(accessor.field_id)))
        } else {
            FieldChildren::One(self.navigate(NavOp::ChildByFieldId(accessor.field_id)))
        })
    }

    /// Declared field names of this node's kind, sorted.
    pub fn fields(&self) -> Vec<String> {
        let core = self.core();
        core.language
            .kinds()
            .get(self.kind_id())
            .field_names()
            .map(str::to_owned)
            .collect()
    }

    /// First child for the given field name, resolved directly through the
    /// engine (independent of the kind table's cardinality notion).
    pub fn child_by_field_name(&self, name: &str) -> Option<SyntaxNode> {
        let field_id = self.core().language.field_id_for_name(name)?;
        self.navigate(NavOp::ChildByFieldId(field_id))
    }

    /// All children for the given field name, in order.
    pub fn children_by_field_name(&self, name: &str) -> Vec<SyntaxNode> {
        match self.core().language.field_id_for_name(name) {
            Some(field_id) => self.batch(BatchOp::ChildrenByFieldId(field_id)),
            None => Vec::new(),
        }
    }

    // -- descendant lookup --------------------------------------------------

    pub fn descendant_for_byte_range(&self, start: usize, end: usize) -> Option<SyntaxNode> {
        self.navigate(NavOp::DescendantForByteRange(start, end))
    }

    pub fn named_descendant_for_byte_range(&self, start: usize, end: usize) -> Option<SyntaxNode> {
        self.navigate(NavOp::NamedDescendantForByteRange(start, end))
    }

    pub fn descendant_for_point_range(&self, start: Point, end: Point) -> Option<SyntaxNode> {
        self.navigate(NavOp::DescendantForPointRange(start, end))
    }

    pub fn named_descendant_for_point_range(&self, start: Point, end: Point) -> Option<SyntaxNode> {
        self.navigate(NavOp::NamedDescendantForPointRange(start, end))
    }

    // -- misc ---------------------------------------------------------------

    /// S-expression rendering of the subtree, as produced by the engine.
    pub fn to_sexp(&self) -> String {
        self.scalar(|tree, channel| native::to_sexp(tree, channel))
    }
}

impl PartialEq for SyntaxNode {
    /// Node equality is identity equality within one tree.
    fn eq(&self, other: &Self) -> bool {
        Weak::ptr_eq(&self.inner.tree, &other.inner.tree) && self.id() == other.id()
    }
}

impl Eq for SyntaxNode {}

impl std::hash::Hash for SyntaxNode {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id().hash(state);
    }
}

impl std::fmt::Debug for SyntaxNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.inner.tree.strong_count() == 0 {
            return write!(f, "{{detached node {:#x}}}", self.id());
        }
        write!(f, "{{{} {:?}}}", self.kind(), self.byte_range())
    }
}
