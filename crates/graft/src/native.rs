//! Narrow adapter over the engine.
//!
//! This is the only module that performs engine node operations. The protocol
//! is the same in both directions: the caller writes the operand handle into
//! the scratch channel, the adapter recovers the engine node, performs the
//! operation, writes result handles (or a point) back into the channel, and
//! the caller copies them out before the next marshal call. Batch results are
//! chunked through the channel's fixed slots.

use std::ops::Range;
use std::time::Instant;

use graft_core::NodeFieldId;
use tree_sitter as ts;
use streaming_iterator::StreamingIterator;

use crate::channel::{NODE_SLOT_COUNT, ScratchChannel};
use crate::handle::NodeHandle;
use crate::point::Point;
use crate::query::QueryOptions;

/// Node-returning operations.
#[derive(Debug, Clone, Copy)]
pub(crate) enum NavOp {
    Parent,
    Child(usize),
    NamedChild(usize),
    NextSibling,
    PrevSibling,
    NextNamedSibling,
    PrevNamedSibling,
    ChildByFieldId(NodeFieldId),
    DescendantForByteRange(usize, usize),
    NamedDescendantForByteRange(usize, usize),
    DescendantForPointRange(Point, Point),
    NamedDescendantForPointRange(Point, Point),
}

/// Batch operations yielding ordered node sequences.
#[derive(Debug, Clone, Copy)]
pub(crate) enum BatchOp {
    Children,
    NamedChildren,
    ChildrenByFieldId(NodeFieldId),
}

// ---------------------------------------------------------------------------
// Node recovery
// ---------------------------------------------------------------------------

/// Recover the engine node a handle denotes.
///
/// The handle's context anchors the search: descend to the smallest node at
/// the recorded start byte, then climb until the identity matches. Containing
/// spans nest, so the target is always on the climb path; the probe with a
/// one-byte extent first avoids landing in a zero-width neighbor. A full walk
/// is the last resort (stale context after heavy edits).
fn recover<'t>(tree: &'t ts::Tree, handle: &NodeHandle) -> ts::Node<'t> {
    assert!(!handle.is_null(), "cannot recover the null handle");
    let root = tree.root_node();
    let start = handle.start_byte();

    for end in [start.saturating_add(1), start] {
        if let Some(found) = climb(root.descendant_for_byte_range(start, end), handle) {
            return found;
        }
    }
    if let Some(found) = scan(root, handle) {
        return found;
    }
    panic!(
        "node {:#x} is not part of its claimed tree; was it detached by an edit?",
        handle.id()
    );
}

fn climb<'t>(mut node: Option<ts::Node<'t>>, handle: &NodeHandle) -> Option<ts::Node<'t>> {
    while let Some(n) = node {
        if n.id() as u64 == handle.id() {
            return Some(n);
        }
        node = n.parent();
    }
    None
}

fn scan<'t>(root: ts::Node<'t>, handle: &NodeHandle) -> Option<ts::Node<'t>> {
    let mut cursor = root.walk();
    loop {
        let node = cursor.node();
        if node.id() as u64 == handle.id() {
            return Some(node);
        }
        if cursor.goto_first_child() {
            continue;
        }
        loop {
            if cursor.goto_next_sibling() {
                break;
            }
            if !cursor.goto_parent() {
                return None;
            }
        }
    }
}

fn operand<'t>(tree: &'t ts::Tree, channel: &ScratchChannel) -> ts::Node<'t> {
    recover(tree, &channel.read_node(0))
}

/// Write a node (or the null handle) into slot 0 and copy it back out.
fn transfer(channel: &mut ScratchChannel, node: Option<ts::Node<'_>>, slot: usize) -> NodeHandle {
    let handle = node.map(NodeHandle::from_ts).unwrap_or(NodeHandle::NULL);
    channel.write_node(&handle, slot);
    channel.read_node(slot)
}

/// Stream a node sequence through the channel, copying each chunk out before
/// the slots are reused.
fn transfer_all(channel: &mut ScratchChannel, nodes: &[ts::Node<'_>]) -> Vec<NodeHandle> {
    let mut out = Vec::with_capacity(nodes.len());
    for chunk in nodes.chunks(NODE_SLOT_COUNT) {
        for (slot, node) in chunk.iter().enumerate() {
            channel.write_node(&NodeHandle::from_ts(*node), slot);
        }
        for slot in 0..chunk.len() {
            out.push(channel.read_node(slot));
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Tree operations
// ---------------------------------------------------------------------------

pub(crate) fn root(tree: &ts::Tree, channel: &mut ScratchChannel) -> NodeHandle {
    transfer(channel, Some(tree.root_node()), 0)
}

pub(crate) fn root_with_offset(
    tree: &ts::Tree,
    channel: &mut ScratchChannel,
    offset_bytes: usize,
    offset_extent: Point,
) -> NodeHandle {
    let node = tree.root_node_with_offset(offset_bytes, offset_extent.to_ts());
    transfer(channel, Some(node), 0)
}

// ---------------------------------------------------------------------------
// Node operations (operand in slot 0)
// ---------------------------------------------------------------------------

pub(crate) fn navigate(tree: &ts::Tree, channel: &mut ScratchChannel, op: NavOp) -> NodeHandle {
    let node = operand(tree, channel);
    let result = match op {
        NavOp::Parent => node.parent(),
        NavOp::Child(i) => node.child(i),
        NavOp::NamedChild(i) => node.named_child(i),
        NavOp::NextSibling => node.next_sibling(),
        NavOp::PrevSibling => node.prev_sibling(),
        NavOp::NextNamedSibling => node.next_named_sibling(),
        NavOp::PrevNamedSibling => node.prev_named_sibling(),
        NavOp::ChildByFieldId(field_id) => node.child_by_field_id(field_id.get()),
        NavOp::DescendantForByteRange(start, end) => node.descendant_for_byte_range(start, end),
        NavOp::NamedDescendantForByteRange(start, end) => {
            node.named_descendant_for_byte_range(start, end)
        }
        NavOp::DescendantForPointRange(start, end) => {
            node.descendant_for_point_range(start.to_ts(), end.to_ts())
        }
        NavOp::NamedDescendantForPointRange(start, end) => {
            node.named_descendant_for_point_range(start.to_ts(), end.to_ts())
        }
    };
    transfer(channel, result, 0)
}

pub(crate) fn batch(tree: &ts::Tree, channel: &mut ScratchChannel, op: BatchOp) -> Vec<NodeHandle> {
    let node = operand(tree, channel);
    let mut cursor = node.walk();
    let nodes: Vec<ts::Node<'_>> = match op {
        BatchOp::Children => node.children(&mut cursor).collect(),
        BatchOp::NamedChildren => node.named_children(&mut cursor).collect(),
        BatchOp::ChildrenByFieldId(field_id) => {
            node.children_by_field_id(field_id, &mut cursor).collect()
        }
    };
    transfer_all(channel, &nodes)
}

pub(crate) fn kind_name(tree: &ts::Tree, channel: &ScratchChannel) -> &'static str {
    operand(tree, channel).kind()
}

pub(crate) fn is_named(tree: &ts::Tree, channel: &ScratchChannel) -> bool {
    operand(tree, channel).is_named()
}

pub(crate) fn is_missing(tree: &ts::Tree, channel: &ScratchChannel) -> bool {
    operand(tree, channel).is_missing()
}

pub(crate) fn is_extra(tree: &ts::Tree, channel: &ScratchChannel) -> bool {
    operand(tree, channel).is_extra()
}

pub(crate) fn is_error(tree: &ts::Tree, channel: &ScratchChannel) -> bool {
    operand(tree, channel).is_error()
}

pub(crate) fn has_error(tree: &ts::Tree, channel: &ScratchChannel) -> bool {
    operand(tree, channel).has_error()
}

pub(crate) fn has_changes(tree: &ts::Tree, channel: &ScratchChannel) -> bool {
    operand(tree, channel).has_changes()
}

pub(crate) fn start_byte(tree: &ts::Tree, channel: &ScratchChannel) -> usize {
    operand(tree, channel).start_byte()
}

pub(crate) fn end_byte(tree: &ts::Tree, channel: &ScratchChannel) -> usize {
    operand(tree, channel).end_byte()
}

pub(crate) fn start_position(tree: &ts::Tree, channel: &mut ScratchChannel) -> Point {
    let point = Point::from_ts(operand(tree, channel).start_position());
    channel.write_point(point);
    channel.read_point()
}

pub(crate) fn end_position(tree: &ts::Tree, channel: &mut ScratchChannel) -> Point {
    let point = Point::from_ts(operand(tree, channel).end_position());
    channel.write_point(point);
    channel.read_point()
}

pub(crate) fn child_count(tree: &ts::Tree, channel: &ScratchChannel) -> usize {
    operand(tree, channel).child_count()
}

pub(crate) fn named_child_count(tree: &ts::Tree, channel: &ScratchChannel) -> usize {
    operand(tree, channel).named_child_count()
}

pub(crate) fn to_sexp(tree: &ts::Tree, channel: &ScratchChannel) -> String {
    operand(tree, channel).to_sexp()
}

// ---------------------------------------------------------------------------
// Query execution
// ---------------------------------------------------------------------------

/// One marker in the raw interleaved query stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RawEntry {
    /// Start of a match for the given pattern index.
    Pattern(usize),
    /// Index of the capture this entry's match singles out (capture streams).
    Index(usize),
    /// One capture: its capture-name index; the node is the next unconsumed
    /// entry of the handle sequence.
    Name(u32),
}

/// Raw output of one query run: the marker stream plus the capture handles
/// transferred through the channel, in stream order.
#[derive(Debug, Default)]
pub(crate) struct RawStream {
    pub(crate) entries: Vec<RawEntry>,
    pub(crate) nodes: Vec<NodeHandle>,
    pub(crate) exceeded: bool,
}

struct RangeText<'a>(&'a dyn Fn(Range<usize>) -> String);

impl<'a> ts::TextProvider<Vec<u8>> for RangeText<'a> {
    type I = std::iter::Once<Vec<u8>>;

    fn text(&mut self, node: ts::Node<'_>) -> Self::I {
        std::iter::once((self.0)(node.byte_range()).into_bytes())
    }
}

fn configure(cursor: &mut ts::QueryCursor, options: &QueryOptions) {
    if let Some(limit) = options.match_limit {
        cursor.set_match_limit(limit);
    }
    if let Some(depth) = options.max_start_depth {
        cursor.set_max_start_depth(Some(depth));
    }
    if let Some(range) = options.byte_range.clone() {
        cursor.set_byte_range(range);
    }
    if let Some(range) = options.point_range.clone() {
        cursor.set_point_range(range.start.to_ts()..range.end.to_ts());
    }
}

fn deadline_for(options: &QueryOptions) -> Option<(Instant, u64)> {
    options.timeout_micros.map(|micros| (Instant::now(), micros))
}

fn expired(deadline: &Option<(Instant, u64)>) -> bool {
    deadline.is_some_and(|(start, micros)| start.elapsed().as_micros() as u64 >= micros)
}

/// Run the structural query anchored at the node in slot 0, producing the raw
/// match stream. The timeout is enforced between matches; expiry leaves the
/// stream holding whatever was produced so far.
pub(crate) fn run_matches(
    tree: &ts::Tree,
    channel: &mut ScratchChannel,
    query: &ts::Query,
    options: &QueryOptions,
    text: &dyn Fn(Range<usize>) -> String,
) -> RawStream {
    let anchor = operand(tree, channel);
    let mut cursor = ts::QueryCursor::new();
    configure(&mut cursor, options);
    let deadline = deadline_for(options);

    let mut stream = RawStream::default();
    let mut matches = cursor.matches(query, anchor, RangeText(text));
    while let Some(m) = matches.next() {
        if expired(&deadline) {
            break;
        }
        stream.entries.push(RawEntry::Pattern(m.pattern_index));
        for capture in m.captures {
            stream.entries.push(RawEntry::Name(capture.index));
            let slot = stream.nodes.len() % NODE_SLOT_COUNT;
            stream.nodes.push(transfer(channel, Some(capture.node), slot));
        }
    }
    drop(matches);

    stream.exceeded = cursor.did_exceed_match_limit();
    stream
}

/// Like [`run_matches`], but in capture order: each entry singles out one
/// capture of its match while still carrying the full capture set (predicate
/// filtering is evaluated over the whole match).
pub(crate) fn run_captures(
    tree: &ts::Tree,
    channel: &mut ScratchChannel,
    query: &ts::Query,
    options: &QueryOptions,
    text: &dyn Fn(Range<usize>) -> String,
) -> RawStream {
    let anchor = operand(tree, channel);
    let mut cursor = ts::QueryCursor::new();
    configure(&mut cursor, options);
    let deadline = deadline_for(options);

    let mut stream = RawStream::default();
    let mut captures = cursor.captures(query, anchor, RangeText(text));
    while let Some((m, capture_index)) = captures.next() {
        if expired(&deadline) {
            break;
        }
        stream.entries.push(RawEntry::Pattern(m.pattern_index));
        stream.entries.push(RawEntry::Index(*capture_index));
        for capture in m.captures {
            stream.entries.push(RawEntry::Name(capture.index));
            let slot = stream.nodes.len() % NODE_SLOT_COUNT;
            stream.nodes.push(transfer(channel, Some(capture.node), slot));
        }
    }
    drop(captures);

    stream.exceeded = cursor.did_exceed_match_limit();
    stream
}
