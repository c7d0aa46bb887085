//! Fixed-size scratch arena for node and point transfer.
//!
//! Every value crossing the engine boundary passes through here: one node per
//! slot, written then immediately read back out. The buffer is reused across
//! calls, so its contents are only valid until the next marshal operation —
//! callers copy results out before issuing another one. The channel carries no
//! lock of its own; the owning tree core serializes access.

use crate::handle::{NODE_FIELD_COUNT, NodeHandle};
use crate::point::Point;

/// Number of node slots. Batches larger than this are chunked.
pub(crate) const NODE_SLOT_COUNT: usize = 16;

pub(crate) struct ScratchChannel {
    nodes: [u32; NODE_FIELD_COUNT * NODE_SLOT_COUNT],
    point: [u32; 2],
}

impl ScratchChannel {
    pub(crate) fn new() -> Self {
        Self {
            nodes: [0; NODE_FIELD_COUNT * NODE_SLOT_COUNT],
            point: [0; 2],
        }
    }

    /// Copy a handle's fields into the given slot.
    pub(crate) fn write_node(&mut self, handle: &NodeHandle, slot: usize) {
        debug_assert!(slot < NODE_SLOT_COUNT, "slot {slot} out of range");
        let offset = slot * NODE_FIELD_COUNT;
        self.nodes[offset..offset + NODE_FIELD_COUNT].copy_from_slice(&handle.to_fields());
    }

    /// Read the handle currently held in the given slot.
    pub(crate) fn read_node(&self, slot: usize) -> NodeHandle {
        debug_assert!(slot < NODE_SLOT_COUNT, "slot {slot} out of range");
        let offset = slot * NODE_FIELD_COUNT;
        let mut fields = [0u32; NODE_FIELD_COUNT];
        fields.copy_from_slice(&self.nodes[offset..offset + NODE_FIELD_COUNT]);
        NodeHandle::from_fields(fields)
    }

    pub(crate) fn write_point(&mut self, point: Point) {
        self.point[0] = point.row as u32;
        self.point[1] = point.column as u32;
    }

    pub(crate) fn read_point(&self) -> Point {
        Point::new(self.point[0] as usize, self.point[1] as usize)
    }
}
