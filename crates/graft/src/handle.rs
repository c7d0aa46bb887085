//! Compact node records transferred across the engine boundary.

use crate::point::{InputEdit, Point, point_add, point_sub};

/// Number of `u32` fields in one marshaled node record.
pub(crate) const NODE_FIELD_COUNT: usize = 6;

/// An opaque fixed-size record identifying one engine node: a 64-bit identity
/// (split into two halves on the wire), the node's kind id, and three context
/// words of engine-internal state (start byte, start row, start column) used
/// to recover the node and to shift cached records across edits.
///
/// Two handles with equal identity denote the same logical node. The all-zero
/// identity is the null handle ("no node").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct NodeHandle {
    id: u64,
    kind_id: u16,
    start_byte: u32,
    start_row: u32,
    start_column: u32,
}

impl NodeHandle {
    pub(crate) const NULL: NodeHandle = NodeHandle {
        id: 0,
        kind_id: 0,
        start_byte: 0,
        start_row: 0,
        start_column: 0,
    };

    pub(crate) fn from_ts(node: tree_sitter::Node<'_>) -> Self {
        let start = node.start_position();
        Self {
            id: node.id() as u64,
            kind_id: node.kind_id(),
            start_byte: node.start_byte() as u32,
            start_row: start.row as u32,
            start_column: start.column as u32,
        }
    }

    #[inline]
    pub(crate) fn is_null(&self) -> bool {
        self.id == 0
    }

    #[inline]
    pub(crate) fn id(&self) -> u64 {
        self.id
    }

    #[inline]
    pub(crate) fn kind_id(&self) -> u16 {
        self.kind_id
    }

    #[inline]
    pub(crate) fn start_byte(&self) -> usize {
        self.start_byte as usize
    }

    /// Wire form: identity halves first, then kind, then context.
    pub(crate) fn to_fields(self) -> [u32; NODE_FIELD_COUNT] {
        [
            self.id as u32,
            (self.id >> 32) as u32,
            u32::from(self.kind_id),
            self.start_byte,
            self.start_row,
            self.start_column,
        ]
    }

    pub(crate) fn from_fields(fields: [u32; NODE_FIELD_COUNT]) -> Self {
        Self {
            id: u64::from(fields[0]) | (u64::from(fields[1]) << 32),
            kind_id: fields[2] as u16,
            start_byte: fields[3],
            start_row: fields[4],
            start_column: fields[5],
        }
    }

    /// Shift the context words across an edit, the same arithmetic the engine
    /// applies to its own nodes. Identity and kind are untouched.
    pub(crate) fn shift(&mut self, edit: &InputEdit) {
        let start_byte = self.start_byte as usize;
        let start_point = Point::new(self.start_row as usize, self.start_column as usize);

        let (new_byte, new_point) = if start_byte >= edit.old_end_byte {
            (
                edit.new_end_byte + (start_byte - edit.old_end_byte),
                point_add(
                    edit.new_end_position,
                    point_sub(start_point, edit.old_end_position),
                ),
            )
        } else if start_byte > edit.start_byte {
            (edit.new_end_byte, edit.new_end_position)
        } else {
            return;
        };

        self.start_byte = new_byte as u32;
        self.start_row = new_point.row as u32;
        self.start_column = new_point.column as u32;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handle(id: u64, start_byte: u32, row: u32, column: u32) -> NodeHandle {
        NodeHandle {
            id,
            kind_id: 7,
            start_byte,
            start_row: row,
            start_column: column,
        }
    }

    #[test]
    fn null_handle() {
        assert!(NodeHandle::NULL.is_null());
        assert!(!handle(1, 0, 0, 0).is_null());
    }

    #[test]
    fn wire_round_trip() {
        let h = handle(0xDEAD_BEEF_CAFE, 42, 3, 9);
        assert_eq!(NodeHandle::from_fields(h.to_fields()), h);
    }

    #[test]
    fn identity_splits_into_halves() {
        let fields = handle(0x1_0000_0002, 0, 0, 0).to_fields();
        assert_eq!(fields[0], 2);
        assert_eq!(fields[1], 1);
    }

    #[test]
    fn shift_after_insertion() {
        // Insert 3 bytes at offset 10 on row 0; a node starting later on the
        // same row moves right, a node on a later row keeps its column.
        let edit = InputEdit {
            start_byte: 10,
            old_end_byte: 10,
            new_end_byte: 13,
            start_position: Point::new(0, 10),
            old_end_position: Point::new(0, 10),
            new_end_position: Point::new(0, 13),
        };

        let mut same_row = handle(1, 20, 0, 20);
        same_row.shift(&edit);
        assert_eq!(same_row.start_byte(), 23);
        assert_eq!(same_row.start_column, 23);

        let mut later_row = handle(2, 30, 2, 4);
        later_row.shift(&edit);
        assert_eq!(later_row.start_byte(), 33);
        assert_eq!(later_row.start_row, 2);
        assert_eq!(later_row.start_column, 4);

        let mut before = handle(3, 5, 0, 5);
        before.shift(&edit);
        assert_eq!(before.start_byte(), 5);
    }

    #[test]
    fn shift_inside_replaced_span_clamps_to_new_end() {
        let edit = InputEdit {
            start_byte: 4,
            old_end_byte: 10,
            new_end_byte: 6,
            start_position: Point::new(0, 4),
            old_end_position: Point::new(0, 10),
            new_end_position: Point::new(0, 6),
        };

        let mut inside = handle(1, 7, 0, 7);
        inside.shift(&edit);
        assert_eq!(inside.start_byte(), 6);
        assert_eq!(inside.start_column, 6);
    }
}
