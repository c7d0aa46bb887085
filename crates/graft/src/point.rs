//! Source positions, spans, and edit descriptions.

use tree_sitter as ts;

/// A row/column position in source text. Columns are byte offsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, serde::Serialize)]
pub struct Point {
    pub row: usize,
    pub column: usize,
}

impl Point {
    pub const ZERO: Point = Point { row: 0, column: 0 };

    pub fn new(row: usize, column: usize) -> Self {
        Self { row, column }
    }

    pub(crate) fn from_ts(point: ts::Point) -> Self {
        Self {
            row: point.row,
            column: point.column,
        }
    }

    pub(crate) fn to_ts(self) -> ts::Point {
        ts::Point {
            row: self.row,
            column: self.column,
        }
    }
}

impl std::fmt::Display for Point {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.row, self.column)
    }
}

/// A byte-and-point span in source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct Range {
    pub start_byte: usize,
    pub end_byte: usize,
    pub start_point: Point,
    pub end_point: Point,
}

impl Range {
    pub(crate) fn from_ts(range: ts::Range) -> Self {
        Self {
            start_byte: range.start_byte,
            end_byte: range.end_byte,
            start_point: Point::from_ts(range.start_point),
            end_point: Point::from_ts(range.end_point),
        }
    }
}

/// Description of one text edit, in the engine's terms: the replaced span
/// (start to old end) and the span of the replacement (start to new end).
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct InputEdit {
    pub start_byte: usize,
    pub old_end_byte: usize,
    pub new_end_byte: usize,
    pub start_position: Point,
    pub old_end_position: Point,
    pub new_end_position: Point,
}

impl InputEdit {
    pub(crate) fn to_ts(self) -> ts::InputEdit {
        ts::InputEdit {
            start_byte: self.start_byte,
            old_end_byte: self.old_end_byte,
            new_end_byte: self.new_end_byte,
            start_position: self.start_position.to_ts(),
            old_end_position: self.old_end_position.to_ts(),
            new_end_position: self.new_end_position.to_ts(),
        }
    }
}

/// `b` advanced by `a`-relative offset `b - a` folded into `point_add`:
/// positions on the same row combine columns, later rows keep their column.
pub(crate) fn point_add(left: Point, right: Point) -> Point {
    if right.row == 0 {
        Point::new(left.row, left.column + right.column)
    } else {
        Point::new(left.row + right.row, right.column)
    }
}

pub(crate) fn point_sub(left: Point, right: Point) -> Point {
    if left.row == right.row {
        Point::new(0, left.column.saturating_sub(right.column))
    } else {
        Point::new(left.row.saturating_sub(right.row), left.column)
    }
}
