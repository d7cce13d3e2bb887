//! Source offsets and line tables.
//!
//! IR nodes carry byte offsets into their file. Trap locations are
//! line/column based, so every source file ships a [`LineTable`] holding the
//! offset at which each line starts.
//!
//! ## Coordinate Conventions
//!
//! - Offsets and table lines/columns are **0-indexed**
//! - An offset of [`UNDEFINED_OFFSET`] means the node has no position
//!   (synthesized by the compiler)

use serde::{Deserialize, Serialize};

/// Offset of a node without a source position.
pub const UNDEFINED_OFFSET: i32 = -1;

// ============================================================================
// Span
// ============================================================================

/// Half-open byte range `[start, end)` within a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    pub start: i32,
    pub end: i32,
}

impl Default for Span {
    fn default() -> Self {
        Span::UNDEFINED
    }
}

impl Span {
    pub const UNDEFINED: Span = Span {
        start: UNDEFINED_OFFSET,
        end: UNDEFINED_OFFSET,
    };

    pub fn new(start: i32, end: i32) -> Self {
        Span { start, end }
    }

    /// Whether either end is unknown.
    pub fn is_undefined(&self) -> bool {
        self.start == UNDEFINED_OFFSET || self.end == UNDEFINED_OFFSET
    }
}

// ============================================================================
// LineTable
// ============================================================================

/// Start offsets of every line in a file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LineTable {
    line_starts: Vec<u32>,
}

impl Default for LineTable {
    fn default() -> Self {
        LineTable {
            line_starts: vec![0],
        }
    }
}

impl LineTable {
    /// Build from explicit line start offsets. The first line always starts
    /// at offset 0, whether or not the caller included it.
    pub fn new(mut line_starts: Vec<u32>) -> Self {
        if line_starts.first() != Some(&0) {
            line_starts.insert(0, 0);
        }
        line_starts.dedup();
        LineTable { line_starts }
    }

    /// Build by scanning text for `\n`.
    pub fn from_text(text: &str) -> Self {
        let mut line_starts = vec![0u32];
        for (i, byte) in text.bytes().enumerate() {
            if byte == b'\n' {
                line_starts.push(i as u32 + 1);
            }
        }
        LineTable { line_starts }
    }

    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    /// 0-indexed line containing `offset`.
    pub fn line_of(&self, offset: u32) -> u32 {
        match self.line_starts.binary_search(&offset) {
            Ok(line) => line as u32,
            Err(insert_at) => insert_at.saturating_sub(1) as u32,
        }
    }

    /// 0-indexed column of `offset` within its line.
    pub fn column_of(&self, offset: u32) -> u32 {
        let line = self.line_of(offset) as usize;
        offset - self.line_starts[line]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_table_from_text() {
        let table = LineTable::from_text("ab\ncd\n\nef");
        assert_eq!(table.line_count(), 4);
        assert_eq!(table.line_of(0), 0);
        assert_eq!(table.line_of(2), 0);
        assert_eq!(table.line_of(3), 1);
        assert_eq!(table.column_of(4), 1);
        assert_eq!(table.line_of(6), 2);
        assert_eq!(table.line_of(7), 3);
        assert_eq!(table.column_of(8), 1);
    }

    #[test]
    fn test_line_table_new_inserts_origin() {
        let table = LineTable::new(vec![5, 10]);
        assert_eq!(table.line_count(), 3);
        assert_eq!(table.line_of(4), 0);
        assert_eq!(table.line_of(5), 1);
        assert_eq!(table.column_of(12), 2);
    }

    #[test]
    fn test_span_undefined() {
        assert!(Span::UNDEFINED.is_undefined());
        assert!(Span::new(3, -1).is_undefined());
        assert!(!Span::new(0, 4).is_undefined());
        assert_eq!(Span::default(), Span::UNDEFINED);
    }
}
