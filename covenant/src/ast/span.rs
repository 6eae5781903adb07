//! Source location tracking

use serde::{Deserialize, Serialize};

/// A position in the source file.
///
/// Rows are 1-based and columns 0-based, the way the external parser
/// reports them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Location {
    pub row: u32,
    pub col: u32,
}

impl Location {
    pub fn new(row: u32, col: u32) -> Self {
        Self { row, col }
    }

    /// Byte offset of this location inside `source`, clamped to its length.
    pub fn offset_in(&self, source: &str) -> usize {
        let mut offset = 0;
        for (idx, line) in source.split_inclusive('\n').enumerate() {
            if idx + 1 == self.row as usize {
                let col = (self.col as usize).min(line.trim_end_matches('\n').len());
                return offset + col;
            }
            offset += line.len();
        }
        source.len()
    }
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.row, self.col)
    }
}

/// A value with source location
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Located<T> {
    pub node: T,
    #[serde(flatten)]
    pub loc: Location,
}

impl<T> Located<T> {
    pub fn new(node: T, loc: Location) -> Self {
        Self { node, loc }
    }

    pub fn at(node: T, row: u32, col: u32) -> Self {
        Self::new(node, Location::new(row, col))
    }
}
