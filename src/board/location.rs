//! Grid coordinates.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A cell on the board grid, addressed by row and column.
///
/// Coordinates are signed so that off-board requests from clients can be
/// represented and rejected by lookup rather than at parse time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Location {
    pub row: i32,
    pub column: i32,
}

impl Location {
    pub const fn new(row: i32, column: i32) -> Self {
        Self { row, column }
    }

    /// Returns true if `other` shares an edge with this cell (no diagonals).
    pub fn is_orthogonal_to(self, other: Location) -> bool {
        let dr = (self.row - other.row).abs();
        let dc = (self.column - other.column).abs();
        dr + dc == 1
    }

    /// The four orthogonal neighbours, which may lie off the board.
    pub fn orthogonal(self) -> [Location; 4] {
        [
            Location::new(self.row - 1, self.column),
            Location::new(self.row + 1, self.column),
            Location::new(self.row, self.column - 1),
            Location::new(self.row, self.column + 1),
        ]
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.column)
    }
}
