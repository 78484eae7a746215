//! Board positions and their linear-index encoding.

use serde::{Deserialize, Serialize};

/// Side length of the board.
pub const SIDE: usize = 3;

/// A position on the board.
///
/// The linear index (`row * 3 + col`) is the encoding used in wire payloads.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::EnumIter,
)]
pub enum Position {
    /// Row 0, column 0.
    TopLeft,
    /// Row 0, column 1.
    TopCenter,
    /// Row 0, column 2.
    TopRight,
    /// Row 1, column 0.
    MiddleLeft,
    /// Row 1, column 1.
    Center,
    /// Row 1, column 2.
    MiddleRight,
    /// Row 2, column 0.
    BottomLeft,
    /// Row 2, column 1.
    BottomCenter,
    /// Row 2, column 2.
    BottomRight,
}

impl Position {
    /// Every square, ordered by linear index.
    pub const ALL: [Position; 9] = [
        Position::TopLeft,
        Position::TopCenter,
        Position::TopRight,
        Position::MiddleLeft,
        Position::Center,
        Position::MiddleRight,
        Position::BottomLeft,
        Position::BottomCenter,
        Position::BottomRight,
    ];

    /// Short human-readable name.
    pub fn label(&self) -> &'static str {
        const LABELS: [&str; 9] = [
            "top left",
            "top",
            "top right",
            "left",
            "center",
            "right",
            "bottom left",
            "bottom",
            "bottom right",
        ];
        LABELS[self.to_index()]
    }

    /// Converts to the linear index (0-8).
    pub fn to_index(self) -> usize {
        self as usize
    }

    /// Creates a position from a linear index.
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Creates a position from row and column, `None` when out of bounds.
    pub fn from_coords(row: usize, col: usize) -> Option<Self> {
        if row >= SIDE || col >= SIDE {
            return None;
        }
        Self::from_index(row * SIDE + col)
    }

    /// Row of this position (0-2).
    pub fn row(self) -> usize {
        self.to_index() / SIDE
    }

    /// Column of this position (0-2).
    pub fn col(self) -> usize {
        self.to_index() % SIDE
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({}, {})", self.label(), self.row(), self.col())
    }
}
