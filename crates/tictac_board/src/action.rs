//! Moves and the reasons a move can be refused.

use super::{Player, Position};
use serde::{Deserialize, Serialize};

/// A player placing their mark at a position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Move {
    /// The player making the move.
    pub player: Player,
    /// The position where the mark goes.
    pub position: Position,
}

impl Move {
    /// Creates a new move.
    pub fn new(player: Player, position: Position) -> Self {
        Self { player, position }
    }
}

impl std::fmt::Display for Move {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} -> {}", self.player.mark(), self.position.label())
    }
}

/// Why the board refused a move. The board is never mutated on rejection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display, derive_more::Error)]
pub enum Rejected {
    /// Row or column outside `0..3`.
    #[display("Coordinates ({row}, {col}) are off the board")]
    OutOfBounds {
        /// Requested row.
        row: usize,
        /// Requested column.
        col: usize,
    },

    /// The square already holds a mark.
    #[display("Square {_0} is already occupied")]
    Occupied(#[error(not(source))] Position),

    /// The mover is not the player whose turn it is.
    #[display("It's not player {_0}'s turn")]
    NotYourTurn(#[error(not(source))] Player),

    /// The game already reached a terminal state.
    #[display("Game is already over")]
    GameOver,
}
