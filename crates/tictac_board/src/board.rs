//! Local board replica: cells, turn and the local player's identity.

use super::rules;
use super::{Move, Outcome, Player, Position, Rejected, Square};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

/// 3x3 board as one client sees it.
///
/// Cells change only through [`Board::apply_move`] and are cleared only by
/// [`Board::reset`] or [`Board::rematch`]. The turn flips exactly once per
/// accepted move.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Board {
    /// Squares in row-major order (0-8).
    squares: [Square; 9],
    /// Player allowed to move next.
    turn: Player,
    /// Player this client represents.
    local_player: Player,
}

impl Board {
    /// Creates an empty board with player one to move.
    pub fn new(local_player: Player) -> Self {
        Self {
            squares: [Square::Empty; 9],
            turn: Player::One,
            local_player,
        }
    }

    /// Gets the square at a position.
    pub fn get(&self, pos: Position) -> Square {
        self.squares[pos.to_index()]
    }

    /// Checks if a square is empty.
    pub fn is_empty(&self, pos: Position) -> bool {
        self.get(pos) == Square::Empty
    }

    /// Returns all squares.
    pub fn squares(&self) -> &[Square; 9] {
        &self.squares
    }

    /// Player allowed to move next.
    pub fn turn(&self) -> Player {
        self.turn
    }

    /// Player this client represents.
    pub fn local_player(&self) -> Player {
        self.local_player
    }

    /// True when the next move belongs to this client.
    pub fn is_local_turn(&self) -> bool {
        self.turn == self.local_player
    }

    /// Places `mover`'s mark at (`row`, `col`) and hands the turn over.
    ///
    /// Returns the player who moved.
    ///
    /// # Errors
    ///
    /// Rejects coordinates off the board, occupied squares, moves out of turn
    /// and any move once the game is over. A rejected move leaves the board
    /// untouched.
    #[instrument(skip(self), fields(turn = %self.turn))]
    pub fn apply_move(&mut self, row: usize, col: usize, mover: Player) -> Result<Player, Rejected> {
        let pos = Position::from_coords(row, col).ok_or(Rejected::OutOfBounds { row, col })?;
        if self.evaluate_outcome().is_terminal() {
            return Err(Rejected::GameOver);
        }
        if !self.is_empty(pos) {
            return Err(Rejected::Occupied(pos));
        }
        if mover != self.turn {
            return Err(Rejected::NotYourTurn(mover));
        }

        self.squares[pos.to_index()] = Square::Occupied(mover);
        self.turn = mover.opponent();
        debug!(mv = %Move::new(mover, pos), "Move applied");
        Ok(mover)
    }

    /// Derives the outcome from the current cells.
    ///
    /// Lines are checked rows first, then columns, then diagonals.
    pub fn evaluate_outcome(&self) -> Outcome {
        rules::evaluate(&self.squares)
    }

    /// Clears the board for a new game; the local identity is kept.
    #[instrument(skip(self))]
    pub fn reset(&mut self) {
        self.squares = [Square::Empty; 9];
        self.turn = Player::One;
    }

    /// Clears the board and assigns a new local identity.
    #[instrument(skip(self))]
    pub fn rematch(&mut self, local_player: Player) {
        self.reset();
        self.local_player = local_player;
    }

    /// Short status from the local player's point of view.
    pub fn status_line(&self) -> &'static str {
        match self.evaluate_outcome() {
            Outcome::Won(p) if p == self.local_player => "You won",
            Outcome::Won(_) => "Opponent won",
            Outcome::Tie => "Tie Game",
            Outcome::InProgress if self.is_local_turn() => "Your Turn",
            Outcome::InProgress => "Waiting for Opponent",
        }
    }

    /// Formats the board as text, numbering empty squares 1-9.
    pub fn display(&self) -> String {
        let mut result = String::new();
        for (i, square) in self.squares.iter().enumerate() {
            if i > 0 && i % 3 == 0 {
                result.push_str("\n---+---+---\n");
            }
            match square {
                Square::Empty => result.push_str(&format!(" {} ", i + 1)),
                Square::Occupied(p) => result.push_str(&format!(" {} ", p.mark())),
            }
            if i % 3 < 2 {
                result.push('|');
            }
        }
        result
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::new(Player::One)
    }
}
