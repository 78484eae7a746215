//! Win and tie detection.

use super::{Outcome, Player, Position, Square};
use tracing::instrument;

/// Every line that wins the game, evaluated in order: rows, columns, diagonals.
pub const LINES: [[Position; 3]; 8] = [
    // Rows
    [Position::TopLeft, Position::TopCenter, Position::TopRight],
    [Position::MiddleLeft, Position::Center, Position::MiddleRight],
    [Position::BottomLeft, Position::BottomCenter, Position::BottomRight],
    // Columns
    [Position::TopLeft, Position::MiddleLeft, Position::BottomLeft],
    [Position::TopCenter, Position::Center, Position::BottomCenter],
    [Position::TopRight, Position::MiddleRight, Position::BottomRight],
    // Diagonals
    [Position::TopLeft, Position::Center, Position::BottomRight],
    [Position::TopRight, Position::Center, Position::BottomLeft],
];

/// Returns the owner of the first complete line, if any.
#[instrument(skip(squares))]
pub fn check_winner(squares: &[Square; 9]) -> Option<Player> {
    LINES.iter().find_map(|[a, b, c]| {
        let sq = squares[a.to_index()];
        if sq == squares[b.to_index()] && sq == squares[c.to_index()] {
            sq.occupant()
        } else {
            None
        }
    })
}

/// True when no square is empty.
pub fn is_full(squares: &[Square; 9]) -> bool {
    squares.iter().all(|s| *s != Square::Empty)
}

/// Derives the outcome from cell contents alone.
#[instrument(skip(squares))]
pub fn evaluate(squares: &[Square; 9]) -> Outcome {
    if let Some(winner) = check_winner(squares) {
        Outcome::Won(winner)
    } else if is_full(squares) {
        Outcome::Tie
    } else {
        Outcome::InProgress
    }
}
