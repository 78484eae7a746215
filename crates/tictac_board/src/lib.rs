//! Tic-tac-toe board state machine.
//!
//! A [`Board`] is the local replica a networked client keeps of the game the
//! server arbitrates. It performs no I/O: moves come in through
//! [`Board::apply_move`] and the [`Outcome`] is recomputed from the cells on
//! demand.
//!
//! ```
//! use tictac_board::{Board, Outcome, Player};
//!
//! let mut board = Board::new(Player::One);
//! board.apply_move(1, 1, Player::One)?;
//! assert_eq!(board.turn(), Player::Two);
//! assert_eq!(board.evaluate_outcome(), Outcome::InProgress);
//! # Ok::<(), tictac_board::Rejected>(())
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod action;
mod board;
mod position;
pub mod rules;
mod types;

pub use action::{Move, Rejected};
pub use board::Board;
pub use position::{Position, SIDE};
pub use types::{Outcome, Player, Square};
