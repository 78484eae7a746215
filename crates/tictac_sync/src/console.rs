//! Line-based terminal frontend.

use anyhow::Result;
use tictac_sync::{Board, BoardObserver, Outcome, PlayError, Position, SyncHandle};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info, instrument, warn};

const HELP: &str = "Enter 1-9 or \"row col\" (0-2) to move, r to restart, s to swap sides, q to quit.";

/// A line of user input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Input {
    /// Claim the square at row and column.
    Move { row: usize, col: usize },
    /// New game, same side.
    Reset,
    /// New game, other side.
    Swap,
    /// Leave.
    Quit,
}

/// Parses one line of input.
pub fn parse_input(line: &str) -> Option<Input> {
    let words: Vec<&str> = line.split_whitespace().collect();
    match words.as_slice() {
        ["q" | "quit"] => Some(Input::Quit),
        ["r" | "restart"] => Some(Input::Reset),
        ["s" | "swap"] => Some(Input::Swap),
        [digit] => {
            let n: usize = digit.parse().ok()?;
            let pos = Position::from_index(n.checked_sub(1)?)?;
            Some(Input::Move {
                row: pos.row(),
                col: pos.col(),
            })
        }
        [row, col] => Some(Input::Move {
            row: row.parse().ok()?,
            col: col.parse().ok()?,
        }),
        _ => None,
    }
}

/// Prints the board whenever the synchronizer reports a change.
#[derive(Debug, Default)]
pub struct ConsoleView;

impl BoardObserver for ConsoleView {
    fn on_board_changed(&mut self, board: &Board, _outcome: Outcome) {
        println!(
            "\nYou are {}\n{}\n\n{}",
            board.local_player().mark(),
            board.display(),
            board.status_line()
        );
    }

    fn on_terminal(&mut self, outcome: Outcome) {
        println!("{outcome}. Play again? r = same side, s = swap sides, q = quit");
    }

    fn on_connection_trouble(&mut self, consecutive_failures: u32) {
        println!("Server not answering ({consecutive_failures} failed requests), still trying...");
    }

    fn on_gave_up(&mut self, consecutive_failures: u32) {
        println!("Stopped polling after {consecutive_failures} failed requests. r restarts.");
    }
}

/// Reads moves from stdin until the user quits or stdin closes.
#[instrument(skip_all)]
pub async fn run(handle: &SyncHandle) -> Result<()> {
    println!("{HELP}");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines.next_line().await? {
        let Some(input) = parse_input(&line) else {
            println!("{HELP}");
            continue;
        };
        debug!(?input, "User input");
        match input {
            Input::Quit => {
                info!("User quit");
                break;
            }
            Input::Reset => handle.reset()?,
            Input::Swap => {
                let board = handle.board().await?;
                handle.rematch(board.local_player().opponent())?;
            }
            Input::Move { row, col } => match handle.play(row, col).await {
                Ok(()) => {}
                Err(PlayError::Stopped) => return Err(PlayError::Stopped.into()),
                Err(PlayError::Invalid(e)) => {
                    warn!(error = %e, row, col, "Move refused");
                    println!("{e}");
                }
            },
        }
    }
    Ok(())
}
