//! Callbacks from the synchronizer to the presentation layer.

use tictac_board::{Board, Outcome};
use tokio::sync::mpsc;

/// Receives board updates on the synchronizer's task.
///
/// Callbacks run one at a time and never after the synchronizer has shut down.
pub trait BoardObserver: Send {
    /// Called after every accepted move, local or remote, and after a reset.
    fn on_board_changed(&mut self, board: &Board, outcome: Outcome);

    /// Called once when the game reaches a win or a tie.
    fn on_terminal(&mut self, _outcome: Outcome) {}

    /// Called when consecutive request failures reach the configured threshold.
    fn on_connection_trouble(&mut self, _consecutive_failures: u32) {}

    /// Called when the retry policy stops polling. Polling resumes after a
    /// reset or rematch.
    fn on_gave_up(&mut self, _consecutive_failures: u32) {}
}

/// Observer notifications as values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEvent {
    /// Board changed.
    BoardChanged {
        /// Snapshot after the change.
        board: Board,
        /// Outcome after the change.
        outcome: Outcome,
    },
    /// Game ended.
    Terminal(Outcome),
    /// Requests keep failing.
    ConnectionTrouble(u32),
    /// Polling stopped after this many failures.
    GaveUp(u32),
}

/// Forwards notifications to a channel; a closed receiver is ignored.
impl BoardObserver for mpsc::UnboundedSender<SyncEvent> {
    fn on_board_changed(&mut self, board: &Board, outcome: Outcome) {
        let _ = self.send(SyncEvent::BoardChanged {
            board: board.clone(),
            outcome,
        });
    }

    fn on_terminal(&mut self, outcome: Outcome) {
        let _ = self.send(SyncEvent::Terminal(outcome));
    }

    fn on_connection_trouble(&mut self, consecutive_failures: u32) {
        let _ = self.send(SyncEvent::ConnectionTrouble(consecutive_failures));
    }

    fn on_gave_up(&mut self, consecutive_failures: u32) {
        let _ = self.send(SyncEvent::GaveUp(consecutive_failures));
    }
}
