//! Turn synchronization state machine.
//!
//! [`Synchronizer`] decides, for every timer tick or local move, whether to
//! poll, submit or stay idle, and folds server responses back into the local
//! [`Board`]. It performs no I/O itself: it hands out [`Dispatch`]es for the
//! caller to send and takes the results back through [`Synchronizer::complete`].
//! At most one dispatch is outstanding at any time.

use crate::config::RetryPolicy;
use crate::protocol::{Request, RequestKind, Response, ResponseStatus};
use crate::transport::TransportError;
use derive_more::{Display, Error, From};
use tictac_board::{Board, Move, Outcome, Player, Position, Rejected};
use tracing::{debug, info, instrument, warn};

/// Why a local move was refused before reaching the network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Error, From)]
pub enum InvalidMove {
    /// It is the opponent's turn.
    #[display("Waiting for the opponent")]
    NotLocalTurn,
    /// A previous request has not completed yet.
    #[display("A request is still in flight")]
    Busy,
    /// The board refused the move.
    #[display("{_0}")]
    #[from]
    Rejected(Rejected),
}

/// What an outstanding request was for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pending {
    /// Polling for the opponent's move.
    Poll,
    /// Submitting the local move at this position.
    Submit(Position),
}

/// Identifies one outstanding request and the game it belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket {
    pending: Pending,
    generation: u64,
}

impl Ticket {
    /// What the request was for.
    pub fn pending(&self) -> Pending {
        self.pending
    }
}

/// A request the caller must send, tagged with its ticket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dispatch {
    /// Hand back to [`Synchronizer::complete`] with the result.
    pub ticket: Ticket,
    /// Request to send.
    pub request: Request,
}

/// Result of folding a response into the synchronizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completed {
    /// The opponent's move was applied to the board.
    OpponentMoved(Move),
    /// The server has no move for us yet.
    NoMoveYet,
    /// The local move submission finished; the board already holds the move.
    Submitted {
        /// Submitted square.
        position: Position,
        /// Whether the server answered `SUCCESS`.
        acknowledged: bool,
    },
    /// The request failed at the transport or protocol level.
    Failed {
        /// Which request failed.
        kind: RequestKind,
        /// Failures in a row, this one included.
        consecutive: u32,
    },
    /// The request failed and the retry policy stopped polling.
    GaveUp {
        /// Failures in a row, this one included.
        consecutive: u32,
    },
    /// The server reported a move the local board cannot accept.
    Conflict(Rejected),
    /// The response belongs to a game that has since been reset.
    Stale,
}

impl Completed {
    /// True when the completion counted towards the consecutive failures.
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            Completed::Failed { .. }
                | Completed::GaveUp { .. }
                | Completed::Submitted {
                    acknowledged: false,
                    ..
                }
        )
    }
}

/// Client-side turn synchronizer.
#[derive(Debug, Clone)]
pub struct Synchronizer {
    board: Board,
    in_flight: Option<Ticket>,
    generation: u64,
    consecutive_failures: u32,
    retry: RetryPolicy,
    gave_up: bool,
    terminal_reported: bool,
}

impl Synchronizer {
    /// Creates a synchronizer around a fresh or restored board.
    pub fn new(board: Board, retry: RetryPolicy) -> Self {
        Self {
            board,
            in_flight: None,
            generation: 0,
            consecutive_failures: 0,
            retry,
            gave_up: false,
            terminal_reported: false,
        }
    }

    /// Local board replica.
    pub fn board(&self) -> &Board {
        &self.board
    }

    /// Current outcome.
    pub fn outcome(&self) -> Outcome {
        self.board.evaluate_outcome()
    }

    /// Turn flag: true while the client should poll for the opponent's move.
    pub fn should_poll(&self) -> bool {
        !self.board.is_local_turn() && !self.outcome().is_terminal()
    }

    /// True while a request is outstanding.
    pub fn is_busy(&self) -> bool {
        self.in_flight.is_some()
    }

    /// True once the retry policy stopped polling.
    pub fn gave_up(&self) -> bool {
        self.gave_up
    }

    /// Failed requests in a row.
    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    /// Handles a timer tick. Returns a poll to send, or `None` to stay idle.
    #[instrument(skip(self), fields(turn = %self.board.turn(), busy = self.is_busy()))]
    pub fn on_tick(&mut self) -> Option<Dispatch> {
        if !self.should_poll() || self.gave_up {
            return None;
        }
        if self.is_busy() {
            debug!("Previous request outstanding, skipping tick");
            return None;
        }
        Some(self.dispatch(Pending::Poll, Request::RequestMove))
    }

    /// Handles a local click on (`row`, `col`).
    ///
    /// On success the move is already on the board and the returned dispatch
    /// must be sent. The move stays on the board whatever the server answers.
    ///
    /// # Errors
    ///
    /// Refuses without touching the board or the network when the game is over,
    /// it is not the local player's turn, the square is off the board or taken,
    /// or another request is outstanding.
    #[instrument(skip(self), fields(turn = %self.board.turn()))]
    pub fn on_local_move(&mut self, row: usize, col: usize) -> Result<Dispatch, InvalidMove> {
        if self.outcome().is_terminal() {
            return Err(Rejected::GameOver.into());
        }
        if !self.board.is_local_turn() {
            return Err(InvalidMove::NotLocalTurn);
        }
        let pos = Position::from_coords(row, col).ok_or(Rejected::OutOfBounds { row, col })?;
        if !self.board.is_empty(pos) {
            return Err(Rejected::Occupied(pos).into());
        }
        if self.is_busy() {
            return Err(InvalidMove::Busy);
        }

        let local = self.board.local_player();
        self.board.apply_move(row, col, local)?;
        info!(position = %pos, "Local move applied");
        Ok(self.dispatch(Pending::Submit(pos), Request::SendMove(pos)))
    }

    /// Folds the result of a dispatched request back in.
    #[instrument(skip(self, result), fields(pending = ?ticket.pending))]
    pub fn complete(
        &mut self,
        ticket: Ticket,
        result: Result<Response, TransportError>,
    ) -> Completed {
        if self.in_flight == Some(ticket) {
            self.in_flight = None;
        }
        if ticket.generation != self.generation {
            debug!("Discarding response from a previous game");
            return Completed::Stale;
        }

        let kind = match ticket.pending {
            Pending::Poll => RequestKind::RequestMove,
            Pending::Submit(_) => RequestKind::SendMove,
        };
        let response = match result {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, %kind, "Request failed");
                return self.record_failure(kind);
            }
        };
        if response.status() == ResponseStatus::Failure {
            warn!(%kind, "Server answered FAILURE");
            return match (ticket.pending, self.record_failure(kind)) {
                (Pending::Submit(position), Completed::Failed { .. }) => Completed::Submitted {
                    position,
                    acknowledged: false,
                },
                (_, completed) => completed,
            };
        }

        match (ticket.pending, response) {
            (Pending::Poll, Response::Move { position: None, .. }) => {
                self.consecutive_failures = 0;
                Completed::NoMoveYet
            }
            (Pending::Poll, Response::Move { position: Some(pos), .. }) => {
                self.consecutive_failures = 0;
                self.apply_remote(pos)
            }
            (Pending::Submit(position), Response::Ack { .. }) => {
                self.consecutive_failures = 0;
                Completed::Submitted {
                    position,
                    acknowledged: true,
                }
            }
            (_, other) => {
                warn!(response = ?other, %kind, "Response does not match request");
                self.record_failure(kind)
            }
        }
    }

    /// Returns the terminal outcome the first time it is observed after a move.
    pub fn take_terminal(&mut self) -> Option<Outcome> {
        let outcome = self.outcome();
        if outcome.is_terminal() && !self.terminal_reported {
            self.terminal_reported = true;
            Some(outcome)
        } else {
            None
        }
    }

    /// Starts a new game with the same local identity.
    #[instrument(skip(self))]
    pub fn reset(&mut self) {
        self.board.reset();
        self.rearm();
    }

    /// Starts a new game with a newly negotiated local identity.
    #[instrument(skip(self))]
    pub fn rematch(&mut self, local_player: Player) {
        self.board.rematch(local_player);
        self.rearm();
    }

    fn rearm(&mut self) {
        self.generation += 1;
        self.consecutive_failures = 0;
        self.gave_up = false;
        self.terminal_reported = false;
        info!(local_player = %self.board.local_player(), "Board reset");
    }

    fn dispatch(&mut self, pending: Pending, request: Request) -> Dispatch {
        let ticket = Ticket {
            pending,
            generation: self.generation,
        };
        self.in_flight = Some(ticket);
        Dispatch { ticket, request }
    }

    fn apply_remote(&mut self, pos: Position) -> Completed {
        let opponent = self.board.local_player().opponent();
        match self.board.apply_move(pos.row(), pos.col(), opponent) {
            Ok(_) => {
                info!(position = %pos, "Opponent move applied");
                Completed::OpponentMoved(Move::new(opponent, pos))
            }
            Err(rejected) => {
                warn!(position = %pos, error = %rejected, "Server move conflicts with local board");
                Completed::Conflict(rejected)
            }
        }
    }

    fn record_failure(&mut self, kind: RequestKind) -> Completed {
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        if let RetryPolicy::GiveUpAfter(limit) = self.retry {
            if self.consecutive_failures >= limit && !self.gave_up {
                warn!(failures = self.consecutive_failures, "Giving up polling");
                self.gave_up = true;
                return Completed::GaveUp {
                    consecutive: self.consecutive_failures,
                };
            }
        }
        Completed::Failed {
            kind,
            consecutive: self.consecutive_failures,
        }
    }
}
