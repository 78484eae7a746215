//! Runs a [`Synchronizer`] on its own task with a fixed-period poll timer.
//!
//! The event task owns the board and the observer. Each request runs on a
//! separate worker task and its result is posted back to the event task over
//! a channel, so board and observer state are only ever touched from one place.

use crate::config::{ClientConfig, ConfigError};
use crate::observer::BoardObserver;
use crate::protocol::Response;
use crate::synchronizer::{Completed, Dispatch, InvalidMove, Synchronizer, Ticket};
use crate::transport::{SharedTransport, Transport, TransportError};
use derive_more::{Display, Error, From};
use derive_new::new;
use std::sync::Arc;
use std::time::Duration;
use tictac_board::{Board, Player};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{Instrument, debug, error, info, info_span, instrument, warn};

type Completion = (Ticket, Result<Response, TransportError>);

enum Command {
    Play {
        row: usize,
        col: usize,
        reply: oneshot::Sender<Result<(), InvalidMove>>,
    },
    Reset,
    Rematch(Player),
    Snapshot(oneshot::Sender<Board>),
    Shutdown,
}

/// Error from a [`SyncHandle`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Error, From)]
pub enum PlayError {
    /// The move was refused locally.
    #[display("{_0}")]
    #[from]
    Invalid(InvalidMove),
    /// The synchronizer task is no longer running.
    #[display("Synchronizer has stopped")]
    Stopped,
}

/// Handle to a running synchronizer.
#[derive(Debug)]
pub struct SyncHandle {
    commands: mpsc::UnboundedSender<Command>,
    task: JoinHandle<()>,
}

impl std::fmt::Debug for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Command::Play { row, col, .. } => write!(f, "Play({row}, {col})"),
            Command::Reset => write!(f, "Reset"),
            Command::Rematch(player) => write!(f, "Rematch({player})"),
            Command::Snapshot(_) => write!(f, "Snapshot"),
            Command::Shutdown => write!(f, "Shutdown"),
        }
    }
}

impl SyncHandle {
    /// Plays the local move at (`row`, `col`).
    ///
    /// Resolves once the move is on the local board and its submission has
    /// been started; the server's answer is not awaited.
    pub async fn play(&self, row: usize, col: usize) -> Result<(), PlayError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Play { row, col, reply })?;
        rx.await.map_err(|_| PlayError::Stopped)??;
        Ok(())
    }

    /// Starts a new game keeping the local identity.
    pub fn reset(&self) -> Result<(), PlayError> {
        self.send(Command::Reset)
    }

    /// Starts a new game as `local_player`.
    pub fn rematch(&self, local_player: Player) -> Result<(), PlayError> {
        self.send(Command::Rematch(local_player))
    }

    /// Snapshot of the local board.
    pub async fn board(&self) -> Result<Board, PlayError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Snapshot(reply))?;
        rx.await.map_err(|_| PlayError::Stopped)
    }

    /// Stops the poll timer and waits for the task to exit. No observer
    /// callback runs after this returns.
    #[instrument(skip(self))]
    pub async fn shutdown(self) {
        let _ = self.commands.send(Command::Shutdown);
        if let Err(e) = self.task.await {
            error!(error = %e, "Synchronizer task failed");
        }
    }

    fn send(&self, command: Command) -> Result<(), PlayError> {
        self.commands.send(command).map_err(|_| PlayError::Stopped)
    }
}

/// Spawns the synchronizer for a new game as configured.
///
/// # Errors
///
/// Returns the validation error when `config` fails [`ClientConfig::validate`];
/// nothing is spawned in that case.
#[instrument(skip_all, fields(local_player = %config.local_player()))]
pub fn spawn<T, O>(
    config: &ClientConfig,
    transport: SharedTransport<T>,
    observer: O,
) -> Result<SyncHandle, ConfigError>
where
    T: Transport + 'static,
    O: BoardObserver + 'static,
{
    config.validate()?;
    let sync = Synchronizer::new(Board::new(*config.local_player()), *config.retry());
    let (commands, command_rx) = mpsc::unbounded_channel();
    let (done_tx, done_rx) = mpsc::unbounded_channel();
    let driver = Driver::new(sync, transport, observer, *config.trouble_threshold(), done_tx);
    let task = tokio::spawn(driver.run(
        command_rx,
        done_rx,
        config.initial_delay(),
        config.poll_interval(),
    ));
    info!("Synchronizer started");
    Ok(SyncHandle { commands, task })
}

#[derive(new)]
struct Driver<T, O> {
    sync: Synchronizer,
    transport: SharedTransport<T>,
    observer: O,
    trouble_threshold: u32,
    done_tx: mpsc::UnboundedSender<Completion>,
}

impl<T, O> Driver<T, O>
where
    T: Transport + 'static,
    O: BoardObserver,
{
    async fn run(
        mut self,
        mut commands: mpsc::UnboundedReceiver<Command>,
        mut done_rx: mpsc::UnboundedReceiver<Completion>,
        initial_delay: Duration,
        poll_interval: Duration,
    ) {
        let mut ticker = time::interval_at(Instant::now() + initial_delay, poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        self.notify_board();

        loop {
            tokio::select! {
                biased;
                command = commands.recv() => match command {
                    Some(Command::Shutdown) | None => break,
                    Some(command) => self.handle_command(command),
                },
                Some((ticket, result)) = done_rx.recv() => self.handle_completion(ticket, result),
                _ = ticker.tick() => {
                    if let Some(dispatch) = self.sync.on_tick() {
                        self.send(dispatch);
                    }
                }
            }
        }
        info!("Synchronizer stopped");
    }

    fn handle_command(&mut self, command: Command) {
        debug!(?command, "Handling command");
        match command {
            Command::Play { row, col, reply } => {
                let result = self.sync.on_local_move(row, col).map(|dispatch| {
                    self.send(dispatch);
                    self.notify_board();
                });
                if let Err(e) = &result {
                    debug!(error = %e, row, col, "Local move refused");
                }
                let _ = reply.send(result);
            }
            Command::Reset => {
                self.sync.reset();
                self.notify_board();
            }
            Command::Rematch(player) => {
                self.sync.rematch(player);
                self.notify_board();
            }
            Command::Snapshot(reply) => {
                let _ = reply.send(self.sync.board().clone());
            }
            Command::Shutdown => {}
        }
    }

    fn handle_completion(&mut self, ticket: Ticket, result: Result<Response, TransportError>) {
        let completed = self.sync.complete(ticket, result);
        if completed.is_failure() && self.sync.consecutive_failures() == self.trouble_threshold {
            self.observer
                .on_connection_trouble(self.sync.consecutive_failures());
        }
        match completed {
            Completed::OpponentMoved(mv) => {
                debug!(%mv, "Opponent moved");
                self.notify_board();
            }
            Completed::GaveUp { consecutive } => {
                warn!(consecutive, "Polling stopped until the next reset");
                self.observer.on_gave_up(consecutive);
            }
            other => debug!(completed = ?other, "Request completed"),
        }
    }

    fn notify_board(&mut self) {
        self.observer
            .on_board_changed(self.sync.board(), self.sync.outcome());
        if let Some(outcome) = self.sync.take_terminal() {
            info!(%outcome, "Game over");
            self.observer.on_terminal(outcome);
        }
    }

    fn send(&self, dispatch: Dispatch) {
        let transport = Arc::clone(&self.transport);
        let done_tx = self.done_tx.clone();
        let span = info_span!("request", kind = %dispatch.request.kind());
        tokio::spawn(
            async move {
                let result = transport.lock().await.send_request(dispatch.request).await;
                let _ = done_tx.send((dispatch.ticket, result));
            }
            .instrument(span),
        );
    }
}
