//! Client-side turn synchronization for server-arbitrated tic-tac-toe.
//!
//! Two clients never talk to each other. Each keeps a local [`Board`] replica
//! and talks to the game server over one socket: it submits its own moves and,
//! while it is the opponent's turn, polls for theirs on a fixed period.
//!
//! # Architecture
//!
//! - **Transport**: [`SocketTransport`] performs one request/response exchange
//!   at a time over a length-prefixed JSON socket protocol.
//! - **Synchronizer**: [`Synchronizer`] is the I/O-free turn state machine.
//! - **Driver**: [`spawn`] runs a synchronizer on its own task with a poll
//!   timer, reporting to a [`BoardObserver`].
//!
//! # Example
//!
//! ```no_run
//! use tictac_sync::{ClientConfig, SocketTransport, SyncEvent, shared, spawn};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = ClientConfig::default();
//! let transport = SocketTransport::connect(
//!     config.server_addr().as_str(),
//!     config.request_timeout(),
//!     *config.reconnect(),
//! )
//! .await?;
//! let (events, mut rx) = tokio::sync::mpsc::unbounded_channel::<SyncEvent>();
//! let handle = spawn(&config, shared(transport), events)?;
//! handle.play(1, 1).await?;
//! while let Some(event) = rx.recv().await {
//!     if let SyncEvent::Terminal(outcome) = event {
//!         println!("{outcome}");
//!         break;
//!     }
//! }
//! handle.shutdown().await;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod config;
mod driver;
mod observer;
pub mod protocol;
mod synchronizer;
mod transport;

pub use config::{ClientConfig, ConfigError, RetryPolicy};
pub use driver::{PlayError, SyncHandle, spawn};
pub use observer::{BoardObserver, SyncEvent};
pub use protocol::{Request, RequestKind, Response, ResponseStatus};
pub use synchronizer::{Completed, Dispatch, InvalidMove, Pending, Synchronizer, Ticket};
pub use transport::{SharedTransport, SocketTransport, Transport, TransportError, shared};

pub use tictac_board::{Board, Move, Outcome, Player, Position, Rejected, Square};
