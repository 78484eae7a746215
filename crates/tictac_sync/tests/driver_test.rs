//! Tests for the synchronizer task against a scripted transport.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tictac_sync::{
    ClientConfig, InvalidMove, Outcome, PlayError, Player, Position, Rejected, Request, Response,
    ResponseStatus, RetryPolicy, Square, SyncEvent, Transport, TransportError, shared, spawn,
};
use tokio::sync::mpsc;
use tokio::time::sleep;

#[derive(Debug, Clone, Copy)]
enum Reply {
    NoMove,
    Move(Position),
    Refused,
    Fail,
}

/// Answers polls from a script and records every request it sees.
struct ScriptedTransport {
    log: Arc<Mutex<Vec<Request>>>,
    polls: VecDeque<Reply>,
    sends: Reply,
    delay: Duration,
}

impl ScriptedTransport {
    fn new(polls: impl IntoIterator<Item = Reply>) -> Self {
        Self {
            log: Arc::default(),
            polls: polls.into_iter().collect(),
            sends: Reply::NoMove,
            delay: Duration::ZERO,
        }
    }

    fn failing_sends(mut self) -> Self {
        self.sends = Reply::Fail;
        self
    }

    fn refused_sends(mut self) -> Self {
        self.sends = Reply::Refused;
        self
    }

    fn slow(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    fn log(&self) -> Arc<Mutex<Vec<Request>>> {
        Arc::clone(&self.log)
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send_request(&mut self, request: Request) -> Result<Response, TransportError> {
        self.log.lock().unwrap().push(request);
        if !self.delay.is_zero() {
            sleep(self.delay).await;
        }
        let reply = match request {
            Request::RequestMove => self.polls.pop_front().unwrap_or(Reply::NoMove),
            Request::SendMove(_) => self.sends,
        };
        let status = match reply {
            Reply::Refused => ResponseStatus::Failure,
            _ => ResponseStatus::Success,
        };
        match (request, reply) {
            (_, Reply::Fail) => Err(TransportError::Closed),
            (Request::RequestMove, Reply::Move(pos)) => Ok(Response::Move {
                status,
                position: Some(pos),
            }),
            (Request::RequestMove, _) => Ok(Response::Move {
                status,
                position: None,
            }),
            (Request::SendMove(_), _) => Ok(Response::Ack { status }),
        }
    }
}

fn config(local_player: Player) -> ClientConfig {
    ClientConfig::default()
        .with_local_player(local_player)
        .with_initial_delay_ms(100)
        .with_poll_interval_ms(100)
}

fn drain(rx: &mut mpsc::UnboundedReceiver<SyncEvent>) -> Vec<SyncEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

fn polls(log: &Mutex<Vec<Request>>) -> usize {
    log.lock()
        .unwrap()
        .iter()
        .filter(|r| **r == Request::RequestMove)
        .count()
}

fn sends(log: &Mutex<Vec<Request>>) -> Vec<Request> {
    log.lock()
        .unwrap()
        .iter()
        .copied()
        .filter(|r| matches!(r, Request::SendMove(_)))
        .collect()
}

#[tokio::test(start_paused = true)]
async fn test_initial_board_is_reported() {
    let (events, mut rx) = mpsc::unbounded_channel();
    let transport = ScriptedTransport::new([]);
    let handle = spawn(&config(Player::One), shared(transport), events).unwrap();

    match rx.recv().await {
        Some(SyncEvent::BoardChanged { board, outcome }) => {
            assert!(board.is_local_turn());
            assert_eq!(outcome, Outcome::InProgress);
        }
        other => panic!("expected initial board, got {other:?}"),
    }
    handle.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_no_polling_on_local_turn() {
    let transport = ScriptedTransport::new([]);
    let log = transport.log();
    let (events, _rx) = mpsc::unbounded_channel();
    let handle = spawn(&config(Player::One), shared(transport), events).unwrap();

    sleep(Duration::from_secs(2)).await;
    assert!(log.lock().unwrap().is_empty());
    handle.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_remote_move_is_applied_and_polling_stops() {
    let transport = ScriptedTransport::new([
        Reply::NoMove,
        Reply::NoMove,
        Reply::Move(Position::Center),
    ]);
    let log = transport.log();
    let (events, mut rx) = mpsc::unbounded_channel();
    let handle = spawn(&config(Player::Two), shared(transport), events).unwrap();

    // Initial board, then the opponent's move.
    let _ = rx.recv().await;
    match rx.recv().await {
        Some(SyncEvent::BoardChanged { board, .. }) => {
            assert_eq!(board.get(Position::Center), Square::Occupied(Player::One));
            assert!(board.is_local_turn());
        }
        other => panic!("expected opponent move, got {other:?}"),
    }

    sleep(Duration::from_secs(2)).await;
    assert_eq!(polls(&log), 3);
    handle.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_empty_polls_leave_board_unchanged() {
    let transport = ScriptedTransport::new([]);
    let log = transport.log();
    let (events, mut rx) = mpsc::unbounded_channel();
    let handle = spawn(&config(Player::Two), shared(transport), events).unwrap();

    sleep(Duration::from_millis(550)).await;
    assert!(polls(&log) >= 4);

    let board = handle.board().await.unwrap();
    assert!(board.squares().iter().all(|s| *s == Square::Empty));
    assert_eq!(board.turn(), Player::One);
    // Only the initial board was reported.
    assert_eq!(drain(&mut rx).len(), 1);
    handle.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_double_click_sends_one_move() {
    let transport = ScriptedTransport::new([]);
    let log = transport.log();
    let (events, _rx) = mpsc::unbounded_channel();
    let handle = spawn(&config(Player::One), shared(transport), events).unwrap();

    let (first, second) = tokio::join!(handle.play(0, 0), handle.play(0, 0));
    assert_eq!(first, Ok(()));
    assert_eq!(second, Err(PlayError::Invalid(InvalidMove::NotLocalTurn)));

    sleep(Duration::from_millis(50)).await;
    assert_eq!(sends(&log), vec![Request::SendMove(Position::TopLeft)]);
    handle.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_move_on_opponent_turn_is_refused() {
    let transport = ScriptedTransport::new([]);
    let log = transport.log();
    let (events, _rx) = mpsc::unbounded_channel();
    let handle = spawn(&config(Player::Two), shared(transport), events).unwrap();

    assert_eq!(
        handle.play(1, 1).await,
        Err(PlayError::Invalid(InvalidMove::NotLocalTurn))
    );
    assert!(sends(&log).is_empty());
    handle.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_local_move_survives_failed_submit() {
    let transport = ScriptedTransport::new([]).failing_sends();
    let log = transport.log();
    let (events, _rx) = mpsc::unbounded_channel();
    let handle = spawn(&config(Player::One), shared(transport), events).unwrap();

    handle.play(1, 1).await.unwrap();
    sleep(Duration::from_millis(50)).await;
    assert_eq!(sends(&log), vec![Request::SendMove(Position::Center)]);

    let board = handle.board().await.unwrap();
    assert_eq!(board.get(Position::Center), Square::Occupied(Player::One));
    assert_eq!(board.turn(), Player::Two);
    handle.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_trouble_reported_once_at_threshold() {
    let transport = ScriptedTransport::new(std::iter::repeat_n(Reply::Fail, 50));
    let log = transport.log();
    let (events, mut rx) = mpsc::unbounded_channel();
    let handle = spawn(
        &config(Player::Two).with_trouble_threshold(3),
        shared(transport),
        events,
    )
    .unwrap();

    sleep(Duration::from_secs(2)).await;
    assert!(polls(&log) > 3);

    let trouble: Vec<_> = drain(&mut rx)
        .into_iter()
        .filter(|e| matches!(e, SyncEvent::ConnectionTrouble(_)))
        .collect();
    assert_eq!(trouble, vec![SyncEvent::ConnectionTrouble(3)]);
    handle.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_give_up_stops_polling_until_reset() {
    let transport = ScriptedTransport::new(std::iter::repeat_n(Reply::Fail, 50));
    let log = transport.log();
    let (events, _rx) = mpsc::unbounded_channel();
    let handle = spawn(
        &config(Player::Two).with_retry(RetryPolicy::GiveUpAfter(2)),
        shared(transport),
        events,
    )
    .unwrap();

    sleep(Duration::from_secs(2)).await;
    assert_eq!(polls(&log), 2);

    handle.reset().unwrap();
    sleep(Duration::from_secs(2)).await;
    assert_eq!(polls(&log), 4);
    handle.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_ticks_skipped_while_request_outstanding() {
    let transport = ScriptedTransport::new([]).slow(Duration::from_millis(350));
    let log = transport.log();
    let (events, _rx) = mpsc::unbounded_channel();
    let handle = spawn(&config(Player::Two), shared(transport), events).unwrap();

    sleep(Duration::from_millis(1050)).await;
    handle.shutdown().await;
    let issued = polls(&log);
    assert!((2..=3).contains(&issued), "issued {issued} polls");

    // Nothing was queued behind the slow request.
    sleep(Duration::from_secs(5)).await;
    assert_eq!(polls(&log), issued);
}

#[tokio::test(start_paused = true)]
async fn test_win_is_reported_once() {
    // Local X takes the top row while the opponent answers in the middle row.
    let transport = ScriptedTransport::new([
        Reply::Move(Position::MiddleLeft),
        Reply::Move(Position::Center),
    ]);
    let (events, mut rx) = mpsc::unbounded_channel();
    let handle = spawn(&config(Player::One), shared(transport), events).unwrap();

    for col in 0..3 {
        loop {
            match handle.play(0, col).await {
                Ok(()) => break,
                Err(PlayError::Invalid(InvalidMove::NotLocalTurn | InvalidMove::Busy)) => {
                    sleep(Duration::from_millis(100)).await;
                }
                Err(e) => panic!("unexpected refusal {e}"),
            }
        }
    }
    sleep(Duration::from_secs(1)).await;

    let terminal: Vec<_> = drain(&mut rx)
        .into_iter()
        .filter(|e| matches!(e, SyncEvent::Terminal(_)))
        .collect();
    assert_eq!(terminal, vec![SyncEvent::Terminal(Outcome::Won(Player::One))]);
    assert_eq!(
        handle.play(2, 2).await,
        Err(PlayError::Invalid(InvalidMove::Rejected(Rejected::GameOver)))
    );
    handle.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_rematch_swaps_sides() {
    let transport = ScriptedTransport::new([]);
    let log = transport.log();
    let (events, mut rx) = mpsc::unbounded_channel();
    let handle = spawn(&config(Player::One), shared(transport), events).unwrap();

    handle.rematch(Player::Two).unwrap();
    let board = handle.board().await.unwrap();
    assert_eq!(board.local_player(), Player::Two);
    assert!(!board.is_local_turn());

    sleep(Duration::from_millis(350)).await;
    assert!(polls(&log) > 0);
    assert_eq!(drain(&mut rx).len(), 2);
    handle.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_no_callbacks_after_shutdown() {
    let transport = ScriptedTransport::new([]);
    let (events, mut rx) = mpsc::unbounded_channel();
    let handle = spawn(&config(Player::Two), shared(transport), events).unwrap();

    sleep(Duration::from_millis(250)).await;
    handle.shutdown().await;
    drain(&mut rx);

    sleep(Duration::from_secs(2)).await;
    // The observer was dropped with the task.
    assert_eq!(rx.recv().await, None);
}

#[tokio::test]
async fn test_zero_poll_interval_is_refused_before_spawning() {
    let (events, mut rx) = mpsc::unbounded_channel();
    let err = spawn(
        &config(Player::Two).with_poll_interval_ms(0),
        shared(ScriptedTransport::new([])),
        events,
    )
    .unwrap_err();
    assert!(err.message.contains("poll_interval_ms"));
    // Nothing was started, so nothing was reported.
    assert_eq!(rx.recv().await, None);
}

#[tokio::test(start_paused = true)]
async fn test_give_up_is_reported_below_trouble_threshold() {
    let transport = ScriptedTransport::new(std::iter::repeat_n(Reply::Fail, 50));
    let log = transport.log();
    let (events, mut rx) = mpsc::unbounded_channel();
    let handle = spawn(
        &config(Player::Two).with_retry(RetryPolicy::GiveUpAfter(3)),
        shared(transport),
        events,
    )
    .unwrap();

    sleep(Duration::from_secs(5)).await;
    assert_eq!(polls(&log), 3);

    let events = drain(&mut rx);
    assert!(matches!(events[0], SyncEvent::BoardChanged { .. }));
    assert_eq!(&events[1..], &[SyncEvent::GaveUp(3)]);
    handle.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_refused_submit_counts_as_failure() {
    let transport = ScriptedTransport::new([]).refused_sends();
    let (events, mut rx) = mpsc::unbounded_channel();
    let handle = spawn(
        &config(Player::One).with_trouble_threshold(1),
        shared(transport),
        events,
    )
    .unwrap();

    handle.play(0, 0).await.unwrap();
    sleep(Duration::from_millis(50)).await;

    let trouble: Vec<_> = drain(&mut rx)
        .into_iter()
        .filter(|e| matches!(e, SyncEvent::ConnectionTrouble(_)))
        .collect();
    assert_eq!(trouble, vec![SyncEvent::ConnectionTrouble(1)]);

    let board = handle.board().await.unwrap();
    assert_eq!(board.get(Position::TopLeft), Square::Occupied(Player::One));
    handle.shutdown().await;
}
