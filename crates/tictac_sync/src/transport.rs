//! Socket transport: one connection, one request in flight.

use crate::protocol::{self, Request, Response};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

/// Connection-level failure. The connection that produced it is closed.
#[derive(Debug, derive_more::Display, derive_more::Error, derive_more::From)]
pub enum TransportError {
    /// Socket read or write failed.
    #[display("I/O error: {_0}")]
    #[from]
    Io(std::io::Error),

    /// Frame did not contain the expected JSON.
    #[display("Malformed JSON: {_0}")]
    #[from]
    Json(serde_json::Error),

    /// Frame was not valid UTF-8.
    #[display("Frame is not valid UTF-8: {_0}")]
    #[from]
    Utf8(std::string::FromUtf8Error),

    /// Payload does not fit a `u16` length prefix.
    #[display("Frame of {_0} bytes exceeds the 65535 byte limit")]
    FrameTooLarge(#[error(not(source))] usize),

    /// JSON was well formed but carried values outside the protocol.
    #[display("Malformed message: {_0}")]
    Malformed(#[error(not(source))] String),

    /// No response arrived in time.
    #[display("No response within {_0:?}")]
    Timeout(#[error(not(source))] Duration),

    /// The connection was closed by an earlier failure or by the owner.
    #[display("Connection is closed")]
    Closed,
}

/// Sends one request and waits for its response.
///
/// Implementations must not pipeline: `&mut self` is held until the full
/// response has been read or the connection has failed.
#[async_trait]
pub trait Transport: Send {
    /// Performs one request/response exchange.
    async fn send_request(&mut self, request: Request) -> Result<Response, TransportError>;
}

/// A transport shared between callers; the mutex serializes every exchange.
pub type SharedTransport<T> = Arc<Mutex<T>>;

/// Wraps a transport for sharing.
pub fn shared<T: Transport>(transport: T) -> SharedTransport<T> {
    Arc::new(Mutex::new(transport))
}

/// TCP connection to the game server.
#[derive(Debug)]
pub struct SocketTransport {
    addr: String,
    stream: Option<TcpStream>,
    timeout: Option<Duration>,
    reconnect: bool,
}

impl SocketTransport {
    /// Creates a transport without connecting yet.
    pub fn new(addr: impl Into<String>, timeout: Option<Duration>, reconnect: bool) -> Self {
        Self {
            addr: addr.into(),
            stream: None,
            timeout,
            reconnect,
        }
    }

    /// Creates a transport and opens its connection.
    pub async fn connect(
        addr: impl Into<String>,
        timeout: Option<Duration>,
        reconnect: bool,
    ) -> Result<Self, TransportError> {
        let mut transport = Self::new(addr, timeout, reconnect);
        transport.open().await?;
        Ok(transport)
    }

    /// Opens the connection, replacing any previous one.
    #[instrument(skip(self), fields(addr = %self.addr))]
    pub async fn open(&mut self) -> Result<(), TransportError> {
        let connect = TcpStream::connect(self.addr.as_str());
        let stream = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, connect)
                .await
                .map_err(|_| TransportError::Timeout(limit))??,
            None => connect.await?,
        };
        stream.set_nodelay(true)?;
        info!("Connected to game server");
        self.stream = Some(stream);
        Ok(())
    }

    /// Drops the connection. Later requests fail with [`TransportError::Closed`]
    /// unless reconnecting is enabled.
    #[instrument(skip(self), fields(addr = %self.addr))]
    pub fn close(&mut self) {
        if self.stream.take().is_some() {
            debug!("Connection closed");
        }
    }

    /// True while a connection is held.
    pub fn is_open(&self) -> bool {
        self.stream.is_some()
    }

    /// Server address.
    pub fn addr(&self) -> &str {
        &self.addr
    }
}

#[async_trait]
impl Transport for SocketTransport {
    #[instrument(skip(self), fields(addr = %self.addr))]
    async fn send_request(&mut self, request: Request) -> Result<Response, TransportError> {
        if self.stream.is_none() && self.reconnect {
            info!("Reopening connection");
            self.open().await?;
        }
        let Some(stream) = self.stream.as_mut() else {
            return Err(TransportError::Closed);
        };

        let result = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, protocol::exchange(stream, request))
                .await
                .unwrap_or(Err(TransportError::Timeout(limit))),
            None => protocol::exchange(stream, request).await,
        };

        if let Err(e) = &result {
            warn!(error = %e, "Request failed, closing connection");
            self.close();
        }
        result
    }
}
