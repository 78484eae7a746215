//! Request/response shapes exchanged with the game server and their wire form.
//!
//! Every message travels as one frame: a big-endian `u16` byte length followed
//! by that many bytes of UTF-8 JSON.
//!
//! ```text
//! {"type":"REQUEST_MOVE","data":null}  ->  {"status":"SUCCESS","message":null,"move":-1}
//! {"type":"SEND_MOVE","data":"4"}      ->  {"status":"SUCCESS","message":null}
//! ```

use crate::transport::TransportError;
use serde::{Deserialize, Serialize};
use tictac_board::Position;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, instrument, trace};

/// Wire value meaning "the opponent has not moved yet".
pub const NO_MOVE: i32 = -1;

/// Largest payload a frame can carry.
pub const MAX_FRAME_LEN: usize = u16::MAX as usize;

/// The two request shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum RequestKind {
    /// Ask whether the opponent has moved.
    RequestMove,
    /// Claim a square.
    SendMove,
}

/// Status carried by every response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResponseStatus {
    /// The server handled the request.
    Success,
    /// The server refused or could not handle the request.
    Failure,
}

/// A request to the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Request {
    /// Poll for the opponent's move.
    RequestMove,
    /// Submit the local player's move.
    SendMove(Position),
}

impl Request {
    /// Kind of this request; decides how the response is decoded.
    pub fn kind(&self) -> RequestKind {
        match self {
            Request::RequestMove => RequestKind::RequestMove,
            Request::SendMove(_) => RequestKind::SendMove,
        }
    }

    /// Encodes the request as JSON.
    pub fn to_wire(&self) -> Result<String, TransportError> {
        let data = match self {
            Request::RequestMove => None,
            Request::SendMove(pos) => Some(serde_json::to_string(&pos.to_index())?),
        };
        Ok(serde_json::to_string(&WireRequest {
            kind: self.kind(),
            data,
        })?)
    }

    /// Decodes a request from JSON.
    pub fn from_wire(json: &str) -> Result<Self, TransportError> {
        let wire: WireRequest = serde_json::from_str(json)?;
        match wire.kind {
            RequestKind::RequestMove => Ok(Request::RequestMove),
            RequestKind::SendMove => {
                let data = wire
                    .data
                    .ok_or_else(|| TransportError::Malformed("SEND_MOVE without data".to_string()))?;
                let index: i32 = serde_json::from_str(&data)?;
                position_from_wire(index)?
                    .map(Request::SendMove)
                    .ok_or_else(|| TransportError::Malformed("SEND_MOVE without a square".to_string()))
            }
        }
    }
}

/// A response from the server, shaped by the request that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Response {
    /// Answer to [`Request::RequestMove`]; `position` is `None` until the opponent moves.
    Move {
        /// Outcome of the request.
        status: ResponseStatus,
        /// The opponent's move, if one is available.
        position: Option<Position>,
    },
    /// Answer to [`Request::SendMove`].
    Ack {
        /// Outcome of the request.
        status: ResponseStatus,
    },
}

impl Response {
    /// Status of the response.
    pub fn status(&self) -> ResponseStatus {
        match self {
            Response::Move { status, .. } | Response::Ack { status } => *status,
        }
    }

    /// Encodes the response as JSON.
    pub fn to_wire(&self) -> Result<String, TransportError> {
        let wire = match *self {
            Response::Move { status, position } => WireResponse {
                status,
                message: None,
                mv: Some(position.map_or(NO_MOVE, |p| p.to_index() as i32)),
            },
            Response::Ack { status } => WireResponse {
                status,
                message: None,
                mv: None,
            },
        };
        Ok(serde_json::to_string(&wire)?)
    }

    /// Decodes a response to a request of the given kind.
    #[instrument(skip(json))]
    pub fn from_wire(kind: RequestKind, json: &str) -> Result<Self, TransportError> {
        let wire: WireResponse = serde_json::from_str(json)?;
        if let Some(message) = &wire.message {
            debug!(%message, status = %wire.status, "Server message");
        }
        match kind {
            RequestKind::RequestMove => Ok(Response::Move {
                status: wire.status,
                position: position_from_wire(wire.mv.unwrap_or(NO_MOVE))?,
            }),
            RequestKind::SendMove => Ok(Response::Ack {
                status: wire.status,
            }),
        }
    }
}

fn position_from_wire(index: i32) -> Result<Option<Position>, TransportError> {
    if index == NO_MOVE {
        return Ok(None);
    }
    usize::try_from(index)
        .ok()
        .and_then(Position::from_index)
        .map(Some)
        .ok_or_else(|| TransportError::Malformed(format!("move {} is not a square", index)))
}

#[derive(Debug, Serialize, Deserialize)]
struct WireRequest {
    #[serde(rename = "type")]
    kind: RequestKind,
    data: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireResponse {
    status: ResponseStatus,
    #[serde(default)]
    message: Option<String>,
    #[serde(rename = "move", default, skip_serializing_if = "Option::is_none")]
    mv: Option<i32>,
}

/// Writes one length-prefixed frame.
pub async fn write_frame<W>(writer: &mut W, payload: &str) -> Result<(), TransportError>
where
    W: AsyncWrite + Unpin,
{
    let len = u16::try_from(payload.len()).map_err(|_| TransportError::FrameTooLarge(payload.len()))?;
    let mut frame = Vec::with_capacity(payload.len() + 2);
    frame.extend_from_slice(&len.to_be_bytes());
    frame.extend_from_slice(payload.as_bytes());
    writer.write_all(&frame).await?;
    writer.flush().await?;
    Ok(())
}

/// Reads one length-prefixed frame.
pub async fn read_frame<R>(reader: &mut R) -> Result<String, TransportError>
where
    R: AsyncRead + Unpin,
{
    let len = reader.read_u16().await?;
    let mut buf = vec![0u8; usize::from(len)];
    reader.read_exact(&mut buf).await?;
    Ok(String::from_utf8(buf)?)
}

/// Sends `request` and reads exactly one response frame.
#[instrument(skip(stream))]
pub async fn exchange<S>(stream: &mut S, request: Request) -> Result<Response, TransportError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let json = request.to_wire()?;
    trace!(%json, "Writing request");
    write_frame(stream, &json).await?;
    let reply = read_frame(stream).await?;
    trace!(json = %reply, "Read response");
    Response::from_wire(request.kind(), &reply)
}
