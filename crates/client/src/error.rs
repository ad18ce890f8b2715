//! Error kinds.
//!
//! Only [`ConnectionError`] is fatal to a session. Everything else is reported
//! to the player logic through [`ClientHandler::on_error`](crate::ClientHandler::on_error)
//! and the session keeps going.

use thiserror::Error;

use crate::protocol::{ErrorContext, FrameError, MalformedMessageError};
use crate::types::{RoomId, SessionPhase};

/// The transport could not be established or was lost.
#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("failed to connect to {addr}: {source}")]
    Connect {
        addr: String,
        #[source]
        source: std::io::Error,
    },
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Framing(#[from] FrameError),
    #[error("transport is closed")]
    Closed,
}

/// A well-formed message that is not legal in the current phase.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolViolation {
    #[error("{kind} is not valid while {phase}")]
    UnexpectedMessage {
        phase: SessionPhase,
        kind: &'static str,
    },
    #[error("{kind} addressed to room {got}, joined room is {expected}")]
    WrongRoom {
        kind: &'static str,
        expected: RoomId,
        got: RoomId,
    },
}

/// A move was requested before any state arrived for the room.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("no game state received for room {0}")]
pub struct NoStateError(pub RoomId);

/// Non-fatal problems surfaced to the player logic.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error(transparent)]
    Connection(#[from] ConnectionError),
    #[error("malformed message: {0}")]
    Malformed(#[from] MalformedMessageError),
    #[error("protocol violation: {0}")]
    ProtocolViolation(#[from] ProtocolViolation),
    #[error("move computation for room {room} failed: {message}")]
    MoveComputation { room: RoomId, message: String },
    #[error("server rejected ({context}): {message}")]
    ServerRejection {
        context: ErrorContext,
        message: String,
    },
}

impl ClientError {
    /// Category name, stable for logs and player-side matching.
    pub fn context(&self) -> &'static str {
        match self {
            ClientError::Connection(_) => "connection",
            ClientError::Malformed(_) => "malformed_message",
            ClientError::ProtocolViolation(_) => "protocol_violation",
            ClientError::MoveComputation { .. } => "move_computation",
            ClientError::ServerRejection { .. } => "server_rejection",
        }
    }
}

/// Why a session ended in `Failed`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FailureCause {
    #[error("connection lost: {0}")]
    Connection(String),
    #[error("server closed the connection")]
    Closed,
    #[error("join rejected ({context}): {message}")]
    JoinRejected {
        context: ErrorContext,
        message: String,
    },
    #[error("server left room {0} before the game ended")]
    ServerLeft(RoomId),
    #[error("session shut down locally")]
    Shutdown,
}
