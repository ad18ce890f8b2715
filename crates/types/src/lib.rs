//! Core types module - shared data structures and constants
//!
//! This crate defines the plain data that flows between the wire codec, the
//! session engine and the player logic. All types are pure data structures with
//! no external dependencies, making them usable in any context (codec, session,
//! tests, player implementations).
//!
//! # Opaque game data
//!
//! The engine never interprets game internals. A [`Snapshot`] wraps the raw
//! state payload exactly as the server sent it, a [`Move`] wraps the raw move
//! payload produced by the player logic, and an [`Outcome`] wraps the raw result
//! payload. Parsing those into a concrete board is the player logic's job.
//!
//! # Session phases
//!
//! | Phase | Meaning |
//! |-------|---------|
//! | `Disconnected` | No transport yet |
//! | `Connecting` | Transport open, join request sent |
//! | `AwaitingRoom` | Membership announced, join not yet confirmed |
//! | `InRoom` | Joined, waiting for state or a move request |
//! | `AwaitingMove` | A move was requested and not yet submitted or forfeited |
//! | `Finished` | Game result received (terminal) |
//! | `Failed` | Transport lost or join rejected (terminal) |
//!
//! # Examples
//!
//! ```
//! use socha_types::{JoinTarget, RoomId, SessionPhase, Snapshot};
//!
//! let room = RoomId::new("4f1c");
//! assert_eq!(room.as_str(), "4f1c");
//!
//! let snap = Snapshot::new("<state turn=\"3\"/>");
//! assert_eq!(snap.as_str(), "<state turn=\"3\"/>");
//!
//! assert!(SessionPhase::Finished.is_terminal());
//! assert!(!SessionPhase::InRoom.is_terminal());
//!
//! let target = JoinTarget::from_options(None, Some("4f1c"));
//! assert_eq!(target, JoinTarget::Room(room));
//! ```

use std::fmt;
use std::sync::Arc;

/// Default game server host.
pub const DEFAULT_HOST: &str = "localhost";

/// Default game server port.
pub const DEFAULT_PORT: u16 = 13050;

/// Server-side identifier of one running or pending match.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RoomId(String);

impl RoomId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RoomId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// How the client asks to be placed into a match.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum JoinTarget {
    /// Open matchmaking: any free room.
    Any,
    /// A prepared match identified by a reservation code.
    Reservation(String),
    /// An existing room.
    Room(RoomId),
}

impl JoinTarget {
    /// Pick the join target from startup options.
    ///
    /// A reservation wins over a room id; with neither, the client joins any room.
    pub fn from_options(reservation: Option<&str>, room: Option<&str>) -> Self {
        match (reservation, room) {
            (Some(code), _) => Self::Reservation(code.to_string()),
            (None, Some(room)) => Self::Room(RoomId::new(room)),
            (None, None) => Self::Any,
        }
    }
}

/// Connection phase of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionPhase {
    Disconnected,
    Connecting,
    AwaitingRoom,
    InRoom,
    AwaitingMove,
    Finished,
    Failed,
}

impl SessionPhase {
    /// Finished and Failed end the session; nothing leaves them.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Finished | Self::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::AwaitingRoom => "awaiting_room",
            Self::InRoom => "in_room",
            Self::AwaitingMove => "awaiting_move",
            Self::Finished => "finished",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One complete, immutable game state as sent by the server.
///
/// Cloning is cheap: the payload is shared.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Snapshot(Arc<str>);

impl Snapshot {
    pub fn new(raw: impl Into<Arc<str>>) -> Self {
        Self(raw.into())
    }

    /// Raw state payload (inner markup of the server's state envelope).
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// A move computed by the player logic, in the server's payload encoding.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Move(String);

impl Move {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

/// Final result of a game as reported by the server.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Outcome(String);

impl Outcome {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Raw result payload.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}
