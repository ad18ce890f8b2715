//! Protocol message model.
//!
//! One variant per message shape the engine exchanges with the server. Values
//! are immutable once built: the codec produces them from frames, the turn
//! controller builds submissions from computed moves.

use crate::types::{JoinTarget, Move, Outcome, RoomId, Snapshot};

/// Where an error reported by the server originated.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ErrorContext {
    /// Raised inside a room, usually a rejected move.
    Room(RoomId),
    /// Raised for a top-level request (join variants), named by its element.
    Request(String),
    /// Raised without naming the offending request.
    Protocol,
}

impl std::fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorContext::Room(room) => write!(f, "room {room}"),
            ErrorContext::Request(class) => write!(f, "request <{class}>"),
            ErrorContext::Protocol => f.write_str("protocol"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProtocolMessage {
    JoinRequest(JoinTarget),
    JoinedRoom {
        room_id: RoomId,
    },
    /// Welcome into a room; `team` is the side assigned to this client.
    MemberJoined {
        room_id: RoomId,
        team: Option<String>,
    },
    StateUpdate {
        room_id: RoomId,
        snapshot: Snapshot,
    },
    MoveRequest {
        room_id: RoomId,
    },
    MoveSubmission {
        room_id: RoomId,
        mv: Move,
    },
    GameResult {
        room_id: RoomId,
        outcome: Outcome,
    },
    /// Room data of a class the engine does not interpret, passed through to
    /// player logic with its raw body.
    RoomMessage {
        room_id: RoomId,
        class: String,
        payload: String,
    },
    /// The server closed the room.
    Left {
        room_id: RoomId,
    },
    Error {
        context: ErrorContext,
        message: String,
    },
}

impl ProtocolMessage {
    /// Room the message is addressed to, if any.
    pub fn room_id(&self) -> Option<&RoomId> {
        match self {
            ProtocolMessage::JoinRequest(_) => None,
            ProtocolMessage::JoinedRoom { room_id }
            | ProtocolMessage::MemberJoined { room_id, .. }
            | ProtocolMessage::StateUpdate { room_id, .. }
            | ProtocolMessage::MoveRequest { room_id }
            | ProtocolMessage::MoveSubmission { room_id, .. }
            | ProtocolMessage::GameResult { room_id, .. }
            | ProtocolMessage::RoomMessage { room_id, .. }
            | ProtocolMessage::Left { room_id } => Some(room_id),
            ProtocolMessage::Error { context, .. } => match context {
                ErrorContext::Room(room_id) => Some(room_id),
                _ => None,
            },
        }
    }

    /// Short name for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            ProtocolMessage::JoinRequest(_) => "join_request",
            ProtocolMessage::JoinedRoom { .. } => "joined_room",
            ProtocolMessage::MemberJoined { .. } => "member_joined",
            ProtocolMessage::StateUpdate { .. } => "state_update",
            ProtocolMessage::MoveRequest { .. } => "move_request",
            ProtocolMessage::MoveSubmission { .. } => "move_submission",
            ProtocolMessage::GameResult { .. } => "game_result",
            ProtocolMessage::RoomMessage { .. } => "room_message",
            ProtocolMessage::Left { .. } => "left",
            ProtocolMessage::Error { .. } => "error",
        }
    }
}

// ============== Utility Functions ==============

/// Create the join request for a target.
pub fn create_join(target: JoinTarget) -> ProtocolMessage {
    ProtocolMessage::JoinRequest(target)
}

/// Create a move submission for a room.
pub fn create_move(room_id: RoomId, mv: Move) -> ProtocolMessage {
    ProtocolMessage::MoveSubmission { room_id, mv }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_room_id_of_room_scoped_error() {
        let msg = ProtocolMessage::Error {
            context: ErrorContext::Room(RoomId::new("r1")),
            message: "invalid move".to_string(),
        };
        assert_eq!(msg.room_id(), Some(&RoomId::new("r1")));

        let msg = ProtocolMessage::Error {
            context: ErrorContext::Request("joinPrepared".to_string()),
            message: "unknown reservation".to_string(),
        };
        assert_eq!(msg.room_id(), None);
    }

    #[test]
    fn test_create_helpers() {
        assert_eq!(create_join(JoinTarget::Any).kind(), "join_request");
        let msg = create_move(RoomId::new("r1"), Move::new("<to x=\"1\" y=\"2\"/>"));
        assert_eq!(msg.room_id(), Some(&RoomId::new("r1")));
        assert_eq!(msg.kind(), "move_submission");
    }
}
