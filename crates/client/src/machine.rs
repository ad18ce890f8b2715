//! Session state machine.
//!
//! Pure bookkeeping with no I/O: [`PhaseMachine::handle`] validates an inbound
//! message against the current phase, performs the transition and tells the
//! driver what to do next as a [`Step`]. A message that is not legal for the
//! phase returns a [`ProtocolViolation`] and leaves the phase untouched.
//!
//! ```text
//! Disconnected --connect--> Connecting
//! Connecting --JoinedRoom--> InRoom
//! Connecting --MemberJoined--> AwaitingRoom --JoinedRoom--> InRoom
//! Connecting/AwaitingRoom --Error--> Failed
//! InRoom --MoveRequest--> AwaitingMove --submitted or forfeited--> InRoom
//! InRoom/AwaitingMove --StateUpdate--> (unchanged)
//! AwaitingRoom/InRoom/AwaitingMove --RoomMessage--> (unchanged)
//! InRoom/AwaitingMove --GameResult--> Finished
//! InRoom/AwaitingMove --Left--> Failed
//! any --transport lost--> Failed
//! ```

use tracing::debug;

use crate::error::{FailureCause, ProtocolViolation};
use crate::protocol::{ErrorContext, ProtocolMessage};
use crate::types::{Outcome, RoomId, SessionPhase, Snapshot};

/// What the driver must do after a message was accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    Joined(RoomId),
    Welcome {
        room_id: RoomId,
        team: Option<String>,
    },
    Refresh {
        room_id: RoomId,
        snapshot: Snapshot,
    },
    RequestMove(RoomId),
    GameOver {
        room_id: RoomId,
        outcome: Outcome,
    },
    /// Room data the engine does not interpret.
    Passthrough {
        room_id: RoomId,
        class: String,
        payload: String,
    },
    /// Server error inside the room; the session continues.
    Rejected {
        context: ErrorContext,
        message: String,
    },
    Failed(FailureCause),
}

#[derive(Debug)]
pub struct PhaseMachine {
    phase: SessionPhase,
    room: Option<RoomId>,
    transitions: Vec<SessionPhase>,
}

impl Default for PhaseMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl PhaseMachine {
    pub fn new() -> Self {
        Self {
            phase: SessionPhase::Disconnected,
            room: None,
            transitions: vec![SessionPhase::Disconnected],
        }
    }

    /// A machine for a transport that is up, with the join request on its way.
    pub fn connecting() -> Self {
        let mut machine = Self::new();
        machine.enter(SessionPhase::Connecting);
        machine
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    /// Room this session is (or is about to be) joined to.
    pub fn room(&self) -> Option<&RoomId> {
        self.room.as_ref()
    }

    /// Every phase entered so far, starting with `Disconnected`.
    pub fn transitions(&self) -> &[SessionPhase] {
        &self.transitions
    }

    /// Validate and apply one inbound message.
    pub fn handle(&mut self, msg: ProtocolMessage) -> Result<Step, ProtocolViolation> {
        use SessionPhase::*;

        let phase = self.phase;
        let kind = msg.kind();
        if phase.is_terminal() || phase == Disconnected {
            return Err(ProtocolViolation::UnexpectedMessage { phase, kind });
        }
        if let (Some(expected), Some(got)) = (self.room.as_ref(), msg.room_id()) {
            if expected != got {
                return Err(ProtocolViolation::WrongRoom {
                    kind,
                    expected: expected.clone(),
                    got: got.clone(),
                });
            }
        }

        match (phase, msg) {
            (Connecting | AwaitingRoom, ProtocolMessage::JoinedRoom { room_id }) => {
                self.room = Some(room_id.clone());
                self.enter(InRoom);
                Ok(Step::Joined(room_id))
            }
            (Connecting, ProtocolMessage::MemberJoined { room_id, team }) => {
                self.room = Some(room_id.clone());
                self.enter(AwaitingRoom);
                Ok(Step::Welcome { room_id, team })
            }
            (Connecting | AwaitingRoom, ProtocolMessage::Error { context, message }) => {
                self.enter(Failed);
                Ok(Step::Failed(FailureCause::JoinRejected { context, message }))
            }
            (InRoom | AwaitingMove, ProtocolMessage::MemberJoined { room_id, team }) => {
                Ok(Step::Welcome { room_id, team })
            }
            (InRoom | AwaitingMove, ProtocolMessage::StateUpdate { room_id, snapshot }) => {
                Ok(Step::Refresh { room_id, snapshot })
            }
            (
                AwaitingRoom | InRoom | AwaitingMove,
                ProtocolMessage::RoomMessage {
                    room_id,
                    class,
                    payload,
                },
            ) => Ok(Step::Passthrough {
                room_id,
                class,
                payload,
            }),
            (InRoom, ProtocolMessage::MoveRequest { room_id }) => {
                self.enter(AwaitingMove);
                Ok(Step::RequestMove(room_id))
            }
            (InRoom | AwaitingMove, ProtocolMessage::GameResult { room_id, outcome }) => {
                self.enter(Finished);
                Ok(Step::GameOver { room_id, outcome })
            }
            (InRoom | AwaitingMove, ProtocolMessage::Error { context, message }) => {
                Ok(Step::Rejected { context, message })
            }
            (InRoom | AwaitingMove, ProtocolMessage::Left { room_id }) => {
                self.enter(Failed);
                Ok(Step::Failed(FailureCause::ServerLeft(room_id)))
            }
            (phase, _) => Err(ProtocolViolation::UnexpectedMessage { phase, kind }),
        }
    }

    /// The requested move for `room` was submitted or forfeited.
    pub fn turn_completed(&mut self, room: &RoomId) -> Result<(), ProtocolViolation> {
        if self.phase != SessionPhase::AwaitingMove || self.room.as_ref() != Some(room) {
            return Err(ProtocolViolation::UnexpectedMessage {
                phase: self.phase,
                kind: "move_submission",
            });
        }
        self.enter(SessionPhase::InRoom);
        Ok(())
    }

    /// Whether a computed move for `room` may still be submitted.
    pub fn awaiting_move_for(&self, room: &RoomId) -> bool {
        self.phase == SessionPhase::AwaitingMove && self.room.as_ref() == Some(room)
    }

    /// Abnormal end. No-op once terminal.
    pub fn fail(&mut self) {
        if !self.phase.is_terminal() {
            self.enter(SessionPhase::Failed);
        }
    }

    fn enter(&mut self, next: SessionPhase) {
        debug!(from = %self.phase, to = %next, "phase transition");
        self.phase = next;
        self.transitions.push(next);
    }
}
