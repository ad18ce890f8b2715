//! Client handler capability - the interface the player logic implements.

use crate::error::{ClientError, NoStateError};
use crate::types::{Move, Outcome, RoomId, Snapshot};

/// Player logic as seen by the session.
///
/// `compute_move` runs on the blocking thread pool so a slow search does not
/// stall state updates; the other callbacks run on the session task and must
/// return promptly. All methods take `&self`: keep mutable player state behind
/// a lock.
pub trait ClientHandler: Send + Sync + 'static {
    /// The cached state was replaced.
    fn on_update(&self, snapshot: &Snapshot);

    /// Called once per move request with the room's latest snapshot, or
    /// [`NoStateError`] if none has arrived yet. An error forfeits the turn.
    fn compute_move(&self, snapshot: Result<Snapshot, NoStateError>) -> anyhow::Result<Move>;

    /// Called exactly once when the game ends.
    fn on_game_over(&self, outcome: &Outcome);

    /// Non-fatal problems: malformed or out-of-phase messages, failed
    /// computations, server rejections.
    fn on_error(&self, error: &ClientError);

    /// The server confirmed the join.
    fn on_joined(&self, _room_id: &RoomId) {}

    /// The server welcomed this client into the room, optionally naming its team.
    fn on_welcome(&self, _room_id: &RoomId, _team: Option<&str>) {}

    /// Room data of a class the engine does not interpret, with its raw body.
    fn on_room_message(&self, _room_id: &RoomId, _class: &str, _payload: &str) {}

    /// The server closed the room before a result arrived.
    fn on_left(&self, _room_id: &RoomId) {}

    /// Polled by [`run_player`](crate::run_player) in survive mode once the
    /// session is over. Return `false` to keep the process idling.
    fn while_disconnected(&self) -> bool {
        true
    }
}
