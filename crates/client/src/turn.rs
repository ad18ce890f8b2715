//! Turn controller.
//!
//! Runs the player logic's move computation off the session task and hands
//! the result back over a channel, so the session stays the only writer of
//! the transport and of its own state. At most one computation per room is in
//! flight; it is never cancelled, and a result that arrives after the session
//! moved on is simply discarded by the caller.

use std::collections::HashSet;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::error::NoStateError;
use crate::handler::ClientHandler;
use crate::types::{Move, RoomId, Snapshot};

/// Result of one `compute_move` call.
#[derive(Debug)]
pub struct ComputedMove {
    pub room_id: RoomId,
    pub result: Result<Move, String>,
    pub elapsed: Duration,
}

pub struct TurnController<H> {
    handler: Arc<H>,
    done_tx: mpsc::UnboundedSender<ComputedMove>,
    done_rx: mpsc::UnboundedReceiver<ComputedMove>,
    in_flight: HashSet<RoomId>,
}

impl<H: ClientHandler> TurnController<H> {
    pub fn new(handler: Arc<H>) -> Self {
        let (done_tx, done_rx) = mpsc::unbounded_channel();
        Self {
            handler,
            done_tx,
            done_rx,
            in_flight: HashSet::new(),
        }
    }

    pub fn in_flight(&self, room_id: &RoomId) -> bool {
        self.in_flight.contains(room_id)
    }

    /// Start computing a move for `room_id`.
    ///
    /// Returns false (and starts nothing) if a computation for the room is
    /// still running.
    pub fn begin(&mut self, room_id: RoomId, snapshot: Result<Snapshot, NoStateError>) -> bool {
        if !self.in_flight.insert(room_id.clone()) {
            warn!(room = %room_id, "move computation already in flight");
            return false;
        }

        let handler = Arc::clone(&self.handler);
        let done_tx = self.done_tx.clone();
        debug!(room = %room_id, has_state = snapshot.is_ok(), "computing move");
        tokio::task::spawn_blocking(move || {
            let started = Instant::now();
            let result = match catch_unwind(AssertUnwindSafe(|| handler.compute_move(snapshot))) {
                Ok(Ok(mv)) => Ok(mv),
                Ok(Err(e)) => Err(format!("{e:#}")),
                Err(_) => Err("player logic panicked".to_string()),
            };
            // The session may be gone already; the result is dropped then.
            let _ = done_tx.send(ComputedMove {
                room_id,
                result,
                elapsed: started.elapsed(),
            });
        });
        true
    }

    /// Wait for the next finished computation.
    pub async fn next_computed(&mut self) -> Option<ComputedMove> {
        let done = self.done_rx.recv().await?;
        self.in_flight.remove(&done.room_id);
        Some(done)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ClientError;
    use crate::types::Outcome;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Echo {
        seen: Mutex<Vec<Option<String>>>,
    }

    impl ClientHandler for Echo {
        fn on_update(&self, _snapshot: &Snapshot) {}

        fn compute_move(&self, snapshot: Result<Snapshot, NoStateError>) -> anyhow::Result<Move> {
            self.seen
                .lock()
                .unwrap()
                .push(snapshot.as_ref().ok().map(|s| s.as_str().to_string()));
            match snapshot {
                Ok(s) if s.as_str() == "<panic/>" => panic!("boom"),
                Ok(s) => Ok(Move::new(format!("<echo>{}</echo>", s.as_str()))),
                Err(e) => Err(e.into()),
            }
        }

        fn on_game_over(&self, _outcome: &Outcome) {}

        fn on_error(&self, _error: &ClientError) {}
    }

    #[tokio::test]
    async fn test_computes_off_task_and_reports_back() {
        let handler = Arc::new(Echo::default());
        let mut turns = TurnController::new(Arc::clone(&handler));
        let room = RoomId::new("r1");

        assert!(turns.begin(room.clone(), Ok(Snapshot::new("<s/>"))));
        assert!(turns.in_flight(&room));
        assert!(!turns.begin(room.clone(), Ok(Snapshot::new("<t/>"))));

        let done = turns.next_computed().await.unwrap();
        assert_eq!(done.room_id, room);
        assert_eq!(done.result, Ok(Move::new("<echo><s/></echo>")));
        assert!(!turns.in_flight(&room));
        assert_eq!(handler.seen.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_no_state_is_passed_through_as_error() {
        let handler = Arc::new(Echo::default());
        let mut turns = TurnController::new(Arc::clone(&handler));
        let room = RoomId::new("r1");

        turns.begin(room.clone(), Err(NoStateError(room.clone())));
        let done = turns.next_computed().await.unwrap();
        assert_eq!(
            done.result,
            Err("no game state received for room r1".to_string())
        );
        assert_eq!(*handler.seen.lock().unwrap(), vec![None]);
    }

    #[tokio::test]
    async fn test_panicking_player_logic_is_contained() {
        let handler = Arc::new(Echo::default());
        let mut turns = TurnController::new(handler);
        turns.begin(RoomId::new("r1"), Ok(Snapshot::new("<panic/>")));
        let done = turns.next_computed().await.unwrap();
        assert_eq!(done.result, Err("player logic panicked".to_string()));
    }
}
