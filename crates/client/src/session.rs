//! Session driver
//!
//! [`Session::run`] is the single control loop of a connection. It alone
//! reads the transport, drives the [`PhaseMachine`], writes the
//! [`StateCache`] and sends submissions. Three event sources are multiplexed
//! with `tokio::select!`:
//!
//! 1. the next inbound frame
//! 2. a finished move computation from the [`TurnController`]
//! 3. a local shutdown request from a [`ShutdownHandle`]
//!
//! Malformed frames and out-of-phase messages are dropped and reported to the
//! player logic; only transport loss, a rejected join, the server leaving the
//! room, a game result, or a local shutdown end the loop.

use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio::sync::Notify;
use tracing::{debug, error, info, warn};

use crate::cache::StateCache;
use crate::config::ClientConfig;
use crate::error::{ClientError, ConnectionError, FailureCause};
use crate::handler::ClientHandler;
use crate::machine::{PhaseMachine, Step};
use crate::protocol::{create_join, create_move, decode, encode, winner, Frame, PREAMBLE};
use crate::transport::Transport;
use crate::turn::{ComputedMove, TurnController};
use crate::types::{JoinTarget, Outcome, SessionPhase};

/// How a session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionOutcome {
    Finished(Outcome),
    Failed(FailureCause),
}

impl SessionOutcome {
    pub fn is_finished(&self) -> bool {
        matches!(self, SessionOutcome::Finished(_))
    }

    /// Process exit code for a wrapping binary: 0 finished, 1 failed.
    pub fn exit_code(&self) -> i32 {
        match self {
            SessionOutcome::Finished(_) => 0,
            SessionOutcome::Failed(_) => 1,
        }
    }
}

/// Closes a running session from another task.
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    notify: Arc<Notify>,
}

impl ShutdownHandle {
    pub fn shutdown(&self) {
        self.notify.notify_one();
    }
}

enum LoopEvent {
    Inbound(Option<Result<Frame, ConnectionError>>),
    Computed(ComputedMove),
    Shutdown,
}

pub struct Session<H, S = TcpStream> {
    transport: Transport<S>,
    machine: PhaseMachine,
    cache: StateCache,
    turns: TurnController<H>,
    handler: Arc<H>,
    shutdown: Arc<Notify>,
    outcome: Option<SessionOutcome>,
}

impl<H: ClientHandler> Session<H, TcpStream> {
    /// Connect to the configured server and send the join request.
    pub async fn connect(config: &ClientConfig, handler: H) -> Result<Self, ConnectionError> {
        Self::connect_shared(config, Arc::new(handler)).await
    }

    /// Like [`Session::connect`], for a handler the caller keeps a handle to.
    pub async fn connect_shared(
        config: &ClientConfig,
        handler: Arc<H>,
    ) -> Result<Self, ConnectionError> {
        info!(addr = %config.addr(), "connecting to game server");
        let transport =
            Transport::connect(&config.host, config.port, config.max_frame_bytes).await?;
        Self::start_shared(transport, config.join_target(), handler).await
    }
}

impl<H, S> Session<H, S>
where
    H: ClientHandler,
    S: AsyncRead + AsyncWrite,
{
    /// Start a session over an already connected transport.
    pub async fn start(
        transport: Transport<S>,
        target: JoinTarget,
        handler: H,
    ) -> Result<Self, ConnectionError> {
        Self::start_shared(transport, target, Arc::new(handler)).await
    }

    /// Like [`Session::start`], for a handler the caller keeps a handle to.
    pub async fn start_shared(
        mut transport: Transport<S>,
        target: JoinTarget,
        handler: Arc<H>,
    ) -> Result<Self, ConnectionError> {
        let mut join = PREAMBLE.to_vec();
        join.extend_from_slice(&encode(&create_join(target.clone())));
        if let Err(e) = transport.send(&join).await {
            transport.close().await;
            return Err(e);
        }
        info!(peer = %transport.peer(), ?target, "join request sent");

        Ok(Self {
            transport,
            machine: PhaseMachine::connecting(),
            cache: StateCache::new(),
            turns: TurnController::new(Arc::clone(&handler)),
            handler,
            shutdown: Arc::new(Notify::new()),
            outcome: None,
        })
    }

    pub fn phase(&self) -> SessionPhase {
        self.machine.phase()
    }

    /// Every phase the session has entered, in order.
    pub fn transitions(&self) -> &[SessionPhase] {
        self.machine.transitions()
    }

    pub fn cache(&self) -> &StateCache {
        &self.cache
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

    pub fn outcome(&self) -> Option<&SessionOutcome> {
        self.outcome.as_ref()
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            notify: Arc::clone(&self.shutdown),
        }
    }

    /// Drive the session until it finishes or fails.
    ///
    /// Calling `run` again after the end returns the same outcome.
    pub async fn run(&mut self) -> SessionOutcome {
        if let Some(outcome) = &self.outcome {
            return outcome.clone();
        }

        loop {
            let event = tokio::select! {
                inbound = self.transport.next_frame() => LoopEvent::Inbound(inbound),
                Some(done) = self.turns.next_computed() => LoopEvent::Computed(done),
                _ = self.shutdown.notified() => LoopEvent::Shutdown,
            };

            let ended = match event {
                LoopEvent::Inbound(Some(Ok(frame))) => self.on_frame(frame),
                LoopEvent::Inbound(Some(Err(e))) => {
                    error!(error = %e, "transport failure");
                    Some(SessionOutcome::Failed(FailureCause::Connection(
                        e.to_string(),
                    )))
                }
                LoopEvent::Inbound(None) => {
                    info!("server closed the connection");
                    Some(SessionOutcome::Failed(FailureCause::Closed))
                }
                LoopEvent::Computed(done) => self.on_computed(done).await,
                LoopEvent::Shutdown => {
                    info!("shutdown requested");
                    Some(SessionOutcome::Failed(FailureCause::Shutdown))
                }
            };

            if let Some(outcome) = ended {
                return self.finish(outcome).await;
            }
        }
    }

    async fn finish(&mut self, outcome: SessionOutcome) -> SessionOutcome {
        if let SessionOutcome::Failed(cause) = &outcome {
            warn!(%cause, "session failed");
            self.machine.fail();
        }
        self.transport.close().await;
        self.outcome = Some(outcome.clone());
        outcome
    }

    fn on_frame(&mut self, frame: Frame) -> Option<SessionOutcome> {
        let msg = match decode(&frame) {
            Ok(msg) => msg,
            Err(e) => {
                warn!(error = %e, bytes = frame.len(), "dropping malformed message");
                self.handler.on_error(&ClientError::Malformed(e));
                return None;
            }
        };
        debug!(kind = msg.kind(), phase = %self.machine.phase(), "received");

        let step = match self.machine.handle(msg) {
            Ok(step) => step,
            Err(violation) => {
                warn!(%violation, "dropping message");
                self.handler.on_error(&ClientError::ProtocolViolation(violation));
                return None;
            }
        };

        match step {
            Step::Joined(room_id) => {
                info!(room = %room_id, "joined room");
                self.handler.on_joined(&room_id);
            }
            Step::Welcome { room_id, team } => {
                info!(room = %room_id, team = team.as_deref().unwrap_or("?"), "welcome");
                self.handler.on_welcome(&room_id, team.as_deref());
            }
            Step::Refresh { room_id, snapshot } => {
                self.cache.update(room_id, snapshot.clone());
                self.handler.on_update(&snapshot);
            }
            Step::RequestMove(room_id) => {
                let snapshot = self.cache.current(&room_id).cloned();
                self.turns.begin(room_id, snapshot);
            }
            Step::GameOver { room_id, outcome } => {
                let won = winner(&outcome);
                info!(room = %room_id, winner = won.as_deref().unwrap_or("draw"), "game over");
                self.handler.on_game_over(&outcome);
                return Some(SessionOutcome::Finished(outcome));
            }
            Step::Passthrough {
                room_id,
                class,
                payload,
            } => {
                debug!(room = %room_id, %class, "passing room message through");
                self.handler.on_room_message(&room_id, &class, &payload);
            }
            Step::Rejected { context, message } => {
                warn!(%context, %message, "server reported an error");
                self.handler
                    .on_error(&ClientError::ServerRejection { context, message });
            }
            Step::Failed(cause) => {
                match &cause {
                    FailureCause::JoinRejected { context, message } => {
                        self.handler.on_error(&ClientError::ServerRejection {
                            context: context.clone(),
                            message: message.clone(),
                        });
                    }
                    FailureCause::ServerLeft(room_id) => self.handler.on_left(room_id),
                    _ => {}
                }
                return Some(SessionOutcome::Failed(cause));
            }
        }
        None
    }

    async fn on_computed(&mut self, done: ComputedMove) -> Option<SessionOutcome> {
        let ComputedMove {
            room_id,
            result,
            elapsed,
        } = done;

        if !self.machine.awaiting_move_for(&room_id) {
            debug!(room = %room_id, "discarding move computed for a finished turn");
            return None;
        }

        match result {
            Ok(mv) => {
                let bytes = encode(&create_move(room_id.clone(), mv));
                if let Err(e) = self.transport.send(&bytes).await {
                    error!(error = %e, "failed to submit move");
                    return Some(SessionOutcome::Failed(FailureCause::Connection(e.to_string())));
                }
                info!(room = %room_id, secs = elapsed.as_secs_f64(), "sent move");
            }
            Err(message) => {
                warn!(room = %room_id, %message, "move computation failed, forfeiting turn");
                self.handler.on_error(&ClientError::MoveComputation {
                    room: room_id.clone(),
                    message,
                });
            }
        }

        // awaiting_move_for checked above
        let _ = self.machine.turn_completed(&room_id);
        None
    }
}
