//! Socha client (workspace facade crate).
//!
//! Re-exports the workspace crates under one name so player binaries depend
//! on a single package:
//!
//! - [`types`]: plain data shared by every layer
//! - [`protocol`]: message model, XML codec and stream framing
//! - [`client`]: transport, session driver and the [`ClientHandler`] capability
//!
//! ```no_run
//! use socha_client::{play, ClientError, ClientHandler, Move, NoStateError, Outcome, Snapshot};
//!
//! struct Pass;
//!
//! impl ClientHandler for Pass {
//!     fn on_update(&self, _snapshot: &Snapshot) {}
//!     fn compute_move(&self, snapshot: Result<Snapshot, NoStateError>) -> anyhow::Result<Move> {
//!         let _state = snapshot?;
//!         Ok(Move::new("<skip/>"))
//!     }
//!     fn on_game_over(&self, _outcome: &Outcome) {}
//!     fn on_error(&self, _error: &ClientError) {}
//! }
//!
//! #[tokio::main]
//! async fn main() {
//!     std::process::exit(play(Pass).await);
//! }
//! ```

pub use socha_client_core as client;
pub use socha_protocol as protocol;
pub use socha_types as types;

pub use client::{
    init_logging, run_player, ClientConfig, ClientError, ClientHandler, ConnectionError,
    FailureCause, NoStateError, ProtocolViolation, Session, SessionOutcome, ShutdownHandle,
};
pub use types::{JoinTarget, Move, Outcome, RoomId, SessionPhase, Snapshot};

/// Play one game with settings from the environment.
///
/// Installs logging, runs the session and returns the process exit code.
pub async fn play<H: ClientHandler>(handler: H) -> i32 {
    let config = ClientConfig::from_env();
    init_logging(&config);

    exit_code(&run_player(&config, handler).await)
}

/// Exit code for the result of [`run_player`]: the outcome's own code, or 1
/// if the player stopped with an error.
fn exit_code(result: &anyhow::Result<SessionOutcome>) -> i32 {
    match result {
        Ok(outcome) => outcome.exit_code(),
        Err(e) => {
            tracing::error!(error = %format!("{e:#}"), "player stopped");
            1
        }
    }
}
