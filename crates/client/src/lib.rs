//! Socha game client core.
//!
//! Connects to a Software-Challenge game server, joins a room and drives one
//! game on behalf of a [`ClientHandler`]:
//!
//! - [`transport`]: TCP byte stream split into protocol frames
//! - [`machine`]: phase bookkeeping with no I/O
//! - [`cache`]: latest game state per room
//! - [`turn`]: move computation off the session task
//! - [`session`]: the control loop tying the above together
//!
//! Most players only need [`run_player`].

pub mod cache;
pub mod config;
pub mod error;
pub mod handler;
pub mod logging;
pub mod machine;
pub mod runner;
pub mod session;
pub mod transport;
pub mod turn;

pub use socha_protocol as protocol;
pub use socha_types as types;

pub use cache::StateCache;
pub use config::ClientConfig;
pub use error::{ClientError, ConnectionError, FailureCause, NoStateError, ProtocolViolation};
pub use handler::ClientHandler;
pub use logging::init_logging;
pub use machine::{PhaseMachine, Step};
pub use runner::run_player;
pub use session::{Session, SessionOutcome, ShutdownHandle};
pub use transport::Transport;
pub use turn::{ComputedMove, TurnController};
