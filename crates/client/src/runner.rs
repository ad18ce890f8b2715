//! One-call entry point for player binaries.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use tracing::{debug, info, warn};

use crate::config::ClientConfig;
use crate::error::FailureCause;
use crate::handler::ClientHandler;
use crate::session::{Session, SessionOutcome};

/// Pause between [`ClientHandler::while_disconnected`] polls.
const DISCONNECTED_POLL: Duration = Duration::from_millis(100);

/// Connect, join and play one game with `handler`.
///
/// A failed session is an `Err` unless `config.survive` is set, in which case
/// the failure is logged and returned as `Ok(SessionOutcome::Failed(_))`.
/// Surviving players are polled through `while_disconnected` after the
/// session ends until they ask to shut down.
pub async fn run_player<H: ClientHandler>(
    config: &ClientConfig,
    handler: H,
) -> Result<SessionOutcome> {
    let handler = Arc::new(handler);
    let outcome = play_once(config, Arc::clone(&handler)).await?;

    if config.survive {
        while !handler.while_disconnected() {
            debug!("disconnected, idling");
            tokio::time::sleep(DISCONNECTED_POLL).await;
        }
    }
    Ok(outcome)
}

async fn play_once<H: ClientHandler>(
    config: &ClientConfig,
    handler: Arc<H>,
) -> Result<SessionOutcome> {
    let mut session = match Session::connect_shared(config, handler).await {
        Ok(session) => session,
        Err(e) if config.survive => {
            warn!(error = %e, "could not start session, surviving");
            return Ok(SessionOutcome::Failed(FailureCause::Connection(
                e.to_string(),
            )));
        }
        Err(e) => {
            return Err(e).with_context(|| format!("failed to join game at {}", config.addr()))
        }
    };

    let outcome = session.run().await;
    match &outcome {
        SessionOutcome::Finished(_) => {
            info!("game finished");
            Ok(outcome)
        }
        SessionOutcome::Failed(cause) if config.survive => {
            warn!(%cause, "session failed, surviving");
            Ok(outcome)
        }
        SessionOutcome::Failed(cause) => Err(anyhow!("session failed: {cause}")),
    }
}
