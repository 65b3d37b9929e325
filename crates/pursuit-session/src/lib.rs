//! Cat-and-mouse chase sessions for multiplayer race servers.
//!
//! A session is a single-owner actor: every event — admin commands, player
//! connect/disconnect, lap completions, and the session's own delayed
//! follow-ups — is a [`SessionCommand`] on one channel, so game state never
//! needs a lock. The hosting server implements [`RaceHost`] and drives the
//! session through a [`SessionHandle`].

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

pub mod config;
pub mod error;
pub mod host;
pub mod notify;
pub mod session;
mod timers;

pub use config::ChaseConfig;
pub use error::CommandError;
pub use host::{ConnectedPlayer, RaceHost};
pub use session::{GameStatus, ParticipantStatus, SessionCommand};

use pursuit_core::player::ConnectionId;
use session::ChaseSession;

/// Spawn a chase session actor over the given host.
///
/// Returns a cloneable handle plus the actor's join handle. The actor exits
/// when [`SessionHandle::shutdown`] is called or every handle is dropped.
pub fn spawn_chase_session(
    host: Arc<dyn RaceHost>,
    config: ChaseConfig,
) -> (SessionHandle, JoinHandle<()>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let session = ChaseSession::new(host, config, tx.clone(), rx);
    let join = tokio::spawn(session.run());
    (SessionHandle { tx }, join)
}

/// Handle for sending commands to a running chase session.
#[derive(Clone)]
pub struct SessionHandle {
    tx: mpsc::UnboundedSender<SessionCommand>,
}

impl SessionHandle {
    /// Start a new game on behalf of `requester`. Returns the chat reply
    /// for the requester.
    pub async fn start_game(&self, requester: ConnectionId) -> Result<String, CommandError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(SessionCommand::Start { requester, reply })
            .map_err(|_| CommandError::SessionClosed)?;
        rx.await.map_err(|_| CommandError::SessionClosed)?
    }

    /// Stop the active game on behalf of `requester`.
    pub async fn stop_game(&self, requester: ConnectionId) -> Result<String, CommandError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(SessionCommand::Stop { requester, reply })
            .map_err(|_| CommandError::SessionClosed)?;
        rx.await.map_err(|_| CommandError::SessionClosed)?
    }

    /// Snapshot of the current game for `/status`.
    pub async fn status(&self) -> Result<GameStatus, CommandError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(SessionCommand::Status { reply })
            .map_err(|_| CommandError::SessionClosed)?;
        rx.await.map_err(|_| CommandError::SessionClosed)
    }

    /// Notify the session of a new connection. Fire-and-forget.
    pub fn player_connected(&self, player: ConnectedPlayer) {
        let _ = self.tx.send(SessionCommand::PlayerConnected { player });
    }

    /// Notify the session of a disconnection. Fire-and-forget.
    pub fn player_disconnected(&self, connection_id: ConnectionId) {
        let _ = self
            .tx
            .send(SessionCommand::PlayerDisconnected { connection_id });
    }

    /// Report a completed lap. Fire-and-forget.
    pub fn lap_completed(&self, connection_id: ConnectionId, lap_time_ms: u32, cuts: u32) {
        let _ = self.tx.send(SessionCommand::LapCompleted {
            connection_id,
            lap_time_ms,
            cuts,
        });
    }

    /// Ask the actor to exit. Pending timers are aborted on the way out.
    pub fn shutdown(&self) {
        let _ = self.tx.send(SessionCommand::Shutdown);
    }
}

/// Chat help text listing the session's commands.
pub fn help_text() -> &'static str {
    "Cat & Mouse commands:\n\
     /startgame - start a new cat and mouse game\n\
     /stopgame - stop the current game\n\
     /status - show the current game state\n\
     /help - show this message"
}

/// Install the process-wide tracing subscriber. Respects `RUST_LOG`.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();
}
