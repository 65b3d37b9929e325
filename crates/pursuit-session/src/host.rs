use pursuit_core::messages::SessionMessage;
use pursuit_core::player::{AccountId, ConnectionId};
use pursuit_core::spawn::Vec3;

/// A player currently connected to the race server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectedPlayer {
    pub connection_id: ConnectionId,
    pub account_id: AccountId,
    pub name: String,
}

/// Operations the chase session consumes from the hosting race server.
///
/// Everything here is assumed non-blocking and best-effort from the
/// session's point of view: the orchestrator never retries and never lets
/// a host failure abort a round.
pub trait RaceHost: Send + Sync + 'static {
    /// Restart the current race session. Returns false when the restart
    /// could not be performed; the round then continues without it.
    fn restart_session(&self) -> bool;

    /// Place a player's car at `position` pointing along `heading`.
    fn teleport(&self, connection_id: ConnectionId, position: Vec3, heading: Vec3);

    /// Deliver a typed message to one client. Encoding is the host's job.
    fn send_message(&self, connection_id: ConnectionId, msg: &SessionMessage);

    /// Send a chat line to every connected client.
    fn broadcast_chat(&self, text: &str);

    /// Players connected right now, in no particular order.
    fn connected_players(&self) -> Vec<ConnectedPlayer>;

    /// Current normalized track position of a player, if the host has
    /// telemetry for that connection.
    fn player_position(&self, connection_id: ConnectionId) -> Option<f32>;
}
