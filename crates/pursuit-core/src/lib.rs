pub mod messages;
pub mod player;
pub mod round;
pub mod spawn;
pub mod time;

pub use player::{AccountId, ConnectionId, PlayerState, Roster};
pub use round::{GamePhase, Role, RoundOutcome, circular_distance, decide_round};
