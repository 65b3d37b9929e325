use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::round::Role;

/// Stable identifier for one client connection.
pub type ConnectionId = u64;

/// Persistent player identity (account id), stable across connections.
pub type AccountId = u64;

/// Per-player round state, created on connect and destroyed on disconnect.
/// Survives across rounds within one game; wins and lap flags are reset at
/// game start and game end.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerState {
    pub connection_id: ConnectionId,
    pub account_id: AccountId,
    pub name: String,
    pub role: Role,
    /// Round wins this game, 0..=2.
    pub wins: u8,
    /// Last known normalized track position in [0.0, 1.0), wraps.
    pub track_position: f32,
    /// Whether the current-round lap has been finished.
    pub lap_finished: bool,
    /// Laps completed this round.
    pub laps_completed: u32,
}

impl PlayerState {
    pub fn new(connection_id: ConnectionId, account_id: AccountId, name: String) -> Self {
        Self {
            connection_id,
            account_id,
            name,
            role: Role::None,
            wins: 0,
            track_position: 0.0,
            lap_finished: false,
            laps_completed: 0,
        }
    }
}

/// Connected-player registry, owned exclusively by the session actor.
///
/// Keyed by connection id in a `BTreeMap` so iteration order is the
/// connection order — the deterministic key role assignment sorts by.
#[derive(Debug, Default)]
pub struct Roster {
    players: BTreeMap<ConnectionId, PlayerState>,
}

impl Roster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a newly connected player. Idempotent: a duplicate connect for an
    /// already tracked connection id is ignored.
    pub fn insert(&mut self, player: PlayerState) {
        self.players.entry(player.connection_id).or_insert(player);
    }

    /// Remove a disconnected player, returning its final state.
    pub fn remove(&mut self, connection_id: ConnectionId) -> Option<PlayerState> {
        self.players.remove(&connection_id)
    }

    pub fn get(&self, connection_id: ConnectionId) -> Option<&PlayerState> {
        self.players.get(&connection_id)
    }

    pub fn get_mut(&mut self, connection_id: ConnectionId) -> Option<&mut PlayerState> {
        self.players.get_mut(&connection_id)
    }

    pub fn contains(&self, connection_id: ConnectionId) -> bool {
        self.players.contains_key(&connection_id)
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    /// Iterate players in connection order.
    pub fn iter(&self) -> impl Iterator<Item = &PlayerState> {
        self.players.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut PlayerState> {
        self.players.values_mut()
    }

    /// Connection ids in connection order.
    pub fn connection_ids(&self) -> Vec<ConnectionId> {
        self.players.keys().copied().collect()
    }

    /// Reset per-game state for every player (game start).
    pub fn reset_for_game(&mut self) {
        for p in self.players.values_mut() {
            p.wins = 0;
            p.lap_finished = false;
            p.laps_completed = 0;
        }
    }

    /// Reset per-round lap state for every player (round start).
    pub fn reset_for_round(&mut self) {
        for p in self.players.values_mut() {
            p.lap_finished = false;
            p.laps_completed = 0;
        }
    }

    /// Clear roles, wins and lap state for every player (game teardown).
    pub fn reset_after_game(&mut self) {
        for p in self.players.values_mut() {
            p.role = Role::None;
            p.wins = 0;
            p.lap_finished = false;
            p.laps_completed = 0;
        }
    }
}
