use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};

use pursuit_core::messages::{
    GameCompleteMsg, GameStateMsg, LapResultMsg, RoundResultMsg, RoundStartMsg, SessionMessage,
    format_lap_time,
};
use pursuit_core::player::{ConnectionId, PlayerState, Roster};
use pursuit_core::round::{GamePhase, Role, RoundOutcome, decide_round};
use pursuit_core::time::epoch_seconds;

use crate::config::ChaseConfig;
use crate::error::CommandError;
use crate::host::{ConnectedPlayer, RaceHost};
use crate::notify::{GameResultPayload, ResultNotifier};
use crate::timers::{TimerAction, TimerSequencer};

/// How often tracked players' positions are refreshed from host telemetry.
const POSITION_POLL_INTERVAL: Duration = Duration::from_millis(100);
/// Settle time after a session restart before the state broadcast.
const RESTART_SETTLE_DELAY: Duration = Duration::from_secs(2);
/// Gap between the state broadcast and the round-start announcement.
const ROUND_START_DELAY: Duration = Duration::from_millis(800);

/// Round wins needed to take the game (best of three).
const WINS_TO_TAKE_GAME: u8 = 2;

/// Everything that can happen to the session. Network events, commands,
/// and timer continuations all funnel through this one channel so the
/// actor is the only writer of session state.
#[derive(Debug)]
pub enum SessionCommand {
    Start {
        requester: ConnectionId,
        reply: oneshot::Sender<Result<String, CommandError>>,
    },
    Stop {
        requester: ConnectionId,
        reply: oneshot::Sender<Result<String, CommandError>>,
    },
    Status {
        reply: oneshot::Sender<GameStatus>,
    },
    PlayerConnected {
        player: ConnectedPlayer,
    },
    PlayerDisconnected {
        connection_id: ConnectionId,
    },
    LapCompleted {
        connection_id: ConnectionId,
        lap_time_ms: u32,
        cuts: u32,
    },
    Timer {
        action: TimerAction,
        generation: u64,
    },
    Shutdown,
}

/// One side of the current chase, for presentation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParticipantStatus {
    pub name: String,
    pub wins: u8,
}

/// Read-only projection of the session for status queries.
#[derive(Debug, Clone, PartialEq)]
pub struct GameStatus {
    pub active: bool,
    pub phase: GamePhase,
    pub round: u32,
    pub pursuer: Option<ParticipantStatus>,
    pub pursued: Option<ParticipantStatus>,
}

impl std::fmt::Display for GameStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if !self.active {
            return write!(f, "No game currently active. Use /startgame to begin.");
        }
        let name = |p: &Option<ParticipantStatus>| {
            p.as_ref().map_or("None".to_string(), |p| p.name.clone())
        };
        let wins = |p: &Option<ParticipantStatus>| p.as_ref().map_or(0, |p| p.wins);
        writeln!(
            f,
            "Game state: {}, round: {} (best of 3)",
            self.phase, self.round
        )?;
        writeln!(
            f,
            "Pursuer: {}, Pursued: {}",
            name(&self.pursuer),
            name(&self.pursued)
        )?;
        write!(
            f,
            "Score - Pursuer: {}, Pursued: {}",
            wins(&self.pursuer),
            wins(&self.pursued)
        )
    }
}

/// The session actor. Owns all mutable game state; everything else talks
/// to it through [`SessionCommand`]s.
pub(crate) struct ChaseSession {
    host: Arc<dyn RaceHost>,
    config: ChaseConfig,
    notifier: Arc<ResultNotifier>,
    timers: TimerSequencer,
    rx: mpsc::UnboundedReceiver<SessionCommand>,

    roster: Roster,
    phase: GamePhase,
    round: u32,
    active: bool,
    /// Whether the current game has produced at least one round result.
    round_resolved: bool,
    pursuer: Option<ConnectionId>,
    pursued: Option<ConnectionId>,
    /// Bumped whenever pending timers must go stale (stop, round/game
    /// completion). Fired timers carrying an older generation are discarded.
    generation: u64,
}

impl ChaseSession {
    pub(crate) fn new(
        host: Arc<dyn RaceHost>,
        config: ChaseConfig,
        tx: mpsc::UnboundedSender<SessionCommand>,
        rx: mpsc::UnboundedReceiver<SessionCommand>,
    ) -> Self {
        let notifier = Arc::new(ResultNotifier::new(config.webhook.clone()));
        Self {
            host,
            config,
            notifier,
            timers: TimerSequencer::new(tx),
            rx,
            roster: Roster::new(),
            phase: GamePhase::Waiting,
            round: 0,
            active: false,
            round_resolved: false,
            pursuer: None,
            pursued: None,
            generation: 0,
        }
    }

    pub(crate) async fn run(mut self) {
        // Pick up players already connected when the session spawns.
        for player in self.host.connected_players() {
            self.on_player_connected(player);
        }

        let mut poll = tokio::time::interval(POSITION_POLL_INTERVAL);
        poll.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = poll.tick() => {
                    if self.active && self.phase == GamePhase::InProgress {
                        self.refresh_positions();
                    }
                }
                cmd = self.rx.recv() => match cmd {
                    Some(SessionCommand::Shutdown) | None => break,
                    Some(cmd) => self.handle(cmd),
                }
            }
        }

        self.timers.abort_all();
        tracing::info!("chase session stopped");
    }

    fn handle(&mut self, cmd: SessionCommand) {
        match cmd {
            SessionCommand::Start { requester, reply } => {
                let _ = reply.send(self.handle_start(requester));
            },
            SessionCommand::Stop { requester, reply } => {
                let _ = reply.send(self.handle_stop(requester));
            },
            SessionCommand::Status { reply } => {
                let _ = reply.send(self.status());
            },
            SessionCommand::PlayerConnected { player } => self.on_player_connected(player),
            SessionCommand::PlayerDisconnected { connection_id } => {
                self.on_player_disconnected(connection_id);
            },
            SessionCommand::LapCompleted {
                connection_id,
                lap_time_ms,
                cuts,
            } => self.on_lap_completed(connection_id, lap_time_ms, cuts),
            SessionCommand::Timer { action, generation } => self.on_timer(action, generation),
            // Shutdown is consumed by the run loop.
            SessionCommand::Shutdown => {},
        }
    }

    // ---- commands ----

    fn handle_start(&mut self, requester: ConnectionId) -> Result<String, CommandError> {
        if self.active {
            return Err(CommandError::AlreadyActive);
        }
        let connected = self.roster.len();
        if connected < self.config.rules.min_players {
            return Err(CommandError::NotEnoughPlayers {
                required: self.config.rules.min_players,
                connected,
            });
        }

        self.start_new_game();
        let name = self.display_name(requester);
        self.host
            .broadcast_chat(&format!("Cat and mouse game started by {name}!"));
        Ok("Game started successfully!".to_string())
    }

    fn handle_stop(&mut self, requester: ConnectionId) -> Result<String, CommandError> {
        if !self.active {
            return Err(CommandError::NoActiveGame);
        }
        let name = self.display_name(requester);
        self.end_game();
        self.host
            .broadcast_chat(&format!("Cat and mouse game stopped by {name}."));
        Ok("Game stopped successfully!".to_string())
    }

    fn status(&self) -> GameStatus {
        let participant = |id: Option<ConnectionId>| {
            id.and_then(|id| self.roster.get(id)).map(|p| ParticipantStatus {
                name: p.name.clone(),
                wins: p.wins,
            })
        };
        GameStatus {
            active: self.active,
            phase: self.phase,
            round: self.round,
            pursuer: participant(self.pursuer),
            pursued: participant(self.pursued),
        }
    }

    // ---- roster events ----

    fn on_player_connected(&mut self, player: ConnectedPlayer) {
        tracing::info!(
            player = %player.name,
            connection_id = player.connection_id,
            account_id = player.account_id,
            "player connected"
        );
        self.roster.insert(PlayerState::new(
            player.connection_id,
            player.account_id,
            player.name,
        ));
    }

    fn on_player_disconnected(&mut self, connection_id: ConnectionId) {
        let is_participant =
            self.active && (self.pursuer == Some(connection_id) || self.pursued == Some(connection_id));

        if is_participant {
            let remaining = if self.pursuer == Some(connection_id) {
                self.pursued
            } else {
                self.pursuer
            };
            tracing::info!(
                player = %self.display_name(connection_id),
                "game participant disconnected"
            );

            match remaining {
                // A round was already decided this game: the survivor takes
                // the whole game.
                Some(rem) if self.round_resolved => {
                    if let Some(p) = self.roster.get_mut(rem) {
                        p.wins = WINS_TO_TAKE_GAME;
                    }
                    let rem_name = self.display_name(rem);
                    tracing::info!(
                        remaining = %rem_name,
                        "round already resolved, awarding game to remaining player"
                    );
                    self.complete_game(rem, "player disconnection after round completion");
                    self.host.broadcast_chat(&format!(
                        "Game won by {rem_name} due to opponent disconnection!"
                    ));
                },
                // Round still contested: nobody wins.
                _ => {
                    self.end_game();
                    self.host
                        .broadcast_chat("Game ended due to player disconnection.");
                },
            }
        }

        if self.roster.remove(connection_id).is_some() {
            tracing::info!(connection_id, "player removed from roster");
        }
    }

    // ---- lap flow ----

    fn on_lap_completed(&mut self, connection_id: ConnectionId, lap_time_ms: u32, cuts: u32) {
        if !self.active || self.phase != GamePhase::InProgress {
            return;
        }
        if !self.roster.contains(connection_id) {
            return;
        }

        let live_position = self.host.player_position(connection_id);
        let formatted = format_lap_time(lap_time_ms);
        let (role, position) = {
            let player = match self.roster.get_mut(connection_id) {
                Some(p) => p,
                None => return,
            };
            player.laps_completed += 1;
            // Keep the poll-maintained value when the host has no telemetry
            // for this car right now.
            if let Some(pos) = live_position {
                player.track_position = pos;
            }
            player.lap_finished = true;
            tracing::info!(
                player = %player.name,
                role = %player.role,
                lap = player.laps_completed,
                time = %formatted,
                cuts,
                position = player.track_position,
                "lap completed"
            );
            (player.role, player.track_position)
        };

        let opponent_pos = self
            .opponent_of(role)
            .and_then(|id| self.roster.get(id))
            .map(|p| p.track_position);
        let outcome = decide_round(
            role,
            position,
            opponent_pos,
            self.config.rules.max_chase_distance,
        );
        self.complete_round(outcome);

        // Lap feedback goes to the finisher regardless of the round outcome.
        let lap_msg = SessionMessage::LapResult(LapResultMsg {
            lap_time_ms,
            lap_time_formatted: formatted,
            cuts,
            collisions: 0,
            saved: false,
            reason: "Cat & Mouse Racing".to_string(),
        });
        self.host.send_message(connection_id, &lap_msg);
    }

    /// The opponent whose position the arbiter measures against.
    fn opponent_of(&self, role: Role) -> Option<ConnectionId> {
        match role {
            Role::Pursued => self.pursuer,
            Role::Pursuer => self.pursued,
            Role::None => None,
        }
    }

    fn complete_round(&mut self, outcome: RoundOutcome) {
        self.phase = GamePhase::RoundComplete;
        self.round_resolved = true;

        let winner = match outcome {
            RoundOutcome::PursuerWins => self.pursuer,
            RoundOutcome::PursuedWins => self.pursued,
            RoundOutcome::Draw => None,
        };

        let mut reason = "Draw - chase was too close when the leader finished!".to_string();
        let mut winner_wins = 0;
        if let Some(id) = winner
            && let Some(p) = self.roster.get_mut(id)
        {
            p.wins += 1;
            winner_wins = p.wins;
            reason = match outcome {
                RoundOutcome::PursuerWins => format!("{} caught the mouse!", p.name),
                _ => format!("{} escaped successfully!", p.name),
            };
        }

        tracing::info!(
            round = self.round,
            ?outcome,
            reason = %reason,
            pursuer_wins = self.wins_of(self.pursuer),
            pursued_wins = self.wins_of(self.pursued),
            "round complete"
        );
        self.send_round_result_to_all(outcome, &reason, winner);

        match winner {
            Some(id) if winner_wins >= WINS_TO_TAKE_GAME => {
                self.complete_game(id, "normal game completion");
            },
            _ => {
                self.round += 1;
                self.swap_roles();
                // Invalidate any broadcast/teleport still pending from the
                // finished round before sequencing the next one.
                self.generation += 1;
                self.timers.schedule(
                    self.config.round_delay(),
                    TimerAction::NextRound,
                    self.generation,
                );
            },
        }
    }

    fn complete_game(&mut self, winner_id: ConnectionId, reason: &str) {
        self.phase = GamePhase::GameComplete;
        self.generation += 1;

        let (winner_name, winner_wins) = match self.roster.get(winner_id) {
            Some(p) => (p.name.clone(), p.wins),
            None => return,
        };
        tracing::info!(
            winner = %winner_name,
            wins = winner_wins,
            rounds = self.round,
            reason,
            "game complete"
        );

        self.send_game_complete_to_all(winner_id, &winner_name, winner_wins);
        self.dispatch_result_webhook(winner_id);

        let opponent_wins = if self.pursuer == Some(winner_id) {
            self.wins_of(self.pursued)
        } else {
            self.wins_of(self.pursuer)
        };
        self.host.broadcast_chat(&format!(
            "GAME OVER! {} WINS THE CAT & MOUSE CHAMPIONSHIP! ({}-{} after {} rounds)",
            winner_name.to_uppercase(),
            winner_wins,
            opponent_wins,
            self.round
        ));

        self.timers.schedule(
            self.config.game_complete_delay(),
            TimerAction::ResetAfterGame,
            self.generation,
        );
    }

    fn dispatch_result_webhook(&self, winner_id: ConnectionId) {
        let Some(winner) = self.roster.get(winner_id) else {
            return;
        };
        let opponent_id = if self.pursuer == Some(winner_id) {
            self.pursued
        } else {
            self.pursuer
        };
        let Some(opponent) = opponent_id.and_then(|id| self.roster.get(id)) else {
            tracing::warn!("cannot send result webhook, opponent not found");
            return;
        };

        let payload = GameResultPayload {
            winner_name: winner.name.clone(),
            winner_id: winner.account_id.to_string(),
            winner_score: winner.wins,
            opponent_name: opponent.name.clone(),
            opponent_id: opponent.account_id.to_string(),
            opponent_score: opponent.wins,
            rounds_played: self.round,
            game_end_time: epoch_seconds(),
            password: String::new(),
        };
        let notifier = Arc::clone(&self.notifier);
        // Detached: completion or failure has no ordering relationship with
        // later rounds or games.
        tokio::spawn(async move {
            notifier.send(payload).await;
        });
    }

    // ---- game lifecycle ----

    fn start_new_game(&mut self) {
        tracing::info!("starting new cat and mouse game");
        self.active = true;
        self.round = 1;
        self.phase = GamePhase::InProgress;
        self.round_resolved = false;
        self.generation += 1;
        self.roster.reset_for_game();
        self.assign_roles();
        self.begin_round();
    }

    fn end_game(&mut self) {
        self.active = false;
        self.phase = GamePhase::Waiting;
        self.round = 0;
        self.round_resolved = false;
        self.generation += 1;
        self.roster.reset_after_game();
        self.pursuer = None;
        self.pursued = None;

        tracing::info!("game ended and reset");
        self.send_game_state_to_all();
        self.host
            .broadcast_chat("Game ended. Type /startgame to play again!");
    }

    /// First connection becomes the pursuer, second the pursued, the rest
    /// spectate. Connection order is the stable assignment key.
    fn assign_roles(&mut self) {
        let ids = self.roster.connection_ids();
        if ids.len() < 2 {
            tracing::warn!(active = ids.len(), "not enough active players to assign roles");
            return;
        }

        for p in self.roster.iter_mut() {
            p.role = Role::None;
        }
        let (pursuer, pursued) = (ids[0], ids[1]);
        if let Some(p) = self.roster.get_mut(pursuer) {
            p.role = Role::Pursuer;
        }
        if let Some(p) = self.roster.get_mut(pursued) {
            p.role = Role::Pursued;
        }
        self.pursuer = Some(pursuer);
        self.pursued = Some(pursued);

        tracing::info!(
            pursuer = %self.display_name(pursuer),
            pursued = %self.display_name(pursued),
            "roles assigned"
        );
    }

    /// Exchange the pursuer/pursued labels and references. Only ever called
    /// from the actor between rounds, never concurrently with assignment.
    fn swap_roles(&mut self) {
        let (Some(pursuer), Some(pursued)) = (self.pursuer, self.pursued) else {
            return;
        };
        if let Some(p) = self.roster.get_mut(pursuer) {
            p.role = Role::Pursued;
        }
        if let Some(p) = self.roster.get_mut(pursued) {
            p.role = Role::Pursuer;
        }
        self.pursuer = Some(pursued);
        self.pursued = Some(pursuer);

        tracing::info!(
            pursuer = %self.display_name(pursued),
            pursued = %self.display_name(pursuer),
            "roles swapped"
        );
    }

    /// Round sequencing: restart the race session now, then run the delayed
    /// broadcast → round-start → teleport chain through the timer queue.
    fn begin_round(&mut self) {
        tracing::info!(
            round = self.round,
            pursuer_wins = self.wins_of(self.pursuer),
            pursued_wins = self.wins_of(self.pursued),
            "starting round"
        );
        self.round_resolved = false;
        self.roster.reset_for_round();

        if !self.host.restart_session() {
            tracing::warn!("failed to restart race session, continuing without restart");
        }

        self.timers.schedule(
            RESTART_SETTLE_DELAY,
            TimerAction::BroadcastState,
            self.generation,
        );
    }

    fn on_timer(&mut self, action: TimerAction, generation: u64) {
        if generation != self.generation {
            tracing::debug!(?action, generation, current = self.generation, "stale timer discarded");
            return;
        }
        match action {
            TimerAction::BroadcastState => {
                self.send_game_state_to_all();
                self.timers
                    .schedule(ROUND_START_DELAY, TimerAction::RoundStart, self.generation);
            },
            TimerAction::RoundStart => {
                self.send_round_start_to_all();
                if self.config.teleport.enabled {
                    self.timers.schedule(
                        self.config.teleport_delay(),
                        TimerAction::Teleport,
                        self.generation,
                    );
                }
            },
            TimerAction::Teleport => self.teleport_to_start_positions(),
            TimerAction::NextRound => {
                self.phase = GamePhase::InProgress;
                self.begin_round();
            },
            TimerAction::ResetAfterGame => self.end_game(),
        }
    }

    fn teleport_to_start_positions(&mut self) {
        let (Some(pursuer), Some(pursued)) = (self.pursuer, self.pursued) else {
            tracing::warn!("cannot teleport players, chase roles not assigned");
            return;
        };

        let spawn = self.config.teleport.pursuer;
        tracing::info!(
            player = %self.display_name(pursuer),
            ?spawn.position,
            "teleporting pursuer to start"
        );
        self.host.teleport(pursuer, spawn.position, spawn.heading());

        let spawn = self.config.teleport.pursued;
        tracing::info!(
            player = %self.display_name(pursued),
            ?spawn.position,
            "teleporting pursued to start"
        );
        self.host.teleport(pursued, spawn.position, spawn.heading());

        self.host.broadcast_chat(&format!(
            "Players teleported! Pursuer: {} | Pursued: {} | GO!",
            self.display_name(pursuer),
            self.display_name(pursued)
        ));
    }

    // ---- outbound messages ----

    fn send_game_state_to_all(&self) {
        let pursuer_name = self.participant_name(self.pursuer);
        let pursued_name = self.participant_name(self.pursued);
        let pursuer_wins = self.wins_of(self.pursuer);
        let pursued_wins = self.wins_of(self.pursued);

        for p in self.roster.iter() {
            let msg = SessionMessage::GameState(GameStateMsg {
                phase: self.phase,
                current_round: self.round,
                my_role: p.role,
                pursuer_name: pursuer_name.clone(),
                pursued_name: pursued_name.clone(),
                pursuer_wins,
                pursued_wins,
            });
            self.host.send_message(p.connection_id, &msg);
        }
    }

    fn send_round_start_to_all(&self) {
        let pursuer_name = self.participant_name(self.pursuer);
        let pursued_name = self.participant_name(self.pursued);

        for p in self.roster.iter() {
            let msg = SessionMessage::RoundStart(RoundStartMsg {
                round: self.round,
                my_role: p.role,
                pursuer_name: pursuer_name.clone(),
                pursued_name: pursued_name.clone(),
            });
            self.host.send_message(p.connection_id, &msg);
        }
    }

    fn send_round_result_to_all(
        &self,
        outcome: RoundOutcome,
        reason: &str,
        winner: Option<ConnectionId>,
    ) {
        let winner_name = winner
            .and_then(|id| self.roster.get(id))
            .map_or("Draw".to_string(), |p| p.name.clone());

        for p in self.roster.iter() {
            let did_i_win = matches!(
                (outcome, p.role),
                (RoundOutcome::PursuerWins, Role::Pursuer)
                    | (RoundOutcome::PursuedWins, Role::Pursued)
            );
            let msg = SessionMessage::RoundResult(RoundResultMsg {
                outcome,
                reason: reason.to_string(),
                round: self.round,
                did_i_win,
                winner_name: winner_name.clone(),
            });
            self.host.send_message(p.connection_id, &msg);
        }
    }

    fn send_game_complete_to_all(&self, winner_id: ConnectionId, winner_name: &str, wins: u8) {
        for p in self.roster.iter() {
            let msg = SessionMessage::GameComplete(GameCompleteMsg {
                winner_name: winner_name.to_string(),
                win_count: wins,
                did_i_win: p.connection_id == winner_id,
            });
            self.host.send_message(p.connection_id, &msg);
        }
    }

    // ---- helpers ----

    fn refresh_positions(&mut self) {
        for p in self.roster.iter_mut() {
            if let Some(pos) = self.host.player_position(p.connection_id) {
                p.track_position = pos;
            }
        }
    }

    fn wins_of(&self, id: Option<ConnectionId>) -> u8 {
        id.and_then(|id| self.roster.get(id)).map_or(0, |p| p.wins)
    }

    fn participant_name(&self, id: Option<ConnectionId>) -> String {
        id.and_then(|id| self.roster.get(id))
            .map_or(String::new(), |p| p.name.clone())
    }

    fn display_name(&self, id: ConnectionId) -> String {
        self.roster
            .get(id)
            .map_or("server".to_string(), |p| p.name.clone())
    }
}
