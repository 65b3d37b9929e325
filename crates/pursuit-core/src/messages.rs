use serde::{Deserialize, Serialize};

use crate::round::{GamePhase, Role, RoundOutcome};

/// Session snapshot sent to each client after a restart settles and at
/// game teardown. `my_role` is personalized per recipient.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameStateMsg {
    pub phase: GamePhase,
    pub current_round: u32,
    pub my_role: Role,
    pub pursuer_name: String,
    pub pursued_name: String,
    pub pursuer_wins: u8,
    pub pursued_wins: u8,
}

/// Round-start announcement, personalized per recipient.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundStartMsg {
    pub round: u32,
    pub my_role: Role,
    pub pursuer_name: String,
    pub pursued_name: String,
}

/// Result of a completed round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundResultMsg {
    pub outcome: RoundOutcome,
    pub reason: String,
    pub round: u32,
    pub did_i_win: bool,
    /// Winner display name, or `"Draw"` when nobody won.
    pub winner_name: String,
}

/// Final game result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameCompleteMsg {
    pub winner_name: String,
    pub win_count: u8,
    pub did_i_win: bool,
}

/// Per-lap feedback sent to the finishing player only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LapResultMsg {
    pub lap_time_ms: u32,
    pub lap_time_formatted: String,
    pub cuts: u32,
    pub collisions: u32,
    pub saved: bool,
    pub reason: String,
}

/// Typed outbound payloads handed to the host for client delivery.
/// Wire encoding is the host's concern.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SessionMessage {
    GameState(GameStateMsg),
    RoundStart(RoundStartMsg),
    RoundResult(RoundResultMsg),
    GameComplete(GameCompleteMsg),
    LapResult(LapResultMsg),
}

/// Format a lap time in milliseconds as `mm:ss.fff`.
pub fn format_lap_time(ms: u32) -> String {
    let minutes = ms / 60_000;
    let seconds = (ms % 60_000) / 1_000;
    let millis = ms % 1_000;
    format!("{minutes:02}:{seconds:02}.{millis:03}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lap_time_formatting() {
        assert_eq!(format_lap_time(0), "00:00.000");
        assert_eq!(format_lap_time(83_456), "01:23.456");
        assert_eq!(format_lap_time(59_999), "00:59.999");
        assert_eq!(format_lap_time(600_001), "10:00.001");
    }

    #[test]
    fn messages_serialize_camel_case() {
        let msg = RoundResultMsg {
            outcome: RoundOutcome::PursuedWins,
            reason: "escaped".to_string(),
            round: 2,
            did_i_win: true,
            winner_name: "B".to_string(),
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert!(json.get("didIWin").is_some());
        assert!(json.get("winnerName").is_some());
        assert!(json.get("did_i_win").is_none());
    }

    #[test]
    fn game_state_round_trips() {
        let msg = GameStateMsg {
            phase: GamePhase::InProgress,
            current_round: 3,
            my_role: Role::Pursued,
            pursuer_name: "A".to_string(),
            pursued_name: "B".to_string(),
            pursuer_wins: 1,
            pursued_wins: 1,
        };
        let json = serde_json::to_string(&SessionMessage::GameState(msg.clone())).unwrap();
        let back: SessionMessage = serde_json::from_str(&json).unwrap();
        assert_eq!(back, SessionMessage::GameState(msg));
    }
}
