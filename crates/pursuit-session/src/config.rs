use std::time::Duration;

use serde::Deserialize;

use pursuit_core::spawn::{SpawnPoint, Vec3};

/// Top-level chase configuration, loaded once from `pursuit.toml`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ChaseConfig {
    pub rules: RulesConfig,
    pub teleport: TeleportConfig,
    pub webhook: WebhookConfig,
}

/// Gameplay rules and pacing.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RulesConfig {
    /// Maximum lead the pursued may lack before a finish counts as a draw,
    /// as a fraction of track length (0.0 to 1.0).
    pub max_chase_distance: f32,
    /// Minimum connected players required to start a game.
    pub min_players: usize,
    /// Delay between rounds in seconds.
    pub round_delay_secs: u64,
    /// Delay after game completion before resetting to Waiting, in seconds.
    pub game_complete_delay_secs: u64,
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            max_chase_distance: 0.15,
            min_players: 2,
            round_delay_secs: 5,
            game_complete_delay_secs: 10,
        }
    }
}

/// Round-start teleport placement.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TeleportConfig {
    pub enabled: bool,
    /// Delay after the round-start broadcast before cars are placed.
    pub delay_secs: u64,
    pub pursuer: SpawnPoint,
    pub pursued: SpawnPoint,
}

impl Default for TeleportConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            delay_secs: 3,
            pursuer: SpawnPoint::new(
                Vec3::new(-672.35, 800.69, 1200.43),
                Vec3::new(-672.35, 800.69, 1300.43),
            ),
            pursued: SpawnPoint::new(
                Vec3::new(-600.0, 800.69, 1200.43),
                Vec3::new(-600.0, 800.69, 1300.43),
            ),
        }
    }
}

/// Game-result webhook settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WebhookConfig {
    pub enabled: bool,
    /// POST target for game results. No notification is attempted while unset.
    pub url: Option<String>,
    /// Shared secret included in the payload for the receiver to check.
    pub secret: Option<String>,
    pub timeout_secs: u64,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            url: None,
            secret: None,
            timeout_secs: 10,
        }
    }
}

impl ChaseConfig {
    pub fn round_delay(&self) -> Duration {
        Duration::from_secs(self.rules.round_delay_secs)
    }

    pub fn game_complete_delay(&self) -> Duration {
        Duration::from_secs(self.rules.game_complete_delay_secs)
    }

    pub fn teleport_delay(&self) -> Duration {
        Duration::from_secs(self.teleport.delay_secs)
    }

    /// Validate configuration, exiting on values the session cannot run with.
    pub fn validate(&self) {
        if !(0.0..=1.0).contains(&self.rules.max_chase_distance) {
            tracing::error!(
                max_chase_distance = self.rules.max_chase_distance,
                "rules.max_chase_distance must be within 0.0..=1.0"
            );
            std::process::exit(1);
        }
        if self.rules.min_players < 2 {
            tracing::error!(
                min_players = self.rules.min_players,
                "rules.min_players must be at least 2"
            );
            std::process::exit(1);
        }
        if self.webhook.timeout_secs == 0 {
            tracing::error!("webhook.timeout_secs must be > 0");
            std::process::exit(1);
        }

        if self.webhook.enabled && (self.webhook.url.is_none() || self.webhook.secret.is_none()) {
            tracing::info!("webhook enabled but url/secret unset, result notifications will be skipped");
        }
        if self.webhook.secret.is_some() {
            tracing::warn!(
                "webhook.secret is set in config file — use PURSUIT_WEBHOOK_SECRET env var in production"
            );
        }
    }

    /// Load config from `pursuit.toml` if it exists, then apply env var overrides.
    pub fn load() -> Self {
        let mut config = match std::fs::read_to_string("pursuit.toml") {
            Ok(content) => match toml::from_str::<ChaseConfig>(&content) {
                Ok(cfg) => {
                    tracing::info!("Loaded configuration from pursuit.toml");
                    cfg
                },
                Err(e) => {
                    tracing::warn!("Failed to parse pursuit.toml: {e}, using defaults");
                    ChaseConfig::default()
                },
            },
            Err(_) => {
                tracing::info!("No pursuit.toml found, using defaults");
                ChaseConfig::default()
            },
        };

        if let Ok(url) = std::env::var("PURSUIT_WEBHOOK_URL")
            && !url.is_empty()
        {
            config.webhook.url = Some(url);
        }
        if let Ok(secret) = std::env::var("PURSUIT_WEBHOOK_SECRET")
            && !secret.is_empty()
        {
            config.webhook.secret = Some(secret);
        }

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_values() {
        let cfg = ChaseConfig::default();
        assert!((cfg.rules.max_chase_distance - 0.15).abs() < f32::EPSILON);
        assert_eq!(cfg.rules.min_players, 2);
        assert_eq!(cfg.rules.round_delay_secs, 5);
        assert_eq!(cfg.rules.game_complete_delay_secs, 10);
        assert!(cfg.teleport.enabled);
        assert_eq!(cfg.teleport.delay_secs, 3);
        assert!(cfg.webhook.enabled);
        assert!(cfg.webhook.url.is_none());
        assert!(cfg.webhook.secret.is_none());
        assert_eq!(cfg.webhook.timeout_secs, 10);
    }

    #[test]
    fn parse_minimal_toml() {
        let toml_str = r#"
[rules]
max_chase_distance = 0.2
min_players = 3
"#;
        let cfg: ChaseConfig = toml::from_str(toml_str).unwrap();
        assert!((cfg.rules.max_chase_distance - 0.2).abs() < f32::EPSILON);
        assert_eq!(cfg.rules.min_players, 3);
        // Untouched sections keep their defaults.
        assert_eq!(cfg.rules.round_delay_secs, 5);
        assert!(cfg.teleport.enabled);
    }

    #[test]
    fn parse_full_toml() {
        let toml_str = r#"
[rules]
max_chase_distance = 0.1
min_players = 2
round_delay_secs = 3
game_complete_delay_secs = 8

[teleport]
enabled = false
delay_secs = 1
pursuer = { position = { x = 1.0, y = 2.0, z = 3.0 }, forward = { x = 1.0, y = 2.0, z = 9.0 } }
pursued = { position = { x = 4.0, y = 5.0, z = 6.0 }, forward = { x = 4.0, y = 5.0, z = 9.0 } }

[webhook]
enabled = true
url = "https://example.com/results"
secret = "hunter2"
timeout_secs = 5
"#;
        let cfg: ChaseConfig = toml::from_str(toml_str).unwrap();
        assert!(!cfg.teleport.enabled);
        assert!((cfg.teleport.pursuer.position.x - 1.0).abs() < f32::EPSILON);
        assert_eq!(cfg.webhook.url.as_deref(), Some("https://example.com/results"));
        assert_eq!(cfg.webhook.secret.as_deref(), Some("hunter2"));
        assert_eq!(cfg.webhook.timeout_secs, 5);
        assert_eq!(cfg.round_delay(), Duration::from_secs(3));
        assert_eq!(cfg.game_complete_delay(), Duration::from_secs(8));
        assert_eq!(cfg.teleport_delay(), Duration::from_secs(1));
    }

    #[test]
    fn validate_accepts_defaults() {
        ChaseConfig::default().validate();
    }

    #[test]
    fn invalid_chase_distance_detected() {
        let cfg = ChaseConfig {
            rules: RulesConfig {
                max_chase_distance: 1.5,
                ..RulesConfig::default()
            },
            ..ChaseConfig::default()
        };
        // validate() exits the process, so test the underlying predicate.
        assert!(!(0.0..=1.0).contains(&cfg.rules.max_chase_distance));
    }

    #[test]
    fn default_spawn_points_match_shipped_track() {
        let cfg = TeleportConfig::default();
        assert!((cfg.pursuer.position.x - -672.35).abs() < 1e-3);
        assert!((cfg.pursued.position.x - -600.0).abs() < 1e-3);
        // Forward refs sit 100 units down +z, so headings point back along -z.
        assert!((cfg.pursuer.heading().z - -1.0).abs() < 1e-6);
    }
}
