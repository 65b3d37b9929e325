use std::time::Duration;

use serde::Serialize;

use crate::config::WebhookConfig;

/// JSON body POSTed to the configured address when a game concludes.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GameResultPayload {
    pub winner_name: String,
    /// Winner's persistent account id, stringified.
    pub winner_id: String,
    pub winner_score: u8,
    pub opponent_name: String,
    pub opponent_id: String,
    pub opponent_score: u8,
    pub rounds_played: u32,
    /// Completion time, Unix epoch seconds.
    pub game_end_time: i64,
    /// Shared secret the receiver checks. Filled in by the notifier.
    pub password: String,
}

/// Where a notification would go, decided up front so the skip paths are
/// testable without a network.
#[derive(Debug, PartialEq, Eq)]
enum Delivery<'a> {
    Disabled,
    Unconfigured,
    Send(&'a str),
}

/// Best-effort, timeout-bounded game-result notifier.
///
/// Runs detached from the session actor: nothing here ever propagates a
/// failure back to the state machine or the players.
pub struct ResultNotifier {
    config: WebhookConfig,
    client: reqwest::Client,
}

impl ResultNotifier {
    pub fn new(config: WebhookConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .build()
            .expect("Failed to create HTTP client");
        Self { config, client }
    }

    fn delivery(&self) -> Delivery<'_> {
        if !self.config.enabled {
            return Delivery::Disabled;
        }
        match (&self.config.url, &self.config.secret) {
            (Some(url), Some(_)) => Delivery::Send(url),
            _ => Delivery::Unconfigured,
        }
    }

    /// Send the result, swallowing every failure. The shared secret is
    /// injected here so it never travels through the session.
    pub async fn send(&self, mut payload: GameResultPayload) {
        let url = match self.delivery() {
            Delivery::Disabled => {
                tracing::debug!("result webhook disabled in configuration, skipping");
                return;
            },
            Delivery::Unconfigured => {
                tracing::info!("result webhook not configured (missing url or secret), skipping");
                return;
            },
            Delivery::Send(url) => url.to_string(),
        };
        if let Some(secret) = &self.config.secret {
            payload.password = secret.clone();
        }

        tracing::info!(
            winner = %payload.winner_name,
            opponent = %payload.opponent_name,
            rounds = payload.rounds_played,
            "sending game result webhook"
        );

        match self.client.post(&url).json(&payload).send().await {
            Ok(resp) if resp.status().is_success() => {
                tracing::info!("result webhook delivered");
            },
            Ok(resp) => {
                tracing::warn!(status = %resp.status(), "result webhook rejected");
            },
            Err(e) if e.is_timeout() => {
                tracing::warn!(
                    timeout_secs = self.config.timeout_secs,
                    "result webhook timed out"
                );
            },
            Err(e) => {
                tracing::warn!(error = %e, "result webhook failed");
            },
        }
    }
}
