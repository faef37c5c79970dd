//! Game statistics feed client

use super::models::{LiveGame, Play};
use crate::config::StatsConfig;
use crate::error::CollaboratorError;
use crate::metrics::METRICS;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::{debug, error};

/// Source of live game data
///
/// Methods report failures so callers can retry; the [`StatsFeedExt`]
/// helpers degrade them to empty/absent results instead.
#[async_trait]
pub trait StatsFeed: Send + Sync {
    /// All currently live games
    async fn live_games(&self) -> Result<Vec<LiveGame>, CollaboratorError>;

    /// Raw snapshot payload for a game; `None` if the feed does not know it
    async fn game_stats(&self, game_id: &str) -> Result<Option<Value>, CollaboratorError>;

    /// Plays recorded after `since_sequence`
    async fn play_by_play(
        &self,
        game_id: &str,
        since_sequence: u64,
    ) -> Result<Vec<Play>, CollaboratorError>;

    /// Team-level statistics object
    async fn team_stats(&self, game_id: &str) -> Result<Map<String, Value>, CollaboratorError>;
}

/// Degrading wrappers: failures are logged and turned into empty results
#[async_trait]
pub trait StatsFeedExt: StatsFeed {
    async fn get_live_games(&self) -> Vec<LiveGame> {
        self.live_games().await.unwrap_or_else(|e| {
            error!("Error fetching live games: {}", e);
            Vec::new()
        })
    }

    async fn get_game_stats(&self, game_id: &str) -> Option<Value> {
        self.game_stats(game_id).await.unwrap_or_else(|e| {
            error!("Error fetching game stats for game {}: {}", game_id, e);
            None
        })
    }

    async fn get_play_by_play(&self, game_id: &str, since_sequence: u64) -> Vec<Play> {
        self.play_by_play(game_id, since_sequence)
            .await
            .unwrap_or_else(|e| {
                error!("Error fetching play-by-play for game {}: {}", game_id, e);
                Vec::new()
            })
    }

    async fn get_team_stats(&self, game_id: &str) -> Map<String, Value> {
        self.team_stats(game_id).await.unwrap_or_else(|e| {
            error!("Error fetching team stats for game {}: {}", game_id, e);
            Map::new()
        })
    }
}

impl<T: StatsFeed + ?Sized> StatsFeedExt for T {}

/// HTTP client for the sports data API
pub struct GameStatsClient {
    http: Client,
    base_url: String,
    api_key: Option<SecretString>,
}

impl GameStatsClient {
    pub fn new(config: &StatsConfig) -> Result<Self, CollaboratorError> {
        let http = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| CollaboratorError::Network(e.to_string()))?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        })
    }

    async fn get(
        &self,
        endpoint: &'static str,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<Option<Value>, CollaboratorError> {
        let url = format!("{}{}", self.base_url, path);
        debug!("GET {}", url);

        let mut req = self.http.get(&url).query(query);
        if let Some(api_key) = &self.api_key {
            req = req.bearer_auth(api_key.expose_secret());
        }

        let response = req.send().await.map_err(|e| {
            METRICS.record_call("stats", endpoint, "error");
            CollaboratorError::from(e)
        })?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            METRICS.record_call("stats", endpoint, "not_found");
            return Ok(None);
        }
        if !status.is_success() {
            METRICS.record_call("stats", endpoint, "error");
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(CollaboratorError::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        let body: Value = response.json().await.map_err(|e| {
            METRICS.record_call("stats", endpoint, "error");
            CollaboratorError::InvalidResponse(e.to_string())
        })?;

        METRICS.record_call("stats", endpoint, "success");
        Ok(Some(body))
    }
}

fn field<T: DeserializeOwned + Default>(body: Option<Value>, key: &str) -> Result<T, CollaboratorError> {
    match body {
        None => Ok(T::default()),
        Some(mut value) => {
            let inner = value
                .get_mut(key)
                .map(Value::take)
                .ok_or_else(|| CollaboratorError::InvalidResponse(format!("missing `{}`", key)))?;
            serde_json::from_value(inner).map_err(|e| CollaboratorError::InvalidResponse(e.to_string()))
        }
    }
}

#[async_trait]
impl StatsFeed for GameStatsClient {
    async fn live_games(&self) -> Result<Vec<LiveGame>, CollaboratorError> {
        let body = self.get("live_games", "/games/live", &[]).await?;
        field(body, "games")
    }

    async fn game_stats(&self, game_id: &str) -> Result<Option<Value>, CollaboratorError> {
        self.get("game_stats", &format!("/games/{}/stats", game_id), &[])
            .await
    }

    async fn play_by_play(
        &self,
        game_id: &str,
        since_sequence: u64,
    ) -> Result<Vec<Play>, CollaboratorError> {
        let body = self
            .get(
                "play_by_play",
                &format!("/games/{}/plays", game_id),
                &[("since_sequence", since_sequence.to_string())],
            )
            .await?;
        field(body, "plays")
    }

    async fn team_stats(&self, game_id: &str) -> Result<Map<String, Value>, CollaboratorError> {
        match self
            .get("team_stats", &format!("/games/{}/team-stats", game_id), &[])
            .await?
        {
            None => Ok(Map::new()),
            Some(Value::Object(map)) => Ok(map),
            Some(other) => Err(CollaboratorError::InvalidResponse(format!(
                "expected object, got {}",
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn client_for(server: &mockito::ServerGuard) -> GameStatsClient {
        let config = StatsConfig {
            base_url: server.url(),
            api_key: Some(SecretString::new("k".repeat(32))),
            ..StatsConfig::default()
        };
        GameStatsClient::new(&config).unwrap()
    }

    #[tokio::test]
    async fn test_live_games() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/games/live")
            .match_header("authorization", format!("Bearer {}", "k".repeat(32)).as_str())
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"games": [{"id": "g-1", "home_team": "Hawks", "away_team": "Owls"}]}"#)
            .create_async()
            .await;

        let games = client_for(&server).live_games().await.unwrap();
        mock.assert_async().await;
        assert_eq!(games.len(), 1);
        assert_eq!(games[0].game_id, "g-1");
    }

    #[tokio::test]
    async fn test_game_stats_not_found_is_absent() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/games/missing/stats")
            .with_status(404)
            .create_async()
            .await;

        let stats = client_for(&server).game_stats("missing").await.unwrap();
        assert!(stats.is_none());
    }

    #[tokio::test]
    async fn test_server_error_is_transient() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/games/g-1/stats")
            .with_status(503)
            .with_body("unavailable")
            .create_async()
            .await;

        let err = client_for(&server).game_stats("g-1").await.unwrap_err();
        assert!(err.is_transient());
        assert!(matches!(err, CollaboratorError::Upstream { status: 503, .. }));
    }

    #[tokio::test]
    async fn test_play_by_play_passes_sequence() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/games/g-1/plays")
            .match_query(Matcher::UrlEncoded("since_sequence".into(), "12".into()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"plays": [{"sequence": 13, "description": "Deep pass complete"}]}"#)
            .create_async()
            .await;

        let plays = client_for(&server).play_by_play("g-1", 12).await.unwrap();
        assert_eq!(plays[0].sequence, 13);
    }

    #[tokio::test]
    async fn test_degrading_wrappers() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/games/live")
            .with_status(500)
            .create_async()
            .await;
        server
            .mock("GET", "/games/g-1/team-stats")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body("not json")
            .create_async()
            .await;

        let client = client_for(&server);
        assert!(client.get_live_games().await.is_empty());
        assert!(client.get_team_stats("g-1").await.is_empty());
    }
}
