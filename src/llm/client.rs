//! OpenAI-compatible chat completions client

use super::prompt::CommentaryPrompt;
use super::LanguageModel;
use crate::config::LlmConfig;
use crate::error::CollaboratorError;
use crate::metrics::METRICS;
use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Chat completions client (Groq by default)
pub struct ChatCompletionClient {
    http: Client,
    endpoint: String,
    api_key: Option<SecretString>,
    model: String,
    max_tokens: u32,
    temperature: f32,
}

impl ChatCompletionClient {
    pub fn new(config: &LlmConfig) -> Result<Self, CollaboratorError> {
        let http = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| CollaboratorError::Network(e.to_string()))?;

        Ok(Self {
            http,
            endpoint: format!("{}/chat/completions", config.base_url.trim_end_matches('/')),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        })
    }
}

#[async_trait]
impl LanguageModel for ChatCompletionClient {
    async fn complete(&self, prompt: &CommentaryPrompt) -> Result<String, CollaboratorError> {
        let request = ChatCompletionRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: prompt.system_message().to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: prompt.user_message(),
                },
            ],
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        };

        debug!(model = %self.model, style = %prompt.style, "Requesting commentary");

        let mut req = self.http.post(&self.endpoint).json(&request);
        if let Some(api_key) = &self.api_key {
            req = req.bearer_auth(api_key.expose_secret());
        }

        let response = req.send().await.map_err(|e| {
            METRICS.record_call("llm", "chat_completions", "error");
            CollaboratorError::from(e)
        })?;

        let status = response.status();
        if !status.is_success() {
            METRICS.record_call("llm", "chat_completions", "error");
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(CollaboratorError::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatCompletionResponse = response.json().await.map_err(|e| {
            METRICS.record_call("llm", "chat_completions", "error");
            CollaboratorError::InvalidResponse(e.to_string())
        })?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content.trim().to_string())
            .filter(|content| !content.is_empty())
            .ok_or_else(|| {
                METRICS.record_call("llm", "chat_completions", "empty");
                CollaboratorError::InvalidResponse("No choices in response".to_string())
            })?;

        METRICS.record_call("llm", "chat_completions", "success");
        Ok(content)
    }
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commentary::CommentaryStyle;
    use crate::stats::models::StatsSnapshot;
    use mockito::Matcher;
    use serde_json::json;

    fn client_for(server: &mockito::ServerGuard) -> ChatCompletionClient {
        let config = LlmConfig {
            base_url: server.url(),
            api_key: Some(SecretString::new("g".repeat(40))),
            ..LlmConfig::default()
        };
        ChatCompletionClient::new(&config).unwrap()
    }

    fn prompt() -> CommentaryPrompt {
        let snapshot: StatsSnapshot = serde_json::from_value(json!({
            "game_id": "g-1",
            "timestamp": "2026-10-18 19:30:00",
            "home_team": "Hawks",
            "away_team": "Owls",
            "home_score": 21,
            "away_score": 14,
            "period": 4,
            "game_time": "04:30"
        }))
        .unwrap();
        CommentaryPrompt::new(&snapshot, vec!["Touchdown Hawks".to_string()], CommentaryStyle::Neutral)
    }

    #[tokio::test]
    async fn test_complete_returns_first_choice() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .match_header("authorization", format!("Bearer {}", "g".repeat(40)).as_str())
            .match_body(Matcher::PartialJson(json!({
                "model": "mixtral-8x7b-32768",
                "max_tokens": 150,
                "messages": [{"role": "system"}, {"role": "user"}]
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"choices": [{"message": {"role": "assistant", "content": "  Hawks are rolling!  "}}]}"#,
            )
            .create_async()
            .await;

        let text = client_for(&server).complete(&prompt()).await.unwrap();
        mock.assert_async().await;
        assert_eq!(text, "Hawks are rolling!");
    }

    #[tokio::test]
    async fn test_empty_choices_is_invalid() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"choices": []}"#)
            .create_async()
            .await;

        let err = client_for(&server).complete(&prompt()).await.unwrap_err();
        assert!(matches!(err, CollaboratorError::InvalidResponse(_)));
        assert!(!err.is_transient());
    }

    #[tokio::test]
    async fn test_rate_limit_is_transient() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/chat/completions")
            .with_status(429)
            .with_body("slow down")
            .create_async()
            .await;

        let err = client_for(&server).complete(&prompt()).await.unwrap_err();
        assert!(err.is_transient());
    }
}
