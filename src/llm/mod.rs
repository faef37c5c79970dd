//! Language model rephrasing of template commentary

pub mod client;
pub mod prompt;

use crate::error::CollaboratorError;
use async_trait::async_trait;

pub use client::ChatCompletionClient;
pub use prompt::{CommentaryPrompt, MAX_RECENT_PLAYS, SYSTEM_PROMPT};

/// Text generation backend
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Generate commentary for the prompt
    async fn complete(&self, prompt: &CommentaryPrompt) -> Result<String, CollaboratorError>;
}
