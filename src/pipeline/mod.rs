//! Narration pipeline: stats feed to spoken commentary
//!
//! Each game gets its own [`NarrationPipeline`] holding its analyzer and
//! generator state. Collaborator clients are shared between pipelines.

pub mod narrator;
pub mod retry;
pub mod supervisor;

use crate::config::Config;
use crate::error::CollaboratorError;
use crate::llm::{ChatCompletionClient, LanguageModel};
use crate::speech::{AzureSpeechClient, SpeechBackend};
use crate::stats::{GameStatsClient, StatsFeed};
use std::sync::Arc;

pub use narrator::{select_style, NarrationPipeline, NarrationSegment, NarrationSummary};
pub use retry::{with_retry, RetryPolicy};
pub use supervisor::Supervisor;

/// External services shared by every pipeline
#[derive(Clone)]
pub struct Collaborators {
    pub feed: Arc<dyn StatsFeed>,
    pub llm: Option<Arc<dyn LanguageModel>>,
    pub speech: Option<Arc<dyn SpeechBackend>>,
}

impl Collaborators {
    /// HTTP clients for every enabled collaborator
    pub fn from_config(config: &Config) -> Result<Self, CollaboratorError> {
        let feed: Arc<dyn StatsFeed> = Arc::new(GameStatsClient::new(&config.stats)?);

        let llm: Option<Arc<dyn LanguageModel>> = if config.llm.enabled {
            Some(Arc::new(ChatCompletionClient::new(&config.llm)?))
        } else {
            None
        };

        let speech: Option<Arc<dyn SpeechBackend>> = if config.speech.enabled {
            Some(Arc::new(AzureSpeechClient::new(&config.speech)?))
        } else {
            None
        };

        Ok(Self { feed, llm, speech })
    }
}
