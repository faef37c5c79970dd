//! Runs one narration pipeline per live game

use super::narrator::{NarrationPipeline, NarrationSummary};
use super::retry::{with_retry, RetryPolicy};
use super::Collaborators;
use crate::config::Config;
use crate::error::PipelineError;
use std::collections::HashSet;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::{error, info};

/// Starts independent pipelines for every live game and waits for them
pub struct Supervisor {
    config: Config,
    collaborators: Collaborators,
}

impl Supervisor {
    pub fn new(config: Config, collaborators: Collaborators) -> Self {
        Self {
            config,
            collaborators,
        }
    }

    /// Narrate all live games until shutdown or each has run `max_cycles`
    pub async fn run(
        &self,
        shutdown: watch::Receiver<bool>,
        max_cycles: Option<u64>,
    ) -> Result<Vec<NarrationSummary>, PipelineError> {
        let feed = &self.collaborators.feed;
        let retry = RetryPolicy::from_config(&self.config.pipeline);
        let games = with_retry(&retry, "stats", move || feed.live_games()).await?;

        if games.is_empty() {
            info!("No live games to narrate");
            return Ok(Vec::new());
        }

        let mut seen = HashSet::new();
        let mut tasks = JoinSet::new();
        for game in games {
            if !seen.insert(game.game_id.clone()) {
                continue;
            }
            info!(
                game_id = %game.game_id,
                home = %game.home_team,
                away = %game.away_team,
                "Starting pipeline"
            );
            let pipeline =
                NarrationPipeline::from_config(game.game_id, &self.config, &self.collaborators);
            tasks.spawn(pipeline.run(shutdown.clone(), max_cycles));
        }

        let mut summaries = Vec::with_capacity(tasks.len());
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(summary) => summaries.push(summary),
                Err(e) => error!("Pipeline task failed: {}", e),
            }
        }

        summaries.sort_by(|a, b| a.game_id.cmp(&b.game_id));
        Ok(summaries)
    }
}
