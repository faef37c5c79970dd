//! Per-game narration pipeline

use super::retry::{with_retry, RetryPolicy};
use super::Collaborators;
use crate::analysis::{Analysis, GameAnalyzer};
use crate::commentary::{Commentary, CommentaryGenerator, CommentarySource, CommentaryStyle};
use crate::config::Config;
use crate::error::PipelineError;
use crate::llm::{CommentaryPrompt, LanguageModel, MAX_RECENT_PLAYS};
use crate::metrics::METRICS;
use crate::speech::{SpeechService, SynthesisStats, SynthesizedAudio, VoiceProfiles};
use crate::stats::models::StatsSnapshot;
use crate::stats::{validate_snapshot, StatsFeed, StatsFeedExt};
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

/// Criticality at or above which commentary turns excited
const EXCITED_CRITICALITY: f64 = 0.7;

/// Team efficiency at or above which commentary turns analytical
const ANALYTICAL_EFFICIENCY: f64 = 0.6;

/// One emitted piece of commentary
#[derive(Debug, Clone, Serialize)]
pub struct NarrationSegment {
    pub game_id: String,
    pub sequence: u64,
    pub commentary: Commentary,
    pub audio: Option<SynthesizedAudio>,
}

/// Totals reported when a pipeline stops
#[derive(Debug, Clone, Default, Serialize)]
pub struct NarrationSummary {
    pub game_id: String,
    pub cycles: u64,
    pub narrated: u64,
    pub skipped: u64,
    pub synthesis: Option<SynthesisStats>,
}

/// Fetch, analyze, generate and synthesize commentary for a single game
///
/// Holds the analyzer and generator state for its game; never share an
/// instance between games.
pub struct NarrationPipeline {
    game_id: String,
    session_id: Uuid,
    feed: Arc<dyn StatsFeed>,
    llm: Option<Arc<dyn LanguageModel>>,
    speech: Option<SpeechService>,
    analyzer: GameAnalyzer,
    generator: CommentaryGenerator,
    retry: RetryPolicy,
    style: Option<CommentaryStyle>,
    max_length: usize,
    update_interval: Duration,
    sequence: u64,
    last_play_sequence: u64,
}

impl NarrationPipeline {
    pub fn new(game_id: impl Into<String>, feed: Arc<dyn StatsFeed>) -> Self {
        let defaults = Config::default();
        Self {
            game_id: game_id.into(),
            session_id: Uuid::new_v4(),
            feed,
            llm: None,
            speech: None,
            analyzer: GameAnalyzer::new(),
            generator: CommentaryGenerator::new().with_memory(defaults.pipeline.template_memory),
            retry: RetryPolicy::from_config(&defaults.pipeline),
            style: defaults.pipeline.style,
            max_length: defaults.pipeline.max_length,
            update_interval: defaults.pipeline.update_interval(),
            sequence: 0,
            last_play_sequence: 0,
        }
    }

    /// Pipeline wired from configuration and shared collaborators
    pub fn from_config(
        game_id: impl Into<String>,
        config: &Config,
        collaborators: &Collaborators,
    ) -> Self {
        let game_id = game_id.into();
        let mut pipeline = Self::new(game_id, collaborators.feed.clone())
            .with_generator(CommentaryGenerator::new().with_memory(config.pipeline.template_memory))
            .with_retry(RetryPolicy::from_config(&config.pipeline))
            .with_style(config.pipeline.style)
            .with_max_length(config.pipeline.max_length)
            .with_update_interval(config.pipeline.update_interval());

        if let Some(llm) = &collaborators.llm {
            pipeline = pipeline.with_llm(llm.clone());
        }
        if let Some(backend) = &collaborators.speech {
            pipeline = pipeline.with_speech(SpeechService::new(
                backend.clone(),
                VoiceProfiles::from_config(&config.voices),
                config.speech.output_dir.clone(),
            ));
        }
        pipeline
    }

    pub fn with_llm(mut self, llm: Arc<dyn LanguageModel>) -> Self {
        self.llm = Some(llm);
        self
    }

    pub fn with_speech(mut self, speech: SpeechService) -> Self {
        self.speech = Some(speech);
        self
    }

    pub fn with_generator(mut self, generator: CommentaryGenerator) -> Self {
        self.generator = generator;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Fixed style; `None` picks one per cycle from the analysis
    pub fn with_style(mut self, style: Option<CommentaryStyle>) -> Self {
        self.style = style;
        self
    }

    pub fn with_max_length(mut self, max_length: usize) -> Self {
        self.max_length = max_length;
        self
    }

    pub fn with_update_interval(mut self, interval: Duration) -> Self {
        self.update_interval = interval;
        self
    }

    pub fn game_id(&self) -> &str {
        &self.game_id
    }

    /// Sequence number of the last emitted segment
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn analyzer(&self) -> &GameAnalyzer {
        &self.analyzer
    }

    pub fn generator(&self) -> &CommentaryGenerator {
        &self.generator
    }

    pub fn speech(&self) -> Option<&SpeechService> {
        self.speech.as_ref()
    }

    pub fn speech_mut(&mut self) -> Option<&mut SpeechService> {
        self.speech.as_mut()
    }

    /// Run one fetch-to-speech pass
    ///
    /// Errors mean the cycle was skipped; analyzer and generator state stay
    /// consistent and the next cycle can proceed.
    pub async fn run_cycle(&mut self) -> Result<NarrationSegment, PipelineError> {
        let feed = &self.feed;
        let game_id = self.game_id.as_str();

        let payload = with_retry(&self.retry, "stats", move || feed.game_stats(game_id))
            .await?
            .ok_or_else(|| PipelineError::NoSnapshot(self.game_id.clone()))?;

        let snapshot = validate_snapshot(&payload)?;
        let analysis = self.analyzer.analyze(&snapshot)?;

        let style = self.style.unwrap_or_else(|| select_style(&analysis));
        let mut commentary = self.generator.generate(&analysis, style, self.max_length);
        debug!(style = %style, source = commentary.source.as_str(), "Generated commentary");

        if let Some(llm) = self.llm.clone() {
            if let Some(text) = self.rephrase(llm.as_ref(), &snapshot, &commentary).await {
                commentary.text = text;
                commentary.source = CommentarySource::Llm;
            }
        }

        let sequence = self.sequence + 1;
        let audio = match &self.speech {
            Some(speech) => {
                let text = commentary.text.as_str();
                let game_id = self.game_id.as_str();
                Some(
                    with_retry(&self.retry, "speech", move || {
                        speech.synthesize(text, style, game_id, sequence)
                    })
                    .await?,
                )
            }
            None => None,
        };

        self.sequence = sequence;
        METRICS.record_commentary(style.as_str(), commentary.source.as_str());
        info!(
            sequence,
            style = %style,
            source = commentary.source.as_str(),
            "{}",
            commentary.text
        );

        Ok(NarrationSegment {
            game_id: self.game_id.clone(),
            sequence,
            commentary,
            audio,
        })
    }

    /// Ask the language model to improve the template text; `None` keeps it
    async fn rephrase(
        &mut self,
        llm: &dyn LanguageModel,
        snapshot: &StatsSnapshot,
        draft: &Commentary,
    ) -> Option<String> {
        let plays = self
            .feed
            .get_play_by_play(&self.game_id, self.last_play_sequence)
            .await;

        let recent: Vec<String> = if plays.is_empty() {
            snapshot
                .recent_events
                .iter()
                .map(|e| e.description.clone())
                .take(MAX_RECENT_PLAYS)
                .collect()
        } else {
            if let Some(last) = plays.iter().map(|p| p.sequence).max() {
                self.last_play_sequence = self.last_play_sequence.max(last);
            }
            let skip = plays.len().saturating_sub(MAX_RECENT_PLAYS);
            plays.into_iter().skip(skip).map(|p| p.description).collect()
        };

        let prompt = CommentaryPrompt::new(snapshot, recent, draft.style).with_draft(&draft.text);
        let prompt = &prompt;

        match with_retry(&self.retry, "llm", move || llm.complete(prompt)).await {
            Ok(text) => Some(text.chars().take(self.max_length).collect()),
            Err(e) => {
                warn!("Keeping template commentary, language model failed: {}", e);
                None
            }
        }
    }

    /// Narrate on an interval until shutdown or `max_cycles` cycles have run
    pub async fn run(
        mut self,
        mut shutdown: watch::Receiver<bool>,
        max_cycles: Option<u64>,
    ) -> NarrationSummary {
        let span = info_span!(
            "narration",
            game_id = %self.game_id,
            session = %self.session_id
        );

        async move {
            info!(interval = ?self.update_interval, "Starting narration");

            let mut summary = NarrationSummary {
                game_id: self.game_id.clone(),
                ..Default::default()
            };
            let mut ticker = tokio::time::interval(self.update_interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            loop {
                if *shutdown.borrow() {
                    break;
                }

                tokio::select! {
                    biased;
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            break;
                        }
                        continue;
                    }
                    _ = ticker.tick() => {}
                }

                let started = Instant::now();
                match self.run_cycle().await {
                    Ok(_) => {
                        summary.narrated += 1;
                        METRICS.record_cycle("narrated", started.elapsed().as_secs_f64());
                    }
                    Err(e) => {
                        summary.skipped += 1;
                        METRICS.record_cycle(e.outcome(), started.elapsed().as_secs_f64());
                        match &e {
                            PipelineError::NoSnapshot(_) => info!("Skipping cycle: {}", e),
                            PipelineError::Validation(v) => {
                                warn!(field = %v.field, "Skipping cycle: {}", e)
                            }
                            _ => error!("Skipping cycle: {}", e),
                        }
                    }
                }

                summary.cycles += 1;
                if max_cycles.is_some_and(|max| summary.cycles >= max) {
                    break;
                }
            }

            summary.synthesis = self.speech.as_ref().map(SpeechService::stats);
            info!(
                cycles = summary.cycles,
                narrated = summary.narrated,
                skipped = summary.skipped,
                "Narration stopped"
            );
            summary
        }
        .instrument(span)
        .await
    }
}

/// Style for a cycle when none is configured
pub fn select_style(analysis: &Analysis) -> CommentaryStyle {
    let shift = analysis.top_moment().is_some_and(|m| m.momentum_shift);
    let critical = analysis
        .game_situation
        .as_ref()
        .is_some_and(|s| s.criticality >= EXCITED_CRITICALITY);

    if shift || critical {
        CommentaryStyle::Excited
    } else if analysis
        .performance_metrics
        .is_some_and(|p| p.max_efficiency() >= ANALYTICAL_EFFICIENCY)
    {
        CommentaryStyle::Analytical
    } else {
        CommentaryStyle::Neutral
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{GameMoment, PerformanceMetrics, TeamPerformance};
    use crate::stats::models::EventType;

    #[test]
    fn test_select_style() {
        assert_eq!(select_style(&Analysis::default()), CommentaryStyle::Neutral);

        let efficient = Analysis {
            performance_metrics: Some(PerformanceMetrics {
                home: TeamPerformance {
                    efficiency: 0.65,
                    ..Default::default()
                },
                away: TeamPerformance::default(),
            }),
            ..Default::default()
        };
        assert_eq!(select_style(&efficient), CommentaryStyle::Analytical);

        let mut swing = efficient.clone();
        swing.key_moments.push(GameMoment {
            timestamp: "2026-10-18 19:29:00".into(),
            event_type: EventType::ScoreChange,
            importance: 0.9,
            description: "Touchdown".into(),
            teams_involved: vec![],
            score_change: true,
            momentum_shift: true,
        });
        assert_eq!(select_style(&swing), CommentaryStyle::Excited);
    }
}
