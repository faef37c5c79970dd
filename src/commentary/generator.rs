//! Template-based commentary generation

use super::history::{TemplateHistory, DEFAULT_TEMPLATE_MEMORY};
use super::style::CommentaryStyle;
use super::templates::{catalog, CommentaryTemplate};
use crate::analysis::Analysis;
use crate::error::GenerationError;
use crate::stats::models::EventType;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use std::borrow::Cow;
use tracing::{debug, warn};

/// Where a commentary line came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CommentarySource {
    Template,
    Fallback,
    Llm,
}

impl CommentarySource {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommentarySource::Template => "template",
            CommentarySource::Fallback => "fallback",
            CommentarySource::Llm => "llm",
        }
    }
}

/// One generated line of commentary
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Commentary {
    pub text: String,
    pub style: CommentaryStyle,
    pub source: CommentarySource,
}

/// Renders analyses into text, avoiding recently used patterns
///
/// Owns its template history, so one generator serves exactly one game.
pub struct CommentaryGenerator<R: Rng = StdRng> {
    templates: Cow<'static, [CommentaryTemplate]>,
    history: TemplateHistory,
    rng: R,
}

impl CommentaryGenerator<StdRng> {
    /// Generator over the built-in catalog seeded from the OS
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    /// Deterministic generator, for tests and replays
    pub fn seeded(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }
}

impl Default for CommentaryGenerator<StdRng> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Rng> CommentaryGenerator<R> {
    pub fn with_rng(rng: R) -> Self {
        Self {
            templates: Cow::Borrowed(catalog()),
            history: TemplateHistory::new(DEFAULT_TEMPLATE_MEMORY),
            rng,
        }
    }

    /// Replace the template catalog
    pub fn with_templates(mut self, templates: Vec<CommentaryTemplate>) -> Self {
        self.templates = Cow::Owned(templates);
        self
    }

    /// Set how many recent patterns are excluded from selection
    pub fn with_memory(mut self, capacity: usize) -> Self {
        self.history = TemplateHistory::new(capacity);
        self
    }

    pub fn history(&self) -> &TemplateHistory {
        &self.history
    }

    /// Generate commentary no longer than `max_length` characters
    ///
    /// Never fails: when no template applies or rendering breaks, a fixed
    /// score sentence is returned and the history is left as it was.
    pub fn generate(
        &mut self,
        analysis: &Analysis,
        style: CommentaryStyle,
        max_length: usize,
    ) -> Commentary {
        let Some(index) = self.select(analysis, style) else {
            debug!(style = %style, "No template matched, using fallback");
            return self.fallback(analysis, style, max_length);
        };

        let template = &self.templates[index];
        match render(&template.pattern, &SlotValues::new(analysis)) {
            Ok(text) if !text.trim().is_empty() => {
                let pattern = template.pattern.clone();
                self.history.push(pattern);
                Commentary {
                    text: truncate(&text, max_length),
                    style,
                    source: CommentarySource::Template,
                }
            }
            Ok(_) => self.fallback(analysis, style, max_length),
            Err(e) => {
                warn!(error = %e, pattern = %template.pattern, "Template rendering failed");
                self.fallback(analysis, style, max_length)
            }
        }
    }

    /// Index of the highest weighted eligible template
    fn select(&mut self, analysis: &Analysis, style: CommentaryStyle) -> Option<usize> {
        let mut best: Option<(usize, f64)> = None;

        for (index, template) in self.templates.iter().enumerate() {
            if template.style != style
                || self.history.contains(&template.pattern)
                || !template.matches(analysis)
            {
                continue;
            }

            let weight = f64::from(template.priority) * self.rng.gen_range(0.8..=1.2);
            if best.map_or(true, |(_, best_weight)| weight > best_weight) {
                best = Some((index, weight));
            }
        }

        best.map(|(index, _)| index)
    }

    fn fallback(&self, analysis: &Analysis, style: CommentaryStyle, max_length: usize) -> Commentary {
        Commentary {
            text: truncate(&fallback_text(analysis), max_length),
            style,
            source: CommentarySource::Fallback,
        }
    }
}

/// Fixed score sentence used when no template can be rendered
pub fn fallback_text(analysis: &Analysis) -> String {
    format!(
        "The game continues with a score of {}-{}.",
        analysis.scoreboard.home_score, analysis.scoreboard.away_score
    )
}

fn truncate(text: &str, max_length: usize) -> String {
    text.chars().take(max_length).collect()
}

/// Substitute `{slot}` placeholders
fn render(pattern: &str, values: &SlotValues<'_>) -> Result<String, GenerationError> {
    let mut out = String::with_capacity(pattern.len() + 32);
    let mut rest = pattern;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let close = after
            .find('}')
            .ok_or_else(|| GenerationError::UnterminatedSlot(pattern.to_string()))?;
        let slot = &after[..close];
        let value = values
            .get(slot)
            .ok_or_else(|| GenerationError::UnknownSlot(slot.to_string()))?;
        out.push_str(&value);
        rest = &after[close + 1..];
    }
    out.push_str(rest);

    Ok(out)
}

/// Slot values derived from one analysis
struct SlotValues<'a> {
    analysis: &'a Analysis,
}

impl<'a> SlotValues<'a> {
    fn new(analysis: &'a Analysis) -> Self {
        Self { analysis }
    }

    fn get(&self, slot: &str) -> Option<String> {
        let value = match slot {
            "team" => self.analysis.scoreboard.leading_team().to_string(),
            "action" => self.action(),
            "momentum_description" => self.momentum_description().to_string(),
            "intensity" => self.intensity().to_string(),
            "key_stat" => self.key_stat(),
            "stat_type" => "shooting efficiency".to_string(),
            "analysis" => self.efficiency_analysis(),
            _ => return None,
        };
        Some(value)
    }

    fn action(&self) -> String {
        let board = &self.analysis.scoreboard;
        let scored_last = self
            .analysis
            .top_moment()
            .is_some_and(|m| m.event_type == EventType::ScoreChange);

        if board.is_tied() {
            "keep pace".to_string()
        } else if board.score_difference() >= 10 {
            "pull away".to_string()
        } else if scored_last {
            "extend the lead".to_string()
        } else {
            "hold the lead".to_string()
        }
    }

    fn momentum_description(&self) -> &'static str {
        match self.analysis.momentum {
            None => "continue to play",
            Some(m) if m.max() > 0.8 => "dominate the game",
            Some(m) if m.max() > 0.6 => "maintain control",
            Some(_) => "push forward",
        }
    }

    fn intensity(&self) -> &'static str {
        match self.analysis.performance_metrics {
            None => "steady",
            Some(p) => match p.max_pressure() {
                x if x > 0.8 => "relentless",
                x if x > 0.6 => "commanding",
                x if x > 0.4 => "solid",
                _ => "measured",
            },
        }
    }

    fn key_stat(&self) -> String {
        let board = &self.analysis.scoreboard;
        match self.analysis.performance_metrics {
            Some(p) => {
                let side = p.most_efficient();
                format!(
                    "{} are converting {}% of their attempts.",
                    board.team_name(side),
                    percent(p.get(side).efficiency)
                )
            }
            None => format!("The score stands at {}-{}.", board.home_score, board.away_score),
        }
    }

    fn efficiency_analysis(&self) -> String {
        let Some(p) = self.analysis.performance_metrics else {
            return "a balanced picture".to_string();
        };

        let efficiency = p.get(self.analysis.scoreboard.leading_side()).efficiency;
        if efficiency >= 0.75 {
            format!("an elite conversion rate of {}%", percent(efficiency))
        } else if efficiency >= 0.6 {
            "a strong conversion rate".to_string()
        } else {
            format!("room for improvement at {}%", percent(efficiency))
        }
    }
}

fn percent(ratio: f64) -> u32 {
    (ratio * 100.0).round().clamp(0.0, 100.0) as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{
        GamePhase, GameSituation, Momentum, PerformanceMetrics, Scoreboard, TeamPerformance,
    };
    use crate::commentary::templates::Condition;

    fn scoreboard() -> Scoreboard {
        Scoreboard {
            home_team: "Hawks".into(),
            away_team: "Owls".into(),
            home_score: 21,
            away_score: 14,
            game_time: "04:30".into(),
        }
    }

    fn rich_analysis() -> Analysis {
        Analysis {
            scoreboard: scoreboard(),
            key_moments: vec![],
            momentum: Some(Momentum {
                home: 0.72,
                away: 0.28,
            }),
            performance_metrics: Some(PerformanceMetrics {
                home: TeamPerformance {
                    efficiency: 0.8,
                    pressure: 0.65,
                    defense: 0.4,
                },
                away: TeamPerformance {
                    efficiency: 0.45,
                    pressure: 0.3,
                    defense: 0.5,
                },
            }),
            game_situation: Some(GameSituation {
                time_remaining_secs: 270,
                score_difference: 7,
                criticality: 0.675,
                phase: GamePhase::Late,
                context: "Hawks lead Owls 21-14 with 04:30 left in period 4".into(),
            }),
        }
    }

    fn gated(pattern: &str, style: CommentaryStyle, priority: u32) -> CommentaryTemplate {
        CommentaryTemplate::new(pattern, style, priority).when(Condition::Momentum, 0.0)
    }

    #[test]
    fn test_empty_analysis_falls_back() {
        let mut generator = CommentaryGenerator::seeded(7);
        let commentary = generator.generate(&Analysis::default(), CommentaryStyle::Excited, 150);

        assert_eq!(commentary.text, "The game continues with a score of 0-0.");
        assert_eq!(commentary.source, CommentarySource::Fallback);
        assert!(generator.history().is_empty());
    }

    #[test]
    fn test_output_respects_max_length() {
        let analysis = rich_analysis();
        for style in CommentaryStyle::ALL {
            let mut generator = CommentaryGenerator::seeded(11);
            for max_length in [1, 12, 40, 150] {
                let commentary = generator.generate(&analysis, style, max_length);
                assert!(!commentary.text.is_empty());
                assert!(commentary.text.chars().count() <= max_length);
            }
        }
    }

    #[test]
    fn test_same_seed_same_selection() {
        let analysis = rich_analysis();
        let mut a = CommentaryGenerator::seeded(42);
        let mut b = CommentaryGenerator::seeded(42);

        for _ in 0..4 {
            assert_eq!(
                a.generate(&analysis, CommentaryStyle::Analytical, 150),
                b.generate(&analysis, CommentaryStyle::Analytical, 150)
            );
        }
    }

    #[test]
    fn test_renders_slots() {
        let template = gated("{team} {action} as they {momentum_description}", CommentaryStyle::Neutral, 1);
        let mut generator = CommentaryGenerator::seeded(1).with_templates(vec![template]);

        let commentary = generator.generate(&rich_analysis(), CommentaryStyle::Neutral, 150);
        assert_eq!(commentary.text, "Hawks hold the lead as they maintain control");
        assert_eq!(commentary.source, CommentarySource::Template);
        assert_eq!(generator.history().len(), 1);
    }

    #[test]
    fn test_recent_patterns_are_excluded() {
        let templates: Vec<_> = (0..6)
            .map(|i| gated(&format!("{{team}} line {}", i), CommentaryStyle::Neutral, 1))
            .collect();
        let mut generator = CommentaryGenerator::seeded(3).with_templates(templates);
        let analysis = rich_analysis();

        let mut seen = Vec::new();
        for _ in 0..6 {
            let text = generator.generate(&analysis, CommentaryStyle::Neutral, 150).text;
            assert!(!seen.contains(&text), "repeated {}", text);
            seen.push(text);
            assert!(generator.history().len() <= 5);
        }

        // The first pattern has been evicted and is the only eligible one left
        let seventh = generator.generate(&analysis, CommentaryStyle::Neutral, 150).text;
        assert_eq!(seventh, seen[0]);
    }

    #[test]
    fn test_single_template_is_not_repeated() {
        let template = gated("{team} again", CommentaryStyle::Excited, 1);
        let mut generator = CommentaryGenerator::seeded(5).with_templates(vec![template]);
        let analysis = rich_analysis();

        let first = generator.generate(&analysis, CommentaryStyle::Excited, 150);
        assert_eq!(first.source, CommentarySource::Template);

        let second = generator.generate(&analysis, CommentaryStyle::Excited, 150);
        assert_eq!(second.source, CommentarySource::Fallback);
        assert_eq!(second.text, "The game continues with a score of 21-14.");
    }

    #[test]
    fn test_higher_priority_wins_outside_jitter() {
        // 1 * 1.2 < 2 * 0.8, so priority 2 always wins
        let templates = vec![
            gated("low {team}", CommentaryStyle::Neutral, 1),
            gated("high {team}", CommentaryStyle::Neutral, 2),
        ];
        for seed in 0..20 {
            let mut generator = CommentaryGenerator::seeded(seed).with_templates(templates.clone());
            let text = generator.generate(&rich_analysis(), CommentaryStyle::Neutral, 150).text;
            assert_eq!(text, "high Hawks");
        }
    }

    #[test]
    fn test_unknown_slot_falls_back_without_history() {
        let template = gated("{team} {crowd_noise}", CommentaryStyle::Neutral, 1);
        let mut generator = CommentaryGenerator::seeded(9).with_templates(vec![template]);

        let commentary = generator.generate(&rich_analysis(), CommentaryStyle::Neutral, 150);
        assert_eq!(commentary.source, CommentarySource::Fallback);
        assert!(generator.history().is_empty());
    }

    #[test]
    fn test_unterminated_slot_is_an_error() {
        let empty = Analysis::default();
        let values = SlotValues::new(&empty);
        assert!(matches!(
            render("{team", &values),
            Err(GenerationError::UnterminatedSlot(_))
        ));
    }

    #[test]
    fn test_leading_team_without_momentum() {
        let analysis = Analysis {
            scoreboard: scoreboard(),
            ..Default::default()
        };
        let values = SlotValues::new(&analysis);
        assert_eq!(values.get("team").as_deref(), Some("Hawks"));
        assert_eq!(values.get("momentum_description").as_deref(), Some("continue to play"));
    }

    #[test]
    fn test_style_mismatch_is_filtered() {
        let template = gated("{team} only excited", CommentaryStyle::Excited, 1);
        let mut generator = CommentaryGenerator::seeded(2).with_templates(vec![template]);

        let commentary = generator.generate(&rich_analysis(), CommentaryStyle::Analytical, 150);
        assert_eq!(commentary.source, CommentarySource::Fallback);
    }
}
