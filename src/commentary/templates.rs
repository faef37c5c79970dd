//! Commentary template catalog

use super::style::CommentaryStyle;
use crate::analysis::Analysis;
use indexmap::IndexMap;
use once_cell::sync::Lazy;

/// Named analysis metric a template can be gated on
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Condition {
    /// Highest momentum value of either team
    Momentum,
    /// Highest team efficiency
    Performance,
    /// Alias of `Performance`
    Efficiency,
    /// Highest team pressure
    Pressure,
    /// Game situation criticality
    Criticality,
    /// Never satisfied
    Unknown(String),
}

impl Condition {
    pub fn parse(name: &str) -> Self {
        match name {
            "momentum" => Condition::Momentum,
            "performance" => Condition::Performance,
            "efficiency" => Condition::Efficiency,
            "pressure" => Condition::Pressure,
            "criticality" => Condition::Criticality,
            other => Condition::Unknown(other.to_string()),
        }
    }

    /// Metric value derived from the analysis, if the analysis carries it
    pub fn metric(&self, analysis: &Analysis) -> Option<f64> {
        match self {
            Condition::Momentum => analysis.momentum.map(|m| m.max()),
            Condition::Performance | Condition::Efficiency => {
                analysis.performance_metrics.map(|p| p.max_efficiency())
            }
            Condition::Pressure => analysis.performance_metrics.map(|p| p.max_pressure()),
            Condition::Criticality => analysis.game_situation.as_ref().map(|s| s.criticality),
            Condition::Unknown(_) => None,
        }
    }

    pub fn is_satisfied(&self, threshold: f64, analysis: &Analysis) -> bool {
        self.metric(analysis).is_some_and(|value| value >= threshold)
    }
}

/// Sentence pattern with `{slot}` placeholders, gated by condition thresholds
#[derive(Debug, Clone, PartialEq)]
pub struct CommentaryTemplate {
    pub pattern: String,
    pub conditions: IndexMap<Condition, f64>,
    pub style: CommentaryStyle,
    pub priority: u32,
}

impl CommentaryTemplate {
    pub fn new(pattern: impl Into<String>, style: CommentaryStyle, priority: u32) -> Self {
        Self {
            pattern: pattern.into(),
            conditions: IndexMap::new(),
            style,
            priority,
        }
    }

    /// Add a minimum threshold for a condition
    pub fn when(mut self, condition: Condition, threshold: f64) -> Self {
        self.conditions.insert(condition, threshold);
        self
    }

    /// Every listed condition is met
    pub fn matches(&self, analysis: &Analysis) -> bool {
        self.conditions
            .iter()
            .all(|(condition, threshold)| condition.is_satisfied(*threshold, analysis))
    }
}

static CATALOG: Lazy<Vec<CommentaryTemplate>> = Lazy::new(|| {
    use CommentaryStyle::*;
    use Condition::*;

    vec![
        CommentaryTemplate::new(
            "{team} {action} as they {momentum_description}",
            Neutral,
            1,
        )
        .when(Momentum, 0.7),
        CommentaryTemplate::new(
            "{team} {action} with the clock winding down, and they {momentum_description}",
            Neutral,
            2,
        )
        .when(Momentum, 0.55)
        .when(Criticality, 0.6),
        CommentaryTemplate::new("{team} {action}. {key_stat}", Neutral, 1).when(Efficiency, 0.5),
        CommentaryTemplate::new(
            "What a {intensity} performance by {team}! {key_stat}",
            Excited,
            2,
        )
        .when(Performance, 0.8),
        CommentaryTemplate::new(
            "Listen to this crowd! {team} {momentum_description} and {action}!",
            Excited,
            1,
        )
        .when(Momentum, 0.65),
        CommentaryTemplate::new("This is {intensity} stuff from {team} in crunch time!", Excited, 3)
            .when(Criticality, 0.7)
            .when(Pressure, 0.5),
        CommentaryTemplate::new(
            "Looking at the numbers, {team}'s {stat_type} shows {analysis}",
            Analytical,
            1,
        )
        .when(Efficiency, 0.6),
        CommentaryTemplate::new(
            "{team}'s {stat_type} shows {analysis}, and the pressure numbers suggest a {intensity} approach",
            Analytical,
            2,
        )
        .when(Efficiency, 0.5)
        .when(Pressure, 0.4),
        CommentaryTemplate::new(
            "Tactically, {team} {momentum_description}; their {stat_type} shows {analysis}",
            Analytical,
            1,
        )
        .when(Momentum, 0.6)
        .when(Efficiency, 0.4),
    ]
});

/// Built-in templates
pub fn catalog() -> &'static [CommentaryTemplate] {
    &CATALOG
}
