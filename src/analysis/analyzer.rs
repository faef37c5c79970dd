//! Game state analysis: key moments, momentum, performance and situation

use super::models::{
    Analysis, GameMoment, GamePhase, GameSituation, Momentum, PerformanceMetrics, Scoreboard,
    TeamPerformance,
};
use crate::error::AnalysisError;
use crate::metrics::METRICS;
use crate::stats::models::{GameEvent, Side, StatsSnapshot};
use crate::stats::validator::parse_clock;
use tracing::debug;

/// Minimum importance for an event to become a key moment
pub const MOMENTUM_THRESHOLD: f64 = 0.6;

/// Importance above which a moment counts as a momentum shift
pub const MOMENTUM_SHIFT_THRESHOLD: f64 = 0.7;

const SCORING_SWING: f64 = 0.1;
const POSSESSION_BONUS: f64 = 0.05;

/// Stateful analyzer for a single game
///
/// Remembers the previous snapshot only; one instance per narrated game.
#[derive(Debug, Default)]
pub struct GameAnalyzer {
    previous: Option<StatsSnapshot>,
}

impl GameAnalyzer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot committed by the last successful analysis
    pub fn previous(&self) -> Option<&StatsSnapshot> {
        self.previous.as_ref()
    }

    /// Analyze a validated snapshot
    ///
    /// On error the previous snapshot is left untouched.
    pub fn analyze(&mut self, current: &StatsSnapshot) -> Result<Analysis, AnalysisError> {
        let key_moments = identify_key_moments(&current.recent_events)?;
        let momentum = self.calculate_momentum(current);
        let performance = analyze_performance(current)?;
        let situation = assess_game_situation(current)?;

        METRICS.key_moments.observe(key_moments.len() as f64);
        debug!(
            game_id = %current.game_id,
            moments = key_moments.len(),
            home_momentum = momentum.home,
            away_momentum = momentum.away,
            criticality = situation.criticality,
            "Analyzed snapshot"
        );

        self.previous = Some(current.clone());

        Ok(Analysis {
            scoreboard: Scoreboard {
                home_team: current.home_team.clone(),
                away_team: current.away_team.clone(),
                home_score: current.home_score,
                away_score: current.away_score,
                game_time: current.game_time.clone(),
            },
            key_moments,
            momentum: Some(momentum),
            performance_metrics: Some(performance),
            game_situation: Some(situation),
        })
    }

    fn calculate_momentum(&self, stats: &StatsSnapshot) -> Momentum {
        if self.previous.is_none() {
            return Momentum::EVEN;
        }

        let mut home = 0.5;
        let mut away = 0.5;

        for play in &stats.recent_scores {
            if play.team == stats.home_team {
                home += SCORING_SWING;
                away -= SCORING_SWING;
            } else {
                away += SCORING_SWING;
                home -= SCORING_SWING;
            }
        }

        if let Some(possession) = &stats.possession {
            if *possession == stats.home_team {
                home += POSSESSION_BONUS;
            } else {
                away += POSSESSION_BONUS;
            }
        }

        // A long scoring run can push one side below zero
        let home = f64::max(home, 0.0);
        let away = f64::max(away, 0.0);
        let total = home + away;

        Momentum {
            home: round_to(home / total, 2),
            away: round_to(away / total, 2),
        }
    }
}

/// Importance of a single event in [0, 1]
pub fn event_importance(event: &GameEvent) -> f64 {
    let mut importance = event.event_type.base_weight();

    if let Some(time_remaining) = event.time_remaining {
        let time_factor = f64::min(1.0, 1.5 - time_remaining / 3600.0);
        importance *= 1.0 + time_factor;
    }

    importance.clamp(0.0, 1.0)
}

fn identify_key_moments(events: &[GameEvent]) -> Result<Vec<GameMoment>, AnalysisError> {
    let mut moments = Vec::new();

    for event in events {
        if event.time_remaining.is_some_and(|t| !t.is_finite()) {
            return Err(AnalysisError::NonFinite {
                field: "time_remaining",
            });
        }

        let importance = event_importance(event);
        if importance >= MOMENTUM_THRESHOLD {
            moments.push(GameMoment {
                timestamp: event.timestamp.clone(),
                event_type: event.event_type.clone(),
                importance,
                description: event.description.clone(),
                teams_involved: event.teams.clone(),
                score_change: event.event_type.is_score_related(),
                momentum_shift: importance > MOMENTUM_SHIFT_THRESHOLD,
            });
        }
    }

    // Stable: equal scores keep feed order
    moments.sort_by(|a, b| b.importance.total_cmp(&a.importance));
    Ok(moments)
}

fn analyze_performance(stats: &StatsSnapshot) -> Result<PerformanceMetrics, AnalysisError> {
    Ok(PerformanceMetrics {
        home: team_performance(stats, Side::Home)?,
        away: team_performance(stats, Side::Away)?,
    })
}

fn team_performance(stats: &StatsSnapshot, side: Side) -> Result<TeamPerformance, AnalysisError> {
    let counters = stats.counters(side);

    let attempts = finite(counters.attempts, "attempts")?
        .filter(|a| *a > 0.0)
        .unwrap_or(1.0);
    let successes = finite(counters.successes, "successes")?.unwrap_or(0.0);
    let pressure = finite(counters.pressure, "pressure")?.unwrap_or(0.0);
    let defense = finite(counters.defense, "defense")?.unwrap_or(0.0);

    Ok(TeamPerformance {
        efficiency: round_to(successes / attempts, 3).clamp(0.0, 1.0),
        pressure: (pressure / 100.0).clamp(0.0, 1.0),
        defense: (defense / 100.0).clamp(0.0, 1.0),
    })
}

fn finite(value: Option<f64>, field: &'static str) -> Result<Option<f64>, AnalysisError> {
    match value {
        Some(v) if !v.is_finite() => Err(AnalysisError::NonFinite { field }),
        other => Ok(other),
    }
}

fn assess_game_situation(stats: &StatsSnapshot) -> Result<GameSituation, AnalysisError> {
    let time_remaining = parse_time_remaining(&stats.game_time)?;
    let score_difference = stats.home_score.abs_diff(stats.away_score);

    Ok(GameSituation {
        time_remaining_secs: time_remaining,
        score_difference,
        criticality: calculate_criticality(time_remaining, score_difference),
        phase: GamePhase::from_time_remaining(time_remaining),
        context: situation_context(stats),
    })
}

/// Convert a `MM:SS` clock to seconds remaining
pub fn parse_time_remaining(clock: &str) -> Result<u32, AnalysisError> {
    let (minutes, seconds) =
        parse_clock(clock).ok_or_else(|| AnalysisError::InvalidClock(clock.to_string()))?;
    minutes
        .checked_mul(60)
        .and_then(|m| m.checked_add(seconds))
        .ok_or_else(|| AnalysisError::InvalidClock(clock.to_string()))
}

/// Criticality in [0, 1]: 60% from elapsed time within the final hour, 40% from score closeness
pub fn calculate_criticality(time_remaining: u32, score_difference: u32) -> f64 {
    let time_factor = 1.0 - f64::from(time_remaining.min(3600)) / 3600.0;
    let closeness = f64::max(0.0, 1.0 - f64::from(score_difference) / 10.0);
    round_to(0.6 * time_factor + 0.4 * closeness, 3)
}

fn situation_context(stats: &StatsSnapshot) -> String {
    let (home, away) = (&stats.home_team, &stats.away_team);
    let (hs, aws) = (stats.home_score, stats.away_score);

    let standing = if hs == aws {
        format!("{} and {} are tied {}-{}", home, away, hs, aws)
    } else if hs > aws {
        format!("{} lead {} {}-{}", home, away, hs, aws)
    } else {
        format!("{} lead {} {}-{}", away, home, aws, hs)
    };

    format!("{} with {} left in {}", standing, stats.game_time, stats.period)
}

/// Round to `decimals` places, exact halves going to the even neighbour
fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round_ties_even() / factor
}
