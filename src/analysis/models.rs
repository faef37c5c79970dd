//! Data models produced by the game analyzer

use crate::stats::models::{EventType, Side};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A scored highlight derived from one recent event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameMoment {
    pub timestamp: String,
    pub event_type: EventType,
    /// 0.0 to 1.0
    pub importance: f64,
    pub description: String,
    pub teams_involved: Vec<String>,
    pub score_change: bool,
    pub momentum_shift: bool,
}

/// Normalized two-way momentum; values are non-negative and sum to 1
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Momentum {
    pub home: f64,
    pub away: f64,
}

impl Momentum {
    pub const EVEN: Momentum = Momentum { home: 0.5, away: 0.5 };

    /// Side holding the edge; home on ties
    pub fn leader(&self) -> Side {
        if self.away > self.home {
            Side::Away
        } else {
            Side::Home
        }
    }

    pub fn max(&self) -> f64 {
        self.home.max(self.away)
    }
}

/// Per-team ratings, each in [0, 1]
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TeamPerformance {
    pub efficiency: f64,
    pub pressure: f64,
    pub defense: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    pub home: TeamPerformance,
    pub away: TeamPerformance,
}

impl PerformanceMetrics {
    pub fn get(&self, side: Side) -> &TeamPerformance {
        match side {
            Side::Home => &self.home,
            Side::Away => &self.away,
        }
    }

    pub fn max_efficiency(&self) -> f64 {
        self.home.efficiency.max(self.away.efficiency)
    }

    pub fn max_pressure(&self) -> f64 {
        self.home.pressure.max(self.away.pressure)
    }

    /// Side with the better efficiency; home on ties
    pub fn most_efficient(&self) -> Side {
        if self.away.efficiency > self.home.efficiency {
            Side::Away
        } else {
            Side::Home
        }
    }
}

/// Coarse stage of the game keyed off time remaining
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GamePhase {
    Early,
    Mid,
    Late,
    Clutch,
}

impl GamePhase {
    pub fn from_time_remaining(seconds: u32) -> Self {
        match seconds {
            0..=120 => GamePhase::Clutch,
            121..=600 => GamePhase::Late,
            601..=1800 => GamePhase::Mid,
            _ => GamePhase::Early,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            GamePhase::Early => "early",
            GamePhase::Mid => "mid",
            GamePhase::Late => "late",
            GamePhase::Clutch => "clutch",
        }
    }
}

impl fmt::Display for GamePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameSituation {
    pub time_remaining_secs: u32,
    pub score_difference: u32,
    /// 0.0 to 1.0, rising as the clock runs down and the score tightens
    pub criticality: f64,
    pub phase: GamePhase,
    pub context: String,
}

/// Teams and score carried alongside the analysis for rendering
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Scoreboard {
    pub home_team: String,
    pub away_team: String,
    pub home_score: u32,
    pub away_score: u32,
    pub game_time: String,
}

impl Scoreboard {
    /// Side ahead on the scoreboard; home on ties
    pub fn leading_side(&self) -> Side {
        if self.away_score > self.home_score {
            Side::Away
        } else {
            Side::Home
        }
    }

    pub fn team_name(&self, side: Side) -> &str {
        match side {
            Side::Home if self.home_team.is_empty() => "Home team",
            Side::Home => &self.home_team,
            Side::Away if self.away_team.is_empty() => "Away team",
            Side::Away => &self.away_team,
        }
    }

    pub fn leading_team(&self) -> &str {
        self.team_name(self.leading_side())
    }

    pub fn is_tied(&self) -> bool {
        self.home_score == self.away_score
    }

    pub fn score_difference(&self) -> u32 {
        self.home_score.abs_diff(self.away_score)
    }
}

/// Output of one analysis pass
///
/// Optional sections are always filled by the analyzer; they are optional so
/// that partial analyses (e.g. built by hand) still render.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Analysis {
    pub scoreboard: Scoreboard,
    /// Sorted by descending importance
    pub key_moments: Vec<GameMoment>,
    pub momentum: Option<Momentum>,
    pub performance_metrics: Option<PerformanceMetrics>,
    pub game_situation: Option<GameSituation>,
}

impl Analysis {
    pub fn top_moment(&self) -> Option<&GameMoment> {
        self.key_moments.first()
    }
}
