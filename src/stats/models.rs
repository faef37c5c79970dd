//! Data models for the game statistics feed

use serde::{Deserialize, Serialize};
use std::fmt;

/// Which side of the scoreboard a team is on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Home,
    Away,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Home => "home",
            Side::Away => "away",
        }
    }
}

/// Period of play: either a number or a label such as "OT"
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Period {
    Number(u32),
    Label(String),
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Period::Number(n) => write!(f, "period {}", n),
            Period::Label(label) => f.write_str(label),
        }
    }
}

/// Type tag of a recent game event
///
/// Tags are matched case-insensitively; anything unrecognised is kept
/// verbatim in `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EventType {
    ScoreChange,
    PossessionChange,
    Timeout,
    Injury,
    Penalty,
    Other(String),
}

impl EventType {
    pub fn as_str(&self) -> &str {
        match self {
            EventType::ScoreChange => "score_change",
            EventType::PossessionChange => "possession_change",
            EventType::Timeout => "timeout",
            EventType::Injury => "injury",
            EventType::Penalty => "penalty",
            EventType::Other(raw) => raw,
        }
    }

    /// Base importance weight before time urgency is applied
    pub fn base_weight(&self) -> f64 {
        match self {
            EventType::ScoreChange => 0.8,
            EventType::PossessionChange => 0.4,
            EventType::Timeout => 0.5,
            EventType::Injury => 0.7,
            EventType::Penalty => 0.6,
            EventType::Other(_) => 0.3,
        }
    }

    /// True when the tag mentions a score, e.g. `score_change` or `field_goal_score`
    pub fn is_score_related(&self) -> bool {
        self.as_str().to_lowercase().contains("score")
    }
}

impl From<String> for EventType {
    fn from(raw: String) -> Self {
        match raw.to_lowercase().as_str() {
            "score_change" => EventType::ScoreChange,
            "possession_change" => EventType::PossessionChange,
            "timeout" => EventType::Timeout,
            "injury" => EventType::Injury,
            "penalty" => EventType::Penalty,
            _ => EventType::Other(raw),
        }
    }
}

impl From<&str> for EventType {
    fn from(raw: &str) -> Self {
        EventType::from(raw.to_string())
    }
}

impl From<EventType> for String {
    fn from(event_type: EventType) -> Self {
        event_type.as_str().to_string()
    }
}

/// Entry in a snapshot's recent-events list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameEvent {
    #[serde(rename = "type")]
    pub event_type: EventType,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub timestamp: String,
    #[serde(default)]
    pub teams: Vec<String>,
    /// Seconds left in the game when the event happened
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_remaining: Option<f64>,
}

/// Entry in a snapshot's recent-scores list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringPlay {
    pub team: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub points: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Per-team counters used for performance metrics
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TeamCounters {
    pub attempts: Option<f64>,
    pub successes: Option<f64>,
    pub pressure: Option<f64>,
    pub defense: Option<f64>,
}

/// One point-in-time read of a game
///
/// Only built from payloads that passed [`super::validator::validate_snapshot`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub game_id: String,
    /// `YYYY-MM-DD HH:MM:SS`
    pub timestamp: String,
    pub home_team: String,
    pub away_team: String,
    pub home_score: u32,
    pub away_score: u32,
    pub period: Period,
    /// Time remaining as `MM:SS`
    pub game_time: String,
    #[serde(default)]
    pub recent_events: Vec<GameEvent>,
    #[serde(default)]
    pub recent_scores: Vec<ScoringPlay>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub possession: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub home_attempts: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub home_successes: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub home_pressure: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub home_defense: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub away_attempts: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub away_successes: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub away_pressure: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub away_defense: Option<f64>,
}

impl StatsSnapshot {
    pub fn counters(&self, side: Side) -> TeamCounters {
        match side {
            Side::Home => TeamCounters {
                attempts: self.home_attempts,
                successes: self.home_successes,
                pressure: self.home_pressure,
                defense: self.home_defense,
            },
            Side::Away => TeamCounters {
                attempts: self.away_attempts,
                successes: self.away_successes,
                pressure: self.away_pressure,
                defense: self.away_defense,
            },
        }
    }
}

/// Summary entry from the live-games listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiveGame {
    #[serde(alias = "id")]
    pub game_id: String,
    #[serde(default)]
    pub home_team: String,
    #[serde(default)]
    pub away_team: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

/// Play-by-play entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Play {
    pub sequence: u64,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_type_is_case_insensitive() {
        assert_eq!(EventType::from("SCORE_CHANGE"), EventType::ScoreChange);
        assert_eq!(EventType::from("Timeout"), EventType::Timeout);
        assert_eq!(
            EventType::from("Field_Goal_Score"),
            EventType::Other("Field_Goal_Score".to_string())
        );
    }

    #[test]
    fn test_score_related_tags() {
        assert!(EventType::ScoreChange.is_score_related());
        assert!(EventType::from("Field_Goal_Score").is_score_related());
        assert!(!EventType::Injury.is_score_related());
        assert!(!EventType::from("scoring_drive").is_score_related());
    }

    #[test]
    fn test_event_deserializes_type_tag() {
        let event: GameEvent = serde_json::from_value(serde_json::json!({
            "type": "penalty",
            "description": "Holding",
            "timestamp": "2026-10-18 19:02:11",
            "teams": ["Hawks"],
            "time_remaining": 600
        }))
        .unwrap();

        assert_eq!(event.event_type, EventType::Penalty);
        assert_eq!(event.time_remaining, Some(600.0));
    }

    #[test]
    fn test_period_display() {
        assert_eq!(Period::Number(4).to_string(), "period 4");
        assert_eq!(Period::Label("OT".into()).to_string(), "OT");
    }
}
