//! Structural validation of raw stats payloads
//!
//! A payload has to pass here before it reaches the analyzer. Checks run in a
//! fixed order and the first failure wins:
//! 1. required fields present with the right JSON type
//! 2. timestamp format `YYYY-MM-DD HH:MM:SS`
//! 3. non-negative whole-number scores
//! 4. game clock `MM:SS` with seconds below 60
//! 5. optional counters, possession, events and scoring plays, named by
//!    their path (e.g. `recent_events[2].time_remaining`)

use super::models::StatsSnapshot;
use crate::error::ValidationError;
use chrono::NaiveDateTime;
use serde_json::{Map, Value};
use tracing::warn;

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, Copy)]
enum Expected {
    String,
    Number,
    NumberOrString,
}

impl Expected {
    fn matches(&self, value: &Value) -> bool {
        match self {
            Expected::String => value.is_string(),
            Expected::Number => value.is_number(),
            Expected::NumberOrString => value.is_number() || value.is_string(),
        }
    }

    fn describe(&self) -> &'static str {
        match self {
            Expected::String => "string",
            Expected::Number => "number",
            Expected::NumberOrString => "number or string",
        }
    }
}

const REQUIRED_FIELDS: [(&str, Expected); 8] = [
    ("game_id", Expected::String),
    ("timestamp", Expected::String),
    ("home_team", Expected::String),
    ("away_team", Expected::String),
    ("home_score", Expected::Number),
    ("away_score", Expected::Number),
    ("period", Expected::NumberOrString),
    ("game_time", Expected::String),
];

const COUNTER_FIELDS: [&str; 8] = [
    "home_attempts",
    "home_successes",
    "home_pressure",
    "home_defense",
    "away_attempts",
    "away_successes",
    "away_pressure",
    "away_defense",
];

/// Validate a raw payload and convert it into a typed snapshot
pub fn validate_snapshot(payload: &Value) -> Result<StatsSnapshot, ValidationError> {
    let result = check_snapshot(payload);
    if let Err(ref e) = result {
        warn!(field = %e.field, "Game data validation failed: {}", e.reason);
    }
    result
}

fn check_snapshot(payload: &Value) -> Result<StatsSnapshot, ValidationError> {
    let object = payload
        .as_object()
        .ok_or_else(|| ValidationError::new("payload", "expected a JSON object"))?;

    for (field, expected) in REQUIRED_FIELDS {
        let value = object
            .get(field)
            .ok_or_else(|| ValidationError::new(field, "missing required field"))?;

        if !expected.matches(value) {
            return Err(ValidationError::new(
                field,
                format!("expected {}, got {}", expected.describe(), json_type(value)),
            ));
        }
    }

    let timestamp = str_field(object, "timestamp");
    if NaiveDateTime::parse_from_str(timestamp, TIMESTAMP_FORMAT).is_err() {
        return Err(ValidationError::new(
            "timestamp",
            "invalid format, expected YYYY-MM-DD HH:MM:SS",
        ));
    }

    let home_score = whole_score(object, "home_score")?;
    let away_score = whole_score(object, "away_score")?;

    let game_time = str_field(object, "game_time");
    if !game_time.contains(':') {
        return Err(ValidationError::new(
            "game_time",
            "invalid format, expected MM:SS",
        ));
    }
    match parse_clock(game_time) {
        Some((_, seconds)) if seconds >= 60 => {
            return Err(ValidationError::new(
                "game_time",
                "seconds must be less than 60",
            ));
        }
        Some(_) => {}
        None => {
            return Err(ValidationError::new(
                "game_time",
                "minutes and seconds must be valid numbers",
            ));
        }
    }

    let mut normalized = object.clone();
    normalized.insert("home_score".to_string(), Value::from(home_score));
    normalized.insert("away_score".to_string(), Value::from(away_score));
    normalize_period(&mut normalized)?;
    normalize_optional(&mut normalized)?;

    serde_json::from_value(Value::Object(normalized))
        .map_err(|e| ValidationError::new("payload", e.to_string()))
}

/// Check the optional sections, dropping nulls so they read as absent
fn normalize_optional(object: &mut Map<String, Value>) -> Result<(), ValidationError> {
    object.retain(|_, value| !value.is_null());

    for field in COUNTER_FIELDS {
        if let Some(value) = object.get(field) {
            if !value.is_number() {
                return Err(ValidationError::new(
                    field,
                    format!("expected number, got {}", json_type(value)),
                ));
            }
        }
    }

    if let Some(value) = object.get("possession") {
        if !value.is_string() {
            return Err(ValidationError::new(
                "possession",
                format!("expected string, got {}", json_type(value)),
            ));
        }
    }

    if let Some(events) = object.get_mut("recent_events") {
        let events = events.as_array_mut().ok_or_else(|| {
            ValidationError::new("recent_events", "expected array of events")
        })?;
        for (index, event) in events.iter_mut().enumerate() {
            normalize_event(event, index)?;
        }
    }

    if let Some(scores) = object.get_mut("recent_scores") {
        let scores = scores.as_array_mut().ok_or_else(|| {
            ValidationError::new("recent_scores", "expected array of scoring plays")
        })?;
        for (index, play) in scores.iter_mut().enumerate() {
            normalize_scoring_play(play, index)?;
        }
    }

    Ok(())
}

fn normalize_event(event: &mut Value, index: usize) -> Result<(), ValidationError> {
    let path = |key: &str| format!("recent_events[{}].{}", index, key);
    let event = event
        .as_object_mut()
        .ok_or_else(|| ValidationError::new(format!("recent_events[{}]", index), "expected object"))?;
    event.retain(|_, value| !value.is_null());

    match event.get("type") {
        Some(Value::String(_)) => {}
        Some(other) => {
            return Err(ValidationError::new(
                path("type"),
                format!("expected string, got {}", json_type(other)),
            ))
        }
        None => return Err(ValidationError::new(path("type"), "missing required field")),
    }

    for key in ["description", "timestamp"] {
        if let Some(value) = event.get(key) {
            if !value.is_string() {
                return Err(ValidationError::new(
                    path(key),
                    format!("expected string, got {}", json_type(value)),
                ));
            }
        }
    }

    if let Some(teams) = event.get("teams") {
        let all_strings = teams
            .as_array()
            .is_some_and(|teams| teams.iter().all(Value::is_string));
        if !all_strings {
            return Err(ValidationError::new(path("teams"), "expected array of team names"));
        }
    }

    // Feeds send seconds either as a number or as a numeric string
    if let Some(value) = event.get("time_remaining") {
        let seconds = match value {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        }
        .filter(|seconds| seconds.is_finite())
        .ok_or_else(|| ValidationError::new(path("time_remaining"), "expected seconds as a number"))?;
        event.insert("time_remaining".to_string(), Value::from(seconds));
    }

    Ok(())
}

fn normalize_scoring_play(play: &mut Value, index: usize) -> Result<(), ValidationError> {
    let path = |key: &str| format!("recent_scores[{}].{}", index, key);
    let play = play
        .as_object_mut()
        .ok_or_else(|| ValidationError::new(format!("recent_scores[{}]", index), "expected object"))?;
    play.retain(|_, value| !value.is_null());

    if !play.get("team").is_some_and(Value::is_string) {
        return Err(ValidationError::new(path("team"), "expected team name"));
    }

    if let Some(points) = play.get("points") {
        let points = points
            .as_u64()
            .filter(|p| *p <= u32::MAX as u64)
            .ok_or_else(|| ValidationError::new(path("points"), "expected non-negative whole number"))?;
        play.insert("points".to_string(), Value::from(points));
    }

    if let Some(value) = play.get("description") {
        if !value.is_string() {
            return Err(ValidationError::new(
                path("description"),
                format!("expected string, got {}", json_type(value)),
            ));
        }
    }

    Ok(())
}

/// Split a `MM:SS` clock into its parts without range checks
pub(crate) fn parse_clock(clock: &str) -> Option<(u32, u32)> {
    let (minutes, seconds) = clock.split_once(':')?;
    let is_digits = |s: &str| !s.is_empty() && s.chars().all(|c| c.is_ascii_digit());
    if !is_digits(minutes) || !is_digits(seconds) {
        return None;
    }
    Some((minutes.parse().ok()?, seconds.parse().ok()?))
}

fn str_field<'a>(object: &'a Map<String, Value>, field: &str) -> &'a str {
    object.get(field).and_then(Value::as_str).unwrap_or_default()
}

fn whole_score(object: &Map<String, Value>, field: &'static str) -> Result<u32, ValidationError> {
    let value = object
        .get(field)
        .and_then(Value::as_f64)
        .ok_or_else(|| ValidationError::new(field, "expected number"))?;

    if value < 0.0 {
        return Err(ValidationError::new(field, "scores cannot be negative"));
    }
    if value.fract() != 0.0 || value > u32::MAX as f64 {
        return Err(ValidationError::new(field, "score must be a whole number"));
    }
    Ok(value as u32)
}

fn normalize_period(object: &mut Map<String, Value>) -> Result<(), ValidationError> {
    if let Some(Value::Number(n)) = object.get("period") {
        let period = n
            .as_u64()
            .filter(|p| *p <= u32::MAX as u64)
            .ok_or_else(|| ValidationError::new("period", "expected a whole number or string"))?;
        object.insert("period".to_string(), Value::from(period));
    }
    Ok(())
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
