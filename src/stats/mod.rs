//! Game statistics feed: models, validation and the HTTP client

pub mod client;
pub mod models;
pub mod validator;

pub use client::{GameStatsClient, StatsFeed, StatsFeedExt};
pub use models::{
    EventType, GameEvent, LiveGame, Period, Play, ScoringPlay, Side, StatsSnapshot, TeamCounters,
};
pub use validator::validate_snapshot;
