//! Game analysis
//!
//! Turns validated snapshots into key moments, momentum, team performance
//! and an overall read of the game situation.

pub mod analyzer;
pub mod models;

pub use analyzer::{
    calculate_criticality, event_importance, GameAnalyzer, MOMENTUM_SHIFT_THRESHOLD,
    MOMENTUM_THRESHOLD,
};
pub use models::{
    Analysis, GameMoment, GamePhase, GameSituation, Momentum, PerformanceMetrics, Scoreboard,
    TeamPerformance,
};
