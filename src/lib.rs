//! Live sports commentary
//!
//! Polls a game statistics feed, analyzes each snapshot for key moments,
//! momentum and performance, renders commentary from a template bank
//! (optionally rephrased by a language model) and synthesizes it to speech.

pub mod analysis;
pub mod commentary;
pub mod config;
pub mod error;
pub mod llm;
pub mod logging;
pub mod metrics;
pub mod pipeline;
pub mod speech;
pub mod stats;

pub use analysis::{Analysis, GameAnalyzer};
pub use commentary::{Commentary, CommentaryGenerator, CommentaryStyle};
pub use config::Config;
pub use error::{Error, Result};
pub use pipeline::{Collaborators, NarrationPipeline, Supervisor};
pub use stats::{validate_snapshot, StatsSnapshot};
