//! Commentary tone

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Tone of a commentary line; drives both template and voice selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommentaryStyle {
    Excited,
    Neutral,
    Analytical,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown commentary style `{0}` (expected excited, neutral or analytical)")]
pub struct UnknownStyle(pub String);

impl CommentaryStyle {
    pub const ALL: [CommentaryStyle; 3] = [
        CommentaryStyle::Excited,
        CommentaryStyle::Neutral,
        CommentaryStyle::Analytical,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CommentaryStyle::Excited => "excited",
            CommentaryStyle::Neutral => "neutral",
            CommentaryStyle::Analytical => "analytical",
        }
    }

    /// Closing instruction line for language model prompts
    pub fn prompt_instruction(&self) -> &'static str {
        match self {
            CommentaryStyle::Excited => {
                "Provide energetic and enthusiastic commentary about this moment"
            }
            CommentaryStyle::Neutral => {
                "Provide balanced and objective commentary about the current situation"
            }
            CommentaryStyle::Analytical => {
                "Analyze the strategic implications of the current game situation"
            }
        }
    }
}

impl fmt::Display for CommentaryStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CommentaryStyle {
    type Err = UnknownStyle;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "excited" => Ok(CommentaryStyle::Excited),
            "neutral" => Ok(CommentaryStyle::Neutral),
            "analytical" => Ok(CommentaryStyle::Analytical),
            _ => Err(UnknownStyle(s.to_string())),
        }
    }
}
