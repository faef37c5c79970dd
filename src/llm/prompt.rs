//! Prompt construction for commentary rephrasing

use crate::commentary::CommentaryStyle;
use crate::stats::models::StatsSnapshot;

pub const SYSTEM_PROMPT: &str =
    "You are an experienced sports commentator known for engaging and accurate commentary.";

/// At most this many plays are quoted in a prompt
pub const MAX_RECENT_PLAYS: usize = 3;

/// Structured prompt built from the game situation and recent plays
#[derive(Debug, Clone, PartialEq)]
pub struct CommentaryPrompt {
    pub situation: String,
    pub recent_plays: Vec<String>,
    /// Template commentary the model should improve on
    pub draft: Option<String>,
    pub style: CommentaryStyle,
}

impl CommentaryPrompt {
    pub fn new<I>(snapshot: &StatsSnapshot, recent_plays: I, style: CommentaryStyle) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        let situation = format!(
            "Game situation: {} remaining, Score: {} {} - {} {}",
            snapshot.game_time,
            snapshot.home_team,
            snapshot.home_score,
            snapshot.away_team,
            snapshot.away_score
        );

        Self {
            situation,
            recent_plays: recent_plays
                .into_iter()
                .filter(|p| !p.trim().is_empty())
                .take(MAX_RECENT_PLAYS)
                .collect(),
            draft: None,
            style,
        }
    }

    pub fn with_draft(mut self, draft: impl Into<String>) -> Self {
        self.draft = Some(draft.into());
        self
    }

    pub fn system_message(&self) -> &'static str {
        SYSTEM_PROMPT
    }

    pub fn user_message(&self) -> String {
        let mut message = format!(
            "{}\nRecent plays: {}\n",
            self.situation,
            self.recent_plays.join(" ")
        );
        if let Some(draft) = &self.draft {
            message.push_str(&format!("Draft: {}\n", draft));
        }
        message.push('\n');
        message.push_str(self.style.prompt_instruction());
        message
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot() -> StatsSnapshot {
        serde_json::from_value(serde_json::json!({
            "game_id": "g-1",
            "timestamp": "2026-10-18 19:30:00",
            "home_team": "Hawks",
            "away_team": "Owls",
            "home_score": 21,
            "away_score": 14,
            "period": 4,
            "game_time": "04:30"
        }))
        .unwrap()
    }

    #[test]
    fn test_user_message_layout() {
        let plays = ["Touchdown Hawks", "Extra point good", "Kickoff", "Fumble"]
            .iter()
            .map(|s| s.to_string());
        let prompt = CommentaryPrompt::new(&snapshot(), plays, CommentaryStyle::Excited)
            .with_draft("Hawks hold the lead");

        assert_eq!(prompt.recent_plays.len(), 3);
        assert_eq!(
            prompt.user_message(),
            "Game situation: 04:30 remaining, Score: Hawks 21 - Owls 14\n\
             Recent plays: Touchdown Hawks Extra point good Kickoff\n\
             Draft: Hawks hold the lead\n\n\
             Provide energetic and enthusiastic commentary about this moment"
        );
    }

    #[test]
    fn test_prompt_without_plays() {
        let prompt = CommentaryPrompt::new(&snapshot(), Vec::new(), CommentaryStyle::Analytical);
        let message = prompt.user_message();

        assert!(message.contains("Recent plays: \n"));
        assert!(message.ends_with("Analyze the strategic implications of the current game situation"));
    }
}
