//! Commentary text generation
//!
//! Templates are gated by analysis metrics and picked with a weighted random
//! draw; a short history keeps recent patterns from repeating.

pub mod generator;
pub mod history;
pub mod style;
pub mod templates;

pub use generator::{fallback_text, Commentary, CommentaryGenerator, CommentarySource};
pub use history::TemplateHistory;
pub use style::{CommentaryStyle, UnknownStyle};
pub use templates::{catalog, CommentaryTemplate, Condition};
