//! Error types for the commentary service

use thiserror::Error;

/// Snapshot validation failure naming the first offending field
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid field `{field}`: {reason}")]
pub struct ValidationError {
    pub field: String,
    pub reason: String,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Failure talking to an external collaborator (stats feed, LLM, speech)
#[derive(Debug, Error)]
pub enum CollaboratorError {
    #[error("Collaborator is disabled")]
    Disabled,

    #[error("Network error: {0}")]
    Network(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Upstream error: status {status}: {body}")]
    Upstream { status: u16, body: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CollaboratorError {
    /// Whether another attempt could plausibly succeed
    pub fn is_transient(&self) -> bool {
        match self {
            CollaboratorError::Network(_) | CollaboratorError::Timeout(_) => true,
            CollaboratorError::Upstream { status, .. } => *status >= 500 || *status == 429,
            CollaboratorError::Disabled
            | CollaboratorError::InvalidResponse(_)
            | CollaboratorError::Io(_) => false,
        }
    }
}

impl From<reqwest::Error> for CollaboratorError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            CollaboratorError::Timeout(e.to_string())
        } else if e.is_decode() {
            CollaboratorError::InvalidResponse(e.to_string())
        } else {
            CollaboratorError::Network(e.to_string())
        }
    }
}

/// Failure computing an analysis from an already-validated snapshot
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AnalysisError {
    #[error("Invalid game clock: {0}")]
    InvalidClock(String),

    #[error("Non-finite value for {field}")]
    NonFinite { field: &'static str },
}

/// Template rendering failure, recovered inside the generator
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerationError {
    #[error("Unknown template slot: {0}")]
    UnknownSlot(String),

    #[error("Unterminated slot in pattern: {0}")]
    UnterminatedSlot(String),
}

/// Reason a narration cycle produced no segment
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("No snapshot available for game {0}")]
    NoSnapshot(String),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Collaborator(#[from] CollaboratorError),

    #[error(transparent)]
    Analysis(#[from] AnalysisError),
}

impl PipelineError {
    /// Metric label for the skipped cycle
    pub fn outcome(&self) -> &'static str {
        match self {
            PipelineError::NoSnapshot(_) => "no_snapshot",
            PipelineError::Validation(_) => "invalid_snapshot",
            PipelineError::Collaborator(_) => "collaborator_error",
            PipelineError::Analysis(_) => "analysis_error",
        }
    }
}

/// Crate-level error type
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Collaborator(#[from] CollaboratorError),

    #[error(transparent)]
    Analysis(#[from] AnalysisError),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<::config::ConfigError> for Error {
    fn from(e: ::config::ConfigError) -> Self {
        Error::Configuration(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
