//! Error types for the generation engine.

use thiserror::Error;

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;

/// Errors that terminate (or prevent) a generation session.
///
/// Cancellation is deliberately absent: a cancelled session ends in the
/// `Aborted` state with its partial output intact, which is a result, not a
/// failure.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The request was malformed; surfaced synchronously, before any network
    /// activity.
    #[error("invalid request: {0}")]
    Validation(String),

    /// The server or the connection failed. Carries the status code or the
    /// underlying cause. Never retried automatically.
    #[error(transparent)]
    Transport(#[from] promptbench_ollama::OllamaError),
}

impl EngineError {
    /// HTTP status attached to a transport failure, when known.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Transport(e) => e.status(),
            Self::Validation(_) => None,
        }
    }
}
