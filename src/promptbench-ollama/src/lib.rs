//! Ollama client for Promptbench
//!
//! This crate talks to a locally-hosted Ollama server: listing installed
//! models and driving streaming text generation. Generation responses arrive
//! as a chunked body of newline-delimited JSON; the [`ndjson`] module handles
//! reassembling records across arbitrary chunk boundaries.

pub mod client;
pub mod models;
pub mod ndjson;

pub use client::{GenerateStream, OllamaClient};
pub use models::{GenerateChunk, GenerateOptions, GenerateRequest, ModelSummary, format_size};
pub use ndjson::NdjsonDecoder;

/// Default Ollama server URL.
pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";

/// Error types for Ollama operations.
#[derive(Debug, thiserror::Error)]
pub enum OllamaError {
    #[error(
        "Ollama is not responding. Check that `ollama serve` is running and the server URL is correct."
    )]
    Connection,

    #[error("server returned {status}: {message}")]
    Server { status: u16, message: String },

    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("response stream interrupted: {0}")]
    Stream(String),
}

impl OllamaError {
    /// HTTP status carried by this error, when there is one.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Server { status, .. } => Some(*status),
            Self::Request(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

/// Result type for Ollama operations.
pub type Result<T> = std::result::Result<T, OllamaError>;
