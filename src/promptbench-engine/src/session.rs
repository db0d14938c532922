//! The generation session state machine.
//!
//! One [`GenerationSession`] owns one request/response cycle:
//!
//! ```text
//! Idle -> Requesting -> Streaming -> Completed | Aborted | Failed
//! ```
//!
//! While streaming, every fragment that carries text appends to the
//! accumulated output, bumps the unit counter, and invokes the caller's
//! update observer synchronously, never batched, so the UI can repaint per
//! fragment. Cancellation is cooperative: the token is checked ahead of every
//! chunk read, and an aborted session keeps exactly the output it had.

use std::pin::pin;
use std::time::Instant;

use futures::{Stream, StreamExt};
use tokio_util::sync::CancellationToken;

use promptbench_ollama::{GenerateChunk, OllamaClient};

use crate::error::{EngineError, Result};
use crate::metrics::SessionMetrics;
use crate::request::GenerationRequest;

/// Session lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Requesting,
    Streaming,
    Completed,
    Aborted,
    Failed,
}

impl SessionState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Aborted | Self::Failed)
    }
}

/// Per-fragment update handed to the observer.
#[derive(Debug, Clone, Copy)]
pub struct SessionUpdate<'a> {
    /// Text carried by this fragment.
    pub delta: &'a str,
    /// Running metrics after applying the fragment.
    pub metrics: SessionMetrics,
}

/// Terminal result of a session.
///
/// Aborted and failed sessions still carry whatever text and metrics they
/// accumulated; partial output is a valid result.
#[derive(Debug)]
pub struct SessionOutcome {
    pub state: SessionState,
    pub text: String,
    pub metrics: SessionMetrics,
    pub error: Option<EngineError>,
}

impl SessionOutcome {
    pub fn is_completed(&self) -> bool {
        self.state == SessionState::Completed
    }

    /// Whether this outcome is worth persisting to history: it finished (or
    /// was deliberately stopped) with some output.
    pub fn has_output(&self) -> bool {
        !self.text.is_empty()
    }
}

/// One streamed generation, from request to terminal state.
#[derive(Debug)]
pub struct GenerationSession {
    request: GenerationRequest,
    state: SessionState,
    text: String,
    unit_count: u64,
    started_at: Option<Instant>,
    first_unit_at: Option<Instant>,
    cancel: CancellationToken,
}

impl GenerationSession {
    /// Validate the request and create an idle session.
    ///
    /// Fails fast with a validation error; no network activity happens here.
    pub fn new(request: GenerationRequest) -> Result<Self> {
        request.validate()?;
        Ok(Self {
            request,
            state: SessionState::Idle,
            text: String::new(),
            unit_count: 0,
            started_at: None,
            first_unit_at: None,
            cancel: CancellationToken::new(),
        })
    }

    pub fn request(&self) -> &GenerationRequest {
        &self.request
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Token for cancelling this session from another task.
    ///
    /// Cancelling is idempotent and is observed at the next chunk read; a
    /// session that already reached a terminal state is unaffected.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Issue the request and drive the stream to a terminal state.
    ///
    /// `on_update` is invoked synchronously for every text-carrying fragment,
    /// in arrival order.
    pub async fn run<F>(mut self, client: &OllamaClient, on_update: F) -> SessionOutcome
    where
        F: FnMut(SessionUpdate<'_>),
    {
        self.state = SessionState::Requesting;
        self.started_at = Some(Instant::now());
        let wire = self.request.to_wire();

        tracing::info!(model = %self.request.model_id, "starting generation");

        let stream = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => {
                tracing::info!("generation cancelled before the request completed");
                return self.finish(SessionState::Aborted, None);
            }
            result = client.generate(&wire) => match result {
                Ok(stream) => stream,
                Err(e) => return self.finish(SessionState::Failed, Some(e.into())),
            },
        };

        self.drive(stream, on_update).await
    }

    /// Drive an already-open record stream to a terminal state.
    pub async fn drive<S, F>(mut self, stream: S, mut on_update: F) -> SessionOutcome
    where
        S: Stream<Item = promptbench_ollama::Result<GenerateChunk>>,
        F: FnMut(SessionUpdate<'_>),
    {
        if self.started_at.is_none() {
            self.started_at = Some(Instant::now());
        }
        self.state = SessionState::Streaming;
        let mut stream = pin!(stream);

        loop {
            let next = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    tracing::info!(units = self.unit_count, "generation cancelled mid-stream");
                    return self.finish(SessionState::Aborted, None);
                }
                next = stream.next() => next,
            };

            match next {
                // Server closed the body; treat like a completed run.
                None => return self.finish(SessionState::Completed, None),
                Some(Err(e)) => {
                    return self.finish(SessionState::Failed, Some(e.into()));
                }
                Some(Ok(chunk)) => {
                    if let Some(delta) = chunk.text() {
                        if self.first_unit_at.is_none() {
                            self.first_unit_at = Some(Instant::now());
                        }
                        self.text.push_str(delta);
                        self.unit_count += 1;
                        let metrics = self.metrics();
                        on_update(SessionUpdate { delta, metrics });
                    }
                    if chunk.done {
                        // Anything the server sends after this is ignored.
                        return self.finish(SessionState::Completed, None);
                    }
                }
            }
        }
    }

    fn metrics(&self) -> SessionMetrics {
        let elapsed_ms = self
            .started_at
            .map(|t| t.elapsed().as_millis() as u64)
            .unwrap_or(0);
        let first_unit_ms = match (self.started_at, self.first_unit_at) {
            (Some(start), Some(first)) => Some(first.duration_since(start).as_millis() as u64),
            _ => None,
        };
        SessionMetrics::snapshot(elapsed_ms, self.unit_count, first_unit_ms)
    }

    fn finish(mut self, state: SessionState, error: Option<EngineError>) -> SessionOutcome {
        self.state = state;
        let metrics = self.metrics();
        tracing::debug!(
            ?state,
            units = metrics.unit_count,
            elapsed_ms = metrics.elapsed_ms,
            "session finished"
        );
        SessionOutcome {
            state,
            text: self.text,
            metrics,
            error,
        }
    }
}
