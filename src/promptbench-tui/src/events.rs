//! Bridge between background tasks and the UI event loop.
//!
//! The engine never calls into rendering code. Generation runs in a spawned
//! task that forwards per-fragment updates and the terminal outcome over an
//! unbounded channel; the event loop drains that channel between repaints.

use tokio::sync::mpsc::UnboundedSender;
use tokio_util::sync::CancellationToken;

use promptbench_engine::{
    EngineError, GenerationRequest, GenerationSession, SessionMetrics, SessionOutcome,
};
use promptbench_ollama::{ModelSummary, OllamaClient, OllamaError};

/// Events consumed by the UI event loop.
#[derive(Debug)]
pub enum UiEvent {
    Session(SessionEvent),
    ModelsLoaded(Result<Vec<ModelSummary>, OllamaError>),
}

/// Events emitted by a running generation session.
#[derive(Debug)]
pub enum SessionEvent {
    /// One text fragment arrived.
    Update {
        delta: String,
        metrics: SessionMetrics,
    },
    /// The session reached a terminal state.
    Finished(Box<SessionOutcome>),
}

/// Validate the request and start a generation in the background.
///
/// Returns the cancellation token for the new session. Validation failures
/// are returned synchronously; nothing is spawned and no event is sent.
pub fn spawn_generation(
    client: OllamaClient,
    request: GenerationRequest,
    tx: UnboundedSender<UiEvent>,
) -> Result<CancellationToken, EngineError> {
    let session = GenerationSession::new(request)?;
    let token = session.cancellation_token();

    tokio::spawn(async move {
        let update_tx = tx.clone();
        let outcome = session
            .run(&client, move |update| {
                let _ = update_tx.send(UiEvent::Session(SessionEvent::Update {
                    delta: update.delta.to_string(),
                    metrics: update.metrics,
                }));
            })
            .await;
        let _ = tx.send(UiEvent::Session(SessionEvent::Finished(Box::new(outcome))));
    });

    Ok(token)
}

/// Fetch the model list in the background.
pub fn spawn_model_refresh(client: OllamaClient, tx: UnboundedSender<UiEvent>) {
    tokio::spawn(async move {
        let result = client.list_models().await;
        let _ = tx.send(UiEvent::ModelsLoaded(result));
    });
}
