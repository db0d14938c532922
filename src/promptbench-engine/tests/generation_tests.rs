//! End-to-end session tests against a mock Ollama server.

use std::time::Duration;

use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use promptbench_engine::{EngineError, GenerationRequest, GenerationSession, SessionState};
use promptbench_ollama::OllamaClient;

#[tokio::test]
async fn full_run_over_http_completes() {
    let server = MockServer::start().await;
    let body = concat!(
        "{\"response\":\"The\",\"done\":false}\n",
        "{\"response\":\" answer\",\"done\":false}\n",
        "{\"response\":\" is 42.\",\"done\":false}\n",
        "{\"done\":true}\n",
    );
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "application/x-ndjson"))
        .mount(&server)
        .await;

    let client = OllamaClient::new(server.uri());
    let request = GenerationRequest::new("llama3.2", "what is the answer?").with_temperature(0.2);
    let session = GenerationSession::new(request).unwrap();

    let mut updates = 0;
    let outcome = session.run(&client, |_| updates += 1).await;

    assert_eq!(outcome.state, SessionState::Completed);
    assert_eq!(outcome.text, "The answer is 42.");
    assert_eq!(outcome.metrics.unit_count, 3);
    assert_eq!(updates, 3);
    assert!(outcome.has_output());
}

#[tokio::test]
async fn http_error_fails_the_session_with_status() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(
            ResponseTemplate::new(404)
                .set_body_raw(r#"{"error":"model not found"}"#, "application/json"),
        )
        .mount(&server)
        .await;

    let client = OllamaClient::new(server.uri());
    let session = GenerationSession::new(GenerationRequest::new("missing", "hi")).unwrap();
    let outcome = session.run(&client, |_| {}).await;

    assert_eq!(outcome.state, SessionState::Failed);
    assert!(outcome.text.is_empty());
    assert_eq!(outcome.metrics.unit_count, 0);
    match outcome.error {
        Some(EngineError::Transport(e)) => assert_eq!(e.status(), Some(404)),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn cancelling_while_requesting_aborts_without_output() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw("{\"done\":true}\n", "application/x-ndjson")
                .set_delay(Duration::from_secs(30)),
        )
        .mount(&server)
        .await;

    let client = OllamaClient::new(server.uri());
    let session = GenerationSession::new(GenerationRequest::new("llama3.2", "hi")).unwrap();
    let cancel = session.cancellation_token();

    let driver = tokio::spawn(async move { session.run(&client, |_| {}).await });
    tokio::time::sleep(Duration::from_millis(50)).await;
    cancel.cancel();

    let outcome = driver.await.unwrap();
    assert_eq!(outcome.state, SessionState::Aborted);
    assert!(outcome.error.is_none());
    assert!(!outcome.has_output());
}
