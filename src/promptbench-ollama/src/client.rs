//! Ollama client implementation.

use std::pin::Pin;
use std::time::Duration;

use futures::{Stream, StreamExt};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use crate::models::{GenerateChunk, GenerateRequest, ModelSummary, TagsResponse};
use crate::ndjson::NdjsonDecoder;
use crate::{OllamaError, Result};

/// Stream of decoded generation records.
///
/// Dropping the stream tears down the underlying HTTP response, which is how
/// a cancelled generation stops the server from sending further chunks.
pub type GenerateStream = Pin<Box<dyn Stream<Item = Result<GenerateChunk>> + Send>>;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
/// Generous overall cap; a stalled generation is normally stopped by the user,
/// not by this timeout.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(600);

/// Client for an Ollama server.
#[derive(Clone)]
pub struct OllamaClient {
    client: reqwest::Client,
    base_url: String,
}

impl OllamaClient {
    /// Create a client for the given base URL (e.g. `http://localhost:11434`).
    pub fn new(base_url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            base_url: base_url.into(),
        }
    }

    /// Get the base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.base_url.trim_end_matches('/'))
    }

    /// Probe the server without caring about its contents.
    pub async fn check_server(&self) -> Result<()> {
        let url = self.endpoint("/api/tags");
        match self.client.get(&url).send().await {
            Ok(resp) if resp.status().is_success() => Ok(()),
            Ok(resp) => Err(OllamaError::Server {
                status: resp.status().as_u16(),
                message: "unexpected status from /api/tags".to_string(),
            }),
            Err(_) => Err(OllamaError::Connection),
        }
    }

    /// Fetch the list of installed models.
    ///
    /// An empty list is a valid result: the server is up but has no models.
    pub async fn list_models(&self) -> Result<Vec<ModelSummary>> {
        let url = self.endpoint("/api/tags");
        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(connection_or_request)?;

        if !resp.status().is_success() {
            return Err(error_from_response(resp).await);
        }

        let tags: TagsResponse = resp.json().await?;
        tracing::debug!(count = tags.models.len(), "fetched model list");
        Ok(tags.models)
    }

    /// Start a streaming generation and return the decoded record stream.
    ///
    /// The returned stream yields records in arrival order and ends after the
    /// server closes the response body. A malformed line inside the body is
    /// skipped by the decoder and never surfaces as a stream error.
    pub async fn generate(&self, request: &GenerateRequest) -> Result<GenerateStream> {
        let url = self.endpoint("/api/generate");
        let resp = self
            .client
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(connection_or_request)?;

        if !resp.status().is_success() {
            return Err(error_from_response(resp).await);
        }

        let (tx, rx) = mpsc::channel::<Result<GenerateChunk>>(64);

        tokio::spawn(async move {
            let mut body = std::pin::pin!(resp.bytes_stream());
            let mut decoder = NdjsonDecoder::<GenerateChunk>::new();
            while let Some(next) = body.next().await {
                match next {
                    Ok(bytes) => {
                        for record in decoder.feed(&bytes) {
                            if tx.send(Ok(record)).await.is_err() {
                                // Receiver dropped: generation was cancelled.
                                return;
                            }
                        }
                    }
                    Err(e) => {
                        let _ = tx.send(Err(OllamaError::Stream(e.to_string()))).await;
                        return;
                    }
                }
            }
            if let Some(last) = decoder.finish() {
                let _ = tx.send(Ok(last)).await;
            }
        });

        Ok(Box::pin(ReceiverStream::new(rx)))
    }
}

fn connection_or_request(e: reqwest::Error) -> OllamaError {
    if e.is_connect() || e.is_timeout() {
        OllamaError::Connection
    } else {
        OllamaError::Request(e)
    }
}

/// Build a server error from a non-2xx response, pulling a human-readable
/// message out of a JSON `error` body when there is one.
async fn error_from_response(resp: reqwest::Response) -> OllamaError {
    let status = resp.status().as_u16();
    let is_json = resp
        .headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .map(|ct| ct.contains("application/json"))
        .unwrap_or(false);

    let body = resp.text().await.unwrap_or_default();

    let message = if is_json {
        serde_json::from_str::<serde_json::Value>(&body)
            .ok()
            .and_then(|v| v.get("error")?.as_str().map(String::from))
            .unwrap_or(body)
    } else if body.len() > 200 {
        format!("{}...", &body[..200])
    } else {
        body
    };

    tracing::error!(status, message = %message, "server request failed");
    OllamaError::Server { status, message }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_list_models_happy_path() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/tags"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(
                serde_json::json!({
                    "models": [
                        {"name": "llama3.2:3b", "size": 2_019_393_189_u64},
                        {"name": "qwen2.5-coder:7b", "size": 4_683_087_332_u64}
                    ]
                })
                .to_string(),
                "application/json",
            ))
            .mount(&server)
            .await;

        let client = OllamaClient::new(server.uri());
        let models = client.list_models().await.expect("list models");
        assert_eq!(models.len(), 2);
        assert!(models.iter().any(|m| m.name == "llama3.2:3b"));
    }

    #[tokio::test]
    async fn test_list_models_empty_is_ok() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/tags"))
            .respond_with(
                ResponseTemplate::new(200).set_body_raw(r#"{"models":[]}"#, "application/json"),
            )
            .mount(&server)
            .await;

        let client = OllamaClient::new(server.uri());
        let models = client.list_models().await.expect("list models");
        assert!(models.is_empty());
    }

    #[tokio::test]
    async fn test_list_models_server_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/tags"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let client = OllamaClient::new(server.uri());
        let err = client.list_models().await.unwrap_err();
        assert_eq!(err.status(), Some(500));
    }

    #[tokio::test]
    async fn test_generate_streams_records_in_order() {
        let server = MockServer::start().await;
        let body = concat!(
            "{\"response\":\"Hel\",\"done\":false}\n",
            "{\"response\":\"lo\",\"done\":false}\n",
            "{\"done\":true}\n",
        );
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .and(body_partial_json(
                serde_json::json!({"model": "llama3.2", "stream": true}),
            ))
            .respond_with(ResponseTemplate::new(200).set_body_raw(body, "application/x-ndjson"))
            .mount(&server)
            .await;

        let client = OllamaClient::new(server.uri());
        let request = GenerateRequest::new("llama3.2", "say hello");
        let mut stream = client.generate(&request).await.expect("generate");

        let mut text = String::new();
        let mut saw_done = false;
        while let Some(record) = stream.next().await {
            let record = record.expect("stream record");
            if let Some(delta) = record.text() {
                text.push_str(delta);
            }
            if record.done {
                saw_done = true;
            }
        }
        assert_eq!(text, "Hello");
        assert!(saw_done);
    }

    #[tokio::test]
    async fn test_generate_malformed_line_is_skipped() {
        let server = MockServer::start().await;
        let body = "{\"response\":\"ok\"}\n{\"response\":\n{\"done\":true}\n";
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(body, "application/x-ndjson"))
            .mount(&server)
            .await;

        let client = OllamaClient::new(server.uri());
        let request = GenerateRequest::new("llama3.2", "hi");
        let mut stream = client.generate(&request).await.expect("generate");

        let mut records = Vec::new();
        while let Some(record) = stream.next().await {
            records.push(record.expect("stream record"));
        }
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].text(), Some("ok"));
        assert!(records[1].done);
    }

    #[tokio::test]
    async fn test_generate_error_body_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .respond_with(ResponseTemplate::new(404).set_body_raw(
                r#"{"error":"model 'nope' not found"}"#,
                "application/json",
            ))
            .mount(&server)
            .await;

        let client = OllamaClient::new(server.uri());
        let request = GenerateRequest::new("nope", "hi");
        let err = client.generate(&request).await.err().unwrap();
        match err {
            OllamaError::Server { status, message } => {
                assert_eq!(status, 404);
                assert!(message.contains("not found"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_check_server_connection_refused() {
        // Nothing is listening on this port.
        let client = OllamaClient::new("http://127.0.0.1:1");
        let err = client.check_server().await.unwrap_err();
        assert!(matches!(err, OllamaError::Connection));
    }
}
