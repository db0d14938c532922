//! Wire types for the Ollama HTTP API.

use serde::{Deserialize, Serialize};

/// One installed model as reported by `GET /api/tags`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelSummary {
    /// Model name, e.g. `llama3.2:3b`.
    pub name: String,
    /// On-disk size in bytes.
    #[serde(default)]
    pub size: u64,
}

impl ModelSummary {
    /// Display label: name plus human-readable size.
    pub fn label(&self) -> String {
        format!("{} ({})", self.name, format_size(self.size))
    }
}

/// Response envelope for `GET /api/tags`.
///
/// A server with nothing installed may return an empty or absent list; that is
/// a valid state, not an error.
#[derive(Debug, Default, Deserialize)]
pub struct TagsResponse {
    #[serde(default)]
    pub models: Vec<ModelSummary>,
}

/// Request body for `POST /api/generate`.
#[derive(Debug, Clone, Serialize)]
pub struct GenerateRequest {
    /// Model to generate with.
    pub model: String,
    /// Prompt text.
    pub prompt: String,
    /// Sampling temperature.
    pub temperature: f32,
    /// Always `true`; the client only consumes streamed responses.
    pub stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<GenerateOptions>,
}

impl GenerateRequest {
    pub fn new(model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            prompt: prompt.into(),
            temperature: 0.7,
            stream: true,
            options: None,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Cap the number of generated tokens via `options.num_predict`.
    pub fn with_max_output(mut self, num_predict: u32) -> Self {
        self.options = Some(GenerateOptions {
            num_predict: Some(num_predict),
        });
        self
    }
}

/// Model options forwarded inside the generate request.
#[derive(Debug, Clone, Serialize)]
pub struct GenerateOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_predict: Option<u32>,
}

/// One decoded record from the streamed generate response.
///
/// The server attaches more fields (timings, context, eval counts); only the
/// incremental text and the completion flag matter here, the rest is ignored.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct GenerateChunk {
    #[serde(default)]
    pub response: Option<String>,
    #[serde(default)]
    pub done: bool,
}

impl GenerateChunk {
    /// Incremental text carried by this chunk, if any.
    ///
    /// Empty strings count as "no text": they contribute nothing to the
    /// output and must not inflate the streamed-unit count.
    pub fn text(&self) -> Option<&str> {
        self.response.as_deref().filter(|s| !s.is_empty())
    }
}

/// Format a byte count the way the model selector displays it: two decimal
/// places, 1024-based units up to GB.
pub fn format_size(bytes: u64) -> String {
    if bytes == 0 {
        return "unknown size".to_string();
    }
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let exp = (((bytes as f64).ln() / 1024_f64.ln()).floor() as usize).min(UNITS.len() - 1);
    let value = bytes as f64 / 1024_f64.powi(exp as i32);
    format!("{} {}", (value * 100.0).round() / 100.0, UNITS[exp])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_size_buckets() {
        assert_eq!(format_size(0), "unknown size");
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(1024), "1 KB");
        assert_eq!(format_size(1536), "1.5 KB");
        assert_eq!(format_size(2_464_412_180), "2.3 GB");
    }

    #[test]
    fn tags_response_tolerates_missing_models() {
        let parsed: TagsResponse = serde_json::from_str("{}").unwrap();
        assert!(parsed.models.is_empty());
    }

    #[test]
    fn chunk_text_skips_empty_response() {
        let chunk: GenerateChunk = serde_json::from_str(r#"{"response":""}"#).unwrap();
        assert_eq!(chunk.text(), None);

        let chunk: GenerateChunk = serde_json::from_str(r#"{"response":"hi"}"#).unwrap();
        assert_eq!(chunk.text(), Some("hi"));
    }

    #[test]
    fn chunk_ignores_server_metadata() {
        let chunk: GenerateChunk = serde_json::from_str(
            r#"{"model":"llama3.2","created_at":"2025-01-01T00:00:00Z","response":"x","done":false,"eval_count":42}"#,
        )
        .unwrap();
        assert_eq!(chunk.text(), Some("x"));
        assert!(!chunk.done);
    }

    #[test]
    fn generate_request_serializes_options_only_when_set() {
        let req = GenerateRequest::new("llama3.2", "hello").with_temperature(0.2);
        let json = serde_json::to_value(&req).unwrap();
        assert!(json.get("options").is_none());
        assert_eq!(json["stream"], true);

        let req = req.with_max_output(4096);
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["options"]["num_predict"], 4096);
    }
}
