//! Validated generation requests.

use promptbench_ollama::GenerateRequest;

use crate::error::{EngineError, Result};

/// Lowest accepted sampling temperature.
pub const MIN_TEMPERATURE: f32 = 0.0;
/// Highest accepted sampling temperature.
pub const MAX_TEMPERATURE: f32 = 2.0;

/// Everything needed to start one generation. Immutable once a session is
/// created from it.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    /// Model to generate with.
    pub model_id: String,
    /// Prompt text.
    pub prompt_text: String,
    /// Sampling temperature, within [`MIN_TEMPERATURE`]..=[`MAX_TEMPERATURE`].
    pub temperature: f32,
    /// Optional cap on generated output, in model tokens.
    pub max_output_units: Option<u32>,
}

impl GenerationRequest {
    pub fn new(model_id: impl Into<String>, prompt_text: impl Into<String>) -> Self {
        Self {
            model_id: model_id.into(),
            prompt_text: prompt_text.into(),
            temperature: 0.7,
            max_output_units: None,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_output_units(mut self, max_output_units: u32) -> Self {
        self.max_output_units = Some(max_output_units);
        self
    }

    /// Check the request before any network activity.
    pub fn validate(&self) -> Result<()> {
        if self.model_id.trim().is_empty() {
            return Err(EngineError::Validation("no model selected".to_string()));
        }
        if self.prompt_text.trim().is_empty() {
            return Err(EngineError::Validation("prompt is empty".to_string()));
        }
        if !(MIN_TEMPERATURE..=MAX_TEMPERATURE).contains(&self.temperature) {
            return Err(EngineError::Validation(format!(
                "temperature {} is outside {MIN_TEMPERATURE}..={MAX_TEMPERATURE}",
                self.temperature
            )));
        }
        if self.max_output_units == Some(0) {
            return Err(EngineError::Validation(
                "max output tokens must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Build the wire request sent to the server.
    pub(crate) fn to_wire(&self) -> GenerateRequest {
        let mut wire = GenerateRequest::new(self.model_id.clone(), self.prompt_text.clone())
            .with_temperature(self.temperature);
        if let Some(limit) = self.max_output_units {
            wire = wire.with_max_output(limit);
        }
        wire
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_a_normal_request() {
        let req = GenerationRequest::new("llama3.2", "hello").with_temperature(1.3);
        assert!(req.validate().is_ok());
    }

    #[test]
    fn rejects_blank_model_and_prompt() {
        assert!(GenerationRequest::new("", "hello").validate().is_err());
        assert!(GenerationRequest::new("llama3.2", "   ").validate().is_err());
    }

    #[test]
    fn rejects_out_of_range_temperature() {
        let req = GenerationRequest::new("llama3.2", "hi").with_temperature(2.5);
        assert!(req.validate().is_err());
        let req = GenerationRequest::new("llama3.2", "hi").with_temperature(-0.1);
        assert!(req.validate().is_err());
    }

    #[test]
    fn rejects_zero_output_cap() {
        let req = GenerationRequest::new("llama3.2", "hi").with_max_output_units(0);
        assert!(req.validate().is_err());
    }

    #[test]
    fn boundary_temperatures_are_valid() {
        assert!(
            GenerationRequest::new("m", "p")
                .with_temperature(0.0)
                .validate()
                .is_ok()
        );
        assert!(
            GenerationRequest::new("m", "p")
                .with_temperature(2.0)
                .validate()
                .is_ok()
        );
    }
}
