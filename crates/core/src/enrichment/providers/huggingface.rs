//! Hugging Face Inference API adapter.
//!
//! The text-generation endpoint takes a single prompt string, so the system and user messages
//! are wrapped in the Llama-3 instruct template.

use super::http;
use super::GenerationParams;
use crate::config::ProviderSettings;
use crate::constants::HUGGINGFACE_PROVIDER_ID;
use crate::enrichment::{prompt, EnrichmentRequest, Provider, ProviderError};
use serde_json::{json, Value};
use std::time::Duration;

pub struct HuggingFaceProvider {
    settings: ProviderSettings,
    params: GenerationParams,
    agent: ureq::Agent,
}

impl HuggingFaceProvider {
    pub fn new(settings: ProviderSettings, params: GenerationParams) -> Self {
        Self {
            settings,
            params,
            agent: http::agent(),
        }
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/{}",
            self.settings.base_url_trimmed(),
            self.settings.model
        )
    }

    fn payload(&self, request: &EnrichmentRequest) -> Value {
        let prompt = prompt::build(request);
        let inputs = format!(
            "<|begin_of_text|><|start_header_id|>system<|end_header_id|>\n\n{}<|eot_id|>\
<|start_header_id|>user<|end_header_id|>\n\n{}<|eot_id|>\
<|start_header_id|>assistant<|end_header_id|>\n\n",
            prompt.system, prompt.user
        );
        json!({
            "inputs": inputs,
            "parameters": {
                "max_new_tokens": self.params.max_tokens,
                "temperature": self.params.temperature,
                "return_full_text": false,
            },
        })
    }
}

/// The API answers `[{"generated_text": ...}]` on success and `{"error": ...}` while a model
/// is loading or misconfigured.
fn parse_generated_text(body: &Value) -> Result<String, ProviderError> {
    if let Some(error) = body.get("error").and_then(Value::as_str) {
        return Err(ProviderError::InvalidResponse(error.to_string()));
    }
    http::text_at(body, "/0/generated_text")
}

impl Provider for HuggingFaceProvider {
    fn id(&self) -> &str {
        HUGGINGFACE_PROVIDER_ID
    }

    fn is_available(&self) -> bool {
        self.settings.api_key.is_some() && !self.settings.base_url.is_empty()
    }

    fn enrich(
        &self,
        request: &EnrichmentRequest,
        timeout: Duration,
    ) -> Result<String, ProviderError> {
        let api_key = self.settings.api_key.as_deref().ok_or_else(|| {
            ProviderError::Unauthenticated("HUGGINGFACE_API_KEY is not set".into())
        })?;
        let body = http::post_json(
            &self.agent,
            &self.endpoint(),
            Some(api_key),
            &self.payload(request),
            timeout,
        )?;
        parse_generated_text(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider() -> HuggingFaceProvider {
        HuggingFaceProvider::new(
            ProviderSettings::new(
                "https://api-inference.huggingface.co/models",
                Some("hf_test".into()),
                "meta-llama/Meta-Llama-3-8B-Instruct",
            ),
            GenerationParams {
                temperature: 0.5,
                max_tokens: 512,
            },
        )
    }

    #[test]
    fn test_endpoint_includes_model() {
        assert_eq!(
            provider().endpoint(),
            "https://api-inference.huggingface.co/models/meta-llama/Meta-Llama-3-8B-Instruct"
        );
    }

    #[test]
    fn test_payload_uses_instruct_template() {
        let payload = provider().payload(&EnrichmentRequest::suggest("diabetes", ""));
        let inputs = payload["inputs"].as_str().unwrap();
        assert!(inputs.starts_with("<|begin_of_text|>"));
        assert!(inputs.contains("living with diabetes"));
        assert!(inputs.ends_with("<|start_header_id|>assistant<|end_header_id|>\n\n"));
        assert_eq!(payload["parameters"]["max_new_tokens"], 512);
        assert_eq!(payload["parameters"]["return_full_text"], false);
    }

    #[test]
    fn test_parse_generated_text() {
        let ok = json!([{"generated_text": " Your counts are normal. "}]);
        assert_eq!(parse_generated_text(&ok).unwrap(), "Your counts are normal.");

        let loading = json!({"error": "Model is currently loading"});
        assert!(matches!(
            parse_generated_text(&loading),
            Err(ProviderError::InvalidResponse(msg)) if msg.contains("loading")
        ));

        assert!(parse_generated_text(&json!([])).is_err());
    }
}
