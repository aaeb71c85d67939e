//! Local Ollama daemon adapter (`/api/chat`, non-streaming).
//!
//! Ollama needs no credential; it is available whenever a base URL is configured.

use super::http;
use super::GenerationParams;
use crate::config::ProviderSettings;
use crate::constants::OLLAMA_PROVIDER_ID;
use crate::enrichment::{prompt, EnrichmentRequest, Provider, ProviderError};
use serde_json::{json, Value};
use std::time::Duration;

pub struct OllamaProvider {
    settings: ProviderSettings,
    params: GenerationParams,
    agent: ureq::Agent,
}

impl OllamaProvider {
    pub fn new(settings: ProviderSettings, params: GenerationParams) -> Self {
        Self {
            settings,
            params,
            agent: http::agent(),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/api/chat", self.settings.base_url_trimmed())
    }

    fn payload(&self, request: &EnrichmentRequest) -> Value {
        let prompt = prompt::build(request);
        json!({
            "model": self.settings.model,
            "messages": [
                {"role": "system", "content": prompt.system},
                {"role": "user", "content": prompt.user},
            ],
            "stream": false,
            "options": {
                "temperature": self.params.temperature,
                "num_predict": self.params.max_tokens,
            },
        })
    }
}

impl Provider for OllamaProvider {
    fn id(&self) -> &str {
        OLLAMA_PROVIDER_ID
    }

    fn is_available(&self) -> bool {
        !self.settings.base_url.is_empty()
    }

    fn enrich(
        &self,
        request: &EnrichmentRequest,
        timeout: Duration,
    ) -> Result<String, ProviderError> {
        let body = http::post_json(&self.agent, &self.endpoint(), None, &self.payload(request), timeout)
            .map_err(|err| match err {
                // The daemon answers 404 while the model is missing or still downloading.
                ProviderError::InvalidResponse(detail) if detail.starts_with("HTTP 404") => {
                    ProviderError::InvalidResponse(format!(
                        "model '{}' is not available: {detail}",
                        self.settings.model
                    ))
                }
                other => other,
            })?;
        http::text_at(&body, "/message/content")
    }
}
