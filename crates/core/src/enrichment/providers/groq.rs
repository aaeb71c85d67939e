//! Groq adapter (OpenAI-compatible chat completions).

use super::http;
use super::GenerationParams;
use crate::config::ProviderSettings;
use crate::constants::GROQ_PROVIDER_ID;
use crate::enrichment::{prompt, EnrichmentRequest, Provider, ProviderError};
use serde_json::{json, Value};
use std::time::Duration;

pub struct GroqProvider {
    settings: ProviderSettings,
    params: GenerationParams,
    agent: ureq::Agent,
}

impl GroqProvider {
    pub fn new(settings: ProviderSettings, params: GenerationParams) -> Self {
        Self {
            settings,
            params,
            agent: http::agent(),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.settings.base_url_trimmed())
    }

    fn payload(&self, request: &EnrichmentRequest) -> Value {
        let prompt = prompt::build(request);
        json!({
            "model": self.settings.model,
            "messages": [
                {"role": "system", "content": prompt.system},
                {"role": "user", "content": prompt.user},
            ],
            "temperature": self.params.temperature,
            "max_tokens": self.params.max_tokens,
        })
    }
}

impl Provider for GroqProvider {
    fn id(&self) -> &str {
        GROQ_PROVIDER_ID
    }

    fn is_available(&self) -> bool {
        self.settings.api_key.is_some() && !self.settings.base_url.is_empty()
    }

    fn enrich(
        &self,
        request: &EnrichmentRequest,
        timeout: Duration,
    ) -> Result<String, ProviderError> {
        let api_key = self
            .settings
            .api_key
            .as_deref()
            .ok_or_else(|| ProviderError::Unauthenticated("GROQ_API_KEY is not set".into()))?;
        let body = http::post_json(
            &self.agent,
            &self.endpoint(),
            Some(api_key),
            &self.payload(request),
            timeout,
        )?;
        http::text_at(&body, "/choices/0/message/content")
    }
}
