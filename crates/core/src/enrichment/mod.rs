//! AI enrichment of medical records.
//!
//! Turns a record's raw text into a plain-language translation or condition-specific lifestyle
//! guidance using a chain of interchangeable AI providers.
//!
//! ```text
//! caller -> EnrichmentService -> EnrichmentCache (hit: return)
//!                              -> FallbackOrchestrator -> Groq -> Hugging Face -> Ollama
//!                              -> EnrichmentCache write -> return
//! ```
//!
//! - [`provider`]: the adapter contract and its error taxonomy
//! - [`providers`]: the concrete HTTP adapters
//! - [`orchestrator`]: ordered fallback with a per-adapter deadline and one transient retry
//! - [`cache`]: validity rules for the cached slots on [`MedicalRecord`](crate::MedicalRecord)
//! - [`service`]: the public entry point

pub mod cache;
pub mod orchestrator;
pub mod prompt;
pub mod provider;
pub mod providers;
pub mod service;

#[cfg(test)]
pub(crate) mod testing;

pub use cache::{text_digest, EnrichmentCache};
pub use orchestrator::{AttemptOutcome, FallbackOrchestrator, OrchestratorError, ProviderAttempt};
pub use provider::{Provider, ProviderError};
pub use service::{EnrichmentError, EnrichmentService};

use serde::{Deserialize, Serialize};

/// What an enrichment call is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnrichmentPurpose {
    /// Rewrite medical text in plain language.
    Translate,
    /// Lifestyle tips for a named condition.
    Suggest,
    /// Answer a patient question, optionally grounded in record text.
    Chat,
}

/// A single provider-agnostic enrichment request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnrichmentRequest {
    /// Medical text to translate, record text backing a suggestion, or the chat message.
    pub text: String,
    pub purpose: EnrichmentPurpose,
    /// Condition for [`EnrichmentPurpose::Suggest`].
    pub condition: Option<String>,
    /// Record context for [`EnrichmentPurpose::Chat`].
    pub context: Option<String>,
    pub force_refresh: bool,
}

impl EnrichmentRequest {
    pub fn translate(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            purpose: EnrichmentPurpose::Translate,
            condition: None,
            context: None,
            force_refresh: false,
        }
    }

    /// Suggestion request for `condition`; `text` may be empty when no record backs it.
    pub fn suggest(condition: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            purpose: EnrichmentPurpose::Suggest,
            condition: Some(condition.into()),
            context: None,
            force_refresh: false,
        }
    }

    pub fn chat(message: impl Into<String>, context: Option<String>) -> Self {
        Self {
            text: message.into(),
            purpose: EnrichmentPurpose::Chat,
            condition: None,
            context,
            force_refresh: false,
        }
    }

    pub fn with_force_refresh(mut self, force_refresh: bool) -> Self {
        self.force_refresh = force_refresh;
        self
    }
}

/// Outcome of an enrichment call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnrichmentResult {
    pub content: String,
    /// Provider that produced `content`; `None` when served from cache.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider_used: Option<String>,
    pub cached: bool,
}

impl EnrichmentResult {
    pub fn fresh(content: String, provider: &str) -> Self {
        Self {
            content,
            provider_used: Some(provider.to_string()),
            cached: false,
        }
    }

    pub fn from_cache(content: String) -> Self {
        Self {
            content,
            provider_used: None,
            cached: true,
        }
    }
}
