//! Concrete provider adapters.
//!
//! Priority order is fixed: Groq (hosted, high throughput), Hugging Face (hosted fallback),
//! Ollama (local inference daemon).

mod groq;
mod http;
mod huggingface;
mod ollama;

pub use groq::GroqProvider;
pub use huggingface::HuggingFaceProvider;
pub use ollama::OllamaProvider;

use crate::config::AiConfig;
use crate::enrichment::Provider;
use std::sync::Arc;

/// Sampling parameters every adapter forwards to its backend.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GenerationParams {
    pub temperature: f32,
    pub max_tokens: u32,
}

impl From<&AiConfig> for GenerationParams {
    fn from(cfg: &AiConfig) -> Self {
        Self {
            temperature: cfg.temperature,
            max_tokens: cfg.max_tokens,
        }
    }
}

/// The production adapter chain, in priority order.
pub fn default_chain(cfg: &AiConfig) -> Vec<Arc<dyn Provider>> {
    let params = GenerationParams::from(cfg);
    vec![
        Arc::new(GroqProvider::new(cfg.groq.clone(), params)),
        Arc::new(HuggingFaceProvider::new(cfg.huggingface.clone(), params)),
        Arc::new(OllamaProvider::new(cfg.ollama.clone(), params)),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{GROQ_PROVIDER_ID, HUGGINGFACE_PROVIDER_ID, OLLAMA_PROVIDER_ID};

    #[test]
    fn test_default_chain_order_and_availability() {
        let mut cfg = AiConfig::default();
        cfg.huggingface.api_key = Some("hf_test".into());

        let chain = default_chain(&cfg);
        let ids: Vec<&str> = chain.iter().map(|p| p.id()).collect();
        assert_eq!(
            ids,
            vec![GROQ_PROVIDER_ID, HUGGINGFACE_PROVIDER_ID, OLLAMA_PROVIDER_ID]
        );

        let available: Vec<bool> = chain.iter().map(|p| p.is_available()).collect();
        assert_eq!(available, vec![false, true, true]);
    }
}
