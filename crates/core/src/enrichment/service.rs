//! Public entry point for AI enrichment.
//!
//! Record-backed operations consult the cache first and write fresh results back through the
//! records store. The ad hoc operations used by the chat and free-text endpoints never touch the
//! cache.

use super::{
    cache::EnrichmentCache, EnrichmentRequest, EnrichmentResult, FallbackOrchestrator,
    OrchestratorError, ProviderAttempt,
};
use crate::records::{CacheField, MedicalRecord, RecordStore};
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum EnrichmentError {
    /// No provider produced a usable answer. Callers surface this as "AI features unavailable"
    /// whether nothing was configured or everything failed.
    #[error("AI features unavailable")]
    Unavailable { attempts: Vec<ProviderAttempt> },
    #[error("invalid enrichment request: {0}")]
    InvalidRequest(String),
}

impl From<OrchestratorError> for EnrichmentError {
    fn from(err: OrchestratorError) -> Self {
        match err {
            OrchestratorError::AllProvidersExhausted { attempts } => {
                EnrichmentError::Unavailable { attempts }
            }
        }
    }
}

/// Composes the enrichment cache and the provider fallback chain.
#[derive(Clone)]
pub struct EnrichmentService {
    cache: EnrichmentCache,
    orchestrator: FallbackOrchestrator,
}

impl EnrichmentService {
    pub fn new(store: Arc<dyn RecordStore>, orchestrator: FallbackOrchestrator) -> Self {
        Self {
            cache: EnrichmentCache::new(store),
            orchestrator,
        }
    }

    pub fn orchestrator(&self) -> &FallbackOrchestrator {
        &self.orchestrator
    }

    /// Plain-language translation of `record.original_text`.
    ///
    /// On a fresh result the translation slot on `record` and in the store is overwritten.
    ///
    /// # Errors
    ///
    /// Returns [`EnrichmentError::Unavailable`] when every provider failed; the cache is left
    /// untouched in that case.
    pub fn translate(
        &self,
        record: &mut MedicalRecord,
        force_refresh: bool,
    ) -> Result<EnrichmentResult, EnrichmentError> {
        if let Some(hit) = self
            .cache
            .lookup(record, CacheField::Translation, None, force_refresh)
        {
            tracing::debug!("translation cache hit for record {}", record.id);
            return Ok(EnrichmentResult::from_cache(hit.to_string()));
        }
        tracing::debug!(
            "translation cache miss for record {} (force_refresh={})",
            record.id,
            force_refresh
        );

        let request = EnrichmentRequest::translate(record.original_text.clone())
            .with_force_refresh(force_refresh);
        let result = self.run(&request)?;
        self.write_back(record, CacheField::Translation, None, &result);
        Ok(result)
    }

    /// Lifestyle suggestions for `condition`, grounded in the record's text.
    ///
    /// # Errors
    ///
    /// [`EnrichmentError::InvalidRequest`] for a blank condition, otherwise as
    /// [`translate`](Self::translate).
    pub fn suggest(
        &self,
        record: &mut MedicalRecord,
        condition: &str,
        force_refresh: bool,
    ) -> Result<EnrichmentResult, EnrichmentError> {
        let condition = non_blank(condition, "condition")?;
        if let Some(hit) = self.cache.lookup(
            record,
            CacheField::LifestyleSuggestions,
            Some(condition),
            force_refresh,
        ) {
            tracing::debug!("suggestion cache hit for record {}", record.id);
            return Ok(EnrichmentResult::from_cache(hit.to_string()));
        }
        tracing::debug!(
            "suggestion cache miss for record {} (force_refresh={})",
            record.id,
            force_refresh
        );

        let request = EnrichmentRequest::suggest(condition, record.original_text.clone())
            .with_force_refresh(force_refresh);
        let result = self.run(&request)?;
        self.write_back(
            record,
            CacheField::LifestyleSuggestions,
            Some(condition),
            &result,
        );
        Ok(result)
    }

    /// Explanation of a record: its translation, sharing the same cache slot.
    pub fn explain(
        &self,
        record: &mut MedicalRecord,
        force_refresh: bool,
    ) -> Result<EnrichmentResult, EnrichmentError> {
        self.translate(record, force_refresh)
    }

    /// Translate free text that is not tied to a record. Never cached.
    pub fn translate_text(&self, text: &str) -> Result<EnrichmentResult, EnrichmentError> {
        let text = non_blank(text, "text")?;
        self.run(&EnrichmentRequest::translate(text))
    }

    /// Lifestyle suggestions for a bare condition. Never cached.
    pub fn suggest_for_condition(
        &self,
        condition: &str,
    ) -> Result<EnrichmentResult, EnrichmentError> {
        let condition = non_blank(condition, "condition")?;
        self.run(&EnrichmentRequest::suggest(condition, ""))
    }

    /// Answer a patient question, optionally grounded in record text. Never cached.
    pub fn chat(
        &self,
        message: &str,
        context: Option<&str>,
    ) -> Result<EnrichmentResult, EnrichmentError> {
        let message = non_blank(message, "message")?;
        self.run(&EnrichmentRequest::chat(
            message,
            context.map(str::to_string),
        ))
    }

    fn run(&self, request: &EnrichmentRequest) -> Result<EnrichmentResult, EnrichmentError> {
        self.orchestrator.run(request).map_err(|err| {
            tracing::warn!("{:?} enrichment unavailable: {}", request.purpose, err);
            EnrichmentError::from(err)
        })
    }

    fn write_back(
        &self,
        record: &mut MedicalRecord,
        field: CacheField,
        condition: Option<&str>,
        result: &EnrichmentResult,
    ) {
        if let Err(err) = self.cache.store(
            record,
            field,
            condition,
            &result.content,
            result.provider_used.as_deref(),
        ) {
            tracing::warn!(
                "failed to cache {} for record {}: {}",
                field.as_str(),
                record.id,
                err
            );
        }
    }
}

fn non_blank<'a>(value: &'a str, what: &str) -> Result<&'a str, EnrichmentError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(EnrichmentError::InvalidRequest(format!(
            "{what} must not be empty"
        )));
    }
    Ok(trimmed)
}
