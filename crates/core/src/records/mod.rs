//! Medical record storage.
//!
//! This module owns the record entity and the storage seam the enrichment subsystem writes
//! through:
//!
//! - [`MedicalRecord`] and its cached enrichment slots
//! - the [`RecordStore`] trait, with a sharded YAML implementation ([`FileRecordStore`]) and an
//!   in-process one ([`InMemoryRecordStore`])
//! - [`RecordService`], the owner-scoped CRUD layer that clears cached enrichment whenever a
//!   record's text is edited
//!
//! ## Pure Data Operations
//!
//! Nothing here knows about HTTP, API keys or AI providers.

mod file_store;
mod memory;
mod service;

pub use file_store::FileRecordStore;
pub use memory::InMemoryRecordStore;
pub use service::{NewRecord, RecordService, RecordSummary, RecordUpdate};

use crate::RecordResult;
use chrono::{DateTime, Utc};
use mrb_uuid::RecordId;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Hex-encoded SHA-256 of `text`.
pub fn text_digest(text: &str) -> String {
    hex::encode(Sha256::digest(text.as_bytes()))
}

/// One enrichment value cached on a record, together with what it was computed from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedEnrichment {
    pub content: String,
    /// SHA-256 (hex) of the `original_text` the content was generated from.
    pub source_digest: String,
    /// Condition the content was generated for. Only set on lifestyle suggestions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
    /// Identifier of the provider that produced the content.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    pub computed_at: DateTime<Utc>,
}

/// A patient's medical text entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MedicalRecord {
    pub id: RecordId,
    pub owner_id: String,
    pub title: String,
    pub original_text: String,
    pub record_type: String,
    #[serde(default)]
    pub translated_text: Option<CachedEnrichment>,
    #[serde(default)]
    pub lifestyle_suggestions: Option<CachedEnrichment>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl MedicalRecord {
    /// Cached translation content, if any.
    pub fn translation(&self) -> Option<&str> {
        self.translated_text.as_ref().map(|c| c.content.as_str())
    }

    /// Cached lifestyle suggestion content, if any.
    pub fn suggestions(&self) -> Option<&str> {
        self.lifestyle_suggestions.as_ref().map(|c| c.content.as_str())
    }

    /// The slot backing `field`.
    pub fn cache_slot(&self, field: CacheField) -> Option<&CachedEnrichment> {
        match field {
            CacheField::Translation => self.translated_text.as_ref(),
            CacheField::LifestyleSuggestions => self.lifestyle_suggestions.as_ref(),
        }
    }

    /// Replace the slot backing `field`.
    pub fn set_cache_slot(&mut self, field: CacheField, value: Option<CachedEnrichment>) {
        match field {
            CacheField::Translation => self.translated_text = value,
            CacheField::LifestyleSuggestions => self.lifestyle_suggestions = value,
        }
    }

    /// Store `value` in the slot backing `field` if it was computed from the current text.
    ///
    /// Returns false, leaving the record untouched, when the digest does not match: the text
    /// was edited after the value's source was loaded.
    pub fn apply_cache_slot(&mut self, field: CacheField, value: CachedEnrichment) -> bool {
        if value.source_digest != text_digest(&self.original_text) {
            tracing::debug!(
                "dropping stale {} for record {}: text changed since it was loaded",
                field.as_str(),
                self.id
            );
            return false;
        }
        self.set_cache_slot(field, Some(value));
        true
    }

    /// Drop both cached enrichment values.
    pub fn clear_cache(&mut self) {
        self.translated_text = None;
        self.lifestyle_suggestions = None;
    }
}

/// Which cached enrichment slot an update targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheField {
    Translation,
    LifestyleSuggestions,
}

impl CacheField {
    pub fn as_str(self) -> &'static str {
        match self {
            CacheField::Translation => "translated_text",
            CacheField::LifestyleSuggestions => "lifestyle_suggestions",
        }
    }
}

/// Persistence seam for medical records.
///
/// Implementations must make every mutating call a single atomic write: concurrent writers to
/// the same record may race, and the last write wins.
pub trait RecordStore: Send + Sync {
    /// Persist a new record. Fails if a record with the same id already exists.
    fn create_record(&self, record: &MedicalRecord) -> RecordResult<()>;

    /// Load a record by id.
    ///
    /// # Errors
    ///
    /// Returns `RecordError::NotFound` if no such record exists.
    fn get_record(&self, id: &RecordId) -> RecordResult<MedicalRecord>;

    /// All records belonging to `owner_id`, oldest first.
    fn list_records(&self, owner_id: &str) -> RecordResult<Vec<MedicalRecord>>;

    /// Overwrite an existing record.
    fn update_record(&self, record: &MedicalRecord) -> RecordResult<()>;

    fn delete_record(&self, id: &RecordId) -> RecordResult<()>;

    /// Write one cached enrichment slot, leaving every other field untouched.
    fn update_record_cache(
        &self,
        id: &RecordId,
        field: CacheField,
        value: CachedEnrichment,
    ) -> RecordResult<()>;

    /// Invalidate both cached enrichment slots after `original_text` has been edited.
    fn clear_cache_on_text_change(&self, id: &RecordId) -> RecordResult<()>;
}
