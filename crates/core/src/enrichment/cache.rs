//! Validity rules for the enrichment values cached on a record.
//!
//! A cached value is served only if it is present, the caller did not ask for a refresh, it was
//! computed from the record's current `original_text` (compared by SHA-256 digest) and, for
//! lifestyle suggestions, it was computed for the same condition. Conditions compare trimmed and
//! case-insensitively.

pub use crate::records::text_digest;

use crate::records::{CacheField, CachedEnrichment, MedicalRecord, RecordStore};
use crate::RecordResult;
use chrono::Utc;
use std::sync::Arc;

fn same_condition(stored: Option<&str>, requested: Option<&str>) -> bool {
    let normalise = |c: Option<&str>| c.map(|c| c.trim().to_lowercase()).unwrap_or_default();
    normalise(stored) == normalise(requested)
}

/// Reads and writes the cached slots of records through a [`RecordStore`].
#[derive(Clone)]
pub struct EnrichmentCache {
    store: Arc<dyn RecordStore>,
}

impl EnrichmentCache {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    /// The cached content for `field` if it is still valid for `record`.
    pub fn lookup<'a>(
        &self,
        record: &'a MedicalRecord,
        field: CacheField,
        condition: Option<&str>,
        force_refresh: bool,
    ) -> Option<&'a str> {
        if force_refresh {
            return None;
        }
        let slot = record.cache_slot(field)?;
        if slot.source_digest != text_digest(&record.original_text) {
            return None;
        }
        if field == CacheField::LifestyleSuggestions
            && !same_condition(slot.condition.as_deref(), condition)
        {
            return None;
        }
        Some(slot.content.as_str())
    }

    /// Persist `content` into `field` and mirror the write onto `record`.
    ///
    /// The in-memory record is updated even if the store write fails, so the caller's copy
    /// always reflects the value that was returned.
    pub fn store(
        &self,
        record: &mut MedicalRecord,
        field: CacheField,
        condition: Option<&str>,
        content: &str,
        provider: Option<&str>,
    ) -> RecordResult<()> {
        let value = CachedEnrichment {
            content: content.to_string(),
            source_digest: text_digest(&record.original_text),
            condition: match field {
                CacheField::LifestyleSuggestions => condition.map(|c| c.trim().to_string()),
                CacheField::Translation => None,
            },
            provider: provider.map(str::to_string),
            computed_at: Utc::now(),
        };
        record.set_cache_slot(field, Some(value.clone()));
        self.store.update_record_cache(&record.id, field, value)
    }
}
