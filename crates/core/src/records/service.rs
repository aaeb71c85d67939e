//! Owner-scoped CRUD over a [`RecordStore`].
//!
//! Every operation takes the caller's `owner_id`; records belonging to somebody else are
//! reported as not found rather than forbidden, so record ids do not leak across users.
//!
//! Editing `original_text` always invalidates cached enrichment before the update returns.
//! Nothing in this module calls an AI provider, so record CRUD never fails because enrichment
//! is unavailable.

use super::{MedicalRecord, RecordStore};
use crate::constants::{DEFAULT_LIST_LIMIT, DEFAULT_RECORD_TYPE, MAX_TITLE_LEN};
use crate::{RecordError, RecordResult};
use chrono::{DateTime, Utc};
use mrb_types::NonEmptyText;
use mrb_uuid::RecordId;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Input for [`RecordService::create`].
#[derive(Debug, Clone, Deserialize)]
pub struct NewRecord {
    pub title: String,
    pub original_text: String,
    #[serde(default)]
    pub record_type: Option<String>,
}

/// Partial update for [`RecordService::update`]. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecordUpdate {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub original_text: Option<String>,
    #[serde(default)]
    pub record_type: Option<String>,
}

/// List view of a record: enough for an index page and the dashboard's cache-state counts.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordSummary {
    pub id: RecordId,
    pub title: String,
    pub record_type: String,
    pub created_at: DateTime<Utc>,
    pub has_translation: bool,
    pub has_suggestions: bool,
}

impl From<&MedicalRecord> for RecordSummary {
    fn from(record: &MedicalRecord) -> Self {
        Self {
            id: record.id,
            title: record.title.clone(),
            record_type: record.record_type.clone(),
            created_at: record.created_at,
            has_translation: record.translated_text.is_some(),
            has_suggestions: record.lifestyle_suggestions.is_some(),
        }
    }
}

/// Record CRUD operations.
#[derive(Clone)]
pub struct RecordService {
    store: Arc<dyn RecordStore>,
}

impl RecordService {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn RecordStore> {
        &self.store
    }

    /// Creates a new record for `owner_id`.
    ///
    /// # Errors
    ///
    /// Returns `RecordError::InvalidInput` if:
    /// - the owner, title or text is blank,
    /// - the title is longer than 200 characters.
    pub fn create(&self, owner_id: &str, new: NewRecord) -> RecordResult<MedicalRecord> {
        let owner = validated_owner(owner_id)?;
        let title = validated_title(&new.title)?;
        let text = validated_text(&new.original_text)?;
        let record_type = match new.record_type {
            Some(t) => validated_record_type(&t)?,
            None => DEFAULT_RECORD_TYPE.to_string(),
        };

        let now = Utc::now();
        let record = MedicalRecord {
            id: RecordId::new(),
            owner_id: owner,
            title,
            original_text: text,
            record_type,
            translated_text: None,
            lifestyle_suggestions: None,
            created_at: now,
            updated_at: now,
        };
        self.store.create_record(&record)?;
        tracing::info!("created medical record {}", record.id);
        Ok(record)
    }

    /// Lists `owner_id`'s records, oldest first, skipping `skip` and returning at most `limit`
    /// (100 when `None`).
    pub fn list(
        &self,
        owner_id: &str,
        skip: usize,
        limit: Option<usize>,
    ) -> RecordResult<Vec<RecordSummary>> {
        let records = self.store.list_records(owner_id)?;
        Ok(records
            .iter()
            .skip(skip)
            .take(limit.unwrap_or(DEFAULT_LIST_LIMIT))
            .map(RecordSummary::from)
            .collect())
    }

    /// Loads one of `owner_id`'s records.
    ///
    /// # Errors
    ///
    /// Returns `RecordError::NotFound` if the record does not exist or belongs to another owner.
    pub fn get(&self, owner_id: &str, id: &RecordId) -> RecordResult<MedicalRecord> {
        let record = self.store.get_record(id)?;
        if record.owner_id != owner_id {
            return Err(RecordError::NotFound(id.to_string()));
        }
        Ok(record)
    }

    /// Applies `update` to one of `owner_id`'s records.
    ///
    /// When the update carries an `original_text` that differs from the stored one, cached
    /// translation and suggestions are cleared through
    /// [`RecordStore::clear_cache_on_text_change`].
    pub fn update(
        &self,
        owner_id: &str,
        id: &RecordId,
        update: RecordUpdate,
    ) -> RecordResult<MedicalRecord> {
        let mut record = self.get(owner_id, id)?;

        if let Some(title) = update.title {
            record.title = validated_title(&title)?;
        }
        if let Some(record_type) = update.record_type {
            record.record_type = validated_record_type(&record_type)?;
        }
        let mut text_changed = false;
        if let Some(text) = update.original_text {
            let text = validated_text(&text)?;
            text_changed = text != record.original_text;
            record.original_text = text;
        }

        record.updated_at = Utc::now();
        if text_changed {
            record.clear_cache();
        }
        self.store.update_record(&record)?;

        if text_changed {
            self.store.clear_cache_on_text_change(id)?;
            tracing::debug!("record {} text changed; cached enrichment cleared", id);
        }
        Ok(record)
    }

    pub fn delete(&self, owner_id: &str, id: &RecordId) -> RecordResult<()> {
        self.get(owner_id, id)?;
        self.store.delete_record(id)?;
        tracing::info!("deleted medical record {}", id);
        Ok(())
    }
}

fn validated_owner(owner_id: &str) -> RecordResult<String> {
    NonEmptyText::new(owner_id)
        .map(NonEmptyText::into_inner)
        .map_err(|_| RecordError::InvalidInput("owner_id cannot be empty".into()))
}

fn validated_title(title: &str) -> RecordResult<String> {
    NonEmptyText::bounded(title, MAX_TITLE_LEN)
        .map(NonEmptyText::into_inner)
        .map_err(|e| RecordError::InvalidInput(format!("title: {e}")))
}

fn validated_text(text: &str) -> RecordResult<String> {
    if text.trim().is_empty() {
        return Err(RecordError::InvalidInput(
            "original_text cannot be empty".into(),
        ));
    }
    Ok(text.to_string())
}

fn validated_record_type(record_type: &str) -> RecordResult<String> {
    NonEmptyText::new(record_type)
        .map(NonEmptyText::into_inner)
        .map_err(|_| RecordError::InvalidInput("record_type cannot be empty".into()))
}
