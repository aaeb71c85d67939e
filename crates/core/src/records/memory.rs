//! In-process record storage, used by tests and ephemeral deployments.

use super::{CacheField, CachedEnrichment, MedicalRecord, RecordStore};
use crate::{RecordError, RecordResult};
use mrb_uuid::RecordId;
use std::collections::HashMap;
use std::sync::RwLock;

/// [`RecordStore`] backed by a `HashMap` behind a read-write lock.
#[derive(Debug, Default)]
pub struct InMemoryRecordStore {
    records: RwLock<HashMap<RecordId, MedicalRecord>>,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn modify(
        &self,
        id: &RecordId,
        mutate: impl FnOnce(&mut MedicalRecord),
    ) -> RecordResult<()> {
        let mut records = self.records.write().map_err(|_| RecordError::LockPoisoned)?;
        let record = records
            .get_mut(id)
            .ok_or_else(|| RecordError::NotFound(id.to_string()))?;
        mutate(record);
        Ok(())
    }
}

impl RecordStore for InMemoryRecordStore {
    fn create_record(&self, record: &MedicalRecord) -> RecordResult<()> {
        let mut records = self.records.write().map_err(|_| RecordError::LockPoisoned)?;
        if records.contains_key(&record.id) {
            return Err(RecordError::InvalidInput(format!(
                "record {} already exists",
                record.id
            )));
        }
        records.insert(record.id, record.clone());
        Ok(())
    }

    fn get_record(&self, id: &RecordId) -> RecordResult<MedicalRecord> {
        let records = self.records.read().map_err(|_| RecordError::LockPoisoned)?;
        records
            .get(id)
            .cloned()
            .ok_or_else(|| RecordError::NotFound(id.to_string()))
    }

    fn list_records(&self, owner_id: &str) -> RecordResult<Vec<MedicalRecord>> {
        let records = self.records.read().map_err(|_| RecordError::LockPoisoned)?;
        let mut owned: Vec<MedicalRecord> = records
            .values()
            .filter(|r| r.owner_id == owner_id)
            .cloned()
            .collect();
        owned.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(owned)
    }

    fn update_record(&self, record: &MedicalRecord) -> RecordResult<()> {
        let replacement = record.clone();
        self.modify(&record.id, move |stored| *stored = replacement)
    }

    fn delete_record(&self, id: &RecordId) -> RecordResult<()> {
        let mut records = self.records.write().map_err(|_| RecordError::LockPoisoned)?;
        records
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| RecordError::NotFound(id.to_string()))
    }

    fn update_record_cache(
        &self,
        id: &RecordId,
        field: CacheField,
        value: CachedEnrichment,
    ) -> RecordResult<()> {
        self.modify(id, move |record| {
            record.apply_cache_slot(field, value);
        })
    }

    fn clear_cache_on_text_change(&self, id: &RecordId) -> RecordResult<()> {
        self.modify(id, MedicalRecord::clear_cache)
    }
}
