//! Sharded YAML record storage.
//!
//! ## Storage Layout
//!
//! ```text
//! records/
//!   <s1>/
//!     <s2>/
//!       <id>/
//!         record.yaml
//! ```
//!
//! where `s1` and `s2` are the first four hex characters of the record id.
//!
//! Every mutation is a read-modify-write of `record.yaml` performed under the store's write
//! lock, and the new file replaces the old one with a rename so readers never see a partial
//! document.

use super::{CacheField, CachedEnrichment, MedicalRecord, RecordStore};
use crate::constants::RECORD_YAML_FILENAME;
use crate::{RecordError, RecordResult};
use mrb_uuid::RecordId;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// File-backed [`RecordStore`].
#[derive(Debug)]
pub struct FileRecordStore {
    records_dir: PathBuf,
    write_lock: Mutex<()>,
}

impl FileRecordStore {
    /// Open (and create if necessary) a store rooted at `records_dir`.
    ///
    /// # Errors
    ///
    /// Returns `RecordError::StorageDirCreation` if the directory cannot be created.
    pub fn open(records_dir: impl Into<PathBuf>) -> RecordResult<Self> {
        let records_dir = records_dir.into();
        fs::create_dir_all(&records_dir).map_err(RecordError::StorageDirCreation)?;
        Ok(Self {
            records_dir,
            write_lock: Mutex::new(()),
        })
    }

    pub fn records_dir(&self) -> &Path {
        &self.records_dir
    }

    fn record_path(&self, id: &RecordId) -> PathBuf {
        id.sharded_dir(&self.records_dir).join(RECORD_YAML_FILENAME)
    }

    fn read(&self, id: &RecordId) -> RecordResult<MedicalRecord> {
        let path = self.record_path(id);
        let contents = match fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(RecordError::NotFound(id.to_string()))
            }
            Err(e) => return Err(RecordError::FileRead(e)),
        };
        serde_yaml::from_str(&contents).map_err(RecordError::YamlDeserialization)
    }

    fn write(&self, record: &MedicalRecord) -> RecordResult<()> {
        let path = self.record_path(&record.id);
        let yaml = serde_yaml::to_string(record).map_err(RecordError::YamlSerialization)?;
        let tmp = path.with_extension("yaml.tmp");
        fs::write(&tmp, yaml).map_err(RecordError::FileWrite)?;
        fs::rename(&tmp, &path).map_err(RecordError::FileWrite)
    }

    /// Apply `mutate` to the stored record under the write lock and persist the result.
    fn modify(
        &self,
        id: &RecordId,
        mutate: impl FnOnce(&mut MedicalRecord),
    ) -> RecordResult<()> {
        let _guard = self.write_lock.lock().map_err(|_| RecordError::LockPoisoned)?;
        let mut record = self.read(id)?;
        mutate(&mut record);
        self.write(&record)
    }
}

impl RecordStore for FileRecordStore {
    fn create_record(&self, record: &MedicalRecord) -> RecordResult<()> {
        let _guard = self.write_lock.lock().map_err(|_| RecordError::LockPoisoned)?;
        let dir = record.id.sharded_dir(&self.records_dir);
        if let Some(parent) = dir.parent() {
            fs::create_dir_all(parent).map_err(RecordError::RecordDirCreation)?;
        }
        match fs::create_dir(&dir) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                return Err(RecordError::InvalidInput(format!(
                    "record {} already exists",
                    record.id
                )))
            }
            Err(e) => return Err(RecordError::RecordDirCreation(e)),
        }

        if let Err(e) = self.write(record) {
            // Leave no half-created record behind.
            if let Err(cleanup) = fs::remove_dir_all(&dir) {
                tracing::warn!("failed to clean up {}: {}", dir.display(), cleanup);
            }
            return Err(e);
        }
        Ok(())
    }

    fn get_record(&self, id: &RecordId) -> RecordResult<MedicalRecord> {
        self.read(id)
    }

    fn list_records(&self, owner_id: &str) -> RecordResult<Vec<MedicalRecord>> {
        let mut records = Vec::new();

        let s1_iter = match fs::read_dir(&self.records_dir) {
            Ok(it) => it,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(records),
            Err(e) => return Err(RecordError::FileRead(e)),
        };

        for s1 in s1_iter.flatten() {
            let Ok(s2_iter) = fs::read_dir(s1.path()) else {
                continue;
            };
            for s2 in s2_iter.flatten() {
                let Ok(id_iter) = fs::read_dir(s2.path()) else {
                    continue;
                };
                for id_ent in id_iter.flatten() {
                    let record_path = id_ent.path().join(RECORD_YAML_FILENAME);
                    if !record_path.is_file() {
                        continue;
                    }
                    let parsed = fs::read_to_string(&record_path)
                        .ok()
                        .and_then(|c| serde_yaml::from_str::<MedicalRecord>(&c).ok());
                    match parsed {
                        Some(record) if record.owner_id == owner_id => records.push(record),
                        Some(_) => {}
                        None => {
                            tracing::warn!("failed to parse record: {}", record_path.display())
                        }
                    }
                }
            }
        }

        records.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(records)
    }

    fn update_record(&self, record: &MedicalRecord) -> RecordResult<()> {
        let replacement = record.clone();
        self.modify(&record.id, move |stored| *stored = replacement)
    }

    fn delete_record(&self, id: &RecordId) -> RecordResult<()> {
        let _guard = self.write_lock.lock().map_err(|_| RecordError::LockPoisoned)?;
        let dir = id.sharded_dir(&self.records_dir);
        if !dir.join(RECORD_YAML_FILENAME).is_file() {
            return Err(RecordError::NotFound(id.to_string()));
        }
        fs::remove_dir_all(&dir).map_err(RecordError::FileRemove)
    }

    fn update_record_cache(
        &self,
        id: &RecordId,
        field: CacheField,
        value: CachedEnrichment,
    ) -> RecordResult<()> {
        let _guard = self.write_lock.lock().map_err(|_| RecordError::LockPoisoned)?;
        let mut record = self.read(id)?;
        if !record.apply_cache_slot(field, value) {
            return Ok(());
        }
        self.write(&record)
    }

    fn clear_cache_on_text_change(&self, id: &RecordId) -> RecordResult<()> {
        self.modify(id, MedicalRecord::clear_cache)
    }
}
