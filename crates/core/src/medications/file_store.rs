//! Single-file YAML medication catalogue.
//!
//! The whole catalogue lives in one `medications.yaml`. Reads parse the file on every call, and
//! writes rewrite it under the store's lock through a temporary file and a rename. A missing
//! file is an empty catalogue.

use super::{Catalogue, Medication, MedicationStore, NewMedication};
use crate::{MedicationError, MedicationResult};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// File-backed [`MedicationStore`].
#[derive(Debug)]
pub struct FileMedicationStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileMedicationStore {
    /// Open a catalogue at `path`, creating its parent directory if necessary.
    ///
    /// # Errors
    ///
    /// Returns `MedicationError::FileWrite` if the parent directory cannot be created.
    pub fn open(path: impl Into<PathBuf>) -> MedicationResult<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(MedicationError::FileWrite)?;
        }
        Ok(Self {
            path,
            write_lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> MedicationResult<Catalogue> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Catalogue::default()),
            Err(e) => return Err(MedicationError::FileRead(e)),
        };
        serde_yaml::from_str(&contents).map_err(|e| MedicationError::Parse(e.to_string()))
    }

    fn write(&self, catalogue: &Catalogue) -> MedicationResult<()> {
        let yaml = serde_yaml::to_string(catalogue).map_err(MedicationError::YamlSerialization)?;
        let tmp = self.path.with_extension("yaml.tmp");
        fs::write(&tmp, yaml).map_err(MedicationError::FileWrite)?;
        fs::rename(&tmp, &self.path).map_err(MedicationError::FileWrite)
    }

    fn modify<T>(
        &self,
        mutate: impl FnOnce(&mut Catalogue) -> MedicationResult<T>,
    ) -> MedicationResult<T> {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| MedicationError::LockPoisoned)?;
        let mut catalogue = self.read()?;
        let out = mutate(&mut catalogue)?;
        self.write(&catalogue)?;
        Ok(out)
    }
}

impl MedicationStore for FileMedicationStore {
    fn list_medications(&self) -> MedicationResult<Vec<Medication>> {
        Ok(self.read()?.sorted())
    }

    fn get_medication(&self, id: u64) -> MedicationResult<Medication> {
        self.read()?.get(id)
    }

    fn create_medication(&self, medication: NewMedication) -> MedicationResult<Medication> {
        self.modify(move |catalogue| catalogue.insert(medication))
    }

    fn update_medication(&self, medication: &Medication) -> MedicationResult<()> {
        self.modify(|catalogue| catalogue.replace(medication))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::medications::test_support::{exercise_store, new_medication};
    use tempfile::TempDir;

    #[test]
    fn test_file_store_contract() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let store = FileMedicationStore::open(temp_dir.path().join("medications.yaml")).unwrap();
        exercise_store(&store);
    }

    #[test]
    fn test_catalogue_survives_reopen() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("data").join("medications.yaml");
        let store = FileMedicationStore::open(&path).unwrap();
        store
            .create_medication(new_medication("Lisinopril", "Hypertension"))
            .unwrap();

        let reopened = FileMedicationStore::open(&path).unwrap();
        let all = reopened.list_medications().unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].uses.as_deref(), Some("Hypertension"));
        assert!(!path.with_extension("yaml.tmp").exists());
    }

    #[test]
    fn test_failed_mutation_leaves_file_untouched() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileMedicationStore::open(temp_dir.path().join("medications.yaml")).unwrap();
        store
            .create_medication(new_medication("Lisinopril", "Hypertension"))
            .unwrap();
        let before = fs::read_to_string(store.path()).unwrap();

        assert!(store
            .create_medication(new_medication("lisinopril", "dup"))
            .is_err());
        assert_eq!(fs::read_to_string(store.path()).unwrap(), before);
    }

    #[test]
    fn test_corrupt_catalogue_is_a_parse_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("medications.yaml");
        fs::write(&path, "medications: [not, a, medication").unwrap();
        let store = FileMedicationStore::open(&path).unwrap();
        assert!(matches!(
            store.list_medications(),
            Err(MedicationError::Parse(_))
        ));
    }
}
