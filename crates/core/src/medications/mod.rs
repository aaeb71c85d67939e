//! Medication reference catalogue.
//!
//! A small lookup table of medications (uses, side effects, discontinuation status) that sits
//! next to the medical records:
//!
//! - [`Medication`] and the [`MedicationStore`] seam, with a single-file YAML implementation
//!   ([`FileMedicationStore`]) and an in-process one ([`InMemoryMedicationStore`])
//! - [`MedicationService`]: search, lookup by id or name, discontinuation checks, bulk seeding
//!   and finding medication mentions in free text such as a record's `original_text`
//!
//! Names are unique and compare case-insensitively.

mod file_store;
mod memory;
mod service;

pub use file_store::FileMedicationStore;
pub use memory::InMemoryMedicationStore;
pub use service::{load_catalogue, MedicationPage, MedicationService, SeedReport};

use crate::{MedicationError, MedicationResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One catalogue entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Medication {
    pub id: u64,
    pub name: String,
    /// Where the entry was sourced from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uses: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub side_effects: Option<String>,
    #[serde(default)]
    pub discontinued: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discontinuation_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Fields of a medication before the store assigns it an id. Also the shape of seed files.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewMedication {
    pub name: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub uses: Option<String>,
    #[serde(default)]
    pub side_effects: Option<String>,
    #[serde(default)]
    pub discontinued: bool,
    #[serde(default)]
    pub discontinuation_reason: Option<String>,
}

/// A catalogue medication found in a piece of text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MedicationMention {
    pub name: String,
    pub uses: Option<String>,
    pub side_effects: Option<String>,
    pub discontinued: bool,
    pub discontinuation_reason: Option<String>,
    /// `DISCONTINUED` for discontinued medications.
    pub warning: Option<&'static str>,
}

pub(crate) fn same_name(a: &str, b: &str) -> bool {
    a.trim().to_lowercase() == b.trim().to_lowercase()
}

/// The whole catalogue as one serialisable value. Both stores keep one of these behind a lock.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub(crate) struct Catalogue {
    #[serde(default)]
    medications: Vec<Medication>,
}

impl Catalogue {
    fn sorted(&self) -> Vec<Medication> {
        let mut all = self.medications.clone();
        all.sort_by_key(|m| m.id);
        all
    }

    fn get(&self, id: u64) -> MedicationResult<Medication> {
        self.medications
            .iter()
            .find(|m| m.id == id)
            .cloned()
            .ok_or_else(|| MedicationError::NotFound(id.to_string()))
    }

    fn insert(&mut self, new: NewMedication) -> MedicationResult<Medication> {
        if self.medications.iter().any(|m| same_name(&m.name, &new.name)) {
            return Err(MedicationError::AlreadyExists(new.name));
        }
        let id = self.medications.iter().map(|m| m.id).max().unwrap_or(0) + 1;
        let medication = Medication {
            id,
            name: new.name,
            url: new.url,
            uses: new.uses,
            side_effects: new.side_effects,
            discontinued: new.discontinued,
            discontinuation_reason: new.discontinuation_reason,
            created_at: Utc::now(),
            updated_at: None,
        };
        self.medications.push(medication.clone());
        Ok(medication)
    }

    fn replace(&mut self, medication: &Medication) -> MedicationResult<()> {
        if self
            .medications
            .iter()
            .any(|m| m.id != medication.id && same_name(&m.name, &medication.name))
        {
            return Err(MedicationError::AlreadyExists(medication.name.clone()));
        }
        let slot = self
            .medications
            .iter_mut()
            .find(|m| m.id == medication.id)
            .ok_or_else(|| MedicationError::NotFound(medication.id.to_string()))?;
        *slot = medication.clone();
        Ok(())
    }
}

/// Persistence seam for the medication catalogue.
pub trait MedicationStore: Send + Sync {
    /// Every medication, ordered by id.
    fn list_medications(&self) -> MedicationResult<Vec<Medication>>;

    /// # Errors
    ///
    /// Returns `MedicationError::NotFound` if no such medication exists.
    fn get_medication(&self, id: u64) -> MedicationResult<Medication>;

    /// Add a medication and assign it the next id.
    ///
    /// # Errors
    ///
    /// Returns `MedicationError::AlreadyExists` if the name is taken, ignoring case.
    fn create_medication(&self, medication: NewMedication) -> MedicationResult<Medication>;

    /// Overwrite an existing medication, matched by id.
    fn update_medication(&self, medication: &Medication) -> MedicationResult<()>;
}
