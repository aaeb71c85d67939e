//! In-process medication catalogue, used by tests and ephemeral deployments.

use super::{Catalogue, Medication, MedicationStore, NewMedication};
use crate::{MedicationError, MedicationResult};
use std::sync::RwLock;

/// [`MedicationStore`] held entirely in memory.
#[derive(Debug, Default)]
pub struct InMemoryMedicationStore {
    catalogue: RwLock<Catalogue>,
}

impl InMemoryMedicationStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl MedicationStore for InMemoryMedicationStore {
    fn list_medications(&self) -> MedicationResult<Vec<Medication>> {
        let catalogue = self
            .catalogue
            .read()
            .map_err(|_| MedicationError::LockPoisoned)?;
        Ok(catalogue.sorted())
    }

    fn get_medication(&self, id: u64) -> MedicationResult<Medication> {
        let catalogue = self
            .catalogue
            .read()
            .map_err(|_| MedicationError::LockPoisoned)?;
        catalogue.get(id)
    }

    fn create_medication(&self, medication: NewMedication) -> MedicationResult<Medication> {
        let mut catalogue = self
            .catalogue
            .write()
            .map_err(|_| MedicationError::LockPoisoned)?;
        catalogue.insert(medication)
    }

    fn update_medication(&self, medication: &Medication) -> MedicationResult<()> {
        let mut catalogue = self
            .catalogue
            .write()
            .map_err(|_| MedicationError::LockPoisoned)?;
        catalogue.replace(medication)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::medications::test_support::exercise_store;

    #[test]
    fn test_memory_store_contract() {
        exercise_store(&InMemoryMedicationStore::new());
    }
}
