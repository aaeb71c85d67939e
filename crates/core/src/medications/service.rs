//! Queries and maintenance over a [`MedicationStore`].

use super::{same_name, Medication, MedicationMention, MedicationStore, NewMedication};
use crate::constants::{DEFAULT_LIST_LIMIT, DEFAULT_MEDICATION_SEARCH_LIMIT, DISCONTINUED_WARNING};
use crate::{MedicationError, MedicationResult};
use chrono::Utc;
use mrb_types::NonEmptyText;
use std::fs;
use std::path::Path;
use std::sync::Arc;

/// One page of [`MedicationService::list`], with the size of the filtered catalogue.
#[derive(Debug, Clone, PartialEq)]
pub struct MedicationPage {
    pub medications: Vec<Medication>,
    pub total: usize,
}

/// Outcome of [`MedicationService::seed`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub created: usize,
    pub updated: usize,
    pub skipped: usize,
}

/// Read a seed catalogue: a list of medications as JSON (`.json`) or YAML (anything else).
///
/// # Errors
///
/// Returns `MedicationError::FileRead` if the file cannot be read and `MedicationError::Parse`
/// if it is not a list of medications.
pub fn load_catalogue(path: &Path) -> MedicationResult<Vec<NewMedication>> {
    let contents = fs::read_to_string(path).map_err(MedicationError::FileRead)?;
    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    if is_json {
        serde_json::from_str(&contents).map_err(|e| MedicationError::Parse(e.to_string()))
    } else {
        serde_yaml::from_str(&contents).map_err(|e| MedicationError::Parse(e.to_string()))
    }
}

/// Medication reference operations.
#[derive(Clone)]
pub struct MedicationService {
    store: Arc<dyn MedicationStore>,
}

impl MedicationService {
    pub fn new(store: Arc<dyn MedicationStore>) -> Self {
        Self { store }
    }

    /// Medications whose name or uses contain `query`, ignoring case, ordered by id.
    ///
    /// Discontinued medications are left out unless `include_discontinued` is set. At most
    /// `limit` results are returned (50 when `None`).
    ///
    /// # Errors
    ///
    /// Returns `MedicationError::InvalidInput` if `query` is blank.
    pub fn search(
        &self,
        query: &str,
        skip: usize,
        limit: Option<usize>,
        include_discontinued: bool,
    ) -> MedicationResult<Vec<Medication>> {
        let query = NonEmptyText::new(query)
            .map_err(|_| MedicationError::InvalidInput("search query cannot be empty".into()))?
            .into_inner()
            .to_lowercase();
        let contains =
            |field: Option<&str>| field.is_some_and(|f| f.to_lowercase().contains(&query));

        Ok(self
            .store
            .list_medications()?
            .into_iter()
            .filter(|m| include_discontinued || !m.discontinued)
            .filter(|m| contains(Some(m.name.as_str())) || contains(m.uses.as_deref()))
            .skip(skip)
            .take(limit.unwrap_or(DEFAULT_MEDICATION_SEARCH_LIMIT))
            .collect())
    }

    /// The catalogue ordered by id, optionally only discontinued entries, at most `limit`
    /// (100 when `None`) per page.
    pub fn list(
        &self,
        skip: usize,
        limit: Option<usize>,
        discontinued_only: bool,
    ) -> MedicationResult<MedicationPage> {
        let matching: Vec<Medication> = self
            .store
            .list_medications()?
            .into_iter()
            .filter(|m| !discontinued_only || m.discontinued)
            .collect();
        let total = matching.len();
        Ok(MedicationPage {
            medications: matching
                .into_iter()
                .skip(skip)
                .take(limit.unwrap_or(DEFAULT_LIST_LIMIT))
                .collect(),
            total,
        })
    }

    pub fn get(&self, id: u64) -> MedicationResult<Medication> {
        self.store.get_medication(id)
    }

    /// Exact lookup by name, ignoring case and surrounding whitespace.
    pub fn find_by_name(&self, name: &str) -> MedicationResult<Option<Medication>> {
        Ok(self
            .store
            .list_medications()?
            .into_iter()
            .find(|m| same_name(&m.name, name)))
    }

    /// Like [`MedicationService::find_by_name`], but a miss is `MedicationError::NotFound`.
    pub fn get_by_name(&self, name: &str) -> MedicationResult<Medication> {
        self.find_by_name(name)?
            .ok_or_else(|| MedicationError::NotFound(name.trim().to_string()))
    }

    /// Whether `name` is a discontinued medication. Unknown names are not discontinued.
    pub fn check_discontinued(&self, name: &str) -> MedicationResult<bool> {
        Ok(self.find_by_name(name)?.is_some_and(|m| m.discontinued))
    }

    /// Adds one medication to the catalogue.
    ///
    /// # Errors
    ///
    /// Returns `MedicationError::InvalidInput` if the name is blank and
    /// `MedicationError::AlreadyExists` if it is taken.
    pub fn create(&self, mut medication: NewMedication) -> MedicationResult<Medication> {
        medication.name = NonEmptyText::new(&medication.name)
            .map_err(|_| MedicationError::InvalidInput("name cannot be empty".into()))?
            .into_inner();
        let created = self.store.create_medication(medication)?;
        tracing::info!("added medication {} ({})", created.name, created.id);
        Ok(created)
    }

    /// Catalogue medications named in `text`, in catalogue order.
    ///
    /// A name matches case-insensitively and only as a whole word, so "aspirin" is found in
    /// "Aspirin 75mg daily" but not in "aspirinate".
    pub fn mentions_in(&self, text: &str) -> MedicationResult<Vec<MedicationMention>> {
        let haystack = text.to_lowercase();
        Ok(self
            .store
            .list_medications()?
            .into_iter()
            .filter(|m| mentions_word(&haystack, &m.name))
            .map(|m| MedicationMention {
                warning: m.discontinued.then_some(DISCONTINUED_WARNING),
                name: m.name,
                uses: m.uses,
                side_effects: m.side_effects,
                discontinued: m.discontinued,
                discontinuation_reason: m.discontinuation_reason,
            })
            .collect())
    }

    /// Merges `medications` into the catalogue by name.
    ///
    /// New names are created. Known names are rewritten when any field differs, treating
    /// missing and empty text as equal, and skipped otherwise. Entries with a blank name are
    /// skipped.
    pub fn seed(&self, medications: Vec<NewMedication>) -> MedicationResult<SeedReport> {
        let mut report = SeedReport::default();

        for item in medications {
            if item.name.trim().is_empty() {
                tracing::warn!("skipping seed entry without a name");
                report.skipped += 1;
                continue;
            }
            match self.find_by_name(&item.name)? {
                Some(existing) if differs(&existing, &item) => {
                    let updated = Medication {
                        url: item.url,
                        uses: item.uses,
                        side_effects: item.side_effects,
                        discontinued: item.discontinued,
                        discontinuation_reason: item.discontinuation_reason,
                        updated_at: Some(Utc::now()),
                        ..existing
                    };
                    self.store.update_medication(&updated)?;
                    report.updated += 1;
                }
                Some(_) => report.skipped += 1,
                None => {
                    self.create(item)?;
                    report.created += 1;
                }
            }
        }

        tracing::info!(
            "medication seed: {} created, {} updated, {} skipped",
            report.created,
            report.updated,
            report.skipped
        );
        Ok(report)
    }
}

fn mentions_word(haystack: &str, name: &str) -> bool {
    let needle = name.trim().to_lowercase();
    if needle.is_empty() {
        return false;
    }
    let is_word = |c: char| c.is_alphanumeric() || c == '_';
    haystack.match_indices(needle.as_str()).any(|(start, _)| {
        let before = haystack[..start].chars().next_back();
        let after = haystack[start + needle.len()..].chars().next();
        !before.is_some_and(is_word) && !after.is_some_and(is_word)
    })
}

fn differs(existing: &Medication, item: &NewMedication) -> bool {
    let text = |v: &Option<String>| v.as_deref().filter(|s| !s.is_empty()).map(str::to_string);
    text(&existing.url) != text(&item.url)
        || text(&existing.uses) != text(&item.uses)
        || text(&existing.side_effects) != text(&item.side_effects)
        || existing.discontinued != item.discontinued
        || text(&existing.discontinuation_reason) != text(&item.discontinuation_reason)
}
