//! # MRB Core
//!
//! Core logic for the Medical Records Bridge.
//!
//! This crate contains pure data operations and the AI enrichment subsystem:
//! - Medical record storage (sharded YAML files under `RECORDS_DATA_DIR`) and owner-scoped CRUD
//! - Provider adapters for Groq, Hugging Face and Ollama
//! - Ordered provider fallback with per-adapter deadlines
//! - Enrichment caching tied to record text
//! - A medication reference catalogue with mention extraction over free text
//!
//! **No API concerns**: Authentication and HTTP servers belong in `api-rest` or `api-shared`.

pub mod config;
pub mod constants;
pub mod enrichment;
pub mod error;
pub mod medications;
pub mod records;

pub use config::{AiConfig, CoreConfig, ProviderSettings};
pub use enrichment::{
    EnrichmentError, EnrichmentPurpose, EnrichmentRequest, EnrichmentResult, EnrichmentService,
    FallbackOrchestrator,
};
pub use error::{MedicationError, MedicationResult, RecordError, RecordResult};
pub use medications::{
    FileMedicationStore, InMemoryMedicationStore, Medication, MedicationMention, MedicationPage,
    MedicationService, MedicationStore, NewMedication, SeedReport,
};
pub use records::{
    CacheField, CachedEnrichment, FileRecordStore, InMemoryRecordStore, MedicalRecord, NewRecord,
    RecordService, RecordStore, RecordSummary, RecordUpdate,
};

pub use mrb_types::NonEmptyText;
pub use mrb_uuid::RecordId;
