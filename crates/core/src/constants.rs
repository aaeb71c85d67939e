//! Constants used throughout the core crate.
//!
//! Path names, provider defaults and validation limits live here so that the store, the
//! configuration layer and the adapters agree on them.

/// Default directory for record storage when no explicit directory is configured.
pub const DEFAULT_RECORDS_DATA_DIR: &str = "records_data";

/// Directory name (under the data directory) holding the sharded record folders.
pub const RECORDS_DIR_NAME: &str = "records";

/// Filename of the serialised record inside its sharded folder.
pub const RECORD_YAML_FILENAME: &str = "record.yaml";

/// Record type assigned when the caller does not supply one.
pub const DEFAULT_RECORD_TYPE: &str = "doctor_note";

/// Maximum length of a record title, in characters.
pub const MAX_TITLE_LEN: usize = 200;

/// Page size used by record listings when the caller gives none.
pub const DEFAULT_LIST_LIMIT: usize = 100;

/// Filename of the medication catalogue under the data directory.
pub const MEDICATIONS_FILENAME: &str = "medications.yaml";

/// Page size used by medication searches when the caller gives none.
pub const DEFAULT_MEDICATION_SEARCH_LIMIT: usize = 50;

/// Warning attached to mentions of discontinued medications.
pub const DISCONTINUED_WARNING: &str = "DISCONTINUED";

pub const GROQ_PROVIDER_ID: &str = "groq";
pub const GROQ_DEFAULT_BASE_URL: &str = "https://api.groq.com/openai/v1";
pub const GROQ_DEFAULT_MODEL: &str = "llama-3.3-70b-versatile";

pub const HUGGINGFACE_PROVIDER_ID: &str = "huggingface";
pub const HUGGINGFACE_DEFAULT_BASE_URL: &str = "https://api-inference.huggingface.co/models";
pub const HUGGINGFACE_DEFAULT_MODEL: &str = "meta-llama/Meta-Llama-3-8B-Instruct";

pub const OLLAMA_PROVIDER_ID: &str = "ollama";
pub const OLLAMA_DEFAULT_BASE_URL: &str = "http://localhost:11434";
pub const OLLAMA_DEFAULT_MODEL: &str = "llama3";

/// Per-adapter call budget when `AI_TIMEOUT_SECS` is unset.
pub const DEFAULT_PROVIDER_TIMEOUT_SECS: u64 = 30;

/// Pause before the single retry of a transient provider failure.
pub const DEFAULT_RETRY_BACKOFF_MS: u64 = 500;

pub const DEFAULT_TEMPERATURE: f32 = 0.7;
pub const DEFAULT_MAX_TOKENS: u32 = 2000;
