//! Core runtime configuration.
//!
//! This module defines configuration that should be resolved once at process startup and then
//! passed into core services. The intent is to avoid reading process-wide environment variables
//! during request handling, which can lead to inconsistent behaviour in multi-threaded runtimes
//! and test harnesses.
//!
//! Binaries resolve values with a lookup closure (normally `|key| std::env::var(key).ok()`);
//! tests pass a map instead.

use crate::constants::{
    DEFAULT_MAX_TOKENS, DEFAULT_PROVIDER_TIMEOUT_SECS, DEFAULT_RECORDS_DATA_DIR,
    DEFAULT_RETRY_BACKOFF_MS, DEFAULT_TEMPERATURE, GROQ_DEFAULT_BASE_URL, GROQ_DEFAULT_MODEL,
    HUGGINGFACE_DEFAULT_BASE_URL, HUGGINGFACE_DEFAULT_MODEL, MEDICATIONS_FILENAME,
    OLLAMA_DEFAULT_BASE_URL, OLLAMA_DEFAULT_MODEL, RECORDS_DIR_NAME,
};
use crate::{RecordError, RecordResult};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Core configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct CoreConfig {
    records_data_dir: PathBuf,
    medications_seed_file: Option<PathBuf>,
    ai: AiConfig,
}

impl CoreConfig {
    /// Create a new `CoreConfig`.
    pub fn new(records_data_dir: PathBuf, ai: AiConfig) -> Self {
        Self {
            records_data_dir,
            medications_seed_file: None,
            ai,
        }
    }

    /// Catalogue file merged into the medication store at startup.
    pub fn with_medications_seed_file(mut self, path: Option<PathBuf>) -> Self {
        self.medications_seed_file = path;
        self
    }

    pub fn records_data_dir(&self) -> &Path {
        &self.records_data_dir
    }

    /// Directory holding the sharded record folders.
    pub fn records_dir(&self) -> PathBuf {
        self.records_data_dir.join(RECORDS_DIR_NAME)
    }

    /// YAML file holding the medication catalogue.
    pub fn medications_file(&self) -> PathBuf {
        self.records_data_dir.join(MEDICATIONS_FILENAME)
    }

    pub fn medications_seed_file(&self) -> Option<&Path> {
        self.medications_seed_file.as_deref()
    }

    pub fn ai(&self) -> &AiConfig {
        &self.ai
    }

    /// Resolve the whole configuration from a key lookup.
    ///
    /// # Errors
    ///
    /// Returns `RecordError::InvalidInput` if any numeric AI setting fails to parse.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> RecordResult<Self> {
        let records_data_dir = non_empty(lookup("RECORDS_DATA_DIR"))
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_RECORDS_DATA_DIR));
        let seed_file = non_empty(lookup("MEDICATIONS_SEED_FILE")).map(PathBuf::from);
        let ai = AiConfig::from_lookup(lookup)?;
        Ok(Self::new(records_data_dir, ai).with_medications_seed_file(seed_file))
    }
}

/// Connection settings for one AI backend.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProviderSettings {
    /// Base URL of the backend. An empty value disables credential-less providers.
    pub base_url: String,
    /// Bearer credential, when the backend needs one.
    pub api_key: Option<String>,
    /// Model identifier sent with every request.
    pub model: String,
}

impl ProviderSettings {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>, model: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            model: model.into(),
        }
    }

    /// Base URL without a trailing slash, for joining endpoint paths.
    pub fn base_url_trimmed(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }
}

/// Settings for the enrichment subsystem: one block per provider plus the global call policy.
#[derive(Clone, Debug)]
pub struct AiConfig {
    pub groq: ProviderSettings,
    pub huggingface: ProviderSettings,
    pub ollama: ProviderSettings,
    /// Upper bound on a single provider call.
    pub provider_timeout: Duration,
    /// Pause before retrying a transient failure.
    pub retry_backoff: Duration,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            groq: ProviderSettings::new(GROQ_DEFAULT_BASE_URL, None, GROQ_DEFAULT_MODEL),
            huggingface: ProviderSettings::new(
                HUGGINGFACE_DEFAULT_BASE_URL,
                None,
                HUGGINGFACE_DEFAULT_MODEL,
            ),
            ollama: ProviderSettings::new(OLLAMA_DEFAULT_BASE_URL, None, OLLAMA_DEFAULT_MODEL),
            provider_timeout: Duration::from_secs(DEFAULT_PROVIDER_TIMEOUT_SECS),
            retry_backoff: Duration::from_millis(DEFAULT_RETRY_BACKOFF_MS),
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }
}

impl AiConfig {
    /// Resolve AI settings from a key lookup, falling back to defaults for absent keys.
    ///
    /// `OLLAMA_BASE_URL` is special: when present but empty it disables the local provider.
    ///
    /// # Errors
    ///
    /// Returns `RecordError::InvalidInput` naming the offending key if a numeric value is
    /// malformed or out of range.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> RecordResult<Self> {
        let defaults = Self::default();

        let groq = ProviderSettings::new(
            non_empty(lookup("GROQ_BASE_URL")).unwrap_or(defaults.groq.base_url),
            lookup("GROQ_API_KEY"),
            non_empty(lookup("GROQ_MODEL")).unwrap_or(defaults.groq.model),
        );
        let huggingface = ProviderSettings::new(
            non_empty(lookup("HUGGINGFACE_BASE_URL")).unwrap_or(defaults.huggingface.base_url),
            lookup("HUGGINGFACE_API_KEY"),
            non_empty(lookup("HUGGINGFACE_MODEL")).unwrap_or(defaults.huggingface.model),
        );
        let ollama = ProviderSettings::new(
            lookup("OLLAMA_BASE_URL")
                .map(|v| v.trim().to_string())
                .unwrap_or(defaults.ollama.base_url),
            None,
            non_empty(lookup("OLLAMA_MODEL")).unwrap_or(defaults.ollama.model),
        );

        let provider_timeout = parse_number::<u64>(&lookup, "AI_TIMEOUT_SECS")?
            .map(Duration::from_secs)
            .unwrap_or(defaults.provider_timeout);
        if provider_timeout.is_zero() {
            return Err(RecordError::InvalidInput(
                "AI_TIMEOUT_SECS must be greater than zero".into(),
            ));
        }

        let retry_backoff = parse_number::<u64>(&lookup, "AI_RETRY_BACKOFF_MS")?
            .map(Duration::from_millis)
            .unwrap_or(defaults.retry_backoff);

        let temperature =
            parse_number::<f32>(&lookup, "AI_TEMPERATURE")?.unwrap_or(defaults.temperature);
        if !(0.0..=2.0).contains(&temperature) {
            return Err(RecordError::InvalidInput(
                "AI_TEMPERATURE must be between 0.0 and 2.0".into(),
            ));
        }

        let max_tokens =
            parse_number::<u32>(&lookup, "AI_MAX_TOKENS")?.unwrap_or(defaults.max_tokens);

        Ok(Self {
            groq,
            huggingface,
            ollama,
            provider_timeout,
            retry_backoff,
            temperature,
            max_tokens,
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_number<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> RecordResult<Option<T>> {
    non_empty(lookup(key))
        .map(|v| {
            v.parse::<T>()
                .map_err(|_| RecordError::InvalidInput(format!("{key} is not a valid number: {v}")))
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_nothing_set() {
        let cfg = AiConfig::from_lookup(lookup_from(&[])).expect("defaults should resolve");

        assert_eq!(cfg.groq.api_key, None);
        assert_eq!(cfg.groq.model, GROQ_DEFAULT_MODEL);
        assert_eq!(cfg.huggingface.api_key, None);
        assert_eq!(cfg.ollama.base_url, OLLAMA_DEFAULT_BASE_URL);
        assert_eq!(
            cfg.provider_timeout,
            Duration::from_secs(DEFAULT_PROVIDER_TIMEOUT_SECS)
        );
        assert_eq!(cfg.max_tokens, DEFAULT_MAX_TOKENS);
    }

    #[test]
    fn test_reads_credentials_and_overrides() {
        let cfg = AiConfig::from_lookup(lookup_from(&[
            ("GROQ_API_KEY", "gsk_test"),
            ("GROQ_MODEL", "llama-3.1-8b-instant"),
            ("HUGGINGFACE_API_KEY", "hf_test"),
            ("AI_TIMEOUT_SECS", "5"),
            ("AI_RETRY_BACKOFF_MS", "0"),
        ]))
        .unwrap();

        assert_eq!(cfg.groq.api_key.as_deref(), Some("gsk_test"));
        assert_eq!(cfg.groq.model, "llama-3.1-8b-instant");
        assert_eq!(cfg.huggingface.api_key.as_deref(), Some("hf_test"));
        assert_eq!(cfg.provider_timeout, Duration::from_secs(5));
        assert_eq!(cfg.retry_backoff, Duration::ZERO);
    }

    #[test]
    fn test_blank_credential_is_treated_as_missing() {
        let cfg = AiConfig::from_lookup(lookup_from(&[("GROQ_API_KEY", "   ")])).unwrap();
        assert_eq!(cfg.groq.api_key, None);
    }

    #[test]
    fn test_empty_ollama_url_disables_local_provider() {
        let cfg = AiConfig::from_lookup(lookup_from(&[("OLLAMA_BASE_URL", "")])).unwrap();
        assert!(cfg.ollama.base_url.is_empty());
    }

    #[test]
    fn test_rejects_malformed_numbers() {
        let err = AiConfig::from_lookup(lookup_from(&[("AI_TIMEOUT_SECS", "soon")]))
            .expect_err("should reject non-numeric timeout");
        assert!(err.to_string().contains("AI_TIMEOUT_SECS"));

        assert!(AiConfig::from_lookup(lookup_from(&[("AI_TIMEOUT_SECS", "0")])).is_err());
        assert!(AiConfig::from_lookup(lookup_from(&[("AI_TEMPERATURE", "3.5")])).is_err());
    }

    #[test]
    fn test_core_config_records_dir() {
        let cfg = CoreConfig::from_lookup(lookup_from(&[("RECORDS_DATA_DIR", "/tmp/mrb")]))
            .unwrap();
        assert_eq!(cfg.records_data_dir(), Path::new("/tmp/mrb"));
        assert_eq!(cfg.records_dir(), Path::new("/tmp/mrb").join(RECORDS_DIR_NAME));
        assert_eq!(cfg.medications_file(), Path::new("/tmp/mrb/medications.yaml"));
        assert_eq!(cfg.medications_seed_file(), None);
    }

    #[test]
    fn test_core_config_medications_seed_file() {
        let cfg = CoreConfig::from_lookup(lookup_from(&[(
            "MEDICATIONS_SEED_FILE",
            "data/medications_data.json",
        )]))
        .unwrap();
        assert_eq!(
            cfg.medications_seed_file(),
            Some(Path::new("data/medications_data.json"))
        );
    }

    #[test]
    fn test_base_url_trimmed() {
        let settings = ProviderSettings::new("http://localhost:11434/", None, "llama3");
        assert_eq!(settings.base_url_trimmed(), "http://localhost:11434");
    }
}
