#[allow(clippy::single_component_path_imports)]
use serde_yaml;

#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("medical record not found: {0}")]
    NotFound(String),
    #[error("failed to create storage directory: {0}")]
    StorageDirCreation(std::io::Error),
    #[error("failed to create record directory: {0}")]
    RecordDirCreation(std::io::Error),
    #[error("failed to write record file: {0}")]
    FileWrite(std::io::Error),
    #[error("failed to read record file: {0}")]
    FileRead(std::io::Error),
    #[error("failed to remove record directory: {0}")]
    FileRemove(std::io::Error),
    #[error("failed to serialize YAML: {0}")]
    YamlSerialization(serde_yaml::Error),
    #[error("failed to deserialize YAML: {0}")]
    YamlDeserialization(serde_yaml::Error),
    #[error("record store lock poisoned")]
    LockPoisoned,
}

impl From<mrb_uuid::UuidError> for RecordError {
    fn from(err: mrb_uuid::UuidError) -> Self {
        RecordError::InvalidInput(err.to_string())
    }
}

pub type RecordResult<T> = std::result::Result<T, RecordError>;

#[derive(Debug, thiserror::Error)]
pub enum MedicationError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("medication not found: {0}")]
    NotFound(String),
    #[error("medication already exists: {0}")]
    AlreadyExists(String),
    #[error("failed to read medication catalogue: {0}")]
    FileRead(std::io::Error),
    #[error("failed to write medication catalogue: {0}")]
    FileWrite(std::io::Error),
    #[error("failed to serialize YAML: {0}")]
    YamlSerialization(serde_yaml::Error),
    #[error("failed to parse medication catalogue: {0}")]
    Parse(String),
    #[error("medication store lock poisoned")]
    LockPoisoned,
}

pub type MedicationResult<T> = std::result::Result<T, MedicationError>;
