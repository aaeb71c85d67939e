//! Record identifiers and sharded-path utilities.
//!
//! Medical records are stored under sharded directories derived from a UUID. To keep path
//! derivation deterministic, identifiers use a *canonical* representation: **32 lowercase
//! hexadecimal characters** (no hyphens), the value produced by
//! `Uuid::new_v4().simple().to_string()`.
//!
//! Canonical form is *required* for externally supplied identifiers (CLI arguments, REST path
//! segments). Use [`RecordId::parse`] to validate an input string; uppercase, hyphenated,
//! wrong-length or non-hex values are rejected.
//!
//! ## Sharded directory layout
//! For a canonical UUID `u`, a record lives under:
//! `parent_dir/<u[0..2]>/<u[2..4]>/<u>/`
//!
//! Example:
//! `records_data/records/55/0e/550e8400e29b41d4a716446655440000/`

mod record_id;

pub use record_id::{RecordId, Uuid};

/// Error type for identifier operations.
#[derive(Debug, thiserror::Error)]
pub enum UuidError {
    /// Invalid input provided
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Result type for identifier operations.
pub type UuidResult<T> = Result<T, UuidError>;
