//! Canonical record identifier.

use crate::{UuidError, UuidResult};
use std::path::{Path, PathBuf};
use std::{fmt, str::FromStr};

/// Re-exported for convenience.
pub use ::uuid::Uuid;

/// Canonical record identifier (32 lowercase hex characters, no hyphens).
///
/// Once constructed the contained UUID is guaranteed to be canonical, so it can be used to
/// derive storage paths without further checks.
///
/// - [`RecordId::new`] allocates a fresh identifier for a new record.
/// - [`RecordId::parse`] validates an externally supplied identifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RecordId(Uuid);

impl Default for RecordId {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordId {
    /// Generates a new random (v4) identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Validates and parses an identifier that must already be in canonical form.
    ///
    /// This does **not** normalise other UUID spellings (hyphenated, uppercase).
    ///
    /// # Errors
    ///
    /// Returns [`UuidError::InvalidInput`] if `input` is not canonical.
    pub fn parse(input: &str) -> UuidResult<Self> {
        if !Self::is_canonical(input) {
            return Err(UuidError::InvalidInput(format!(
                "record id must be 32 lowercase hex characters without hyphens, got: '{}'",
                input
            )));
        }
        Uuid::parse_str(input)
            .map(Self)
            .map_err(|e| UuidError::InvalidInput(e.to_string()))
    }

    /// Returns the underlying `uuid::Uuid`.
    pub fn uuid(&self) -> Uuid {
        self.0
    }

    /// Returns true if `input` is exactly 32 lowercase hex characters.
    pub fn is_canonical(input: &str) -> bool {
        input.len() == 32
            && input
                .bytes()
                .all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
    }

    /// Returns `parent_dir/<s1>/<s2>/<id>/` where `s1`/`s2` are the first two pairs of hex
    /// characters of the identifier.
    pub fn sharded_dir(&self, parent_dir: &Path) -> PathBuf {
        let canonical = self.0.simple().to_string();
        let s1 = &canonical[0..2];
        let s2 = &canonical[2..4];
        parent_dir.join(s1).join(s2).join(&canonical)
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.simple())
    }
}

impl FromStr for RecordId {
    type Err = UuidError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RecordId::parse(s)
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for RecordId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for RecordId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        RecordId::parse(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use tempfile::TempDir;

    #[test]
    fn test_round_trip_new_to_string_to_parse() {
        let id = RecordId::new();
        let s = id.to_string();
        assert_eq!(s.len(), 32);
        assert!(RecordId::is_canonical(&s));

        let parsed = RecordId::parse(&s).expect("canonical id should parse");
        assert_eq!(parsed, id);
    }

    #[test]
    fn test_parse_rejects_non_canonical_forms() {
        let id = RecordId::new();
        let hyphenated = id.uuid().hyphenated().to_string();
        let upper = id.to_string().to_uppercase();

        assert!(RecordId::parse(&hyphenated).is_err());
        assert!(RecordId::parse(&upper).is_err());
        assert!(RecordId::parse("abc").is_err());
        assert!(RecordId::parse("zz0e8400e29b41d4a716446655440000").is_err());
        assert!(RecordId::parse("").is_err());
    }

    #[test]
    fn test_from_str_matches_parse() {
        let s = "550e8400e29b41d4a716446655440000";
        let via_from_str: RecordId = s.parse().expect("should parse");
        assert_eq!(via_from_str, RecordId::parse(s).unwrap());
    }

    #[test]
    fn test_sharded_dir_layout() {
        let temp = TempDir::new().unwrap();
        let id = RecordId::parse("550e8400e29b41d4a716446655440000").unwrap();
        let dir = id.sharded_dir(temp.path());

        assert_eq!(
            dir,
            temp.path()
                .join("55")
                .join("0e")
                .join("550e8400e29b41d4a716446655440000")
        );
    }

    #[test]
    fn test_hash_consistency() {
        let id = RecordId::new();
        let mut set = HashSet::new();
        set.insert(id);
        set.insert(RecordId::parse(&id.to_string()).unwrap());
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_serde_uses_canonical_string() {
        let id = RecordId::parse("550e8400e29b41d4a716446655440000").unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"550e8400e29b41d4a716446655440000\"");

        let back: RecordId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);

        let bad: Result<RecordId, _> =
            serde_json::from_str("\"550e8400-e29b-41d4-a716-446655440000\"");
        assert!(bad.is_err());
    }
}
