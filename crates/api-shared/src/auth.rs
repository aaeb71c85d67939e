//! API key gate shared by the HTTP entry points.
//!
//! Callers present the key in the `x-api-key` header and identify themselves with `x-user-id`.
//! The expected key is resolved once at startup from `API_KEY`.

/// Header carrying the shared API key.
pub const API_KEY_HEADER: &str = "x-api-key";

/// Header carrying the calling user's identifier.
pub const USER_ID_HEADER: &str = "x-user-id";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("API_KEY not set in environment")]
    NotConfigured,
    #[error("Missing x-api-key header")]
    MissingKey,
    #[error("Invalid API key")]
    InvalidKey,
    #[error("Missing x-user-id header")]
    MissingUser,
}

/// Validates the provided API key against the configured one.
///
/// Returns `Ok(())` if the key is valid, or an error if invalid, missing, or if no key is
/// configured at all.
pub fn validate_api_key(provided_key: Option<&str>, expected_key: Option<&str>) -> Result<(), AuthError> {
    let expected_key = expected_key
        .filter(|k| !k.is_empty())
        .ok_or(AuthError::NotConfigured)?;
    let provided_key = provided_key.ok_or(AuthError::MissingKey)?;

    if provided_key == expected_key {
        Ok(())
    } else {
        Err(AuthError::InvalidKey)
    }
}

/// Extracts a non-blank user id from the `x-user-id` header value.
pub fn validate_user_id(header: Option<&str>) -> Result<String, AuthError> {
    header
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .ok_or(AuthError::MissingUser)
}
