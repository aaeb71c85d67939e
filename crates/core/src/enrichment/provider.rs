//! Provider adapter contract.

use super::EnrichmentRequest;
use std::time::Duration;

/// Why a provider call failed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProviderError {
    /// Credential missing or rejected. Never retried.
    #[error("credential rejected: {0}")]
    Unauthenticated(String),
    /// Backend is throttling. The next provider is tried immediately.
    #[error("rate limited: {0}")]
    RateLimited(String),
    #[error("call exceeded {0:?}")]
    Timeout(Duration),
    /// Network or connection failure, or a backend-side 5xx.
    #[error("unreachable: {0}")]
    Unreachable(String),
    /// Backend answered with something that is not usable plain text.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl ProviderError {
    /// Transient failures get one retry before the orchestrator moves on.
    pub fn is_transient(&self) -> bool {
        matches!(self, ProviderError::Timeout(_) | ProviderError::Unreachable(_))
    }
}

/// A uniform wrapper around one AI backend.
///
/// Adapters are stateless apart from their configuration and must be safe to call from
/// several threads at once.
pub trait Provider: Send + Sync {
    /// Stable identifier reported as `provider_used`.
    fn id(&self) -> &str;

    /// Whether the adapter is configured well enough to attempt a call (credential present,
    /// endpoint set). Unavailable adapters are skipped without being called.
    fn is_available(&self) -> bool;

    /// Perform one call, giving up after `timeout`.
    ///
    /// # Errors
    ///
    /// Returns a [`ProviderError`] classifying the failure.
    fn enrich(&self, request: &EnrichmentRequest, timeout: Duration)
        -> Result<String, ProviderError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_timeouts_and_unreachable_are_transient() {
        assert!(ProviderError::Timeout(Duration::from_secs(1)).is_transient());
        assert!(ProviderError::Unreachable("refused".into()).is_transient());
        assert!(!ProviderError::RateLimited("429".into()).is_transient());
        assert!(!ProviderError::Unauthenticated("401".into()).is_transient());
        assert!(!ProviderError::InvalidResponse("empty".into()).is_transient());
    }
}
