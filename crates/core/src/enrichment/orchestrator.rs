//! Ordered provider fallback.
//!
//! Adapters are tried strictly in construction order. For each one:
//!
//! 1. unavailable adapters are skipped (and noted in the diagnostics),
//! 2. the call runs on a worker thread and is abandoned once the adapter's deadline passes,
//! 3. `Timeout` and `Unreachable` failures are retried once after the configured backoff, if
//!    the deadline leaves room for it,
//! 4. any other failure moves straight on to the next adapter.
//!
//! Each adapter gets one deadline, `timeout` after its first call starts, covering the retry and
//! the backoff before it. The first non-blank answer wins. Given the same adapter availability, the same request
//! always visits adapters in the same sequence.

use super::{providers, EnrichmentRequest, EnrichmentResult, Provider, ProviderError};
use crate::config::AiConfig;
use std::fmt;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// What happened when the orchestrator reached one adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    /// Skipped: not configured. Not counted as a failure.
    Unavailable,
    Failed(ProviderError),
}

/// Diagnostics for one adapter visited during a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderAttempt {
    pub provider: String,
    pub outcome: AttemptOutcome,
}

impl fmt::Display for ProviderAttempt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.outcome {
            AttemptOutcome::Unavailable => write!(f, "{}: not configured", self.provider),
            AttemptOutcome::Failed(err) => write!(f, "{}: {}", self.provider, err),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum OrchestratorError {
    #[error("all AI providers exhausted [{}]", describe(.attempts))]
    AllProvidersExhausted { attempts: Vec<ProviderAttempt> },
}

fn describe(attempts: &[ProviderAttempt]) -> String {
    if attempts.is_empty() {
        return "no providers configured".to_string();
    }
    attempts
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Tries providers in priority order and returns the first usable answer.
#[derive(Clone)]
pub struct FallbackOrchestrator {
    providers: Vec<Arc<dyn Provider>>,
    timeout: Duration,
    retry_backoff: Duration,
}

impl FallbackOrchestrator {
    pub fn new(
        providers: Vec<Arc<dyn Provider>>,
        timeout: Duration,
        retry_backoff: Duration,
    ) -> Self {
        Self {
            providers,
            timeout,
            retry_backoff,
        }
    }

    /// The production chain: Groq, Hugging Face, Ollama.
    pub fn from_config(cfg: &AiConfig) -> Self {
        Self::new(
            providers::default_chain(cfg),
            cfg.provider_timeout,
            cfg.retry_backoff,
        )
    }

    pub fn provider_ids(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.id()).collect()
    }

    /// Whether at least one adapter would be attempted.
    pub fn has_available_provider(&self) -> bool {
        self.providers.iter().any(|p| p.is_available())
    }

    /// Produce one result for `request`.
    ///
    /// # Errors
    ///
    /// Returns [`OrchestratorError::AllProvidersExhausted`] carrying one entry per adapter,
    /// in order, when no adapter produced a usable answer.
    pub fn run(&self, request: &EnrichmentRequest) -> Result<EnrichmentResult, OrchestratorError> {
        let mut attempts = Vec::with_capacity(self.providers.len());

        for provider in &self.providers {
            if !provider.is_available() {
                tracing::debug!("provider {} not configured; skipping", provider.id());
                attempts.push(ProviderAttempt {
                    provider: provider.id().to_string(),
                    outcome: AttemptOutcome::Unavailable,
                });
                continue;
            }

            match self.call_with_retry(provider, request) {
                Ok(content) => {
                    tracing::info!(
                        "{:?} enrichment served by {}",
                        request.purpose,
                        provider.id()
                    );
                    return Ok(EnrichmentResult::fresh(content, provider.id()));
                }
                Err(err) => {
                    tracing::warn!("provider {} failed: {}", provider.id(), err);
                    attempts.push(ProviderAttempt {
                        provider: provider.id().to_string(),
                        outcome: AttemptOutcome::Failed(err),
                    });
                }
            }
        }

        Err(OrchestratorError::AllProvidersExhausted { attempts })
    }

    fn call_with_retry(
        &self,
        provider: &Arc<dyn Provider>,
        request: &EnrichmentRequest,
    ) -> Result<String, ProviderError> {
        let deadline = Instant::now() + self.timeout;
        match self.call_bounded(provider, request, self.timeout) {
            Err(err) if err.is_transient() => {
                let remaining = deadline.saturating_duration_since(Instant::now());
                if remaining <= self.retry_backoff {
                    tracing::debug!(
                        "provider {} transient failure ({}); no time left to retry",
                        provider.id(),
                        err
                    );
                    return Err(err);
                }
                tracing::debug!(
                    "provider {} transient failure ({}); retrying in {:?}",
                    provider.id(),
                    err,
                    self.retry_backoff
                );
                if !self.retry_backoff.is_zero() {
                    thread::sleep(self.retry_backoff);
                }
                let budget = deadline.saturating_duration_since(Instant::now());
                if budget.is_zero() {
                    return Err(err);
                }
                self.call_bounded(provider, request, budget)
            }
            other => other,
        }
    }

    /// Run one call on a worker thread, waiting at most `timeout`. A call that overruns keeps
    /// running to completion on its thread; its answer is discarded.
    fn call_bounded(
        &self,
        provider: &Arc<dyn Provider>,
        request: &EnrichmentRequest,
        timeout: Duration,
    ) -> Result<String, ProviderError> {
        let (tx, rx) = mpsc::channel();
        let worker = Arc::clone(provider);
        let owned_request = request.clone();

        thread::Builder::new()
            .name(format!("enrich-{}", provider.id()))
            .spawn(move || {
                // The receiver is gone if the call overran; nothing to report then.
                let _ = tx.send(worker.enrich(&owned_request, timeout));
            })
            .map_err(|e| ProviderError::Unreachable(format!("failed to spawn worker: {e}")))?;

        let content = match rx.recv_timeout(timeout) {
            Ok(result) => result?,
            Err(RecvTimeoutError::Timeout) => return Err(ProviderError::Timeout(timeout)),
            Err(RecvTimeoutError::Disconnected) => {
                return Err(ProviderError::InvalidResponse(
                    "provider worker exited without answering".into(),
                ))
            }
        };

        let trimmed = content.trim();
        if trimmed.is_empty() {
            return Err(ProviderError::InvalidResponse("empty content".into()));
        }
        Ok(trimmed.to_string())
    }
}
