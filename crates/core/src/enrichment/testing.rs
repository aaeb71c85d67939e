//! Scripted providers for unit tests.

use super::{EnrichmentRequest, Provider, ProviderError};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// A provider that replays queued responses and counts its calls.
///
/// When the queue runs dry the last response is repeated.
pub struct ScriptedProvider {
    id: String,
    available: bool,
    delay: Duration,
    responses: Mutex<VecDeque<Result<String, ProviderError>>>,
    last: Mutex<Option<Result<String, ProviderError>>>,
    requests: Mutex<Vec<EnrichmentRequest>>,
    calls: AtomicUsize,
}

impl ScriptedProvider {
    pub fn new(id: &str, responses: Vec<Result<String, ProviderError>>) -> Arc<Self> {
        Arc::new(Self {
            id: id.to_string(),
            available: true,
            delay: Duration::ZERO,
            responses: Mutex::new(responses.into()),
            last: Mutex::new(None),
            requests: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn ok(id: &str, content: &str) -> Arc<Self> {
        Self::new(id, vec![Ok(content.to_string())])
    }

    pub fn failing(id: &str, error: ProviderError) -> Arc<Self> {
        Self::new(id, vec![Err(error)])
    }

    pub fn unavailable(id: &str) -> Arc<Self> {
        Arc::new(Self {
            available: false,
            ..Self::plain(id)
        })
    }

    /// Sleeps for `delay` before answering `content`.
    pub fn slow(id: &str, content: &str, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            delay,
            responses: Mutex::new(vec![Ok(content.to_string())].into()),
            ..Self::plain(id)
        })
    }

    fn plain(id: &str) -> Self {
        Self {
            id: id.to_string(),
            available: true,
            delay: Duration::ZERO,
            responses: Mutex::new(VecDeque::new()),
            last: Mutex::new(None),
            requests: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<EnrichmentRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl Provider for ScriptedProvider {
    fn id(&self) -> &str {
        &self.id
    }

    fn is_available(&self) -> bool {
        self.available
    }

    fn enrich(
        &self,
        request: &EnrichmentRequest,
        _timeout: Duration,
    ) -> Result<String, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request.clone());
        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }

        let mut last = self.last.lock().unwrap();
        match self.responses.lock().unwrap().pop_front() {
            Some(response) => {
                *last = Some(response.clone());
                response
            }
            None => last.clone().unwrap_or_else(|| {
                Err(ProviderError::InvalidResponse("no scripted response".into()))
            }),
        }
    }
}

/// Upcast helper for building chains.
pub fn chain(providers: &[&Arc<ScriptedProvider>]) -> Vec<Arc<dyn Provider>> {
    providers
        .iter()
        .map(|p| Arc::clone(*p) as Arc<dyn Provider>)
        .collect()
}
