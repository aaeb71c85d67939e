//! Blocking JSON-over-HTTP plumbing shared by the hosted and local adapters.

use crate::enrichment::ProviderError;
use serde_json::Value;
use std::io;
use std::time::Duration;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Longest slice of an error body kept in a `ProviderError` message.
const MAX_ERROR_BODY_CHARS: usize = 200;

pub(crate) fn agent() -> ureq::Agent {
    ureq::AgentBuilder::new()
        .timeout_connect(CONNECT_TIMEOUT)
        .user_agent(concat!("medical-records-bridge/", env!("CARGO_PKG_VERSION")))
        .build()
}

/// POST `body` to `url` and decode the JSON response, classifying every failure.
pub(crate) fn post_json(
    agent: &ureq::Agent,
    url: &str,
    bearer: Option<&str>,
    body: &Value,
    timeout: Duration,
) -> Result<Value, ProviderError> {
    let mut request = agent
        .post(url)
        .timeout(timeout)
        .set("Content-Type", "application/json")
        .set("Accept", "application/json");
    if let Some(token) = bearer {
        request = request.set("Authorization", &format!("Bearer {token}"));
    }

    match request.send_json(body) {
        Ok(response) => response
            .into_json::<Value>()
            .map_err(|e| ProviderError::InvalidResponse(format!("undecodable JSON body: {e}"))),
        Err(ureq::Error::Status(status, response)) => {
            let body = response.into_string().unwrap_or_default();
            Err(classify_status(status, &body))
        }
        Err(ureq::Error::Transport(transport)) => Err(classify_transport(&transport, timeout)),
    }
}

/// Map a non-2xx status to the provider error taxonomy.
pub(crate) fn classify_status(status: u16, body: &str) -> ProviderError {
    let detail = format!("HTTP {status}: {}", truncate(body.trim()));
    match status {
        401 | 403 => ProviderError::Unauthenticated(detail),
        429 => ProviderError::RateLimited(detail),
        408 | 504 => ProviderError::Unreachable(detail),
        500..=599 => ProviderError::Unreachable(detail),
        _ => ProviderError::InvalidResponse(detail),
    }
}

fn classify_transport(transport: &ureq::Transport, timeout: Duration) -> ProviderError {
    let timed_out = std::error::Error::source(transport)
        .and_then(|source| source.downcast_ref::<io::Error>())
        .is_some_and(|e| matches!(e.kind(), io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock));
    if timed_out {
        ProviderError::Timeout(timeout)
    } else {
        ProviderError::Unreachable(transport.to_string())
    }
}

/// Pull a non-blank string out of `value` at `pointer` (RFC 6901).
pub(crate) fn text_at(value: &Value, pointer: &str) -> Result<String, ProviderError> {
    match value.pointer(pointer).and_then(Value::as_str).map(str::trim) {
        Some(text) if !text.is_empty() => Ok(text.to_string()),
        Some(_) => Err(ProviderError::InvalidResponse(format!(
            "empty content at {pointer}"
        ))),
        None => Err(ProviderError::InvalidResponse(format!(
            "missing content at {pointer}"
        ))),
    }
}

fn truncate(body: &str) -> String {
    body.chars().take(MAX_ERROR_BODY_CHARS).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_classify_status() {
        assert!(matches!(
            classify_status(401, "bad key"),
            ProviderError::Unauthenticated(_)
        ));
        assert!(matches!(
            classify_status(403, ""),
            ProviderError::Unauthenticated(_)
        ));
        assert!(matches!(
            classify_status(429, "slow down"),
            ProviderError::RateLimited(_)
        ));
        assert!(matches!(
            classify_status(503, "loading"),
            ProviderError::Unreachable(_)
        ));
        assert!(matches!(
            classify_status(400, "bad request"),
            ProviderError::InvalidResponse(_)
        ));
    }

    #[test]
    fn test_status_detail_is_truncated() {
        let long = "x".repeat(1_000);
        let ProviderError::InvalidResponse(detail) = classify_status(422, &long) else {
            panic!("422 should be an invalid response");
        };
        assert!(detail.starts_with("HTTP 422: "));
        assert!(detail.len() < 300);
    }

    #[test]
    fn test_text_at() {
        let body = json!({"message": {"content": "  Plain words  "}, "blank": " "});
        assert_eq!(text_at(&body, "/message/content").unwrap(), "Plain words");
        assert!(matches!(
            text_at(&body, "/blank"),
            Err(ProviderError::InvalidResponse(_))
        ));
        assert!(matches!(
            text_at(&body, "/choices/0/message/content"),
            Err(ProviderError::InvalidResponse(_))
        ));
    }

    #[test]
    fn test_unreachable_endpoint_is_classified() {
        // Port 9 on localhost is the discard service and is almost never listening.
        let err = post_json(
            &agent(),
            "http://127.0.0.1:9/api/chat",
            None,
            &json!({}),
            Duration::from_secs(2),
        )
        .expect_err("nothing should be listening");
        assert!(err.is_transient());
    }
}
