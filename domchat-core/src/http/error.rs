//! HTTP error mapping utilities

use crate::providers::{ProviderError, ProviderType};
use reqwest::StatusCode;
use serde_json::Value;
use uuid::Uuid;

/// Message used when an error body carries nothing readable
pub const UNPARSEABLE_ERROR_BODY: &str = "(Failed to parse error response)";

/// Map a non-success status and its body to a ProviderError
pub fn map_http_error(
    provider: ProviderType,
    status: StatusCode,
    body: Option<&str>,
    request_id: Uuid,
) -> ProviderError {
    let message = body
        .and_then(|b| serde_json::from_str::<Value>(b).ok())
        .and_then(|v| extract_error_message(&v))
        .unwrap_or_else(|| UNPARSEABLE_ERROR_BODY.to_string());

    tracing::debug!(
        "Mapped {} status {} to error: {} [request_id: {}]",
        provider,
        status.as_u16(),
        message,
        request_id
    );

    ProviderError::Http {
        provider,
        status: status.as_u16(),
        message,
    }
}

/// Extract the human-readable message from a provider error body
pub fn extract_error_message(json: &Value) -> Option<String> {
    // Gemini streaming endpoints wrap the error in an array
    if let Some(first) = json.as_array().and_then(|items| items.first()) {
        return extract_error_message(first);
    }

    // OpenAI, Anthropic and Gemini: { "error": { "message": "..." } }
    if let Some(message) = json
        .get("error")
        .and_then(|e| e.get("message"))
        .and_then(Value::as_str)
    {
        return Some(message.to_string());
    }

    // Ollama: { "error": "..." }
    if let Some(error) = json.get("error").and_then(Value::as_str) {
        return Some(error.to_string());
    }

    // Generic: { "message": "..." }
    json.get("message")
        .and_then(Value::as_str)
        .map(str::to_string)
}

/// Map a reqwest transport failure
pub fn map_transport_error(
    provider: ProviderType,
    err: &reqwest::Error,
    request_id: Uuid,
) -> ProviderError {
    if err.is_timeout() {
        tracing::warn!("Request timeout for {} [request_id: {}]", provider, request_id);
        ProviderError::Timeout { provider }
    } else if err.is_connect() {
        tracing::error!(
            "Connection error for {} [request_id: {}]: {}",
            provider,
            request_id,
            err
        );
        ProviderError::Network {
            provider,
            message: format!("Connection failed: {}", err),
        }
    } else {
        tracing::error!(
            "Request error for {} [request_id: {}]: {}",
            provider,
            request_id,
            err
        );
        ProviderError::Network {
            provider,
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(r#"{"error":{"type":"invalid_request_error","message":"Incorrect API key provided"}}"#, "Incorrect API key provided"; "nested error object")]
    #[test_case(r#"{"error":"model 'llama9' not found"}"#, "model 'llama9' not found"; "error string")]
    #[test_case(r#"{"message":"Quota exceeded"}"#, "Quota exceeded"; "top level message")]
    #[test_case(r#"[{"error":{"code":400,"message":"API key not valid","status":"INVALID_ARGUMENT"}}]"#, "API key not valid"; "error wrapped in array")]
    #[test_case("[]", UNPARSEABLE_ERROR_BODY; "empty array")]
    #[test_case("<html>Bad Gateway</html>", UNPARSEABLE_ERROR_BODY; "not json")]
    #[test_case(r#"{"detail":"nope"}"#, UNPARSEABLE_ERROR_BODY; "json without message")]
    fn test_error_body_message(body: &str, expected: &str) {
        let err = map_http_error(
            ProviderType::OpenAI,
            StatusCode::UNAUTHORIZED,
            Some(body),
            Uuid::new_v4(),
        );
        match err {
            ProviderError::Http { status, message, .. } => {
                assert_eq!(status, 401);
                assert_eq!(message, expected);
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_missing_body_uses_fallback() {
        let err = map_http_error(
            ProviderType::Gemini,
            StatusCode::INTERNAL_SERVER_ERROR,
            None,
            Uuid::new_v4(),
        );
        assert!(err.to_string().contains(UNPARSEABLE_ERROR_BODY));
        assert!(err.to_string().contains("500"));
    }
}
