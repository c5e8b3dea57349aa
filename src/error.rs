// Errors raised by the HTTP client. The UI layer wraps these in
// `anyhow::Error` with context, so only the API boundary is typed.

use reqwest::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    /// The API key contains characters that cannot be sent in a header.
    #[error("API_KEY is not a valid header value")]
    InvalidApiKey,

    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// Non-2xx response. `message` is the server's `message` field when the
    /// body is a JSON error object, otherwise the raw body.
    #[error("{status}: {message}")]
    Status { status: StatusCode, message: String },

    #[error("could not decode response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

impl ApiError {
    /// Build a `Status` error from a response body.
    pub fn from_body(status: StatusCode, body: &str) -> Self {
        let message = serde_json::from_str::<serde_json::Value>(body)
            .ok()
            .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(str::to_owned))
            .unwrap_or_else(|| body.trim().to_string());
        let message = if message.is_empty() {
            status.canonical_reason().unwrap_or("request failed").to_string()
        } else {
            message
        };
        ApiError::Status { status, message }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::Status { status, .. } if *status == StatusCode::NOT_FOUND)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefers_json_message_field() {
        let err = ApiError::from_body(
            StatusCode::BAD_REQUEST,
            r#"{"message":"request/body must have required property 'name'"}"#,
        );
        assert_eq!(
            err.to_string(),
            "400 Bad Request: request/body must have required property 'name'"
        );
    }

    #[test]
    fn falls_back_to_raw_body_then_reason() {
        let err = ApiError::from_body(StatusCode::BAD_GATEWAY, "upstream down\n");
        assert_eq!(err.to_string(), "502 Bad Gateway: upstream down");

        let err = ApiError::from_body(StatusCode::NOT_FOUND, "");
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "404 Not Found: Not Found");
    }
}
