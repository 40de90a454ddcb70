// Request failures surfaced by the API client.

use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RequestError {
    /// The backend answered with a non-2xx status. `message` is meant for
    /// display as-is.
    #[error("{message}")]
    Status { status: u16, message: String },

    #[error("network error: {0}")]
    Transport(String),

    #[error("failed to decode response: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("failed to encode request: {0}")]
    Encode(#[source] serde_json::Error),
}

impl RequestError {
    /// Build the error for a non-2xx response.
    ///
    /// Uses the body's `message` field when the body is a JSON object with a
    /// non-empty string `message`; otherwise falls back to
    /// `Request failed with status N`.
    pub fn from_status(status: u16, body: &str) -> Self {
        let message = serde_json::from_str::<Value>(body)
            .ok()
            .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_string))
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| format!("Request failed with status {status}"));
        RequestError::Status { status, message }
    }

    /// HTTP status when the backend responded, `None` for local failures.
    pub fn status(&self) -> Option<u16> {
        match self {
            RequestError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_field_is_used_verbatim() {
        let err = RequestError::from_status(404, r#"{"message":"not found"}"#);
        assert_eq!(err.to_string(), "not found");
        assert!(err.is_not_found());
    }

    #[test]
    fn unparseable_body_falls_back_to_status() {
        let err = RequestError::from_status(500, "<html>Internal Server Error</html>");
        assert_eq!(err.to_string(), "Request failed with status 500");
        assert_eq!(err.status(), Some(500));
    }

    #[test]
    fn missing_or_empty_message_falls_back_to_status() {
        for body in [r#"{}"#, r#"{"message":""}"#, r#"{"message":42}"#, r#"["x"]"#, ""] {
            let err = RequestError::from_status(422, body);
            assert_eq!(err.to_string(), "Request failed with status 422", "body: {body}");
        }
    }

    #[test]
    fn transport_error_has_no_status() {
        let err = RequestError::Transport("connection refused".into());
        assert_eq!(err.status(), None);
        assert_eq!(err.to_string(), "network error: connection refused");
    }
}
