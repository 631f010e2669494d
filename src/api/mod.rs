use async_trait::async_trait;
use serde_json::Value;
use std::fmt;

mod http;
pub mod stub;

pub use http::HttpBackend;
pub use stub::StubBackend;

/// Write verbs used by forms and item actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    Post,
    Put,
    Delete,
}

impl Verb {
    pub fn as_str(&self) -> &'static str {
        match self {
            Verb::Post => "POST",
            Verb::Put => "PUT",
            Verb::Delete => "DELETE",
        }
    }
}

/// Why a request produced no usable payload.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchError {
    /// Connection refused, timeout, DNS and friends.
    Transport(String),
    /// Non-2xx status; `message` is the body's `error` field when present.
    Status { code: u16, message: Option<String> },
    /// Body was not valid JSON or did not have the expected shape.
    Parse(String),
}

impl FetchError {
    /// Text suitable for a user notice.
    pub fn user_message(&self) -> String {
        match self {
            FetchError::Status { message: Some(m), .. } => m.clone(),
            FetchError::Status { code, .. } => format!("request failed with status {}", code),
            FetchError::Transport(_) => "backend unreachable".to_string(),
            FetchError::Parse(_) => "unexpected response".to_string(),
        }
    }
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchError::Transport(e) => write!(f, "transport error: {}", e),
            FetchError::Status { code, message } => match message {
                Some(m) => write!(f, "status {}: {}", code, m),
                None => write!(f, "status {}", code),
            },
            FetchError::Parse(e) => write!(f, "parse error: {}", e),
        }
    }
}

impl std::error::Error for FetchError {}

impl From<serde_json::Error> for FetchError {
    fn from(err: serde_json::Error) -> Self {
        FetchError::Parse(err.to_string())
    }
}

/// The dashboard backend as seen from the client.
///
/// `path` is the request path including any query string, e.g.
/// `/api/joke-history?page=2&per_page=5`.
#[async_trait]
pub trait Backend: Send + Sync {
    async fn get(&self, path: &str) -> Result<Value, FetchError>;
    async fn send(&self, verb: Verb, path: &str, body: Option<Value>) -> Result<Value, FetchError>;
}

/// Pull the `error` string out of a JSON body, if it has one.
pub fn error_field(body: &Value) -> Option<String> {
    body.get("error")
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_error_field() {
        assert_eq!(error_field(&json!({"error": "bad address"})).as_deref(), Some("bad address"));
        assert_eq!(error_field(&json!({"error": "  "})), None);
        assert_eq!(error_field(&json!({"error": null})), None);
        assert_eq!(error_field(&json!([1, 2])), None);
    }

    #[test]
    fn test_user_message_prefers_backend_text() {
        let e = FetchError::Status { code: 400, message: Some("Origin and destination are required".into()) };
        assert_eq!(e.user_message(), "Origin and destination are required");
        let e = FetchError::Status { code: 503, message: None };
        assert_eq!(e.user_message(), "request failed with status 503");
        assert_eq!(e.to_string(), "status 503");
    }
}
