//! In-memory backend.
//!
//! Serves canned replies keyed by request path and records every request, so
//! the dashboard can run offline and tests can assert on the exact traffic.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Mutex;

use super::{error_field, Backend, FetchError, Verb};

#[derive(Debug, Clone)]
pub enum Reply {
    Json(Value),
    Status(u16, Value),
    Unreachable,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Recorded {
    /// `None` for GET.
    pub verb: Option<Verb>,
    pub path: String,
    pub body: Option<Value>,
}

#[derive(Default)]
pub struct StubBackend {
    routes: Mutex<HashMap<String, Reply>>,
    requests: Mutex<Vec<Recorded>>,
}

impl StubBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Route a path (with or without query string) to a JSON body.
    pub fn json(&self, path: &str, body: Value) -> &Self {
        self.reply(path, Reply::Json(body))
    }

    pub fn status(&self, path: &str, code: u16, body: Value) -> &Self {
        self.reply(path, Reply::Status(code, body))
    }

    pub fn unreachable(&self, path: &str) -> &Self {
        self.reply(path, Reply::Unreachable)
    }

    pub fn reply(&self, path: &str, reply: Reply) -> &Self {
        if let Ok(mut routes) = self.routes.lock() {
            routes.insert(path.to_string(), reply);
        }
        self
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }

    /// Paths of all recorded requests, in order.
    pub fn paths(&self) -> Vec<String> {
        self.requests().into_iter().map(|r| r.path).collect()
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.requests().iter().filter(|r| r.path.starts_with(prefix)).count()
    }

    pub fn clear_requests(&self) {
        if let Ok(mut r) = self.requests.lock() {
            r.clear();
        }
    }

    fn lookup(&self, path: &str) -> Option<Reply> {
        let routes = self.routes.lock().ok()?;
        if let Some(r) = routes.get(path) {
            return Some(r.clone());
        }
        let bare = path.split('?').next().unwrap_or(path);
        routes.get(bare).cloned()
    }

    fn answer(&self, verb: Option<Verb>, path: &str, body: Option<Value>) -> Result<Value, FetchError> {
        if let Ok(mut r) = self.requests.lock() {
            r.push(Recorded { verb, path: path.to_string(), body });
        }
        match self.lookup(path) {
            Some(Reply::Json(v)) => Ok(v),
            Some(Reply::Status(code, body)) if (200..300).contains(&code) => Ok(body),
            Some(Reply::Status(code, body)) => Err(FetchError::Status {
                code,
                message: error_field(&body),
            }),
            Some(Reply::Unreachable) => Err(FetchError::Transport("connection refused".to_string())),
            None => Err(FetchError::Status { code: 404, message: None }),
        }
    }
}

#[async_trait]
impl Backend for StubBackend {
    async fn get(&self, path: &str) -> Result<Value, FetchError> {
        self.answer(None, path, None)
    }

    async fn send(&self, verb: Verb, path: &str, body: Option<Value>) -> Result<Value, FetchError> {
        self.answer(Some(verb), path, body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_exact_path_wins_over_bare_path() {
        let stub = StubBackend::new();
        stub.json("/api/joke-history", json!({"jokes": []}));
        stub.json("/api/joke-history?page=2&per_page=5", json!({"page": 2}));

        assert_eq!(stub.get("/api/joke-history?page=2&per_page=5").await.unwrap()["page"], 2);
        assert_eq!(stub.get("/api/joke-history?page=1&per_page=5").await.unwrap(), json!({"jokes": []}));
        assert_eq!(stub.count("/api/joke-history"), 2);
    }

    #[tokio::test]
    async fn test_failures() {
        let stub = StubBackend::new();
        stub.unreachable("/api/astronomy");
        stub.status("/api/packages", 400, json!({"error": "Tracking number is required"}));

        assert!(matches!(stub.get("/api/astronomy").await, Err(FetchError::Transport(_))));
        assert_eq!(
            stub.send(Verb::Post, "/api/packages", Some(json!({}))).await,
            Err(FetchError::Status { code: 400, message: Some("Tracking number is required".into()) })
        );
        assert_eq!(
            stub.get("/api/nowhere").await,
            Err(FetchError::Status { code: 404, message: None })
        );
        assert_eq!(stub.requests()[1].verb, Some(Verb::Post));
    }
}
