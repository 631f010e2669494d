use async_trait::async_trait;
use reqwest::{Client, Method, Response};
use serde_json::Value;
use std::time::{Duration, Instant};
use url::Url;

use super::{error_field, Backend, FetchError, Verb};
use crate::logging::log_fetch;

/// reqwest-backed client for the dashboard API.
pub struct HttpBackend {
    client: Client,
    base: Url,
}

impl HttpBackend {
    pub fn new(base: &str, timeout_secs: u64) -> anyhow::Result<Self> {
        let base = Url::parse(base)?;
        if base.cannot_be_a_base() {
            anyhow::bail!("api base {} cannot carry paths", base);
        }
        Ok(Self {
            client: Client::builder()
                .timeout(Duration::from_secs(timeout_secs))
                .build()
                .unwrap_or_else(|_| Client::new()),
            base,
        })
    }

    pub fn url_for(&self, path: &str) -> Result<Url, FetchError> {
        self.base
            .join(path)
            .map_err(|e| FetchError::Transport(format!("bad path {}: {}", path, e)))
    }

    async fn request(&self, method: Method, path: &str, body: Option<Value>) -> Result<Value, FetchError> {
        let url = self.url_for(path)?;
        let started = Instant::now();
        let mut req = self.client.request(method.clone(), url);
        if let Some(body) = body {
            req = req.json(&body);
        }
        let resp = req.send().await.map_err(|e| {
            log_fetch(method.as_str(), path, None, elapsed_ms(started));
            FetchError::Transport(e.to_string())
        })?;
        log_fetch(method.as_str(), path, Some(resp.status().as_u16()), elapsed_ms(started));
        read_body(resp).await
    }
}

fn elapsed_ms(started: Instant) -> f64 {
    started.elapsed().as_secs_f64() * 1000.0
}

async fn read_body(resp: Response) -> Result<Value, FetchError> {
    let status = resp.status();
    let text = resp
        .text()
        .await
        .map_err(|e| FetchError::Transport(e.to_string()))?;
    let body = parse_body(&text);

    if !status.is_success() {
        return Err(FetchError::Status {
            code: status.as_u16(),
            message: body.as_ref().ok().and_then(error_field),
        });
    }
    body
}

/// Empty bodies read as `null`; anything else must be JSON.
fn parse_body(text: &str) -> Result<Value, FetchError> {
    if text.trim().is_empty() {
        return Ok(Value::Null);
    }
    Ok(serde_json::from_str(text)?)
}

#[async_trait]
impl Backend for HttpBackend {
    async fn get(&self, path: &str) -> Result<Value, FetchError> {
        self.request(Method::GET, path, None).await
    }

    async fn send(&self, verb: Verb, path: &str, body: Option<Value>) -> Result<Value, FetchError> {
        let method = match verb {
            Verb::Post => Method::POST,
            Verb::Put => Method::PUT,
            Verb::Delete => Method::DELETE,
        };
        self.request(method, path, body).await
    }
}
