//! One initial render pass against the configured backend; prints the page.

use anyhow::Result;
use std::sync::Arc;

use homeboard::api::HttpBackend;
use homeboard::config::Config;
use homeboard::dashboard::{Dashboard, PAGE_CONTAINERS};
use homeboard::dom::Document;
use homeboard::widget::Page;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let config = Config::from_env();
    let backend = HttpBackend::new(&config.api_base, config.http_timeout_secs)?;
    let doc = Document::with_containers(PAGE_CONTAINERS).with_auto_layout(config.viewport);
    let mut dashboard = Dashboard::new(Page::new(doc, Arc::new(backend), config));
    let report = dashboard.init().await;

    let outcomes: serde_json::Map<String, serde_json::Value> = report
        .outcomes
        .iter()
        .map(|(name, o)| (name.to_string(), serde_json::Value::from(o.as_str())))
        .collect();
    let out = serde_json::json!({
        "outcomes": outcomes,
        "elapsed_ms": report.elapsed_ms,
        "containers": dashboard.page().doc.snapshot(),
    });
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}
