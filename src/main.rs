use anyhow::Result;
use serde_json::json;
use std::sync::Arc;

use homeboard::api::HttpBackend;
use homeboard::config::Config;
use homeboard::dashboard::{Dashboard, PAGE_CONTAINERS};
use homeboard::dom::Document;
use homeboard::logging::{log, obj, v_str, Domain, Level};
use homeboard::widget::{Outcome, Page};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let config = Config::from_env();
    let backend = HttpBackend::new(&config.api_base, config.http_timeout_secs)?;
    let doc = Document::with_containers(PAGE_CONTAINERS).with_auto_layout(config.viewport);

    log(
        Level::Info,
        Domain::System,
        "startup",
        obj(&[
            ("api_base", v_str(&config.api_base)),
            ("refresh_secs", json!(config.refresh_secs)),
            ("reload_secs", json!(config.reload_secs)),
            ("map_enabled", json!(config.map_enabled)),
        ]),
    );

    let mut dashboard = Dashboard::new(Page::new(doc, Arc::new(backend), config));
    let report = dashboard.init().await;
    if report.count(Outcome::Rendered) == 0 {
        log(Level::Warn, Domain::System, "nothing_rendered", obj(&[]));
    }
    dashboard.run().await;
    Ok(())
}
