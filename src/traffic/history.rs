//! Recent traffic events along the commute route.
//!
//! Secondary to the commute widget: a failed fetch is logged and whatever is
//! on screen stays there.

use serde::Deserialize;

use super::classify::{display_for, level_color};
use super::model::{IncidentKind, TrafficHistoryEvent, TrafficLevel};
use crate::html::{capitalize, escape};
use crate::logging::{log_render, log_widget_failure};
use crate::widget::{Outcome, Page};

pub const HISTORY_ENDPOINT: &str = "/api/traffic-history";
pub const HISTORY_WRAPPER: &str = "traffic-history";
pub const HISTORY_LIST: &str = "traffic-history-list";

#[derive(Debug, Default, Deserialize)]
struct HistoryResponse {
    #[serde(default)]
    events: Vec<TrafficHistoryEvent>,
}

fn icon(event: &TrafficHistoryEvent) -> &'static str {
    match (event.kind, event.traffic_level) {
        (IncidentKind::Crash, _) => "🚨",
        (IncidentKind::Traffic | IncidentKind::Unknown, TrafficLevel::Heavy) => "⚠️",
        (IncidentKind::Traffic | IncidentKind::Unknown, _) => "📊",
        (kind, level) => display_for(kind, level).icon,
    }
}

pub fn history_row(event: &TrafficHistoryEvent) -> String {
    let crash = if event.kind == IncidentKind::Crash {
        r#"<span class="crash-tag"> - CRASH DETECTED</span>"#
    } else {
        ""
    };
    format!(
        concat!(
            r#"<div class="traffic-history-item">"#,
            r#"<div class="traffic-history-head"><strong style="color: {color};">{icon} {level} Traffic</strong>{crash}"#,
            r#"<span class="traffic-history-when">{date} {time}</span></div>"#,
            r#"<div class="traffic-history-location">{location}</div>"#,
            r#"<div class="traffic-history-description">{description}</div>"#,
            "</div>"
        ),
        color = level_color(event.traffic_level),
        icon = icon(event),
        level = capitalize(event.traffic_level.as_str()),
        crash = crash,
        date = escape(&event.date),
        time = escape(&event.time),
        location = escape(&event.location),
        description = escape(&event.description),
    )
}

pub async fn load_history(page: &Page) -> Outcome {
    let doc = &page.doc;
    if !doc.contains(HISTORY_WRAPPER) || !doc.contains(HISTORY_LIST) {
        return Outcome::Absent;
    }
    let parsed = match page.backend.get(HISTORY_ENDPOINT).await {
        Ok(v) => serde_json::from_value::<HistoryResponse>(v),
        Err(e) => {
            log_widget_failure("traffic_history", HISTORY_ENDPOINT, &e.to_string());
            return Outcome::Failed;
        }
    };
    let history = match parsed {
        Ok(h) => h,
        Err(e) => {
            log_widget_failure("traffic_history", HISTORY_ENDPOINT, &e.to_string());
            return Outcome::Failed;
        }
    };

    if history.events.is_empty() {
        doc.set_visible(HISTORY_WRAPPER, false);
        return Outcome::Empty;
    }
    let html: String = history.events.iter().map(history_row).collect();
    doc.set_visible(HISTORY_WRAPPER, true);
    doc.set_html(HISTORY_LIST, html.as_str());
    log_render("traffic_history", HISTORY_LIST, Outcome::Rendered.as_str(), &html);
    Outcome::Rendered
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::StubBackend;
    use crate::config::Config;
    use crate::dom::Document;
    use serde_json::json;
    use std::sync::Arc;

    fn page(stub: Arc<StubBackend>) -> Page {
        Page::new(Document::with_containers(&[HISTORY_WRAPPER, HISTORY_LIST]), stub, Config::default())
    }

    #[tokio::test]
    async fn test_rows_tag_crashes() {
        let stub = Arc::new(StubBackend::new());
        stub.json(
            HISTORY_ENDPOINT,
            json!({"events": [
                {"type": "crash", "traffic_level": "heavy", "location": "I-95 N", "description": "3 vehicles", "time": "08:10 AM", "date": "2026-10-18"},
                {"type": "medium_traffic", "traffic_level": "medium", "location": "Route segment 4", "time": "08:30 AM", "date": "2026-10-18"}
            ], "count": 2}),
        );
        let page = page(stub);
        assert_eq!(load_history(&page).await, Outcome::Rendered);
        let html = page.doc.html(HISTORY_LIST).unwrap();
        assert_eq!(html.matches("CRASH DETECTED").count(), 1);
        assert!(html.contains("🚨 Heavy Traffic"));
        assert!(html.contains("📊 Medium Traffic"));
        assert!(html.contains("2026-10-18 08:10 AM"));
        assert_eq!(page.doc.is_visible(HISTORY_WRAPPER), Some(true));
    }

    #[tokio::test]
    async fn test_no_events_hides_wrapper() {
        let stub = Arc::new(StubBackend::new());
        stub.json(HISTORY_ENDPOINT, json!({"events": [], "count": 0}));
        let page = page(stub);
        assert_eq!(load_history(&page).await, Outcome::Empty);
        assert_eq!(page.doc.is_visible(HISTORY_WRAPPER), Some(false));
    }

    #[tokio::test]
    async fn test_failure_leaves_content() {
        let stub = Arc::new(StubBackend::new());
        stub.unreachable(HISTORY_ENDPOINT);
        let page = page(stub);
        page.doc.set_html(HISTORY_LIST, "earlier");
        assert_eq!(load_history(&page).await, Outcome::Failed);
        assert_eq!(page.doc.html(HISTORY_LIST).as_deref(), Some("earlier"));
    }
}
