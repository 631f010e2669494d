//! The commute widget: fetch a snapshot, classify it, render the summary and
//! hand the route to the map renderer. History loads alongside and fails on
//! its own.

use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;

use super::classify::{classify, level_color, Classification, HEAVY_COLOR, LIGHT_COLOR, MEDIUM_COLOR};
use super::history::load_history;
use super::map::{build_scene, DocumentSurface, MapError, MapRenderer, MapSurface, NullSurface, SceneOptions};
use super::model::{CommutePayload, CommuteSnapshot, TrafficLevel};
use crate::dom::{ActionEvent, ActionHandler};
use crate::html::{capitalize, error_box, escape, placeholder};
use crate::logging::{log, log_render, log_widget_failure, obj, ts_epoch_ms, v_str, Domain, Level};
use crate::widget::{Outcome, Page, Panel};

pub const COMMUTE_ENDPOINT: &str = "/api/commute-info";
pub const COMMUTE_SETTINGS_ENDPOINT: &str = "/api/settings/commute";

pub const COMMUTE_CONTAINER: &str = "commute-widget";
pub const MAP_CONTAINER: &str = "commute-map";
pub const REFRESH_BUTTON: &str = "commute-refresh";
pub const COMMUTE_FORM: &str = "commute-form";
pub const ORIGIN_FIELD: &str = "commute-origin";
pub const DESTINATION_FIELD: &str = "commute-destination";

const UNCONFIGURED: &str = "Configure commute route above";
const FAILED: &str = "Failed to load commute info";

/// Unique per call, so intermediaries cannot serve a cached forced refresh.
pub fn cache_token() -> String {
    format!("{}{:06}", ts_epoch_ms(), rand::random::<u32>() % 1_000_000)
}

/// Request path for a render; `force` asks the backend to bypass its cache.
pub fn commute_path(force: bool) -> String {
    if force {
        format!("{}?refresh=true&_={}", COMMUTE_ENDPOINT, cache_token())
    } else {
        COMMUTE_ENDPOINT.to_string()
    }
}

fn banner(c: &Classification) -> String {
    let color = level_color(c.overall);
    let label = capitalize(c.overall.as_str());
    let detail = match c.overall {
        TrafficLevel::Light if c.incidents.is_empty() => "No traffic issues detected".to_string(),
        TrafficLevel::Light => format!("{} reported nearby", c.incidents.len()),
        _ => format!(
            "{} of {} segments slowed",
            c.tally.heavy + c.tally.medium,
            c.tally.total()
        ),
    };
    let mark = if c.overall == TrafficLevel::Light { "✓ " } else { "" };
    format!(
        r#"<div class="traffic-status traffic-{level}" style="border-left-color: {color};"><strong style="color: {color};">{mark}{label} Traffic</strong> - {detail}</div>"#,
        level = c.overall.as_str(),
        color = color,
        mark = mark,
        label = label,
        detail = escape(&detail),
    )
}

fn legend() -> String {
    format!(
        concat!(
            r#"<div class="traffic-legend">"#,
            r#"<span style="color: {};">●</span> Light Traffic "#,
            r#"<span style="color: {};">●</span> Medium Traffic "#,
            r#"<span style="color: {};">●</span> Heavy Traffic"#,
            "</div>"
        ),
        LIGHT_COLOR, MEDIUM_COLOR, HEAVY_COLOR
    )
}

fn incident_list(snapshot: &CommuteSnapshot, c: &Classification) -> String {
    if snapshot.traffic_events.is_empty() {
        return String::new();
    }
    let rows: String = snapshot
        .traffic_events
        .iter()
        .zip(&c.incidents)
        .map(|(incident, d)| {
            let mut line = format!(
                r#"{} <strong style="color: {};">{}</strong>"#,
                d.icon,
                d.color,
                escape(&d.label)
            );
            if !incident.location.is_empty() {
                line.push_str(&format!(" at {}", escape(&incident.location)));
            }
            if !incident.description.is_empty() {
                line.push_str(&format!(" - {}", escape(&incident.description)));
            }
            if !incident.time.is_empty() {
                line.push_str(&format!(" ({})", escape(&incident.time)));
            }
            let class = if d.emphasized { "traffic-incident emphasized" } else { "traffic-incident" };
            format!(r#"<div class="{}">{}</div>"#, class, line)
        })
        .collect();
    format!(r#"<div class="traffic-incidents">{}</div>"#, rows)
}

/// Widget markup for a snapshot.
pub fn commute_view(snapshot: &CommuteSnapshot, c: &Classification) -> String {
    let distance = snapshot
        .distance_miles
        .map(|d| format!(r#"<div class="commute-distance">{} miles</div>"#, d))
        .unwrap_or_default();
    format!(
        concat!(
            r#"<div class="commute-summary">"#,
            r#"<div class="commute-duration">{duration}</div>"#,
            "{distance}",
            r#"<div class="commute-route">{origin} → {destination}</div>"#,
            r#"<div class="commute-updated">Updated: {updated} <span class="commute-source">({source})</span></div>"#,
            "</div>{banner}{legend}{incidents}"
        ),
        duration = escape(&snapshot.duration_formatted),
        distance = distance,
        origin = escape(&snapshot.origin),
        destination = escape(&snapshot.destination),
        updated = escape(&snapshot.updated),
        source = escape(snapshot.source_label()),
        banner = banner(c),
        legend = legend(),
        incidents = incident_list(snapshot, c),
    )
}

pub struct CommuteWidget {
    map: MapRenderer,
}

impl CommuteWidget {
    pub fn new(surface: Arc<dyn MapSurface>) -> Self {
        Self { map: MapRenderer::new(surface) }
    }

    /// Map surface chosen by `MAP_ENABLED`.
    pub fn for_page(page: &Page) -> Self {
        let surface: Arc<dyn MapSurface> = if page.config.map_enabled {
            Arc::new(DocumentSurface::new(page.doc.clone()))
        } else {
            Arc::new(NullSurface)
        };
        Self::new(surface)
    }

    pub fn map(&self) -> &MapRenderer {
        &self.map
    }

    fn hide_map(&self, page: &Page) {
        self.map.clear();
        page.doc.set_visible(MAP_CONTAINER, false);
    }

    pub async fn render(&self, page: &Page, force: bool) -> Outcome {
        let doc = &page.doc;
        if !doc.contains(COMMUTE_CONTAINER) {
            return Outcome::Absent;
        }

        let path = commute_path(force);
        let payload = match page.backend.get(&path).await {
            Ok(v) => CommutePayload::from_value(v).map_err(|e| e.to_string()),
            Err(e) => Err(e.to_string()),
        };

        let snapshot = match payload {
            Err(e) => {
                log_widget_failure("commute", &path, &e);
                doc.set_html(COMMUTE_CONTAINER, error_box(FAILED));
                self.hide_map(page);
                return Outcome::Failed;
            }
            Ok(CommutePayload::Unconfigured) => {
                doc.set_html(COMMUTE_CONTAINER, placeholder(UNCONFIGURED));
                self.hide_map(page);
                return Outcome::Empty;
            }
            Ok(CommutePayload::Invalid(err)) => {
                let message = format!(
                    "Could not calculate commute: {}. Please check the origin and destination addresses.",
                    err
                );
                log(
                    Level::Warn,
                    Domain::Commute,
                    "route_invalid",
                    obj(&[("path", v_str(&path)), ("msg", v_str(&err))]),
                );
                doc.set_html(COMMUTE_CONTAINER, error_box(&message));
                self.hide_map(page);
                return Outcome::Invalid;
            }
            Ok(CommutePayload::Snapshot(s)) => s,
        };

        let classification = classify(&snapshot.route_segments, &snapshot.traffic_events);
        let html = commute_view(&snapshot, &classification);
        doc.set_html(COMMUTE_CONTAINER, html.as_str());
        log_render("commute", COMMUTE_CONTAINER, Outcome::Rendered.as_str(), &html);
        log(
            Level::Info,
            Domain::Commute,
            "snapshot",
            obj(&[
                ("overall", v_str(classification.overall.as_str())),
                ("segments", json!(classification.tally.total())),
                ("incidents", json!(classification.incidents.len())),
                ("source", v_str(snapshot.source_label())),
                ("forced", json!(force)),
            ]),
        );

        let (map, _history) = tokio::join!(
            self.render_map(page, &snapshot, &classification),
            load_history(page)
        );
        match map {
            Ok(()) => {}
            Err(MapError::EmptyRoute) => {
                log(Level::Debug, Domain::Map, "no_route", obj(&[]));
                self.hide_map(page);
            }
            Err(e) => {
                log(Level::Warn, Domain::Map, "render_failed", obj(&[("msg", v_str(&e.to_string()))]));
                self.hide_map(page);
            }
        }
        Outcome::Rendered
    }

    async fn render_map(
        &self,
        page: &Page,
        snapshot: &CommuteSnapshot,
        classification: &Classification,
    ) -> Result<(), MapError> {
        let doc = &page.doc;
        if !doc.contains(MAP_CONTAINER) {
            return Ok(());
        }
        let scene = build_scene(snapshot, classification, &SceneOptions::from_config(&page.config))?;
        self.map.clear();
        doc.set_visible(MAP_CONTAINER, true);
        doc.wait_for_layout(MAP_CONTAINER, page.config.layout_timeout())
            .await
            .ok_or(MapError::LayoutTimeout)?;
        self.map.replace(MAP_CONTAINER, &scene)
    }

    async fn save_settings(&self, page: &Page) {
        let origin = page.doc.value(ORIGIN_FIELD).unwrap_or_default();
        let destination = page.doc.value(DESTINATION_FIELD).unwrap_or_default();
        let body = json!({"origin": origin.trim(), "destination": destination.trim()});
        match page
            .backend
            .send(crate::api::Verb::Post, COMMUTE_SETTINGS_ENDPOINT, Some(body))
            .await
        {
            Ok(_) => {
                log(Level::Info, Domain::Forms, "commute_saved", obj(&[]));
                self.render(page, false).await;
            }
            Err(e) => {
                log_widget_failure("commute_settings", COMMUTE_SETTINGS_ENDPOINT, &e.to_string());
                page.doc.notify(format!("Error saving commute settings: {}", e.user_message()));
            }
        }
    }
}

#[async_trait]
impl Panel for CommuteWidget {
    fn name(&self) -> &'static str {
        "commute"
    }

    async fn load(&self, page: &Page) -> Outcome {
        self.render(page, false).await
    }

    fn bind(self: Arc<Self>, page: &Page) {
        let refresh: ActionHandler = {
            let widget = self.clone();
            let page = page.clone();
            Arc::new(move |_: ActionEvent| {
                let widget = widget.clone();
                let page = page.clone();
                Box::pin(async move {
                    widget.render(&page, true).await;
                })
            })
        };
        let submit: ActionHandler = {
            let widget = self.clone();
            let page = page.clone();
            Arc::new(move |_: ActionEvent| {
                let widget = widget.clone();
                let page = page.clone();
                Box::pin(async move {
                    widget.save_settings(&page).await;
                })
            })
        };
        page.doc.on_action(REFRESH_BUTTON, "click", refresh);
        page.doc.on_action(COMMUTE_FORM, "submit", submit);
    }
}
