//! Home Assistant overview: stats bar, devices grouped by domain, batteries.

use serde_json::Value;
use std::collections::BTreeMap;

use crate::html::{escape, text};
use crate::widget::Widget;

pub const LOW_BATTERY: f64 = 25.0;
const MEDIUM_BATTERY: f64 = 50.0;

/// Domains shown first, in this order; the rest follow alphabetically.
const DOMAIN_ORDER: &[&str] = &[
    "switch",
    "light",
    "fan",
    "climate",
    "media_player",
    "cover",
    "lock",
    "binary_sensor",
];

pub fn domain_icon(domain: &str) -> &'static str {
    match domain {
        "light" => "💡",
        "switch" => "🔌",
        "binary_sensor" => "📡",
        "fan" => "🌀",
        "climate" => "🌡️",
        "media_player" => "📺",
        "cover" => "🪟",
        "lock" => "🔐",
        "sensor" => "📊",
        _ => "⚙️",
    }
}

fn domain_rank(domain: &str) -> (usize, String) {
    let pos = DOMAIN_ORDER.iter().position(|d| *d == domain).unwrap_or(DOMAIN_ORDER.len());
    (pos, domain.to_string())
}

fn entity_domain(device: &Value) -> String {
    let entity = text(device.get("entity_id"));
    match entity.split('.').next() {
        Some(d) if !d.is_empty() && entity.contains('.') => d.to_string(),
        _ => "other".to_string(),
    }
}

fn friendly_name(v: &Value) -> String {
    match text(v.pointer("/attributes/friendly_name")) {
        n if n.is_empty() => text(v.get("entity_id")),
        n => n,
    }
}

fn is_on(device: &Value) -> bool {
    text(device.get("state")).eq_ignore_ascii_case("on")
}

fn battery_level(sensor: &Value) -> f64 {
    sensor.get("battery_level").and_then(Value::as_f64).unwrap_or(0.0)
}

fn battery_class(level: f64) -> &'static str {
    if level < LOW_BATTERY {
        "level-low"
    } else if level < MEDIUM_BATTERY {
        "level-medium"
    } else {
        "level-high"
    }
}

fn stat(value: impl std::fmt::Display, label: &str) -> String {
    format!(
        r#"<div class="ha-stat-item"><div class="ha-stat-value">{}</div><div class="ha-stat-label">{}</div></div>"#,
        value, label
    )
}

fn section_header(icon: &str, title: &str, count: String) -> String {
    format!(
        r#"<div class="ha-section-header"><div class="ha-section-icon">{}</div><h3 class="ha-section-title">{}</h3><span class="ha-section-count">{}</span></div>"#,
        icon, title, count
    )
}

fn device_card(device: &Value, icon: &str) -> String {
    let state = match text(device.get("state")) {
        s if s.is_empty() => "unknown".to_string(),
        s => s,
    };
    let on = if is_on(device) { " device-on" } else { "" };
    format!(
        concat!(
            r#"<div class="ha-device-card{on}"><div class="ha-device-icon">{icon}</div>"#,
            r#"<div class="ha-device-info"><div class="ha-device-name">{name}</div><div class="ha-device-entity">{entity}</div></div>"#,
            r#"<div class="ha-device-status"><span class="ha-status-text">{state}</span></div></div>"#
        ),
        on = on,
        icon = icon,
        name = escape(&friendly_name(device)),
        entity = escape(&text(device.get("entity_id"))),
        state = escape(&state),
    )
}

fn battery_card(sensor: &Value) -> String {
    let level = battery_level(sensor);
    let class = battery_class(level);
    format!(
        concat!(
            r#"<div class="ha-battery-card {class}"><div class="ha-battery-header">"#,
            r#"<div class="ha-battery-name">{name}</div><div class="ha-battery-percent">{level}%</div></div>"#,
            r#"<div class="ha-battery-bar" style="width: {level}%;"></div>"#,
            r#"<div class="ha-battery-entity">{entity}</div></div>"#
        ),
        class = class,
        name = escape(&friendly_name(sensor)),
        level = level,
        entity = escape(&text(sensor.get("entity_id"))),
    )
}

fn ha_view(data: &Value) -> Option<String> {
    let devices = data.get("devices").and_then(Value::as_array).map(Vec::as_slice).unwrap_or_default();
    let batteries = data
        .get("battery_sensors")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();
    if devices.is_empty() && batteries.is_empty() {
        return None;
    }

    let mut by_domain: BTreeMap<(usize, String), Vec<&Value>> = BTreeMap::new();
    for d in devices {
        by_domain.entry(domain_rank(&entity_domain(d))).or_default().push(d);
    }
    let on = devices.iter().filter(|d| is_on(d)).count();
    let low = batteries.iter().filter(|s| battery_level(s) < LOW_BATTERY).count();

    let mut html = String::from(r#"<div class="ha-stats-bar">"#);
    html.push_str(&stat(devices.len(), "Total Devices"));
    html.push_str(&stat(on, "Currently On"));
    html.push_str(&stat(batteries.len(), "Battery Sensors"));
    if low > 0 {
        html.push_str(&stat(low, "Low Battery"));
    }
    html.push_str("</div>");

    if by_domain.is_empty() {
        html.push_str(r#"<div class="ha-empty-state">🏠 No devices found</div>"#);
    } else {
        html.push_str(r#"<div class="ha-section">"#);
        html.push_str(&section_header("⚡", "Devices", format!("{} devices", devices.len())));
        for ((_, domain), group) in &by_domain {
            let icon = domain_icon(domain);
            html.push_str(&format!(
                r#"<div class="ha-domain-group"><div class="ha-domain-header"><span class="ha-domain-icon">{}</span><span>{}</span></div><div class="ha-devices-grid">"#,
                icon,
                escape(&domain.replace('_', " "))
            ));
            for device in group {
                html.push_str(&device_card(device, icon));
            }
            html.push_str("</div></div>");
        }
        html.push_str("</div>");
    }

    if !batteries.is_empty() {
        let mut sorted: Vec<&Value> = batteries.iter().collect();
        sorted.sort_by(|a, b| battery_level(a).total_cmp(&battery_level(b)));
        html.push_str(r#"<div class="ha-section">"#);
        html.push_str(&section_header("🔋", "Battery Sensors", format!("{} sensors", batteries.len())));
        html.push_str(r#"<div class="ha-battery-grid">"#);
        for sensor in sorted {
            html.push_str(&battery_card(sensor));
        }
        html.push_str("</div></div>");
    }
    Some(html)
}

pub fn home_assistant() -> Widget {
    Widget {
        name: "home_assistant",
        container: "ha-widget",
        endpoint: "/api/home-assistant",
        select: None,
        label: "Home Assistant data",
        empty: "No Home Assistant data available. Check your configuration.",
        view: ha_view,
        periodic: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::widget::Outcome;
    use serde_json::json;

    fn payload() -> Value {
        json!({
            "devices": [
                {"entity_id": "sensor.outdoor_temp", "state": "61"},
                {"entity_id": "light.kitchen", "state": "on", "attributes": {"friendly_name": "Kitchen"}},
                {"entity_id": "switch.kettle", "state": "off"},
                {"entity_id": "media_player.tv", "state": "ON"}
            ],
            "battery_sensors": [
                {"entity_id": "sensor.door_battery", "battery_level": 80},
                {"entity_id": "sensor.smoke_battery", "battery_level": 12, "attributes": {"friendly_name": "Smoke"}}
            ]
        })
    }

    #[test]
    fn test_domains_follow_priority_order() {
        let (outcome, html) = home_assistant().present(&payload());
        assert_eq!(outcome, Outcome::Rendered);
        let switch = html.find("<span>switch</span>").unwrap();
        let light = html.find("<span>light</span>").unwrap();
        let media = html.find("<span>media player</span>").unwrap();
        let sensor = html.find("<span>sensor</span>").unwrap();
        assert!(switch < light && light < media && media < sensor);
    }

    #[test]
    fn test_stats_and_low_battery() {
        let (_, html) = home_assistant().present(&payload());
        assert!(html.contains(r#"<div class="ha-stat-value">4</div><div class="ha-stat-label">Total Devices</div>"#));
        assert!(html.contains(r#"<div class="ha-stat-value">2</div><div class="ha-stat-label">Currently On</div>"#));
        assert!(html.contains("Low Battery"));
        // lowest battery first
        assert!(html.find("Smoke").unwrap() < html.find("sensor.door_battery").unwrap());
        assert!(html.contains("ha-battery-card level-low"));
    }

    #[test]
    fn test_backend_error_is_specific() {
        let (outcome, html) = home_assistant().present(&json!({"error": "Home Assistant not configured"}));
        assert_eq!(outcome, Outcome::Invalid);
        assert!(html.contains("Error loading Home Assistant data: Home Assistant not configured"));
    }

    #[test]
    fn test_nothing_to_show() {
        let (outcome, html) = home_assistant().present(&json!({"devices": [], "battery_sensors": []}));
        assert_eq!(outcome, Outcome::Empty);
        assert!(html.contains("No Home Assistant data available"));
    }
}
