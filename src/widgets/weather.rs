//! Conditions outside: weather, forecast, alerts, air quality, sun and moon.

use serde_json::Value;

use super::{list_of, DASHBOARD_DATA};
use crate::html::{escape, field, text, truncate};
use crate::widget::Widget;

const ALERT_DESCRIPTION_MAX: usize = 300;

fn detail(label: &str, value: String) -> String {
    format!(
        r#"<div class="weather-detail"><span>{}</span><span>{}</span></div>"#,
        label, value
    )
}

fn weather_view(w: &Value) -> Option<String> {
    Some(format!(
        concat!(
            r#"<div class="weather-widget"><div class="weather-main">"#,
            r#"<div class="weather-temp">{}°F</div><div class="weather-desc">{}</div></div>"#,
            r#"<div class="weather-details">{}{}{}</div></div>"#
        ),
        field(w, "temp"),
        field(w, "description"),
        detail("Feels Like", format!("{}°F", field(w, "feels_like"))),
        detail("Humidity", format!("{}%", field(w, "humidity"))),
        detail("Wind", format!("{} mph", field(w, "wind_speed"))),
    ))
}

pub fn weather() -> Widget {
    Widget {
        name: "weather",
        container: "weather-widget",
        endpoint: DASHBOARD_DATA,
        select: Some("weather"),
        label: "weather data",
        empty: "Weather data unavailable",
        view: weather_view,
        periodic: true,
    }
}

fn forecast_view(f: &Value) -> Option<String> {
    let hourly = f.get("hourly").and_then(Value::as_array).map(Vec::as_slice).unwrap_or_default();
    let daily = f.get("daily").and_then(Value::as_array).map(Vec::as_slice).unwrap_or_default();

    let hourly = list_of("hourly-forecast", hourly, |h| {
        format!(
            r#"<div class="hourly-item"><div class="hourly-time">{}</div><div class="hourly-temp">{}°F</div><div class="hourly-desc">{}</div></div>"#,
            field(h, "time"),
            field(h, "temp"),
            field(h, "description")
        )
    });
    let daily = list_of("daily-forecast", daily, |d| {
        format!(
            r#"<div class="daily-item"><div class="daily-day">{}</div><div class="daily-temps"><span class="daily-high">{}°</span> / {}°</div><div class="daily-desc">{}</div></div>"#,
            field(d, "day"),
            field(d, "high"),
            field(d, "low"),
            field(d, "description")
        )
    });
    if hourly.is_none() && daily.is_none() {
        return None;
    }

    let mut html = String::from(r#"<div class="forecast-container">"#);
    if let Some(h) = hourly {
        html.push_str(r#"<div class="forecast-section"><h3>Hourly Forecast</h3>"#);
        html.push_str(&h);
        html.push_str("</div>");
    }
    if let Some(d) = daily {
        html.push_str(r#"<div class="forecast-section"><h3>3-Day Forecast</h3>"#);
        html.push_str(&d);
        html.push_str("</div>");
    }
    html.push_str("</div>");
    Some(html)
}

pub fn forecast() -> Widget {
    Widget {
        name: "forecast",
        container: "forecast-widget",
        endpoint: DASHBOARD_DATA,
        select: Some("forecast"),
        label: "forecast data",
        empty: "Forecast data unavailable",
        view: forecast_view,
        periodic: true,
    }
}

/// Severity palette used by the alert border.
pub fn severity_color(severity: &str) -> &'static str {
    match severity {
        "Extreme" => "#f44336",
        "Severe" => "#ff9800",
        "Moderate" => "#ffc107",
        _ => "#2196F3",
    }
}

fn alerts_view(alerts: &Value) -> Option<String> {
    let alerts = alerts.as_array()?;
    list_of("news-list", alerts.as_slice(), |a| {
        let severity = text(a.get("severity"));
        let color = severity_color(&severity);
        let headline = match text(a.get("headline")) {
            h if h.is_empty() => "Weather Alert".to_string(),
            h => h,
        };
        format!(
            concat!(
                r#"<div class="news-item" style="border-left: 4px solid {color};">"#,
                r#"<div class="news-source" style="color: {color};">{severity} - {kind}</div>"#,
                r#"<div class="news-title">{headline}</div>"#,
                r#"<div class="news-desc">{area}</div>"#,
                r#"<div class="news-desc">{description}</div></div>"#
            ),
            color = color,
            severity = escape(&severity),
            kind = field(a, "type"),
            headline = escape(&headline),
            area = field(a, "area"),
            description = escape(&truncate(&text(a.get("description")), ALERT_DESCRIPTION_MAX)),
        )
    })
}

pub fn weather_alerts() -> Widget {
    Widget {
        name: "weather_alerts",
        container: "weather-alerts-widget",
        endpoint: DASHBOARD_DATA,
        select: Some("weather_alerts"),
        label: "weather alerts",
        empty: "No weather alerts",
        view: alerts_view,
        periodic: true,
    }
}

fn air_quality_view(aq: &Value) -> Option<String> {
    Some(format!(
        concat!(
            r#"<div class="air-quality"><div class="aqi" style="color: {color};">{aqi}</div>"#,
            r#"<div class="aqi-level">{level}</div><div class="aqi-pollutants">"#,
            "<div>PM2.5: {pm25} µg/m³</div><div>PM10: {pm10} µg/m³</div>",
            "<div>NO₂: {no2} µg/m³</div><div>O₃: {o3} µg/m³</div></div>",
            r#"<div class="updated">Updated: {updated}</div></div>"#
        ),
        color = field(aq, "color"),
        aqi = field(aq, "aqi"),
        level = field(aq, "level"),
        pm25 = field(aq, "pm25"),
        pm10 = field(aq, "pm10"),
        no2 = field(aq, "no2"),
        o3 = field(aq, "o3"),
        updated = field(aq, "updated"),
    ))
}

pub fn air_quality() -> Widget {
    Widget {
        name: "air_quality",
        container: "air-quality-widget",
        endpoint: "/api/air-quality",
        select: None,
        label: "air quality",
        empty: "Air quality data unavailable",
        view: air_quality_view,
        periodic: true,
    }
}

fn astronomy_view(a: &Value) -> Option<String> {
    Some(format!(
        concat!(
            r#"<div class="astronomy"><div class="moon-icon">{}</div><div class="moon-phase">{}</div>"#,
            r#"<div class="sun-times"><div><div class="label">Sunrise</div><div class="time">{}</div></div>"#,
            r#"<div><div class="label">Sunset</div><div class="time">{}</div></div></div></div>"#
        ),
        field(a, "moon_icon"),
        field(a, "moon_phase_name"),
        field(a, "sunrise"),
        field(a, "sunset"),
    ))
}

pub fn astronomy() -> Widget {
    Widget {
        name: "astronomy",
        container: "astronomy-widget",
        endpoint: "/api/astronomy",
        select: None,
        label: "astronomy data",
        empty: "Astronomy data unavailable",
        view: astronomy_view,
        periodic: true,
    }
}
