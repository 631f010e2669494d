//! Commute payload shapes as the backend sends them.
//!
//! Everything except the route geometry is optional on the wire; absent fields
//! fall back to defaults rather than failing the whole snapshot.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::api::error_field;
use crate::html::is_blank;

/// `[longitude, latitude]`, GeoJSON order.
pub type LonLat = [f64; 2];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TrafficLevel {
    #[default]
    Light,
    Medium,
    Heavy,
}

impl TrafficLevel {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "light" | "low" | "free" => Some(TrafficLevel::Light),
            "medium" | "moderate" => Some(TrafficLevel::Medium),
            "heavy" | "high" | "severe" => Some(TrafficLevel::Heavy),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TrafficLevel::Light => "light",
            TrafficLevel::Medium => "medium",
            TrafficLevel::Heavy => "heavy",
        }
    }
}

impl<'de> Deserialize<'de> for TrafficLevel {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let raw = Option::<String>::deserialize(d)?;
        Ok(raw.as_deref().and_then(TrafficLevel::parse).unwrap_or_default())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IncidentKind {
    Crash,
    Closure,
    Construction,
    Weather,
    Incident,
    Traffic,
    #[default]
    Unknown,
}

impl IncidentKind {
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "crash" | "accident" | "collision" => IncidentKind::Crash,
            "closure" | "road_closure" | "closed" => IncidentKind::Closure,
            "construction" | "roadwork" | "roadworks" => IncidentKind::Construction,
            "weather" => IncidentKind::Weather,
            "incident" => IncidentKind::Incident,
            "traffic" | "heavy_traffic" | "medium_traffic" | "congestion" => IncidentKind::Traffic,
            _ => IncidentKind::Unknown,
        }
    }
}

impl<'de> Deserialize<'de> for IncidentKind {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let raw = Option::<String>::deserialize(d)?;
        Ok(raw.as_deref().map(IncidentKind::parse).unwrap_or_default())
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct RouteSegment {
    #[serde(default, deserialize_with = "null_default")]
    pub coordinates: Vec<LonLat>,
    #[serde(default)]
    pub traffic_level: TrafficLevel,
    #[serde(default)]
    pub distance_m: Option<f64>,
    #[serde(default)]
    pub duration_sec: Option<f64>,
    #[serde(default)]
    pub free_flow_duration_sec: Option<f64>,
    #[serde(default)]
    pub delay_ratio: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct TrafficIncident {
    #[serde(rename = "type", default)]
    pub kind: IncidentKind,
    #[serde(default)]
    pub traffic_level: TrafficLevel,
    #[serde(default, deserialize_with = "null_default")]
    pub location: String,
    #[serde(default, deserialize_with = "null_default")]
    pub description: String,
    #[serde(default, deserialize_with = "null_default")]
    pub time: String,
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lon: Option<f64>,
}

impl TrafficIncident {
    /// `(lat, lon)` when the incident can be placed on the map.
    pub fn position(&self) -> Option<(f64, f64)> {
        match (self.lat, self.lon) {
            (Some(lat), Some(lon)) if lat.is_finite() && lon.is_finite() => Some((lat, lon)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct TrafficHistoryEvent {
    #[serde(rename = "type", default)]
    pub kind: IncidentKind,
    #[serde(default)]
    pub traffic_level: TrafficLevel,
    #[serde(default, deserialize_with = "null_default")]
    pub location: String,
    #[serde(default, deserialize_with = "null_default")]
    pub description: String,
    #[serde(default, deserialize_with = "null_default")]
    pub time: String,
    #[serde(default, deserialize_with = "null_default")]
    pub date: String,
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lon: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
pub struct CommuteSnapshot {
    #[serde(default, deserialize_with = "null_default")]
    pub origin: String,
    #[serde(default, deserialize_with = "null_default")]
    pub destination: String,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub origin_lat: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub origin_lon: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub dest_lat: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub dest_lon: Option<f64>,
    #[serde(default, deserialize_with = "null_default")]
    pub duration_formatted: String,
    #[serde(default)]
    pub distance_miles: Option<f64>,
    #[serde(default, deserialize_with = "null_default")]
    pub route_coordinates: Vec<LonLat>,
    #[serde(default, deserialize_with = "null_default")]
    pub route_segments: Vec<RouteSegment>,
    #[serde(default, deserialize_with = "null_default")]
    pub traffic_events: Vec<TrafficIncident>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default, deserialize_with = "null_default")]
    pub updated: String,
}

/// An explicit `null` reads the same as a missing field.
fn null_default<'de, D, T>(d: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(d)?.unwrap_or_default())
}

/// Geocoders hand coordinates back as strings; accept both.
fn lenient_f64<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
    Ok(match Option::<Value>::deserialize(d)? {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

impl CommuteSnapshot {
    pub fn origin_point(&self) -> Option<(f64, f64)> {
        Some((self.origin_lat?, self.origin_lon?))
    }

    pub fn destination_point(&self) -> Option<(f64, f64)> {
        Some((self.dest_lat?, self.dest_lon?))
    }

    /// Full route geometry; stitched from segments when the backend sent none.
    pub fn route(&self) -> Vec<LonLat> {
        if !self.route_coordinates.is_empty() {
            return self.route_coordinates.clone();
        }
        self.route_segments
            .iter()
            .flat_map(|s| s.coordinates.iter().copied())
            .collect()
    }

    pub fn has_geometry(&self) -> bool {
        !self.route_coordinates.is_empty() || self.route_segments.iter().any(|s| !s.coordinates.is_empty())
    }

    pub fn source_label(&self) -> &str {
        self.source.as_deref().unwrap_or("live")
    }
}

/// The three shapes a commute response can take.
#[derive(Debug, Clone, PartialEq)]
pub enum CommutePayload {
    /// No route configured yet.
    Unconfigured,
    /// Backend rejected the configured addresses.
    Invalid(String),
    Snapshot(Box<CommuteSnapshot>),
}

impl CommutePayload {
    pub fn from_value(v: Value) -> Result<Self, serde_json::Error> {
        if is_blank(&v) {
            return Ok(CommutePayload::Unconfigured);
        }
        if let Some(err) = error_field(&v) {
            return Ok(CommutePayload::Invalid(err));
        }
        let snapshot: CommuteSnapshot = serde_json::from_value(v)?;
        Ok(CommutePayload::Snapshot(Box::new(snapshot)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_payload_shapes() {
        assert_eq!(CommutePayload::from_value(json!(null)).unwrap(), CommutePayload::Unconfigured);
        assert_eq!(CommutePayload::from_value(json!({})).unwrap(), CommutePayload::Unconfigured);
        assert_eq!(
            CommutePayload::from_value(json!({"error": "bad address"})).unwrap(),
            CommutePayload::Invalid("bad address".into())
        );
        assert!(matches!(
            CommutePayload::from_value(json!({"origin": "A", "destination": "B"})).unwrap(),
            CommutePayload::Snapshot(_)
        ));
        assert!(CommutePayload::from_value(json!({"route_coordinates": "nope"})).is_err());
    }

    #[test]
    fn test_lenient_fields() {
        let snap: CommuteSnapshot = serde_json::from_value(json!({
            "origin_lat": "40.71", "origin_lon": -74.0,
            "route_segments": [{"coordinates": [[-74.0, 40.7]], "traffic_level": "gridlock"}],
            "traffic_events": [{"type": "heavy_traffic", "location": "Route segment 3"}, {"type": null}]
        }))
        .unwrap();
        assert_eq!(snap.origin_point(), Some((40.71, -74.0)));
        assert_eq!(snap.destination_point(), None);
        assert_eq!(snap.route_segments[0].traffic_level, TrafficLevel::Light);
        assert_eq!(snap.traffic_events[0].kind, IncidentKind::Traffic);
        assert_eq!(snap.traffic_events[0].traffic_level, TrafficLevel::Light);
        assert_eq!(snap.traffic_events[1].kind, IncidentKind::Unknown);
        assert_eq!(snap.source_label(), "live");
    }

    #[test]
    fn test_null_fields_read_as_defaults() {
        let payload = CommutePayload::from_value(json!({
            "origin": null, "destination": "Office",
            "duration_formatted": null, "updated": null,
            "route_coordinates": null,
            "route_segments": [{"coordinates": null, "traffic_level": "heavy"}],
            "traffic_events": [{"type": "crash", "location": null, "description": null, "time": null}]
        }))
        .unwrap();
        let CommutePayload::Snapshot(snap) = payload else {
            panic!("expected a snapshot");
        };
        assert_eq!(snap.origin, "");
        assert_eq!(snap.destination, "Office");
        assert_eq!(snap.duration_formatted, "");
        assert!(snap.route_coordinates.is_empty());
        assert!(!snap.has_geometry());
        assert_eq!(snap.route_segments[0].traffic_level, TrafficLevel::Heavy);
        assert_eq!(snap.traffic_events[0].kind, IncidentKind::Crash);
        assert_eq!(snap.traffic_events[0].location, "");

        let snap: CommuteSnapshot =
            serde_json::from_value(json!({"route_segments": null, "traffic_events": null})).unwrap();
        assert!(snap.route_segments.is_empty());
        assert!(snap.traffic_events.is_empty());

        let ev: TrafficHistoryEvent = serde_json::from_value(json!({"type": "closure", "date": null})).unwrap();
        assert_eq!(ev.date, "");
    }

    #[test]
    fn test_route_falls_back_to_segments() {
        let snap: CommuteSnapshot = serde_json::from_value(json!({
            "route_segments": [
                {"coordinates": [[0.0, 0.0], [1.0, 1.0]], "traffic_level": "heavy"},
                {"coordinates": [[1.0, 1.0], [2.0, 2.0]], "traffic_level": "light"}
            ]
        }))
        .unwrap();
        assert!(snap.has_geometry());
        assert_eq!(snap.route().len(), 4);
    }

    #[test]
    fn test_incident_position_needs_both_coordinates() {
        let mut inc: TrafficIncident = serde_json::from_value(json!({"type": "crash", "lat": 1.0})).unwrap();
        assert_eq!(inc.position(), None);
        inc.lon = Some(2.0);
        assert_eq!(inc.position(), Some((1.0, 2.0)));
    }
}
