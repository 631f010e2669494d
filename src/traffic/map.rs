//! Route map: scene construction and the single live overlay.
//!
//! `build_scene` is pure: it turns a snapshot and its classification into a
//! `MapScene`. A `MapSurface` (the mapping library) mounts a scene and hands
//! back a `MapHandle`; `MapRenderer` owns at most one handle and always
//! removes the previous one before mounting the next.

use serde::Serialize;
use serde_json::{json, Value};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use super::classify::{level_color, Classification, IncidentDisplay, LIGHT_COLOR};
use super::model::{CommuteSnapshot, LonLat, TrafficIncident, TrafficLevel};
use crate::config::Config;
use crate::dom::Document;
use crate::html::escape;
use crate::logging::{log, obj, v_str, Domain, Level};

pub const ROUTE_WEIGHT: u32 = 6;
pub const ROUTE_OPACITY: f64 = 0.9;
pub const EMPHASIZED_RADIUS: u32 = 14;
pub const MARKER_RADIUS: u32 = 8;

#[derive(Debug, Clone, PartialEq)]
pub enum MapError {
    /// The mapping library (or its container) is not available.
    Unavailable(String),
    /// The container never reported a size.
    LayoutTimeout,
    /// Nothing to draw.
    EmptyRoute,
}

impl fmt::Display for MapError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MapError::Unavailable(why) => write!(f, "map unavailable: {}", why),
            MapError::LayoutTimeout => write!(f, "map container was never laid out"),
            MapError::EmptyRoute => write!(f, "route has no coordinates"),
        }
    }
}

impl std::error::Error for MapError {}

// =============================================================================
// Scene
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Bounds {
    pub south: f64,
    pub west: f64,
    pub north: f64,
    pub east: f64,
}

impl Bounds {
    /// Smallest box around `[lon, lat]` points; `None` when there are none.
    pub fn around(points: &[LonLat]) -> Option<Self> {
        let mut iter = points.iter().filter(|p| p[0].is_finite() && p[1].is_finite());
        let first = iter.next()?;
        let mut b = Bounds { south: first[1], west: first[0], north: first[1], east: first[0] };
        for p in iter {
            b.south = b.south.min(p[1]);
            b.north = b.north.max(p[1]);
            b.west = b.west.min(p[0]);
            b.east = b.east.max(p[0]);
        }
        Some(b)
    }

    pub fn contains(&self, lat: f64, lon: f64) -> bool {
        lat >= self.south && lat <= self.north && lon >= self.west && lon <= self.east
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TileLayer {
    pub url: String,
    pub attribution: String,
    pub max_zoom: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MarkerRole {
    Origin,
    Destination,
    Incident,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Marker {
    pub role: MarkerRole,
    pub lat: f64,
    pub lon: f64,
    /// Always-visible label.
    pub label: Option<String>,
    pub popup: Option<String>,
    pub icon: Option<&'static str>,
    pub color: Option<&'static str>,
    pub radius: Option<u32>,
    pub pulse: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Polyline {
    /// `(lat, lon)` pairs.
    pub points: Vec<(f64, f64)>,
    pub color: &'static str,
    pub level: TrafficLevel,
    pub weight: u32,
    pub opacity: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct View {
    pub bounds: Bounds,
    pub padding_px: u32,
    pub max_zoom: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapScene {
    pub tiles: TileLayer,
    pub polylines: Vec<Polyline>,
    pub markers: Vec<Marker>,
    pub view: View,
}

#[derive(Debug, Clone)]
pub struct SceneOptions {
    pub padding_px: u32,
    pub max_zoom: u8,
    pub tiles: TileLayer,
}

impl SceneOptions {
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            padding_px: cfg.map_padding_px,
            max_zoom: cfg.map_max_zoom,
            tiles: TileLayer {
                url: cfg.tile_url.clone(),
                attribution: cfg.tile_attribution.clone(),
                max_zoom: cfg.tile_max_zoom,
            },
        }
    }
}

fn lat_lon(points: &[LonLat]) -> Vec<(f64, f64)> {
    points.iter().map(|p| (p[1], p[0])).collect()
}

fn incident_popup(incident: &TrafficIncident, display: &IncidentDisplay) -> String {
    format!(
        "<strong>{} {}</strong><br>{}<br>{}<br><small>{}</small>",
        display.icon,
        escape(&display.label),
        escape(&incident.description),
        escape(&incident.location),
        escape(&incident.time),
    )
}

pub fn build_scene(
    snapshot: &CommuteSnapshot,
    classification: &Classification,
    opts: &SceneOptions,
) -> Result<MapScene, MapError> {
    let route = snapshot.route();
    let bounds = Bounds::around(&route).ok_or(MapError::EmptyRoute)?;

    let mut polylines: Vec<Polyline> = snapshot
        .route_segments
        .iter()
        .filter(|s| !s.coordinates.is_empty())
        .map(|s| Polyline {
            points: lat_lon(&s.coordinates),
            color: level_color(s.traffic_level),
            level: s.traffic_level,
            weight: ROUTE_WEIGHT,
            opacity: ROUTE_OPACITY,
        })
        .collect();
    if polylines.is_empty() {
        polylines.push(Polyline {
            points: lat_lon(&route),
            color: LIGHT_COLOR,
            level: TrafficLevel::Light,
            weight: ROUTE_WEIGHT,
            opacity: ROUTE_OPACITY,
        });
    }

    let mut markers = Vec::new();
    let start = snapshot.origin_point().or_else(|| route.first().map(|p| (p[1], p[0])));
    let finish = snapshot.destination_point().or_else(|| route.last().map(|p| (p[1], p[0])));
    for (role, point, label) in [
        (MarkerRole::Origin, start, format!("Start: {}", snapshot.origin)),
        (MarkerRole::Destination, finish, format!("Finish: {}", snapshot.destination)),
    ] {
        if let Some((lat, lon)) = point {
            markers.push(Marker {
                role,
                lat,
                lon,
                label: Some(escape(&label)),
                popup: None,
                icon: None,
                color: None,
                radius: None,
                pulse: false,
            });
        }
    }

    for (incident, display) in snapshot.traffic_events.iter().zip(&classification.incidents) {
        let Some((lat, lon)) = incident.position() else {
            continue;
        };
        markers.push(Marker {
            role: MarkerRole::Incident,
            lat,
            lon,
            label: None,
            popup: Some(incident_popup(incident, display)),
            icon: Some(display.icon),
            color: Some(display.color),
            radius: Some(if display.emphasized { EMPHASIZED_RADIUS } else { MARKER_RADIUS }),
            pulse: display.emphasized,
        });
    }

    Ok(MapScene {
        tiles: opts.tiles.clone(),
        polylines,
        markers,
        view: View { bounds, padding_px: opts.padding_px, max_zoom: opts.max_zoom },
    })
}

impl MapScene {
    /// GeoJSON `FeatureCollection` with the view and tile layer as foreign members.
    pub fn to_geojson(&self) -> Value {
        let mut features: Vec<Value> = self
            .polylines
            .iter()
            .map(|l| {
                json!({
                    "type": "Feature",
                    "geometry": {
                        "type": "LineString",
                        "coordinates": l.points.iter().map(|(lat, lon)| [*lon, *lat]).collect::<Vec<_>>(),
                    },
                    "properties": {
                        "kind": "route",
                        "level": l.level,
                        "color": l.color,
                        "weight": l.weight,
                        "opacity": l.opacity,
                    },
                })
            })
            .collect();
        features.extend(self.markers.iter().map(|m| {
            json!({
                "type": "Feature",
                "geometry": { "type": "Point", "coordinates": [m.lon, m.lat] },
                "properties": {
                    "kind": m.role,
                    "label": m.label,
                    "permanent_label": m.label.is_some(),
                    "popup": m.popup,
                    "icon": m.icon,
                    "color": m.color,
                    "radius": m.radius,
                    "pulse": m.pulse,
                },
            })
        }));
        let b = self.view.bounds;
        json!({
            "type": "FeatureCollection",
            "bbox": [b.west, b.south, b.east, b.north],
            "features": features,
            "view": { "padding_px": self.view.padding_px, "max_zoom": self.view.max_zoom },
            "tiles": self.tiles,
        })
    }
}

// =============================================================================
// Surfaces and the renderer
// =============================================================================

/// A live drawing on a surface.
pub trait MapHandle: Send {
    fn remove(&mut self);
}

/// The mapping library.
pub trait MapSurface: Send + Sync {
    fn mount(&self, container: &str, scene: &MapScene) -> Result<Box<dyn MapHandle>, MapError>;
}

/// Mounts scenes as GeoJSON on the map container of a `Document`.
pub struct DocumentSurface {
    doc: Document,
}

impl DocumentSurface {
    pub fn new(doc: Document) -> Self {
        Self { doc }
    }
}

struct DocumentHandle {
    doc: Document,
    container: String,
}

impl MapHandle for DocumentHandle {
    fn remove(&mut self) {
        self.doc.set_scene(&self.container, None);
    }
}

impl MapSurface for DocumentSurface {
    fn mount(&self, container: &str, scene: &MapScene) -> Result<Box<dyn MapHandle>, MapError> {
        if !self.doc.set_scene(container, Some(scene.to_geojson())) {
            return Err(MapError::Unavailable(format!("no container {}", container)));
        }
        Ok(Box::new(DocumentHandle { doc: self.doc.clone(), container: container.to_string() }))
    }
}

/// Stand-in for a mapping library that failed to load.
pub struct NullSurface;

impl MapSurface for NullSurface {
    fn mount(&self, _container: &str, _scene: &MapScene) -> Result<Box<dyn MapHandle>, MapError> {
        Err(MapError::Unavailable("mapping library not loaded".to_string()))
    }
}

/// Owns the one live route overlay.
pub struct MapRenderer {
    surface: Arc<dyn MapSurface>,
    current: Mutex<Option<Box<dyn MapHandle>>>,
}

impl MapRenderer {
    pub fn new(surface: Arc<dyn MapSurface>) -> Self {
        Self { surface, current: Mutex::new(None) }
    }

    fn slot(&self) -> MutexGuard<'_, Option<Box<dyn MapHandle>>> {
        self.current.lock().unwrap_or_else(|p| p.into_inner())
    }

    pub fn is_live(&self) -> bool {
        self.slot().is_some()
    }

    /// Tear down the current overlay, if any.
    pub fn clear(&self) {
        if let Some(mut old) = self.slot().take() {
            old.remove();
            log(Level::Debug, Domain::Map, "overlay_removed", obj(&[]));
        }
    }

    /// Remove whatever is live, then mount `scene` as the new overlay.
    pub fn replace(&self, container: &str, scene: &MapScene) -> Result<(), MapError> {
        let mut slot = self.slot();
        if let Some(mut old) = slot.take() {
            old.remove();
        }
        let handle = self.surface.mount(container, scene)?;
        *slot = Some(handle);
        log(
            Level::Debug,
            Domain::Map,
            "overlay_mounted",
            obj(&[
                ("container", v_str(container)),
                ("polylines", json!(scene.polylines.len())),
                ("markers", json!(scene.markers.len())),
            ]),
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traffic::classify::{classify, HEAVY_COLOR};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn snapshot(v: Value) -> CommuteSnapshot {
        serde_json::from_value(v).unwrap()
    }

    fn opts() -> SceneOptions {
        SceneOptions::from_config(&Config::default())
    }

    fn scene_for(s: &CommuteSnapshot) -> Result<MapScene, MapError> {
        build_scene(s, &classify(&s.route_segments, &s.traffic_events), &opts())
    }

    #[test]
    fn test_bounds() {
        let b = Bounds::around(&[[-74.0, 40.7], [-73.9, 40.8], [-74.1, 40.75]]).unwrap();
        assert_eq!((b.south, b.west, b.north, b.east), (40.7, -74.1, 40.8, -73.9));
        assert!(b.contains(40.75, -74.0));
        assert!(Bounds::around(&[]).is_none());
    }

    #[test]
    fn test_segment_polylines_and_markers() {
        let s = snapshot(json!({
            "origin": "Home", "destination": "Work",
            "origin_lat": 40.7, "origin_lon": -74.0, "dest_lat": 40.8, "dest_lon": -73.9,
            "route_coordinates": [[-74.0, 40.7], [-73.95, 40.75], [-73.9, 40.8]],
            "route_segments": [
                {"coordinates": [[-74.0, 40.7], [-73.95, 40.75]], "traffic_level": "heavy"},
                {"coordinates": [[-73.95, 40.75], [-73.9, 40.8]], "traffic_level": "light"}
            ],
            "traffic_events": [
                {"type": "crash", "traffic_level": "light", "lat": 40.75, "lon": -73.95, "description": "two cars"},
                {"type": "construction", "lat": 40.76, "lon": -73.94},
                {"type": "incident", "location": "somewhere unmapped"}
            ]
        }));
        let scene = scene_for(&s).unwrap();

        assert_eq!(scene.polylines.len(), 2);
        assert_eq!(scene.polylines[0].color, HEAVY_COLOR);
        assert_eq!(scene.polylines[0].points[0], (40.7, -74.0));

        let labels: Vec<_> = scene.markers.iter().filter_map(|m| m.label.clone()).collect();
        assert_eq!(labels, vec!["Start: Home", "Finish: Work"]);

        let incidents: Vec<_> = scene.markers.iter().filter(|m| m.role == MarkerRole::Incident).collect();
        assert_eq!(incidents.len(), 2);
        assert!(incidents[0].pulse);
        assert_eq!(incidents[0].radius, Some(EMPHASIZED_RADIUS));
        assert!(incidents[0].popup.as_deref().unwrap().contains("two cars"));
        assert!(!incidents[1].pulse);
        assert_eq!(scene.view.max_zoom, 15);
        assert_eq!(scene.view.padding_px, 30);
    }

    #[test]
    fn test_unsegmented_route_draws_one_light_line() {
        let s = snapshot(json!({"route_coordinates": [[0.0, 0.0], [0.5, 0.5], [1.0, 1.0]]}));
        let scene = scene_for(&s).unwrap();
        assert_eq!(scene.polylines.len(), 1);
        assert_eq!(scene.polylines[0].color, LIGHT_COLOR);
        assert_eq!(scene.polylines[0].points.len(), 3);
        // endpoints stand in for missing origin/destination coordinates
        assert_eq!(scene.markers[0].lat, 0.0);
        assert_eq!(scene.markers[1].lat, 1.0);
    }

    #[test]
    fn test_empty_route_is_an_error() {
        assert_eq!(scene_for(&snapshot(json!({"origin": "A"}))), Err(MapError::EmptyRoute));
    }

    #[test]
    fn test_geojson_shape() {
        let s = snapshot(json!({"route_coordinates": [[0.0, 0.0], [1.0, 2.0]]}));
        let gj = scene_for(&s).unwrap().to_geojson();
        assert_eq!(gj["type"], "FeatureCollection");
        assert_eq!(gj["bbox"], json!([0.0, 0.0, 1.0, 2.0]));
        assert_eq!(gj["features"][0]["geometry"]["coordinates"][1], json!([1.0, 2.0]));
        assert_eq!(gj["features"][1]["properties"]["permanent_label"], true);
    }

    struct CountingSurface {
        live: Arc<AtomicUsize>,
    }

    struct CountingHandle {
        live: Arc<AtomicUsize>,
    }

    impl MapHandle for CountingHandle {
        fn remove(&mut self) {
            self.live.fetch_sub(1, Ordering::SeqCst);
        }
    }

    impl MapSurface for CountingSurface {
        fn mount(&self, _c: &str, _s: &MapScene) -> Result<Box<dyn MapHandle>, MapError> {
            self.live.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(CountingHandle { live: self.live.clone() }))
        }
    }

    #[test]
    fn test_replace_keeps_one_live_overlay() {
        let live = Arc::new(AtomicUsize::new(0));
        let renderer = MapRenderer::new(Arc::new(CountingSurface { live: live.clone() }));
        let scene = scene_for(&snapshot(json!({"route_coordinates": [[0.0, 0.0], [1.0, 1.0]]}))).unwrap();

        for _ in 0..3 {
            renderer.replace("commute-map", &scene).unwrap();
            assert_eq!(live.load(Ordering::SeqCst), 1);
        }
        renderer.clear();
        assert_eq!(live.load(Ordering::SeqCst), 0);
        assert!(!renderer.is_live());
    }

    #[test]
    fn test_document_surface_mounts_and_removes() {
        let doc = Document::with_containers(&["commute-map"]);
        let renderer = MapRenderer::new(Arc::new(DocumentSurface::new(doc.clone())));
        let scene = scene_for(&snapshot(json!({"route_coordinates": [[0.0, 0.0], [1.0, 1.0]]}))).unwrap();

        renderer.replace("commute-map", &scene).unwrap();
        assert_eq!(doc.scene("commute-map").unwrap()["type"], "FeatureCollection");
        renderer.clear();
        assert!(doc.scene("commute-map").is_none());

        assert!(matches!(renderer.replace("elsewhere", &scene), Err(MapError::Unavailable(_))));
        assert!(!renderer.is_live());
    }

    #[test]
    fn test_null_surface_fails() {
        let renderer = MapRenderer::new(Arc::new(NullSurface));
        let scene = scene_for(&snapshot(json!({"route_coordinates": [[0.0, 0.0]]}))).unwrap();
        assert!(renderer.replace("commute-map", &scene).is_err());
    }
}
