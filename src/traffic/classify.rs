//! Route condition and incident display classification.
//!
//! The overall condition is measured flow on the route itself; incidents are
//! only ever classified for display and never feed into it.

use serde::Serialize;

use super::model::{IncidentKind, RouteSegment, TrafficIncident, TrafficLevel};

pub const LIGHT_COLOR: &str = "#4caf50";
pub const MEDIUM_COLOR: &str = "#ffc107";
pub const HEAVY_COLOR: &str = "#f44336";
pub const CONSTRUCTION_COLOR: &str = "#ff9800";

/// Share of heavy segments above which the route is heavy.
pub const HEAVY_SHARE: f64 = 0.2;
/// Share of heavy+medium segments above which the route is medium.
pub const CONGESTED_SHARE: f64 = 0.3;

/// Route/incident color for a traffic level. Never blue: the tiles own blue.
pub fn level_color(level: TrafficLevel) -> &'static str {
    match level {
        TrafficLevel::Light => LIGHT_COLOR,
        TrafficLevel::Medium => MEDIUM_COLOR,
        TrafficLevel::Heavy => HEAVY_COLOR,
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LevelTally {
    pub light: usize,
    pub medium: usize,
    pub heavy: usize,
}

impl LevelTally {
    pub fn of(segments: &[RouteSegment]) -> Self {
        let mut t = Self::default();
        for s in segments {
            match s.traffic_level {
                TrafficLevel::Light => t.light += 1,
                TrafficLevel::Medium => t.medium += 1,
                TrafficLevel::Heavy => t.heavy += 1,
            }
        }
        t
    }

    pub fn total(&self) -> usize {
        self.light + self.medium + self.heavy
    }

    pub fn overall(&self) -> TrafficLevel {
        let total = self.total();
        if total == 0 {
            return TrafficLevel::Light;
        }
        let total = total as f64;
        if self.heavy as f64 / total > HEAVY_SHARE {
            TrafficLevel::Heavy
        } else if (self.heavy + self.medium) as f64 / total > CONGESTED_SHARE {
            TrafficLevel::Medium
        } else {
            TrafficLevel::Light
        }
    }
}

pub fn overall_condition(segments: &[RouteSegment]) -> TrafficLevel {
    LevelTally::of(segments).overall()
}

/// How one incident is drawn in the list and on the map.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IncidentDisplay {
    pub icon: &'static str,
    pub color: &'static str,
    pub label: String,
    /// Large pulsing marker (crash, closure).
    pub emphasized: bool,
}

pub fn incident_display(incident: &TrafficIncident) -> IncidentDisplay {
    display_for(incident.kind, incident.traffic_level)
}

pub fn display_for(kind: IncidentKind, level: TrafficLevel) -> IncidentDisplay {
    let fixed = |icon, color, label: &str, emphasized| IncidentDisplay {
        icon,
        color,
        label: label.to_string(),
        emphasized,
    };
    match kind {
        IncidentKind::Crash => fixed("🚨", HEAVY_COLOR, "Crash", true),
        IncidentKind::Closure => fixed("⛔", HEAVY_COLOR, "Road Closure", true),
        IncidentKind::Construction => fixed("🚧", CONSTRUCTION_COLOR, "Construction", false),
        IncidentKind::Weather => fixed("🌧️", MEDIUM_COLOR, "Weather", false),
        IncidentKind::Incident => fixed("⚠️", MEDIUM_COLOR, "Incident", false),
        IncidentKind::Traffic | IncidentKind::Unknown => IncidentDisplay {
            icon: match level {
                TrafficLevel::Light => "ℹ️",
                _ => "⚠️",
            },
            color: level_color(level),
            label: format!("{} Traffic", crate::html::capitalize(level.as_str())),
            emphasized: false,
        },
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub overall: TrafficLevel,
    pub tally: LevelTally,
    pub segment_colors: Vec<&'static str>,
    pub incidents: Vec<IncidentDisplay>,
}

pub fn classify(segments: &[RouteSegment], incidents: &[TrafficIncident]) -> Classification {
    let tally = LevelTally::of(segments);
    Classification {
        overall: tally.overall(),
        tally,
        segment_colors: segments.iter().map(|s| level_color(s.traffic_level)).collect(),
        incidents: incidents.iter().map(incident_display).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seg(level: TrafficLevel) -> RouteSegment {
        RouteSegment {
            coordinates: vec![[0.0, 0.0], [1.0, 1.0]],
            traffic_level: level,
            distance_m: None,
            duration_sec: None,
            free_flow_duration_sec: None,
            delay_ratio: None,
        }
    }

    fn segs(light: usize, medium: usize, heavy: usize) -> Vec<RouteSegment> {
        let mut v = Vec::new();
        v.extend((0..light).map(|_| seg(TrafficLevel::Light)));
        v.extend((0..medium).map(|_| seg(TrafficLevel::Medium)));
        v.extend((0..heavy).map(|_| seg(TrafficLevel::Heavy)));
        v
    }

    fn incident(kind: IncidentKind, level: TrafficLevel) -> TrafficIncident {
        TrafficIncident {
            kind,
            traffic_level: level,
            location: "Route segment 1".into(),
            description: String::new(),
            time: "08:15 AM".into(),
            lat: Some(40.0),
            lon: Some(-74.0),
        }
    }

    #[test]
    fn test_no_segments_is_light() {
        assert_eq!(overall_condition(&[]), TrafficLevel::Light);
    }

    #[test]
    fn test_one_of_two_heavy_is_heavy() {
        assert_eq!(overall_condition(&segs(1, 0, 1)), TrafficLevel::Heavy);
    }

    #[test]
    fn test_thresholds_are_strict() {
        // exactly 20% heavy is not heavy; 20% + 10% medium is exactly 30%, not medium
        assert_eq!(overall_condition(&segs(7, 1, 2)), TrafficLevel::Light);
        assert_eq!(overall_condition(&segs(6, 2, 2)), TrafficLevel::Medium);
        assert_eq!(overall_condition(&segs(4, 0, 1)), TrafficLevel::Light);
        assert_eq!(overall_condition(&segs(3, 1, 1)), TrafficLevel::Medium);
    }

    #[test]
    fn test_rule_over_all_small_distributions() {
        for light in 0..8 {
            for medium in 0..8 {
                for heavy in 0..8 {
                    let total = light + medium + heavy;
                    let got = overall_condition(&segs(light, medium, heavy));
                    let want = if total == 0 {
                        TrafficLevel::Light
                    } else if heavy as f64 / total as f64 > 0.2 {
                        TrafficLevel::Heavy
                    } else if (heavy + medium) as f64 / total as f64 > 0.3 {
                        TrafficLevel::Medium
                    } else {
                        TrafficLevel::Light
                    };
                    assert_eq!(got, want, "light={} medium={} heavy={}", light, medium, heavy);
                }
            }
        }
    }

    #[test]
    fn test_incidents_never_change_overall() {
        let segments = segs(9, 0, 0);
        let quiet = classify(&segments, &[]);
        let noisy = classify(
            &segments,
            &[
                incident(IncidentKind::Crash, TrafficLevel::Heavy),
                incident(IncidentKind::Closure, TrafficLevel::Heavy),
                incident(IncidentKind::Traffic, TrafficLevel::Heavy),
            ],
        );
        assert_eq!(quiet.overall, TrafficLevel::Light);
        assert_eq!(noisy.overall, quiet.overall);
        assert_eq!(noisy.incidents.len(), 3);
    }

    #[test]
    fn test_crash_is_emphasized_regardless_of_level() {
        for level in [TrafficLevel::Light, TrafficLevel::Medium, TrafficLevel::Heavy] {
            let d = incident_display(&incident(IncidentKind::Crash, level));
            assert!(d.emphasized);
            assert_eq!(d.color, HEAVY_COLOR);
            assert_eq!(d.icon, "🚨");
        }
        assert!(!incident_display(&incident(IncidentKind::Construction, TrafficLevel::Heavy)).emphasized);
    }

    #[test]
    fn test_unknown_kind_falls_back_to_level() {
        let d = incident_display(&incident(IncidentKind::Unknown, TrafficLevel::Medium));
        assert_eq!(d.color, MEDIUM_COLOR);
        assert_eq!(d.label, "Medium Traffic");
    }

    #[test]
    fn test_palette_has_no_blue() {
        let colors = [LIGHT_COLOR, MEDIUM_COLOR, HEAVY_COLOR, CONSTRUCTION_COLOR];
        for c in colors {
            let b = u8::from_str_radix(&c[5..7], 16).unwrap();
            let r = u8::from_str_radix(&c[1..3], 16).unwrap();
            let g = u8::from_str_radix(&c[3..5], 16).unwrap();
            assert!(b < r.max(g), "{} reads as blue", c);
        }
    }

    #[test]
    fn test_segment_colors_follow_levels() {
        let c = classify(&segs(1, 1, 1), &[]);
        assert_eq!(c.segment_colors, vec![LIGHT_COLOR, MEDIUM_COLOR, HEAVY_COLOR]);
    }
}
