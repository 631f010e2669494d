use std::time::Duration;

/// Runtime configuration, read from the environment with defaults.
#[derive(Debug, Clone)]
pub struct Config {
    pub api_base: String,
    pub http_timeout_secs: u64,
    pub refresh_secs: u64,
    pub reload_secs: u64,
    pub layout_timeout_ms: u64,
    pub map_padding_px: u32,
    pub map_max_zoom: u8,
    pub tile_url: String,
    pub tile_attribution: String,
    pub tile_max_zoom: u8,
    pub map_enabled: bool,
    pub history_per_page: u32,
    pub speed_test_wait_secs: u64,
    pub disabled_widgets: Vec<String>,
    pub viewport: (u32, u32),
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base: "http://127.0.0.1:5000".to_string(),
            http_timeout_secs: 10,
            refresh_secs: 300,
            reload_secs: 3_600,
            layout_timeout_ms: 2_000,
            map_padding_px: 30,
            map_max_zoom: 15,
            tile_url: "https://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png".to_string(),
            tile_attribution: "© OpenStreetMap contributors".to_string(),
            tile_max_zoom: 19,
            map_enabled: true,
            history_per_page: 5,
            speed_test_wait_secs: 30,
            disabled_widgets: Vec::new(),
            viewport: (800, 400),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            api_base: std::env::var("DASH_API_BASE").unwrap_or(d.api_base),
            http_timeout_secs: std::env::var("HTTP_TIMEOUT_SECS").ok().and_then(|v| v.parse().ok()).unwrap_or(d.http_timeout_secs),
            refresh_secs: std::env::var("REFRESH_SECS").ok().and_then(|v| v.parse().ok()).unwrap_or(d.refresh_secs),
            reload_secs: std::env::var("RELOAD_SECS").ok().and_then(|v| v.parse().ok()).unwrap_or(d.reload_secs),
            layout_timeout_ms: std::env::var("LAYOUT_TIMEOUT_MS").ok().and_then(|v| v.parse().ok()).unwrap_or(d.layout_timeout_ms),
            map_padding_px: std::env::var("MAP_PADDING_PX").ok().and_then(|v| v.parse().ok()).unwrap_or(d.map_padding_px),
            map_max_zoom: std::env::var("MAP_MAX_ZOOM").ok().and_then(|v| v.parse().ok()).unwrap_or(d.map_max_zoom),
            tile_url: std::env::var("TILE_URL").unwrap_or(d.tile_url),
            tile_attribution: std::env::var("TILE_ATTRIBUTION").unwrap_or(d.tile_attribution),
            tile_max_zoom: std::env::var("TILE_MAX_ZOOM").ok().and_then(|v| v.parse().ok()).unwrap_or(d.tile_max_zoom),
            map_enabled: std::env::var("MAP_ENABLED").map(|v| parse_flag(&v)).unwrap_or(d.map_enabled),
            history_per_page: std::env::var("HISTORY_PER_PAGE").ok().and_then(|v| v.parse().ok()).unwrap_or(d.history_per_page),
            speed_test_wait_secs: std::env::var("SPEED_TEST_WAIT_SECS").ok().and_then(|v| v.parse().ok()).unwrap_or(d.speed_test_wait_secs),
            disabled_widgets: std::env::var("DISABLED_WIDGETS").map(|v| parse_list(&v)).unwrap_or(d.disabled_widgets),
            viewport: std::env::var("VIEWPORT").ok().and_then(|v| parse_viewport(&v)).unwrap_or(d.viewport),
        }
    }

    pub fn refresh_every(&self) -> Duration {
        Duration::from_secs(self.refresh_secs.max(1))
    }

    pub fn reload_after(&self) -> Duration {
        Duration::from_secs(self.reload_secs.max(1))
    }

    pub fn layout_timeout(&self) -> Duration {
        Duration::from_millis(self.layout_timeout_ms)
    }

    pub fn widget_enabled(&self, name: &str) -> bool {
        !self.disabled_widgets.iter().any(|w| w == name)
    }
}

fn parse_flag(v: &str) -> bool {
    matches!(v.to_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

fn parse_list(v: &str) -> Vec<String> {
    v.split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect()
}

/// `800x400` -> (800, 400)
fn parse_viewport(v: &str) -> Option<(u32, u32)> {
    let (w, h) = v.split_once('x')?;
    let w = w.trim().parse().ok()?;
    let h = h.trim().parse().ok()?;
    if w == 0 || h == 0 {
        return None;
    }
    Some((w, h))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_viewport() {
        assert_eq!(parse_viewport("1024x600"), Some((1024, 600)));
        assert_eq!(parse_viewport(" 640 x 480 "), Some((640, 480)));
        assert_eq!(parse_viewport("0x480"), None);
        assert_eq!(parse_viewport("wide"), None);
    }

    #[test]
    fn test_parse_list_skips_blanks() {
        assert_eq!(parse_list("photos, ,sports"), vec!["photos", "sports"]);
        assert!(parse_list("").is_empty());
    }

    #[test]
    fn test_flags() {
        assert!(parse_flag("TRUE"));
        assert!(parse_flag("1"));
        assert!(!parse_flag("off"));
    }

    #[test]
    fn test_defaults_match_dashboard_timers() {
        let cfg = Config::default();
        assert_eq!(cfg.refresh_every(), Duration::from_secs(300));
        assert_eq!(cfg.reload_after(), Duration::from_secs(3_600));
        assert!(cfg.reload_after() > cfg.refresh_every());
        assert_eq!(cfg.map_max_zoom, 15);
        assert!(cfg.widget_enabled("weather"));
    }
}
