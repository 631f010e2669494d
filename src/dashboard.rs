//! Dashboard orchestrator: load modules, render once, bind forms, then keep
//! refreshing on one timer and reloading the whole page on another.

use futures_util::future::join_all;
use serde_json::json;
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use tokio::time::{interval_at, sleep, Instant, MissedTickBehavior};

use crate::forms::Forms;
use crate::logging::{log, log_cycle_summary, obj, v_str, Domain, Level, ProfileScope};
use crate::widget::{Outcome, Page, Panel, Registry};
use crate::widgets::catalog;

/// Every container id the dashboard page carries.
pub const PAGE_CONTAINERS: &[&str] = &[
    "weather-widget",
    "forecast-widget",
    "news-widget",
    "weather-alerts-widget",
    "joke-widget",
    "joke-history",
    "joke-history-list",
    "joke-history-pagination",
    "joke-page-info",
    "joke-prev-btn",
    "joke-next-btn",
    "packages-widget",
    "add-package-form",
    "package-tracking",
    "package-description",
    "packages-archive",
    "packages-archive-list",
    "packages-archive-pagination",
    "archive-page-info",
    "archive-prev-btn",
    "archive-next-btn",
    "quote-widget",
    "quote-history",
    "quote-history-list",
    "quote-history-pagination",
    "quote-page-info",
    "quote-prev-btn",
    "quote-next-btn",
    "calendar-widget",
    "feeds-list",
    "add-feed-form",
    "feed-name",
    "feed-url",
    "local-events-list",
    "add-event-form",
    "event-title",
    "event-start",
    "event-end",
    "event-location",
    "event-description",
    "air-quality-widget",
    "astronomy-widget",
    "speed-widget",
    "run-speed-test",
    "sports-teams-list",
    "sports-form",
    "sports-team-input",
    "sports-sport-select",
    "sports-widget",
    "photo-gallery",
    "shopping-list-widget",
    "add-shopping-item-form",
    "shopping-item-name",
    "ha-widget",
    "commute-widget",
    "commute-map",
    "commute-refresh",
    "commute-form",
    "commute-origin",
    "commute-destination",
    "traffic-history",
    "traffic-history-list",
];

/// Per-panel outcomes of one pass.
#[derive(Debug, Clone, Default)]
pub struct CycleReport {
    pub outcomes: Vec<(&'static str, Outcome)>,
    pub elapsed_ms: f64,
}

impl CycleReport {
    pub fn count(&self, outcome: Outcome) -> usize {
        self.outcomes.iter().filter(|(_, o)| *o == outcome).count()
    }

    pub fn outcome(&self, name: &str) -> Option<Outcome> {
        self.outcomes.iter().find(|(n, _)| *n == name).map(|(_, o)| *o)
    }

    fn tally(&self) -> BTreeMap<&'static str, usize> {
        let mut counts = BTreeMap::new();
        for (_, o) in &self.outcomes {
            *counts.entry(o.as_str()).or_insert(0) += 1;
        }
        counts
    }
}

#[derive(Clone)]
pub struct Dashboard {
    page: Page,
    registry: Registry,
}

impl Dashboard {
    pub fn new(page: Page) -> Self {
        Self { page, registry: Registry::default() }
    }

    pub fn page(&self) -> &Page {
        &self.page
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Build the panel catalog. Disabled modules are logged and skipped.
    pub fn load_modules(&mut self) -> usize {
        let panels = catalog(&self.page);
        for name in &self.page.config.disabled_widgets {
            log(
                Level::Warn,
                Domain::Dashboard,
                "module_unavailable",
                obj(&[("widget", v_str(name))]),
            );
        }
        self.registry = Registry::new(panels);
        log(
            Level::Info,
            Domain::Dashboard,
            "modules_loaded",
            obj(&[("count", json!(self.registry.panels().len()))]),
        );
        self.registry.panels().len()
    }

    /// Bind every panel's own controls, then the forms and list actions.
    pub fn install_handlers(&self) {
        for panel in self.registry.panels() {
            panel.clone().bind(&self.page);
        }
        Forms::install(&self.page, &self.registry);
    }

    async fn run_pass<'a>(&self, cycle: &str, panels: impl Iterator<Item = &'a Arc<dyn Panel>>) -> CycleReport {
        let scope = ProfileScope::new(Domain::Dashboard, "cycle");
        let page = &self.page;
        let outcomes = join_all(panels.map(|p| async move { (p.name(), p.load(page).await) })).await;
        let report = CycleReport { outcomes, elapsed_ms: scope.elapsed_ms() };
        let tally: Vec<(&str, usize)> = report.tally().into_iter().collect();
        log_cycle_summary(cycle, &tally, report.elapsed_ms);
        report
    }

    /// Render every loaded panel concurrently; no panel waits on another.
    pub async fn initial_render(&self) -> CycleReport {
        self.run_pass("initial", self.registry.panels().iter()).await
    }

    /// Re-render the panels that follow the refresh timer.
    pub async fn refresh_cycle(&self) -> CycleReport {
        self.run_pass("refresh", self.registry.panels().iter().filter(|p| p.periodic())).await
    }

    /// Load modules, render, and bind handlers.
    pub async fn init(&mut self) -> CycleReport {
        self.load_modules();
        let report = self.initial_render().await;
        self.install_handlers();
        report
    }

    /// Drop everything on the page and start over.
    pub async fn reload(&mut self) -> CycleReport {
        log(Level::Info, Domain::Dashboard, "reload", obj(&[]));
        self.page.doc.reset();
        self.init().await
    }

    /// Run until `shutdown` resolves. Call after `init`.
    pub async fn run_until(mut self, shutdown: impl Future<Output = ()>) {
        let every = self.page.config.refresh_every();
        let mut refresh = interval_at(Instant::now() + every, every);
        refresh.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let reload = sleep(self.page.config.reload_after());
        tokio::pin!(reload);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    log(Level::Info, Domain::Dashboard, "shutdown", obj(&[]));
                    return;
                }
                _ = refresh.tick() => {
                    let dashboard = self.clone();
                    tokio::spawn(async move {
                        dashboard.refresh_cycle().await;
                    });
                }
                _ = &mut reload => {
                    self.reload().await;
                    reload.as_mut().reset(Instant::now() + self.page.config.reload_after());
                }
            }
        }
    }

    pub async fn run(self) {
        self.run_until(std::future::pending()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::StubBackend;
    use crate::config::Config;
    use crate::dom::{ActionEvent, Document};
    use serde_json::json;
    use std::time::Duration;

    fn dashboard(stub: Arc<StubBackend>, ids: &[&str], config: Config) -> Dashboard {
        Dashboard::new(Page::new(Document::with_containers(ids), stub, config))
    }

    #[tokio::test]
    async fn test_one_failure_does_not_block_others() {
        let stub = Arc::new(StubBackend::new());
        stub.json("/api/daily-quote", json!({"text": "Onward", "author": "Anon"}));
        stub.unreachable("/api/astronomy");
        let mut d = dashboard(stub, &["quote-widget", "astronomy-widget"], Config::default());

        let report = d.init().await;
        assert_eq!(report.outcome("quote"), Some(Outcome::Rendered));
        assert_eq!(report.outcome("astronomy"), Some(Outcome::Failed));
        assert_eq!(report.outcome("weather"), Some(Outcome::Absent));
        let doc = &d.page().doc;
        assert!(doc.html("quote-widget").unwrap().contains("Onward"));
        assert!(doc.html("astronomy-widget").unwrap().contains("Failed to load astronomy data"));
    }

    #[tokio::test]
    async fn test_disabled_module_is_skipped() {
        let stub = Arc::new(StubBackend::new());
        let config = Config { disabled_widgets: vec!["quote".into()], ..Config::default() };
        let mut d = dashboard(stub.clone(), &["quote-widget"], config);
        d.init().await;
        assert!(d.registry().get("quote").is_none());
        assert_eq!(stub.count("/api/daily-quote"), 0);
        assert_eq!(d.page().doc.html("quote-widget").as_deref(), Some(""));
    }

    #[tokio::test]
    async fn test_refresh_skips_settings_lists() {
        let stub = Arc::new(StubBackend::new());
        stub.json("/api/daily-quote", json!({"text": "a", "author": "b"}));
        stub.json("/api/shopping-list", json!([]));
        let mut d = dashboard(stub.clone(), &["quote-widget", "shopping-list-widget"], Config::default());
        d.init().await;
        d.refresh_cycle().await;
        assert_eq!(stub.count("/api/daily-quote"), 2);
        assert_eq!(stub.count("/api/shopping-list"), 1);
    }

    #[tokio::test]
    async fn test_handlers_installed_once_per_init() {
        let stub = Arc::new(StubBackend::new());
        let mut d = dashboard(
            stub,
            &["commute-widget", "commute-refresh", "joke-prev-btn", "add-shopping-item-form"],
            Config::default(),
        );
        d.init().await;
        let doc = &d.page().doc;
        assert!(doc.is_bound("commute-refresh", "click"));
        assert!(doc.is_bound("joke-prev-btn", "click"));
        assert!(doc.is_bound("add-shopping-item-form", "submit"));

        d.reload().await;
        assert!(d.page().doc.is_bound("commute-refresh", "click"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timers_drive_refresh_and_reload() {
        let stub = Arc::new(StubBackend::new());
        stub.json("/api/daily-quote", json!({"text": "a", "author": "b"}));
        stub.json("/api/shopping-list", json!([]));
        let config = Config { refresh_secs: 10, reload_secs: 25, ..Config::default() };
        let mut d = dashboard(stub.clone(), &["quote-widget", "shopping-list-widget"], config);
        d.init().await;
        d.page().doc.notify("stale");
        let doc = d.page().doc.clone();

        d.run_until(sleep(Duration::from_secs(26))).await;

        // init, refresh at 10s and 20s, reload at 25s
        assert_eq!(stub.count("/api/daily-quote"), 4);
        // init and reload only
        assert_eq!(stub.count("/api/shopping-list"), 2);
        assert!(doc.notices().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_default_timers_refresh_before_reloading() {
        let stub = Arc::new(StubBackend::new());
        stub.json("/api/daily-quote", json!({"text": "a", "author": "b"}));
        stub.json("/api/shopping-list", json!([]));
        let mut d = dashboard(stub.clone(), &["quote-widget", "shopping-list-widget"], Config::default());
        d.init().await;

        d.run_until(sleep(Duration::from_secs(601))).await;

        // init, then refreshes at 300s and 600s; no reload yet
        assert_eq!(stub.count("/api/daily-quote"), 3);
        assert_eq!(stub.count("/api/shopping-list"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reload_leaves_refresh_schedule_alone() {
        let stub = Arc::new(StubBackend::new());
        stub.json("/api/daily-quote", json!({"text": "a", "author": "b"}));
        let config = Config { refresh_secs: 10, reload_secs: 7, ..Config::default() };
        let mut d = dashboard(stub.clone(), &["quote-widget"], config);
        d.init().await;

        d.run_until(sleep(Duration::from_secs(11))).await;

        // init, reload at 7s, refresh at 10s
        assert_eq!(stub.count("/api/daily-quote"), 3);
    }

    #[tokio::test]
    async fn test_forms_reach_registered_panels() {
        let stub = Arc::new(StubBackend::new());
        stub.json("/api/shopping-list", json!([{"id": 1, "item_name": "bread"}]));
        let mut d = dashboard(
            stub.clone(),
            &["shopping-list-widget", "add-shopping-item-form", "shopping-item-name"],
            Config::default(),
        );
        d.init().await;
        let doc = &d.page().doc;
        doc.set_value("shopping-item-name", "bread");
        assert!(doc.dispatch(ActionEvent::new("add-shopping-item-form", "submit")).await);
        assert_eq!(stub.count("/api/shopping-list"), 3);
    }
}
