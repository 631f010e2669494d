//! The generic widget contract: fetch, parse, render-or-error.

use async_trait::async_trait;
use futures_util::future::join_all;
use serde_json::Value;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use crate::api::{error_field, Backend};
use crate::config::Config;
use crate::dom::{ActionEvent, ActionHandler, Document};
use crate::html::{error_box, is_blank, placeholder};
use crate::logging::{log, log_render, log_widget_failure, obj, v_str, Domain, Level};

/// What a render pass left in its container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    Rendered,
    Empty,
    /// Well-formed payload carrying a semantic `error`.
    Invalid,
    /// Transport, status or parse failure.
    Failed,
    /// Container not present on this page.
    Absent,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Rendered => "rendered",
            Outcome::Empty => "empty",
            Outcome::Invalid => "invalid",
            Outcome::Failed => "failed",
            Outcome::Absent => "absent",
        }
    }
}

/// Everything a panel needs to render: the document, the backend and config.
#[derive(Clone)]
pub struct Page {
    pub doc: Document,
    pub backend: Arc<dyn Backend>,
    pub config: Arc<Config>,
}

impl Page {
    pub fn new(doc: Document, backend: Arc<dyn Backend>, config: Config) -> Self {
        Self { doc, backend, config: Arc::new(config) }
    }
}

/// A dashboard module the orchestrator can load and refresh.
#[async_trait]
pub trait Panel: Send + Sync {
    fn name(&self) -> &'static str;

    /// Whether the periodic refresh re-runs this panel.
    fn periodic(&self) -> bool {
        true
    }

    async fn load(&self, page: &Page) -> Outcome;

    /// Install this panel's own controls (pagination, refresh buttons).
    fn bind(self: Arc<Self>, _page: &Page) {}
}

/// Loaded panels by name, so a form can re-render exactly what it touched.
#[derive(Clone, Default)]
pub struct Registry {
    panels: Arc<Vec<Arc<dyn Panel>>>,
}

impl Registry {
    pub fn new(panels: Vec<Arc<dyn Panel>>) -> Self {
        Self { panels: Arc::new(panels) }
    }

    pub fn panels(&self) -> &[Arc<dyn Panel>] {
        &self.panels
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Panel>> {
        self.panels.iter().find(|p| p.name() == name)
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.panels.iter().map(|p| p.name()).collect()
    }

    /// Load the named panels concurrently. Unknown or unloaded names are skipped.
    pub async fn reload(&self, page: &Page, names: &[&str]) -> Vec<(&'static str, Outcome)> {
        let targets = self.panels.iter().filter(|p| names.contains(&p.name()));
        join_all(targets.map(|p| async move { (p.name(), p.load(page).await) })).await
    }
}

pub type ViewFn = fn(&Value) -> Option<String>;

/// One fetch-and-template widget.
pub struct Widget {
    pub name: &'static str,
    pub container: &'static str,
    pub endpoint: &'static str,
    /// Sub-field of a shared payload to render.
    pub select: Option<&'static str>,
    /// Noun used in messages: "Failed to load {label}".
    pub label: &'static str,
    pub empty: &'static str,
    pub view: ViewFn,
    pub periodic: bool,
}

impl Widget {
    /// Turn a payload into the markup for this widget.
    pub fn present(&self, payload: &Value) -> (Outcome, String) {
        if let Some(err) = error_field(payload) {
            return (Outcome::Invalid, error_box(&format!("Error loading {}: {}", self.label, err)));
        }
        let data = match self.select {
            Some(key) => payload.get(key).unwrap_or(&Value::Null),
            None => payload,
        };
        if is_blank(data) {
            return (Outcome::Empty, placeholder(self.empty));
        }
        match (self.view)(data) {
            Some(html) => (Outcome::Rendered, html),
            None => (Outcome::Empty, placeholder(self.empty)),
        }
    }

    pub async fn render(&self, page: &Page) -> Outcome {
        if !page.doc.contains(self.container) {
            log(
                Level::Debug,
                Domain::Widget,
                "container_absent",
                obj(&[("widget", v_str(self.name)), ("container", v_str(self.container))]),
            );
            return Outcome::Absent;
        }

        let (outcome, html) = match page.backend.get(self.endpoint).await {
            Ok(payload) => self.present(&payload),
            Err(e) => {
                log_widget_failure(self.name, self.endpoint, &e.to_string());
                (Outcome::Failed, error_box(&format!("Failed to load {}", self.label)))
            }
        };

        if !page.doc.set_html(self.container, html.as_str()) {
            return Outcome::Absent;
        }
        log_render(self.name, self.container, outcome.as_str(), &html);
        outcome
    }
}

#[async_trait]
impl Panel for Widget {
    fn name(&self) -> &'static str {
        self.name
    }

    fn periodic(&self) -> bool {
        self.periodic
    }

    async fn load(&self, page: &Page) -> Outcome {
        self.render(page).await
    }
}

// =============================================================================
// Paged history lists
// =============================================================================

/// Container ids and endpoint of a paged history list.
pub struct PagedSpec {
    pub name: &'static str,
    pub endpoint: &'static str,
    pub items_key: &'static str,
    pub wrapper: &'static str,
    pub list: &'static str,
    pub pagination: &'static str,
    pub page_info: &'static str,
    pub prev: &'static str,
    pub next: &'static str,
    pub empty_page: &'static str,
    pub item: fn(&Value) -> String,
}

/// A history list fetched `per_page` items at a time.
pub struct PagedList {
    spec: PagedSpec,
    per_page: u32,
    current: AtomicU32,
}

impl PagedList {
    pub fn new(spec: PagedSpec, per_page: u32) -> Self {
        Self { spec, per_page: per_page.max(1), current: AtomicU32::new(1) }
    }

    pub fn current_page(&self) -> u32 {
        self.current.load(Ordering::SeqCst)
    }

    pub fn path(&self, page: u32) -> String {
        format!("{}?page={}&per_page={}", self.spec.endpoint, page, self.per_page)
    }

    pub async fn load_page(&self, page: &Page, n: u32) -> Outcome {
        let s = &self.spec;
        let doc = &page.doc;
        if !doc.contains(s.wrapper) || !doc.contains(s.list) {
            return Outcome::Absent;
        }
        let path = self.path(n.max(1));
        let data = match page.backend.get(&path).await {
            Ok(v) => v,
            Err(e) => {
                // History is secondary; leave whatever is showing.
                log_widget_failure(s.name, &path, &e.to_string());
                return Outcome::Failed;
            }
        };

        let items = data.get(s.items_key).and_then(Value::as_array).cloned().unwrap_or_default();
        let page_no = data
            .get("page")
            .and_then(Value::as_u64)
            .and_then(|p| u32::try_from(p).ok())
            .unwrap_or(n);
        let total_pages = data.get("total_pages").and_then(Value::as_u64).unwrap_or(1);
        let total_count = data.get("total_count").and_then(Value::as_u64).unwrap_or(0);
        let has_prev = data.get("has_prev").and_then(Value::as_bool).unwrap_or(page_no > 1);
        let has_next = data.get("has_next").and_then(Value::as_bool).unwrap_or(false);

        if items.is_empty() && total_count == 0 {
            doc.set_visible(s.wrapper, false);
            return Outcome::Empty;
        }

        doc.set_visible(s.wrapper, true);
        let outcome = if items.is_empty() {
            doc.set_html(s.list, placeholder(s.empty_page));
            doc.set_visible(s.pagination, true);
            doc.set_text(s.page_info, format!("Page {} of {}", page_no, total_pages));
            Outcome::Empty
        } else {
            let html: String = items.iter().map(|i| (s.item)(i)).collect();
            doc.set_html(s.list, html.as_str());
            log_render(s.name, s.list, "rendered", &html);
            if total_pages > 1 {
                doc.set_visible(s.pagination, true);
                doc.set_text(
                    s.page_info,
                    format!("Page {} of {} ({} total)", page_no, total_pages, total_count),
                );
            } else {
                doc.set_visible(s.pagination, false);
            }
            Outcome::Rendered
        };
        doc.set_disabled(s.prev, !has_prev);
        doc.set_disabled(s.next, !has_next);
        self.current.store(page_no.max(1), Ordering::SeqCst);
        outcome
    }
}

#[async_trait]
impl Panel for PagedList {
    fn name(&self) -> &'static str {
        self.spec.name
    }

    fn periodic(&self) -> bool {
        false
    }

    async fn load(&self, page: &Page) -> Outcome {
        self.load_page(page, 1).await
    }

    fn bind(self: Arc<Self>, page: &Page) {
        let prev: ActionHandler = {
            let list = self.clone();
            let page = page.clone();
            Arc::new(move |_: ActionEvent| {
                let list = list.clone();
                let page = page.clone();
                Box::pin(async move {
                    let current = list.current_page();
                    if current > 1 {
                        list.load_page(&page, current - 1).await;
                    }
                })
            })
        };
        let next: ActionHandler = {
            let list = self.clone();
            let page = page.clone();
            Arc::new(move |_: ActionEvent| {
                let list = list.clone();
                let page = page.clone();
                Box::pin(async move {
                    if page.doc.is_disabled(list.spec.next) == Some(true) {
                        return;
                    }
                    let current = list.current_page();
                    list.load_page(&page, current + 1).await;
                })
            })
        };
        page.doc.on_action(self.spec.prev, "click", prev);
        page.doc.on_action(self.spec.next, "click", next);
    }
}
