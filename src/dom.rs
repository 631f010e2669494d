//! In-memory document: the set of named containers widgets render into.
//!
//! Handlers are bound explicitly per container (`on_action`) and dispatched by
//! name; there is no global registry of callable functions. Layout is an
//! explicit signal per container: whoever hosts the document reports a size
//! once a container is shown, and the map renderer waits for that signal.

use futures_util::future::BoxFuture;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::watch;

pub type Size = (u32, u32);

pub type ActionHandler = Arc<dyn Fn(ActionEvent) -> BoxFuture<'static, ()> + Send + Sync>;

#[derive(Debug, Clone, Serialize)]
pub struct Element {
    pub html: String,
    pub text: String,
    pub visible: bool,
    pub disabled: bool,
    pub value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scene: Option<Value>,
}

impl Default for Element {
    fn default() -> Self {
        Self {
            html: String::new(),
            text: String::new(),
            visible: true,
            disabled: false,
            value: String::new(),
            scene: None,
        }
    }
}

/// A user interaction routed to a container's bound handler.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionEvent {
    pub container: String,
    pub action: String,
    /// The `data-id` of the item acted on, for list actions.
    pub target: Option<String>,
    pub value: Option<Value>,
}

impl ActionEvent {
    pub fn new(container: &str, action: &str) -> Self {
        Self {
            container: container.to_string(),
            action: action.to_string(),
            target: None,
            value: None,
        }
    }

    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    pub fn with_value(mut self, value: Value) -> Self {
        self.value = Some(value);
        self
    }
}

struct Inner {
    elements: HashMap<String, Element>,
    handlers: HashMap<(String, String), ActionHandler>,
    layout: HashMap<String, watch::Sender<Option<Size>>>,
    notices: Vec<String>,
    auto_layout: Option<Size>,
}

#[derive(Clone)]
pub struct Document {
    inner: Arc<Mutex<Inner>>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                elements: HashMap::new(),
                handlers: HashMap::new(),
                layout: HashMap::new(),
                notices: Vec::new(),
                auto_layout: None,
            })),
        }
    }

    pub fn with_containers(ids: &[&str]) -> Self {
        let doc = Self::new();
        for id in ids {
            doc.insert(id);
        }
        doc
    }

    /// Report `size` for every container as soon as it is shown.
    pub fn with_auto_layout(self, size: Size) -> Self {
        {
            let mut inner = self.lock();
            inner.auto_layout = Some(size);
            let visible: Vec<String> = inner
                .elements
                .iter()
                .filter(|(_, e)| e.visible)
                .map(|(id, _)| id.clone())
                .collect();
            for id in visible {
                if let Some(tx) = inner.layout.get(&id) {
                    tx.send_replace(Some(size));
                }
            }
        }
        self
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // Nothing panics while holding the lock, so poisoning is recoverable.
        self.inner.lock().unwrap_or_else(|p| p.into_inner())
    }

    pub fn insert(&self, id: &str) {
        let mut inner = self.lock();
        let initial = inner.auto_layout;
        inner.elements.entry(id.to_string()).or_default();
        inner
            .layout
            .entry(id.to_string())
            .or_insert_with(|| watch::channel(initial).0);
    }

    pub fn remove(&self, id: &str) {
        let mut inner = self.lock();
        inner.elements.remove(id);
        inner.handlers.retain(|(c, _), _| c != id);
        if let Some(tx) = inner.layout.remove(id) {
            tx.send_replace(None);
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.lock().elements.contains_key(id)
    }

    pub fn element(&self, id: &str) -> Option<Element> {
        self.lock().elements.get(id).cloned()
    }

    fn update<F: FnOnce(&mut Element)>(&self, id: &str, f: F) -> bool {
        match self.lock().elements.get_mut(id) {
            Some(el) => {
                f(el);
                true
            }
            None => false,
        }
    }

    /// Replace a container's markup. `false` when the container is absent.
    pub fn set_html(&self, id: &str, html: impl Into<String>) -> bool {
        let html = html.into();
        self.update(id, |el| el.html = html)
    }

    pub fn html(&self, id: &str) -> Option<String> {
        self.lock().elements.get(id).map(|e| e.html.clone())
    }

    pub fn set_text(&self, id: &str, text: impl Into<String>) -> bool {
        let text = text.into();
        self.update(id, |el| el.text = text)
    }

    pub fn text(&self, id: &str) -> Option<String> {
        self.lock().elements.get(id).map(|e| e.text.clone())
    }

    pub fn set_visible(&self, id: &str, visible: bool) -> bool {
        let mut inner = self.lock();
        let auto = inner.auto_layout;
        let Some(el) = inner.elements.get_mut(id) else {
            return false;
        };
        el.visible = visible;
        if let Some(tx) = inner.layout.get(id) {
            if !visible {
                tx.send_replace(None);
            } else if auto.is_some() {
                tx.send_replace(auto);
            }
        }
        true
    }

    pub fn is_visible(&self, id: &str) -> Option<bool> {
        self.lock().elements.get(id).map(|e| e.visible)
    }

    pub fn set_disabled(&self, id: &str, disabled: bool) -> bool {
        self.update(id, |el| el.disabled = disabled)
    }

    pub fn is_disabled(&self, id: &str) -> Option<bool> {
        self.lock().elements.get(id).map(|e| e.disabled)
    }

    /// Form field value.
    pub fn set_value(&self, id: &str, value: impl Into<String>) -> bool {
        let value = value.into();
        self.update(id, |el| el.value = value)
    }

    pub fn value(&self, id: &str) -> Option<String> {
        self.lock().elements.get(id).map(|e| e.value.clone())
    }

    pub fn set_scene(&self, id: &str, scene: Option<Value>) -> bool {
        self.update(id, |el| el.scene = scene)
    }

    pub fn scene(&self, id: &str) -> Option<Value> {
        self.lock().elements.get(id).and_then(|e| e.scene.clone())
    }

    /// User-facing notice (the kiosk's equivalent of an alert box).
    pub fn notify(&self, message: impl Into<String>) {
        self.lock().notices.push(message.into());
    }

    pub fn notices(&self) -> Vec<String> {
        self.lock().notices.clone()
    }

    // -------------------------------------------------------------------------
    // Actions
    // -------------------------------------------------------------------------

    /// Bind `handler` to `action` on a container. Returns `false` when the
    /// container is absent or the action is already bound, so repeated setup
    /// never stacks duplicate handlers.
    pub fn on_action(&self, id: &str, action: &str, handler: ActionHandler) -> bool {
        let mut inner = self.lock();
        if !inner.elements.contains_key(id) {
            return false;
        }
        let key = (id.to_string(), action.to_string());
        if inner.handlers.contains_key(&key) {
            return false;
        }
        inner.handlers.insert(key, handler);
        true
    }

    pub fn is_bound(&self, id: &str, action: &str) -> bool {
        self.lock()
            .handlers
            .contains_key(&(id.to_string(), action.to_string()))
    }

    /// Run the handler bound for `event`. `false` when nothing is bound.
    pub async fn dispatch(&self, event: ActionEvent) -> bool {
        let handler = {
            let inner = self.lock();
            inner
                .handlers
                .get(&(event.container.clone(), event.action.clone()))
                .cloned()
        };
        match handler {
            Some(h) => {
                h(event).await;
                true
            }
            None => false,
        }
    }

    // -------------------------------------------------------------------------
    // Layout
    // -------------------------------------------------------------------------

    /// Host-side signal that a container has been laid out at `size`.
    pub fn report_size(&self, id: &str, size: Option<Size>) {
        if let Some(tx) = self.lock().layout.get(id) {
            tx.send_replace(size);
        }
    }

    /// Wait until the container has a non-empty size, up to `timeout`.
    pub async fn wait_for_layout(&self, id: &str, timeout: Duration) -> Option<Size> {
        let mut rx = {
            let inner = self.lock();
            inner.layout.get(id)?.subscribe()
        };
        let settled = tokio::time::timeout(
            timeout,
            rx.wait_for(|s| matches!(s, Some((w, h)) if *w > 0 && *h > 0)),
        )
        .await;
        match settled {
            Ok(Ok(size)) => *size,
            _ => None,
        }
    }

    /// Drop all rendered state and bindings, keeping the container set.
    pub fn reset(&self) {
        let mut inner = self.lock();
        let auto = inner.auto_layout;
        for el in inner.elements.values_mut() {
            *el = Element::default();
        }
        inner.handlers.clear();
        inner.notices.clear();
        for tx in inner.layout.values() {
            tx.send_replace(auto);
        }
    }

    /// Every container as JSON, keyed by id.
    pub fn snapshot(&self) -> Value {
        let inner = self.lock();
        let mut ids: Vec<&String> = inner.elements.keys().collect();
        ids.sort();
        let mut out = Map::new();
        for id in ids {
            if let Ok(v) = serde_json::to_value(&inner.elements[id]) {
                out.insert(id.clone(), v);
            }
        }
        Value::Object(out)
    }
}
