//! Form submissions and per-item list actions.
//!
//! Each form or list container gets its handlers bound once. A successful
//! write re-renders only the panels it affects; a failed one surfaces the
//! backend's message as a notice and leaves the page as it was.

use futures_util::future::BoxFuture;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use url::Url;

use crate::api::Verb;
use crate::dom::{ActionEvent, ActionHandler};
use crate::logging::{log, obj, v_str, Domain, Level};
use crate::widget::{Page, Registry};
use crate::widgets::household::Team;

pub const SHOPPING_FORM: &str = "add-shopping-item-form";
pub const SHOPPING_LIST: &str = "shopping-list-widget";
pub const PACKAGE_FORM: &str = "add-package-form";
pub const PACKAGES_LIST: &str = "packages-widget";
pub const FEED_FORM: &str = "add-feed-form";
pub const FEEDS_LIST: &str = "feeds-list";
pub const EVENT_FORM: &str = "add-event-form";
pub const EVENTS_LIST: &str = "local-events-list";
pub const SPORTS_FORM: &str = "sports-form";
pub const TEAMS_LIST: &str = "sports-teams-list";
pub const SPEED_BUTTON: &str = "run-speed-test";
pub const PHOTO_GALLERY: &str = "photo-gallery";

const SPEED_IDLE: &str = "Run Speed Test";

/// `2026-10-20T09:30` (datetime-local input) to `2026-10-20 09:30:00`.
pub fn local_datetime(input: &str) -> Option<String> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }
    Some(format!("{}:00", input.replacen('T', " ", 1)))
}

/// The inverse of `local_datetime`, for filling the form back in.
pub fn form_datetime(stored: &str) -> String {
    let stored = stored.trim();
    let minutes = if stored.len() == 19 { stored.get(..16).unwrap_or(stored) } else { stored };
    minutes.replacen(' ', "T", 1)
}

/// Percent-encode one path segment.
pub fn segment(raw: &str) -> String {
    let Ok(mut url) = Url::parse("http://localhost/") else {
        return raw.to_string();
    };
    if let Ok(mut segments) = url.path_segments_mut() {
        segments.push(raw);
    }
    url.path().trim_start_matches('/').to_string()
}

pub fn has_team(teams: &[Value], name: &str) -> bool {
    let wanted = name.to_lowercase();
    teams
        .iter()
        .filter_map(Team::from_value)
        .any(|t| t.name.to_lowercase() == wanted)
}

/// Drop a team; with `sport` set, object entries must match it too.
pub fn without_team(teams: Vec<Value>, name: &str, sport: Option<&str>) -> Vec<Value> {
    teams
        .into_iter()
        .filter(|t| match t {
            Value::String(s) => s != name,
            _ => match Team::from_value(t) {
                Some(team) => team.name != name || sport.is_some_and(|s| team.sport != s),
                None => true,
            },
        })
        .collect()
}

type Run = fn(Arc<Forms>, ActionEvent) -> BoxFuture<'static, ()>;

pub struct Forms {
    page: Page,
    registry: Registry,
    /// Stored event loaded into the event form by an edit action.
    editing_event: Mutex<Option<String>>,
}

impl Forms {
    /// Bind every form and list action present on the page.
    pub fn install(page: &Page, registry: &Registry) -> Arc<Self> {
        let forms = Arc::new(Self {
            page: page.clone(),
            registry: registry.clone(),
            editing_event: Mutex::new(None),
        });
        forms.on(SHOPPING_FORM, "submit", |f, _| Box::pin(f.add_shopping_item()));
        forms.on(SHOPPING_LIST, "toggle", |f, ev| Box::pin(f.toggle_shopping_item(ev)));
        forms.on(SHOPPING_LIST, "delete", |f, ev| Box::pin(f.delete_shopping_item(ev)));
        forms.on(PACKAGE_FORM, "submit", |f, _| Box::pin(f.add_package()));
        forms.on(PACKAGES_LIST, "refresh", |f, ev| Box::pin(f.refresh_package(ev)));
        forms.on(PACKAGES_LIST, "delete", |f, ev| Box::pin(f.delete_package(ev)));
        forms.on(FEED_FORM, "submit", |f, _| Box::pin(f.add_feed()));
        forms.on(FEEDS_LIST, "delete", |f, ev| Box::pin(f.delete_feed(ev)));
        forms.on(EVENT_FORM, "submit", |f, _| Box::pin(f.add_event()));
        forms.on(EVENTS_LIST, "delete", |f, ev| Box::pin(f.delete_event(ev)));
        forms.on(EVENTS_LIST, "edit", |f, ev| Box::pin(f.edit_event(ev)));
        forms.on(SPORTS_FORM, "submit", |f, _| Box::pin(f.add_team()));
        forms.on(TEAMS_LIST, "remove", |f, ev| Box::pin(f.remove_team(ev)));
        forms.on(SPEED_BUTTON, "click", |f, _| Box::pin(f.run_speed_test()));
        forms.on(PHOTO_GALLERY, "delete", |f, ev| Box::pin(f.delete_photo(ev)));
        forms
    }

    fn on(self: &Arc<Self>, container: &str, action: &str, run: Run) {
        let forms = self.clone();
        let handler: ActionHandler = Arc::new(move |ev| run(forms.clone(), ev));
        if self.page.doc.on_action(container, action, handler) {
            log(
                Level::Trace,
                Domain::Forms,
                "bound",
                obj(&[("container", v_str(container)), ("action", v_str(action))]),
            );
        }
    }

    fn editing_event(&self) -> MutexGuard<'_, Option<String>> {
        self.editing_event.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Id of the event being edited, if the form holds one.
    pub fn editing(&self) -> Option<String> {
        self.editing_event().clone()
    }

    fn input(&self, id: &str) -> String {
        self.page.doc.value(id).unwrap_or_default()
    }

    fn clear(&self, ids: &[&str]) {
        for id in ids {
            self.page.doc.set_value(id, "");
        }
    }

    async fn refresh(&self, names: &[&str]) {
        self.registry.reload(&self.page, names).await;
    }

    /// Send a write; on failure post `<failure>: <reason>` as a notice.
    async fn write(&self, verb: Verb, path: &str, body: Option<Value>, failure: &str) -> bool {
        match self.page.backend.send(verb, path, body).await {
            Ok(_) => {
                log(
                    Level::Info,
                    Domain::Forms,
                    "write_ok",
                    obj(&[("method", v_str(verb.as_str())), ("path", v_str(path))]),
                );
                true
            }
            Err(e) => {
                log(
                    Level::Warn,
                    Domain::Forms,
                    "write_failed",
                    obj(&[
                        ("method", v_str(verb.as_str())),
                        ("path", v_str(path)),
                        ("msg", v_str(&e.to_string())),
                    ]),
                );
                self.page.doc.notify(format!("{}: {}", failure, e.user_message()));
                false
            }
        }
    }

    fn target(&self, ev: &ActionEvent) -> Option<String> {
        let target = ev.target.clone().filter(|t| !t.is_empty());
        if target.is_none() {
            log(
                Level::Warn,
                Domain::Forms,
                "action_without_target",
                obj(&[("container", v_str(&ev.container)), ("action", v_str(&ev.action))]),
            );
        }
        target
    }

    // -------------------------------------------------------------------------
    // Shopping list
    // -------------------------------------------------------------------------

    async fn add_shopping_item(self: Arc<Self>) {
        let name = self.input("shopping-item-name").trim().to_string();
        if name.is_empty() {
            self.page.doc.notify("Please enter an item name");
            return;
        }
        let body = json!({ "item_name": name });
        if self.write(Verb::Post, "/api/shopping-list", Some(body), "Error adding item").await {
            self.clear(&["shopping-item-name"]);
            self.refresh(&["shopping_list"]).await;
        }
    }

    async fn toggle_shopping_item(self: Arc<Self>, ev: ActionEvent) {
        let Some(id) = self.target(&ev) else { return };
        let completed = ev.value.as_ref().and_then(|v| v.get("completed")).and_then(Value::as_bool);
        let Some(completed) = completed else {
            log(Level::Warn, Domain::Forms, "toggle_without_state", obj(&[("target", v_str(&id))]));
            return;
        };
        let path = format!("/api/shopping-list/{}", segment(&id));
        let body = json!({ "completed": completed });
        if self.write(Verb::Put, &path, Some(body), "Error updating item").await {
            self.refresh(&["shopping_list"]).await;
        }
    }

    async fn delete_shopping_item(self: Arc<Self>, ev: ActionEvent) {
        let Some(id) = self.target(&ev) else { return };
        let path = format!("/api/shopping-list/{}", segment(&id));
        if self.write(Verb::Delete, &path, None, "Error deleting item").await {
            self.refresh(&["shopping_list"]).await;
        }
    }

    // -------------------------------------------------------------------------
    // Packages
    // -------------------------------------------------------------------------

    async fn add_package(self: Arc<Self>) {
        let body = json!({
            "tracking_number": self.input("package-tracking").trim(),
            "description": self.input("package-description").trim(),
        });
        if self.write(Verb::Post, "/api/packages", Some(body), "Error adding package").await {
            self.clear(&["package-tracking", "package-description"]);
            self.refresh(&["packages", "package_archive"]).await;
        }
    }

    async fn refresh_package(self: Arc<Self>, ev: ActionEvent) {
        let Some(id) = self.target(&ev) else { return };
        let path = format!("/api/packages/{}/refresh", segment(&id));
        if self.write(Verb::Post, &path, None, "Error refreshing package").await {
            self.refresh(&["packages", "package_archive"]).await;
        }
    }

    async fn delete_package(self: Arc<Self>, ev: ActionEvent) {
        let Some(id) = self.target(&ev) else { return };
        let path = format!("/api/packages/{}", segment(&id));
        if self.write(Verb::Delete, &path, None, "Error deleting package").await {
            self.refresh(&["packages", "package_archive"]).await;
        }
    }

    // -------------------------------------------------------------------------
    // Calendar
    // -------------------------------------------------------------------------

    async fn add_feed(self: Arc<Self>) {
        let body = json!({ "name": self.input("feed-name"), "url": self.input("feed-url") });
        if self.write(Verb::Post, "/api/calendar-feeds", Some(body), "Error adding feed").await {
            self.clear(&["feed-name", "feed-url"]);
            self.refresh(&["calendar_feeds", "calendar"]).await;
        }
    }

    async fn delete_feed(self: Arc<Self>, ev: ActionEvent) {
        let Some(id) = self.target(&ev) else { return };
        let path = format!("/api/calendar-feeds/{}", segment(&id));
        if self.write(Verb::Delete, &path, None, "Error deleting feed").await {
            self.refresh(&["calendar_feeds", "calendar"]).await;
        }
    }

    /// Create an event, or update the one loaded by `edit_event`.
    async fn add_event(self: Arc<Self>) {
        let editing = self.editing();
        let body = json!({
            "title": self.input("event-title"),
            "start_time": local_datetime(&self.input("event-start")),
            "end_time": local_datetime(&self.input("event-end")),
            "location": self.input("event-location"),
            "description": self.input("event-description"),
        });
        let saved = match &editing {
            Some(id) => {
                let path = format!("/api/calendar-events/local/{}", segment(id));
                self.write(Verb::Put, &path, Some(body), "Error updating event").await
            }
            None => self.write(Verb::Post, "/api/calendar-events/local", Some(body), "Error adding event").await,
        };
        if saved {
            *self.editing_event() = None;
            self.clear(&["event-title", "event-start", "event-end", "event-location", "event-description"]);
            self.refresh(&["local_events", "calendar"]).await;
        }
    }

    async fn delete_event(self: Arc<Self>, ev: ActionEvent) {
        let Some(id) = self.target(&ev) else { return };
        let path = format!("/api/calendar-events/local/{}", segment(&id));
        if self.write(Verb::Delete, &path, None, "Error deleting event").await {
            {
                let mut editing = self.editing_event();
                if editing.as_deref() == Some(id.as_str()) {
                    *editing = None;
                }
            }
            self.refresh(&["local_events", "calendar"]).await;
        }
    }

    /// Fill the event form with a stored event.
    async fn edit_event(self: Arc<Self>, ev: ActionEvent) {
        let Some(id) = self.target(&ev) else { return };
        let events = match self.page.backend.get("/api/calendar-events/local").await {
            Ok(v) => v,
            Err(e) => {
                self.page.doc.notify(format!("Error loading event: {}", e.user_message()));
                return;
            }
        };
        let found = events
            .as_array()
            .and_then(|list| list.iter().find(|e| crate::html::text(e.get("id")) == id));
        let Some(event) = found else {
            self.page.doc.notify("Event not found");
            return;
        };
        let doc = &self.page.doc;
        let get = |key: &str| crate::html::text(event.get(key));
        doc.set_value("event-title", get("title"));
        doc.set_value("event-start", form_datetime(&get("start_time")));
        doc.set_value("event-end", form_datetime(&get("end_time")));
        doc.set_value("event-location", get("location"));
        doc.set_value("event-description", get("description"));
        *self.editing_event() = Some(id);
    }

    // -------------------------------------------------------------------------
    // Sports
    // -------------------------------------------------------------------------

    async fn saved_teams(&self) -> Option<Vec<Value>> {
        match self.page.backend.get("/api/settings/sports").await {
            Ok(v) => Some(v.get("teams").and_then(Value::as_array).cloned().unwrap_or_default()),
            Err(e) => {
                log(Level::Warn, Domain::Forms, "teams_unavailable", obj(&[("msg", v_str(&e.to_string()))]));
                None
            }
        }
    }

    async fn add_team(self: Arc<Self>) {
        let name = self.input("sports-team-input").trim().to_string();
        let sport = self.input("sports-sport-select");
        if name.is_empty() {
            self.page.doc.notify("Please enter a team name");
            return;
        }
        let Some(mut teams) = self.saved_teams().await else {
            self.page.doc.notify("Error adding team");
            return;
        };
        if has_team(&teams, &name) {
            self.page.doc.notify("This team is already in your list");
            self.clear(&["sports-team-input"]);
            return;
        }
        teams.push(json!({ "name": name, "sport": sport }));
        let body = json!({ "teams": teams });
        if self.write(Verb::Post, "/api/settings/sports", Some(body), "Error adding team").await {
            self.clear(&["sports-team-input"]);
            self.refresh(&["sports_teams", "sports_scores"]).await;
        }
    }

    async fn remove_team(self: Arc<Self>, ev: ActionEvent) {
        let Some(name) = self.target(&ev) else { return };
        let sport = ev
            .value
            .as_ref()
            .and_then(|v| v.get("sport"))
            .and_then(Value::as_str)
            .map(str::to_string);
        let Some(teams) = self.saved_teams().await else {
            self.page.doc.notify("Error removing team");
            return;
        };
        let body = json!({ "teams": without_team(teams, &name, sport.as_deref()) });
        if self.write(Verb::Post, "/api/settings/sports", Some(body), "Error removing team").await {
            self.refresh(&["sports_teams", "sports_scores"]).await;
        }
    }

    // -------------------------------------------------------------------------
    // Speed test and photos
    // -------------------------------------------------------------------------

    async fn run_speed_test(self: Arc<Self>) {
        let doc = &self.page.doc;
        if doc.is_disabled(SPEED_BUTTON) == Some(true) {
            return;
        }
        doc.set_disabled(SPEED_BUTTON, true);
        doc.set_text(SPEED_BUTTON, "Running...");
        if self.write(Verb::Post, "/api/internet-speed/run", None, "Error running speed test").await {
            // The backend runs the test in the background.
            tokio::time::sleep(Duration::from_secs(self.page.config.speed_test_wait_secs)).await;
            self.refresh(&["speed_test"]).await;
        }
        doc.set_disabled(SPEED_BUTTON, false);
        doc.set_text(SPEED_BUTTON, SPEED_IDLE);
    }

    async fn delete_photo(self: Arc<Self>, ev: ActionEvent) {
        let Some(filename) = self.target(&ev) else { return };
        let path = format!("/api/delete-photo/{}", segment(&filename));
        if self.write(Verb::Delete, &path, None, "Error deleting photo").await {
            self.refresh(&["photos"]).await;
        }
    }
}
