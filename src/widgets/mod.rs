//! The widget catalog: every module the dashboard loads, by name.

pub mod feeds;
pub mod home_assistant;
pub mod household;
pub mod weather;

use std::sync::Arc;

use crate::html::escape;
use crate::traffic::CommuteWidget;
use crate::widget::{Page, PagedList, Panel, Widget};

pub const DASHBOARD_DATA: &str = "/api/dashboard-data";

/// A button dispatched through the list container's bound handler.
pub(crate) fn action_button(action: &str, id: &str, label: &str) -> String {
    format!(
        r#"<button class="btn btn-secondary" data-action="{}" data-id="{}">{}</button>"#,
        action,
        escape(id),
        label
    )
}

/// Join rendered items inside a wrapper; `None` when nothing rendered.
pub(crate) fn list_of<T>(class: &str, items: &[T], row: impl Fn(&T) -> String) -> Option<String> {
    if items.is_empty() {
        return None;
    }
    let body: String = items.iter().map(row).collect();
    Some(format!(r#"<div class="{}">{}</div>"#, class, body))
}

fn widgets() -> Vec<Widget> {
    vec![
        weather::weather(),
        weather::forecast(),
        feeds::news(),
        weather::weather_alerts(),
        feeds::joke(),
        household::packages(),
        feeds::quote(),
        feeds::calendar(),
        feeds::calendar_feeds(),
        feeds::local_events(),
        weather::air_quality(),
        weather::astronomy(),
        household::speed_test(),
        household::sports_teams(),
        household::sports_scores(),
        household::photos(),
        household::shopping_list(),
        home_assistant::home_assistant(),
    ]
}

fn paged_lists(per_page: u32) -> Vec<PagedList> {
    vec![
        PagedList::new(feeds::joke_history(), per_page),
        PagedList::new(feeds::quote_history(), per_page),
        PagedList::new(household::package_archive(), per_page),
    ]
}

/// Every panel, in load order. Panels named in `DISABLED_WIDGETS` are left
/// out as if their module had failed to load.
pub fn catalog(page: &Page) -> Vec<Arc<dyn Panel>> {
    let per_page = page.config.history_per_page;
    let mut panels: Vec<Arc<dyn Panel>> = Vec::new();
    panels.extend(widgets().into_iter().map(|w| Arc::new(w) as Arc<dyn Panel>));
    panels.extend(paged_lists(per_page).into_iter().map(|p| Arc::new(p) as Arc<dyn Panel>));
    panels.push(Arc::new(CommuteWidget::for_page(page)));
    panels.retain(|p| page.config.widget_enabled(p.name()));
    panels
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::StubBackend;
    use crate::config::Config;
    use crate::dom::Document;
    use std::collections::HashSet;

    #[test]
    fn test_names_and_containers_are_unique() {
        let all = widgets();
        let names: HashSet<_> = all.iter().map(|w| w.name).collect();
        let containers: HashSet<_> = all.iter().map(|w| w.container).collect();
        assert_eq!(names.len(), all.len());
        assert_eq!(containers.len(), all.len());
    }

    #[test]
    fn test_disabled_widgets_are_skipped() {
        let config = Config { disabled_widgets: vec!["news".into(), "commute".into()], ..Config::default() };
        let page = Page::new(Document::new(), Arc::new(StubBackend::new()), config);
        let names: Vec<_> = catalog(&page).iter().map(|p| p.name()).collect();
        assert!(!names.contains(&"news"));
        assert!(!names.contains(&"commute"));
        assert!(names.contains(&"weather"));
        assert!(names.contains(&"joke_history"));
    }

    #[test]
    fn test_action_button_escapes_id() {
        assert_eq!(
            action_button("delete", "a\"b.jpg", "×"),
            r#"<button class="btn btn-secondary" data-action="delete" data-id="a&quot;b.jpg">×</button>"#
        );
    }
}
