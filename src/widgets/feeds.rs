//! Reading material and the calendar: news, jokes, quotes, events, feeds.

use serde_json::Value;

use super::{action_button, list_of, DASHBOARD_DATA};
use crate::html::{escape, field, text, truncate};
use crate::widget::{PagedSpec, Widget};

const CALENDAR_LIMIT: usize = 5;
const FEED_URL_MAX: usize = 50;

fn news_view(news: &Value) -> Option<String> {
    let articles = news.as_array()?;
    list_of("news-list", articles.as_slice(), |a| {
        let description = match text(a.get("description")) {
            d if d.is_empty() => String::new(),
            d => format!(r#"<div class="news-desc">{}</div>"#, escape(&d)),
        };
        format!(
            r#"<div class="news-item"><div class="news-source">{}</div><div class="news-title">{}</div>{}</div>"#,
            field(a, "source"),
            field(a, "title"),
            description
        )
    })
}

pub fn news() -> Widget {
    Widget {
        name: "news",
        container: "news-widget",
        endpoint: DASHBOARD_DATA,
        select: Some("news"),
        label: "news data",
        empty: "News data unavailable",
        view: news_view,
        periodic: true,
    }
}

fn joke_view(joke: &Value) -> Option<String> {
    let body = match text(joke.get("text")) {
        t if t.is_empty() => "No joke available".to_string(),
        t => escape(&t),
    };
    Some(format!(
        r#"<div class="joke-current">{}<div class="joke-updated">Updated: {}</div></div>"#,
        body,
        field(joke, "updated")
    ))
}

pub fn joke() -> Widget {
    Widget {
        name: "joke",
        container: "joke-widget",
        endpoint: DASHBOARD_DATA,
        select: Some("joke"),
        label: "joke data",
        empty: "Joke data unavailable",
        view: joke_view,
        periodic: true,
    }
}

pub fn joke_history() -> PagedSpec {
    PagedSpec {
        name: "joke_history",
        endpoint: "/api/joke-history",
        items_key: "jokes",
        wrapper: "joke-history",
        list: "joke-history-list",
        pagination: "joke-history-pagination",
        page_info: "joke-page-info",
        prev: "joke-prev-btn",
        next: "joke-next-btn",
        empty_page: "No jokes on this page",
        item: |j| {
            format!(
                r#"<div class="joke-history-item"><div class="joke-history-text">{}</div><div class="joke-history-timestamp">{}</div></div>"#,
                field(j, "text"),
                field(j, "timestamp")
            )
        },
    }
}

fn quote_view(q: &Value) -> Option<String> {
    Some(format!(
        r#"<div class="quote"><div class="quote-text">"{}"</div><div class="quote-author">— {}</div></div>"#,
        field(q, "text"),
        field(q, "author")
    ))
}

pub fn quote() -> Widget {
    Widget {
        name: "quote",
        container: "quote-widget",
        endpoint: "/api/daily-quote",
        select: None,
        label: "quote",
        empty: "Quote unavailable",
        view: quote_view,
        periodic: true,
    }
}

pub fn quote_history() -> PagedSpec {
    PagedSpec {
        name: "quote_history",
        endpoint: "/api/quote-history",
        items_key: "quotes",
        wrapper: "quote-history",
        list: "quote-history-list",
        pagination: "quote-history-pagination",
        page_info: "quote-page-info",
        prev: "quote-prev-btn",
        next: "quote-next-btn",
        empty_page: "No quotes on this page",
        item: |q| {
            format!(
                concat!(
                    r#"<div class="quote-history-item"><div class="quote-history-text">"{}"</div>"#,
                    r#"<div class="quote-history-author">— {}</div><div class="quote-history-timestamp">{}</div></div>"#
                ),
                field(q, "text"),
                field(q, "author"),
                field(q, "timestamp")
            )
        },
    }
}

/// ` • suffix` when the field has text.
fn bullet(v: &Value, key: &str) -> String {
    match field(v, key) {
        s if s.is_empty() => String::new(),
        s => format!(" • {}", s),
    }
}

fn calendar_view(events: &Value) -> Option<String> {
    let events = events.as_array()?;
    let upcoming = &events[..events.len().min(CALENDAR_LIMIT)];
    list_of("news-list", upcoming, |e| {
        format!(
            r#"<div class="news-item"><div class="news-source">{}</div><div class="news-title">{}</div><div class="news-desc">{} at {}{}</div></div>"#,
            field(e, "source"),
            field(e, "title"),
            field(e, "date"),
            field(e, "time"),
            bullet(e, "location")
        )
    })
}

pub fn calendar() -> Widget {
    Widget {
        name: "calendar",
        container: "calendar-widget",
        endpoint: "/api/calendar-events",
        select: None,
        label: "calendar events",
        empty: "No upcoming events",
        view: calendar_view,
        periodic: true,
    }
}

fn feeds_view(feeds: &Value) -> Option<String> {
    let feeds = feeds.as_array()?;
    let rows = list_of("feeds", feeds.as_slice(), |f| {
        let name = match text(f.get("name")) {
            n if n.is_empty() => "Unnamed".to_string(),
            n => n,
        };
        format!(
            r#"<div class="feed-item"><span><strong>{}</strong>: {}</span>{}</div>"#,
            escape(&name),
            escape(&truncate(&text(f.get("url")), FEED_URL_MAX)),
            action_button("delete", &text(f.get("id")), "Delete")
        )
    })?;
    Some(format!("<h4>Existing Feeds:</h4>{}", rows))
}

pub fn calendar_feeds() -> Widget {
    Widget {
        name: "calendar_feeds",
        container: "feeds-list",
        endpoint: "/api/calendar-feeds",
        select: None,
        label: "calendar feeds",
        empty: "No calendar feeds added yet.",
        view: feeds_view,
        periodic: false,
    }
}

fn local_events_view(events: &Value) -> Option<String> {
    let events = events.as_array()?;
    list_of("local-events", events.as_slice(), |e| {
        let id = text(e.get("id"));
        format!(
            r#"<div class="local-event"><div><strong>{}</strong><br><small>{}{}</small></div><div>{}{}</div></div>"#,
            field(e, "title"),
            field(e, "start_time"),
            bullet(e, "location"),
            action_button("edit", &id, "Edit"),
            action_button("delete", &id, "Delete")
        )
    })
}

pub fn local_events() -> Widget {
    Widget {
        name: "local_events",
        container: "local-events-list",
        endpoint: "/api/calendar-events/local",
        select: None,
        label: "local events",
        empty: "No local events added yet.",
        view: local_events_view,
        periodic: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::widget::Outcome;
    use serde_json::json;

    #[test]
    fn test_calendar_shows_first_five() {
        let events: Vec<_> = (0..8)
            .map(|i| json!({"source": "Family", "title": format!("event {}", i), "date": "Oct 20", "time": "9:00 AM"}))
            .collect();
        let (outcome, html) = calendar().present(&json!(events));
        assert_eq!(outcome, Outcome::Rendered);
        assert_eq!(html.matches("news-item").count(), 5);
        assert!(html.contains("event 4"));
        assert!(!html.contains("event 5"));
    }

    #[test]
    fn test_calendar_location_is_optional() {
        let (_, html) = calendar().present(&json!([{"title": "a", "date": "d", "time": "t", "location": "Gym"}]));
        assert!(html.contains("d at t • Gym"));
        let (_, html) = calendar().present(&json!([{"title": "a", "date": "d", "time": "t"}]));
        assert!(html.contains("d at t</div>"));
    }

    #[test]
    fn test_feeds_carry_delete_actions() {
        let (_, html) = calendar_feeds().present(&json!([{"id": 3, "url": "https://example.com/cal.ics"}]));
        assert!(html.contains("Unnamed"));
        assert!(html.contains(r#"data-action="delete" data-id="3""#));
    }

    #[test]
    fn test_joke_without_text() {
        let (outcome, html) = joke().present(&json!({"joke": {"updated": "07:00"}}));
        assert_eq!(outcome, Outcome::Rendered);
        assert!(html.contains("No joke available"));
    }

    #[test]
    fn test_news_escapes_titles() {
        let (_, html) = news().present(&json!({"news": [{"source": "Wire", "title": "<script>x</script>"}]}));
        assert!(html.contains("&lt;script&gt;"));
        assert!(!html.contains("news-desc"));
    }
}
