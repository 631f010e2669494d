//! Things the household manages: packages, shopping, photos, teams, internet.

use serde_json::Value;

use super::{action_button, list_of, DASHBOARD_DATA};
use crate::html::{escape, field, text};
use crate::widget::{PagedSpec, Widget};

/// Status color for a tracked package.
pub fn package_status_color(status: &str) -> &'static str {
    match status {
        "Delivered" => "#4caf50",
        "Error" => "#f44336",
        _ => "#2196F3",
    }
}

fn package_title(p: &Value) -> String {
    match text(p.get("description")) {
        d if d.is_empty() => "Package".to_string(),
        d => escape(&d),
    }
}

fn optional(p: &Value, key: &str, prefix: &str) -> String {
    match field(p, key) {
        s if s.is_empty() => String::new(),
        s => format!(" • {}{}", prefix, s),
    }
}

fn packages_view(packages: &Value) -> Option<String> {
    let packages = packages.as_array()?;
    list_of("news-list", packages.as_slice(), |p| {
        let id = text(p.get("id"));
        let status = text(p.get("status"));
        format!(
            concat!(
                r#"<div class="news-item"><div class="package-head"><div>"#,
                r#"<div class="news-source">{carrier} - {tracking}</div><div class="news-title">{title}</div></div>"#,
                "<div>{refresh}{delete}</div></div>",
                r#"<div class="news-desc"><strong style="color: {color};">Status:</strong> {status}{location}{eta}</div></div>"#
            ),
            carrier = field(p, "carrier"),
            tracking = field(p, "tracking_number"),
            title = package_title(p),
            refresh = action_button("refresh", &id, "Refresh"),
            delete = action_button("delete", &id, "Delete"),
            color = package_status_color(&status),
            status = escape(&status),
            location = optional(p, "last_location", ""),
            eta = optional(p, "estimated_delivery", "ETA: "),
        )
    })
}

pub fn packages() -> Widget {
    Widget {
        name: "packages",
        container: "packages-widget",
        endpoint: DASHBOARD_DATA,
        select: Some("packages"),
        label: "packages",
        empty: "No packages being tracked",
        view: packages_view,
        periodic: true,
    }
}

pub fn package_archive() -> PagedSpec {
    PagedSpec {
        name: "package_archive",
        endpoint: "/api/packages/archive",
        items_key: "packages",
        wrapper: "packages-archive",
        list: "packages-archive-list",
        pagination: "packages-archive-pagination",
        page_info: "archive-page-info",
        prev: "archive-prev-btn",
        next: "archive-next-btn",
        empty_page: "No packages on this page",
        item: |p| {
            format!(
                concat!(
                    r#"<div class="news-item"><div class="news-source">{} - {}</div><div class="news-title">{}</div>"#,
                    r#"<div class="news-desc">Status: {}{}</div><div class="news-desc archived">Archived: {}</div></div>"#
                ),
                field(p, "carrier"),
                field(p, "tracking_number"),
                package_title(p),
                field(p, "status"),
                optional(p, "last_location", ""),
                field(p, "archived_at")
            )
        },
    }
}

fn speed_view(s: &Value) -> Option<String> {
    let stat = |label: &str, value: String| {
        format!(r#"<div><div class="label">{}</div><div class="value">{}</div></div>"#, label, value)
    };
    Some(format!(
        r#"<div class="speed"><div class="speed-stats">{}{}{}</div><div class="updated">Last test: {}</div></div>"#,
        stat("Download", format!("{} Mbps", field(s, "download_mbps"))),
        stat("Upload", format!("{} Mbps", field(s, "upload_mbps"))),
        stat("Ping", format!("{} ms", field(s, "ping_ms"))),
        field(s, "last_test")
    ))
}

pub fn speed_test() -> Widget {
    Widget {
        name: "speed_test",
        container: "speed-widget",
        endpoint: "/api/internet-speed",
        select: None,
        label: "speed data",
        empty: r#"No speed test data. Click "Run Speed Test" to start."#,
        view: speed_view,
        periodic: true,
    }
}

/// A saved team; older settings store bare names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Team {
    pub name: String,
    pub sport: String,
}

impl Team {
    pub fn from_value(v: &Value) -> Option<Self> {
        match v {
            Value::String(name) => Some(Team { name: name.clone(), sport: "Unknown".to_string() }),
            Value::Object(_) => {
                let name = text(v.get("name"));
                if name.is_empty() {
                    return None;
                }
                let sport = match text(v.get("sport")) {
                    s if s.is_empty() => "Unknown".to_string(),
                    s => s,
                };
                Some(Team { name, sport })
            }
            _ => None,
        }
    }
}

fn teams_view(teams: &Value) -> Option<String> {
    let teams: Vec<Team> = teams.as_array()?.iter().filter_map(Team::from_value).collect();
    list_of("teams", teams.as_slice(), |t| {
        format!(
            r#"<div class="team-item" data-sport="{}"><span>{} ({})</span>{}</div>"#,
            escape(&t.sport),
            escape(&t.name),
            escape(&t.sport),
            action_button("remove", &t.name, "Remove")
        )
    })
}

pub fn sports_teams() -> Widget {
    Widget {
        name: "sports_teams",
        container: "sports-teams-list",
        endpoint: "/api/settings/sports",
        select: Some("teams"),
        label: "teams",
        empty: "No teams added yet. Add a team above to get started.",
        view: teams_view,
        periodic: false,
    }
}

fn scores_view(scores: &Value) -> Option<String> {
    let scores = scores.as_array()?;
    list_of("news-list", scores.as_slice(), |s| {
        format!(
            r#"<div class="news-item"><div class="news-source">{}</div><div class="news-title">{}</div><div class="news-desc">{}{}{}</div></div>"#,
            field(s, "team"),
            field(s, "event"),
            field(s, "status"),
            optional(s, "score", ""),
            optional(s, "date", "")
        )
    })
}

pub fn sports_scores() -> Widget {
    Widget {
        name: "sports_scores",
        container: "sports-widget",
        endpoint: "/api/sports-scores",
        select: None,
        label: "sports scores",
        empty: "Add teams above to see scores",
        view: scores_view,
        periodic: true,
    }
}

fn photos_view(photos: &Value) -> Option<String> {
    let photos = photos.as_array()?;
    list_of("photo-grid", photos.as_slice(), |p| {
        let filename = text(p.get("filename"));
        format!(
            r#"<div class="photo"><img src="{}" alt="{}">{}</div>"#,
            field(p, "url"),
            escape(&filename),
            action_button("delete", &filename, "×")
        )
    })
}

pub fn photos() -> Widget {
    Widget {
        name: "photos",
        container: "photo-gallery",
        endpoint: "/api/photos",
        select: None,
        label: "photos",
        empty: "No photos uploaded yet",
        view: photos_view,
        periodic: false,
    }
}

fn shopping_view(items: &Value) -> Option<String> {
    let items = items.as_array()?;
    list_of("news-list", items.as_slice(), |i| {
        let id = text(i.get("id"));
        let completed = i.get("completed").and_then(Value::as_bool).unwrap_or(false);
        format!(
            r#"<div class="news-item{}"><input type="checkbox" data-action="toggle" data-id="{}"{}><span>{}</span>{}</div>"#,
            if completed { " completed" } else { "" },
            escape(&id),
            if completed { " checked" } else { "" },
            field(i, "item_name"),
            action_button("delete", &id, "Delete")
        )
    })
}

pub fn shopping_list() -> Widget {
    Widget {
        name: "shopping_list",
        container: "shopping-list-widget",
        endpoint: "/api/shopping-list",
        select: None,
        label: "shopping list",
        empty: "No items in shopping list",
        view: shopping_view,
        periodic: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::widget::Outcome;
    use serde_json::json;

    #[test]
    fn test_team_formats() {
        assert_eq!(
            Team::from_value(&json!("Yankees")),
            Some(Team { name: "Yankees".into(), sport: "Unknown".into() })
        );
        assert_eq!(
            Team::from_value(&json!({"name": "Jets", "sport": "NFL"})),
            Some(Team { name: "Jets".into(), sport: "NFL".into() })
        );
        assert_eq!(Team::from_value(&json!({"sport": "NFL"})), None);
        assert_eq!(Team::from_value(&json!(7)), None);
    }

    #[test]
    fn test_teams_view_reads_settings_payload() {
        let (outcome, html) = sports_teams().present(&json!({"teams": ["Mets", {"name": "Knicks", "sport": "NBA"}]}));
        assert_eq!(outcome, Outcome::Rendered);
        assert!(html.contains("Mets (Unknown)"));
        assert!(html.contains(r#"data-action="remove" data-id="Knicks""#));

        let (outcome, html) = sports_teams().present(&json!({"teams": []}));
        assert_eq!(outcome, Outcome::Empty);
        assert!(html.contains("No teams added yet"));
    }

    #[test]
    fn test_packages_status_and_actions() {
        let (_, html) = packages().present(&json!({"packages": [
            {"id": 12, "carrier": "UPS", "tracking_number": "1Z999", "status": "Delivered", "estimated_delivery": "Today"}
        ]}));
        assert!(html.contains("UPS - 1Z999"));
        assert!(html.contains("#4caf50"));
        assert!(html.contains(">Package<"));
        assert!(html.contains(" • ETA: Today"));
        assert!(html.contains(r#"data-action="refresh" data-id="12""#));
    }

    #[test]
    fn test_shopping_item_state() {
        let (_, html) = shopping_list().present(&json!([
            {"id": 1, "item_name": "milk", "completed": true},
            {"id": 2, "item_name": "eggs", "completed": false}
        ]));
        assert_eq!(html.matches(" checked").count(), 1);
        assert!(html.contains("news-item completed"));
    }

    #[test]
    fn test_speed_test_empty_state() {
        let (outcome, html) = speed_test().present(&json!(null));
        assert_eq!(outcome, Outcome::Empty);
        assert!(html.contains("Run Speed Test"));
    }
}
