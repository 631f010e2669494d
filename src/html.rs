//! Small helpers for templating payload text into markup.

use serde_json::Value;

pub fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Escaped display text of a JSON scalar; empty for null/missing.
pub fn field(v: &Value, key: &str) -> String {
    escape(&text(v.get(key)))
}

/// Unescaped display text of an optional JSON scalar.
pub fn text(v: Option<&Value>) -> String {
    match v {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        _ => String::new(),
    }
}

/// `heavy` -> `Heavy`
pub fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Cut to at most `max` characters, appending `...` when cut.
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max).collect();
    out.push_str("...");
    out
}

pub fn placeholder(message: &str) -> String {
    format!(r#"<div class="placeholder">{}</div>"#, escape(message))
}

pub fn error_box(message: &str) -> String {
    format!(r#"<div class="error">{}</div>"#, escape(message))
}

/// True for null, empty strings, arrays and objects.
pub fn is_blank(v: &Value) -> bool {
    match v {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_escape() {
        assert_eq!(escape(r#"<a href="x">Tom & Jerry's</a>"#), "&lt;a href=&quot;x&quot;&gt;Tom &amp; Jerry&#39;s&lt;/a&gt;");
    }

    #[test]
    fn test_field_formats_scalars() {
        let v = json!({"temp": 71.5, "desc": "<b>sunny</b>", "none": null});
        assert_eq!(field(&v, "temp"), "71.5");
        assert_eq!(field(&v, "desc"), "&lt;b&gt;sunny&lt;/b&gt;");
        assert_eq!(field(&v, "none"), "");
        assert_eq!(field(&v, "missing"), "");
    }

    #[test]
    fn test_truncate_and_capitalize() {
        assert_eq!(truncate("abcdef", 3), "abc...");
        assert_eq!(truncate("abc", 3), "abc");
        assert_eq!(capitalize("medium"), "Medium");
        assert_eq!(capitalize(""), "");
    }

    #[test]
    fn test_is_blank() {
        assert!(is_blank(&json!(null)));
        assert!(is_blank(&json!({})));
        assert!(is_blank(&json!([])));
        assert!(!is_blank(&json!({"a": 1})));
        assert!(!is_blank(&json!(0)));
    }
}
