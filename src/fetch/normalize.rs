//! Text and date normalization shared by every source adapter

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::sync::OnceLock;

// Elements whose text is never article prose
const SKIPPED_ELEMENTS: &[&str] = &[
    "script", "style", "noscript", "header", "footer", "nav", "aside", "form",
];

#[allow(clippy::expect_used)]
fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).expect("static regex pattern must compile")
}

#[allow(clippy::expect_used)]
fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("static selector must parse")
}

fn blocks_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        compile(r"(?is)<script\b.*?</script\s*>|<style\b.*?</style\s*>|<noscript\b.*?</noscript\s*>")
    })
}

fn tags_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| compile(r"(?s)</?[a-zA-Z!][^>]*>"))
}

fn whitespace_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| compile(r"\s+"))
}

/// Decode HTML entities, strip markup and collapse whitespace
pub fn normalize_text(input: &str) -> String {
    let decoded = html_escape::decode_html_entities(input);
    let without_blocks = blocks_re().replace_all(&decoded, " ");
    let without_tags = tags_re().replace_all(&without_blocks, " ");
    whitespace_re()
        .replace_all(&without_tags, " ")
        .trim()
        .to_string()
}

/// Parse a publication date in any format sources are known to use
///
/// Accepts RFC 3339, RFC 2822, GDELT's compact `YYYYMMDDTHHMMSSZ`,
/// `YYYY-MM-DD HH:MM:SS`, `YYYY-MM-DD` and unix timestamps (seconds or
/// milliseconds). Naive values are taken as UTC.
pub fn parse_published(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(raw) {
        return Some(dt.with_timezone(&Utc));
    }

    for format in ["%Y%m%dT%H%M%SZ", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|n| Utc.from_utc_datetime(&n));
    }

    if raw.len() >= 9 && raw.bytes().all(|b| b.is_ascii_digit()) {
        let n: i64 = raw.parse().ok()?;
        return if raw.len() >= 13 {
            DateTime::from_timestamp_millis(n)
        } else {
            DateTime::from_timestamp(n, 0)
        };
    }

    None
}

/// Publication timestamp from a JSON field value
pub fn published_from_value(value: &serde_json::Value) -> Option<DateTime<Utc>> {
    match value {
        serde_json::Value::String(s) => parse_published(s),
        serde_json::Value::Number(n) => parse_published(&n.to_string()),
        _ => None,
    }
}

fn readable_text(element: ElementRef<'_>) -> String {
    let mut parts: Vec<&str> = Vec::new();
    for node in element.descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        let skipped = node.ancestors().any(|ancestor| {
            ancestor
                .value()
                .as_element()
                .is_some_and(|e| SKIPPED_ELEMENTS.contains(&e.name()))
        });
        if !skipped {
            parts.push(&**text);
        }
    }
    whitespace_re()
        .replace_all(&parts.join(" "), " ")
        .trim()
        .to_string()
}

/// Readable text of an HTML page
///
/// Prefers the first `<article>` with text, then `<body>`, then the payload
/// itself with markup stripped.
pub fn extract_readable_text(payload: &str) -> String {
    static ARTICLE: OnceLock<Selector> = OnceLock::new();
    static BODY: OnceLock<Selector> = OnceLock::new();

    let document = Html::parse_document(payload);

    let article = ARTICLE.get_or_init(|| selector("article"));
    if let Some(text) = document
        .select(article)
        .map(readable_text)
        .find(|t| !t.is_empty())
    {
        return text;
    }

    let body = BODY.get_or_init(|| selector("body"));
    if let Some(text) = document
        .select(body)
        .map(readable_text)
        .find(|t| !t.is_empty())
    {
        return text;
    }

    normalize_text(payload)
}

/// Document title: `<title>`, else the first `<h1>`
pub fn extract_title(payload: &str) -> Option<String> {
    static TITLE: OnceLock<Selector> = OnceLock::new();
    let document = Html::parse_document(payload);
    let title = TITLE.get_or_init(|| selector("title, h1"));
    document
        .select(title)
        .map(|e| normalize_text(&e.text().collect::<Vec<_>>().join(" ")))
        .find(|t| !t.is_empty())
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn test_normalize_text_decodes_strips_and_collapses() {
        let s = "  <p>Hello,&nbsp;&nbsp;<b>world</b></p>\n\n&amp; more  ";
        assert_eq!(normalize_text(s), "Hello, world & more");
    }

    #[test]
    fn test_normalize_text_drops_script_bodies() {
        let s = "before<script type=\"text/javascript\">var x = '<b>';</script>after";
        assert_eq!(normalize_text(s), "before after");
    }

    #[test]
    fn test_normalize_text_keeps_comparison_operators() {
        assert_eq!(normalize_text("1 < 2 and 3 > 2"), "1 < 2 and 3 > 2");
    }

    #[test]
    fn test_parse_published_formats() {
        let expected = Utc.with_ymd_and_hms(2024, 3, 5, 14, 30, 0).unwrap();
        for raw in [
            "2024-03-05T14:30:00Z",
            "2024-03-05T16:30:00+02:00",
            "Tue, 05 Mar 2024 14:30:00 +0000",
            "Tue, 05 Mar 2024 14:30:00 GMT",
            "20240305T143000Z",
            "2024-03-05 14:30:00",
            "2024-03-05T14:30:00",
            "1709649000",
            "1709649000000",
        ] {
            assert_eq!(parse_published(raw), Some(expected), "{raw}");
        }

        let day = parse_published("2024-03-05").unwrap();
        assert_eq!((day.year(), day.month(), day.day(), day.hour()), (2024, 3, 5, 0));
    }

    #[test]
    fn test_parse_published_rejects_garbage() {
        assert_eq!(parse_published(""), None);
        assert_eq!(parse_published("yesterday"), None);
        assert_eq!(parse_published("2024-13-45"), None);
    }

    #[test]
    fn test_readable_text_prefers_article() {
        let html = r#"<html><body>
            <nav>Home | World</nav>
            <article><h1>Title</h1><script>track()</script><p>First   para.</p></article>
            <footer>Copyright</footer>
        </body></html>"#;
        assert_eq!(extract_readable_text(html), "Title First para.");
    }

    #[test]
    fn test_readable_text_falls_back_to_body() {
        let html = "<html><body><header>Site</header><p>Only body text</p><style>p{}</style></body></html>";
        assert_eq!(extract_readable_text(html), "Only body text");
    }

    #[test]
    fn test_readable_text_of_plain_payload() {
        assert_eq!(extract_readable_text("just text"), "just text");
    }

    #[test]
    fn test_extract_title() {
        let html = "<html><head><title> Page &amp; Title </title></head><body><h1>Heading</h1></body></html>";
        assert_eq!(extract_title(html).as_deref(), Some("Page & Title"));
        assert_eq!(
            extract_title("<body><h1>Only heading</h1></body>").as_deref(),
            Some("Only heading")
        );
        assert_eq!(extract_title("<p>none</p>"), None);
    }
}
