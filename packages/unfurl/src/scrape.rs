//! Regex-based meta-tag extraction for the lightweight scrape tiers.
//!
//! Platform scrape tiers only need two or three og: values out of pages
//! that are frequently malformed, so a tolerant regex pass is used here
//! instead of a full DOM parse. The generic extractor uses a real DOM.

use regex::Regex;
use std::sync::OnceLock;

fn meta_patterns() -> &'static (Regex, Regex) {
    static PATTERNS: OnceLock<(Regex, Regex)> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        // Both attribute orders occur in the wild: property-then-content
        // and content-then-property.
        let prop_first = Regex::new(
            r#"(?is)<meta[^>]+(?:property|name)\s*=\s*["']([^"']+)["'][^>]*\scontent\s*=\s*["']([^"']*)["']"#,
        )
        .unwrap();
        let content_first = Regex::new(
            r#"(?is)<meta[^>]+content\s*=\s*["']([^"']*)["'][^>]*\s(?:property|name)\s*=\s*["']([^"']+)["']"#,
        )
        .unwrap();
        (prop_first, content_first)
    })
}

/// Find the content of the first `<meta>` whose `property` or `name`
/// equals `key` (case-insensitive).
pub fn meta_content(html: &str, key: &str) -> Option<String> {
    let (prop_first, content_first) = meta_patterns();

    for cap in prop_first.captures_iter(html) {
        if cap[1].eq_ignore_ascii_case(key) {
            return Some(decode_entities(&cap[2]));
        }
    }
    for cap in content_first.captures_iter(html) {
        if cap[2].eq_ignore_ascii_case(key) {
            return Some(decode_entities(&cap[1]));
        }
    }
    None
}

/// Extract `<title>` text.
pub fn html_title(html: &str) -> Option<String> {
    static TITLE: OnceLock<Regex> = OnceLock::new();
    let pattern = TITLE.get_or_init(|| Regex::new(r"(?is)<title[^>]*>(.*?)</title>").unwrap());
    pattern
        .captures(html)
        .and_then(|cap| cap.get(1))
        .map(|m| decode_entities(m.as_str().trim()))
        .filter(|t| !t.is_empty())
}

/// Decode the handful of HTML entities that appear in meta content.
pub fn decode_entities(text: &str) -> String {
    text.replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#x27;", "'")
        .replace("&nbsp;", " ")
}
