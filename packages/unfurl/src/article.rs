//! Full-article content extraction for reader views.

use scraper::{Html, Selector};
use serde::Serialize;
use url::Url;

use crate::client;
use crate::config::UnfurlConfig;
use crate::error::FetchResult;
use crate::generic::meta_map;

/// Words per minute assumed for the reading-time estimate.
const READING_WPM: usize = 200;

/// Candidate main-content containers, most specific first.
const MAIN_SELECTORS: &[&str] = &[
    "article",
    "main",
    "[role='main']",
    "#content",
    "#main",
    ".post-content",
    ".entry-content",
    ".article-body",
    ".content",
];

/// Elements stripped from the extracted fragment.
const BOILERPLATE_SELECTORS: &[&str] = &[
    "nav", "header", "footer", "aside", "script", "style", "noscript", "iframe", "form",
    ".nav", ".navbar", ".sidebar", ".menu", ".advertisement", ".ads", ".comments",
];

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    /// Main-content HTML fragment
    pub content: String,
    /// Plain text of the main content
    pub text_content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub byline: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub site_name: Option<String>,
    pub word_count: usize,
    /// Estimated minutes to read
    pub reading_time: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published_time: Option<String>,
}

pub struct ArticleExtractor {
    client: reqwest::Client,
    config: UnfurlConfig,
}

impl ArticleExtractor {
    pub fn new(client: reqwest::Client, config: UnfurlConfig) -> Self {
        Self { client, config }
    }

    pub async fn extract(&self, url: &Url) -> FetchResult<Article> {
        let html =
            client::fetch_text(&self.client, url.as_str(), self.config.article_timeout).await?;
        Ok(extract_from_html(&html))
    }
}

/// Pure extraction over an already-fetched document.
pub fn extract_from_html(html: &str) -> Article {
    let document = Html::parse_document(html);
    let meta = meta_map(&document);

    let title = meta
        .get("og:title")
        .cloned()
        .or_else(|| title_text(&document));
    let byline = meta
        .get("author")
        .or_else(|| meta.get("article:author"))
        .cloned();
    let site_name = meta.get("og:site_name").cloned();
    let published_time = meta
        .get("article:published_time")
        .or_else(|| meta.get("date"))
        .cloned();

    let content = main_content(&document);
    let text_content = fragment_text(&content);
    let word_count = text_content.split_whitespace().count();
    let reading_time = word_count.div_ceil(READING_WPM).max(1);

    Article {
        content,
        text_content,
        title,
        byline,
        site_name,
        word_count,
        reading_time,
        published_time,
    }
}

fn title_text(document: &Html) -> Option<String> {
    let selector = Selector::parse("title").expect("static selector");
    document
        .select(&selector)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string())
        .filter(|t| !t.is_empty())
}

/// First matching main-content container, else body with boilerplate
/// stripped, else the whole document.
fn main_content(document: &Html) -> String {
    for selector_str in MAIN_SELECTORS {
        if let Ok(selector) = Selector::parse(selector_str) {
            if let Some(main) = document.select(&selector).next() {
                return strip_boilerplate(&main.html());
            }
        }
    }

    if let Ok(body_selector) = Selector::parse("body") {
        if let Some(body) = document.select(&body_selector).next() {
            return strip_boilerplate(&body.html());
        }
    }

    document.html()
}

fn strip_boilerplate(html: &str) -> String {
    let document = Html::parse_document(html);
    let mut result = html.to_string();
    for selector_str in BOILERPLATE_SELECTORS {
        if let Ok(selector) = Selector::parse(selector_str) {
            for element in document.select(&selector) {
                result = result.replace(&element.html(), "");
            }
        }
    }
    result
}

fn fragment_text(html: &str) -> String {
    let fragment = Html::parse_fragment(html);
    fragment
        .root_element()
        .text()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
        <html><head>
            <title>Fallback Title</title>
            <meta property="og:title" content="The Article">
            <meta name="author" content="Jane Writer">
            <meta property="og:site_name" content="Example News">
            <meta property="article:published_time" content="2024-03-01T10:00:00Z">
        </head><body>
            <nav>Home | About</nav>
            <article>
                <h1>The Article</h1>
                <p>First paragraph with several words in it.</p>
                <p>Second paragraph, also with words.</p>
                <script>trackThings();</script>
            </article>
            <footer>Copyright</footer>
        </body></html>
    "#;

    #[test]
    fn test_extracts_article_container() {
        let article = extract_from_html(PAGE);
        assert!(article.content.contains("First paragraph"));
        assert!(!article.content.contains("Copyright"));
        assert!(!article.content.contains("trackThings"));
    }

    #[test]
    fn test_metadata_fields() {
        let article = extract_from_html(PAGE);
        assert_eq!(article.title.as_deref(), Some("The Article"));
        assert_eq!(article.byline.as_deref(), Some("Jane Writer"));
        assert_eq!(article.site_name.as_deref(), Some("Example News"));
        assert_eq!(
            article.published_time.as_deref(),
            Some("2024-03-01T10:00:00Z")
        );
    }

    #[test]
    fn test_word_count_and_reading_time() {
        let article = extract_from_html(PAGE);
        assert!(article.word_count > 5);
        assert_eq!(article.reading_time, 1);
    }

    #[test]
    fn test_body_fallback_when_no_container() {
        let article = extract_from_html("<html><body><p>Loose text here.</p></body></html>");
        assert!(article.text_content.contains("Loose text here."));
    }
}
