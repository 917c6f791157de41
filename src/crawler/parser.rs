//! HTML extractor for links, text and keyword signal
//!
//! This module turns one [`FetchResult`] into a [`PageExtract`]:
//! - Outbound links from `<a href>` tags, relative forms resolved against the page URL
//! - Visible page text and the page title
//! - A keyword match set scored over the text tokens

use crate::crawler::fetcher::FetchResult;
use crate::state::KeywordMatchSet;
use crate::url::normalize_link;
use scraper::{ElementRef, Html, Node, Selector};
use std::collections::HashSet;
use thiserror::Error;
use url::Url;

/// Elements whose text never counts as page content
const SKIPPED_ELEMENTS: &[&str] = &["script", "style", "noscript", "template"];

/// Reasons a fetched response could not be turned into a [`PageExtract`]
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("unsupported content type {content_type:?} for {url}")]
    UnsupportedContentType { url: String, content_type: String },

    #[error("empty response body for {0}")]
    EmptyBody(String),

    #[error("invalid page url {url}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
}

/// Everything the pipeline needs from one fetched page
#[derive(Debug, Clone, PartialEq)]
pub struct PageExtract {
    /// The URL the page was requested as
    pub url: String,
    /// Trimmed text nodes joined with single spaces
    pub text: String,
    pub title: Option<String>,
    /// Outbound links in first-seen order, without duplicates or self-references
    pub links: Vec<String>,
    pub keywords: KeywordMatchSet,
}

/// Parses fetched pages against a fixed keyword configuration
///
/// Extraction is pure: the same response and keywords always give the same
/// links and match states.
#[derive(Debug, Clone)]
pub struct Extractor {
    keywords: KeywordMatchSet,
}

impl Extractor {
    pub fn new<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            keywords: KeywordMatchSet::new(keywords),
        }
    }

    /// Extracts links, text, title and keyword matches from a fetched page
    ///
    /// # Arguments
    ///
    /// * `page` - The fetched response
    ///
    /// # Returns
    ///
    /// * `Ok(PageExtract)` - Successfully parsed page
    /// * `Err(ExtractError)` - The response is not HTML, has no body, or its URL is invalid
    ///
    /// # Example
    ///
    /// ```
    /// use chrono::Utc;
    /// use loopcrawl::crawler::{Extractor, FetchResult};
    ///
    /// let html = r#"<html><head><title>Jobs</title></head><body><a href="/b">Rust jobs</a></body></html>"#;
    /// let page = FetchResult {
    ///     url: "https://a.test/".to_string(),
    ///     body: html.as_bytes().to_vec(),
    ///     status: 200,
    ///     content_length: None,
    ///     content_type: Some("text/html".to_string()),
    ///     fetched_at: Utc::now(),
    /// };
    ///
    /// let extract = Extractor::new(["rust"]).extract(&page).unwrap();
    /// assert_eq!(extract.title.as_deref(), Some("Jobs"));
    /// assert_eq!(extract.links, vec!["https://a.test/b"]);
    /// assert_eq!(extract.keywords.score(), 1);
    /// ```
    pub fn extract(&self, page: &FetchResult) -> Result<PageExtract, ExtractError> {
        if let Some(content_type) = &page.content_type {
            if !is_html(content_type) {
                return Err(ExtractError::UnsupportedContentType {
                    url: page.url.clone(),
                    content_type: content_type.clone(),
                });
            }
        }
        if page.body.iter().all(u8::is_ascii_whitespace) {
            return Err(ExtractError::EmptyBody(page.url.clone()));
        }

        let base = Url::parse(page.url.trim()).map_err(|source| ExtractError::InvalidUrl {
            url: page.url.clone(),
            source,
        })?;

        let html = String::from_utf8_lossy(&page.body);
        let document = Html::parse_document(&html);

        let title = extract_title(&document);
        let links = extract_links(&document, &page.url, &base);
        let text = extract_text(&document);

        let mut keywords = self.keywords.clone();
        for token in text.split_whitespace() {
            keywords.observe(token);
        }

        Ok(PageExtract {
            url: page.url.clone(),
            text,
            title,
            links,
            keywords,
        })
    }
}

fn is_html(content_type: &str) -> bool {
    let mime = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    mime.is_empty() || mime == "text/html" || mime == "application/xhtml+xml"
}

/// Extracts the page title from the HTML document
fn extract_title(document: &Html) -> Option<String> {
    let title_selector = Selector::parse("title").ok()?;

    document
        .select(&title_selector)
        .next()
        .map(|element| element.text().collect::<String>().trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Collects the outbound links of a page
///
/// Relative references are resolved against `base`; absolute, scheme-bearing
/// and fragment-only hrefs are kept verbatim for the revisit filter to judge.
fn extract_links(document: &Html, page_url: &str, base: &Url) -> Vec<String> {
    let Ok(a_selector) = Selector::parse("a[href]") else {
        return Vec::new();
    };

    let own = normalize_link(page_url);
    let mut seen = HashSet::new();
    let mut links = Vec::new();

    for element in document.select(&a_selector) {
        let Some(href) = element.value().attr("href") else {
            continue;
        };
        let href = href.trim();
        if href.is_empty() || normalize_link(href) == own {
            continue;
        }

        let Some(link) = resolve_link(href, base) else {
            continue;
        };
        if normalize_link(&link) == own {
            continue;
        }

        if seen.insert(link.clone()) {
            links.push(link);
        }
    }

    links
}

/// Resolves an href against the page URL
///
/// Returns the href unchanged when it is fragment-only or already carries a
/// scheme, and None when a relative reference cannot be resolved.
fn resolve_link(href: &str, base: &Url) -> Option<String> {
    if href.starts_with('#') || Url::parse(href).is_ok() {
        return Some(href.to_string());
    }

    base.join(href).ok().map(String::from)
}

fn extract_text(document: &Html) -> String {
    let mut parts = Vec::new();
    collect_text(document.root_element(), &mut parts);
    parts.join(" ")
}

fn collect_text(element: ElementRef<'_>, parts: &mut Vec<String>) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => {
                let trimmed = text.trim();
                if !trimmed.is_empty() {
                    parts.push(trimmed.to_string());
                }
            }
            Node::Element(el) => {
                if SKIPPED_ELEMENTS.contains(&el.name()) {
                    continue;
                }
                if let Some(child_element) = ElementRef::wrap(child) {
                    collect_text(child_element, parts);
                }
            }
            _ => {}
        }
    }
}
