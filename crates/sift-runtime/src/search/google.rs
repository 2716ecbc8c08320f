//! Google results-page scraper.
//!
//! Parsing is split into synchronous functions so the `!Send` HTML
//! document never lives across an await point.

use async_trait::async_trait;
use futures::future::join_all;
use lazy_static::lazy_static;
use scraper::{ElementRef, Html, Selector};
use sift_core::text::title_from_url;
use sift_core::SearchResult;
use std::time::Duration;

use super::{SearchError, SearchProvider};
use crate::config::Settings;

pub const GOOGLE_SEARCH_URL: &str = "https://www.google.com/search";

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
    AppleWebKit/537.36 (KHTML, like Gecko) Chrome/115.0.0.0 Safari/537.36";

lazy_static! {
    static ref RESULT_BLOCK: Selector = Selector::parse("div.g").unwrap();
    static ref ANCHOR: Selector = Selector::parse("a").unwrap();
    static ref HEADING: Selector = Selector::parse("h3").unwrap();
    static ref SNIPPET: Selector = Selector::parse(r#"div[data-sncf="2"]"#).unwrap();
    static ref PARAGRAPH: Selector = Selector::parse("p").unwrap();
}

/// Visible text of an element with runs of whitespace collapsed.
fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Extract up to `max_results` hits from a results page.
///
/// Each `div.g` block contributes its first anchor's `href` as the link,
/// its `h3` as the title (or a title derived from the link) and its
/// snippet block as the description. Blocks without a link are skipped.
pub fn parse_search_page(html: &str, max_results: usize) -> Vec<SearchResult> {
    let document = Html::parse_document(html);

    document
        .select(&RESULT_BLOCK)
        .filter_map(|block| {
            let link = block.select(&ANCHOR).next()?.value().attr("href")?.trim();
            if link.is_empty() {
                return None;
            }

            let title = block
                .select(&HEADING)
                .next()
                .map(element_text)
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| title_from_url(link));

            let description = block
                .select(&SNIPPET)
                .next()
                .map(element_text)
                .filter(|d| !d.is_empty());

            Some(SearchResult {
                title,
                link: link.to_string(),
                description,
                content: None,
            })
        })
        .take(max_results)
        .collect()
}

/// Paragraph text of a page, paragraphs joined by single spaces.
pub fn extract_paragraphs(html: &str) -> Option<String> {
    let document = Html::parse_document(html);

    let content = document
        .select(&PARAGRAPH)
        .map(element_text)
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join(" ");

    (!content.is_empty()).then_some(content)
}

/// Scrapes Google result pages and the pages they link to.
#[derive(Debug, Clone)]
pub struct GoogleScraper {
    http: reqwest::Client,
    search_url: String,
    max_results: usize,
    timeout: Duration,
}

impl GoogleScraper {
    pub fn new(max_results: usize, timeout: Duration) -> Result<Self, SearchError> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| SearchError::HttpError(e.to_string()))?;

        Ok(Self {
            http,
            search_url: GOOGLE_SEARCH_URL.to_string(),
            max_results,
            timeout,
        })
    }

    pub fn from_settings(settings: &Settings) -> Result<Self, SearchError> {
        Self::new(settings.search_results_per_query, settings.request_timeout)
    }

    /// Point the scraper at a different results endpoint.
    pub fn with_search_url(mut self, url: impl Into<String>) -> Self {
        self.search_url = url.into();
        self
    }

    fn map_error(&self, error: reqwest::Error) -> SearchError {
        if error.is_timeout() {
            SearchError::Timeout(self.timeout)
        } else {
            SearchError::HttpError(error.to_string())
        }
    }

    async fn get_html(&self, request: reqwest::RequestBuilder) -> Result<String, SearchError> {
        let response = request
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| self.map_error(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SearchError::Status(status.as_u16()));
        }

        response.text().await.map_err(|e| self.map_error(e))
    }

    async fn fetch_content(&self, link: &str) -> Option<String> {
        match self.get_html(self.http.get(link)).await {
            Ok(html) => extract_paragraphs(&html),
            Err(e) => {
                tracing::debug!(link, error = %e, "Failed to fetch page content");
                None
            }
        }
    }
}

#[async_trait]
impl SearchProvider for GoogleScraper {
    async fn search(&self, query: &str) -> Result<Vec<SearchResult>, SearchError> {
        let request = self.http.get(&self.search_url).query(&[("q", query)]);
        let html = self.get_html(request).await?;

        let candidates = parse_search_page(&html, self.max_results);
        tracing::debug!(query, candidates = candidates.len(), "Parsed results page");

        let contents = join_all(candidates.iter().map(|c| self.fetch_content(&c.link))).await;

        Ok(candidates
            .into_iter()
            .zip(contents)
            .map(|(mut result, content)| {
                result.content = content;
                result
            })
            .collect())
    }

    fn name(&self) -> &str {
        "google"
    }
}
