//! Web search providers and the concurrent fan-out over them.

use async_trait::async_trait;
use sift_core::SearchResult;
use std::time::Duration;
use thiserror::Error;

mod fanout;
mod google;

pub use fanout::SearchFanout;
pub use google::{extract_paragraphs, parse_search_page, GoogleScraper, GOOGLE_SEARCH_URL};

/// Errors from a search provider.
#[derive(Error, Debug, Clone)]
pub enum SearchError {
    #[error("Search request failed: {0}")]
    HttpError(String),

    #[error("Search returned HTTP {0}")]
    Status(u16),

    #[error("Search timed out after {0:?}")]
    Timeout(Duration),
}

/// A source of search results for one query.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    async fn search(&self, query: &str) -> Result<Vec<SearchResult>, SearchError>;

    /// Provider name for logs.
    fn name(&self) -> &str;
}
