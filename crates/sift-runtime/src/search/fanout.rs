//! Concurrent search across every generated query.

use futures::stream::{FuturesUnordered, StreamExt};
use sift_core::text::truncate_opt;
use sift_core::SearchResult;
use std::sync::Arc;
use std::time::Duration;

use super::SearchProvider;
use crate::config::Settings;

/// Issues one provider call per query, all in flight together, and merges
/// the surviving results in completion order.
///
/// A failed, empty or timed-out call contributes nothing and never affects
/// its siblings. `timeout` is the per-request limit the provider applies to
/// each of its own requests. A provider call makes the results-page request
/// and then its page fetches concurrently, so the deadline for the whole call
/// is twice that limit.
#[derive(Clone)]
pub struct SearchFanout {
    provider: Arc<dyn SearchProvider>,
    timeout: Duration,
    max_content_length: usize,
}

impl SearchFanout {
    pub fn new(provider: Arc<dyn SearchProvider>, timeout: Duration, max_content_length: usize) -> Self {
        Self {
            provider,
            timeout,
            max_content_length,
        }
    }

    pub fn from_settings(provider: Arc<dyn SearchProvider>, settings: &Settings) -> Self {
        Self::new(provider, settings.request_timeout, settings.max_content_length)
    }

    /// Deadline for one provider call.
    pub fn call_budget(&self) -> Duration {
        self.timeout.saturating_mul(2)
    }

    pub async fn fetch(&self, queries: &[String]) -> Vec<SearchResult> {
        if queries.is_empty() {
            return Vec::new();
        }

        let budget = self.call_budget();
        let mut in_flight: FuturesUnordered<_> = queries
            .iter()
            .map(|query| async move {
                let outcome = tokio::time::timeout(budget, self.provider.search(query)).await;
                (query, outcome)
            })
            .collect();

        let mut merged = Vec::new();
        while let Some((query, outcome)) = in_flight.next().await {
            match outcome {
                Ok(Ok(batch)) => {
                    let before = merged.len();
                    merged.extend(batch.into_iter().filter_map(|r| self.prepare(r)));
                    tracing::debug!(
                        query = %query,
                        provider = self.provider.name(),
                        kept = merged.len() - before,
                        "Search completed"
                    );
                }
                Ok(Err(e)) => {
                    tracing::warn!(query = %query, error = %e, "Search failed");
                }
                Err(_) => {
                    tracing::warn!(query = %query, timeout = ?budget, "Search timed out");
                }
            }
        }

        merged
    }

    /// Truncate text fields and drop results left with nothing to read.
    fn prepare(&self, mut result: SearchResult) -> Option<SearchResult> {
        let non_blank = |text: Option<String>| text.filter(|t| !t.trim().is_empty());

        result.description = truncate_opt(non_blank(result.description), self.max_content_length);
        result.content = truncate_opt(non_blank(result.content), self.max_content_length);

        if result.has_text() {
            Some(result)
        } else {
            tracing::debug!(title = %result.title, "Skipping result without usable text");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::SearchError;
    use crate::testing::StaticSearch;
    use proptest::prelude::*;

    fn hit(title: &str, content: &str) -> SearchResult {
        SearchResult::new(title, format!("https://example.com/{}", title)).with_content(content)
    }

    fn fanout(search: StaticSearch) -> (SearchFanout, Arc<StaticSearch>) {
        let search = Arc::new(search);
        let fanout = SearchFanout::new(search.clone(), Duration::from_secs(10), 2048);
        (fanout, search)
    }

    fn queries(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_empty_queries_make_no_calls() {
        let (fanout, search) = fanout(StaticSearch::new());
        assert!(fanout.fetch(&[]).await.is_empty());
        assert_eq!(search.calls(), 0);
    }

    #[tokio::test]
    async fn test_failures_do_not_affect_siblings() {
        let (fanout, search) = fanout(
            StaticSearch::new()
                .with_results("a", vec![hit("a1", "alpha")])
                .with_error("b", SearchError::Status(503))
                .with_results("c", vec![hit("c1", "gamma"), hit("c2", "delta")]),
        );

        let results = fanout.fetch(&queries(&["a", "b", "c"])).await;
        assert_eq!(search.calls(), 3);

        let mut titles: Vec<_> = results.iter().map(|r| r.title.as_str()).collect();
        titles.sort();
        assert_eq!(titles, vec!["a1", "c1", "c2"]);
    }

    #[tokio::test]
    async fn test_results_without_text_are_dropped() {
        let (fanout, _) = fanout(StaticSearch::new().with_results(
            "q",
            vec![
                SearchResult::new("bare", "https://example.com/bare"),
                SearchResult::new("blank", "https://example.com/blank").with_content("  "),
                SearchResult::new("snippet", "https://example.com/s").with_description("kept"),
            ],
        ));

        let results = fanout.fetch(&queries(&["q"])).await;
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].title, "snippet");
        assert!(results[0].content.is_none());
    }

    #[tokio::test]
    async fn test_text_is_truncated() {
        let search = Arc::new(StaticSearch::new().with_results(
            "q",
            vec![SearchResult::new("t", "https://example.com")
                .with_description("abcdefgh")
                .with_content("0123456789")],
        ));
        let fanout = SearchFanout::new(search, Duration::from_secs(10), 4);

        let results = fanout.fetch(&queries(&["q"])).await;
        assert_eq!(results[0].description.as_deref(), Some("abcd..."));
        assert_eq!(results[0].content.as_deref(), Some("0123..."));
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_call_times_out_alone() {
        let search = Arc::new(
            StaticSearch::new()
                .with_results("fast", vec![hit("f", "quick")])
                .with_results("slow", vec![hit("s", "late")])
                .with_delay("slow", Duration::from_secs(60)),
        );
        let fanout = SearchFanout::new(search, Duration::from_secs(5), 2048);

        let results = fanout.fetch(&queries(&["slow", "fast"])).await;
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].title, "f");
    }

    #[tokio::test(start_paused = true)]
    async fn test_call_may_outlast_single_request_timeout() {
        let search = Arc::new(
            StaticSearch::new()
                .with_results("q", vec![hit("q1", "described")])
                .with_delay("q", Duration::from_secs(7)),
        );
        let fanout = SearchFanout::new(search, Duration::from_secs(5), 2048);
        assert_eq!(fanout.call_budget(), Duration::from_secs(10));

        let results = fanout.fetch(&queries(&["q"])).await;
        assert_eq!(results.len(), 1);
    }

    /// Serves a results page at `/search` whose only hit links to `/slow`,
    /// a page that answers long after any request timeout.
    async fn slow_page_server() -> String {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        let page = format!(
            r#"<html><body><div class="g"><a href="{}/slow"><h3>Slow</h3></a><div data-sncf="2">A description that arrived in time.</div></div></body></html>"#,
            base
        );

        tokio::spawn(async move {
            loop {
                let Ok((mut socket, _)) = listener.accept().await else {
                    return;
                };
                let page = page.clone();
                tokio::spawn(async move {
                    let mut buf = [0u8; 4096];
                    let n = socket.read(&mut buf).await.unwrap_or(0);
                    let request = String::from_utf8_lossy(&buf[..n]);
                    let body = if request.starts_with("GET /slow") {
                        tokio::time::sleep(Duration::from_secs(5)).await;
                        "<p>too late</p>".to_string()
                    } else {
                        page
                    };
                    let response = format!(
                        "HTTP/1.1 200 OK\r\ncontent-type: text/html\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                        body.len(),
                        body
                    );
                    let _ = socket.write_all(response.as_bytes()).await;
                });
            }
        });

        base
    }

    #[tokio::test]
    async fn test_slow_linked_page_keeps_described_hit() {
        let base = slow_page_server().await;
        let timeout = Duration::from_millis(500);
        let scraper = crate::search::GoogleScraper::new(2, timeout)
            .unwrap()
            .with_search_url(format!("{}/search", base));
        let fanout = SearchFanout::new(Arc::new(scraper), timeout, 2048);

        let results = fanout.fetch(&queries(&["anything"])).await;
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].title, "Slow");
        assert_eq!(
            results[0].description.as_deref(),
            Some("A description that arrived in time.")
        );
        assert!(results[0].content.is_none());
    }

    proptest! {
        #[test]
        fn prop_failing_queries_contribute_nothing(fail_mask in proptest::collection::vec(any::<bool>(), 1..5)) {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .unwrap();

            let mut search = StaticSearch::new();
            let mut names = Vec::new();
            for (i, fails) in fail_mask.iter().enumerate() {
                let name = format!("q{}", i);
                search = if *fails {
                    search.with_error(&name, SearchError::HttpError("down".into()))
                } else {
                    search.with_results(&name, vec![hit(&name, "text")])
                };
                names.push(name);
            }
            let (fanout, _) = fanout(search);

            let results = runtime.block_on(fanout.fetch(&names));
            let expected = fail_mask.iter().filter(|f| !**f).count();
            prop_assert_eq!(results.len(), expected);
        }
    }
}
