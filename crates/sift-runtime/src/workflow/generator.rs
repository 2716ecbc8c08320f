//! Search query generation with bounded retries.

use backon::{ConstantBuilder, Retryable};
use sift_core::payload::{parse_query_list, PayloadError};
use sift_core::GeneratedQuerySet;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::prompts::search_query_messages;
use crate::providers::{CompletionClient, CompletionError};

/// Why one generation attempt was discarded.
#[derive(Error, Debug)]
enum GenerationFailure {
    #[error(transparent)]
    Completion(#[from] CompletionError),

    #[error(transparent)]
    Payload(#[from] PayloadError),
}

/// Asks the model for alternative search queries.
///
/// Never fails: once every attempt is spent it falls back to the original
/// query verbatim.
pub struct QueryGenerator {
    client: Arc<dyn CompletionClient>,
    attempts: u32,
    retry_delay: Duration,
}

impl QueryGenerator {
    pub fn new(client: Arc<dyn CompletionClient>) -> Self {
        Self {
            client,
            attempts: 3,
            retry_delay: Duration::ZERO,
        }
    }

    /// Model calls made before falling back. At least one.
    pub fn with_attempts(mut self, attempts: u32) -> Self {
        self.attempts = attempts.max(1);
        self
    }

    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Generate queries for `original_query`.
    ///
    /// `previous` carries the queries and answer of the last unsatisfactory
    /// attempt so the model can aim at what that answer missed.
    pub async fn generate(
        &self,
        original_query: &str,
        fixed_count: Option<usize>,
        previous: Option<(&GeneratedQuerySet, &str)>,
    ) -> GeneratedQuerySet {
        let messages = search_query_messages(original_query, fixed_count, previous);
        let messages = &messages;
        let client = &self.client;

        let attempt = || async move {
            let completion = client.complete(messages.clone()).await?;
            let queries = parse_query_list(&completion.content, fixed_count)?;
            Ok::<_, GenerationFailure>(queries)
        };

        let backoff = ConstantBuilder::default()
            .with_delay(self.retry_delay)
            .with_max_times(self.attempts.saturating_sub(1) as usize);

        let result = attempt
            .retry(backoff)
            .sleep(tokio::time::sleep)
            .notify(|error: &GenerationFailure, delay: Duration| {
                tracing::debug!(error = %error, retry_in = ?delay, "Query generation attempt failed");
            })
            .await;

        match result {
            Ok(queries) => {
                tracing::debug!(queries = ?queries.as_slice(), "Generated search queries");
                queries
            }
            Err(error) => {
                tracing::debug!(
                    error = %error,
                    attempts = self.attempts,
                    "Falling back to the original query"
                );
                GeneratedQuerySet::fallback(original_query)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedClient;
    use proptest::prelude::*;

    fn generator(client: &Arc<ScriptedClient>) -> QueryGenerator {
        QueryGenerator::new(client.clone())
    }

    #[tokio::test]
    async fn test_valid_response() {
        let client = Arc::new(ScriptedClient::replies(&[r#"["paris capital", "capital of france"]"#]));
        let queries = generator(&client).generate("capital of France", None, None).await;

        assert_eq!(queries.as_slice(), &["paris capital", "capital of france"]);
        assert_eq!(client.calls(), 1);
    }

    #[tokio::test]
    async fn test_retries_until_valid() {
        let client = Arc::new(ScriptedClient::new(vec![
            Ok("not json".into()),
            Err(CompletionError::HttpError("reset".into())),
            Ok(r#"["a", "b", "c"]"#.into()),
        ]));
        let queries = generator(&client).generate("q", None, None).await;

        assert_eq!(queries.len(), 3);
        assert_eq!(client.calls(), 3);
    }

    #[tokio::test]
    async fn test_falls_back_after_attempts() {
        let client = Arc::new(ScriptedClient::replies(&["[]", r#"["one"]"#, "{}", r#"["x", "y"]"#]));
        let queries = generator(&client).generate("  original query ", None, None).await;

        assert_eq!(queries, GeneratedQuerySet::fallback("  original query "));
        assert_eq!(client.calls(), 3);
        assert_eq!(client.remaining(), 1);
    }

    #[tokio::test]
    async fn test_fixed_count_must_match() {
        let client = Arc::new(ScriptedClient::replies(&[r#"["a", "b"]"#, r#"["a", "b", "c"]"#]));
        let queries = generator(&client).generate("q", Some(3), None).await;

        assert_eq!(queries.as_slice(), &["a", "b", "c"]);
        assert_eq!(client.calls(), 2);
        assert!(client.requests()[0][1].content.ends_with("(Generate exactly 3 queries)"));
    }

    #[tokio::test]
    async fn test_single_attempt_floor() {
        let client = Arc::new(ScriptedClient::replies(&["nope", "nope"]));
        let queries = generator(&client).with_attempts(0).generate("q", None, None).await;

        assert_eq!(queries.len(), 1);
        assert_eq!(client.calls(), 1);
    }

    #[tokio::test]
    async fn test_previous_attempt_is_sent() {
        let client = Arc::new(ScriptedClient::replies(&[r#"["new a", "new b"]"#]));
        let previous = GeneratedQuerySet::fallback("old");
        generator(&client)
            .generate("q", None, Some((&previous, "old answer")))
            .await;

        let request = &client.requests()[0];
        assert_eq!(request.len(), 3);
        assert!(request[2].content.contains(r#"Previous queries: ["old"]"#));
        assert!(request[2].content.contains("Previous answer: old answer"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_delay_is_applied() {
        let client = Arc::new(ScriptedClient::replies(&["bad", r#"["a", "b"]"#]));
        let start = tokio::time::Instant::now();
        let queries = generator(&client)
            .with_retry_delay(Duration::from_secs(2))
            .generate("q", None, None)
            .await;

        assert_eq!(queries.len(), 2);
        assert!(start.elapsed() >= Duration::from_secs(2));
    }

    proptest! {
        #[test]
        fn prop_fixed_count_contract(count in 1usize..=5, reply_len in 0usize..8) {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .unwrap();

            let reply: Vec<String> = (0..reply_len).map(|i| format!("query {}", i)).collect();
            let reply = serde_json::to_string(&reply).unwrap();
            let client = Arc::new(ScriptedClient::replies(&[&reply, &reply, &reply]));

            let queries = runtime.block_on(generator(&client).generate("orig", Some(count), None));
            if reply_len == count {
                prop_assert_eq!(queries.len(), count);
            } else {
                prop_assert_eq!(queries, GeneratedQuerySet::fallback("orig"));
            }
        }
    }
}
