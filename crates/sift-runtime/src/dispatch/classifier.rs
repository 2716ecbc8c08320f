use sift_core::payload::parse_query_kind;
use sift_core::QueryKind;
use std::sync::Arc;

use crate::prompts::query_type_messages;
use crate::providers::CompletionClient;

/// Routes a query to the direct, math or search path.
pub struct QueryClassifier {
    client: Arc<dyn CompletionClient>,
}

impl QueryClassifier {
    pub fn new(client: Arc<dyn CompletionClient>) -> Self {
        Self { client }
    }

    /// A failed call or an empty reply counts as [`QueryKind::Simple`].
    pub async fn classify(&self, query: &str) -> QueryKind {
        let kind = match self.client.complete(query_type_messages(query)).await {
            Ok(completion) if completion.content.trim().is_empty() => QueryKind::Simple,
            Ok(completion) => parse_query_kind(&completion.content),
            Err(e) => {
                tracing::warn!(error = %e, "Query classification failed");
                QueryKind::Simple
            }
        };

        tracing::debug!(kind = %kind, "Query classified");
        kind
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::CompletionError;
    use crate::testing::ScriptedClient;

    #[tokio::test]
    async fn test_classify_replies() {
        let client = Arc::new(ScriptedClient::replies(&["math", "Realtime.", "simple", "hmm, news?"]));
        let classifier = QueryClassifier::new(client.clone());

        assert_eq!(classifier.classify("2+2").await, QueryKind::Math);
        assert_eq!(classifier.classify("weather").await, QueryKind::Realtime);
        assert_eq!(classifier.classify("who wrote hamlet").await, QueryKind::Simple);
        assert_eq!(classifier.classify("latest").await, QueryKind::Realtime);
        assert_eq!(client.requests()[0][1].content, "Query: 2+2");
    }

    #[tokio::test]
    async fn test_failure_or_blank_is_simple() {
        let client = Arc::new(ScriptedClient::new(vec![
            Err(CompletionError::HttpError("down".into())),
            Ok("  \n".into()),
        ]));
        let classifier = QueryClassifier::new(client);

        assert_eq!(classifier.classify("q").await, QueryKind::Simple);
        assert_eq!(classifier.classify("q").await, QueryKind::Simple);
    }
}
