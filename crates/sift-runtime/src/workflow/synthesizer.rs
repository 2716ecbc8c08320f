use sift_core::SearchResult;
use std::sync::Arc;

use crate::prompts::answer_synthesis_messages;
use crate::providers::CompletionClient;

/// Writes an answer grounded in the gathered search results.
pub struct AnswerSynthesizer {
    client: Arc<dyn CompletionClient>,
}

impl AnswerSynthesizer {
    pub fn new(client: Arc<dyn CompletionClient>) -> Self {
        Self { client }
    }

    /// Returns the trimmed answer, or `None` when the call fails or the
    /// reply is blank. An empty result list is still sent to the model,
    /// which is told to admit it lacks information.
    pub async fn synthesize(&self, query: &str, results: &[SearchResult]) -> Option<String> {
        let messages = answer_synthesis_messages(query, results);

        match self.client.complete(messages).await {
            Ok(completion) => {
                let answer = completion.content.trim();
                if answer.is_empty() {
                    tracing::warn!("Answer synthesis returned an empty reply");
                    None
                } else {
                    Some(answer.to_string())
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, results = results.len(), "Answer synthesis failed");
                None
            }
        }
    }
}
