use std::sync::Arc;

use crate::prompts::best_answer_messages;
use crate::providers::CompletionClient;

/// Picks the strongest of several candidate answers after the workflow has
/// run out of attempts without a satisfactory one.
pub struct BestAnswerSelector {
    client: Arc<dyn CompletionClient>,
}

impl BestAnswerSelector {
    pub fn new(client: Arc<dyn CompletionClient>) -> Self {
        Self { client }
    }

    /// `None` when there is nothing to choose from or the model gives no
    /// usable reply. With no candidates the model is not called.
    pub async fn select(&self, query: &str, answers: &[String]) -> Option<String> {
        if answers.is_empty() {
            return None;
        }

        match self.client.complete(best_answer_messages(query, answers)).await {
            Ok(completion) => {
                let chosen = completion.content.trim();
                (!chosen.is_empty()).then(|| chosen.to_string())
            }
            Err(e) => {
                tracing::warn!(error = %e, candidates = answers.len(), "Best-answer selection failed");
                None
            }
        }
    }
}
