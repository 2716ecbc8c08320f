use sift_core::payload::parse_evaluation;
use sift_core::{EvaluationMode, EvaluationResult};
use std::sync::Arc;

use crate::prompts::evaluation_messages;
use crate::providers::CompletionClient;

/// Reason recorded when the verdict could not be obtained at all.
pub const EVALUATION_UNAVAILABLE: &str = "Unable to evaluate the answer";

/// Asks the model whether an answer satisfies the question.
///
/// Any failure counts as unsatisfactory so the workflow keeps trying.
pub struct Evaluator {
    client: Arc<dyn CompletionClient>,
}

impl Evaluator {
    pub fn new(client: Arc<dyn CompletionClient>) -> Self {
        Self { client }
    }

    pub async fn evaluate(&self, query: &str, answer: &str, mode: EvaluationMode) -> EvaluationResult {
        let messages = evaluation_messages(query, answer, mode);

        let completion = match self.client.complete(messages).await {
            Ok(c) => c,
            Err(e) => {
                tracing::warn!(error = %e, "Evaluation call failed");
                return EvaluationResult::unsatisfactory(format!("{}: {}", EVALUATION_UNAVAILABLE, e));
            }
        };

        match parse_evaluation(&completion.content) {
            Ok(verdict) => {
                tracing::debug!(
                    satisfactory = verdict.satisfactory,
                    mode = ?mode,
                    reason = %verdict.reason,
                    "Answer evaluated"
                );
                verdict
            }
            Err(e) => {
                tracing::warn!(error = %e, "Evaluation reply was not a valid verdict");
                EvaluationResult::unsatisfactory(EVALUATION_UNAVAILABLE)
            }
        }
    }
}
