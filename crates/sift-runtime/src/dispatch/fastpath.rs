//! Answers that skip the search workflow.

use sift_core::{ExpressionEvaluator, SandboxEvaluator};
use std::sync::Arc;

use crate::prompts::{math_expression_messages, simple_answer_messages};
use crate::providers::CompletionClient;

/// One direct completion for questions answerable from general knowledge.
pub struct SimpleResponder {
    client: Arc<dyn CompletionClient>,
}

impl SimpleResponder {
    pub fn new(client: Arc<dyn CompletionClient>) -> Self {
        Self { client }
    }

    /// `None` tells the caller to fall back to searching.
    pub async fn answer(&self, query: &str) -> Option<String> {
        match self.client.complete(simple_answer_messages(query)).await {
            Ok(completion) => {
                let text = completion.content.trim();
                (!text.is_empty()).then(|| text.to_string())
            }
            Err(e) => {
                tracing::warn!(error = %e, "Direct answer failed");
                None
            }
        }
    }
}

/// Has the model reduce a question to one expression, then evaluates it
/// locally in the sandbox.
pub struct MathSolver {
    client: Arc<dyn CompletionClient>,
    evaluator: Arc<dyn ExpressionEvaluator>,
}

impl MathSolver {
    pub fn new(client: Arc<dyn CompletionClient>) -> Self {
        Self {
            client,
            evaluator: Arc::new(SandboxEvaluator),
        }
    }

    pub fn with_evaluator(mut self, evaluator: Arc<dyn ExpressionEvaluator>) -> Self {
        self.evaluator = evaluator;
        self
    }

    /// Always produces displayable text; failures become a message.
    pub async fn solve(&self, query: &str) -> String {
        let expression = match self.client.complete(math_expression_messages(query)).await {
            Ok(completion) => completion.content,
            Err(e) => return format!("Unable to generate math solution: {}", e),
        };

        let expression = expression.trim();
        if expression.is_empty() {
            return "Unable to retrieve the math solution.".to_string();
        }

        tracing::debug!(expression = %expression, "Evaluating math expression");
        match self.evaluator.execute(expression) {
            Ok(value) => value.to_string(),
            Err(e) => {
                tracing::warn!(expression = %expression, error = %e, "Expression rejected");
                format!("Error while evaluating the expression: {}", e)
            }
        }
    }
}
