//! Query routing for the HTTP entry point.
//!
//! A classifier picks one of three paths. Simple questions get a direct
//! answer, calculations go through the expression sandbox, and everything
//! else runs the full search workflow in tolerant mode. When the workflow
//! ends unsatisfied the best of its candidate answers is substituted.

use serde::{Deserialize, Serialize};
use sift_core::{EvaluationMode, QueryKind};
use std::sync::Arc;

mod classifier;
mod fastpath;

pub use classifier::QueryClassifier;
pub use fastpath::{MathSolver, SimpleResponder};

use crate::providers::CompletionClient;
use crate::workflow::{BestAnswerSelector, WorkflowEngine};

/// Which path produced a [`Dispatch`] response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DispatchKind {
    Text,
    Math,
    Search,
}

/// A routed answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dispatch {
    pub response: String,
    #[serde(rename = "type")]
    pub kind: DispatchKind,
}

pub struct QueryDispatcher {
    classifier: QueryClassifier,
    simple: SimpleResponder,
    math: MathSolver,
    engine: WorkflowEngine,
    selector: BestAnswerSelector,
}

impl QueryDispatcher {
    /// The engine is switched to tolerant evaluation.
    pub fn new(client: Arc<dyn CompletionClient>, engine: WorkflowEngine) -> Self {
        Self {
            classifier: QueryClassifier::new(client.clone()),
            simple: SimpleResponder::new(client.clone()),
            math: MathSolver::new(client.clone()),
            engine: engine.with_mode(EvaluationMode::Tolerant),
            selector: BestAnswerSelector::new(client),
        }
    }

    pub async fn dispatch(&self, query: &str, max_attempts: Option<u32>) -> Dispatch {
        match self.classifier.classify(query).await {
            QueryKind::Math => {
                return Dispatch {
                    response: self.math.solve(query).await,
                    kind: DispatchKind::Math,
                };
            }
            QueryKind::Simple => {
                if let Some(response) = self.simple.answer(query).await {
                    return Dispatch {
                        response,
                        kind: DispatchKind::Text,
                    };
                }
                tracing::info!("Direct answer unavailable, falling back to search");
            }
            QueryKind::Realtime => {}
        }

        Dispatch {
            response: self.search(query, max_attempts).await,
            kind: DispatchKind::Search,
        }
    }

    async fn search(&self, query: &str, max_attempts: Option<u32>) -> String {
        let result = self.engine.answer(query, max_attempts, None).await;
        tracing::info!(
            attempts = result.attempts,
            satisfactory = result.evaluation.satisfactory,
            llm_calls = result.usage.llm_calls,
            total_tokens = result.usage.total_tokens,
            "Search workflow finished"
        );

        if result.evaluation.satisfactory || result.answers_history.is_empty() {
            return result.answer;
        }

        match self.selector.select(query, &result.answers_history).await {
            Some(best) => best,
            None => result.answer,
        }
    }
}
