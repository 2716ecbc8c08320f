//! The iterative generate, search, synthesize and evaluate loop.

use chrono::Utc;
use sift_core::{AttemptRecord, EvaluationMode, EvaluationResult, GeneratedQuerySet, WorkflowResult};
use std::sync::Arc;
use std::time::Duration;

use super::{AnswerSynthesizer, Evaluator, QueryGenerator};
use crate::config::Settings;
use crate::providers::CompletionClient;
use crate::search::SearchFanout;
use crate::usage::MeteredClient;

/// Reason reported when the loop stops because no answer could be written.
pub const SYNTHESIS_FAILURE_REASON: &str =
    "Unable to produce an answer from the gathered search results.";

/// Observer for attempts judged unsatisfactory.
pub trait ProgressSink: Send + Sync {
    fn on_unsatisfactory(&self, evaluation: &EvaluationResult, attempt: u32);
}

impl<F> ProgressSink for F
where
    F: Fn(&EvaluationResult, u32) + Send + Sync,
{
    fn on_unsatisfactory(&self, evaluation: &EvaluationResult, attempt: u32) {
        self(evaluation, attempt)
    }
}

/// Drives one query through up to `max_attempts` rounds.
///
/// Holds no per-query state. Every call to [`WorkflowEngine::answer`] owns
/// its history and its usage meter, so one engine can serve many queries
/// concurrently.
pub struct WorkflowEngine {
    client: Arc<dyn CompletionClient>,
    search: SearchFanout,
    max_attempts: u32,
    generation_attempts: u32,
    retry_delay: Duration,
    query_count: Option<usize>,
    mode: EvaluationMode,
}

impl WorkflowEngine {
    pub fn new(client: Arc<dyn CompletionClient>, search: SearchFanout) -> Self {
        Self {
            client,
            search,
            max_attempts: 3,
            generation_attempts: 3,
            retry_delay: Duration::ZERO,
            query_count: None,
            mode: EvaluationMode::default(),
        }
    }

    pub fn from_settings(client: Arc<dyn CompletionClient>, search: SearchFanout, settings: &Settings) -> Self {
        Self::new(client, search)
            .with_max_attempts(settings.max_attempts)
            .with_generation_attempts(settings.query_generation_attempts)
            .with_retry_delay(settings.generation_retry_delay)
            .with_mode(EvaluationMode::from_tolerant(settings.tolerant_evaluation))
    }

    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    pub fn with_generation_attempts(mut self, attempts: u32) -> Self {
        self.generation_attempts = attempts.max(1);
        self
    }

    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Ask the generator for exactly `count` queries on every attempt.
    pub fn with_query_count(mut self, count: usize) -> Self {
        self.query_count = Some(count);
        self
    }

    pub fn with_mode(mut self, mode: EvaluationMode) -> Self {
        self.mode = mode;
        self
    }

    /// Answer `query`, retrying with refined queries until an answer is
    /// judged satisfactory or the attempt budget runs out.
    ///
    /// `max_attempts` overrides the configured budget for this call only.
    /// Without a `progress` sink, unsatisfactory verdicts are logged.
    pub async fn answer(
        &self,
        query: &str,
        max_attempts: Option<u32>,
        progress: Option<&dyn ProgressSink>,
    ) -> WorkflowResult {
        let budget = max_attempts.unwrap_or(self.max_attempts).max(1);
        let metered = Arc::new(MeteredClient::new(self.client.clone()));

        let generator = QueryGenerator::new(metered.clone())
            .with_attempts(self.generation_attempts)
            .with_retry_delay(self.retry_delay);
        let synthesizer = AnswerSynthesizer::new(metered.clone());
        let evaluator = Evaluator::new(metered.clone());

        let mut history: Vec<String> = Vec::new();
        let mut records: Vec<AttemptRecord> = Vec::new();
        let mut previous: Option<(GeneratedQuerySet, String)> = None;
        let mut last_evaluation = EvaluationResult::default();

        for attempt in 1..=budget {
            tracing::debug!(attempt, budget, query = %query, "Starting attempt");

            let queries = generator
                .generate(
                    query,
                    self.query_count,
                    previous.as_ref().map(|(q, a)| (q, a.as_str())),
                )
                .await;

            let results = self.search.fetch(queries.as_slice()).await;
            if results.is_empty() {
                tracing::info!(attempt, "No search results, synthesizing anyway");
            }

            let Some(answer) = synthesizer.synthesize(query, &results).await else {
                tracing::warn!(attempt, "Stopping: no answer could be synthesized");
                return WorkflowResult {
                    answer: history.last().cloned().unwrap_or_default(),
                    evaluation: EvaluationResult::unsatisfactory(SYNTHESIS_FAILURE_REASON),
                    attempts: attempt,
                    answers_history: history,
                    records,
                    usage: metered.usage(),
                };
            };

            let evaluation = evaluator.evaluate(query, &answer, self.mode).await;
            history.push(answer.clone());
            records.push(AttemptRecord {
                attempt_index: attempt,
                queries_used: queries.clone(),
                answer: answer.clone(),
                evaluation: evaluation.clone(),
                finished_at: Utc::now(),
            });

            if evaluation.satisfactory {
                tracing::debug!(attempt, "Satisfactory answer found");
                return WorkflowResult {
                    answer,
                    evaluation,
                    attempts: attempt,
                    answers_history: history,
                    records,
                    usage: metered.usage(),
                };
            }

            match progress {
                Some(sink) => sink.on_unsatisfactory(&evaluation, attempt),
                None => tracing::info!(attempt, reason = %evaluation.reason, "Answer not satisfactory"),
            }

            last_evaluation = evaluation;
            previous = Some((queries, answer));
        }

        WorkflowResult {
            answer: history.last().cloned().unwrap_or_default(),
            evaluation: last_evaluation,
            attempts: budget,
            answers_history: history,
            records,
            usage: metered.usage(),
        }
    }
}
