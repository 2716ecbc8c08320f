//! In-memory doubles for the completion and search boundaries.

use async_trait::async_trait;
use parking_lot::Mutex;
use sift_core::SearchResult;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::providers::{ChatMessage, Completion, CompletionClient, CompletionError, TokenUsage};
use crate::search::{SearchError, SearchProvider};

/// Replays a fixed sequence of replies, one per call, and records every
/// request it receives. Calls past the end of the script fail.
pub(crate) struct ScriptedClient {
    script: Mutex<VecDeque<Result<String, CompletionError>>>,
    requests: Mutex<Vec<Vec<ChatMessage>>>,
}

impl ScriptedClient {
    pub const PROMPT_TOKENS: u32 = 10;
    pub const COMPLETION_TOKENS: u32 = 5;

    pub fn new(script: Vec<Result<String, CompletionError>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Script made only of successful replies.
    pub fn replies(replies: &[&str]) -> Self {
        Self::new(replies.iter().map(|r| Ok(r.to_string())).collect())
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().len()
    }

    pub fn requests(&self) -> Vec<Vec<ChatMessage>> {
        self.requests.lock().clone()
    }

    /// Replies not consumed yet.
    pub fn remaining(&self) -> usize {
        self.script.lock().len()
    }
}

#[async_trait]
impl CompletionClient for ScriptedClient {
    async fn complete(&self, messages: Vec<ChatMessage>) -> Result<Completion, CompletionError> {
        self.requests.lock().push(messages);

        let next = self
            .script
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(CompletionError::HttpError("script exhausted".into())));

        next.map(|content| Completion {
            content,
            usage: TokenUsage {
                prompt_tokens: Self::PROMPT_TOKENS,
                completion_tokens: Self::COMPLETION_TOKENS,
            },
            model: "scripted".into(),
        })
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// Canned search responses keyed by query. Unknown queries return no hits.
#[derive(Default)]
pub(crate) struct StaticSearch {
    responses: HashMap<String, Result<Vec<SearchResult>, SearchError>>,
    delays: HashMap<String, Duration>,
    calls: AtomicUsize,
    queries: Mutex<Vec<String>>,
}

impl StaticSearch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_results(mut self, query: &str, results: Vec<SearchResult>) -> Self {
        self.responses.insert(query.to_string(), Ok(results));
        self
    }

    pub fn with_error(mut self, query: &str, error: SearchError) -> Self {
        self.responses.insert(query.to_string(), Err(error));
        self
    }

    pub fn with_delay(mut self, query: &str, delay: Duration) -> Self {
        self.delays.insert(query.to_string(), delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().clone()
    }
}

#[async_trait]
impl SearchProvider for StaticSearch {
    async fn search(&self, query: &str) -> Result<Vec<SearchResult>, SearchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.queries.lock().push(query.to_string());

        if let Some(delay) = self.delays.get(query) {
            tokio::time::sleep(*delay).await;
        }

        self.responses
            .get(query)
            .cloned()
            .unwrap_or_else(|| Ok(Vec::new()))
    }

    fn name(&self) -> &str {
        "static"
    }
}
