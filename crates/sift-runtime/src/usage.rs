//! Per-workflow LLM usage metering.
//!
//! The engine wraps its client in a [`MeteredClient`] for the duration of
//! one `answer` call, so token totals never leak between queries.

use async_trait::async_trait;
use parking_lot::RwLock;
use sift_core::LlmUsage;
use std::sync::Arc;

use crate::providers::{ChatMessage, Completion, CompletionClient, CompletionError, TokenUsage};

/// Fold one completion's token counts into `usage`.
pub fn record(usage: &mut LlmUsage, tokens: &TokenUsage) {
    usage.prompt_tokens = usage.prompt_tokens.saturating_add(tokens.prompt_tokens);
    usage.completion_tokens = usage.completion_tokens.saturating_add(tokens.completion_tokens);
    usage.total_tokens = usage.total_tokens.saturating_add(tokens.total());
}

/// A [`CompletionClient`] that counts calls and tokens passing through it.
pub struct MeteredClient {
    inner: Arc<dyn CompletionClient>,
    usage: RwLock<LlmUsage>,
}

impl MeteredClient {
    pub fn new(inner: Arc<dyn CompletionClient>) -> Self {
        Self {
            inner,
            usage: RwLock::new(LlmUsage::default()),
        }
    }

    /// Snapshot of the usage accumulated so far.
    pub fn usage(&self) -> LlmUsage {
        self.usage.read().clone()
    }
}

#[async_trait]
impl CompletionClient for MeteredClient {
    async fn complete(&self, messages: Vec<ChatMessage>) -> Result<Completion, CompletionError> {
        let result = self.inner.complete(messages).await;

        let mut usage = self.usage.write();
        usage.llm_calls = usage.llm_calls.saturating_add(1);
        match &result {
            Ok(completion) => record(&mut usage, &completion.usage),
            Err(_) => usage.failed_calls = usage.failed_calls.saturating_add(1),
        }

        result
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}
