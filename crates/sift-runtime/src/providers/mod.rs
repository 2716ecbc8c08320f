//! Completion provider abstractions for sift-runtime.
//!
//! Every model call in the workflow goes through [`CompletionClient`]. The
//! production implementation is [`GroqClient`], which speaks the
//! OpenAI-compatible chat-completions wire format.
//!
//! ## Security
//!
//! API keys are held in [`ApiCredential`] and only exposed when the
//! `Authorization` header is built.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

mod groq;
pub mod secrets;

pub use groq::{GroqClient, DEFAULT_BASE_URL, DEFAULT_MODEL};
pub use secrets::{ApiCredential, CredentialSource, GROQ_API_ENV, GROQ_API_KEY_ENV};

/// Errors from completion providers.
#[derive(Error, Debug)]
pub enum CompletionError {
    #[error("Groq API request failed: {0}")]
    HttpError(String),

    #[error("Rate limit exceeded, retry after {retry_after:?}")]
    RateLimited { retry_after: Option<Duration> },

    #[error("Groq API HTTP {status}: {message}")]
    ApiError { status: u16, message: String },

    #[error("Groq API response was not valid JSON: {0}")]
    ParseError(String),

    #[error("Unexpected Groq API response: {0}")]
    MissingContent(String),

    #[error("Timeout after {0:?}")]
    Timeout(Duration),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),
}

/// Request parameters applied to every completion a client makes.
#[derive(Debug, Clone)]
pub struct CompletionConfig {
    /// Model to use
    pub model: String,

    /// Maximum tokens to generate
    pub max_tokens: u32,

    /// Sampling temperature
    pub temperature: f32,

    /// Request timeout
    pub timeout: Duration,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            max_tokens: 1024,
            temperature: 0.5,
            timeout: Duration::from_secs(10),
        }
    }
}

/// A chat message for LLM completion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Role: "system", "user", or "assistant"
    pub role: String,

    /// Message content
    pub content: String,
}

impl ChatMessage {
    /// Create a system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    /// Create a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Response from a completion call.
#[derive(Debug, Clone)]
pub struct Completion {
    /// Generated content
    pub content: String,

    /// Token usage
    pub usage: TokenUsage,

    /// Model that served the request
    pub model: String,
}

/// Token usage from a completion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TokenUsage {
    /// Tokens in the prompt
    pub prompt_tokens: u32,

    /// Tokens in the completion
    pub completion_tokens: u32,
}

impl TokenUsage {
    /// Total tokens used.
    pub fn total(&self) -> u32 {
        self.prompt_tokens.saturating_add(self.completion_tokens)
    }
}

/// Provider abstraction allows swapping completion backends.
///
/// Implementations must be safe to call from several in-flight futures at
/// once; the engine never does so within one workflow, but the HTTP server
/// runs many workflows against the same client.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Execute a chat completion.
    async fn complete(&self, messages: Vec<ChatMessage>) -> Result<Completion, CompletionError>;

    /// Provider name for logs.
    fn name(&self) -> &str;
}
