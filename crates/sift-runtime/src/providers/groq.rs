//! Groq chat-completions provider.
//!
//! Groq exposes the OpenAI wire format, so this client works against any
//! compatible endpoint by changing the base URL.

use super::{
    secrets::ApiCredential, ChatMessage, Completion, CompletionClient, CompletionConfig,
    CompletionError, TokenUsage,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::time::Duration;

/// Groq's OpenAI-compatible API root.
pub const DEFAULT_BASE_URL: &str = "https://api.groq.com/openai/v1";

/// Model used when none is configured.
pub const DEFAULT_MODEL: &str = "llama-3.3-70b-versatile";

/// Groq completion client.
///
/// The API key is stored in an [`ApiCredential`] and only exposed while the
/// request headers are built.
pub struct GroqClient {
    credential: ApiCredential,
    base_url: String,
    config: CompletionConfig,
    http: reqwest::Client,
}

impl std::fmt::Debug for GroqClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GroqClient")
            .field("credential", &self.credential)
            .field("base_url", &self.base_url)
            .field("model", &self.config.model)
            .finish()
    }
}

impl GroqClient {
    /// Create a client for the default Groq endpoint.
    pub fn new(credential: ApiCredential, config: CompletionConfig) -> Result<Self, CompletionError> {
        if credential.is_empty() {
            return Err(CompletionError::NotConfigured(format!(
                "{} is empty",
                credential.name()
            )));
        }

        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| CompletionError::HttpError(e.to_string()))?;

        Ok(Self {
            credential,
            base_url: DEFAULT_BASE_URL.to_string(),
            config,
            http,
        })
    }

    /// Set custom base URL.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn config(&self) -> &CompletionConfig {
        &self.config
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

/// Chat-completions request body.
#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    max_tokens: u32,
    top_p: f32,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
}

/// Turn a successful response body into a [`Completion`].
pub(crate) fn parse_completion(body: &str, requested_model: &str) -> Result<Completion, CompletionError> {
    let raw: JsonValue =
        serde_json::from_str(body).map_err(|e| CompletionError::ParseError(e.to_string()))?;

    if raw.get("choices").is_none() {
        return Err(CompletionError::MissingContent(raw.to_string()));
    }

    let response: ChatResponse =
        serde_json::from_value(raw).map_err(|e| CompletionError::ParseError(e.to_string()))?;

    let content = response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .ok_or_else(|| CompletionError::MissingContent("no message content in choices".into()))?;

    let usage = response
        .usage
        .map(|u| TokenUsage {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
        })
        .unwrap_or_default();

    Ok(Completion {
        content,
        usage,
        model: response.model.unwrap_or_else(|| requested_model.to_string()),
    })
}

/// Pull the most useful detail out of an error body.
///
/// `{"error": {"message": "..."}}` yields the message; any other JSON
/// yields its `error` field or the whole payload; non-JSON yields the text.
pub(crate) fn error_detail(body: &str) -> String {
    let Ok(payload) = serde_json::from_str::<JsonValue>(body) else {
        return body.trim().to_string();
    };

    match payload.get("error") {
        Some(JsonValue::Object(error)) => match error.get("message") {
            Some(JsonValue::String(message)) => message.clone(),
            _ => JsonValue::Object(error.clone()).to_string(),
        },
        Some(JsonValue::String(error)) if !error.is_empty() => error.clone(),
        Some(JsonValue::Null) | None => payload.to_string(),
        Some(other) => other.to_string(),
    }
}

#[async_trait]
impl CompletionClient for GroqClient {
    async fn complete(&self, messages: Vec<ChatMessage>) -> Result<Completion, CompletionError> {
        let request = ChatRequest {
            model: &self.config.model,
            messages: &messages,
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
            top_p: 1.0,
            stream: false,
        };

        tracing::debug!(model = %self.config.model, messages = messages.len(), "Groq chat request");

        // SECURITY: Only expose the credential here, at the point of use
        let response = self
            .http
            .post(self.endpoint())
            .bearer_auth(self.credential.expose())
            .timeout(self.config.timeout)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    CompletionError::Timeout(self.config.timeout)
                } else {
                    CompletionError::HttpError(e.to_string())
                }
            })?;

        let status = response.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .map(Duration::from_secs);
            return Err(CompletionError::RateLimited { retry_after });
        }

        let body = response.text().await.map_err(|e| {
            if e.is_timeout() {
                CompletionError::Timeout(self.config.timeout)
            } else {
                CompletionError::HttpError(e.to_string())
            }
        })?;

        if !status.is_success() {
            return Err(CompletionError::ApiError {
                status: status.as_u16(),
                message: error_detail(&body),
            });
        }

        parse_completion(&body, &self.config.model)
    }

    fn name(&self) -> &str {
        "groq"
    }
}
