//! # sift-runtime
//!
//! The networked half of Sift: the Groq completion client, the Google
//! search scraper and the workflow that drives them.
//!
//! `sift-core` holds everything deterministic (data model, payload
//! validation, the expression sandbox). This crate adds the model calls
//! and the retry loop around them.
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use sift_runtime::{GoogleScraper, GroqClient, SearchFanout, Settings, WorkflowEngine};
//!
//! let settings = Settings::load(None)?;
//! let client = Arc::new(GroqClient::new(settings.require_api_key()?.clone(), settings.completion_config())?);
//! let search = SearchFanout::from_settings(Arc::new(GoogleScraper::from_settings(&settings)?), &settings);
//!
//! let engine = WorkflowEngine::from_settings(client, search, &settings);
//! let result = engine.answer("What is the capital of France?", None, None).await;
//! println!("{} ({} attempts)", result.answer, result.attempts);
//! ```

pub mod config;
pub mod dispatch;
pub mod prompts;
pub mod providers;
pub mod search;
pub mod usage;
pub mod workflow;

#[cfg(test)]
pub(crate) mod testing;

pub use config::{ConfigError, Settings, SettingsOverrides};
pub use dispatch::{Dispatch, DispatchKind, QueryClassifier, QueryDispatcher};
pub use providers::{
    ApiCredential, ChatMessage, Completion, CompletionClient, CompletionConfig, CompletionError,
    GroqClient, TokenUsage,
};
pub use search::{GoogleScraper, SearchError, SearchFanout, SearchProvider};
pub use usage::MeteredClient;
pub use workflow::{
    AnswerSynthesizer, BestAnswerSelector, Evaluator, ProgressSink, QueryGenerator, WorkflowEngine,
};
