//! Core types for the Sift workflow.
//!
//! Everything here is created fresh for one top-level query and dropped
//! once its [`WorkflowResult`] is returned.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A single search hit produced by a search provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    /// Page title
    pub title: String,

    /// Target URL
    pub link: String,

    /// Snippet shown on the result page
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Text extracted from the target page
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

impl SearchResult {
    pub fn new(title: impl Into<String>, link: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            link: link.into(),
            description: None,
            content: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    /// Whether the result carries any text worth synthesizing from.
    pub fn has_text(&self) -> bool {
        let present = |s: &Option<String>| s.as_deref().is_some_and(|v| !v.trim().is_empty());
        present(&self.description) || present(&self.content)
    }
}

/// Verdict returned by the evaluator for one candidate answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct EvaluationResult {
    pub satisfactory: bool,

    /// Explanation for the verdict. May be empty.
    #[serde(default)]
    pub reason: String,
}

impl EvaluationResult {
    pub fn satisfactory(reason: impl Into<String>) -> Self {
        Self {
            satisfactory: true,
            reason: reason.into(),
        }
    }

    pub fn unsatisfactory(reason: impl Into<String>) -> Self {
        Self {
            satisfactory: false,
            reason: reason.into(),
        }
    }
}

/// An ordered set of 1 to 5 distinct, non-empty search queries.
///
/// Only the fallback path produces a single-element set; validated model
/// output always has at least two entries unless an exact count was asked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GeneratedQuerySet(Vec<String>);

impl GeneratedQuerySet {
    /// Largest set the generator will ever return.
    pub const MAX_QUERIES: usize = 5;

    /// Minimum size for a free-count model response.
    pub const MIN_QUERIES: usize = 2;

    /// The fallback set: the original query, verbatim.
    pub fn fallback(original_query: &str) -> Self {
        Self(vec![original_query.to_string()])
    }

    /// Build from already-validated queries.
    pub(crate) fn from_validated(queries: Vec<String>) -> Self {
        Self(queries)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &String> {
        self.0.iter()
    }

    pub fn into_vec(self) -> Vec<String> {
        self.0
    }
}

impl<'a> IntoIterator for &'a GeneratedQuerySet {
    type Item = &'a String;
    type IntoIter = std::slice::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// One completed pass through generate → search → synthesize → evaluate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttemptRecord {
    /// 1-based attempt number
    pub attempt_index: u32,

    pub queries_used: GeneratedQuerySet,

    pub answer: String,

    pub evaluation: EvaluationResult,

    pub finished_at: DateTime<Utc>,
}

/// Token and call accounting for one workflow.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LlmUsage {
    /// Total tokens used
    pub total_tokens: u32,

    /// Prompt/input tokens
    pub prompt_tokens: u32,

    /// Completion/output tokens
    pub completion_tokens: u32,

    /// Number of completion calls made, failed ones included
    pub llm_calls: u32,

    /// Number of completion calls that returned an error
    pub failed_calls: u32,
}

/// Final outcome of a workflow run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowResult {
    /// The answer to surface. Empty when no answer was ever produced.
    pub answer: String,

    /// Evaluation of the last attempt
    pub evaluation: EvaluationResult,

    /// Attempts started, never above the configured budget
    pub attempts: u32,

    /// Every synthesized answer, in attempt order
    pub answers_history: Vec<String>,

    /// Per-attempt audit trail, parallel to `answers_history`
    #[serde(default)]
    pub records: Vec<AttemptRecord>,

    #[serde(default)]
    pub usage: LlmUsage,
}

/// Route chosen by the query classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryKind {
    /// Answerable from general knowledge with one completion
    Simple,
    /// Needs fresh information: run the full search workflow
    Realtime,
    /// Needs a calculation
    Math,
}

impl QueryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryKind::Simple => "simple",
            QueryKind::Realtime => "realtime",
            QueryKind::Math => "math",
        }
    }
}

impl fmt::Display for QueryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How lenient the evaluator prompt is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvaluationMode {
    /// Used by the interactive entry points
    #[default]
    Strict,
    /// Accepts answers that are close to the intent
    Tolerant,
}

impl EvaluationMode {
    pub fn from_tolerant(tolerant: bool) -> Self {
        if tolerant {
            EvaluationMode::Tolerant
        } else {
            EvaluationMode::Strict
        }
    }
}
