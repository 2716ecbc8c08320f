//! Validation of structured model output.
//!
//! The completion model is asked for JSON in two places: the list of
//! alternative search queries and the self-evaluation verdict. Both payloads
//! are checked against an embedded JSON Schema before they are trusted.

use std::sync::OnceLock;

use serde_json::Value;
use thiserror::Error;

use crate::text::strip_code_fence;
use crate::types::{EvaluationResult, GeneratedQuerySet, QueryKind};

const QUERY_LIST_SCHEMA_JSON: &str = r#"{
  "type": "array",
  "items": { "type": "string" }
}"#;

const EVALUATION_SCHEMA_JSON: &str = r#"{
  "type": "object",
  "properties": {
    "satisfactory": { "type": ["boolean", "string"] },
    "reason": { "type": ["string", "null"] }
  }
}"#;

static QUERY_LIST_SCHEMA: OnceLock<Result<jsonschema::Validator, String>> = OnceLock::new();
static EVALUATION_SCHEMA: OnceLock<Result<jsonschema::Validator, String>> = OnceLock::new();

/// Errors from payload validation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PayloadError {
    #[error("Payload is not valid JSON: {0}")]
    InvalidJson(String),

    #[error("Payload does not match schema: {0}")]
    SchemaMismatch(String),

    #[error("Expected exactly {expected} queries, got {actual}")]
    WrongCount { expected: usize, actual: usize },

    #[error("Expected at least {minimum} queries, got {actual}")]
    TooFewQueries { minimum: usize, actual: usize },

    #[error("Failed to load schema: {0}")]
    SchemaLoad(String),
}

fn compiled(
    cell: &'static OnceLock<Result<jsonschema::Validator, String>>,
    source: &'static str,
) -> Result<&'static jsonschema::Validator, PayloadError> {
    let result = cell.get_or_init(|| {
        let schema_value: Value = match serde_json::from_str(source) {
            Ok(v) => v,
            Err(e) => return Err(format!("Invalid schema JSON: {}", e)),
        };

        match jsonschema::options().build(&schema_value) {
            Ok(v) => Ok(v),
            Err(e) => Err(format!("Failed to compile schema: {}", e)),
        }
    });

    match result {
        Ok(v) => Ok(v),
        Err(e) => Err(PayloadError::SchemaLoad(e.clone())),
    }
}

fn validate(
    value: &Value,
    cell: &'static OnceLock<Result<jsonschema::Validator, String>>,
    source: &'static str,
) -> Result<(), PayloadError> {
    let validator = compiled(cell, source)?;
    let errors: Vec<String> = validator
        .iter_errors(value)
        .map(|e| format!("{} at {}", e, e.instance_path))
        .collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(PayloadError::SchemaMismatch(errors.join("; ")))
    }
}

fn parse_json(content: &str) -> Result<Value, PayloadError> {
    serde_json::from_str(strip_code_fence(content))
        .map_err(|e| PayloadError::InvalidJson(e.to_string()))
}

/// Trim entries, drop blanks and repeats, keep first-seen order.
fn normalize_queries(raw: Vec<String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    raw.into_iter()
        .map(|q| q.trim().to_string())
        .filter(|q| !q.is_empty())
        .filter(|q| seen.insert(q.clone()))
        .collect()
}

/// Validate a model response that should hold a JSON array of queries.
///
/// With `fixed_count` the normalized list must have exactly that length;
/// otherwise it needs at least [`GeneratedQuerySet::MIN_QUERIES`] entries and
/// is cut to [`GeneratedQuerySet::MAX_QUERIES`].
pub fn parse_query_list(
    content: &str,
    fixed_count: Option<usize>,
) -> Result<GeneratedQuerySet, PayloadError> {
    let value = parse_json(content)?;
    validate(&value, &QUERY_LIST_SCHEMA, QUERY_LIST_SCHEMA_JSON)?;

    let raw: Vec<String> = serde_json::from_value(value)
        .map_err(|e| PayloadError::SchemaMismatch(e.to_string()))?;
    let mut queries = normalize_queries(raw);

    match fixed_count {
        Some(expected) => {
            if queries.len() != expected || expected > GeneratedQuerySet::MAX_QUERIES {
                return Err(PayloadError::WrongCount {
                    expected,
                    actual: queries.len(),
                });
            }
        }
        None => {
            if queries.len() < GeneratedQuerySet::MIN_QUERIES {
                return Err(PayloadError::TooFewQueries {
                    minimum: GeneratedQuerySet::MIN_QUERIES,
                    actual: queries.len(),
                });
            }
            queries.truncate(GeneratedQuerySet::MAX_QUERIES);
        }
    }

    Ok(GeneratedQuerySet::from_validated(queries))
}

/// Validate a self-evaluation payload `{"satisfactory": ..., "reason": ...}`.
///
/// `satisfactory` may be a boolean or the strings `"true"`/`"false"`; any
/// other string counts as false. A missing reason becomes empty.
pub fn parse_evaluation(content: &str) -> Result<EvaluationResult, PayloadError> {
    let value = parse_json(content)?;
    validate(&value, &EVALUATION_SCHEMA, EVALUATION_SCHEMA_JSON)?;

    let satisfactory = match value.get("satisfactory") {
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => s.trim().eq_ignore_ascii_case("true"),
        _ => false,
    };
    let reason = value
        .get("reason")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    Ok(EvaluationResult {
        satisfactory,
        reason,
    })
}

/// Map a classifier reply onto a [`QueryKind`].
///
/// The reply is expected to be a single word. Anything unrecognised routes
/// to [`QueryKind::Realtime`], the category the classifier prompt names as
/// the default under doubt.
pub fn parse_query_kind(content: &str) -> QueryKind {
    let word: String = content
        .trim()
        .to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .collect();

    match word.trim() {
        "math" => QueryKind::Math,
        "simple" => QueryKind::Simple,
        _ => QueryKind::Realtime,
    }
}
