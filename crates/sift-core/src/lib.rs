//! # sift-core
//!
//! Deterministic building blocks of the Sift answering workflow.
//!
//! This crate holds everything that does not need the network:
//! - The data model shared by every stage (search results, query sets,
//!   evaluation verdicts, workflow results)
//! - Validation of the JSON the completion model returns
//! - Text helpers for truncation, titles and code-fence stripping
//! - The restricted expression evaluator behind the math fast path
//!
//! ## Key Guarantees
//!
//! 1. **No I/O**: Nothing in this crate touches the network or the filesystem
//! 2. **No async**: Every function returns synchronously
//! 3. **Total parsing**: Malformed model output becomes an error value, never a panic
//!
//! ## Example
//!
//! ```rust
//! use sift_core::payload::parse_query_list;
//!
//! let queries = parse_query_list("```json\n[\"rust async\", \"tokio tutorial\"]\n```", None).unwrap();
//! assert_eq!(queries.len(), 2);
//! ```

pub mod expr;
pub mod payload;
pub mod text;
pub mod types;

// Re-export main types at crate root
pub use expr::{ExprError, ExpressionEvaluator, SandboxEvaluator, Value};
pub use payload::PayloadError;
pub use types::{
    AttemptRecord, EvaluationMode, EvaluationResult, GeneratedQuerySet, LlmUsage, QueryKind,
    SearchResult, WorkflowResult,
};
