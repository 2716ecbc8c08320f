//! The search-and-answer workflow.
//!
//! Each stage wraps one model call and degrades instead of failing:
//!
//! - [`QueryGenerator`] retries, then falls back to the original query.
//! - [`AnswerSynthesizer`] and [`BestAnswerSelector`] return `None`.
//! - [`Evaluator`] reports an unsatisfactory verdict.
//!
//! [`WorkflowEngine`] composes them into the retry loop.

mod engine;
mod evaluator;
mod generator;
mod selector;
mod synthesizer;

pub use engine::{ProgressSink, WorkflowEngine, SYNTHESIS_FAILURE_REASON};
pub use evaluator::{Evaluator, EVALUATION_UNAVAILABLE};
pub use generator::QueryGenerator;
pub use selector::BestAnswerSelector;
pub use synthesizer::AnswerSynthesizer;
