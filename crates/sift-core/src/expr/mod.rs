//! Capability-scoped expression evaluation for the math fast path.
//!
//! The model is asked to reduce a calculation to one expression in a small
//! grammar: numbers, strings and booleans, arithmetic and comparison
//! operators, and a fixed set of pure functions. Nothing else is
//! reachable. No names, no assignment, no attribute access beyond the
//! listed string methods, no I/O.
//!
//! ```
//! use sift_core::expr::{ExpressionEvaluator, SandboxEvaluator};
//!
//! let value = SandboxEvaluator.execute("result = round(sqrt(2) * 10, 2)").unwrap();
//! assert_eq!(value.to_string(), "14.14");
//! ```

mod eval;
mod lexer;
mod parser;

use std::fmt;
use thiserror::Error;

use crate::text::strip_code_fence;

pub use parser::MAX_DEPTH;

/// Longest expression accepted, in characters.
pub const MAX_EXPRESSION_LEN: usize = 512;

/// Result of evaluating an expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Number(f64),
    Text(String),
    Bool(bool),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Number(_) => "number",
            Value::Text(_) => "string",
            Value::Bool(_) => "bool",
        }
    }

    pub(crate) fn truthy(&self) -> bool {
        match self {
            Value::Number(n) => *n != 0.0,
            Value::Text(s) => !s.is_empty(),
            Value::Bool(b) => *b,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            // Integral values print without a fractional part
            Value::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => write!(f, "{}", *n as i64),
            Value::Number(n) => write!(f, "{}", n),
            Value::Text(s) => f.write_str(s),
            Value::Bool(b) => write!(f, "{}", b),
        }
    }
}

/// Errors raised while lexing, parsing or evaluating an expression.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExprError {
    #[error("Empty expression")]
    Empty,

    #[error("Expression longer than {max} characters")]
    TooLong { max: usize },

    #[error("Expression nested deeper than {0} levels")]
    TooDeep(usize),

    #[error("Unexpected character '{found}' at position {position}")]
    UnexpectedChar { found: char, position: usize },

    #[error("Invalid number literal: {0}")]
    InvalidNumber(String),

    #[error("Unterminated string starting at position {position}")]
    UnterminatedString { position: usize },

    #[error("Unexpected token: {0}")]
    UnexpectedToken(String),

    #[error("Unexpected end of expression")]
    UnexpectedEnd,

    #[error("Unknown name: {0}")]
    UnknownName(String),

    #[error("Unknown function: {0}")]
    UnknownFunction(String),

    #[error("Unknown method on {receiver}: {name}")]
    UnknownMethod {
        receiver: &'static str,
        name: String,
    },

    #[error("{name}() expects {expected} argument(s), got {found}")]
    Arity {
        name: String,
        expected: &'static str,
        found: usize,
    },

    #[error("Type mismatch: {0}")]
    TypeMismatch(String),

    #[error("Division by zero")]
    DivisionByZero,

    #[error("Math domain error: {0}")]
    Domain(String),

    #[error("Numeric result out of range")]
    Overflow,
}

/// Evaluates a single expression to a [`Value`].
pub trait ExpressionEvaluator: Send + Sync {
    fn execute(&self, expression: &str) -> Result<Value, ExprError>;
}

/// The built-in evaluator over the restricted grammar.
#[derive(Debug, Clone, Copy, Default)]
pub struct SandboxEvaluator;

impl ExpressionEvaluator for SandboxEvaluator {
    fn execute(&self, expression: &str) -> Result<Value, ExprError> {
        let source = peel_wrappers(expression);
        if source.is_empty() {
            return Err(ExprError::Empty);
        }
        if source.chars().count() > MAX_EXPRESSION_LEN {
            return Err(ExprError::TooLong {
                max: MAX_EXPRESSION_LEN,
            });
        }

        let tokens = lexer::tokenize(source)?;
        let ast = parser::parse(&tokens)?;
        eval::evaluate(&ast)
    }
}

/// Strip the decorations models put around an expression: a code fence,
/// a `result =` assignment, an `eval("...")` call and trailing semicolons.
fn peel_wrappers(input: &str) -> &str {
    let mut current = input.trim();
    loop {
        let before = current;

        current = strip_code_fence(current);
        current = current.trim_end_matches(';').trim_end();

        if let Some(rest) = current.strip_prefix("result") {
            let rest = rest.trim_start();
            if let Some(value) = rest.strip_prefix('=') {
                if !value.starts_with('=') {
                    current = value.trim();
                }
            }
        }

        if let Some(inner) = current
            .strip_prefix("eval(")
            .and_then(|rest| rest.strip_suffix(')'))
        {
            let inner = inner.trim();
            let unquoted = inner
                .strip_prefix('"')
                .and_then(|s| s.strip_suffix('"'))
                .or_else(|| inner.strip_prefix('\'').and_then(|s| s.strip_suffix('\'')));
            if let Some(body) = unquoted {
                current = body.trim();
            }
        }

        if current == before {
            return current;
        }
    }
}
