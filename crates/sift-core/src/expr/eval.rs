//! Tree-walking evaluation of a parsed expression.

use super::parser::{BinaryOp, Expr, UnaryOp};
use super::{ExprError, Value};

pub fn evaluate(expr: &Expr) -> Result<Value, ExprError> {
    match expr {
        Expr::Number(n) => Ok(Value::Number(*n)),
        Expr::Str(s) => Ok(Value::Text(s.clone())),
        Expr::Bool(b) => Ok(Value::Bool(*b)),
        Expr::Unary(op, operand) => unary(*op, evaluate(operand)?),
        Expr::Binary(BinaryOp::And, left, right) => {
            let left = evaluate(left)?;
            if left.truthy() {
                evaluate(right)
            } else {
                Ok(left)
            }
        }
        Expr::Binary(BinaryOp::Or, left, right) => {
            let left = evaluate(left)?;
            if left.truthy() {
                Ok(left)
            } else {
                evaluate(right)
            }
        }
        Expr::Binary(op, left, right) => binary(*op, evaluate(left)?, evaluate(right)?),
        Expr::Call { name, args } => {
            let args = args.iter().map(evaluate).collect::<Result<Vec<_>, _>>()?;
            call(name, args)
        }
        Expr::Method {
            receiver,
            name,
            args,
        } => {
            let receiver = evaluate(receiver)?;
            let args = args.iter().map(evaluate).collect::<Result<Vec<_>, _>>()?;
            method(receiver, name, args)
        }
    }
}

fn finite(n: f64) -> Result<Value, ExprError> {
    if n.is_finite() {
        Ok(Value::Number(n))
    } else {
        Err(ExprError::Overflow)
    }
}

fn mismatch(op: &str, left: &Value, right: &Value) -> ExprError {
    ExprError::TypeMismatch(format!(
        "unsupported operands for {}: {} and {}",
        op,
        left.type_name(),
        right.type_name()
    ))
}

fn unary(op: UnaryOp, value: Value) -> Result<Value, ExprError> {
    match (op, value) {
        (UnaryOp::Not, v) => Ok(Value::Bool(!v.truthy())),
        (UnaryOp::Neg, Value::Number(n)) => Ok(Value::Number(-n)),
        (UnaryOp::Plus, Value::Number(n)) => Ok(Value::Number(n)),
        (_, other) => Err(ExprError::TypeMismatch(format!(
            "unary sign applied to {}",
            other.type_name()
        ))),
    }
}

fn binary(op: BinaryOp, left: Value, right: Value) -> Result<Value, ExprError> {
    use BinaryOp::*;

    match op {
        Eq => return Ok(Value::Bool(left == right)),
        Ne => return Ok(Value::Bool(left != right)),
        Lt | Le | Gt | Ge => return compare(op, &left, &right),
        _ => {}
    }

    match (op, &left, &right) {
        (Add, Value::Text(a), Value::Text(b)) => Ok(Value::Text(format!("{}{}", a, b))),
        (Add, Value::Number(a), Value::Number(b)) => finite(a + b),
        (Sub, Value::Number(a), Value::Number(b)) => finite(a - b),
        (Mul, Value::Number(a), Value::Number(b)) => finite(a * b),
        (Div | FloorDiv | Rem, Value::Number(_), Value::Number(b)) if *b == 0.0 => {
            Err(ExprError::DivisionByZero)
        }
        (Div, Value::Number(a), Value::Number(b)) => finite(a / b),
        (FloorDiv, Value::Number(a), Value::Number(b)) => finite((a / b).floor()),
        // Result takes the sign of the divisor
        (Rem, Value::Number(a), Value::Number(b)) => finite(a - b * (a / b).floor()),
        (Pow, Value::Number(a), Value::Number(b)) => power(*a, *b),
        _ => Err(mismatch(symbol(op), &left, &right)),
    }
}

fn power(base: f64, exponent: f64) -> Result<Value, ExprError> {
    if base == 0.0 && exponent < 0.0 {
        return Err(ExprError::DivisionByZero);
    }
    if base < 0.0 && exponent.fract() != 0.0 {
        return Err(ExprError::Domain(
            "negative number raised to a fractional power".into(),
        ));
    }
    finite(base.powf(exponent))
}

fn compare(op: BinaryOp, left: &Value, right: &Value) -> Result<Value, ExprError> {
    let ordering = match (left, right) {
        (Value::Number(a), Value::Number(b)) => a.partial_cmp(b),
        (Value::Text(a), Value::Text(b)) => Some(a.cmp(b)),
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        _ => return Err(mismatch(symbol(op), left, right)),
    };

    let Some(ordering) = ordering else {
        return Ok(Value::Bool(false));
    };

    Ok(Value::Bool(match op {
        BinaryOp::Lt => ordering.is_lt(),
        BinaryOp::Le => ordering.is_le(),
        BinaryOp::Gt => ordering.is_gt(),
        _ => ordering.is_ge(),
    }))
}

fn symbol(op: BinaryOp) -> &'static str {
    match op {
        BinaryOp::Add => "+",
        BinaryOp::Sub => "-",
        BinaryOp::Mul => "*",
        BinaryOp::Div => "/",
        BinaryOp::FloorDiv => "//",
        BinaryOp::Rem => "%",
        BinaryOp::Pow => "**",
        BinaryOp::Eq => "==",
        BinaryOp::Ne => "!=",
        BinaryOp::Lt => "<",
        BinaryOp::Le => "<=",
        BinaryOp::Gt => ">",
        BinaryOp::Ge => ">=",
        BinaryOp::And => "and",
        BinaryOp::Or => "or",
    }
}

fn arity(name: &str, expected: &'static str, found: usize) -> ExprError {
    ExprError::Arity {
        name: name.to_string(),
        expected,
        found,
    }
}

fn number(name: &str, value: &Value) -> Result<f64, ExprError> {
    match value {
        Value::Number(n) => Ok(*n),
        other => Err(ExprError::TypeMismatch(format!(
            "{}() expects a number, got {}",
            name,
            other.type_name()
        ))),
    }
}

fn text<'v>(name: &str, value: &'v Value) -> Result<&'v str, ExprError> {
    match value {
        Value::Text(s) => Ok(s),
        other => Err(ExprError::TypeMismatch(format!(
            "{}() expects a string, got {}",
            name,
            other.type_name()
        ))),
    }
}

fn one<'a>(name: &str, args: &'a [Value]) -> Result<&'a Value, ExprError> {
    match args {
        [only] => Ok(only),
        _ => Err(arity(name, "1", args.len())),
    }
}

/// Non-overlapping occurrences, with an empty needle matching between
/// every character.
fn count_occurrences(haystack: &str, needle: &str) -> usize {
    if needle.is_empty() {
        haystack.chars().count() + 1
    } else {
        haystack.matches(needle).count()
    }
}

fn call(name: &str, args: Vec<Value>) -> Result<Value, ExprError> {
    match name {
        "abs" => finite(number(name, one(name, &args)?)?.abs()),
        "sqrt" => {
            let n = number(name, one(name, &args)?)?;
            if n < 0.0 {
                return Err(ExprError::Domain("square root of a negative number".into()));
            }
            finite(n.sqrt())
        }
        "floor" => finite(number(name, one(name, &args)?)?.floor()),
        "ceil" => finite(number(name, one(name, &args)?)?.ceil()),
        "pow" => match args.as_slice() {
            [base, exponent] => power(number(name, base)?, number(name, exponent)?),
            _ => Err(arity(name, "2", args.len())),
        },
        "round" => match args.as_slice() {
            [x] => finite(number(name, x)?.round()),
            [x, digits] => {
                let x = number(name, x)?;
                let digits = number(name, digits)?.trunc().clamp(-15.0, 15.0) as i32;
                let scale = 10f64.powi(digits);
                finite((x * scale).round() / scale)
            }
            _ => Err(arity(name, "1 or 2", args.len())),
        },
        "min" | "max" => {
            if args.is_empty() {
                return Err(arity(name, "at least 1", 0));
            }
            let mut best = number(name, &args[0])?;
            for value in &args[1..] {
                let n = number(name, value)?;
                best = if name == "min" { best.min(n) } else { best.max(n) };
            }
            finite(best)
        }
        "sum" => {
            let mut total = 0.0;
            for value in &args {
                total += number(name, value)?;
            }
            finite(total)
        }
        "len" => Ok(Value::Number(
            text(name, one(name, &args)?)?.chars().count() as f64,
        )),
        "count" => match args.as_slice() {
            [haystack, needle] => Ok(Value::Number(count_occurrences(
                text(name, haystack)?,
                text(name, needle)?,
            ) as f64)),
            _ => Err(arity(name, "2", args.len())),
        },
        "upper" => Ok(Value::Text(text(name, one(name, &args)?)?.to_uppercase())),
        "lower" => Ok(Value::Text(text(name, one(name, &args)?)?.to_lowercase())),
        "str" => Ok(Value::Text(one(name, &args)?.to_string())),
        "int" => to_number(name, one(name, &args)?).map(|n| Value::Number(n.trunc())),
        "float" => to_number(name, one(name, &args)?).map(Value::Number),
        other => Err(ExprError::UnknownFunction(other.to_string())),
    }
}

fn to_number(name: &str, value: &Value) -> Result<f64, ExprError> {
    match value {
        Value::Number(n) => Ok(*n),
        Value::Bool(b) => Ok(if *b { 1.0 } else { 0.0 }),
        Value::Text(s) => s
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|n| n.is_finite())
            .ok_or_else(|| {
                ExprError::TypeMismatch(format!("{}() cannot convert '{}'", name, s))
            }),
    }
}

fn method(receiver: Value, name: &str, args: Vec<Value>) -> Result<Value, ExprError> {
    let Value::Text(s) = &receiver else {
        return Err(ExprError::UnknownMethod {
            receiver: receiver.type_name(),
            name: name.to_string(),
        });
    };

    match (name, args.as_slice()) {
        ("count", [needle]) => Ok(Value::Number(
            count_occurrences(s, text(name, needle)?) as f64,
        )),
        ("upper", []) => Ok(Value::Text(s.to_uppercase())),
        ("lower", []) => Ok(Value::Text(s.to_lowercase())),
        ("len", []) => Ok(Value::Number(s.chars().count() as f64)),
        ("count", _) => Err(arity(name, "1", args.len())),
        ("upper" | "lower" | "len", _) => Err(arity(name, "0", args.len())),
        _ => Err(ExprError::UnknownMethod {
            receiver: "string",
            name: name.to_string(),
        }),
    }
}
