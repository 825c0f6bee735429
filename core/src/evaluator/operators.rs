//! Binary and unary operator implementations.
//!
//! These functions are shared by the evaluator and by the parser's literal
//! folding, so a folded constant is always the value evaluation would have
//! produced.
//!
//! Numeric operands follow binary promotion (`Int` < `Long` < `Float` <
//! `Double`, with `Char` promoting like `Int`). Integral arithmetic wraps on
//! overflow and truncates on division. Strings that spell numbers take part
//! in arithmetic other than `+`, where any string operand concatenates.

use core::cmp::Ordering;

use ecow::{EcoString, eco_format};
use regex::Regex;

use crate::casting::{self, CastError};
use crate::evaluator::EvalErrorKind;
use crate::parser::operators::{BinaryOp, UnaryOp};
use crate::values::{TypeHint, Value};

fn invalid(op: impl core::fmt::Display, lhs: &Value, rhs: &Value) -> EvalErrorKind {
    EvalErrorKind::InvalidOperands {
        op: eco_format!("{}", op),
        lhs: lhs.type_name(),
        rhs: rhs.type_name(),
    }
}

/// Numeric operands promoted to a common representation.
enum Promoted {
    Int(i32, i32),
    Long(i64, i64),
    Float(f32, f32),
    Double(f64, f64),
}

fn promote(lhs: &Value, rhs: &Value) -> Option<Promoted> {
    let a = casting::as_number(lhs)?;
    let b = casting::as_number(rhs)?;
    let rank = a.type_hint().promote(&b.type_hint());
    Some(match rank {
        TypeHint::Int => Promoted::Int(a.as_i64()? as i32, b.as_i64()? as i32),
        TypeHint::Long => Promoted::Long(a.as_i64()?, b.as_i64()?),
        TypeHint::Float => Promoted::Float(a.as_f64()? as f32, b.as_f64()? as f32),
        _ => Promoted::Double(a.as_f64()?, b.as_f64()?),
    })
}

/// Evaluate a non-short-circuit binary operator.
pub fn binary(op: BinaryOp, lhs: &Value, rhs: &Value) -> Result<Value, EvalErrorKind> {
    match op {
        BinaryOp::Add => add(lhs, rhs),
        BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod => arithmetic(op, lhs, rhs),
        BinaryOp::Pow => {
            let (a, b) = match (casting::as_number(lhs), casting::as_number(rhs)) {
                (Some(a), Some(b)) => (a, b),
                _ => return Err(invalid(op, lhs, rhs)),
            };
            let base = casting::to_f64(&a)?;
            let exp = casting::to_f64(&b)?;
            Ok(Value::Double(base.powf(exp)))
        }
        BinaryOp::BitAnd | BinaryOp::BitOr | BinaryOp::BitXor => bitwise(op, lhs, rhs),
        BinaryOp::Shl | BinaryOp::Shr | BinaryOp::UShr => shift(op, lhs, rhs),
        BinaryOp::Eq => Ok(Value::Bool(loose_eq(lhs, rhs))),
        BinaryOp::Ne => Ok(Value::Bool(!loose_eq(lhs, rhs))),
        BinaryOp::Lt | BinaryOp::Gt | BinaryOp::Le | BinaryOp::Ge => {
            let Some(ordering) = compare(op, lhs, rhs)? else {
                return Ok(Value::Bool(false));
            };
            Ok(Value::Bool(match op {
                BinaryOp::Lt => ordering == Ordering::Less,
                BinaryOp::Gt => ordering == Ordering::Greater,
                BinaryOp::Le => ordering != Ordering::Greater,
                _ => ordering != Ordering::Less,
            }))
        }
        BinaryOp::Contains => Ok(Value::Bool(contains(lhs, rhs))),
        BinaryOp::Regex => {
            let pattern = regex_pattern(rhs)?;
            let re = compile_regex(&pattern)?;
            Ok(Value::Bool(regex_matches(&re, lhs)))
        }
        BinaryOp::And | BinaryOp::Or => {
            let a = truthy(lhs)?;
            let b = truthy(rhs)?;
            Ok(Value::Bool(if op == BinaryOp::And { a && b } else { a || b }))
        }
        BinaryOp::InstanceOf => Err(invalid(op, lhs, rhs)),
    }
}

fn add(lhs: &Value, rhs: &Value) -> Result<Value, EvalErrorKind> {
    if matches!(lhs, Value::Str(_)) || matches!(rhs, Value::Str(_)) {
        let mut out = EcoString::new();
        out.push_str(&eco_format!("{}", lhs));
        out.push_str(&eco_format!("{}", rhs));
        return Ok(Value::Str(out));
    }
    if lhs.is_numeric() && rhs.is_numeric() {
        return arithmetic(BinaryOp::Add, lhs, rhs);
    }
    Err(invalid(BinaryOp::Add, lhs, rhs))
}

fn arithmetic(op: BinaryOp, lhs: &Value, rhs: &Value) -> Result<Value, EvalErrorKind> {
    if lhs.is_null() || rhs.is_null() {
        return Err(EvalErrorKind::NullReference(eco_format!(
            "null operand of `{}`",
            op
        )));
    }
    let promoted = promote(lhs, rhs).ok_or_else(|| invalid(op, lhs, rhs))?;
    Ok(match promoted {
        Promoted::Int(a, b) => Value::Int(match op {
            BinaryOp::Add => a.wrapping_add(b),
            BinaryOp::Sub => a.wrapping_sub(b),
            BinaryOp::Mul => a.wrapping_mul(b),
            BinaryOp::Div if b == 0 => return Err(EvalErrorKind::DivisionByZero),
            BinaryOp::Div => a.wrapping_div(b),
            BinaryOp::Mod if b == 0 => return Err(EvalErrorKind::DivisionByZero),
            _ => a.wrapping_rem(b),
        }),
        Promoted::Long(a, b) => Value::Long(match op {
            BinaryOp::Add => a.wrapping_add(b),
            BinaryOp::Sub => a.wrapping_sub(b),
            BinaryOp::Mul => a.wrapping_mul(b),
            BinaryOp::Div if b == 0 => return Err(EvalErrorKind::DivisionByZero),
            BinaryOp::Div => a.wrapping_div(b),
            BinaryOp::Mod if b == 0 => return Err(EvalErrorKind::DivisionByZero),
            _ => a.wrapping_rem(b),
        }),
        Promoted::Float(a, b) => Value::Float(match op {
            BinaryOp::Add => a + b,
            BinaryOp::Sub => a - b,
            BinaryOp::Mul => a * b,
            BinaryOp::Div => a / b,
            _ => a % b,
        }),
        Promoted::Double(a, b) => Value::Double(match op {
            BinaryOp::Add => a + b,
            BinaryOp::Sub => a - b,
            BinaryOp::Mul => a * b,
            BinaryOp::Div => a / b,
            _ => a % b,
        }),
    })
}

fn bitwise(op: BinaryOp, lhs: &Value, rhs: &Value) -> Result<Value, EvalErrorKind> {
    if let (Value::Bool(a), Value::Bool(b)) = (lhs, rhs) {
        return Ok(Value::Bool(match op {
            BinaryOp::BitAnd => a & b,
            BinaryOp::BitOr => a | b,
            _ => a ^ b,
        }));
    }
    match promote(lhs, rhs) {
        Some(Promoted::Int(a, b)) => Ok(Value::Int(match op {
            BinaryOp::BitAnd => a & b,
            BinaryOp::BitOr => a | b,
            _ => a ^ b,
        })),
        Some(Promoted::Long(a, b)) => Ok(Value::Long(match op {
            BinaryOp::BitAnd => a & b,
            BinaryOp::BitOr => a | b,
            _ => a ^ b,
        })),
        _ => Err(invalid(op, lhs, rhs)),
    }
}

fn shift(op: BinaryOp, lhs: &Value, rhs: &Value) -> Result<Value, EvalErrorKind> {
    let distance = casting::as_number(rhs)
        .and_then(|n| n.as_i64())
        .ok_or_else(|| invalid(op, lhs, rhs))?;
    match casting::as_number(lhs) {
        Some(Value::Long(a)) => {
            let d = (distance & 63) as u32;
            Ok(Value::Long(match op {
                BinaryOp::Shl => a.wrapping_shl(d),
                BinaryOp::Shr => a.wrapping_shr(d),
                _ => ((a as u64) >> d) as i64,
            }))
        }
        Some(n @ (Value::Int(_) | Value::Char(_))) => {
            let a = n.as_i64().unwrap_or_default() as i32;
            let d = (distance & 31) as u32;
            Ok(Value::Int(match op {
                BinaryOp::Shl => a.wrapping_shl(d),
                BinaryOp::Shr => a.wrapping_shr(d),
                _ => ((a as u32) >> d) as i32,
            }))
        }
        _ => Err(invalid(op, lhs, rhs)),
    }
}

/// Ordering for relational operators. `None` when either side is null,
/// which makes every relational comparison false.
fn compare(op: BinaryOp, lhs: &Value, rhs: &Value) -> Result<Option<Ordering>, EvalErrorKind> {
    if lhs.is_null() || rhs.is_null() {
        return Ok(None);
    }
    match (lhs, rhs) {
        (Value::Str(a), Value::Str(b)) => return Ok(Some(a.as_str().cmp(b.as_str()))),
        (Value::Char(a), Value::Char(b)) => return Ok(Some(a.cmp(b))),
        _ => {}
    }
    match promote(lhs, rhs) {
        Some(Promoted::Int(a, b)) => Ok(Some(a.cmp(&b))),
        Some(Promoted::Long(a, b)) => Ok(Some(a.cmp(&b))),
        Some(Promoted::Float(a, b)) => Ok(a.partial_cmp(&b)),
        Some(Promoted::Double(a, b)) => Ok(a.partial_cmp(&b)),
        None => Err(invalid(op, lhs, rhs)),
    }
}

/// Language-level equality.
///
/// `empty` equals every empty value, numbers compare across widths and
/// against numeric strings, strings compare with single characters, and
/// containers compare element-wise. Host objects compare by identity.
pub fn loose_eq(lhs: &Value, rhs: &Value) -> bool {
    match (lhs, rhs) {
        (Value::Empty, other) | (other, Value::Empty) => other.is_empty_value(),
        (Value::Null, Value::Null) => true,
        (Value::Null, _) | (_, Value::Null) => false,
        (Value::Str(a), Value::Str(b)) => a == b,
        (Value::Str(s), Value::Char(c)) | (Value::Char(c), Value::Str(s)) => {
            let mut chars = s.chars();
            chars.next() == Some(*c) && chars.next().is_none()
        }
        (Value::Bool(a), Value::Bool(b)) => a == b,
        (Value::Bool(b), Value::Str(s)) | (Value::Str(s), Value::Bool(b)) => {
            casting::to_bool(&Value::Str(s.clone())).is_ok_and(|v| v == *b)
        }
        (Value::List(a), Value::List(b)) => {
            if std::sync::Arc::ptr_eq(a, b) {
                return true;
            }
            let (a, b) = (a.read(), b.read());
            a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| loose_eq(x, y))
        }
        (Value::Array(a), Value::Array(b)) => {
            let (a, b) = (a.items.read(), b.items.read());
            a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| loose_eq(x, y))
        }
        (Value::Map(a), Value::Map(b)) => std::sync::Arc::ptr_eq(a, b) || *a.read() == *b.read(),
        (Value::Object(_), _) | (Value::Class(_), _) | (Value::Function(_), _) => lhs.same_ref(rhs),
        _ => match promote(lhs, rhs) {
            Some(Promoted::Int(a, b)) => a == b,
            Some(Promoted::Long(a, b)) => a == b,
            Some(Promoted::Float(a, b)) => a == b,
            Some(Promoted::Double(a, b)) => a == b,
            None => false,
        },
    }
}

/// `lhs contains rhs`: substring, list or array membership, map key.
pub fn contains(lhs: &Value, rhs: &Value) -> bool {
    match lhs {
        Value::Str(s) => match rhs {
            Value::Str(needle) => s.contains(needle.as_str()),
            other => s.contains(eco_format!("{}", other).as_str()),
        },
        Value::List(list) => list.read().iter().any(|item| loose_eq(item, rhs)),
        Value::Array(arr) => arr.items.read().iter().any(|item| loose_eq(item, rhs)),
        Value::Map(map) => map.read().contains_key(rhs),
        _ => false,
    }
}

/// Truth value of a condition. Null is false; strings must spell a boolean.
pub fn truthy(value: &Value) -> Result<bool, EvalErrorKind> {
    match value {
        Value::Null => Ok(false),
        Value::Bool(b) => Ok(*b),
        other => casting::to_bool(other).map_err(EvalErrorKind::from),
    }
}

fn regex_pattern(value: &Value) -> Result<EcoString, EvalErrorKind> {
    match value {
        Value::Str(s) => Ok(s.clone()),
        Value::Null => Err(EvalErrorKind::NullReference("null regular expression".into())),
        other => Ok(eco_format!("{}", other)),
    }
}

/// Compiles a `~=` pattern anchored at both ends.
pub fn compile_regex(pattern: &str) -> Result<Regex, EvalErrorKind> {
    Regex::new(&format!("^(?:{})$", pattern)).map_err(|err| EvalErrorKind::Regex {
        pattern: pattern.into(),
        message: eco_format!("{}", err),
    })
}

/// Whether `value` (rendered as a string) fully matches `re`.
pub fn regex_matches(re: &Regex, value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Str(s) => re.is_match(s),
        other => re.is_match(&eco_format!("{}", other)),
    }
}

/// `value instanceof T` for a built-in value type.
pub fn is_builtin_instance(value: &Value, ty: &TypeHint) -> bool {
    match (ty, value) {
        (_, Value::Null) => false,
        (TypeHint::Any, _) => true,
        (TypeHint::Array(elem), Value::Array(arr)) => !elem.is_known() || **elem == arr.elem,
        (ty, value) => *ty == value.type_hint(),
    }
}

pub fn unary(op: UnaryOp, operand: &Value) -> Result<Value, EvalErrorKind> {
    let bad = || EvalErrorKind::InvalidOperands {
        op: eco_format!("{}", op),
        lhs: operand.type_name(),
        rhs: "nothing".into(),
    };
    match op {
        UnaryOp::Not => match operand {
            Value::Bool(b) => Ok(Value::Bool(!b)),
            Value::Null => Err(EvalErrorKind::NullReference("null operand of `!`".into())),
            other => casting::to_bool(other)
                .map(|b| Value::Bool(!b))
                .map_err(|_: CastError| bad()),
        },
        UnaryOp::Neg => match casting::as_number(operand) {
            Some(Value::Int(n)) => Ok(Value::Int(n.wrapping_neg())),
            Some(Value::Char(c)) => Ok(Value::Int(-(c as i32))),
            Some(Value::Long(n)) => Ok(Value::Long(n.wrapping_neg())),
            Some(Value::Float(f)) => Ok(Value::Float(-f)),
            Some(Value::Double(d)) => Ok(Value::Double(-d)),
            _ => Err(bad()),
        },
        UnaryOp::Plus => match casting::as_number(operand) {
            Some(Value::Char(c)) => Ok(Value::Int(c as i32)),
            Some(n) => Ok(n),
            None => Err(bad()),
        },
        UnaryOp::BitNot => match casting::as_number(operand) {
            Some(Value::Int(n)) => Ok(Value::Int(!n)),
            Some(Value::Char(c)) => Ok(Value::Int(!(c as i32))),
            Some(Value::Long(n)) => Ok(Value::Long(!n)),
            _ => Err(bad()),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bin(op: BinaryOp, a: impl Into<Value>, b: impl Into<Value>) -> Value {
        binary(op, &a.into(), &b.into()).unwrap()
    }

    #[test]
    fn test_promotion() {
        assert_eq!(bin(BinaryOp::Add, 2, 3), Value::Int(5));
        assert_eq!(bin(BinaryOp::Add, 2, 3i64), Value::Long(5));
        assert_eq!(bin(BinaryOp::Mul, 2, 1.5), Value::Double(3.0));
        assert_eq!(bin(BinaryOp::Div, 7, 2), Value::Int(3));
        assert_eq!(bin(BinaryOp::Div, -7, 2), Value::Int(-3));
        assert_eq!(bin(BinaryOp::Mod, 7, 3), Value::Int(1));
    }

    #[test]
    fn test_int_overflow_wraps() {
        assert_eq!(bin(BinaryOp::Add, i32::MAX, 1), Value::Int(i32::MIN));
        assert_eq!(bin(BinaryOp::Div, i32::MIN, -1), Value::Int(i32::MIN));
    }

    #[test]
    fn test_division_by_zero() {
        assert!(matches!(
            binary(BinaryOp::Div, &Value::Int(1), &Value::Int(0)),
            Err(EvalErrorKind::DivisionByZero)
        ));
        assert!(matches!(
            binary(BinaryOp::Mod, &Value::Long(1), &Value::Int(0)),
            Err(EvalErrorKind::DivisionByZero)
        ));
        assert_eq!(bin(BinaryOp::Div, 1.0, 0), Value::Double(f64::INFINITY));
    }

    #[test]
    fn test_numeric_strings() {
        assert_eq!(bin(BinaryOp::Mul, "3.14", "60"), Value::Double(188.4));
        assert_eq!(bin(BinaryOp::Sub, "10", 4), Value::Int(6));
        assert_eq!(bin(BinaryOp::Add, "10", 4), Value::str("104"));
        assert!(binary(BinaryOp::Mul, &Value::str("abc"), &Value::Int(2)).is_err());
    }

    #[test]
    fn test_string_concat_renders_values() {
        assert_eq!(bin(BinaryOp::Add, "a", 1.0), Value::str("a1.0"));
        assert_eq!(bin(BinaryOp::Add, Value::Null, "x"), Value::str("nullx"));
        assert_eq!(bin(BinaryOp::Add, Value::Char('a'), "b"), Value::str("ab"));
    }

    #[test]
    fn test_char_arithmetic() {
        assert_eq!(bin(BinaryOp::Add, Value::Char('a'), 1), Value::Int(98));
    }

    #[test]
    fn test_pow_is_double() {
        assert_eq!(bin(BinaryOp::Pow, 2, 10), Value::Double(1024.0));
    }

    #[test]
    fn test_bitwise_and_shifts() {
        assert_eq!(bin(BinaryOp::BitAnd, 6, 3), Value::Int(2));
        assert_eq!(bin(BinaryOp::BitOr, true, false), Value::Bool(true));
        assert_eq!(bin(BinaryOp::Shl, 1, 33), Value::Int(2));
        assert_eq!(bin(BinaryOp::UShr, -1, 28), Value::Int(15));
        assert_eq!(bin(BinaryOp::Shr, -16i64, 2), Value::Long(-4));
    }

    #[test]
    fn test_comparisons() {
        assert_eq!(bin(BinaryOp::Lt, 1, 2.5), Value::Bool(true));
        assert_eq!(bin(BinaryOp::Ge, "b", "a"), Value::Bool(true));
        assert_eq!(bin(BinaryOp::Gt, Value::Null, 1), Value::Bool(false));
        assert!(binary(BinaryOp::Lt, &Value::Bool(true), &Value::Int(1)).is_err());
    }

    #[test]
    fn test_loose_equality() {
        assert!(loose_eq(&Value::Int(1), &Value::Long(1)));
        assert!(loose_eq(&Value::Int(1), &Value::Double(1.0)));
        assert!(loose_eq(&Value::str("60"), &Value::Int(60)));
        assert!(loose_eq(&Value::str("a"), &Value::Char('a')));
        assert!(loose_eq(&Value::Empty, &Value::str("  ")));
        assert!(loose_eq(&Value::list(vec![]), &Value::Empty));
        assert!(!loose_eq(&Value::Null, &Value::Int(0)));
        assert!(loose_eq(
            &Value::list(vec![Value::Int(1)]),
            &Value::list(vec![Value::Long(1)])
        ));
    }

    #[test]
    fn test_contains_and_regex() {
        assert!(contains(&Value::str("foobar"), &Value::str("oba")));
        assert!(contains(&Value::list(vec![Value::Int(1), Value::Int(2)]), &Value::Long(2)));
        assert_eq!(bin(BinaryOp::Regex, "abc123", "[a-z]+\\d+"), Value::Bool(true));
        assert_eq!(bin(BinaryOp::Regex, "abc123x", "[a-z]+\\d+"), Value::Bool(false));
        assert!(matches!(
            binary(BinaryOp::Regex, &Value::str("a"), &Value::str("(")),
            Err(EvalErrorKind::Regex { .. })
        ));
    }

    #[test]
    fn test_unary() {
        assert_eq!(unary(UnaryOp::Neg, &Value::Int(5)).unwrap(), Value::Int(-5));
        assert_eq!(unary(UnaryOp::Neg, &Value::str("2.5")).unwrap(), Value::Double(-2.5));
        assert_eq!(unary(UnaryOp::Not, &Value::Bool(true)).unwrap(), Value::Bool(false));
        assert_eq!(unary(UnaryOp::BitNot, &Value::Int(0)).unwrap(), Value::Int(-1));
        assert!(unary(UnaryOp::Neg, &Value::list(vec![])).is_err());
    }

    #[test]
    fn test_truthiness() {
        assert!(!truthy(&Value::Null).unwrap());
        assert!(truthy(&Value::str("true")).unwrap());
        assert!(truthy(&Value::list(vec![])).is_err());
    }
}
