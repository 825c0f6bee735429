//! Value conversions.
//!
//! Used by explicit casts (`(int) x`), by typed declarations (`int x = ...`),
//! by typed function parameters and foreach items, and by arithmetic on
//! numeric strings. Narrowing numeric casts truncate, the same way integer
//! division does; parsing a string that is not a number is an error.

use ecow::{EcoString, eco_format};
use thiserror::Error;

use crate::values::{TypeHint, Value};

/// Errors that can occur during a conversion.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CastError {
    #[error("cannot convert {from} `{value}` to {to}")]
    Invalid {
        value: EcoString,
        from: EcoString,
        to: TypeHint,
    },

    #[error("cannot convert null to primitive {0}")]
    NullToPrimitive(TypeHint),
}

fn invalid(value: &Value, to: TypeHint) -> CastError {
    let mut rendered = eco_format!("{}", value);
    if rendered.len() > 40 {
        rendered.truncate(40);
        rendered.push_str("...");
    }
    CastError::Invalid {
        value: rendered,
        from: value.type_name(),
        to,
    }
}

/// Parses a string as the narrowest fitting numeric value:
/// `Int`, then `Long`, then `Double`.
pub fn parse_number(text: &str) -> Option<Value> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    if let Ok(n) = text.parse::<i32>() {
        return Some(Value::Int(n));
    }
    if let Ok(n) = text.parse::<i64>() {
        return Some(Value::Long(n));
    }
    // Rust accepts "inf"/"nan" spellings that are not numeric literals here.
    if text.chars().any(|c| c.is_ascii_alphabetic() && !matches!(c, 'e' | 'E')) {
        return None;
    }
    text.parse::<f64>().ok().map(Value::Double)
}

/// Numeric view of a value, parsing strings. Non-numeric values yield `None`.
pub fn as_number(value: &Value) -> Option<Value> {
    match value {
        Value::Char(_) | Value::Int(_) | Value::Long(_) | Value::Float(_) | Value::Double(_) => {
            Some(value.clone())
        }
        Value::Str(s) => parse_number(s),
        _ => None,
    }
}

pub fn to_bool(value: &Value) -> Result<bool, CastError> {
    match value {
        Value::Bool(b) => Ok(*b),
        Value::Str(s) if s.eq_ignore_ascii_case("true") => Ok(true),
        Value::Str(s) if s.eq_ignore_ascii_case("false") => Ok(false),
        Value::Int(_) | Value::Long(_) | Value::Char(_) => Ok(value.as_i64() != Some(0)),
        Value::Float(_) | Value::Double(_) => Ok(value.as_f64() != Some(0.0)),
        Value::Null => Err(CastError::NullToPrimitive(TypeHint::Bool)),
        _ => Err(invalid(value, TypeHint::Bool)),
    }
}

pub fn to_i64(value: &Value) -> Result<i64, CastError> {
    match value {
        Value::Char(_) | Value::Int(_) | Value::Long(_) => {
            value.as_i64().ok_or_else(|| invalid(value, TypeHint::Long))
        }
        Value::Float(f) => Ok(*f as i64),
        Value::Double(d) => Ok(*d as i64),
        Value::Bool(b) => Ok(*b as i64),
        Value::Str(s) => match parse_number(s) {
            Some(n) => to_i64(&n),
            None => Err(invalid(value, TypeHint::Long)),
        },
        Value::Null => Err(CastError::NullToPrimitive(TypeHint::Long)),
        _ => Err(invalid(value, TypeHint::Long)),
    }
}

/// Converts to `i32`, wrapping longs the way a narrowing cast does.
pub fn to_i32(value: &Value) -> Result<i32, CastError> {
    match value {
        Value::Null => Err(CastError::NullToPrimitive(TypeHint::Int)),
        Value::Float(f) => Ok(*f as i32),
        Value::Double(d) => Ok(*d as i32),
        other => to_i64(other)
            .map(|n| n as i32)
            .map_err(|_| invalid(other, TypeHint::Int)),
    }
}

pub fn to_f64(value: &Value) -> Result<f64, CastError> {
    match value {
        Value::Str(s) => match parse_number(s) {
            Some(n) => to_f64(&n),
            None => Err(invalid(value, TypeHint::Double)),
        },
        Value::Bool(b) => Ok(if *b { 1.0 } else { 0.0 }),
        Value::Null => Err(CastError::NullToPrimitive(TypeHint::Double)),
        other => other.as_f64().ok_or_else(|| invalid(other, TypeHint::Double)),
    }
}

pub fn to_char(value: &Value) -> Result<char, CastError> {
    match value {
        Value::Char(c) => Ok(*c),
        Value::Str(s) => {
            let mut chars = s.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => Ok(c),
                _ => Err(invalid(value, TypeHint::Char)),
            }
        }
        Value::Int(_) | Value::Long(_) => value
            .as_i64()
            .and_then(|n| u32::try_from(n).ok())
            .and_then(char::from_u32)
            .ok_or_else(|| invalid(value, TypeHint::Char)),
        Value::Null => Err(CastError::NullToPrimitive(TypeHint::Char)),
        _ => Err(invalid(value, TypeHint::Char)),
    }
}

/// Converts `value` so it can be stored in a slot of type `target`.
///
/// `TypeHint::Any` accepts everything unchanged. Reference targets accept
/// null; primitive targets reject it.
pub fn coerce(value: Value, target: &TypeHint) -> Result<Value, CastError> {
    if matches!(value, Value::Null) {
        return if target.is_primitive() {
            Err(CastError::NullToPrimitive(target.clone()))
        } else {
            Ok(Value::Null)
        };
    }
    match target {
        TypeHint::Any | TypeHint::Null | TypeHint::Void => Ok(value),
        TypeHint::Bool => to_bool(&value).map(Value::Bool),
        TypeHint::Char => to_char(&value).map(Value::Char),
        TypeHint::Int => to_i32(&value).map(Value::Int),
        TypeHint::Long => to_i64(&value).map(Value::Long),
        TypeHint::Float => to_f64(&value).map(|d| Value::Float(d as f32)),
        TypeHint::Double => to_f64(&value).map(Value::Double),
        TypeHint::Str => match value {
            Value::Str(_) => Ok(value),
            other => Ok(Value::Str(eco_format!("{}", other))),
        },
        TypeHint::List => match &value {
            Value::List(_) => Ok(value),
            Value::Array(arr) => Ok(Value::list(arr.items.read().clone())),
            _ => Err(invalid(&value, TypeHint::List)),
        },
        TypeHint::Map => match &value {
            Value::Map(_) => Ok(value),
            _ => Err(invalid(&value, TypeHint::Map)),
        },
        TypeHint::Array(elem) => {
            let items = match &value {
                Value::Array(arr) if arr.elem == **elem || !elem.is_known() => return Ok(value),
                Value::Array(arr) => arr.items.read().clone(),
                Value::List(list) => list.read().clone(),
                _ => return Err(invalid(&value, target.clone())),
            };
            let items = items
                .into_iter()
                .map(|item| coerce(item, elem))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Value::array((**elem).clone(), items))
        }
        TypeHint::Class(name) => match &value {
            Value::Object(obj) if obj.class().is_named_or_extends(name) => Ok(value),
            _ => Err(invalid(&value, target.clone())),
        },
        TypeHint::Function => match &value {
            Value::Function(_) => Ok(value),
            _ => Err(invalid(&value, TypeHint::Function)),
        },
    }
}
