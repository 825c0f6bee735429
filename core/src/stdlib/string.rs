//! String intrinsics and the `String` class.
//!
//! Design notes:
//! - Indices and lengths count Unicode scalar values, not bytes.
//! - `split` and `matches` take regular expressions; `replace` is literal.

use std::sync::Arc;

use ecow::{EcoString, eco_format};
use regex::Regex;

use super::{Intrinsic, IntrinsicTarget, intrinsic_of};
use crate::accessor::{PropertyAccessError, PropertyAccessErrorKind};
use crate::casting;
use crate::evaluator::EvalErrorKind;
use crate::values::{Class, ClassBuilder, DynamicObject, HostError, TypeHint, Value};

const fn string(name: &'static str, arity: usize, func: super::IntrinsicFn) -> Intrinsic {
    intrinsic_of(IntrinsicTarget::Str, name, arity, func)
}

pub const INTRINSICS: &[Intrinsic] = &[
    string("length", 0, string_length),
    string("isEmpty", 0, string_is_empty),
    string("contains", 1, string_contains),
    string("indexOf", 1, string_index_of),
    string("lastIndexOf", 1, string_last_index_of),
    string("substring", 1, string_substring),
    string("substring", 2, string_substring),
    string("charAt", 1, string_char_at),
    string("toUpperCase", 0, string_to_upper),
    string("toLowerCase", 0, string_to_lower),
    string("trim", 0, string_trim),
    string("startsWith", 1, string_starts_with),
    string("endsWith", 1, string_ends_with),
    string("equalsIgnoreCase", 1, string_equals_ignore_case),
    string("concat", 1, string_concat),
    string("replace", 2, string_replace),
    string("split", 1, string_split),
    string("matches", 1, string_matches),
];

fn this_str(this: &Value) -> &str {
    this.as_str().unwrap_or_default()
}

fn arg_str(arg: &Value) -> EcoString {
    match arg {
        Value::Str(s) => s.clone(),
        other => eco_format!("{}", other),
    }
}

fn out_of_bounds(index: i64, len: usize) -> EvalErrorKind {
    PropertyAccessError::new(
        "substring",
        "String",
        PropertyAccessErrorKind::IndexOutOfBounds { index, len },
    )
    .into()
}

/// Character offset of the first match of `needle`, or -1.
fn char_offset(haystack: &str, byte_offset: Option<usize>) -> Value {
    match byte_offset {
        Some(at) => Value::Int(haystack[..at].chars().count() as i32),
        None => Value::Int(-1),
    }
}

fn compile_regex(pattern: &str) -> Result<Regex, EvalErrorKind> {
    Regex::new(pattern).map_err(|err| EvalErrorKind::Regex {
        pattern: pattern.into(),
        message: eco_format!("{}", err),
    })
}

// ============================================================================
// Inspection
// ============================================================================

fn string_length(this: &Value, _args: &[Value]) -> Result<Value, EvalErrorKind> {
    Ok(Value::Int(this_str(this).chars().count() as i32))
}

fn string_is_empty(this: &Value, _args: &[Value]) -> Result<Value, EvalErrorKind> {
    Ok(Value::Bool(this_str(this).is_empty()))
}

fn string_contains(this: &Value, args: &[Value]) -> Result<Value, EvalErrorKind> {
    Ok(Value::Bool(this_str(this).contains(arg_str(&args[0]).as_str())))
}

fn string_index_of(this: &Value, args: &[Value]) -> Result<Value, EvalErrorKind> {
    let s = this_str(this);
    Ok(char_offset(s, s.find(arg_str(&args[0]).as_str())))
}

fn string_last_index_of(this: &Value, args: &[Value]) -> Result<Value, EvalErrorKind> {
    let s = this_str(this);
    Ok(char_offset(s, s.rfind(arg_str(&args[0]).as_str())))
}

fn string_starts_with(this: &Value, args: &[Value]) -> Result<Value, EvalErrorKind> {
    Ok(Value::Bool(this_str(this).starts_with(arg_str(&args[0]).as_str())))
}

fn string_ends_with(this: &Value, args: &[Value]) -> Result<Value, EvalErrorKind> {
    Ok(Value::Bool(this_str(this).ends_with(arg_str(&args[0]).as_str())))
}

fn string_equals_ignore_case(this: &Value, args: &[Value]) -> Result<Value, EvalErrorKind> {
    let other = match &args[0] {
        Value::Str(s) => s.to_lowercase(),
        _ => return Ok(Value::Bool(false)),
    };
    Ok(Value::Bool(this_str(this).to_lowercase() == other))
}

fn string_matches(this: &Value, args: &[Value]) -> Result<Value, EvalErrorKind> {
    let anchored = eco_format!("^(?:{})$", arg_str(&args[0]));
    Ok(Value::Bool(compile_regex(&anchored)?.is_match(this_str(this))))
}

// ============================================================================
// Slicing
// ============================================================================

fn string_substring(this: &Value, args: &[Value]) -> Result<Value, EvalErrorKind> {
    let chars: Vec<char> = this_str(this).chars().collect();
    let len = chars.len();
    let begin = casting::to_i64(&args[0])?;
    let end = match args.get(1) {
        Some(end) => casting::to_i64(end)?,
        None => len as i64,
    };
    if begin < 0 || begin > len as i64 {
        return Err(out_of_bounds(begin, len));
    }
    if end < begin || end > len as i64 {
        return Err(out_of_bounds(end, len));
    }
    Ok(Value::str(chars[begin as usize..end as usize].iter().collect::<String>()))
}

fn string_char_at(this: &Value, args: &[Value]) -> Result<Value, EvalErrorKind> {
    let s = this_str(this);
    let index = casting::to_i64(&args[0])?;
    usize::try_from(index)
        .ok()
        .and_then(|i| s.chars().nth(i))
        .map(Value::Char)
        .ok_or_else(|| out_of_bounds(index, s.chars().count()))
}

fn string_split(this: &Value, args: &[Value]) -> Result<Value, EvalErrorKind> {
    let re = compile_regex(&arg_str(&args[0]))?;
    let mut parts: Vec<Value> = re.split(this_str(this)).map(Value::str).collect();
    // Trailing empty strings are dropped.
    while parts.last().is_some_and(|p| p.as_str() == Some("")) {
        parts.pop();
    }
    Ok(Value::array(TypeHint::Str, parts))
}

// ============================================================================
// Transformation
// ============================================================================

fn string_to_upper(this: &Value, _args: &[Value]) -> Result<Value, EvalErrorKind> {
    Ok(Value::str(this_str(this).to_uppercase()))
}

fn string_to_lower(this: &Value, _args: &[Value]) -> Result<Value, EvalErrorKind> {
    Ok(Value::str(this_str(this).to_lowercase()))
}

fn string_trim(this: &Value, _args: &[Value]) -> Result<Value, EvalErrorKind> {
    Ok(Value::str(this_str(this).trim()))
}

fn string_concat(this: &Value, args: &[Value]) -> Result<Value, EvalErrorKind> {
    let mut out = EcoString::from(this_str(this));
    out.push_str(&arg_str(&args[0]));
    Ok(Value::Str(out))
}

fn string_replace(this: &Value, args: &[Value]) -> Result<Value, EvalErrorKind> {
    let from = arg_str(&args[0]);
    let to = arg_str(&args[1]);
    Ok(Value::str(this_str(this).replace(from.as_str(), &to)))
}

// ============================================================================
// String class
// ============================================================================

/// `kestrel.lang.String`: `String.valueOf(x)`, `String.join(sep, list)`,
/// `new String(x)`.
pub fn build_string_class() -> Arc<Class> {
    ClassBuilder::<DynamicObject>::new("kestrel.lang.String")
        .static_method("valueOf", Some(1), TypeHint::Str, |args| {
            Ok(Value::Str(eco_format!("{}", args[0])))
        })
        .static_method("join", Some(2), TypeHint::Str, |args| {
            let sep = arg_str(&args[0]);
            let items: Vec<Value> = match &args[1] {
                Value::List(list) => list.read().clone(),
                Value::Array(arr) => arr.items.read().clone(),
                other => {
                    return Err(HostError::Conversion {
                        value: eco_format!("{}", other),
                        target: "List".into(),
                    });
                }
            };
            let mut out = EcoString::new();
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push_str(&sep);
                }
                out.push_str(&arg_str(item));
            }
            Ok(Value::Str(out))
        })
        .constructor(|_, args| match args {
            [] => Ok(Value::str("")),
            [value] => Ok(Value::Str(arg_str(value))),
            _ => Err(HostError::Arity {
                name: "String".into(),
                expected: 1,
                found: args.len(),
            }),
        })
        .build()
}
