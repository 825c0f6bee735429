//! Math Class
//!
//! Constants: PI, E
//! Functions: abs, min, max, floor, ceil, round, sqrt, cbrt, pow, exp, log,
//!            log10, sin, cos, tan, asin, acos, atan, atan2, signum, random
//!
//! `abs`, `min` and `max` keep integral arguments integral; everything else
//! computes in double precision.

use std::sync::Arc;

use crate::casting;
use crate::values::{Class, ClassBuilder, DynamicObject, HostError, TypeHint, Value};

fn number(value: &Value) -> Result<f64, HostError> {
    casting::to_f64(value).map_err(|err| HostError::msg(err.to_string()))
}

fn integral(args: &[Value]) -> Option<Vec<i64>> {
    args.iter()
        .map(|arg| match arg {
            Value::Int(_) | Value::Long(_) | Value::Char(_) => arg.as_i64(),
            _ => None,
        })
        .collect()
}

/// Result of an integral operation, `Int` when every input was `Int`.
fn integral_result(args: &[Value], n: i64) -> Value {
    if args.iter().all(|arg| matches!(arg, Value::Int(_) | Value::Char(_))) {
        Value::Int(n as i32)
    } else {
        Value::Long(n)
    }
}

// ============================================================================
// Basic Operations
// ============================================================================

fn math_abs(args: &[Value]) -> Result<Value, HostError> {
    match integral(args).as_deref() {
        Some([n]) => Ok(integral_result(args, n.wrapping_abs())),
        _ => Ok(Value::Double(number(&args[0])?.abs())),
    }
}

fn math_min(args: &[Value]) -> Result<Value, HostError> {
    match integral(args).as_deref() {
        Some([a, b]) => Ok(integral_result(args, *a.min(b))),
        _ => Ok(Value::Double(number(&args[0])?.min(number(&args[1])?))),
    }
}

fn math_max(args: &[Value]) -> Result<Value, HostError> {
    match integral(args).as_deref() {
        Some([a, b]) => Ok(integral_result(args, *a.max(b))),
        _ => Ok(Value::Double(number(&args[0])?.max(number(&args[1])?))),
    }
}

fn unary(f: fn(f64) -> f64) -> impl Fn(&[Value]) -> Result<Value, HostError> + Send + Sync {
    move |args| Ok(Value::Double(f(number(&args[0])?)))
}

fn binary(f: fn(f64, f64) -> f64) -> impl Fn(&[Value]) -> Result<Value, HostError> + Send + Sync {
    move |args| Ok(Value::Double(f(number(&args[0])?, number(&args[1])?)))
}

// ============================================================================
// Rounding
// ============================================================================

fn math_round(args: &[Value]) -> Result<Value, HostError> {
    let value = number(&args[0])?;
    // Rounds half up, like Java's Math.round.
    Ok(Value::Long((value + 0.5).floor() as i64))
}

/// Cheap non-cryptographic generator; `Math.random()` only needs to be
/// different between calls.
fn math_random(_args: &[Value]) -> Result<Value, HostError> {
    use core::hash::{BuildHasher, Hasher};
    use std::sync::atomic::{AtomicU64, Ordering};
    static COUNTER: AtomicU64 = AtomicU64::new(0);
    let mut hasher = std::collections::hash_map::RandomState::new().build_hasher();
    hasher.write_u64(COUNTER.fetch_add(1, Ordering::Relaxed));
    Ok(Value::Double((hasher.finish() >> 11) as f64 / (1u64 << 53) as f64))
}

/// Builds `kestrel.lang.Math`.
pub fn build_math_class() -> Arc<Class> {
    ClassBuilder::<DynamicObject>::new("kestrel.lang.Math")
        .static_field("PI", Value::Double(std::f64::consts::PI))
        .static_field("E", Value::Double(std::f64::consts::E))
        .static_method("abs", Some(1), TypeHint::Any, math_abs)
        .static_method("min", Some(2), TypeHint::Any, math_min)
        .static_method("max", Some(2), TypeHint::Any, math_max)
        .static_method("round", Some(1), TypeHint::Long, math_round)
        .static_method("floor", Some(1), TypeHint::Double, unary(f64::floor))
        .static_method("ceil", Some(1), TypeHint::Double, unary(f64::ceil))
        .static_method("sqrt", Some(1), TypeHint::Double, unary(f64::sqrt))
        .static_method("cbrt", Some(1), TypeHint::Double, unary(f64::cbrt))
        .static_method("exp", Some(1), TypeHint::Double, unary(f64::exp))
        .static_method("log", Some(1), TypeHint::Double, unary(f64::ln))
        .static_method("log10", Some(1), TypeHint::Double, unary(f64::log10))
        .static_method("sin", Some(1), TypeHint::Double, unary(f64::sin))
        .static_method("cos", Some(1), TypeHint::Double, unary(f64::cos))
        .static_method("tan", Some(1), TypeHint::Double, unary(f64::tan))
        .static_method("asin", Some(1), TypeHint::Double, unary(f64::asin))
        .static_method("acos", Some(1), TypeHint::Double, unary(f64::acos))
        .static_method("atan", Some(1), TypeHint::Double, unary(f64::atan))
        .static_method("signum", Some(1), TypeHint::Double, unary(f64::signum))
        .static_method("pow", Some(2), TypeHint::Double, binary(f64::powf))
        .static_method("atan2", Some(2), TypeHint::Double, binary(f64::atan2))
        .static_method("random", Some(0), TypeHint::Double, math_random)
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(name: &str, args: &[Value]) -> Value {
        let class = build_math_class();
        let method = class.static_method(name, args.len()).unwrap();
        (method.func)(args).unwrap()
    }

    #[test]
    fn test_integral_arguments_stay_integral() {
        assert_eq!(call("abs", &[Value::Int(-3)]), Value::Int(3));
        assert_eq!(call("max", &[Value::Int(2), Value::Long(5)]), Value::Long(5));
        assert_eq!(call("min", &[Value::Double(2.5), Value::Int(1)]), Value::Double(1.0));
    }

    #[test]
    fn test_rounding_and_powers() {
        assert_eq!(call("round", &[Value::Double(2.5)]), Value::Long(3));
        assert_eq!(call("round", &[Value::Double(-2.5)]), Value::Long(-2));
        assert_eq!(call("sqrt", &[Value::Int(16)]), Value::Double(4.0));
        assert_eq!(call("pow", &[Value::Int(2), Value::Int(10)]), Value::Double(1024.0));
    }

    #[test]
    fn test_constants() {
        let class = build_math_class();
        assert_eq!(class.static_field("PI"), Some(&Value::Double(std::f64::consts::PI)));
    }

    #[test]
    fn test_random_is_in_unit_interval() {
        for _ in 0..100 {
            let Value::Double(r) = call("random", &[]) else {
                panic!("random should return a double");
            };
            assert!((0.0..1.0).contains(&r));
        }
    }
}
