//! String rendering of runtime values.
//!
//! `Display` produces what string concatenation and `toString()` observe:
//! strings render raw, doubles always carry a fractional part (`1.0`), lists
//! render as `[1, 2]` and maps as `{a=1, b=2}`.

use core::fmt;

use crate::values::value::Value;

/// Formats a floating point number so integral values keep a `.0` suffix.
pub fn format_double(f: &mut impl fmt::Write, value: f64) -> fmt::Result {
    if value.is_nan() {
        write!(f, "NaN")
    } else if value.is_infinite() {
        if value > 0.0 {
            write!(f, "Infinity")
        } else {
            write!(f, "-Infinity")
        }
    } else if value.fract() == 0.0 && value.abs() < 1e16 {
        write!(f, "{:.1}", value)
    } else {
        write!(f, "{}", value)
    }
}

fn format_float(f: &mut impl fmt::Write, value: f32) -> fmt::Result {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e7 {
        write!(f, "{:.1}", value)
    } else if value.is_finite() {
        write!(f, "{}", value)
    } else {
        format_double(f, value as f64)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Empty => Ok(()),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Char(c) => write!(f, "{}", c),
            Value::Int(n) => write!(f, "{}", n),
            Value::Long(n) => write!(f, "{}", n),
            Value::Float(n) => format_float(f, *n),
            Value::Double(n) => format_double(f, *n),
            Value::Str(s) => write!(f, "{}", s),
            Value::List(list) => write_seq(f, &list.read()),
            Value::Array(arr) => write_seq(f, &arr.items.read()),
            Value::Map(map) => {
                write!(f, "{{")?;
                for (i, (k, v)) in map.read().iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}={}", k, v)?;
                }
                write!(f, "}}")
            }
            Value::Object(obj) => obj.fmt_display(f),
            Value::Class(class) => write!(f, "class {}", class.name()),
            Value::Function(func) => write!(f, "function {}", func.name()),
        }
    }
}

fn write_seq(f: &mut fmt::Formatter<'_>, items: &[Value]) -> fmt::Result {
    write!(f, "[")?;
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", item)?;
    }
    write!(f, "]")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::values::{TypeHint, ValueMap};

    #[test]
    fn test_doubles_keep_fraction() {
        assert_eq!(Value::Double(1.0).to_string(), "1.0");
        assert_eq!(Value::Double(188.4).to_string(), "188.4");
        assert_eq!(Value::Double(-0.5).to_string(), "-0.5");
        assert_eq!(Value::Float(2.0).to_string(), "2.0");
        assert_eq!(Value::Double(f64::NAN).to_string(), "NaN");
    }

    #[test]
    fn test_containers() {
        let list = Value::list(vec![Value::Int(1), Value::str("a"), Value::Null]);
        assert_eq!(list.to_string(), "[1, a, null]");

        let map: ValueMap = [
            (Value::str("b"), Value::Int(2)),
            (Value::str("a"), Value::Int(1)),
        ]
        .into_iter()
        .collect();
        assert_eq!(Value::map(map).to_string(), "{b=2, a=1}");

        let arr = Value::array(TypeHint::Int, vec![Value::Int(3)]);
        assert_eq!(arr.to_string(), "[3]");
    }
}
