//! Boxed-primitive classes: `Integer`, `Long`, `Double`, `Boolean`, plus
//! `Object` and `String`.
//!
//! These are static holders: `Integer.parseInt("7")`, `Long.MAX_VALUE`,
//! `Boolean.valueOf("true")`. Values themselves stay primitive.

use std::sync::Arc;

use ecow::eco_format;

use super::string::build_string_class;
use crate::casting::{self, CastError};
use crate::values::{Class, ClassBuilder, ClassRegistry, DynamicObject, HostError, TypeHint, Value};

fn conversion(err: CastError) -> HostError {
    HostError::msg(eco_format!("{}", err))
}

fn parse_radix(text: &Value, radix: &Value) -> Result<i64, HostError> {
    let text = text
        .as_str()
        .ok_or_else(|| HostError::msg("expected a string to parse"))?;
    let radix = casting::to_i64(radix).map_err(conversion)?;
    let radix = u32::try_from(radix)
        .ok()
        .filter(|r| (2..=36).contains(r))
        .ok_or_else(|| HostError::msg(eco_format!("invalid radix {}", radix)))?;
    i64::from_str_radix(text.trim(), radix).map_err(|_| HostError::Conversion {
        value: text.into(),
        target: "long".into(),
    })
}

fn build_integer_class() -> Arc<Class> {
    ClassBuilder::<DynamicObject>::new("kestrel.lang.Integer")
        .static_field("MAX_VALUE", Value::Int(i32::MAX))
        .static_field("MIN_VALUE", Value::Int(i32::MIN))
        .static_method("parseInt", Some(1), TypeHint::Int, |args| {
            match &args[0] {
                Value::Str(s) => s.trim().parse::<i32>().map(Value::Int).map_err(|_| HostError::Conversion {
                    value: s.clone(),
                    target: "int".into(),
                }),
                other => casting::to_i32(other).map(Value::Int).map_err(conversion),
            }
        })
        .static_method("parseInt", Some(2), TypeHint::Int, |args| {
            let n = parse_radix(&args[0], &args[1])?;
            i32::try_from(n).map(Value::Int).map_err(|_| HostError::Conversion {
                value: eco_format!("{}", n),
                target: "int".into(),
            })
        })
        .static_method("valueOf", Some(1), TypeHint::Int, |args| {
            casting::coerce(args[0].clone(), &TypeHint::Int).map_err(conversion)
        })
        .static_method("toString", Some(1), TypeHint::Str, |args| {
            Ok(Value::Str(eco_format!("{}", args[0])))
        })
        .build()
}

fn build_long_class() -> Arc<Class> {
    ClassBuilder::<DynamicObject>::new("kestrel.lang.Long")
        .static_field("MAX_VALUE", Value::Long(i64::MAX))
        .static_field("MIN_VALUE", Value::Long(i64::MIN))
        .static_method("parseLong", Some(1), TypeHint::Long, |args| {
            casting::to_i64(&args[0]).map(Value::Long).map_err(conversion)
        })
        .static_method("parseLong", Some(2), TypeHint::Long, |args| {
            parse_radix(&args[0], &args[1]).map(Value::Long)
        })
        .static_method("valueOf", Some(1), TypeHint::Long, |args| {
            casting::coerce(args[0].clone(), &TypeHint::Long).map_err(conversion)
        })
        .build()
}

fn build_double_class() -> Arc<Class> {
    ClassBuilder::<DynamicObject>::new("kestrel.lang.Double")
        .static_field("MAX_VALUE", Value::Double(f64::MAX))
        .static_field("MIN_VALUE", Value::Double(f64::MIN_POSITIVE))
        .static_field("NaN", Value::Double(f64::NAN))
        .static_field("POSITIVE_INFINITY", Value::Double(f64::INFINITY))
        .static_field("NEGATIVE_INFINITY", Value::Double(f64::NEG_INFINITY))
        .static_method("parseDouble", Some(1), TypeHint::Double, |args| {
            casting::to_f64(&args[0]).map(Value::Double).map_err(conversion)
        })
        .static_method("valueOf", Some(1), TypeHint::Double, |args| {
            casting::coerce(args[0].clone(), &TypeHint::Double).map_err(conversion)
        })
        .static_method("isNaN", Some(1), TypeHint::Bool, |args| {
            Ok(Value::Bool(args[0].as_f64().is_some_and(f64::is_nan)))
        })
        .build()
}

fn build_boolean_class() -> Arc<Class> {
    ClassBuilder::<DynamicObject>::new("kestrel.lang.Boolean")
        .static_field("TRUE", Value::Bool(true))
        .static_field("FALSE", Value::Bool(false))
        .static_method("parseBoolean", Some(1), TypeHint::Bool, |args| {
            Ok(Value::Bool(
                args[0].as_str().is_some_and(|s| s.eq_ignore_ascii_case("true")),
            ))
        })
        .static_method("valueOf", Some(1), TypeHint::Bool, |args| {
            casting::to_bool(&args[0]).map(Value::Bool).map_err(conversion)
        })
        .build()
}

/// `Object` matches every non-null value in `instanceof`; `new Object()`
/// yields an empty slot object.
fn build_object_class() -> Arc<Class> {
    ClassBuilder::<DynamicObject>::new("kestrel.lang.Object")
        .slot_constructor()
        .build()
}

/// Registers the `kestrel.lang` classes.
pub fn register_lang(registry: &mut ClassRegistry) {
    registry.register_auto_import(build_object_class());
    registry.register_auto_import(build_string_class());
    registry.register_auto_import(build_integer_class());
    registry.register_auto_import(build_long_class());
    registry.register_auto_import(build_double_class());
    registry.register_auto_import(build_boolean_class());
}
