//! Kestrel Standard Library
//!
//! Two kinds of built-ins live here:
//!
//! - **Classes** registered in every [`ClassRegistry`] created with
//!   [`ClassRegistry::with_builtins`]: `Math`, `String`, `Integer`, `Long`,
//!   `Double`, `Boolean`, `Object`, `List`, `Map`, `ArrayList`, `HashMap`.
//!   They expose static fields, static methods and constructors, and are
//!   importable by simple name.
//! - **Intrinsics**: the methods of built-in values (`"abc".length()`,
//!   `list.add(x)`, `map.keySet()`). Intrinsics are plain function pointers
//!   so cached accessors can hold them directly.

use core::fmt;

use crate::evaluator::EvalErrorKind;
use crate::values::{ClassRegistry, Value};

pub mod collections;
pub mod lang;
pub mod math;
pub mod string;

pub use collections::register_collections;
pub use lang::register_lang;
pub use math::build_math_class;

#[cfg(test)]
mod stdlib_test;

pub type IntrinsicFn = fn(&Value, &[Value]) -> Result<Value, EvalErrorKind>;

/// Which receivers an intrinsic applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntrinsicTarget {
    Str,
    List,
    Map,
    Any,
}

impl IntrinsicTarget {
    pub fn matches(self, value: &Value) -> bool {
        match self {
            IntrinsicTarget::Str => matches!(value, Value::Str(_)),
            IntrinsicTarget::List => matches!(value, Value::List(_)),
            IntrinsicTarget::Map => matches!(value, Value::Map(_)),
            IntrinsicTarget::Any => !value.is_null(),
        }
    }
}

/// A method of a built-in value type.
#[derive(Clone, Copy)]
pub struct Intrinsic {
    pub target: IntrinsicTarget,
    pub name: &'static str,
    pub arity: usize,
    pub func: IntrinsicFn,
}

impl fmt::Debug for Intrinsic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}.{}/{}", self.target, self.name, self.arity)
    }
}

const fn intrinsic_of(target: IntrinsicTarget, name: &'static str, arity: usize, func: IntrinsicFn) -> Intrinsic {
    Intrinsic {
        target,
        name,
        arity,
        func,
    }
}

const OBJECT_INTRINSICS: &[Intrinsic] = &[
    intrinsic_of(IntrinsicTarget::Any, "toString", 0, object_to_string),
    intrinsic_of(IntrinsicTarget::Any, "equals", 1, object_equals),
    intrinsic_of(IntrinsicTarget::Any, "hashCode", 0, object_hash_code),
];

fn object_to_string(this: &Value, _args: &[Value]) -> Result<Value, EvalErrorKind> {
    Ok(Value::Str(ecow::eco_format!("{}", this)))
}

fn object_equals(this: &Value, args: &[Value]) -> Result<Value, EvalErrorKind> {
    Ok(Value::Bool(crate::evaluator::operators::loose_eq(this, &args[0])))
}

fn object_hash_code(this: &Value, _args: &[Value]) -> Result<Value, EvalErrorKind> {
    use core::hash::{Hash, Hasher};
    let mut hasher = std::hash::DefaultHasher::new();
    ecow::eco_format!("{}", this).hash(&mut hasher);
    Ok(Value::Int(hasher.finish() as i32))
}

/// Looks up the intrinsic `name` taking `argc` arguments on `receiver`.
pub fn intrinsic(receiver: &Value, name: &str, argc: usize) -> Option<Intrinsic> {
    let table: &[Intrinsic] = match receiver {
        Value::Str(_) => string::INTRINSICS,
        Value::List(_) => collections::LIST_INTRINSICS,
        Value::Map(_) => collections::MAP_INTRINSICS,
        _ => &[],
    };
    table
        .iter()
        .chain(OBJECT_INTRINSICS)
        .find(|intrinsic| intrinsic.name == name && intrinsic.arity == argc)
        .copied()
}

/// Register every built-in class in `registry`, importable by simple name.
pub fn register_builtins(registry: &mut ClassRegistry) {
    registry.register_auto_import(build_math_class());
    register_lang(registry);
    register_collections(registry);
}
