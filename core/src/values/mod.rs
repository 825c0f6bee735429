//! Runtime values and the host object model.

pub mod display;
pub mod function;
pub mod host;
pub mod types;
pub mod value;

pub use function::{Function, NativeFunction, ScriptFunction};
pub use host::{
    Class, ClassBuilder, ClassId, ClassRegistry, DynamicObject, HostError, HostObject, Method,
    Property, StaticMethod,
};
pub use types::TypeHint;
pub use value::{ArrayValue, ListRef, MapRef, Value, ValueKind, ValueMap};

#[cfg(test)]
mod value_test;
