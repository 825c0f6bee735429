//! Segment resolution: deciding which step applies to a value, and applying
//! a step to a value.
//!
//! `select_*` functions inspect a live value and return the step that
//! resolves a segment against it; `apply_*` functions run a step. Applying a
//! freshly selected step never reports [`Replay::Stale`].

use std::sync::Arc;

use ecow::{EcoString, eco_format};
use hashbrown::HashMap;

use super::{PropertyAccessError, PropertyAccessErrorKind as Kind, Replay, RootStep, Step, StepInput};
use crate::ast::Segment;
use crate::casting;
use crate::evaluator::{Control, EvalErrorKind};
use crate::parser::context::Imports;
use crate::resolver::VariableResolverFactory;
use crate::stdlib;
use crate::values::{Class, ClassRegistry, HostError, HostObject, Value};

/// Everything a root segment may be resolved against.
#[derive(Clone, Copy)]
pub struct Lookup<'a> {
    pub ctx: &'a Value,
    pub factory: &'a dyn VariableResolverFactory,
    pub imports: &'a Imports,
    pub registry: &'a ClassRegistry,
    pub globals: &'a HashMap<EcoString, Value>,
}

impl Lookup<'_> {
    fn variable(&self, name: &str) -> Option<Value> {
        match self.factory.get_resolver(name) {
            Some(resolver) => Some(resolver.get_value()),
            None => self.globals.get(name).cloned(),
        }
    }

    fn is_variable(&self, name: &str) -> bool {
        self.factory.is_resolveable(name) || self.globals.contains_key(name)
    }

    /// True when `name` resolves before any class: a variable, or a
    /// property or key of the root object.
    fn shadows_class(&self, name: &str) -> bool {
        if self.is_variable(name) {
            return true;
        }
        match self.ctx {
            Value::Object(obj) => obj.class().property(name).is_some(),
            Value::Map(map) => map.read().get_str(name).is_some(),
            _ => false,
        }
    }

    pub fn class(&self, name: &str) -> Option<Arc<Class>> {
        self.imports.resolve(name, self.registry)
    }
}

fn host_error(what: &str, target: &EcoString, err: HostError) -> EvalErrorKind {
    EvalErrorKind::Host {
        message: eco_format!("error invoking `{}` on {}: {}", what, target, err),
        source: err,
    }
}

fn unresolvable(segment: impl Into<EcoString>, value: &Value) -> PropertyAccessError {
    PropertyAccessError::new(segment, value.type_name(), Kind::UnresolvableProperty)
}

// ============================================================================
// Roots
// ============================================================================

/// Resolves the root name of a path. Order: variable, property (or key)
/// of the root object, imported class, fully qualified class name formed
/// with the following segments.
pub fn select_root(
    name: &EcoString,
    segments: &[Segment],
    lookup: &Lookup<'_>,
) -> Result<(RootStep, usize), PropertyAccessError> {
    if lookup.is_variable(name) {
        return Ok((RootStep::Variable(name.clone()), 0));
    }
    match lookup.ctx {
        Value::Object(obj) if obj.class().property(name).is_some() => {
            return Ok((
                RootStep::ThisProperty {
                    class: obj.class().id(),
                    name: name.clone(),
                },
                0,
            ));
        }
        Value::Map(map) if map.read().get_str(name).is_some() => {
            return Ok((RootStep::ThisMapKey(name.clone()), 0));
        }
        _ => {}
    }
    if let Some(class) = lookup.class(name) {
        return Ok((class_root(class, name), 0));
    }
    if let Some((class, skip)) = scan_static(name, segments, lookup.registry) {
        return Ok((class_root(class, name), skip));
    }
    Err(unresolvable(name.clone(), lookup.ctx))
}

fn class_root(class: Arc<Class>, name: &EcoString) -> RootStep {
    RootStep::Class {
        class,
        name: Some(name.clone()),
    }
}

/// Walks backward over leading property segments looking for the longest
/// dotted prefix naming a registered class.
fn scan_static(
    name: &str,
    segments: &[Segment],
    registry: &ClassRegistry,
) -> Option<(Arc<Class>, usize)> {
    let dotted: Vec<&str> = segments
        .iter()
        .map_while(|segment| match segment {
            Segment::Property {
                name,
                null_safe: false,
            } => Some(name.as_str()),
            _ => None,
        })
        .collect();
    (1..=dotted.len()).rev().find_map(|take| {
        let mut candidate = EcoString::from(name);
        for part in &dotted[..take] {
            candidate.push('.');
            candidate.push_str(part);
        }
        registry.get(&candidate).map(|class| (class.clone(), take))
    })
}

/// Resolves `name(args)` at the root: a function variable, then a method
/// of the root object.
pub fn select_root_call(
    name: &EcoString,
    argc: usize,
    lookup: &Lookup<'_>,
) -> Result<RootStep, EvalErrorKind> {
    if let Some(value) = lookup.variable(name) {
        return match value {
            Value::Function(_) => Ok(RootStep::CallFunction(name.clone())),
            _ => Err(EvalErrorKind::NotCallable(name.clone())),
        };
    }
    if let Value::Object(obj) = lookup.ctx {
        if obj.class().method(name, argc).is_some() {
            return Ok(RootStep::ThisMethod {
                class: obj.class().id(),
                name: name.clone(),
            });
        }
    }
    Err(unresolvable(eco_format!("{}()", name), lookup.ctx).into())
}

/// Produces the root value. For [`RootStep::CallFunction`] the result is
/// the function itself; the caller invokes it. [`RootStep::Expression`] is
/// evaluated by the caller and never reaches this function.
pub fn apply_root(root: &RootStep, lookup: &Lookup<'_>, args: &[Value]) -> Result<Value, Replay> {
    match root {
        RootStep::This => Ok(lookup.ctx.clone()),
        RootStep::Variable(name) => lookup.variable(name).ok_or(Replay::Stale("variable")),
        RootStep::Indexed(slot) => lookup
            .factory
            .get_indexed_variable_resolver(*slot)
            .map(|resolver| resolver.get_value())
            .ok_or(Replay::Stale("indexed variable")),
        RootStep::ThisProperty { class, name } => {
            if lookup.is_variable(name) {
                return Err(Replay::Stale("shadowed property"));
            }
            match lookup.ctx {
                Value::Object(obj) if obj.class().id() == *class => {
                    get_property(obj.as_ref(), name).map_err(Replay::from)
                }
                _ => Err(Replay::Stale("root class")),
            }
        }
        RootStep::ThisMapKey(key) => {
            if lookup.is_variable(key) {
                return Err(Replay::Stale("shadowed key"));
            }
            match lookup.ctx {
                Value::Map(map) => map
                    .read()
                    .get_str(key)
                    .cloned()
                    .ok_or(Replay::Stale("missing root key")),
                _ => Err(Replay::Stale("root map")),
            }
        }
        RootStep::ThisMethod { class, name } => match lookup.ctx {
            Value::Object(obj) if obj.class().id() == *class => {
                call_method(obj.as_ref(), name, args)?.ok_or(Replay::Stale("root method"))
            }
            _ => Err(Replay::Stale("root class")),
        },
        RootStep::CallFunction(name) => match lookup.variable(name) {
            Some(function @ Value::Function(_)) => Ok(function),
            _ => Err(Replay::Stale("function variable")),
        },
        RootStep::Class { class, name } => match name {
            Some(name) if lookup.shadows_class(name) => Err(Replay::Stale("shadowed class")),
            _ => Ok(Value::Class(class.clone())),
        },
        RootStep::Expression => Ok(Value::Null),
    }
}

// ============================================================================
// Segments
// ============================================================================

/// Decides how `segment` resolves against `value`. `value` is not null.
pub fn select_step(
    value: &Value,
    segment: &Segment,
    argc: usize,
) -> Result<Step, PropertyAccessError> {
    match segment {
        Segment::Property { name, .. } => select_property(value, name),
        Segment::Index { .. } => match value {
            Value::List(_) => Ok(Step::ListIndex),
            Value::Array(_) => Ok(Step::ArrayIndex),
            Value::Map(_) => Ok(Step::MapIndex),
            Value::Str(_) => Ok(Step::StrIndex),
            _ => Err(PropertyAccessError::new(
                "[]",
                value.type_name(),
                Kind::NotIndexable,
            )),
        },
        Segment::Method { name, .. } => select_method(value, name, argc),
    }
}

fn select_property(value: &Value, name: &EcoString) -> Result<Step, PropertyAccessError> {
    match value {
        Value::Object(obj) if obj.class().property(name).is_some() => Ok(Step::Property {
            class: obj.class().id(),
            name: name.clone(),
        }),
        Value::Map(_) => Ok(Step::MapKey(name.clone())),
        Value::Array(_) if name.as_str() == "length" => Ok(Step::ArrayLength),
        Value::Class(class) if class.static_field(name).is_some() => Ok(Step::StaticField {
            class: class.id(),
            name: name.clone(),
        }),
        Value::Str(_) | Value::List(_) | Value::Array(_) => {
            // Bean-style reads of zero-argument intrinsics: `list.size`, `s.empty`.
            let bean = bean_name(name);
            stdlib::intrinsic(value, name, 0)
                .or_else(|| stdlib::intrinsic(value, &bean, 0))
                .map(Step::Intrinsic)
                .ok_or_else(|| unresolvable(name.clone(), value))
        }
        _ => Err(unresolvable(name.clone(), value)),
    }
}

fn bean_name(name: &str) -> EcoString {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => eco_format!("is{}{}", first.to_ascii_uppercase(), chars.as_str()),
        None => EcoString::new(),
    }
}

fn select_method(value: &Value, name: &EcoString, argc: usize) -> Result<Step, PropertyAccessError> {
    let step = match value {
        Value::Object(obj) if obj.class().method(name, argc).is_some() => Some(Step::Method {
            class: obj.class().id(),
            name: name.clone(),
        }),
        Value::Class(class) if class.static_method(name, argc).is_some() => {
            Some(Step::StaticMethod {
                class: class.id(),
                name: name.clone(),
            })
        }
        _ => None,
    };
    step.or_else(|| stdlib::intrinsic(value, name, argc).map(Step::Intrinsic))
        .ok_or_else(|| unresolvable(eco_format!("{}()", name), value))
}

fn get_property(obj: &dyn HostObject, name: &str) -> Result<Value, EvalErrorKind> {
    let class = obj.class();
    let property = class
        .property(name)
        .ok_or_else(|| PropertyAccessError::new(name, class.simple_name().clone(), Kind::UnresolvableProperty))?;
    (property.getter)(obj).map_err(|err| host_error(name, class.simple_name(), err))
}

/// Calls a host method; `None` when the class has no such overload.
fn call_method(obj: &dyn HostObject, name: &str, args: &[Value]) -> Result<Option<Value>, EvalErrorKind> {
    let class = obj.class();
    let Some(method) = class.method(name, args.len()) else {
        return Ok(None);
    };
    (method.func)(obj, args)
        .map(Some)
        .map_err(|err| host_error(name, class.simple_name(), err))
}

fn index_of(index: &Value, len: usize, container: &Value) -> Result<usize, EvalErrorKind> {
    let n = casting::to_i64(index)?;
    usize::try_from(n)
        .ok()
        .filter(|i| *i < len)
        .ok_or_else(|| {
            PropertyAccessError::new(
                "[]",
                container.type_name(),
                Kind::IndexOutOfBounds { index: n, len },
            )
            .into()
        })
}

/// Applies `step` to a non-null `value`.
pub fn apply_step(step: &Step, value: &Value, input: StepInput<'_>) -> Result<Value, Replay> {
    let args = match input {
        StepInput::Args(args) => args,
        _ => &[],
    };
    let index = match input {
        StepInput::Index(index) => Some(index),
        _ => None,
    };
    match (step, value) {
        (Step::Property { class, name }, Value::Object(obj)) if obj.class().id() == *class => {
            Ok(get_property(obj.as_ref(), name)?)
        }
        (Step::MapKey(key), Value::Map(map)) => {
            Ok(map.read().get_str(key).cloned().unwrap_or_default())
        }
        (Step::ArrayLength, Value::Array(arr)) => Ok(Value::Int(arr.len() as i32)),
        (Step::ListIndex, Value::List(list)) => {
            let index = index.ok_or(Replay::Stale("index input"))?;
            let items = list.read();
            let i = index_of(index, items.len(), value)?;
            Ok(items[i].clone())
        }
        (Step::ArrayIndex, Value::Array(arr)) => {
            let index = index.ok_or(Replay::Stale("index input"))?;
            let items = arr.items.read();
            let i = index_of(index, items.len(), value)?;
            Ok(items[i].clone())
        }
        (Step::MapIndex, Value::Map(map)) => {
            let index = index.ok_or(Replay::Stale("index input"))?;
            Ok(map.read().get(index).cloned().unwrap_or_default())
        }
        (Step::StrIndex, Value::Str(s)) => {
            let index = index.ok_or(Replay::Stale("index input"))?;
            let len = s.chars().count();
            let i = index_of(index, len, value)?;
            Ok(s.chars().nth(i).map(Value::Char).unwrap_or_default())
        }
        (Step::Method { class, name }, Value::Object(obj)) if obj.class().id() == *class => {
            call_method(obj.as_ref(), name, args)?.ok_or(Replay::Stale("method overload"))
        }
        (Step::Intrinsic(intrinsic), value) if intrinsic.target.matches(value) => {
            Ok((intrinsic.func)(value, args)?)
        }
        (Step::StaticField { class: id, name }, Value::Class(class)) if class.id() == *id => class
            .static_field(name)
            .cloned()
            .ok_or(Replay::Stale("static field")),
        (Step::StaticMethod { class: id, name }, Value::Class(class)) if class.id() == *id => {
            let method = class
                .static_method(name, args.len())
                .ok_or(Replay::Stale("static method"))?;
            (method.func)(args).map_err(|err| host_error(name, class.name(), err).into())
        }
        (step, _) => Err(Replay::Stale(step.name())),
    }
}

/// Resolves then applies, for callers that do not record steps.
pub fn resolve_step(
    value: &Value,
    segment: &Segment,
    input: StepInput<'_>,
) -> Result<(Step, Value), Control> {
    let argc = match input {
        StepInput::Args(args) => args.len(),
        _ => 0,
    };
    let step = select_step(value, segment, argc)?;
    match apply_step(&step, value, input) {
        Ok(result) => Ok((step, result)),
        Err(Replay::Failed(control)) => Err(control),
        Err(Replay::Stale(_)) => Err(unresolvable(segment.describe(), value).into()),
    }
}

// ============================================================================
// Writes
// ============================================================================

/// Stores `new_value` through the last segment of a path.
pub fn assign_segment(
    container: &Value,
    segment: &Segment,
    index: Option<&Value>,
    new_value: Value,
) -> Result<(), EvalErrorKind> {
    match (segment, container) {
        (Segment::Property { name, .. }, Value::Object(obj)) => {
            let class = obj.class();
            let property = class
                .property(name)
                .ok_or_else(|| unresolvable(name.clone(), container))?;
            let setter = property.setter.as_ref().ok_or_else(|| {
                PropertyAccessError::new(name.clone(), class.simple_name().clone(), Kind::ReadOnly)
            })?;
            let new_value = casting::coerce(new_value, &property.ty)?;
            setter(obj.as_ref(), new_value).map_err(|err| host_error(name, class.simple_name(), err))
        }
        (Segment::Property { name, .. }, Value::Map(map)) => {
            map.write().insert(Value::Str(name.clone()), new_value);
            Ok(())
        }
        (Segment::Index { .. }, Value::Map(map)) => {
            let key = index.cloned().unwrap_or_default();
            map.write().insert(key, new_value);
            Ok(())
        }
        (Segment::Index { .. }, Value::List(list)) => {
            let index = index.cloned().unwrap_or_default();
            let mut items = list.write();
            let i = index_of(&index, items.len(), container)?;
            items[i] = new_value;
            Ok(())
        }
        (Segment::Index { .. }, Value::Array(arr)) => {
            let index = index.cloned().unwrap_or_default();
            let new_value = casting::coerce(new_value, &arr.elem)?;
            let mut items = arr.items.write();
            let i = index_of(&index, items.len(), container)?;
            items[i] = new_value;
            Ok(())
        }
        (Segment::Property { name, .. }, Value::Class(class)) if class.static_field(name).is_some() => {
            Err(PropertyAccessError::new(name.clone(), class.simple_name().clone(), Kind::ReadOnly).into())
        }
        (Segment::Index { .. }, _) => {
            Err(PropertyAccessError::new("[]", container.type_name(), Kind::NotIndexable).into())
        }
        (segment, _) => Err(unresolvable(segment.describe(), container).into()),
    }
}
