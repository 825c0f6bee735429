//! List and map intrinsics, and the collection classes.
//!
//! Lists and maps are shared by reference: `list.add(x)` mutates the list
//! every holder of the value observes.

use ecow::eco_format;

use super::{Intrinsic, IntrinsicTarget, intrinsic_of};
use crate::accessor::{PropertyAccessError, PropertyAccessErrorKind};
use crate::casting;
use crate::evaluator::EvalErrorKind;
use crate::evaluator::operators::loose_eq;
use crate::values::{
    ClassBuilder, ClassRegistry, DynamicObject, HostError, ListRef, MapRef, TypeHint, Value, ValueMap,
};

const fn list(name: &'static str, arity: usize, func: super::IntrinsicFn) -> Intrinsic {
    intrinsic_of(IntrinsicTarget::List, name, arity, func)
}

const fn map(name: &'static str, arity: usize, func: super::IntrinsicFn) -> Intrinsic {
    intrinsic_of(IntrinsicTarget::Map, name, arity, func)
}

pub const LIST_INTRINSICS: &[Intrinsic] = &[
    list("size", 0, list_size),
    list("isEmpty", 0, list_is_empty),
    list("get", 1, list_get),
    list("set", 2, list_set),
    list("add", 1, list_add),
    list("add", 2, list_insert),
    list("addAll", 1, list_add_all),
    list("remove", 1, list_remove),
    list("contains", 1, list_contains),
    list("indexOf", 1, list_index_of),
    list("clear", 0, list_clear),
];

pub const MAP_INTRINSICS: &[Intrinsic] = &[
    map("size", 0, map_size),
    map("isEmpty", 0, map_is_empty),
    map("get", 1, map_get),
    map("put", 2, map_put),
    map("remove", 1, map_remove),
    map("containsKey", 1, map_contains_key),
    map("containsValue", 1, map_contains_value),
    map("keySet", 0, map_key_set),
    map("values", 0, map_values),
    map("clear", 0, map_clear),
];

fn this_list(this: &Value) -> Result<&ListRef, EvalErrorKind> {
    match this {
        Value::List(list) => Ok(list),
        other => Err(PropertyAccessError::new(
            "List",
            other.type_name(),
            PropertyAccessErrorKind::UnresolvableProperty,
        )
        .into()),
    }
}

fn this_map(this: &Value) -> Result<&MapRef, EvalErrorKind> {
    match this {
        Value::Map(map) => Ok(map),
        other => Err(PropertyAccessError::new(
            "Map",
            other.type_name(),
            PropertyAccessErrorKind::UnresolvableProperty,
        )
        .into()),
    }
}

fn list_index(index: &Value, len: usize, inclusive_end: bool) -> Result<usize, EvalErrorKind> {
    let n = casting::to_i64(index)?;
    let limit = if inclusive_end { len + 1 } else { len };
    usize::try_from(n)
        .ok()
        .filter(|i| *i < limit)
        .ok_or_else(|| {
            PropertyAccessError::new(
                "[]",
                "List",
                PropertyAccessErrorKind::IndexOutOfBounds { index: n, len },
            )
            .into()
        })
}

// ============================================================================
// List
// ============================================================================

fn list_size(this: &Value, _args: &[Value]) -> Result<Value, EvalErrorKind> {
    Ok(Value::Int(this_list(this)?.read().len() as i32))
}

fn list_is_empty(this: &Value, _args: &[Value]) -> Result<Value, EvalErrorKind> {
    Ok(Value::Bool(this_list(this)?.read().is_empty()))
}

fn list_get(this: &Value, args: &[Value]) -> Result<Value, EvalErrorKind> {
    let items = this_list(this)?.read();
    let i = list_index(&args[0], items.len(), false)?;
    Ok(items[i].clone())
}

fn list_set(this: &Value, args: &[Value]) -> Result<Value, EvalErrorKind> {
    let mut items = this_list(this)?.write();
    let i = list_index(&args[0], items.len(), false)?;
    Ok(std::mem::replace(&mut items[i], args[1].clone()))
}

fn list_add(this: &Value, args: &[Value]) -> Result<Value, EvalErrorKind> {
    this_list(this)?.write().push(args[0].clone());
    Ok(Value::Bool(true))
}

fn list_insert(this: &Value, args: &[Value]) -> Result<Value, EvalErrorKind> {
    let mut items = this_list(this)?.write();
    let i = list_index(&args[0], items.len(), true)?;
    items.insert(i, args[1].clone());
    Ok(Value::Null)
}

fn list_add_all(this: &Value, args: &[Value]) -> Result<Value, EvalErrorKind> {
    let extra: Vec<Value> = match &args[0] {
        Value::List(other) => other.read().clone(),
        Value::Array(arr) => arr.items.read().clone(),
        other => return Err(EvalErrorKind::NotIterable(other.type_name())),
    };
    let changed = !extra.is_empty();
    this_list(this)?.write().extend(extra);
    Ok(Value::Bool(changed))
}

/// `remove(int)` removes by position; any other argument removes the
/// first equal element.
fn list_remove(this: &Value, args: &[Value]) -> Result<Value, EvalErrorKind> {
    let mut items = this_list(this)?.write();
    match &args[0] {
        Value::Int(_) | Value::Long(_) => {
            let i = list_index(&args[0], items.len(), false)?;
            Ok(items.remove(i))
        }
        needle => match items.iter().position(|item| loose_eq(item, needle)) {
            Some(i) => {
                items.remove(i);
                Ok(Value::Bool(true))
            }
            None => Ok(Value::Bool(false)),
        },
    }
}

fn list_contains(this: &Value, args: &[Value]) -> Result<Value, EvalErrorKind> {
    let items = this_list(this)?.read();
    Ok(Value::Bool(items.iter().any(|item| loose_eq(item, &args[0]))))
}

fn list_index_of(this: &Value, args: &[Value]) -> Result<Value, EvalErrorKind> {
    let items = this_list(this)?.read();
    let found = items.iter().position(|item| loose_eq(item, &args[0]));
    Ok(Value::Int(found.map_or(-1, |i| i as i32)))
}

fn list_clear(this: &Value, _args: &[Value]) -> Result<Value, EvalErrorKind> {
    this_list(this)?.write().clear();
    Ok(Value::Null)
}

// ============================================================================
// Map
// ============================================================================

fn map_size(this: &Value, _args: &[Value]) -> Result<Value, EvalErrorKind> {
    Ok(Value::Int(this_map(this)?.read().len() as i32))
}

fn map_is_empty(this: &Value, _args: &[Value]) -> Result<Value, EvalErrorKind> {
    Ok(Value::Bool(this_map(this)?.read().is_empty()))
}

fn map_get(this: &Value, args: &[Value]) -> Result<Value, EvalErrorKind> {
    Ok(this_map(this)?.read().get(&args[0]).cloned().unwrap_or_default())
}

fn map_put(this: &Value, args: &[Value]) -> Result<Value, EvalErrorKind> {
    let previous = this_map(this)?.write().insert(args[0].clone(), args[1].clone());
    Ok(previous.unwrap_or_default())
}

fn map_remove(this: &Value, args: &[Value]) -> Result<Value, EvalErrorKind> {
    Ok(this_map(this)?.write().remove(&args[0]).unwrap_or_default())
}

fn map_contains_key(this: &Value, args: &[Value]) -> Result<Value, EvalErrorKind> {
    Ok(Value::Bool(this_map(this)?.read().contains_key(&args[0])))
}

fn map_contains_value(this: &Value, args: &[Value]) -> Result<Value, EvalErrorKind> {
    let map = this_map(this)?.read();
    Ok(Value::Bool(map.values().any(|v| loose_eq(v, &args[0]))))
}

fn map_key_set(this: &Value, _args: &[Value]) -> Result<Value, EvalErrorKind> {
    Ok(Value::list(this_map(this)?.read().keys().cloned().collect()))
}

fn map_values(this: &Value, _args: &[Value]) -> Result<Value, EvalErrorKind> {
    Ok(Value::list(this_map(this)?.read().values().cloned().collect()))
}

fn map_clear(this: &Value, _args: &[Value]) -> Result<Value, EvalErrorKind> {
    *this_map(this)?.write() = ValueMap::new();
    Ok(Value::Null)
}

// ============================================================================
// Classes
// ============================================================================

fn new_list(name: &str, args: &[Value]) -> Result<Value, HostError> {
    match args {
        [] | [Value::Int(_)] => Ok(Value::list(Vec::new())),
        [Value::List(other)] => Ok(Value::list(other.read().clone())),
        [Value::Array(arr)] => Ok(Value::list(arr.items.read().clone())),
        [other] => Err(HostError::Conversion {
            value: eco_format!("{}", other),
            target: name.into(),
        }),
        _ => Err(HostError::Arity {
            name: name.into(),
            expected: 1,
            found: args.len(),
        }),
    }
}

fn new_map(name: &str, args: &[Value]) -> Result<Value, HostError> {
    match args {
        [] | [Value::Int(_)] => Ok(Value::map(ValueMap::new())),
        [Value::Map(other)] => Ok(Value::map(other.read().clone())),
        [other] => Err(HostError::Conversion {
            value: eco_format!("{}", other),
            target: name.into(),
        }),
        _ => Err(HostError::Arity {
            name: name.into(),
            expected: 1,
            found: args.len(),
        }),
    }
}

/// Registers `List`, `ArrayList`, `Map` and `HashMap` in `kestrel.util`.
pub fn register_collections(registry: &mut ClassRegistry) {
    let list = ClassBuilder::<DynamicObject>::new("kestrel.util.List")
        .static_method("of", None, TypeHint::List, |args| Ok(Value::list(args.to_vec())))
        .build();
    let array_list = ClassBuilder::<DynamicObject>::new("kestrel.util.ArrayList")
        .extends(&list)
        .constructor(|_, args| new_list("ArrayList", args))
        .build();
    let map = ClassBuilder::<DynamicObject>::new("kestrel.util.Map")
        .static_method("of", None, TypeHint::Map, |args| {
            if args.len() % 2 != 0 {
                return Err(HostError::msg("Map.of expects key/value pairs"));
            }
            Ok(Value::map(
                args.chunks(2)
                    .map(|pair| (pair[0].clone(), pair[1].clone()))
                    .collect(),
            ))
        })
        .build();
    let hash_map = ClassBuilder::<DynamicObject>::new("kestrel.util.HashMap")
        .extends(&map)
        .constructor(|_, args| new_map("HashMap", args))
        .build();

    registry.register_auto_import(list);
    registry.register_auto_import(array_list);
    registry.register_auto_import(map);
    registry.register_auto_import(hash_map);
}
