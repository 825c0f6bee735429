use core::fmt;
use std::sync::Arc;

use ecow::EcoString;
use hashbrown::HashMap;
use parking_lot::RwLock;

use crate::values::function::Function;
use crate::values::host::{Class, ClassId, HostObject};
use crate::values::types::TypeHint;

/// Shared, mutable list storage. Lists have reference semantics: every copy of
/// a `Value::List` observes mutations made through any other copy.
pub type ListRef = Arc<RwLock<Vec<Value>>>;

/// Shared, mutable map storage with the same reference semantics as lists.
pub type MapRef = Arc<RwLock<ValueMap>>;

/// A runtime value.
///
/// Scalars are stored inline; containers and host objects are reference
/// counted so cloning a `Value` is always cheap.
#[derive(Clone, Default)]
pub enum Value {
    #[default]
    Null,
    /// The `empty` literal. Only meaningful as a comparison operand.
    Empty,
    Bool(bool),
    Char(char),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Str(EcoString),
    List(ListRef),
    Map(MapRef),
    Array(Arc<ArrayValue>),
    Object(Arc<dyn HostObject>),
    Class(Arc<Class>),
    Function(Arc<Function>),
}

static_assertions::assert_impl_all!(Value: Send, Sync);

/// Coarse runtime category of a value, used by cached accessors to detect
/// that the shape of their input changed since they were built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Null,
    Empty,
    Bool,
    Char,
    Int,
    Long,
    Float,
    Double,
    Str,
    List,
    Map,
    Array,
    Object(ClassId),
    Class,
    Function,
}

/// Fixed-length array with a declared element type.
#[derive(Debug)]
pub struct ArrayValue {
    pub elem: TypeHint,
    pub items: RwLock<Vec<Value>>,
}

impl ArrayValue {
    pub fn new(elem: TypeHint, items: Vec<Value>) -> Self {
        Self {
            elem,
            items: RwLock::new(items),
        }
    }

    pub fn len(&self) -> usize {
        self.items.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.read().is_empty()
    }
}

impl Value {
    pub fn str(s: impl Into<EcoString>) -> Value {
        Value::Str(s.into())
    }

    pub fn list(items: Vec<Value>) -> Value {
        Value::List(Arc::new(RwLock::new(items)))
    }

    pub fn map(map: ValueMap) -> Value {
        Value::Map(Arc::new(RwLock::new(map)))
    }

    pub fn array(elem: TypeHint, items: Vec<Value>) -> Value {
        Value::Array(Arc::new(ArrayValue::new(elem, items)))
    }

    pub fn object<T: HostObject>(obj: T) -> Value {
        Value::Object(Arc::new(obj))
    }

    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Null => ValueKind::Null,
            Value::Empty => ValueKind::Empty,
            Value::Bool(_) => ValueKind::Bool,
            Value::Char(_) => ValueKind::Char,
            Value::Int(_) => ValueKind::Int,
            Value::Long(_) => ValueKind::Long,
            Value::Float(_) => ValueKind::Float,
            Value::Double(_) => ValueKind::Double,
            Value::Str(_) => ValueKind::Str,
            Value::List(_) => ValueKind::List,
            Value::Map(_) => ValueKind::Map,
            Value::Array(_) => ValueKind::Array,
            Value::Object(obj) => ValueKind::Object(obj.class().id()),
            Value::Class(_) => ValueKind::Class,
            Value::Function(_) => ValueKind::Function,
        }
    }

    /// The statically describable type of this runtime value.
    pub fn type_hint(&self) -> TypeHint {
        match self {
            Value::Null | Value::Empty => TypeHint::Null,
            Value::Bool(_) => TypeHint::Bool,
            Value::Char(_) => TypeHint::Char,
            Value::Int(_) => TypeHint::Int,
            Value::Long(_) => TypeHint::Long,
            Value::Float(_) => TypeHint::Float,
            Value::Double(_) => TypeHint::Double,
            Value::Str(_) => TypeHint::Str,
            Value::List(_) => TypeHint::List,
            Value::Map(_) => TypeHint::Map,
            Value::Array(arr) => TypeHint::Array(Box::new(arr.elem.clone())),
            Value::Object(obj) => TypeHint::Class(obj.class().name().clone()),
            Value::Class(_) => TypeHint::Class(EcoString::from("kestrel.lang.Class")),
            Value::Function(_) => TypeHint::Function,
        }
    }

    /// Human readable type name used in error messages.
    pub fn type_name(&self) -> EcoString {
        match self {
            Value::Null => "null".into(),
            Value::Empty => "empty".into(),
            Value::Object(obj) => obj.class().simple_name().clone(),
            Value::Class(_) => "Class".into(),
            other => ecow::eco_format!("{}", other.type_hint()),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            Value::Char(_)
                | Value::Int(_)
                | Value::Long(_)
                | Value::Float(_)
                | Value::Double(_)
        )
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Integral view of an integral value (`Char`, `Int`, `Long`).
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Char(c) => Some(*c as i64),
            Value::Int(n) => Some(*n as i64),
            Value::Long(n) => Some(*n),
            _ => None,
        }
    }

    /// Floating point view of any numeric value.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f as f64),
            Value::Double(d) => Some(*d),
            other => other.as_i64().map(|n| n as f64),
        }
    }

    pub fn as_object(&self) -> Option<&Arc<dyn HostObject>> {
        match self {
            Value::Object(obj) => Some(obj),
            _ => None,
        }
    }

    /// Downcast a host object value to its concrete Rust type.
    pub fn downcast_ref<T: HostObject>(&self) -> Option<&T> {
        self.as_object()?.as_any().downcast_ref::<T>()
    }

    /// Whether this value matches the `empty` literal: null, blank strings,
    /// zero, false and empty containers.
    pub fn is_empty_value(&self) -> bool {
        match self {
            Value::Null | Value::Empty => true,
            Value::Bool(b) => !*b,
            Value::Char(c) => *c == '\0',
            Value::Int(n) => *n == 0,
            Value::Long(n) => *n == 0,
            Value::Float(f) => *f == 0.0,
            Value::Double(d) => *d == 0.0,
            Value::Str(s) => s.trim().is_empty(),
            Value::List(list) => list.read().is_empty(),
            Value::Map(map) => map.read().is_empty(),
            Value::Array(arr) => arr.is_empty(),
            Value::Object(_) | Value::Class(_) | Value::Function(_) => false,
        }
    }

    /// Identity comparison for reference values, value comparison otherwise.
    pub fn same_ref(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::List(a), Value::List(b)) => Arc::ptr_eq(a, b),
            (Value::Map(a), Value::Map(b)) => Arc::ptr_eq(a, b),
            (Value::Array(a), Value::Array(b)) => Arc::ptr_eq(a, b),
            (Value::Object(a), Value::Object(b)) => {
                Arc::as_ptr(a) as *const () == Arc::as_ptr(b) as *const ()
            }
            (Value::Class(a), Value::Class(b)) => a.id() == b.id(),
            (Value::Function(a), Value::Function(b)) => Arc::ptr_eq(a, b),
            (a, b) => a == b,
        }
    }
}

/// Strict structural equality: variants must match exactly (`Int(1)` is not
/// equal to `Long(1)`). Language-level equality with numeric promotion lives
/// in the evaluator.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) | (Value::Empty, Value::Empty) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Char(a), Value::Char(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Long(a), Value::Long(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Double(a), Value::Double(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::List(a), Value::List(b)) => {
                Arc::ptr_eq(a, b) || *a.read() == *b.read()
            }
            (Value::Map(a), Value::Map(b)) => Arc::ptr_eq(a, b) || *a.read() == *b.read(),
            (Value::Array(a), Value::Array(b)) => {
                Arc::ptr_eq(a, b) || *a.items.read() == *b.items.read()
            }
            (Value::Object(_), Value::Object(_))
            | (Value::Class(_), Value::Class(_))
            | (Value::Function(_), Value::Function(_)) => self.same_ref(other),
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "Null"),
            Value::Empty => write!(f, "Empty"),
            Value::Bool(b) => write!(f, "Bool({})", b),
            Value::Char(c) => write!(f, "Char({:?})", c),
            Value::Int(n) => write!(f, "Int({})", n),
            Value::Long(n) => write!(f, "Long({})", n),
            Value::Float(n) => write!(f, "Float({:?})", n),
            Value::Double(n) => write!(f, "Double({:?})", n),
            Value::Str(s) => write!(f, "Str({:?})", s),
            Value::List(list) => f.debug_tuple("List").field(&*list.read()).finish(),
            Value::Map(map) => f.debug_tuple("Map").field(&*map.read()).finish(),
            Value::Array(arr) => f
                .debug_struct("Array")
                .field("elem", &arr.elem)
                .field("items", &*arr.items.read())
                .finish(),
            Value::Object(obj) => write!(f, "Object({:?})", obj),
            Value::Class(class) => write!(f, "Class({})", class.name()),
            Value::Function(func) => write!(f, "Function({})", func.name()),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Int(n)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Long(n)
    }
}

impl From<f64> for Value {
    fn from(d: f64) -> Self {
        Value::Double(d)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.into())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s.into())
    }
}

impl From<EcoString> for Value {
    fn from(s: EcoString) -> Self {
        Value::Str(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::list(items)
    }
}

// ============================================================================
// Maps
// ============================================================================

/// Hash key derived from a map key value.
///
/// Integral keys are normalized so that `m[1]` and `m[1L]` address the same
/// entry. Containers and host objects hash by identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum MapKey {
    Null,
    Bool(bool),
    Char(char),
    Integral(i64),
    Float(u64),
    Str(EcoString),
    Identity(usize),
}

impl MapKey {
    fn of(value: &Value) -> MapKey {
        match value {
            Value::Null | Value::Empty => MapKey::Null,
            Value::Bool(b) => MapKey::Bool(*b),
            Value::Char(c) => MapKey::Char(*c),
            Value::Int(n) => MapKey::Integral(*n as i64),
            Value::Long(n) => MapKey::Integral(*n),
            Value::Float(f) => MapKey::Float((*f as f64).to_bits()),
            Value::Double(d) => MapKey::Float(d.to_bits()),
            Value::Str(s) => MapKey::Str(s.clone()),
            Value::List(l) => MapKey::Identity(Arc::as_ptr(l) as *const () as usize),
            Value::Map(m) => MapKey::Identity(Arc::as_ptr(m) as *const () as usize),
            Value::Array(a) => MapKey::Identity(Arc::as_ptr(a) as *const () as usize),
            Value::Object(o) => MapKey::Identity(Arc::as_ptr(o) as *const () as usize),
            Value::Class(c) => MapKey::Identity(Arc::as_ptr(c) as *const () as usize),
            Value::Function(func) => MapKey::Identity(Arc::as_ptr(func) as *const () as usize),
        }
    }
}

/// Insertion-ordered map from values to values.
#[derive(Default, Clone)]
pub struct ValueMap {
    entries: Vec<(Value, Value)>,
    index: HashMap<MapKey, usize>,
}

impl ValueMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &Value) -> Option<&Value> {
        self.index
            .get(&MapKey::of(key))
            .map(|&slot| &self.entries[slot].1)
    }

    pub fn get_str(&self, key: &str) -> Option<&Value> {
        self.index
            .get(&MapKey::Str(key.into()))
            .map(|&slot| &self.entries[slot].1)
    }

    pub fn contains_key(&self, key: &Value) -> bool {
        self.index.contains_key(&MapKey::of(key))
    }

    /// Insert or replace, returning the previous value. Replacing keeps the
    /// entry's original position.
    pub fn insert(&mut self, key: Value, value: Value) -> Option<Value> {
        let map_key = MapKey::of(&key);
        if let Some(&slot) = self.index.get(&map_key) {
            return Some(core::mem::replace(&mut self.entries[slot].1, value));
        }
        self.index.insert(map_key, self.entries.len());
        self.entries.push((key, value));
        None
    }

    pub fn remove(&mut self, key: &Value) -> Option<Value> {
        let slot = self.index.remove(&MapKey::of(key))?;
        let (_, value) = self.entries.remove(slot);
        for position in self.index.values_mut() {
            if *position > slot {
                *position -= 1;
            }
        }
        Some(value)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Value, &Value)> {
        self.entries.iter().map(|(k, v)| (k, v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &Value> {
        self.entries.iter().map(|(k, _)| k)
    }

    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.entries.iter().map(|(_, v)| v)
    }
}

impl PartialEq for ValueMap {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self
                .iter()
                .all(|(k, v)| other.get(k).is_some_and(|ov| ov == v))
    }
}

impl fmt::Debug for ValueMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl FromIterator<(Value, Value)> for ValueMap {
    fn from_iter<I: IntoIterator<Item = (Value, Value)>>(iter: I) -> Self {
        let mut map = ValueMap::new();
        for (k, v) in iter {
            map.insert(k, v);
        }
        map
    }
}
