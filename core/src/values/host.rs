//! Host object model.
//!
//! Rust has no runtime reflection, so host types describe themselves through
//! a [`Class`]: a table of named properties, methods, static members and an
//! optional constructor. Property paths and accessors resolve against these
//! tables at runtime, keyed by the object's [`ClassId`].

use core::any::Any;
use core::fmt;
use core::marker::PhantomData;
use core::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use ecow::EcoString;
use hashbrown::HashMap;
use parking_lot::RwLock;
use thiserror::Error;

use crate::values::types::TypeHint;
use crate::values::value::Value;

/// An object owned by the embedding application.
pub trait HostObject: Any + Send + Sync + fmt::Debug {
    fn class(&self) -> &Arc<Class>;

    fn as_any(&self) -> &dyn Any;

    /// Rendering used by string concatenation and `toString()`.
    fn fmt_display(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{:x}", self.class().simple_name(), self as *const Self as *const () as usize)
    }
}

/// Errors raised by host callbacks.
#[derive(Debug, Error)]
pub enum HostError {
    #[error("{0}")]
    Message(EcoString),

    #[error("receiver is not an instance of `{expected}`")]
    WrongReceiver { expected: EcoString },

    #[error("`{name}` expects {expected} argument(s), got {found}")]
    Arity {
        name: EcoString,
        expected: usize,
        found: usize,
    },

    #[error("property `{0}` is read-only")]
    ReadOnly(EcoString),

    #[error("cannot convert {value} to {target}")]
    Conversion { value: EcoString, target: EcoString },

    #[error(transparent)]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

impl HostError {
    pub fn msg(message: impl Into<EcoString>) -> Self {
        HostError::Message(message.into())
    }
}

pub type Getter = Arc<dyn Fn(&dyn HostObject) -> Result<Value, HostError> + Send + Sync>;
pub type Setter = Arc<dyn Fn(&dyn HostObject, Value) -> Result<(), HostError> + Send + Sync>;
pub type MethodFn =
    Arc<dyn Fn(&dyn HostObject, &[Value]) -> Result<Value, HostError> + Send + Sync>;
pub type StaticFn = Arc<dyn Fn(&[Value]) -> Result<Value, HostError> + Send + Sync>;
pub type ConstructorFn =
    Arc<dyn Fn(&Arc<Class>, &[Value]) -> Result<Value, HostError> + Send + Sync>;

/// Process-unique class identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClassId(u64);

impl ClassId {
    fn next() -> ClassId {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        ClassId(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

#[derive(Clone)]
pub struct Property {
    pub name: EcoString,
    pub ty: TypeHint,
    pub getter: Getter,
    pub setter: Option<Setter>,
}

#[derive(Clone)]
pub struct Method {
    pub name: EcoString,
    /// `None` accepts any number of arguments.
    pub arity: Option<usize>,
    pub ret: TypeHint,
    pub func: MethodFn,
}

#[derive(Clone)]
pub struct StaticMethod {
    pub name: EcoString,
    pub arity: Option<usize>,
    pub ret: TypeHint,
    pub func: StaticFn,
}

pub struct Class {
    id: ClassId,
    name: EcoString,
    simple_name: EcoString,
    parent: Option<Arc<Class>>,
    properties: HashMap<EcoString, Property>,
    methods: HashMap<EcoString, Vec<Method>>,
    static_fields: HashMap<EcoString, Value>,
    static_methods: HashMap<EcoString, Vec<StaticMethod>>,
    constructor: Option<ConstructorFn>,
    /// Field names of slot-backed classes, parent fields first.
    slots: Vec<EcoString>,
}

impl Class {
    pub fn id(&self) -> ClassId {
        self.id
    }

    /// Fully qualified name, e.g. `kestrel.lang.Math`.
    pub fn name(&self) -> &EcoString {
        &self.name
    }

    pub fn simple_name(&self) -> &EcoString {
        &self.simple_name
    }

    pub fn parent(&self) -> Option<&Arc<Class>> {
        self.parent.as_ref()
    }

    fn ancestry(&self) -> impl Iterator<Item = &Class> {
        core::iter::successors(Some(self), |class| class.parent.as_deref())
    }

    pub fn property(&self, name: &str) -> Option<&Property> {
        self.ancestry().find_map(|class| class.properties.get(name))
    }

    pub fn has_methods_named(&self, name: &str) -> bool {
        self.ancestry().any(|class| class.methods.contains_key(name))
    }

    /// Finds the nearest method named `name` that accepts `argc` arguments.
    pub fn method(&self, name: &str, argc: usize) -> Option<&Method> {
        self.ancestry().find_map(|class| {
            class
                .methods
                .get(name)?
                .iter()
                .find(|m| m.arity.is_none_or(|n| n == argc))
        })
    }

    pub fn static_field(&self, name: &str) -> Option<&Value> {
        self.ancestry().find_map(|class| class.static_fields.get(name))
    }

    pub fn static_method(&self, name: &str, argc: usize) -> Option<&StaticMethod> {
        self.ancestry().find_map(|class| {
            class
                .static_methods
                .get(name)?
                .iter()
                .find(|m| m.arity.is_none_or(|n| n == argc))
        })
    }

    pub fn has_static_member(&self, name: &str) -> bool {
        self.ancestry().any(|class| {
            class.static_fields.contains_key(name) || class.static_methods.contains_key(name)
        })
    }

    pub fn constructor(&self) -> Option<&ConstructorFn> {
        self.constructor.as_ref()
    }

    pub fn slot_of(&self, field: &str) -> Option<usize> {
        self.slots.iter().position(|s| s.as_str() == field)
    }

    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// Whether `self` is `other` or one of its descendants.
    pub fn is_subclass_of(&self, other: &Class) -> bool {
        self.ancestry().any(|class| class.id == other.id)
    }

    /// Like [`Class::is_subclass_of`], matching by fully qualified or simple name.
    pub fn is_named_or_extends(&self, name: &str) -> bool {
        self.ancestry()
            .any(|class| class.name.as_str() == name || class.simple_name.as_str() == name)
    }

    /// Creates an instance through the registered constructor.
    pub fn instantiate(self: &Arc<Self>, args: &[Value]) -> Result<Value, HostError> {
        match &self.constructor {
            Some(ctor) => ctor(self, args),
            None => Err(HostError::Message(ecow::eco_format!(
                "class `{}` has no constructor",
                self.name
            ))),
        }
    }
}

impl fmt::Debug for Class {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Class")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("parent", &self.parent.as_ref().map(|p| p.name.clone()))
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Builder
// ============================================================================

/// Builds a [`Class`] whose instance members downcast the receiver to `T`.
pub struct ClassBuilder<T> {
    name: EcoString,
    parent: Option<Arc<Class>>,
    properties: HashMap<EcoString, Property>,
    methods: HashMap<EcoString, Vec<Method>>,
    static_fields: HashMap<EcoString, Value>,
    static_methods: HashMap<EcoString, Vec<StaticMethod>>,
    constructor: Option<ConstructorFn>,
    slots: Vec<EcoString>,
    _marker: PhantomData<fn(&T)>,
}

fn downcast<'a, T: HostObject>(obj: &'a dyn HostObject, class: &EcoString) -> Result<&'a T, HostError> {
    obj.as_any()
        .downcast_ref::<T>()
        .ok_or_else(|| HostError::WrongReceiver {
            expected: class.clone(),
        })
}

impl<T: HostObject> ClassBuilder<T> {
    pub fn new(name: impl Into<EcoString>) -> Self {
        Self {
            name: name.into(),
            parent: None,
            properties: HashMap::new(),
            methods: HashMap::new(),
            static_fields: HashMap::new(),
            static_methods: HashMap::new(),
            constructor: None,
            slots: Vec::new(),
            _marker: PhantomData,
        }
    }

    pub fn extends(mut self, parent: &Arc<Class>) -> Self {
        self.slots = parent.slots.clone();
        self.parent = Some(parent.clone());
        self
    }

    pub fn property(
        self,
        name: &str,
        ty: TypeHint,
        getter: impl Fn(&T) -> Value + Send + Sync + 'static,
    ) -> Self {
        let class = self.name.clone();
        self.raw_property(
            name,
            ty,
            Arc::new(move |obj| Ok(getter(downcast::<T>(obj, &class)?))),
            None,
        )
    }

    pub fn property_mut(
        self,
        name: &str,
        ty: TypeHint,
        getter: impl Fn(&T) -> Value + Send + Sync + 'static,
        setter: impl Fn(&T, Value) -> Result<(), HostError> + Send + Sync + 'static,
    ) -> Self {
        let get_class = self.name.clone();
        let set_class = self.name.clone();
        self.raw_property(
            name,
            ty,
            Arc::new(move |obj| Ok(getter(downcast::<T>(obj, &get_class)?))),
            Some(Arc::new(move |obj, value| {
                setter(downcast::<T>(obj, &set_class)?, value)
            })),
        )
    }

    fn raw_property(
        mut self,
        name: &str,
        ty: TypeHint,
        getter: Getter,
        setter: Option<Setter>,
    ) -> Self {
        let name = EcoString::from(name);
        self.properties.insert(
            name.clone(),
            Property {
                name,
                ty,
                getter,
                setter,
            },
        );
        self
    }

    pub fn method(
        mut self,
        name: &str,
        arity: Option<usize>,
        ret: TypeHint,
        func: impl Fn(&T, &[Value]) -> Result<Value, HostError> + Send + Sync + 'static,
    ) -> Self {
        let class = self.name.clone();
        let name = EcoString::from(name);
        self.methods.entry(name.clone()).or_default().push(Method {
            name,
            arity,
            ret,
            func: Arc::new(move |obj, args| func(downcast::<T>(obj, &class)?, args)),
        });
        self
    }

    pub fn static_field(mut self, name: &str, value: Value) -> Self {
        self.static_fields.insert(name.into(), value);
        self
    }

    pub fn static_method(
        mut self,
        name: &str,
        arity: Option<usize>,
        ret: TypeHint,
        func: impl Fn(&[Value]) -> Result<Value, HostError> + Send + Sync + 'static,
    ) -> Self {
        let name = EcoString::from(name);
        self.static_methods
            .entry(name.clone())
            .or_default()
            .push(StaticMethod {
                name,
                arity,
                ret,
                func: Arc::new(func),
            });
        self
    }

    pub fn constructor(
        mut self,
        ctor: impl Fn(&Arc<Class>, &[Value]) -> Result<Value, HostError> + Send + Sync + 'static,
    ) -> Self {
        self.constructor = Some(Arc::new(ctor));
        self
    }

    pub fn build(self) -> Arc<Class> {
        let simple_name = self
            .name
            .rsplit('.')
            .next()
            .map(EcoString::from)
            .unwrap_or_else(|| self.name.clone());
        Arc::new(Class {
            id: ClassId::next(),
            name: self.name,
            simple_name,
            parent: self.parent,
            properties: self.properties,
            methods: self.methods,
            static_fields: self.static_fields,
            static_methods: self.static_methods,
            constructor: self.constructor,
            slots: self.slots,
        })
    }
}

// ============================================================================
// Slot-backed objects
// ============================================================================

/// A host object whose fields live in slots described by its class.
///
/// Useful for tests and for embedders that want bean-like records without
/// writing a Rust type per class.
#[derive(Debug)]
pub struct DynamicObject {
    class: Arc<Class>,
    slots: RwLock<Vec<Value>>,
}

impl DynamicObject {
    /// Creates an instance with every slot set to null, then applies the
    /// given `(field, value)` pairs.
    pub fn new<'a>(
        class: &Arc<Class>,
        fields: impl IntoIterator<Item = (&'a str, Value)>,
    ) -> Result<DynamicObject, HostError> {
        let obj = DynamicObject {
            class: class.clone(),
            slots: RwLock::new(vec![Value::Null; class.slot_count()]),
        };
        for (name, value) in fields {
            obj.set(name, value)?;
        }
        Ok(obj)
    }

    pub fn get(&self, field: &str) -> Option<Value> {
        let slot = self.class.slot_of(field)?;
        self.slots.read().get(slot).cloned()
    }

    pub fn set(&self, field: &str, value: Value) -> Result<(), HostError> {
        let slot = self.class.slot_of(field).ok_or_else(|| {
            HostError::Message(ecow::eco_format!(
                "`{}` has no field `{}`",
                self.class.name(),
                field
            ))
        })?;
        let mut slots = self.slots.write();
        if let Some(cell) = slots.get_mut(slot) {
            *cell = value;
        }
        Ok(())
    }
}

impl HostObject for DynamicObject {
    fn class(&self) -> &Arc<Class> {
        &self.class
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn fmt_display(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{{", self.class.simple_name())?;
        let slots = self.slots.read();
        for (i, (name, value)) in self.class.slots.iter().zip(slots.iter()).enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}={}", name, value)?;
        }
        write!(f, "}}")
    }
}

impl ClassBuilder<DynamicObject> {
    /// Declares a read/write field stored in the next free slot.
    ///
    /// Fields are positional constructor arguments in declaration order.
    pub fn field(mut self, name: &str, ty: TypeHint) -> Self {
        let slot = self.slots.len();
        self.slots.push(name.into());
        let class = self.name.clone();
        let get_class = class.clone();
        self.raw_property(
            name,
            ty,
            Arc::new(move |obj| {
                let obj = downcast::<DynamicObject>(obj, &get_class)?;
                Ok(obj.slots.read().get(slot).cloned().unwrap_or_default())
            }),
            Some(Arc::new(move |obj, value| {
                let obj = downcast::<DynamicObject>(obj, &class)?;
                if let Some(cell) = obj.slots.write().get_mut(slot) {
                    *cell = value;
                }
                Ok(())
            })),
        )
    }

    /// Installs the positional slot constructor: `new Foo(a, b)` fills the
    /// first two slots, remaining slots stay null.
    pub fn slot_constructor(self) -> Self {
        self.constructor(|class, args| {
            if args.len() > class.slot_count() {
                return Err(HostError::Arity {
                    name: class.simple_name().clone(),
                    expected: class.slot_count(),
                    found: args.len(),
                });
            }
            let mut slots = vec![Value::Null; class.slot_count()];
            for (slot, arg) in slots.iter_mut().zip(args) {
                *slot = arg.clone();
            }
            Ok(Value::Object(Arc::new(DynamicObject {
                class: class.clone(),
                slots: RwLock::new(slots),
            })))
        })
    }
}

// ============================================================================
// Registry
// ============================================================================

/// Classes known to a parser configuration, by fully qualified name.
#[derive(Debug, Clone, Default)]
pub struct ClassRegistry {
    classes: HashMap<EcoString, Arc<Class>>,
    /// Simple names that resolve without an explicit import.
    auto_imports: HashMap<EcoString, Arc<Class>>,
}

impl ClassRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry preloaded with the built-in classes (`Math`, `String`,
    /// `Integer`, collections, ...), all importable by simple name.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        crate::stdlib::register_builtins(&mut registry);
        registry
    }

    pub fn register(&mut self, class: Arc<Class>) {
        self.classes.insert(class.name().clone(), class);
    }

    /// Registers a class and makes its simple name resolvable everywhere.
    pub fn register_auto_import(&mut self, class: Arc<Class>) {
        self.auto_imports
            .insert(class.simple_name().clone(), class.clone());
        self.register(class);
    }

    pub fn get(&self, name: &str) -> Option<&Arc<Class>> {
        self.classes.get(name)
    }

    pub fn auto_import(&self, simple_name: &str) -> Option<&Arc<Class>> {
        self.auto_imports.get(simple_name)
    }

    /// All classes whose fully qualified name starts with `package.`.
    pub fn in_package<'a>(&'a self, package: &'a str) -> impl Iterator<Item = &'a Arc<Class>> + 'a {
        self.classes.values().filter(move |class| {
            class
                .name()
                .strip_prefix(package)
                .and_then(|rest| rest.strip_prefix('.'))
                .is_some_and(|rest| !rest.contains('.'))
        })
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}
