//! Variable resolver factories.
//!
//! A factory maps names (or integer slots) to mutable variable cells and
//! chains to a parent factory for names it does not own. Lookup is strict
//! nearest-wins: a name declared in an inner factory shadows every outer
//! declaration and never falls through.
//!
//! Factories are created per evaluation frame and live on the evaluating
//! thread; they use `Rc`/`RefCell` and are not meant to be shared.
//!
//! | Factory                            | Owns                                   |
//! |------------------------------------|----------------------------------------|
//! | [`MapVariableResolverFactory`]     | name-keyed locals (global and block scopes) |
//! | [`IndexedVariableResolverFactory`] | positional slots plus spill-over locals |
//! | [`FunctionVariableResolverFactory`]| a function call's parameters            |
//! | [`ItemResolverFactory`]            | a foreach loop item                     |

use core::cell::RefCell;
use core::fmt;
use std::rc::Rc;

use ecow::EcoString;

use crate::casting::{self, CastError};
use crate::values::{TypeHint, Value};

mod indexed;
mod item;
mod map;


pub use indexed::{FunctionVariableResolverFactory, IndexedVariableResolverFactory};
pub use item::ItemResolverFactory;
pub use map::MapVariableResolverFactory;

struct Slot {
    name: EcoString,
    ty: TypeHint,
    value: RefCell<Value>,
}

/// A handle on one variable cell. Clones share the cell.
#[derive(Clone)]
pub struct VariableResolver(Rc<Slot>);

impl VariableResolver {
    pub fn new(name: impl Into<EcoString>, ty: TypeHint, value: Value) -> Self {
        VariableResolver(Rc::new(Slot {
            name: name.into(),
            ty,
            value: RefCell::new(value),
        }))
    }

    pub fn name(&self) -> &EcoString {
        &self.0.name
    }

    /// Declared type; `TypeHint::Any` for untyped variables.
    pub fn ty(&self) -> &TypeHint {
        &self.0.ty
    }

    pub fn get_value(&self) -> Value {
        self.0.value.borrow().clone()
    }

    /// Stores `value`, converting it to the declared type first.
    pub fn set_value(&self, value: Value) -> Result<(), CastError> {
        let value = casting::coerce(value, &self.0.ty)?;
        *self.0.value.borrow_mut() = value;
        Ok(())
    }
}

impl fmt::Debug for VariableResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VariableResolver")
            .field("name", &self.0.name)
            .field("ty", &self.0.ty)
            .field("value", &*self.0.value.borrow())
            .finish()
    }
}

/// A link in the variable scope chain.
pub trait VariableResolverFactory {
    /// Resolver for `name` if this factory itself owns it.
    fn local_resolver(&self, name: &str) -> Option<VariableResolver>;

    /// Declares (or redeclares) `name` in this factory.
    fn define_local(&self, name: &str, ty: TypeHint, value: Value) -> VariableResolver;

    /// The enclosing factory, if any.
    fn next(&self) -> Option<&dyn VariableResolverFactory>;

    /// Names owned by this factory, in declaration order.
    fn local_names(&self) -> Vec<EcoString>;

    /// Resolver for positional slot `index` if this factory owns slots.
    fn local_indexed_resolver(&self, _index: usize) -> Option<VariableResolver> {
        None
    }

    /// Nearest resolver for `name` along the chain.
    fn get_resolver(&self, name: &str) -> Option<VariableResolver> {
        match self.local_resolver(name) {
            Some(resolver) => Some(resolver),
            None => self.next()?.get_resolver(name),
        }
    }

    fn is_resolveable(&self, name: &str) -> bool {
        self.get_resolver(name).is_some()
    }

    /// Whether this factory (not its parents) owns `name`.
    fn is_target(&self, name: &str) -> bool {
        self.local_resolver(name).is_some()
    }

    /// Assigns to the nearest existing variable, or declares a new untyped
    /// variable in this factory.
    fn create_variable(&self, name: &str, value: Value) -> Result<VariableResolver, CastError> {
        match self.get_resolver(name) {
            Some(resolver) => {
                resolver.set_value(value)?;
                Ok(resolver)
            }
            None => Ok(self.define_local(name, TypeHint::Any, value)),
        }
    }

    /// Declares a typed variable in this factory, shadowing outer ones.
    fn create_typed_variable(
        &self,
        name: &str,
        ty: TypeHint,
        value: Value,
    ) -> Result<VariableResolver, CastError> {
        let value = casting::coerce(value, &ty)?;
        Ok(self.define_local(name, ty, value))
    }

    /// Nearest factory owning positional slots answers for `index`.
    fn get_indexed_variable_resolver(&self, index: usize) -> Option<VariableResolver> {
        match self.local_indexed_resolver(index) {
            Some(resolver) => Some(resolver),
            None => self.next()?.get_indexed_variable_resolver(index),
        }
    }

    /// Every resolvable name, nearest first, without duplicates.
    fn variable_names(&self) -> Vec<EcoString> {
        let mut names = self.local_names();
        if let Some(next) = self.next() {
            for name in next.variable_names() {
                if !names.contains(&name) {
                    names.push(name);
                }
            }
        }
        names
    }
}
