use core::cell::RefCell;

use ecow::EcoString;
use hashbrown::HashMap;

use super::{VariableResolver, VariableResolverFactory};
use crate::values::{TypeHint, Value};

/// Name-keyed variables. Used for the caller-supplied global scope and for
/// every block scope the evaluator opens.
#[derive(Default)]
pub struct MapVariableResolverFactory<'a> {
    variables: RefCell<HashMap<EcoString, VariableResolver>>,
    order: RefCell<Vec<EcoString>>,
    parent: Option<&'a dyn VariableResolverFactory>,
}

impl<'a> MapVariableResolverFactory<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_parent(parent: &'a dyn VariableResolverFactory) -> Self {
        Self {
            parent: Some(parent),
            ..Self::default()
        }
    }

    /// A root factory preloaded with untyped variables.
    pub fn with_variables<K, I>(variables: I) -> Self
    where
        K: Into<EcoString>,
        I: IntoIterator<Item = (K, Value)>,
    {
        let factory = Self::new();
        for (name, value) in variables {
            let name: EcoString = name.into();
            factory.define_local(&name, TypeHint::Any, value);
        }
        factory
    }

    /// Current value of a variable owned by this factory.
    pub fn get(&self, name: &str) -> Option<Value> {
        self.local_resolver(name).map(|r| r.get_value())
    }

    pub fn len(&self) -> usize {
        self.order.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.borrow().is_empty()
    }
}

impl VariableResolverFactory for MapVariableResolverFactory<'_> {
    fn local_resolver(&self, name: &str) -> Option<VariableResolver> {
        self.variables.borrow().get(name).cloned()
    }

    fn define_local(&self, name: &str, ty: TypeHint, value: Value) -> VariableResolver {
        let resolver = VariableResolver::new(name, ty, value);
        let previous = self
            .variables
            .borrow_mut()
            .insert(EcoString::from(name), resolver.clone());
        if previous.is_none() {
            self.order.borrow_mut().push(name.into());
        }
        resolver
    }

    fn next(&self) -> Option<&dyn VariableResolverFactory> {
        self.parent
    }

    fn local_names(&self) -> Vec<EcoString> {
        self.order.borrow().clone()
    }
}
