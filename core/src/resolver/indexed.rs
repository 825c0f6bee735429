use core::cell::RefCell;

use ecow::EcoString;
use hashbrown::HashMap;

use super::{VariableResolver, VariableResolverFactory};
use crate::casting::{self, CastError};
use crate::values::{TypeHint, Value};

/// Variables addressed by position, as allocated at compile time, with a
/// name-keyed spill-over for locals declared while the frame runs.
pub struct IndexedVariableResolverFactory<'a> {
    slots: Vec<VariableResolver>,
    locals: RefCell<HashMap<EcoString, VariableResolver>>,
    local_order: RefCell<Vec<EcoString>>,
    parent: Option<&'a dyn VariableResolverFactory>,
}

impl<'a> IndexedVariableResolverFactory<'a> {
    pub fn new<K: Into<EcoString>>(
        slots: impl IntoIterator<Item = (K, Value)>,
        parent: Option<&'a dyn VariableResolverFactory>,
    ) -> Self {
        Self::from_resolvers(
            slots
                .into_iter()
                .map(|(name, value)| VariableResolver::new(name, TypeHint::Any, value))
                .collect(),
            parent,
        )
    }

    fn from_resolvers(
        slots: Vec<VariableResolver>,
        parent: Option<&'a dyn VariableResolverFactory>,
    ) -> Self {
        Self {
            slots,
            locals: RefCell::new(HashMap::new()),
            local_order: RefCell::new(Vec::new()),
            parent,
        }
    }

    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }
}

impl VariableResolverFactory for IndexedVariableResolverFactory<'_> {
    fn local_resolver(&self, name: &str) -> Option<VariableResolver> {
        self.slots
            .iter()
            .rev()
            .find(|slot| slot.name().as_str() == name)
            .cloned()
            .or_else(|| self.locals.borrow().get(name).cloned())
    }

    fn define_local(&self, name: &str, ty: TypeHint, value: Value) -> VariableResolver {
        let resolver = VariableResolver::new(name, ty, value);
        if self
            .locals
            .borrow_mut()
            .insert(EcoString::from(name), resolver.clone())
            .is_none()
        {
            self.local_order.borrow_mut().push(name.into());
        }
        resolver
    }

    fn next(&self) -> Option<&dyn VariableResolverFactory> {
        self.parent
    }

    fn local_names(&self) -> Vec<EcoString> {
        let mut names: Vec<EcoString> = self.slots.iter().map(|s| s.name().clone()).collect();
        names.extend(self.local_order.borrow().iter().cloned());
        names
    }

    fn local_indexed_resolver(&self, index: usize) -> Option<VariableResolver> {
        self.slots.get(index).cloned()
    }
}

/// Parameters of one function invocation, bound positionally and layered
/// over the caller's factory.
pub struct FunctionVariableResolverFactory<'a> {
    function: EcoString,
    frame: IndexedVariableResolverFactory<'a>,
}

impl<'a> FunctionVariableResolverFactory<'a> {
    /// Binds `args` to `params`, converting each to its declared type.
    ///
    /// Missing trailing arguments bind to null.
    pub fn new(
        function: impl Into<EcoString>,
        params: &[(EcoString, TypeHint)],
        args: Vec<Value>,
        caller: &'a dyn VariableResolverFactory,
    ) -> Result<Self, CastError> {
        let mut args = args.into_iter();
        let slots = params
            .iter()
            .map(|(name, ty)| {
                let value = casting::coerce(args.next().unwrap_or_default(), ty)?;
                Ok(VariableResolver::new(name.clone(), ty.clone(), value))
            })
            .collect::<Result<Vec<_>, CastError>>()?;
        Ok(Self {
            function: function.into(),
            frame: IndexedVariableResolverFactory::from_resolvers(slots, Some(caller)),
        })
    }

    pub fn function(&self) -> &EcoString {
        &self.function
    }
}

impl VariableResolverFactory for FunctionVariableResolverFactory<'_> {
    fn local_resolver(&self, name: &str) -> Option<VariableResolver> {
        self.frame.local_resolver(name)
    }

    fn define_local(&self, name: &str, ty: TypeHint, value: Value) -> VariableResolver {
        self.frame.define_local(name, ty, value)
    }

    fn next(&self) -> Option<&dyn VariableResolverFactory> {
        self.frame.next()
    }

    fn local_names(&self) -> Vec<EcoString> {
        self.frame.local_names()
    }

    fn local_indexed_resolver(&self, index: usize) -> Option<VariableResolver> {
        self.frame.local_indexed_resolver(index)
    }
}
