use ecow::EcoString;

use super::{MapVariableResolverFactory, VariableResolver, VariableResolverFactory};
use crate::values::{TypeHint, Value};

/// Scope of one foreach iteration: the loop item plus body locals.
pub struct ItemResolverFactory<'a> {
    item: VariableResolver,
    locals: MapVariableResolverFactory<'a>,
}

impl<'a> ItemResolverFactory<'a> {
    pub fn new(item: VariableResolver, parent: &'a dyn VariableResolverFactory) -> Self {
        Self {
            item,
            locals: MapVariableResolverFactory::with_parent(parent),
        }
    }

    pub fn item(&self) -> &VariableResolver {
        &self.item
    }
}

impl VariableResolverFactory for ItemResolverFactory<'_> {
    fn local_resolver(&self, name: &str) -> Option<VariableResolver> {
        if self.item.name().as_str() == name {
            return Some(self.item.clone());
        }
        self.locals.local_resolver(name)
    }

    fn define_local(&self, name: &str, ty: TypeHint, value: Value) -> VariableResolver {
        self.locals.define_local(name, ty, value)
    }

    fn next(&self) -> Option<&dyn VariableResolverFactory> {
        self.locals.next()
    }

    fn local_names(&self) -> Vec<EcoString> {
        let mut names = vec![self.item.name().clone()];
        names.extend(self.locals.local_names());
        names
    }
}
