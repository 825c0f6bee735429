//! Hooks run around a statement marked `@Name` in source.
//!
//! Interceptors are registered by name on the environment and bound to the
//! statement at compile time; an unknown name is a compile error.

use crate::ast::Node;
use crate::resolver::VariableResolverFactory;
use crate::values::{HostError, Value};

pub trait Interceptor: Send + Sync {
    /// Runs before the intercepted statement. An error aborts evaluation.
    fn do_before(
        &self,
        _node: &Node,
        _factory: &dyn VariableResolverFactory,
    ) -> Result<(), HostError> {
        Ok(())
    }

    /// Runs after the intercepted statement with the value it produced.
    fn do_after(
        &self,
        _value: &Value,
        _node: &Node,
        _factory: &dyn VariableResolverFactory,
    ) -> Result<(), HostError> {
        Ok(())
    }
}
