//! Callable values.
//!
//! Script functions are declared with `def`/`function` and keep a handle on
//! the tree they were compiled into, so a function value stays callable after
//! it escapes the expression that defined it. Native functions are Rust
//! closures registered by the embedder.

use core::fmt;
use std::sync::Arc;

use ecow::EcoString;

use crate::ast::{Ast, NodeId, NodeKind};
use crate::values::host::HostError;
use crate::values::value::Value;

pub type NativeFn = Arc<dyn Fn(&[Value]) -> Result<Value, HostError> + Send + Sync>;

pub enum Function {
    Script(ScriptFunction),
    Native(NativeFunction),
}

/// A function declared in source. `node` is a `NodeKind::Function` in `ast`.
#[derive(Clone)]
pub struct ScriptFunction {
    pub ast: Arc<Ast>,
    pub node: NodeId,
}

#[derive(Clone)]
pub struct NativeFunction {
    pub name: EcoString,
    /// `None` accepts any number of arguments.
    pub arity: Option<usize>,
    pub func: NativeFn,
}

impl NativeFunction {
    pub fn new(
        name: impl Into<EcoString>,
        arity: Option<usize>,
        func: impl Fn(&[Value]) -> Result<Value, HostError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            arity,
            func: Arc::new(func),
        }
    }
}

impl ScriptFunction {
    /// Parameter names in declaration order.
    pub fn params(&self) -> &[crate::ast::Param] {
        match &self.ast.node(self.node).kind {
            NodeKind::Function { params, .. } => params,
            _ => &[],
        }
    }

    pub fn name(&self) -> Option<&EcoString> {
        match &self.ast.node(self.node).kind {
            NodeKind::Function { name, .. } => name.as_ref(),
            _ => None,
        }
    }
}

impl Function {
    pub fn native(
        name: impl Into<EcoString>,
        arity: Option<usize>,
        func: impl Fn(&[Value]) -> Result<Value, HostError> + Send + Sync + 'static,
    ) -> Value {
        Value::Function(Arc::new(Function::Native(NativeFunction::new(
            name, arity, func,
        ))))
    }

    pub fn name(&self) -> EcoString {
        match self {
            Function::Script(f) => f
                .name()
                .cloned()
                .unwrap_or_else(|| EcoString::from("<anonymous>")),
            Function::Native(f) => f.name.clone(),
        }
    }

    pub fn arity(&self) -> Option<usize> {
        match self {
            Function::Script(f) => Some(f.params().len()),
            Function::Native(f) => f.arity,
        }
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Function::Script(func) => write!(f, "ScriptFunction({}, {:?})", self.name(), func.node),
            Function::Native(_) => write!(f, "NativeFunction({})", self.name()),
        }
    }
}
