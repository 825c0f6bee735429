//! Tree-walking evaluator over the node arena.
//!
//! ## Design Principles
//!
//! - **Never panic**: adversarial input surfaces as an [`EvalError`].
//! - **Stack-safe**: depth tracking turns runaway recursion into
//!   [`EvalErrorKind::StackOverflow`].
//! - **Two paths, one answer**: property paths and constructors either
//!   resolve from scratch on every evaluation ([`ExecutionMode::Interpreted`])
//!   or replay an accessor cached on the node ([`ExecutionMode::Accelerated`]).
//!   Both paths share the segment resolution code and return the same
//!   values; a stale accessor is rebuilt without surfacing an error.
//!
//! ## Example
//!
//! ```
//! use kestrel_core::api::Engine;
//! use kestrel_core::resolver::MapVariableResolverFactory;
//! use kestrel_core::values::Value;
//!
//! let engine = Engine::default();
//! let compiled = engine.compile("1 + 2 * 3").unwrap().unwrap();
//! let vars = MapVariableResolverFactory::new();
//! assert_eq!(compiled.evaluate(&Value::Null, &vars).unwrap(), Value::Int(7));
//! ```

mod error;
mod eval;
pub mod operators;


pub use error::{Control, EvalError, EvalErrorKind};
pub use eval::Evaluator;

/// How path and constructor nodes are evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ExecutionMode {
    /// Replay accessors cached on each node, rebuilding them when stale.
    #[default]
    Accelerated,
    /// Resolve every segment on every evaluation; never touch the cache.
    Interpreted,
}
