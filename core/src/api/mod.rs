//! Public API for the Kestrel expression language.
//!
//! An [`Engine`] holds the host classes, globals and interceptors every
//! expression can see. It compiles source into [`CompiledExpression`]s,
//! which are evaluated against a context object and a chain of variable
//! factories.
//!
//! # Example
//!
//! ```
//! use kestrel_core::api::{Engine, EngineOptions};
//! use kestrel_core::resolver::MapVariableResolverFactory;
//! use kestrel_core::values::Value;
//!
//! let engine = Engine::new(EngineOptions::default(), |env| {
//!     env.register("pi", Value::Double(3.14159));
//! });
//!
//! let expr = engine.compile("r = 2; pi * r * r").unwrap().unwrap();
//! let vars = MapVariableResolverFactory::new();
//! let area = expr.evaluate(&Value::Null, &vars).unwrap();
//! assert_eq!(area, Value::Double(3.14159 * 4.0));
//! // `r` was created in the caller's factory.
//! assert_eq!(vars.get("r"), Some(Value::Int(2)));
//! ```

pub mod engine;
pub mod environment;
pub mod error;
pub mod expression;
pub mod options;

pub use crate::evaluator::ExecutionMode;
pub use engine::Engine;
pub use environment::EnvironmentBuilder;
pub use error::{Diagnostic, Error, RelatedInfo, Severity};
pub use expression::CompiledExpression;
pub use options::{CompilationOptions, EngineOptions, ExecutionOptions};
