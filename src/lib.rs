//! Kestrel - an embeddable, dynamically typed expression language
//!
//! # Overview
//!
//! Kestrel evaluates small scripts against objects supplied by a host
//! application. Common use cases include:
//!
//! - Templating and data binding
//! - Validation and business rules
//! - Property paths into host object graphs
//!
//! Expressions are compiled once and evaluated many times. The default
//! evaluation mode caches a resolved accessor for each property path and
//! falls back to the reflective path when the runtime shape changes.
//!
//! # Quick Start
//!
//! ```
//! use kestrel::{Engine, EngineOptions, MapVariableResolverFactory, Value};
//!
//! let engine = Engine::new(EngineOptions::default(), |env| {
//!     env.register("pi", Value::str("3.14"));
//! });
//!
//! let expr = engine.compile("pi * hour").unwrap().unwrap();
//! let vars = MapVariableResolverFactory::with_variables([("hour", Value::str("60"))]);
//! assert_eq!(expr.evaluate(&Value::Null, &vars).unwrap(), Value::Double(188.4));
//! ```
//!
//! # Native functions
//!
//! ```
//! use kestrel::{Engine, EngineOptions, Value};
//! use kestrel::values::HostError;
//!
//! let engine = Engine::new(EngineOptions::default(), |env| {
//!     env.register_function("shout", Some(1), |args| match args[0].as_str() {
//!         Some(s) => Ok(Value::str(s.to_uppercase())),
//!         None => Err(HostError::msg("shout expects a string")),
//!     });
//! });
//! assert_eq!(kestrel::eval_with(&engine, "shout('hi')").unwrap(), Value::str("HI"));
//! ```

pub use kestrel_core::api::{
    CompilationOptions, CompiledExpression, Diagnostic, Engine, EngineOptions, EnvironmentBuilder,
    Error, ExecutionMode, ExecutionOptions, RelatedInfo, Severity,
};
pub use kestrel_core::interceptor::Interceptor;
pub use kestrel_core::parser::{LanguageLevel, Span};
pub use kestrel_core::resolver::{self, MapVariableResolverFactory, VariableResolverFactory};
pub use kestrel_core::values::{self, ClassBuilder, Function, TypeHint, Value};

mod error_renderer;
pub use error_renderer::{
    render_error, render_error_to, render_error_to_string, render_error_to_string_no_color,
};

/// Compiles `source` with a default engine and the given options.
///
/// Returns `Ok(None)` when the source contains no statements.
pub fn compile(
    source: &str,
    options: &CompilationOptions,
) -> Result<Option<CompiledExpression>, Error> {
    Engine::default().compile_with(source, options)
}

/// Evaluates a compiled expression against `root` and a variable factory.
pub fn evaluate(
    expr: &CompiledExpression,
    root: &Value,
    factory: &dyn VariableResolverFactory,
) -> Result<Value, Error> {
    expr.evaluate(root, factory)
}

/// Compiles and evaluates `source` once, with no context object and an
/// empty variable factory.
pub fn eval(source: &str) -> Result<Value, Error> {
    eval_with(&Engine::default(), source)
}

/// Like [`eval`], using the classes and globals of `engine`.
pub fn eval_with(engine: &Engine, source: &str) -> Result<Value, Error> {
    match engine.compile(source)? {
        Some(expr) => evaluate(&expr, &Value::Null, &MapVariableResolverFactory::new()),
        None => Ok(Value::Null),
    }
}
