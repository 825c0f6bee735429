//! The Kestrel compilation engine.

use std::sync::Arc;

use tracing::{debug, warn};

use super::{CompilationOptions, CompiledExpression, EngineOptions, EnvironmentBuilder, Error};
use crate::parser::{self, ParserConfiguration};

/// The Kestrel compilation engine.
///
/// The engine manages:
/// - Host classes, imports and interceptors ([`ParserConfiguration`])
/// - Global values and functions
/// - Default compilation and execution options ([`EngineOptions`])
///
/// The configuration is frozen once the engine is built and shared with
/// every expression it compiles, so compiled expressions outlive the engine.
///
/// # Example
///
/// ```
/// use kestrel_core::api::{Engine, EngineOptions};
/// use kestrel_core::resolver::MapVariableResolverFactory;
/// use kestrel_core::values::{HostError, Value};
///
/// let engine = Engine::new(EngineOptions::default(), |env| {
///     env.register_function("add", Some(2), |args| match (&args[0], &args[1]) {
///         (Value::Int(a), Value::Int(b)) => Ok(Value::Int(a + b)),
///         _ => Err(HostError::msg("add expects two ints")),
///     });
/// });
///
/// let expr = engine.compile("add(40, 2)").unwrap().unwrap();
/// let vars = MapVariableResolverFactory::new();
/// assert_eq!(expr.evaluate(&Value::Null, &vars).unwrap(), Value::Int(42));
/// ```
#[derive(Debug)]
pub struct Engine {
    config: Arc<ParserConfiguration>,
    options: EngineOptions,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(EngineOptions::default(), |_| {})
    }
}

impl Engine {
    /// Create a new engine with a custom environment.
    pub fn new(options: EngineOptions, init: impl FnOnce(&mut EnvironmentBuilder)) -> Self {
        let mut env_builder = EnvironmentBuilder::new();
        init(&mut env_builder);
        Self {
            config: Arc::new(env_builder.build()),
            options,
        }
    }

    /// Access the shared configuration.
    pub fn config(&self) -> &Arc<ParserConfiguration> {
        &self.config
    }

    /// Access the engine options.
    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    /// Compile an expression with the engine's default options.
    ///
    /// Returns `Ok(None)` when the source holds no statements.
    pub fn compile(&self, source: &str) -> Result<Option<CompiledExpression>, Error> {
        self.compile_with(source, &self.options.default_compilation_options)
    }

    /// Compile an expression with explicit compilation options.
    pub fn compile_with(
        &self,
        source: &str,
        options: &CompilationOptions,
    ) -> Result<Option<CompiledExpression>, Error> {
        let unit = parser::compile(source, &self.config, options)?;
        for warning in &unit.warnings {
            warn!(code = warning.code, "{}", warning.location());
        }
        let Some(root) = unit.root else {
            debug!("Empty expression");
            return Ok(None);
        };
        Ok(Some(CompiledExpression::new(
            unit,
            root,
            self.config.clone(),
            options.source_file.clone(),
            self.options.default_execution_options.clone(),
        )))
    }
}
