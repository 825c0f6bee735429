//! Environment builder for registering globals, classes and interceptors.

use std::sync::Arc;

use ecow::EcoString;
use tracing::debug;

use crate::accessor::AccessorOptimizer;
use crate::interceptor::Interceptor;
use crate::parser::ParserConfiguration;
use crate::values::{Class, Function, HostError, Value};

/// Builder for the configuration shared by every expression an engine
/// compiles.
///
/// # Example
///
/// ```
/// use kestrel_core::api::{Engine, EngineOptions};
/// use kestrel_core::values::Value;
///
/// // EnvironmentBuilder is used inside Engine::new
/// let engine = Engine::new(EngineOptions::default(), |env| {
///     env.register("pi", Value::Double(std::f64::consts::PI));
/// });
/// ```
pub struct EnvironmentBuilder {
    config: ParserConfiguration,
}

impl Default for EnvironmentBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl EnvironmentBuilder {
    /// Starts from the built-in classes and the reflective optimizer.
    pub fn new() -> Self {
        Self {
            config: ParserConfiguration::default(),
        }
    }

    /// Register a global value, visible after the caller's own variables.
    pub fn register(&mut self, name: &str, value: Value) -> &mut Self {
        self.config.globals.insert(EcoString::from(name), value);
        self
    }

    /// Register a global native function.
    ///
    /// `arity` of `None` accepts any number of arguments.
    pub fn register_function(
        &mut self,
        name: &str,
        arity: Option<usize>,
        func: impl Fn(&[Value]) -> Result<Value, HostError> + Send + Sync + 'static,
    ) -> &mut Self {
        self.register(name, Function::native(name, arity, func))
    }

    /// Make a host class resolvable by its fully qualified name.
    pub fn register_class(&mut self, class: Arc<Class>) -> &mut Self {
        self.config.registry.register(class);
        self
    }

    /// Make a host class resolvable by its simple name without an import.
    pub fn register_auto_import(&mut self, class: Arc<Class>) -> &mut Self {
        self.config.registry.register_auto_import(class);
        self
    }

    /// Import a class (`a.b.C`) or package (`a.b.*`) for every expression.
    ///
    /// Returns false when nothing registered matches the path.
    pub fn import(&mut self, path: &str) -> bool {
        let config = &mut self.config;
        config.imports.import(path, &config.registry)
    }

    /// Bind an interceptor to `@name` annotations.
    pub fn register_interceptor(&mut self, name: &str, interceptor: Arc<dyn Interceptor>) -> &mut Self {
        self.config
            .interceptors
            .insert(EcoString::from(name), interceptor);
        self
    }

    /// Replace the strategy that builds cached accessors.
    pub fn set_optimizer(&mut self, optimizer: Arc<dyn AccessorOptimizer>) -> &mut Self {
        self.config.optimizer = optimizer;
        self
    }

    pub(crate) fn build(self) -> ParserConfiguration {
        debug!(config = ?self.config, "Environment built");
        self.config
    }
}
