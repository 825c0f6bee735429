//! Compiled Kestrel expressions.

use std::sync::Arc;

use ecow::EcoString;
use tracing::trace;

use super::{Error, ExecutionOptions};
use crate::ast::{Ast, NodeId};
use crate::evaluator::{Evaluator, ExecutionMode};
use crate::parser::{DebugSymbols, ErrorDetail, Imports, ParsedUnit, ParserConfiguration};
use crate::resolver::VariableResolverFactory;
use crate::values::{TypeHint, Value};

/// A compiled expression ready for execution.
///
/// Compiled expressions own their node arena and share the engine's
/// configuration, so they can be cloned cheaply, sent across threads and
/// evaluated concurrently. Each evaluation brings its own context object and
/// variable factory.
///
/// # Execution Modes
///
/// - **`evaluate()`**: Replays accessors cached on path nodes, rebuilding
///   them when the runtime shape changes.
/// - **`evaluate_interpreted()`**: Resolves every path from scratch and never
///   touches the cache.
///
/// Both return the same values.
///
/// # Example
///
/// ```
/// use kestrel_core::api::Engine;
/// use kestrel_core::resolver::MapVariableResolverFactory;
/// use kestrel_core::values::Value;
///
/// let engine = Engine::default();
/// let expr = engine.compile("x * 2").unwrap().unwrap();
/// let vars = MapVariableResolverFactory::with_variables([("x", Value::Int(21))]);
/// assert_eq!(expr.evaluate(&Value::Null, &vars).unwrap(), Value::Int(42));
/// assert_eq!(expr.inputs()[0].as_str(), "x");
/// ```
#[derive(Clone)]
pub struct CompiledExpression {
    ast: Arc<Ast>,
    root: NodeId,
    inputs: Vec<EcoString>,
    imports: Imports,
    debug_symbols: Option<DebugSymbols>,
    warnings: Vec<ErrorDetail>,
    source_file: Option<EcoString>,
    config: Arc<ParserConfiguration>,
    options: ExecutionOptions,
}

static_assertions::assert_impl_all!(CompiledExpression: Send, Sync);

impl CompiledExpression {
    /// This is called internally by Engine::compile().
    pub(crate) fn new(
        unit: ParsedUnit,
        root: NodeId,
        config: Arc<ParserConfiguration>,
        source_file: Option<EcoString>,
        options: ExecutionOptions,
    ) -> Self {
        Self {
            ast: Arc::new(unit.ast),
            root,
            inputs: unit.inputs,
            imports: unit.imports,
            debug_symbols: unit.debug_symbols,
            warnings: unit.warnings,
            source_file,
            config,
            options,
        }
    }

    /// Evaluate with the engine's default execution options.
    pub fn evaluate(&self, ctx: &Value, vars: &dyn VariableResolverFactory) -> Result<Value, Error> {
        self.evaluate_with(ctx, vars, &self.options)
    }

    /// Evaluate without reading or writing cached accessors.
    pub fn evaluate_interpreted(
        &self,
        ctx: &Value,
        vars: &dyn VariableResolverFactory,
    ) -> Result<Value, Error> {
        let options = ExecutionOptions {
            mode: ExecutionMode::Interpreted,
            ..self.options.clone()
        };
        self.evaluate_with(ctx, vars, &options)
    }

    /// Evaluate with explicit execution options.
    pub fn evaluate_with(
        &self,
        ctx: &Value,
        vars: &dyn VariableResolverFactory,
        options: &ExecutionOptions,
    ) -> Result<Value, Error> {
        trace!(mode = ?options.mode, nodes = self.ast.len(), "Evaluating");
        let mut evaluator = Evaluator::new(&self.ast, &self.config, &self.imports, options);
        Ok(evaluator.run(self.root, ctx, vars)?)
    }

    /// True when the whole expression folded to a constant.
    pub fn is_literal_only(&self) -> bool {
        self.ast.node(self.root).literal().is_some()
    }

    /// The folded constant, for literal-only expressions.
    pub fn literal_value(&self) -> Option<&Value> {
        self.ast.node(self.root).literal()
    }

    /// Statically known result type; `Object` when unknown.
    pub fn egress_type(&self) -> &TypeHint {
        &self.ast.node(self.root).egress
    }

    /// Names the expression reads without declaring, in order of first use.
    pub fn inputs(&self) -> &[EcoString] {
        &self.inputs
    }

    pub fn imports(&self) -> &Imports {
        &self.imports
    }

    pub fn warnings(&self) -> &[ErrorDetail] {
        &self.warnings
    }

    pub fn source(&self) -> &str {
        self.ast.source()
    }

    pub fn source_file(&self) -> Option<&str> {
        self.source_file.as_deref()
    }

    pub fn debug_symbols(&self) -> Option<&DebugSymbols> {
        self.debug_symbols.as_ref()
    }

    /// Number of nodes reachable from the root.
    pub fn node_count(&self) -> usize {
        self.ast.reachable_count(self.root)
    }

    pub fn ast(&self) -> &Arc<Ast> {
        &self.ast
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// S-expression rendering of the compiled tree.
    pub fn debug_tree(&self) -> String {
        self.ast.sexpr(self.root)
    }
}

impl core::fmt::Debug for CompiledExpression {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("CompiledExpression")
            .field("source", &self.ast.source())
            .field("inputs", &self.inputs)
            .field("egress", self.egress_type())
            .field("nodes", &self.node_count())
            .finish()
    }
}
