//! Configuration options for the Kestrel engine.

use ecow::EcoString;

use crate::evaluator::ExecutionMode;
use crate::parser::operators::LanguageLevel;
use crate::values::TypeHint;

/// Configuration options for compilation.
///
/// # Example
///
/// ```
/// use kestrel_core::api::CompilationOptions;
/// use kestrel_core::parser::LanguageLevel;
///
/// let options = CompilationOptions {
///     strict_typing: true,
///     language_level: LanguageLevel::Assignment,
///     ..CompilationOptions::default()
/// };
/// assert!(options.fold_literals);
/// ```
#[derive(Debug, Clone)]
pub struct CompilationOptions {
    /// Reject identifiers whose type is not known at compile time.
    ///
    /// Default: false
    pub strict_typing: bool,

    /// Record the line of each top-level statement. Requires `source_file`.
    ///
    /// Default: false
    pub debug_symbols: bool,

    /// Name reported with debug symbols.
    pub source_file: Option<EcoString>,

    /// Highest feature set the parser accepts.
    ///
    /// Default: [`LanguageLevel::ControlFlow`]
    pub language_level: LanguageLevel,

    /// Variables whose types are known before compiling.
    pub variables: Vec<(EcoString, TypeHint)>,

    /// `a.b.C` or `a.b.*` imports applied before the first statement.
    pub imports: Vec<EcoString>,

    /// Address function parameters by slot instead of by name.
    ///
    /// Default: true
    pub indexed_functions: bool,

    /// Evaluate operators over literal operands at compile time.
    ///
    /// Default: true
    pub fold_literals: bool,
}

impl Default for CompilationOptions {
    fn default() -> Self {
        Self {
            strict_typing: false,
            debug_symbols: false,
            source_file: None,
            language_level: LanguageLevel::default(),
            variables: Vec::new(),
            imports: Vec::new(),
            indexed_functions: true,
            fold_literals: true,
        }
    }
}

/// Configuration options for expression execution.
///
/// # Example
///
/// ```
/// use kestrel_core::api::{ExecutionMode, ExecutionOptions};
///
/// let options = ExecutionOptions {
///     max_depth: 500,
///     mode: ExecutionMode::Interpreted,
/// };
/// ```
#[derive(Debug, Clone)]
pub struct ExecutionOptions {
    /// Maximum number of nested node evaluations (for recursion protection).
    /// The native stack is extended on the heap as evaluation nests, so
    /// hitting this limit reports an error instead of overflowing the thread.
    ///
    /// Default: 1000
    pub max_depth: usize,

    /// Whether paths replay cached accessors.
    ///
    /// Default: [`ExecutionMode::Accelerated`]
    pub mode: ExecutionMode,
}

impl Default for ExecutionOptions {
    fn default() -> Self {
        Self {
            max_depth: 1000,
            mode: ExecutionMode::default(),
        }
    }
}

/// Configuration options for the Kestrel engine.
///
/// These set the defaults for compilation and execution, which can be
/// overridden on a per-call basis.
#[derive(Debug, Clone, Default)]
pub struct EngineOptions {
    /// Default options for compilation.
    ///
    /// These can be overridden when calling `Engine::compile_with()`.
    pub default_compilation_options: CompilationOptions,

    /// Default options for execution.
    ///
    /// These can be overridden when calling `CompiledExpression::evaluate_with()`.
    pub default_execution_options: ExecutionOptions,
}
