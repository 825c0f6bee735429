//! Compile-time state.
//!
//! [`ParserConfiguration`] is what an environment hands to every compile:
//! known classes, default imports, interceptors, the accessor optimizer and
//! global values. It is immutable once built and shared behind an `Arc`.
//!
//! [`ParserContext`] belongs to a single compile. It is passed explicitly
//! through the parser, never stored in ambient state, and tracks declared
//! variables per scope, the imports seen so far, free variables (inputs) and
//! the diagnostics accumulated by verification.

use core::fmt;
use std::sync::Arc;

use ecow::{EcoString, eco_format};
use hashbrown::HashMap;

use crate::accessor::{AccessorOptimizer, ReflectiveAccessorOptimizer};
use crate::api::CompilationOptions;
use crate::ast::NodeId;
use crate::interceptor::Interceptor;
use crate::parser::error::ErrorDetail;
use crate::parser::syntax::{LineIndex, Span};
use crate::values::{Class, ClassRegistry, TypeHint, Value};

// ============================================================================
// Imports
// ============================================================================

/// Classes importable by simple name, plus wildcard packages.
#[derive(Debug, Clone, Default)]
pub struct Imports {
    classes: HashMap<EcoString, Arc<Class>>,
    packages: Vec<EcoString>,
}

impl Imports {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_class(&mut self, class: Arc<Class>) {
        self.classes.insert(class.simple_name().clone(), class);
    }

    /// Makes `class` resolvable as `name`.
    pub fn add_alias(&mut self, name: impl Into<EcoString>, class: Arc<Class>) {
        self.classes.insert(name.into(), class);
    }

    /// `import pkg.*`.
    pub fn add_package(&mut self, package: impl Into<EcoString>) {
        let package = package.into();
        if !self.packages.contains(&package) {
            self.packages.push(package);
        }
    }

    /// Applies `import a.b.C` or `import a.b.*`. Returns `false` when the
    /// class is unknown.
    pub fn import(&mut self, path: &str, registry: &ClassRegistry) -> bool {
        if let Some(package) = path.strip_suffix(".*") {
            self.add_package(package);
            return true;
        }
        match registry.get(path) {
            Some(class) => {
                self.add_class(class.clone());
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.classes.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.classes.len() + self.packages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty() && self.packages.is_empty()
    }

    /// Resolves a class name. Order: explicit imports, wildcard packages,
    /// auto-imported built-ins, fully qualified name.
    pub fn resolve(&self, name: &str, registry: &ClassRegistry) -> Option<Arc<Class>> {
        if let Some(class) = self.classes.get(name) {
            return Some(class.clone());
        }
        for package in &self.packages {
            if let Some(class) = registry.get(&eco_format!("{}.{}", package, name)) {
                return Some(class.clone());
            }
        }
        registry
            .auto_import(name)
            .or_else(|| registry.get(name))
            .cloned()
    }

    pub fn merge(&mut self, other: &Imports) {
        for (name, class) in &other.classes {
            self.classes.insert(name.clone(), class.clone());
        }
        for package in &other.packages {
            self.add_package(package.clone());
        }
    }
}

// ============================================================================
// Configuration
// ============================================================================

/// Shared, immutable compile and runtime configuration.
pub struct ParserConfiguration {
    pub registry: ClassRegistry,
    pub imports: Imports,
    pub interceptors: HashMap<EcoString, Arc<dyn Interceptor>>,
    pub optimizer: Arc<dyn AccessorOptimizer>,
    /// Values visible to every evaluation, after the caller's variables.
    pub globals: HashMap<EcoString, Value>,
}

static_assertions::assert_impl_all!(ParserConfiguration: Send, Sync);

impl Default for ParserConfiguration {
    fn default() -> Self {
        Self {
            registry: ClassRegistry::with_builtins(),
            imports: Imports::new(),
            interceptors: HashMap::new(),
            optimizer: Arc::new(ReflectiveAccessorOptimizer),
            globals: HashMap::new(),
        }
    }
}

impl fmt::Debug for ParserConfiguration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut interceptors: Vec<&EcoString> = self.interceptors.keys().collect();
        interceptors.sort();
        f.debug_struct("ParserConfiguration")
            .field("classes", &self.registry.len())
            .field("imports", &self.imports)
            .field("interceptors", &interceptors)
            .field("optimizer", &self.optimizer.name())
            .field("globals", &self.globals.len())
            .finish()
    }
}

// ============================================================================
// Debug symbols
// ============================================================================

/// Line numbers of top-level statements, recorded when debug symbols are on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DebugSymbols {
    pub source_file: EcoString,
    pub lines: Vec<(NodeId, u32)>,
}

impl DebugSymbols {
    pub fn line_of(&self, node: NodeId) -> Option<u32> {
        self.lines
            .iter()
            .find(|(id, _)| *id == node)
            .map(|(_, line)| *line)
    }
}

// ============================================================================
// Per-compile context
// ============================================================================

struct Scope {
    variables: HashMap<EcoString, TypeHint>,
    /// Set on the outermost scope of a function body.
    function: Option<FunctionScope>,
}

struct FunctionScope {
    params: Vec<EcoString>,
    /// Names used in the body but declared nowhere inside it.
    inputs: Vec<EcoString>,
}

/// What an identifier refers to at compile time.
#[derive(Debug, Clone, PartialEq)]
pub enum Binding {
    /// A variable declared in an enclosing scope, with its declared type.
    Local(TypeHint),
    /// A parameter of the enclosing function, by position.
    Param { slot: usize, ty: TypeHint },
    /// Nothing known; resolved at runtime.
    Unknown,
}

pub struct ParserContext<'c> {
    pub config: &'c ParserConfiguration,
    pub options: &'c CompilationOptions,
    pub imports: Imports,
    scopes: Vec<Scope>,
    inputs: Vec<EcoString>,
    errors: Vec<ErrorDetail>,
    debug: Option<DebugSymbols>,
    line_index: LineIndex,
    source: Arc<str>,
}

impl<'c> ParserContext<'c> {
    pub fn new(
        config: &'c ParserConfiguration,
        options: &'c CompilationOptions,
        source: Arc<str>,
    ) -> Self {
        let mut imports = config.imports.clone();
        let mut errors = Vec::new();
        for path in &options.imports {
            if !imports.import(path, &config.registry) {
                errors.push(ErrorDetail::unknown_import(path, Span::at(0)));
            }
        }
        let mut root = Scope {
            variables: HashMap::new(),
            function: None,
        };
        for (name, ty) in &options.variables {
            root.variables.insert(name.clone(), ty.clone());
        }
        let debug = options.debug_symbols.then(|| DebugSymbols {
            source_file: options.source_file.clone().unwrap_or_default(),
            lines: Vec::new(),
        });
        Self {
            config,
            options,
            imports,
            scopes: vec![root],
            inputs: Vec::new(),
            errors,
            debug,
            line_index: LineIndex::new(&source),
            source,
        }
    }

    pub fn source(&self) -> &Arc<str> {
        &self.source
    }

    pub fn is_strict(&self) -> bool {
        self.options.strict_typing
    }

    pub fn push_scope(&mut self) {
        self.scopes.push(Scope {
            variables: HashMap::new(),
            function: None,
        });
    }

    pub fn pop_scope(&mut self) {
        debug_assert!(self.scopes.len() > 1, "popped the root scope");
        if self.scopes.len() > 1 {
            self.scopes.pop();
        }
    }

    /// Opens an isolated function scope with `params` pre-declared.
    pub fn push_function(&mut self, params: &[(EcoString, TypeHint)]) {
        let mut variables = HashMap::new();
        for (name, ty) in params {
            variables.insert(name.clone(), ty.clone());
        }
        self.scopes.push(Scope {
            variables,
            function: Some(FunctionScope {
                params: params.iter().map(|(name, _)| name.clone()).collect(),
                inputs: Vec::new(),
            }),
        });
    }

    /// Closes the function scope; returns the free variables of its body.
    pub fn pop_function(&mut self) -> Vec<EcoString> {
        while let Some(scope) = self.scopes.pop() {
            if let Some(function) = scope.function {
                return function.inputs;
            }
            if self.scopes.is_empty() {
                break;
            }
        }
        debug_assert!(false, "no function scope to pop");
        Vec::new()
    }

    pub fn declare(&mut self, name: &str, ty: TypeHint) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.variables.insert(name.into(), ty);
        }
    }

    /// Looks `name` up without crossing the nearest function boundary.
    pub fn binding(&self, name: &str) -> Binding {
        for scope in self.scopes.iter().rev() {
            if let Some(ty) = scope.variables.get(name) {
                if let Some(function) = &scope.function {
                    if self.options.indexed_functions {
                        if let Some(slot) = function.params.iter().position(|p| p.as_str() == name) {
                            return Binding::Param {
                                slot,
                                ty: ty.clone(),
                            };
                        }
                    }
                }
                return Binding::Local(ty.clone());
            }
            if scope.function.is_some() {
                break;
            }
        }
        Binding::Unknown
    }

    /// Whether any enclosing scope declares `name`, across function
    /// boundaries.
    pub fn is_declared(&self, name: &str) -> bool {
        self.scopes.iter().any(|scope| scope.variables.contains_key(name))
    }

    pub fn in_function(&self) -> bool {
        self.scopes.iter().any(|scope| scope.function.is_some())
    }

    /// Records `name` as a free variable of the innermost function, or of
    /// the compiled unit at top level.
    pub fn add_input(&mut self, name: &str) {
        let inputs = match self
            .scopes
            .iter_mut()
            .rev()
            .find_map(|scope| scope.function.as_mut())
        {
            Some(function) => &mut function.inputs,
            None => &mut self.inputs,
        };
        if !inputs.iter().any(|input| input.as_str() == name) {
            inputs.push(name.into());
        }
    }

    pub fn inputs(&self) -> &[EcoString] {
        &self.inputs
    }

    /// Whether `name` is known outside of declared variables: a global,
    /// a class, or a pre-declared variable type.
    pub fn is_known_name(&self, name: &str) -> bool {
        self.config.globals.contains_key(name)
            || self.imports.resolve(name, &self.config.registry).is_some()
    }

    pub fn class(&self, name: &str) -> Option<Arc<Class>> {
        self.imports.resolve(name, &self.config.registry)
    }

    pub fn interceptor(&self, name: &str) -> Option<Arc<dyn Interceptor>> {
        self.config.interceptors.get(name).cloned()
    }

    // ------------------------------------------------------------------------
    // Diagnostics
    // ------------------------------------------------------------------------

    pub fn report(&mut self, detail: ErrorDetail) {
        self.errors.push(detail);
    }

    pub fn has_errors(&self) -> bool {
        self.errors.iter().any(|e| e.fatal)
    }

    pub fn take_errors(&mut self) -> Vec<ErrorDetail> {
        core::mem::take(&mut self.errors)
    }

    pub fn line_col(&self, offset: usize) -> (u32, u32) {
        self.line_index.line_col(&self.source, offset)
    }

    pub fn record_line(&mut self, node: NodeId, offset: usize) {
        let line = self.line_index.line(offset);
        if let Some(debug) = &mut self.debug {
            debug.lines.push((node, line));
        }
    }

    pub fn take_debug_symbols(&mut self) -> Option<DebugSymbols> {
        self.debug.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_import_resolution_order() {
        let registry = ClassRegistry::with_builtins();
        let mut imports = Imports::new();
        assert!(imports.import("kestrel.util.*", &registry));
        assert!(!imports.import("no.such.Thing", &registry));
        assert_eq!(
            imports.resolve("HashMap", &registry).map(|c| c.name().clone()),
            Some("kestrel.util.HashMap".into())
        );
        assert_eq!(
            imports.resolve("kestrel.lang.Math", &registry).map(|c| c.simple_name().clone()),
            Some("Math".into())
        );
        let math = registry.get("kestrel.lang.Math").cloned();
        imports.add_alias("M", math.clone().unwrap());
        assert!(imports.contains("M"));
        assert!(imports.resolve("Nope", &registry).is_none());
    }

    #[test]
    fn test_function_scope_is_isolated() {
        let config = ParserConfiguration::default();
        let options = CompilationOptions::default();
        let mut ctx = ParserContext::new(&config, &options, Arc::from("x"));
        ctx.declare("outer", TypeHint::Int);
        ctx.push_function(&[("a".into(), TypeHint::Any), ("b".into(), TypeHint::Long)]);
        assert_eq!(
            ctx.binding("b"),
            Binding::Param {
                slot: 1,
                ty: TypeHint::Long
            }
        );
        assert_eq!(ctx.binding("outer"), Binding::Unknown);
        ctx.add_input("outer");
        ctx.push_scope();
        ctx.declare("inner", TypeHint::Str);
        assert_eq!(ctx.binding("inner"), Binding::Local(TypeHint::Str));
        ctx.pop_scope();
        assert_eq!(ctx.pop_function(), vec![EcoString::from("outer")]);
        assert_eq!(ctx.binding("outer"), Binding::Local(TypeHint::Int));
        assert!(ctx.inputs().is_empty());
    }
}
