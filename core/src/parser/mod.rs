//! Source text to node arena.
//!
//! [`compile`] runs the parser over a source string and returns a
//! [`ParsedUnit`]: the arena, its root node, the names the expression reads
//! from outside, and the imports in effect at its end. Syntax errors stop
//! the parse at the first one; verification errors are collected and
//! reported together.

pub mod context;
pub mod error;
pub mod operators;
pub mod syntax;

mod expression;
#[allow(clippy::module_inception)]
mod parser;
mod path;

use std::sync::Arc;

use ecow::EcoString;
use tracing::debug;

pub use context::{Binding, DebugSymbols, Imports, ParserConfiguration, ParserContext};
pub use error::{CompileError, ErrorDetail};
pub use expression::binary_egress;
pub use operators::{BinaryOp, Keyword, LanguageLevel, UnaryOp};
pub use syntax::{LineIndex, Span};

use crate::api::CompilationOptions;
use crate::ast::{Ast, NodeId};

/// The output of a successful compile.
#[derive(Debug)]
pub struct ParsedUnit {
    pub ast: Ast,
    /// `None` when the source holds no statements.
    pub root: Option<NodeId>,
    /// Names read but never declared, in order of first use.
    pub inputs: Vec<EcoString>,
    /// Imports in effect after the last statement.
    pub imports: Imports,
    pub debug_symbols: Option<DebugSymbols>,
    /// Non-fatal diagnostics.
    pub warnings: Vec<ErrorDetail>,
}

/// Parses and verifies `source`.
pub fn compile(
    source: &str,
    config: &ParserConfiguration,
    options: &CompilationOptions,
) -> Result<ParsedUnit, CompileError> {
    let text: Arc<str> = Arc::from(source);
    if options.debug_symbols && options.source_file.is_none() {
        return Err(CompileError::new(
            text,
            vec![ErrorDetail::new(
                "P011",
                "debug symbols require a source file name",
                Span::at(0),
            )],
        ));
    }

    let ctx = ParserContext::new(config, options, text.clone());
    let mut parser = parser::Parser::new(source, ctx);
    let result = parser.parse_program();
    let (ast, mut ctx) = parser.finish();
    let mut diagnostics = ctx.take_errors();

    let root = match result {
        Ok(root) => root,
        Err(detail) => {
            diagnostics.push(detail);
            return Err(CompileError::new(text, diagnostics));
        }
    };
    if diagnostics.iter().any(|d| d.fatal) {
        return Err(CompileError::new(text, diagnostics));
    }

    debug!(
        nodes = ast.len(),
        inputs = ctx.inputs().len(),
        level = %options.language_level,
        "compiled expression"
    );
    Ok(ParsedUnit {
        inputs: ctx.inputs().to_vec(),
        imports: ctx.imports.clone(),
        debug_symbols: ctx.take_debug_symbols(),
        warnings: diagnostics,
        ast,
        root,
    })
}

#[cfg(test)]
mod parse_test;

#[cfg(test)]
mod precedence_test;
