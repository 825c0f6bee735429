//! Compile errors.
//!
//! Syntax errors abort the compile at the first one. Verification problems
//! (strict typing, unknown imports, operand types) are accumulated so a
//! single compile reports all of them; the compile fails if any of them is
//! fatal.

use core::fmt;
use std::sync::Arc;

use ecow::{EcoString, eco_format};
use thiserror::Error;

use crate::api::{Diagnostic, Severity};
use crate::lexer::{LexError, LexErrorKind};
use crate::parser::operators::LanguageLevel;
use crate::parser::syntax::{LineIndex, Span};

/// One compile diagnostic.
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorDetail {
    /// 1-based line; filled in when the error is finalized.
    pub line: u32,
    /// 1-based column in characters.
    pub column: u32,
    pub fatal: bool,
    pub message: EcoString,
    pub span: Span,
    pub code: &'static str,
    pub help: Option<EcoString>,
}

impl ErrorDetail {
    pub fn new(code: &'static str, message: impl Into<EcoString>, span: Span) -> Self {
        Self {
            line: 0,
            column: 0,
            fatal: true,
            message: message.into(),
            span,
            code,
            help: None,
        }
    }

    pub fn warning(code: &'static str, message: impl Into<EcoString>, span: Span) -> Self {
        Self {
            fatal: false,
            ..Self::new(code, message, span)
        }
    }

    pub fn with_help(mut self, help: impl Into<EcoString>) -> Self {
        self.help = Some(help.into());
        self
    }

    pub fn unexpected(expected: &str, found: impl fmt::Display, span: Span) -> Self {
        Self::new("P001", eco_format!("expected {}, found {}", expected, found), span)
    }

    pub fn unknown_import(path: &str, span: Span) -> Self {
        Self::new("P006", eco_format!("unresolvable import `{}`", path), span)
            .with_help("register the class with the environment before importing it")
    }

    pub fn level(construct: &str, required: LanguageLevel, configured: LanguageLevel, span: Span) -> Self {
        Self::new(
            "P005",
            eco_format!(
                "{} requires language level {}, but the level is {}",
                construct, required, configured
            ),
            span,
        )
    }

    /// Renders as `line:column: message`.
    pub fn location(&self) -> EcoString {
        eco_format!("{}:{}: {}", self.line, self.column, self.message)
    }

    pub fn to_diagnostic(&self) -> Diagnostic {
        Diagnostic {
            severity: if self.fatal {
                Severity::Error
            } else {
                Severity::Warning
            },
            message: self.message.to_string(),
            span: self.span.clone(),
            related: Vec::new(),
            help: self.help.as_ref().map(|h| h.to_string()),
            code: Some(self.code.to_string()),
        }
    }
}

impl From<LexError> for ErrorDetail {
    fn from(err: LexError) -> Self {
        let code = match err.kind {
            LexErrorKind::Unbalanced(_) | LexErrorKind::Mismatched { .. } => "P002",
            LexErrorKind::Number(_) => "P003",
            LexErrorKind::UnterminatedString | LexErrorKind::Escape(_) => "P004",
            _ => "P000",
        };
        ErrorDetail::new(code, eco_format!("{}", err.kind), err.span)
    }
}

/// A failed compile with every diagnostic collected.
#[derive(Debug, Clone, Error)]
pub struct CompileError {
    pub source_text: Arc<str>,
    pub diagnostics: Vec<ErrorDetail>,
}

impl CompileError {
    /// Fills in line and column of every diagnostic.
    pub fn new(source: Arc<str>, mut diagnostics: Vec<ErrorDetail>) -> Self {
        let index = LineIndex::new(&source);
        for detail in &mut diagnostics {
            let (line, column) = index.line_col(&source, detail.span.start());
            detail.line = line;
            detail.column = column;
        }
        Self {
            source_text: source,
            diagnostics,
        }
    }

    pub fn errors(&self) -> impl Iterator<Item = &ErrorDetail> {
        self.diagnostics.iter().filter(|d| d.fatal)
    }

    pub fn to_diagnostics(&self) -> Vec<Diagnostic> {
        self.diagnostics.iter().map(ErrorDetail::to_diagnostic).collect()
    }
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut errors = self.errors();
        match (errors.next(), errors.count()) {
            (Some(first), 0) => write!(f, "compile error at {}", first.location()),
            (Some(first), more) => {
                write!(f, "compile error at {} (and {} more)", first.location(), more)
            }
            (None, _) => write!(f, "compile failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_and_column_are_filled() {
        let source: Arc<str> = Arc::from("a = 1;\nb = ;");
        let err = CompileError::new(
            source,
            vec![
                ErrorDetail::unexpected("an expression", "`;`", Span::new(11, 12)),
                ErrorDetail::warning("T002", "unused", Span::new(0, 1)),
            ],
        );
        assert_eq!(err.diagnostics[0].line, 2);
        assert_eq!(err.diagnostics[0].column, 5);
        assert_eq!(err.errors().count(), 1);
        assert_eq!(
            err.to_string(),
            "compile error at 2:5: expected an expression, found `;`"
        );
        let diagnostics = err.to_diagnostics();
        assert_eq!(diagnostics[1].severity, Severity::Warning);
        assert_eq!(diagnostics[0].code.as_deref(), Some("P001"));
    }
}
