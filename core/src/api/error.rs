//! Public error types for the Kestrel API.
//!
//! Internal errors ([`CompileError`], [`EvalError`]) are converted to these
//! types at the API boundary.

use core::fmt;

use crate::accessor::PropertyAccessError;
use crate::evaluator::{EvalError, EvalErrorKind};
use crate::parser::{CompileError, Span};

/// Public error type for all Kestrel operations.
#[derive(Debug)]
pub enum Error {
    /// Compilation errors.
    ///
    /// Contains every diagnostic collected during the compile, warnings
    /// included.
    Compilation { diagnostics: Vec<Diagnostic> },

    /// A path segment did not resolve against the runtime object.
    PropertyAccess(PropertyAccessError),

    /// Runtime errors during evaluation (e.g., division by zero).
    Runtime { message: String, span: Option<Span> },

    /// Resource limits exceeded (e.g., evaluation stack depth).
    ResourceExceeded(String),
}

impl Error {
    /// Source location of the failure, when one is known.
    pub fn span(&self) -> Option<&Span> {
        match self {
            Error::ResourceExceeded(_) => None,
            Error::Compilation { diagnostics } => diagnostics
                .iter()
                .find(|d| d.severity == Severity::Error)
                .map(|d| &d.span),
            Error::PropertyAccess(err) => err.span.as_ref(),
            Error::Runtime { span, .. } => span.as_ref(),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Compilation { diagnostics } => {
                let error_count = diagnostics
                    .iter()
                    .filter(|d| d.severity == Severity::Error)
                    .count();
                write!(f, "Compilation failed with {} error(s)", error_count)
            }
            Error::PropertyAccess(err) => write!(f, "Property access error: {}", err),
            Error::Runtime { message, .. } => write!(f, "Runtime error: {}", message),
            Error::ResourceExceeded(msg) => write!(f, "Resource limit exceeded: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

/// A diagnostic message (error, warning, or info) with source location.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    /// Severity level (error, warning, info).
    pub severity: Severity,

    /// Primary diagnostic message.
    pub message: String,

    /// Source location of the primary issue.
    pub span: Span,

    /// Related locations that provide additional context.
    pub related: Vec<RelatedInfo>,

    /// Optional help text suggesting how to fix the issue.
    pub help: Option<String>,

    /// Diagnostic code (e.g., "P001") for documentation lookup.
    pub code: Option<String>,
}

/// Severity level for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Error - compilation cannot succeed.
    Error,
    /// Warning - suspicious code that might be wrong.
    Warning,
    /// Info - informational message.
    Info,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
            Severity::Info => write!(f, "info"),
        }
    }
}

/// Related information for a diagnostic.
#[derive(Debug, Clone)]
pub struct RelatedInfo {
    /// Source location of the related information.
    pub span: Span,

    /// Message explaining the relevance.
    pub message: String,
}

// ============================================================================
// Conversion from internal errors
// ============================================================================

impl From<CompileError> for Error {
    fn from(err: CompileError) -> Self {
        Error::Compilation {
            diagnostics: err.to_diagnostics(),
        }
    }
}

impl From<EvalError> for Error {
    fn from(err: EvalError) -> Self {
        match err.kind {
            EvalErrorKind::PropertyAccess(mut inner) => {
                if inner.span.is_none() {
                    inner.span = err.span;
                }
                Error::PropertyAccess(inner)
            }
            kind @ EvalErrorKind::StackOverflow { .. } => Error::ResourceExceeded(kind.to_string()),
            kind => Error::Runtime {
                message: kind.to_string(),
                span: err.span,
            },
        }
    }
}
