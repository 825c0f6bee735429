//! Runtime evaluation errors.
//!
//! Evaluation fails fast: the first error aborts the whole evaluation and is
//! returned with the span of the innermost node that produced it.
//!
//! # Error Categories
//!
//! - **Property access**: a path segment did not resolve against the runtime
//!   object ([`PropertyAccessError`]).
//! - **Host errors**: a host getter, method or constructor failed. The host's
//!   error is kept as the `source`.
//! - **Everything else**: arithmetic, conversions, calls, resource limits.
//!
//! A `return` statement is not an error; it travels as [`Control::Return`]
//! and is caught at the enclosing function call or at the top level.

use ecow::EcoString;
use thiserror::Error;

use crate::accessor::PropertyAccessError;
use crate::casting::CastError;
use crate::parser::syntax::Span;
use crate::values::{HostError, Value};

#[derive(Debug, Error)]
pub enum EvalErrorKind {
    #[error("division by zero")]
    DivisionByZero,

    #[error("cannot apply `{op}` to {lhs} and {rhs}")]
    InvalidOperands {
        op: EcoString,
        lhs: EcoString,
        rhs: EcoString,
    },

    #[error("null reference: {0}")]
    NullReference(EcoString),

    #[error(transparent)]
    Conversion(#[from] CastError),

    #[error("unknown class `{0}`")]
    UnknownClass(EcoString),

    #[error("{message}")]
    Host { message: EcoString, source: HostError },

    #[error("`{0}` is not callable")]
    NotCallable(EcoString),

    #[error("`{name}` expects {expected} argument(s), got {found}")]
    Arity {
        name: EcoString,
        expected: usize,
        found: usize,
    },

    #[error("evaluation stack overflow: depth {depth} exceeds maximum of {max_depth}")]
    StackOverflow { depth: usize, max_depth: usize },

    #[error("invalid regular expression `{pattern}`: {message}")]
    Regex { pattern: EcoString, message: EcoString },

    #[error("with-block target evaluated to null")]
    NullWithTarget,

    #[error("cannot iterate over {0}")]
    NotIterable(EcoString),

    #[error(transparent)]
    PropertyAccess(#[from] PropertyAccessError),
}

/// An evaluation error and where it happened.
#[derive(Debug, Error)]
#[error("{kind}")]
pub struct EvalError {
    pub kind: EvalErrorKind,
    pub span: Option<Span>,
}

impl EvalError {
    pub fn new(kind: EvalErrorKind, span: Span) -> Self {
        Self {
            kind,
            span: Some(span),
        }
    }

    /// Attaches `span` unless a more precise one is already set.
    pub fn or_span(mut self, span: &Span) -> Self {
        if self.span.is_none() {
            self.span = Some(span.clone());
        }
        if let EvalErrorKind::PropertyAccess(err) = &mut self.kind {
            if err.span.is_none() {
                err.span = self.span.clone();
            }
        }
        self
    }
}

impl From<EvalErrorKind> for EvalError {
    fn from(kind: EvalErrorKind) -> Self {
        Self { kind, span: None }
    }
}

impl From<CastError> for EvalError {
    fn from(err: CastError) -> Self {
        EvalErrorKind::from(err).into()
    }
}

impl From<PropertyAccessError> for EvalError {
    fn from(err: PropertyAccessError) -> Self {
        EvalErrorKind::from(err).into()
    }
}

/// Non-local exits from a node's evaluation.
#[derive(Debug)]
pub enum Control {
    /// `return value` unwinding to the enclosing function call.
    Return(Value),
    Error(EvalError),
}

impl From<EvalError> for Control {
    fn from(err: EvalError) -> Self {
        Control::Error(err)
    }
}

impl From<EvalErrorKind> for Control {
    fn from(kind: EvalErrorKind) -> Self {
        Control::Error(kind.into())
    }
}

impl From<CastError> for Control {
    fn from(err: CastError) -> Self {
        Control::Error(err.into())
    }
}

impl From<PropertyAccessError> for Control {
    fn from(err: PropertyAccessError) -> Self {
        Control::Error(err.into())
    }
}
