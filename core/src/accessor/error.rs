use ecow::EcoString;
use thiserror::Error;

use crate::parser::syntax::Span;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyAccessErrorKind {
    /// No strategy resolves the segment against the current object.
    UnresolvableProperty,
    IndexOutOfBounds { index: i64, len: usize },
    /// A non-null-safe hop was applied to `null`.
    NullSegment,
    /// `[..]` was applied to a value that cannot be indexed.
    NotIndexable,
    /// The property exists but has no setter.
    ReadOnly,
    /// A `Map` key was required to exist (compound assignment).
    MissingKey,
}

/// A path segment could not be resolved against the runtime object.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}", self.describe())]
pub struct PropertyAccessError {
    /// The segment as written (`name`, `[]`, `name()`).
    pub segment: EcoString,
    /// Type of the object the segment was resolved against.
    pub class_name: EcoString,
    pub kind: PropertyAccessErrorKind,
    pub span: Option<Span>,
}

impl PropertyAccessError {
    pub fn new(
        segment: impl Into<EcoString>,
        class_name: impl Into<EcoString>,
        kind: PropertyAccessErrorKind,
    ) -> Self {
        Self {
            segment: segment.into(),
            class_name: class_name.into(),
            kind,
            span: None,
        }
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span.get_or_insert(span);
        self
    }

    fn describe(&self) -> String {
        match &self.kind {
            PropertyAccessErrorKind::UnresolvableProperty => format!(
                "could not access property `{}` on {}",
                self.segment, self.class_name
            ),
            PropertyAccessErrorKind::IndexOutOfBounds { index, len } => format!(
                "index {} out of bounds for {} of length {}",
                index, self.class_name, len
            ),
            PropertyAccessErrorKind::NullSegment => {
                format!("null pointer while accessing `{}`", self.segment)
            }
            PropertyAccessErrorKind::NotIndexable => {
                format!("{} cannot be indexed", self.class_name)
            }
            PropertyAccessErrorKind::ReadOnly => format!(
                "property `{}` of {} is read-only",
                self.segment, self.class_name
            ),
            PropertyAccessErrorKind::MissingKey => {
                format!("no key `{}` in {}", self.segment, self.class_name)
            }
        }
    }
}
