//! Property paths: `a.b.c`, `a.?b`, `list[0]`, `obj.method(x).field`.
//!
//! A path is a root followed by segments. Names without a compile-time
//! binding are recorded as inputs of the compiled unit, unless they turn
//! out to name a class (`Math.PI`, `kestrel.util.List.of(1)`).

use std::sync::Arc;

use ecow::{EcoString, eco_format};
use smallvec::SmallVec;

use crate::ast::{NodeFlags, NodeId, NodeKind, Path, PathRoot, Segment};
use crate::lexer::{Punct, TokenKind};
use crate::parser::error::ErrorDetail;
use crate::parser::parser::{PResult, Parser};
use crate::parser::syntax::Span;
use crate::values::{Class, TypeHint};

/// What `parse_primary` produced before any segment was seen.
pub enum Primary {
    /// A complete expression; segments turn it into a `PathRoot::Node`.
    Node(NodeId),
    Root {
        root: PathRoot,
        span: Span,
        egress: TypeHint,
        /// Set when the root name has no compile-time binding.
        unresolved: Option<EcoString>,
    },
}

/// Static type tracking while segments are appended.
enum Receiver {
    Typed(TypeHint),
    /// The root named a class; the next hop reads a static member.
    Static(Arc<Class>),
}

impl<'s, 'c> Parser<'s, 'c> {
    pub(super) fn parse_segments(&mut self, primary: Primary) -> PResult<NodeId> {
        let (root, start, root_egress, unresolved) = match primary {
            Primary::Node(id) => {
                if !self.starts_segment()? {
                    return Ok(id);
                }
                let span = self.span_of(id);
                let egress = self.egress(id);
                (PathRoot::Node(id), span, egress, None)
            }
            Primary::Root {
                root,
                span,
                egress,
                unresolved,
            } => (root, span, egress, unresolved),
        };

        let mut receiver = match &unresolved {
            Some(name) => match self.ctx.class(name) {
                Some(class) => Receiver::Static(class),
                None => Receiver::Typed(root_egress),
            },
            None => Receiver::Typed(root_egress),
        };
        let mut segments: SmallVec<[Segment; 4]> = SmallVec::new();
        let mut end = start.clone();

        while self.starts_segment()? {
            let segment = match self.peek()?.kind {
                TokenKind::Punct(Punct::LBracket) => {
                    let inner = self.capture(Punct::LBracket)?;
                    let index = self.in_range(&inner, |p| p.parse_expression())?;
                    end = Span::new(inner.end(), inner.end() + 1);
                    Segment::Index {
                        index,
                        null_safe: false,
                    }
                }
                _ => {
                    let null_safe = self.bump()?.is_punct(Punct::NullSafeDot);
                    let (name, name_span) = self.expect_ident("a property or method name")?;
                    end = name_span;
                    if self.peek()?.is_punct(Punct::LParen) {
                        let (args, args_span) = self.parse_call_args()?;
                        end = args_span;
                        Segment::Method {
                            name,
                            args,
                            null_safe,
                        }
                    } else {
                        Segment::Property { name, null_safe }
                    }
                }
            };
            receiver = self.segment_receiver(receiver, &segment, &end);
            segments.push(segment);
        }

        let span = Span::new(start.start(), end.end());
        if let Some(name) = &unresolved {
            if self.relaxed == 0 {
                self.note_unresolved(name, &segments, &start);
            }
        }

        let mut flags = NodeFlags::empty();
        if segments.is_empty() && matches!(root, PathRoot::Name(_) | PathRoot::Indexed { .. }) {
            flags |= NodeFlags::IDENTIFIER;
        }
        if segments.len() > 1 {
            flags |= NodeFlags::DEEP_PROPERTY;
        }
        if segments.iter().any(Segment::is_null_safe) {
            flags |= NodeFlags::NULL_SAFE;
        }
        let egress = match receiver {
            Receiver::Typed(ty) => ty,
            Receiver::Static(_) => TypeHint::Any,
        };
        Ok(self.path_node(root, segments, span, flags, egress))
    }

    fn starts_segment(&mut self) -> PResult<bool> {
        let token = self.peek()?;
        Ok(token.is_punct(Punct::Dot) || token.is_punct(Punct::NullSafeDot) || token.is_punct(Punct::LBracket))
    }

    pub(super) fn path_node(
        &mut self,
        root: PathRoot,
        segments: SmallVec<[Segment; 4]>,
        span: Span,
        flags: NodeFlags,
        egress: TypeHint,
    ) -> NodeId {
        self.push(NodeKind::Path(Path { root, segments }), span, flags, egress)
    }

    /// Static type after applying `segment` to `receiver`.
    fn segment_receiver(&mut self, receiver: Receiver, segment: &Segment, span: &Span) -> Receiver {
        let ty = match (receiver, segment) {
            (Receiver::Static(class), Segment::Property { name, .. }) => class
                .static_field(name)
                .map(|value| value.type_hint())
                .unwrap_or(TypeHint::Any),
            (Receiver::Static(class), Segment::Method { name, args, .. }) => class
                .static_method(name, args.len())
                .map(|method| method.ret.clone())
                .unwrap_or(TypeHint::Any),
            (Receiver::Typed(TypeHint::Array(_)), Segment::Property { name, .. }) if name == "length" => {
                TypeHint::Int
            }
            (Receiver::Typed(TypeHint::Array(elem)), Segment::Index { .. }) => *elem,
            (Receiver::Typed(TypeHint::Str), Segment::Index { .. }) => TypeHint::Char,
            (Receiver::Typed(TypeHint::Class(class_name)), segment) => {
                self.class_member_type(&class_name, segment, span)
            }
            _ => TypeHint::Any,
        };
        Receiver::Typed(ty)
    }

    fn class_member_type(&mut self, class_name: &str, segment: &Segment, span: &Span) -> TypeHint {
        let Some(class) = self.ctx.class(class_name) else {
            return TypeHint::Any;
        };
        match segment {
            Segment::Property { name, .. } => match class.property(name) {
                Some(property) => property.ty.clone(),
                None => {
                    if self.ctx.is_strict() && !class.has_methods_named(name) {
                        self.ctx.report(ErrorDetail::new(
                            "T003",
                            eco_format!("class {} has no property `{}`", class.name(), name),
                            span.clone(),
                        ));
                    }
                    TypeHint::Any
                }
            },
            Segment::Method { name, args, .. } => class
                .method(name, args.len())
                .map(|method| method.ret.clone())
                .unwrap_or(TypeHint::Any),
            Segment::Index { .. } => TypeHint::Any,
        }
    }

    /// Records a root name with no compile-time binding as an input. Names
    /// that start a class reference are skipped.
    pub(super) fn note_unresolved(&mut self, name: &EcoString, segments: &[Segment], span: &Span) {
        if self.ctx.class(name).is_some() {
            return;
        }
        let mut dotted = name.clone();
        for segment in segments {
            let Segment::Property { name: part, .. } = segment else {
                break;
            };
            dotted.push('.');
            dotted.push_str(part);
            if self.ctx.class(&dotted).is_some() {
                return;
            }
        }
        self.ctx.add_input(name);
        if self.ctx.is_strict() && !self.ctx.is_declared(name) && !self.ctx.is_known_name(name) {
            self.ctx.report(ErrorDetail::new(
                "T002",
                eco_format!("unknown identifier `{}`", name),
                span.clone(),
            ));
        }
    }
}
