//! Expressions: assignment, ternary, binary operators, unary operators and
//! primaries.
//!
//! Binary operators are climbed with explicit operand and operator stacks;
//! a reduction happens whenever the incoming operator binds no tighter than
//! the one on top. Operators over two literals are evaluated on the spot
//! when folding is enabled.

use ecow::eco_format;
use smallvec::SmallVec;
use tracing::trace;

use crate::ast::{ClassRef, NodeFlags, NodeId, NodeKind, PathRoot};
use crate::evaluator::operators;
use crate::lexer::{Punct, Token, TokenKind};
use crate::parser::error::ErrorDetail;
use crate::parser::operators::{BinaryOp, Keyword, LanguageLevel, UnaryOp};
use crate::parser::parser::{PResult, Parser};
use crate::parser::path::Primary;
use crate::parser::syntax::Span;
use crate::parser::context::Binding;
use crate::values::{TypeHint, Value};

/// Result type of a non-short-circuit binary operator.
pub fn binary_egress(op: BinaryOp, lhs: &TypeHint, rhs: &TypeHint) -> TypeHint {
    match op {
        _ if op.is_comparison() => TypeHint::Bool,
        BinaryOp::Add if matches!(lhs, TypeHint::Str) || matches!(rhs, TypeHint::Str) => TypeHint::Str,
        BinaryOp::Pow => TypeHint::Double,
        BinaryOp::And | BinaryOp::Or => TypeHint::Bool,
        _ if op.is_bitwise() && matches!((lhs, rhs), (TypeHint::Bool, TypeHint::Bool)) => TypeHint::Bool,
        _ => lhs.promote(rhs),
    }
}

fn binary_op_of(token: &Token) -> Option<BinaryOp> {
    match &token.kind {
        TokenKind::Punct(punct) => punct.binary_op(),
        TokenKind::WordOp(op) => Some(*op),
        _ => None,
    }
}

/// Whether `token` can begin an operand; used to tell `(Type) x` casts
/// from parenthesized expressions.
fn starts_operand(token: &Token) -> bool {
    match &token.kind {
        TokenKind::Ident(_) | TokenKind::Literal(_) => true,
        TokenKind::Keyword(kw) => matches!(
            kw,
            Keyword::Null | Keyword::Empty | Keyword::This | Keyword::New | Keyword::IsDef
        ),
        TokenKind::Punct(p) => matches!(
            p,
            Punct::LParen | Punct::LBracket | Punct::LBrace | Punct::Bang | Punct::Tilde
        ),
        _ => false,
    }
}

impl<'s, 'c> Parser<'s, 'c> {
    // ========================================================================
    // Assignment
    // ========================================================================

    pub(super) fn parse_expression(&mut self) -> PResult<NodeId> {
        let token = self.peek()?;
        if let TokenKind::Ident(name) = &token.kind {
            if let TokenKind::Punct(punct) = self.peek_second()?.kind {
                if punct.is_assignment() {
                    return self.parse_name_assignment(name.clone(), token.span, punct);
                }
            }
        }

        let target = self.parse_ternary()?;
        let token = self.peek()?;
        let TokenKind::Punct(punct) = token.kind else {
            return Ok(target);
        };
        if !punct.is_assignment() {
            return Ok(target);
        }
        self.require(LanguageLevel::Assignment, "assignment", &token.span)?;
        if !matches!(self.ast.node(target).kind, NodeKind::Path(_)) {
            return Err(ErrorDetail::new(
                "P014",
                eco_format!("cannot assign to `{}`", self.ast.text(target)),
                self.span_of(target),
            ));
        }
        self.bump()?;
        let value = self.parse_expression()?;
        let span = Span::combine(&self.span_of(target), &self.span_of(value));
        let kind = match punct.compound_op() {
            Some(op) => NodeKind::CompoundAssign { target, op, value },
            None => NodeKind::AssignPath { target, value },
        };
        let egress = self.assigned_egress(target, value, punct.compound_op());
        Ok(self.push(kind, span, NodeFlags::ASSIGNMENT, egress))
    }

    fn parse_name_assignment(
        &mut self,
        name: ecow::EcoString,
        name_span: Span,
        punct: Punct,
    ) -> PResult<NodeId> {
        self.require(LanguageLevel::Assignment, "assignment", &name_span)?;
        self.bump()?;
        self.bump()?;
        let value = self.parse_expression()?;
        let span = Span::new(name_span.start(), self.span_of(value).end());
        let binding = self.ctx.binding(&name);

        if let Some(op) = punct.compound_op() {
            let (root, ty) = match &binding {
                Binding::Param { slot, ty } => (
                    PathRoot::Indexed {
                        slot: *slot,
                        name: name.clone(),
                    },
                    ty.clone(),
                ),
                Binding::Local(ty) => (PathRoot::Name(name.clone()), ty.clone()),
                Binding::Unknown => {
                    if self.relaxed == 0 {
                        self.note_unresolved(&name, &[], &name_span);
                    }
                    (PathRoot::Name(name.clone()), TypeHint::Any)
                }
            };
            let target = self.path_node(root, SmallVec::new(), name_span, NodeFlags::IDENTIFIER, ty);
            self.verify_operands(op, target, value);
            let egress = self.assigned_egress(target, value, Some(op));
            return Ok(self.push(
                NodeKind::CompoundAssign { target, op, value },
                span,
                NodeFlags::ASSIGNMENT,
                egress,
            ));
        }

        let egress = self.egress(value);
        match binding {
            Binding::Param { slot, ty } => {
                self.check_assignable(&name, &ty, value);
                Ok(self.push(
                    NodeKind::AssignIndexed { slot, name, value },
                    span,
                    NodeFlags::ASSIGNMENT,
                    egress,
                ))
            }
            binding => {
                match binding {
                    Binding::Local(ty) => self.check_assignable(&name, &ty, value),
                    _ if self.relaxed == 0 => self.ctx.declare(&name, TypeHint::Any),
                    _ => {}
                }
                Ok(self.push(
                    NodeKind::AssignVar { name, value },
                    span,
                    NodeFlags::ASSIGNMENT,
                    egress,
                ))
            }
        }
    }

    fn check_assignable(&mut self, name: &str, ty: &TypeHint, value: NodeId) {
        let source = self.egress(value);
        if self.ctx.is_strict() && !ty.accepts(&source) {
            self.ctx.report(ErrorDetail::new(
                "T004",
                eco_format!("cannot assign {} to `{}` of type {}", source, name, ty),
                self.span_of(value),
            ));
        }
    }

    fn assigned_egress(&self, target: NodeId, value: NodeId, op: Option<BinaryOp>) -> TypeHint {
        match op {
            Some(op) => binary_egress(op, &self.egress(target), &self.egress(value)),
            None => self.egress(value),
        }
    }

    // ========================================================================
    // Ternary and binary operators
    // ========================================================================

    pub(super) fn parse_ternary(&mut self) -> PResult<NodeId> {
        let cond = self.parse_binary()?;
        let token = self.peek()?;
        if !token.is_punct(Punct::Question) {
            return Ok(cond);
        }
        self.require(LanguageLevel::BasicOps, "`?:`", &token.span)?;
        self.bump()?;
        let then = self.parse_ternary()?;
        self.expect(Punct::Colon)?;
        let otherwise = self.parse_ternary()?;
        let span = Span::combine(&self.span_of(cond), &self.span_of(otherwise));
        let (a, b) = (self.egress(then), self.egress(otherwise));
        let egress = if a == b { a } else { TypeHint::Any };
        Ok(self.push(
            NodeKind::Ternary {
                cond,
                then,
                otherwise,
            },
            span,
            NodeFlags::OPERATOR,
            egress,
        ))
    }

    fn parse_binary(&mut self) -> PResult<NodeId> {
        let mut operands: SmallVec<[NodeId; 8]> = SmallVec::new();
        let mut operators: SmallVec<[BinaryOp; 8]> = SmallVec::new();
        operands.push(self.parse_unary()?);

        loop {
            let token = self.peek()?;
            let Some(op) = binary_op_of(&token) else {
                break;
            };
            self.require(op.level(), &format!("`{}`", op), &token.span)?;
            self.bump()?;

            while let Some(&top) = operators.last() {
                let reduce = top.precedence() > op.precedence()
                    || (top.precedence() == op.precedence() && !op.is_right_associative());
                if !reduce {
                    break;
                }
                operators.pop();
                self.reduce(&mut operands, top)?;
            }

            if op == BinaryOp::InstanceOf {
                let Some(value) = operands.pop() else {
                    break;
                };
                let (class, class_span) = self.parse_class_ref()?;
                let span = Span::new(self.span_of(value).start(), class_span.end());
                operands.push(self.push(
                    NodeKind::InstanceOf { value, class },
                    span,
                    NodeFlags::OPERATOR,
                    TypeHint::Bool,
                ));
                continue;
            }

            operators.push(op);
            operands.push(self.parse_unary()?);
        }

        while let Some(op) = operators.pop() {
            self.reduce(&mut operands, op)?;
        }
        operands.pop().ok_or_else(|| {
            let at = self.lookahead_span();
            ErrorDetail::new("P001", "expected an expression", at)
        })
    }

    fn lookahead_span(&mut self) -> Span {
        self.peek().map(|t| t.span).unwrap_or_default()
    }

    fn reduce(&mut self, operands: &mut SmallVec<[NodeId; 8]>, op: BinaryOp) -> PResult<()> {
        let (Some(rhs), Some(lhs)) = (operands.pop(), operands.pop()) else {
            return Err(ErrorDetail::new(
                "P001",
                eco_format!("missing operand for `{}`", op),
                self.lookahead_span(),
            ));
        };
        operands.push(self.make_binary(op, lhs, rhs));
        Ok(())
    }

    /// The class after `instanceof`: a built-in type name first, then a
    /// class known to the registry, else a name resolved at runtime.
    fn parse_class_ref(&mut self) -> PResult<(ClassRef, Span)> {
        let (name, span) = self.parse_dotted_name()?;
        if let Some(ty) = TypeHint::from_name(&name) {
            return Ok((ClassRef::Builtin(ty), span));
        }
        if let Some(class) = self.ctx.class(&name) {
            return Ok((ClassRef::Resolved(class), span));
        }
        if self.ctx.is_strict() {
            self.ctx.report(ErrorDetail::new(
                "P012",
                eco_format!("unknown class `{}`", name),
                span.clone(),
            ));
        }
        Ok((ClassRef::Named(name), span))
    }

    fn make_binary(&mut self, op: BinaryOp, lhs: NodeId, rhs: NodeId) -> NodeId {
        let span = Span::combine(&self.span_of(lhs), &self.span_of(rhs));
        match op {
            BinaryOp::And => {
                return self.push(NodeKind::And { lhs, rhs }, span, NodeFlags::OPERATOR, TypeHint::Bool);
            }
            BinaryOp::Or => {
                return self.push(NodeKind::Or { lhs, rhs }, span, NodeFlags::OPERATOR, TypeHint::Bool);
            }
            BinaryOp::Regex => {
                let compiled = match self.ast.node(rhs).literal() {
                    Some(Value::Str(pattern)) => match operators::compile_regex(pattern) {
                        Ok(re) => Some(re),
                        Err(err) => {
                            self.ctx.report(ErrorDetail::new(
                                "P010",
                                eco_format!("{}", err),
                                self.span_of(rhs),
                            ));
                            None
                        }
                    },
                    _ => None,
                };
                return self.push(
                    NodeKind::RegexMatch {
                        lhs,
                        pattern: rhs,
                        compiled,
                    },
                    span,
                    NodeFlags::OPERATOR,
                    TypeHint::Bool,
                );
            }
            _ => {}
        }

        self.verify_operands(op, lhs, rhs);
        if let Some(folded) = self.try_fold(op, lhs, rhs) {
            return self.literal(folded, span);
        }
        let egress = binary_egress(op, &self.egress(lhs), &self.egress(rhs));
        self.push(NodeKind::Binary { op, lhs, rhs }, span, NodeFlags::OPERATOR, egress)
    }

    /// Rejects arithmetic and bitwise operators over operands whose static
    /// types can never satisfy them.
    fn verify_operands(&mut self, op: BinaryOp, lhs: NodeId, rhs: NodeId) {
        let check = |ty: &TypeHint| {
            if op.is_arithmetic() {
                ty.is_arithmetic_operand()
            } else if op.is_bitwise() {
                !ty.is_known() || ty.is_numeric() || matches!(ty, TypeHint::Bool)
            } else {
                true
            }
        };
        for operand in [lhs, rhs] {
            let ty = self.egress(operand);
            if !check(&ty) {
                self.ctx.report(ErrorDetail::new(
                    "T001",
                    eco_format!("operator `{}` cannot be applied to {}", op, ty),
                    self.span_of(operand),
                ));
            }
        }
    }

    fn try_fold(&self, op: BinaryOp, lhs: NodeId, rhs: NodeId) -> Option<Value> {
        if !self.ctx.options.fold_literals {
            return None;
        }
        let (a, b) = (self.ast.node(lhs).literal()?, self.ast.node(rhs).literal()?);
        let folded = operators::binary(op, a, b).ok()?;
        trace!(%op, lhs = %a, rhs = %b, result = %folded, "folded literal operation");
        Some(folded)
    }

    // ========================================================================
    // Unary operators and casts
    // ========================================================================

    fn parse_unary(&mut self) -> PResult<NodeId> {
        let token = self.peek()?;
        let op = match token.kind {
            TokenKind::Punct(Punct::Minus) => Some(UnaryOp::Neg),
            TokenKind::Punct(Punct::Plus) => Some(UnaryOp::Plus),
            TokenKind::Punct(Punct::Bang) => Some(UnaryOp::Not),
            TokenKind::Punct(Punct::Tilde) => Some(UnaryOp::BitNot),
            TokenKind::Punct(Punct::Inc | Punct::Dec) => {
                return self.parse_prefix_step(token);
            }
            TokenKind::Punct(Punct::LParen) => {
                if let Some(ty) = self.cast_ahead()? {
                    return self.parse_cast(token.span, ty);
                }
                None
            }
            _ => None,
        };
        let Some(op) = op else {
            return self.parse_postfix();
        };
        self.require(LanguageLevel::BasicOps, &format!("unary `{}`", op), &token.span)?;
        self.bump()?;
        let operand = self.parse_unary()?;
        let span = self.span_to(&token.span, operand);

        if self.ctx.options.fold_literals {
            if let Some(value) = self.ast.node(operand).literal() {
                if let Ok(folded) = operators::unary(op, value) {
                    return Ok(self.literal(folded, span));
                }
            }
        }
        let egress = match op {
            UnaryOp::Not => TypeHint::Bool,
            _ => self.egress(operand),
        };
        Ok(self.push(NodeKind::Unary { op, operand }, span, NodeFlags::OPERATOR, egress))
    }

    fn parse_prefix_step(&mut self, token: Token) -> PResult<NodeId> {
        self.require(LanguageLevel::Assignment, "increment", &token.span)?;
        self.bump()?;
        let target = self.parse_postfix()?;
        let delta = if token.is_punct(Punct::Inc) { 1 } else { -1 };
        self.make_step(target, delta, true, Span::combine(&token.span, &self.span_of(target)))
    }

    pub(super) fn make_step(&mut self, target: NodeId, delta: i8, prefix: bool, span: Span) -> PResult<NodeId> {
        if !matches!(self.ast.node(target).kind, NodeKind::Path(_)) {
            return Err(ErrorDetail::new(
                "P014",
                eco_format!("cannot increment `{}`", self.ast.text(target)),
                self.span_of(target),
            ));
        }
        let egress = self.egress(target);
        Ok(self.push(
            NodeKind::IncDec {
                target,
                delta,
                prefix,
            },
            span,
            NodeFlags::ASSIGNMENT,
            egress,
        ))
    }

    /// With the cursor on `(`, checks for `(TypeName)` followed by an
    /// operand.
    fn cast_ahead(&mut self) -> PResult<Option<TypeHint>> {
        let mut lexer = self.lookahead()?;
        let TokenKind::Ident(mut name) = lexer.next_token()?.kind else {
            return Ok(None);
        };
        let mut token = lexer.next_token()?;
        while token.is_punct(Punct::Dot) {
            let TokenKind::Ident(part) = lexer.next_token()?.kind else {
                return Ok(None);
            };
            name.push('.');
            name.push_str(&part);
            token = lexer.next_token()?;
        }
        let mut dims = 0;
        while token.is_punct(Punct::LBracket) {
            if !lexer.next_token()?.is_punct(Punct::RBracket) {
                return Ok(None);
            }
            dims += 1;
            token = lexer.next_token()?;
        }
        if !token.is_punct(Punct::RParen) || !starts_operand(&lexer.next_token()?) {
            return Ok(None);
        }
        let mut ty = match TypeHint::from_name(&name) {
            Some(ty) => ty,
            None => match self.ctx.class(&name) {
                Some(class) => TypeHint::Class(class.name().clone()),
                None => return Ok(None),
            },
        };
        for _ in 0..dims {
            ty = TypeHint::Array(Box::new(ty));
        }
        Ok(Some(ty))
    }

    fn parse_cast(&mut self, start: Span, ty: TypeHint) -> PResult<NodeId> {
        self.require(LanguageLevel::BasicOps, "a cast", &start)?;
        let header = self.capture(Punct::LParen)?;
        self.in_range(&header, |p| p.parse_type())?;
        let operand = self.parse_unary()?;
        let span = self.span_to(&start, operand);
        if self.ctx.options.fold_literals {
            if let Some(value) = self.ast.node(operand).literal() {
                if let Ok(cast) = crate::casting::coerce(value.clone(), &ty) {
                    return Ok(self.literal(cast, span));
                }
            }
        }
        Ok(self.push(NodeKind::Cast { ty: ty.clone(), operand }, span, NodeFlags::OPERATOR, ty))
    }

    fn parse_postfix(&mut self) -> PResult<NodeId> {
        let primary = self.parse_primary()?;
        let node = self.parse_segments(primary)?;
        let token = self.peek()?;
        let delta = match token.kind {
            TokenKind::Punct(Punct::Inc) => 1,
            TokenKind::Punct(Punct::Dec) => -1,
            _ => return Ok(node),
        };
        self.require(LanguageLevel::Assignment, "increment", &token.span)?;
        self.bump()?;
        let span = Span::combine(&self.span_of(node), &token.span);
        self.make_step(node, delta, false, span)
    }

    // ========================================================================
    // Primaries
    // ========================================================================

    fn parse_primary(&mut self) -> PResult<Primary> {
        let token = self.peek()?;
        match token.kind {
            TokenKind::Literal(value) => {
                self.bump()?;
                Ok(Primary::Node(self.literal(value, token.span)))
            }
            TokenKind::Keyword(Keyword::Null) => {
                self.bump()?;
                Ok(Primary::Node(self.literal(Value::Null, token.span)))
            }
            TokenKind::Keyword(Keyword::Empty) => {
                self.bump()?;
                Ok(Primary::Node(self.literal(Value::Empty, token.span)))
            }
            TokenKind::Keyword(Keyword::This) => {
                self.bump()?;
                Ok(Primary::Root {
                    root: PathRoot::This,
                    span: token.span,
                    egress: TypeHint::Any,
                    unresolved: None,
                })
            }
            TokenKind::Keyword(Keyword::New) => self.parse_new().map(Primary::Node),
            TokenKind::Keyword(Keyword::IsDef) => self.parse_isdef().map(Primary::Node),
            TokenKind::Keyword(Keyword::Def | Keyword::Function) => self.parse_function().map(Primary::Node),
            TokenKind::Keyword(Keyword::With) => self.parse_with().map(Primary::Node),
            TokenKind::Ident(name) => self.parse_name(name, token.span),
            TokenKind::Punct(Punct::LParen) => self.parse_group().map(Primary::Node),
            TokenKind::Punct(Punct::LBracket) => self.parse_inline_collection().map(Primary::Node),
            TokenKind::Punct(Punct::LBrace) => {
                self.require(LanguageLevel::BasicOps, "an inline array", &token.span)?;
                let (items, span) = self.parse_braced_items()?;
                Ok(Primary::Node(self.push(
                    NodeKind::InlineArray {
                        elem: TypeHint::Any,
                        items,
                    },
                    span,
                    NodeFlags::empty(),
                    TypeHint::Array(Box::new(TypeHint::Any)),
                )))
            }
            other => Err(ErrorDetail::unexpected("an expression", &other, token.span)),
        }
    }

    /// A bare name or a call `name(args)`.
    fn parse_name(&mut self, name: ecow::EcoString, span: Span) -> PResult<Primary> {
        self.bump()?;
        if self.peek()?.is_punct(Punct::LParen) {
            let (args, args_span) = self.parse_call_args()?;
            return Ok(Primary::Root {
                root: PathRoot::Call { name, args },
                span: Span::new(span.start(), args_span.end()),
                egress: TypeHint::Any,
                unresolved: None,
            });
        }
        let primary = match self.ctx.binding(&name) {
            Binding::Param { slot, ty } => Primary::Root {
                root: PathRoot::Indexed { slot, name },
                span,
                egress: ty,
                unresolved: None,
            },
            Binding::Local(ty) => Primary::Root {
                root: PathRoot::Name(name),
                span,
                egress: ty,
                unresolved: None,
            },
            Binding::Unknown => Primary::Root {
                root: PathRoot::Name(name.clone()),
                span,
                egress: TypeHint::Any,
                unresolved: Some(name),
            },
        };
        Ok(primary)
    }

    /// `( expression )` or a projection `(property in source [if filter])`.
    fn parse_group(&mut self) -> PResult<NodeId> {
        let start = self.peek()?.span;
        let inner = self.capture(Punct::LParen)?;
        let span = Span::new(start.start(), inner.end() + 1);
        if !self.has_top_level_keyword(&inner, Keyword::In)? {
            return self.in_range(&inner, |p| {
                let id = p.parse_expression()?;
                Ok(id)
            });
        }

        self.require(Keyword::In.level(), "a projection", &start)?;
        self.in_range(&inner, |p| {
            p.relaxed += 1;
            let property = p.parse_ternary();
            p.relaxed -= 1;
            let property = property?;
            if !p.eat_keyword(Keyword::In)? {
                let token = p.peek()?;
                return Err(ErrorDetail::unexpected("`in`", &token.kind, token.span));
            }
            let source = p.parse_ternary()?;
            let filter = if p.eat_keyword(Keyword::If)? {
                p.relaxed += 1;
                let filter = p.parse_expression();
                p.relaxed -= 1;
                Some(filter?)
            } else {
                None
            };
            Ok(p.push(
                NodeKind::Projection {
                    property,
                    source,
                    filter,
                },
                span,
                NodeFlags::empty(),
                TypeHint::List,
            ))
        })
    }

    /// `[a, b]`, `[k: v, ...]` or `[:]`.
    fn parse_inline_collection(&mut self) -> PResult<NodeId> {
        let start = self.peek()?.span;
        self.require(LanguageLevel::BasicOps, "an inline collection", &start)?;
        let inner = self.capture(Punct::LBracket)?;
        let span = Span::new(start.start(), inner.end() + 1);
        self.in_range(&inner, |p| {
            let token = p.peek()?;
            if token.is_eof() {
                return Ok(p.push(NodeKind::InlineList(Vec::new()), span, NodeFlags::empty(), TypeHint::List));
            }
            if token.is_punct(Punct::Colon) {
                p.bump()?;
                return Ok(p.push(NodeKind::InlineMap(Vec::new()), span, NodeFlags::empty(), TypeHint::Map));
            }
            let first = p.parse_expression()?;
            if p.eat(Punct::Colon)? {
                let mut entries = vec![(first, p.parse_expression()?)];
                while p.eat(Punct::Comma)? {
                    let key = p.parse_expression()?;
                    p.expect(Punct::Colon)?;
                    entries.push((key, p.parse_expression()?));
                }
                return Ok(p.push(NodeKind::InlineMap(entries), span, NodeFlags::empty(), TypeHint::Map));
            }
            let mut items = vec![first];
            while p.eat(Punct::Comma)? {
                items.push(p.parse_expression()?);
            }
            Ok(p.push(NodeKind::InlineList(items), span, NodeFlags::empty(), TypeHint::List))
        })
    }

    /// `{a, b, c}`; returns the items and the span including the braces.
    fn parse_braced_items(&mut self) -> PResult<(Vec<NodeId>, Span)> {
        let start = self.peek()?.span;
        let inner = self.capture(Punct::LBrace)?;
        let items = self.in_range(&inner, |p| p.parse_comma_list())?;
        Ok((items, Span::new(start.start(), inner.end() + 1)))
    }

    /// `(a, b)`; returns the arguments and the span including the parens.
    pub(super) fn parse_call_args(&mut self) -> PResult<(Vec<NodeId>, Span)> {
        let start = self.peek()?.span;
        let inner = self.capture(Punct::LParen)?;
        let args = self.in_range(&inner, |p| p.parse_comma_list())?;
        Ok((args, Span::new(start.start(), inner.end() + 1)))
    }

    /// Comma-separated expressions up to the end of the current range.
    fn parse_comma_list(&mut self) -> PResult<Vec<NodeId>> {
        let mut items = Vec::new();
        if self.peek()?.is_eof() {
            return Ok(items);
        }
        loop {
            items.push(self.parse_expression()?);
            if !self.eat(Punct::Comma)? {
                return Ok(items);
            }
        }
    }

    /// `new Class(args)` or `new Type[] {items}`.
    fn parse_new(&mut self) -> PResult<NodeId> {
        let start = self.bump()?.span;
        self.require(Keyword::New.level(), "`new`", &start)?;
        let (name, name_span) = self.parse_dotted_name()?;

        if self.peek()?.is_punct(Punct::LBracket) {
            let mut elem = self.type_named(&name, &name_span);
            let mut dims = 0;
            while self.eat(Punct::LBracket)? {
                let close = self.bump()?;
                if !close.is_punct(Punct::RBracket) {
                    return Err(ErrorDetail::new(
                        "P015",
                        "sized array construction is not supported",
                        close.span,
                    )
                    .with_help("use an initializer: `new int[] {1, 2, 3}`"));
                }
                dims += 1;
            }
            for _ in 1..dims {
                elem = TypeHint::Array(Box::new(elem));
            }
            let (items, braces) = self.parse_braced_items()?;
            let span = Span::new(start.start(), braces.end());
            return Ok(self.push(
                NodeKind::InlineArray {
                    elem: elem.clone(),
                    items,
                },
                span,
                NodeFlags::empty(),
                TypeHint::Array(Box::new(elem)),
            ));
        }

        let (args, args_span) = self.parse_call_args()?;
        let span = Span::new(start.start(), args_span.end());
        let (class, egress) = match self.ctx.class(&name) {
            Some(class) => {
                let egress = TypeHint::Class(class.name().clone());
                (ClassRef::Resolved(class), egress)
            }
            None => {
                if self.ctx.is_strict() {
                    self.ctx.report(ErrorDetail::new(
                        "P012",
                        eco_format!("unknown class `{}`", name),
                        name_span,
                    ));
                }
                (ClassRef::Named(name), TypeHint::Any)
            }
        };
        Ok(self.push(NodeKind::New { class, args }, span, NodeFlags::empty(), egress))
    }

    /// `isdef name` or `isdef(name)`.
    fn parse_isdef(&mut self) -> PResult<NodeId> {
        let start = self.bump()?.span;
        self.require(Keyword::IsDef.level(), "`isdef`", &start)?;
        let (name, end) = if self.peek()?.is_punct(Punct::LParen) {
            let inner = self.capture(Punct::LParen)?;
            let name = self.in_range(&inner, |p| p.parse_dotted_name())?;
            (name.0, Span::new(inner.start(), inner.end() + 1))
        } else {
            self.parse_dotted_name()?
        };
        let span = Span::new(start.start(), end.end());
        Ok(self.push(NodeKind::IsDef(name), span, NodeFlags::empty(), TypeHint::Bool))
    }
}
