//! Recursive-descent parser producing the node arena.
//!
//! Statements and control-flow blocks are parsed here; operators live in
//! `expression.rs` and property paths in `path.rs`. Bracketed regions
//! (conditions, bodies, argument lists) are captured first and then parsed
//! by pointing the lexer at the captured range, so every span in the tree
//! stays absolute.
//!
//! Syntax errors abort at the first one and are returned as an
//! [`ErrorDetail`]; verification problems are reported to the
//! [`ParserContext`] and parsing continues.

use ecow::{EcoString, eco_format};

use crate::ast::{Ast, NodeFlags, NodeId, NodeKind, Param, WithEntry};
use crate::lexer::{Lexer, Punct, Token, TokenKind};
use crate::parser::context::ParserContext;
use crate::parser::error::ErrorDetail;
use crate::parser::operators::{Keyword, LanguageLevel};
use crate::parser::syntax::Span;
use crate::values::{TypeHint, Value};

pub(super) type PResult<T> = Result<T, ErrorDetail>;

pub struct Parser<'s, 'c> {
    src: &'s str,
    lexer: Lexer<'s>,
    peeked: Option<Token>,
    pub(super) ast: Ast,
    pub(super) ctx: ParserContext<'c>,
    /// Non-zero while parsing projections and `with` bodies, whose names
    /// resolve against a root only known at runtime.
    pub(super) relaxed: usize,
}

impl<'s, 'c> Parser<'s, 'c> {
    pub fn new(src: &'s str, ctx: ParserContext<'c>) -> Self {
        Self {
            src,
            lexer: Lexer::new(src),
            peeked: None,
            ast: Ast::new(ctx.source().clone()),
            ctx,
            relaxed: 0,
        }
    }

    pub fn finish(self) -> (Ast, ParserContext<'c>) {
        (self.ast, self.ctx)
    }

    // ========================================================================
    // Tokens
    // ========================================================================

    pub(super) fn peek(&mut self) -> PResult<Token> {
        if self.peeked.is_none() {
            self.peeked = Some(self.lexer.next_token()?);
        }
        match &self.peeked {
            Some(token) => Ok(token.clone()),
            None => Ok(Token {
                kind: TokenKind::Eof,
                span: Span::at(self.lexer.end()),
            }),
        }
    }

    pub(super) fn bump(&mut self) -> PResult<Token> {
        match self.peeked.take() {
            Some(token) => Ok(token),
            None => Ok(self.lexer.next_token()?),
        }
    }

    pub(super) fn eat(&mut self, punct: Punct) -> PResult<bool> {
        if self.peek()?.is_punct(punct) {
            self.bump()?;
            return Ok(true);
        }
        Ok(false)
    }

    pub(super) fn eat_keyword(&mut self, keyword: Keyword) -> PResult<bool> {
        if self.peek()?.is_keyword(keyword) {
            self.bump()?;
            return Ok(true);
        }
        Ok(false)
    }

    pub(super) fn expect(&mut self, punct: Punct) -> PResult<Token> {
        let token = self.bump()?;
        if token.is_punct(punct) {
            Ok(token)
        } else {
            Err(ErrorDetail::unexpected(
                &format!("`{}`", punct.as_str()),
                &token.kind,
                token.span,
            ))
        }
    }

    pub(super) fn expect_ident(&mut self, what: &str) -> PResult<(EcoString, Span)> {
        let token = self.bump()?;
        match token.kind {
            TokenKind::Ident(name) => Ok((name, token.span)),
            other => Err(ErrorDetail::unexpected(what, &other, token.span)),
        }
    }

    /// A copy of the lexer positioned after the next token.
    pub(super) fn lookahead(&mut self) -> PResult<Lexer<'s>> {
        self.peek()?;
        Ok(self.lexer.clone())
    }

    /// The token after the next one.
    pub(super) fn peek_second(&mut self) -> PResult<Token> {
        Ok(self.lookahead()?.next_token()?)
    }

    /// Consumes an opening bracket and returns the span of its contents;
    /// the cursor ends up after the matching close bracket.
    pub(super) fn capture(&mut self, open: Punct) -> PResult<Span> {
        let ch = match open {
            Punct::LParen => '(',
            Punct::LBracket => '[',
            _ => '{',
        };
        self.expect(open)?;
        Ok(self.lexer.capture_balanced(ch)?)
    }

    /// Runs `f` with the lexer restricted to `span`; `f` must consume the
    /// whole range.
    pub(super) fn in_range<T>(
        &mut self,
        span: &Span,
        f: impl FnOnce(&mut Self) -> PResult<T>,
    ) -> PResult<T> {
        let inner = Lexer::with_range(self.src, span.start(), span.end());
        let outer = core::mem::replace(&mut self.lexer, inner);
        let outer_peeked = self.peeked.take();
        let result = f(self).and_then(|value| {
            let token = self.peek()?;
            if token.is_eof() {
                Ok(value)
            } else {
                Err(ErrorDetail::unexpected("end of expression", &token.kind, token.span))
            }
        });
        self.lexer = outer;
        self.peeked = outer_peeked;
        result
    }

    /// Splits `span` at top-level semicolons. A trailing semicolon yields an
    /// empty last part.
    pub(super) fn split_statements(&self, span: &Span) -> PResult<Vec<Span>> {
        let mut lexer = Lexer::with_range(self.src, span.start(), span.end());
        let mut parts = Vec::new();
        loop {
            let part = lexer.capture_to_eos()?;
            let terminated =
                part.end() < span.end() && self.src.as_bytes().get(part.end()) == Some(&b';');
            parts.push(part);
            if !terminated {
                break;
            }
            if lexer.at_end()? {
                parts.push(Span::at(lexer.position()));
                break;
            }
        }
        Ok(parts)
    }

    /// Whether `keyword` appears in `span` outside nested brackets.
    pub(super) fn has_top_level_keyword(&self, span: &Span, keyword: Keyword) -> PResult<bool> {
        let mut lexer = Lexer::with_range(self.src, span.start(), span.end());
        let mut depth = 0usize;
        loop {
            let token = lexer.next_token()?;
            match token.kind {
                TokenKind::Eof => return Ok(false),
                TokenKind::Keyword(kw) if kw == keyword && depth == 0 => return Ok(true),
                TokenKind::Punct(Punct::LParen | Punct::LBracket | Punct::LBrace) => depth += 1,
                TokenKind::Punct(Punct::RParen | Punct::RBracket | Punct::RBrace) => {
                    depth = depth.saturating_sub(1)
                }
                _ => {}
            }
        }
    }

    fn is_blank(&self, span: &Span) -> bool {
        span.str_of(self.src).trim().is_empty()
    }

    // ========================================================================
    // Building
    // ========================================================================

    pub(super) fn require(&self, required: LanguageLevel, construct: &str, span: &Span) -> PResult<()> {
        let configured = self.ctx.options.language_level;
        if required > configured {
            return Err(ErrorDetail::level(construct, required, configured, span.clone()));
        }
        Ok(())
    }

    pub(super) fn push(&mut self, kind: NodeKind, span: Span, flags: NodeFlags, egress: TypeHint) -> NodeId {
        self.ast.push(kind, span, flags, egress)
    }

    pub(super) fn literal(&mut self, value: Value, span: Span) -> NodeId {
        let egress = value.type_hint();
        self.push(NodeKind::Literal(value), span, NodeFlags::LITERAL, egress)
    }

    pub(super) fn span_of(&self, id: NodeId) -> Span {
        self.ast.node(id).span.clone()
    }

    pub(super) fn egress(&self, id: NodeId) -> TypeHint {
        self.ast.node(id).egress.clone()
    }

    /// `start` extended to the end of node `id`.
    pub(super) fn span_to(&self, start: &Span, id: NodeId) -> Span {
        Span::new(start.start(), self.ast.node(id).span.end())
    }

    // ========================================================================
    // Statements
    // ========================================================================

    /// Parses the whole source. `None` for a source without statements.
    pub fn parse_program(&mut self) -> PResult<Option<NodeId>> {
        let start = self.peek()?.span;
        let statements = self.parse_statements(true)?;
        Ok(match statements.len() {
            0 => None,
            1 => Some(statements[0]),
            _ => {
                let span = Span::new(start.start(), self.span_of(statements[statements.len() - 1]).end());
                let egress = self.egress(statements[statements.len() - 1]);
                Some(self.push(
                    NodeKind::Block {
                        statements,
                        scoped: false,
                    },
                    span,
                    NodeFlags::empty(),
                    egress,
                ))
            }
        })
    }

    fn parse_statements(&mut self, top_level: bool) -> PResult<Vec<NodeId>> {
        let mut statements = Vec::new();
        let mut separated = true;
        loop {
            while self.eat(Punct::Semi)? {
                separated = true;
            }
            let token = self.peek()?;
            if token.is_eof() {
                break;
            }
            if !separated {
                return Err(ErrorDetail::unexpected("`;` between statements", &token.kind, token.span));
            }
            if !statements.is_empty() {
                self.require(LanguageLevel::MultiStatement, "a statement sequence", &token.span)?;
            }
            let id = self.parse_statement()?;
            if top_level {
                self.ctx.record_line(id, token.span.start());
            }
            separated = self.ast.node(id).flags.contains(NodeFlags::BLOCK);
            statements.push(id);
        }
        if let Some((_, rest)) = statements.split_last() {
            for &id in rest {
                self.ast.node_mut(id).flags |= NodeFlags::DISCARD;
            }
        }
        Ok(statements)
    }

    pub(super) fn parse_statement(&mut self) -> PResult<NodeId> {
        let token = self.peek()?;
        match &token.kind {
            TokenKind::Keyword(keyword) => match keyword {
                Keyword::If => return self.parse_if(),
                Keyword::Foreach => return self.parse_foreach(),
                Keyword::For => return self.parse_for(),
                Keyword::While | Keyword::Until => return self.parse_while(),
                Keyword::Do => return self.parse_do(),
                Keyword::Return => return self.parse_return(),
                Keyword::Import => return self.parse_import(),
                Keyword::Var => return self.parse_declaration(),
                Keyword::Else => {
                    return Err(ErrorDetail::unexpected("a statement", &token.kind, token.span));
                }
                _ => {}
            },
            TokenKind::Punct(Punct::At) => return self.parse_intercepted(),
            TokenKind::Ident(_) if self.looks_like_declaration()? => return self.parse_declaration(),
            _ => {}
        }
        self.parse_expression()
    }

    /// `{ statements }` or a single statement. `scoped` blocks open a
    /// compile-time and a runtime scope.
    fn parse_block(&mut self, scoped: bool) -> PResult<NodeId> {
        if scoped {
            self.ctx.push_scope();
        }
        let block = self.parse_block_inner(scoped);
        if scoped {
            self.ctx.pop_scope();
        }
        block
    }

    fn parse_block_inner(&mut self, scoped: bool) -> PResult<NodeId> {
        let (statements, span) = if self.peek()?.is_punct(Punct::LBrace) {
            let body = self.capture(Punct::LBrace)?;
            let statements = self.in_range(&body, |p| p.parse_statements(false))?;
            (statements, Span::new(body.start().saturating_sub(1), body.end() + 1))
        } else {
            let statement = self.parse_statement()?;
            let span = self.span_of(statement);
            (vec![statement], span)
        };
        let egress = statements
            .last()
            .map(|id| self.egress(*id))
            .unwrap_or(TypeHint::Null);
        Ok(self.push(NodeKind::Block { statements, scoped }, span, NodeFlags::empty(), egress))
    }

    /// `( expression )` after a control-flow keyword.
    fn parse_condition(&mut self) -> PResult<NodeId> {
        let span = self.capture(Punct::LParen)?;
        self.in_range(&span, |p| p.parse_expression())
    }

    fn parse_if(&mut self) -> PResult<NodeId> {
        let start = self.bump()?.span;
        self.require(Keyword::If.level(), "`if`", &start)?;
        let cond = self.parse_condition()?;
        let then = self.parse_block(true)?;
        let otherwise = if self.eat_keyword(Keyword::Else)? {
            if self.peek()?.is_keyword(Keyword::If) {
                Some(self.parse_if()?)
            } else {
                Some(self.parse_block(true)?)
            }
        } else {
            None
        };
        let last = otherwise.unwrap_or(then);
        let egress = match otherwise {
            Some(otherwise) if self.egress(otherwise) == self.egress(then) => self.egress(then),
            _ => TypeHint::Any,
        };
        let span = self.span_to(&start, last);
        Ok(self.push(
            NodeKind::If {
                cond,
                then,
                otherwise,
            },
            span,
            NodeFlags::BLOCK,
            egress,
        ))
    }

    fn parse_foreach(&mut self) -> PResult<NodeId> {
        let start = self.bump()?.span;
        self.require(Keyword::Foreach.level(), "`foreach`", &start)?;
        let header = self.capture(Punct::LParen)?;
        self.parse_foreach_rest(start, header)
    }

    fn parse_foreach_rest(&mut self, start: Span, header: Span) -> PResult<NodeId> {
        let (item, item_ty, iterable) = self.in_range(&header, |p| {
            let typed = matches!(p.peek()?.kind, TokenKind::Ident(_)) && p.starts_typed_name()?;
            let item_ty = if typed { p.parse_type()? } else { TypeHint::Any };
            let (item, item_span) = p.expect_ident("a loop variable")?;
            if !p.eat(Punct::Colon)? {
                return Err(ErrorDetail::new("P007", "missing `:` in foreach", item_span)
                    .with_help("write `foreach (item : collection)`"));
            }
            let iterable = p.parse_expression()?;
            Ok((item, item_ty, iterable))
        })?;

        self.ctx.push_scope();
        self.ctx.declare(&item, item_ty.clone());
        let body = self.parse_block(true);
        self.ctx.pop_scope();
        let body = body?;

        let span = self.span_to(&start, body);
        Ok(self.push(
            NodeKind::ForEach {
                item,
                item_ty,
                iterable,
                body,
            },
            span,
            NodeFlags::BLOCK,
            TypeHint::Any,
        ))
    }

    /// `for (item : collection)` or `for (init; condition; step)`.
    fn parse_for(&mut self) -> PResult<NodeId> {
        let start = self.bump()?.span;
        self.require(Keyword::For.level(), "`for`", &start)?;
        let header = self.capture(Punct::LParen)?;
        let parts = self.split_statements(&header)?;
        if parts.len() == 1 {
            return self.parse_foreach_rest(start, header);
        }
        if parts.len() != 3 {
            return Err(ErrorDetail::new(
                "P008",
                "`for` needs `init; condition; step`",
                header,
            ));
        }

        self.ctx.push_scope();
        let result = self.parse_for_parts(&parts);
        self.ctx.pop_scope();
        let (init, cond, step, body) = result?;

        let span = self.span_to(&start, body);
        Ok(self.push(
            NodeKind::For {
                init,
                cond,
                step,
                body,
            },
            span,
            NodeFlags::BLOCK,
            TypeHint::Any,
        ))
    }

    #[allow(clippy::type_complexity)]
    fn parse_for_parts(
        &mut self,
        parts: &[Span],
    ) -> PResult<(Option<NodeId>, Option<NodeId>, Option<NodeId>, NodeId)> {
        let init = self.parse_optional(&parts[0], |p| p.parse_statement())?;
        let cond = self.parse_optional(&parts[1], |p| p.parse_expression())?;
        let step = self.parse_optional(&parts[2], |p| p.parse_statement())?;
        let body = self.parse_block(true)?;
        Ok((init, cond, step, body))
    }

    fn parse_optional(
        &mut self,
        span: &Span,
        f: impl FnOnce(&mut Self) -> PResult<NodeId>,
    ) -> PResult<Option<NodeId>> {
        if self.is_blank(span) {
            return Ok(None);
        }
        self.in_range(span, f).map(Some)
    }

    fn parse_while(&mut self) -> PResult<NodeId> {
        let token = self.bump()?;
        let until = token.is_keyword(Keyword::Until);
        let name = if until { "`until`" } else { "`while`" };
        self.require(Keyword::While.level(), name, &token.span)?;
        let cond = self.parse_condition()?;
        let body = self.parse_block(true)?;
        let span = self.span_to(&token.span, body);
        Ok(self.push(
            NodeKind::While { cond, body, until },
            span,
            NodeFlags::BLOCK,
            TypeHint::Any,
        ))
    }

    fn parse_do(&mut self) -> PResult<NodeId> {
        let start = self.bump()?.span;
        self.require(Keyword::Do.level(), "`do`", &start)?;
        let body = self.parse_block(true)?;
        let token = self.bump()?;
        let until = match token.kind {
            TokenKind::Keyword(Keyword::While) => false,
            TokenKind::Keyword(Keyword::Until) => true,
            other => return Err(ErrorDetail::unexpected("`while` or `until`", &other, token.span)),
        };
        let cond = self.parse_condition()?;
        let span = self.span_to(&start, cond);
        Ok(self.push(
            NodeKind::DoWhile { body, cond, until },
            span,
            NodeFlags::BLOCK,
            TypeHint::Any,
        ))
    }

    /// `with (target) { prop = value, prop += value, statement }`.
    pub(super) fn parse_with(&mut self) -> PResult<NodeId> {
        let start = self.bump()?.span;
        self.require(Keyword::With.level(), "`with`", &start)?;
        let target = self.parse_condition()?;
        let body = self.capture(Punct::LBrace)?;
        self.relaxed += 1;
        let entries = self.in_range(&body, |p| p.parse_with_entries());
        self.relaxed -= 1;
        let entries = entries?;
        let span = Span::new(start.start(), body.end() + 1);
        let egress = self.egress(target);
        Ok(self.push(NodeKind::With { target, entries }, span, NodeFlags::BLOCK, egress))
    }

    fn parse_with_entries(&mut self) -> PResult<Vec<WithEntry>> {
        let mut entries = Vec::new();
        loop {
            while self.eat(Punct::Comma)? || self.eat(Punct::Semi)? {}
            let token = self.peek()?;
            if token.is_eof() {
                return Ok(entries);
            }
            let assignment = match (&token.kind, self.peek_second()?.kind) {
                (TokenKind::Ident(_), TokenKind::Punct(punct)) if punct.is_assignment() => Some(punct),
                _ => None,
            };
            match assignment {
                Some(punct) => {
                    let (property, name_span) = self.expect_ident("a property name")?;
                    self.bump()?;
                    let value = self.parse_expression()?;
                    entries.push(WithEntry::Assign {
                        property,
                        op: punct.compound_op(),
                        value,
                        span: self.span_to(&name_span, value),
                    });
                }
                None => entries.push(WithEntry::Statement(self.parse_statement()?)),
            }
        }
    }

    /// `def name(a, b) { ... }`, `function name(a) { ... }` or an anonymous
    /// `def (a) { ... }`.
    pub(super) fn parse_function(&mut self) -> PResult<NodeId> {
        let start = self.bump()?.span;
        self.require(Keyword::Def.level(), "a function", &start)?;
        let name = match self.peek()?.kind {
            TokenKind::Ident(name) => {
                self.bump()?;
                Some(name)
            }
            _ => None,
        };
        if let Some(name) = &name {
            self.ctx.declare(name, TypeHint::Function);
        }
        let header = self.capture(Punct::LParen)?;
        let params = self.in_range(&header, |p| p.parse_params())?;
        let bound: Vec<(EcoString, TypeHint)> = params
            .iter()
            .map(|param| (param.name.clone(), param.ty.clone()))
            .collect();

        self.ctx.push_function(&bound);
        let body = self.parse_block(false);
        let free = self.ctx.pop_function();
        let body = body?;
        for input in free {
            if !self.ctx.is_declared(&input) {
                self.ctx.add_input(&input);
            }
        }

        let flags = if name.is_some() {
            NodeFlags::BLOCK
        } else {
            NodeFlags::empty()
        };
        let span = self.span_to(&start, body);
        Ok(self.push(
            NodeKind::Function { name, params, body },
            span,
            flags,
            TypeHint::Function,
        ))
    }

    fn parse_params(&mut self) -> PResult<Vec<Param>> {
        let mut params = Vec::new();
        if self.peek()?.is_eof() {
            return Ok(params);
        }
        loop {
            let ty = if self.starts_typed_name()? { self.parse_type()? } else { TypeHint::Any };
            let (name, span) = self.expect_ident("a parameter name")?;
            if params.iter().any(|p: &Param| p.name == name) {
                self.ctx.report(ErrorDetail::new(
                    "P013",
                    eco_format!("duplicate parameter `{}`", name),
                    span,
                ));
            }
            params.push(Param { name, ty });
            if !self.eat(Punct::Comma)? {
                return Ok(params);
            }
        }
    }

    fn parse_return(&mut self) -> PResult<NodeId> {
        let start = self.bump()?.span;
        self.require(Keyword::Return.level(), "`return`", &start)?;
        let token = self.peek()?;
        if token.is_eof() || token.is_punct(Punct::Semi) {
            return Ok(self.push(NodeKind::Return(None), start, NodeFlags::empty(), TypeHint::Null));
        }
        let value = self.parse_expression()?;
        let span = self.span_to(&start, value);
        let egress = self.egress(value);
        Ok(self.push(NodeKind::Return(Some(value)), span, NodeFlags::empty(), egress))
    }

    /// `import a.b.C` or `import a.b.*`; takes effect immediately.
    fn parse_import(&mut self) -> PResult<NodeId> {
        let start = self.bump()?.span;
        self.require(Keyword::Import.level(), "`import`", &start)?;
        let (mut path, mut end) = self.expect_ident("a class name")?;
        while self.eat(Punct::Dot)? {
            let token = self.bump()?;
            match token.kind {
                TokenKind::Ident(part) => {
                    path.push('.');
                    path.push_str(&part);
                }
                TokenKind::Punct(Punct::Star) => path.push_str(".*"),
                other => return Err(ErrorDetail::unexpected("a package or class name", &other, token.span)),
            }
            end = token.span;
            if path.ends_with(".*") {
                break;
            }
        }
        let span = Span::new(start.start(), end.end());
        let config = self.ctx.config;
        if !self.ctx.imports.import(&path, &config.registry) {
            self.ctx.report(ErrorDetail::unknown_import(&path, span.clone()));
        }
        Ok(self.push(
            NodeKind::Import(path),
            span,
            NodeFlags::COMPILE_IMMEDIATE,
            TypeHint::Void,
        ))
    }

    /// Whether the statement starts with `Type name =`, `Type name;` or
    /// `Type[] name ...`.
    fn looks_like_declaration(&mut self) -> PResult<bool> {
        let TokenKind::Ident(mut name) = self.peek()?.kind else {
            return Ok(false);
        };
        let mut lexer = self.lookahead()?;
        let mut token = lexer.next_token()?;
        while token.is_punct(Punct::Dot) {
            match lexer.next_token()?.kind {
                TokenKind::Ident(part) => {
                    name.push('.');
                    name.push_str(&part);
                }
                _ => return Ok(false),
            }
            token = lexer.next_token()?;
        }
        while token.is_punct(Punct::LBracket) {
            if !lexer.next_token()?.is_punct(Punct::RBracket) {
                return Ok(false);
            }
            token = lexer.next_token()?;
        }
        if !matches!(token.kind, TokenKind::Ident(_)) {
            return Ok(false);
        }
        let after = lexer.next_token()?;
        let ends = after.is_punct(Punct::Assign) || after.is_punct(Punct::Semi) || after.is_eof();
        Ok(ends && (TypeHint::from_name(&name).is_some() || self.ctx.class(&name).is_some()))
    }

    /// `int x = 1`, `var y`, `String[] names = {"a"}`.
    fn parse_declaration(&mut self) -> PResult<NodeId> {
        let start = self.peek()?.span;
        self.require(LanguageLevel::Assignment, "a declaration", &start)?;
        let ty = if self.eat_keyword(Keyword::Var)? {
            TypeHint::Any
        } else {
            self.parse_type()?
        };
        let (name, name_span) = self.expect_ident("a variable name")?;
        let value = if self.eat(Punct::Assign)? {
            Some(self.parse_expression()?)
        } else {
            None
        };
        if let Some(value) = value {
            // `{...}` initializers take the declared element type.
            if let TypeHint::Array(declared) = &ty {
                let node = self.ast.node_mut(value);
                if let NodeKind::InlineArray { elem, .. } = &mut node.kind {
                    if !elem.is_known() {
                        *elem = (**declared).clone();
                        node.egress = ty.clone();
                    }
                }
            }
            let source = self.egress(value);
            if self.ctx.is_strict() && !ty.accepts(&source) {
                self.ctx.report(ErrorDetail::new(
                    "T004",
                    eco_format!("cannot assign {} to `{}` of type {}", source, name, ty),
                    self.span_of(value),
                ));
            }
        }
        self.ctx.declare(&name, ty.clone());
        let span = match value {
            Some(value) => self.span_to(&start, value),
            None => Span::new(start.start(), name_span.end()),
        };
        Ok(self.push(
            NodeKind::Declare {
                name,
                ty: ty.clone(),
                value,
            },
            span,
            NodeFlags::ASSIGNMENT,
            ty,
        ))
    }

    /// A type name: a builtin (`int`, `String`), an imported or fully
    /// qualified class, optionally followed by `[]` pairs.
    pub(super) fn parse_type(&mut self) -> PResult<TypeHint> {
        let (name, span) = self.parse_dotted_name()?;
        let mut ty = self.type_named(&name, &span);
        while self.peek()?.is_punct(Punct::LBracket) && self.peek_second()?.is_punct(Punct::RBracket) {
            self.bump()?;
            self.bump()?;
            ty = TypeHint::Array(Box::new(ty));
        }
        Ok(ty)
    }

    pub(super) fn type_named(&mut self, name: &str, span: &Span) -> TypeHint {
        if let Some(ty) = TypeHint::from_name(name) {
            return ty;
        }
        if let Some(class) = self.ctx.class(name) {
            return TypeHint::Class(class.name().clone());
        }
        if self.ctx.is_strict() {
            self.ctx.report(ErrorDetail::new(
                "P012",
                eco_format!("unknown type `{}`", name),
                span.clone(),
            ));
        }
        TypeHint::Class(name.into())
    }

    /// Whether the identifier at the cursor is a type followed by a name,
    /// as in `int x` or `String[] names`.
    fn starts_typed_name(&mut self) -> PResult<bool> {
        let second = self.peek_second()?;
        Ok(matches!(second.kind, TokenKind::Ident(_))
            || second.is_punct(Punct::LBracket)
            || second.is_punct(Punct::Dot))
    }

    /// `a.b.C` as one name.
    pub(super) fn parse_dotted_name(&mut self) -> PResult<(EcoString, Span)> {
        let (mut name, start) = self.expect_ident("a type name")?;
        let mut end = start.clone();
        while self.peek()?.is_punct(Punct::Dot) && matches!(self.peek_second()?.kind, TokenKind::Ident(_)) {
            self.bump()?;
            let (part, span) = self.expect_ident("a type name")?;
            name.push('.');
            name.push_str(&part);
            end = span;
        }
        Ok((name, Span::new(start.start(), end.end())))
    }

    /// `@Name statement`.
    fn parse_intercepted(&mut self) -> PResult<NodeId> {
        let start = self.bump()?.span;
        self.require(LanguageLevel::ControlFlow, "an interceptor", &start)?;
        let (name, name_span) = self.expect_ident("an interceptor name")?;
        let interceptor = self.ctx.interceptor(&name).ok_or_else(|| {
            ErrorDetail::new("P009", eco_format!("unknown interceptor `{}`", name), name_span)
        })?;
        let statement = self.parse_statement()?;
        let flags = self.ast.node(statement).flags & NodeFlags::BLOCK;
        let egress = self.egress(statement);
        let span = self.span_to(&start, statement);
        Ok(self.push(
            NodeKind::Intercepted {
                name,
                interceptor,
                statement,
            },
            span,
            flags,
            egress,
        ))
    }
}
