//! Hand-written lexer over a character buffer.
//!
//! The lexer is a cursor into the full source text restricted to a byte
//! range, so sub-expressions captured by the parser (conditions, block
//! bodies) are re-lexed in place and every span stays absolute.
//!
//! Besides `next_token`, the cursor offers the capture primitives the
//! parser builds control-flow blocks with:
//!
//! - [`Lexer::capture_balanced`]: everything up to the bracket matching an
//!   opening one, with quotes and comments skipped while counting.
//! - [`Lexer::capture_to_eos`]: everything up to the next top-level `;`.

mod literals;
mod token;

use ecow::EcoString;
use thiserror::Error;

pub use literals::{NumberError, UnescapeError, escape_string, parse_number_literal, unescape_string};
pub use token::{Punct, Token, TokenKind};

use crate::parser::operators::{self, Keyword};
use crate::parser::syntax::Span;
use crate::values::Value;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum LexErrorKind {
    #[error("unexpected character '{0}'")]
    UnexpectedChar(char),
    #[error("unterminated string literal")]
    UnterminatedString,
    #[error("unterminated block comment")]
    UnterminatedComment,
    #[error("unbalanced '{0}'")]
    Unbalanced(char),
    #[error("mismatched '{found}', expected '{expected}'")]
    Mismatched { expected: char, found: char },
    #[error(transparent)]
    Escape(#[from] UnescapeError),
    #[error(transparent)]
    Number(#[from] NumberError),
}

#[derive(Debug, Clone, PartialEq, Error)]
#[error("{kind}")]
pub struct LexError {
    pub kind: LexErrorKind,
    pub span: Span,
}

impl LexError {
    fn new(kind: LexErrorKind, span: Span) -> Self {
        Self { kind, span }
    }
}

fn closing(open: char) -> char {
    match open {
        '(' => ')',
        '[' => ']',
        _ => '}',
    }
}

#[derive(Debug, Clone)]
pub struct Lexer<'s> {
    src: &'s str,
    pos: usize,
    end: usize,
}

impl<'s> Lexer<'s> {
    pub fn new(src: &'s str) -> Self {
        Self::with_range(src, 0, src.len())
    }

    /// A cursor over `src[start..end]`; offsets stay relative to `src`.
    pub fn with_range(src: &'s str, start: usize, end: usize) -> Self {
        Self {
            src,
            pos: start,
            end: end.min(src.len()),
        }
    }

    pub fn source(&self) -> &'s str {
        self.src
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn set_position(&mut self, pos: usize) {
        self.pos = pos.min(self.end);
    }

    pub fn end(&self) -> usize {
        self.end
    }

    fn rest(&self) -> &'s str {
        &self.src[self.pos..self.end]
    }

    pub fn peek_char(&self) -> Option<char> {
        self.rest().chars().next()
    }

    /// The `n`th character ahead of the cursor (0 is the current one).
    pub fn peek_char_at(&self, n: usize) -> Option<char> {
        self.rest().chars().nth(n)
    }

    /// The character just before the cursor, ignoring the range start.
    pub fn prev_char(&self) -> Option<char> {
        self.src[..self.pos].chars().next_back()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek_char()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.peek_char() == Some(expected) {
            self.pos += expected.len_utf8();
            true
        } else {
            false
        }
    }

    /// Whether only whitespace and comments remain.
    pub fn at_end(&mut self) -> Result<bool, LexError> {
        self.skip_trivia()?;
        Ok(self.pos >= self.end)
    }

    /// Skips whitespace, `//` and `#` line comments and `/* */` block comments.
    pub fn skip_trivia(&mut self) -> Result<(), LexError> {
        loop {
            match self.peek_char() {
                Some(c) if c.is_whitespace() => {
                    self.bump();
                }
                Some('#') => self.skip_line(),
                Some('/') if self.peek_char_at(1) == Some('/') => self.skip_line(),
                Some('/') if self.peek_char_at(1) == Some('*') => {
                    let start = self.pos;
                    match self.rest()[2..].find("*/") {
                        Some(offset) => self.pos += 2 + offset + 2,
                        None => {
                            return Err(LexError::new(
                                LexErrorKind::UnterminatedComment,
                                Span::new(start, self.end),
                            ));
                        }
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    fn skip_line(&mut self) {
        match self.rest().find('\n') {
            Some(offset) => self.pos += offset + 1,
            None => self.pos = self.end,
        }
    }

    pub fn next_token(&mut self) -> Result<Token, LexError> {
        self.skip_trivia()?;
        let start = self.pos;
        let Some(c) = self.peek_char() else {
            return Ok(Token {
                kind: TokenKind::Eof,
                span: Span::at(self.end),
            });
        };

        let kind = if c.is_alphabetic() || c == '_' || c == '$' {
            self.lex_word()
        } else if c.is_ascii_digit() {
            self.lex_number()?
        } else if c == '"' || c == '\'' {
            self.lex_string(c)?
        } else {
            TokenKind::Punct(self.lex_punct(c)?)
        };

        Ok(Token {
            kind,
            span: Span::new(start, self.pos),
        })
    }

    fn lex_word(&mut self) -> TokenKind {
        let start = self.pos;
        while let Some(c) = self.peek_char() {
            if c.is_alphanumeric() || c == '_' || c == '$' {
                self.bump();
            } else {
                break;
            }
        }
        let word = &self.src[start..self.pos];
        if let Some(kw) = operators::keyword(word) {
            return match kw {
                Keyword::True => TokenKind::Literal(Value::Bool(true)),
                Keyword::False => TokenKind::Literal(Value::Bool(false)),
                _ => TokenKind::Keyword(kw),
            };
        }
        if let Some(op) = operators::word_operator(word) {
            return TokenKind::WordOp(op);
        }
        TokenKind::Ident(EcoString::from(word))
    }

    fn lex_number(&mut self) -> Result<TokenKind, LexError> {
        let start = self.pos;
        if self.peek_char() == Some('0') && matches!(self.peek_char_at(1), Some('x' | 'X')) {
            self.pos += 2;
            while self.peek_char().is_some_and(|c| c.is_ascii_hexdigit()) {
                self.bump();
            }
            if matches!(self.peek_char(), Some('l' | 'L')) {
                self.bump();
            }
        } else {
            self.eat_digits();
            if self.peek_char() == Some('.') && self.peek_char_at(1).is_some_and(|c| c.is_ascii_digit())
            {
                self.bump();
                self.eat_digits();
            }
            if matches!(self.peek_char(), Some('e' | 'E')) {
                let sign = matches!(self.peek_char_at(1), Some('+' | '-'));
                let digit_at = if sign { 2 } else { 1 };
                if self.peek_char_at(digit_at).is_some_and(|c| c.is_ascii_digit()) {
                    self.pos += digit_at;
                    self.eat_digits();
                }
            }
            if matches!(self.peek_char(), Some('l' | 'L' | 'f' | 'F' | 'd' | 'D')) {
                self.bump();
            }
        }
        let text = &self.src[start..self.pos];
        parse_number_literal(text)
            .map(TokenKind::Literal)
            .map_err(|e| LexError::new(e.into(), Span::new(start, self.pos)))
    }

    fn eat_digits(&mut self) {
        while self.peek_char().is_some_and(|c| c.is_ascii_digit()) {
            self.bump();
        }
    }

    fn lex_string(&mut self, quote: char) -> Result<TokenKind, LexError> {
        let start = self.pos;
        self.bump();
        let content_start = self.pos;
        let content_end = self.skip_string_body(quote).ok_or_else(|| {
            LexError::new(LexErrorKind::UnterminatedString, Span::new(start, self.end))
        })?;
        unescape_string(&self.src[content_start..content_end])
            .map(|s| TokenKind::Literal(Value::Str(s)))
            .map_err(|e| {
                let at = content_start + e.pos();
                LexError::new(e.into(), Span::new(at, at + 2))
            })
    }

    /// Advances past the closing `quote`; returns the offset of the quote.
    fn skip_string_body(&mut self, quote: char) -> Option<usize> {
        loop {
            match self.bump()? {
                '\\' => {
                    self.bump()?;
                }
                c if c == quote => return Some(self.pos - c.len_utf8()),
                _ => {}
            }
        }
    }

    fn lex_punct(&mut self, c: char) -> Result<Punct, LexError> {
        let start = self.pos;
        self.bump();
        let punct = match c {
            '(' => Punct::LParen,
            ')' => Punct::RParen,
            '[' => Punct::LBracket,
            ']' => Punct::RBracket,
            '{' => Punct::LBrace,
            '}' => Punct::RBrace,
            ',' => Punct::Comma,
            ';' => Punct::Semi,
            ':' => Punct::Colon,
            '?' => Punct::Question,
            '@' => Punct::At,
            '.' if self.eat('?') => Punct::NullSafeDot,
            '.' => Punct::Dot,
            '=' if self.eat('=') => Punct::EqEq,
            '=' => Punct::Assign,
            '+' if self.eat('+') => Punct::Inc,
            '+' if self.eat('=') => Punct::PlusAssign,
            '+' => Punct::Plus,
            '-' if self.eat('-') => Punct::Dec,
            '-' if self.eat('=') => Punct::MinusAssign,
            '-' => Punct::Minus,
            '*' if self.eat('*') => Punct::StarStar,
            '*' if self.eat('=') => Punct::StarAssign,
            '*' => Punct::Star,
            '/' if self.eat('=') => Punct::SlashAssign,
            '/' => Punct::Slash,
            '%' if self.eat('=') => Punct::PercentAssign,
            '%' => Punct::Percent,
            '&' if self.eat('&') => Punct::AmpAmp,
            '&' if self.eat('=') => Punct::AmpAssign,
            '&' => Punct::Amp,
            '|' if self.eat('|') => Punct::PipePipe,
            '|' if self.eat('=') => Punct::PipeAssign,
            '|' => Punct::Pipe,
            '^' if self.eat('=') => Punct::CaretAssign,
            '^' => Punct::Caret,
            '~' if self.eat('=') => Punct::TildeEq,
            '~' => Punct::Tilde,
            '!' if self.eat('=') => Punct::BangEq,
            '!' => Punct::Bang,
            '<' if self.eat('<') => {
                if self.eat('=') {
                    Punct::ShlAssign
                } else {
                    Punct::Shl
                }
            }
            '<' if self.eat('=') => Punct::Le,
            '<' => Punct::Lt,
            '>' if self.eat('>') => {
                if self.eat('>') {
                    Punct::UShr
                } else if self.eat('=') {
                    Punct::ShrAssign
                } else {
                    Punct::Shr
                }
            }
            '>' if self.eat('=') => Punct::Ge,
            '>' => Punct::Gt,
            other => {
                return Err(LexError::new(
                    LexErrorKind::UnexpectedChar(other),
                    Span::new(start, self.pos),
                ));
            }
        };
        Ok(punct)
    }

    /// With the cursor just past an opening `open` bracket, finds the
    /// matching close bracket. Returns the span strictly between the two
    /// brackets and leaves the cursor after the close bracket.
    pub fn capture_balanced(&mut self, open: char) -> Result<Span, LexError> {
        let open_at = self.pos.saturating_sub(open.len_utf8());
        let content_start = self.pos;
        let mut stack = vec![closing(open)];
        while let Some(expected) = stack.last().copied() {
            self.skip_trivia()?;
            let Some(c) = self.bump() else {
                return Err(LexError::new(
                    LexErrorKind::Unbalanced(open),
                    Span::new(open_at, open_at + open.len_utf8()),
                ));
            };
            match c {
                '"' | '\'' => {
                    let quote_at = self.pos - 1;
                    self.skip_string_body(c).ok_or_else(|| {
                        LexError::new(
                            LexErrorKind::UnterminatedString,
                            Span::new(quote_at, self.end),
                        )
                    })?;
                }
                '(' | '[' | '{' => stack.push(closing(c)),
                ')' | ']' | '}' if c == expected => {
                    stack.pop();
                }
                ')' | ']' | '}' => {
                    return Err(LexError::new(
                        LexErrorKind::Mismatched { expected, found: c },
                        Span::new(self.pos - 1, self.pos),
                    ));
                }
                _ => {}
            }
        }
        Ok(Span::new(content_start, self.pos - 1))
    }

    /// Captures from the cursor to the next `;` outside brackets and
    /// strings (or the end of the range). The `;` is consumed but not
    /// included in the returned span.
    pub fn capture_to_eos(&mut self) -> Result<Span, LexError> {
        self.skip_trivia()?;
        let start = self.pos;
        loop {
            let before = self.pos;
            self.skip_trivia()?;
            let Some(c) = self.bump() else {
                return Ok(Span::new(start, before));
            };
            match c {
                ';' => return Ok(Span::new(start, self.pos - 1)),
                '"' | '\'' => {
                    let quote_at = self.pos - 1;
                    self.skip_string_body(c).ok_or_else(|| {
                        LexError::new(
                            LexErrorKind::UnterminatedString,
                            Span::new(quote_at, self.end),
                        )
                    })?;
                }
                '(' | '[' | '{' => {
                    self.capture_balanced(c)?;
                }
                ')' | ']' | '}' => {
                    return Err(LexError::new(
                        LexErrorKind::Unbalanced(c),
                        Span::new(self.pos - 1, self.pos),
                    ));
                }
                _ => {}
            }
        }
    }
}

#[cfg(test)]
mod lexer_test;
