use core::fmt;

use ecow::EcoString;

use crate::parser::operators::{BinaryOp, Keyword};
use crate::parser::syntax::Span;
use crate::values::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Punct {
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Comma,
    Semi,
    Colon,
    Dot,
    /// `.?`
    NullSafeDot,
    Question,
    At,
    Assign,
    PlusAssign,
    MinusAssign,
    StarAssign,
    SlashAssign,
    PercentAssign,
    AmpAssign,
    PipeAssign,
    CaretAssign,
    ShlAssign,
    ShrAssign,
    Inc,
    Dec,
    Plus,
    Minus,
    Star,
    StarStar,
    Slash,
    Percent,
    Amp,
    AmpAmp,
    Pipe,
    PipePipe,
    Caret,
    Tilde,
    TildeEq,
    Bang,
    BangEq,
    EqEq,
    Lt,
    Le,
    Shl,
    Gt,
    Ge,
    Shr,
    UShr,
}

impl Punct {
    pub fn as_str(self) -> &'static str {
        match self {
            Punct::LParen => "(",
            Punct::RParen => ")",
            Punct::LBracket => "[",
            Punct::RBracket => "]",
            Punct::LBrace => "{",
            Punct::RBrace => "}",
            Punct::Comma => ",",
            Punct::Semi => ";",
            Punct::Colon => ":",
            Punct::Dot => ".",
            Punct::NullSafeDot => ".?",
            Punct::Question => "?",
            Punct::At => "@",
            Punct::Assign => "=",
            Punct::PlusAssign => "+=",
            Punct::MinusAssign => "-=",
            Punct::StarAssign => "*=",
            Punct::SlashAssign => "/=",
            Punct::PercentAssign => "%=",
            Punct::AmpAssign => "&=",
            Punct::PipeAssign => "|=",
            Punct::CaretAssign => "^=",
            Punct::ShlAssign => "<<=",
            Punct::ShrAssign => ">>=",
            Punct::Inc => "++",
            Punct::Dec => "--",
            Punct::Plus => "+",
            Punct::Minus => "-",
            Punct::Star => "*",
            Punct::StarStar => "**",
            Punct::Slash => "/",
            Punct::Percent => "%",
            Punct::Amp => "&",
            Punct::AmpAmp => "&&",
            Punct::Pipe => "|",
            Punct::PipePipe => "||",
            Punct::Caret => "^",
            Punct::Tilde => "~",
            Punct::TildeEq => "~=",
            Punct::Bang => "!",
            Punct::BangEq => "!=",
            Punct::EqEq => "==",
            Punct::Lt => "<",
            Punct::Le => "<=",
            Punct::Shl => "<<",
            Punct::Gt => ">",
            Punct::Ge => ">=",
            Punct::Shr => ">>",
            Punct::UShr => ">>>",
        }
    }

    /// The binary operator this punctuation spells, if any.
    pub fn binary_op(self) -> Option<BinaryOp> {
        Some(match self {
            Punct::Plus => BinaryOp::Add,
            Punct::Minus => BinaryOp::Sub,
            Punct::Star => BinaryOp::Mul,
            Punct::StarStar => BinaryOp::Pow,
            Punct::Slash => BinaryOp::Div,
            Punct::Percent => BinaryOp::Mod,
            Punct::Amp => BinaryOp::BitAnd,
            Punct::AmpAmp => BinaryOp::And,
            Punct::Pipe => BinaryOp::BitOr,
            Punct::PipePipe => BinaryOp::Or,
            Punct::Caret => BinaryOp::BitXor,
            Punct::TildeEq => BinaryOp::Regex,
            Punct::BangEq => BinaryOp::Ne,
            Punct::EqEq => BinaryOp::Eq,
            Punct::Lt => BinaryOp::Lt,
            Punct::Le => BinaryOp::Le,
            Punct::Shl => BinaryOp::Shl,
            Punct::Gt => BinaryOp::Gt,
            Punct::Ge => BinaryOp::Ge,
            Punct::Shr => BinaryOp::Shr,
            Punct::UShr => BinaryOp::UShr,
            _ => return None,
        })
    }

    /// For compound assignments (`+=`, ...), the operator applied before storing.
    pub fn compound_op(self) -> Option<BinaryOp> {
        Some(match self {
            Punct::PlusAssign => BinaryOp::Add,
            Punct::MinusAssign => BinaryOp::Sub,
            Punct::StarAssign => BinaryOp::Mul,
            Punct::SlashAssign => BinaryOp::Div,
            Punct::PercentAssign => BinaryOp::Mod,
            Punct::AmpAssign => BinaryOp::BitAnd,
            Punct::PipeAssign => BinaryOp::BitOr,
            Punct::CaretAssign => BinaryOp::BitXor,
            Punct::ShlAssign => BinaryOp::Shl,
            Punct::ShrAssign => BinaryOp::Shr,
            _ => return None,
        })
    }

    pub fn is_assignment(self) -> bool {
        self == Punct::Assign || self.compound_op().is_some()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Ident(EcoString),
    Keyword(Keyword),
    /// `and`, `or`, `instanceof`, `is`, `contains`.
    WordOp(BinaryOp),
    Literal(Value),
    Punct(Punct),
    Eof,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

impl Token {
    pub fn is_punct(&self, punct: Punct) -> bool {
        self.kind == TokenKind::Punct(punct)
    }

    pub fn is_keyword(&self, keyword: Keyword) -> bool {
        self.kind == TokenKind::Keyword(keyword)
    }

    pub fn is_eof(&self) -> bool {
        self.kind == TokenKind::Eof
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Ident(name) => write!(f, "identifier `{}`", name),
            TokenKind::Keyword(kw) => write!(f, "keyword `{}`", format!("{:?}", kw).to_lowercase()),
            TokenKind::WordOp(op) => write!(f, "`{}`", op),
            TokenKind::Literal(Value::Str(s)) => {
                write!(f, "string ")?;
                super::literals::escape_string(f, s)
            }
            TokenKind::Literal(value) => write!(f, "literal `{}`", value),
            TokenKind::Punct(p) => write!(f, "`{}`", p.as_str()),
            TokenKind::Eof => write!(f, "end of input"),
        }
    }
}
