//! Operator and keyword tables.
//!
//! Every operator has an opcode, a binding precedence (higher binds
//! tighter) and the minimum language level at which the parser accepts it.

use core::fmt;

use hashbrown::HashMap;
use lazy_static::lazy_static;

/// Graded feature sets. Each level includes everything below it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum LanguageLevel {
    /// Literals, identifiers, property paths and method calls.
    PropertyOnly = 0,
    /// Arithmetic, comparison, logical and ternary operators, casts,
    /// constructors, inline collections and projections.
    BasicOps = 1,
    /// `;`-separated statement sequences.
    MultiStatement = 2,
    /// `foreach`, `for`, `while`, `until` and `do` loops.
    Iteration = 3,
    /// Assignment, increment/decrement, declarations and imports.
    Assignment = 4,
    /// `if`, functions, `return`, `with` and interceptors.
    #[default]
    ControlFlow = 5,
}

impl LanguageLevel {
    pub fn from_number(level: u8) -> Option<LanguageLevel> {
        Some(match level {
            0 => LanguageLevel::PropertyOnly,
            1 => LanguageLevel::BasicOps,
            2 => LanguageLevel::MultiStatement,
            3 => LanguageLevel::Iteration,
            4 => LanguageLevel::Assignment,
            5 => LanguageLevel::ControlFlow,
            _ => return None,
        })
    }

    pub fn number(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for LanguageLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LanguageLevel::PropertyOnly => "property-only",
            LanguageLevel::BasicOps => "basic-ops",
            LanguageLevel::MultiStatement => "multi-statement",
            LanguageLevel::Iteration => "iteration",
            LanguageLevel::Assignment => "assignment",
            LanguageLevel::ControlFlow => "control-flow",
        };
        write!(f, "{} ({})", self.number(), name)
    }
}

/// Binary operators handled by the precedence climber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
    UShr,
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
    And,
    Or,
    /// `~=`: the whole left operand matches the right operand as a pattern.
    Regex,
    /// `instanceof` / `is`.
    InstanceOf,
    Contains,
}

impl BinaryOp {
    pub fn opcode(self) -> u8 {
        match self {
            BinaryOp::Add => 0,
            BinaryOp::Sub => 1,
            BinaryOp::Mul => 2,
            BinaryOp::Div => 3,
            BinaryOp::Mod => 4,
            BinaryOp::Pow => 5,
            BinaryOp::BitAnd => 6,
            BinaryOp::BitOr => 7,
            BinaryOp::BitXor => 8,
            BinaryOp::Shl => 9,
            BinaryOp::Shr => 10,
            BinaryOp::UShr => 11,
            BinaryOp::Eq => 12,
            BinaryOp::Ne => 13,
            BinaryOp::Lt => 14,
            BinaryOp::Gt => 15,
            BinaryOp::Le => 16,
            BinaryOp::Ge => 17,
            BinaryOp::And => 18,
            BinaryOp::Or => 19,
            BinaryOp::Regex => 20,
            BinaryOp::InstanceOf => 21,
            BinaryOp::Contains => 22,
        }
    }

    /// Binding strength; higher binds tighter. All binary operators are
    /// left-associative except `**`.
    pub fn precedence(self) -> u8 {
        match self {
            BinaryOp::Pow => 12,
            BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod => 11,
            BinaryOp::Add | BinaryOp::Sub => 10,
            BinaryOp::Shl | BinaryOp::Shr | BinaryOp::UShr => 9,
            BinaryOp::Lt
            | BinaryOp::Gt
            | BinaryOp::Le
            | BinaryOp::Ge
            | BinaryOp::InstanceOf
            | BinaryOp::Contains
            | BinaryOp::Regex => 8,
            BinaryOp::Eq | BinaryOp::Ne => 7,
            BinaryOp::BitAnd => 6,
            BinaryOp::BitXor => 5,
            BinaryOp::BitOr => 4,
            BinaryOp::And => 3,
            BinaryOp::Or => 2,
        }
    }

    pub fn is_right_associative(self) -> bool {
        matches!(self, BinaryOp::Pow)
    }

    pub fn is_short_circuit(self) -> bool {
        matches!(self, BinaryOp::And | BinaryOp::Or)
    }

    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinaryOp::Eq
                | BinaryOp::Ne
                | BinaryOp::Lt
                | BinaryOp::Gt
                | BinaryOp::Le
                | BinaryOp::Ge
                | BinaryOp::Regex
                | BinaryOp::InstanceOf
                | BinaryOp::Contains
        )
    }

    /// Operators that only accept numeric (or numeric string) operands.
    pub fn is_arithmetic(self) -> bool {
        matches!(
            self,
            BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod | BinaryOp::Pow
        )
    }

    pub fn is_bitwise(self) -> bool {
        matches!(
            self,
            BinaryOp::BitAnd
                | BinaryOp::BitOr
                | BinaryOp::BitXor
                | BinaryOp::Shl
                | BinaryOp::Shr
                | BinaryOp::UShr
        )
    }

    pub fn level(self) -> LanguageLevel {
        LanguageLevel::BasicOps
    }

    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
            BinaryOp::Pow => "**",
            BinaryOp::BitAnd => "&",
            BinaryOp::BitOr => "|",
            BinaryOp::BitXor => "^",
            BinaryOp::Shl => "<<",
            BinaryOp::Shr => ">>",
            BinaryOp::UShr => ">>>",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Gt => ">",
            BinaryOp::Le => "<=",
            BinaryOp::Ge => ">=",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
            BinaryOp::Regex => "~=",
            BinaryOp::InstanceOf => "instanceof",
            BinaryOp::Contains => "contains",
        }
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Neg,
    Plus,
    Not,
    BitNot,
}

impl fmt::Display for UnaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            UnaryOp::Neg => "-",
            UnaryOp::Plus => "+",
            UnaryOp::Not => "!",
            UnaryOp::BitNot => "~",
        };
        write!(f, "{}", symbol)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Keyword {
    If,
    Else,
    Foreach,
    For,
    While,
    Until,
    Do,
    With,
    Def,
    Function,
    Return,
    New,
    Import,
    Var,
    True,
    False,
    Null,
    Empty,
    IsDef,
    In,
    This,
}

impl Keyword {
    pub fn level(self) -> LanguageLevel {
        match self {
            Keyword::True
            | Keyword::False
            | Keyword::Null
            | Keyword::This
            | Keyword::Empty => LanguageLevel::PropertyOnly,
            Keyword::New | Keyword::IsDef | Keyword::In => LanguageLevel::BasicOps,
            Keyword::Foreach | Keyword::For | Keyword::While | Keyword::Until | Keyword::Do => {
                LanguageLevel::Iteration
            }
            Keyword::Var | Keyword::Import => LanguageLevel::Assignment,
            Keyword::If
            | Keyword::Else
            | Keyword::With
            | Keyword::Def
            | Keyword::Function
            | Keyword::Return => LanguageLevel::ControlFlow,
        }
    }
}

lazy_static! {
    static ref KEYWORDS: HashMap<&'static str, Keyword> = HashMap::from_iter([
        ("if", Keyword::If),
        ("else", Keyword::Else),
        ("foreach", Keyword::Foreach),
        ("for", Keyword::For),
        ("while", Keyword::While),
        ("until", Keyword::Until),
        ("do", Keyword::Do),
        ("with", Keyword::With),
        ("def", Keyword::Def),
        ("function", Keyword::Function),
        ("return", Keyword::Return),
        ("new", Keyword::New),
        ("import", Keyword::Import),
        ("var", Keyword::Var),
        ("true", Keyword::True),
        ("false", Keyword::False),
        ("null", Keyword::Null),
        ("nil", Keyword::Null),
        ("empty", Keyword::Empty),
        ("isdef", Keyword::IsDef),
        ("in", Keyword::In),
        ("this", Keyword::This),
    ]);

    /// Operators spelled as words.
    static ref WORD_OPERATORS: HashMap<&'static str, BinaryOp> = HashMap::from_iter([
        ("and", BinaryOp::And),
        ("or", BinaryOp::Or),
        ("instanceof", BinaryOp::InstanceOf),
        ("is", BinaryOp::InstanceOf),
        ("contains", BinaryOp::Contains),
    ]);
}

pub fn keyword(word: &str) -> Option<Keyword> {
    KEYWORDS.get(word).copied()
}

pub fn word_operator(word: &str) -> Option<BinaryOp> {
    WORD_OPERATORS.get(word).copied()
}

/// Words that cannot name a variable.
pub fn is_reserved(word: &str) -> bool {
    KEYWORDS.contains_key(word) || WORD_OPERATORS.contains_key(word)
}
