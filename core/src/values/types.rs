//! Statically known value types ("egress types").
//!
//! A `TypeHint` is what the parser knows about the result of a node before it
//! is ever evaluated. `Any` means "unknown", and every rule in this module
//! treats `Any` permissively: an unknown type never causes a compile error.

use core::fmt;
use ecow::EcoString;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum TypeHint {
    #[default]
    Any,
    Null,
    Void,
    Bool,
    Char,
    Int,
    Long,
    Float,
    Double,
    Str,
    List,
    Map,
    Array(Box<TypeHint>),
    /// A host class, by fully qualified name.
    Class(EcoString),
    Function,
}

impl TypeHint {
    /// Resolve one of the built-in type names used in declarations and casts.
    ///
    /// Host class names are resolved separately through the class registry.
    pub fn from_name(name: &str) -> Option<TypeHint> {
        let ty = match name {
            "var" | "def" | "Object" => TypeHint::Any,
            "boolean" | "Boolean" => TypeHint::Bool,
            "char" | "Character" => TypeHint::Char,
            "int" | "Integer" | "short" | "Short" | "byte" | "Byte" => TypeHint::Int,
            "long" | "Long" => TypeHint::Long,
            "float" | "Float" => TypeHint::Float,
            "double" | "Double" => TypeHint::Double,
            "String" | "CharSequence" => TypeHint::Str,
            "List" | "ArrayList" | "Collection" => TypeHint::List,
            "Map" | "HashMap" => TypeHint::Map,
            "void" => TypeHint::Void,
            _ => return None,
        };
        Some(ty)
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, TypeHint::Any)
    }

    pub fn is_primitive(&self) -> bool {
        matches!(
            self,
            TypeHint::Bool
                | TypeHint::Char
                | TypeHint::Int
                | TypeHint::Long
                | TypeHint::Float
                | TypeHint::Double
        )
    }

    pub fn is_numeric(&self) -> bool {
        self.numeric_rank().is_some()
    }

    /// Rank used for binary numeric promotion. `Char` promotes like `Int`.
    pub fn numeric_rank(&self) -> Option<u8> {
        match self {
            TypeHint::Char | TypeHint::Int => Some(1),
            TypeHint::Long => Some(2),
            TypeHint::Float => Some(3),
            TypeHint::Double => Some(4),
            _ => None,
        }
    }

    /// Result type of an arithmetic operator applied to `self` and `other`.
    ///
    /// Returns `Any` when either side is unknown or not numeric.
    pub fn promote(&self, other: &TypeHint) -> TypeHint {
        match (self.numeric_rank(), other.numeric_rank()) {
            (Some(a), Some(b)) => match a.max(b) {
                1 => TypeHint::Int,
                2 => TypeHint::Long,
                3 => TypeHint::Float,
                _ => TypeHint::Double,
            },
            _ => TypeHint::Any,
        }
    }

    /// Whether a value statically typed `source` can be stored in a slot of
    /// type `self` (possibly through a widening or string conversion).
    pub fn accepts(&self, source: &TypeHint) -> bool {
        if !self.is_known() || !source.is_known() {
            return true;
        }
        if self == source {
            return true;
        }
        match (self, source) {
            (_, TypeHint::Null) => !self.is_primitive(),
            (TypeHint::Str, _) => true,
            (TypeHint::Char, TypeHint::Str) => true,
            (TypeHint::Bool, TypeHint::Str) => true,
            (target, src) if target.is_numeric() => {
                src.is_numeric() || matches!(src, TypeHint::Str)
            }
            (TypeHint::Array(_), TypeHint::List) => true,
            (TypeHint::List, TypeHint::Array(_)) => true,
            _ => false,
        }
    }

    /// Whether two statically known operand types can meet in an arithmetic
    /// operator other than `+` (which also concatenates).
    pub fn is_arithmetic_operand(&self) -> bool {
        !self.is_known() || self.is_numeric() || matches!(self, TypeHint::Str)
    }
}

impl fmt::Display for TypeHint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeHint::Any => write!(f, "Object"),
            TypeHint::Null => write!(f, "null"),
            TypeHint::Void => write!(f, "void"),
            TypeHint::Bool => write!(f, "boolean"),
            TypeHint::Char => write!(f, "char"),
            TypeHint::Int => write!(f, "int"),
            TypeHint::Long => write!(f, "long"),
            TypeHint::Float => write!(f, "float"),
            TypeHint::Double => write!(f, "double"),
            TypeHint::Str => write!(f, "String"),
            TypeHint::List => write!(f, "List"),
            TypeHint::Map => write!(f, "Map"),
            TypeHint::Array(elem) => write!(f, "{}[]", elem),
            TypeHint::Class(name) => write!(f, "{}", name),
            TypeHint::Function => write!(f, "Function"),
        }
    }
}
