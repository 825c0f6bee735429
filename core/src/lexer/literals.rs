//! Decoding of string and numeric literal text.
//!
//! Also provides the inverse, [`escape_string`], used when rendering string
//! values back into source form (diagnostics, the CLI's result echo).

use core::fmt;

use ecow::EcoString;
use thiserror::Error;

use crate::values::Value;

/// Errors that can occur when unescaping string literals.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UnescapeError {
    #[error("invalid escape sequence '{seq}' at position {pos}")]
    InvalidEscape { pos: usize, seq: EcoString },

    #[error("invalid hex digit in '{seq}' at position {pos}")]
    InvalidHexDigit { pos: usize, seq: EcoString },

    #[error("incomplete unicode escape at position {pos}: expected 4 digits, got {got}")]
    IncompleteUnicodeEscape { pos: usize, got: usize },

    #[error("invalid unicode scalar value U+{value:X} at position {pos}")]
    InvalidUnicodeScalar { pos: usize, value: u32 },
}

impl UnescapeError {
    /// Offset of the offending escape, relative to the literal's content.
    pub fn pos(&self) -> usize {
        match self {
            UnescapeError::InvalidEscape { pos, .. }
            | UnescapeError::InvalidHexDigit { pos, .. }
            | UnescapeError::IncompleteUnicodeEscape { pos, .. }
            | UnescapeError::InvalidUnicodeScalar { pos, .. } => *pos,
        }
    }
}

/// Decodes the content of a quoted literal (without its quotes).
///
/// Supports `\n \t \r \b \f \0 \\ \' \"` and `\uXXXX`.
pub fn unescape_string(input: &str) -> Result<EcoString, UnescapeError> {
    if !input.contains('\\') {
        return Ok(input.into());
    }

    let mut output = EcoString::with_capacity(input.len());
    let mut chars = input.char_indices();

    while let Some((pos, ch)) = chars.next() {
        if ch != '\\' {
            output.push(ch);
            continue;
        }
        match chars.next() {
            Some((_, 'n')) => output.push('\n'),
            Some((_, 't')) => output.push('\t'),
            Some((_, 'r')) => output.push('\r'),
            Some((_, 'b')) => output.push('\u{8}'),
            Some((_, 'f')) => output.push('\u{c}'),
            Some((_, '0')) => output.push('\0'),
            Some((_, '\\')) => output.push('\\'),
            Some((_, '\'')) => output.push('\''),
            Some((_, '"')) => output.push('"'),
            Some((_, 'u')) => {
                let mut value = 0u32;
                for got in 0..4 {
                    match chars.next() {
                        Some((_, hex)) => match hex.to_digit(16) {
                            Some(digit) => value = (value << 4) | digit,
                            None => {
                                return Err(UnescapeError::InvalidHexDigit {
                                    pos,
                                    seq: ecow::eco_format!("\\u{}", hex),
                                });
                            }
                        },
                        None => return Err(UnescapeError::IncompleteUnicodeEscape { pos, got }),
                    }
                }
                let decoded = char::from_u32(value)
                    .ok_or(UnescapeError::InvalidUnicodeScalar { pos, value })?;
                output.push(decoded);
            }
            Some((_, other)) => {
                return Err(UnescapeError::InvalidEscape {
                    pos,
                    seq: ecow::eco_format!("\\{}", other),
                });
            }
            None => {
                return Err(UnescapeError::InvalidEscape {
                    pos,
                    seq: "\\".into(),
                });
            }
        }
    }
    Ok(output)
}

/// Writes `s` as a double-quoted literal.
pub fn escape_string(f: &mut impl fmt::Write, s: &str) -> fmt::Result {
    f.write_char('"')?;
    for ch in s.chars() {
        match ch {
            '"' => f.write_str("\\\"")?,
            '\\' => f.write_str("\\\\")?,
            '\n' => f.write_str("\\n")?,
            '\r' => f.write_str("\\r")?,
            '\t' => f.write_str("\\t")?,
            '\0' => f.write_str("\\0")?,
            c if c.is_control() => write!(f, "\\u{:04x}", c as u32)?,
            c => f.write_char(c)?,
        }
    }
    f.write_char('"')
}

/// Why numeric literal text was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NumberError {
    #[error("invalid number literal '{0}'")]
    Invalid(EcoString),
    #[error("number literal '{0}' is out of range")]
    OutOfRange(EcoString),
}

/// Parses numeric literal text as scanned by the lexer.
///
/// Unsuffixed integers are `Int` when they fit, `Long` otherwise. `L`
/// forces `Long`, `f` forces `Float`, `d` or a fraction/exponent gives
/// `Double`. Hex literals (`0x`) are integral.
pub fn parse_number_literal(text: &str) -> Result<Value, NumberError> {
    let invalid = || NumberError::Invalid(text.into());
    let out_of_range = || NumberError::OutOfRange(text.into());

    if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        let (digits, long) = match hex.strip_suffix(['l', 'L']) {
            Some(digits) => (digits, true),
            None => (hex, false),
        };
        let n = u64::from_str_radix(digits, 16).map_err(|_| invalid())?;
        return match (long, i32::try_from(n)) {
            (false, Ok(n)) => Ok(Value::Int(n)),
            _ => i64::try_from(n).map(Value::Long).map_err(|_| out_of_range()),
        };
    }

    let (body, suffix) = match text.chars().last() {
        Some(c @ ('l' | 'L' | 'f' | 'F' | 'd' | 'D')) => (&text[..text.len() - 1], Some(c)),
        _ => (text, None),
    };
    let is_fractional = body.contains(['.', 'e', 'E']);

    match suffix {
        Some('l' | 'L') if !is_fractional => body
            .parse::<i64>()
            .map(Value::Long)
            .map_err(|_| out_of_range()),
        Some('f' | 'F') => body
            .parse::<f32>()
            .map(Value::Float)
            .map_err(|_| invalid()),
        Some('d' | 'D') => body
            .parse::<f64>()
            .map(Value::Double)
            .map_err(|_| invalid()),
        Some(_) => Err(invalid()),
        None if is_fractional => body.parse::<f64>().map(Value::Double).map_err(|_| invalid()),
        None => match body.parse::<i32>() {
            Ok(n) => Ok(Value::Int(n)),
            Err(_) => body
                .parse::<i64>()
                .map(Value::Long)
                .map_err(|_| out_of_range()),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unescape() {
        assert_eq!(unescape_string("plain").unwrap(), "plain");
        assert_eq!(unescape_string(r"a\nb\tc").unwrap(), "a\nb\tc");
        assert_eq!(unescape_string(r#"\"q\" \'s\'"#).unwrap(), "\"q\" 's'");
        assert_eq!(unescape_string(r"é").unwrap(), "é");
    }

    #[test]
    fn test_unescape_errors() {
        assert!(matches!(
            unescape_string(r"bad\q"),
            Err(UnescapeError::InvalidEscape { pos: 3, .. })
        ));
        assert!(matches!(
            unescape_string(r"\u12"),
            Err(UnescapeError::IncompleteUnicodeEscape { got: 2, .. })
        ));
        assert!(matches!(
            unescape_string(r"\uZZZZ"),
            Err(UnescapeError::InvalidHexDigit { .. })
        ));
    }

    #[test]
    fn test_escape() {
        let mut out = String::new();
        escape_string(&mut out, "a\"b\n").unwrap();
        assert_eq!(out, r#""a\"b\n""#);
    }

    #[test]
    fn test_numbers() {
        assert_eq!(parse_number_literal("42"), Ok(Value::Int(42)));
        assert_eq!(parse_number_literal("42L"), Ok(Value::Long(42)));
        assert_eq!(parse_number_literal("2147483648"), Ok(Value::Long(2_147_483_648)));
        assert_eq!(parse_number_literal("1.5"), Ok(Value::Double(1.5)));
        assert_eq!(parse_number_literal("1.5f"), Ok(Value::Float(1.5)));
        assert_eq!(parse_number_literal("2d"), Ok(Value::Double(2.0)));
        assert_eq!(parse_number_literal("1e3"), Ok(Value::Double(1000.0)));
        assert_eq!(parse_number_literal("0xFF"), Ok(Value::Int(255)));
        assert_eq!(parse_number_literal("0x1FFFFFFFF"), Ok(Value::Long(0x1_FFFF_FFFF)));
        assert!(matches!(
            parse_number_literal("99999999999999999999"),
            Err(NumberError::OutOfRange(_))
        ));
    }
}
