//! Multi-line input: keep reading while brackets, a string or a block
//! comment are still open.

use kestrel_core::lexer::{LexErrorKind, Lexer, Punct, TokenKind};
use reedline::{ValidationResult, Validator};

pub struct BracketValidator;

/// Whether `buffer` ends with an unclosed bracket, string or comment.
pub fn is_open(buffer: &str) -> bool {
    let mut lexer = Lexer::new(buffer);
    let mut depth: isize = 0;
    loop {
        match lexer.next_token() {
            Ok(token) => match token.kind {
                TokenKind::Eof => return depth > 0,
                TokenKind::Punct(Punct::LParen | Punct::LBracket | Punct::LBrace) => depth += 1,
                TokenKind::Punct(Punct::RParen | Punct::RBracket | Punct::RBrace) => depth -= 1,
                _ => {}
            },
            Err(err) => {
                return matches!(
                    err.kind,
                    LexErrorKind::UnterminatedString | LexErrorKind::UnterminatedComment
                );
            }
        }
    }
}

impl Validator for BracketValidator {
    fn validate(&self, line: &str) -> ValidationResult {
        if is_open(line) {
            ValidationResult::Incomplete
        } else {
            ValidationResult::Complete
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_input() {
        assert!(!is_open("1 + 2"));
        assert!(is_open("foo(1, [2"));
        assert!(is_open("if (x) {"));
        assert!(!is_open("')'"));
        assert!(is_open("'open"));
        assert!(is_open("/* note"));
        // Extra closers are a parse error, not more input.
        assert!(!is_open("1)"));
    }
}
