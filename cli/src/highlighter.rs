//! REPL syntax highlighting driven by the Kestrel lexer.

use kestrel_core::lexer::{Lexer, Token, TokenKind};
use kestrel_core::values::Value;
use nu_ansi_term::{Color, Style};
use reedline::StyledText;

pub struct Highlighter;

fn token_color(token: &Token) -> Color {
    match &token.kind {
        TokenKind::Keyword(_) | TokenKind::WordOp(_) => Color::Magenta,
        TokenKind::Literal(Value::Str(_) | Value::Char(_)) => Color::Green,
        TokenKind::Literal(_) => Color::Cyan,
        TokenKind::Ident(name) if name.starts_with(char::is_uppercase) => Color::Yellow,
        TokenKind::Ident(_) => Color::LightRed,
        TokenKind::Punct(_) | TokenKind::Eof => Color::White,
    }
}

impl reedline::Highlighter for Highlighter {
    fn highlight(&self, line: &str, _cursor: usize) -> StyledText {
        let mut output = StyledText::new();
        let mut lexer = Lexer::new(line);
        let mut written = 0;

        loop {
            let token = match lexer.next_token() {
                Ok(token) if !token.is_eof() => token,
                _ => break,
            };
            let (start, end) = (token.span.0.start, token.span.0.end);
            if start > written {
                // Whitespace and comments between tokens.
                output.push((Style::new().fg(Color::DarkGray), line[written..start].to_string()));
            }
            output.push((Style::new().fg(token_color(&token)), line[start..end].to_string()));
            written = end;
        }

        if written < line.len() {
            output.push((Style::new().fg(Color::White), line[written..].to_string()));
        }
        output
    }
}
