use super::*;
use crate::parser::operators::BinaryOp;
use pretty_assertions::assert_eq;

fn kinds(src: &str) -> Vec<TokenKind> {
    let mut lexer = Lexer::new(src);
    let mut out = Vec::new();
    loop {
        let token = lexer.next_token().unwrap();
        if token.is_eof() {
            return out;
        }
        out.push(token.kind);
    }
}

fn ident(name: &str) -> TokenKind {
    TokenKind::Ident(name.into())
}

#[test]
fn test_identifiers_and_keywords() {
    assert_eq!(
        kinds("foreach $x in _list and null"),
        vec![
            TokenKind::Keyword(Keyword::Foreach),
            ident("$x"),
            TokenKind::Keyword(Keyword::In),
            ident("_list"),
            TokenKind::WordOp(BinaryOp::And),
            TokenKind::Keyword(Keyword::Null),
        ]
    );
    assert_eq!(kinds("true"), vec![TokenKind::Literal(Value::Bool(true))]);
}

#[test]
fn test_greedy_operators() {
    assert_eq!(
        kinds("a+=1 b++ c>>>2 d.?e f~='x' g**2 h>>=1"),
        vec![
            ident("a"),
            TokenKind::Punct(Punct::PlusAssign),
            TokenKind::Literal(Value::Int(1)),
            ident("b"),
            TokenKind::Punct(Punct::Inc),
            ident("c"),
            TokenKind::Punct(Punct::UShr),
            TokenKind::Literal(Value::Int(2)),
            ident("d"),
            TokenKind::Punct(Punct::NullSafeDot),
            ident("e"),
            ident("f"),
            TokenKind::Punct(Punct::TildeEq),
            TokenKind::Literal(Value::str("x")),
            ident("g"),
            TokenKind::Punct(Punct::StarStar),
            TokenKind::Literal(Value::Int(2)),
            ident("h"),
            TokenKind::Punct(Punct::ShrAssign),
            TokenKind::Literal(Value::Int(1)),
        ]
    );
}

#[test]
fn test_comments_are_skipped() {
    let src = "a // line\n# hash\n/* block\n */ b";
    assert_eq!(kinds(src), vec![ident("a"), ident("b")]);
}

#[test]
fn test_unterminated_comment() {
    let mut lexer = Lexer::new("a /* never closed");
    lexer.next_token().unwrap();
    let err = lexer.next_token().unwrap_err();
    assert_eq!(err.kind, LexErrorKind::UnterminatedComment);
}

#[test]
fn test_numbers_and_strings() {
    assert_eq!(
        kinds(r#"10 1.5 2L 3f 0x10 'it\'s' "a\tb""#),
        vec![
            TokenKind::Literal(Value::Int(10)),
            TokenKind::Literal(Value::Double(1.5)),
            TokenKind::Literal(Value::Long(2)),
            TokenKind::Literal(Value::Float(3.0)),
            TokenKind::Literal(Value::Int(16)),
            TokenKind::Literal(Value::str("it's")),
            TokenKind::Literal(Value::str("a\tb")),
        ]
    );
}

#[test]
fn test_minus_is_always_a_separate_token() {
    assert_eq!(
        kinds("a -1"),
        vec![
            ident("a"),
            TokenKind::Punct(Punct::Minus),
            TokenKind::Literal(Value::Int(1)),
        ]
    );
}

#[test]
fn test_unterminated_string() {
    let err = Lexer::new("'abc").next_token().unwrap_err();
    assert_eq!(err.kind, LexErrorKind::UnterminatedString);
    assert_eq!(err.span, Span::new(0, 4));
}

#[test]
fn test_capture_balanced_ignores_brackets_in_strings() {
    let src = "(a == ')' && f(b[1])) rest";
    let mut lexer = Lexer::new(src);
    let open = lexer.next_token().unwrap();
    assert!(open.is_punct(Punct::LParen));
    let inner = lexer.capture_balanced('(').unwrap();
    assert_eq!(inner.str_of(src), "a == ')' && f(b[1])");
    assert_eq!(lexer.next_token().unwrap().kind, ident("rest"));
}

#[test]
fn test_capture_balanced_reports_unbalanced() {
    let mut lexer = Lexer::new("{ a = (1 + 2; ");
    lexer.next_token().unwrap();
    let err = lexer.capture_balanced('{').unwrap_err();
    assert_eq!(err.kind, LexErrorKind::Unbalanced('{'));
    assert_eq!(err.span, Span::new(0, 1));

    let mut lexer = Lexer::new("(a]");
    lexer.next_token().unwrap();
    let err = lexer.capture_balanced('(').unwrap_err();
    assert_eq!(
        err.kind,
        LexErrorKind::Mismatched {
            expected: ')',
            found: ']'
        }
    );
}

#[test]
fn test_capture_to_eos() {
    let src = "x = [1; 2]; y = 'a;b'; z";
    let mut lexer = Lexer::new(src);
    let first = lexer.capture_to_eos().unwrap();
    assert_eq!(first.str_of(src), "x = [1; 2]");
    let second = lexer.capture_to_eos().unwrap();
    assert_eq!(second.str_of(src), "y = 'a;b'");
    let third = lexer.capture_to_eos().unwrap();
    assert_eq!(third.str_of(src), "z");
    assert!(lexer.at_end().unwrap());
}

#[test]
fn test_ranged_lexer_keeps_absolute_spans() {
    let src = "ignored (inner) ignored";
    let mut lexer = Lexer::with_range(src, 9, 14);
    let token = lexer.next_token().unwrap();
    assert_eq!(token.kind, ident("inner"));
    assert_eq!(token.span, Span::new(9, 14));
    assert!(lexer.next_token().unwrap().is_eof());
    assert_eq!(lexer.prev_char(), Some('r'));
}
