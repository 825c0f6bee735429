use crate::api::CompilationOptions;
use crate::parser::{ParserConfiguration, compile};

// Helper function to parse an expression and render its tree.
//
// We test precedence by comparing whether two expressions parenthesized in
// different ways yield the same tree.
fn ast(source: &str) -> String {
    let config = ParserConfiguration::default();
    let unit = compile(source, &config, &CompilationOptions::default())
        .unwrap_or_else(|e| panic!("Expression parsing failed: {}\n{}", source, e));
    let root = unit.root.expect("empty expression");
    unit.ast.sexpr(root)
}

#[test]
fn test_addition_vs_subtraction() {
    assert_eq!(ast("a + b - c"), ast("(a + b) - c"));
    assert_eq!(ast("a - b + c"), ast("(a - b) + c"));
    assert_eq!(
        ast("a + b - c + d - e + f"),
        ast("((((a + b) - c) + d) - e) + f")
    );
}

#[test]
fn test_multiplication_vs_division() {
    assert_eq!(ast("a * b / c"), ast("(a * b) / c"));
    assert_eq!(ast("a / b * c"), ast("(a / b) * c"));
    assert_eq!(ast("a * b % c * d"), ast("((a * b) % c) * d"));
}

#[test]
fn test_addition_vs_multiplication() {
    assert_eq!(ast("a + b * c"), ast("a + (b * c)"));
    assert_eq!(ast("a * b + c"), ast("(a * b) + c"));
    assert_eq!(ast("a + b * c - d"), ast("(a + (b * c)) - d"));
}

#[test]
fn test_power_is_right_associative() {
    assert_eq!(ast("a ** b ** c"), ast("a ** (b ** c)"));
    assert_eq!(ast("a * b ** c"), ast("a * (b ** c)"));
    assert_ne!(ast("a ** b ** c"), ast("(a ** b) ** c"));
}

#[test]
fn test_and_vs_or() {
    assert_eq!(ast("a && b || c"), ast("(a && b) || c"));
    assert_eq!(ast("a || b && c"), ast("a || (b && c)"));
    assert_eq!(ast("a and b or c"), ast("(a && b) || c"));
}

#[test]
fn test_comparison_vs_logic() {
    assert_eq!(ast("a < b && c > d"), ast("(a < b) && (c > d)"));
    assert_eq!(ast("a == b || c != d"), ast("(a == b) || (c != d)"));
    assert_eq!(ast("a + 1 > b * 2"), ast("(a + 1) > (b * 2)"));
}

#[test]
fn test_relational_vs_equality() {
    assert_eq!(ast("a < b == c > d"), ast("(a < b) == (c > d)"));
}

#[test]
fn test_bitwise_levels() {
    assert_eq!(ast("a | b ^ c & d"), ast("a | (b ^ (c & d))"));
    assert_eq!(ast("a & b == c"), ast("a & (b == c)"));
    assert_eq!(ast("a << b + c"), ast("a << (b + c)"));
    assert_eq!(ast("a | b && c"), ast("(a | b) && c"));
}

#[test]
fn test_unary_vs_binary() {
    assert_eq!(ast("-a + b"), ast("(-a) + b"));
    assert_eq!(ast("!a && b"), ast("(!a) && b"));
    assert_eq!(ast("a - -b"), ast("a - (-b)"));
    assert_eq!(ast("~a & b"), ast("(~a) & b"));
}

#[test]
fn test_ternary_binds_loosest() {
    assert_eq!(ast("a || b ? c + d : e"), ast("(a || b) ? (c + d) : e"));
    assert_eq!(ast("a ? b : c ? d : e"), ast("a ? b : (c ? d : e)"));
}

#[test]
fn test_instanceof_and_contains() {
    assert_eq!(
        ast("a instanceof String && b"),
        ast("(a instanceof String) && b")
    );
    assert_eq!(ast("a contains b || c"), ast("(a contains b) || c"));
    assert_eq!(ast("a + b contains c"), ast("(a + b) contains c"));
}

#[test]
fn test_property_access_binds_tightest() {
    assert_eq!(ast("-a.b"), ast("-(a.b)"));
    assert_eq!(ast("a.b * c.d"), ast("(a.b) * (c.d)"));
    assert_eq!(ast("a.b[c + 1].d"), ast("a.b[(c + 1)].d"));
}

#[test]
fn test_assignment_is_right_associative() {
    assert_eq!(ast("a = b = c"), ast("a = (b = c)"));
    assert_eq!(ast("a = b || c"), ast("a = (b || c)"));
}
