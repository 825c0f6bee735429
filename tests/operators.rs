use kestrel::Value;

#[macro_use]
mod cases;

// ============================================================================
// Arithmetic
// ============================================================================

test_case! {
    name: precedence_multiplication_first,
    input: "x + y * z",
    vars: vec![("x", Value::Int(1)), ("y", Value::Int(2)), ("z", Value::Int(3))],
    ast: "(+ x (* y z))",
    result: Value::Int(7),
}

test_case! {
    name: parentheses_override_precedence,
    input: "(x + y) * z",
    vars: vec![("x", Value::Int(1)), ("y", Value::Int(2)), ("z", Value::Int(3))],
    result: Value::Int(9),
}

test_case! {
    name: numeric_strings_multiply,
    input: "pi * hour",
    vars: vec![("pi", Value::str("3.14")), ("hour", Value::str("60"))],
    result: Value::Double(188.4),
}

test_case! {
    name: integer_division_truncates,
    input: "a / b",
    vars: vec![("a", Value::Int(-7)), ("b", Value::Int(2))],
    result: Value::Int(-3),
}

test_case! {
    name: mixed_width_promotes,
    input: "a + b",
    vars: vec![("a", Value::Int(1)), ("b", Value::Long(2))],
    result: Value::Long(3),
}

test_case! {
    name: power_is_double,
    input: "2 ** 10",
    result: Value::Double(1024.0),
}

test_case! {
    name: division_by_zero,
    input: "a / 0",
    vars: vec![("a", Value::Int(3))],
    error: "division by zero",
}

test_case! {
    name: bitwise_and_shifts,
    input: "(6 & 3) + (1 << 4) + (-1 >>> 28)",
    result: Value::Int(2 + 16 + 15),
}

// ============================================================================
// Strings
// ============================================================================

test_case! {
    name: concatenation_left_to_right,
    input: "'n=' + a + b",
    vars: vec![("a", Value::Int(1)), ("b", Value::Int(2))],
    result: Value::str("n=12"),
}

test_case! {
    name: sums_before_concatenation,
    input: "a + b + 'x'",
    vars: vec![("a", Value::Int(1)), ("b", Value::Int(2))],
    result: Value::str("3x"),
}

test_case! {
    name: null_renders_in_concatenation,
    input: "x + '!'",
    vars: vec![("x", Value::Null)],
    result: Value::str("null!"),
}

// ============================================================================
// Comparison and logic
// ============================================================================

test_case! {
    name: loose_equality_across_types,
    input: "a == 60 && b == 1L && c == 1.0",
    vars: vec![("a", Value::str("60")), ("b", Value::Int(1)), ("c", Value::Int(1))],
    result: Value::Bool(true),
}

test_case! {
    name: empty_literal_matches_blank,
    input: "s == empty && l == empty",
    vars: vec![("s", Value::str("  ")), ("l", Value::list(vec![]))],
    result: Value::Bool(true),
}

test_case! {
    name: word_operators,
    input: "a == 1 and b != 2 or false",
    vars: vec![("a", Value::Int(1)), ("b", Value::Int(3))],
    result: Value::Bool(true),
}

test_case! {
    name: and_short_circuits,
    input: "flag && missing()",
    vars: vec![("flag", Value::Bool(false))],
    result: Value::Bool(false),
}

test_case! {
    name: or_short_circuits,
    input: "flag || missing()",
    vars: vec![("flag", Value::Bool(true))],
    result: Value::Bool(true),
}

test_case! {
    name: unevaluated_branch_is_skipped,
    input: "flag ? 'yes' : missing()",
    vars: vec![("flag", Value::Bool(true))],
    result: Value::str("yes"),
}

test_case! {
    name: null_condition_is_false,
    input: "x ? 'yes' : 'no'",
    vars: vec![("x", Value::Null)],
    result: Value::str("no"),
}

test_case! {
    name: regex_match_is_anchored,
    input: "a ~= '[a-z]+\\\\d+' && !(b ~= '[a-z]+\\\\d+')",
    vars: vec![("a", Value::str("abc123")), ("b", Value::str("abc123x"))],
    result: Value::Bool(true),
}

test_case! {
    name: invalid_regex_fails,
    input: "a ~= '('",
    vars: vec![("a", Value::str("x"))],
    error: "regular expression",
}

test_case! {
    name: contains_on_strings_and_lists,
    input: "s contains 'st' && xs contains 2",
    vars: vec![("s", Value::str("haystack")), ("xs", cases::ints(&[1, 2, 3]))],
    result: Value::Bool(true),
}

test_case! {
    name: instanceof_builtin_types,
    input: "a instanceof String && !(b instanceof String) && !(c instanceof String)",
    vars: vec![("a", Value::str("x")), ("b", Value::Int(1)), ("c", Value::Null)],
    result: Value::Bool(true),
}

test_case! {
    name: casts_convert,
    input: "(int) a + (int) b",
    vars: vec![("a", Value::str("40")), ("b", Value::Double(2.9))],
    result: Value::Int(42),
}

test_case! {
    name: failed_cast,
    input: "(int) a",
    vars: vec![("a", Value::str("abc"))],
    error: "abc",
}

// ============================================================================
// Literal folding
// ============================================================================

test_case! {
    name: literal_only_expression_folds,
    input: "10 * 100",
    ast: "Int(1000)",
    literal: true,
    result: Value::Int(1000),
}

test_case! {
    name: folding_stops_at_variables,
    input: "1 + 2 + x",
    vars: vec![("x", Value::Int(4))],
    ast: "(+ Int(3) x)",
    literal: false,
    result: Value::Int(7),
}

test_case! {
    name: short_circuit_is_not_folded,
    input: "true && false",
    ast: "(&& Bool(true) Bool(false))",
    literal: false,
    result: Value::Bool(false),
}
