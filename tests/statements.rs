use indoc::indoc;
use kestrel::{Engine, EngineOptions, ExecutionOptions, MapVariableResolverFactory, Value};
use pretty_assertions::assert_eq;

#[macro_use]
mod cases;

use cases::{ints, person};

// ============================================================================
// Assignment and declarations
// ============================================================================

test_case! {
    name: statements_yield_last_value,
    input: "a = 1; b = 2; a + b",
    ast: "(block (= a Int(1)) (= b Int(2)) (+ a b))",
    result: Value::Int(3),
}

test_case! {
    name: compound_assignment,
    input: "x = 5; x -= 1; x *= 2; x",
    result: Value::Int(8),
}

test_case! {
    name: postfix_and_prefix_steps,
    input: "i = 1; j = i++; k = ++i; i * 100 + j * 10 + k",
    result: Value::Int(313),
}

test_case! {
    name: typed_declaration_converts,
    input: "int n = s; n + 1",
    vars: vec![("s", Value::str("41"))],
    result: Value::Int(42),
}

test_case! {
    name: typed_array_initializer,
    input: "int[] xs = {1, '2'}; xs[0] + xs[1]",
    result: Value::Int(3),
}

test_case! {
    name: indexed_assignment,
    input: "xs[1] = 20; xs",
    vars: vec![("xs", ints(&[1, 2, 3]))],
    result: ints(&[1, 20, 3]),
}

test_case! {
    name: isdef_checks_resolvers,
    input: "isdef x && !isdef y",
    vars: vec![("x", Value::Int(1))],
    result: Value::Bool(true),
}

// ============================================================================
// Control flow
// ============================================================================

test_case! {
    name: foreach_over_inline_array,
    input: "total=0; foreach(i:{1,2,3}){total+=i}; total",
    result: Value::Int(6),
}

test_case! {
    name: foreach_over_list_keeps_order,
    input: "out = []; foreach (x : xs) { out.add(x * 10) }; out",
    vars: vec![("xs", ints(&[3, 1, 2]))],
    result: ints(&[30, 10, 20]),
}

test_case! {
    name: foreach_over_integer_range,
    input: "total = 0; foreach (i : n) { total += i }; total",
    vars: vec![("n", Value::Int(4))],
    result: Value::Int(10),
}

test_case! {
    name: foreach_over_string,
    input: "out = ''; for (c : s) { out = out + c + '.' }; out",
    vars: vec![("s", Value::str("abc"))],
    result: Value::str("a.b.c."),
}

test_case! {
    name: foreach_over_non_iterable,
    input: "foreach (i : flag) { i }",
    vars: vec![("flag", Value::Bool(true))],
    error: "cannot iterate",
}

test_case! {
    name: classic_for_loop,
    input: "s = 0; for (i = 0; i < 5; i++) { s += i }; s",
    result: Value::Int(10),
}

test_case! {
    name: while_and_until,
    input: "n = 0; while (n < 3) { n++ }; until (n == 6) { n++ }; n",
    result: Value::Int(6),
}

test_case! {
    name: do_loops_run_once,
    input: "n = 0; do { n = n + 1 } while (n < 0); n",
    result: Value::Int(1),
}

test_case! {
    name: if_else_chain,
    input: "if (x > 10) { 'big' } else if (x > 5) { 'medium' } else { 'small' }",
    vars: vec![("x", Value::Int(7))],
    result: Value::str("medium"),
}

test_case! {
    name: with_block_sets_properties,
    input: "with (p) { name = 'ann b', age = 40 }; p.name + ' ' + p.age",
    vars: vec![("p", person("ann", 34))],
    result: Value::str("ann b 40"),
}

// ============================================================================
// Functions
// ============================================================================

test_case! {
    name: named_function,
    input: "def add(a, b) { a + b } add(1, 2)",
    result: Value::Int(3),
}

test_case! {
    name: missing_argument_is_null,
    input: "def f(a, b) { b == null } f(1)",
    result: Value::Bool(true),
}

test_case! {
    name: too_many_arguments,
    input: "def f(a) { a } f(1, 2)",
    error: "expects 1",
}

test_case! {
    name: recursive_function,
    input: "def fact(n) { if (n <= 1) { return 1; } return n * fact(n - 1); } fact(5)",
    result: Value::Int(120),
}

test_case! {
    name: function_sees_caller_variables,
    input: "factor = 3; def scale(x) { x * factor } scale(2)",
    result: Value::Int(6),
}

#[test]
fn multi_line_script() {
    let script = indoc! {"
        def fib(n) {
            a = 0; b = 1;
            for (i = 0; i < n; i++) {
                t = a + b; a = b; b = t;
            }
            return a;
        }
        fib(limit)
    "};
    let engine = Engine::default();
    let expr = engine.compile(script).unwrap().unwrap();
    let vars = MapVariableResolverFactory::with_variables([("limit", Value::Int(10))]);
    assert_eq!(expr.evaluate(&Value::Null, &vars).unwrap(), Value::Int(55));
    assert!(expr.inputs().iter().any(|name| name.as_str() == "limit"));
}

#[test]
fn runaway_recursion_is_bounded() {
    let engine = Engine::new(
        EngineOptions {
            default_execution_options: ExecutionOptions {
                max_depth: 32,
                ..ExecutionOptions::default()
            },
            ..EngineOptions::default()
        },
        |_| {},
    );
    let err = kestrel::eval_with(&engine, "def f(n) { f(n + 1) } f(0)").unwrap_err();
    assert!(matches!(err, kestrel::Error::ResourceExceeded(_)), "{:?}", err);
}
