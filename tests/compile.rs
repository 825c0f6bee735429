use std::sync::Arc;

use indoc::indoc;
use kestrel::values::TypeHint;
use kestrel::{
    CompilationOptions, CompiledExpression, Engine, EngineOptions, Error, LanguageLevel,
    MapVariableResolverFactory, Severity, Value,
};
use pretty_assertions::assert_eq;
use static_assertions::assert_impl_all;

#[macro_use]
mod cases;

use cases::{describe, person, person_class};

assert_impl_all!(Engine: Send, Sync);
assert_impl_all!(CompiledExpression: Send, Sync, Clone);

fn at_level(level: LanguageLevel) -> CompilationOptions {
    CompilationOptions {
        language_level: level,
        ..CompilationOptions::default()
    }
}

fn strict() -> CompilationOptions {
    CompilationOptions {
        strict_typing: true,
        ..CompilationOptions::default()
    }
}

// ============================================================================
// Diagnostics
// ============================================================================

test_case! {
    name: missing_operator,
    input: "a b",
    error: "P001",
}

test_case! {
    name: unbalanced_parenthesis,
    input: "foo(1, 2",
    error: "P002",
}

test_case! {
    name: sized_array_constructor_unsupported,
    input: "new int[3]",
    error: "P015",
}

test_case! {
    name: operands_verified_at_compile_time,
    input: "[1] * 2",
    error: "T001",
}

test_case! {
    name: property_only_rejects_operators,
    input: "a + b",
    compile: at_level(LanguageLevel::PropertyOnly),
    error: "P005",
}

test_case! {
    name: property_only_allows_paths,
    input: "p.name",
    compile: at_level(LanguageLevel::PropertyOnly),
    vars: vec![("p", person("ann", 34))],
    result: Value::str("ann"),
}

test_case! {
    name: basic_ops_rejects_statements,
    input: "a; b",
    compile: at_level(LanguageLevel::BasicOps),
    error: "P005",
}

test_case! {
    name: strict_typing_rejects_unknown_names,
    input: "foo + 1",
    compile: strict(),
    error: "T002",
}

test_case! {
    name: strict_typing_with_declared_variables,
    input: "foo + 1",
    compile: CompilationOptions {
        variables: vec![("foo".into(), TypeHint::Int)],
        ..strict()
    },
    vars: vec![("foo", Value::Int(41))],
    result: Value::Int(42),
}

#[test]
fn compilation_error_carries_every_diagnostic() {
    let err = kestrel::compile("x = (1 + 2", &CompilationOptions::default()).unwrap_err();
    let Error::Compilation { diagnostics } = &err else {
        panic!("expected compilation error, got {:?}", err);
    };
    assert!(!diagnostics.is_empty());
    assert!(diagnostics.iter().any(|d| d.severity == Severity::Error));
    assert!(err.span().is_some(), "{}", describe(&err));
}

// ============================================================================
// Compiled units
// ============================================================================

test_case! {
    name: inputs_in_first_use_order,
    input: "b + a * c",
    vars: vec![("a", Value::Int(1)), ("b", Value::Int(2)), ("c", Value::Int(3))],
    inputs: vec!["b", "a", "c"],
    result: Value::Int(5),
}

test_case! {
    name: assigned_names_are_not_inputs,
    input: "y = 2; x * y",
    vars: vec![("x", Value::Int(4))],
    inputs: vec!["x"],
    result: Value::Int(8),
}

#[test]
fn empty_source_compiles_to_nothing() {
    let options = CompilationOptions::default();
    assert!(kestrel::compile("", &options).unwrap().is_none());
    assert!(kestrel::compile("  \n ", &options).unwrap().is_none());
    assert_eq!(kestrel::eval("").unwrap(), Value::Null);
}

#[test]
fn debug_symbols_map_statements_to_lines() {
    let engine = Engine::default();
    let options = CompilationOptions {
        debug_symbols: true,
        source_file: Some("rules.kes".into()),
        ..CompilationOptions::default()
    };
    let expr = engine
        .compile_with(
            indoc! {"
                a = 1;
                b = 2;

                a + b
            "},
            &options,
        )
        .unwrap()
        .unwrap();
    assert_eq!(expr.source_file(), Some("rules.kes"));
    let symbols = expr.debug_symbols().expect("debug symbols");
    let lines: Vec<u32> = symbols.lines.iter().map(|(_, line)| *line).collect();
    assert_eq!(lines, vec![1, 2, 4]);

    let missing_file = CompilationOptions {
        debug_symbols: true,
        ..CompilationOptions::default()
    };
    let err = engine.compile_with("a", &missing_file).unwrap_err();
    assert!(describe(&err).contains("P011"), "{}", describe(&err));
}

#[test]
fn engine_globals_and_imports() {
    let class = person_class();
    let engine = Engine::new(EngineOptions::default(), |env| {
        env.register("limit", Value::Int(18));
        env.register_class(class.clone());
        env.import("acme.Person");
    });
    let expr = engine
        .compile("p = new Person('cy', 20); p.age >= limit ? p.name : 'minor'")
        .unwrap()
        .unwrap();
    let vars = MapVariableResolverFactory::new();
    assert_eq!(expr.evaluate(&Value::Null, &vars).unwrap(), Value::str("cy"));
    assert_eq!(expr.evaluate_interpreted(&Value::Null, &vars).unwrap(), Value::str("cy"));
}

#[test]
fn compiled_expression_is_shareable_across_threads() {
    let engine = Engine::default();
    let expr = Arc::new(engine.compile("item.name + '/' + n").unwrap().unwrap());
    std::thread::scope(|scope| {
        for n in 0..4 {
            let expr = expr.clone();
            scope.spawn(move || {
                for round in 0..25 {
                    let item = if round % 2 == 0 {
                        person("ann", 34)
                    } else {
                        let mut map = kestrel::values::ValueMap::new();
                        map.insert(Value::str("name"), Value::str("ann"));
                        Value::map(map)
                    };
                    let vars = MapVariableResolverFactory::with_variables([
                        ("item", item),
                        ("n", Value::Int(n)),
                    ]);
                    assert_eq!(
                        expr.evaluate(&Value::Null, &vars).unwrap(),
                        Value::str(format!("ann/{}", n))
                    );
                }
            });
        }
    });
}
