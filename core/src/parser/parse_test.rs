use indoc::indoc;
use pretty_assertions::assert_eq;

use crate::api::CompilationOptions;
use crate::ast::NodeFlags;
use crate::parser::{CompileError, LanguageLevel, ParsedUnit, ParserConfiguration, compile};
use crate::values::TypeHint;

fn parse_with(source: &str, options: &CompilationOptions) -> Result<ParsedUnit, CompileError> {
    let config = ParserConfiguration::default();
    compile(source, &config, options)
}

fn parse(source: &str) -> ParsedUnit {
    parse_with(source, &CompilationOptions::default())
        .unwrap_or_else(|e| panic!("Expression parsing failed: {}\n{}", source, e))
}

fn sexpr(source: &str) -> String {
    let unit = parse(source);
    unit.ast.sexpr(unit.root.expect("empty expression"))
}

fn error_code(source: &str, options: &CompilationOptions) -> &'static str {
    match parse_with(source, options) {
        Ok(_) => panic!("expected a compile error for {:?}", source),
        Err(err) => err.errors().next().map(|e| e.code).unwrap_or("none"),
    }
}

fn strict() -> CompilationOptions {
    CompilationOptions {
        strict_typing: true,
        ..CompilationOptions::default()
    }
}

fn at_level(level: LanguageLevel) -> CompilationOptions {
    CompilationOptions {
        language_level: level,
        ..CompilationOptions::default()
    }
}

// ============================================================================
// Paths and primaries
// ============================================================================

#[test]
fn test_property_paths() {
    assert_eq!(sexpr("foo"), "foo");
    assert_eq!(sexpr("foo.bar.baz"), "(path foo .bar .baz)");
    assert_eq!(sexpr("foo.?bar.baz"), "(path foo .?bar .baz)");
    assert_eq!(sexpr("list[0].name"), "(path list [Int(0)] .name)");
    assert_eq!(sexpr("a.b(1, c)"), "(path a (.b Int(1) c))");
    assert_eq!(sexpr("size()"), "(call size)");
    assert_eq!(sexpr("this.name"), "(path this .name)");
}

#[test]
fn test_path_flags() {
    let unit = parse("a.b.c");
    let root = unit.root.unwrap();
    assert!(unit.ast.node(root).flags.contains(NodeFlags::DEEP_PROPERTY));

    let unit = parse("a.?b");
    let root = unit.root.unwrap();
    assert!(unit.ast.node(root).flags.contains(NodeFlags::NULL_SAFE));

    let unit = parse("a");
    let root = unit.root.unwrap();
    assert!(unit.ast.node(root).flags.contains(NodeFlags::IDENTIFIER));
}

#[test]
fn test_expression_roots_take_segments() {
    assert_eq!(sexpr("\"abc\".length()"), "(path Str(\"abc\") (.length))");
    assert_eq!(sexpr("[1, 2].size()"), "(path (list Int(1) Int(2)) (.size))");
    assert_eq!(sexpr("(a + b).toString()"), "(path (+ a b) (.toString))");
}

#[test]
fn test_inline_collections() {
    assert_eq!(sexpr("[]"), "(list)");
    assert_eq!(sexpr("[:]"), "(map)");
    assert_eq!(sexpr("[1, a]"), "(list Int(1) a)");
    assert_eq!(sexpr("['x': 1, 'y': b]"), "(map (Str(\"x\") Int(1)) (Str(\"y\") b))");
    assert_eq!(sexpr("{1, 2}"), "(array Object Int(1) Int(2))");
    assert_eq!(sexpr("[[1], [a: b]]"), "(list (list Int(1)) (map (a b)))");
}

#[test]
fn test_constructors() {
    assert_eq!(sexpr("new ArrayList()"), "(new kestrel.util.ArrayList)");
    assert_eq!(sexpr("new int[] {1, 2}"), "(array int Int(1) Int(2))");
    assert_eq!(sexpr("new Unknown(1)"), "(new Unknown Int(1))");
}

#[test]
fn test_sized_array_is_rejected() {
    assert_eq!(error_code("new int[3]", &CompilationOptions::default()), "P015");
}

#[test]
fn test_projection() {
    assert_eq!(sexpr("(name in people)"), "(project name people _)");
    assert_eq!(
        sexpr("(name in people if age > 18)"),
        "(project name people (> age Int(18)))"
    );
    // Names inside the projection belong to each item, not to the inputs.
    assert_eq!(parse("(name in people if age > 18)").inputs, vec!["people"]);
}

#[test]
fn test_casts() {
    assert_eq!(sexpr("(int) x"), "(cast int x)");
    assert_eq!(sexpr("(String) 12"), "Str(\"12\")");
    // A parenthesized name followed by an operator is not a cast.
    assert_eq!(sexpr("(a) - b"), "(- a b)");
}

#[test]
fn test_isdef() {
    assert_eq!(sexpr("isdef foo"), "(isdef foo)");
    assert_eq!(sexpr("isdef(foo)"), "(isdef foo)");
}

#[test]
fn test_instanceof_targets() {
    assert_eq!(sexpr("a instanceof String"), "(instanceof a String)");
    assert_eq!(sexpr("a is Math"), "(instanceof a kestrel.lang.Math)");
    assert_eq!(sexpr("a instanceof com.acme.Thing"), "(instanceof a com.acme.Thing)");
}

// ============================================================================
// Statements
// ============================================================================

#[test]
fn test_empty_source() {
    assert!(parse("").root.is_none());
    assert!(parse("  // only a comment\n").root.is_none());
}

#[test]
fn test_statement_sequence() {
    assert_eq!(sexpr("a = 1; b = 2; a + b"), "(block (= a Int(1)) (= b Int(2)) (+ a b))");
    assert_eq!(sexpr("a = 1;"), "(= a Int(1))");

    let unit = parse("a = 1; a");
    let root = unit.root.unwrap();
    let mut children = Vec::new();
    unit.ast.children(root, &mut children);
    assert!(unit.ast.node(children[0]).flags.contains(NodeFlags::DISCARD));
    assert!(!unit.ast.node(children[1]).flags.contains(NodeFlags::DISCARD));
}

#[test]
fn test_missing_separator() {
    assert_eq!(error_code("a b", &CompilationOptions::default()), "P001");
}

#[test]
fn test_if_else_chain() {
    assert_eq!(
        sexpr("if (a) { 1 } else if (b) { 2 } else { 3 }"),
        "(if a (scope Int(1)) (if b (scope Int(2)) (scope Int(3))))"
    );
    assert_eq!(sexpr("if (a) b = 1"), "(if a (scope (= b Int(1))) _)");
}

#[test]
fn test_blocks_need_no_separator() {
    assert_eq!(
        sexpr("if (a) { x = 1 } y = 2"),
        "(block (if a (scope (= x Int(1))) _) (= y Int(2)))"
    );
}

#[test]
fn test_loops() {
    assert_eq!(
        sexpr("foreach (x : list) { total += x }"),
        "(foreach Object x list (scope (+= total x)))"
    );
    assert_eq!(
        sexpr("for (int i : items) { i }"),
        "(foreach int i items (scope i))"
    );
    assert_eq!(
        sexpr("for (i = 0; i < 3; i++) { s += i }"),
        "(for (= i Int(0)) (< i Int(3)) (post++ i) (scope (+= s i)))"
    );
    assert_eq!(sexpr("for (;;) { x }"), "(for _ _ _ (scope x))");
    assert_eq!(sexpr("while (a) { b }"), "(while a (scope b))");
    assert_eq!(sexpr("until (a) { b }"), "(until a (scope b))");
    assert_eq!(sexpr("do { b } while (a)"), "(do-while (scope b) a)");
    assert_eq!(sexpr("do { b } until (a)"), "(do-until (scope b) a)");
}

#[test]
fn test_loop_header_errors() {
    let options = CompilationOptions::default();
    assert_eq!(error_code("foreach (x list) { x }", &options), "P007");
    assert_eq!(error_code("for (a; b) { x }", &options), "P008");
}

#[test]
fn test_declarations() {
    assert_eq!(sexpr("int x = 1"), "(declare int x Int(1))");
    assert_eq!(sexpr("var y"), "(declare Object y)");
    assert_eq!(sexpr("String[] names = {\"a\"}"), "(declare String[] names (array String Str(\"a\")))");
}

#[test]
fn test_declared_names_are_not_inputs() {
    let unit = parse("int x = 1; x + y");
    assert_eq!(unit.inputs, vec!["y"]);
}

#[test]
fn test_functions() {
    assert_eq!(
        sexpr("def add(a, b) { a + b } add(1, 2)"),
        "(block (def add (a b) (block (+ a#0 b#1))) (call add Int(1) Int(2)))"
    );
    assert_eq!(
        sexpr("f = def (x) { return x * 2; }"),
        "(= f (def _ (x) (block (return (* x#0 Int(2))))))"
    );
}

#[test]
fn test_function_free_variables_become_inputs() {
    let unit = parse("def scale(x) { x * factor } scale(2)");
    assert_eq!(unit.inputs, vec!["factor"]);
}

#[test]
fn test_parameters_addressed_by_name() {
    let options = CompilationOptions {
        indexed_functions: false,
        ..CompilationOptions::default()
    };
    let unit = parse_with("def f(a) { a }", &options).unwrap();
    assert_eq!(unit.ast.sexpr(unit.root.unwrap()), "(def f (a) (block a))");
}

#[test]
fn test_with_block() {
    assert_eq!(
        sexpr("with (obj) { name = 'x', count += 1 }"),
        "(with obj (= name Str(\"x\")) (+= count Int(1)))"
    );
    // Names inside the block belong to the target.
    assert_eq!(parse("with (obj) { name = other }").inputs, vec!["obj"]);
}

#[test]
fn test_imports() {
    let unit = parse("import kestrel.util.ArrayList; new ArrayList()");
    assert!(unit.imports.contains("ArrayList"));
    assert_eq!(
        error_code("import no.such.Thing", &CompilationOptions::default()),
        "P006"
    );
}

#[test]
fn test_interceptor_must_exist() {
    assert_eq!(
        error_code("@Audit x = 1", &CompilationOptions::default()),
        "P009"
    );
}

// ============================================================================
// Inputs, language levels and strict typing
// ============================================================================

#[test]
fn test_inputs_in_order_of_first_use() {
    let unit = parse("b + a * b + c.d");
    assert_eq!(unit.inputs, vec!["b", "a", "c"]);
    // Class names are not inputs.
    assert!(parse("Math.PI * r").inputs == vec!["r"]);
    assert!(parse("kestrel.util.List.of(1)").inputs.is_empty());
}

#[test]
fn test_language_levels() {
    let property_only = at_level(LanguageLevel::PropertyOnly);
    assert!(parse_with("a.b.c", &property_only).is_ok());
    assert_eq!(error_code("a + b", &property_only), "P005");

    let basic = at_level(LanguageLevel::BasicOps);
    assert!(parse_with("a + b > c ? d : e", &basic).is_ok());
    assert_eq!(error_code("a; b", &basic), "P005");

    let multi = at_level(LanguageLevel::MultiStatement);
    assert!(parse_with("a; b", &multi).is_ok());
    assert_eq!(error_code("foreach (x : y) { x }", &multi), "P005");

    let iteration = at_level(LanguageLevel::Iteration);
    assert!(parse_with("foreach (x : y) { x }", &iteration).is_ok());
    assert_eq!(error_code("x = 1", &iteration), "P005");

    let assignment = at_level(LanguageLevel::Assignment);
    assert!(parse_with("x = 1; x++", &assignment).is_ok());
    assert_eq!(error_code("if (x) { y }", &assignment), "P005");
}

#[test]
fn test_strict_typing_rejects_unknown_names() {
    assert_eq!(error_code("foo + 1", &strict()), "T002");

    let known = CompilationOptions {
        variables: vec![("foo".into(), TypeHint::Int)],
        ..strict()
    };
    let unit = parse_with("foo + 1", &known).unwrap();
    assert_eq!(unit.ast.node(unit.root.unwrap()).egress, TypeHint::Int);
}

#[test]
fn test_strict_typing_checks_declarations() {
    assert_eq!(error_code("int x = 'abc' == 1", &strict()), "T004");
    assert!(parse_with("double d = 1", &strict()).is_ok());
}

#[test]
fn test_operand_type_verification() {
    assert_eq!(error_code("[1] * 2", &CompilationOptions::default()), "T001");
    assert!(parse_with("'3' * 2", &CompilationOptions::default()).is_ok());
}

#[test]
fn test_invalid_regex_literal() {
    assert_eq!(
        error_code("a ~= '[unclosed'", &CompilationOptions::default()),
        "P010"
    );
}

#[test]
fn test_debug_symbols() {
    let options = CompilationOptions {
        debug_symbols: true,
        source_file: Some("rules.kes".into()),
        ..CompilationOptions::default()
    };
    let unit = parse_with(
        indoc! {"
            a = 1;
            b = 2;

            a + b
        "},
        &options,
    )
    .unwrap();
    let symbols = unit.debug_symbols.expect("debug symbols");
    assert_eq!(symbols.source_file, "rules.kes");
    let lines: Vec<u32> = symbols.lines.iter().map(|(_, line)| *line).collect();
    assert_eq!(lines, vec![1, 2, 4]);

    let missing_file = CompilationOptions {
        debug_symbols: true,
        ..CompilationOptions::default()
    };
    assert_eq!(error_code("a", &missing_file), "P011");
}

#[test]
fn test_syntax_error_location() {
    let err = parse_with("a +\n  * b", &CompilationOptions::default()).unwrap_err();
    let first = err.errors().next().unwrap();
    assert_eq!(first.code, "P001");
    assert_eq!((first.line, first.column), (2, 3));
}

#[test]
fn test_unbalanced_brackets() {
    assert_eq!(error_code("foo(1, 2", &CompilationOptions::default()), "P002");
    assert_eq!(error_code("[1, 2)", &CompilationOptions::default()), "P002");
}
