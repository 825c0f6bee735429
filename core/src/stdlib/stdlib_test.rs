//! Tests for the built-in classes and intrinsics

use pretty_assertions::assert_eq;

use super::intrinsic;
use crate::api::{Engine, Error};
use crate::resolver::MapVariableResolverFactory;
use crate::values::{ClassRegistry, TypeHint, Value};

// Helper function for integration tests using the Engine to evaluate Kestrel code
fn test_expr<F>(source: &str, check: F)
where
    F: FnOnce(Value),
{
    let engine = Engine::default();
    let expr = engine
        .compile(source)
        .unwrap_or_else(|e| panic!("compile failed for {:?}: {:?}", source, e))
        .expect("empty expression");
    let vars = MapVariableResolverFactory::new();
    let result = expr
        .evaluate(&Value::Null, &vars)
        .unwrap_or_else(|e| panic!("evaluation failed for {:?}: {}", source, e));
    check(result);
}

fn eval(source: &str) -> Value {
    let mut out = Value::Null;
    test_expr(source, |v| out = v);
    out
}

fn eval_err(source: &str) -> Error {
    let engine = Engine::default();
    let expr = engine.compile(source).unwrap().unwrap();
    expr.evaluate(&Value::Null, &MapVariableResolverFactory::new())
        .expect_err("expected failure")
}

fn strings(items: &[&str]) -> Vec<Value> {
    items.iter().map(|s| Value::str(*s)).collect()
}

#[test]
fn test_builtins_are_registered() {
    let registry = ClassRegistry::with_builtins();
    for name in [
        "kestrel.lang.Math",
        "kestrel.lang.String",
        "kestrel.lang.Integer",
        "kestrel.lang.Long",
        "kestrel.lang.Double",
        "kestrel.lang.Boolean",
        "kestrel.util.List",
        "kestrel.util.ArrayList",
        "kestrel.util.Map",
        "kestrel.util.HashMap",
    ] {
        assert!(registry.get(name).is_some(), "missing {}", name);
    }
    assert!(registry.auto_import("ArrayList").is_some());
}

#[test]
fn test_intrinsic_lookup_matches_arity() {
    assert!(intrinsic(&Value::str("x"), "substring", 1).is_some());
    assert!(intrinsic(&Value::str("x"), "substring", 2).is_some());
    assert!(intrinsic(&Value::str("x"), "substring", 3).is_none());
    assert!(intrinsic(&Value::Int(1), "toString", 0).is_some());
    assert!(intrinsic(&Value::Int(1), "size", 0).is_none());
}

// ============================================================================
// Strings
// ============================================================================

#[test]
fn test_string_methods() {
    assert_eq!(eval("'Hello'.toUpperCase()"), Value::str("HELLO"));
    assert_eq!(eval("'  pad  '.trim()"), Value::str("pad"));
    assert_eq!(eval("'hello'.substring(1, 3)"), Value::str("el"));
    assert_eq!(eval("'hello'.substring(3)"), Value::str("lo"));
    assert_eq!(eval("'hello'.indexOf('l')"), Value::Int(2));
    assert_eq!(eval("'hello'.lastIndexOf('l')"), Value::Int(3));
    assert_eq!(eval("'hello'.indexOf('z')"), Value::Int(-1));
    assert_eq!(eval("'hello'.charAt(1)"), Value::Char('e'));
    assert_eq!(eval("'a-b'.replace('-', '+')"), Value::str("a+b"));
    assert_eq!(eval("'Abc'.equalsIgnoreCase('aBC')"), Value::Bool(true));
    assert_eq!(eval("'abc'.startsWith('ab') && 'abc'.endsWith('bc')"), Value::Bool(true));
    assert_eq!(eval("'a1'.matches('[a-z][0-9]')"), Value::Bool(true));
    assert_eq!(eval("''.isEmpty()"), Value::Bool(true));
}

#[test]
fn test_string_indices_count_chars() {
    assert_eq!(eval("'héllo'.length()"), Value::Int(5));
    assert_eq!(eval("'héllo'.charAt(1)"), Value::Char('é'));
    assert_eq!(eval("'héllo'.indexOf('l')"), Value::Int(2));
}

#[test]
fn test_string_split() {
    test_expr("'a,b,,c'.split(',')", |v| {
        let Value::Array(arr) = v else {
            panic!("expected array, got {:?}", v);
        };
        assert_eq!(arr.elem, TypeHint::Str);
        assert_eq!(*arr.items.read(), strings(&["a", "b", "", "c"]));
    });
}

#[test]
fn test_substring_out_of_bounds() {
    match eval_err("'abc'.substring(2, 9)") {
        Error::PropertyAccess(err) => assert!(err.to_string().contains("out of bounds"), "{}", err),
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn test_string_class() {
    assert_eq!(eval("String.valueOf(12)"), Value::str("12"));
    assert_eq!(eval("String.join('/', ['a', 'b'])"), Value::str("a/b"));
    assert_eq!(eval("new String(3)"), Value::str("3"));
}

#[test]
fn test_bean_style_reads() {
    assert_eq!(eval("[1, 2].size"), Value::Int(2));
    assert_eq!(eval("''.empty"), Value::Bool(true));
}

// ============================================================================
// Collections
// ============================================================================

#[test]
fn test_list_methods() {
    assert_eq!(eval("l = [1]; l.add(2); l.add(0, 9); l"), Value::list(vec![Value::Int(9), Value::Int(1), Value::Int(2)]));
    assert_eq!(eval("[1, 2, 3].get(2)"), Value::Int(3));
    assert_eq!(eval("[1, 2, 3].indexOf(2)"), Value::Int(1));
    assert_eq!(eval("[1, 2].contains(3)"), Value::Bool(false));
    assert_eq!(eval("l = [1, 2]; l.clear(); l.isEmpty()"), Value::Bool(true));
    assert_eq!(eval("l = [1]; l.addAll([2, 3]); l.size()"), Value::Int(3));
    assert_eq!(eval("l = [5, 6]; l.set(0, 7); l[0]"), Value::Int(7));
}

#[test]
fn test_lists_share_storage() {
    assert_eq!(eval("a = [1]; b = a; b.add(2); a.size()"), Value::Int(2));
}

#[test]
fn test_map_methods() {
    assert_eq!(eval("m = [:]; m.put('a', 1); m.get('a')"), Value::Int(1));
    assert_eq!(eval("m = ['a': 1]; m.containsKey('a')"), Value::Bool(true));
    assert_eq!(eval("m = ['a': 1]; m.containsValue(2)"), Value::Bool(false));
    assert_eq!(eval("m = ['a': 1, 'b': 2]; m.remove('a'); m.size()"), Value::Int(1));
    assert_eq!(eval("m = ['a': 1]; m.get('zzz')"), Value::Null);
}

#[test]
fn test_collection_factories() {
    assert_eq!(eval("List.of(1, 2).size()"), Value::Int(2));
    assert_eq!(eval("Map.of('a', 1, 'b', 2).b"), Value::Int(2));
    assert_eq!(eval("new ArrayList([1, 2]).size()"), Value::Int(2));
    assert_eq!(eval("new HashMap().isEmpty()"), Value::Bool(true));
    assert!(matches!(eval_err("Map.of('a')"), Error::Runtime { .. }));
}

// ============================================================================
// Math and boxed primitives
// ============================================================================

#[test]
fn test_math() {
    assert_eq!(eval("Math.sqrt(16)"), Value::Double(4.0));
    assert_eq!(eval("Math.round(2.5)"), Value::Long(3));
    assert_eq!(eval("Math.pow(2, 3)"), Value::Double(8.0));
    assert_eq!(eval("Math.min(3, 1)"), Value::Int(1));
    test_expr("Math.random()", |v| {
        let Value::Double(r) = v else {
            panic!("expected double, got {:?}", v);
        };
        assert!((0.0..1.0).contains(&r));
    });
}

#[test]
fn test_boxed_primitives() {
    assert_eq!(eval("Integer.parseInt('42')"), Value::Int(42));
    assert_eq!(eval("Integer.parseInt('ff', 16)"), Value::Int(255));
    assert_eq!(eval("Integer.MAX_VALUE"), Value::Int(i32::MAX));
    assert_eq!(eval("Long.parseLong('9000000000')"), Value::Long(9_000_000_000));
    assert_eq!(eval("Boolean.valueOf('true')"), Value::Bool(true));
    assert!(matches!(eval_err("Integer.parseInt('4x')"), Error::Runtime { .. }));
}

#[test]
fn test_object_intrinsics() {
    assert_eq!(eval("x = 12; x.toString()"), Value::str("12"));
    assert_eq!(eval("x = 1; x.equals(1)"), Value::Bool(true));
}
