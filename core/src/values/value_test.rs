use crate::values::{TypeHint, Value, ValueKind, ValueMap};

#[test]
fn test_lists_share_storage() {
    let list = Value::list(vec![Value::Int(1)]);
    let alias = list.clone();
    if let Value::List(items) = &alias {
        items.write().push(Value::Int(2));
    }
    assert_eq!(list, Value::list(vec![Value::Int(1), Value::Int(2)]));
    assert!(list.same_ref(&alias));
    assert!(!list.same_ref(&Value::list(vec![Value::Int(1), Value::Int(2)])));
}

#[test]
fn test_structural_equality_is_variant_strict() {
    assert_eq!(Value::Int(1), Value::Int(1));
    assert_ne!(Value::Int(1), Value::Long(1));
    assert_ne!(Value::Null, Value::Empty);
    assert_eq!(Value::str("a"), Value::from("a"));
}

#[test]
fn test_map_keeps_insertion_order() {
    let mut map = ValueMap::new();
    map.insert(Value::str("z"), Value::Int(1));
    map.insert(Value::str("a"), Value::Int(2));
    map.insert(Value::str("m"), Value::Int(3));
    assert_eq!(map.insert(Value::str("a"), Value::Int(20)), Some(Value::Int(2)));

    let keys: Vec<_> = map.keys().map(|k| k.to_string()).collect();
    assert_eq!(keys, vec!["z", "a", "m"]);

    assert_eq!(map.remove(&Value::str("z")), Some(Value::Int(1)));
    assert_eq!(map.get(&Value::str("m")), Some(&Value::Int(3)));
    assert_eq!(map.get_str("a"), Some(&Value::Int(20)));
    assert_eq!(map.len(), 2);
}

#[test]
fn test_map_normalizes_integral_keys() {
    let mut map = ValueMap::new();
    map.insert(Value::Int(1), Value::str("one"));
    assert_eq!(map.get(&Value::Long(1)), Some(&Value::str("one")));
    assert!(!map.contains_key(&Value::Double(1.0)));
}

#[test]
fn test_empty_value() {
    assert!(Value::Null.is_empty_value());
    assert!(Value::str("  ").is_empty_value());
    assert!(Value::Int(0).is_empty_value());
    assert!(Value::Bool(false).is_empty_value());
    assert!(Value::list(vec![]).is_empty_value());
    assert!(!Value::str("x").is_empty_value());
    assert!(!Value::Int(3).is_empty_value());
}

#[test]
fn test_kind_and_type_hint() {
    assert_eq!(Value::Int(3).kind(), ValueKind::Int);
    assert_eq!(Value::Double(3.0).type_hint(), TypeHint::Double);
    assert_eq!(
        Value::array(TypeHint::Int, vec![]).type_hint(),
        TypeHint::Array(Box::new(TypeHint::Int))
    );
    assert_eq!(Value::Int(1).as_f64(), Some(1.0));
    assert_eq!(Value::Char('a').as_i64(), Some(97));
}
