use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use pretty_assertions::assert_eq;

use super::*;
use crate::api::{CompiledExpression, Engine, EngineOptions};
use crate::ast::NodeId;
use crate::evaluator::Evaluator;
use crate::resolver::{MapVariableResolverFactory, VariableResolverFactory};
use crate::test_utils::{Shapes, init_test_logging};
use crate::values::{Value, ValueMap};

/// Wraps the reflective optimizer and counts how many accessors it built.
#[derive(Debug, Default)]
struct CountingOptimizer {
    built: AtomicUsize,
}

impl AccessorOptimizer for CountingOptimizer {
    fn name(&self) -> &str {
        "counting"
    }

    fn optimize_accessor(
        &self,
        eval: &mut Evaluator<'_>,
        node: NodeId,
        ctx: &Value,
        factory: &dyn VariableResolverFactory,
    ) -> Result<(Value, Accessor), Control> {
        self.built.fetch_add(1, Ordering::SeqCst);
        ReflectiveAccessorOptimizer.optimize_accessor(eval, node, ctx, factory)
    }

    fn reoptimize_accessor(
        &self,
        eval: &mut Evaluator<'_>,
        node: NodeId,
        resume: Resume,
        ctx: &Value,
        factory: &dyn VariableResolverFactory,
    ) -> Result<(Value, Accessor), Control> {
        self.built.fetch_add(1, Ordering::SeqCst);
        ReflectiveAccessorOptimizer.reoptimize_accessor(eval, node, resume, ctx, factory)
    }
}

fn counting_engine() -> (Engine, Arc<CountingOptimizer>) {
    let optimizer = Arc::new(CountingOptimizer::default());
    let engine = Engine::new(EngineOptions::default(), |env| {
        env.set_optimizer(optimizer.clone());
    });
    (engine, optimizer)
}

fn root_accessor(expr: &CompiledExpression) -> Option<Arc<Accessor>> {
    expr.ast().node(expr.root()).accessor.get()
}

fn holder(bar: Value) -> Value {
    let mut map = ValueMap::new();
    map.insert(Value::str("bar"), bar);
    Value::map(map)
}

#[test]
fn test_accessor_is_built_once_and_replayed() {
    let (engine, optimizer) = counting_engine();
    let shapes = Shapes::new();
    let expr = engine.compile("foo.bar.name").unwrap().unwrap();
    let vars = MapVariableResolverFactory::with_variables([("foo", holder(shapes.circle("a", 1.0)))]);

    for _ in 0..3 {
        assert_eq!(expr.evaluate(&Value::Null, &vars).unwrap(), Value::str("a"));
    }
    assert_eq!(optimizer.built.load(Ordering::SeqCst), 1);

    let accessor = root_accessor(&expr).expect("accessor cached");
    assert!(matches!(accessor.root, RootStep::Variable(ref name) if name == "foo"));
    assert_eq!(accessor.steps.len(), 2);
    assert_eq!(accessor.to_string(), "Variable(\"foo\") -> map key -> property");
}

#[test]
fn test_deoptimizes_across_subclasses() {
    init_test_logging();
    let (engine, optimizer) = counting_engine();
    let shapes = Shapes::new();
    let expr = engine.compile("foo.bar.name").unwrap().unwrap();

    let circle = MapVariableResolverFactory::with_variables([("foo", holder(shapes.circle("round", 1.0)))]);
    let square = MapVariableResolverFactory::with_variables([("foo", holder(shapes.square("boxy", 2.0)))]);

    assert_eq!(expr.evaluate(&Value::Null, &circle).unwrap(), Value::str("round"));
    assert_eq!(expr.evaluate(&Value::Null, &square).unwrap(), Value::str("boxy"));
    assert_eq!(optimizer.built.load(Ordering::SeqCst), 2);

    // The rebuilt accessor follows the latest shape.
    let accessor = root_accessor(&expr).expect("accessor cached");
    assert!(matches!(
        accessor.steps.last(),
        Some(Step::Property { class, .. }) if *class == shapes.square.id()
    ));

    assert_eq!(expr.evaluate(&Value::Null, &circle).unwrap(), Value::str("round"));
    assert_eq!(expr.evaluate_interpreted(&Value::Null, &square).unwrap(), Value::str("boxy"));
}

#[test]
fn test_interpreted_mode_never_caches() {
    let (engine, optimizer) = counting_engine();
    let expr = engine.compile("m.k").unwrap().unwrap();
    let mut map = ValueMap::new();
    map.insert(Value::str("k"), Value::Int(1));
    let vars = MapVariableResolverFactory::with_variables([("m", Value::map(map))]);

    assert_eq!(expr.evaluate_interpreted(&Value::Null, &vars).unwrap(), Value::Int(1));
    assert!(root_accessor(&expr).is_none());
    assert_eq!(optimizer.built.load(Ordering::SeqCst), 0);
}

#[test]
fn test_root_moves_from_variable_to_context_property() {
    let shapes = Shapes::new();
    let engine = Engine::default();
    let expr = engine.compile("name").unwrap().unwrap();

    let vars = MapVariableResolverFactory::with_variables([("name", Value::str("from var"))]);
    assert_eq!(expr.evaluate(&Value::Null, &vars).unwrap(), Value::str("from var"));

    let circle = shapes.circle("from ctx", 1.0);
    let empty = MapVariableResolverFactory::new();
    assert_eq!(expr.evaluate(&circle, &empty).unwrap(), Value::str("from ctx"));
    assert!(matches!(
        root_accessor(&expr).map(|a| a.root.clone()),
        Some(RootStep::ThisProperty { .. })
    ));

    // A variable of the same name shadows the property again.
    assert_eq!(expr.evaluate(&circle, &vars).unwrap(), Value::str("from var"));
}

#[test]
fn test_index_steps_follow_container_kind() {
    let engine = Engine::default();
    let expr = engine.compile("xs[1]").unwrap().unwrap();
    let list = MapVariableResolverFactory::with_variables([("xs", Value::list(vec![Value::Int(1), Value::Int(2)]))]);
    let text = MapVariableResolverFactory::with_variables([("xs", Value::str("ab"))]);

    assert_eq!(expr.evaluate(&Value::Null, &list).unwrap(), Value::Int(2));
    assert_eq!(expr.evaluate(&Value::Null, &text).unwrap(), Value::Char('b'));
    assert!(matches!(
        root_accessor(&expr).and_then(|a| a.steps.first().cloned()),
        Some(Step::StrIndex)
    ));
}

#[test]
fn test_failed_replay_is_reported_not_rebuilt() {
    let (engine, optimizer) = counting_engine();
    let expr = engine.compile("xs[i]").unwrap().unwrap();
    let vars = |i: i32| {
        MapVariableResolverFactory::with_variables([
            ("xs", Value::list(vec![Value::Int(7)])),
            ("i", Value::Int(i)),
        ])
    };
    assert_eq!(expr.evaluate(&Value::Null, &vars(0)).unwrap(), Value::Int(7));
    let err = expr.evaluate(&Value::Null, &vars(3)).unwrap_err();
    assert!(err.to_string().contains("out of bounds"), "{}", err);
    assert_eq!(optimizer.built.load(Ordering::SeqCst), 1);
}

#[test]
fn test_static_class_roots_are_cached() {
    let engine = Engine::default();
    let expr = engine.compile("Math.abs(x)").unwrap().unwrap();
    let vars = |x: i32| MapVariableResolverFactory::with_variables([("x", Value::Int(x))]);
    assert_eq!(expr.evaluate(&Value::Null, &vars(-4)).unwrap(), Value::Int(4));
    assert_eq!(expr.evaluate(&Value::Null, &vars(5)).unwrap(), Value::Int(5));
    assert!(matches!(
        root_accessor(&expr).map(|a| a.root.clone()),
        Some(RootStep::Class { class, .. }) if class.name() == "kestrel.lang.Math"
    ));
}

#[test]
fn test_class_root_yields_to_later_shadowing() {
    let engine = Engine::default();
    let expr = engine.compile("Math.PI").unwrap().unwrap();
    let empty = MapVariableResolverFactory::new();
    assert_eq!(expr.evaluate(&Value::Null, &empty).unwrap(), Value::Double(std::f64::consts::PI));

    let mut fake = ValueMap::new();
    fake.insert(Value::str("PI"), Value::Int(1));
    let shadowed = MapVariableResolverFactory::with_variables([("Math", Value::map(fake.clone()))]);
    assert_eq!(expr.evaluate_interpreted(&Value::Null, &shadowed).unwrap(), Value::Int(1));
    assert_eq!(expr.evaluate(&Value::Null, &shadowed).unwrap(), Value::Int(1));
    assert!(matches!(
        root_accessor(&expr).map(|a| a.root.clone()),
        Some(RootStep::Variable(ref name)) if name == "Math"
    ));

    // A root map key shadows the class too, then the class comes back.
    assert_eq!(expr.evaluate(&Value::Null, &empty).unwrap(), Value::Double(std::f64::consts::PI));
    let ctx = holder(Value::Null);
    if let Value::Map(map) = &ctx {
        map.write().insert(Value::str("Math"), Value::map(fake));
    }
    assert_eq!(expr.evaluate(&ctx, &empty).unwrap(), Value::Int(1));
    assert_eq!(expr.evaluate(&Value::Null, &empty).unwrap(), Value::Double(std::f64::consts::PI));
}

#[test]
fn test_stale_index_step_does_not_repeat_side_effects() {
    let (engine, optimizer) = counting_engine();
    let expr = engine.compile("x[i++]").unwrap().unwrap();

    let as_list = MapVariableResolverFactory::with_variables([
        ("x", Value::list(vec![Value::str("from list")])),
        ("i", Value::Int(0)),
    ]);
    assert_eq!(expr.evaluate(&Value::Null, &as_list).unwrap(), Value::str("from list"));

    let mut map = ValueMap::new();
    map.insert(Value::Int(0), Value::str("from map"));
    let as_map = MapVariableResolverFactory::with_variables([("x", Value::map(map)), ("i", Value::Int(0))]);
    assert_eq!(expr.evaluate(&Value::Null, &as_map).unwrap(), Value::str("from map"));
    assert_eq!(as_map.get("i"), Some(Value::Int(1)));
    assert_eq!(optimizer.built.load(Ordering::SeqCst), 2);

    // The patched accessor kept the root and switched the index step.
    let accessor = root_accessor(&expr).expect("accessor cached");
    assert!(matches!(accessor.root, RootStep::Variable(ref name) if name == "x"));
    assert!(matches!(accessor.steps.as_slice(), [Step::MapIndex]));
}

#[test]
fn test_stale_method_step_evaluates_arguments_once() {
    let engine = Engine::default();
    let expr = engine.compile("xs.contains(n++)").unwrap().unwrap();

    let list = MapVariableResolverFactory::with_variables([
        ("xs", Value::list(vec![Value::Int(0)])),
        ("n", Value::Int(0)),
    ]);
    assert_eq!(expr.evaluate(&Value::Null, &list).unwrap(), Value::Bool(true));

    let text = MapVariableResolverFactory::with_variables([("xs", Value::str("a0")), ("n", Value::Int(0))]);
    let interpreted = MapVariableResolverFactory::with_variables([("xs", Value::str("a0")), ("n", Value::Int(0))]);
    assert_eq!(
        expr.evaluate(&Value::Null, &text).unwrap(),
        expr.evaluate_interpreted(&Value::Null, &interpreted).unwrap()
    );
    assert_eq!(text.get("n"), Some(Value::Int(1)));
    assert_eq!(interpreted.get("n"), Some(Value::Int(1)));
}

#[test]
fn test_cache_invalidate_only_clears_matching_accessor() {
    let cache = AccessorCache::default();
    let first = cache.publish(Accessor::new(RootStep::This));
    let second = cache.publish(Accessor::new(RootStep::Expression));
    cache.invalidate(&first);
    assert!(cache.is_cached());
    cache.invalidate(&second);
    assert!(!cache.is_cached());
}

#[test]
fn test_rebuild_guard_is_exclusive() {
    let cache = AccessorCache::default();
    let guard = cache.try_rebuild();
    assert!(guard.is_some());
    assert!(cache.try_rebuild().is_none());
    drop(guard);
    assert!(cache.try_rebuild().is_some());
}
