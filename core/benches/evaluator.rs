//! Benchmarks for the Kestrel evaluator.
//!
//! Run with: `cargo bench` in the core/ directory.
//!
//! Benchmark groups:
//! 1. property_paths: cached accessors against interpreted resolution
//! 2. arithmetic: operator evaluation on variables (no folding)
//! 3. literal_folding: a constant expression with and without folding
//! 4. full_pipeline: compile + evaluate together, for comparison

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use kestrel_core::api::{
    CompilationOptions, CompiledExpression, Engine, ExecutionMode, ExecutionOptions,
};
use kestrel_core::resolver::MapVariableResolverFactory;
use kestrel_core::values::{Value, ValueMap};

/// A map nested `depth` levels deep under the key `next`, with `leaf` at
/// the bottom.
fn nested(depth: usize) -> Value {
    let mut value = Value::str("leaf");
    for _ in 0..depth {
        let mut map = ValueMap::new();
        map.insert(Value::str("next"), value);
        value = Value::map(map);
    }
    value
}

/// `root.next.next ... .next` with `depth` segments.
fn path_source(depth: usize) -> String {
    let mut source = String::from("root");
    for _ in 0..depth {
        source.push_str(".next");
    }
    source
}

/// `x + x + ... + x` with `n` additions.
fn arithmetic_chain(n: usize) -> String {
    let mut source = String::from("x");
    for _ in 0..n {
        source.push_str(" + x");
    }
    source
}

fn compile(engine: &Engine, source: &str) -> CompiledExpression {
    engine
        .compile(source)
        .expect("Compile failed")
        .expect("Empty expression")
}

fn bench_property_paths(c: &mut Criterion) {
    let mut group = c.benchmark_group("property_paths");
    let engine = Engine::default();

    for depth in [1, 4, 16] {
        group.throughput(Throughput::Elements(depth as u64));
        let expr = compile(&engine, &path_source(depth));
        let vars = MapVariableResolverFactory::with_variables([("root", nested(depth))]);

        for mode in [ExecutionMode::Accelerated, ExecutionMode::Interpreted] {
            let options = ExecutionOptions {
                mode,
                ..ExecutionOptions::default()
            };
            group.bench_with_input(
                BenchmarkId::new(format!("{:?}", mode), depth),
                &depth,
                |b, _| {
                    b.iter(|| {
                        let value = expr
                            .evaluate_with(black_box(&Value::Null), &vars, &options)
                            .expect("Eval failed");
                        black_box(value)
                    });
                },
            );
        }
    }

    group.finish();
}

fn bench_arithmetic(c: &mut Criterion) {
    let mut group = c.benchmark_group("arithmetic");
    let engine = Engine::default();
    let vars = MapVariableResolverFactory::with_variables([("x", Value::Int(1))]);

    for size in [10, 100, 400] {
        group.throughput(Throughput::Elements(size as u64));
        let expr = compile(&engine, &arithmetic_chain(size));
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| black_box(expr.evaluate(&Value::Null, &vars).expect("Eval failed")));
        });
    }

    group.finish();
}

fn bench_literal_folding(c: &mut Criterion) {
    let mut group = c.benchmark_group("literal_folding");
    let engine = Engine::default();
    let vars = MapVariableResolverFactory::new();
    let source = "(1 + 2) * 3 - 4 / 2 + 'x'.length()";

    for fold_literals in [true, false] {
        let options = CompilationOptions {
            fold_literals,
            ..CompilationOptions::default()
        };
        let expr = engine
            .compile_with(source, &options)
            .expect("Compile failed")
            .expect("Empty expression");
        let name = if fold_literals { "folded" } else { "unfolded" };
        group.bench_function(name, |b| {
            b.iter(|| black_box(expr.evaluate(&Value::Null, &vars).expect("Eval failed")));
        });
    }

    group.finish();
}

fn bench_full_pipeline(c: &mut Criterion) {
    let mut group = c.benchmark_group("full_pipeline");
    let engine = Engine::default();
    let vars = MapVariableResolverFactory::with_variables([("x", Value::Int(1))]);

    for size in [10, 100, 400] {
        group.throughput(Throughput::Elements(size as u64));
        let source = arithmetic_chain(size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &source, |b, source| {
            b.iter(|| {
                let expr = compile(&engine, black_box(source));
                black_box(expr.evaluate(&Value::Null, &vars).expect("Eval failed"))
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_property_paths,
    bench_arithmetic,
    bench_literal_folding,
    bench_full_pipeline
);
criterion_main!(benches);
