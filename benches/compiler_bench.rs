use criterion::{black_box, criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion};
use tirc::*;

// Compile-latency scenarios. All scenarios compile without errors.

const SCALAR: &str = r#"
c = const f64 3.14
a = annotate(c, "layer1_activation")
return a
"#;

const MLP: &str = r#"
x = param f32[3]
w1 = const f32 [0.5, -1.0, 2.0]
b1 = const f32 [0.1, 0.1, 0.1]
h = mul(x, w1)
h1 = add(h, b1)
a1 = relu(h1)
l1 = annotate(a1, "type=Dense")
w2 = const f32 [1.0, 1.0, -1.0]
o = mul(l1, w2)
l2 = annotate(o, "type=Dense")
return l2
"#;

fn scenarios() -> [(&'static str, &'static str); 2] {
    [("scalar", SCALAR), ("mlp", MLP)]
}

/// A chain of `n_layers` dense layers, each followed by an annotation.
fn generate_layer_chain(n_layers: usize) -> String {
    let mut src = String::from("x = param f32[4]\n");
    let mut prev = "x".to_string();
    for i in 0..n_layers {
        src.push_str(&format!("w{i} = const f32 [0.5, 0.25, -0.5, 1.0]\n"));
        src.push_str(&format!("m{i} = mul({prev}, w{i})\n"));
        src.push_str(&format!("r{i} = relu(m{i})\n"));
        src.push_str(&format!("l{i} = annotate(r{i}, \"type=Dense\")\n"));
        prev = format!("l{i}");
    }
    src.push_str(&format!("return {prev}\n"));
    src
}

fn bench_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse");
    for (name, src) in scenarios() {
        group.bench_with_input(BenchmarkId::from_parameter(name), src, |b, src| {
            b.iter(|| parser::parse(black_box(src)))
        });
    }
    group.finish();
}

fn bench_compile(c: &mut Criterion) {
    let mut group = c.benchmark_group("compile");
    let opts = pipeline::CompileOptions::default();
    for (name, src) in scenarios() {
        group.bench_with_input(BenchmarkId::from_parameter(name), src, |b, src| {
            b.iter(|| {
                let result = pipeline::compile(black_box(src), &opts);
                assert!(!result.has_errors());
                result
            })
        });
    }
    group.finish();
}

fn bench_lower_scaling(c: &mut Criterion) {
    let mut group = c.benchmark_group("lower_scaling");
    for n in [1usize, 10, 100, 1000] {
        let src = generate_layer_chain(n);
        let result = pipeline::compile(&src, &pipeline::CompileOptions::default());
        let graph = result.graph.expect("layer chain must build");
        group.bench_with_input(BenchmarkId::from_parameter(n), &graph, |b, graph| {
            b.iter(|| lower::lower_graph(black_box(graph), &lower::LowerOptions::default()))
        });
    }
    group.finish();
}

fn bench_summary(c: &mut Criterion) {
    let mut group = c.benchmark_group("summary");
    for n in [10usize, 100] {
        let src = generate_layer_chain(n);
        let program = pipeline::compile(&src, &pipeline::CompileOptions::default())
            .program
            .expect("layer chain must lower");
        group.bench_with_input(BenchmarkId::from_parameter(n), &program, |b, program| {
            b.iter_batched(
                || program.clone(),
                |program| stats::summarize(&program),
                BatchSize::SmallInput,
            )
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_parse,
    bench_compile,
    bench_lower_scaling,
    bench_summary
);
criterion_main!(benches);
