use std::fmt;
use std::io::Write;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use inference_harness::{
    generate_argument, top5, Argument, CompiledModel, Harness, HarnessConfig, HostAdapter, ParameterMap,
    ParameterShapes, Result, RunMode, Shape, StagingDevice,
};

// =====================================================================
// Benchmark Model
// =====================================================================

/// Model whose evaluation is a single reduction over the input
struct SumModel {
    input: Shape,
    classes: usize,
}

impl fmt::Display for SumModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "@0 = reduce_sum {}", self.input)
    }
}

impl CompiledModel for SumModel {
    fn parameter_shapes(&self) -> ParameterShapes {
        let mut shapes = ParameterShapes::new();
        shapes.insert("0".to_string(), self.input.clone());
        shapes
    }

    fn eval(&self, params: &ParameterMap) -> Result<Argument> {
        let total: f32 = params.get("0").and_then(|a| a.data().ok()).map_or(0.0, |d| d.iter().sum());
        let scores = (0..self.classes).map(|i| total * i as f32).collect();
        Argument::new(Shape::new(vec![self.classes]), scores)
    }

    fn size(&self) -> usize {
        1
    }

    fn remove_instructions(&mut self, _count: usize) -> Result<()> {
        Ok(())
    }

    fn perf_report(&self, out: &mut dyn Write, iterations: usize, _params: &ParameterMap) -> Result<()> {
        writeln!(out, "{} iterations", iterations)?;
        Ok(())
    }

    fn clone_model(&self) -> Box<dyn CompiledModel> {
        Box::new(SumModel {
            input: self.input.clone(),
            classes: self.classes,
        })
    }
}

// =====================================================================
// Criterion Benchmark Functions
// =====================================================================

fn bench_top5(c: &mut Criterion) {
    let mut group = c.benchmark_group("scoring");

    for len in [10usize, 1000, 1001] {
        let scores = generate_argument(&Shape::new(vec![len]), len as u64);
        let scores = scores.data().map(|d| d.to_vec()).unwrap_or_default();
        group.bench_function(BenchmarkId::new("top5", len), |b| {
            b.iter(|| top5(black_box(&scores)));
        });
    }

    group.finish();
}

fn bench_benchmark_loop(c: &mut Criterion) {
    let mut group = c.benchmark_group("run_modes");
    let model = SumModel {
        input: Shape::new(vec![1, 3, 224, 224]),
        classes: 1000,
    };
    let config = HarnessConfig::new(RunMode::Benchmark).set_iterations(10);

    group.bench_function(BenchmarkId::new("benchmark", "host"), |b| {
        let harness = Harness::new(config.clone(), &model, &HostAdapter).unwrap();
        b.iter(|| harness.run(&mut std::io::sink()).unwrap());
    });

    let device = StagingDevice::new();
    let copy_config = config.clone().enable_copy_arg(true);
    group.bench_function(BenchmarkId::new("benchmark", "staging_copy_arg"), |b| {
        let harness = Harness::new(copy_config.clone(), &model, &device).unwrap();
        b.iter(|| harness.run(&mut std::io::sink()).unwrap());
    });

    group.finish();
}

criterion_group!(benches, bench_top5, bench_benchmark_loop);
criterion_main!(benches);
