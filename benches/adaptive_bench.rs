//! Criterion benchmarks for evaluation, evolution and full engine runs.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use u_adaptive::engine::{Engine, EngineConfig, OptimizationConfig, Strategy};
use u_adaptive::evolution::EvolutionOperator;
use u_adaptive::fitness::{AcceleratorEvaluator, CpuEvaluator, Evaluator};
use u_adaptive::population::Population;
use u_adaptive::random::create_rng;

fn bench_evaluation(c: &mut Criterion) {
    let mut group = c.benchmark_group("evaluation");

    for (size, dim) in [(50usize, 32usize), (200, 128), (1000, 256)] {
        let pop = Population::random("bench", size, dim, 1.0, &mut create_rng(42));
        group.bench_with_input(BenchmarkId::new("cpu", format!("{size}x{dim}")), &pop, |b, p| {
            let eval = CpuEvaluator::new();
            let mut rng = create_rng(1);
            b.iter(|| black_box(eval.evaluate(black_box(p), &mut rng)))
        });
        group.bench_with_input(
            BenchmarkId::new("accelerator", format!("{size}x{dim}")),
            &pop,
            |b, p| {
                let eval = AcceleratorEvaluator::new();
                let mut rng = create_rng(1);
                b.iter(|| black_box(eval.evaluate(black_box(p), &mut rng)))
            },
        );
    }
    group.finish();
}

fn bench_generation(c: &mut Criterion) {
    let mut group = c.benchmark_group("generation");

    for (size, dim) in [(20usize, 32usize), (100, 128)] {
        let pop = Population::random("bench", size, dim, 1.0, &mut create_rng(42));
        group.bench_with_input(BenchmarkId::from_parameter(format!("{size}x{dim}")), &pop, |b, p| {
            let op = EvolutionOperator::new();
            let mut rng = create_rng(7);
            b.iter_batched(
                || p.clone(),
                |mut pop| black_box(op.advance(&mut pop, &mut rng)),
                criterion::BatchSize::SmallInput,
            )
        });
    }
    group.finish();
}

fn bench_engine_run(c: &mut Criterion) {
    let mut group = c.benchmark_group("engine_run");
    group.sample_size(10);

    for strategy in [Strategy::PopulationEvolution, Strategy::GradientDescent, Strategy::Hybrid] {
        let engine = Engine::new(
            EngineConfig::default()
                .with_feature_dim(32)
                .with_population_size(20)
                .with_domain("a", 0.6)
                .with_domain("b", 0.4)
                .with_seed(42),
        )
        .unwrap();
        let config = OptimizationConfig::default()
            .with_strategy(strategy)
            .with_max_iterations(50)
            .with_convergence_threshold(0.0)
            .with_seed(3);
        group.bench_with_input(BenchmarkId::from_parameter(strategy), &config, |b, cfg| {
            b.iter(|| black_box(engine.run(cfg.clone())))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_evaluation, bench_generation, bench_engine_run);
criterion_main!(benches);
