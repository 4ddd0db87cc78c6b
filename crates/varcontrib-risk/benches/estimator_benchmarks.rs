//! Benchmarks for the VaR contribution estimators.
//!
//! Run with: cargo bench -p varcontrib-risk

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rand::rngs::StdRng;
use rand::SeedableRng;

use varcontrib_risk::market::{ConfidenceLevel, DemoMarket};
use varcontrib_risk::scenarios::{ScenarioGenerator, ScenarioSet};
use varcontrib_risk::var::{
    analytical_contributions, naive_contributions, refined_contributions, EstimatorConfig,
};

// =============================================================================
// TEST DATA GENERATORS
// =============================================================================

fn demo(assets: usize) -> DemoMarket {
    DemoMarket::generate(assets, 10.0, 42).expect("demo market")
}

fn scenarios(market: &DemoMarket, count: usize) -> ScenarioSet {
    ScenarioGenerator::new(&market.model, count)
        .expect("generator")
        .generate(&mut StdRng::seed_from_u64(7))
}

fn confidence() -> ConfidenceLevel {
    ConfidenceLevel::new(0.99).expect("confidence")
}

// =============================================================================
// BENCHMARKS
// =============================================================================

fn bench_sampler(c: &mut Criterion) {
    let mut group = c.benchmark_group("sampler");
    let market = demo(40);
    for count in [10_000usize, 100_000] {
        let generator = ScenarioGenerator::new(&market.model, count).expect("generator");
        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, _| {
            let mut rng = StdRng::seed_from_u64(1);
            b.iter(|| black_box(generator.generate(&mut rng)));
        });
    }
    group.finish();
}

fn bench_analytical(c: &mut Criterion) {
    let market = demo(40);
    c.bench_function("analytical_40_assets", |b| {
        b.iter(|| {
            analytical_contributions(
                black_box(&market.model),
                black_box(&market.allocation),
                confidence(),
            )
        });
    });
}

fn bench_empirical(c: &mut Criterion) {
    let mut group = c.benchmark_group("empirical_estimators");
    group.sample_size(20);
    let market = demo(40);
    let config = EstimatorConfig::default();

    for count in [10_000usize, 100_000] {
        let set = scenarios(&market, count);
        group.throughput(Throughput::Elements(count as u64));

        group.bench_with_input(BenchmarkId::new("naive", count), &set, |b, set| {
            b.iter(|| {
                naive_contributions(set, &market.allocation, confidence(), config.perturbation)
            });
        });

        let bandwidth = config.bandwidth(count);
        group.bench_with_input(BenchmarkId::new("refined", count), &set, |b, set| {
            b.iter(|| refined_contributions(set, &market.allocation, confidence(), bandwidth));
        });
    }
    group.finish();
}

criterion_group!(sampling, bench_sampler);
criterion_group!(estimators, bench_analytical, bench_empirical);
criterion_main!(sampling, estimators);
