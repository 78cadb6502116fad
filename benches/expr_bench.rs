use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use linexpr::prelude::*;
use linexpr::{inner, MatMul};
use rand::{rngs::StdRng, Rng, SeedableRng};
use rand_distr::StandardNormal;
use std::time::Duration;

fn random_matrix(rows: usize, cols: usize, seed: u64) -> DynamicMatrix<f64> {
    DynamicMatrix::random(rows, cols, &mut StdRng::seed_from_u64(seed), &StandardNormal)
}

fn random_vector(len: usize, seed: u64) -> DynamicVector<f64> {
    DynamicVector::random(len, &mut StdRng::seed_from_u64(seed), &StandardNormal)
}

// `c = a + b * 2 - a` fused into one pass versus one temporary per operator.
fn bench_elementwise_chain(c: &mut Criterion) {
    let mut group = c.benchmark_group("elementwise_chain");
    for size in [100usize, 500, 1000] {
        group.throughput(Throughput::Elements((size * size) as u64));
        let a = random_matrix(size, size, 1);
        let b = random_matrix(size, size, 2);

        group.bench_with_input(BenchmarkId::new("temporaries", size), &size, |bench, _| {
            bench.iter(|| {
                let scaled = (&b * 2.0_f64).eval().unwrap();
                let sum = (&a + &scaled).eval().unwrap();
                (&sum - &a).eval().unwrap()
            });
        });

        let mut out = DynamicMatrix::<f64>::zeros(size, size);
        group.bench_with_input(BenchmarkId::new("fused", size), &size, |bench, _| {
            bench.iter(|| {
                if let Err(err) = out.assign(&a + &b * 2.0_f64 - &a) {
                    panic!("assign failed: {err}");
                }
            });
        });
    }
    group.finish();
}

fn bench_product(c: &mut Criterion) {
    let mut group = c.benchmark_group("product");
    group.sample_size(20);
    group.measurement_time(Duration::from_secs(5));
    for size in [64usize, 256, 512] {
        group.throughput(Throughput::Elements((2 * size * size * size) as u64));
        let a = random_matrix(size, size, 3);
        let b = random_matrix(size, size, 4);
        let mut out = DynamicMatrix::<f64>::zeros(size, size);

        for (label, use_blas) in [("portable", false), ("backend", true)] {
            let cfg = EvalConfig::serial().with_blas(use_blas);
            group.bench_with_input(BenchmarkId::new(label, size), &size, |bench, _| {
                bench.iter(|| out.assign_with(&a * &b, &cfg).unwrap());
            });
        }

        let cfg = EvalConfig::default();
        group.bench_with_input(BenchmarkId::new("default_config", size), &size, |bench, _| {
            bench.iter(|| out.assign_with(&a * &b, &cfg).unwrap());
        });
    }
    group.finish();
}

// In-place `a = a * b` through `update` versus an explicit temporary.
fn bench_aliased_update(c: &mut Criterion) {
    let mut group = c.benchmark_group("aliased_update");
    group.sample_size(20);
    for size in [64usize, 256] {
        let b = random_matrix(size, size, 5);
        let mut a = random_matrix(size, size, 6);

        group.bench_with_input(BenchmarkId::new("update", size), &size, |bench, _| {
            bench.iter(|| a.update(|m| MatMul::new(m, &b)).unwrap());
        });

        group.bench_with_input(BenchmarkId::new("temporary", size), &size, |bench, _| {
            bench.iter(|| {
                let tmp = (&a * &b).eval().unwrap();
                a.assign(&tmp).unwrap();
            });
        });

        group.bench_with_input(BenchmarkId::new("elementwise", size), &size, |bench, _| {
            bench.iter(|| a.update(|m| m * 0.5_f64 + m).unwrap());
        });
    }
    group.finish();
}

fn bench_sparse_matvec(c: &mut Criterion) {
    let mut group = c.benchmark_group("sparse_matvec");
    let mut rng = StdRng::seed_from_u64(7);
    for size in [1_000usize, 10_000] {
        let per_row = 8;
        group.throughput(Throughput::Elements((size * per_row) as u64));
        let triplets: Vec<(usize, usize, f64)> = (0..size)
            .flat_map(|i| (0..per_row).map(move |k| (i, (i * 31 + k * 977) % size)))
            .map(|(i, j)| (i, j, rng.gen::<f64>()))
            .collect();
        let a = CompressedMatrix::from_triplets(size, size, triplets).unwrap();
        let x = random_vector(size, 8);
        let mut y = DynamicVector::<f64>::zeros(size);

        group.bench_with_input(BenchmarkId::new("compressed", size), &size, |bench, _| {
            bench.iter(|| y.assign(&a * &x).unwrap());
        });
    }
    group.finish();
}

fn bench_reductions(c: &mut Criterion) {
    let mut group = c.benchmark_group("reductions");
    for size in [10_000usize, 1_000_000] {
        group.throughput(Throughput::Elements(size as u64));
        let x = random_vector(size, 9);
        let y = random_vector(size, 10);

        group.bench_with_input(BenchmarkId::new("inner", size), &size, |bench, _| {
            bench.iter(|| inner(&x, &y).unwrap());
        });
        group.bench_with_input(BenchmarkId::new("norm", size), &size, |bench, _| {
            bench.iter(|| (&x - &y).norm().unwrap());
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_elementwise_chain,
    bench_product,
    bench_aliased_update,
    bench_sparse_matvec,
    bench_reductions
);
criterion_main!(benches);
