//! Benchmarks for fitting and applying target transforms on panels.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use target_transforms::core::GroupedArray;
use target_transforms::transforms::{
    AutoDifferences, Differences, GroupedTransform, LocalBoxCox, LocalStandardScaler,
};

fn generate_panel(n_series: usize, len: usize) -> GroupedArray {
    let groups: Vec<Vec<f64>> = (0..n_series)
        .map(|s| {
            (0..len)
                .map(|i| {
                    50.0 + s as f64
                        + 0.1 * i as f64
                        + 5.0 * (2.0 * std::f64::consts::PI * i as f64 / 12.0).sin()
                })
                .collect()
        })
        .collect();
    GroupedArray::from_groups(&groups)
}

fn bench_fit_transform(c: &mut Criterion) {
    let mut group = c.benchmark_group("fit_transform");

    for n_series in [10, 100, 1000].iter() {
        let ga = generate_panel(*n_series, 120);

        group.bench_with_input(BenchmarkId::new("Differences", n_series), n_series, |b, _| {
            b.iter(|| {
                let mut t = Differences::new([1, 12]).unwrap();
                t.fit_transform(black_box(&ga)).unwrap()
            })
        });

        group.bench_with_input(
            BenchmarkId::new("AutoDifferences", n_series),
            n_series,
            |b, _| {
                b.iter(|| {
                    let mut t = AutoDifferences::seasonal(12, 1).unwrap();
                    t.fit_transform(black_box(&ga)).unwrap()
                })
            },
        );

        group.bench_with_input(
            BenchmarkId::new("LocalStandardScaler", n_series),
            n_series,
            |b, _| {
                b.iter(|| {
                    let mut t = LocalStandardScaler::default();
                    t.fit_transform(black_box(&ga)).unwrap()
                })
            },
        );

        group.bench_with_input(BenchmarkId::new("LocalBoxCox", n_series), n_series, |b, _| {
            b.iter(|| {
                let mut t = LocalBoxCox::default();
                t.fit_transform(black_box(&ga)).unwrap()
            })
        });
    }

    group.finish();
}

fn bench_threads(c: &mut Criterion) {
    let mut group = c.benchmark_group("boxcox_threads");
    let ga = generate_panel(1000, 120);

    for threads in [1, 2, 4].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(threads), threads, |b, &n| {
            b.iter(|| {
                let mut t = LocalBoxCox::default().with_num_threads(n);
                t.fit_transform(black_box(&ga)).unwrap()
            })
        });
    }

    group.finish();
}

fn bench_inverse(c: &mut Criterion) {
    let ga = generate_panel(1000, 120);
    let mut diffs = Differences::new([1, 12]).unwrap();
    diffs.fit_transform(&ga).unwrap();
    let forecast = GroupedArray::from_groups(&vec![vec![0.1; 24]; 1000]);

    c.bench_function("differences_inverse_transform", |b| {
        b.iter(|| diffs.inverse_transform(black_box(&forecast)).unwrap())
    });
}

criterion_group!(benches, bench_fit_transform, bench_threads, bench_inverse);
criterion_main!(benches);
