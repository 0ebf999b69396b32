use criterion::{criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use structtrace_bench::targets::build_target;
use structtrace_bench::BenchStructureKind;

fn workload(size: usize) -> Vec<i64> {
    let mut rng = StdRng::seed_from_u64(0xbe11c ^ size as u64);
    let bound = (size as i64) * 10;
    (0..size).map(|_| rng.random_range(0..bound)).collect()
}

fn bench_insert(c: &mut Criterion) {
    let mut group = c.benchmark_group("insert");
    for size in [1_000, 10_000] {
        let data = workload(size);
        for kind in BenchStructureKind::ALL {
            group.bench_with_input(
                BenchmarkId::new(kind.to_string(), size),
                &data,
                |b, data| {
                    b.iter_batched(
                        || build_target(kind),
                        |mut target| {
                            for &value in data {
                                target.insert(value);
                            }
                            target
                        },
                        BatchSize::SmallInput,
                    );
                },
            );
        }
    }
    group.finish();
}

fn bench_search(c: &mut Criterion) {
    let mut group = c.benchmark_group("search");
    let size = 10_000;
    let data = workload(size);
    for kind in BenchStructureKind::ALL {
        let mut target = build_target(kind);
        for &value in &data {
            target.insert(value);
        }
        group.bench_with_input(BenchmarkId::new(kind.to_string(), size), &data, |b, data| {
            let mut i = 0usize;
            b.iter(|| {
                let hit = target.contains(data[i % data.len()]);
                i = i.wrapping_add(1);
                hit
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_insert, bench_search);
criterion_main!(benches);
