use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use runtime_atlas_core::prelude::*;

fn generate_items(count: usize, min_size: u32, max_size: u32) -> Vec<(String, u32, u32)> {
    let mut rng = StdRng::seed_from_u64(0xA71A5);
    (0..count)
        .map(|i| {
            let w = rng.gen_range(min_size..=max_size);
            let h = rng.gen_range(min_size..=max_size);
            (format!("item_{}", i), w, h)
        })
        .collect()
}

fn config(coalesce: bool) -> AtlasConfig {
    AtlasConfig::builder()
        .with_page_size(2048, 2048)
        .padding(1)
        .coalesce_free(coalesce)
        .build()
}

fn bench_fill(c: &mut Criterion) {
    let mut group = c.benchmark_group("fill");

    for count in [50, 200, 800] {
        let items = generate_items(count, 16, 64);
        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::new("insert", count), &items, |b, items| {
            b.iter(|| {
                let mut atlas = Atlas::new(config(false)).expect("cfg");
                for (key, w, h) in items {
                    let _ = atlas.insert(key, *w, *h);
                }
                black_box(atlas.num_pages())
            });
        });
    }

    group.finish();
}

fn bench_churn(c: &mut Criterion) {
    let mut group = c.benchmark_group("churn");
    let items = generate_items(300, 8, 96);

    for coalesce in [false, true] {
        let name = if coalesce { "coalesce" } else { "plain" };
        group.bench_function(name, |b| {
            b.iter(|| {
                let mut rng = StdRng::seed_from_u64(7);
                let mut atlas = Atlas::new(config(coalesce)).expect("cfg");
                for _ in 0..2000 {
                    let (key, w, h) = &items[rng.gen_range(0..items.len())];
                    if rng.gen_bool(0.6) {
                        let _ = atlas.insert(key, *w, *h);
                    } else {
                        atlas.release(key);
                    }
                }
                black_box(atlas.stats().occupancy)
            });
        });
    }

    group.finish();
}

fn bench_queries(c: &mut Criterion) {
    let mut group = c.benchmark_group("queries");

    let mut atlas = Atlas::new(config(false)).expect("cfg");
    for (key, w, h) in generate_items(200, 16, 48) {
        let _ = atlas.insert(&key, w, h);
    }

    group.bench_function("get", |b| {
        b.iter(|| black_box(atlas.get("item_100")));
    });

    group.bench_function("keys", |b| {
        b.iter(|| black_box(atlas.keys().len()));
    });

    group.bench_function("stats", |b| {
        b.iter(|| black_box(atlas.stats()));
    });

    group.finish();
}

fn bench_release(c: &mut Criterion) {
    let mut group = c.benchmark_group("release");
    let items = generate_items(100, 16, 48);

    group.bench_function("last_reference", |b| {
        b.iter_batched(
            || {
                let mut atlas = Atlas::new(config(false)).expect("cfg");
                for (key, w, h) in &items {
                    let _ = atlas.insert(key, *w, *h);
                }
                atlas
            },
            |mut atlas| black_box(atlas.release("item_50")),
            criterion::BatchSize::SmallInput,
        );
    });

    group.finish();
}

criterion_group!(benches, bench_fill, bench_churn, bench_queries, bench_release);
criterion_main!(benches);
