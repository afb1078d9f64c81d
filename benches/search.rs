use criterion::{Criterion, criterion_group, criterion_main};
use faq_search::vector::FlatIpIndex;
use std::hint::black_box;

const DIM: usize = 384;
const ROWS: usize = 1000;

/// Deterministic pseudo-random vector, no RNG dependency needed.
fn synthetic_vector(seed: u64) -> Vec<f32> {
    let mut state = seed.wrapping_mul(6_364_136_223_846_793_005).wrapping_add(1);
    (0..DIM)
        .map(|_| {
            state = state
                .wrapping_mul(6_364_136_223_846_793_005)
                .wrapping_add(1_442_695_040_888_963_407);
            // Map the top bits into [-1, 1).
            ((state >> 40) as f32 / 8_388_608.0) - 1.0
        })
        .collect()
}

fn build_test_index() -> FlatIpIndex {
    let rows: Vec<Vec<f32>> = (0..ROWS).map(|i| synthetic_vector(i as u64 + 1)).collect();
    FlatIpIndex::build(DIM, rows).expect("index should build from synthetic rows")
}

fn bench_flat_search(c: &mut Criterion) {
    let index = build_test_index();
    let mut query = synthetic_vector(0xDEAD_BEEF);
    faq_search::vector::l2_normalize(&mut query);

    let mut group = c.benchmark_group("flat_ip_search");

    group.bench_function("top_50_of_1000", |b| {
        b.iter(|| index.search(black_box(&query), black_box(50)));
    });

    group.bench_function("top_5_of_1000", |b| {
        b.iter(|| index.search(black_box(&query), black_box(5)));
    });

    group.finish();
}

fn bench_index_build(c: &mut Criterion) {
    let rows: Vec<Vec<f32>> = (0..ROWS).map(|i| synthetic_vector(i as u64 + 1)).collect();

    c.bench_function("build_1000x384", |b| {
        b.iter(|| {
            FlatIpIndex::build(black_box(DIM), black_box(rows.clone()))
                .expect("index should build")
        });
    });
}

criterion_group!(benches, bench_flat_search, bench_index_build);
criterion_main!(benches);
