// Search and codec throughput at catalog scale
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::prelude::*;
use std::sync::Arc;
use visearch::{codec, EmbeddingIndex, IndexConfig, ProductRecord, SimilarityEngine, Vector};

const DIM: usize = 512;

fn random_vector(rng: &mut impl Rng, dim: usize) -> Vec<f32> {
    (0..dim).map(|_| rng.random_range(-1.0f32..1.0f32)).collect()
}

fn build_engine(size: usize, config: IndexConfig) -> SimilarityEngine {
    let mut rng = StdRng::seed_from_u64(42);
    let records = (0..size as u64)
        .map(|id| {
            ProductRecord::new(
                id,
                format!("product {id}"),
                "bench",
                format!("images/{id}.jpg"),
                Vector::new(random_vector(&mut rng, DIM)),
            )
        })
        .collect();
    SimilarityEngine::new(Arc::new(
        EmbeddingIndex::from_records(records, config).unwrap(),
    ))
}

fn benchmark_search(c: &mut Criterion) {
    let mut group = c.benchmark_group("search");
    let mut rng = StdRng::seed_from_u64(7);
    let query = random_vector(&mut rng, DIM);

    for size in [1_000, 10_000, 50_000].iter() {
        let engine = build_engine(*size, IndexConfig::default());
        group.bench_with_input(BenchmarkId::new("top10", size), size, |b, _| {
            b.iter(|| engine.search(black_box(&query), 10).unwrap());
        });

        let sequential = build_engine(
            *size,
            IndexConfig {
                parallel_threshold: usize::MAX,
                ..IndexConfig::default()
            },
        );
        group.bench_with_input(BenchmarkId::new("top10_sequential", size), size, |b, _| {
            b.iter(|| sequential.search(black_box(&query), 10).unwrap());
        });
    }

    group.finish();
}

fn benchmark_codec(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(1);
    let v = random_vector(&mut rng, DIM);
    let blob = codec::encode(&v);

    c.bench_function("codec_encode_512", |b| b.iter(|| codec::encode(black_box(&v))));
    c.bench_function("codec_decode_512", |b| {
        b.iter(|| codec::decode(black_box(&blob)).unwrap())
    });
}

criterion_group!(benches, benchmark_search, benchmark_codec);
criterion_main!(benches);
