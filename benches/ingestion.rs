//! Benchmarks for ingestion and query through the local store
//!
//! This benchmark measures:
//! - Hashing embedder throughput
//! - batch_insert of N records (embed + one upsert + snapshot write)
//! - Exact-scan query latency as the collection grows

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use semantic_store::embeddings::HashingEmbedder;
use semantic_store::facade::prelude::*;
use tokio::runtime::Runtime;

fn sample_texts(n: usize) -> Vec<String> {
    const WORDS: &[&str] = &[
        "hiking", "mountain", "swimming", "running", "quantum", "lasagna", "beaches", "cardio",
        "football", "baseball", "reading", "movies", "fitness", "travel", "science", "cooking",
    ];
    (0..n)
        .map(|i| {
            (0..8)
                .map(|j| WORDS[(i * 7 + j * 3) % WORDS.len()])
                .collect::<Vec<_>>()
                .join(" ")
        })
        .collect()
}

fn bench_embedding(c: &mut Criterion) {
    let embedder = HashingEmbedder::default();
    let texts = sample_texts(64);
    let mut group = c.benchmark_group("hashing_embedder");
    group.throughput(Throughput::Elements(texts.len() as u64));
    group.bench_function("embed_64", |b| {
        b.iter(|| {
            for t in &texts {
                black_box(embedder.embed_text(black_box(t)));
            }
        })
    });
    group.finish();
}

async fn open_store(dir: &std::path::Path) -> SemanticStore {
    SemanticStore::open(
        StoreConfig::new()
            .with_persist_directory(dir)
            .with_collection("bench")
            .with_embedder_name("hashing"),
    )
    .await
    .expect("open store")
}

fn bench_batch_insert(c: &mut Criterion) {
    let rt = Runtime::new().expect("runtime");
    let mut group = c.benchmark_group("batch_insert");
    for size in [16usize, 128, 512] {
        let texts = sample_texts(size);
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &texts, |b, texts| {
            b.to_async(&rt).iter(|| async move {
                let dir = tempfile::tempdir().expect("tempdir");
                let store = open_store(dir.path()).await;
                let handle = store.require_active().expect("active");
                black_box(handle.batch_insert(texts, None, None).await.expect("insert"));
            })
        });
    }
    group.finish();
}

fn bench_query(c: &mut Criterion) {
    let rt = Runtime::new().expect("runtime");
    let mut group = c.benchmark_group("query");
    for size in [100usize, 1000] {
        let dir = tempfile::tempdir().expect("tempdir");
        let handle = rt.block_on(async {
            let store = open_store(dir.path()).await;
            let handle = store.require_active().expect("active");
            handle
                .batch_insert(&sample_texts(size), None, None)
                .await
                .expect("insert");
            handle
        });
        group.bench_with_input(BenchmarkId::from_parameter(size), &handle, |b, handle| {
            b.to_async(&rt).iter(|| async move {
                black_box(
                    handle
                        .query("running and swimming fitness", DEFAULT_TOP_K, None)
                        .await
                        .expect("query"),
                )
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_embedding, bench_batch_insert, bench_query);
criterion_main!(benches);
