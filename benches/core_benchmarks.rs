//! Criterion micro-benchmarks for Mayfly CPU-bound hot paths.
//!
//! Run all:     `cargo bench`
//! Run subset:  `cargo bench -- apply`

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rand::Rng;

use mayfly::index::{EventIndex, ExpireTable};
use mayfly::query::QueryExecutor;
use mayfly::ranking::Ranker;
use mayfly::types::{EventTuple, Feature};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn random_batch(terms: u64, docs: u64, n: usize) -> Vec<EventTuple> {
    let mut rng = rand::thread_rng();
    (0..n)
        .map(|_| EventTuple {
            doc_id: rng.gen_range(0..docs),
            term_id: rng.gen_range(0..terms),
            weight: rng.gen_range(0.0..10.0),
            expire_time: rng.gen_range(1_000..1_000_000),
        })
        .collect()
}

fn populated_index(terms: u64, docs: u64, n: usize) -> Arc<EventIndex> {
    let index = Arc::new(EventIndex::new(1024, 1 << 24));
    index.batch_update(&random_batch(terms, docs, n));
    index.apply(0);
    index
}

// ---------------------------------------------------------------------------
// 1. Staging and apply
// ---------------------------------------------------------------------------

fn bench_apply(c: &mut Criterion) {
    let mut group = c.benchmark_group("apply");

    for &batch_size in &[100usize, 1_000, 10_000] {
        group.throughput(Throughput::Elements(batch_size as u64));
        group.bench_with_input(
            BenchmarkId::new("stage_and_apply", batch_size),
            &batch_size,
            |bench, &n| {
                bench.iter_batched(
                    || (EventIndex::new(1024, 1 << 24), random_batch(64, 10_000, n)),
                    |(index, batch)| {
                        index.batch_update(black_box(&batch));
                        index.apply(0)
                    },
                    criterion::BatchSize::SmallInput,
                );
            },
        );
    }

    // Single edit against an already-large list: the incremental
    // chunk-sharing path.
    let index = populated_index(1, 100_000, 100_000);
    group.bench_function("single_edit_large_list", |bench| {
        bench.iter(|| {
            index.update(black_box(50_000), 0, 1.0, 1_000_000);
            index.apply(0)
        });
    });

    group.finish();
}

// ---------------------------------------------------------------------------
// 2. Expiration table churn
// ---------------------------------------------------------------------------

fn bench_expire_table(c: &mut Criterion) {
    let mut group = c.benchmark_group("expire_table");

    group.bench_function("update_100k", |bench| {
        let mut rng = rand::thread_rng();
        let keys: Vec<(u64, u64, i64)> = (0..100_000u64)
            .map(|doc| (doc % 64, doc, rng.gen_range(0..1_000_000)))
            .collect();
        bench.iter_batched(
            ExpireTable::new,
            |mut table| {
                for &(term_id, doc_id, t) in &keys {
                    table.update((term_id, doc_id), t);
                }
                table.size()
            },
            criterion::BatchSize::SmallInput,
        );
    });

    group.bench_function("expire_half_of_100k", |bench| {
        let mut rng = rand::thread_rng();
        bench.iter_batched(
            || {
                let mut table = ExpireTable::new();
                for doc in 0..100_000u64 {
                    table.update((doc % 64, doc), rng.gen_range(0..1_000_000));
                }
                table
            },
            |mut table| table.expire_with_limit(500_000, usize::MAX).len(),
            criterion::BatchSize::SmallInput,
        );
    });

    group.finish();
}

// ---------------------------------------------------------------------------
// 3. Query execution
// ---------------------------------------------------------------------------

fn bench_query(c: &mut Criterion) {
    let mut group = c.benchmark_group("query");

    let index = populated_index(64, 50_000, 200_000);
    let executor = QueryExecutor::new(index, Ranker::Direct);

    for &terms in &[2usize, 4, 8, 16] {
        let query: Vec<Feature> = (0..terms as u64)
            .map(|term_id| Feature {
                term_id,
                weight: 1.0,
            })
            .collect();
        group.bench_with_input(BenchmarkId::new("top_10", terms), &terms, |bench, _| {
            bench.iter(|| executor.execute(black_box(&query), 10));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_apply, bench_expire_table, bench_query);
criterion_main!(benches);
