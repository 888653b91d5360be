use core::hint::black_box;
use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use futures::future::try_join_all;
use revkey::{
    AsyncPooledBitReversedSequenceGenerator, Column, Dialect, InMemorySequenceSource, Index,
    PooledBitReversedSequenceGenerator, Result, SchemaExporter, SchemaObjectGraph, SequenceConfig,
    SequenceDescriptor, TableNode,
};
use std::{
    sync::{Arc, Barrier},
    thread::scope,
    time::Instant,
};
use tokio::runtime::Builder;

// Number of IDs allocated per benchmark iteration (shared across threads for
// multi-threaded runs).
const TOTAL_IDS: usize = 4096;

const POOL_SIZES: [i64; 3] = [1, 50, 1000];

fn descriptor(pool_size: i64) -> SequenceDescriptor {
    SequenceConfig::new("bench_seq")
        .pool_size(pool_size)
        .build()
        .unwrap()
}

/// Single thread allocating from a fresh generator every iteration, so the
/// refill cost is included at its true rate.
fn bench_sequential(c: &mut Criterion) {
    let mut group = c.benchmark_group("sequential");
    group.throughput(Throughput::Elements(TOTAL_IDS as u64));

    for pool_size in POOL_SIZES {
        let descriptor = descriptor(pool_size);
        group.bench_function(format!("elems/{TOTAL_IDS}/pool/{pool_size}"), |b| {
            b.iter_custom(|iters| {
                let start = Instant::now();

                for _ in 0..iters {
                    let generator =
                        PooledBitReversedSequenceGenerator::new(InMemorySequenceSource::new());
                    for _ in 0..TOTAL_IDS {
                        black_box(generator.next_id(&descriptor).unwrap());
                    }
                }

                start.elapsed()
            });
        });
    }

    group.finish();
}

/// Threads contending on one shared pool.
fn bench_contended(c: &mut Criterion) {
    let mut group = c.benchmark_group("contended");
    group.throughput(Throughput::Elements(TOTAL_IDS as u64));

    for pool_size in POOL_SIZES {
        let descriptor = descriptor(pool_size);
        for thread_count in [2, 4, 8, 16] {
            let ids_per_thread = TOTAL_IDS / thread_count;

            group.bench_function(
                format!("elems/{TOTAL_IDS}/pool/{pool_size}/threads/{thread_count}"),
                |b| {
                    b.iter_custom(|iters| {
                        let start = Instant::now();

                        for _ in 0..iters {
                            let generator = PooledBitReversedSequenceGenerator::new(
                                InMemorySequenceSource::new(),
                            );
                            let barrier = Barrier::new(thread_count + 1);
                            scope(|s| {
                                for _ in 0..thread_count {
                                    s.spawn(|| {
                                        barrier.wait();
                                        for _ in 0..ids_per_thread {
                                            black_box(generator.next_id(&descriptor).unwrap());
                                        }
                                    });
                                }
                                barrier.wait();
                            });
                        }

                        start.elapsed()
                    });
                },
            );
        }
    }

    group.finish();
}

/// Many tokio tasks sharing one async generator.
fn bench_async_tokio(c: &mut Criterion) {
    let mut group = c.benchmark_group("async/tokio");
    group.sample_size(10);
    group.sampling_mode(criterion::SamplingMode::Flat);

    let total_ids = TOTAL_IDS * 64;

    for pool_size in POOL_SIZES {
        for num_tasks in [1, 8, 64, num_cpus::get() * 4] {
            let ids_per_task = total_ids / num_tasks;

            group.throughput(Throughput::Elements(total_ids as u64));
            group.bench_function(
                format!("elems/{total_ids}/pool/{pool_size}/tasks/{num_tasks}"),
                |b| {
                    let rt = Builder::new_multi_thread().enable_all().build().unwrap();

                    b.to_async(&rt).iter_custom(move |iters| async move {
                        let descriptor = descriptor(pool_size);
                        let start = Instant::now();

                        for _ in 0..iters {
                            let generator = Arc::new(AsyncPooledBitReversedSequenceGenerator::new(
                                InMemorySequenceSource::new(),
                            ));
                            let tasks = (0..num_tasks).map(|_| {
                                let generator = Arc::clone(&generator);
                                let descriptor = descriptor.clone();
                                tokio::spawn(async move {
                                    for _ in 0..ids_per_task {
                                        black_box(generator.next_id(&descriptor).await?);
                                    }
                                    Ok::<_, revkey::Error>(())
                                })
                            });

                            for result in try_join_all(tasks).await.unwrap() {
                                result.unwrap();
                            }
                        }

                        start.elapsed()
                    });
                },
            );
        }
    }

    group.finish();
}

/// A wide, three-level interleaved schema with an index per table.
fn wide_schema(roots: usize) -> Result<SchemaObjectGraph> {
    let mut tables = Vec::with_capacity(roots * 3);
    for r in 0..roots {
        let root = format!("Root{r}");
        let mid = format!("Mid{r}");
        let leaf = format!("Leaf{r}");
        tables.push(
            TableNode::new(&leaf)
                .column(Column::new("LeafId", "INT64").not_null())
                .primary_key(["LeafId"])
                .interleave_in(&mid, true)
                .index(Index::new(format!("{leaf}ById"), ["LeafId"])),
        );
        tables.push(
            TableNode::new(&mid)
                .column(Column::new("MidId", "INT64").not_null())
                .primary_key(["MidId"])
                .interleave_in(&root, true),
        );
        tables.push(
            TableNode::new(&root)
                .column(Column::new("RootId", "INT64").not_null())
                .column(Column::new("Payload", "STRING(MAX)"))
                .primary_key(["RootId"]),
        );
    }
    SchemaObjectGraph::new(tables)
}

fn bench_ddl(c: &mut Criterion) {
    let mut group = c.benchmark_group("ddl");
    let exporter = SchemaExporter::new(Dialect::google_sql());

    for roots in [10, 100, 1000] {
        group.throughput(Throughput::Elements((roots * 3) as u64));
        group.bench_function(format!("graph/tables/{}", roots * 3), |b| {
            b.iter(|| black_box(wide_schema(roots).unwrap()));
        });

        let graph = wide_schema(roots).unwrap();
        group.bench_function(format!("create/tables/{}", roots * 3), |b| {
            b.iter(|| black_box(exporter.generate_create_script(&graph).unwrap()));
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_sequential,
    bench_contended,
    bench_async_tokio,
    bench_ddl,
);
criterion_main!(benches);
