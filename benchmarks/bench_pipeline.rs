use std::hint::black_box;
use std::path::Path;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use tempfile::TempDir;

use cityfilter::{Aggregate, MergeStrategy, PipelineConfig, PipelineProcessor, Record, SharedAggregate};

const FILES: usize = 64;
const ROWS_PER_FILE: usize = 2_000;

fn build_fixture() -> TempDir {
    let dir = tempfile::tempdir().expect("temp dir");
    for file in 0..FILES {
        let mut content = String::with_capacity(ROWS_PER_FILE * 24);
        for row in 0..ROWS_PER_FILE {
            content.push_str(&format!(
                "city{}_{},S{},{}\n",
                file,
                row,
                (file + row) % 50,
                (row * 7919 + file * 31) % 1_000_000
            ));
        }
        let sub = dir.path().join(format!("part{}", file % 8));
        std::fs::create_dir_all(&sub).expect("fixture dir");
        std::fs::write(sub.join(format!("f{}.csv", file)), content).expect("fixture file");
    }
    dir
}

fn run_pipeline(root: &Path, config: PipelineConfig) -> usize {
    let outcome = PipelineProcessor::new(config)
        .run(root, crossbeam_channel::never())
        .expect("pipeline run");
    outcome.stats.records_merged
}

fn bench_merge_strategies(c: &mut Criterion) {
    let fixture = build_fixture();
    let mut group = c.benchmark_group("pipeline_merge");
    group.sample_size(20);

    for strategy in [MergeStrategy::Shared, MergeStrategy::Partitioned] {
        for aggregators in [1usize, 2, 4] {
            let config = PipelineConfig::default()
                .with_threshold(250_000)
                .with_workers(4, aggregators)
                .with_merge_strategy(strategy);
            group.bench_with_input(
                BenchmarkId::new(format!("{:?}", strategy), aggregators),
                &config,
                |b, config| {
                    b.iter(|| black_box(run_pipeline(fixture.path(), config.clone())));
                },
            );
        }
    }
    group.finish();
}

fn bench_aggregate_contention(c: &mut Criterion) {
    let records: Vec<Record> = (0..20_000u64)
        .map(|i| Record {
            subdivision: format!("S{}", i % 50),
            city: format!("c{}", i),
            population: i,
        })
        .collect();

    c.bench_function("shared_aggregate_4_threads", |b| {
        b.iter(|| {
            let shared = SharedAggregate::new();
            std::thread::scope(|scope| {
                for chunk in records.chunks(records.len() / 4) {
                    let shared = shared.clone();
                    scope.spawn(move || {
                        for record in chunk {
                            shared.merge_record(record.clone());
                        }
                    });
                }
            });
            black_box(shared.snapshot().len())
        });
    });

    c.bench_function("partitioned_aggregate_4_threads", |b| {
        b.iter(|| {
            let shared = SharedAggregate::new();
            std::thread::scope(|scope| {
                for chunk in records.chunks(records.len() / 4) {
                    let shared = shared.clone();
                    scope.spawn(move || {
                        let mut partition = Aggregate::new();
                        for record in chunk {
                            partition.insert(record.clone());
                        }
                        shared.absorb(partition);
                    });
                }
            });
            black_box(shared.snapshot().len())
        });
    });
}

criterion_group!(benches, bench_merge_strategies, bench_aggregate_contention);
criterion_main!(benches);
