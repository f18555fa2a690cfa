//! End-to-end detection benchmarks over a synthetic license corpus.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use licensefp::{
    CanonicalizeConfig, CorpusEntry, CtphConfig, DetectionEngine, DetectionOptions,
    DetectionScheduler, InMemoryCorpus, ScheduleMode, SchedulerConfig, canonicalize_text,
    detect_text, fingerprint_text,
};

const APACHE: &str = include_str!("../tests/fixtures/licenses/apache-2.0");
const BSD: &str = include_str!("../tests/fixtures/licenses/bsd-3-clause");
const MIT: &str = include_str!("../tests/fixtures/licenses/mit");

/// `size` entries built from the fixtures, each with a distinct trailer so
/// no two fingerprints are identical.
fn synthetic_corpus(size: usize) -> Vec<CorpusEntry> {
    let canonical = CanonicalizeConfig::default();
    let ctph = CtphConfig::default();
    (0..size)
        .map(|i| {
            let base = [APACHE, BSD, MIT][i % 3];
            let text = format!("{base}\nvariant {i}");
            fingerprint_text(&format!("license-{i}"), &text, &canonical, &ctph)
                .expect("fingerprint")
        })
        .collect()
}

fn canonical_bytes(text: &str) -> Vec<u8> {
    canonicalize_text(text, &CanonicalizeConfig::default())
        .expect("canonicalize")
        .text
        .into_bytes()
}

fn bench_engine(c: &mut Criterion) {
    let mut group = c.benchmark_group("engine_detect");
    let incoming = canonical_bytes(MIT);

    for size in [30usize, 300, 3_000] {
        let corpus = synthetic_corpus(size);
        group.throughput(Throughput::Elements(size as u64));

        let engine = DetectionEngine::new(DetectionOptions::default()).expect("engine");
        group.bench_with_input(BenchmarkId::new("full_scan", size), &corpus, |b, corpus| {
            b.iter(|| engine.detect(black_box(&incoming), corpus).expect("detect"))
        });

        let early = DetectionEngine::new(DetectionOptions::default().with_early_exit(0.9))
            .expect("engine");
        group.bench_with_input(BenchmarkId::new("early_exit", size), &corpus, |b, corpus| {
            b.iter(|| early.detect(black_box(&incoming), corpus).expect("detect"))
        });
    }

    group.finish();
}

fn bench_pipeline(c: &mut Criterion) {
    let store = InMemoryCorpus::from_entries(synthetic_corpus(300));
    let canonical = CanonicalizeConfig::default();
    let options = DetectionOptions::default();

    c.bench_function("detect_text_300", |b| {
        b.iter(|| detect_text(black_box(APACHE), &store, &canonical, &options).expect("detect"))
    });
}

fn bench_scheduler(c: &mut Criterion) {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .build()
        .expect("runtime");
    let corpus = synthetic_corpus(3_000);
    let incoming = canonical_bytes(BSD);

    let mut group = c.benchmark_group("scheduler");
    for workers in [1usize, 4] {
        let config = SchedulerConfig::new()
            .with_workers(workers)
            .with_mode(ScheduleMode::FanOut);
        let scheduler = DetectionScheduler::new(corpus.clone(), config).expect("scheduler");
        group.bench_function(BenchmarkId::new("fan_out", workers), |b| {
            b.iter(|| {
                runtime
                    .block_on(scheduler.detect(incoming.clone()))
                    .expect("detect")
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_engine, bench_pipeline, bench_scheduler);
criterion_main!(benches);
