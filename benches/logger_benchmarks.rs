//! Criterion benchmarks for kernel_logging

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use kernel_logging::core::router::Router;
use kernel_logging::prelude::*;
use kernel_logging::sinks::RingBufferSink;
use std::sync::Arc;

fn ring_service(threshold: LogLevel) -> LoggingService {
    let ring = Arc::new(RingBufferSink::new(1024).unwrap());
    LoggingService::builder()
        .root_threshold(threshold)
        .root_ring_buffer("recent", ring)
        .build()
}

// ============================================================================
// Emit Benchmarks
// ============================================================================

fn bench_emit(c: &mut Criterion) {
    let mut group = c.benchmark_group("emit");
    group.throughput(Throughput::Elements(1));

    let service = ring_service(LogLevel::Warn);
    let logger = service.get_logger(names::TXMANAGER).unwrap();

    group.bench_function("filtered", |b| {
        b.iter(|| black_box(logger.debug(black_box("begin tx"))));
    });

    group.bench_function("filtered_macro", |b| {
        b.iter(|| black_box(kernel_logging::debug!(logger, "begin tx {}", black_box(42))));
    });

    group.bench_function("ring_buffer", |b| {
        b.iter(|| black_box(logger.warn(black_box("slow commit"))));
    });

    group.bench_function("ring_buffer_with_fields", |b| {
        b.iter(|| {
            let context = LogContext::new()
                .with_field("tx_id", 42i64)
                .with_field("duration_ms", 1500i64);
            black_box(logger.log_with_context(LogLevel::Warn, "slow commit", context))
        });
    });

    group.finish();
}

// ============================================================================
// Routing Benchmarks
// ============================================================================

fn bench_resolve(c: &mut Criterion) {
    let mut group = c.benchmark_group("resolve");

    for rules in [0usize, 10, 100] {
        let registry = Arc::new(CategoryRegistry::new());
        let router = Router::with_root_rule(
            Arc::clone(&registry),
            RoutingRule::new(LogLevel::Warn, Vec::new()),
        );
        for i in 0..rules {
            let prefix = format!("neo4j.index.provider{}", i);
            registry.get_or_register(&prefix).unwrap();
            router
                .configure(&prefix, RoutingRule::new(LogLevel::Debug, Vec::new()))
                .unwrap();
        }
        let category = registry
            .get_or_register("neo4j.index.provider0.lucene.writer")
            .unwrap();

        group.bench_with_input(BenchmarkId::new("rules", rules), &category, |b, category| {
            b.iter(|| black_box(router.resolve(black_box(category))));
        });
    }

    group.finish();
}

fn bench_get_logger(c: &mut Criterion) {
    let service = ring_service(LogLevel::Warn);
    service.get_logger(names::CYPHER).unwrap();

    c.bench_function("get_logger_cached", |b| {
        b.iter(|| black_box(service.get_logger(black_box(names::CYPHER)).unwrap()));
    });
}

criterion_group!(benches, bench_emit, bench_resolve, bench_get_logger);
criterion_main!(benches);
