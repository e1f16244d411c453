//! Filter Compiler Benchmarks
//!
//! Measures compiling client filter sets into store queries:
//! - Equality-only filter sets
//! - Filter sets with a numeric inequality
//! - Rejected filter sets (two inequality fields)
//!
//! Run with: `cargo bench --bench filter_compile`

#![allow(missing_docs)] // Benchmarks don't need extensive docs
#![allow(clippy::expect_used)] // Benchmarks can use expect for setup

use conference_central::filters::{FilterTriple, compile};
use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};

fn equality_filters(count: usize) -> Vec<FilterTriple> {
    (0..count)
        .map(|i| FilterTriple::new("TOPIC", "EQ", format!("topic-{i}")))
        .collect()
}

fn bench_compile_equalities(c: &mut Criterion) {
    let mut group = c.benchmark_group("compile_equalities");

    for count in [1, 4, 16] {
        let filters = equality_filters(count);
        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), &filters, |b, filters| {
            b.iter(|| compile(black_box(filters)).expect("equalities compile"));
        });
    }

    group.finish();
}

fn bench_compile_inequality(c: &mut Criterion) {
    let filters = vec![
        FilterTriple::new("CITY", "EQ", "London"),
        FilterTriple::new("MONTH", "GT", "6"),
        FilterTriple::new("MONTH", "LTEQ", "10"),
        FilterTriple::new("TOPIC", "EQ", "Rust"),
    ];

    c.bench_function("compile_inequality", |b| {
        b.iter(|| compile(black_box(&filters)).expect("inequality compiles"));
    });
}

fn bench_compile_rejected(c: &mut Criterion) {
    let filters = vec![
        FilterTriple::new("MONTH", "GT", "6"),
        FilterTriple::new("MAX_ATTENDEES", "LT", "100"),
    ];

    c.bench_function("compile_rejected", |b| {
        b.iter(|| compile(black_box(&filters)).is_err());
    });
}

criterion_group!(
    benches,
    bench_compile_equalities,
    bench_compile_inequality,
    bench_compile_rejected
);
criterion_main!(benches);
