use criterion::{black_box, criterion_group, criterion_main, Criterion};
use tablewatch::parse_report;

/// Benchmark parsing a complete report (hot path)
fn bench_parse_complete(c: &mut Criterion) {
    let report = "3\n0\n1024\n2048\n512\n10000\n1.5\n2.5\n";

    c.bench_function("parse_report_complete", |b| {
        b.iter(|| parse_report(black_box(report)));
    });
}

/// Benchmark parsing a report made entirely of sentinels
fn bench_parse_sentinels(c: &mut Criterion) {
    let report = "NAN\nNAN\nNAN\nNAN\nNAN\nNAN\nNaN\nNaN\n";

    c.bench_function("parse_report_sentinels", |b| {
        b.iter(|| parse_report(black_box(report)));
    });
}

/// Benchmark rejecting a short report
fn bench_parse_short(c: &mut Criterion) {
    let report = "1\n2\n3\n4\n5";

    c.bench_function("parse_report_short", |b| {
        b.iter(|| parse_report(black_box(report)));
    });
}

criterion_group!(
    benches,
    bench_parse_complete,
    bench_parse_sentinels,
    bench_parse_short
);
criterion_main!(benches);
