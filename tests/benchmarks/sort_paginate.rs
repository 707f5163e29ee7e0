// Benchmark for the local sort and pagination used by client-ordered views.
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use querylens::controller::view::{paginate, sort_rows};
use querylens::protocol::list::OrderOptions;
use querylens::protocol::records::StatementRecord;

fn statements(count: i64) -> Vec<StatementRecord> {
    (0..count)
        .map(|i| StatementRecord {
            digest: Some(format!("{i:016x}")),
            digest_text: Some(format!("select * from t{} where id = ?", i % 97)),
            sum_latency: (i % 13 != 0).then_some((i * 7919) % 1_000_003),
            exec_count: Some(i % 1000),
            ..Default::default()
        })
        .collect()
}

fn sort_paginate_benchmarks(c: &mut Criterion) {
    let rows = statements(5_000);
    let by_latency = OrderOptions::descending("sum_latency");
    let by_text = OrderOptions::ascending("digest_text");

    c.bench_function("sort_numeric_5k", |b| {
        b.iter(|| sort_rows(black_box(&rows), black_box(&by_latency)));
    });

    c.bench_function("sort_text_5k", |b| {
        b.iter(|| sort_rows(black_box(&rows), black_box(&by_text)));
    });

    c.bench_function("paginate_last_page_5k", |b| {
        let sorted = sort_rows(&rows, &by_latency);
        b.iter(|| paginate(black_box(&sorted), black_box(249), 20));
    });
}

criterion_group!(benches, sort_paginate_benchmarks);
criterion_main!(benches);
