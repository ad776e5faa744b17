#[allow(unused_imports)]
use criterion::{black_box, criterion_group, criterion_main, Criterion};

use tdctools::hist::Histogram;

mod common;

fn fixed_fill(c: &mut Criterion) {
    let samples = common::synthetic_samples(100_000);

    c.bench_function("fixed_fill", |b| {
        b.iter(|| {
            let mut h = Histogram::fixed(100, -500.0, 500.0);
            for &v in black_box(&samples) {
                h.add(v);
            }
            h.sample_count()
        })
    });
}

fn deferred_finalize(c: &mut Criterion) {
    let samples = common::synthetic_samples(100_000);

    c.bench_function("deferred_finalize", |b| {
        b.iter(|| {
            let mut h = Histogram::deferred(100);
            for &v in black_box(&samples) {
                h.add(v);
            }
            h.finalize();
            h.sigma()
        })
    });
}

criterion_group!(benches, fixed_fill, deferred_finalize);
criterion_main!(benches);
