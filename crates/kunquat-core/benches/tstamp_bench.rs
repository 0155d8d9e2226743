//! Benchmarks for the hot conversions on the pattern-player's scheduling
//! path: `Tstamp` <-> frame-count conversion and addition.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use kunquat_core::Tstamp;

fn bench_to_frames(c: &mut Criterion) {
    let t = Tstamp::new(4, Tstamp::BEAT / 3);
    c.bench_function("tstamp_to_frames", |b| {
        b.iter(|| black_box(t).to_frames(black_box(120.0), black_box(48000.0)));
    });
}

fn bench_from_frames(c: &mut Criterion) {
    c.bench_function("tstamp_from_frames", |b| {
        b.iter(|| Tstamp::from_frames(black_box(2048), black_box(120.0), black_box(48000.0)));
    });
}

fn bench_add(c: &mut Criterion) {
    let a = Tstamp::new(1, Tstamp::BEAT / 3);
    let b = Tstamp::new(2, Tstamp::BEAT / 7);
    c.bench_function("tstamp_add", |bencher| {
        bencher.iter(|| black_box(a) + black_box(b));
    });
}

criterion_group!(benches, bench_to_frames, bench_from_frames, bench_add);
criterion_main!(benches);
