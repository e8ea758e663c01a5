use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};

use canary_alloc::GuardedBuffer;

fn guarded_buffer(c: &mut Criterion) {
    // All this tests both allocation and drop.
    c.bench_function("allocate 16 element buffer", |b| {
        b.iter(|| GuardedBuffer::<i32>::new(black_box(16)))
    });

    c.bench_function("allocate 64 KB buffer", |b| {
        b.iter(|| GuardedBuffer::<u8>::new(black_box(64 * 1024)))
    });

    c.bench_function("grow 16 element buffer 2x", |b| {
        b.iter_batched(
            || GuardedBuffer::<i32>::new(16).unwrap(),
            |buffer| buffer.resize(32),
            BatchSize::SmallInput,
        )
    });

    c.bench_function("grow 1 element buffer to 1024 by doubling", |b| {
        b.iter_batched(
            || GuardedBuffer::<i64>::new(1).unwrap(),
            |mut buffer| {
                for capacity in (1..=10).map(|shift| 1 << shift) {
                    buffer = buffer.resize(capacity).unwrap();
                }
                buffer
            },
            BatchSize::SmallInput,
        )
    });
}

criterion_group!(benches, guarded_buffer);
criterion_main!(benches);
