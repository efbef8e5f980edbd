//! Compares making objects from each pool against allocating them directly.
#![allow(
    missing_docs,
    reason = "No need for API documentation in benchmark code"
)]

use std::collections::VecDeque;
use std::hint::black_box;
use std::sync::Arc;
use std::time::Instant;

use criterion::{Criterion, criterion_group, criterion_main};
use new_zealand::nz;
use recycle_pool::{Buffer, CircularPool, LinkedPool, ListPool};

criterion_group!(benches, entrypoint);
criterion_main!(benches);

type TestItem = Buffer<u8>;
const TEST_LEN: usize = 1500;
const HELD_WINDOW: usize = 8;

fn entrypoint(c: &mut Criterion) {
    let mut group = c.benchmark_group("rp_make");

    group.bench_function("arc_new", |b| {
        b.iter_custom(|iters| {
            let start = Instant::now();

            for _ in 0..iters {
                drop(black_box(Arc::new(TestItem::new(black_box(TEST_LEN)))));
            }

            start.elapsed()
        });
    });

    group.bench_function("circular_discard", |b| {
        b.iter_custom(|iters| {
            let mut pool = CircularPool::<TestItem>::builder()
                .capacity(nz!(64))
                .build();

            let start = Instant::now();

            for _ in 0..iters {
                drop(black_box(pool.make(black_box(TEST_LEN))));
            }

            start.elapsed()
        });
    });

    group.bench_function("linked_discard", |b| {
        b.iter_custom(|iters| {
            let mut pool = LinkedPool::<TestItem>::builder().capacity(nz!(64)).build();

            let start = Instant::now();

            for _ in 0..iters {
                drop(black_box(pool.make(black_box(TEST_LEN))));
            }

            start.elapsed()
        });
    });

    group.bench_function("list_discard", |b| {
        b.iter_custom(|iters| {
            let mut pool = ListPool::<TestItem>::builder().capacity(nz!(64)).build();

            let start = Instant::now();

            for _ in 0..iters {
                drop(black_box(pool.make(black_box(TEST_LEN))));
            }

            start.elapsed()
        });
    });

    // Callers keep a window of recent objects alive, forcing the pools to evict or grow.
    group.bench_function("circular_hold_8", |b| {
        b.iter_custom(|iters| {
            let mut pool = CircularPool::<TestItem>::builder()
                .capacity(nz!(64))
                .build();
            let mut held = VecDeque::with_capacity(HELD_WINDOW.saturating_add(1));

            let start = Instant::now();

            for _ in 0..iters {
                held.push_back(pool.make(black_box(TEST_LEN)));

                if held.len() > HELD_WINDOW {
                    drop(held.pop_front());
                }
            }

            start.elapsed()
        });
    });

    group.bench_function("list_hold_8_release_per_batch", |b| {
        b.iter_custom(|iters| {
            let mut pool = ListPool::<TestItem>::builder().capacity(nz!(64)).build();
            let mut held = Vec::with_capacity(HELD_WINDOW);

            let start = Instant::now();

            for _ in 0..iters {
                held.push(pool.make(black_box(TEST_LEN)));

                if held.len() == HELD_WINDOW {
                    held.clear();
                    pool.release();
                }
            }

            start.elapsed()
        });
    });

    group.finish();
}
