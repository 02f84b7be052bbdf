// Copyright 2025 the Tracery Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Benchmarks for pool compaction and the context-level full reclamation
//! pass.

use criterion::{BatchSize, Criterion, black_box, criterion_group, criterion_main};
use kurbo::{PathEl, Point};
use tracery_context::{Context, Handle, ReclaimCadence};
use tracery_pool::{Pool, PoolEntry, PoolRef};

struct Lcg(u64);

impl Lcg {
    fn new(seed: u64) -> Self {
        Self(seed)
    }

    fn next_u32(&mut self) -> u32 {
        // Numerical Recipes LCG parameters.
        self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1);
        (self.0 >> 32) as u32
    }

    fn gen_range_usize(&mut self, upper_exclusive: usize) -> usize {
        if upper_exclusive == 0 {
            return 0;
        }
        (self.next_u32() as usize) % upper_exclusive
    }
}

struct Entry {
    ref_count: u32,
    payload: u64,
}

impl PoolEntry for Entry {
    fn ref_count(&self) -> u32 {
        self.ref_count
    }
}

/// A pool of `n` entries with roughly `dead_per_mille`/1000 of them
/// released, scattered by the seeded generator.
fn holey_pool(n: usize, dead_per_mille: usize, seed: u64) -> Pool<Entry> {
    let mut rng = Lcg::new(seed);
    let mut pool = Pool::new(64);
    let mut refs: Vec<PoolRef> = (0..n)
        .map(|i| {
            pool.allocate(Entry {
                ref_count: 1,
                payload: i as u64,
            })
            .expect("bench allocation")
        })
        .collect();
    let dead = n * dead_per_mille / 1000;
    for _ in 0..dead {
        let at = rng.gen_range_usize(refs.len());
        let victim = refs.swap_remove(at);
        pool.get_mut(victim).expect("live entry").ref_count = 0;
        pool.release(victim);
    }
    pool
}

fn bench_compact(c: &mut Criterion) {
    let mut group = c.benchmark_group("pool_compact");
    for dead_per_mille in [100_usize, 500, 900] {
        group.bench_function(format!("n8192_dead{dead_per_mille}"), |b| {
            b.iter_batched(
                || holey_pool(8192, dead_per_mille, 0x5eed),
                |mut pool| {
                    let mut moves = 0_usize;
                    pool.compact(|entry, _| {
                        moves += black_box(entry.payload as usize & 1);
                    });
                    black_box((pool.entry_count(), moves))
                },
                BatchSize::SmallInput,
            );
        });
    }
    group.finish();
}

fn bench_context_full_reclaim(c: &mut Criterion) {
    let mut group = c.benchmark_group("context_full_reclaim");
    group.bench_function("paths_n2048_half_dead", |b| {
        b.iter_batched(
            || {
                let mut ctx = Context::with_tuning(
                    ReclaimCadence {
                        sort_period: 0,
                        full_period: 0,
                    },
                    64,
                );
                let mut rng = Lcg::new(0xabcd);
                let paths: Vec<Handle> = (0..2048)
                    .map(|_| {
                        let p = ctx.create_path();
                        ctx.path_append(
                            p,
                            &[
                                PathEl::MoveTo(Point::ZERO),
                                PathEl::LineTo(Point::new(1.0, 1.0)),
                            ],
                        )
                        .expect("bench path");
                        p
                    })
                    .collect();
                let mut live = paths;
                for _ in 0..1024 {
                    let at = rng.gen_range_usize(live.len());
                    let victim = live.swap_remove(at);
                    ctx.destroy(victim).expect("bench destroy");
                }
                ctx
            },
            |mut ctx| {
                ctx.full_reclaim();
                black_box(ctx.group_stats())
            },
            BatchSize::SmallInput,
        );
    });
    group.finish();
}

criterion_group!(benches, bench_compact, bench_context_full_reclaim);
criterion_main!(benches);
