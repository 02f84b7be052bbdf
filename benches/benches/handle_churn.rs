// Copyright 2025 the Tracery Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Benchmarks for handle-table allocation churn and free-list re-sorting.

use criterion::{BatchSize, Criterion, black_box, criterion_group, criterion_main};
use tracery_handle::{Handle, HandleTable, ObjectKind, ReclaimCadence, TableEntry};

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

struct Node {
    #[expect(dead_code, reason = "payload stands in for a real object body")]
    payload: u64,
}

impl TableEntry for Node {
    fn kind(&self) -> ObjectKind {
        ObjectKind::Path
    }
}

fn churned_table(n: usize, churn: usize, seed: u64) -> (HandleTable<Node>, Vec<Handle>) {
    let mut rng = Lcg::new(seed);
    let mut table = HandleTable::with_cadence(ReclaimCadence::DEFAULT);
    let mut live: Vec<Handle> = (0..n)
        .map(|i| table.allocate(Node { payload: i as u64 }))
        .collect();
    for _ in 0..churn {
        let at = rng.gen_range_usize(live.len());
        let victim = live.swap_remove(at);
        table.remove(victim);
        live.push(table.allocate(Node {
            payload: u64::from(rng.next_u32()),
        }));
    }
    (table, live)
}

fn bench_allocate_remove_churn(c: &mut Criterion) {
    let mut group = c.benchmark_group("handle_churn");
    for n in [256_usize, 4096] {
        group.bench_function(format!("alloc_remove_n{n}"), |b| {
            b.iter_batched(
                || churned_table(n, 0, 0x5eed),
                |(mut table, mut live)| {
                    let mut rng = Lcg::new(0xfeed);
                    for _ in 0..n {
                        let at = rng.gen_range_usize(live.len());
                        let victim = live.swap_remove(at);
                        black_box(table.remove(victim));
                        live.push(table.allocate(Node { payload: 1 }));
                    }
                    black_box(table.len())
                },
                BatchSize::SmallInput,
            );
        });
    }
    group.finish();
}

fn bench_resort_and_trim(c: &mut Criterion) {
    let mut group = c.benchmark_group("handle_reclaim");
    group.bench_function("resort_trim_4096", |b| {
        b.iter_batched(
            || {
                let (mut table, live) = churned_table(4096, 8192, 0xabcd);
                // Free half so both the re-sort and the tail trim have work.
                for &h in live.iter().step_by(2) {
                    table.remove(h);
                }
                table
            },
            |mut table| {
                table.resort_available();
                table.trim_tail();
                black_box(table.slot_count())
            },
            BatchSize::SmallInput,
        );
    });
    group.finish();
}

criterion_group!(benches, bench_allocate_remove_churn, bench_resort_and_trim);
criterion_main!(benches);
