// Copyright 2025 the Tracery Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tracery Pool: fixed-capacity block pools for short-lived graphics objects.
//!
//! Paths and paints in an immediate-mode vector API are created and thrown
//! away constantly. Allocating each one individually would dominate the
//! per-call cost, so this crate batches them into fixed-capacity blocks:
//!
//! - **Allocation** reuses a freed slot when one is available, then free
//!   capacity in the last block, and only then adds a brand-new block.
//! - **Release is deferred**: freeing an entry only records its slot on the
//!   free list. The entry stays in place (logically dead, reference count
//!   zero) until the next compaction, so release is O(1) and never moves
//!   memory.
//! - **Compaction** ([`Pool::compact`]) fills holes by moving live entries
//!   down from the tail, reporting each move through a callback so the
//!   embedder can patch its handle table, and frees whole blocks that become
//!   empty. Blocks are never shrunk below their fixed capacity; only entire
//!   empty blocks are returned to the allocator.
//!
//! This bounds fragmentation without a copying collector: between
//! compactions the pool may carry holes, but a pass is O(holes) moves and
//! leaves the pool packed.
//!
//! # Example
//!
//! ```rust
//! use tracery_pool::{Pool, PoolEntry, PoolRef};
//!
//! struct Segment {
//!     refs: u32,
//!     data: Vec<f32>,
//! }
//!
//! impl PoolEntry for Segment {
//!     fn ref_count(&self) -> u32 {
//!         self.refs
//!     }
//! }
//!
//! let mut pool: Pool<Segment> = Pool::new(4);
//! let a = pool.allocate(Segment { refs: 1, data: vec![0.0] }).unwrap();
//! let b = pool.allocate(Segment { refs: 1, data: vec![1.0] }).unwrap();
//!
//! pool.get_mut(a).unwrap().refs = 0;
//! pool.release(a);
//!
//! // `b` gets moved into the hole left by `a`; the callback reports where.
//! let mut moved = Vec::new();
//! pool.compact(|entry, to| moved.push((entry.data[0], to)));
//! assert_eq!(moved, vec![(1.0, a)]);
//! ```

#![no_std]

extern crate alloc;

use alloc::collections::TryReserveError;
use alloc::vec::Vec;
use core::fmt;

/// Location of an entry inside a [`Pool`]: block index plus slot index.
///
/// Pool refs order lexicographically by `(block, slot)`, which is also the
/// physical order compaction packs entries into.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PoolRef {
    /// Index of the pool block.
    pub block: u32,
    /// Index of the slot within the block.
    pub slot: u32,
}

impl PoolRef {
    /// Creates a pool ref from block and slot indices.
    #[inline]
    #[must_use]
    pub const fn new(block: u32, slot: u32) -> Self {
        Self { block, slot }
    }
}

/// Entry stored in a [`Pool`].
///
/// The reference count lives on the entry but is managed by the embedder;
/// the pool only reads it, to tell live entries from dead ones during
/// compaction. An entry with `ref_count() == 0` is logically dead and will
/// be dropped (not moved) when compaction reaches it.
pub trait PoolEntry {
    /// Current reference count. Zero means dead and reclaimable.
    fn ref_count(&self) -> u32;

    /// Trims internal scratch storage back toward its used size.
    ///
    /// Called for every live entry during the embedder's full reclamation
    /// pass. The default does nothing.
    fn memory_retrieve(&mut self) {}
}

/// Allocation failure: no memory for a new pool block.
///
/// The pool guarantees that a failed allocation has not mutated any
/// committed state; the caller can surface the error and continue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolOutOfMemory;

impl fmt::Display for PoolOutOfMemory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("out of memory allocating a pool block")
    }
}

impl core::error::Error for PoolOutOfMemory {}

impl From<TryReserveError> for PoolOutOfMemory {
    fn from(_: TryReserveError) -> Self {
        Self
    }
}

/// Pool of fixed-capacity blocks with deferred hole reclamation.
#[derive(Debug)]
pub struct Pool<T> {
    blocks: Vec<Vec<T>>,
    /// Slots released since the last compaction. Kept sorted (highest
    /// position first) lazily, so `pop` on the allocation path yields the
    /// lowest free position.
    available: Vec<PoolRef>,
    available_sorted: bool,
    block_capacity: usize,
}

impl<T: PoolEntry> Pool<T> {
    /// Creates an empty pool with the given per-block capacity.
    ///
    /// # Panics
    ///
    /// Panics if `block_capacity` is zero.
    #[must_use]
    pub fn new(block_capacity: usize) -> Self {
        assert!(block_capacity > 0, "pool blocks must hold at least one entry");
        Self {
            blocks: Vec::new(),
            available: Vec::new(),
            available_sorted: true,
            block_capacity,
        }
    }

    /// Per-block capacity this pool was created with.
    #[must_use]
    pub fn block_capacity(&self) -> usize {
        self.block_capacity
    }

    /// Number of allocated blocks, including partially filled ones.
    #[must_use]
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// Number of entries in `block`, counting dead ones awaiting compaction.
    #[must_use]
    pub fn block_len(&self, block: usize) -> Option<usize> {
        self.blocks.get(block).map(Vec::len)
    }

    /// Number of physically present entries, live and dead.
    #[must_use]
    pub fn entry_count(&self) -> usize {
        self.blocks.iter().map(Vec::len).sum()
    }

    /// Number of live entries (present minus released).
    #[must_use]
    pub fn len(&self) -> usize {
        self.entry_count() - self.available.len()
    }

    /// Returns `true` if the pool holds no live entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Allocates a slot for `entry` and returns its location.
    ///
    /// Reuses the lowest released slot if any are pending, then free
    /// capacity in the last block, then a brand-new block. On out-of-memory
    /// the pool is unchanged.
    pub fn allocate(&mut self, entry: T) -> Result<PoolRef, PoolOutOfMemory> {
        if !self.available.is_empty() {
            self.sort_available();
            let slot = self.available.pop().expect("free list checked non-empty");
            self.blocks[slot.block as usize][slot.slot as usize] = entry;
            return Ok(slot);
        }

        let block_count = self.blocks.len();
        if let Some(last) = self.blocks.last_mut()
            && last.len() < self.block_capacity
        {
            let slot = PoolRef::new(
                u32::try_from(block_count - 1).expect("block index fits u32"),
                u32::try_from(last.len()).expect("slot index fits u32"),
            );
            last.push(entry);
            return Ok(slot);
        }

        let mut block = Vec::new();
        block.try_reserve_exact(self.block_capacity)?;
        self.blocks.try_reserve(1)?;
        block.push(entry);
        self.blocks.push(block);
        Ok(PoolRef::new(
            u32::try_from(self.blocks.len() - 1).expect("block index fits u32"),
            0,
        ))
    }

    /// Records `slot` as released.
    ///
    /// The entry stays in place until the next compaction; callers must have
    /// already driven its reference count to zero. Releasing does not touch
    /// the entry itself.
    pub fn release(&mut self, slot: PoolRef) {
        debug_assert!(
            self.get(slot).is_some_and(|e| e.ref_count() == 0),
            "released entries must have a zero reference count"
        );
        debug_assert!(
            !self.available.contains(&slot),
            "double release of pool slot"
        );
        self.available.push(slot);
        self.available_sorted = false;
    }

    /// Returns the entry at `slot`, if the location exists.
    ///
    /// Dead entries awaiting compaction are still returned; the embedder's
    /// handle table is what decides external visibility.
    #[must_use]
    pub fn get(&self, slot: PoolRef) -> Option<&T> {
        self.blocks.get(slot.block as usize)?.get(slot.slot as usize)
    }

    /// Mutable variant of [`Pool::get`].
    #[must_use]
    pub fn get_mut(&mut self, slot: PoolRef) -> Option<&mut T> {
        self.blocks
            .get_mut(slot.block as usize)?
            .get_mut(slot.slot as usize)
    }

    /// Iterates over live entries in physical order.
    pub fn iter_live(&self) -> impl Iterator<Item = (PoolRef, &T)> {
        self.blocks.iter().enumerate().flat_map(|(b, block)| {
            block
                .iter()
                .enumerate()
                .filter(|(_, e)| e.ref_count() > 0)
                .map(move |(s, e)| {
                    (
                        PoolRef::new(
                            u32::try_from(b).expect("block index fits u32"),
                            u32::try_from(s).expect("slot index fits u32"),
                        ),
                        e,
                    )
                })
        })
    }

    /// Runs [`PoolEntry::memory_retrieve`] over every live entry.
    pub fn retrieve_entries(&mut self) {
        for block in &mut self.blocks {
            for entry in block.iter_mut().filter(|e| e.ref_count() > 0) {
                entry.memory_retrieve();
            }
        }
    }

    /// Sorts the free list so the next reuse takes the lowest position.
    ///
    /// Allocation calls this lazily; the embedder's full reclamation pass
    /// may also call it directly.
    pub fn sort_available(&mut self) {
        if !self.available_sorted {
            // Highest first, so `pop` yields the lowest position.
            self.available.sort_unstable_by(|a, b| b.cmp(a));
            self.available_sorted = true;
        }
    }

    /// Fills holes left by released entries and frees empty blocks.
    ///
    /// Works from the physical tail: a dead tail entry is destroyed in
    /// place, while a live tail entry moves into the lowest remaining hole.
    /// Each move invokes `on_move` with the entry (already at its new
    /// location) and the new location, so the embedder can repoint its
    /// handle table. Trailing blocks left empty are freed outright; blocks
    /// are never shrunk below their fixed capacity.
    ///
    /// Running `compact` twice with no intervening allocation or release
    /// performs no moves on the second call.
    pub fn compact(&mut self, mut on_move: impl FnMut(&T, PoolRef)) {
        let mut holes = core::mem::take(&mut self.available);
        holes.sort_unstable();
        // Every iteration consumes one hole and pops one physical entry, so
        // the pool cannot run out of blocks while holes remain.
        let mut lowest = 0;
        let mut highest = holes.len();
        while lowest < highest {
            let tail_block = self.blocks.len() - 1;
            let tail = PoolRef::new(
                u32::try_from(tail_block).expect("block index fits u32"),
                u32::try_from(self.blocks[tail_block].len() - 1).expect("slot index fits u32"),
            );
            if holes[highest - 1] == tail {
                // Dead tail: destroy in place, no move needed.
                highest -= 1;
                self.blocks[tail_block].pop();
            } else {
                let hole = holes[lowest];
                lowest += 1;
                debug_assert!(hole < tail, "holes beyond the tail are impossible");
                let entry = self.blocks[tail_block].pop().expect("tail entry exists");
                debug_assert!(entry.ref_count() > 0, "moved a dead entry during compaction");
                self.blocks[hole.block as usize][hole.slot as usize] = entry;
                on_move(&self.blocks[hole.block as usize][hole.slot as usize], hole);
            }
            while self.blocks.last().is_some_and(Vec::is_empty) {
                self.blocks.pop();
            }
        }
        self.available_sorted = true;
        self.blocks.shrink_to_fit();
        self.available.shrink_to_fit();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;
    use alloc::vec::Vec;

    struct Entry {
        refs: u32,
        id: u32,
    }

    fn live(id: u32) -> Entry {
        Entry { refs: 1, id }
    }

    impl PoolEntry for Entry {
        fn ref_count(&self) -> u32 {
            self.refs
        }
    }

    fn kill(pool: &mut Pool<Entry>, slot: PoolRef) {
        pool.get_mut(slot).unwrap().refs = 0;
        pool.release(slot);
    }

    #[test]
    fn seventy_entries_at_capacity_64_spread_over_two_blocks() {
        let mut pool: Pool<Entry> = Pool::new(64);
        for i in 0..70 {
            pool.allocate(live(i)).unwrap();
        }
        assert_eq!(pool.block_count(), 2);
        assert_eq!(pool.block_len(0), Some(64));
        assert_eq!(pool.block_len(1), Some(6));
    }

    #[test]
    fn allocate_reuses_lowest_released_slot() {
        let mut pool: Pool<Entry> = Pool::new(8);
        let slots: Vec<_> = (0..5).map(|i| pool.allocate(live(i)).unwrap()).collect();
        kill(&mut pool, slots[3]);
        kill(&mut pool, slots[1]);

        let reused = pool.allocate(live(100)).unwrap();
        assert_eq!(reused, slots[1]);
        assert_eq!(pool.get(reused).unwrap().id, 100);
    }

    #[test]
    fn tail_hole_is_dropped_without_a_move() {
        let mut pool: Pool<Entry> = Pool::new(4);
        let slots: Vec<_> = (0..3).map(|i| pool.allocate(live(i)).unwrap()).collect();
        kill(&mut pool, slots[2]);

        let mut moves = 0;
        pool.compact(|_, _| moves += 1);
        assert_eq!(moves, 0);
        assert_eq!(pool.entry_count(), 2);
    }

    #[test]
    fn hole_is_filled_from_the_tail_and_reported() {
        let mut pool: Pool<Entry> = Pool::new(4);
        let slots: Vec<_> = (0..4).map(|i| pool.allocate(live(i)).unwrap()).collect();
        kill(&mut pool, slots[0]);

        let mut moved = Vec::new();
        pool.compact(|e, to| moved.push((e.id, to)));
        assert_eq!(moved, vec![(3, slots[0])]);
        assert_eq!(pool.get(slots[0]).unwrap().id, 3);
        assert_eq!(pool.entry_count(), 3);
    }

    #[test]
    fn fully_empty_blocks_are_freed() {
        let mut pool: Pool<Entry> = Pool::new(2);
        let slots: Vec<_> = (0..6).map(|i| pool.allocate(live(i)).unwrap()).collect();
        assert_eq!(pool.block_count(), 3);

        // Kill everything in the last two blocks.
        for &s in &slots[2..] {
            kill(&mut pool, s);
        }
        pool.compact(|_, _| {});
        assert_eq!(pool.block_count(), 1);
        assert_eq!(pool.len(), 2);
    }

    #[test]
    fn survivor_of_a_dead_block_compacts_downward() {
        let mut pool: Pool<Entry> = Pool::new(4);
        let slots: Vec<_> = (0..8).map(|i| pool.allocate(live(i)).unwrap()).collect();
        assert_eq!(pool.block_count(), 2);

        // Kill all of block 0 and all but the last entry of block 1.
        for &s in &slots[..7] {
            kill(&mut pool, s);
        }

        let mut moved = Vec::new();
        pool.compact(|e, to| moved.push((e.id, to)));
        assert_eq!(moved, vec![(7, PoolRef::new(0, 0))]);
        assert_eq!(pool.block_count(), 1);
        assert_eq!(pool.len(), 1);
        assert_eq!(pool.get(PoolRef::new(0, 0)).unwrap().id, 7);
    }

    #[test]
    fn compaction_is_idempotent() {
        let mut pool: Pool<Entry> = Pool::new(4);
        let slots: Vec<_> = (0..7).map(|i| pool.allocate(live(i)).unwrap()).collect();
        kill(&mut pool, slots[1]);
        kill(&mut pool, slots[5]);

        pool.compact(|_, _| {});
        let layout: Vec<_> = (0..pool.block_count())
            .map(|b| pool.block_len(b).unwrap())
            .collect();

        let mut moves = 0;
        pool.compact(|_, _| moves += 1);
        assert_eq!(moves, 0, "second pass must not move anything");
        let layout2: Vec<_> = (0..pool.block_count())
            .map(|b| pool.block_len(b).unwrap())
            .collect();
        assert_eq!(layout, layout2);
    }

    #[test]
    fn live_entries_survive_compaction_unchanged() {
        let mut pool: Pool<Entry> = Pool::new(4);
        let slots: Vec<_> = (0..8).map(|i| pool.allocate(live(i)).unwrap()).collect();
        kill(&mut pool, slots[0]);
        kill(&mut pool, slots[2]);
        kill(&mut pool, slots[5]);

        pool.compact(|_, _| {});
        let survivors: Vec<_> = pool.iter_live().map(|(_, e)| e.id).collect();
        let mut expect = vec![1, 3, 4, 6, 7];
        let mut got = survivors.clone();
        got.sort_unstable();
        expect.sort_unstable();
        assert_eq!(got, expect);
    }
}
