// Copyright 2025 the Tracery Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The handle table proper.

use alloc::vec;
use alloc::vec::Vec;

use crate::{Handle, ObjectKind};

/// Payload stored in a [`HandleTable`] slot.
///
/// Implementors report their [`ObjectKind`] and, optionally, a liveness
/// predicate. An entry that is physically present but logically dead (for
/// example a path whose data has been invalidated while awaiting pool
/// compaction) should return `false` from [`TableEntry::is_live`] so that
/// [`HandleTable::validate`] treats its handle as bad.
pub trait TableEntry {
    /// The kind tag surfaced by [`HandleTable::validate`].
    fn kind(&self) -> ObjectKind;

    /// Liveness predicate; defaults to always live.
    fn is_live(&self) -> bool {
        true
    }
}

/// Call-count cadence for the two reclamation tiers.
///
/// Both counters advance on every allocate/remove call. The periods are
/// tuned defaults, not load-bearing semantics; embedders with different
/// allocation patterns should re-profile before changing them.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ReclaimCadence {
    /// Calls between free-list re-sorts (the light tier). `0` disables.
    pub sort_period: u32,
    /// Calls between full reclamation passes (the heavy tier, driven by the
    /// embedder). `0` disables.
    pub full_period: u32,
}

impl ReclaimCadence {
    /// Default cadence: sort every 64 calls, full pass every 1024.
    pub const DEFAULT: Self = Self {
        sort_period: 64,
        full_period: 1024,
    };
}

impl Default for ReclaimCadence {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Growable table mapping [`Handle`]s to slot payloads.
///
/// Slot 0 is permanently vacant so that [`Handle::INVALID`] can never name a
/// live object. Removed slot indices go on a free list that is re-sorted on
/// the light-tier cadence so that subsequent allocations reuse the lowest
/// available index first, keeping live entries packed toward the front of
/// the table.
#[derive(Debug)]
pub struct HandleTable<T> {
    created: Vec<Option<T>>,
    /// Reclaimed indices, kept sorted (largest first) on the light-tier
    /// cadence so `pop` yields the smallest index.
    available: Vec<u32>,
    cadence: ReclaimCadence,
    sort_countdown: u32,
    full_countdown: u32,
    full_due: bool,
}

impl<T> Default for HandleTable<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> HandleTable<T> {
    /// Creates an empty table with the default [`ReclaimCadence`].
    #[must_use]
    pub fn new() -> Self {
        Self::with_cadence(ReclaimCadence::DEFAULT)
    }

    /// Creates an empty table with an explicit cadence.
    #[must_use]
    pub fn with_cadence(cadence: ReclaimCadence) -> Self {
        Self {
            created: vec![None],
            available: Vec::new(),
            cadence,
            sort_countdown: cadence.sort_period,
            full_countdown: cadence.full_period,
            full_due: false,
        }
    }

    /// Number of slots, including vacant ones and the reserved slot 0.
    #[must_use]
    pub fn slot_count(&self) -> usize {
        self.created.len()
    }

    /// Number of live entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.created.iter().filter(|s| s.is_some()).count()
    }

    /// Returns `true` if the table holds no live entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Registers `obj` and returns its handle.
    ///
    /// Reuses the lowest available reclaimed index if one exists, otherwise
    /// grows the table by one slot.
    pub fn allocate(&mut self, obj: T) -> Handle {
        let handle = if let Some(index) = self.available.pop() {
            debug_assert!(self.created[index as usize].is_none());
            self.created[index as usize] = Some(obj);
            Handle(index)
        } else {
            let index = u32::try_from(self.created.len())
                .expect("HandleTable: too many slots for a u32 handle");
            self.created.push(Some(obj));
            Handle(index)
        };
        self.note_call();
        handle
    }

    /// Removes the entry for `handle` and returns its payload.
    ///
    /// The slot index goes on the free list for reuse. Returns `None` for
    /// the invalid handle, out-of-range handles, and already-vacant slots.
    pub fn remove(&mut self, handle: Handle) -> Option<T> {
        if !handle.is_valid() {
            return None;
        }
        let obj = self.created.get_mut(handle.index())?.take()?;
        self.available.push(handle.0);
        self.note_call();
        Some(obj)
    }

    /// Returns the payload for `handle`, if the slot is occupied.
    #[must_use]
    pub fn get(&self, handle: Handle) -> Option<&T> {
        if !handle.is_valid() {
            return None;
        }
        self.created.get(handle.index())?.as_ref()
    }

    /// Mutable variant of [`HandleTable::get`].
    #[must_use]
    pub fn get_mut(&mut self, handle: Handle) -> Option<&mut T> {
        if !handle.is_valid() {
            return None;
        }
        self.created.get_mut(handle.index())?.as_mut()
    }

    /// Iterates over live `(handle, payload)` pairs in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (Handle, &T)> {
        self.created.iter().enumerate().filter_map(|(i, slot)| {
            let obj = slot.as_ref()?;
            let index = u32::try_from(i).expect("HandleTable: too many slots for a u32 handle");
            Some((Handle(index), obj))
        })
    }

    /// Re-sorts the free list so the next reuse takes the lowest index, and
    /// restarts the light-tier countdown.
    ///
    /// Called internally on cadence; also called by the embedder's full
    /// reclamation pass, which subsumes the light tier.
    pub fn resort_available(&mut self) {
        // Largest first, so that `pop` on the allocation path is O(1) and
        // still returns the smallest available index.
        self.available.sort_unstable_by(|a, b| b.cmp(a));
        self.sort_countdown = self.cadence.sort_period;
    }

    /// Drops vacant slots from the tail of the table and prunes the free
    /// list accordingly. Slot 0 is always kept.
    pub fn trim_tail(&mut self) {
        while self.created.len() > 1 && self.created.last().is_some_and(Option::is_none) {
            self.created.pop();
        }
        let len = self.created.len();
        self.available.retain(|&i| (i as usize) < len);
        self.created.shrink_to_fit();
        self.available.shrink_to_fit();
    }

    /// Returns `true` once per elapsed full-tier period, clearing the flag.
    ///
    /// The embedder checks this after each create/destroy call and runs its
    /// full reclamation pass when it fires.
    pub fn take_full_pass_due(&mut self) -> bool {
        core::mem::take(&mut self.full_due)
    }

    fn note_call(&mut self) {
        if self.cadence.sort_period != 0 {
            self.sort_countdown -= 1;
            if self.sort_countdown == 0 {
                self.resort_available();
            }
        }
        if self.cadence.full_period != 0 {
            self.full_countdown -= 1;
            if self.full_countdown == 0 {
                self.full_countdown = self.cadence.full_period;
                self.full_due = true;
            }
        }
    }
}

impl<T: TableEntry> HandleTable<T> {
    /// Validates `handle` and returns the entry's kind tag.
    ///
    /// Returns `None` (a "bad handle") for [`Handle::INVALID`], out-of-range
    /// indices, vacant slots, and entries whose liveness predicate fails.
    #[must_use]
    pub fn validate(&self, handle: Handle) -> Option<ObjectKind> {
        let entry = self.get(handle)?;
        entry.is_live().then(|| entry.kind())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Entry {
        kind: ObjectKind,
        live: bool,
    }

    impl Entry {
        fn path() -> Self {
            Self {
                kind: ObjectKind::Path,
                live: true,
            }
        }
    }

    impl TableEntry for Entry {
        fn kind(&self) -> ObjectKind {
            self.kind
        }

        fn is_live(&self) -> bool {
            self.live
        }
    }

    #[test]
    fn slot_zero_is_reserved() {
        let mut table = HandleTable::new();
        let h = table.allocate(Entry::path());
        assert_eq!(h, Handle(1));
        assert!(table.get(Handle::INVALID).is_none());
        assert!(table.validate(Handle::INVALID).is_none());
    }

    #[test]
    fn validate_rejects_out_of_range_and_vacant() {
        let mut table = HandleTable::new();
        let h = table.allocate(Entry::path());
        assert_eq!(table.validate(h), Some(ObjectKind::Path));
        assert!(table.validate(Handle(999)).is_none());

        table.remove(h).unwrap();
        assert!(table.validate(h).is_none());
    }

    #[test]
    fn validate_applies_liveness_predicate() {
        let mut table = HandleTable::new();
        let h = table.allocate(Entry::path());
        table.get_mut(h).unwrap().live = false;
        assert!(table.validate(h).is_none());
        // The slot is still occupied; only validation treats it as bad.
        assert!(table.get(h).is_some());
    }

    #[test]
    fn reuse_prefers_lowest_index_after_resort() {
        let mut table = HandleTable::new();
        let handles: alloc::vec::Vec<_> = (0..5).map(|_| table.allocate(Entry::path())).collect();

        table.remove(handles[3]).unwrap();
        table.remove(handles[0]).unwrap();
        table.remove(handles[2]).unwrap();
        table.resort_available();

        assert_eq!(table.allocate(Entry::path()), handles[0]);
        assert_eq!(table.allocate(Entry::path()), handles[2]);
        assert_eq!(table.allocate(Entry::path()), handles[3]);
    }

    #[test]
    fn sort_cadence_fires_on_call_count() {
        let cadence = ReclaimCadence {
            sort_period: 4,
            full_period: 0,
        };
        let mut table = HandleTable::with_cadence(cadence);
        let a = table.allocate(Entry::path()); // call 1
        let b = table.allocate(Entry::path()); // call 2
        table.remove(a).unwrap(); // call 3
        table.remove(b).unwrap(); // call 4 -> resort

        // Free list was [a, b] in removal order; the resort puts the lowest
        // index on top for reuse.
        assert_eq!(table.allocate(Entry::path()), a);
    }

    #[test]
    fn full_pass_flag_fires_once_per_period() {
        let cadence = ReclaimCadence {
            sort_period: 0,
            full_period: 3,
        };
        let mut table = HandleTable::with_cadence(cadence);
        table.allocate(Entry::path());
        table.allocate(Entry::path());
        assert!(!table.take_full_pass_due());
        table.allocate(Entry::path());
        assert!(table.take_full_pass_due());
        assert!(!table.take_full_pass_due());
    }

    #[test]
    fn trim_tail_drops_vacant_suffix() {
        let mut table = HandleTable::new();
        let handles: alloc::vec::Vec<_> = (0..4).map(|_| table.allocate(Entry::path())).collect();
        table.remove(handles[2]).unwrap();
        table.remove(handles[3]).unwrap();

        table.trim_tail();
        assert_eq!(table.slot_count(), 3); // reserved slot + two live
        assert_eq!(table.len(), 2);

        // Freed tail indices must not be reused after the trim.
        let h = table.allocate(Entry::path());
        assert_eq!(h, Handle(3));
    }
}
