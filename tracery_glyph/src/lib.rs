// Copyright 2025 the Tracery Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tracery Glyph: the per-font glyph store.
//!
//! A font maps caller-assigned glyph indices to drawable targets (a path or
//! an image handle) plus layout metadata (origin and escapement vectors).
//! The store mirrors the handle-table/pool pattern at a smaller scale:
//!
//! - **Descriptors** ([`GlyphDesc`]): a `created` array kept sorted by glyph
//!   index so lookup is a binary search, plus an `available` free list of
//!   descriptors whose pool slots can be reused.
//! - **Glyph pools**: fixed-capacity blocks holding the glyph records
//!   themselves, so per-glyph definition never allocates individually once
//!   a block exists.
//!
//! Insertion into the sorted array happens at the binary-search insertion
//! point; removal is a linear shift. Both are acceptable at per-font glyph
//! counts (see the store-level docs on scaling).
//!
//! Reference counting of glyph targets is the embedding context's business:
//! [`GlyphStore::set_target`] and [`GlyphStore::clear`] return the previous
//! target so the context can release it, and the context acquires the new
//! target before installing it.

#![no_std]

extern crate alloc;

use alloc::vec::Vec;
use core::fmt;

use kurbo::{Point, Vec2};
use tracery_handle::Handle;

/// Default per-block capacity of the glyph pools.
pub const DEFAULT_GLYPH_POOL_CAPACITY: usize = 32;

/// What a glyph draws: a path or an image, by handle.
///
/// The two are mutually exclusive by construction (an enum rather than the
/// flag-plus-union layout this design replaces).
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum GlyphTarget {
    /// A path handle in the shared handle table.
    Path(Handle),
    /// An image handle in the shared handle table.
    Image(Handle),
}

impl GlyphTarget {
    /// The underlying handle, whichever kind it is.
    #[inline]
    #[must_use]
    pub const fn handle(self) -> Handle {
        match self {
            Self::Path(h) | Self::Image(h) => h,
        }
    }
}

/// A glyph record stored in a font's glyph pools.
#[derive(Clone, Debug, PartialEq)]
pub struct Glyph {
    /// Caller-assigned glyph index.
    pub glyph_index: u32,
    /// Drawable target, if the glyph is defined.
    pub target: Option<GlyphTarget>,
    /// Glyph origin within its target's coordinate system.
    pub origin: Point,
    /// Advance applied to the running draw origin after this glyph.
    pub escapement: Vec2,
    /// Whether the target geometry is hinted for the glyph grid.
    pub hinted: bool,
}

impl Glyph {
    fn vacant() -> Self {
        Self {
            glyph_index: 0,
            target: None,
            origin: Point::ZERO,
            escapement: Vec2::ZERO,
            hinted: false,
        }
    }
}

/// Location of a glyph record inside the store's pools.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GlyphSlot {
    /// Pool block index.
    pub block: u32,
    /// Slot index within the block.
    pub slot: u32,
}

/// Descriptor locating a defined glyph, keyed by glyph index.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct GlyphDesc {
    /// Caller-assigned glyph index.
    pub glyph_index: u32,
    /// Where the glyph record lives.
    pub slot: GlyphSlot,
}

/// Out-of-memory growing the descriptor array or a glyph pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlyphOutOfMemory;

impl fmt::Display for GlyphOutOfMemory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("out of memory growing the glyph store")
    }
}

impl core::error::Error for GlyphOutOfMemory {}

/// Per-font glyph storage.
#[derive(Debug, Default)]
pub struct GlyphStore {
    /// Descriptors of defined glyphs, sorted ascending by glyph index.
    created: Vec<GlyphDesc>,
    /// Descriptors whose pool slots are free for reuse.
    available: Vec<GlyphSlot>,
    pools: Vec<Vec<Glyph>>,
    pool_capacity: usize,
}

impl GlyphStore {
    /// Creates an empty store with [`DEFAULT_GLYPH_POOL_CAPACITY`].
    #[must_use]
    pub fn new() -> Self {
        Self::with_pool_capacity(DEFAULT_GLYPH_POOL_CAPACITY)
    }

    /// Creates an empty store with an explicit glyph pool block capacity.
    ///
    /// # Panics
    ///
    /// Panics if `pool_capacity` is zero.
    #[must_use]
    pub fn with_pool_capacity(pool_capacity: usize) -> Self {
        assert!(pool_capacity > 0, "glyph pools must hold at least one glyph");
        Self {
            created: Vec::new(),
            available: Vec::new(),
            pools: Vec::new(),
            pool_capacity,
        }
    }

    /// Number of defined glyphs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.created.len()
    }

    /// Returns `true` if no glyphs are defined.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.created.is_empty()
    }

    /// Binary-searches the descriptor for `glyph_index`.
    #[must_use]
    pub fn desc_get(&self, glyph_index: u32) -> Option<&GlyphDesc> {
        let at = self
            .created
            .binary_search_by_key(&glyph_index, |d| d.glyph_index)
            .ok()?;
        Some(&self.created[at])
    }

    /// Returns the glyph record for `glyph_index`, if defined.
    #[must_use]
    pub fn get(&self, glyph_index: u32) -> Option<&Glyph> {
        let desc = self.desc_get(glyph_index)?;
        Some(&self.pools[desc.slot.block as usize][desc.slot.slot as usize])
    }

    /// Defines or redefines the glyph at `glyph_index`.
    ///
    /// Returns the previous target if the glyph already pointed at one, so
    /// the embedding context can release that handle. The context is
    /// expected to have acquired `target`'s handle before calling.
    pub fn set_target(
        &mut self,
        glyph_index: u32,
        target: Option<GlyphTarget>,
        origin: Point,
        escapement: Vec2,
        hinted: bool,
    ) -> Result<Option<GlyphTarget>, GlyphOutOfMemory> {
        let slot = match self
            .created
            .binary_search_by_key(&glyph_index, |d| d.glyph_index)
        {
            Ok(at) => self.created[at].slot,
            Err(at) => {
                let slot = self.glyph_new()?;
                self.created.try_reserve(1).map_err(|_| {
                    // Roll the fresh slot back so a failed insert leaks nothing.
                    self.available.push(slot);
                    GlyphOutOfMemory
                })?;
                self.created.insert(at, GlyphDesc { glyph_index, slot });
                slot
            }
        };

        let glyph = &mut self.pools[slot.block as usize][slot.slot as usize];
        let previous = glyph.target;
        *glyph = Glyph {
            glyph_index,
            target,
            origin,
            escapement,
            hinted,
        };
        Ok(previous)
    }

    /// Undefines the glyph at `glyph_index`.
    ///
    /// The descriptor moves from the sorted array to the free list (a
    /// linear shift) and the previous target, if any, is returned for the
    /// context to release. Returns `None` if the glyph was not defined.
    pub fn clear(&mut self, glyph_index: u32) -> Option<Option<GlyphTarget>> {
        let at = self
            .created
            .binary_search_by_key(&glyph_index, |d| d.glyph_index)
            .ok()?;
        let desc = self.created.remove(at);
        let glyph = &mut self.pools[desc.slot.block as usize][desc.slot.slot as usize];
        let previous = glyph.target;
        *glyph = Glyph::vacant();
        self.available.push(desc.slot);
        Some(previous)
    }

    /// Iterates defined glyphs in ascending glyph-index order.
    pub fn iter(&self) -> impl Iterator<Item = &Glyph> {
        self.created
            .iter()
            .map(|d| &self.pools[d.slot.block as usize][d.slot.slot as usize])
    }

    /// Removes every glyph and returns the targets they held.
    ///
    /// Used when the owning font is destroyed: the context releases each
    /// returned handle. The store is empty afterward.
    pub fn drain_targets(&mut self) -> Vec<GlyphTarget> {
        let targets = self.iter().filter_map(|g| g.target).collect();
        self.created.clear();
        self.available.clear();
        self.pools.clear();
        targets
    }

    /// Allocates a pool slot for a new glyph: a freed descriptor's slot if
    /// one exists, else free capacity in the last pool, else a new pool.
    fn glyph_new(&mut self) -> Result<GlyphSlot, GlyphOutOfMemory> {
        if let Some(slot) = self.available.pop() {
            return Ok(slot);
        }

        let pool_count = self.pools.len();
        if let Some(last) = self.pools.last_mut()
            && last.len() < self.pool_capacity
        {
            let slot = GlyphSlot {
                block: u32::try_from(pool_count - 1).expect("pool index fits u32"),
                slot: u32::try_from(last.len()).expect("slot index fits u32"),
            };
            last.push(Glyph::vacant());
            return Ok(slot);
        }

        let mut pool = Vec::new();
        pool.try_reserve_exact(self.pool_capacity)
            .map_err(|_| GlyphOutOfMemory)?;
        self.pools.try_reserve(1).map_err(|_| GlyphOutOfMemory)?;
        pool.push(Glyph::vacant());
        self.pools.push(pool);
        Ok(GlyphSlot {
            block: u32::try_from(self.pools.len() - 1).expect("pool index fits u32"),
            slot: 0,
        })
    }

    #[cfg(test)]
    fn sort_invariant_holds(&self) -> bool {
        self.created
            .windows(2)
            .all(|w| w[0].glyph_index < w[1].glyph_index)
    }
}
