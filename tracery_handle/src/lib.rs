// Copyright 2025 the Tracery Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tracery Handle: a growable handle table for graphics resources.
//!
//! Vector-graphics APIs hand small integer handles to clients and keep the
//! actual objects on their side of the fence. This crate provides the table
//! behind those handles:
//!
//! - **Handles** ([`Handle`]): compact `u32` identifiers, unique within one
//!   table. `Handle(0)` is reserved and never refers to an object.
//! - **Slots**: a growable array of payloads, index 0 permanently vacant.
//!   Payloads are whatever the embedder stores per object (typically a
//!   tagged locator into a pool, or the boxed object itself).
//! - **Free-list reuse** with a twist: the list of reclaimed indices is
//!   re-sorted on a call-count cadence so allocation pops the *lowest*
//!   available index rather than the most recently freed one, packing live
//!   objects toward the front of the table.
//! - **Reclamation cadence** ([`ReclaimCadence`]): the table counts
//!   allocate/remove calls and tells the embedder when a full memory
//!   reclamation pass is due. The table itself only ever performs the cheap
//!   part (re-sorting its free list); heavier work such as pool compaction
//!   is the embedder's business.
//!
//! # Example
//!
//! ```rust
//! use tracery_handle::{Handle, HandleTable, ObjectKind, TableEntry};
//!
//! struct Node {
//!     handle: Handle,
//!     label: &'static str,
//! }
//!
//! impl TableEntry for Node {
//!     fn kind(&self) -> ObjectKind {
//!         ObjectKind::Path
//!     }
//! }
//!
//! let mut table = HandleTable::new();
//! let h = table.allocate(Node { handle: Handle::INVALID, label: "first" });
//! table.get_mut(h).unwrap().handle = h;
//!
//! assert_eq!(table.validate(h), Some(ObjectKind::Path));
//! assert!(table.validate(Handle::INVALID).is_none());
//!
//! let node = table.remove(h).unwrap();
//! assert_eq!(node.label, "first");
//! assert_eq!(table.validate(h), None);
//! ```

#![no_std]

extern crate alloc;

mod table;

pub use table::{HandleTable, ReclaimCadence, TableEntry};

use core::fmt;

/// Identifier for an object registered in a [`HandleTable`].
///
/// Handles are plain slot indices: small, `Copy`, and stable for the lifetime
/// of the object. Once an object is removed its handle value becomes eligible
/// for reuse by a later allocation, so a handle is only meaningful against
/// the table (and sharing group) that produced it.
#[repr(transparent)]
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Handle(pub u32);

impl Handle {
    /// The reserved invalid handle. Slot 0 of every table is permanently
    /// vacant, so no live object ever has this value.
    pub const INVALID: Self = Self(0);

    /// Returns `true` unless this is [`Handle::INVALID`].
    #[inline]
    #[must_use]
    pub const fn is_valid(self) -> bool {
        self.0 != 0
    }

    /// Returns this handle as a `usize` slot index.
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl Default for Handle {
    fn default() -> Self {
        Self::INVALID
    }
}

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_valid() {
            write!(f, "Handle({})", self.0)
        } else {
            f.write_str("Handle(INVALID)")
        }
    }
}

/// Kind tag for objects reachable through a handle.
///
/// The original design this replaces prefixed every object with a raw
/// integer type id next to a `void*`; here the tag is carried by the slot
/// payload (via [`TableEntry::kind`]) and surfaced by
/// [`HandleTable::validate`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    /// A vector path.
    Path,
    /// A paint (solid color, gradient, or pattern).
    Paint,
    /// A raster image.
    Image,
    /// An off-screen mask layer.
    MaskLayer,
    /// A font owning a glyph store.
    Font,
}
