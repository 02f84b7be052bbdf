// Copyright 2025 the Tracery Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Object payloads, the handle-table slot union, and the shared resource group.

use alloc::boxed::Box;
use alloc::vec::Vec;

use hashbrown::HashMap;
use kurbo::{PathEl, Point};
use peniko::{Color, ColorStop};
use tracery_glyph::GlyphStore;
use tracery_handle::{Handle, HandleTable, ObjectKind, ReclaimCadence, TableEntry};
use tracery_pool::{Pool, PoolEntry, PoolRef};

/// Default fixed capacity of path and paint pool blocks.
pub const DEFAULT_POOL_CAPACITY: usize = 64;

/// How an object kind is freed once its reference count reaches zero.
///
/// One ownership path with two policies, instead of separate code paths for
/// pooled and directly-owned objects.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum ReleasePolicy {
    /// The handle is removed at once but the pool slot is only reclaimed by
    /// the next compaction pass.
    Deferred,
    /// The object is dropped synchronously with its handle.
    Immediate,
}

impl ReleasePolicy {
    pub(crate) fn for_kind(kind: ObjectKind) -> Self {
        match kind {
            ObjectKind::Path | ObjectKind::Paint => Self::Deferred,
            ObjectKind::Image | ObjectKind::MaskLayer | ObjectKind::Font => Self::Immediate,
        }
    }
}

/// A pooled vector path.
#[derive(Debug, Default)]
pub struct PathData {
    pub(crate) handle: Handle,
    pub(crate) ref_count: u32,
    /// Set when the client destroys the handle while internal references
    /// remain. A destroyed path is dead to the client but its data stays
    /// until the last reference is released.
    pub(crate) destroyed: bool,
    /// Path outline elements.
    pub elements: Vec<PathEl>,
    /// Flattening/stroking scratch, rebuilt on demand; trimmed by the full
    /// reclamation pass.
    pub(crate) stroke_scratch: Vec<Point>,
}

impl PoolEntry for PathData {
    fn ref_count(&self) -> u32 {
        self.ref_count
    }

    fn memory_retrieve(&mut self) {
        self.elements.shrink_to_fit();
        self.stroke_scratch.clear();
        self.stroke_scratch.shrink_to_fit();
    }
}

/// What a paint fills with.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum PaintType {
    /// A single solid color.
    #[default]
    Color,
    /// A linear gradient between two points.
    LinearGradient,
    /// A radial gradient with center, focal point, and radius.
    RadialGradient,
    /// A tiled pattern image.
    Pattern,
}

/// How a gradient continues outside the 0..=1 ramp.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum SpreadMode {
    /// Extend the edge stops.
    #[default]
    Pad,
    /// Repeat the ramp.
    Repeat,
    /// Repeat the ramp, mirroring every other period.
    Reflect,
}

/// How a pattern paint fills space outside its image.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum TilingMode {
    /// Sample the fill color outside the image.
    #[default]
    Fill,
    /// Extend the image's edge colors.
    Pad,
    /// Repeat the image.
    Repeat,
    /// Repeat the image, mirroring every other tile.
    Reflect,
}

/// A pooled paint.
#[derive(Debug)]
pub struct PaintData {
    pub(crate) handle: Handle,
    pub(crate) ref_count: u32,
    pub(crate) destroyed: bool,
    /// Active paint type.
    pub paint_type: PaintType,
    /// Solid color (also the fallback for degenerate gradients).
    pub color: Color,
    /// Gradient color ramp.
    pub stops: Vec<ColorStop>,
    /// Gradient spread outside the ramp.
    pub ramp_spread: SpreadMode,
    /// Linear gradient endpoints.
    pub linear: (Point, Point),
    /// Radial gradient center, focal point, and radius.
    pub radial: (Point, Point, f64),
    /// Pattern image handle, if this is a pattern paint.
    pub pattern: Option<Handle>,
    /// Pattern tiling mode.
    pub tiling: TilingMode,
}

impl Default for PaintData {
    fn default() -> Self {
        Self {
            handle: Handle::INVALID,
            ref_count: 0,
            destroyed: false,
            paint_type: PaintType::Color,
            color: Color::BLACK,
            stops: Vec::new(),
            ramp_spread: SpreadMode::Pad,
            linear: (Point::ZERO, Point::new(1.0, 0.0)),
            radial: (Point::ZERO, Point::ZERO, 1.0),
            pattern: None,
            tiling: TilingMode::Fill,
        }
    }
}

impl PoolEntry for PaintData {
    fn ref_count(&self) -> u32 {
        self.ref_count
    }

    fn memory_retrieve(&mut self) {
        self.stops.shrink_to_fit();
    }
}

/// A directly-owned raster image.
#[derive(Debug)]
pub struct ImageData {
    pub(crate) handle: Handle,
    pub(crate) ref_count: u32,
    pub(crate) destroyed: bool,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Pixel storage, RGBA8, row-major.
    pub pixels: Vec<u8>,
}

/// A directly-owned off-screen mask layer.
#[derive(Debug)]
pub struct MaskLayerData {
    pub(crate) handle: Handle,
    pub(crate) ref_count: u32,
    pub(crate) destroyed: bool,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

/// A directly-owned font and its glyph store.
#[derive(Debug)]
pub struct FontData {
    pub(crate) handle: Handle,
    pub(crate) ref_count: u32,
    pub(crate) destroyed: bool,
    /// The font's glyphs.
    pub glyphs: GlyphStore,
}

/// Handle-table slot payload: a kind tag plus either a pool locator or the
/// boxed object itself.
#[derive(Debug)]
pub(crate) enum Slot {
    Path(PoolRef),
    Paint(PoolRef),
    Image(Box<ImageData>),
    MaskLayer(Box<MaskLayerData>),
    Font(Box<FontData>),
}

impl TableEntry for Slot {
    fn kind(&self) -> ObjectKind {
        match self {
            Self::Path(_) => ObjectKind::Path,
            Self::Paint(_) => ObjectKind::Paint,
            Self::Image(_) => ObjectKind::Image,
            Self::MaskLayer(_) => ObjectKind::MaskLayer,
            Self::Font(_) => ObjectKind::Font,
        }
    }

    fn is_live(&self) -> bool {
        match self {
            // Pooled payloads carry their own flag; the group checks it in
            // [`SharedResources::live_kind`].
            Self::Path(_) | Self::Paint(_) => true,
            Self::Image(image) => !image.destroyed,
            Self::MaskLayer(layer) => !layer.destroyed,
            Self::Font(font) => !font.destroyed,
        }
    }
}

/// Resources shared by every context in a sharing group: the handle table,
/// the path and paint pools, and the external image-lock registry.
///
/// Contexts hold this behind `Rc<RefCell<..>>`; the group is freed when the
/// last sharing context is dropped.
#[derive(Debug)]
pub(crate) struct SharedResources {
    pub(crate) table: HandleTable<Slot>,
    pub(crate) paths: Pool<PathData>,
    pub(crate) paints: Pool<PaintData>,
    /// Lock counts held by the external (EGL-side) collaborator, keyed by
    /// image handle. A locked image cannot be destroyed.
    pub(crate) image_locks: HashMap<Handle, u32>,
}

/// Where a slot's reference count lives, copied out of the table so the
/// table borrow can end before the pools are touched.
enum RefLoc {
    Path(PoolRef),
    Paint(PoolRef),
    Boxed,
}

impl SharedResources {
    pub(crate) fn new(cadence: ReclaimCadence, pool_capacity: usize) -> Self {
        Self {
            table: HandleTable::with_cadence(cadence),
            paths: Pool::new(pool_capacity),
            paints: Pool::new(pool_capacity),
            image_locks: HashMap::new(),
        }
    }

    fn ref_loc(&self, handle: Handle) -> Option<RefLoc> {
        Some(match self.table.get(handle)? {
            Slot::Path(pool_ref) => RefLoc::Path(*pool_ref),
            Slot::Paint(pool_ref) => RefLoc::Paint(*pool_ref),
            _ => RefLoc::Boxed,
        })
    }

    /// Increments `handle`'s reference count; returns the new count.
    pub(crate) fn inc_ref(&mut self, handle: Handle) -> Option<u32> {
        let loc = self.ref_loc(handle)?;
        Some(match loc {
            RefLoc::Path(pool_ref) => {
                let entry = self.paths.get_mut(pool_ref)?;
                entry.ref_count += 1;
                entry.ref_count
            }
            RefLoc::Paint(pool_ref) => {
                let entry = self.paints.get_mut(pool_ref)?;
                entry.ref_count += 1;
                entry.ref_count
            }
            RefLoc::Boxed => match self.table.get_mut(handle)? {
                Slot::Image(image) => {
                    image.ref_count += 1;
                    image.ref_count
                }
                Slot::MaskLayer(layer) => {
                    layer.ref_count += 1;
                    layer.ref_count
                }
                Slot::Font(font) => {
                    font.ref_count += 1;
                    font.ref_count
                }
                Slot::Path(_) | Slot::Paint(_) => unreachable!("pooled kinds handled above"),
            },
        })
    }

    /// Decrements `handle`'s reference count; returns the new count.
    pub(crate) fn dec_ref(&mut self, handle: Handle) -> Option<u32> {
        let loc = self.ref_loc(handle)?;
        Some(match loc {
            RefLoc::Path(pool_ref) => {
                let entry = self.paths.get_mut(pool_ref)?;
                debug_assert!(entry.ref_count > 0, "release of an unreferenced path");
                entry.ref_count -= 1;
                entry.ref_count
            }
            RefLoc::Paint(pool_ref) => {
                let entry = self.paints.get_mut(pool_ref)?;
                debug_assert!(entry.ref_count > 0, "release of an unreferenced paint");
                entry.ref_count -= 1;
                entry.ref_count
            }
            RefLoc::Boxed => match self.table.get_mut(handle)? {
                Slot::Image(image) => {
                    image.ref_count -= 1;
                    image.ref_count
                }
                Slot::MaskLayer(layer) => {
                    layer.ref_count -= 1;
                    layer.ref_count
                }
                Slot::Font(font) => {
                    font.ref_count -= 1;
                    font.ref_count
                }
                Slot::Path(_) | Slot::Paint(_) => unreachable!("pooled kinds handled above"),
            },
        })
    }

    /// Resolves `handle` to its kind, treating client-destroyed objects as
    /// dead even while internal references keep their data alive.
    pub(crate) fn live_kind(&self, handle: Handle) -> Option<ObjectKind> {
        let kind = self.table.validate(handle)?;
        match self.table.get(handle)? {
            Slot::Path(pool_ref) => (!self.paths.get(*pool_ref)?.destroyed).then_some(kind),
            Slot::Paint(pool_ref) => (!self.paints.get(*pool_ref)?.destroyed).then_some(kind),
            _ => Some(kind),
        }
    }

    /// Marks `handle` client-dead. [`live_kind`](Self::live_kind) returns
    /// `None` for it from now on; the payload persists until its reference
    /// count reaches zero.
    pub(crate) fn mark_destroyed(&mut self, handle: Handle) {
        let Some(loc) = self.ref_loc(handle) else {
            return;
        };
        match loc {
            RefLoc::Path(pool_ref) => {
                if let Some(entry) = self.paths.get_mut(pool_ref) {
                    entry.destroyed = true;
                }
            }
            RefLoc::Paint(pool_ref) => {
                if let Some(entry) = self.paints.get_mut(pool_ref) {
                    entry.destroyed = true;
                }
            }
            RefLoc::Boxed => match self.table.get_mut(handle) {
                Some(Slot::Image(image)) => image.destroyed = true,
                Some(Slot::MaskLayer(layer)) => layer.destroyed = true,
                Some(Slot::Font(font)) => font.destroyed = true,
                _ => {}
            },
        }
    }

    /// Reads `handle`'s reference count.
    pub(crate) fn ref_count_of(&self, handle: Handle) -> Option<u32> {
        Some(match self.table.get(handle)? {
            Slot::Path(pool_ref) => self.paths.get(*pool_ref)?.ref_count,
            Slot::Paint(pool_ref) => self.paints.get(*pool_ref)?.ref_count,
            Slot::Image(image) => image.ref_count,
            Slot::MaskLayer(layer) => layer.ref_count,
            Slot::Font(font) => font.ref_count,
        })
    }
}
