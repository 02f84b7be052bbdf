// Copyright 2025 the Tracery Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The rendering context: object lifecycle, reference counting, and the
//! reclamation driver.

use alloc::boxed::Box;
use alloc::rc::Rc;
use alloc::vec::Vec;
use core::cell::RefCell;

use kurbo::{Affine, PathEl};
use tracery_glyph::{GlyphStore, GlyphTarget};
use tracery_handle::{Handle, ObjectKind, ReclaimCadence, TableEntry};

use crate::error::Error;
use crate::resources::{
    DEFAULT_POOL_CAPACITY, FontData, ImageData, MaskLayerData, PaintData, PathData, ReleasePolicy,
    SharedResources, Slot,
};
use crate::state::{ContextState, MatrixMode};

/// Maximum image/mask-layer dimension accepted by creation calls.
pub const MAX_IMAGE_DIMENSION: u32 = 16_384;

/// Snapshot of the shared group's storage, for diagnostics and tests.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct GroupStats {
    /// Handle-table slots, including vacant ones and the reserved slot 0.
    pub handle_slots: usize,
    /// Live handles.
    pub live_handles: usize,
    /// Allocated path pool blocks.
    pub path_blocks: usize,
    /// Physically present path entries, live and dead.
    pub path_entries: usize,
    /// Live paths.
    pub live_paths: usize,
    /// Allocated paint pool blocks.
    pub paint_blocks: usize,
    /// Physically present paint entries, live and dead.
    pub paint_entries: usize,
    /// Live paints.
    pub live_paints: usize,
}

/// A rendering context.
///
/// The context exclusively owns its rendering state (matrices, stroke and
/// scissor parameters, paint bindings) and shares a resource group with any
/// context created through [`Context::with_shared`]: the handle table, the
/// path and paint pools, and the image-lock registry. Handles are
/// valid across the whole sharing group. The group is freed when the last
/// sharing context is dropped.
///
/// All operations are synchronous and single-threaded; sharing a group
/// across threads is not supported, and the `Rc` at its core enforces that
/// at compile time.
#[derive(Debug)]
pub struct Context {
    pub(crate) shared: Rc<RefCell<SharedResources>>,
    pub(crate) state: ContextState,
    last_error: Option<Error>,
    pub(crate) raster_retrieval_pending: bool,
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

impl Context {
    /// Creates a context with its own resource group and default tuning.
    #[must_use]
    pub fn new() -> Self {
        Self::with_tuning(ReclaimCadence::DEFAULT, DEFAULT_POOL_CAPACITY)
    }

    /// Creates a context with explicit reclamation cadence and pool block
    /// capacity.
    ///
    /// The defaults are profiling-derived, not semantic; see
    /// [`ReclaimCadence`].
    #[must_use]
    pub fn with_tuning(cadence: ReclaimCadence, pool_capacity: usize) -> Self {
        Self {
            shared: Rc::new(RefCell::new(SharedResources::new(cadence, pool_capacity))),
            state: ContextState::default(),
            last_error: None,
            raster_retrieval_pending: false,
        }
    }

    /// Creates a context sharing `other`'s resource group.
    ///
    /// Handles created through either context are valid in both. Rendering
    /// state is not shared; the new context starts from defaults.
    #[must_use]
    pub fn with_shared(other: &Self) -> Self {
        Self {
            shared: Rc::clone(&other.shared),
            state: ContextState::default(),
            last_error: None,
            raster_retrieval_pending: false,
        }
    }

    /// Number of contexts currently sharing this context's resource group.
    #[must_use]
    pub fn group_size(&self) -> usize {
        Rc::strong_count(&self.shared)
    }

    /// Returns and clears the most recently recorded error.
    ///
    /// Each failing call overwrites the previous error; successes leave it
    /// untouched.
    pub fn take_error(&mut self) -> Option<Error> {
        self.last_error.take()
    }

    /// Peeks at the most recently recorded error without clearing it.
    #[must_use]
    pub fn last_error(&self) -> Option<Error> {
        self.last_error
    }

    pub(crate) fn record(&mut self, error: Error) {
        self.last_error = Some(error);
    }

    pub(crate) fn fail(&mut self, error: Error) -> Result<(), Error> {
        self.record(error);
        Err(error)
    }

    // ---------------------------------------------------------------------
    // Object creation
    // ---------------------------------------------------------------------

    /// Creates an empty path and returns its handle.
    ///
    /// Returns [`Handle::INVALID`] and records [`Error::OutOfMemory`] if the
    /// path pool cannot grow; no state is mutated on failure.
    pub fn create_path(&mut self) -> Handle {
        let result = {
            let mut shared = self.shared.borrow_mut();
            let shared = &mut *shared;
            shared
                .paths
                .allocate(PathData {
                    ref_count: 1,
                    ..PathData::default()
                })
                .map(|pool_ref| {
                    let handle = shared.table.allocate(Slot::Path(pool_ref));
                    shared
                        .paths
                        .get_mut(pool_ref)
                        .expect("freshly allocated path entry")
                        .handle = handle;
                    handle
                })
                .map_err(Error::from)
        };
        self.finish_create(result)
    }

    /// Creates a default paint (solid black) and returns its handle.
    pub fn create_paint(&mut self) -> Handle {
        let result = {
            let mut shared = self.shared.borrow_mut();
            let shared = &mut *shared;
            shared
                .paints
                .allocate(PaintData {
                    ref_count: 1,
                    ..PaintData::default()
                })
                .map(|pool_ref| {
                    let handle = shared.table.allocate(Slot::Paint(pool_ref));
                    shared
                        .paints
                        .get_mut(pool_ref)
                        .expect("freshly allocated paint entry")
                        .handle = handle;
                    handle
                })
                .map_err(Error::from)
        };
        self.finish_create(result)
    }

    /// Creates an RGBA8 image of the given size and returns its handle.
    ///
    /// Records [`Error::IllegalArgument`] for zero or oversized dimensions
    /// and [`Error::OutOfMemory`] if pixel storage cannot be allocated; the
    /// partially constructed image is unwound in that case.
    pub fn create_image(&mut self, width: u32, height: u32) -> Handle {
        let result = if !Self::dimensions_ok(width, height) {
            Err(Error::IllegalArgument)
        } else {
            let len = (width as usize) * (height as usize) * 4;
            let mut pixels = Vec::new();
            match pixels.try_reserve_exact(len) {
                Err(_) => Err(Error::OutOfMemory),
                Ok(()) => {
                    pixels.resize(len, 0);
                    let mut shared = self.shared.borrow_mut();
                    let handle = shared.table.allocate(Slot::Image(Box::new(ImageData {
                        handle: Handle::INVALID,
                        ref_count: 1,
                        destroyed: false,
                        width,
                        height,
                        pixels,
                    })));
                    if let Some(Slot::Image(image)) = shared.table.get_mut(handle) {
                        image.handle = handle;
                    }
                    Ok(handle)
                }
            }
        };
        self.finish_create(result)
    }

    /// Creates a mask layer of the given size and returns its handle.
    pub fn create_mask_layer(&mut self, width: u32, height: u32) -> Handle {
        let result = if !Self::dimensions_ok(width, height) {
            Err(Error::IllegalArgument)
        } else {
            let mut shared = self.shared.borrow_mut();
            let handle = shared.table.allocate(Slot::MaskLayer(Box::new(MaskLayerData {
                handle: Handle::INVALID,
                ref_count: 1,
                destroyed: false,
                width,
                height,
            })));
            if let Some(Slot::MaskLayer(layer)) = shared.table.get_mut(handle) {
                layer.handle = handle;
            }
            Ok(handle)
        };
        self.finish_create(result)
    }

    /// Creates an empty font and returns its handle.
    ///
    /// `glyph_capacity_hint` sizes the font's glyph pool blocks; pass 0 for
    /// the default.
    pub fn create_font(&mut self, glyph_capacity_hint: usize) -> Handle {
        let glyphs = if glyph_capacity_hint == 0 {
            GlyphStore::new()
        } else {
            GlyphStore::with_pool_capacity(glyph_capacity_hint)
        };
        let result = {
            let mut shared = self.shared.borrow_mut();
            let handle = shared.table.allocate(Slot::Font(Box::new(FontData {
                handle: Handle::INVALID,
                ref_count: 1,
                destroyed: false,
                glyphs,
            })));
            if let Some(Slot::Font(font)) = shared.table.get_mut(handle) {
                font.handle = handle;
            }
            Ok(handle)
        };
        self.finish_create(result)
    }

    fn dimensions_ok(width: u32, height: u32) -> bool {
        (1..=MAX_IMAGE_DIMENSION).contains(&width) && (1..=MAX_IMAGE_DIMENSION).contains(&height)
    }

    fn finish_create(&mut self, result: Result<Handle, Error>) -> Handle {
        match result {
            Ok(handle) => {
                self.maybe_full_pass();
                handle
            }
            Err(error) => {
                self.record(error);
                Handle::INVALID
            }
        }
    }

    // ---------------------------------------------------------------------
    // Object destruction and reference counting
    // ---------------------------------------------------------------------

    /// Destroys the object behind `handle`, releasing the caller's
    /// reference.
    ///
    /// The handle goes dead to the client at once: [`Context::validate`]
    /// stops reporting it and every client entry point rejects it. Internal
    /// references (a font's glyph targets, a paint's pattern image, a bound
    /// paint) keep the object's data alive until the last one is released.
    ///
    /// Pooled objects (paths, paints) whose count reaches zero lose their
    /// handle immediately but keep their pool slot until the next
    /// compaction; images, mask layers, and fonts are freed synchronously.
    /// Destroying a font releases every glyph target it holds; destroying a
    /// paint releases its pattern image.
    ///
    /// Records [`Error::BadHandle`] for unknown or already destroyed handles
    /// and [`Error::ImageInUse`] for images still locked by the external
    /// consumer (the image is left intact).
    pub fn destroy(&mut self, handle: Handle) -> Result<(), Error> {
        let check = {
            let mut shared = self.shared.borrow_mut();
            if shared.live_kind(handle).is_none() {
                Err(Error::BadHandle)
            } else if matches!(shared.table.get(handle), Some(Slot::Image(_)))
                && shared.image_locks.contains_key(&handle)
            {
                Err(Error::ImageInUse)
            } else {
                shared.mark_destroyed(handle);
                Ok(())
            }
        };
        if let Err(error) = check {
            return self.fail(error);
        }
        self.release_handle(handle);
        self.maybe_full_pass();
        Ok(())
    }

    /// Validates `handle` and returns the object's kind.
    ///
    /// Stale and destroyed handles report as invalid rather than their
    /// former kind, even while internal references keep the destroyed
    /// object's data alive.
    #[must_use]
    pub fn validate(&self, handle: Handle) -> Option<ObjectKind> {
        self.shared.borrow().live_kind(handle)
    }

    /// Current reference count of the object behind `handle`, if any.
    ///
    /// Destroyed objects still report their count while internal references
    /// hold them; this is a diagnostic view, not a client liveness check.
    #[must_use]
    pub fn ref_count(&self, handle: Handle) -> Option<u32> {
        self.shared.borrow().ref_count_of(handle)
    }

    /// Decrements the reference count of `handle`, freeing the object when
    /// it reaches zero (per-kind release policy). Frees may cascade: a dying
    /// font releases its glyph targets, a dying paint its pattern image.
    pub(crate) fn release_handle(&mut self, handle: Handle) {
        let mut pending: Vec<Handle> = alloc::vec![handle];
        while let Some(current) = pending.pop() {
            let mut shared = self.shared.borrow_mut();
            let Some(count) = shared.dec_ref(current) else {
                continue;
            };
            if count != 0 {
                continue;
            }

            let slot = shared.table.remove(current).expect("slot checked present");
            match ReleasePolicy::for_kind(slot.kind()) {
                ReleasePolicy::Deferred => match slot {
                    Slot::Path(pool_ref) => shared.paths.release(pool_ref),
                    Slot::Paint(pool_ref) => {
                        if let Some(pattern) = shared
                            .paints
                            .get_mut(pool_ref)
                            .and_then(|paint| paint.pattern.take())
                        {
                            pending.push(pattern);
                        }
                        shared.paints.release(pool_ref);
                    }
                    _ => unreachable!("pooled kinds carry pool refs"),
                },
                ReleasePolicy::Immediate => {
                    if let Slot::Font(mut font) = slot {
                        pending.extend(
                            font.glyphs
                                .drain_targets()
                                .into_iter()
                                .map(GlyphTarget::handle),
                        );
                    }
                    // Images, mask layers, and the font box itself drop
                    // synchronously here.
                }
            }
        }
    }

    // ---------------------------------------------------------------------
    // Path editing
    // ---------------------------------------------------------------------

    /// Appends outline elements to a path.
    pub fn path_append(&mut self, path: Handle, elements: &[PathEl]) -> Result<(), Error> {
        let result = {
            let mut shared = self.shared.borrow_mut();
            let shared = &mut *shared;
            match shared.table.get(path) {
                Some(Slot::Path(pool_ref)) => {
                    let entry = shared.paths.get_mut(*pool_ref).expect("path entry");
                    if entry.destroyed {
                        Err(Error::BadHandle)
                    } else if entry.elements.try_reserve(elements.len()).is_err() {
                        Err(Error::OutOfMemory)
                    } else {
                        entry.elements.extend_from_slice(elements);
                        Ok(())
                    }
                }
                _ => Err(Error::BadHandle),
            }
        };
        result.or_else(|error| self.fail(error))
    }

    /// Clears a path's outline, keeping its storage for reuse.
    ///
    /// Capacity is handed back gradually by the full reclamation pass, not
    /// here.
    pub fn path_clear(&mut self, path: Handle) -> Result<(), Error> {
        let result = {
            let mut shared = self.shared.borrow_mut();
            let shared = &mut *shared;
            match shared.table.get(path) {
                Some(Slot::Path(pool_ref)) => {
                    let entry = shared.paths.get_mut(*pool_ref).expect("path entry");
                    if entry.destroyed {
                        Err(Error::BadHandle)
                    } else {
                        entry.elements.clear();
                        entry.stroke_scratch.clear();
                        Ok(())
                    }
                }
                _ => Err(Error::BadHandle),
            }
        };
        result.or_else(|error| self.fail(error))
    }

    /// Number of outline elements in a path.
    #[must_use]
    pub fn path_element_count(&self, path: Handle) -> Option<usize> {
        let shared = self.shared.borrow();
        let Some(Slot::Path(pool_ref)) = shared.table.get(path) else {
            return None;
        };
        let entry = shared.paths.get(*pool_ref)?;
        (!entry.destroyed).then_some(entry.elements.len())
    }

    // ---------------------------------------------------------------------
    // External image locks
    // ---------------------------------------------------------------------

    /// Locks an image on behalf of the external (EGL-side) consumer.
    ///
    /// A locked image cannot be destroyed; [`Context::destroy`] reports
    /// [`Error::ImageInUse`] until every lock is released.
    pub fn lock_image(&mut self, image: Handle) -> Result<(), Error> {
        let ok = {
            let mut shared = self.shared.borrow_mut();
            let shared = &mut *shared;
            if shared.live_kind(image) == Some(ObjectKind::Image) {
                *shared.image_locks.entry(image).or_insert(0) += 1;
                true
            } else {
                false
            }
        };
        if ok { Ok(()) } else { self.fail(Error::BadHandle) }
    }

    /// Releases one external lock on an image.
    ///
    /// Records [`Error::IllegalArgument`] when the image is valid but holds
    /// no outstanding lock, [`Error::BadHandle`] when the handle does not
    /// name an image at all.
    pub fn unlock_image(&mut self, image: Handle) -> Result<(), Error> {
        let result = {
            let mut shared = self.shared.borrow_mut();
            let shared = &mut *shared;
            if let Some(count) = shared.image_locks.get_mut(&image) {
                *count -= 1;
                if *count == 0 {
                    shared.image_locks.remove(&image);
                }
                Ok(())
            } else if shared.live_kind(image) == Some(ObjectKind::Image) {
                Err(Error::IllegalArgument)
            } else {
                Err(Error::BadHandle)
            }
        };
        result.or_else(|error| self.fail(error))
    }

    // ---------------------------------------------------------------------
    // Matrix operations
    // ---------------------------------------------------------------------

    /// Selects which matrix subsequent matrix operations target.
    pub fn set_matrix_mode(&mut self, mode: MatrixMode) {
        self.state.matrix_mode = mode;
    }

    /// The matrix for the current matrix mode.
    #[must_use]
    pub fn matrix(&self) -> Affine {
        self.state.matrix(self.state.matrix_mode)
    }

    /// Resets the current matrix to the identity.
    pub fn load_identity(&mut self) {
        *self.state.matrix_mut(self.state.matrix_mode) = Affine::IDENTITY;
    }

    /// Replaces the current matrix. Non-finite coefficients are sanitized
    /// to the identity's corresponding coefficient.
    pub fn load_matrix(&mut self, matrix: Affine) {
        let identity = Affine::IDENTITY.as_coeffs();
        let mut coeffs = matrix.as_coeffs();
        for (value, fallback) in coeffs.iter_mut().zip(identity) {
            if !value.is_finite() {
                *value = fallback;
            }
        }
        *self.state.matrix_mut(self.state.matrix_mode) = Affine::new(coeffs);
    }

    /// Right-multiplies the current matrix by a translation.
    pub fn translate(&mut self, tx: f64, ty: f64) {
        let (tx, ty) = (finite_or_zero(tx), finite_or_zero(ty));
        *self.state.matrix_mut(self.state.matrix_mode) *= Affine::translate((tx, ty));
    }

    /// Right-multiplies the current matrix by a non-uniform scale.
    pub fn scale(&mut self, sx: f64, sy: f64) {
        let (sx, sy) = (finite_or_zero(sx), finite_or_zero(sy));
        *self.state.matrix_mut(self.state.matrix_mode) *= Affine::scale_non_uniform(sx, sy);
    }

    /// Right-multiplies the current matrix by a shear.
    pub fn shear(&mut self, shx: f64, shy: f64) {
        let (shx, shy) = (finite_or_zero(shx), finite_or_zero(shy));
        *self.state.matrix_mut(self.state.matrix_mode) *=
            Affine::new([1.0, shy, shx, 1.0, 0.0, 0.0]);
    }

    /// Right-multiplies the current matrix by a rotation in degrees.
    pub fn rotate(&mut self, degrees: f64) {
        let radians = finite_or_zero(degrees).to_radians();
        *self.state.matrix_mut(self.state.matrix_mode) *= Affine::rotate(radians);
    }

    // ---------------------------------------------------------------------
    // Reclamation
    // ---------------------------------------------------------------------

    /// Runs the full reclamation pass immediately.
    ///
    /// Normally this fires automatically on the configured call cadence;
    /// tests and embedders may force it. The pass: shrinks auxiliary state
    /// arrays, schedules rasterizer memory retrieval for the next draw,
    /// re-sorts and trims the handle table, compacts both pools (repointing
    /// moved entries' handles), and trims every live pooled object's
    /// internal scratch.
    pub fn full_reclaim(&mut self) {
        self.state.shrink_auxiliary();
        self.raster_retrieval_pending = true;

        let mut shared = self.shared.borrow_mut();
        let shared = &mut *shared;
        // The full pass subsumes the light tier.
        shared.table.resort_available();

        let SharedResources {
            table,
            paths,
            paints,
            ..
        } = shared;
        paths.compact(|entry, moved_to| {
            if let Some(Slot::Path(pool_ref)) = table.get_mut(entry.handle) {
                *pool_ref = moved_to;
            }
        });
        paints.compact(|entry, moved_to| {
            if let Some(Slot::Paint(pool_ref)) = table.get_mut(entry.handle) {
                *pool_ref = moved_to;
            }
        });
        table.trim_tail();

        paths.retrieve_entries();
        paints.retrieve_entries();
    }

    pub(crate) fn maybe_full_pass(&mut self) {
        let due = self.shared.borrow_mut().table.take_full_pass_due();
        if due {
            self.full_reclaim();
        }
    }

    /// Storage snapshot of the shared group.
    #[must_use]
    pub fn group_stats(&self) -> GroupStats {
        let shared = self.shared.borrow();
        GroupStats {
            handle_slots: shared.table.slot_count(),
            live_handles: shared.table.len(),
            path_blocks: shared.paths.block_count(),
            path_entries: shared.paths.entry_count(),
            live_paths: shared.paths.len(),
            paint_blocks: shared.paints.block_count(),
            paint_entries: shared.paints.entry_count(),
            live_paints: shared.paints.len(),
        }
    }
}

#[inline]
pub(crate) fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() { value } else { 0.0 }
}
