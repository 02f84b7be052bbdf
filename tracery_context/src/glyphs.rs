// Copyright 2025 the Tracery Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Glyph definition and batched glyph drawing.
//!
//! Glyph targets are handles into the shared table, so defining a glyph
//! acquires a reference on its path or image and redefining or clearing it
//! releases the previous one. Drawing resolves a whole batch up front
//! (failing before any origin moves) and then advances the glyph origin per
//! glyph whether or not that glyph produced a draw.

use alloc::vec::Vec;

use kurbo::{Point, Vec2};
use tracery_glyph::{Glyph, GlyphTarget};
use tracery_handle::{Handle, ObjectKind};

use crate::context::{Context, finite_or_zero};
use crate::error::Error;
use crate::raster::{BatchDisable, GlyphDraw, PaintModes, RasterBackend};
use crate::resources::Slot;
use crate::state::{ColorTransform, MatrixMode, sanitize};

use peniko::BlendMode;

/// Determinants smaller than this make the glyph matrix non-invertible for
/// drawing purposes.
const SINGULAR_DET: f64 = 1e-12;

impl Context {
    /// Defines (or redefines) a glyph that draws a path.
    ///
    /// `path` may be [`Handle::INVALID`] to define a glyph with no visual,
    /// such as a space: it still advances the glyph origin by `escapement`
    /// when drawn. The previous target of a redefined glyph is released.
    pub fn set_glyph_to_path(
        &mut self,
        font: Handle,
        glyph_index: u32,
        path: Handle,
        hinted: bool,
        origin: Point,
        escapement: Vec2,
    ) -> Result<(), Error> {
        let target = path.is_valid().then_some(GlyphTarget::Path(path));
        self.set_glyph(font, glyph_index, target, origin, escapement, hinted)
    }

    /// Defines (or redefines) a glyph that draws an image.
    ///
    /// `image` may be [`Handle::INVALID`] to define a glyph with no visual.
    pub fn set_glyph_to_image(
        &mut self,
        font: Handle,
        glyph_index: u32,
        image: Handle,
        origin: Point,
        escapement: Vec2,
    ) -> Result<(), Error> {
        let target = image.is_valid().then_some(GlyphTarget::Image(image));
        self.set_glyph(font, glyph_index, target, origin, escapement, false)
    }

    fn set_glyph(
        &mut self,
        font: Handle,
        glyph_index: u32,
        target: Option<GlyphTarget>,
        origin: Point,
        escapement: Vec2,
        hinted: bool,
    ) -> Result<(), Error> {
        let origin = Point::new(finite_or_zero(origin.x), finite_or_zero(origin.y));
        let escapement = Vec2::new(finite_or_zero(escapement.x), finite_or_zero(escapement.y));

        let outcome = {
            let mut shared = self.shared.borrow_mut();
            let shared = &mut *shared;

            let fonts_ok = shared.live_kind(font) == Some(ObjectKind::Font);
            let target_ok = match target {
                None => true,
                Some(GlyphTarget::Path(h)) => shared.live_kind(h) == Some(ObjectKind::Path),
                Some(GlyphTarget::Image(h)) => shared.live_kind(h) == Some(ObjectKind::Image),
            };
            if !fonts_ok || !target_ok {
                Err(Error::BadHandle)
            } else {
                // Acquire the new target before installing it; the glyph
                // store returns the previous one for us to release.
                if let Some(t) = target {
                    shared.inc_ref(t.handle());
                }
                let result = match shared.table.get_mut(font) {
                    Some(Slot::Font(data)) => {
                        data.glyphs
                            .set_target(glyph_index, target, origin, escapement, hinted)
                    }
                    _ => unreachable!("font kind checked above"),
                };
                match result {
                    Ok(previous) => Ok(previous),
                    Err(_) => {
                        // Revert the acquire; the caller's references keep
                        // the count above zero.
                        if let Some(t) = target {
                            shared.dec_ref(t.handle());
                        }
                        Err(Error::OutOfMemory)
                    }
                }
            }
        };

        match outcome {
            Ok(previous) => {
                if let Some(previous) = previous {
                    self.release_handle(previous.handle());
                }
                self.maybe_full_pass();
                Ok(())
            }
            Err(error) => self.fail(error),
        }
    }

    /// Undefines a glyph, releasing its target.
    ///
    /// Clearing a glyph that was never defined records
    /// [`Error::IllegalArgument`].
    pub fn clear_glyph(&mut self, font: Handle, glyph_index: u32) -> Result<(), Error> {
        let outcome = {
            let mut shared = self.shared.borrow_mut();
            match shared.table.get_mut(font) {
                Some(Slot::Font(data)) if !data.destroyed => match data.glyphs.clear(glyph_index) {
                    Some(previous) => Ok(previous),
                    None => Err(Error::IllegalArgument),
                },
                _ => Err(Error::BadHandle),
            }
        };
        match outcome {
            Ok(previous) => {
                if let Some(previous) = previous {
                    self.release_handle(previous.handle());
                }
                self.maybe_full_pass();
                Ok(())
            }
            Err(error) => self.fail(error),
        }
    }

    /// Draws a batch of glyphs, advancing the glyph origin through the
    /// whole batch.
    ///
    /// `adjustments_x`/`adjustments_y`, when present, must match
    /// `glyph_indices` in length; each entry is added to the corresponding
    /// glyph's escapement. Every index must name a defined glyph or the
    /// whole batch is rejected with [`Error::IllegalArgument`] before any
    /// origin moves.
    ///
    /// A singular glyph matrix draws nothing but still advances origins and
    /// succeeds. A backend failure mid-batch is recorded and reported after
    /// the batch completes; later glyphs still draw and origins still
    /// advance.
    pub fn draw_glyphs(
        &mut self,
        font: Handle,
        glyph_indices: &[u32],
        adjustments_x: Option<&[f32]>,
        adjustments_y: Option<&[f32]>,
        modes: PaintModes,
        allow_auto_hinting: bool,
        backend: &mut dyn RasterBackend,
    ) -> Result<(), Error> {
        let lengths_ok = adjustments_x.is_none_or(|a| a.len() == glyph_indices.len())
            && adjustments_y.is_none_or(|a| a.len() == glyph_indices.len());
        if !lengths_ok {
            return self.fail(Error::IllegalArgument);
        }

        // Resolve the whole batch before drawing anything: a bad font
        // handle or an undefined glyph rejects the batch with no origin
        // movement.
        let resolved: Result<Vec<Glyph>, Error> = {
            let shared = self.shared.borrow();
            match shared.table.get(font) {
                Some(Slot::Font(data)) if !data.destroyed => glyph_indices
                    .iter()
                    .map(|&index| {
                        data.glyphs
                            .get(index)
                            .cloned()
                            .ok_or(Error::IllegalArgument)
                    })
                    .collect(),
                _ => Err(Error::BadHandle),
            }
        };
        let resolved = match resolved {
            Ok(glyphs) => glyphs,
            Err(error) => return self.fail(error),
        };

        if self.raster_retrieval_pending {
            self.raster_retrieval_pending = false;
            backend.retrieve_memory();
        }

        let transform = self.state.matrix(MatrixMode::GlyphUserToSurface);
        let coeffs = transform.as_coeffs();
        let singular = transform.determinant().abs() < SINGULAR_DET;

        let mut disable = BatchDisable::empty();
        if coeffs[1] != 0.0 || coeffs[2] != 0.0 {
            disable |= BatchDisable::SHEAR;
        }
        if self.state.masking {
            disable |= BatchDisable::MASKING;
        }
        if self.state.color_transform
            && self.state.color_transform_values != ColorTransform::IDENTITY
        {
            disable |= BatchDisable::COLOR_TRANSFORM;
        }
        if self.state.blend_mode != BlendMode::default() {
            disable |= BatchDisable::BLEND;
        }
        let blit_eligible = disable.is_empty();

        let mut first_failure = None;
        for (at, glyph) in resolved.iter().enumerate() {
            if let Some(target) = glyph.target
                && !modes.is_empty()
                && !singular
            {
                let draw = GlyphDraw {
                    target,
                    transform,
                    origin: self.state.glyph_origin - glyph.origin.to_vec2(),
                    modes,
                    blit_eligible,
                    hinted: glyph.hinted && allow_auto_hinting,
                };
                if let Err(error) = backend.draw_glyph(&draw)
                    && first_failure.is_none()
                {
                    first_failure = Some(error);
                }
            }

            let adjust = Vec2::new(
                f64::from(sanitize(adjustments_x.map_or(0.0, |a| a[at]), 0.0)),
                f64::from(sanitize(adjustments_y.map_or(0.0, |a| a[at]), 0.0)),
            );
            self.state.glyph_origin += glyph.escapement + adjust;
        }

        self.maybe_full_pass();
        match first_failure {
            None => Ok(()),
            Some(_) => self.fail(Error::OutOfMemory),
        }
    }

    /// The running glyph draw origin, in glyph user space.
    #[must_use]
    pub fn glyph_origin(&self) -> Point {
        self.state.glyph_origin
    }

    /// Sets the running glyph draw origin. Non-finite coordinates are
    /// sanitized to zero.
    pub fn set_glyph_origin(&mut self, origin: Point) {
        self.state.glyph_origin =
            Point::new(finite_or_zero(origin.x), finite_or_zero(origin.y));
    }
}
