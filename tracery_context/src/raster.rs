// Copyright 2025 the Tracery Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The rasterizer seam.
//!
//! The context never rasterizes anything itself: drawing calls hand fully
//! resolved work items to a [`RasterBackend`], and the full reclamation pass
//! asks the backend to retrieve its internal scratch memory. [`TraceRaster`]
//! is a recording implementation for tests and debugging, in the spirit of
//! a trace backend rather than a reference renderer.

use alloc::vec::Vec;

use bitflags::bitflags;
use kurbo::{Affine, Point};
use tracery_glyph::GlyphTarget;

bitflags! {
    /// Paint stages a draw call applies.
    #[derive(Copy, Clone, Debug, PartialEq, Eq)]
    pub struct PaintModes: u8 {
        /// Fill with the fill paint.
        const FILL = 1 << 0;
        /// Stroke with the stroke paint.
        const STROKE = 1 << 1;
    }
}

bitflags! {
    /// Reasons a glyph batch cannot use the direct blit pipeline.
    ///
    /// Computed once per batch, not per glyph; an empty set means every
    /// glyph in the batch is blit-eligible.
    #[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
    pub struct BatchDisable: u8 {
        /// The glyph transform has a shear component.
        const SHEAR = 1 << 0;
        /// Masking is enabled.
        const MASKING = 1 << 1;
        /// A non-identity color transform is enabled.
        const COLOR_TRANSFORM = 1 << 2;
        /// The blend mode is not the normal source-over mode.
        const BLEND = 1 << 3;
    }
}

/// One resolved glyph draw, ready for rasterization.
#[derive(Clone, Debug, PartialEq)]
pub struct GlyphDraw {
    /// What to draw.
    pub target: GlyphTarget,
    /// Glyph user-to-surface transform for this batch.
    pub transform: Affine,
    /// Draw origin in user space, already adjusted by the glyph's origin.
    pub origin: Point,
    /// Paint stages to apply.
    pub modes: PaintModes,
    /// Whether the whole batch qualifies for the direct blit pipeline.
    pub blit_eligible: bool,
    /// Whether hinting may be applied to this glyph.
    pub hinted: bool,
}

/// Rasterization failure reported by a backend.
///
/// The batch keeps running after a failure: glyph origins continue to
/// advance (the API is immediate-mode and non-transactional), and the first
/// failure is what the context records.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RasterError {
    /// The backend ran out of memory.
    OutOfMemory,
}

/// The opaque rasterizer/triangulator collaborator.
pub trait RasterBackend {
    /// Rasterizes one glyph draw.
    fn draw_glyph(&mut self, draw: &GlyphDraw) -> Result<(), RasterError>;

    /// Releases internal scratch memory back to the allocator.
    ///
    /// Called on the full reclamation cadence. The default does nothing.
    fn retrieve_memory(&mut self) {}
}

/// Recording backend for tests and debugging.
///
/// Stores every draw it receives and counts memory retrievals; optionally
/// fails a configured draw to exercise partial-batch behavior.
#[derive(Debug, Default)]
pub struct TraceRaster {
    draws: Vec<GlyphDraw>,
    retrievals: u32,
    /// Zero-based index of a draw call that should fail, if any.
    pub fail_at: Option<usize>,
    calls: usize,
}

impl TraceRaster {
    /// Creates an empty trace backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Draws received so far, in call order.
    #[must_use]
    pub fn draws(&self) -> &[GlyphDraw] {
        &self.draws
    }

    /// Number of [`RasterBackend::retrieve_memory`] calls received.
    #[must_use]
    pub fn retrievals(&self) -> u32 {
        self.retrievals
    }
}

impl RasterBackend for TraceRaster {
    fn draw_glyph(&mut self, draw: &GlyphDraw) -> Result<(), RasterError> {
        let failing = self.fail_at == Some(self.calls);
        self.calls += 1;
        if failing {
            return Err(RasterError::OutOfMemory);
        }
        self.draws.push(draw.clone());
        Ok(())
    }

    fn retrieve_memory(&mut self) {
        self.retrievals += 1;
    }
}
