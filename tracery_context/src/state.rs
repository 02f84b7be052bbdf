// Copyright 2025 the Tracery Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-context rendering state.
//!
//! Everything here is exclusively owned by one context; only the handle
//! table and pools are shared across a sharing group.

use kurbo::{Affine, Point, Rect};
use peniko::{BlendMode, Color};
use smallvec::SmallVec;
use tracery_handle::Handle;

pub use peniko::Fill as FillRule;

/// Which of the five context matrices subsequent matrix operations target.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum MatrixMode {
    /// Path user-to-surface transform.
    #[default]
    PathUserToSurface,
    /// Image user-to-surface transform.
    ImageUserToSurface,
    /// Glyph user-to-surface transform.
    GlyphUserToSurface,
    /// Fill paint-to-user transform.
    FillPaintToUser,
    /// Stroke paint-to-user transform.
    StrokePaintToUser,
}

impl MatrixMode {
    pub(crate) const COUNT: usize = 5;

    pub(crate) fn index(self) -> usize {
        match self {
            Self::PathUserToSurface => 0,
            Self::ImageUserToSurface => 1,
            Self::GlyphUserToSurface => 2,
            Self::FillPaintToUser => 3,
            Self::StrokePaintToUser => 4,
        }
    }
}

/// Stroke end-cap style.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum CapStyle {
    /// Square end flush with the endpoint.
    #[default]
    Butt,
    /// Semicircular end.
    Round,
    /// Square end extending half the line width past the endpoint.
    Square,
}

/// Stroke join style.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum JoinStyle {
    /// Sharp corner, subject to the miter limit.
    #[default]
    Miter,
    /// Rounded corner.
    Round,
    /// Flattened corner.
    Bevel,
}

/// Overall quality/speed trade-off for rasterization.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum RenderingQuality {
    /// No antialiasing.
    NonAntialiased,
    /// Faster, lower-quality antialiasing.
    Faster,
    /// Higher-quality antialiasing.
    #[default]
    Better,
}

/// Per-channel scale and bias applied to drawn colors when enabled.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ColorTransform {
    /// RGBA scale factors.
    pub scale: [f32; 4],
    /// RGBA bias terms.
    pub bias: [f32; 4],
}

impl ColorTransform {
    /// The transform that leaves colors unchanged.
    pub const IDENTITY: Self = Self {
        scale: [1.0; 4],
        bias: [0.0; 4],
    };

    /// Returns `true` if applying this transform is a no-op.
    #[must_use]
    pub fn is_identity(&self) -> bool {
        *self == Self::IDENTITY
    }
}

impl Default for ColorTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// The full mutable state block of a context.
#[derive(Debug)]
pub(crate) struct ContextState {
    pub(crate) matrix_mode: MatrixMode,
    pub(crate) matrices: [Affine; MatrixMode::COUNT],

    pub(crate) fill_rule: FillRule,
    pub(crate) rendering_quality: RenderingQuality,
    pub(crate) blend_mode: BlendMode,

    pub(crate) stroke_line_width: f32,
    pub(crate) stroke_cap: CapStyle,
    pub(crate) stroke_join: JoinStyle,
    pub(crate) stroke_miter_limit: f32,
    pub(crate) dash_pattern: SmallVec<[f32; 8]>,
    pub(crate) dash_phase: f32,
    pub(crate) dash_phase_reset: bool,

    pub(crate) scissoring: bool,
    pub(crate) scissor_rects: SmallVec<[Rect; 4]>,
    pub(crate) masking: bool,

    pub(crate) color_transform: bool,
    pub(crate) color_transform_values: ColorTransform,

    pub(crate) clear_color: Color,
    pub(crate) glyph_origin: Point,

    /// Paint bound for filling; `Handle::INVALID` means the default paint.
    pub(crate) fill_paint: Handle,
    /// Paint bound for stroking; `Handle::INVALID` means the default paint.
    pub(crate) stroke_paint: Handle,
}

impl Default for ContextState {
    fn default() -> Self {
        Self {
            matrix_mode: MatrixMode::default(),
            matrices: [Affine::IDENTITY; MatrixMode::COUNT],
            fill_rule: FillRule::EvenOdd,
            rendering_quality: RenderingQuality::default(),
            blend_mode: BlendMode::default(),
            stroke_line_width: 1.0,
            stroke_cap: CapStyle::default(),
            stroke_join: JoinStyle::default(),
            stroke_miter_limit: 4.0,
            dash_pattern: SmallVec::new(),
            dash_phase: 0.0,
            dash_phase_reset: false,
            scissoring: false,
            scissor_rects: SmallVec::new(),
            masking: false,
            color_transform: false,
            color_transform_values: ColorTransform::IDENTITY,
            clear_color: Color::TRANSPARENT,
            glyph_origin: Point::ZERO,
            fill_paint: Handle::INVALID,
            stroke_paint: Handle::INVALID,
        }
    }
}

impl ContextState {
    pub(crate) fn matrix(&self, mode: MatrixMode) -> Affine {
        self.matrices[mode.index()]
    }

    pub(crate) fn matrix_mut(&mut self, mode: MatrixMode) -> &mut Affine {
        &mut self.matrices[mode.index()]
    }

    /// Releases capacity in the auxiliary dynamic arrays back toward their
    /// used size. Step (a) of the full reclamation pass.
    pub(crate) fn shrink_auxiliary(&mut self) {
        self.dash_pattern.shrink_to_fit();
        self.scissor_rects.shrink_to_fit();
    }
}

/// Clamps a client-supplied scalar to a finite value.
///
/// NaN and infinities are sanitized to `fallback` rather than rejected,
/// except for parameters documented as validating their inputs.
#[inline]
pub(crate) fn sanitize(value: f32, fallback: f32) -> f32 {
    if value.is_finite() { value } else { fallback }
}
