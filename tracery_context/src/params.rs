// Copyright 2025 the Tracery Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Context and paint parameter get/set surface.
//!
//! Parameters follow a uniform contract: an out-of-range enum code, a wrong
//! element count, or a bad handle records an error and leaves the current
//! value untouched; accepted scalar inputs are sanitized (NaN and
//! infinities replaced, documented clamps applied) rather than rejected.

use alloc::vec::Vec;

use kurbo::{Point, Rect};
use peniko::{BlendMode, Color, ColorStop, Compose, Mix};
use smallvec::SmallVec;

use tracery_handle::{Handle, ObjectKind};

use crate::context::Context;
use crate::error::Error;
use crate::raster::PaintModes;
use crate::resources::{PaintData, PaintType, Slot, SpreadMode, TilingMode};
use crate::state::{
    CapStyle, ColorTransform, FillRule, JoinStyle, MatrixMode, RenderingQuality, sanitize,
};

/// Upper bound on scissor rectangles retained by the context.
pub const MAX_SCISSOR_RECTS: usize = 32;

/// Upper bound on dash pattern segments.
pub const MAX_DASH_SEGMENTS: usize = 16;

/// Context-wide parameters addressable through the get/set surface.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ContextParam {
    /// Which matrix the matrix operations target (integer, [`MatrixMode`]).
    MatrixMode,
    /// Fill rule (integer: 0 even-odd, 1 non-zero).
    FillRule,
    /// Rasterization quality (integer, [`RenderingQuality`]).
    RenderingQuality,
    /// Blend mode (integer: 0 normal, 1 multiply, 2 screen, 3 darken,
    /// 4 lighten; all over the source-over compose).
    BlendMode,
    /// Stroke line width (scalar, clamped non-negative).
    StrokeLineWidth,
    /// Stroke cap style (integer, [`CapStyle`]).
    StrokeCapStyle,
    /// Stroke join style (integer, [`JoinStyle`]).
    StrokeJoinStyle,
    /// Stroke miter limit (scalar, clamped to at least 1).
    StrokeMiterLimit,
    /// Dash segment lengths (vector, up to [`MAX_DASH_SEGMENTS`], each
    /// clamped non-negative; empty disables dashing).
    StrokeDashPattern,
    /// Dash phase (scalar).
    StrokeDashPhase,
    /// Whether the dash phase resets per subpath (boolean integer).
    StrokeDashPhaseReset,
    /// Whether scissoring is enabled (boolean integer).
    Scissoring,
    /// Scissor rectangles as `[x, y, w, h]` quads (vector, up to
    /// [`MAX_SCISSOR_RECTS`] quads; non-positive extents yield an empty
    /// rectangle).
    ScissorRects,
    /// Whether masking is enabled (boolean integer).
    Masking,
    /// Whether the color transform is applied (boolean integer).
    ColorTransform,
    /// Color transform as 4 scale then 4 bias terms (vector of 8).
    ColorTransformValues,
    /// Clear color as RGBA (vector of 4, clamped to 0..=1).
    ClearColor,
    /// Glyph draw origin (vector of 2).
    GlyphOrigin,
}

/// Per-paint parameters addressable through the get/set surface.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PaintParam {
    /// Paint type (integer: 0 color, 1 linear gradient, 2 radial gradient,
    /// 3 pattern).
    Type,
    /// Solid color as RGBA (vector of 4, clamped to 0..=1).
    Color,
    /// Gradient stops as `[offset, r, g, b, a]` quintets (vector, multiple
    /// of 5; colors clamped to 0..=1).
    ColorRampStops,
    /// Gradient spread mode (integer: 0 pad, 1 repeat, 2 reflect).
    ColorRampSpreadMode,
    /// Linear gradient endpoints `[x0, y0, x1, y1]` (vector of 4).
    LinearGradient,
    /// Radial gradient `[cx, cy, fx, fy, r]` (vector of 5).
    RadialGradient,
    /// Pattern tiling mode (integer: 0 fill, 1 pad, 2 repeat, 3 reflect).
    PatternTilingMode,
}

impl Context {
    // ---------------------------------------------------------------------
    // Context parameters
    // ---------------------------------------------------------------------

    /// Sets an integer-valued context parameter.
    pub fn set_i(&mut self, param: ContextParam, value: i32) -> Result<(), Error> {
        match param {
            ContextParam::MatrixMode => {
                let mode = match value {
                    0 => MatrixMode::PathUserToSurface,
                    1 => MatrixMode::ImageUserToSurface,
                    2 => MatrixMode::GlyphUserToSurface,
                    3 => MatrixMode::FillPaintToUser,
                    4 => MatrixMode::StrokePaintToUser,
                    _ => return self.fail(Error::IllegalArgument),
                };
                self.state.matrix_mode = mode;
            }
            ContextParam::FillRule => {
                self.state.fill_rule = match value {
                    0 => FillRule::EvenOdd,
                    1 => FillRule::NonZero,
                    _ => return self.fail(Error::IllegalArgument),
                };
            }
            ContextParam::RenderingQuality => {
                self.state.rendering_quality = match value {
                    0 => RenderingQuality::NonAntialiased,
                    1 => RenderingQuality::Faster,
                    2 => RenderingQuality::Better,
                    _ => return self.fail(Error::IllegalArgument),
                };
            }
            ContextParam::BlendMode => {
                let mix = match value {
                    0 => Mix::Normal,
                    1 => Mix::Multiply,
                    2 => Mix::Screen,
                    3 => Mix::Darken,
                    4 => Mix::Lighten,
                    _ => return self.fail(Error::IllegalArgument),
                };
                self.state.blend_mode = BlendMode::new(mix, Compose::SrcOver);
            }
            ContextParam::StrokeCapStyle => {
                self.state.stroke_cap = match value {
                    0 => CapStyle::Butt,
                    1 => CapStyle::Round,
                    2 => CapStyle::Square,
                    _ => return self.fail(Error::IllegalArgument),
                };
            }
            ContextParam::StrokeJoinStyle => {
                self.state.stroke_join = match value {
                    0 => JoinStyle::Miter,
                    1 => JoinStyle::Round,
                    2 => JoinStyle::Bevel,
                    _ => return self.fail(Error::IllegalArgument),
                };
            }
            ContextParam::StrokeDashPhaseReset => self.state.dash_phase_reset = value != 0,
            ContextParam::Scissoring => self.state.scissoring = value != 0,
            ContextParam::Masking => self.state.masking = value != 0,
            ContextParam::ColorTransform => self.state.color_transform = value != 0,
            _ => return self.fail(Error::IllegalArgument),
        }
        Ok(())
    }

    /// Sets a scalar context parameter.
    pub fn set_f(&mut self, param: ContextParam, value: f32) -> Result<(), Error> {
        match param {
            ContextParam::StrokeLineWidth => {
                self.state.stroke_line_width = sanitize(value, 0.0).max(0.0);
            }
            ContextParam::StrokeMiterLimit => {
                self.state.stroke_miter_limit = sanitize(value, 1.0).max(1.0);
            }
            ContextParam::StrokeDashPhase => {
                self.state.dash_phase = sanitize(value, 0.0);
            }
            _ => return self.fail(Error::IllegalArgument),
        }
        Ok(())
    }

    /// Sets a vector-valued context parameter.
    ///
    /// Scalar parameters also accept a one-element slice.
    pub fn set_fv(&mut self, param: ContextParam, values: &[f32]) -> Result<(), Error> {
        match param {
            ContextParam::StrokeLineWidth
            | ContextParam::StrokeMiterLimit
            | ContextParam::StrokeDashPhase => {
                let [value] = values else {
                    return self.fail(Error::IllegalArgument);
                };
                self.set_f(param, *value)
            }
            ContextParam::GlyphOrigin => {
                let [x, y] = values else {
                    return self.fail(Error::IllegalArgument);
                };
                self.state.glyph_origin =
                    Point::new(f64::from(sanitize(*x, 0.0)), f64::from(sanitize(*y, 0.0)));
                Ok(())
            }
            ContextParam::ClearColor => {
                let [r, g, b, a] = values else {
                    return self.fail(Error::IllegalArgument);
                };
                self.state.clear_color = clamped_color(*r, *g, *b, *a);
                Ok(())
            }
            ContextParam::ColorTransformValues => {
                if values.len() != 8 {
                    return self.fail(Error::IllegalArgument);
                }
                let mut ct = ColorTransform::IDENTITY;
                for (dst, src) in ct.scale.iter_mut().zip(&values[..4]) {
                    *dst = sanitize(*src, 1.0);
                }
                for (dst, src) in ct.bias.iter_mut().zip(&values[4..]) {
                    *dst = sanitize(*src, 0.0);
                }
                self.state.color_transform_values = ct;
                Ok(())
            }
            ContextParam::ScissorRects => {
                if values.len() % 4 != 0 || values.len() / 4 > MAX_SCISSOR_RECTS {
                    return self.fail(Error::IllegalArgument);
                }
                let mut rects: SmallVec<[Rect; 4]> = SmallVec::new();
                for quad in values.chunks_exact(4) {
                    let x = f64::from(sanitize(quad[0], 0.0));
                    let y = f64::from(sanitize(quad[1], 0.0));
                    let w = f64::from(sanitize(quad[2], 0.0)).max(0.0);
                    let h = f64::from(sanitize(quad[3], 0.0)).max(0.0);
                    rects.push(Rect::new(x, y, x + w, y + h));
                }
                self.state.scissor_rects = rects;
                Ok(())
            }
            ContextParam::StrokeDashPattern => {
                if values.len() > MAX_DASH_SEGMENTS {
                    return self.fail(Error::IllegalArgument);
                }
                self.state.dash_pattern = values
                    .iter()
                    .map(|&v| sanitize(v, 0.0).max(0.0))
                    .collect();
                Ok(())
            }
            _ => self.fail(Error::IllegalArgument),
        }
    }

    /// Reads an integer-valued context parameter.
    pub fn get_i(&mut self, param: ContextParam) -> Result<i32, Error> {
        Ok(match param {
            ContextParam::MatrixMode => match self.state.matrix_mode {
                MatrixMode::PathUserToSurface => 0,
                MatrixMode::ImageUserToSurface => 1,
                MatrixMode::GlyphUserToSurface => 2,
                MatrixMode::FillPaintToUser => 3,
                MatrixMode::StrokePaintToUser => 4,
            },
            ContextParam::FillRule => match self.state.fill_rule {
                FillRule::EvenOdd => 0,
                FillRule::NonZero => 1,
            },
            ContextParam::RenderingQuality => match self.state.rendering_quality {
                RenderingQuality::NonAntialiased => 0,
                RenderingQuality::Faster => 1,
                RenderingQuality::Better => 2,
            },
            ContextParam::BlendMode => match self.state.blend_mode.mix {
                Mix::Multiply => 1,
                Mix::Screen => 2,
                Mix::Darken => 3,
                Mix::Lighten => 4,
                _ => 0,
            },
            ContextParam::StrokeCapStyle => match self.state.stroke_cap {
                CapStyle::Butt => 0,
                CapStyle::Round => 1,
                CapStyle::Square => 2,
            },
            ContextParam::StrokeJoinStyle => match self.state.stroke_join {
                JoinStyle::Miter => 0,
                JoinStyle::Round => 1,
                JoinStyle::Bevel => 2,
            },
            ContextParam::StrokeDashPhaseReset => i32::from(self.state.dash_phase_reset),
            ContextParam::Scissoring => i32::from(self.state.scissoring),
            ContextParam::Masking => i32::from(self.state.masking),
            ContextParam::ColorTransform => i32::from(self.state.color_transform),
            _ => return self.fail_get(Error::IllegalArgument),
        })
    }

    /// Reads a scalar context parameter.
    pub fn get_f(&mut self, param: ContextParam) -> Result<f32, Error> {
        Ok(match param {
            ContextParam::StrokeLineWidth => self.state.stroke_line_width,
            ContextParam::StrokeMiterLimit => self.state.stroke_miter_limit,
            ContextParam::StrokeDashPhase => self.state.dash_phase,
            _ => return self.fail_get(Error::IllegalArgument),
        })
    }

    /// Reads a vector-valued context parameter.
    ///
    /// Geometry held in `f64` internally is narrowed back to the `f32`
    /// client representation.
    #[expect(
        clippy::cast_possible_truncation,
        reason = "parameters round-trip through the f32 client representation"
    )]
    pub fn get_fv(&mut self, param: ContextParam) -> Result<Vec<f32>, Error> {
        Ok(match param {
            ContextParam::StrokeLineWidth
            | ContextParam::StrokeMiterLimit
            | ContextParam::StrokeDashPhase => alloc::vec![self.get_f(param)?],
            ContextParam::GlyphOrigin => {
                let p = self.state.glyph_origin;
                alloc::vec![p.x as f32, p.y as f32]
            }
            ContextParam::ClearColor => self.state.clear_color.components.to_vec(),
            ContextParam::ColorTransformValues => {
                let ct = self.state.color_transform_values;
                let mut out = Vec::with_capacity(8);
                out.extend_from_slice(&ct.scale);
                out.extend_from_slice(&ct.bias);
                out
            }
            ContextParam::ScissorRects => {
                let mut out = Vec::with_capacity(self.state.scissor_rects.len() * 4);
                for rect in &self.state.scissor_rects {
                    out.push(rect.x0 as f32);
                    out.push(rect.y0 as f32);
                    out.push(rect.width() as f32);
                    out.push(rect.height() as f32);
                }
                out
            }
            ContextParam::StrokeDashPattern => self.state.dash_pattern.to_vec(),
            _ => return self.fail_get(Error::IllegalArgument),
        })
    }

    fn fail_get<T>(&mut self, error: Error) -> Result<T, Error> {
        self.record(error);
        Err(error)
    }

    // ---------------------------------------------------------------------
    // Paint parameters and binding
    // ---------------------------------------------------------------------

    /// Sets an integer-valued paint parameter.
    pub fn set_paint_i(
        &mut self,
        paint: Handle,
        param: PaintParam,
        value: i32,
    ) -> Result<(), Error> {
        let decoded = match param {
            PaintParam::Type => {
                let paint_type = match value {
                    0 => PaintType::Color,
                    1 => PaintType::LinearGradient,
                    2 => PaintType::RadialGradient,
                    3 => PaintType::Pattern,
                    _ => return self.fail(Error::IllegalArgument),
                };
                PaintUpdate::Type(paint_type)
            }
            PaintParam::ColorRampSpreadMode => {
                let spread = match value {
                    0 => SpreadMode::Pad,
                    1 => SpreadMode::Repeat,
                    2 => SpreadMode::Reflect,
                    _ => return self.fail(Error::IllegalArgument),
                };
                PaintUpdate::Spread(spread)
            }
            PaintParam::PatternTilingMode => {
                let tiling = match value {
                    0 => TilingMode::Fill,
                    1 => TilingMode::Pad,
                    2 => TilingMode::Repeat,
                    3 => TilingMode::Reflect,
                    _ => return self.fail(Error::IllegalArgument),
                };
                PaintUpdate::Tiling(tiling)
            }
            _ => return self.fail(Error::IllegalArgument),
        };
        self.update_paint(paint, decoded)
    }

    /// Sets a vector-valued paint parameter.
    pub fn set_paint_fv(
        &mut self,
        paint: Handle,
        param: PaintParam,
        values: &[f32],
    ) -> Result<(), Error> {
        let decoded = match param {
            PaintParam::Color => {
                let [r, g, b, a] = values else {
                    return self.fail(Error::IllegalArgument);
                };
                PaintUpdate::Color(clamped_color(*r, *g, *b, *a))
            }
            PaintParam::ColorRampStops => {
                if values.len() % 5 != 0 {
                    return self.fail(Error::IllegalArgument);
                }
                let stops = values
                    .chunks_exact(5)
                    .map(|q| {
                        ColorStop::from((
                            sanitize(q[0], 0.0),
                            clamped_color(q[1], q[2], q[3], q[4]),
                        ))
                    })
                    .collect();
                PaintUpdate::Stops(stops)
            }
            PaintParam::LinearGradient => {
                let [x0, y0, x1, y1] = values else {
                    return self.fail(Error::IllegalArgument);
                };
                PaintUpdate::Linear(
                    sanitized_point(*x0, *y0),
                    sanitized_point(*x1, *y1),
                )
            }
            PaintParam::RadialGradient => {
                let [cx, cy, fx, fy, r] = values else {
                    return self.fail(Error::IllegalArgument);
                };
                PaintUpdate::Radial(
                    sanitized_point(*cx, *cy),
                    sanitized_point(*fx, *fy),
                    f64::from(sanitize(*r, 0.0)).max(0.0),
                )
            }
            _ => return self.fail(Error::IllegalArgument),
        };
        self.update_paint(paint, decoded)
    }

    /// Reads an integer-valued paint parameter.
    pub fn get_paint_i(&mut self, paint: Handle, param: PaintParam) -> Result<i32, Error> {
        self.read_paint(paint, |data| match param {
            PaintParam::Type => Some(match data.paint_type {
                PaintType::Color => 0,
                PaintType::LinearGradient => 1,
                PaintType::RadialGradient => 2,
                PaintType::Pattern => 3,
            }),
            PaintParam::ColorRampSpreadMode => Some(match data.ramp_spread {
                SpreadMode::Pad => 0,
                SpreadMode::Repeat => 1,
                SpreadMode::Reflect => 2,
            }),
            PaintParam::PatternTilingMode => Some(match data.tiling {
                TilingMode::Fill => 0,
                TilingMode::Pad => 1,
                TilingMode::Repeat => 2,
                TilingMode::Reflect => 3,
            }),
            _ => None,
        })
    }

    /// Reads a vector-valued paint parameter.
    #[expect(
        clippy::cast_possible_truncation,
        reason = "parameters round-trip through the f32 client representation"
    )]
    pub fn get_paint_fv(&mut self, paint: Handle, param: PaintParam) -> Result<Vec<f32>, Error> {
        self.read_paint(paint, |data| match param {
            PaintParam::Color => Some(data.color.components.to_vec()),
            PaintParam::ColorRampStops => {
                let mut out = Vec::with_capacity(data.stops.len() * 5);
                for stop in &data.stops {
                    out.push(stop.offset);
                    out.extend_from_slice(&stop.color.components);
                }
                Some(out)
            }
            PaintParam::LinearGradient => {
                let (p0, p1) = data.linear;
                Some(alloc::vec![
                    p0.x as f32,
                    p0.y as f32,
                    p1.x as f32,
                    p1.y as f32,
                ])
            }
            PaintParam::RadialGradient => {
                let (center, focal, radius) = data.radial;
                Some(alloc::vec![
                    center.x as f32,
                    center.y as f32,
                    focal.x as f32,
                    focal.y as f32,
                    radius as f32,
                ])
            }
            _ => None,
        })
    }

    /// Binds `paint` as the fill and/or stroke paint.
    ///
    /// [`Handle::INVALID`] unbinds, restoring the default paint for the
    /// given modes. A bound paint holds a reference for as long as it stays
    /// bound.
    pub fn set_paint(&mut self, paint: Handle, modes: PaintModes) -> Result<(), Error> {
        if modes.is_empty() {
            return self.fail(Error::IllegalArgument);
        }
        let valid = !paint.is_valid()
            || self.shared.borrow().live_kind(paint) == Some(ObjectKind::Paint);
        if !valid {
            return self.fail(Error::BadHandle);
        }

        let mut released: SmallVec<[Handle; 2]> = SmallVec::new();
        {
            let mut shared = self.shared.borrow_mut();
            for _ in 0..modes.bits().count_ones() {
                if paint.is_valid() {
                    shared.inc_ref(paint);
                }
            }
        }
        if modes.contains(PaintModes::FILL) {
            let old = core::mem::replace(&mut self.state.fill_paint, paint);
            if old.is_valid() {
                released.push(old);
            }
        }
        if modes.contains(PaintModes::STROKE) {
            let old = core::mem::replace(&mut self.state.stroke_paint, paint);
            if old.is_valid() {
                released.push(old);
            }
        }
        for old in released {
            self.release_handle(old);
        }
        self.maybe_full_pass();
        Ok(())
    }

    /// The paint bound for the given single mode, or [`Handle::INVALID`]
    /// for the default paint.
    pub fn paint(&mut self, mode: PaintModes) -> Result<Handle, Error> {
        if mode == PaintModes::FILL {
            Ok(self.state.fill_paint)
        } else if mode == PaintModes::STROKE {
            Ok(self.state.stroke_paint)
        } else {
            self.fail_get(Error::IllegalArgument)
        }
    }

    /// Installs `image` as the pattern of `paint`, releasing any previous
    /// pattern image.
    ///
    /// [`Handle::INVALID`] clears the pattern; a paint whose type is
    /// `Pattern` but whose pattern is unset draws as its solid color.
    pub fn paint_pattern(&mut self, paint: Handle, image: Handle) -> Result<(), Error> {
        let outcome = {
            let mut shared = self.shared.borrow_mut();
            let shared = &mut *shared;

            let pool_ref = match shared.table.get(paint) {
                Some(Slot::Paint(pool_ref)) => Some(*pool_ref),
                _ => None,
            }
            .filter(|r| shared.paints.get(*r).is_some_and(|entry| !entry.destroyed));
            let image_ok =
                !image.is_valid() || shared.live_kind(image) == Some(ObjectKind::Image);
            match pool_ref {
                Some(pool_ref) if image_ok => {
                    if image.is_valid() {
                        shared.inc_ref(image);
                    }
                    let entry = shared.paints.get_mut(pool_ref).expect("paint entry");
                    let previous = core::mem::replace(
                        &mut entry.pattern,
                        image.is_valid().then_some(image),
                    );
                    Ok(previous)
                }
                _ => Err(Error::BadHandle),
            }
        };
        match outcome {
            Ok(previous) => {
                if let Some(previous) = previous {
                    self.release_handle(previous);
                }
                Ok(())
            }
            Err(error) => self.fail(error),
        }
    }

    fn update_paint(&mut self, paint: Handle, update: PaintUpdate) -> Result<(), Error> {
        let ok = {
            let mut shared = self.shared.borrow_mut();
            let shared = &mut *shared;
            let pool_ref = match shared.table.get(paint) {
                Some(Slot::Paint(pool_ref)) => Some(*pool_ref),
                _ => None,
            };
            match pool_ref.and_then(|r| shared.paints.get_mut(r)) {
                Some(entry) if !entry.destroyed => {
                    match update {
                        PaintUpdate::Type(t) => entry.paint_type = t,
                        PaintUpdate::Color(c) => entry.color = c,
                        PaintUpdate::Stops(stops) => entry.stops = stops,
                        PaintUpdate::Spread(s) => entry.ramp_spread = s,
                        PaintUpdate::Tiling(t) => entry.tiling = t,
                        PaintUpdate::Linear(p0, p1) => entry.linear = (p0, p1),
                        PaintUpdate::Radial(center, focal, radius) => {
                            entry.radial = (center, focal, radius);
                        }
                    }
                    true
                }
                _ => false,
            }
        };
        if ok { Ok(()) } else { self.fail(Error::BadHandle) }
    }

    fn read_paint<T>(
        &mut self,
        paint: Handle,
        read: impl FnOnce(&PaintData) -> Option<T>,
    ) -> Result<T, Error> {
        let value = {
            let shared = self.shared.borrow();
            match shared.table.get(paint) {
                Some(Slot::Paint(pool_ref)) => shared
                    .paints
                    .get(*pool_ref)
                    .filter(|entry| !entry.destroyed)
                    .map(|entry| read(entry).ok_or(Error::IllegalArgument)),
                _ => None,
            }
        };
        match value {
            Some(result) => result.map_err(|error| {
                self.record(error);
                error
            }),
            None => self.fail_get(Error::BadHandle),
        }
    }
}

/// A decoded paint mutation, applied once the paint handle resolves.
enum PaintUpdate {
    Type(PaintType),
    Color(Color),
    Stops(Vec<ColorStop>),
    Spread(SpreadMode),
    Tiling(TilingMode),
    Linear(Point, Point),
    Radial(Point, Point, f64),
}

fn clamped_color(r: f32, g: f32, b: f32, a: f32) -> Color {
    Color::new([
        sanitize(r, 0.0).clamp(0.0, 1.0),
        sanitize(g, 0.0).clamp(0.0, 1.0),
        sanitize(b, 0.0).clamp(0.0, 1.0),
        sanitize(a, 1.0).clamp(0.0, 1.0),
    ])
}

fn sanitized_point(x: f32, y: f32) -> Point {
    Point::new(f64::from(sanitize(x, 0.0)), f64::from(sanitize(y, 0.0)))
}
