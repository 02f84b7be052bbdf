// Copyright 2025 the Tracery Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tracery Context: a reference-counted vector-graphics rendering context.
//!
//! The [`Context`] ties the Tracery storage crates together into an
//! OpenVG-shaped object model:
//!
//! - **Handles everywhere**: paths, paints, images, mask layers, and fonts
//!   are created, validated, and destroyed through [`Handle`]s backed by a
//!   [`tracery_handle`] table shared across a context sharing group.
//! - **Pooled hot objects**: paths and paints live in [`tracery_pool`]
//!   block pools. Releasing them is deferred; their storage is reclaimed by
//!   the periodic compaction pass, which repoints moved entries' handles.
//! - **Reference counting with cascades**: glyph targets, pattern images,
//!   and bound paints each hold a reference; destroying a font or paint
//!   releases what it references.
//! - **Two-tier reclamation**: a cheap free-list re-sort on a short cadence
//!   and a full pass (pool compaction, table trimming, scratch shrinking,
//!   rasterizer memory retrieval) on a long one, both driven by call
//!   counts. See [`ReclaimCadence`] and [`Context::full_reclaim`].
//! - **An opaque rasterizer seam**: drawing hands resolved work to a
//!   [`RasterBackend`]; [`TraceRaster`] records it for tests.
//!
//! # Example
//!
//! ```rust
//! use kurbo::{PathEl, Point, Vec2};
//! use tracery_context::{Context, PaintModes, TraceRaster};
//!
//! let mut ctx = Context::new();
//! let path = ctx.create_path();
//! ctx.path_append(
//!     path,
//!     &[PathEl::MoveTo(Point::ZERO), PathEl::LineTo(Point::new(4.0, 0.0))],
//! )
//! .unwrap();
//!
//! let font = ctx.create_font(0);
//! ctx.set_glyph_to_path(font, 65, path, false, Point::ZERO, Vec2::new(5.0, 0.0))
//!     .unwrap();
//!
//! let mut raster = TraceRaster::new();
//! ctx.draw_glyphs(font, &[65, 65], None, None, PaintModes::FILL, true, &mut raster)
//!     .unwrap();
//! assert_eq!(raster.draws().len(), 2);
//! assert_eq!(ctx.glyph_origin(), Point::new(10.0, 0.0));
//! ```

#![no_std]

extern crate alloc;

mod context;
mod error;
mod glyphs;
mod params;
mod raster;
mod resources;
mod state;

pub use context::{Context, GroupStats, MAX_IMAGE_DIMENSION};
pub use error::Error;
pub use params::{ContextParam, MAX_DASH_SEGMENTS, MAX_SCISSOR_RECTS, PaintParam};
pub use raster::{BatchDisable, GlyphDraw, PaintModes, RasterBackend, RasterError, TraceRaster};
pub use resources::{
    DEFAULT_POOL_CAPACITY, FontData, ImageData, MaskLayerData, PaintData, PaintType, PathData,
    SpreadMode, TilingMode,
};
pub use state::{
    CapStyle, ColorTransform, FillRule, JoinStyle, MatrixMode, RenderingQuality,
};

pub use tracery_glyph::{Glyph, GlyphTarget};
pub use tracery_handle::{Handle, ObjectKind, ReclaimCadence};
