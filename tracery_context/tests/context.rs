// Copyright 2025 the Tracery Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! End-to-end lifecycle tests: creation, reference counting, cascaded
//! release, compaction, and batched glyph drawing.

use kurbo::{Affine, PathEl, Point, Vec2};
use tracery_context::{
    Context, ContextParam, Error, Handle, ObjectKind, PaintModes, PaintParam, ReclaimCadence,
    TraceRaster,
};

/// Tuning with automatic passes disabled, so tests drive reclamation
/// explicitly.
fn manual_context(pool_capacity: usize) -> Context {
    Context::with_tuning(
        ReclaimCadence {
            sort_period: 0,
            full_period: 0,
        },
        pool_capacity,
    )
}

fn line_path(ctx: &mut Context) -> Handle {
    let path = ctx.create_path();
    ctx.path_append(
        path,
        &[
            PathEl::MoveTo(Point::ZERO),
            PathEl::LineTo(Point::new(8.0, 0.0)),
        ],
    )
    .unwrap();
    path
}

#[test]
fn create_validate_destroy_roundtrip() {
    let mut ctx = manual_context(4);
    let path = ctx.create_path();
    let paint = ctx.create_paint();
    let image = ctx.create_image(16, 16);
    let font = ctx.create_font(0);

    assert_eq!(ctx.validate(path), Some(ObjectKind::Path));
    assert_eq!(ctx.validate(paint), Some(ObjectKind::Paint));
    assert_eq!(ctx.validate(image), Some(ObjectKind::Image));
    assert_eq!(ctx.validate(font), Some(ObjectKind::Font));
    assert_eq!(ctx.validate(Handle::INVALID), None);

    ctx.destroy(path).unwrap();
    ctx.destroy(paint).unwrap();
    ctx.destroy(image).unwrap();
    ctx.destroy(font).unwrap();
    assert_eq!(ctx.validate(path), None);
    assert_eq!(ctx.validate(image), None);
    assert_eq!(ctx.take_error(), None);
}

#[test]
fn destroy_unknown_handle_records_bad_handle() {
    let mut ctx = manual_context(4);
    let path = ctx.create_path();
    ctx.destroy(path).unwrap();
    assert_eq!(ctx.destroy(path), Err(Error::BadHandle));
    assert_eq!(ctx.take_error(), Some(Error::BadHandle));
    // take_error clears.
    assert_eq!(ctx.take_error(), None);
}

#[test]
fn last_error_is_overwritten_by_newer_failures() {
    let mut ctx = manual_context(4);
    let _ = ctx.create_image(0, 0);
    assert_eq!(ctx.last_error(), Some(Error::IllegalArgument));
    let _ = ctx.destroy(Handle(999));
    assert_eq!(ctx.take_error(), Some(Error::BadHandle));
}

#[test]
fn oversized_image_is_rejected_without_allocation() {
    let mut ctx = manual_context(4);
    let image = ctx.create_image(1, 20_000);
    assert!(!image.is_valid());
    assert_eq!(ctx.take_error(), Some(Error::IllegalArgument));
}

#[test]
fn compaction_frees_an_emptied_block_and_repoints_the_survivor() {
    let mut ctx = manual_context(4);
    let paths: Vec<Handle> = (0..8).map(|_| line_path(&mut ctx)).collect();
    assert_eq!(ctx.group_stats().path_blocks, 2);

    // Free everything except the last entry of the second block.
    for &p in &paths[..7] {
        ctx.destroy(p).unwrap();
    }
    let survivor = paths[7];
    assert_eq!(ctx.group_stats().path_entries, 8);

    ctx.full_reclaim();

    let stats = ctx.group_stats();
    assert_eq!(stats.path_blocks, 1);
    assert_eq!(stats.path_entries, 1);
    assert_eq!(stats.live_paths, 1);

    // The survivor's handle still resolves to the moved entry.
    assert_eq!(ctx.validate(survivor), Some(ObjectKind::Path));
    assert_eq!(ctx.path_element_count(survivor), Some(2));
    ctx.path_append(survivor, &[PathEl::ClosePath]).unwrap();
    assert_eq!(ctx.path_element_count(survivor), Some(3));
}

#[test]
fn glyph_targets_hold_references_and_release_on_redefine() {
    let mut ctx = manual_context(4);
    let path_a = line_path(&mut ctx);
    let path_b = line_path(&mut ctx);
    let font = ctx.create_font(0);

    for glyph in 0..5 {
        ctx.set_glyph_to_path(font, glyph, path_a, false, Point::ZERO, Vec2::new(4.0, 0.0))
            .unwrap();
    }
    assert_eq!(ctx.ref_count(path_a), Some(6));

    for glyph in 0..5 {
        ctx.set_glyph_to_path(font, glyph, path_b, false, Point::ZERO, Vec2::new(4.0, 0.0))
            .unwrap();
    }
    assert_eq!(ctx.ref_count(path_a), Some(1));
    assert_eq!(ctx.ref_count(path_b), Some(6));

    // The creation reference was the last one.
    ctx.destroy(path_a).unwrap();
    assert_eq!(ctx.validate(path_a), None);
    assert_eq!(ctx.validate(path_b), Some(ObjectKind::Path));
}

#[test]
fn destroying_a_font_releases_every_glyph_target() {
    let mut ctx = manual_context(4);
    let path = line_path(&mut ctx);
    let image = ctx.create_image(8, 8);
    let font = ctx.create_font(0);

    ctx.set_glyph_to_path(font, 1, path, false, Point::ZERO, Vec2::ZERO)
        .unwrap();
    ctx.set_glyph_to_image(font, 2, image, Point::ZERO, Vec2::ZERO)
        .unwrap();

    // Drop the creation references; the handles go client-dead but the
    // glyph references keep both payloads alive.
    ctx.destroy(path).unwrap();
    ctx.destroy(image).unwrap();
    assert_eq!(ctx.validate(path), None);
    assert_eq!(ctx.validate(image), None);
    assert_eq!(ctx.ref_count(path), Some(1));
    assert_eq!(ctx.ref_count(image), Some(1));

    ctx.destroy(font).unwrap();
    assert_eq!(ctx.ref_count(path), None);
    assert_eq!(ctx.ref_count(image), None);
}

#[test]
fn destroyed_path_goes_client_dead_while_glyphs_keep_it_alive() {
    let mut ctx = manual_context(4);
    let path = line_path(&mut ctx);
    let font = ctx.create_font(0);
    ctx.set_glyph_to_path(font, 1, path, false, Point::ZERO, Vec2::new(2.0, 0.0))
        .unwrap();

    ctx.destroy(path).unwrap();
    assert_eq!(ctx.validate(path), None);
    assert_eq!(ctx.path_element_count(path), None);
    assert_eq!(
        ctx.path_append(path, &[PathEl::ClosePath]),
        Err(Error::BadHandle)
    );
    assert_eq!(ctx.path_clear(path), Err(Error::BadHandle));
    assert_eq!(ctx.destroy(path), Err(Error::BadHandle));
    assert_eq!(
        ctx.set_glyph_to_path(font, 2, path, false, Point::ZERO, Vec2::ZERO),
        Err(Error::BadHandle)
    );

    // The glyph's reference keeps the payload alive and drawable.
    assert_eq!(ctx.ref_count(path), Some(1));
    let mut raster = TraceRaster::new();
    ctx.draw_glyphs(font, &[1], None, None, PaintModes::FILL, true, &mut raster)
        .unwrap();
    assert_eq!(raster.draws().len(), 1);

    // Releasing the last reference frees the slot for real.
    ctx.clear_glyph(font, 1).unwrap();
    assert_eq!(ctx.ref_count(path), None);
}

#[test]
fn destroyed_paint_rejects_parameter_access_and_rebinding() {
    let mut ctx = manual_context(4);
    let paint = ctx.create_paint();
    ctx.set_paint(paint, PaintModes::FILL).unwrap();

    ctx.destroy(paint).unwrap();
    assert_eq!(ctx.set_paint_i(paint, PaintParam::Type, 1), Err(Error::BadHandle));
    assert_eq!(ctx.get_paint_i(paint, PaintParam::Type), Err(Error::BadHandle));
    assert_eq!(
        ctx.set_paint(paint, PaintModes::STROKE),
        Err(Error::BadHandle)
    );
    assert_eq!(
        ctx.paint_pattern(paint, Handle::INVALID),
        Err(Error::BadHandle)
    );
}

#[test]
fn clearing_a_glyph_releases_its_target() {
    let mut ctx = manual_context(4);
    let path = line_path(&mut ctx);
    let font = ctx.create_font(0);
    ctx.set_glyph_to_path(font, 7, path, false, Point::ZERO, Vec2::ZERO)
        .unwrap();
    assert_eq!(ctx.ref_count(path), Some(2));

    ctx.clear_glyph(font, 7).unwrap();
    assert_eq!(ctx.ref_count(path), Some(1));

    assert_eq!(ctx.clear_glyph(font, 7), Err(Error::IllegalArgument));
    assert_eq!(ctx.take_error(), Some(Error::IllegalArgument));
}

#[test]
fn clearing_a_glyph_runs_a_due_full_pass() {
    let mut ctx = Context::with_tuning(
        ReclaimCadence {
            sort_period: 0,
            full_period: 3,
        },
        4,
    );
    let path = ctx.create_path();
    let font = ctx.create_font(0);
    ctx.set_glyph_to_path(font, 1, path, false, Point::ZERO, Vec2::ZERO)
        .unwrap();
    ctx.destroy(path).unwrap();

    // The cascaded release inside clear_glyph removes the path's handle,
    // which is the third table call: the full pass comes due and must fire
    // here, compacting the dead entry away.
    ctx.clear_glyph(font, 1).unwrap();
    let stats = ctx.group_stats();
    assert_eq!(stats.path_entries, 0);
    assert_eq!(stats.path_blocks, 0);
}

#[test]
fn invalid_target_defines_a_glyph_with_no_visual() {
    let mut ctx = manual_context(4);
    let font = ctx.create_font(0);
    ctx.set_glyph_to_path(
        font,
        32,
        Handle::INVALID,
        false,
        Point::ZERO,
        Vec2::new(3.0, 0.0),
    )
    .unwrap();

    let mut raster = TraceRaster::new();
    ctx.draw_glyphs(font, &[32, 32], None, None, PaintModes::FILL, true, &mut raster)
        .unwrap();
    assert!(raster.draws().is_empty());
    assert_eq!(ctx.glyph_origin(), Point::new(6.0, 0.0));
}

#[test]
fn paint_pattern_holds_a_reference_and_cascades_on_destroy() {
    let mut ctx = manual_context(4);
    let paint = ctx.create_paint();
    let image = ctx.create_image(4, 4);
    ctx.paint_pattern(paint, image).unwrap();
    assert_eq!(ctx.ref_count(image), Some(2));

    ctx.destroy(image).unwrap();
    assert_eq!(ctx.validate(image), None);
    assert_eq!(ctx.ref_count(image), Some(1));

    ctx.destroy(paint).unwrap();
    assert_eq!(ctx.validate(paint), None);
    assert_eq!(ctx.ref_count(image), None);
}

#[test]
fn bound_paint_survives_destroy_until_unbound() {
    let mut ctx = manual_context(4);
    let paint = ctx.create_paint();
    ctx.set_paint(paint, PaintModes::FILL).unwrap();
    assert_eq!(ctx.ref_count(paint), Some(2));

    ctx.destroy(paint).unwrap();
    assert_eq!(ctx.validate(paint), None);
    assert_eq!(ctx.ref_count(paint), Some(1));
    assert_eq!(ctx.paint(PaintModes::FILL).unwrap(), paint);

    ctx.set_paint(Handle::INVALID, PaintModes::FILL).unwrap();
    assert_eq!(ctx.ref_count(paint), None);
}

#[test]
fn binding_one_paint_for_both_modes_takes_two_references() {
    let mut ctx = manual_context(4);
    let paint = ctx.create_paint();
    ctx.set_paint(paint, PaintModes::FILL | PaintModes::STROKE)
        .unwrap();
    assert_eq!(ctx.ref_count(paint), Some(3));
    assert_eq!(ctx.paint(PaintModes::FILL).unwrap(), paint);
    assert_eq!(ctx.paint(PaintModes::STROKE).unwrap(), paint);

    ctx.set_paint(Handle::INVALID, PaintModes::FILL | PaintModes::STROKE)
        .unwrap();
    assert_eq!(ctx.ref_count(paint), Some(1));
}

#[test]
fn locked_image_cannot_be_destroyed() {
    let mut ctx = manual_context(4);
    let image = ctx.create_image(8, 8);
    ctx.lock_image(image).unwrap();
    ctx.lock_image(image).unwrap();

    assert_eq!(ctx.destroy(image), Err(Error::ImageInUse));
    assert_eq!(ctx.validate(image), Some(ObjectKind::Image));

    ctx.unlock_image(image).unwrap();
    assert_eq!(ctx.destroy(image), Err(Error::ImageInUse));

    ctx.unlock_image(image).unwrap();
    ctx.destroy(image).unwrap();
    assert_eq!(ctx.validate(image), None);
}

#[test]
fn unlocking_an_unlocked_image_is_an_illegal_argument() {
    let mut ctx = manual_context(4);
    let image = ctx.create_image(4, 4);

    // The handle itself is fine; only the lock state is wrong.
    assert_eq!(ctx.unlock_image(image), Err(Error::IllegalArgument));

    ctx.lock_image(image).unwrap();
    ctx.unlock_image(image).unwrap();
    assert_eq!(ctx.unlock_image(image), Err(Error::IllegalArgument));

    assert_eq!(ctx.unlock_image(Handle(777)), Err(Error::BadHandle));
    assert_eq!(ctx.take_error(), Some(Error::BadHandle));
}

#[test]
fn shared_contexts_see_one_handle_space() {
    let mut a = manual_context(4);
    let mut b = Context::with_shared(&a);
    assert_eq!(a.group_size(), 2);

    let path = line_path(&mut a);
    assert_eq!(b.validate(path), Some(ObjectKind::Path));
    b.path_append(path, &[PathEl::ClosePath]).unwrap();
    assert_eq!(a.path_element_count(path), Some(3));

    // Dropping one context leaves the group (and the handle) alive.
    drop(a);
    assert_eq!(b.group_size(), 1);
    assert_eq!(b.validate(path), Some(ObjectKind::Path));
    b.destroy(path).unwrap();
}

#[test]
fn singular_glyph_matrix_advances_origins_without_drawing() {
    let mut ctx = manual_context(4);
    let path = line_path(&mut ctx);
    let font = ctx.create_font(0);
    ctx.set_glyph_to_path(font, 1, path, false, Point::ZERO, Vec2::new(2.0, 1.0))
        .unwrap();

    ctx.set_matrix_mode(tracery_context::MatrixMode::GlyphUserToSurface);
    ctx.load_matrix(Affine::scale(0.0));

    let mut raster = TraceRaster::new();
    ctx.draw_glyphs(font, &[1, 1, 1], None, None, PaintModes::FILL, true, &mut raster)
        .unwrap();
    assert!(raster.draws().is_empty());
    assert_eq!(ctx.glyph_origin(), Point::new(6.0, 3.0));
}

#[test]
fn undefined_glyph_rejects_the_whole_batch_before_any_origin_moves() {
    let mut ctx = manual_context(4);
    let path = line_path(&mut ctx);
    let font = ctx.create_font(0);
    ctx.set_glyph_to_path(font, 1, path, false, Point::ZERO, Vec2::new(2.0, 0.0))
        .unwrap();

    let mut raster = TraceRaster::new();
    assert_eq!(
        ctx.draw_glyphs(font, &[1, 99], None, None, PaintModes::FILL, true, &mut raster),
        Err(Error::IllegalArgument)
    );
    assert!(raster.draws().is_empty());
    assert_eq!(ctx.glyph_origin(), Point::ZERO);
}

#[test]
fn adjustment_length_mismatch_is_rejected() {
    let mut ctx = manual_context(4);
    let font = ctx.create_font(0);
    let mut raster = TraceRaster::new();
    assert_eq!(
        ctx.draw_glyphs(
            font,
            &[1, 2],
            Some(&[0.5]),
            None,
            PaintModes::FILL,
            true,
            &mut raster,
        ),
        Err(Error::IllegalArgument)
    );
}

#[test]
fn adjustments_add_to_escapements() {
    let mut ctx = manual_context(4);
    let path = line_path(&mut ctx);
    let font = ctx.create_font(0);
    ctx.set_glyph_to_path(font, 1, path, false, Point::ZERO, Vec2::new(4.0, 0.0))
        .unwrap();

    let mut raster = TraceRaster::new();
    ctx.draw_glyphs(
        font,
        &[1, 1],
        Some(&[1.0, f32::NAN]),
        Some(&[0.5, 0.5]),
        PaintModes::FILL,
        true,
        &mut raster,
    )
    .unwrap();
    // NaN adjustments sanitize to zero.
    assert_eq!(ctx.glyph_origin(), Point::new(9.0, 1.0));
    assert_eq!(raster.draws().len(), 2);
}

#[test]
fn backend_failure_is_recorded_but_the_batch_completes() {
    let mut ctx = manual_context(4);
    let path = line_path(&mut ctx);
    let font = ctx.create_font(0);
    ctx.set_glyph_to_path(font, 1, path, false, Point::ZERO, Vec2::new(2.0, 0.0))
        .unwrap();

    let mut raster = TraceRaster::new();
    raster.fail_at = Some(1);
    assert_eq!(
        ctx.draw_glyphs(font, &[1, 1, 1], None, None, PaintModes::FILL, true, &mut raster),
        Err(Error::OutOfMemory)
    );
    assert_eq!(raster.draws().len(), 2);
    assert_eq!(ctx.glyph_origin(), Point::new(6.0, 0.0));
    assert_eq!(ctx.take_error(), Some(Error::OutOfMemory));
}

#[test]
fn full_pass_schedules_rasterizer_memory_retrieval() {
    let mut ctx = manual_context(4);
    let path = line_path(&mut ctx);
    let font = ctx.create_font(0);
    ctx.set_glyph_to_path(font, 1, path, false, Point::ZERO, Vec2::new(2.0, 0.0))
        .unwrap();

    ctx.full_reclaim();

    let mut raster = TraceRaster::new();
    ctx.draw_glyphs(font, &[1], None, None, PaintModes::FILL, true, &mut raster)
        .unwrap();
    assert_eq!(raster.retrievals(), 1);

    // The retrieval fires once per pass, not per draw.
    ctx.draw_glyphs(font, &[1], None, None, PaintModes::FILL, true, &mut raster)
        .unwrap();
    assert_eq!(raster.retrievals(), 1);
}

#[test]
fn automatic_full_pass_fires_on_the_configured_cadence() {
    let mut ctx = Context::with_tuning(
        ReclaimCadence {
            sort_period: 0,
            full_period: 8,
        },
        4,
    );
    // Churn enough create/destroy pairs to cross the period.
    for _ in 0..8 {
        let p = ctx.create_path();
        ctx.destroy(p).unwrap();
    }
    // The pass compacted the pool: all entries were dead.
    let stats = ctx.group_stats();
    assert_eq!(stats.path_entries, 0);
    assert_eq!(stats.path_blocks, 0);
}

#[test]
fn context_params_roundtrip_and_validate() {
    let mut ctx = manual_context(4);

    ctx.set_i(ContextParam::MatrixMode, 2).unwrap();
    assert_eq!(ctx.get_i(ContextParam::MatrixMode).unwrap(), 2);
    assert_eq!(ctx.set_i(ContextParam::MatrixMode, 5), Err(Error::IllegalArgument));
    assert_eq!(ctx.get_i(ContextParam::MatrixMode).unwrap(), 2);

    ctx.set_i(ContextParam::BlendMode, 3).unwrap();
    assert_eq!(ctx.get_i(ContextParam::BlendMode).unwrap(), 3);

    ctx.set_f(ContextParam::StrokeLineWidth, 2.5).unwrap();
    assert_eq!(ctx.get_f(ContextParam::StrokeLineWidth).unwrap(), 2.5);
    ctx.set_f(ContextParam::StrokeLineWidth, f32::NAN).unwrap();
    assert_eq!(ctx.get_f(ContextParam::StrokeLineWidth).unwrap(), 0.0);

    ctx.set_f(ContextParam::StrokeMiterLimit, 0.25).unwrap();
    assert_eq!(ctx.get_f(ContextParam::StrokeMiterLimit).unwrap(), 1.0);

    ctx.set_fv(ContextParam::ClearColor, &[2.0, 0.5, -1.0, 0.5])
        .unwrap();
    assert_eq!(
        ctx.get_fv(ContextParam::ClearColor).unwrap(),
        vec![1.0, 0.5, 0.0, 0.5]
    );

    ctx.set_fv(ContextParam::GlyphOrigin, &[3.0, 4.0]).unwrap();
    assert_eq!(ctx.glyph_origin(), Point::new(3.0, 4.0));
    assert_eq!(
        ctx.set_fv(ContextParam::GlyphOrigin, &[1.0]),
        Err(Error::IllegalArgument)
    );

    ctx.set_fv(ContextParam::ColorTransformValues, &[1.0; 8]).unwrap();
    assert_eq!(
        ctx.get_fv(ContextParam::ColorTransformValues).unwrap(),
        vec![1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0]
    );
}

#[test]
fn scissor_rects_clamp_negative_extents_to_empty() {
    let mut ctx = manual_context(4);
    ctx.set_fv(
        ContextParam::ScissorRects,
        &[0.0, 0.0, 10.0, 10.0, 5.0, 5.0, -4.0, 8.0],
    )
    .unwrap();
    assert_eq!(
        ctx.get_fv(ContextParam::ScissorRects).unwrap(),
        vec![0.0, 0.0, 10.0, 10.0, 5.0, 5.0, 0.0, 8.0]
    );

    // Not a multiple of four.
    assert_eq!(
        ctx.set_fv(ContextParam::ScissorRects, &[1.0, 2.0, 3.0]),
        Err(Error::IllegalArgument)
    );
}

#[test]
fn paint_params_roundtrip() {
    let mut ctx = manual_context(4);
    let paint = ctx.create_paint();

    assert_eq!(ctx.get_paint_i(paint, PaintParam::Type).unwrap(), 0);
    ctx.set_paint_i(paint, PaintParam::Type, 1).unwrap();
    assert_eq!(ctx.get_paint_i(paint, PaintParam::Type).unwrap(), 1);

    ctx.set_paint_fv(paint, PaintParam::LinearGradient, &[0.0, 0.0, 10.0, 5.0])
        .unwrap();
    assert_eq!(
        ctx.get_paint_fv(paint, PaintParam::LinearGradient).unwrap(),
        vec![0.0, 0.0, 10.0, 5.0]
    );

    ctx.set_paint_fv(
        paint,
        PaintParam::ColorRampStops,
        &[0.0, 1.0, 0.0, 0.0, 1.0, 1.0, 0.0, 0.0, 1.0, 1.0],
    )
    .unwrap();
    assert_eq!(
        ctx.get_paint_fv(paint, PaintParam::ColorRampStops)
            .unwrap()
            .len(),
        10
    );
    assert_eq!(
        ctx.set_paint_fv(paint, PaintParam::ColorRampStops, &[0.5, 1.0, 1.0]),
        Err(Error::IllegalArgument)
    );

    ctx.set_paint_i(paint, PaintParam::ColorRampSpreadMode, 2).unwrap();
    assert_eq!(
        ctx.get_paint_i(paint, PaintParam::ColorRampSpreadMode).unwrap(),
        2
    );

    let bogus = Handle(1234);
    assert_eq!(
        ctx.set_paint_i(bogus, PaintParam::Type, 0),
        Err(Error::BadHandle)
    );
}

#[test]
fn matrix_operations_sanitize_non_finite_inputs() {
    let mut ctx = manual_context(4);
    ctx.set_matrix_mode(tracery_context::MatrixMode::PathUserToSurface);
    ctx.translate(3.0, f64::NAN);
    assert_eq!(ctx.matrix(), Affine::translate((3.0, 0.0)));

    ctx.load_matrix(Affine::new([f64::INFINITY, 0.0, 0.0, 1.0, 2.0, 2.0]));
    assert_eq!(ctx.matrix(), Affine::new([1.0, 0.0, 0.0, 1.0, 2.0, 2.0]));

    ctx.load_identity();
    assert_eq!(ctx.matrix(), Affine::IDENTITY);
}

#[test]
fn glyph_draw_batches_tag_blit_eligibility() {
    let mut ctx = manual_context(4);
    let path = line_path(&mut ctx);
    let font = ctx.create_font(0);
    ctx.set_glyph_to_path(font, 1, path, true, Point::ZERO, Vec2::new(2.0, 0.0))
        .unwrap();

    let mut raster = TraceRaster::new();
    ctx.draw_glyphs(font, &[1], None, None, PaintModes::FILL, true, &mut raster)
        .unwrap();
    assert!(raster.draws()[0].blit_eligible);
    assert!(raster.draws()[0].hinted);

    // A sheared glyph matrix disqualifies the whole batch.
    ctx.set_matrix_mode(tracery_context::MatrixMode::GlyphUserToSurface);
    ctx.shear(0.5, 0.0);
    ctx.draw_glyphs(font, &[1], None, None, PaintModes::FILL, false, &mut raster)
        .unwrap();
    assert!(!raster.draws()[1].blit_eligible);
    assert!(!raster.draws()[1].hinted);
}

#[test]
fn path_clear_keeps_the_handle_and_empties_the_outline() {
    let mut ctx = manual_context(4);
    let path = line_path(&mut ctx);
    ctx.path_clear(path).unwrap();
    assert_eq!(ctx.path_element_count(path), Some(0));
    assert_eq!(ctx.validate(path), Some(ObjectKind::Path));
}
