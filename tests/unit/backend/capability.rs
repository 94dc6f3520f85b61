use std::sync::Arc;

use super::*;
use crate::engine::{bitblt::Bitblt, gdma::Gdma, ge2d::Ge2d};
use crate::foundation::{
    color::{Color32, OPA_COVER},
    core::Area,
};
use crate::surface::buffer::Surface;
use crate::task::model::{Gradient, GradientDir, ImageTransform};

fn target(format: ColorFormat) -> TargetInfo {
    TargetInfo {
        buf_area: Area::new(0, 0, 127, 127),
        format,
        placement: MemoryPlacement::Dma,
        stride: 128 * format.bytes_per_pixel(),
    }
}

fn fill_at(x: i32) -> DrawTask {
    DrawTask::fill(
        Area::new(x, 0, x + 63, 63),
        FillDsc::solid(Color32::rgb(10, 20, 30)),
    )
}

fn image(src_format: ColorFormat, placement: MemoryPlacement) -> ImageDsc {
    ImageDsc::new(Arc::new(Surface::new(32, 32, src_format, placement).unwrap()))
}

#[test]
fn aligned_opaque_fill_is_accepted_at_engine_cost() {
    let t = target(ColorFormat::Rgb565);
    assert_eq!(check(&Ge2d::default_caps(), &fill_at(0), &t), Ok(70));
    assert_eq!(check(&Gdma::default_caps(), &fill_at(2), &t), Ok(60));
}

#[test]
fn odd_rgb565_origin_is_misaligned() {
    let t = target(ColorFormat::Rgb565);
    for caps in [Ge2d::default_caps(), Bitblt::default_caps(), Gdma::default_caps()] {
        assert_eq!(check(&caps, &fill_at(1), &t), Err(Rejection::TargetAlignment));
    }
}

#[test]
fn odd_stride_is_misaligned() {
    let mut t = target(ColorFormat::Rgb565);
    t.stride = 258;
    assert_eq!(
        check(&Ge2d::default_caps(), &fill_at(0), &t),
        Err(Rejection::TargetAlignment)
    );
}

#[test]
fn alignment_is_measured_after_clipping() {
    let t = target(ColorFormat::Rgb565);
    let task = fill_at(0).with_clip(Area::new(3, 0, 127, 127));
    assert_eq!(
        check(&Ge2d::default_caps(), &task, &t),
        Err(Rejection::TargetAlignment)
    );
}

#[test]
fn layer_and_placement_gates() {
    let mut t = target(ColorFormat::Rgb565);
    t.placement = MemoryPlacement::Cpu;
    assert_eq!(
        check(&Ge2d::default_caps(), &fill_at(0), &t),
        Err(Rejection::TargetPlacement)
    );

    let mut t = target(ColorFormat::Rgb565);
    t.buf_area = Area::new(0, 0, 63, 63);
    assert_eq!(
        check(&Ge2d::default_caps(), &fill_at(0), &t),
        Err(Rejection::SmallLayer)
    );

    let t = target(ColorFormat::Rgb888);
    assert_eq!(
        check(&Ge2d::default_caps(), &fill_at(0), &t),
        Err(Rejection::TargetFormat)
    );
}

#[test]
fn fill_style_and_opacity_gates() {
    let t = target(ColorFormat::Argb8888);
    let area = Area::new(0, 0, 63, 63);
    let mut dsc = FillDsc::solid(Color32::WHITE);
    dsc.radius = 4;
    assert_eq!(
        check(&Ge2d::default_caps(), &DrawTask::fill(area, dsc), &t),
        Err(Rejection::FillStyle)
    );

    let mut dsc = FillDsc::solid(Color32::WHITE);
    dsc.gradient = Some(Gradient {
        start: Color32::WHITE,
        end: Color32::BLACK,
        dir: GradientDir::Vertical,
    });
    assert_eq!(
        check(&Ge2d::default_caps(), &DrawTask::fill(area, dsc), &t),
        Err(Rejection::FillStyle)
    );

    let mut dsc = FillDsc::solid(Color32::WHITE);
    dsc.opa = 128;
    assert_eq!(
        check(&Ge2d::default_caps(), &DrawTask::fill(area, dsc), &t),
        Err(Rejection::Opacity)
    );
}

#[test]
fn fully_clipped_task_is_left_to_software() {
    let t = target(ColorFormat::Rgb565);
    let task = fill_at(0).with_clip(Area::new(500, 500, 600, 600));
    assert_eq!(check(&Ge2d::default_caps(), &task, &t), Err(Rejection::Empty));
}

#[test]
fn image_support_differs_per_engine() {
    let t = target(ColorFormat::Xrgb8888);
    let area = Area::new(0, 0, 31, 31);
    let opaque = DrawTask::image(area, image(ColorFormat::Xrgb8888, MemoryPlacement::Dma));
    assert_eq!(check(&Ge2d::default_caps(), &opaque, &t), Err(Rejection::NoBlit));
    assert_eq!(check(&Gdma::default_caps(), &opaque, &t), Ok(60));
    assert_eq!(check(&Bitblt::default_caps(), &opaque, &t), Ok(70));

    let alpha = DrawTask::image(area, image(ColorFormat::Argb8888, MemoryPlacement::Dma));
    assert_eq!(
        check(&Gdma::default_caps(), &alpha, &t),
        Err(Rejection::SourceFormat)
    );
    assert_eq!(check(&Bitblt::default_caps(), &alpha, &t), Ok(70));

    let mut faded = image(ColorFormat::Xrgb8888, MemoryPlacement::Dma);
    faded.opa = 100;
    let faded = DrawTask::layer(area, faded);
    assert_eq!(check(&Gdma::default_caps(), &faded, &t), Err(Rejection::Opacity));
    assert_eq!(check(&Bitblt::default_caps(), &faded, &t), Ok(70));
}

#[test]
fn image_effects_are_rejected() {
    let t = target(ColorFormat::Rgb565);
    let area = Area::new(0, 0, 31, 31);

    let mut recolored = image(ColorFormat::Rgb565, MemoryPlacement::Dma);
    recolored.recolor_opa = OPA_COVER;
    assert_eq!(
        check(&Bitblt::default_caps(), &DrawTask::image(area, recolored), &t),
        Err(Rejection::Recolor)
    );

    let mut rotated = image(ColorFormat::Rgb565, MemoryPlacement::Dma);
    rotated.transform = ImageTransform {
        rotation: 900,
        ..ImageTransform::IDENTITY
    };
    assert_eq!(
        check(&Bitblt::default_caps(), &DrawTask::image(area, rotated), &t),
        Err(Rejection::Transform)
    );

    let cpu_src = image(ColorFormat::Rgb565, MemoryPlacement::Cpu);
    assert_eq!(
        check(&Bitblt::default_caps(), &DrawTask::image(area, cpu_src), &t),
        Err(Rejection::SourcePlacement)
    );
}

#[test]
fn source_offset_alignment_follows_clip() {
    let t = target(ColorFormat::Rgb565);
    // Image placed at x = -1: the first visible source column is 1, an odd 2-byte offset.
    let task = DrawTask::image(
        Area::new(-1, 0, 30, 31),
        image(ColorFormat::Rgb565, MemoryPlacement::Dma),
    );
    assert_eq!(
        check(&Bitblt::default_caps(), &task, &t),
        Err(Rejection::SourceAlignment)
    );
}

#[test]
fn rows_beyond_dma_ysize_are_rejected() {
    let tall = TargetInfo {
        buf_area: Area::new(0, 0, 1, 69_999),
        format: ColorFormat::Rgb565,
        placement: MemoryPlacement::Dma,
        stride: 4,
    };
    let task = DrawTask::fill(tall.buf_area, FillDsc::solid(Color32::WHITE));
    assert_eq!(check(&Gdma::default_caps(), &task, &tall), Err(Rejection::Extent));
    assert_eq!(check(&Ge2d::default_caps(), &task, &tall), Ok(70));

    let clipped = DrawTask::fill(tall.buf_area, FillDsc::solid(Color32::WHITE))
        .with_clip(Area::new(0, 0, 1, 65_534));
    assert_eq!(check(&Gdma::default_caps(), &clipped, &tall), Ok(60));
}

#[test]
fn source_offset_beyond_fixed_point_range_is_rejected() {
    let t = target(ColorFormat::Xrgb8888);
    let wide = Arc::new(
        Surface::new(40_064, 1, ColorFormat::Xrgb8888, MemoryPlacement::Dma).unwrap(),
    );
    // Only source columns 40000.. land inside the buffer.
    let task = DrawTask::image(Area::new(-40_000, 0, 63, 0), ImageDsc::new(wide));
    assert_eq!(check(&Bitblt::default_caps(), &task, &t), Err(Rejection::Extent));
    assert_eq!(check(&Gdma::default_caps(), &task, &t), Ok(60));
}
