use std::sync::Arc;

use super::*;
use crate::foundation::{color::ColorFormat, core::Point};
use crate::surface::buffer::{MemoryPlacement, Surface};
use crate::task::model::ImageTransform;

fn sw() -> SoftwareBackend {
    SoftwareBackend::new(SoftwareOpts::default())
}

fn target(w: u32, h: u32, format: ColorFormat) -> Arc<Surface> {
    Arc::new(Surface::new(w, h, format, MemoryPlacement::Cpu).unwrap())
}

fn run(backend: &SoftwareBackend, task: DrawTask, target: &Arc<Surface>) {
    let buf_area = target.bounds();
    let claimed = ClaimedTask::claim(&task, Arc::clone(target), buf_area).unwrap();
    backend.execute(&claimed);
    claimed.complete();
}

fn checker(w: u32, h: u32) -> Arc<Surface> {
    let mut rgba = Vec::new();
    for y in 0..h {
        for x in 0..w {
            rgba.extend_from_slice(&[(x * 16) as u8, (y * 16) as u8, 0x80, 0xff]);
        }
    }
    Arc::new(
        Surface::from_rgba8(w, h, ColorFormat::Xrgb8888, MemoryPlacement::Dma, &rgba).unwrap(),
    )
}

#[test]
fn accepts_everything_at_software_cost() {
    let t = TargetInfo {
        buf_area: Area::new(0, 0, 0, 0),
        format: ColorFormat::L8,
        placement: MemoryPlacement::Cpu,
        stride: 1,
    };
    let task = DrawTask::fill(Area::new(50, 50, 60, 60), FillDsc::solid(Color32::WHITE));
    assert_eq!(sw().evaluate(&task, &t), Some(SOFTWARE_COST));
    assert!(sw().is_software());
}

#[test]
fn solid_fill_respects_clip() {
    let dst = target(8, 8, ColorFormat::Rgb565);
    let task = DrawTask::fill(Area::new(0, 0, 7, 7), FillDsc::solid(Color32::WHITE))
        .with_clip(Area::new(2, 2, 5, 5));
    run(&sw(), task, &dst);
    assert_eq!(dst.pixel(2, 2), Some(Color32::WHITE));
    assert_eq!(dst.pixel(5, 5), Some(Color32::WHITE));
    assert_eq!(dst.pixel(1, 2), Some(Color32::BLACK));
    assert_eq!(dst.pixel(6, 6), Some(Color32::BLACK));
}

#[test]
fn translucent_fill_blends() {
    let dst = target(4, 4, ColorFormat::Xrgb8888);
    let mut dsc = FillDsc::solid(Color32::WHITE);
    dsc.opa = 128;
    run(&sw(), DrawTask::fill(dst.bounds(), dsc), &dst);
    let px = dst.pixel(1, 1).unwrap();
    assert_eq!((px.r, px.g, px.b), (128, 128, 128));
}

#[test]
fn rounded_fill_leaves_corners() {
    let dst = target(32, 32, ColorFormat::Xrgb8888);
    let mut dsc = FillDsc::solid(Color32::WHITE);
    dsc.radius = 8;
    run(&sw(), DrawTask::fill(dst.bounds(), dsc), &dst);
    assert_eq!(dst.pixel(0, 0), Some(Color32::BLACK));
    assert_eq!(dst.pixel(31, 31), Some(Color32::BLACK));
    assert_eq!(dst.pixel(16, 0), Some(Color32::WHITE));
    assert_eq!(dst.pixel(16, 16), Some(Color32::WHITE));
}

#[test]
fn gradient_runs_start_to_end() {
    let dst = target(16, 2, ColorFormat::Xrgb8888);
    let mut dsc = FillDsc::solid(Color32::WHITE);
    dsc.gradient = Some(Gradient {
        start: Color32::rgb(255, 0, 0),
        end: Color32::rgb(0, 0, 255),
        dir: GradientDir::Horizontal,
    });
    run(&sw(), DrawTask::fill(dst.bounds(), dsc), &dst);
    assert_eq!(dst.pixel(0, 0), Some(Color32::rgb(255, 0, 0)));
    assert_eq!(dst.pixel(15, 1), Some(Color32::rgb(0, 0, 255)));
}

#[test]
fn image_blit_shifts_source_with_clip() {
    let src = checker(8, 8);
    let dst = target(8, 8, ColorFormat::Xrgb8888);
    // Image placed at (-3, 2): destination (0, 2) shows source (3, 0).
    let task = DrawTask::image(Area::new(-3, 2, 4, 9), ImageDsc::new(Arc::clone(&src)));
    run(&sw(), task, &dst);
    assert_eq!(dst.pixel(0, 2), src.pixel(3, 0));
    assert_eq!(dst.pixel(4, 7), src.pixel(7, 5));
    assert_eq!(dst.pixel(5, 2), Some(Color32::BLACK));
    assert_eq!(dst.pixel(0, 1), Some(Color32::BLACK));
}

#[test]
fn rotation_by_half_turn_mirrors_both_axes() {
    let src = checker(4, 4);
    let dst = target(4, 4, ColorFormat::Xrgb8888);
    let mut dsc = ImageDsc::new(Arc::clone(&src));
    dsc.transform = ImageTransform {
        rotation: 1800,
        pivot: Point::new(2, 2),
        ..ImageTransform::IDENTITY
    };
    run(&sw(), DrawTask::image(dst.bounds(), dsc), &dst);
    assert_eq!(dst.pixel(0, 0), src.pixel(3, 3));
    assert_eq!(dst.pixel(3, 0), src.pixel(0, 3));
}

#[test]
fn full_recolor_replaces_color() {
    let src = checker(4, 4);
    let dst = target(4, 4, ColorFormat::Xrgb8888);
    let mut dsc = ImageDsc::new(src);
    dsc.recolor = Color32::rgb(0, 200, 0);
    dsc.recolor_opa = OPA_COVER;
    run(&sw(), DrawTask::image(dst.bounds(), dsc), &dst);
    assert_eq!(dst.pixel(2, 2), Some(Color32::rgb(0, 200, 0)));
}

#[test]
fn parallel_rows_match_serial_rows() {
    let src = checker(16, 16);
    let serial = target(16, 16, ColorFormat::Rgb565);
    let parallel = target(16, 16, ColorFormat::Rgb565);
    let mut dsc = ImageDsc::new(src);
    dsc.opa = 180;
    run(
        &SoftwareBackend::new(SoftwareOpts {
            parallel_rows_threshold: u32::MAX,
        }),
        DrawTask::image(serial.bounds(), dsc.clone()),
        &serial,
    );
    run(
        &SoftwareBackend::new(SoftwareOpts {
            parallel_rows_threshold: 0,
        }),
        DrawTask::image(parallel.bounds(), dsc),
        &parallel,
    );
    assert_eq!(serial.digest(), parallel.digest());
}
