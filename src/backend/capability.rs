use crate::backend::geometry::BlitGeometry;
use crate::engine::{BlitSupport, EngineCaps};
use crate::foundation::color::{ColorFormat, OPA_MAX};
use crate::surface::buffer::MemoryPlacement;
use crate::task::model::{DrawDescriptor, DrawTask, FillDsc, ImageDsc};
use crate::task::queue::TargetInfo;

/// Why an accelerator declined a task.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Rejection {
    /// Nothing left to draw after clipping.
    Empty,
    /// Destination is not reachable by DMA.
    TargetPlacement,
    /// Destination format unsupported.
    TargetFormat,
    /// Layer buffer below the size worth offloading.
    SmallLayer,
    /// Destination stride or row start not aligned.
    TargetAlignment,
    /// Engine has no fill path.
    NoFill,
    /// Rounded corners or gradient.
    FillStyle,
    /// Opacity (or alpha mode) the engine cannot reproduce.
    Opacity,
    /// Engine has no blit path.
    NoBlit,
    /// Source is not reachable by DMA.
    SourcePlacement,
    /// Source format unsupported, or a conversion the engine cannot do.
    SourceFormat,
    /// Source stride or row start not aligned.
    SourceAlignment,
    /// Recolouring requested.
    Recolor,
    /// Rotation or scaling requested.
    Transform,
    /// Row count or source offset beyond what the engine's registers hold.
    Extent,
}

fn aligned(stride: u32, x: i32, format: ColorFormat, align: u32) -> bool {
    let offset = x as u64 * u64::from(format.bytes_per_pixel());
    stride % align == 0 && offset % u64::from(align) == 0
}

/// Decide whether an accelerator with `caps` can execute `task` into `target`, and at what cost.
pub fn check(caps: &EngineCaps, task: &DrawTask, target: &TargetInfo) -> Result<u32, Rejection> {
    let screen = task
        .clipped_area()
        .and_then(|a| a.intersect(target.buf_area))
        .ok_or(Rejection::Empty)?;

    if target.placement != MemoryPlacement::Dma {
        return Err(Rejection::TargetPlacement);
    }
    if !caps.supports(target.format) {
        return Err(Rejection::TargetFormat);
    }
    if target.buf_area.size() < caps.min_layer_pixels {
        return Err(Rejection::SmallLayer);
    }

    match task.descriptor() {
        DrawDescriptor::Fill(fill) => {
            let x1_rel = screen.x1 - target.buf_area.x1;
            if !aligned(target.stride, x1_rel, target.format, caps.align) {
                return Err(Rejection::TargetAlignment);
            }
            if screen.height() > caps.max_rows {
                return Err(Rejection::Extent);
            }
            check_fill(caps, fill)?;
        }
        DrawDescriptor::Image(img) => {
            let geom = BlitGeometry::blit(
                task.area(),
                task.clip(),
                target.buf_area,
                img.src.bounds(),
            )
            .ok_or(Rejection::Empty)?;
            if !aligned(target.stride, geom.dst.x1, target.format, caps.align) {
                return Err(Rejection::TargetAlignment);
            }
            let src = geom.src.ok_or(Rejection::Empty)?;
            check_image(caps, img, src.x1, target)?;
            let offset_ok = |v: i32| u32::try_from(v).is_ok_and(|v| v <= caps.max_src_offset);
            if geom.dst.height() > caps.max_rows || !offset_ok(src.x1) || !offset_ok(src.y1) {
                return Err(Rejection::Extent);
            }
        }
    }
    Ok(caps.cost)
}

fn check_fill(caps: &EngineCaps, fill: &FillDsc) -> Result<(), Rejection> {
    if !caps.fill {
        return Err(Rejection::NoFill);
    }
    if fill.radius != 0 || fill.gradient.is_some() {
        return Err(Rejection::FillStyle);
    }
    if fill.opa < OPA_MAX {
        return Err(Rejection::Opacity);
    }
    Ok(())
}

fn check_image(
    caps: &EngineCaps,
    img: &ImageDsc,
    src_x1: i32,
    target: &TargetInfo,
) -> Result<(), Rejection> {
    if caps.blit == BlitSupport::None {
        return Err(Rejection::NoBlit);
    }
    let src = &img.src;
    if !src.is_dma_visible() {
        return Err(Rejection::SourcePlacement);
    }
    if !caps.supports(src.format()) {
        return Err(Rejection::SourceFormat);
    }
    if !aligned(src.stride(), src_x1, src.format(), caps.align) {
        return Err(Rejection::SourceAlignment);
    }
    if img.has_recolor() {
        return Err(Rejection::Recolor);
    }
    if !img.transform.is_identity() {
        return Err(Rejection::Transform);
    }
    if caps.blit == BlitSupport::OpaqueCopy {
        if src.format() != target.format || src.format().has_alpha() {
            return Err(Rejection::SourceFormat);
        }
        if img.opa < OPA_MAX {
            return Err(Rejection::Opacity);
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/backend/capability.rs"]
mod tests;
