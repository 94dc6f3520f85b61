use rayon::prelude::*;

use crate::backend::{ClaimedTask, DrawBackend, geometry::BlitGeometry};
use crate::dispatch::opts::SoftwareOpts;
use crate::engine::mem::lock_pair;
use crate::foundation::{
    color::{Color32, OPA_COVER, OPA_MAX, OPA_MIN, blend_pixel, decode_pixel},
    core::Area,
    math::mul_div255_u8,
};
use crate::task::model::{DrawDescriptor, DrawTask, FillDsc, Gradient, GradientDir, ImageDsc};
use crate::task::queue::TargetInfo;

/// Cost the software backend bids on every task.
pub const SOFTWARE_COST: u32 = 100;

/// CPU rasterizer. Accepts every task; the universal fallback.
#[derive(Debug, Clone)]
pub struct SoftwareBackend {
    opts: SoftwareOpts,
}

impl SoftwareBackend {
    /// Create the backend.
    pub fn new(opts: SoftwareOpts) -> Self {
        Self { opts }
    }

    /// Run `f(buffer_row_index, row_bytes)` over the rows of `rows`, in parallel for tall areas.
    fn for_rows<F>(&self, px: &mut [u8], stride: usize, rows: Area, f: F)
    where
        F: Fn(usize, &mut [u8]) + Send + Sync,
    {
        let y1 = rows.y1 as usize;
        let band = &mut px[y1 * stride..(rows.y2 as usize + 1) * stride];
        if rows.height() >= self.opts.parallel_rows_threshold {
            band.par_chunks_mut(stride)
                .enumerate()
                .for_each(|(i, row)| f(y1 + i, row));
        } else {
            band.chunks_mut(stride)
                .enumerate()
                .for_each(|(i, row)| f(y1 + i, row));
        }
    }

    fn fill(&self, task: &ClaimedTask, dsc: &FillDsc) {
        if dsc.opa <= OPA_MIN {
            return;
        }
        let Some(g) = BlitGeometry::fill(task.area, task.clip, task.buf_area) else {
            return;
        };
        let opa = effective_opa(dsc.opa);
        let shape = FillShape::new(task.area, dsc);
        let dst = &task.target;
        let format = dst.format();
        let bpp = format.bytes_per_pixel() as usize;
        let origin = task.buf_area.origin();

        let mut px = dst.pixels_mut();
        self.for_rows(&mut px, dst.stride() as usize, g.dst, |y, row| {
            let sy = y as i32 + origin.y;
            for x in g.dst.x1..=g.dst.x2 {
                let sx = x + origin.x;
                let cov = shape.coverage(sx, sy);
                if cov == 0 {
                    continue;
                }
                let a = mul_div255_u8(u16::from(opa), u16::from(cov));
                let off = x as usize * bpp;
                blend_pixel(format, &mut row[off..off + bpp], shape.color_at(sx, sy), a);
            }
        });
    }

    fn image(&self, task: &ClaimedTask, img: &ImageDsc) {
        if img.opa <= OPA_MIN {
            return;
        }
        let opa = effective_opa(img.opa);
        let src = &img.src;
        let dst = &task.target;
        let (src_fmt, dst_fmt) = (src.format(), dst.format());
        let (sbpp, dbpp) = (
            src_fmt.bytes_per_pixel() as usize,
            dst_fmt.bytes_per_pixel() as usize,
        );
        let src_stride = src.stride() as usize;
        let shade = |c: Color32| {
            if img.has_recolor() {
                img.recolor.with_alpha(c.a).mix(c, img.recolor_opa)
            } else {
                c
            }
        };

        if img.transform.is_identity() {
            let Some(g) = BlitGeometry::blit(task.area, task.clip, task.buf_area, src.bounds())
            else {
                return;
            };
            let Some(sa) = g.src else {
                return;
            };
            let (src_px, mut dst_px) = lock_pair(src, dst);
            let src_px: &[u8] = &src_px;
            self.for_rows(&mut dst_px, dst.stride() as usize, g.dst, |y, row| {
                let sy = (sa.y1 + (y as i32 - g.dst.y1)) as usize;
                for x in g.dst.x1..=g.dst.x2 {
                    let sx = (sa.x1 + (x - g.dst.x1)) as usize;
                    let s = sy * src_stride + sx * sbpp;
                    let c = shade(decode_pixel(src_fmt, &src_px[s..s + sbpp]));
                    let d = x as usize * dbpp;
                    blend_pixel(dst_fmt, &mut row[d..d + dbpp], c, opa);
                }
            });
            return;
        }

        let Some(g) = BlitGeometry::fill(task.area, task.clip, task.buf_area) else {
            return;
        };
        let map = InverseMap::new(img);
        let (sw, sh) = (src.width() as i32, src.height() as i32);
        let origin = task.buf_area.origin();
        let (src_px, mut dst_px) = lock_pair(src, dst);
        let src_px: &[u8] = &src_px;
        self.for_rows(&mut dst_px, dst.stride() as usize, g.dst, |y, row| {
            let v = y as i32 + origin.y - task.area.y1;
            for x in g.dst.x1..=g.dst.x2 {
                let u = x + origin.x - task.area.x1;
                let (sx, sy) = map.apply(u, v);
                if sx < 0 || sy < 0 || sx >= sw || sy >= sh {
                    continue;
                }
                let s = sy as usize * src_stride + sx as usize * sbpp;
                let c = shade(decode_pixel(src_fmt, &src_px[s..s + sbpp]));
                let d = x as usize * dbpp;
                blend_pixel(dst_fmt, &mut row[d..d + dbpp], c, opa);
            }
        });
    }
}

impl DrawBackend for SoftwareBackend {
    fn name(&self) -> &str {
        "software"
    }

    fn evaluate(&self, _task: &DrawTask, _target: &TargetInfo) -> Option<u32> {
        Some(SOFTWARE_COST)
    }

    fn execute(&self, task: &ClaimedTask) {
        match &*task.descriptor {
            DrawDescriptor::Fill(fill) => self.fill(task, fill),
            DrawDescriptor::Image(img) => self.image(task, img),
        }
    }

    fn is_software(&self) -> bool {
        true
    }
}

fn effective_opa(opa: u8) -> u8 {
    if opa >= OPA_MAX { OPA_COVER } else { opa }
}

/// Rounded-rectangle coverage and gradient colour of a fill, in screen coordinates.
struct FillShape {
    area: Area,
    radius: i32,
    color: Color32,
    gradient: Option<Gradient>,
}

impl FillShape {
    fn new(area: Area, dsc: &FillDsc) -> Self {
        let max_r = (area.width().min(area.height()) / 2) as i32;
        Self {
            area,
            radius: (dsc.radius as i32).min(max_r),
            color: dsc.color.with_alpha(OPA_COVER),
            gradient: dsc.gradient,
        }
    }

    fn coverage(&self, x: i32, y: i32) -> u8 {
        if self.radius == 0 {
            return OPA_COVER;
        }
        let r = self.radius;
        let a = self.area;
        let cx = if x < a.x1 + r {
            a.x1 + r
        } else if x > a.x2 - r {
            a.x2 - r + 1
        } else {
            return OPA_COVER;
        };
        let cy = if y < a.y1 + r {
            a.y1 + r
        } else if y > a.y2 - r {
            a.y2 - r + 1
        } else {
            return OPA_COVER;
        };
        let dx = (x as f32 + 0.5) - cx as f32;
        let dy = (y as f32 + 0.5) - cy as f32;
        let dist = (dx * dx + dy * dy).sqrt();
        ((r as f32 - dist + 0.5).clamp(0.0, 1.0) * 255.0).round() as u8
    }

    fn color_at(&self, x: i32, y: i32) -> Color32 {
        let Some(grad) = self.gradient else {
            return self.color;
        };
        let (pos, len) = match grad.dir {
            GradientDir::Horizontal => (x - self.area.x1, self.area.width()),
            GradientDir::Vertical => (y - self.area.y1, self.area.height()),
        };
        let span = len.saturating_sub(1).max(1) as i32;
        let t = (pos.clamp(0, span) * 255 / span) as u8;
        grad.end.mix(grad.start, t).with_alpha(OPA_COVER)
    }
}

/// Destination-to-source mapping of a rotated and scaled image (nearest neighbour).
struct InverseMap {
    cos: f32,
    sin: f32,
    inv_sx: f32,
    inv_sy: f32,
    px: f32,
    py: f32,
}

impl InverseMap {
    fn new(img: &ImageDsc) -> Self {
        let t = img.transform;
        let angle = (t.rotation as f32 / 10.0).to_radians();
        Self {
            cos: angle.cos(),
            sin: angle.sin(),
            inv_sx: 256.0 / t.scale_x.max(1) as f32,
            inv_sy: 256.0 / t.scale_y.max(1) as f32,
            px: t.pivot.x as f32,
            py: t.pivot.y as f32,
        }
    }

    fn apply(&self, u: i32, v: i32) -> (i32, i32) {
        let dx = u as f32 + 0.5 - self.px;
        let dy = v as f32 + 0.5 - self.py;
        let rx = self.cos * dx + self.sin * dy;
        let ry = -self.sin * dx + self.cos * dy;
        (
            (rx * self.inv_sx + self.px).floor() as i32,
            (ry * self.inv_sy + self.py).floor() as i32,
        )
    }
}

#[cfg(test)]
#[path = "../../tests/unit/backend/software.rs"]
mod tests;
