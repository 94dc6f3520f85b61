use smallvec::SmallVec;

use crate::foundation::{
    core::Area,
    math::{align_down, align_up},
};
use crate::surface::buffer::Surface;

/// Byte range of a surface's backing store subject to one maintenance operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CacheRegion {
    /// Start offset in bytes, cache-line aligned.
    pub offset: usize,
    /// Length in bytes.
    pub len: usize,
}

impl CacheRegion {
    /// One past the last byte.
    pub fn end(&self) -> usize {
        self.offset + self.len
    }

    /// Return `true` when `[offset, offset + len)` lies inside the region.
    pub fn covers(&self, offset: usize, len: usize) -> bool {
        offset >= self.offset && offset + len <= self.end()
    }
}

pub(crate) type Regions = SmallVec<[CacheRegion; 8]>;

/// Cache-line regions covering `area` (buffer-relative) of `surface`.
///
/// One range per scanline, `y * stride + x1 * bpp .. + w * bpp`, widened to `line` boundaries
/// and clamped to the buffer. Ranges that touch are merged, so a full-stride area yields a
/// single region.
pub(crate) fn scanline_regions(surface: &Surface, area: Area, line: usize) -> Regions {
    let mut out = Regions::new();
    let Some(area) = area.intersect(surface.bounds()) else {
        return out;
    };

    let stride = surface.stride() as usize;
    let bpp = surface.format().bytes_per_pixel() as usize;
    let total = surface.desc().byte_len();
    let row_len = area.width() as usize * bpp;

    for y in area.y1 as usize..=area.y2 as usize {
        let start = y * stride + area.x1 as usize * bpp;
        let lo = align_down(start, line);
        let hi = align_up(start + row_len, line).min(total);

        match out.last_mut() {
            Some(last) if last.end() >= lo => {
                last.len = hi.max(last.end()) - last.offset;
            }
            _ => out.push(CacheRegion {
                offset: lo,
                len: hi - lo,
            }),
        }
    }
    out
}

#[cfg(test)]
#[path = "../../tests/unit/cache/regions.rs"]
mod tests;
