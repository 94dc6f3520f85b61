use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::foundation::{
    color::{Color32, ColorFormat, decode_pixel, encode_pixel},
    core::Area,
    error::{DrawError, DrawResult},
    math::Fnv1a64,
};

static NEXT_SURFACE_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique surface identity, used to tag cache-maintenance events.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SurfaceId(pub u64);

/// Which bus masters can reach a surface's memory.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryPlacement {
    /// Tightly coupled or otherwise CPU-private memory. Accelerators must not touch it.
    Cpu,
    /// Memory reachable by DMA-capable accelerators.
    #[default]
    Dma,
}

/// Geometry and format of a surface, without its pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SurfaceDesc {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Row pitch in bytes.
    pub stride: u32,
    /// Pixel layout.
    pub format: ColorFormat,
    /// Memory placement.
    pub placement: MemoryPlacement,
}

impl SurfaceDesc {
    /// Descriptor with the tightest stride for `width`.
    pub fn packed(
        width: u32,
        height: u32,
        format: ColorFormat,
        placement: MemoryPlacement,
    ) -> Self {
        Self {
            width,
            height,
            stride: width.saturating_mul(format.bytes_per_pixel()),
            format,
            placement,
        }
    }

    /// Validate dimensions and stride.
    pub fn validate(&self) -> DrawResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(DrawError::validation(
                "surface width and height must be > 0",
            ));
        }
        let min_stride = u64::from(self.width) * u64::from(self.format.bytes_per_pixel());
        if u64::from(self.stride) < min_stride {
            return Err(DrawError::validation(format!(
                "surface stride {} is smaller than a row ({min_stride} bytes)",
                self.stride
            )));
        }
        Ok(())
    }

    /// Total backing-store size in bytes.
    pub fn byte_len(&self) -> usize {
        (self.stride as usize).saturating_mul(self.height as usize)
    }
}

/// A pixel buffer shared between the CPU and the accelerators.
///
/// Pixels sit behind a reader/writer lock that models bus arbitration: a backend or an engine
/// takes it only for the duration of the memory operation itself.
#[derive(Debug)]
pub struct Surface {
    id: SurfaceId,
    desc: SurfaceDesc,
    pixels: RwLock<Vec<u8>>,
}

impl Surface {
    /// Allocate a zeroed surface with a packed stride.
    pub fn new(
        width: u32,
        height: u32,
        format: ColorFormat,
        placement: MemoryPlacement,
    ) -> DrawResult<Self> {
        Self::with_desc(SurfaceDesc::packed(width, height, format, placement))
    }

    /// Allocate a zeroed surface with an explicit row pitch.
    pub fn with_stride(
        width: u32,
        height: u32,
        stride: u32,
        format: ColorFormat,
        placement: MemoryPlacement,
    ) -> DrawResult<Self> {
        Self::with_desc(SurfaceDesc {
            width,
            height,
            stride,
            format,
            placement,
        })
    }

    /// Allocate a zeroed surface from a descriptor.
    pub fn with_desc(desc: SurfaceDesc) -> DrawResult<Self> {
        desc.validate()?;
        Ok(Self::from_storage(desc, vec![0; desc.byte_len()]))
    }

    /// Build a surface from tightly packed straight RGBA8 pixels.
    pub fn from_rgba8(
        width: u32,
        height: u32,
        format: ColorFormat,
        placement: MemoryPlacement,
        rgba: &[u8],
    ) -> DrawResult<Self> {
        let expected = (width as usize)
            .checked_mul(height as usize)
            .and_then(|v| v.checked_mul(4))
            .ok_or_else(|| DrawError::validation("rgba8 buffer size overflow"))?;
        if rgba.len() != expected {
            return Err(DrawError::validation(format!(
                "rgba8 buffer has {} bytes, expected {expected}",
                rgba.len()
            )));
        }
        let surface = Self::new(width, height, format, placement)?;
        {
            let mut px = surface.pixels_mut();
            let bpp = format.bytes_per_pixel() as usize;
            let stride = surface.desc.stride as usize;
            for (y, row) in rgba.chunks_exact(width as usize * 4).enumerate() {
                for (x, c) in row.chunks_exact(4).enumerate() {
                    let off = y * stride + x * bpp;
                    encode_pixel(
                        format,
                        Color32::new(c[3], c[0], c[1], c[2]),
                        &mut px[off..off + bpp],
                    );
                }
            }
        }
        Ok(surface)
    }

    pub(crate) fn from_storage(desc: SurfaceDesc, mut storage: Vec<u8>) -> Self {
        storage.resize(desc.byte_len(), 0);
        Self {
            id: SurfaceId(NEXT_SURFACE_ID.fetch_add(1, Ordering::Relaxed)),
            desc,
            pixels: RwLock::new(storage),
        }
    }

    pub(crate) fn into_storage(self) -> Vec<u8> {
        self.pixels.into_inner()
    }

    /// Process-unique identity.
    pub fn id(&self) -> SurfaceId {
        self.id
    }

    /// Geometry and format.
    pub fn desc(&self) -> SurfaceDesc {
        self.desc
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.desc.width
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.desc.height
    }

    /// Row pitch in bytes.
    pub fn stride(&self) -> u32 {
        self.desc.stride
    }

    /// Pixel layout.
    pub fn format(&self) -> ColorFormat {
        self.desc.format
    }

    /// Memory placement.
    pub fn placement(&self) -> MemoryPlacement {
        self.desc.placement
    }

    /// Return `true` when accelerators may read or write this surface.
    pub fn is_dma_visible(&self) -> bool {
        self.desc.placement == MemoryPlacement::Dma
    }

    /// Buffer-relative bounds `(0, 0) ..= (w - 1, h - 1)`.
    pub fn bounds(&self) -> Area {
        Area::new(0, 0, self.desc.width as i32 - 1, self.desc.height as i32 - 1)
    }

    /// Byte offset of pixel `(x, y)`.
    pub fn offset_of(&self, x: u32, y: u32) -> usize {
        y as usize * self.desc.stride as usize
            + x as usize * self.desc.format.bytes_per_pixel() as usize
    }

    /// Shared access to the backing store.
    pub fn pixels(&self) -> RwLockReadGuard<'_, Vec<u8>> {
        self.pixels.read()
    }

    /// Exclusive access to the backing store.
    pub fn pixels_mut(&self) -> RwLockWriteGuard<'_, Vec<u8>> {
        self.pixels.write()
    }

    /// Decode one pixel, `None` when out of bounds.
    pub fn pixel(&self, x: u32, y: u32) -> Option<Color32> {
        if x >= self.desc.width || y >= self.desc.height {
            return None;
        }
        let off = self.offset_of(x, y);
        let bpp = self.desc.format.bytes_per_pixel() as usize;
        Some(decode_pixel(self.desc.format, &self.pixels()[off..off + bpp]))
    }

    /// Overwrite every visible pixel with `color`.
    pub fn clear(&self, color: Color32) {
        let bpp = self.desc.format.bytes_per_pixel() as usize;
        let mut word = [0u8; 4];
        encode_pixel(self.desc.format, color, &mut word);
        let row_bytes = self.desc.width as usize * bpp;
        let mut px = self.pixels_mut();
        for row in px.chunks_mut(self.desc.stride as usize) {
            for slot in row[..row_bytes].chunks_exact_mut(bpp) {
                slot.copy_from_slice(&word[..bpp]);
            }
        }
    }

    /// Decode the visible pixels into tightly packed straight RGBA8.
    pub fn to_rgba8(&self) -> Vec<u8> {
        let bpp = self.desc.format.bytes_per_pixel() as usize;
        let mut out = Vec::with_capacity(self.desc.width as usize * self.desc.height as usize * 4);
        let px = self.pixels();
        for y in 0..self.desc.height as usize {
            let row = &px[y * self.desc.stride as usize..];
            for slot in row[..self.desc.width as usize * bpp].chunks_exact(bpp) {
                let c = decode_pixel(self.desc.format, slot);
                out.extend_from_slice(&[c.r, c.g, c.b, c.a]);
            }
        }
        out
    }

    /// Stable digest over the visible pixel bytes (row padding excluded).
    pub fn digest(&self) -> u64 {
        let mut h = Fnv1a64::new_default();
        h.write_u32(self.desc.width);
        h.write_u32(self.desc.height);
        let row_bytes = self.desc.width as usize * self.desc.format.bytes_per_pixel() as usize;
        let px = self.pixels();
        for row in px.chunks(self.desc.stride as usize) {
            h.write_bytes(&row[..row_bytes]);
        }
        h.finish()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/surface/buffer.rs"]
mod tests;
