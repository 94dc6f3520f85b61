use std::time::Duration;

use parking_lot::Mutex;

use crate::engine::{
    BlitSupport, Completion, Engine, EngineCaps, EngineFault, EngineKind, EngineStatus, HwOp,
    mem::{Span, copy_rows, fill_rows, lock_pair},
};
use crate::foundation::color::ColorFormat;

const GDMA_FORMATS: &[ColorFormat] = &[
    ColorFormat::Rgb565,
    ColorFormat::Argb8888,
    ColorFormat::Xrgb8888,
];

/// Element width of one DMA beat.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TransferSize {
    /// 16-bit elements.
    #[default]
    Bits16,
    /// 32-bit elements.
    Bits32,
}

impl TransferSize {
    fn for_format(format: ColorFormat) -> Option<Self> {
        match format.bytes_per_pixel() {
            2 => Some(Self::Bits16),
            4 => Some(Self::Bits32),
            _ => None,
        }
    }

    /// Bytes per element.
    pub const fn bytes(self) -> usize {
        match self {
            Self::Bits16 => 2,
            Self::Bits32 => 4,
        }
    }
}

/// How the channel produces destination elements.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TransferType {
    /// Write the fill value.
    #[default]
    Fill,
    /// Copy source elements.
    Continue,
}

/// Register file of one DMA channel, as last programmed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GdmaRegs {
    /// Element width.
    pub transize: TransferSize,
    /// Source start offset in bytes (copy only).
    pub src_addr: usize,
    /// Destination start offset in bytes.
    pub des_addr: usize,
    /// Elements per row.
    pub xsize: u32,
    /// Rows.
    pub ysize: u16,
    /// Source row stride in elements.
    pub src_yaddrstride: u32,
    /// Destination row stride in elements.
    pub des_yaddrstride: u32,
    /// Fill or copy.
    pub xtype: TransferType,
    /// Fill value in destination layout.
    pub fill_value: u32,
}

/// DMA channel driven as a 2D fill and raw-copy engine.
#[derive(Debug)]
pub struct Gdma {
    caps: EngineCaps,
    regs: Mutex<GdmaRegs>,
    completion: Completion,
}

impl Gdma {
    /// Default capabilities: cost 60, 7200 px minimum layer, 4-byte alignment, opaque copies,
    /// at most `u16::MAX` rows (`ysize`).
    pub fn default_caps() -> EngineCaps {
        EngineCaps {
            formats: GDMA_FORMATS,
            fill: true,
            blit: BlitSupport::OpaqueCopy,
            cost: 60,
            min_layer_pixels: 7200,
            align: 4,
            max_rows: u32::from(u16::MAX),
            max_src_offset: u32::MAX,
        }
    }

    /// Engine with `caps` and a simulated completion latency.
    pub fn new(caps: EngineCaps, latency: Duration) -> Self {
        Self {
            caps,
            regs: Mutex::new(GdmaRegs::default()),
            completion: Completion::new(latency),
        }
    }

    /// Snapshot of the register file.
    pub fn registers(&self) -> GdmaRegs {
        *self.regs.lock()
    }

    fn transize(&self, format: ColorFormat) -> Result<TransferSize, EngineFault> {
        if !self.caps.supports(format) {
            return Err(EngineFault::Unsupported(format!("gdma format {format:?}")));
        }
        TransferSize::for_format(format)
            .ok_or_else(|| EngineFault::Unsupported(format!("gdma element for {format:?}")))
    }

    fn check_aligned(
        what: &str,
        addr: usize,
        stride: u32,
        t: TransferSize,
    ) -> Result<(), EngineFault> {
        if addr % t.bytes() != 0 || stride as usize % t.bytes() != 0 {
            return Err(EngineFault::Misaligned(format!(
                "{what} address {addr:#x} / stride {stride} vs {} byte elements",
                t.bytes()
            )));
        }
        Ok(())
    }

    fn program(&self, op: &HwOp<'_>) -> Result<GdmaRegs, EngineFault> {
        match *op {
            HwOp::Fill { dst, area, color } => {
                let t = self.transize(dst.format())?;
                let des_addr = dst.offset_of(area.x1 as u32, area.y1 as u32);
                Self::check_aligned("destination", des_addr, dst.stride(), t)?;
                Ok(GdmaRegs {
                    transize: t,
                    src_addr: 0,
                    des_addr,
                    xsize: area.width(),
                    ysize: rows(area.height())?,
                    src_yaddrstride: 0,
                    des_yaddrstride: dst.stride() / t.bytes() as u32,
                    xtype: TransferType::Fill,
                    fill_value: color.fill_word(dst.format()),
                })
            }
            HwOp::Blit {
                src,
                src_area,
                dst,
                dst_pos,
                ..
            } => {
                if src.format() != dst.format() {
                    return Err(EngineFault::Unsupported(format!(
                        "gdma cannot convert {:?} to {:?}",
                        src.format(),
                        dst.format()
                    )));
                }
                let t = self.transize(dst.format())?;
                let src_addr = src.offset_of(src_area.x1 as u32, src_area.y1 as u32);
                let des_addr = dst.offset_of(dst_pos.x as u32, dst_pos.y as u32);
                Self::check_aligned("source", src_addr, src.stride(), t)?;
                Self::check_aligned("destination", des_addr, dst.stride(), t)?;
                Ok(GdmaRegs {
                    transize: t,
                    src_addr,
                    des_addr,
                    xsize: src_area.width(),
                    ysize: rows(src_area.height())?,
                    src_yaddrstride: src.stride() / t.bytes() as u32,
                    des_yaddrstride: dst.stride() / t.bytes() as u32,
                    xtype: TransferType::Continue,
                    fill_value: 0,
                })
            }
        }
    }
}

fn rows(h: u32) -> Result<u16, EngineFault> {
    u16::try_from(h).map_err(|_| EngineFault::Unsupported(format!("{h} rows exceed ysize")))
}

impl Engine for Gdma {
    fn kind(&self) -> EngineKind {
        EngineKind::Gdma
    }

    fn caps(&self) -> &EngineCaps {
        &self.caps
    }

    fn start(&self, op: &HwOp<'_>) -> Result<(), EngineFault> {
        let regs = self.program(op)?;
        tracing::debug!(?regs, "gdma programmed");
        self.completion.begin()?;
        *self.regs.lock() = regs;

        let e = regs.transize.bytes();
        let to = Span {
            base: regs.des_addr,
            pitch: regs.des_yaddrstride as usize * e,
        };
        match *op {
            HwOp::Fill { dst, .. } => {
                let word = regs.fill_value.to_le_bytes();
                fill_rows(
                    &mut dst.pixels_mut(),
                    to,
                    usize::from(regs.ysize),
                    regs.xsize as usize,
                    &word[..e],
                );
            }
            HwOp::Blit { src, dst, .. } => {
                let (src_px, mut dst_px) = lock_pair(src, dst);
                copy_rows(
                    &src_px,
                    Span {
                        base: regs.src_addr,
                        pitch: regs.src_yaddrstride as usize * e,
                    },
                    &mut dst_px,
                    to,
                    usize::from(regs.ysize),
                    regs.xsize as usize * e,
                );
            }
        }
        Ok(())
    }

    fn poll(&self) -> EngineStatus {
        self.completion.poll()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/engine/gdma.rs"]
mod tests;
