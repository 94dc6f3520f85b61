use std::time::Duration;

use parking_lot::Mutex;

use crate::engine::{
    BlitSupport, Completion, Engine, EngineCaps, EngineFault, EngineKind, EngineStatus, HwOp,
    mem::{Span, fill_rows},
};
use crate::foundation::{color::ColorFormat, core::Area};

/// Formats the fill path writes: 16- and 32-bit pixels only.
const GE2D_FORMATS: &[ColorFormat] = &[
    ColorFormat::Rgb565,
    ColorFormat::Argb8888,
    ColorFormat::Xrgb8888,
];

/// Register file of the 2D graphics engine, as last programmed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Ge2dRegs {
    /// Bits per pixel, 16 or 32.
    pub bpp: u32,
    /// Destination pitch in pixels.
    pub pitch: u32,
    /// Destination height in rows.
    pub height: u32,
    /// Clip window top-left `(x, y)`, inclusive.
    pub clip_tl: (u32, u32),
    /// Clip window bottom-right `(x, y)`, inclusive.
    pub clip_br: (u32, u32),
    /// Destination top-left `(x, y)`.
    pub dst_xy: (u32, u32),
    /// Rectangle size `(w, h)`.
    pub size: (u32, u32),
    /// Fill colour in destination layout.
    pub color: u32,
}

/// Fill-only 2D graphics engine.
#[derive(Debug)]
pub struct Ge2d {
    caps: EngineCaps,
    regs: Mutex<Ge2dRegs>,
    completion: Completion,
}

impl Ge2d {
    /// Default capabilities: cost 70, 7200 px minimum layer, 4-byte alignment.
    pub fn default_caps() -> EngineCaps {
        EngineCaps {
            formats: GE2D_FORMATS,
            fill: true,
            blit: BlitSupport::None,
            cost: 70,
            min_layer_pixels: 7200,
            align: 4,
            max_rows: u32::MAX,
            max_src_offset: 0,
        }
    }

    /// Engine with `caps` and a simulated completion latency.
    pub fn new(caps: EngineCaps, latency: Duration) -> Self {
        Self {
            caps,
            regs: Mutex::new(Ge2dRegs::default()),
            completion: Completion::new(latency),
        }
    }

    /// Snapshot of the register file.
    pub fn registers(&self) -> Ge2dRegs {
        *self.regs.lock()
    }

    fn program(
        &self,
        format: ColorFormat,
        stride: u32,
        height: u32,
        area: Area,
        color: u32,
    ) -> Result<Ge2dRegs, EngineFault> {
        if !self.caps.supports(format) {
            return Err(EngineFault::Unsupported(format!(
                "ge2d cannot write {format:?}"
            )));
        }
        let bytes = format.bytes_per_pixel();
        if stride % bytes != 0 {
            return Err(EngineFault::Misaligned(format!(
                "pitch {stride} is not a whole number of {bytes} byte pixels"
            )));
        }
        if area.is_empty() || area.x1 < 0 || area.y1 < 0 {
            return Err(EngineFault::Unsupported(format!(
                "invalid fill rectangle {area:?}"
            )));
        }
        Ok(Ge2dRegs {
            bpp: bytes * 8,
            pitch: stride / bytes,
            height,
            clip_tl: (area.x1 as u32, area.y1 as u32),
            clip_br: (area.x2 as u32, area.y2 as u32),
            dst_xy: (area.x1 as u32, area.y1 as u32),
            size: (area.width(), area.height()),
            color,
        })
    }

    fn run(regs: &Ge2dRegs, dst: &mut [u8]) {
        let bytes = (regs.bpp / 8) as usize;
        let x1 = regs.dst_xy.0.max(regs.clip_tl.0);
        let y1 = regs.dst_xy.1.max(regs.clip_tl.1);
        let x2 = (regs.dst_xy.0 + regs.size.0 - 1)
            .min(regs.clip_br.0)
            .min(regs.pitch - 1);
        let y2 = (regs.dst_xy.1 + regs.size.1 - 1)
            .min(regs.clip_br.1)
            .min(regs.height - 1);
        if x2 < x1 || y2 < y1 {
            return;
        }
        let word = regs.color.to_le_bytes();
        let pitch = regs.pitch as usize * bytes;
        fill_rows(
            dst,
            Span {
                base: y1 as usize * pitch + x1 as usize * bytes,
                pitch,
            },
            (y2 - y1 + 1) as usize,
            (x2 - x1 + 1) as usize,
            &word[..bytes],
        );
    }
}

impl Engine for Ge2d {
    fn kind(&self) -> EngineKind {
        EngineKind::Ge2d
    }

    fn caps(&self) -> &EngineCaps {
        &self.caps
    }

    fn start(&self, op: &HwOp<'_>) -> Result<(), EngineFault> {
        let HwOp::Fill { dst, area, color } = *op else {
            return Err(EngineFault::Unsupported("ge2d has no blit path".to_owned()));
        };
        let regs = self.program(
            dst.format(),
            dst.stride(),
            dst.height(),
            area,
            color.fill_word(dst.format()),
        )?;
        tracing::debug!(?regs, "ge2d programmed");
        self.completion.begin()?;
        *self.regs.lock() = regs;
        Self::run(&regs, &mut dst.pixels_mut());
        Ok(())
    }

    fn poll(&self) -> EngineStatus {
        self.completion.poll()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/engine/ge2d.rs"]
mod tests;
