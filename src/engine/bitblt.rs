use std::time::Duration;

use parking_lot::Mutex;

use crate::engine::{
    BlitSupport, Completion, Engine, EngineCaps, EngineFault, EngineKind, EngineStatus, HwOp,
    mem::{Span, fill_rows, lock_pair},
};
use crate::foundation::color::{Color32, ColorFormat, blend_pixel, decode_pixel, encode_pixel};

const BITBLT_FORMATS: &[ColorFormat] = &[
    ColorFormat::Rgb565,
    ColorFormat::Argb8888,
    ColorFormat::Xrgb8888,
];

/// 16.16 fixed-point one.
const FIXED_ONE: i32 = 0x1_0000;

/// Largest source offset whose 16.16 form fits the offset registers.
const MAX_SRC_OFFSET: u32 = (i32::MAX / FIXED_ONE) as u32;

/// Colour multiplier channel value meaning 1.0.
const MULTIPLIER_ONE: i16 = 0x100;

/// Register file of the bit-block-transfer engine, as last programmed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BitbltRegs {
    /// `true` for a solid fill, `false` for a blit.
    pub fill_op: bool,
    /// Source pixel layout (blit only).
    pub src_format: Option<ColorFormat>,
    /// Destination pixel layout.
    pub display_format: Option<ColorFormat>,
    /// Source x offset, 16.16 fixed point.
    pub src_x_offset: i32,
    /// Source y offset, 16.16 fixed point.
    pub src_y_offset: i32,
    /// Source row pitch in bytes.
    pub src_stride: u32,
    /// Destination start offset in bytes.
    pub dst_base: usize,
    /// Destination rectangle `(w, h)`.
    pub dst_size: (u32, u32),
    /// Destination row pitch in bytes.
    pub dst_stride: u32,
    /// Colour multiplier `[a, r, g, b]`; colour channels use 0x100 as 1.0, alpha carries the
    /// global opacity.
    pub multiplier: [i16; 4],
    /// Honour per-pixel source alpha.
    pub transparency: bool,
    /// Fill colour, `0xAARRGGBB`.
    pub fill_color: u32,
}

/// Bit-block-transfer engine: fills and alpha-blended blits with identity transform.
#[derive(Debug)]
pub struct Bitblt {
    caps: EngineCaps,
    regs: Mutex<BitbltRegs>,
    completion: Completion,
}

impl Bitblt {
    /// Default capabilities: cost 70, 7200 px minimum layer, 4-byte alignment, blending blits,
    /// source offsets up to 32767 px.
    pub fn default_caps() -> EngineCaps {
        EngineCaps {
            formats: BITBLT_FORMATS,
            fill: true,
            blit: BlitSupport::Blend,
            cost: 70,
            min_layer_pixels: 7200,
            align: 4,
            max_rows: u32::MAX,
            max_src_offset: MAX_SRC_OFFSET,
        }
    }

    /// Engine with `caps` and a simulated completion latency.
    pub fn new(caps: EngineCaps, latency: Duration) -> Self {
        Self {
            caps,
            regs: Mutex::new(BitbltRegs::default()),
            completion: Completion::new(latency),
        }
    }

    /// Snapshot of the register file.
    pub fn registers(&self) -> BitbltRegs {
        *self.regs.lock()
    }

    fn check_format(&self, format: ColorFormat, side: &str) -> Result<(), EngineFault> {
        if self.caps.supports(format) {
            Ok(())
        } else {
            Err(EngineFault::Unsupported(format!(
                "bitblt {side} format {format:?}"
            )))
        }
    }

    fn program(&self, op: &HwOp<'_>) -> Result<BitbltRegs, EngineFault> {
        match *op {
            HwOp::Fill { dst, area, color } => {
                self.check_format(dst.format(), "display")?;
                Ok(BitbltRegs {
                    fill_op: true,
                    display_format: Some(dst.format()),
                    dst_base: dst.offset_of(area.x1 as u32, area.y1 as u32),
                    dst_size: (area.width(), area.height()),
                    dst_stride: dst.stride(),
                    multiplier: [MULTIPLIER_ONE; 4],
                    fill_color: color.to_argb_u32(),
                    ..BitbltRegs::default()
                })
            }
            HwOp::Blit {
                src,
                src_area,
                dst,
                dst_pos,
                opa,
            } => {
                self.check_format(src.format(), "source")?;
                self.check_format(dst.format(), "display")?;
                let fixed = |v: i32| {
                    v.checked_mul(FIXED_ONE).ok_or_else(|| {
                        EngineFault::Unsupported(format!("source offset {v} exceeds 16.16 range"))
                    })
                };
                Ok(BitbltRegs {
                    fill_op: false,
                    src_format: Some(src.format()),
                    display_format: Some(dst.format()),
                    src_x_offset: fixed(src_area.x1)?,
                    src_y_offset: fixed(src_area.y1)?,
                    src_stride: src.stride(),
                    dst_base: dst.offset_of(dst_pos.x as u32, dst_pos.y as u32),
                    dst_size: (src_area.width(), src_area.height()),
                    dst_stride: dst.stride(),
                    multiplier: [i16::from(opa), MULTIPLIER_ONE, MULTIPLIER_ONE, MULTIPLIER_ONE],
                    transparency: src.format().has_alpha(),
                    fill_color: 0,
                })
            }
        }
    }

    fn run_fill(regs: &BitbltRegs, format: ColorFormat, dst: &mut [u8]) {
        let bpp = format.bytes_per_pixel() as usize;
        let mut word = [0u8; 4];
        encode_pixel(format, Color32::from_argb_u32(regs.fill_color), &mut word);
        fill_rows(
            dst,
            Span {
                base: regs.dst_base,
                pitch: regs.dst_stride as usize,
            },
            regs.dst_size.1 as usize,
            regs.dst_size.0 as usize,
            &word[..bpp],
        );
    }

    fn run_blit(
        regs: &BitbltRegs,
        src_format: ColorFormat,
        src: &[u8],
        dst_format: ColorFormat,
        dst: &mut [u8],
    ) {
        let sbpp = src_format.bytes_per_pixel() as usize;
        let dbpp = dst_format.bytes_per_pixel() as usize;
        let sx0 = (regs.src_x_offset / FIXED_ONE) as usize;
        let sy0 = (regs.src_y_offset / FIXED_ONE) as usize;
        let opa = regs.multiplier[0].clamp(0, 255) as u8;

        for y in 0..regs.dst_size.1 as usize {
            let s_row = (sy0 + y) * regs.src_stride as usize + sx0 * sbpp;
            let d_row = regs.dst_base + y * regs.dst_stride as usize;
            for x in 0..regs.dst_size.0 as usize {
                let s = s_row + x * sbpp;
                let mut c = decode_pixel(src_format, &src[s..s + sbpp]);
                if !regs.transparency {
                    c = c.with_alpha(255);
                }
                let d = d_row + x * dbpp;
                blend_pixel(dst_format, &mut dst[d..d + dbpp], c, opa);
            }
        }
    }
}

impl Engine for Bitblt {
    fn kind(&self) -> EngineKind {
        EngineKind::Bitblt
    }

    fn caps(&self) -> &EngineCaps {
        &self.caps
    }

    fn start(&self, op: &HwOp<'_>) -> Result<(), EngineFault> {
        let regs = self.program(op)?;
        tracing::debug!(?regs, "bitblt programmed");
        self.completion.begin()?;
        *self.regs.lock() = regs;
        match *op {
            HwOp::Fill { dst, .. } => Self::run_fill(&regs, dst.format(), &mut dst.pixels_mut()),
            HwOp::Blit { src, dst, .. } => {
                let (src_px, mut dst_px) = lock_pair(src, dst);
                Self::run_blit(&regs, src.format(), &src_px, dst.format(), &mut dst_px);
            }
        }
        Ok(())
    }

    fn poll(&self) -> EngineStatus {
        self.completion.poll()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/engine/bitblt.rs"]
mod tests;
