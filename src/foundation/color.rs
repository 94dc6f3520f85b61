use crate::foundation::math::{mix_u8, mul_div255_u8};

/// Fully transparent: nothing is drawn.
pub const OPA_TRANSP: u8 = 0;
/// At or below this opacity a draw is skipped entirely.
pub const OPA_MIN: u8 = 2;
/// At or above this opacity a draw is treated as fully covering.
pub const OPA_MAX: u8 = 253;
/// Fully opaque.
pub const OPA_COVER: u8 = 255;

/// Pixel layout of a [`Surface`](crate::Surface).
///
/// Multi-byte formats are little-endian `B, G, R[, A]`, matching the display controllers the
/// accelerators feed.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum ColorFormat {
    /// 16-bit `r5g6b5`.
    Rgb565,
    /// 24-bit packed `B, G, R`.
    Rgb888,
    /// 32-bit `B, G, R, A` with straight alpha.
    Argb8888,
    /// 32-bit `B, G, R, X`; the fourth byte is written as `0xFF` and ignored on read.
    Xrgb8888,
    /// 8-bit luminance.
    L8,
}

impl ColorFormat {
    /// Bytes used by one pixel.
    pub const fn bytes_per_pixel(self) -> u32 {
        match self {
            Self::Rgb565 => 2,
            Self::Rgb888 => 3,
            Self::Argb8888 | Self::Xrgb8888 => 4,
            Self::L8 => 1,
        }
    }

    /// Return `true` when the format stores a per-pixel alpha channel.
    pub const fn has_alpha(self) -> bool {
        matches!(self, Self::Argb8888)
    }

    /// Return `true` for the two 32-bit layouts.
    pub const fn is_32bit(self) -> bool {
        matches!(self, Self::Argb8888 | Self::Xrgb8888)
    }
}

/// Straight-alpha ARGB color.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Color32 {
    /// Alpha channel.
    pub a: u8,
    /// Red channel.
    pub r: u8,
    /// Green channel.
    pub g: u8,
    /// Blue channel.
    pub b: u8,
}

impl Color32 {
    /// Opaque black.
    pub const BLACK: Self = Self::new(255, 0, 0, 0);
    /// Opaque white.
    pub const WHITE: Self = Self::new(255, 255, 255, 255);
    /// Fully transparent black.
    pub const TRANSPARENT: Self = Self::new(0, 0, 0, 0);

    /// Create a color from straight-alpha channels.
    pub const fn new(a: u8, r: u8, g: u8, b: u8) -> Self {
        Self { a, r, g, b }
    }

    /// Opaque color from RGB channels.
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self::new(255, r, g, b)
    }

    /// Decode `0xAARRGGBB`.
    pub const fn from_argb_u32(v: u32) -> Self {
        Self::new((v >> 24) as u8, (v >> 16) as u8, (v >> 8) as u8, v as u8)
    }

    /// Encode as `0xAARRGGBB`.
    pub const fn to_argb_u32(self) -> u32 {
        ((self.a as u32) << 24) | ((self.r as u32) << 16) | ((self.g as u32) << 8) | self.b as u32
    }

    /// Pack into `r5g6b5`.
    pub const fn to_rgb565(self) -> u16 {
        (((self.r as u16) >> 3) << 11) | (((self.g as u16) >> 2) << 5) | ((self.b as u16) >> 3)
    }

    /// Unpack `r5g6b5` into an opaque color.
    pub const fn from_rgb565(v: u16) -> Self {
        let r = ((v >> 11) & 0x1f) as u8;
        let g = ((v >> 5) & 0x3f) as u8;
        let b = (v & 0x1f) as u8;
        Self::rgb((r << 3) | (r >> 2), (g << 2) | (g >> 4), (b << 3) | (b >> 2))
    }

    /// Perceptual luminance.
    pub const fn luma(self) -> u8 {
        ((self.r as u32 * 77 + self.g as u32 * 150 + self.b as u32 * 29) >> 8) as u8
    }

    /// Same color with a different alpha.
    pub const fn with_alpha(self, a: u8) -> Self {
        Self::new(a, self.r, self.g, self.b)
    }

    /// Channel-wise linear mix: `self` weighted by `t`, `other` by `255 - t`.
    pub fn mix(self, other: Self, t: u8) -> Self {
        Self::new(
            mix_u8(self.a, other.a, t),
            mix_u8(self.r, other.r, t),
            mix_u8(self.g, other.g, t),
            mix_u8(self.b, other.b, t),
        )
    }

    /// Native fill word for hardware fill registers (16-bit for `Rgb565`, ARGB otherwise).
    pub const fn fill_word(self, format: ColorFormat) -> u32 {
        match format {
            ColorFormat::Rgb565 => self.to_rgb565() as u32,
            ColorFormat::Xrgb8888 => self.with_alpha(255).to_argb_u32(),
            _ => self.to_argb_u32(),
        }
    }
}

/// Write `color` into one pixel slot.
pub fn encode_pixel(format: ColorFormat, color: Color32, out: &mut [u8]) {
    match format {
        ColorFormat::Rgb565 => out[..2].copy_from_slice(&color.to_rgb565().to_le_bytes()),
        ColorFormat::Rgb888 => out[..3].copy_from_slice(&[color.b, color.g, color.r]),
        ColorFormat::Argb8888 => out[..4].copy_from_slice(&[color.b, color.g, color.r, color.a]),
        ColorFormat::Xrgb8888 => out[..4].copy_from_slice(&[color.b, color.g, color.r, 0xff]),
        ColorFormat::L8 => out[0] = color.luma(),
    }
}

/// Read one pixel slot.
pub fn decode_pixel(format: ColorFormat, px: &[u8]) -> Color32 {
    match format {
        ColorFormat::Rgb565 => Color32::from_rgb565(u16::from_le_bytes([px[0], px[1]])),
        ColorFormat::Rgb888 | ColorFormat::Xrgb8888 => Color32::rgb(px[2], px[1], px[0]),
        ColorFormat::Argb8888 => Color32::new(px[3], px[2], px[1], px[0]),
        ColorFormat::L8 => Color32::rgb(px[0], px[0], px[0]),
    }
}

/// Source-over blend of `src` scaled by `opa` into one destination pixel.
///
/// Destinations without alpha mix directly; `Argb8888` destinations composite straight alpha.
pub fn blend_pixel(format: ColorFormat, dst: &mut [u8], src: Color32, opa: u8) {
    let a = mul_div255_u8(u16::from(src.a), u16::from(opa));
    if a <= OPA_TRANSP {
        return;
    }
    if a == OPA_COVER {
        encode_pixel(format, src.with_alpha(OPA_COVER), dst);
        return;
    }

    let bg = decode_pixel(format, dst);
    if !format.has_alpha() {
        encode_pixel(format, src.with_alpha(OPA_COVER).mix(bg, a), dst);
        return;
    }

    let inv = 255 - u16::from(a);
    let bg_w = u16::from(mul_div255_u8(u16::from(bg.a), inv));
    let out_a = u16::from(a) + bg_w;
    if out_a == 0 {
        encode_pixel(format, Color32::TRANSPARENT, dst);
        return;
    }
    let ch = |s: u8, d: u8| -> u8 {
        ((u32::from(s) * u32::from(a) + u32::from(d) * u32::from(bg_w) + u32::from(out_a) / 2)
            / u32::from(out_a)) as u8
    };
    let out = Color32::new(
        out_a.min(255) as u8,
        ch(src.r, bg.r),
        ch(src.g, bg.g),
        ch(src.b, bg.b),
    );
    encode_pixel(format, out, dst);
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/color.rs"]
mod tests;
