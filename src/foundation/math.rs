/// FNV-1a 64-bit hasher, used for stable surface digests.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Fnv1a64(u64);

impl Fnv1a64 {
    pub(crate) const OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01B3;

    pub(crate) fn new_default() -> Self {
        Self(Self::OFFSET_BASIS)
    }

    pub(crate) fn write_u32(&mut self, v: u32) {
        self.write_bytes(&v.to_le_bytes());
    }

    pub(crate) fn write_bytes(&mut self, bytes: &[u8]) {
        let mut h = self.0;
        for &b in bytes {
            h ^= u64::from(b);
            h = h.wrapping_mul(Self::PRIME);
        }
        self.0 = h;
    }

    pub(crate) fn finish(self) -> u64 {
        self.0
    }
}

pub(crate) fn mul_div255_u16(x: u16, y: u16) -> u16 {
    (((u32::from(x) * u32::from(y)) + 127) / 255) as u16
}

pub(crate) fn mul_div255_u8(x: u16, y: u16) -> u8 {
    mul_div255_u16(x, y) as u8
}

/// Linear mix `fg * a + bg * (255 - a)` in 8-bit fixed point.
pub(crate) fn mix_u8(fg: u8, bg: u8, a: u8) -> u8 {
    let a = u32::from(a);
    ((u32::from(fg) * a + u32::from(bg) * (255 - a) + 127) / 255) as u8
}

/// Round `v` down to a multiple of `align` (`align` must be non-zero).
pub(crate) fn align_down(v: usize, align: usize) -> usize {
    v - (v % align)
}

/// Round `v` up to a multiple of `align` (`align` must be non-zero).
pub(crate) fn align_up(v: usize, align: usize) -> usize {
    v.div_ceil(align) * align
}
