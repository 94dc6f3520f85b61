//! Bus-side memory helpers shared by the engine models.

use parking_lot::RwLockWriteGuard;

use crate::surface::buffer::Surface;

/// Start offset and row pitch of a 2D transfer, in bytes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Span {
    pub(crate) base: usize,
    pub(crate) pitch: usize,
}

/// Write `word` (1..=4 bytes) into `rows` rows of `count` elements.
pub(crate) fn fill_rows(dst: &mut [u8], at: Span, rows: usize, count: usize, word: &[u8]) {
    let row_len = count * word.len();
    for r in 0..rows {
        let start = at.base + r * at.pitch;
        for slot in dst[start..start + row_len].chunks_exact_mut(word.len()) {
            slot.copy_from_slice(word);
        }
    }
}

/// Copy `rows` rows of `row_len` bytes between two pitched buffers.
pub(crate) fn copy_rows(
    src: &[u8],
    from: Span,
    dst: &mut [u8],
    to: Span,
    rows: usize,
    row_len: usize,
) {
    for r in 0..rows {
        let s = from.base + r * from.pitch;
        let d = to.base + r * to.pitch;
        dst[d..d + row_len].copy_from_slice(&src[s..s + row_len]);
    }
}

/// Source bytes and destination lock for a transfer.
///
/// When both sides are the same surface the source is snapshotted first, since the bus model
/// cannot hold a shared and an exclusive lock on one buffer at once.
pub(crate) fn lock_pair<'a>(
    src: &'a Surface,
    dst: &'a Surface,
) -> (SourceBytes<'a>, RwLockWriteGuard<'a, Vec<u8>>) {
    if src.id() == dst.id() {
        let snapshot = src.pixels().clone();
        (SourceBytes::Owned(snapshot), dst.pixels_mut())
    } else {
        (SourceBytes::Locked(src.pixels()), dst.pixels_mut())
    }
}

pub(crate) enum SourceBytes<'a> {
    Locked(parking_lot::RwLockReadGuard<'a, Vec<u8>>),
    Owned(Vec<u8>),
}

impl std::ops::Deref for SourceBytes<'_> {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        match self {
            Self::Locked(g) => g.as_slice(),
            Self::Owned(v) => v.as_slice(),
        }
    }
}
