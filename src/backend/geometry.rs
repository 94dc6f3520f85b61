use crate::foundation::core::Area;

/// Clipped destination and source rectangles of one draw.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlitGeometry {
    /// Screen-space pixels that will be written.
    pub screen: Area,
    /// `screen` relative to the destination buffer.
    pub dst: Area,
    /// Matching source rectangle, relative to the source surface (blits only).
    pub src: Option<Area>,
}

impl BlitGeometry {
    /// Geometry of a fill: `area ∩ clip ∩ buf_area`.
    pub fn fill(area: Area, clip: Area, buf_area: Area) -> Option<Self> {
        let screen = area.intersect(clip)?.intersect(buf_area)?;
        Some(Self {
            screen,
            dst: screen.relative_to(buf_area.origin()),
            src: None,
        })
    }

    /// Geometry of an untransformed blit whose source pixel `(0, 0)` lands on `area`'s origin.
    ///
    /// The source origin moves by the same delta the clip moved the destination origin, and the
    /// result is further cut to the source bounds so neither side is read or written out of
    /// range.
    pub fn blit(area: Area, clip: Area, buf_area: Area, src_bounds: Area) -> Option<Self> {
        let screen = area.intersect(clip)?.intersect(buf_area)?;
        let origin = area.origin();
        let src = screen.relative_to(origin).intersect(src_bounds)?;
        let screen = src.translate(origin.x, origin.y);
        Some(Self {
            screen,
            dst: screen.relative_to(buf_area.origin()),
            src: Some(src),
        })
    }
}

#[cfg(test)]
#[path = "../../tests/unit/backend/geometry.rs"]
mod tests;
