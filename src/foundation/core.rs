use crate::foundation::error::{DrawError, DrawResult};

/// Integer point in screen or buffer coordinates.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Point {
    /// Horizontal coordinate.
    pub x: i32,
    /// Vertical coordinate.
    pub y: i32,
}

impl Point {
    /// Create a point.
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Inclusive integer rectangle `(x1, y1) ..= (x2, y2)`.
///
/// An area with `x2 < x1` or `y2 < y1` is empty. Both screen-space task areas and
/// buffer-relative areas use this type.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Area {
    /// Left edge (inclusive).
    pub x1: i32,
    /// Top edge (inclusive).
    pub y1: i32,
    /// Right edge (inclusive).
    pub x2: i32,
    /// Bottom edge (inclusive).
    pub y2: i32,
}

impl Area {
    /// Create an area from inclusive corners.
    pub const fn new(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Create an area from an origin and a size in pixels.
    pub fn from_origin_size(x: i32, y: i32, width: u32, height: u32) -> DrawResult<Self> {
        if width == 0 || height == 0 {
            return Err(DrawError::validation("Area width and height must be > 0"));
        }
        let w = i32::try_from(width).map_err(|_| DrawError::validation("Area width overflow"))?;
        let h =
            i32::try_from(height).map_err(|_| DrawError::validation("Area height overflow"))?;
        Ok(Self {
            x1: x,
            y1: y,
            x2: x + w - 1,
            y2: y + h - 1,
        })
    }

    /// Width in pixels (0 when empty).
    pub fn width(self) -> u32 {
        if self.x2 < self.x1 {
            0
        } else {
            (self.x2 - self.x1) as u32 + 1
        }
    }

    /// Height in pixels (0 when empty).
    pub fn height(self) -> u32 {
        if self.y2 < self.y1 {
            0
        } else {
            (self.y2 - self.y1) as u32 + 1
        }
    }

    /// Number of pixels covered.
    pub fn size(self) -> u64 {
        u64::from(self.width()) * u64::from(self.height())
    }

    /// Return `true` when the area covers no pixels.
    pub fn is_empty(self) -> bool {
        self.x2 < self.x1 || self.y2 < self.y1
    }

    /// Top-left corner.
    pub fn origin(self) -> Point {
        Point::new(self.x1, self.y1)
    }

    /// Intersection of two areas, `None` when they do not overlap.
    pub fn intersect(self, other: Self) -> Option<Self> {
        let out = Self {
            x1: self.x1.max(other.x1),
            y1: self.y1.max(other.y1),
            x2: self.x2.min(other.x2),
            y2: self.y2.min(other.y2),
        };
        (!out.is_empty()).then_some(out)
    }

    /// Return `true` when both areas share at least one pixel.
    pub fn overlaps(self, other: Self) -> bool {
        self.intersect(other).is_some()
    }

    /// Return `true` when `other` lies fully inside `self`.
    pub fn contains(self, other: Self) -> bool {
        !other.is_empty()
            && other.x1 >= self.x1
            && other.y1 >= self.y1
            && other.x2 <= self.x2
            && other.y2 <= self.y2
    }

    /// Return `true` when the point lies inside the area.
    pub fn contains_point(self, p: Point) -> bool {
        p.x >= self.x1 && p.x <= self.x2 && p.y >= self.y1 && p.y <= self.y2
    }

    /// Shift the area by `(dx, dy)`.
    pub fn translate(self, dx: i32, dy: i32) -> Self {
        Self {
            x1: self.x1 + dx,
            y1: self.y1 + dy,
            x2: self.x2 + dx,
            y2: self.y2 + dy,
        }
    }

    /// Express the area relative to `origin` (i.e. subtract the origin).
    pub fn relative_to(self, origin: Point) -> Self {
        self.translate(-origin.x, -origin.y)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
