//! Half-open pixel regions.
//!
//! [`Roi`] describes a box `[xbegin, xend) x [ybegin, yend) x [zbegin, zend)`
//! in absolute pixel coordinates. Data windows may start at negative
//! coordinates, so all bounds are signed.
//!
//! ```text
//! (xbegin, ybegin) ────────► X
//!   │   ┌──────────┐
//!   │   │  region  │
//!   │   └──────────┘ (xend, yend), exclusive
//!   ▼
//!   Y
//! ```

/// A 3D region of interest with exclusive upper bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Roi {
    /// First column (inclusive)
    pub xbegin: i32,
    /// One past the last column
    pub xend: i32,
    /// First row (inclusive)
    pub ybegin: i32,
    /// One past the last row
    pub yend: i32,
    /// First plane (inclusive)
    pub zbegin: i32,
    /// One past the last plane
    pub zend: i32,
}

impl Roi {
    /// Creates a region from its bounds.
    #[inline]
    pub const fn new(xbegin: i32, xend: i32, ybegin: i32, yend: i32, zbegin: i32, zend: i32) -> Self {
        Self {
            xbegin,
            xend,
            ybegin,
            yend,
            zbegin,
            zend,
        }
    }

    /// Creates a region from an origin and a size.
    #[inline]
    pub const fn from_origin(x: i32, y: i32, z: i32, width: u32, height: u32, depth: u32) -> Self {
        Self::new(
            x,
            x + width as i32,
            y,
            y + height as i32,
            z,
            z + depth as i32,
        )
    }

    /// Width in pixels (0 if inverted).
    #[inline]
    pub const fn width(&self) -> u32 {
        if self.xend > self.xbegin { (self.xend - self.xbegin) as u32 } else { 0 }
    }

    /// Height in pixels (0 if inverted).
    #[inline]
    pub const fn height(&self) -> u32 {
        if self.yend > self.ybegin { (self.yend - self.ybegin) as u32 } else { 0 }
    }

    /// Depth in planes (0 if inverted).
    #[inline]
    pub const fn depth(&self) -> u32 {
        if self.zend > self.zbegin { (self.zend - self.zbegin) as u32 } else { 0 }
    }

    /// Number of pixels covered.
    #[inline]
    pub const fn npixels(&self) -> u64 {
        self.width() as u64 * self.height() as u64 * self.depth() as u64
    }

    /// Returns `true` if the region covers no pixels.
    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.npixels() == 0
    }

    /// Returns `true` if the pixel `(x, y, z)` lies inside.
    #[inline]
    pub const fn contains(&self, x: i32, y: i32, z: i32) -> bool {
        x >= self.xbegin
            && x < self.xend
            && y >= self.ybegin
            && y < self.yend
            && z >= self.zbegin
            && z < self.zend
    }

    /// Returns `true` if `other` lies entirely inside this region.
    #[inline]
    pub const fn contains_roi(&self, other: &Roi) -> bool {
        other.xbegin >= self.xbegin
            && other.xend <= self.xend
            && other.ybegin >= self.ybegin
            && other.yend <= self.yend
            && other.zbegin >= self.zbegin
            && other.zend <= self.zend
    }

    /// Overlap of two regions, `None` if they do not touch.
    pub fn intersect(&self, other: &Roi) -> Option<Roi> {
        let roi = Roi::new(
            self.xbegin.max(other.xbegin),
            self.xend.min(other.xend),
            self.ybegin.max(other.ybegin),
            self.yend.min(other.yend),
            self.zbegin.max(other.zbegin),
            self.zend.min(other.zend),
        );
        (!roi.is_empty()).then_some(roi)
    }
}

impl std::fmt::Display for Roi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[{}, {}) x [{}, {}) x [{}, {})",
            self.xbegin, self.xend, self.ybegin, self.yend, self.zbegin, self.zend
        )
    }
}
