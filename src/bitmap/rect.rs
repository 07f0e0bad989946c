//! Integer rectangles used for clip, dirty and undo regions

/// Axis-aligned rectangle; `w`/`h` of zero or less means empty
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
}

impl Rect {
    pub const fn new(x: i32, y: i32, w: i32, h: i32) -> Self {
        Self { x, y, w, h }
    }

    /// From inclusive corners in any order. Extents wider than `i32::MAX`
    /// saturate, keeping the left/top corner.
    pub fn from_corners(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
        let (left, right) = (x1.min(x2), x1.max(x2));
        let (top, bottom) = (y1.min(y2), y1.max(y2));
        Self::new(left, top, extent(left, right), extent(top, bottom))
    }

    pub fn is_empty(&self) -> bool {
        self.w <= 0 || self.h <= 0
    }

    /// Inclusive right edge
    pub fn right(&self) -> i32 {
        edge(self.x, self.w)
    }

    /// Inclusive bottom edge
    pub fn bottom(&self) -> i32 {
        edge(self.y, self.h)
    }

    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= self.x && y >= self.y && x <= self.right() && y <= self.bottom()
    }

    pub fn intersect(&self, other: &Rect) -> Rect {
        let left = self.x.max(other.x);
        let top = self.y.max(other.y);
        let right = self.right().min(other.right());
        let bottom = self.bottom().min(other.bottom());

        if right < left || bottom < top {
            return Rect::default();
        }
        Rect::from_corners(left, top, right, bottom)
    }

    pub fn union(&self, other: &Rect) -> Rect {
        if self.is_empty() {
            return *other;
        }
        if other.is_empty() {
            return *self;
        }
        Rect::from_corners(
            self.x.min(other.x),
            self.y.min(other.y),
            self.right().max(other.right()),
            self.bottom().max(other.bottom()),
        )
    }

    /// Grow by `n` pixels on every side
    pub fn inflate(&self, n: i32) -> Rect {
        if self.is_empty() {
            return *self;
        }
        Rect::new(
            self.x.saturating_sub(n),
            self.y.saturating_sub(n),
            self.w.saturating_add(n.saturating_mul(2)),
            self.h.saturating_add(n.saturating_mul(2)),
        )
    }

    /// Pixel count (0 when empty)
    pub fn area(&self) -> usize {
        if self.is_empty() {
            0
        } else {
            self.w as usize * self.h as usize
        }
    }
}

fn extent(lo: i32, hi: i32) -> i32 {
    (hi as i64 - lo as i64 + 1).min(i32::MAX as i64) as i32
}

fn edge(origin: i32, size: i32) -> i32 {
    (origin as i64 + size as i64 - 1).clamp(i32::MIN as i64, i32::MAX as i64) as i32
}
