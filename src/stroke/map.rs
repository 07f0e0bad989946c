//! Single-channel coverage mask
//!
//! One byte per canvas pixel. Strokes write [`MAP_SET`]; the render passes
//! use the remaining values as transient working bits and clear the mask
//! when they finish.

use crate::bitmap::{line_walk, Bitmap, Rect};
use crate::brush::Brush;

/// Value written for covered pixels
pub const MAP_SET: u8 = 255;

/// Brush tip as a list of offsets plus its Chebyshev reach
#[derive(Debug, Clone)]
pub struct Tip {
    offsets: Vec<(i32, i32)>,
    reach: i32,
}

impl Tip {
    pub fn new(offsets: Vec<(i32, i32)>) -> Self {
        let reach = offsets
            .iter()
            .map(|&(x, y)| x.abs().max(y.abs()))
            .max()
            .unwrap_or(0);
        Self { offsets, reach }
    }

    pub fn from_brush(brush: &Brush, scale: i32) -> Self {
        Self::new(brush.stamp_scaled(scale))
    }

    /// `scale`x`scale` block used for hairline outlines at a given magnification
    pub fn square(scale: i32) -> Self {
        let scale = scale.max(1);
        let offsets = (0..scale)
            .flat_map(|y| (0..scale).map(move |x| (x - scale / 2, y - scale / 2)))
            .collect();
        Self::new(offsets)
    }

    pub fn reach(&self) -> i32 {
        self.reach
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Map {
    w: i32,
    h: i32,
    data: Vec<u8>,
}

impl Map {
    pub fn new(w: i32, h: i32) -> Self {
        let w = w.max(1);
        let h = h.max(1);
        Self {
            w,
            h,
            data: vec![0; w as usize * h as usize],
        }
    }

    /// Mask sized to match `bmp`
    pub fn for_bitmap(bmp: &Bitmap) -> Self {
        Self::new(bmp.width(), bmp.height())
    }

    /// Match `bmp`'s dimensions, keeping the overlapping part of the mask
    pub fn resize_to(&mut self, bmp: &Bitmap) {
        let (w, h) = (bmp.width(), bmp.height());
        if (w, h) == (self.w, self.h) {
            return;
        }
        let mut data = vec![0u8; w as usize * h as usize];
        let keep_w = w.min(self.w) as usize;
        for y in 0..h.min(self.h) as usize {
            let src = y * self.w as usize;
            let dst = y * w as usize;
            data[dst..dst + keep_w].copy_from_slice(&self.data[src..src + keep_w]);
        }
        self.w = w;
        self.h = h;
        self.data = data;
    }

    pub fn width(&self) -> i32 {
        self.w
    }

    pub fn height(&self) -> i32 {
        self.h
    }

    pub fn full_rect(&self) -> Rect {
        Rect::new(0, 0, self.w, self.h)
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    pub fn clear(&mut self) {
        self.data.fill(0);
    }

    #[inline]
    fn in_bounds(&self, x: i32, y: i32) -> bool {
        x >= 0 && y >= 0 && x < self.w && y < self.h
    }

    /// Out-of-range reads return 0
    #[inline]
    pub fn get(&self, x: i32, y: i32) -> u8 {
        if self.in_bounds(x, y) {
            self.data[y as usize * self.w as usize + x as usize]
        } else {
            0
        }
    }

    #[inline]
    pub fn set(&mut self, x: i32, y: i32, v: u8) {
        if self.in_bounds(x, y) {
            let i = y as usize * self.w as usize + x as usize;
            self.data[i] = v;
        }
    }

    pub fn hline(&mut self, x1: i32, y: i32, x2: i32, v: u8) {
        if y < 0 || y >= self.h {
            return;
        }
        let lo = x1.min(x2).max(0);
        let hi = x1.max(x2).min(self.w - 1);
        if lo > hi {
            return;
        }
        let row = y as usize * self.w as usize;
        self.data[row + lo as usize..=row + hi as usize].fill(v);
    }

    pub fn line(&mut self, x1: i32, y1: i32, x2: i32, y2: i32, v: u8) {
        let clip = self.full_rect();
        line_walk(x1, y1, x2, y2, &clip, |x, y| self.set(x, y, v));
    }

    pub fn rect(&mut self, x1: i32, y1: i32, x2: i32, y2: i32, v: u8) {
        let r = Rect::from_corners(x1, y1, x2, y2);
        self.hline(r.x, r.y, r.right(), v);
        self.hline(r.x, r.bottom(), r.right(), v);
        for y in r.y..=r.bottom() {
            self.set(r.x, y, v);
            self.set(r.right(), y, v);
        }
    }

    pub fn rectfill(&mut self, x1: i32, y1: i32, x2: i32, y2: i32, v: u8) {
        let r = Rect::from_corners(x1, y1, x2, y2).intersect(&self.full_rect());
        if r.is_empty() {
            return;
        }
        for y in r.y..=r.bottom() {
            self.hline(r.x, y, r.right(), v);
        }
    }

    pub fn oval(&mut self, x1: i32, y1: i32, x2: i32, y2: i32, v: u8) {
        for (x, y) in oval_outline(x1, y1, x2, y2) {
            self.set(x, y, v);
        }
    }

    pub fn ovalfill(&mut self, x1: i32, y1: i32, x2: i32, y2: i32, v: u8) {
        let r = Rect::from_corners(x1, y1, x2, y2);
        for (i, span) in oval_spans(&r).into_iter().enumerate() {
            if let Some((lo, hi)) = span {
                self.hline(lo, r.y + i as i32, hi, v);
            }
        }
    }

    /// Even-odd fill of a closed polygon, sampled at pixel centers
    pub fn polyfill(&mut self, points: &[(i32, i32)], v: u8) {
        if points.len() < 3 {
            return;
        }

        let top = points.iter().map(|p| p.1).min().unwrap_or(0).max(0);
        let bottom = points.iter().map(|p| p.1).max().unwrap_or(0).min(self.h - 1);
        let mut crossings: Vec<f64> = Vec::new();

        for y in top..=bottom {
            let py = y as f64;
            crossings.clear();

            for (i, &(ax, ay)) in points.iter().enumerate() {
                let (bx, by) = points[(i + 1) % points.len()];
                let (ay, by) = (ay as f64, by as f64);
                if (ay <= py && py < by) || (by <= py && py < ay) {
                    let t = (py - ay) / (by - ay);
                    crossings.push(ax as f64 + t * (bx - ax) as f64);
                }
            }

            crossings.sort_by(|a, b| a.total_cmp(b));
            for pair in crossings.chunks_exact(2) {
                let lo = pair[0].ceil() as i32;
                let hi = pair[1].ceil() as i32 - 1;
                if lo <= hi {
                    self.hline(lo, y, hi, v);
                }
            }
        }
    }

    /// Mark every tip offset around `(x, y)`
    pub fn stamp(&mut self, tip: &Tip, x: i32, y: i32) {
        let r = tip.reach;
        if x + r < 0 || y + r < 0 || x - r >= self.w || y - r >= self.h {
            return;
        }
        for &(dx, dy) in &tip.offsets {
            self.set(x + dx, y + dy, MAP_SET);
        }
    }

    pub fn stamp_line(&mut self, tip: &Tip, x1: i32, y1: i32, x2: i32, y2: i32) {
        // Centers up to `reach` outside the map still touch it
        let clip = self.full_rect().inflate(tip.reach);
        line_walk(x1, y1, x2, y2, &clip, |x, y| self.stamp(tip, x, y));
    }

    pub fn count_set(&self) -> usize {
        self.data.iter().filter(|&&v| v != 0).count()
    }

    /// Tight box around non-zero pixels; empty when nothing is set
    pub fn bounds(&self) -> Rect {
        let mut out = Rect::default();
        for (y, row) in self.data.chunks_exact(self.w as usize).enumerate() {
            let first = row.iter().position(|&v| v != 0);
            let last = row.iter().rposition(|&v| v != 0);
            if let (Some(lo), Some(hi)) = (first, last) {
                let span = Rect::from_corners(lo as i32, y as i32, hi as i32, y as i32);
                out = out.union(&span);
            }
        }
        out
    }
}

/// Per-row `(lo, hi)` spans of the ellipse inscribed in `r`
fn oval_spans(r: &Rect) -> Vec<Option<(i32, i32)>> {
    if r.is_empty() {
        return Vec::new();
    }

    let rx = r.w as f64 / 2.0;
    let ry = r.h as f64 / 2.0;
    let cx = r.x as f64 + rx;
    let cy = r.y as f64 + ry;
    // lo + hi of every span
    let mirror = 2 * r.x + r.w - 1;

    (0..r.h)
        .map(|i| {
            let dy = (r.y as f64 + i as f64 + 0.5 - cy) / ry;
            let k = 1.0 - dy * dy;
            if k < 0.0 {
                return None;
            }
            let half = rx * k.sqrt();
            let lo = (cx - half - 0.5).ceil() as i32;
            let hi = mirror - lo;
            if lo > hi {
                // Thin rows still get their center pixel(s)
                let mid = mirror.div_euclid(2);
                return Some((mid, mirror - mid));
            }
            Some((lo, hi))
        })
        .collect()
}

/// Connected one-pixel outline of the ellipse inscribed in the corners
pub fn oval_outline(x1: i32, y1: i32, x2: i32, y2: i32) -> Vec<(i32, i32)> {
    let r = Rect::from_corners(x1, y1, x2, y2);
    let spans = oval_spans(&r);

    let inside = |i: i32, x: i32| -> bool {
        if i < 0 || i >= spans.len() as i32 {
            return false;
        }
        matches!(spans[i as usize], Some((lo, hi)) if x >= lo && x <= hi)
    };

    let mut out = Vec::new();
    for (i, span) in spans.iter().enumerate() {
        let Some((lo, hi)) = *span else { continue };
        let i = i as i32;
        for x in lo..=hi {
            if x == lo || x == hi || !inside(i - 1, x) || !inside(i + 1, x) {
                out.push((x, r.y + i));
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_set_bounds_checked() {
        let mut map = Map::new(4, 4);
        map.set(-1, 0, MAP_SET);
        map.set(4, 4, MAP_SET);
        assert_eq!(map.count_set(), 0);
        assert_eq!(map.get(-100, 2), 0);

        map.set(2, 3, MAP_SET);
        assert_eq!(map.get(2, 3), MAP_SET);
    }

    #[test]
    fn test_rectfill_and_bounds() {
        let mut map = Map::new(20, 20);
        map.rectfill(15, 12, 3, 4, MAP_SET);
        assert_eq!(map.count_set(), 13 * 9);
        assert_eq!(map.bounds(), Rect::new(3, 4, 13, 9));

        map.clear();
        assert!(map.bounds().is_empty());
    }

    #[test]
    fn test_rect_outline() {
        let mut map = Map::new(10, 10);
        map.rect(1, 1, 5, 4, MAP_SET);
        assert_eq!(map.count_set(), 2 * 5 + 2 * 2);
        assert_eq!(map.get(3, 2), 0);
    }

    #[test]
    fn test_ovalfill_is_symmetric_and_inside_box() {
        let mut map = Map::new(40, 40);
        map.ovalfill(5, 5, 24, 34, MAP_SET);
        let b = map.bounds();
        assert_eq!(b, Rect::new(5, 5, 20, 30));

        for y in 0..40 {
            for x in 0..40 {
                assert_eq!(map.get(x, y), map.get(29 - x, y), "({}, {})", x, y);
            }
        }
    }

    #[test]
    fn test_oval_outline_within_fill() {
        let mut fill = Map::new(32, 32);
        fill.ovalfill(2, 3, 28, 20, MAP_SET);
        let mut outline = Map::new(32, 32);
        outline.oval(2, 3, 28, 20, MAP_SET);

        assert!(outline.count_set() > 0);
        assert!(outline.count_set() < fill.count_set());
        for y in 0..32 {
            for x in 0..32 {
                if outline.get(x, y) != 0 {
                    assert_ne!(fill.get(x, y), 0);
                }
            }
        }
    }

    #[test]
    fn test_polyfill_square_and_triangle() {
        let mut map = Map::new(16, 16);
        map.polyfill(&[(2, 2), (10, 2), (10, 10), (2, 10)], MAP_SET);
        assert_eq!(map.count_set(), 8 * 8);

        map.clear();
        map.polyfill(&[(0, 0), (12, 0), (0, 12)], MAP_SET);
        assert_ne!(map.get(1, 1), 0);
        assert_eq!(map.get(11, 11), 0);

        map.clear();
        map.polyfill(&[(0, 0), (5, 5)], MAP_SET);
        assert_eq!(map.count_set(), 0);
    }

    #[test]
    fn test_stamp_line_and_far_stamp() {
        let mut map = Map::new(16, 16);
        let tip = Tip::square(3);
        map.stamp_line(&tip, 2, 8, 12, 8);
        assert_eq!(map.bounds(), Rect::new(1, 7, 13, 3));

        let before = map.clone();
        map.stamp(&tip, 1000, -1000);
        assert_eq!(map, before);

        // Far endpoints only walk the span near the map
        map.clear();
        map.stamp_line(&tip, i32::MIN, 4, i32::MAX, 4);
        assert_eq!(map.bounds(), Rect::new(0, 3, 16, 3));
        map.line(5, i32::MIN, 5, i32::MAX, MAP_SET);
        assert_eq!(map.get(5, 0), MAP_SET);
        assert_eq!(map.get(5, 15), MAP_SET);
    }

    #[test]
    fn test_resize_keeps_overlap() {
        let mut map = Map::new(8, 8);
        map.rectfill(2, 2, 7, 7, MAP_SET);

        map.resize_to(&Bitmap::new(12, 4));
        assert_eq!((map.width(), map.height()), (12, 4));
        assert_eq!(map.bounds(), Rect::new(2, 2, 6, 2));

        map.resize_to(&Bitmap::new(12, 4));
        assert_eq!(map.count_set(), 12);
    }
}
