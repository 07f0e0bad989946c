//! Flood fill into the coverage mask, then paint (optionally feathered)

use tracing::debug;

use crate::bitmap::{Bitmap, PaintContext, Rect};
use crate::blend::{get_a, get_b, get_g, get_r};
use crate::core::{Cooperative, Outcome};
use crate::render::{feather, Job};
use crate::stroke::{Map, MAP_SET};

/// How a filled region is painted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FillStyle {
    pub color: u32,
    /// Base transparency, 0 = full effect
    pub trans: i32,
    /// Feather radius in pixels, 0 = hard edge
    pub feather: i32,
}

/// Largest per-channel difference, alpha included
#[inline]
fn distance(a: u32, b: u32) -> i32 {
    (get_r(a) - get_r(b))
        .abs()
        .max((get_g(a) - get_g(b)).abs())
        .max((get_b(a) - get_b(b)).abs())
        .max((get_a(a) - get_a(b)).abs())
}

/// Mark the 4-connected region around `(x, y)` whose colors are within
/// `range` of the seed color. The fill stays inside the clip rectangle.
///
/// Returns the bounds of the marked region (empty if the seed is clipped).
pub fn flood(bmp: &Bitmap, map: &mut Map, x: i32, y: i32, range: i32) -> Rect {
    let clip = bmp.clip().intersect(&map.full_rect());
    if !clip.contains(x, y) {
        return Rect::default();
    }

    let seed = bmp.get_pixel(x, y);
    let range = range.max(0);
    let fillable = |map: &Map, x: i32, y: i32| {
        map.get(x, y) == 0 && distance(bmp.get_pixel(x, y), seed) <= range
    };

    let mut bounds = Rect::default();
    let mut stack = vec![(x, y)];

    while let Some((sx, sy)) = stack.pop() {
        if !fillable(map, sx, sy) {
            continue;
        }

        let mut lo = sx;
        while lo > clip.x && fillable(map, lo - 1, sy) {
            lo -= 1;
        }
        let mut hi = sx;
        while hi < clip.right() && fillable(map, hi + 1, sy) {
            hi += 1;
        }

        map.hline(lo, sy, hi, MAP_SET);
        bounds = bounds.union(&Rect::from_corners(lo, sy, hi, sy));

        for ny in [sy - 1, sy + 1] {
            if ny < clip.y || ny > clip.bottom() {
                continue;
            }
            let mut in_run = false;
            for nx in lo..=hi {
                if fillable(map, nx, ny) {
                    if !in_run {
                        stack.push((nx, ny));
                        in_run = true;
                    }
                } else {
                    in_run = false;
                }
            }
        }
    }

    debug!("[Fill] flood from ({}, {}) range {}: {:?}", x, y, range, bounds);
    bounds
}

/// Paint the region marked by [`flood`]; the mask is cleared afterwards
pub fn apply(
    bmp: &mut Bitmap,
    map: &mut Map,
    bounds: Rect,
    style: FillStyle,
    ctx: &PaintContext,
    coop: &mut Cooperative,
) -> Outcome {
    let outcome = {
        let mut job = Job::new(bmp, map, ctx, coop, bounds);
        feather(&mut job, style.color, style.trans.clamp(0, 255), style.feather)
    };
    map.clear();
    outcome
}
