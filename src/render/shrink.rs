//! 2x2 block morphology on the coverage mask
//!
//! A block's four mask pixels form a pattern (bit per corner). One pass
//! walks a grid of blocks, maps each pattern through a table and applies
//! the difference. Passes alternate between the two grid alignments so
//! changes propagate in both directions.

use crate::bitmap::Rect;
use crate::core::Cooperative;
use crate::stroke::{Map, MAP_SET};

const TL: u8 = 1;
const TR: u8 = 2;
const BL: u8 = 4;
const BR: u8 = 8;

const CORNERS: [(i32, i32, u8); 4] = [(0, 0, TL), (1, 0, TR), (0, 1, BL), (1, 1, BR)];

/// Erosion table: full and empty blocks stay, 3-of-4 and edge pairs lose
/// pixels asymmetrically, everything else is cleared
pub const SHRINK: [u8; 16] = [0, 0, 0, 1, 0, 4, 0, 3, 0, 0, 2, 10, 8, 5, 12, 15];

/// Dilation table, the complement dual of [`SHRINK`]
pub const GROW: [u8; 16] = [0, 3, 10, 7, 5, 13, 15, 15, 12, 15, 11, 15, 14, 15, 15, 15];

#[inline]
fn pattern(map: &Map, x: i32, y: i32) -> u8 {
    CORNERS
        .iter()
        .filter(|&&(dx, dy, _)| map.get(x + dx, y + dy) != 0)
        .fold(0, |acc, &(_, _, bit)| acc | bit)
}

/// Largest value `<= v` congruent to `parity` mod 2
#[inline]
fn align(v: i32, parity: i32) -> i32 {
    v - (v - parity).rem_euclid(2)
}

/// One block pass over `area`.
///
/// `rule` maps the old pattern to the new one; `changed(x, y, set)` is
/// called for every mask pixel that flipped. `row_shift` is asked once per
/// block row and shifts that row's block grid by one pixel when odd.
/// Pixels outside `area` never change. Returns `None` when cancelled.
pub(crate) fn pass(
    map: &mut Map,
    area: Rect,
    parity: i32,
    coop: &mut Cooperative,
    mut row_shift: impl FnMut() -> i32,
    mut rule: impl FnMut(u8) -> u8,
    mut changed: impl FnMut(i32, i32, bool),
) -> Option<usize> {
    if area.is_empty() {
        return Some(0);
    }

    let mut count = 0;
    let mut y = align(area.y, parity);
    coop.begin(((area.bottom() - y) / 2 + 1) as usize);

    let mut row = 0;
    while y <= area.bottom() {
        if coop.tick(row) {
            return None;
        }

        let mut x = align(area.x, parity + row_shift());
        while x <= area.right() {
            let old = pattern(map, x, y);
            let new = rule(old) & 0x0f;

            if new != old {
                for &(dx, dy, bit) in &CORNERS {
                    let (px, py) = (x + dx, y + dy);
                    let now = new & bit != 0;
                    if (old & bit != 0) != now && area.contains(px, py) {
                        map.set(px, py, if now { MAP_SET } else { 0 });
                        changed(px, py, now);
                        count += 1;
                    }
                }
            }
            x += 2;
        }

        y += 2;
        row += 1;
    }

    Some(count)
}
