//! Indexed palettes and O(1) nearest-color lookup
//!
//! [`PaletteTable`] maps every 24-bit color to a palette index. It is built
//! by matching a 64-step grid over the RGB cube against a KD-tree of the
//! palette, expanding the grid to the full 16,777,216 entries, then
//! patching exact palette colors so they always map to themselves.

use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::debug;

use crate::bitmap::Bitmap;
use crate::blend::{get_b, get_g, get_r};
use crate::core::{Cooperative, CoreError, Outcome};
use crate::kdtree::{KdPoint, KdTree};

pub const MAX_COLORS: usize = 256;

/// Grid steps per channel for table construction
const GRID: usize = 64;
const CELL: i32 = 256 / GRID as i32;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Palette {
    colors: Vec<u32>,
}

impl Palette {
    /// 1 to 256 packed colors
    pub fn from_colors(colors: Vec<u32>) -> Result<Self, CoreError> {
        if colors.is_empty() || colors.len() > MAX_COLORS {
            return Err(CoreError::InvalidInput(format!(
                "Palette needs 1 to {} colors, got {}",
                MAX_COLORS,
                colors.len()
            )));
        }
        Ok(Self { colors })
    }

    /// 216 web-safe colors followed by a 40-step gray ramp
    pub fn default_palette() -> Self {
        let mut colors = Vec::with_capacity(MAX_COLORS);
        for b in 0..6 {
            for g in 0..6 {
                for r in 0..6 {
                    colors.push(0xff00_0000 | (b * 51) << 16 | (g * 51) << 8 | (r * 51));
                }
            }
        }
        for i in 1..=40u32 {
            let v = i * 255 / 41;
            colors.push(0xff00_0000 | v << 16 | v << 8 | v);
        }
        Self { colors }
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    pub fn colors(&self) -> &[u32] {
        &self.colors
    }

    pub fn get(&self, index: usize) -> Option<u32> {
        self.colors.get(index).copied()
    }

    /// Insert before `index` (clamped to the end); `false` when full
    pub fn insert(&mut self, index: usize, c: u32) -> bool {
        if self.colors.len() >= MAX_COLORS {
            return false;
        }
        let index = index.min(self.colors.len());
        self.colors.insert(index, c);
        true
    }

    /// Remove a color; the last remaining color cannot be deleted
    pub fn delete(&mut self, index: usize) -> bool {
        if index >= self.colors.len() || self.colors.len() == 1 {
            return false;
        }
        self.colors.remove(index);
        true
    }

    pub fn replace(&mut self, index: usize, c: u32) -> bool {
        match self.colors.get_mut(index) {
            Some(slot) => {
                *slot = c;
                true
            }
            None => false,
        }
    }

    pub fn build_table(&self) -> PaletteTable {
        let start = Instant::now();

        let points = self
            .colors
            .iter()
            .enumerate()
            .map(|(i, &c)| KdPoint::new3(get_r(c), get_g(c), get_b(c), i as u32))
            .collect();
        let tree = KdTree::build(points, 3);

        let mut grid = vec![0u8; GRID * GRID * GRID];
        for (i, cell) in grid.iter_mut().enumerate() {
            let r = (i % GRID) as i32 * CELL + 1;
            let g = (i / GRID % GRID) as i32 * CELL + 1;
            let b = (i / (GRID * GRID)) as i32 * CELL + 1;
            *cell = tree.nearest([r, g, b]).map_or(0, |n| n.point.value as u8);
        }

        let mut index = vec![0u8; 1 << 24].into_boxed_slice();
        for (key, slot) in index.iter_mut().enumerate() {
            let r = key & 0xff;
            let g = (key >> 8) & 0xff;
            let b = key >> 16;
            *slot = grid[(b >> 2) * GRID * GRID + (g >> 2) * GRID + (r >> 2)];
        }

        // Reverse order so the lowest index wins for duplicates
        for (i, &c) in self.colors.iter().enumerate().rev() {
            index[(c & 0x00ff_ffff) as usize] = i as u8;
        }

        debug!(
            "[Palette] lookup table for {} colors built in {:.1}ms",
            self.colors.len(),
            start.elapsed().as_secs_f64() * 1000.0
        );

        PaletteTable {
            colors: self.colors.clone(),
            index,
        }
    }

    /// Snap every pixel inside the clip to its palette color (alpha kept)
    pub fn quantize(&self, bmp: &mut Bitmap, coop: &mut Cooperative) -> Outcome {
        self.build_table().quantize(bmp, coop)
    }
}

/// Direct 24-bit color to palette index table
pub struct PaletteTable {
    colors: Vec<u32>,
    index: Box<[u8]>,
}

impl PaletteTable {
    #[inline]
    pub fn lookup(&self, c: u32) -> u8 {
        self.index[(c & 0x00ff_ffff) as usize]
    }

    /// Palette color for `c`, keeping the alpha of `c`
    #[inline]
    pub fn map_color(&self, c: u32) -> u32 {
        let p = self.colors[self.lookup(c) as usize];
        (p & 0x00ff_ffff) | (c & 0xff00_0000)
    }

    pub fn quantize(&self, bmp: &mut Bitmap, coop: &mut Cooperative) -> Outcome {
        let clip = bmp.clip();
        coop.begin(clip.h as usize);

        for (row, y) in (clip.y..=clip.bottom()).enumerate() {
            if coop.tick(row) {
                return Outcome::Cancelled;
            }
            if let Some(line) = bmp.row_mut(y) {
                for c in &mut line[clip.x as usize..=clip.right() as usize] {
                    *c = self.map_color(*c);
                }
            }
        }
        Outcome::Completed
    }
}
