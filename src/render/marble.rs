//! Tileable 256x256 marble texture
//!
//! A diamond-square plasma generated on a torus warps the phase of a sine
//! band. The band frequency is an integer number of periods per tile, so
//! the result tiles seamlessly and is addressed modulo 256.

use rand::rngs::StdRng;
use rand::Rng;
use std::f32::consts::TAU;

const SIZE: usize = 256;
const MASK: i32 = SIZE as i32 - 1;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Marble {
    data: Vec<u8>,
}

impl Marble {
    pub fn generate(rng: &mut StdRng) -> Self {
        let plasma = plasma(rng);
        let freq = rng.gen_range(1..=4) as f32;
        let warp = rng.gen_range(1.5f32..3.5);

        let data = plasma
            .iter()
            .enumerate()
            .map(|(i, &p)| {
                let x = (i % SIZE) as f32 / SIZE as f32;
                let phase = (freq * x + warp * p) * TAU;
                ((phase.sin() * 0.5 + 0.5) * 255.0).round() as u8
            })
            .collect();

        Self { data }
    }

    /// Texel at `(x, y)`, wrapping in both directions
    #[inline]
    pub fn get(&self, x: i32, y: i32) -> u8 {
        self.data[(y & MASK) as usize * SIZE + (x & MASK) as usize]
    }
}

/// Diamond-square on a wrapping grid, normalized to 0..=1
fn plasma(rng: &mut StdRng) -> Vec<f32> {
    let n = SIZE;
    let idx = |x: usize, y: usize| (y % n) * n + (x % n);
    let mut grid = vec![0.0f32; n * n];
    grid[0] = rng.gen::<f32>();

    let mut step = n;
    let mut amp = 1.0f32;
    while step > 1 {
        let half = step / 2;

        for y in (0..n).step_by(step) {
            for x in (0..n).step_by(step) {
                let avg = (grid[idx(x, y)]
                    + grid[idx(x + step, y)]
                    + grid[idx(x, y + step)]
                    + grid[idx(x + step, y + step)])
                    / 4.0;
                grid[idx(x + half, y + half)] = avg + rng.gen_range(-amp..amp);
            }
        }

        for y in (0..n).step_by(half) {
            let start = if (y / half) % 2 == 0 { half } else { 0 };
            for x in (start..n).step_by(step) {
                let avg = (grid[idx(x + n - half, y)]
                    + grid[idx(x + half, y)]
                    + grid[idx(x, y + n - half)]
                    + grid[idx(x, y + half)])
                    / 4.0;
                grid[idx(x, y)] = avg + rng.gen_range(-amp..amp);
            }
        }

        step = half;
        amp *= 0.5;
    }

    let (lo, hi) = grid
        .iter()
        .fold((f32::MAX, f32::MIN), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    let span = (hi - lo).max(f32::EPSILON);
    grid.iter().map(|&v| (v - lo) / span).collect()
}
