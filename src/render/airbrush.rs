//! Shrink-cadence airbrushes: coarse, chalk, texture and average
//!
//! The mask is eroded block by block. Pixels cleared in an iteration are
//! painted at that iteration's soft transparency, which decays
//! geometrically toward the brush's base transparency. Whatever survives
//! the loop is flushed at base in one pass, so every mask pixel is painted
//! exactly once.

use rand::rngs::StdRng;
use rand::Rng;
use tracing::trace;

use super::shrink::{self, SHRINK};
use super::{Job, Marble};
use crate::core::Outcome;

const CHALK_JITTER: i32 = 32;

/// How an iteration's soft transparency becomes a per-pixel value
pub(crate) enum Tone<'m> {
    Ramp,
    /// Random offset on every cleared pixel; flush stays at base
    Chalk,
    /// Modulated by the tiled marble texture
    Texture(&'m Marble),
}

impl Tone<'_> {
    fn at(&self, x: i32, y: i32, soft: i32, base: i32, rng: &mut StdRng) -> i32 {
        match self {
            Tone::Ramp => soft,
            Tone::Chalk if soft == base => soft,
            Tone::Chalk => (soft + rng.gen_range(-CHALK_JITTER..=CHALK_JITTER)).clamp(0, 255),
            // Texture lightens by at most half the remaining range
            Tone::Texture(marble) => soft + (255 - soft) * marble.get(x, y) as i32 / 510,
        }
    }
}

pub(crate) fn shrink_paint(
    job: &mut Job,
    color: u32,
    edge: i32,
    base: i32,
    tone: Tone,
    rng: &mut StdRng,
) -> Outcome {
    if edge > 0 {
        let keep = 255 - 255 / (edge + 1);
        let mut soft = 255;
        let mut iteration = 0;

        loop {
            soft = base + (soft - base) * keep / 255;
            if soft <= base {
                break;
            }

            let mut cleared = 0;
            for parity in [0, 1] {
                let area = job.area;
                let result = shrink::pass(
                    &mut *job.map,
                    area,
                    parity,
                    &mut *job.coop,
                    || 0,
                    |p| SHRINK[p as usize],
                    |x, y, _| {
                        let t = tone.at(x, y, soft, base, rng);
                        job.bmp.set_pixel(job.ctx, x, y, color, t);
                    },
                );
                match result {
                    Some(n) => cleared += n,
                    None => return Outcome::Cancelled,
                }
            }

            iteration += 1;
            trace!(
                "[Airbrush] iteration {} soft={} cleared={}",
                iteration,
                soft,
                cleared
            );
            if cleared == 0 {
                break;
            }
        }
    }

    job.flush(color, |x, y| tone.at(x, y, base, base, rng))
}
