//! Watercolor: the mask is painted at base, then grown outward with
//! increasing transparency

use rand::rngs::StdRng;
use rand::Rng;
use tracing::trace;

use super::shrink::{self, GROW};
use super::Job;
use crate::core::Outcome;

/// One partial block in this many snaps straight to full
const BLOOM_ODDS: u32 = 32;

/// How far growth can reach past the stroke bounds for a given edge
pub(crate) fn reach(edge: i32) -> i32 {
    2 * (edge + 2) + 2
}

pub(crate) fn paint(job: &mut Job, color: u32, edge: i32, base: i32, rng: &mut StdRng) -> Outcome {
    if job.flush(color, |_, _| base).is_cancelled() {
        return Outcome::Cancelled;
    }

    let step = ((256 - base + edge) / (edge + 1)).max(1);
    let mut soft = base;
    let mut iteration = 0;

    loop {
        soft += step;
        if soft > 255 {
            break;
        }

        let mut grown = 0;
        for parity in [0, 1] {
            let area = job.area;
            let shifts: Vec<i32> = (0..area.h / 2 + 2).map(|_| rng.gen_range(0..2)).collect();
            let mut shifts = shifts.into_iter();

            let result = shrink::pass(
                &mut *job.map,
                area,
                parity,
                &mut *job.coop,
                || shifts.next().unwrap_or(0),
                |p| {
                    if p != 0 && p != 15 && rng.gen_range(0..BLOOM_ODDS) == 0 {
                        15
                    } else {
                        GROW[p as usize]
                    }
                },
                |x, y, _| job.bmp.set_pixel(job.ctx, x, y, color, soft),
            );
            match result {
                Some(n) => grown += n,
                None => return Outcome::Cancelled,
            }
        }

        iteration += 1;
        trace!(
            "[Watercolor] iteration {} soft={} grown={}",
            iteration,
            soft,
            grown
        );
        if grown == 0 {
            break;
        }
    }

    Outcome::Completed
}
