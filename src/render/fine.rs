//! Distance feather: transparency from the distance to the mask boundary
//!
//! Boundary pixels are set mask pixels with at least one unset 4-neighbor
//! (the canvas edge counts as unset). A 2-D KD-tree over them answers one
//! nearest query per interior pixel, giving a smooth falloff without the
//! block artifacts of the shrink-based airbrushes.

use tracing::trace;

use super::Job;
use crate::core::Outcome;
use crate::kdtree::{KdPoint, KdTree};

/// Transparency at Euclidean distance `d` from the boundary
fn falloff(d: f64, base: i32, radius: i32) -> i32 {
    if d >= radius as f64 {
        return base;
    }
    let t = 255.0 - (255 - base) as f64 * (d + 1.0) / (radius as f64 + 1.0);
    (t.round() as i32).clamp(base, 255)
}

/// Paint the masked region, feathered over `radius` pixels inward
pub(crate) fn feather(job: &mut Job, color: u32, base: i32, radius: i32) -> Outcome {
    if radius <= 0 {
        return job.flush(color, |_, _| base);
    }

    let area = job.area;
    let rows = area.h.max(0) as usize;
    let map = &*job.map;
    let mut boundary = Vec::new();

    // Boundary extraction and painting share one progress count
    job.coop.begin(rows * 2);
    for (row, y) in (area.y..=area.bottom()).enumerate() {
        if job.coop.tick(row) {
            return Outcome::Cancelled;
        }
        for x in area.x..=area.right() {
            if map.get(x, y) == 0 {
                continue;
            }
            let edge = map.get(x - 1, y) == 0
                || map.get(x + 1, y) == 0
                || map.get(x, y - 1) == 0
                || map.get(x, y + 1) == 0;
            if edge {
                boundary.push(KdPoint::new2(x, y, 0));
            }
        }
    }

    if boundary.is_empty() {
        return Outcome::Completed;
    }
    trace!("[Fine] {} boundary points, radius {}", boundary.len(), radius);

    let tree = KdTree::build(boundary, 2);

    for (row, y) in (area.y..=area.bottom()).enumerate() {
        if job.coop.tick(rows + row) {
            return Outcome::Cancelled;
        }
        for x in area.x..=area.right() {
            if job.map.get(x, y) == 0 {
                continue;
            }
            let d = tree
                .nearest([x, y, 0])
                .map(|n| (n.dist2 as f64).sqrt())
                .unwrap_or(0.0);
            job.paint(x, y, color, falloff(d, base, radius));
        }
    }
    Outcome::Completed
}
