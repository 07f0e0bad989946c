//! Blurry edge: the mask convolved with a Gaussian drives transparency

use super::{coverage_trans, Job};
use crate::core::Outcome;

fn kernel(radius: i32) -> Vec<f32> {
    let sigma = (radius as f32 / 2.0).max(0.5);
    let denom = 2.0 * sigma * sigma;
    let weights: Vec<f32> = (-radius..=radius)
        .map(|i| (-((i * i) as f32) / denom).exp())
        .collect();
    let sum: f32 = weights.iter().sum();
    weights.into_iter().map(|w| w / sum).collect()
}

/// Separable blur of the mask over `job.area`, padded by `radius` on every side
pub(crate) fn paint(job: &mut Job, color: u32, base: i32, radius: i32) -> Outcome {
    if radius <= 0 {
        return job.flush(color, |_, _| base);
    }

    let area = job.area;
    if area.is_empty() {
        return Outcome::Completed;
    }

    let k = kernel(radius);
    let r = radius as usize;
    let w = area.w as usize;
    let h = area.h as usize;
    let pw = w + 2 * r;
    let ph = h + 2 * r;

    let mut src = vec![0.0f32; pw * ph];
    for j in 0..ph {
        let y = area.y - radius + j as i32;
        for i in 0..pw {
            let x = area.x - radius + i as i32;
            if job.map.get(x, y) != 0 {
                src[j * pw + i] = 1.0;
            }
        }
    }

    // Both passes report rows to the same progress count
    job.coop.begin(ph + h);

    // Horizontal pass keeps the vertical padding
    let mut tmp = vec![0.0f32; w * ph];
    for j in 0..ph {
        if job.coop.tick(j) {
            return Outcome::Cancelled;
        }
        let line = &src[j * pw..(j + 1) * pw];
        for i in 0..w {
            tmp[j * w + i] = k.iter().zip(&line[i..i + k.len()]).map(|(a, b)| a * b).sum();
        }
    }

    for j in 0..h {
        if job.coop.tick(ph + j) {
            return Outcome::Cancelled;
        }
        let y = area.y + j as i32;
        for i in 0..w {
            let v: f32 = k
                .iter()
                .enumerate()
                .map(|(n, weight)| weight * tmp[(j + n) * w + i])
                .sum();
            let intensity = (v * 255.0).round() as i32;
            if intensity > 0 {
                let x = area.x + i as i32;
                job.paint(x, y, color, coverage_trans(base, intensity.min(255)));
            }
        }
    }
    Outcome::Completed
}

#[cfg(test)]
mod tests {
    use super::super::tests::{run, run_cancelling_after, square_setup, BLACK, WHITE};
    use super::*;
    use crate::blend::get_r;
    use crate::brush::PaintMode;

    #[test]
    fn test_cancel_during_horizontal_pass() {
        let (mut bmp, mut map, stroke, mut brush) = square_setup(64, 0, 0, 63, 63);
        brush.mode = PaintMode::Blurry;
        brush.edge = 3;
        let before = bmp.clone();

        // The second pump lands on padded row 8, before any pixel is written
        let outcome = run_cancelling_after(&mut bmp, &mut map, &stroke, &brush, 2);
        assert_eq!(outcome, Outcome::Cancelled);
        assert_eq!(bmp, before);
        assert_eq!(map.count_set(), 0);
    }

    #[test]
    fn test_kernel_normalized_and_symmetric() {
        for radius in [1, 4, 30] {
            let k = kernel(radius);
            assert_eq!(k.len(), (2 * radius + 1) as usize);
            let sum: f32 = k.iter().sum();
            assert!((sum - 1.0).abs() < 1e-4);
            for i in 0..k.len() / 2 {
                assert!((k[i] - k[k.len() - 1 - i]).abs() < 1e-6);
                assert!(k[i] <= k[i + 1]);
            }
        }
    }

    #[test]
    fn test_blur_spreads_past_mask() {
        let (mut bmp, mut map, stroke, mut brush) = square_setup(80, 20, 20, 59, 59);
        brush.mode = PaintMode::Blurry;
        brush.edge = 3;
        run(&mut bmp, &mut map, &stroke, &brush, 0);

        assert_eq!(bmp.get_pixel(40, 40), WHITE);
        // Outside the mask but inside the blur radius
        let outside = get_r(bmp.get_pixel(18, 40));
        assert!(outside > 0 && outside < 128, "{}", outside);
        // Inside, near the edge
        let inside = get_r(bmp.get_pixel(21, 40));
        assert!(inside > 128 && inside < 255, "{}", inside);
        assert_eq!(bmp.get_pixel(5, 40), BLACK);
    }
}
