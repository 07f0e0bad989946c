//! Whole-image filters built on the core primitives

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use crate::bitmap::Bitmap;
use crate::blend::{
    get_a, get_b, get_g, get_r, hsv_to_rgb, luminance, make_rgba, rgb_to_hsv, Blend, HUE_RANGE,
};
use crate::core::{Cooperative, Outcome};
use crate::kdtree::{KdPoint, KdTree};

/// Voronoi segmentation of the clip rectangle.
///
/// `cells` seed points are scattered with a seeded RNG; every pixel is
/// assigned to its nearest seed and repainted with the mean color of its
/// cell. Cancelling during assignment leaves the image untouched.
pub fn segment(bmp: &mut Bitmap, cells: usize, seed: u64, coop: &mut Cooperative) -> Outcome {
    let clip = bmp.clip();
    let cells = cells.clamp(1, clip.area().max(1));
    let mut rng = StdRng::seed_from_u64(seed);

    let points = (0..cells)
        .map(|i| {
            KdPoint::new2(
                rng.gen_range(clip.x..=clip.right()),
                rng.gen_range(clip.y..=clip.bottom()),
                i as u32,
            )
        })
        .collect();
    let tree = KdTree::build(points, 2);

    let mut owner = vec![0u32; clip.area()];
    let mut sums = vec![[0u64; 5]; cells];
    coop.begin(clip.h as usize * 2);

    for (row, y) in (clip.y..=clip.bottom()).enumerate() {
        if coop.tick(row) {
            return Outcome::Cancelled;
        }
        for x in clip.x..=clip.right() {
            let cell = tree.nearest([x, y, 0]).map_or(0, |n| n.point.value);
            let c = bmp.get_pixel(x, y);
            let sum = &mut sums[cell as usize];
            sum[0] += get_r(c) as u64;
            sum[1] += get_g(c) as u64;
            sum[2] += get_b(c) as u64;
            sum[3] += get_a(c) as u64;
            sum[4] += 1;

            let i = (y - clip.y) as usize * clip.w as usize + (x - clip.x) as usize;
            owner[i] = cell;
        }
    }

    let means: Vec<u32> = sums
        .iter()
        .map(|s| {
            let n = s[4].max(1);
            make_rgba(
                (s[0] / n) as i32,
                (s[1] / n) as i32,
                (s[2] / n) as i32,
                (s[3] / n) as i32,
            )
        })
        .collect();

    let rows = clip.h as usize;
    for (row, y) in (clip.y..=clip.bottom()).enumerate() {
        if coop.tick(rows + row) {
            return Outcome::Cancelled;
        }
        let start = row * clip.w as usize;
        for (dx, &cell) in owner[start..start + clip.w as usize].iter().enumerate() {
            bmp.put_pixel(clip.x + dx as i32, y, means[cell as usize]);
        }
    }

    debug!("[Effect] segmented {:?} into {} cells", clip, cells);
    Outcome::Completed
}

/// Rotate hue inside the clip by `amount` on the 0..1536 scale.
///
/// With `keep_lum` each pixel's original luminance is restored afterwards.
pub fn rotate_hue(bmp: &mut Bitmap, amount: i32, keep_lum: bool, coop: &mut Cooperative) -> Outcome {
    let clip = bmp.clip();
    let amount = amount.rem_euclid(HUE_RANGE);
    coop.begin(clip.h as usize);

    for (row, y) in (clip.y..=clip.bottom()).enumerate() {
        if coop.tick(row) {
            return Outcome::Cancelled;
        }
        let Some(line) = bmp.row_mut(y) else {
            continue;
        };
        for c in &mut line[clip.x as usize..=clip.right() as usize] {
            let (h, s, v) = rgb_to_hsv(get_r(*c), get_g(*c), get_b(*c));
            let (r, g, b) = hsv_to_rgb(h + amount, s, v);
            let rotated = make_rgba(r, g, b, get_a(*c));
            *c = if keep_lum {
                Blend::keep_lum(rotated, luminance(*c))
            } else {
                rotated
            };
        }
    }
    Outcome::Completed
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::blend::make_rgb;
    use crate::core::CancelToken;
    use std::collections::HashSet;

    fn coop(token: &CancelToken) -> Cooperative<'_> {
        Cooperative::new(token, 16)
    }

    #[test]
    fn test_segment_produces_at_most_cells_colors() {
        let mut bmp = Bitmap::new(48, 48);
        for y in 0..48 {
            for x in 0..48 {
                bmp.put_pixel(x, y, make_rgb(x * 5, y * 5, (x * y) % 256));
            }
        }
        let token = CancelToken::new();
        assert_eq!(segment(&mut bmp, 12, 3, &mut coop(&token)), Outcome::Completed);

        let colors: HashSet<u32> = bmp.pixels().iter().copied().collect();
        assert!(colors.len() <= 12);
        assert!(colors.len() > 1);
    }

    #[test]
    fn test_segment_uniform_image_unchanged() {
        let mut bmp = Bitmap::new(20, 20);
        bmp.clear(make_rgb(10, 200, 30));
        let before = bmp.clone();
        let token = CancelToken::new();
        segment(&mut bmp, 50, 1, &mut coop(&token));
        assert_eq!(bmp, before);
    }

    #[test]
    fn test_segment_cancel_leaves_image() {
        let mut bmp = Bitmap::new(20, 20);
        for x in 0..20 {
            bmp.put_pixel(x, x, make_rgb(255, 0, 0));
        }
        let before = bmp.clone();
        let token = CancelToken::new();
        token.cancel();
        assert_eq!(segment(&mut bmp, 5, 1, &mut coop(&token)), Outcome::Cancelled);
        assert_eq!(bmp, before);
    }

    #[test]
    fn test_rotate_hue_primaries() {
        let mut bmp = Bitmap::new(3, 1);
        bmp.put_pixel(0, 0, make_rgb(255, 0, 0));
        bmp.put_pixel(1, 0, make_rgb(0, 255, 0));
        bmp.put_pixel(2, 0, make_rgb(128, 128, 128));
        let token = CancelToken::new();

        rotate_hue(&mut bmp, 512, false, &mut coop(&token));
        assert_eq!(bmp.get_pixel(0, 0), make_rgb(0, 255, 0));
        assert_eq!(bmp.get_pixel(1, 0), make_rgb(0, 0, 255));
        assert_eq!(bmp.get_pixel(2, 0), make_rgb(128, 128, 128));

        // A full turn is the identity
        let before = bmp.clone();
        rotate_hue(&mut bmp, HUE_RANGE, false, &mut coop(&token));
        assert_eq!(bmp, before);
    }

    #[test]
    fn test_rotate_hue_keeps_luminance() {
        let mut bmp = Bitmap::new(1, 1);
        let c = make_rgb(150, 100, 100);
        bmp.put_pixel(0, 0, c);
        let token = CancelToken::new();
        rotate_hue(&mut bmp, 512, true, &mut coop(&token));
        let out = bmp.get_pixel(0, 0);
        assert!((luminance(out) - luminance(c)).abs() <= 4);
        assert_ne!(out, c);
    }
}
