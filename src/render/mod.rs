//! Stroke-to-pixel rendering
//!
//! [`begin`] is invoked once per finished stroke. It reads the coverage mask
//! and the brush, picks one of the paint algorithms and writes through the
//! paint context into the bitmap. Every algorithm checks the cooperative
//! cancel token at row (or block-row) granularity; a cancelled render returns
//! immediately and leaves whatever rows it already produced. The mask is
//! cleared in every case.

mod airbrush;
mod blur;
mod fine;
mod marble;
mod shrink;
mod watercolor;

pub(crate) use fine::feather;
pub use marble::Marble;
pub use shrink::{GROW, SHRINK};

use rand::rngs::StdRng;
use std::time::Instant;
use tracing::{debug, warn};

use crate::bitmap::{Bitmap, PaintContext, Rect};
use crate::blend::{get_a, get_b, get_g, get_r, make_rgba};
use crate::brush::{Brush, PaintMode};
use crate::core::{Cooperative, Outcome};
use crate::stroke::{Coverage, Map, Stroke};

use airbrush::Tone;

/// Everything a paint algorithm touches for one call
pub(crate) struct Job<'a, 'c> {
    pub bmp: &'a mut Bitmap,
    pub map: &'a mut Map,
    pub ctx: &'a PaintContext,
    pub coop: &'a mut Cooperative<'c>,
    /// Canvas region the algorithm scans
    pub area: Rect,
}

impl<'a, 'c> Job<'a, 'c> {
    pub fn new(
        bmp: &'a mut Bitmap,
        map: &'a mut Map,
        ctx: &'a PaintContext,
        coop: &'a mut Cooperative<'c>,
        area: Rect,
    ) -> Self {
        if map.width() != bmp.width() || map.height() != bmp.height() {
            warn!(
                "[Render] mask {}x{} does not match canvas {}x{}, resizing",
                map.width(),
                map.height(),
                bmp.width(),
                bmp.height()
            );
            map.resize_to(bmp);
        }
        let area = area.intersect(&map.full_rect());
        Self {
            bmp,
            map,
            ctx,
            coop,
            area,
        }
    }

    #[inline]
    pub fn paint(&mut self, x: i32, y: i32, c: u32, t: i32) {
        self.bmp.set_pixel(self.ctx, x, y, c, t);
    }

    /// Paint every set mask pixel in the area with `tone(x, y)`
    pub fn flush(&mut self, c: u32, mut tone: impl FnMut(i32, i32) -> i32) -> Outcome {
        let area = self.area;
        self.coop.begin(area.h.max(0) as usize);

        for (row, y) in (area.y..=area.bottom()).enumerate() {
            if self.coop.tick(row) {
                return Outcome::Cancelled;
            }
            for x in area.x..=area.right() {
                if self.map.get(x, y) != 0 {
                    let t = tone(x, y);
                    self.paint(x, y, c, t);
                }
            }
        }
        Outcome::Completed
    }

    /// Mean color of the bitmap under the mask, with `alpha`
    pub fn average_color(&self, alpha: i32) -> Option<u32> {
        let area = self.area;
        let (mut r, mut g, mut b, mut n) = (0i64, 0i64, 0i64, 0i64);

        for y in area.y..=area.bottom() {
            for x in area.x..=area.right() {
                if self.map.get(x, y) != 0 {
                    let c = self.bmp.get_pixel(x, y);
                    r += get_r(c) as i64;
                    g += get_g(c) as i64;
                    b += get_b(c) as i64;
                    n += 1;
                }
            }
        }

        if n == 0 {
            return None;
        }
        Some(make_rgba((r / n) as i32, (g / n) as i32, (b / n) as i32, alpha))
    }
}

/// Blend coverage into a transparency between `base` and 255
#[inline]
fn coverage_trans(base: i32, coverage: i32) -> i32 {
    255 - (255 - base) * coverage / 255
}

fn antialiased(job: &mut Job, coverage: &Coverage, color: u32, base: i32) -> Outcome {
    let area = coverage.rect().intersect(&job.area);
    job.coop.begin(area.h.max(0) as usize);

    for (row, y) in (area.y..=area.bottom()).enumerate() {
        if job.coop.tick(row) {
            return Outcome::Cancelled;
        }
        for x in area.x..=area.right() {
            let c = coverage.get(x, y) as i32;
            if c > 0 {
                job.paint(x, y, color, coverage_trans(base, c));
            }
        }
    }
    Outcome::Completed
}

/// Render a finished stroke into `bmp`.
///
/// `map` must hold the stroke's coverage (see [`Stroke::end`]); it is
/// cleared before returning, cancelled or not.
pub fn begin(
    bmp: &mut Bitmap,
    map: &mut Map,
    stroke: &Stroke,
    brush: &Brush,
    ctx: &PaintContext,
    coop: &mut Cooperative,
    rng: &mut StdRng,
) -> Outcome {
    let brush = brush.normalized();
    // A mask filled without stroke geometry has no supersampled coverage
    let mode = match brush.mode {
        PaintMode::Solid | PaintMode::Antialiased if stroke.bounds().is_empty() => {
            PaintMode::Solid
        }
        PaintMode::Solid if brush.aa => PaintMode::Antialiased,
        mode => mode,
    };

    let marked = stroke.bounds().union(&map.bounds());
    let area = match mode {
        PaintMode::Blurry => marked.inflate(brush.edge * 2),
        PaintMode::Watercolor => marked.inflate(watercolor::reach(brush.edge)),
        _ => marked,
    };

    let start = Instant::now();
    debug!("[Render] {:?} over {:?}", mode, area);

    let base = brush.trans;
    let color = brush.color;
    let outcome = {
        let mut job = Job::new(bmp, map, ctx, coop, area);

        match mode {
            PaintMode::Solid => job.flush(color, |_, _| base),
            PaintMode::Antialiased => {
                let coverage = stroke.coverage(&brush);
                antialiased(&mut job, &coverage, color, base)
            }
            PaintMode::Coarse => airbrush::shrink_paint(&mut job, color, brush.edge, base, Tone::Ramp, rng),
            PaintMode::Chalk => airbrush::shrink_paint(&mut job, color, brush.edge, base, Tone::Chalk, rng),
            PaintMode::Texture => {
                let marble = Marble::generate(rng);
                airbrush::shrink_paint(&mut job, color, brush.edge, base, Tone::Texture(&marble), rng)
            }
            PaintMode::Average => match job.average_color(get_a(color)) {
                Some(mean) => airbrush::shrink_paint(&mut job, mean, brush.edge, base, Tone::Ramp, rng),
                None => Outcome::Completed,
            },
            PaintMode::Fine => fine::feather(&mut job, color, base, brush.edge * 3),
            PaintMode::Blurry => blur::paint(&mut job, color, base, brush.edge * 2),
            PaintMode::Watercolor => watercolor::paint(&mut job, color, brush.edge, base, rng),
        }
    };

    map.clear();
    debug!(
        "[Render] {:?} {:?} in {:.2}ms",
        mode,
        outcome,
        start.elapsed().as_secs_f64() * 1000.0
    );
    outcome
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod tests {
    use super::*;
    use crate::blend::{make_rgb, Blend, BlendMode};
    use crate::brush::BrushShape;
    use crate::core::{CancelToken, EventPump};
    use crate::stroke::{StrokeKind, MAP_SET};
    use crate::undo::{Undo, UndoBudget, UndoKind};
    use rand::SeedableRng;

    pub const BLACK: u32 = 0xff00_0000;
    pub const WHITE: u32 = 0xffff_ffff;

    /// Filled square stroke from `(x1, y1)` to `(x2, y2)` on a black canvas
    pub fn square_setup(
        size: i32,
        x1: i32,
        y1: i32,
        x2: i32,
        y2: i32,
    ) -> (Bitmap, Map, Stroke, Brush) {
        let mut bmp = Bitmap::new(size, size);
        bmp.clear(BLACK);
        let mut map = Map::for_bitmap(&bmp);
        let brush = Brush {
            size: 1,
            shape: BrushShape::Square,
            color: WHITE,
            ..Brush::default()
        };
        let mut stroke = Stroke::new(StrokeKind::RectFill);
        stroke.begin(&mut map, &brush, x1, y1);
        stroke.draw(&mut map, &brush, x2, y2);
        stroke.end(&mut map, &brush);
        (bmp, map, stroke, brush)
    }

    pub fn run(
        bmp: &mut Bitmap,
        map: &mut Map,
        stroke: &Stroke,
        brush: &Brush,
        seed: u64,
    ) -> Outcome {
        let token = CancelToken::new();
        let mut coop = Cooperative::new(&token, 8);
        let mut rng = StdRng::seed_from_u64(seed);
        let ctx = PaintContext::new(brush.blend);
        begin(bmp, map, stroke, brush, &ctx, &mut coop, &mut rng)
    }

    /// Render with a pump that cancels on its `pumps`-th call
    pub fn run_cancelling_after(
        bmp: &mut Bitmap,
        map: &mut Map,
        stroke: &Stroke,
        brush: &Brush,
        pumps: usize,
    ) -> Outcome {
        struct CancelAfter {
            token: CancelToken,
            calls: usize,
            limit: usize,
        }
        impl EventPump for CancelAfter {
            fn pump(&mut self, _done: usize, _total: usize) {
                self.calls += 1;
                if self.calls >= self.limit {
                    self.token.cancel();
                }
            }
        }

        let token = CancelToken::new();
        let mut pump = CancelAfter {
            token: token.clone(),
            calls: 0,
            limit: pumps,
        };
        let mut coop = Cooperative::new(&token, 8).with_pump(&mut pump);
        let mut rng = StdRng::seed_from_u64(0);
        let ctx = PaintContext::new(brush.blend);
        begin(bmp, map, stroke, brush, &ctx, &mut coop, &mut rng)
    }

    #[test]
    fn test_renders_mask_filled_without_stroke() {
        let cases = [
            (PaintMode::Solid, false),
            (PaintMode::Solid, true),
            (PaintMode::Coarse, false),
        ];
        for (mode, aa) in cases {
            let mut bmp = Bitmap::new(16, 16);
            bmp.clear(BLACK);
            let mut map = Map::for_bitmap(&bmp);
            map.rectfill(4, 4, 11, 11, MAP_SET);
            let brush = Brush {
                color: WHITE,
                mode,
                aa,
                edge: 0,
                ..Brush::default()
            };

            let stroke = Stroke::new(StrokeKind::Freehand);
            assert_eq!(run(&mut bmp, &mut map, &stroke, &brush, 0), Outcome::Completed);
            assert_eq!(bmp.get_pixel(6, 6), WHITE, "{:?}", mode);
            assert_eq!(bmp.get_pixel(11, 11), WHITE, "{:?}", mode);
            assert_eq!(bmp.get_pixel(3, 6), BLACK, "{:?}", mode);
            assert_eq!(map.count_set(), 0);
        }
    }

    #[test]
    fn test_render_after_undo_across_resize() {
        let mut bmp = Bitmap::new(100, 100);
        bmp.clear(BLACK);
        let mut undo = Undo::new(4, UndoBudget::default());
        undo.push(&bmp, bmp.bounds(), UndoKind::Full);
        bmp = bmp.crop(Rect::new(0, 0, 50, 50));
        let mut map = Map::for_bitmap(&bmp);

        assert!(undo.pop(&mut bmp));
        assert_eq!((bmp.width(), bmp.height()), (100, 100));

        // Mask still sized for the cropped canvas
        map.rectfill(10, 10, 40, 40, MAP_SET);
        let brush = Brush {
            size: 1,
            shape: BrushShape::Square,
            color: WHITE,
            ..Brush::default()
        };
        run(&mut bmp, &mut map, &Stroke::new(StrokeKind::Freehand), &brush, 0);
        assert_eq!((map.width(), map.height()), (100, 100));
        assert_eq!(bmp.get_pixel(40, 40), WHITE);
        assert_eq!(bmp.get_pixel(41, 41), BLACK);

        // A stroke over the full canvas reaches past the old size
        let mut stroke = Stroke::new(StrokeKind::RectFill);
        stroke.begin(&mut map, &brush, 60, 60);
        stroke.draw(&mut map, &brush, 90, 90);
        stroke.end(&mut map, &brush);
        run(&mut bmp, &mut map, &stroke, &brush, 0);
        assert_eq!(bmp.get_pixel(75, 75), WHITE);
        assert_eq!(bmp.get_pixel(90, 90), WHITE);
    }

    #[test]
    fn test_solid_paints_mask_only() {
        let (mut bmp, mut map, stroke, mut brush) = square_setup(32, 4, 4, 11, 11);
        brush.trans = 100;
        let outcome = run(&mut bmp, &mut map, &stroke, &brush, 1);

        assert_eq!(outcome, Outcome::Completed);
        assert_eq!(map.count_set(), 0);
        let expected = Blend::trans(BLACK, WHITE, 100);
        for y in 0..32 {
            for x in 0..32 {
                let inside = (4..=11).contains(&x) && (4..=11).contains(&y);
                let want = if inside { expected } else { BLACK };
                assert_eq!(bmp.get_pixel(x, y), want, "({}, {})", x, y);
            }
        }
    }

    #[test]
    fn test_every_mode_clears_the_map() {
        let modes = [
            PaintMode::Solid,
            PaintMode::Antialiased,
            PaintMode::Coarse,
            PaintMode::Fine,
            PaintMode::Blurry,
            PaintMode::Watercolor,
            PaintMode::Chalk,
            PaintMode::Texture,
            PaintMode::Average,
        ];
        for mode in modes {
            let (mut bmp, mut map, stroke, mut brush) = square_setup(48, 10, 10, 37, 37);
            brush.mode = mode;
            brush.edge = 3;
            assert_eq!(run(&mut bmp, &mut map, &stroke, &brush, 9), Outcome::Completed);
            assert_eq!(map.count_set(), 0, "{:?}", mode);
            // Average repaints the canvas mean, which is black here
            if mode != PaintMode::Average {
                assert_ne!(bmp.get_pixel(24, 24), BLACK, "{:?}", mode);
            }
        }
    }

    #[test]
    fn test_solid_aa_routes_to_coverage() {
        let mut bmp = Bitmap::new(64, 64);
        bmp.clear(BLACK);
        let mut map = Map::for_bitmap(&bmp);
        let brush = Brush {
            size: 1,
            color: WHITE,
            aa: true,
            ..Brush::default()
        };
        let mut stroke = Stroke::new(StrokeKind::OvalFill);
        stroke.begin(&mut map, &brush, 4, 4);
        stroke.draw(&mut map, &brush, 59, 59);
        stroke.end(&mut map, &brush);

        run(&mut bmp, &mut map, &stroke, &brush, 0);
        assert_eq!(bmp.get_pixel(32, 32), WHITE);
        let partial = bmp
            .pixels()
            .iter()
            .filter(|&&c| c != WHITE && c != BLACK)
            .count();
        assert!(partial > 0);
    }

    #[test]
    fn test_cancelled_render_stops_and_clears_map() {
        struct CancelAt(CancelToken, usize);
        impl EventPump for CancelAt {
            fn pump(&mut self, done: usize, _total: usize) {
                if done >= self.1 {
                    self.0.cancel();
                }
            }
        }

        let (mut bmp, mut map, stroke, brush) = square_setup(64, 0, 0, 63, 63);
        let token = CancelToken::new();
        let mut pump = CancelAt(token.clone(), 16);
        let mut coop = Cooperative::new(&token, 8).with_pump(&mut pump);
        let mut rng = StdRng::seed_from_u64(0);
        let ctx = PaintContext::new(BlendMode::Trans);

        let outcome = begin(&mut bmp, &mut map, &stroke, &brush, &ctx, &mut coop, &mut rng);
        assert_eq!(outcome, Outcome::Cancelled);
        assert_eq!(map.count_set(), 0);
        assert_eq!(bmp.get_pixel(10, 15), WHITE);
        assert_eq!(bmp.get_pixel(10, 16), BLACK);
    }

    #[test]
    fn test_average_uses_mean_color_under_mask() {
        let (mut bmp, mut map, stroke, mut brush) = square_setup(16, 0, 0, 15, 15);
        for y in 0..16 {
            for x in 0..16 {
                let c = if x < 8 { make_rgb(200, 0, 0) } else { make_rgb(0, 0, 100) };
                bmp.put_pixel(x, y, c);
            }
        }
        brush.mode = PaintMode::Average;
        brush.edge = 0;
        run(&mut bmp, &mut map, &stroke, &brush, 0);

        let c = bmp.get_pixel(3, 3);
        assert_eq!((get_r(c), get_g(c), get_b(c)), (100, 0, 50));
    }
}
