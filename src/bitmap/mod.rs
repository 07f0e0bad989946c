//! Clipped pixel buffer
//!
//! A [`Bitmap`] owns a flat row-major buffer of packed RGBA pixels and an
//! active clip rectangle. Every write is intersected with the clip first;
//! a primitive that misses it is a silent no-op. Reads clamp coordinates
//! and never leave the buffer.

pub mod context;
mod rect;
mod transform;

pub use context::{AddressMode, CloneMirror, CloneSource, PaintContext};
pub use rect::Rect;

use crate::blend::{get_a, make_rgba, Blend, BlendMode};
use crate::core::CoreError;

/// Largest accepted width or height
pub const MAX_DIMENSION: i32 = 32768;

/// XOR applied by the overlay primitives; alpha is left alone
const XOR_MASK: u32 = 0x00ff_ffff;

/// Visit the points of the line from `(x1, y1)` to `(x2, y2)` that fall
/// inside `clip`.
///
/// Steps along the major axis with the minor coordinate rounded half up,
/// so only the major-axis span overlapping `clip` is walked and far-out
/// endpoints never overflow.
pub fn line_walk(
    x1: i32,
    y1: i32,
    x2: i32,
    y2: i32,
    clip: &Rect,
    mut visit: impl FnMut(i32, i32),
) {
    if clip.is_empty() {
        return;
    }
    let (x1, y1, x2, y2) = (x1 as i64, y1 as i64, x2 as i64, y2 as i64);
    let (dx, dy) = ((x2 - x1).abs(), (y2 - y1).abs());
    let (sx, sy) = ((x2 - x1).signum(), (y2 - y1).signum());
    let (left, right) = (clip.x as i64, clip.right() as i64);
    let (top, bottom) = (clip.y as i64, clip.bottom() as i64);

    if dx >= dy {
        let Some((k1, k2)) = major_span(x1, sx, dx, left, right) else {
            return;
        };
        for k in k1..=k2 {
            let (x, y) = (x1 + sx * k, y1 + sy * minor_step(k, dy, dx));
            if y >= top && y <= bottom {
                visit(x as i32, y as i32);
            }
        }
    } else {
        let Some((k1, k2)) = major_span(y1, sy, dy, top, bottom) else {
            return;
        };
        for k in k1..=k2 {
            let (x, y) = (x1 + sx * minor_step(k, dx, dy), y1 + sy * k);
            if x >= left && x <= right {
                visit(x as i32, y as i32);
            }
        }
    }
}

/// Step indices `0..=len` whose major coordinate `start + dir * k` is in `lo..=hi`
fn major_span(start: i64, dir: i64, len: i64, lo: i64, hi: i64) -> Option<(i64, i64)> {
    let (k1, k2) = match dir {
        0 => (0, 0),
        1 => (lo - start, hi - start),
        _ => (start - hi, start - lo),
    };
    let (k1, k2) = (k1.max(0), k2.min(len));
    if dir == 0 && (start < lo || start > hi) {
        return None;
    }
    (k1 <= k2).then_some((k1, k2))
}

/// Minor-axis offset after `k` major steps
#[inline]
fn minor_step(k: i64, minor: i64, major: i64) -> i64 {
    if major == 0 {
        return 0;
    }
    let (k, minor, major) = (k as i128, minor as i128, major as i128);
    ((2 * k * minor + major) / (2 * major)) as i64
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bitmap {
    w: i32,
    h: i32,
    clip: Rect,
    data: Vec<u32>,
}

impl Bitmap {
    /// Create a transparent bitmap; dimensions are clamped to `1..=MAX_DIMENSION`
    pub fn new(w: i32, h: i32) -> Self {
        let w = w.clamp(1, MAX_DIMENSION);
        let h = h.clamp(1, MAX_DIMENSION);

        Self {
            w,
            h,
            clip: Rect::new(0, 0, w, h),
            data: vec![0; w as usize * h as usize],
        }
    }

    /// Like [`Bitmap::new`] but rejects out-of-range dimensions
    pub fn try_new(w: i32, h: i32) -> Result<Self, CoreError> {
        if !(1..=MAX_DIMENSION).contains(&w) || !(1..=MAX_DIMENSION).contains(&h) {
            return Err(CoreError::InvalidInput(format!(
                "Bitmap dimensions must be in [1, {}] (got {}x{})",
                MAX_DIMENSION, w, h
            )));
        }
        Ok(Self::new(w, h))
    }

    /// Wrap an existing pixel vector
    pub fn from_pixels(w: i32, h: i32, data: Vec<u32>) -> Result<Self, CoreError> {
        let mut bmp = Self::try_new(w, h)?;
        if data.len() != bmp.data.len() {
            return Err(CoreError::InvalidInput(format!(
                "Expected {} pixels for {}x{}, got {}",
                bmp.data.len(),
                w,
                h,
                data.len()
            )));
        }
        bmp.data = data;
        Ok(bmp)
    }

    pub fn width(&self) -> i32 {
        self.w
    }

    pub fn height(&self) -> i32 {
        self.h
    }

    pub fn bounds(&self) -> Rect {
        Rect::new(0, 0, self.w, self.h)
    }

    pub fn clip(&self) -> Rect {
        self.clip
    }

    /// Set the clip from inclusive corners; each corner is clamped into the buffer
    pub fn set_clip(&mut self, x1: i32, y1: i32, x2: i32, y2: i32) {
        let x1 = x1.clamp(0, self.w - 1);
        let y1 = y1.clamp(0, self.h - 1);
        let x2 = x2.clamp(0, self.w - 1);
        let y2 = y2.clamp(0, self.h - 1);
        self.clip = Rect::from_corners(x1, y1, x2, y2);
    }

    pub fn reset_clip(&mut self) {
        self.clip = self.bounds();
    }

    /// Buffer size in bytes
    pub fn bytes(&self) -> usize {
        self.data.len() * std::mem::size_of::<u32>()
    }

    pub fn pixels(&self) -> &[u32] {
        &self.data
    }

    pub fn pixels_mut(&mut self) -> &mut [u32] {
        &mut self.data
    }

    pub fn row(&self, y: i32) -> Option<&[u32]> {
        if y < 0 || y >= self.h {
            return None;
        }
        let start = self.index(0, y);
        Some(&self.data[start..start + self.w as usize])
    }

    pub fn row_mut(&mut self, y: i32) -> Option<&mut [u32]> {
        if y < 0 || y >= self.h {
            return None;
        }
        let start = self.index(0, y);
        let w = self.w as usize;
        Some(&mut self.data[start..start + w])
    }

    #[inline]
    fn index(&self, x: i32, y: i32) -> usize {
        y as usize * self.w as usize + x as usize
    }

    /// Read a pixel; coordinates are clamped to the buffer
    #[inline]
    pub fn get_pixel(&self, x: i32, y: i32) -> u32 {
        let x = x.clamp(0, self.w - 1);
        let y = y.clamp(0, self.h - 1);
        self.data[self.index(x, y)]
    }

    /// Unblended write inside the clip
    #[inline]
    pub fn put_pixel(&mut self, x: i32, y: i32, c: u32) {
        if self.clip.contains(x, y) {
            let i = self.index(x, y);
            self.data[i] = c;
        }
    }

    /// 3x3 box average around `(x, y)` with clamped addressing
    pub fn smooth_sample(&self, x: i32, y: i32) -> u32 {
        let mut block = [0u32; 9];
        let mut i = 0;
        for dy in -1..=1 {
            for dx in -1..=1 {
                block[i] = self.get_pixel(x + dx, y + dy);
                i += 1;
            }
        }
        Blend::average(&block)
    }

    /// Blend at an in-clip coordinate
    #[inline]
    fn blend_at(&mut self, mode: BlendMode, x: i32, y: i32, c: u32, t: i32) {
        let i = self.index(x, y);
        let dst = self.data[i];
        let out = match mode {
            BlendMode::Smooth => Blend::trans(dst, self.smooth_sample(x, y), t),
            mode => Blend::current(mode, dst, c, t),
        };
        self.data[i] = out;
    }

    fn wrap_coords(&self, x: i32, y: i32) -> (i32, i32) {
        let c = self.clip;
        let wrap = |v: i32, origin: i32, size: i32| {
            origin + (v as i64 - origin as i64).rem_euclid(size as i64) as i32
        };
        (wrap(x, c.x, c.w), wrap(y, c.y, c.h))
    }

    /// Brush write: resolves the context's address mode, then blends
    pub fn set_pixel(&mut self, ctx: &PaintContext, x: i32, y: i32, c: u32, t: i32) {
        let (x, y) = if ctx.address.wraps() {
            self.wrap_coords(x, y)
        } else {
            (x, y)
        };

        if !self.clip.contains(x, y) {
            return;
        }

        let c = match ctx.address.clone_source() {
            Some(src) => src.sample(x, y),
            None => c,
        };

        self.blend_at(ctx.blend, x, y, c, t);
    }

    /// Rectangle from corners pulled to at most one pixel outside the clip.
    /// Outline edges that lie outside the clip stay outside it.
    fn clamp_corners(&self, x1: i32, y1: i32, x2: i32, y2: i32) -> Rect {
        let c = self.clip;
        let cx = |v: i32| v.clamp(c.x - 1, c.right() + 1);
        let cy = |v: i32| v.clamp(c.y - 1, c.bottom() + 1);
        Rect::from_corners(cx(x1), cy(y1), cx(x2), cy(y2))
    }

    /// Fill the whole buffer, ignoring the clip
    pub fn clear(&mut self, c: u32) {
        self.data.fill(c);
    }

    pub fn hline(&mut self, ctx: &PaintContext, x1: i32, y: i32, x2: i32, c: u32, t: i32) {
        let clip = self.clip;
        if y < clip.y || y > clip.bottom() {
            return;
        }
        let (x1, x2) = (x1.min(x2).max(clip.x), x1.max(x2).min(clip.right()));
        for x in x1..=x2 {
            self.blend_at(ctx.blend, x, y, c, t);
        }
    }

    pub fn vline(&mut self, ctx: &PaintContext, y1: i32, x: i32, y2: i32, c: u32, t: i32) {
        let clip = self.clip;
        if x < clip.x || x > clip.right() {
            return;
        }
        let (y1, y2) = (y1.min(y2).max(clip.y), y1.max(y2).min(clip.bottom()));
        for y in y1..=y2 {
            self.blend_at(ctx.blend, x, y, c, t);
        }
    }

    #[allow(clippy::too_many_arguments)]
    pub fn line(&mut self, ctx: &PaintContext, x1: i32, y1: i32, x2: i32, y2: i32, c: u32, t: i32) {
        let clip = self.clip;
        line_walk(x1, y1, x2, y2, &clip, |x, y| self.blend_at(ctx.blend, x, y, c, t));
    }

    /// Outline; corners are blended once
    #[allow(clippy::too_many_arguments)]
    pub fn rect(&mut self, ctx: &PaintContext, x1: i32, y1: i32, x2: i32, y2: i32, c: u32, t: i32) {
        let r = self.clamp_corners(x1, y1, x2, y2);
        self.hline(ctx, r.x, r.y, r.right(), c, t);
        if r.h > 1 {
            self.hline(ctx, r.x, r.bottom(), r.right(), c, t);
        }
        if r.h > 2 {
            self.vline(ctx, r.y + 1, r.x, r.bottom() - 1, c, t);
            if r.w > 1 {
                self.vline(ctx, r.y + 1, r.right(), r.bottom() - 1, c, t);
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    pub fn rectfill(
        &mut self,
        ctx: &PaintContext,
        x1: i32,
        y1: i32,
        x2: i32,
        y2: i32,
        c: u32,
        t: i32,
    ) {
        let r = self.clamp_corners(x1, y1, x2, y2).intersect(&self.clip);
        if r.is_empty() {
            return;
        }
        for y in r.y..=r.bottom() {
            self.hline(ctx, r.x, y, r.right(), c, t);
        }
    }

    #[inline]
    fn xor_at(&mut self, x: i32, y: i32) {
        if self.clip.contains(x, y) {
            let i = self.index(x, y);
            self.data[i] ^= XOR_MASK;
        }
    }

    /// XOR overlay primitives are their own inverse (draw twice to erase)
    pub fn xor_hline(&mut self, x1: i32, y: i32, x2: i32) {
        for x in x1.min(x2).max(self.clip.x)..=x1.max(x2).min(self.clip.right()) {
            self.xor_at(x, y);
        }
    }

    pub fn xor_vline(&mut self, y1: i32, x: i32, y2: i32) {
        for y in y1.min(y2).max(self.clip.y)..=y1.max(y2).min(self.clip.bottom()) {
            self.xor_at(x, y);
        }
    }

    pub fn xor_line(&mut self, x1: i32, y1: i32, x2: i32, y2: i32) {
        let clip = self.clip;
        line_walk(x1, y1, x2, y2, &clip, |x, y| self.xor_at(x, y));
    }

    pub fn xor_rect(&mut self, x1: i32, y1: i32, x2: i32, y2: i32) {
        let r = self.clamp_corners(x1, y1, x2, y2);
        self.xor_hline(r.x, r.y, r.right());
        if r.h > 1 {
            self.xor_hline(r.x, r.bottom(), r.right());
        }
        if r.h > 2 {
            self.xor_vline(r.y + 1, r.x, r.bottom() - 1);
            if r.w > 1 {
                self.xor_vline(r.y + 1, r.right(), r.bottom() - 1);
            }
        }
    }

    /// Trim a copy rectangle against our bounds and the destination's clip.
    ///
    /// Returns `(sx, sy, dx, dy, w, h)` or `None` when nothing is left.
    #[allow(clippy::too_many_arguments)]
    fn trim_copy(
        &self,
        dest: &Bitmap,
        sx: i32,
        sy: i32,
        dx: i32,
        dy: i32,
        w: i32,
        h: i32,
    ) -> Option<(i32, i32, i32, i32, i32, i32)> {
        // Widened so far-out offsets cannot overflow while trimming
        let (mut sx, mut sy, mut dx, mut dy) = (sx as i64, sy as i64, dx as i64, dy as i64);
        let (mut w, mut h) = (w as i64, h as i64);

        if sx < 0 {
            w += sx;
            dx -= sx;
            sx = 0;
        }
        if sy < 0 {
            h += sy;
            dy -= sy;
            sy = 0;
        }
        w = w.min(self.w as i64 - sx);
        h = h.min(self.h as i64 - sy);

        let clip = dest.clip;
        let (left, top) = (clip.x as i64, clip.y as i64);
        if dx < left {
            let d = left - dx;
            w -= d;
            sx += d;
            dx = left;
        }
        if dy < top {
            let d = top - dy;
            h -= d;
            sy += d;
            dy = top;
        }
        w = w.min(clip.right() as i64 - dx + 1);
        h = h.min(clip.bottom() as i64 - dy + 1);

        if w <= 0 || h <= 0 {
            return None;
        }
        Some((sx as i32, sy as i32, dx as i32, dy as i32, w as i32, h as i32))
    }

    /// Copy a `w`x`h` block from `(sx, sy)` here to `(dx, dy)` in `dest`
    #[allow(clippy::too_many_arguments)]
    pub fn blit(&self, dest: &mut Bitmap, sx: i32, sy: i32, dx: i32, dy: i32, w: i32, h: i32) {
        let Some((sx, sy, dx, dy, w, h)) = self.trim_copy(dest, sx, sy, dx, dy, w, h) else {
            return;
        };

        let w = w as usize;
        for row in 0..h {
            let s = self.index(sx, sy + row);
            let d = dest.index(dx, dy + row);
            dest.data[d..d + w].copy_from_slice(&self.data[s..s + w]);
        }
    }

    /// Composite a block over `dest` using source alpha scaled by `t`
    #[allow(clippy::too_many_arguments)]
    pub fn trans_blit(
        &self,
        dest: &mut Bitmap,
        sx: i32,
        sy: i32,
        dx: i32,
        dy: i32,
        w: i32,
        h: i32,
        t: i32,
    ) {
        let Some((sx, sy, dx, dy, w, h)) = self.trim_copy(dest, sx, sy, dx, dy, w, h) else {
            return;
        };

        let opacity = 255 - t.clamp(0, 255);
        for row in 0..h {
            for col in 0..w {
                let c = self.data[self.index(sx + col, sy + row)];
                let i = dest.index(dx + col, dy + row);
                let tc = 255 - get_a(c) * opacity / 255;
                dest.data[i] = Blend::trans(dest.data[i], c, tc);
            }
        }
    }

    /// Import from the codec layer's RGBA image
    pub fn from_rgba_image(image: &image::RgbaImage) -> Result<Self, CoreError> {
        let (w, h) = image.dimensions();
        if w > MAX_DIMENSION as u32 || h > MAX_DIMENSION as u32 {
            return Err(CoreError::InvalidInput(format!(
                "Image {}x{} exceeds the {} pixel limit",
                w, h, MAX_DIMENSION
            )));
        }

        let data = image
            .pixels()
            .map(|p| make_rgba(p[0] as i32, p[1] as i32, p[2] as i32, p[3] as i32))
            .collect();
        Self::from_pixels(w as i32, h as i32, data)
    }

    /// Export for the codec layer
    pub fn to_rgba_image(&self) -> image::RgbaImage {
        image::RgbaImage::from_fn(self.w as u32, self.h as u32, |x, y| {
            image::Rgba(self.get_pixel(x as i32, y as i32).to_le_bytes())
        })
    }
}
