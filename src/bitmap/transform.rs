//! Whole-image geometry: flips, rotations, wraparound offset and crop

use super::{Bitmap, Rect};

impl Bitmap {
    pub fn flip_horizontal(&mut self) {
        let w = self.w as usize;
        for row in self.data.chunks_exact_mut(w) {
            row.reverse();
        }
    }

    pub fn flip_vertical(&mut self) {
        let w = self.w as usize;
        let h = self.h as usize;
        for y in 0..h / 2 {
            let (top, bottom) = self.data.split_at_mut((h - 1 - y) * w);
            top[y * w..(y + 1) * w].swap_with_slice(&mut bottom[..w]);
        }
    }

    pub fn rotate_180(&mut self) {
        self.data.reverse();
    }

    /// Quarter turn into a new `h`x`w` bitmap
    pub fn rotate_90(&self, clockwise: bool) -> Bitmap {
        let mut out = Bitmap::new(self.h, self.w);
        for y in 0..self.h {
            for x in 0..self.w {
                let (nx, ny) = if clockwise {
                    (self.h - 1 - y, x)
                } else {
                    (y, self.w - 1 - x)
                };
                let i = out.index(nx, ny);
                out.data[i] = self.data[self.index(x, y)];
            }
        }
        out
    }

    /// Scroll the image by `(dx, dy)` with wraparound
    pub fn offset(&mut self, dx: i32, dy: i32) {
        let dx = dx.rem_euclid(self.w);
        let dy = dy.rem_euclid(self.h);
        if dx == 0 && dy == 0 {
            return;
        }

        let clip = self.clip;
        self.reset_clip();

        let (w, h) = (self.w, self.h);
        let src = self.clone();
        src.blit(self, 0, 0, dx, dy, w - dx, h - dy);
        src.blit(self, w - dx, 0, 0, dy, dx, h - dy);
        src.blit(self, 0, h - dy, dx, 0, w - dx, dy);
        src.blit(self, w - dx, h - dy, 0, 0, dx, dy);

        self.clip = clip;
    }

    /// Copy of the region inside `rect`; an empty intersection yields 1x1
    pub fn crop(&self, rect: Rect) -> Bitmap {
        let r = rect.intersect(&self.bounds());
        if r.is_empty() {
            return Bitmap::new(1, 1);
        }

        let mut out = Bitmap::new(r.w, r.h);
        self.blit(&mut out, r.x, r.y, 0, 0, r.w, r.h);
        out
    }
}
