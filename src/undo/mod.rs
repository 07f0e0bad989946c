//! Region-bounded undo/redo
//!
//! Each image owns an [`Undo`]: two fixed-capacity rings of entries. Pixel
//! entries hold an LZ4-compressed snapshot of a canvas rectangle (or of the
//! whole canvas for [`UndoKind::Full`]). Geometric entries are tags only:
//! flips and 180-degree rotation are their own inverse and an offset is
//! undone by the opposite offset, so no pixels are copied for them.
//!
//! All open images draw from one shared [`UndoBudget`]. When a snapshot
//! would exceed it the entry is dropped with a warning; the action itself
//! always proceeds.

use lz4_flex::{compress_prepend_size, decompress_size_prepended};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::bitmap::{Bitmap, Rect};
use crate::core::EngineConfig;

/// What a checkpoint records
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UndoKind {
    /// Pixels inside a rectangle
    Partial,
    /// Entire canvas including its dimensions
    Full,
    /// Wraparound scroll by `(dx, dy)`
    Offset { dx: i32, dy: i32 },
    FlipH,
    FlipV,
    Rotate180,
}

impl UndoKind {
    fn is_tag(self) -> bool {
        !matches!(self, UndoKind::Partial | UndoKind::Full)
    }

    /// The tag that reverts this one
    fn inverse(self) -> Self {
        match self {
            UndoKind::Offset { dx, dy } => UndoKind::Offset { dx: -dx, dy: -dy },
            kind => kind,
        }
    }

    /// Revert a geometric tag on the live canvas
    fn revert(self, bmp: &mut Bitmap) {
        match self {
            UndoKind::Offset { dx, dy } => bmp.offset(-dx, -dy),
            UndoKind::FlipH => bmp.flip_horizontal(),
            UndoKind::FlipV => bmp.flip_vertical(),
            UndoKind::Rotate180 => bmp.rotate_180(),
            UndoKind::Partial | UndoKind::Full => {}
        }
    }
}

/// Shared byte accounting over every image's undo and redo snapshots
#[derive(Debug, Clone)]
pub struct UndoBudget {
    state: Arc<Mutex<BudgetState>>,
}

#[derive(Debug)]
struct BudgetState {
    limit: Option<usize>,
    used: usize,
}

impl UndoBudget {
    /// `None` means unlimited
    pub fn new(limit: Option<usize>) -> Self {
        Self {
            state: Arc::new(Mutex::new(BudgetState { limit, used: 0 })),
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.undo_memory_limit_bytes())
    }

    pub fn used(&self) -> usize {
        self.state.lock().used
    }

    pub fn limit(&self) -> Option<usize> {
        self.state.lock().limit
    }

    fn try_reserve(&self, bytes: usize) -> bool {
        let mut state = self.state.lock();
        if let Some(limit) = state.limit {
            if state.used + bytes > limit {
                return false;
            }
        }
        state.used += bytes;
        true
    }

    fn release(&self, bytes: usize) {
        let mut state = self.state.lock();
        state.used = state.used.saturating_sub(bytes);
    }
}

impl Default for UndoBudget {
    fn default() -> Self {
        Self::new(None)
    }
}

/// Compressed copy of a canvas rectangle
#[derive(Debug)]
struct Snapshot {
    rect: Rect,
    data: Vec<u8>,
}

impl Snapshot {
    fn capture(bmp: &Bitmap, rect: Rect) -> Option<Self> {
        let rect = rect.intersect(&bmp.bounds());
        if rect.is_empty() {
            return None;
        }

        let mut raw = Vec::with_capacity(rect.area() * 4);
        for y in rect.y..=rect.bottom() {
            if let Some(row) = bmp.row(y) {
                for &c in &row[rect.x as usize..=rect.right() as usize] {
                    raw.extend_from_slice(&c.to_le_bytes());
                }
            }
        }

        let data = compress_prepend_size(&raw);
        debug!(
            "[Undo] snapshot {}x{}: {} -> {} bytes ({:.1}%)",
            rect.w,
            rect.h,
            raw.len(),
            data.len(),
            data.len() as f64 / raw.len().max(1) as f64 * 100.0
        );
        Some(Self { rect, data })
    }

    fn bytes(&self) -> usize {
        self.data.len()
    }

    /// Decompress into a bitmap of the snapshot's size
    fn restore(&self) -> Option<Bitmap> {
        let raw = match decompress_size_prepended(&self.data) {
            Ok(raw) => raw,
            Err(e) => {
                warn!("[Undo] corrupt snapshot: {}", e);
                return None;
            }
        };
        let pixels = raw
            .chunks_exact(4)
            .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect();
        Bitmap::from_pixels(self.rect.w, self.rect.h, pixels).ok()
    }
}

#[derive(Debug)]
enum Entry {
    Pixels { kind: UndoKind, snap: Snapshot },
    Tag(UndoKind),
}

impl Entry {
    fn bytes(&self) -> usize {
        match self {
            Entry::Pixels { snap, .. } => snap.bytes(),
            Entry::Tag(_) => 0,
        }
    }
}

/// One bounded ring (undo or redo side)
#[derive(Debug)]
struct Ring {
    entries: VecDeque<Entry>,
}

impl Ring {
    fn new() -> Self {
        Self {
            entries: VecDeque::new(),
        }
    }

    fn clear(&mut self, budget: &UndoBudget) {
        let bytes: usize = self.entries.iter().map(Entry::bytes).sum();
        budget.release(bytes);
        self.entries.clear();
    }

    /// Append, evicting the oldest entry when full
    fn push(&mut self, entry: Entry, levels: usize, budget: &UndoBudget) {
        while self.entries.len() >= levels {
            match self.entries.pop_front() {
                Some(old) => budget.release(old.bytes()),
                None => break,
            }
        }
        self.entries.push_back(entry);
    }

    /// Record a checkpoint; returns whether an entry was stored
    fn record(
        &mut self,
        bmp: &Bitmap,
        rect: Rect,
        kind: UndoKind,
        levels: usize,
        budget: &UndoBudget,
    ) -> bool {
        if kind.is_tag() {
            self.push(Entry::Tag(kind), levels, budget);
            return true;
        }

        let rect = if kind == UndoKind::Full { bmp.bounds() } else { rect };
        let Some(snap) = Snapshot::capture(bmp, rect) else {
            debug!("[Undo] {:?} checkpoint outside the canvas, nothing recorded", kind);
            return false;
        };

        if !budget.try_reserve(snap.bytes()) {
            warn!(
                "[Undo] memory budget exhausted ({} bytes in use, {} requested), checkpoint dropped",
                budget.used(),
                snap.bytes()
            );
            return false;
        }

        self.push(Entry::Pixels { kind, snap }, levels, budget);
        true
    }
}

/// Undo/redo history for one image
#[derive(Debug)]
pub struct Undo {
    levels: usize,
    undo: Ring,
    redo: Ring,
    budget: UndoBudget,
}

impl Undo {
    pub fn new(levels: usize, budget: UndoBudget) -> Self {
        Self {
            levels: levels.max(1),
            undo: Ring::new(),
            redo: Ring::new(),
            budget,
        }
    }

    pub fn from_config(config: &EngineConfig, budget: UndoBudget) -> Self {
        Self::new(config.undo_levels, budget)
    }

    /// Checkpoint before a mutating action; clears the redo side.
    ///
    /// `rect` is ignored for [`UndoKind::Full`] and for geometric tags.
    /// Returns `false` when the entry could not be recorded.
    pub fn push(&mut self, bmp: &Bitmap, rect: Rect, kind: UndoKind) -> bool {
        self.redo.clear(&self.budget);
        self.undo.record(bmp, rect, kind, self.levels, &self.budget)
    }

    /// Record onto the redo side without touching the undo side
    pub fn push_redo(&mut self, bmp: &Bitmap, rect: Rect, kind: UndoKind) -> bool {
        self.redo.record(bmp, rect, kind, self.levels, &self.budget)
    }

    /// Revert the newest checkpoint; returns `false` when there is none
    pub fn pop(&mut self, bmp: &mut Bitmap) -> bool {
        Self::step(&mut self.undo, &mut self.redo, bmp, self.levels, &self.budget)
    }

    /// Re-apply the newest undone checkpoint
    pub fn pop_redo(&mut self, bmp: &mut Bitmap) -> bool {
        Self::step(&mut self.redo, &mut self.undo, bmp, self.levels, &self.budget)
    }

    fn step(
        from: &mut Ring,
        to: &mut Ring,
        bmp: &mut Bitmap,
        levels: usize,
        budget: &UndoBudget,
    ) -> bool {
        let Some(entry) = from.entries.pop_back() else {
            return false;
        };
        budget.release(entry.bytes());

        match entry {
            Entry::Tag(kind) => {
                kind.revert(bmp);
                to.record(bmp, Rect::default(), kind.inverse(), levels, budget);
            }
            Entry::Pixels {
                kind: UndoKind::Full,
                snap,
            } => {
                to.record(bmp, bmp.bounds(), UndoKind::Full, levels, budget);
                if let Some(restored) = snap.restore() {
                    *bmp = restored;
                }
            }
            Entry::Pixels { kind, snap } => {
                to.record(bmp, snap.rect, kind, levels, budget);
                if let Some(restored) = snap.restore() {
                    let clip = bmp.clip();
                    bmp.reset_clip();
                    restored.blit(bmp, 0, 0, snap.rect.x, snap.rect.y, snap.rect.w, snap.rect.h);
                    bmp.set_clip(clip.x, clip.y, clip.right(), clip.bottom());
                }
            }
        }
        true
    }

    /// Forget all history and return its memory to the budget
    pub fn reset(&mut self) {
        self.undo.clear(&self.budget);
        self.redo.clear(&self.budget);
    }

    pub fn can_undo(&self) -> bool {
        !self.undo.entries.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.entries.is_empty()
    }

    pub fn undo_len(&self) -> usize {
        self.undo.entries.len()
    }

    pub fn redo_len(&self) -> usize {
        self.redo.entries.len()
    }

    /// Compressed bytes held by this image
    pub fn bytes(&self) -> usize {
        self.undo
            .entries
            .iter()
            .chain(self.redo.entries.iter())
            .map(Entry::bytes)
            .sum()
    }
}

impl Drop for Undo {
    fn drop(&mut self) {
        self.reset();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::bitmap::PaintContext;
    use crate::blend::{make_rgb, BlendMode};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    const RED: u32 = 0xff00_00ff;
    const BLUE: u32 = 0xffff_0000;

    fn ctx() -> PaintContext {
        PaintContext::new(BlendMode::Trans)
    }

    fn noise(w: i32, h: i32, seed: u64) -> Bitmap {
        let mut rng = StdRng::seed_from_u64(seed);
        let data = (0..w * h).map(|_| rng.gen::<u32>()).collect();
        Bitmap::from_pixels(w, h, data).unwrap()
    }

    #[test]
    fn test_partial_round_trip() {
        let mut bmp = Bitmap::new(64, 64);
        bmp.clear(make_rgb(255, 255, 255));
        bmp.rectfill(&ctx(), 20, 20, 29, 29, RED, 0);
        let painted = bmp.clone();

        let mut undo = Undo::new(8, UndoBudget::default());
        assert!(undo.push(&bmp, Rect::new(20, 20, 10, 10), UndoKind::Partial));
        bmp.rectfill(&ctx(), 20, 20, 29, 29, BLUE, 0);
        assert_ne!(bmp, painted);

        assert!(undo.pop(&mut bmp));
        assert_eq!(bmp, painted);
        assert!(!undo.can_undo());
        assert!(undo.can_redo());
    }

    #[test]
    fn test_full_round_trip_across_resize() {
        let original = noise(100, 100, 1);
        let mut bmp = original.clone();
        let mut undo = Undo::new(8, UndoBudget::default());

        assert!(undo.push(&bmp, Rect::default(), UndoKind::Full));
        bmp = bmp.crop(Rect::new(0, 0, 50, 50));
        assert_eq!((bmp.width(), bmp.height()), (50, 50));

        assert!(undo.pop(&mut bmp));
        assert_eq!(bmp, original);

        // Redo brings the resized canvas back
        assert!(undo.pop_redo(&mut bmp));
        assert_eq!((bmp.width(), bmp.height()), (50, 50));
    }

    #[test]
    fn test_offset_round_trip() {
        let original = noise(40, 30, 2);
        let mut bmp = original.clone();
        let mut undo = Undo::new(8, UndoBudget::default());

        undo.push(&bmp, Rect::default(), UndoKind::Offset { dx: 5, dy: 7 });
        bmp.offset(5, 7);
        assert_ne!(bmp, original);

        assert!(undo.pop(&mut bmp));
        assert_eq!(bmp, original);
        assert_eq!(undo.bytes(), 0);

        assert!(undo.pop_redo(&mut bmp));
        let mut shifted = original.clone();
        shifted.offset(5, 7);
        assert_eq!(bmp, shifted);
    }

    #[test]
    fn test_flip_round_trip() {
        let original = noise(17, 9, 3);
        let mut bmp = original.clone();
        let mut undo = Undo::new(8, UndoBudget::default());

        for kind in [UndoKind::FlipH, UndoKind::FlipV, UndoKind::Rotate180] {
            undo.push(&bmp, Rect::default(), kind);
            match kind {
                UndoKind::FlipH => bmp.flip_horizontal(),
                UndoKind::FlipV => bmp.flip_vertical(),
                _ => bmp.rotate_180(),
            }
        }
        assert_eq!(undo.bytes(), 0);

        while undo.pop(&mut bmp) {}
        assert_eq!(bmp, original);
    }

    #[test]
    fn test_new_action_discards_redo() {
        let mut bmp = noise(32, 32, 4);
        let mut undo = Undo::new(8, UndoBudget::default());

        undo.push(&bmp, Rect::new(0, 0, 8, 8), UndoKind::Partial);
        bmp.rectfill(&ctx(), 0, 0, 7, 7, RED, 0);
        undo.pop(&mut bmp);
        assert!(undo.can_redo());

        undo.push(&bmp, Rect::new(8, 8, 8, 8), UndoKind::Partial);
        bmp.rectfill(&ctx(), 8, 8, 15, 15, BLUE, 0);
        let after = bmp.clone();

        assert!(!undo.pop_redo(&mut bmp));
        assert_eq!(bmp, after);
    }

    #[test]
    fn test_redo_replays_partial() {
        let mut bmp = noise(32, 32, 5);
        let mut undo = Undo::new(8, UndoBudget::default());

        undo.push(&bmp, Rect::new(4, 4, 10, 10), UndoKind::Partial);
        bmp.rectfill(&ctx(), 4, 4, 13, 13, RED, 0);
        let after = bmp.clone();

        undo.pop(&mut bmp);
        assert!(undo.pop_redo(&mut bmp));
        assert_eq!(bmp, after);
    }

    #[test]
    fn test_restore_ignores_clip() {
        let original = noise(16, 16, 6);
        let mut bmp = original.clone();
        let mut undo = Undo::new(4, UndoBudget::default());

        undo.push(&bmp, bmp.bounds(), UndoKind::Partial);
        bmp.clear(RED);
        bmp.set_clip(2, 2, 5, 5);

        undo.pop(&mut bmp);
        assert_eq!(bmp.pixels(), original.pixels());
        assert_eq!(bmp.clip(), Rect::new(2, 2, 4, 4));
    }

    #[test]
    fn test_ring_evicts_oldest() {
        let budget = UndoBudget::default();
        let mut bmp = noise(16, 16, 7);
        let mut undo = Undo::new(2, budget.clone());

        for i in 0..5 {
            undo.push(&bmp, Rect::new(i, i, 4, 4), UndoKind::Partial);
            bmp.put_pixel(i, i, RED);
        }
        assert_eq!(undo.undo_len(), 2);
        assert_eq!(budget.used(), undo.bytes());
    }

    #[test]
    fn test_budget_refuses_and_action_proceeds() {
        let budget = UndoBudget::new(Some(64));
        let mut bmp = noise(64, 64, 8);
        let mut undo = Undo::new(8, budget.clone());

        assert!(!undo.push(&bmp, bmp.bounds(), UndoKind::Partial));
        assert!(!undo.can_undo());
        assert_eq!(budget.used(), 0);

        // Tags need no memory
        assert!(undo.push(&bmp, Rect::default(), UndoKind::FlipV));
        bmp.flip_vertical();
        assert!(undo.pop(&mut bmp));
    }

    #[test]
    fn test_budget_shared_and_released_on_drop() {
        let budget = UndoBudget::default();
        let bmp = noise(32, 32, 9);

        let mut a = Undo::new(4, budget.clone());
        let mut b = Undo::new(4, budget.clone());
        a.push(&bmp, bmp.bounds(), UndoKind::Partial);
        b.push(&bmp, bmp.bounds(), UndoKind::Full);
        assert_eq!(budget.used(), a.bytes() + b.bytes());

        drop(a);
        assert_eq!(budget.used(), b.bytes());
        b.reset();
        assert_eq!(budget.used(), 0);
    }

    #[test]
    fn test_push_outside_canvas_records_nothing() {
        let bmp = Bitmap::new(8, 8);
        let mut undo = Undo::new(4, UndoBudget::default());
        assert!(!undo.push(&bmp, Rect::new(20, 20, 4, 4), UndoKind::Partial));
        assert!(!undo.can_undo());
    }
}
