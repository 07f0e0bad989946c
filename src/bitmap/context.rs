//! Explicit paint context threaded through blended writes
//!
//! Carries the active blend operator and how brush coordinates are
//! addressed. Resolved once per stroke by the caller; nothing here is
//! global.

use super::Bitmap;
use crate::blend::BlendMode;

/// Mirroring of the clone source around its anchor point
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CloneMirror {
    #[default]
    None,
    Horizontal,
    Vertical,
    Both,
}

/// Source image for clone painting, captured at stroke start
#[derive(Debug, Clone)]
pub struct CloneSource {
    image: Bitmap,
    dx: i32,
    dy: i32,
    mirror: CloneMirror,
    anchor_x: i32,
    anchor_y: i32,
}

impl CloneSource {
    /// Copy `image` and read it back at `(x - dx, y - dy)`
    pub fn capture(image: &Bitmap, dx: i32, dy: i32) -> Self {
        Self {
            image: image.clone(),
            dx,
            dy,
            mirror: CloneMirror::None,
            anchor_x: 0,
            anchor_y: 0,
        }
    }

    /// Mirror the source around `(anchor_x, anchor_y)` in source space
    pub fn with_mirror(mut self, mirror: CloneMirror, anchor_x: i32, anchor_y: i32) -> Self {
        self.mirror = mirror;
        self.anchor_x = anchor_x;
        self.anchor_y = anchor_y;
        self
    }

    /// Source color for destination `(x, y)`
    pub fn sample(&self, x: i32, y: i32) -> u32 {
        let mut sx = x - self.dx;
        let mut sy = y - self.dy;

        if matches!(self.mirror, CloneMirror::Horizontal | CloneMirror::Both) {
            sx = 2 * self.anchor_x - sx;
        }
        if matches!(self.mirror, CloneMirror::Vertical | CloneMirror::Both) {
            sy = 2 * self.anchor_y - sy;
        }

        self.image.get_pixel(sx, sy)
    }
}

/// How `Bitmap::set_pixel` resolves coordinates and color
#[derive(Debug, Clone, Default)]
pub enum AddressMode {
    #[default]
    Direct,
    /// Coordinates wrap around inside the clip rectangle
    Wrap,
    /// Color comes from a clone source instead of the brush
    Clone(CloneSource),
    WrapClone(CloneSource),
}

impl AddressMode {
    pub fn wraps(&self) -> bool {
        matches!(self, AddressMode::Wrap | AddressMode::WrapClone(_))
    }

    pub fn clone_source(&self) -> Option<&CloneSource> {
        match self {
            AddressMode::Clone(src) | AddressMode::WrapClone(src) => Some(src),
            AddressMode::Direct | AddressMode::Wrap => None,
        }
    }
}

/// Blend operator + address mode for one stroke or filter call
#[derive(Debug, Clone, Default)]
pub struct PaintContext {
    pub blend: BlendMode,
    pub address: AddressMode,
}

impl PaintContext {
    pub fn new(blend: BlendMode) -> Self {
        Self {
            blend,
            address: AddressMode::Direct,
        }
    }

    pub fn with_address(mut self, address: AddressMode) -> Self {
        self.address = address;
        self
    }
}
