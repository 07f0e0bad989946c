//! Brush configuration - tip shape, paint mode and compositing parameters

use serde::{Deserialize, Serialize};

use crate::blend::BlendMode;

/// Largest tip diameter in pixels
pub const MAX_SIZE: i32 = 256;
/// Largest edge-softness parameter
pub const MAX_EDGE: i32 = 15;

/// Tip shapes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum BrushShape {
    #[default]
    Round,
    Square,
    /// Flat horizontal bar
    Horizontal,
    /// Flat vertical bar
    Vertical,
    /// Diagonal bar rising to the right
    Slash,
    /// Diagonal bar falling to the right
    Backslash,
}

/// Stroke rendering algorithms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum PaintMode {
    /// Flat color at base transparency
    #[default]
    Solid,
    /// Blend by supersampled coverage
    Antialiased,
    /// Morphological shrink with a geometric ramp
    Coarse,
    /// Distance-to-boundary feather
    Fine,
    /// Gaussian-blurred mask
    Blurry,
    /// Inverse airbrush that grows coverage
    Watercolor,
    /// Coarse cadence with random jitter
    Chalk,
    /// Coarse cadence sampling a marble texture
    Texture,
    /// Coarse cadence with the mean color under the mask
    Average,
}

/// Active brush
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Brush {
    /// Tip diameter (1-256)
    pub size: i32,
    pub shape: BrushShape,
    /// Per-mode edge softness (0-15)
    pub edge: i32,
    pub mode: PaintMode,
    pub blend: BlendMode,
    /// Packed RGBA
    pub color: u32,
    /// Base transparency, 0 = full effect
    pub trans: i32,
    /// Antialias the solid mode
    pub aa: bool,
}

impl Default for Brush {
    fn default() -> Self {
        Self {
            size: 8,
            shape: BrushShape::Round,
            edge: 4,
            mode: PaintMode::Solid,
            blend: BlendMode::Trans,
            color: 0xff00_0000,
            trans: 0,
            aa: false,
        }
    }
}

impl Brush {
    /// Copy with every numeric field clamped to its valid range
    pub fn normalized(mut self) -> Self {
        self.size = self.size.clamp(1, MAX_SIZE);
        self.edge = self.edge.clamp(0, MAX_EDGE);
        self.trans = self.trans.clamp(0, 255);
        self
    }

    /// Half the tip diameter, rounded down
    pub fn radius(&self) -> i32 {
        self.size.clamp(1, MAX_SIZE) / 2
    }

    /// Offsets covered by the tip at 1:1
    pub fn stamp(&self) -> Vec<(i32, i32)> {
        self.stamp_scaled(1)
    }

    /// Offsets covered by the tip magnified by `scale`.
    ///
    /// Used by the supersampled coverage pass; bar shapes get a thickness of
    /// `scale` so they stay one source pixel wide.
    pub fn stamp_scaled(&self, scale: i32) -> Vec<(i32, i32)> {
        let scale = scale.max(1);
        let s = self.size.clamp(1, MAX_SIZE) * scale;
        let half = s / 2;
        let thick = scale;

        let mut offsets = Vec::new();
        match self.shape {
            BrushShape::Round => {
                // Half-pixel units: distance from the tip center to pixel centers
                for j in 0..s {
                    let v = 2 * j + 1 - s;
                    for i in 0..s {
                        let u = 2 * i + 1 - s;
                        if u * u + v * v <= s * s {
                            offsets.push((i - half, j - half));
                        }
                    }
                }
            }
            BrushShape::Square => {
                for j in 0..s {
                    for i in 0..s {
                        offsets.push((i - half, j - half));
                    }
                }
            }
            BrushShape::Horizontal => {
                for t in 0..thick {
                    for i in 0..s {
                        offsets.push((i - half, t - thick / 2));
                    }
                }
            }
            BrushShape::Vertical => {
                for t in 0..thick {
                    for j in 0..s {
                        offsets.push((t - thick / 2, j - half));
                    }
                }
            }
            BrushShape::Slash | BrushShape::Backslash => {
                let sign = if self.shape == BrushShape::Slash { -1 } else { 1 };
                for i in 0..s {
                    let x = i - half;
                    for t in 0..thick {
                        offsets.push((x, sign * x + t - thick / 2));
                    }
                }
            }
        }
        offsets
    }
}
