//! raster-core - CPU raster compositing and procedural brush rendering
//!
//! Leaves first: [`bitmap`] (clipped pixel buffer), [`blend`] (compositing
//! operators and color math), [`kdtree`] (nearest-neighbor queries),
//! [`stroke`] (input geometry to coverage mask), [`render`] (mask + brush to
//! pixels) and [`undo`] (snapshot history). [`palette`], [`fill`] and
//! [`effect`] are filters built on the same primitives.

pub mod bitmap;
pub mod blend;
pub mod brush;
pub mod core;
pub mod effect;
pub mod fill;
pub mod kdtree;
pub mod palette;
pub mod render;
pub mod stroke;
pub mod undo;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

pub use bitmap::{AddressMode, Bitmap, PaintContext, Rect};
pub use blend::{Blend, BlendMode};
pub use brush::{Brush, BrushShape, PaintMode};
pub use crate::core::{CancelToken, Cooperative, CoreError, EngineConfig, EventPump, Outcome};
pub use stroke::{Map, Stroke, StrokeKind};
pub use undo::{Undo, UndoBudget, UndoKind};

/// Install the tracing subscriber.
///
/// Honors `RUST_LOG`, defaulting to debug output for this crate. Calling it
/// again (or after the host installed its own subscriber) is a no-op.
pub fn init_logging() {
    let result = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "raster_core=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .try_init();

    if result.is_ok() {
        tracing::info!("raster-core logging initialized");
    }
}
