//! Cooperative cancellation for long raster loops
//!
//! The core is single-threaded. Long loops call [`Cooperative::tick`] once
//! per scanline (or block row); every `every` rows it pumps the host event
//! loop, which may flip the [`CancelToken`], and reports whether the loop
//! must return early. There is no rollback: a cancelled operation leaves
//! whatever the last completed scanline produced, and the caller restores
//! from the undo checkpoint it took beforehand.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Result of a long-running raster operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Completed,
    Cancelled,
}

impl Outcome {
    pub fn is_cancelled(self) -> bool {
        self == Outcome::Cancelled
    }
}

/// Shared cancel flag, set by the host (usually from inside its event pump)
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }

    /// Clear the flag before starting the next operation
    pub fn reset(&self) {
        self.flag.store(false, Ordering::Relaxed);
    }
}

/// Host hook re-entered at the cancel-check granularity
pub trait EventPump {
    /// Refresh the display and poll input. `done` of `total` rows are finished.
    fn pump(&mut self, done: usize, total: usize);
}

/// Token + optional host pump + row granularity, threaded into raster loops
pub struct Cooperative<'a> {
    token: &'a CancelToken,
    pump: Option<&'a mut dyn EventPump>,
    every: usize,
    total: usize,
}

impl<'a> Cooperative<'a> {
    pub fn new(token: &'a CancelToken, every: usize) -> Self {
        Self {
            token,
            pump: None,
            every: every.max(1),
            total: 0,
        }
    }

    pub fn with_pump(mut self, pump: &'a mut dyn EventPump) -> Self {
        self.pump = Some(pump);
        self
    }

    /// Announce the number of rows the next loop will visit (for progress)
    pub fn begin(&mut self, total: usize) {
        self.total = total;
    }

    /// Called once per row; returns `true` when the loop must stop.
    pub fn tick(&mut self, row: usize) -> bool {
        if row % self.every != 0 {
            return false;
        }
        if let Some(pump) = self.pump.as_mut() {
            pump.pump(row, self.total);
        }
        self.token.is_cancelled()
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}
