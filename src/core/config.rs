//! Engine configuration loaded from JSON

use std::path::Path;

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use super::errors::CoreError;

pub const DEFAULT_UNDO_LEVELS: usize = 16;
pub const DEFAULT_UNDO_MEMORY_LIMIT_MB: usize = 512;
pub const DEFAULT_CANCEL_CHECK_ROWS: usize = 64;

/// Upper bound for the undo ring; deeper rings only waste memory budget.
pub const MAX_UNDO_LEVELS: usize = 1024;

/// Tunables for undo depth, undo memory and raster-loop responsiveness
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineConfig {
    /// Ring capacity of each image's undo (and redo) stack
    pub undo_levels: usize,
    /// Shared budget over every open image's snapshots, in MiB (0 = unlimited)
    pub undo_memory_limit_mb: usize,
    /// Scanlines between cancel checks / host event pumps
    pub cancel_check_rows: usize,
    /// Fixed seed for the render RNG
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            undo_levels: DEFAULT_UNDO_LEVELS,
            undo_memory_limit_mb: DEFAULT_UNDO_MEMORY_LIMIT_MB,
            cancel_check_rows: DEFAULT_CANCEL_CHECK_ROWS,
            seed: None,
        }
    }
}

impl EngineConfig {
    /// Parse and validate a JSON document. Missing keys take their defaults.
    pub fn from_json_str(text: &str) -> Result<Self, CoreError> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON config file
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, CoreError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        tracing::debug!("Loading engine config from {:?}", path);
        Self::from_json_str(&text)
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        if !(1..=MAX_UNDO_LEVELS).contains(&self.undo_levels) {
            return Err(CoreError::Config(format!(
                "undoLevels must be in [1, {}] (was {})",
                MAX_UNDO_LEVELS, self.undo_levels
            )));
        }
        if self.cancel_check_rows == 0 {
            return Err(CoreError::Config(
                "cancelCheckRows must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Undo memory limit in bytes, `None` when unlimited
    pub fn undo_memory_limit_bytes(&self) -> Option<usize> {
        match self.undo_memory_limit_mb {
            0 => None,
            mb => Some(mb.saturating_mul(1024 * 1024)),
        }
    }

    /// RNG for chalk jitter, watercolor blooms and marble textures
    pub fn rng(&self) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        }
    }
}
