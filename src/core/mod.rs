//! Shared plumbing for the raster core.
//!
//! Errors, engine configuration and cooperative cancellation. Nothing in
//! here knows about pixels.

pub mod cancel;
pub mod config;
pub mod errors;

pub use cancel::{CancelToken, Cooperative, EventPump, Outcome};
pub use config::EngineConfig;
pub use errors::CoreError;
