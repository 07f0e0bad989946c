use thiserror::Error;

/// Errors raised at the fallible edges of the core (construction and IO).
///
/// Drawing, blending, rendering and undo never fail; they clip, clamp or
/// degrade instead.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl From<serde_json::Error> for CoreError {
    fn from(value: serde_json::Error) -> Self {
        Self::Config(value.to_string())
    }
}

impl From<CoreError> for String {
    fn from(err: CoreError) -> Self {
        err.to_string()
    }
}
