//! Error types shared across the workspace.

use thiserror::Error;

/// Errors raised by the core data model.
#[derive(Error, Debug)]
pub enum CoreError {
    /// A buffer's length does not match its declared dimensions.
    #[error("Shape mismatch: {0}")]
    ShapeMismatch(String),

    /// A class index outside the two-class label space.
    #[error("Unknown class index {0} (expected 0 or 1)")]
    UnknownClassIndex(usize),
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
