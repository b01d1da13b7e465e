//! Error types for inference.

use thiserror::Error;

/// Result type alias for inference operations.
pub type Result<T> = std::result::Result<T, InferError>;

/// Errors that can occur during inference.
#[derive(Error, Debug)]
pub enum InferError {
    /// Inference was requested before any weights were attached.
    #[error("No model loaded; attach a checkpoint before requesting inference")]
    ModelNotLoaded,

    /// Image decoding or encoding error.
    #[error("Image error: {0}")]
    VisionError(#[from] histolens_vision::VisionError),

    /// Attribution error.
    #[error("Attribution error: {0}")]
    ExplainError(#[from] histolens_explain::ExplainError),

    /// Core error.
    #[error("Core error: {0}")]
    CoreError(#[from] histolens_core::CoreError),
}
