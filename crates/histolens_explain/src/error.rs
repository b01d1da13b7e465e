//! Error types for attribution.

use thiserror::Error;

/// Error type for attribution operations.
#[derive(Error, Debug)]
pub enum ExplainError {
    /// No convolutional layer could be chosen as the attribution target.
    ///
    /// Architecture-level misconfiguration; retrying with the same model
    /// cannot succeed.
    #[error("No attribution target layer found: {0}")]
    LayerResolution(String),

    /// The activation or gradient of the target layer was never captured.
    ///
    /// Indicates the forward pass did not touch the target layer or the
    /// autodiff graph was detached, a wiring bug rather than a degenerate
    /// input.
    #[error("Attribution capture failed: {0}")]
    AttributionCapture(String),

    /// The requested class index is outside the model's output range.
    #[error("Target class {requested} out of range for {num_classes} classes")]
    InvalidTargetClass {
        /// The class index asked for.
        requested: usize,
        /// Number of classes the model predicts.
        num_classes: usize,
    },
}

/// Result type for attribution operations.
pub type Result<T> = std::result::Result<T, ExplainError>;
